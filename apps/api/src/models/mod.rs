pub mod complaint;
pub mod fields;

pub use complaint::{Category, Classification, Complaint, Note, Priority, Status};
