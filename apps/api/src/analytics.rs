//! Analytics: derived aggregation over already-normalized records.
//!
//! Buckets are keyed by the closed enums, so model free text can never
//! introduce a new category or priority here.

use std::cmp::Reverse;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::models::{Category, Complaint, Priority, Status};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub total: usize,
    pub high_priority: usize,
    pub unique_categories: usize,
    pub by_category: Vec<Bucket>,
    pub by_priority: Vec<Bucket>,
    pub by_status: Vec<Bucket>,
    /// Most recent first.
    pub latest: Vec<Complaint>,
}

pub fn summarize(records: &[Complaint], latest_n: usize) -> AnalyticsSummary {
    let by_category: Vec<Bucket> = Category::ALL
        .iter()
        .map(|c| Bucket {
            label: c.as_str(),
            count: records.iter().filter(|r| r.category == *c).count(),
        })
        .collect();
    let by_priority: Vec<Bucket> = Priority::ALL
        .iter()
        .map(|p| Bucket {
            label: p.as_str(),
            count: records.iter().filter(|r| r.priority == *p).count(),
        })
        .collect();
    let by_status: Vec<Bucket> = Status::ALL
        .iter()
        .map(|s| Bucket {
            label: s.as_str(),
            count: records.iter().filter(|r| r.status == *s).count(),
        })
        .collect();

    let mut latest: Vec<&Complaint> = records.iter().collect();
    // Stable sort: equal timestamps keep filing order.
    latest.sort_by_key(|r| Reverse(parse_timestamp(&r.timestamp)));

    AnalyticsSummary {
        total: records.len(),
        high_priority: records
            .iter()
            .filter(|r| r.priority == Priority::High)
            .count(),
        unique_categories: by_category.iter().filter(|b| b.count > 0).count(),
        by_category,
        by_priority,
        by_status,
        latest: latest.into_iter().take(latest_n).cloned().collect(),
    }
}

/// RFC 3339, or a naive ISO-8601 timestamp read as UTC. Unparseable sorts oldest.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
