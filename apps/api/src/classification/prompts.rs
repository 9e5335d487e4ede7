//! Complaint classification prompt template.
//! The closed category and priority sets here must match `models::complaint`.

/// Classification prompt. Replace `{complaint_text}` before sending.
pub const CLASSIFY_PROMPT_TEMPLATE: &str = r#"Analyze the following public service complaint and provide a structured JSON output.

COMPLAINT:
"{complaint_text}"

INSTRUCTIONS:
1. Categorize the complaint into ONE of: Electricity, Water, Roads, Waste, Health, Security, Other.
2. Determine the priority level: High, Medium, or Low.
3. Write a concise one-sentence summary of the core issue.
4. Extract key terms as a list of strings.
5. Provide a confidence score (0.0 to 1.0) for the classification.

OUTPUT SCHEMA (return exactly this structure):
{
  "category": "Electricity" | "Water" | "Roads" | "Waste" | "Health" | "Security" | "Other",
  "priority": "High" | "Medium" | "Low",
  "summary": "string",
  "keywords": ["string"],
  "confidence": number
}

Return ONLY the JSON object. No markdown, no extra text."#;

pub fn build_classify_prompt(complaint_text: &str) -> String {
    CLASSIFY_PROMPT_TEMPLATE.replace("{complaint_text}", complaint_text)
}
