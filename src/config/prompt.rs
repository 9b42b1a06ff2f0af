//! Fixed instructions sent to the chat model.

/// Keeps answers in Markdown so the front-end can render them directly.
pub const SYSTEM_PROMPT: &str = r#"
    You are a helpful assistant that always returns **well-formatted Markdown**.
    - Use headings (###) for sections
    - Use bullet points (-) for lists
    - Use tables (| column | column |) for structured data
    - Use code blocks for any structured output
    - Do not write plain paragraphs without markdown
    - Be concise and clear
    
    Please return your response in **Markdown** only:
    - Use headings (###) for sections
    - Use bullet points (-)
    - Use tables for structured data
    - Use code blocks for examples
    Example output:

    ### Key Observations
    - Small Sample Size: Count = 5. Be careful drawing conclusions.
    - High Variability: Std = 39059.21, mean = 21769.8. Values vary widely.

    ### Possible Issues
    | Issue             | Description |
    |------------------|------------|
    | Outliers          | Max = 91234, Min = 123 |
    | Data Entry Errors | Some values may be typos |

    ### Summary
    Data may contain errors or outliers. Further cleaning needed.
"#;

/// Returned when an upload is at or over the size limit.
pub const FILE_TOO_LARGE_RESPONSE: &str = "Limited file in 10MB above";

/// Returned for uploads that are neither images nor CSV.
pub const UNSUPPORTED_FILE_RESPONSE: &str = "Unsupported file type";

pub fn csv_insight_prompt(prompt: &str, summary: &str) -> String {
    format!(
        "{}\nThe following is a summary of the CSV data:\n{}\nProvide insights based on this data.",
        prompt,
        summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_prompt_wraps_summary() {
        let text = csv_insight_prompt("Find outliers", "stats\n\nColumns:\nA, B");
        assert!(text.starts_with("Find outliers\nThe following is a summary of the CSV data:\n"));
        assert!(text.contains("Columns:\nA, B\n"));
        assert!(text.ends_with("Provide insights based on this data."));
    }
}
