//! Prompt text for the extraction request.
//!
//! Callers can override the default via
//! [`crate::config::AnalyzerConfig::extraction_prompt`]; the constant here is
//! used only when no override is provided. Any override must still ask for
//! the four keys in [`EXTRACTION_KEYS`], or every field will come back empty.

/// Keys the model is asked to return. Reply coercion reads exactly these, and
/// an object dug out of surrounding prose must carry at least one of them.
pub const EXTRACTION_KEYS: [&str; 4] = ["is_bank_statement", "name", "address", "document_date"];

/// Default instruction sent alongside the document image.
pub const EXTRACTION_PROMPT: &str = r#"Analyze this document and provide information in JSON format.
1. First determine if this is a bank statement (look for elements like transactions, balances, bank name)
2. Extract the following whether it's a bank statement or other document:
   - Person's full name
   - Complete address
   - Document date or period
3. Return the data in this exact JSON format:
{
    "is_bank_statement": true/false,
    "name": "[full name]",
    "address": "[complete address]",
    "document_date": "[statement date/period]"
}

If you cannot extract certain information, use empty strings for those fields.
Respond ONLY with the JSON, no other text."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_every_key() {
        for key in EXTRACTION_KEYS {
            assert!(EXTRACTION_PROMPT.contains(key), "prompt is missing {key}");
        }
    }
}
