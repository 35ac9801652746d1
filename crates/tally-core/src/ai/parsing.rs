//! Parsing helpers for classifier responses
//!
//! Models answer with `Main: subcategory` text, sometimes wrapped in quotes
//! or backticks.

use crate::error::{Error, Result};
use crate::models::{MainCategory, DEFAULT_SUBCATEGORY};

use super::types::Classification;

const QUOTES: &[char] = &['"', '\'', '`'];

/// Truncate long responses for error messages
fn truncate(response: &str) -> String {
    if response.chars().count() > 200 {
        format!("{}...", response.chars().take(200).collect::<String>())
    } else {
        response.to_string()
    }
}

fn strip_quotes(s: &str) -> &str {
    s.trim().trim_matches(QUOTES).trim()
}

/// Parse a `Main: sub` answer
///
/// Without a colon the whole text is the main category and the subcategory
/// defaults to `general`. Empty text or a main category outside the closed
/// set is an error.
pub fn parse_classification(response: &str) -> Result<Classification> {
    let response = strip_quotes(response);
    if response.is_empty() {
        return Err(Error::Classification("Empty response from AI".into()));
    }

    let (main_raw, sub_raw) = response.split_once(':').unwrap_or((response, ""));

    let main: MainCategory = strip_quotes(main_raw).parse().map_err(|_| {
        Error::Classification(format!(
            "Unrecognized main category | Raw: {}",
            truncate(response)
        ))
    })?;

    let subcategory = match strip_quotes(sub_raw) {
        "" => DEFAULT_SUBCATEGORY,
        sub => sub,
    };

    Ok(Classification {
        main,
        subcategory: subcategory.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_main_and_sub() {
        let c = parse_classification("Spending: groceries").unwrap();
        assert_eq!(c.main, MainCategory::Spending);
        assert_eq!(c.subcategory, "groceries");
    }

    #[test]
    fn test_parse_without_colon() {
        let c = parse_classification("Incoming").unwrap();
        assert_eq!(c.main, MainCategory::Incoming);
        assert_eq!(c.subcategory, "general");
    }

    #[test]
    fn test_parse_empty_subcategory() {
        let c = parse_classification("Investments:   ").unwrap();
        assert_eq!(c.main, MainCategory::Investments);
        assert_eq!(c.subcategory, "general");
    }

    #[test]
    fn test_parse_quoted_and_cased() {
        let c = parse_classification("  \"spending: car\"\n").unwrap();
        assert_eq!(c.main, MainCategory::Spending);
        assert_eq!(c.subcategory, "car");

        let c = parse_classification("`Incoming`: work").unwrap();
        assert_eq!(c.main, MainCategory::Incoming);
        assert_eq!(c.subcategory, "work");
    }

    #[test]
    fn test_parse_splits_on_first_colon() {
        let c = parse_classification("Spending: utilities: wifi").unwrap();
        assert_eq!(c.subcategory, "utilities: wifi");
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_classification("   "),
            Err(Error::Classification(_))
        ));
        assert!(matches!(
            parse_classification("Food: groceries"),
            Err(Error::Classification(_))
        ));
        assert!(parse_classification("I think this is probably groceries").is_err());
    }

    #[test]
    fn test_truncate_long_response() {
        let long = "x".repeat(500);
        let t = truncate(&long);
        assert_eq!(t.len(), 203);
        assert!(t.ends_with("..."));
    }
}
