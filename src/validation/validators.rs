//! Reusable property validators
//!
//! Synchronous checks share one shape, `Fn(field, value) -> Result<(), message>`,
//! and are wrapped into a [`Validator`] when attached to a property. A missing
//! property is checked as JSON `null`.

use super::lookup::UniqueLookup;
use super::Validator;
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// Validator: field is present and not null
pub fn required() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| {
        if value.is_null() {
            Err(format!("{} is required", field))
        } else {
            Ok(())
        }
    }
}

/// Validator: value is a string
pub fn is_string() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |_: &str, value: &Value| {
        if value.is_string() {
            Ok(())
        } else {
            Err("Value must be a string".to_string())
        }
    }
}

/// Validator: value is a number
pub fn is_number() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |_: &str, value: &Value| {
        if value.is_number() {
            Ok(())
        } else {
            Err("Value must be a number".to_string())
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

/// Validator: value is a string shaped like an email address
///
/// Anything that is not a string fails, including a missing value.
pub fn is_email() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |_: &str, value: &Value| match value.as_str() {
        Some(s) if email_regex().is_match(s) => Ok(()),
        _ => Err("Value must be a valid email".to_string()),
    }
}

/// Validator: number must be positive
pub fn positive() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| {
        if let Some(num) = value.as_f64() {
            if num <= 0.0 {
                Err(format!("{} must be positive (got {})", field, num))
            } else {
                Ok(())
            }
        } else {
            Ok(())
        }
    }
}

/// Validator: string length must be within range
pub fn string_length(
    min: usize,
    max: usize,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        if let Some(s) = value.as_str() {
            let len = s.chars().count();
            if len < min {
                Err(format!(
                    "{} must be at least {} characters long (got {})",
                    field, min, len
                ))
            } else if len > max {
                Err(format!(
                    "{} must be at most {} characters long (got {})",
                    field, max, len
                ))
            } else {
                Ok(())
            }
        } else {
            Ok(())
        }
    }
}

/// Validator: string has at least `min` characters
pub fn min_length(min: usize) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    string_length(min, usize::MAX)
}

/// Validator: number must not exceed maximum
pub fn max_value(max: f64) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        if let Some(num) = value.as_f64() {
            if num > max {
                Err(format!("{} must not exceed {} (got {})", field, max, num))
            } else {
                Ok(())
            }
        } else {
            Ok(())
        }
    }
}

/// Validator: value must be in allowed list
pub fn in_list(
    allowed: Vec<String>,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        if let Some(s) = value.as_str() {
            if !allowed.iter().any(|a| a == s) {
                Err(format!(
                    "{} must be one of {:?} (got {})",
                    field, allowed, s
                ))
            } else {
                Ok(())
            }
        } else {
            Ok(())
        }
    }
}

/// Validator: date must match format
pub fn date_format(
    format: &'static str,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        if let Some(s) = value.as_str() {
            match chrono::NaiveDate::parse_from_str(s, format) {
                Ok(_) => Ok(()),
                Err(_) => Err(format!(
                    "{} must use the format {} (got {})",
                    field, format, s
                )),
            }
        } else {
            Ok(())
        }
    }
}

/// Replace the message of a failing check
pub fn with_message<F>(
    check: F,
    message: impl Into<String>,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone
where
    F: Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone,
{
    let message = message.into();
    move |field: &str, value: &Value| check(field, value).map_err(|_| message.clone())
}

/// Validator: no stored record holds this value
///
/// Null values pass; the lookup is only consulted for present values.
/// `column` defaults to the property key.
pub fn unique(lookup: Arc<dyn UniqueLookup>, column: Option<&str>) -> Validator {
    let column = column.map(str::to_string);
    Validator::from_async("unique", move |field: String, value: Value| {
        let lookup = lookup.clone();
        let column = column.clone().unwrap_or(field);
        async move {
            if value.is_null() {
                return Ok::<_, anyhow::Error>(None);
            }
            let taken = lookup.exists(&column, &value).await?;
            Ok(taken.then(|| "Value must be unique".to_string()))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::lookup::InMemoryUniqueLookup;
    use serde_json::json;

    // === required() ===

    #[test]
    fn test_required_null_value_returns_error() {
        let v = required();
        let result = v("name", &json!(null));
        assert_eq!(result.unwrap_err(), "name is required");
    }

    #[test]
    fn test_required_string_value_returns_ok() {
        let v = required();
        assert!(v("name", &json!("hello")).is_ok());
    }

    #[test]
    fn test_required_empty_string_returns_ok() {
        let v = required();
        assert!(v("name", &json!("")).is_ok());
    }

    #[test]
    fn test_required_false_returns_ok() {
        let v = required();
        assert!(v("active", &json!(false)).is_ok());
    }

    // === is_string() / is_number() ===

    #[test]
    fn test_is_string() {
        let v = is_string();
        assert!(v("name", &json!("x")).is_ok());
        assert_eq!(v("name", &json!(1)).unwrap_err(), "Value must be a string");
        assert!(v("name", &json!(null)).is_err());
    }

    #[test]
    fn test_is_number() {
        let v = is_number();
        assert!(v("age", &json!(4.5)).is_ok());
        assert_eq!(v("age", &json!("4")).unwrap_err(), "Value must be a number");
    }

    // === is_email() ===

    #[test]
    fn test_is_email_accepts_address() {
        let v = is_email();
        assert!(v("email", &json!("jane@example.com")).is_ok());
    }

    #[test]
    fn test_is_email_rejects_malformed() {
        let v = is_email();
        assert!(v("email", &json!("jane@example")).is_err());
        assert!(v("email", &json!("jane doe@example.com")).is_err());
    }

    #[test]
    fn test_is_email_rejects_missing_value() {
        let v = is_email();
        assert_eq!(
            v("email", &json!(null)).unwrap_err(),
            "Value must be a valid email"
        );
    }

    // === positive() ===

    #[test]
    fn test_positive_negative_number_returns_error() {
        let v = positive();
        let result = v("price", &json!(-5.0));
        assert!(result.unwrap_err().contains("positive"));
    }

    #[test]
    fn test_positive_zero_returns_error() {
        let v = positive();
        assert!(v("price", &json!(0.0)).is_err());
    }

    #[test]
    fn test_positive_non_number_passthrough() {
        let v = positive();
        assert!(v("name", &json!("hello")).is_ok());
    }

    // === string_length() ===

    #[test]
    fn test_string_length_too_short_returns_error() {
        let v = string_length(3, 50);
        let result = v("name", &json!("ab"));
        assert!(result.unwrap_err().contains("at least 3"));
    }

    #[test]
    fn test_string_length_too_long_returns_error() {
        let v = string_length(1, 5);
        let result = v("name", &json!("abcdef"));
        assert!(result.unwrap_err().contains("at most 5"));
    }

    #[test]
    fn test_string_length_bounds_inclusive() {
        let v = string_length(3, 5);
        assert!(v("name", &json!("abc")).is_ok());
        assert!(v("name", &json!("abcde")).is_ok());
    }

    #[test]
    fn test_string_length_counts_characters() {
        let v = string_length(1, 3);
        assert!(v("name", &json!("été")).is_ok());
    }

    #[test]
    fn test_min_length_has_no_upper_bound() {
        let v = min_length(8);
        assert!(v("password", &json!("x".repeat(500))).is_ok());
        assert!(v("password", &json!("short")).is_err());
    }

    // === max_value() ===

    #[test]
    fn test_max_value_over_returns_error() {
        let v = max_value(100.0);
        let result = v("score", &json!(101.0));
        assert!(result.unwrap_err().contains("exceed 100"));
    }

    #[test]
    fn test_max_value_equal_returns_ok() {
        let v = max_value(100.0);
        assert!(v("score", &json!(100.0)).is_ok());
    }

    // === in_list() ===

    #[test]
    fn test_in_list_value_in_list_returns_ok() {
        let v = in_list(vec!["active".into(), "inactive".into()]);
        assert!(v("status", &json!("active")).is_ok());
    }

    #[test]
    fn test_in_list_value_not_in_list_returns_error() {
        let v = in_list(vec!["active".into(), "inactive".into()]);
        assert!(v("status", &json!("deleted")).is_err());
    }

    #[test]
    fn test_in_list_non_string_passthrough() {
        let v = in_list(vec!["yes".into()]);
        assert!(v("flag", &json!(42)).is_ok());
    }

    // === date_format() ===

    #[test]
    fn test_date_format_valid_date_returns_ok() {
        let v = date_format("%Y-%m-%d");
        assert!(v("birthday", &json!("2024-01-15")).is_ok());
    }

    #[test]
    fn test_date_format_wrong_format_returns_error() {
        let v = date_format("%d/%m/%Y");
        assert!(v("date", &json!("2024-01-15")).is_err());
    }

    // === with_message() ===

    #[test]
    fn test_with_message_replaces_failure_message() {
        let v = with_message(required(), "please give us your email");
        assert_eq!(
            v("email", &json!(null)).unwrap_err(),
            "please give us your email"
        );
        assert!(v("email", &json!("x")).is_ok());
    }

    // === unique() ===

    #[tokio::test]
    async fn test_unique_rejects_existing_value() {
        let lookup = Arc::new(InMemoryUniqueLookup::new());
        lookup.insert("email", json!("taken@example.com")).await;

        let v = unique(lookup, None);
        let outcome = v.check("email", json!("taken@example.com")).await.unwrap();
        assert_eq!(outcome.as_deref(), Some("Value must be unique"));

        let outcome = v.check("email", json!("free@example.com")).await.unwrap();
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn test_unique_uses_column_override() {
        let lookup = Arc::new(InMemoryUniqueLookup::new());
        lookup.insert("mail", json!("a@b.co")).await;

        let v = unique(lookup, Some("mail"));
        let outcome = v.check("email", json!("a@b.co")).await.unwrap();
        assert!(outcome.is_some());
    }

    #[test]
    fn test_unique_skips_null() {
        let lookup = Arc::new(InMemoryUniqueLookup::new());
        let v = unique(lookup, None);
        let outcome = tokio_test::block_on(v.check("email", json!(null))).unwrap();
        assert_eq!(outcome, None);
    }
}
