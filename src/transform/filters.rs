//! Reusable value filters
//!
//! Each filter is a `Fn(Value) -> Result<Value>` usable as either side of a
//! [`TransformFns`](crate::metadata::TransformFns). Values of another JSON
//! type pass through untouched.

use anyhow::Result;
use serde_json::{Number, Value};

fn map_string(
    f: fn(&str) -> String,
) -> impl Fn(Value) -> Result<Value> + Send + Sync + Clone {
    move |value: Value| match value {
        Value::String(s) => Ok(Value::String(f(&s))),
        other => Ok(other),
    }
}

/// Strip leading and trailing whitespace
pub fn trim() -> impl Fn(Value) -> Result<Value> + Send + Sync + Clone {
    map_string(|s| s.trim().to_string())
}

pub fn uppercase() -> impl Fn(Value) -> Result<Value> + Send + Sync + Clone {
    map_string(str::to_uppercase)
}

pub fn lowercase() -> impl Fn(Value) -> Result<Value> + Send + Sync + Clone {
    map_string(str::to_lowercase)
}

/// Round a float to `decimals` places
///
/// Integers are already exact and pass through. A number whose scaled value
/// is not finite is returned unchanged rather than collapsing to `null`.
pub fn round_decimals(decimals: u32) -> impl Fn(Value) -> Result<Value> + Send + Sync + Clone {
    let factor = 10_f64.powi(decimals.min(i32::MAX as u32) as i32);
    move |value: Value| {
        let Value::Number(n) = &value else {
            return Ok(value);
        };
        if n.is_i64() || n.is_u64() {
            return Ok(value);
        }
        let Some(num) = n.as_f64() else {
            return Ok(value);
        };
        let scaled = num * factor;
        if !scaled.is_finite() {
            return Ok(value);
        }
        match Number::from_f64(scaled.round() / factor) {
            Some(rounded) => Ok(Value::Number(rounded)),
            None => Ok(value),
        }
    }
}
