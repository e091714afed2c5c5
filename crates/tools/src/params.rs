//! Argument extraction helpers. Every failure is `invalid_arguments`.

use serde_json::Value;

use crate::error::{Error, Result};

pub fn required_str<'a>(params: &'a Value, name: &str) -> Result<&'a str> {
    match params.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(Value::String(_)) => Err(Error::invalid_arguments(format!("'{name}' must not be empty"))),
        Some(_) => Err(Error::invalid_arguments(format!("'{name}' must be a string"))),
        None => Err(Error::invalid_arguments(format!("missing '{name}' parameter"))),
    }
}

pub fn optional_str<'a>(params: &'a Value, name: &str) -> Result<Option<&'a str>> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(Error::invalid_arguments(format!("'{name}' must be a string"))),
    }
}

/// A number, also accepting numeric strings.
pub fn required_f64(params: &Value, name: &str) -> Result<f64> {
    let value = match params.get(name) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
        None => return Err(Error::invalid_arguments(format!("missing '{name}' parameter"))),
    };
    value
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| Error::invalid_arguments(format!("'{name}' must be a number")))
}

/// A non-negative integer clamped to `1..=max`, or `default` when absent.
pub fn optional_limit(params: &Value, name: &str, default: u64, max: u64) -> Result<u64> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|v| v.clamp(1, max))
            .ok_or_else(|| Error::invalid_arguments(format!("'{name}' must be a positive integer"))),
        Some(_) => Err(Error::invalid_arguments(format!("'{name}' must be an integer"))),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn strings() {
        let p = json!({"a": "x", "b": "", "c": 3});
        assert_eq!(required_str(&p, "a").ok(), Some("x"));
        assert!(matches!(required_str(&p, "b"), Err(Error::InvalidArguments(_))));
        assert!(matches!(required_str(&p, "c"), Err(Error::InvalidArguments(_))));
        assert!(matches!(required_str(&p, "zz"), Err(Error::InvalidArguments(_))));
        assert_eq!(optional_str(&p, "zz").ok(), Some(None));
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        let p = json!({"lat": "47.37", "lon": 8.54, "bad": "north"});
        assert_eq!(required_f64(&p, "lat").ok(), Some(47.37));
        assert_eq!(required_f64(&p, "lon").ok(), Some(8.54));
        assert!(required_f64(&p, "bad").is_err());
    }

    #[test]
    fn limits_are_clamped() {
        let p = json!({"big": 500, "zero": 0, "neg": -1});
        assert_eq!(optional_limit(&p, "big", 10, 50).ok(), Some(50));
        assert_eq!(optional_limit(&p, "zero", 10, 50).ok(), Some(1));
        assert_eq!(optional_limit(&p, "missing", 10, 50).ok(), Some(10));
        assert!(optional_limit(&p, "neg", 10, 50).is_err());
    }
}
