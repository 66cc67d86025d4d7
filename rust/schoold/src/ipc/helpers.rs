use serde_json::Value;

/// Required, trimmed, non-empty string parameter.
pub fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    match params.get(key) {
        None | Some(Value::Null) => Err(format!("missing {}", key)),
        Some(v) => {
            let s = v
                .as_str()
                .ok_or_else(|| format!("{} must be string", key))?
                .trim();
            if s.is_empty() {
                return Err(format!("{} must not be empty", key));
            }
            Ok(s)
        }
    }
}

/// Optional string; blank counts as absent.
pub fn optional_str<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            let s = v
                .as_str()
                .ok_or_else(|| format!("{} must be string", key))?
                .trim();
            Ok(if s.is_empty() { None } else { Some(s) })
        }
    }
}

pub fn required_bool(params: &Value, key: &str) -> Result<bool, String> {
    match params.get(key) {
        None | Some(Value::Null) => Err(format!("missing {}", key)),
        Some(v) => v.as_bool().ok_or_else(|| format!("{} must be boolean", key)),
    }
}

pub fn optional_i64_range(
    params: &Value,
    key: &str,
    min: i64,
    max: i64,
) -> Result<Option<i64>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            let n = v
                .as_i64()
                .ok_or_else(|| format!("{} must be integer", key))?;
            if !(min..=max).contains(&n) {
                return Err(format!("{} must be in {}..={}", key, min, max));
            }
            Ok(Some(n))
        }
    }
}
