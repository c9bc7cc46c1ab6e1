/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Integer from text, after [`clean_str`]. `"71"`, `" \"71\" "` and `"71.0"`
/// parse; `"71.5"` does not.
pub fn parse_int(raw: &str) -> Result<i64, String> {
    let cleaned = clean_str(raw);
    match cleaned.parse::<i64>() {
        Ok(i) => Ok(i),
        Err(int_err) => match cleaned.parse::<f64>() {
            Ok(f) => float_to_int(f),
            Err(_) => Err(int_err.to_string()),
        },
    }
}

pub fn parse_float(raw: &str) -> Result<f64, String> {
    clean_str(raw).parse::<f64>().map_err(|e| e.to_string())
}

/// Lossless float → integer; fractional or out-of-range values are refused.
pub fn float_to_int(f: f64) -> Result<i64, String> {
    if !f.is_finite() {
        return Err(format!("{} is not finite", f));
    }
    if f.fract() != 0.0 {
        return Err(format!("{} has a fractional part", f));
    }
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range
    if f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(format!("{} does not fit in 64 bits", f));
    }
    Ok(f as i64)
}
