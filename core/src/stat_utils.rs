//! Safe-division and numeric-normalization helpers.
//!
//! Every ratio in the report goes through these so that an empty entity
//! renders as 0 (or blank) instead of crashing the whole analysis.

/// Division that maps a zero or non-finite denominator to 0.0.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

/// `safe_div` scaled to a percentage.
pub fn safe_percent(numerator: f64, denominator: f64) -> f64 {
    safe_div(numerator, denominator) * 100.0
}

/// Render an optional metric with two decimals; `None` renders blank.
pub fn print_float(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_div_handles_zero_denominator() {
        assert_eq!(safe_div(10.0, 0.0), 0.0);
        assert_eq!(safe_div(10.0, 4.0), 2.5);
    }

    #[test]
    fn safe_percent_scales() {
        assert_eq!(safe_percent(20.0, 50.0), 40.0);
        assert_eq!(safe_percent(1.0, 0.0), 0.0);
    }

    #[test]
    fn print_float_blank_for_none() {
        assert_eq!(print_float(None), "");
        assert_eq!(print_float(Some(1.25)), "1.25");
    }
}
