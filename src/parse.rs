//! Best-effort text to number conversions
//!
//! The legacy text export routinely carries empty or garbled fields, so none
//! of these helpers fail: each takes the value to use when the text does not
//! parse. The nice-rounding helpers produce presentable axis bounds.

use std::path::{Path, PathBuf};

const TRUE_WORDS: [&str; 4] = ["true", "yes", "y", "1"];
const FALSE_WORDS: [&str; 4] = ["false", "no", "n", "0"];

/// Parse a boolean word, case-insensitively
///
/// `true/yes/y/1` map to `true`, `false/no/n/0` to `false`; anything else
/// yields `default`.
pub fn parse_bool(text: &str, default: bool) -> bool {
    let text = text.trim();
    if TRUE_WORDS.iter().any(|w| w.eq_ignore_ascii_case(text)) {
        true
    } else if FALSE_WORDS.iter().any(|w| w.eq_ignore_ascii_case(text)) {
        false
    } else {
        default
    }
}

/// Parse a floating point number, accepting a lone `,` as decimal separator
pub fn parse_real(text: &str, default: f64) -> f64 {
    let text = text.trim();
    if let Ok(value) = text.parse::<f64>() {
        return value;
    }

    // "1,5" style decimals from comma locales
    if text.matches(',').count() == 1 && !text.contains('.') {
        if let Ok(value) = text.replace(',', ".").parse::<f64>() {
            return value;
        }
    }

    default
}

/// Parse a signed integer; fractional text is rejected
pub fn parse_int(text: &str, default: i64) -> i64 {
    text.trim().parse().unwrap_or(default)
}

/// Parse an unsigned integer; negative or fractional text is rejected
pub fn parse_uint(text: &str, default: u64) -> u64 {
    text.trim().parse().unwrap_or(default)
}

/// Power of ten of the rounding step for `value`
fn nice_exponent(value: f64, significant_digits: i32) -> i32 {
    value.abs().log10().round() as i32 - significant_digits + 1
}

fn nice_round(value: f64, significant_digits: i32, round: fn(f64) -> f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }

    let exponent = nice_exponent(value, significant_digits);
    let result = if exponent < 0 {
        // Divide by an exact power of ten so 2.1 stays 2.1
        let p = 10f64.powi(-exponent);
        round(value * p) / p
    } else {
        let f = 10f64.powi(exponent);
        round(value / f) * f
    };

    if result.is_finite() {
        result
    } else {
        value
    }
}

/// Round a lower bound down to a nice decimal value
///
/// `round_to_nice_floor(2.199, 2) == 2.1`. Zero and non-finite values pass
/// through unchanged.
pub fn round_to_nice_floor(value: f64, significant_digits: i32) -> f64 {
    nice_round(value, significant_digits, f64::floor)
}

/// Round an upper bound up to a nice decimal value
pub fn round_to_nice_ceil(value: f64, significant_digits: i32) -> f64 {
    nice_round(value, significant_digits, f64::ceil)
}

/// Replace (or add) the extension of `path`
pub fn fix_file_suffix(path: impl AsRef<Path>, suffix: &str) -> PathBuf {
    path.as_ref().with_extension(suffix)
}

/// Check whether `path` carries `suffix` as its extension, ignoring case
pub fn has_file_suffix(path: impl AsRef<Path>, suffix: &str) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(suffix))
        .unwrap_or(false)
}
