use crate::state::FieldValue;

const SCALES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

/// Short form of a stat: one decimal plus K/M/B/T from 10^3 upward, the raw
/// value below. The threshold picks the suffix before rounding, so 999999
/// reads `1000.0K`.
pub fn abbreviate(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_string();
    }
    for (scale, suffix) in SCALES {
        if value >= scale {
            return format!("{:.1}{suffix}", round_half_up(value / scale, 1));
        }
    }
    plain_number(value)
}

/// Thousands-separated form with at most three fractional digits.
pub fn group_thousands(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = round_half_up(value, 3);
    let negative = rounded < 0.0;
    let abs = rounded.abs();
    let int_part = abs.trunc();
    let digits = format!("{int_part:.0}");

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 6);
    if negative {
        out.push('-');
    }
    let len = digits.len();
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let frac = format!("{:.3}", abs - int_part);
    let frac = frac.trim_start_matches('0').trim_end_matches('0');
    if frac.len() > 1 {
        out.push_str(frac);
    }
    out
}

/// `5,000,000 - (5.0M)` for numeric stats, the raw text for anything else
/// and `-` when the list has no value.
pub fn stat_text(field: &FieldValue) -> String {
    if field.is_absent() {
        return "-".to_string();
    }
    match field.parsed() {
        Some(value) => format!("{} - ({})", group_thousands(value), abbreviate(value)),
        None => field.display().unwrap_or_else(|| "-".to_string()),
    }
}

pub fn field_text(field: &FieldValue) -> String {
    field.display().unwrap_or_else(|| "-".to_string())
}

fn plain_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn round_half_up(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviation_boundaries() {
        assert_eq!(abbreviate(999.0), "999");
        assert_eq!(abbreviate(1000.0), "1.0K");
        assert_eq!(abbreviate(999_999.0), "1000.0K");
        assert_eq!(abbreviate(1_000_000.0), "1.0M");
        assert_eq!(abbreviate(1250.0), "1.3K");
        assert_eq!(abbreviate(2.5e9), "2.5B");
        assert_eq!(abbreviate(3.21e12), "3.2T");
        assert_eq!(abbreviate(0.0), "0");
        assert_eq!(abbreviate(12.5), "12.5");
    }

    #[test]
    fn grouping() {
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(999.0), "999");
        assert_eq!(group_thousands(1000.0), "1,000");
        assert_eq!(group_thousands(5_000_000.0), "5,000,000");
        assert_eq!(group_thousands(-1234567.0), "-1,234,567");
        assert_eq!(group_thousands(1234.5), "1,234.5");
        assert_eq!(group_thousands(0.1234), "0.123");
    }

    #[test]
    fn stat_text_keeps_absence_and_raw_text() {
        assert_eq!(stat_text(&FieldValue::number(5_000_000.0)), "5,000,000 - (5.0M)");
        assert_eq!(stat_text(&FieldValue::text("2500")), "2,500 - (2.5K)");
        assert_eq!(stat_text(&FieldValue::text("unknown")), "unknown");
        assert_eq!(stat_text(&FieldValue::default()), "-");
    }
}
