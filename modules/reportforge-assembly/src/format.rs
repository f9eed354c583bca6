//! Display formatting for resolved values.

use reportforge_common::ValueFormat;

/// Format a raw (already comma-stripped) value for display. Non-numeric
/// input under a numeric format falls through to string coercion.
pub fn format_value(value: &str, format: ValueFormat) -> String {
    let trimmed = value.trim();
    match format {
        ValueFormat::String => trimmed.to_string(),
        ValueFormat::Currency => match parse_number(trimmed) {
            Some(n) => format!("${}", group_number(n)),
            None => trimmed.to_string(),
        },
        ValueFormat::Number => match parse_number(trimmed) {
            Some(n) => group_number(n),
            None => trimmed.to_string(),
        },
        ValueFormat::Decimal => match parse_number(trimmed) {
            Some(n) => to_fixed(n, 2),
            None => trimmed.to_string(),
        },
        ValueFormat::Percentage => match parse_number(trimmed) {
            Some(n) => format!("{}%", to_fixed(n, 2)),
            None => trimmed.to_string(),
        },
    }
}

/// Parse a numeric string, tolerating residual thousands separators.
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned = value.replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Locale-style grouping: thousands separators on the integer part, up to
/// three fractional digits with trailing zeros trimmed.
pub fn group_number(n: f64) -> String {
    let rounded = half_up(n, 3);
    let negative = rounded < 0.0;
    let abs = rounded.abs();
    let int_part = abs.trunc() as i64;

    let mut out = group_digits(&int_part.to_string());
    let frac = ((abs - abs.trunc()) * 1000.0).round() as i64;
    if frac > 0 {
        let digits = format!("{frac:03}");
        let digits = digits.trim_end_matches('0');
        out.push('.');
        out.push_str(digits);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}

/// Fixed-point rendering with half-away-from-zero rounding on the decimal
/// value (matching how the upstream renderer displayed numbers), immune to
/// binary representation artifacts like 12.345 → "12.34".
pub fn to_fixed(n: f64, places: u32) -> String {
    let factor = 10f64.powi(places as i32);
    let scaled = half_up(n, places) * factor;
    let scaled_int = scaled.round() as i64;
    let divisor = factor as i64;
    let int_part = scaled_int / divisor;
    let frac = (scaled_int % divisor).abs();
    let sign = if scaled_int < 0 && int_part == 0 { "-" } else { "" };
    format!(
        "{sign}{int_part}.{frac:0width$}",
        width = places as usize
    )
}

fn half_up(n: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    if n >= 0.0 {
        (n * factor + 0.5 + 1e-9).floor() / factor
    } else {
        (n * factor - 0.5 - 1e-9).ceil() / factor
    }
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_groups_integer_part() {
        assert_eq!(format_value("1234", ValueFormat::Currency), "$1,234");
        assert_eq!(format_value("1234567", ValueFormat::Currency), "$1,234,567");
    }

    #[test]
    fn number_regroups_a_stripped_value() {
        assert_eq!(format_value("1,234", ValueFormat::Number), "1,234");
        assert_eq!(format_value("1234567", ValueFormat::Number), "1,234,567");
        assert_eq!(format_value("999", ValueFormat::Number), "999");
    }

    #[test]
    fn decimal_renders_two_places() {
        assert_eq!(format_value("12.345", ValueFormat::Decimal), "12.35");
        assert_eq!(format_value("7", ValueFormat::Decimal), "7.00");
    }

    #[test]
    fn percentage_appends_suffix() {
        assert_eq!(format_value("57.03", ValueFormat::Percentage), "57.03%");
        assert_eq!(format_value("0.5", ValueFormat::Percentage), "0.50%");
    }

    #[test]
    fn non_numeric_input_falls_through() {
        assert_eq!(format_value("N/A", ValueFormat::Currency), "N/A");
        assert_eq!(format_value("", ValueFormat::Number), "");
        assert_eq!(format_value("abc", ValueFormat::Percentage), "abc");
    }

    #[test]
    fn string_values_pass_untouched() {
        assert_eq!(format_value(" CTV ", ValueFormat::String), "CTV");
    }

    #[test]
    fn grouping_keeps_fractional_digits() {
        assert_eq!(group_number(1234.5), "1,234.5");
        assert_eq!(group_number(-1234567.0), "-1,234,567");
        assert_eq!(group_number(12.0), "12");
    }

    #[test]
    fn fixed_point_is_stable_on_representation_edges() {
        assert_eq!(to_fixed(12.345, 2), "12.35");
        assert_eq!(to_fixed(-12.345, 2), "-12.35");
        assert_eq!(to_fixed(0.005, 2), "0.01");
    }
}
