//! Định dạng số và ngày cho thẻ tóm tắt, bảng và tooltip.

use std::fmt::Write;

use chrono::{DateTime, Utc};

/// Số nguyên in không phần thập phân, còn lại giữ hai chữ số.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Phần trăm không dấu, một chữ số thập phân.
pub fn format_percent(percent: f64) -> String {
    format!("{:.1}", percent.abs())
}

pub fn format_value_with_unit(value: f64, unit: Option<&str>) -> String {
    match unit {
        Some(unit) if !unit.is_empty() => format!("{} {unit}", format_value(value)),
        _ => format_value(value),
    }
}

/// Mẫu không hợp lệ rơi về `%Y-%m-%d` thay vì panic.
pub fn format_date(date: DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(pattern)).is_err() {
        return date.format("%Y-%m-%d").to_string();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn integers_have_no_decimals() {
        assert_eq!(format_value(120.0), "120");
        assert_eq!(format_value(-3.0), "-3");
        assert_eq!(format_value(5.256), "5.26");
        assert_eq!(format_value(0.5), "0.50");
    }

    #[test]
    fn percent_is_unsigned() {
        assert_eq!(format_percent(-12.345), "12.3");
        assert_eq!(format_percent(22.727), "22.7");
    }

    #[test]
    fn unit_is_appended_when_present() {
        assert_eq!(format_value_with_unit(135.0, Some("г/л")), "135 г/л");
        assert_eq!(format_value_with_unit(4.5, None), "4.50");
        assert_eq!(format_value_with_unit(4.5, Some("")), "4.50");
    }

    #[test]
    fn invalid_pattern_falls_back() {
        let date = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        assert_eq!(format_date(date, "%d.%m.%Y"), "03.06.2024");
        assert_eq!(format_date(date, "%Q"), "2024-06-03");
    }
}
