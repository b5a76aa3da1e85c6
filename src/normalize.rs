//! Field normalizers
//!
//! Pure functions mapping raw cell values to canonical forms. Phone and date
//! normalizers signal unrepresentable input with `None`; identifier and
//! numeric parsers return an error because a wrong value there would corrupt
//! joins or fabricate amounts.

use crate::constants::{DATE_FORMATS, DEFAULT_COUNTRY_CODE, OUTPUT_DATE_FORMAT, PHONE_DIGITS};
use crate::error::{EtlError, Result};
use crate::models::{Feed, SurrogateId};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static NON_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9]").expect("static pattern is valid"));

fn digits_only(raw: &str) -> String {
    NON_DIGITS.replace_all(raw, "").into_owned()
}

/// Normalize a phone number to `+91-NNNNNNNNNN`
pub fn normalize_phone(raw: Option<&str>) -> Option<String> {
    normalize_phone_with_country_code(raw, DEFAULT_COUNTRY_CODE)
}

/// Normalize a phone number to `+<country_code>-NNNNNNNNNN`.
///
/// Keeps the last ten digits; inputs with fewer than ten digits are absent.
pub fn normalize_phone_with_country_code(raw: Option<&str>, country_code: &str) -> Option<String> {
    let digits = digits_only(raw?);
    if digits.len() < PHONE_DIGITS {
        return None;
    }
    let local = &digits[digits.len() - PHONE_DIGITS..];
    Some(format!("+{country_code}-{local}"))
}

/// Parse a date using the accepted input patterns, first match wins
pub fn normalize_date(raw: Option<&str>) -> Option<NaiveDate> {
    let value = raw?.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Render a date as `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format(OUTPUT_DATE_FORMAT).to_string()
}

/// Derive the integer join key from a source identifier.
///
/// All non-digit characters are removed and the rest parsed as an integer,
/// so `"C001"` and `"P001"` both become `1`. Fails with
/// [`EtlError::MalformedIdentifier`] when no digits remain or the number
/// does not fit.
pub fn derive_surrogate_id(feed: Feed, source_id: &str) -> Result<SurrogateId> {
    let digits = digits_only(source_id);
    if digits.is_empty() {
        return Err(EtlError::malformed_identifier(feed.entity_name(), source_id));
    }
    digits
        .parse::<i64>()
        .map(SurrogateId)
        .map_err(|_| EtlError::malformed_identifier(feed.entity_name(), source_id))
}

/// Title-case free text: the first letter of every word upper-case, the rest
/// lower-case. A word starts after any non-alphabetic character, so
/// `"home-decor"` becomes `"Home-Decor"`. The result is trimmed.
pub fn title_case(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut previous_alphabetic = false;

    for ch in raw.chars() {
        if ch.is_alphabetic() {
            if previous_alphabetic {
                result.extend(ch.to_lowercase());
            } else {
                result.extend(ch.to_uppercase());
            }
            previous_alphabetic = true;
        } else {
            result.push(ch);
            previous_alphabetic = false;
        }
    }

    result.trim().to_string()
}

/// Parse an optional decimal cell
pub fn parse_decimal(column: &str, raw: Option<&str>) -> Result<Option<f64>> {
    let Some(value) = raw else {
        return Ok(None);
    };
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_nan() => Ok(None),
        Ok(parsed) if parsed.is_finite() => Ok(Some(parsed)),
        _ => Err(EtlError::invalid_number(column, value)),
    }
}

/// Parse an optional integer cell. Integral decimals such as `"50.0"` are
/// accepted since spreadsheet exports often write counts that way.
pub fn parse_integer(column: &str, raw: Option<&str>) -> Result<Option<i64>> {
    let Some(value) = raw else {
        return Ok(None);
    };
    if let Ok(parsed) = value.parse::<i64>() {
        return Ok(Some(parsed));
    }
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_nan() => Ok(None),
        Ok(parsed)
            if parsed.is_finite()
                && parsed.fract() == 0.0
                && parsed.abs() < i64::MAX as f64 =>
        {
            Ok(Some(parsed as i64))
        }
        _ => Err(EtlError::invalid_number(column, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_normalize_phone_formats() {
        assert_eq!(
            normalize_phone(Some("98765-43210")),
            Some("+91-9876543210".to_string())
        );
        assert_eq!(
            normalize_phone(Some("+91 98765 43210")),
            Some("+91-9876543210".to_string())
        );
        assert_eq!(
            normalize_phone(Some("(0) 98765-43210")),
            Some("+91-9876543210".to_string())
        );
    }

    #[test]
    fn test_normalize_phone_too_short() {
        assert_eq!(normalize_phone(Some("12345")), None);
        assert_eq!(normalize_phone(Some("phone")), None);
        assert_eq!(normalize_phone(None), None);
    }

    #[test]
    fn test_normalize_phone_custom_country_code() {
        assert_eq!(
            normalize_phone_with_country_code(Some("555-010-1234"), "1"),
            Some("+1-5550101234".to_string())
        );
    }

    #[test]
    fn test_normalize_date_accepted_patterns() {
        assert_eq!(normalize_date(Some("2024-01-15")), Some(date(2024, 1, 15)));
        assert_eq!(normalize_date(Some("15/01/2024")), Some(date(2024, 1, 15)));
        assert_eq!(normalize_date(Some("01-15-2024")), Some(date(2024, 1, 15)));
        assert_eq!(normalize_date(Some("15-01-2024")), Some(date(2024, 1, 15)));
        assert_eq!(normalize_date(Some("  2024-01-15 ")), Some(date(2024, 1, 15)));
    }

    #[test]
    fn test_normalize_date_ambiguous_prefers_month_first_dash() {
        // %m-%d-%Y is tried before %d-%m-%Y
        assert_eq!(normalize_date(Some("03-04-2024")), Some(date(2024, 3, 4)));
        // slash form is always day first
        assert_eq!(normalize_date(Some("03/04/2024")), Some(date(2024, 4, 3)));
    }

    #[test]
    fn test_normalize_date_rejects_garbage() {
        assert_eq!(normalize_date(Some("not a date")), None);
        assert_eq!(normalize_date(Some("2024/01/15")), None);
        assert_eq!(normalize_date(Some("31-31-2024")), None);
        assert_eq!(normalize_date(Some("   ")), None);
        assert_eq!(normalize_date(None), None);
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(date(2023, 7, 4)), "2023-07-04");
    }

    #[test]
    fn test_derive_surrogate_id() {
        assert_eq!(
            derive_surrogate_id(Feed::Customers, "C001").unwrap(),
            SurrogateId(1)
        );
        assert_eq!(
            derive_surrogate_id(Feed::Products, "P-0042").unwrap(),
            SurrogateId(42)
        );
    }

    #[test]
    fn test_derive_surrogate_id_malformed() {
        let err = derive_surrogate_id(Feed::Customers, "CXX").unwrap_err();
        assert!(matches!(err, EtlError::MalformedIdentifier { .. }));

        let err = derive_surrogate_id(Feed::Products, "P99999999999999999999999").unwrap_err();
        assert!(matches!(err, EtlError::MalformedIdentifier { .. }));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("electronics"), "Electronics");
        assert_eq!(title_case("  HOME appliances "), "Home Appliances");
        assert_eq!(title_case("home-decor"), "Home-Decor");
        assert_eq!(title_case("FASHION"), "Fashion");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("price", Some("12.50")).unwrap(), Some(12.5));
        assert_eq!(parse_decimal("price", None).unwrap(), None);
        assert_eq!(parse_decimal("price", Some("NaN")).unwrap(), None);
        assert!(matches!(
            parse_decimal("price", Some("twelve")),
            Err(EtlError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("stock", Some("7")).unwrap(), Some(7));
        assert_eq!(parse_integer("stock", Some("50.0")).unwrap(), Some(50));
        assert_eq!(parse_integer("stock", None).unwrap(), None);
        assert!(parse_integer("stock", Some("2.5")).is_err());
        assert!(parse_integer("stock", Some("lots")).is_err());
    }
}
