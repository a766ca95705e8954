//! Currency amount parsing and display formatting.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::record::valid_amount;

/// `¥5,106` / `￥ 5106`
pub(crate) static YEN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[¥￥]\s*(\d[\d,]*)").expect("Invalid yen symbol regex"));

/// `5,106 JPY` / `5106円` / `5,106 yen`
pub(crate) static YEN_UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d,]*)\s*(?:JPY|yen|円)").expect("Invalid yen unit regex")
});

/// Parse a yen amount written with comma grouping ("5,106" → 5106)
pub fn parse_yen_number(s: &str) -> Option<f64> {
    let digits: String = s.trim().chars().filter(|c| *c != ',').collect();
    let value = digits.parse::<f64>().ok()?;
    valid_amount(value).then_some(value)
}

/// Parse the first symbol-prefixed or unit-suffixed yen amount in a text
pub fn parse_yen_text(text: &str) -> Option<f64> {
    [&*YEN_SYMBOL_RE, &*YEN_UNIT_RE]
        .iter()
        .filter_map(|re| re.captures(text))
        .find_map(|caps| parse_yen_number(&caps[1]))
}

/// Parse a euro amount whose decimal separator may be a comma or a period.
///
/// With both present the later one is the decimal separator. A lone comma is
/// decimal. Otherwise the period is decimal and commas are grouping.
pub fn parse_euro_number(s: &str) -> Option<f64> {
    let s = s
        .trim()
        .trim_end_matches(|c: char| c == '.' || c == ',')
        .replace([' ', '\u{a0}'], "");
    if s.is_empty() {
        return None;
    }

    let normalized = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(period)) if comma > period => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        _ => s.replace(',', ""),
    };

    let value = normalized.parse::<f64>().ok()?;
    valid_amount(value).then_some(value)
}

/// Format a yen amount as `¥5,106`
pub fn format_yen(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("¥{}", group_digits(v.round().abs() as u64, ',')),
        None => "—".to_string(),
    }
}

/// Format a euro amount as `€1.234,56` (two decimals, Italian grouping)
pub fn format_eur(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => {
            let cents = (v.abs() * 100.0).round() as u64;
            format!("€{},{:02}", group_digits(cents / 100, '.'), cents % 100)
        }
        None => "—".to_string(),
    }
}

fn group_digits(n: u64, sep: char) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euro_separator_conventions() {
        assert_eq!(parse_euro_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_euro_number("1,234.56"), Some(1234.56));
        assert_eq!(parse_euro_number("28.07"), Some(28.07));
        assert_eq!(parse_euro_number("28,07"), Some(28.07));
        assert_eq!(parse_euro_number("1,234,567.5"), Some(1234567.5));
        assert_eq!(parse_euro_number("28.07."), Some(28.07));
    }

    #[test]
    fn test_euro_rejects_non_positive() {
        assert_eq!(parse_euro_number("0,00"), None);
        assert_eq!(parse_euro_number(""), None);
        assert_eq!(parse_euro_number("abc"), None);
    }

    #[test]
    fn test_yen_number() {
        assert_eq!(parse_yen_number("5,106"), Some(5106.0));
        assert_eq!(parse_yen_number("0"), None);
        assert_eq!(parse_yen_number(""), None);
    }

    #[test]
    fn test_yen_text_forms() {
        assert_eq!(parse_yen_text("¥5,106"), Some(5106.0));
        assert_eq!(parse_yen_text("￥ 880 (tax incl.)"), Some(880.0));
        assert_eq!(parse_yen_text("5,106JPY"), Some(5106.0));
        assert_eq!(parse_yen_text("1,200 円"), Some(1200.0));
        assert_eq!(parse_yen_text("no price here"), None);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_yen(Some(5106.0)), "¥5,106");
        assert_eq!(format_yen(Some(999.6)), "¥1,000");
        assert_eq!(format_yen(None), "—");
        assert_eq!(format_eur(Some(1234.5)), "€1.234,50");
        assert_eq!(format_eur(Some(28.07)), "€28,07");
        assert_eq!(format_eur(Some(1_234_567.891)), "€1.234.567,89");
        assert_eq!(format_eur(None), "—");
    }
}
