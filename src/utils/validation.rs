//! Utilidades de validación
//!
//! Funciones helper para limpiar texto de hojas de cálculo y tablas legacy
//! y convertirlo a tipos.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref STRIKETHROUGH: Regex = Regex::new(r"~~(.+?)~~").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref MODEL_YEAR: Regex = Regex::new(r"\b(19[5-9]\d|20\d{2})\b").unwrap();
}

/// Limpiar una celda: quita `#REF!`, marcas de tachado `~~x~~` y colapsa espacios
pub fn clean_text(value: &str) -> String {
    let without_ref = value.replace("#REF!", "");
    let without_strike = STRIKETHROUGH.replace_all(&without_ref, "$1");
    WHITESPACE
        .replace_all(without_strike.trim(), " ")
        .into_owned()
}

/// Devuelve `None` si el valor está vacío después de limpiar
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(clean_text).filter(|v| !v.is_empty())
}

/// Entero tolerante: quita comas y trunca en el punto decimal.
/// `"10,000"` → 10000, `"1500.75"` → 1500, `"-1500"` → -1500.
pub fn parse_int_lenient(value: &str) -> Option<i32> {
    let cleaned = clean_text(value).replace(',', "");
    let integer_part = match cleaned.find('.') {
        Some(idx) => &cleaned[..idx],
        None => cleaned.as_str(),
    };
    let integer_part = integer_part.trim();
    if integer_part.is_empty() || integer_part == "-" {
        return None;
    }
    integer_part.parse::<i32>().ok()
}

/// Variante sobre `Option`
pub fn parse_optional_int(value: Option<&str>) -> Option<i32> {
    value.and_then(parse_int_lenient)
}

/// `true` si el valor (sin espacios alrededor) es solo dígitos ASCII
pub fn is_all_digits(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
}

/// Año de modelo plausible para un vehículo
pub fn valid_model_year(year: i32) -> Option<i32> {
    (1900 < year && year < 2100).then_some(year)
}

/// Primer año de modelo dentro de un texto libre (`"2012 CHEVY IMPALA"` → 2012)
pub fn extract_model_year(text: &str) -> Option<i32> {
    MODEL_YEAR
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  ~~BUS 12~~   DEPOT "), "BUS 12 DEPOT");
        assert_eq!(clean_text("#REF!"), "");
        assert_eq!(clean_text("North\t\tGarage"), "North Garage");
    }

    #[test]
    fn test_parse_int_lenient() {
        assert_eq!(parse_int_lenient("10,000"), Some(10000));
        assert_eq!(parse_int_lenient("1500.75"), Some(1500));
        assert_eq!(parse_int_lenient("-1500"), Some(-1500));
        assert_eq!(parse_int_lenient(" 48,120 "), Some(48120));
        assert_eq!(parse_int_lenient(""), None);
        assert_eq!(parse_int_lenient("n/a"), None);
        assert_eq!(parse_int_lenient("#REF!"), None);
    }

    #[test]
    fn test_is_all_digits() {
        assert!(is_all_digits("12"));
        assert!(is_all_digits(" 012 "));
        assert!(!is_all_digits("12A"));
        assert!(!is_all_digits(""));
        assert!(!is_all_digits("1,200"));
    }

    #[test]
    fn test_model_year_helpers() {
        assert_eq!(extract_model_year("2012 CHEVY IMPALA"), Some(2012));
        assert_eq!(extract_model_year("2015 Bluebird Vision"), Some(2015));
        assert_eq!(extract_model_year("Ford Transit Van"), None);
        assert_eq!(valid_model_year(2019), Some(2019));
        assert_eq!(valid_model_year(24), None);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(Some(" DEPOT ")), Some("DEPOT".to_string()));
        assert_eq!(non_empty(None), None);
    }
}
