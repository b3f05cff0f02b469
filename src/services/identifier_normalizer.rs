//! Normalizador de identificadores
//!
//! Convierte identificadores libres (`"Bus-24"`, `"BUS24"`, `"24,000"`) en un
//! par (número de vehículo, clave canónica). Si el texto no tiene un número
//! utilizable se deriva un número sintético estable a partir de un hash.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DIGIT_RUN: Regex = Regex::new(r"\d+").unwrap();
}

/// Rango válido de números de vehículo
pub const MIN_VEHICLE_NUMBER: i32 = 1;
pub const MAX_VEHICLE_NUMBER: i32 = 9999;

/// Identificador normalizado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleIdentifier {
    pub number: i32,
    pub key: String,
    /// `true` si el número viene del hash y no del texto
    pub synthetic: bool,
}

/// Normalizar un identificador libre.
///
/// Devuelve `None` para texto vacío o solo puntuación: el llamador debe
/// saltar la fila.
pub fn normalize(raw: &str) -> Option<VehicleIdentifier> {
    let key = raw.trim();
    if !key.chars().any(char::is_alphanumeric) {
        return None;
    }

    if let Some(number) = leading_number(key) {
        return Some(VehicleIdentifier {
            number,
            key: key.to_string(),
            synthetic: false,
        });
    }

    Some(VehicleIdentifier {
        number: synthetic_number(key),
        key: key.to_string(),
        synthetic: true,
    })
}

/// Primera secuencia de dígitos, si cae en el rango de números de vehículo
fn leading_number(key: &str) -> Option<i32> {
    DIGIT_RUN
        .find(key)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .filter(|n| (MIN_VEHICLE_NUMBER..=MAX_VEHICLE_NUMBER).contains(n))
}

/// Número sintético estable en [1000, 9999]: `h = h*31 + codepoint`
pub fn synthetic_number(key: &str) -> i32 {
    let hash = key
        .chars()
        .fold(0i64, |h, c| h.wrapping_mul(31).wrapping_add(c as i64));
    (hash.unsigned_abs() % 9000) as i32 + 1000
}

/// Id de bus limpio: sin prefijo `BUS` ni comas
pub fn clean_bus_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_prefix = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("BUS") => &trimmed[3..],
        _ => trimmed,
    };
    without_prefix
        .trim_start_matches(|c: char| c == '-' || c == '#' || c.is_whitespace())
        .replace(',', "")
}

/// Id de bus canónico para reportes de kilometraje: los ids numéricos
/// llevan el prefijo `BUS` (`"24"` → `"BUS24"`, `"Bus 24"` → `"BUS24"`)
pub fn canonical_bus_id(raw: &str) -> String {
    let cleaned = clean_bus_id(raw);
    if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) {
        format!("BUS{}", cleaned)
    } else {
        raw.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_first_digit_run() {
        let id = normalize("Bus-24").unwrap();
        assert_eq!(id.number, 24);
        assert_eq!(id.key, "Bus-24");
        assert!(!id.synthetic);

        assert_eq!(normalize("BUS24").unwrap().number, 24);
        assert_eq!(normalize("24,000").unwrap().number, 24);
        assert_eq!(normalize("  VAN-7 ").unwrap().key, "VAN-7");
    }

    #[test]
    fn test_empty_and_punctuation_are_rejected() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   "), None);
        assert_eq!(normalize("--/#"), None);
    }

    #[test]
    fn test_synthetic_fallback() {
        let id = normalize("SPARE").unwrap();
        assert!(id.synthetic);
        assert!((1000..=9999).contains(&id.number));
        // cero y números fuera de rango también usan el hash
        assert!(normalize("Bus-0").unwrap().synthetic);
        assert!(normalize("123456").unwrap().synthetic);
    }

    #[test]
    fn test_totality_and_determinism() {
        let samples = [
            "Bus-24", "SPARE", "Activity Van", "x", "ÑANDÚ", "0", "99999999999999999999",
            "Truck #3", "🚌", "a-very-long-identifier-with-no-digits-at-all-just-text",
        ];
        for sample in samples {
            let first = normalize(sample);
            let second = normalize(sample);
            assert_eq!(first, second);
            if let Some(id) = first {
                assert!(
                    (MIN_VEHICLE_NUMBER..=MAX_VEHICLE_NUMBER).contains(&id.number),
                    "{} -> {}",
                    sample,
                    id.number
                );
            }
        }
    }

    #[test]
    fn test_synthetic_number_is_known_value() {
        // "AB" = 65*31 + 66 = 2081 → 2081 % 9000 + 1000
        assert_eq!(synthetic_number("AB"), 3081);
    }

    #[test]
    fn test_bus_id_helpers() {
        assert_eq!(clean_bus_id("BUS24"), "24");
        assert_eq!(clean_bus_id("Bus-1,024"), "1024");
        assert_eq!(canonical_bus_id("24"), "BUS24");
        assert_eq!(canonical_bus_id("BUS 24"), "BUS24");
        assert_eq!(canonical_bus_id("SPARE-A"), "SPARE-A");
    }
}
