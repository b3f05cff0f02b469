//! Clasificador de vehículos
//!
//! Asigna un tipo de vehículo a partir del modelo y la descripción usando una
//! escalera ordenada de palabras clave. El orden importa: "school bus" debe
//! caer en `bus` antes de que "suburban" lo convierta en `suv`.

use crate::models::fleet_vehicle::VehicleType;

/// Escalera de clasificación, evaluada en orden
pub const TYPE_LADDER: &[(&[&str], VehicleType)] = &[
    (&["bus"], VehicleType::Bus),
    (&["van"], VehicleType::Van),
    (&["truck"], VehicleType::Truck),
    (&["impala", "sedan", "car"], VehicleType::Car),
    (&["suburban", "tahoe", "suv"], VehicleType::Suv),
];

/// Marcas conocidas: (texto a buscar en mayúsculas, nombre canónico)
const KNOWN_MAKES: &[(&str, &str)] = &[
    ("FORD", "Ford"),
    ("CHEVROLET", "Chevrolet"),
    ("CHEVY", "Chevrolet"),
    ("GMC", "GMC"),
    ("DODGE", "Dodge"),
    ("TOYOTA", "Toyota"),
    ("HONDA", "Honda"),
    ("NISSAN", "Nissan"),
    ("FREIGHTLINER", "Freightliner"),
    ("INTERNATIONAL", "International"),
    ("BLUEBIRD", "Bluebird"),
    ("THOMAS", "Thomas"),
];

pub const UNKNOWN_MAKE: &str = "Unknown";

/// Clasificar un vehículo. Solo depende de los textos de entrada.
pub fn classify(model: &str, description: &str) -> VehicleType {
    let combined = format!("{} {}", model, description).to_lowercase();

    TYPE_LADDER
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| combined.contains(k)))
        .map(|(_, vehicle_type)| *vehicle_type)
        .unwrap_or(VehicleType::Other)
}

/// Extraer la marca del texto del modelo
pub fn extract_make(model: &str) -> &'static str {
    let upper = model.to_uppercase();
    KNOWN_MAKES
        .iter()
        .find(|(needle, _)| upper.contains(needle))
        .map(|(_, make)| *make)
        .unwrap_or(UNKNOWN_MAKE)
}

/// La misma escalera como expresión SQL `CASE`, para el relleno de tipos
/// en la base de datos. Las columnas pueden ser NULL.
pub fn sql_case_expression(model_column: &str, description_column: &str) -> String {
    let combined = format!(
        "LOWER(COALESCE({}, '') || ' ' || COALESCE({}, ''))",
        model_column, description_column
    );

    let mut sql = String::from("CASE");
    for (keywords, vehicle_type) in TYPE_LADDER {
        let conditions = keywords
            .iter()
            .map(|k| format!("{} LIKE '%{}%'", combined, k))
            .collect::<Vec<_>>()
            .join(" OR ");
        sql.push_str(&format!(" WHEN {} THEN '{}'", conditions, vehicle_type.as_str()));
    }
    sql.push_str(&format!(" ELSE '{}' END", VehicleType::Other.as_str()));
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_priority() {
        assert_eq!(classify("School Bus Suburban Edition", ""), VehicleType::Bus);
        assert_eq!(classify("Ford Transit Van", ""), VehicleType::Van);
        assert_eq!(classify("F-250", "Maintenance Truck"), VehicleType::Truck);
        assert_eq!(classify("2012 CHEVY IMPALA", ""), VehicleType::Car);
        assert_eq!(classify("Chevrolet Tahoe", ""), VehicleType::Suv);
        assert_eq!(classify("", ""), VehicleType::Other);
        assert_eq!(classify("Kubota Mower", "grounds"), VehicleType::Other);
    }

    #[test]
    fn test_substring_matching_is_literal() {
        // "caravan" contiene "van" antes que "car" en la escalera
        assert_eq!(classify("Dodge Caravan", ""), VehicleType::Van);
        // la descripción también cuenta
        assert_eq!(classify("Silverado", "Pickup truck"), VehicleType::Truck);
    }

    #[test]
    fn test_classifier_closure() {
        let inputs = [
            ("", ""),
            ("BUS", "van"),
            ("???", "!!!"),
            ("Freightliner M2", "Activity"),
            ("Ñandú", "Über sedan"),
        ];
        for (model, description) in inputs {
            let t = classify(model, description);
            assert!(VehicleType::ALL.contains(&t));
        }
    }

    #[test]
    fn test_extract_make() {
        assert_eq!(extract_make("2015 Bluebird Vision"), "Bluebird");
        assert_eq!(extract_make("2012 CHEVY IMPALA"), "Chevrolet");
        assert_eq!(extract_make("chevrolet tahoe"), "Chevrolet");
        assert_eq!(extract_make("Ford Transit Van"), "Ford");
        assert_eq!(extract_make("gmc savana"), "GMC");
        assert_eq!(extract_make("Mystery Machine"), UNKNOWN_MAKE);
    }

    #[test]
    fn test_sql_case_expression_follows_ladder() {
        let sql = sql_case_expression("model", "description");
        assert!(sql.starts_with("CASE WHEN"));
        assert!(sql.ends_with("ELSE 'other' END"));
        let bus = sql.find("THEN 'bus'").unwrap();
        let suv = sql.find("THEN 'suv'").unwrap();
        assert!(bus < suv);
        assert!(sql.contains("LIKE '%impala%'"));
    }
}
