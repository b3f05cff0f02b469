//! Lectura de hojas mensuales de kilometraje
//!
//! Lógica pura sobre texto: nombres de hoja → (mes, año) y filas de celdas →
//! reportes mensuales. La apertura del libro vive en `mileage_importer`.

use crate::models::NewMileageReport;
use crate::services::identifier_normalizer::canonical_bus_id;
use crate::utils::validation::{clean_text, non_empty, parse_int_lenient, valid_model_year};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ALPHA_TOKEN: Regex = Regex::new(r"[A-Za-z]+").unwrap();
    static ref DIGIT_TOKEN: Regex = Regex::new(r"\d+").unwrap();
}

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Año por defecto cuando el nombre de la hoja no trae uno
pub const DEFAULT_REPORT_YEAR: i32 = 2024;

/// Hoja auxiliar que nunca contiene reportes
pub const SLOTS_SHEET: &str = "slots";

const SCHOOL_BUS_MARKER: &str = "SCHOOL BUS";
const AGENCY_VEHICLE_MARKER: &str = "AGENCY VEHICLE";

/// Columna del id de bus; decide si una fila es de datos
const BUS_ID_COLUMN: usize = 3;

/// Mes y año de una hoja
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPeriod {
    pub month: String,
    pub year: i32,
}

/// Nombre completo del mes para un prefijo de al menos tres letras
/// (`"sept"` → `"September"`)
pub fn month_name(token: &str) -> Option<&'static str> {
    let lower = token.trim().to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .find(|m| m.to_lowercase().starts_with(&lower))
        .copied()
}

/// `"Sept 24"` → September 2024, `"August 2025"` → August 2025.
/// Sin mes reconocible devuelve `None`.
pub fn parse_sheet_name(name: &str) -> Option<SheetPeriod> {
    let month = ALPHA_TOKEN
        .find_iter(name)
        .find_map(|token| month_name(token.as_str()))?;

    let digits: Vec<&str> = DIGIT_TOKEN.find_iter(name).map(|m| m.as_str()).collect();
    let four_digit = digits
        .iter()
        .filter(|d| d.len() == 4 && d.starts_with("20"))
        .find_map(|d| d.parse::<i32>().ok());
    let two_digit = digits
        .iter()
        .filter(|d| d.len() == 2)
        .filter_map(|d| d.parse::<i32>().ok())
        .find(|y| (20..=30).contains(y))
        .map(|y| 2000 + y);

    Some(SheetPeriod {
        month: month.to_string(),
        year: four_digit.or(two_digit).unwrap_or(DEFAULT_REPORT_YEAR),
    })
}

/// Recorre las filas de una hoja con el indicador de sección de buses.
#[derive(Debug, Default)]
pub struct SheetRowParser {
    in_bus_section: bool,
}

impl SheetRowParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Procesa una fila. Devuelve un reporte solo para filas de datos
    /// dentro de la sección de buses.
    pub fn feed(&mut self, period: &SheetPeriod, cells: &[String]) -> Option<NewMileageReport> {
        if self.update_section(cells) {
            return None;
        }
        if !self.in_bus_section {
            return None;
        }

        let cell = |idx: usize| cells.get(idx).map(|c| clean_text(c)).unwrap_or_default();

        let raw_bus_id = cell(BUS_ID_COLUMN);
        if raw_bus_id.is_empty() || raw_bus_id.eq_ignore_ascii_case("id") {
            return None;
        }

        let mut report = NewMileageReport {
            report_month: period.month.clone(),
            report_year: period.year,
            bus_year: parse_int_lenient(&cell(0)).and_then(valid_model_year),
            bus_make: non_empty(Some(cell(1).as_str())),
            license_plate: non_empty(Some(cell(2).as_str())),
            bus_id: canonical_bus_id(&raw_bus_id),
            located_at: non_empty(Some(cell(4).as_str())),
            beginning_miles: parse_int_lenient(&cell(5)),
            ending_miles: parse_int_lenient(&cell(6)),
            total_miles: parse_int_lenient(&cell(7)),
        };
        report.repair_totals();
        Some(report)
    }

    /// Abre o cierra la sección; devuelve `true` si la fila era un marcador.
    /// Una fila con id de bus es de datos aunque su texto contenga un marcador.
    fn update_section(&mut self, cells: &[String]) -> bool {
        let has_bus_id = cells
            .get(BUS_ID_COLUMN)
            .is_some_and(|c| !clean_text(c).is_empty());
        if has_bus_id {
            return false;
        }

        let upper: Vec<String> = cells.iter().map(|c| c.to_uppercase()).collect();
        if upper.iter().any(|c| c.contains(AGENCY_VEHICLE_MARKER)) {
            self.in_bus_section = false;
            return true;
        }
        if upper.iter().any(|c| c.contains(SCHOOL_BUS_MARKER)) {
            self.in_bus_section = true;
            return true;
        }
        false
    }
}

/// Todas las filas de datos de una hoja
pub fn parse_sheet_rows<I>(period: &SheetPeriod, rows: I) -> Vec<NewMileageReport>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut parser = SheetRowParser::new();
    rows.into_iter()
        .filter_map(|cells| parser.feed(period, &cells))
        .collect()
}
