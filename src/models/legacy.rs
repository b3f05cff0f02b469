//! Filas de las tablas legacy
//!
//! Las tablas legacy tienen tipos heterogéneos, por eso todas las columnas se
//! leen como texto (`::text`) y se convierten en Rust. Solo son entradas: el
//! pipeline nunca escribe en ellas.

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

/// Columnas posicionales de `service_records` (`unnamed_0 … unnamed_13`)
pub const SERVICE_RECORD_COLUMNS: usize = 14;

/// Columnas libres adicionales de `maintenance_sheets` (`unnamed_1 … unnamed_4`)
pub const MAINTENANCE_SHEET_EXTRA_COLUMNS: usize = 4;

/// Fila de la tabla legacy `buses`
#[derive(Debug, Clone, FromRow)]
pub struct LegacyBusRow {
    pub bus_id: Option<String>,
    pub model: Option<String>,
}

/// Fila de la tabla legacy `vehicles`
#[derive(Debug, Clone, FromRow)]
pub struct LegacyVehicleRow {
    pub vehicle_id: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub year: Option<String>,
    pub tire_size: Option<String>,
    pub license: Option<String>,
    pub serial_number: Option<String>,
    pub base: Option<String>,
}

/// Fila de `service_records` con sus columnas sin nombre
#[derive(Debug, Clone, Default)]
pub struct ServiceRecordRow {
    pub columns: [Option<String>; SERVICE_RECORD_COLUMNS],
    pub maintenance_date: Option<NaiveDate>,
    pub created_at: Option<NaiveDateTime>,
}

impl<'r> FromRow<'r, PgRow> for ServiceRecordRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let mut columns: [Option<String>; SERVICE_RECORD_COLUMNS] = Default::default();
        for (ordinal, slot) in columns.iter_mut().enumerate() {
            *slot = row.try_get(unnamed_column(ordinal).as_str())?;
        }

        Ok(Self {
            columns,
            maintenance_date: row.try_get("maintenance_date")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Fila de `maintenance_sheets`
#[derive(Debug, Clone, Default)]
pub struct MaintenanceSheetRow {
    pub vehicle_id: Option<String>,
    pub description: Option<String>,
    pub extra: [Option<String>; MAINTENANCE_SHEET_EXTRA_COLUMNS],
    pub created_at: Option<NaiveDateTime>,
}

impl<'r> FromRow<'r, PgRow> for MaintenanceSheetRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let mut extra: [Option<String>; MAINTENANCE_SHEET_EXTRA_COLUMNS] = Default::default();
        for (idx, slot) in extra.iter_mut().enumerate() {
            *slot = row.try_get(unnamed_column(idx + 1).as_str())?;
        }

        Ok(Self {
            vehicle_id: row.try_get("vehicle_id")?,
            description: row.try_get("description")?,
            extra,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Fila de las tablas legacy de kilometraje (`school_buses`, `agency_vehicles`),
/// ya con los nombres de columna unificados
#[derive(Debug, Clone, FromRow)]
pub struct LegacyMileageRow {
    pub report_month: Option<String>,
    pub report_year: Option<String>,
    pub bus_year: Option<String>,
    pub bus_make: Option<String>,
    pub license_plate: Option<String>,
    pub bus_id: Option<String>,
    pub located_at: Option<String>,
    pub beginning_miles: Option<String>,
    pub ending_miles: Option<String>,
    pub total_miles: Option<String>,
}

/// Nombre de la columna posicional `unnamed_<n>`
pub fn unnamed_column(ordinal: usize) -> String {
    format!("unnamed_{}", ordinal)
}
