//! Inferencia de columnas sin nombre
//!
//! `service_records` es un registro posicional sin tipos: las columnas
//! `unnamed_0 … unnamed_13` tienen un significado fijo por ordinal. Este módulo
//! es el único lugar que conoce ese contrato; el resto del pipeline trabaja
//! con los campos ya tipados.

use crate::models::legacy::{MaintenanceSheetRow, SERVICE_RECORD_COLUMNS};
use crate::utils::validation::{clean_text, is_all_digits, non_empty, parse_int_lenient};

/// Rol semántico de una columna posicional
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    VehicleDescription,
    VehicleNumber,
    Location,
    CurrentMileage,
    LastServiceMileage,
    NextServiceMileage,
    Unused,
    MilesUntilNextService,
    ServiceInterval,
    Notes,
}

/// Mapeo ordinal → rol para `service_records`
pub const SERVICE_RECORD_ROLES: [ColumnRole; SERVICE_RECORD_COLUMNS] = [
    ColumnRole::VehicleDescription,
    ColumnRole::VehicleNumber,
    ColumnRole::Location,
    ColumnRole::CurrentMileage,
    ColumnRole::LastServiceMileage,
    ColumnRole::NextServiceMileage,
    ColumnRole::Unused,
    ColumnRole::MilesUntilNextService,
    ColumnRole::ServiceInterval,
    ColumnRole::Notes,
    ColumnRole::Notes,
    ColumnRole::Notes,
    ColumnRole::Notes,
    ColumnRole::Notes,
];

/// Registro de servicio con sus campos tipados
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferredServiceRecord {
    pub description: Option<String>,
    /// Solo se rellena si la columna es puramente numérica
    pub vehicle_number: Option<i32>,
    pub vehicle_key: Option<String>,
    pub location: Option<String>,
    pub current_mileage: Option<i32>,
    pub last_service_mileage: Option<i32>,
    pub next_service_mileage: Option<i32>,
    pub miles_until_next_service: Option<i32>,
    pub service_interval: Option<i32>,
    pub notes: Vec<String>,
}

impl InferredServiceRecord {
    /// Descripción del trabajo compuesta a partir de los campos de la fila
    pub fn work_description(&self) -> String {
        let mut text = match &self.description {
            Some(desc) => format!("Vehicle: {}", desc),
            None => "Service Record Import".to_string(),
        };
        if let Some(next) = self.next_service_mileage {
            text.push_str(&format!(" - Next service at {} miles", next));
        }
        if let Some(remaining) = self.miles_until_next_service {
            text.push_str(&format!(" ({} miles until service)", remaining));
        }
        text
    }

    /// Columnas relevantes preservadas para reprocesar más adelante
    pub fn raw_data(&self) -> String {
        let show = |v: Option<i32>| v.map(|n| n.to_string()).unwrap_or_else(|| "N/A".to_string());
        let mut text = format!(
            "Last: {}, Next: {}, Interval: {}",
            show(self.last_service_mileage),
            show(self.next_service_mileage),
            show(self.service_interval)
        );
        if let Some(location) = &self.location {
            text.push_str(&format!(", Location: {}", location));
        }
        if !self.notes.is_empty() {
            text.push_str(&format!(", Notes: {}", self.notes.join(" | ")));
        }
        text
    }
}

/// Rol de un ordinal; más allá de la tabla todo es nota
pub fn role_of(ordinal: usize) -> ColumnRole {
    SERVICE_RECORD_ROLES
        .get(ordinal)
        .copied()
        .unwrap_or(ColumnRole::Notes)
}

/// Asignar roles y convertir cada valor. Un entero que no se puede leer
/// queda en `None` sin descartar la fila.
pub fn infer_service_record(columns: &[Option<String>]) -> InferredServiceRecord {
    let mut record = InferredServiceRecord::default();

    for (ordinal, value) in columns.iter().enumerate() {
        let Some(text) = non_empty(value.as_deref()) else {
            continue;
        };

        match role_of(ordinal) {
            ColumnRole::VehicleDescription => record.description = Some(text),
            ColumnRole::VehicleNumber => {
                if is_all_digits(&text) {
                    record.vehicle_number = text.parse().ok();
                    record.vehicle_key = Some(text);
                }
            }
            ColumnRole::Location => record.location = Some(text),
            ColumnRole::CurrentMileage => record.current_mileage = parse_int_lenient(&text),
            ColumnRole::LastServiceMileage => record.last_service_mileage = parse_int_lenient(&text),
            ColumnRole::NextServiceMileage => record.next_service_mileage = parse_int_lenient(&text),
            ColumnRole::Unused => {}
            ColumnRole::MilesUntilNextService => {
                record.miles_until_next_service = parse_int_lenient(&text)
            }
            ColumnRole::ServiceInterval => record.service_interval = parse_int_lenient(&text),
            ColumnRole::Notes => record.notes.push(text),
        }
    }

    record
}

/// Hoja de mantenimiento con su descripción compuesta
#[derive(Debug, Clone, PartialEq)]
pub struct InferredMaintenanceSheet {
    pub vehicle_key: Option<String>,
    pub description: Option<String>,
    pub details: Vec<String>,
}

impl InferredMaintenanceSheet {
    pub fn work_description(&self) -> String {
        let base = self
            .description
            .clone()
            .unwrap_or_else(|| "Maintenance Sheet Import".to_string());
        if self.details.is_empty() {
            base
        } else {
            format!("{} - {}", base, self.details.join(" "))
        }
    }
}

pub fn infer_maintenance_sheet(row: &MaintenanceSheetRow) -> InferredMaintenanceSheet {
    InferredMaintenanceSheet {
        vehicle_key: row.vehicle_id.as_deref().map(clean_text).filter(|v| !v.is_empty()),
        description: non_empty(row.description.as_deref()),
        details: row
            .extra
            .iter()
            .filter_map(|v| non_empty(v.as_deref()))
            .collect(),
    }
}
