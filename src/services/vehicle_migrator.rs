//! Consolidación de vehículos
//!
//! `buses` y `vehicles` → `fleet_vehicles`.

use crate::models::legacy::{LegacyBusRow, LegacyVehicleRow};
use crate::models::{NewFleetVehicle, NumberCollision, RowOutcome, SkipReason, SourceStats, VehicleType};
use crate::repositories::{fleet_vehicle_repository, ColumnSpec};
use crate::services::classifier::{classify, extract_make};
use crate::services::deduplicator::{self, VehicleMatch};
use crate::services::identifier_normalizer::{normalize, VehicleIdentifier};
use crate::services::migrator::LegacySource;
use crate::utils::errors::AppError;
use crate::utils::validation::{extract_model_year, non_empty, parse_optional_int, valid_model_year};
use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::warn;

const BUS_COLUMNS: &[ColumnSpec] = &[ColumnSpec::text("bus_id"), ColumnSpec::text("model")];

const VEHICLE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::text("vehicle_id"),
    ColumnSpec::text("model"),
    ColumnSpec::text("description"),
    ColumnSpec::text("year"),
    ColumnSpec::text("tire_size"),
    ColumnSpec::text("license"),
    ColumnSpec::text("serial_number"),
    ColumnSpec::text("base"),
];

/// Tabla legacy `buses`
pub struct BusesSource;

#[async_trait]
impl LegacySource for BusesSource {
    type Row = LegacyBusRow;

    fn table(&self) -> &'static str {
        "buses"
    }

    fn columns(&self) -> &'static [ColumnSpec] {
        BUS_COLUMNS
    }

    fn row_key(&self, row: &LegacyBusRow) -> String {
        row.bus_id.clone().unwrap_or_default()
    }

    async fn migrate_row(
        &self,
        conn: &mut PgConnection,
        row: &LegacyBusRow,
        stats: &mut SourceStats,
    ) -> Result<RowOutcome, AppError> {
        let Some(id) = non_empty(row.bus_id.as_deref()).as_deref().and_then(normalize) else {
            return Ok(RowOutcome::Skipped(SkipReason::MissingField("bus_id")));
        };

        let model = non_empty(row.model.as_deref());
        let model_text = model.clone().unwrap_or_default();

        let vehicle = NewFleetVehicle {
            vehicle_number: id.number,
            sheet_name: id.key.clone(),
            year: extract_model_year(&model_text),
            make: extract_make(&model_text).to_string(),
            description: Some(format!("Bus - {}", model_text)),
            model,
            serial_number: None,
            license: id.key.clone(),
            location: None,
            tire_size: None,
            vehicle_type: VehicleType::Bus,
        };

        register_vehicle(conn, self.table(), &id, &vehicle, stats).await
    }
}

/// Tabla legacy `vehicles`
pub struct VehiclesSource;

#[async_trait]
impl LegacySource for VehiclesSource {
    type Row = LegacyVehicleRow;

    fn table(&self) -> &'static str {
        "vehicles"
    }

    fn columns(&self) -> &'static [ColumnSpec] {
        VEHICLE_COLUMNS
    }

    fn row_key(&self, row: &LegacyVehicleRow) -> String {
        row.vehicle_id.clone().unwrap_or_default()
    }

    async fn migrate_row(
        &self,
        conn: &mut PgConnection,
        row: &LegacyVehicleRow,
        stats: &mut SourceStats,
    ) -> Result<RowOutcome, AppError> {
        let Some(id) = non_empty(row.vehicle_id.as_deref()).as_deref().and_then(normalize) else {
            return Ok(RowOutcome::Skipped(SkipReason::MissingField("vehicle_id")));
        };

        let model = non_empty(row.model.as_deref());
        let description = non_empty(row.description.as_deref());
        let model_text = model.clone().unwrap_or_default();
        let description_text = description.clone().unwrap_or_default();

        let year = parse_optional_int(row.year.as_deref())
            .and_then(valid_model_year)
            .or_else(|| extract_model_year(&model_text))
            .or_else(|| extract_model_year(&description_text));

        let vehicle = NewFleetVehicle {
            vehicle_number: id.number,
            sheet_name: id.key.clone(),
            year,
            make: extract_make(&model_text).to_string(),
            vehicle_type: classify(&model_text, &description_text),
            model,
            description,
            serial_number: non_empty(row.serial_number.as_deref()),
            license: non_empty(row.license.as_deref()).unwrap_or_else(|| id.key.clone()),
            location: non_empty(row.base.as_deref()),
            tire_size: non_empty(row.tire_size.as_deref()),
        };

        register_vehicle(conn, self.table(), &id, &vehicle, stats).await
    }
}

/// Deduplicar e insertar un vehículo.
///
/// Si solo coincide el número (la licencia existente es otra) el vehículo
/// entrante no se inserta y la colisión queda registrada en `stats`.
pub async fn register_vehicle(
    conn: &mut PgConnection,
    source: &str,
    id: &VehicleIdentifier,
    vehicle: &NewFleetVehicle,
    stats: &mut SourceStats,
) -> Result<RowOutcome, AppError> {
    match deduplicator::find_vehicle(&mut *conn, vehicle.vehicle_number, &vehicle.license).await? {
        Some(VehicleMatch::License) => Ok(RowOutcome::Skipped(SkipReason::Duplicate(format!(
            "license '{}'",
            vehicle.license
        )))),
        Some(VehicleMatch::Number { existing_license }) => {
            let collision = NumberCollision {
                source: source.to_string(),
                incoming_key: id.key.clone(),
                vehicle_number: vehicle.vehicle_number,
                existing_license,
                synthetic: id.synthetic,
            };
            warn!("⚠️ Colisión de número de vehículo: {}", collision);
            stats.collisions.push(collision);
            Ok(RowOutcome::Skipped(SkipReason::Duplicate(format!(
                "vehicle #{}",
                vehicle.vehicle_number
            ))))
        }
        None => {
            fleet_vehicle_repository::insert(&mut *conn, vehicle).await?;
            Ok(RowOutcome::Imported(format!(
                "#{} {} ({})",
                vehicle.vehicle_number, vehicle.make, vehicle.vehicle_type
            )))
        }
    }
}
