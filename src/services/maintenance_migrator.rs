//! Consolidación de mantenimiento
//!
//! `service_records` y `maintenance_sheets` → `maintenance_records`. Antes de
//! insertar un registro se garantiza que su vehículo exista en
//! `fleet_vehicles`, así no quedan registros huérfanos.

use crate::models::legacy::{MaintenanceSheetRow, ServiceRecordRow};
use crate::models::{NewFleetVehicle, NewMaintenanceRecord, RowOutcome, SkipReason, SourceStats};
use crate::repositories::{fleet_vehicle_repository, maintenance_repository, ColumnSpec};
use crate::services::classifier::{classify, extract_make};
use crate::services::column_inferrer::{infer_maintenance_sheet, infer_service_record};
use crate::services::deduplicator;
use crate::services::identifier_normalizer::{normalize, VehicleIdentifier};
use crate::services::migrator::LegacySource;
use crate::services::vehicle_migrator::register_vehicle;
use crate::utils::errors::AppError;
use crate::utils::validation::extract_model_year;
use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::{debug, info};

const SERVICE_RECORD_SELECT: &[ColumnSpec] = &[
    ColumnSpec::text("unnamed_0"),
    ColumnSpec::text("unnamed_1"),
    ColumnSpec::text("unnamed_2"),
    ColumnSpec::text("unnamed_3"),
    ColumnSpec::text("unnamed_4"),
    ColumnSpec::text("unnamed_5"),
    ColumnSpec::text("unnamed_6"),
    ColumnSpec::text("unnamed_7"),
    ColumnSpec::text("unnamed_8"),
    ColumnSpec::text("unnamed_9"),
    ColumnSpec::text("unnamed_10"),
    ColumnSpec::text("unnamed_11"),
    ColumnSpec::text("unnamed_12"),
    ColumnSpec::text("unnamed_13"),
    ColumnSpec::typed("maintenance_date", "date"),
    ColumnSpec::typed("created_at", "timestamp"),
];

const MAINTENANCE_SHEET_SELECT: &[ColumnSpec] = &[
    ColumnSpec::text("vehicle_id"),
    ColumnSpec::text("description"),
    ColumnSpec::text("unnamed_1"),
    ColumnSpec::text("unnamed_2"),
    ColumnSpec::text("unnamed_3"),
    ColumnSpec::text("unnamed_4"),
    ColumnSpec::typed("created_at", "timestamp"),
];

/// Tabla legacy `service_records` (columnas posicionales)
pub struct ServiceRecordsSource;

#[async_trait]
impl LegacySource for ServiceRecordsSource {
    type Row = ServiceRecordRow;

    fn table(&self) -> &'static str {
        "service_records"
    }

    fn columns(&self) -> &'static [ColumnSpec] {
        SERVICE_RECORD_SELECT
    }

    fn row_key(&self, row: &ServiceRecordRow) -> String {
        row.columns[1].clone().unwrap_or_default()
    }

    async fn migrate_row(
        &self,
        conn: &mut PgConnection,
        row: &ServiceRecordRow,
        stats: &mut SourceStats,
    ) -> Result<RowOutcome, AppError> {
        let inferred = infer_service_record(&row.columns);

        let Some(id) = inferred.vehicle_key.as_deref().and_then(normalize) else {
            return Ok(RowOutcome::Skipped(SkipReason::MissingField("vehicle number")));
        };
        let Some(service_date) = row
            .maintenance_date
            .or_else(|| row.created_at.map(|t| t.date()))
        else {
            return Ok(RowOutcome::Skipped(SkipReason::MissingField("service date")));
        };

        let vehicle_number = ensure_vehicle(
            &mut *conn,
            self.table(),
            &id,
            inferred.description.as_deref(),
            inferred.location.clone(),
            stats,
        )
        .await?;

        let record = NewMaintenanceRecord {
            vehicle_number,
            vehicle_id: id.key.clone(),
            service_date,
            mileage: inferred.current_mileage,
            po_number: None,
            cost: None,
            work_description: inferred.work_description(),
            raw_data: Some(inferred.raw_data()),
            source_created_at: row.created_at,
        };
        if deduplicator::maintenance_exists(&mut *conn, &record).await? {
            return Ok(duplicate(&record));
        }
        maintenance_repository::insert(&mut *conn, &record).await?;

        Ok(RowOutcome::Imported(format!("#{} {}", vehicle_number, service_date)))
    }
}

/// Tabla legacy `maintenance_sheets`
pub struct MaintenanceSheetsSource;

#[async_trait]
impl LegacySource for MaintenanceSheetsSource {
    type Row = MaintenanceSheetRow;

    fn table(&self) -> &'static str {
        "maintenance_sheets"
    }

    fn columns(&self) -> &'static [ColumnSpec] {
        MAINTENANCE_SHEET_SELECT
    }

    fn row_key(&self, row: &MaintenanceSheetRow) -> String {
        row.vehicle_id.clone().unwrap_or_default()
    }

    async fn migrate_row(
        &self,
        conn: &mut PgConnection,
        row: &MaintenanceSheetRow,
        stats: &mut SourceStats,
    ) -> Result<RowOutcome, AppError> {
        let sheet = infer_maintenance_sheet(row);

        let Some(id) = sheet.vehicle_key.as_deref().and_then(normalize) else {
            return Ok(RowOutcome::Skipped(SkipReason::MissingField("vehicle_id")));
        };
        if sheet.details.is_empty() {
            return Ok(RowOutcome::Skipped(SkipReason::MissingField("maintenance details")));
        }
        let Some(service_date) = row.created_at.map(|t| t.date()) else {
            return Ok(RowOutcome::Skipped(SkipReason::MissingField("created_at")));
        };

        let vehicle_number =
            ensure_vehicle(&mut *conn, self.table(), &id, sheet.description.as_deref(), None, stats)
                .await?;

        let record = NewMaintenanceRecord {
            vehicle_number,
            vehicle_id: id.key.clone(),
            service_date,
            mileage: None,
            po_number: None,
            cost: None,
            work_description: sheet.work_description(),
            raw_data: None,
            source_created_at: row.created_at,
        };
        if deduplicator::maintenance_exists(&mut *conn, &record).await? {
            return Ok(duplicate(&record));
        }
        maintenance_repository::insert(&mut *conn, &record).await?;

        Ok(RowOutcome::Imported(format!("#{} {}", vehicle_number, service_date)))
    }
}

fn duplicate(record: &NewMaintenanceRecord) -> RowOutcome {
    RowOutcome::Skipped(SkipReason::Duplicate(format!(
        "#{} on {} at {} miles",
        record.vehicle_number,
        record.service_date,
        record
            .mileage
            .map(|m| m.to_string())
            .unwrap_or_else(|| "?".to_string())
    )))
}

/// Resolver el vehículo de un registro de mantenimiento.
///
/// Devuelve el `vehicle_number` al que se adjunta el registro: el propio
/// número si ya existe, el del vehículo con esa licencia, o uno recién
/// registrado. Nunca devuelve un número ausente de `fleet_vehicles`.
pub async fn ensure_vehicle(
    conn: &mut PgConnection,
    source: &str,
    id: &VehicleIdentifier,
    description: Option<&str>,
    location: Option<String>,
    stats: &mut SourceStats,
) -> Result<i32, AppError> {
    if fleet_vehicle_repository::number_exists(&mut *conn, id.number).await? {
        return Ok(id.number);
    }
    if let Some(number) = fleet_vehicle_repository::number_for_license(&mut *conn, &id.key).await? {
        debug!("🔗 '{}' adjuntado al vehículo #{} por licencia", id.key, number);
        return Ok(number);
    }

    let text = description.unwrap_or_default();
    let vehicle = NewFleetVehicle {
        vehicle_number: id.number,
        sheet_name: id.key.clone(),
        year: extract_model_year(text),
        make: extract_make(text).to_string(),
        model: None,
        description: description.map(str::to_string),
        serial_number: None,
        license: id.key.clone(),
        location,
        tire_size: None,
        vehicle_type: classify("", text),
    };

    let outcome = register_vehicle(conn, source, id, &vehicle, stats).await?;
    if matches!(outcome, RowOutcome::Imported(_)) {
        info!("🆕 Vehículo #{} registrado desde {}", id.number, source);
    }
    Ok(id.number)
}
