//! Deduplicador por clave natural
//!
//! Cada tabla canónica tiene su clave natural. La búsqueda se hace con una
//! consulta previa a la inserción dentro de la transacción de la fuente, nunca
//! con restricciones únicas: un conflicto no debe abortar la transacción.

use crate::models::{NewMaintenanceRecord, NewMileageReport};
use crate::repositories::mileage_repository;
use crate::utils::errors::AppError;
use sqlx::PgConnection;

/// Ventana de kilometraje (inclusiva) para registros del mismo día
pub const MILEAGE_WINDOW: i32 = 100;

/// Cómo coincidió un vehículo entrante con uno existente
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VehicleMatch {
    /// Misma licencia: es el mismo vehículo
    License,
    /// Solo coincide el número; la licencia existente es otra
    Number { existing_license: Option<String> },
}

/// Resultado del upsert mensual
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Clave de `fleet_vehicles`: `vehicle_number` o `license`.
/// Una coincidencia por licencia tiene prioridad sobre una por número.
pub async fn find_vehicle(
    conn: &mut PgConnection,
    vehicle_number: i32,
    license: &str,
) -> Result<Option<VehicleMatch>, AppError> {
    let found = sqlx::query_as::<_, (bool, Option<String>)>(
        r#"
        SELECT COALESCE(license = $2, false) AS by_license, license
        FROM fleet_vehicles
        WHERE vehicle_number = $1 OR license = $2
        ORDER BY COALESCE(license = $2, false) DESC
        LIMIT 1
        "#,
    )
    .bind(vehicle_number)
    .bind(license)
    .fetch_optional(conn)
    .await?;

    Ok(found.map(|(by_license, existing_license)| {
        if by_license {
            VehicleMatch::License
        } else {
            VehicleMatch::Number { existing_license }
        }
    }))
}

/// Clave de `maintenance_records`: mismo vehículo, misma fecha efectiva y
/// kilometraje dentro de ±100 (un kilometraje ausente cuenta como 0). Sin
/// kilometraje entrante también debe coincidir `work_description`.
pub async fn maintenance_exists(
    conn: &mut PgConnection,
    record: &NewMaintenanceRecord,
) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM maintenance_records
            WHERE vehicle_number = $1
              AND COALESCE(service_date, date, created_at::date) = $2
              AND ABS(COALESCE(mileage, 0) - COALESCE($3::int, 0)) <= $4
              AND ($3::int IS NOT NULL OR work_description IS NOT DISTINCT FROM $5)
        )
        "#,
    )
    .bind(record.vehicle_number)
    .bind(record.service_date)
    .bind(record.mileage)
    .bind(MILEAGE_WINDOW)
    .bind(&record.work_description)
    .fetch_one(conn)
    .await?;

    Ok(exists)
}

/// Upsert por `(report_month, report_year, bus_id)`. Si la fila existe se
/// reemplazan los campos descriptivos y de kilometraje; una fila idéntica no
/// se toca, así una segunda pasada no cambia `updated_at`.
pub async fn upsert_mileage(
    conn: &mut PgConnection,
    report: &NewMileageReport,
) -> Result<UpsertOutcome, AppError> {
    match mileage_repository::find_id_by_key(&mut *conn, report).await? {
        Some(id) => {
            if mileage_repository::update_if_changed(&mut *conn, id, report).await? {
                Ok(UpsertOutcome::Updated)
            } else {
                Ok(UpsertOutcome::Unchanged)
            }
        }
        None => {
            mileage_repository::insert(&mut *conn, report).await?;
            Ok(UpsertOutcome::Inserted)
        }
    }
}
