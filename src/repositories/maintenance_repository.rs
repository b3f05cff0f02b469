use crate::models::maintenance_record::EFFECTIVE_DATE_SQL;
use crate::models::{MaintenanceRecord, NewMaintenanceRecord};
use crate::utils::errors::AppError;
use sqlx::{PgConnection, PgPool};

/// Lecturas sobre `maintenance_records`
pub struct MaintenanceRepository {
    pool: PgPool,
}

impl MaintenanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registros ordenados por vehículo y fecha efectiva
    pub async fn list_all(&self) -> Result<Vec<MaintenanceRecord>, AppError> {
        let records = sqlx::query_as::<_, MaintenanceRecord>(&format!(
            r#"
            SELECT id, vehicle_number, vehicle_id, service_date, date, mileage, po_number,
                   cost, work_description, raw_data, created_at, updated_at
            FROM maintenance_records
            ORDER BY vehicle_number, {} , id
            "#,
            EFFECTIVE_DATE_SQL
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM maintenance_records")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Registros cuyo vehículo no está en `fleet_vehicles`
    pub async fn count_orphans(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM maintenance_records m
            WHERE m.vehicle_number IS NOT NULL
              AND NOT EXISTS (
                  SELECT 1 FROM fleet_vehicles f WHERE f.vehicle_number = m.vehicle_number
              )
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Insertar un registro dentro de la transacción de la fuente
pub async fn insert(conn: &mut PgConnection, record: &NewMaintenanceRecord) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO maintenance_records (
            vehicle_number, vehicle_id, service_date, mileage, po_number, cost,
            work_description, raw_data, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, NOW()), NOW())
        "#,
    )
    .bind(record.vehicle_number)
    .bind(&record.vehicle_id)
    .bind(record.service_date)
    .bind(record.mileage)
    .bind(&record.po_number)
    .bind(&record.cost)
    .bind(&record.work_description)
    .bind(&record.raw_data)
    .bind(record.source_created_at)
    .execute(conn)
    .await?;

    Ok(())
}
