use crate::models::{MonthlyMileageReport, NewMileageReport};
use crate::utils::errors::AppError;
use sqlx::{PgConnection, PgPool};

/// Filas donde el total no coincide con la diferencia de odómetro
const INVARIANT_VIOLATION_FILTER: &str = "beginning_miles IS NOT NULL AND ending_miles IS NOT NULL \
     AND ending_miles >= beginning_miles \
     AND total_miles IS DISTINCT FROM ending_miles - beginning_miles";

/// Lecturas y reparaciones sobre `monthly_mileage_reports`
pub struct MileageRepository {
    pool: PgPool,
}

impl MileageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> Result<Vec<MonthlyMileageReport>, AppError> {
        let reports = sqlx::query_as::<_, MonthlyMileageReport>(
            r#"
            SELECT id, report_month, report_year, bus_year, bus_make, license_plate, bus_id,
                   located_at, beginning_miles, ending_miles, total_miles, created_at, updated_at
            FROM monthly_mileage_reports
            ORDER BY report_year, report_month, bus_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(reports)
    }

    pub async fn find_by_key(
        &self,
        report_month: &str,
        report_year: i32,
        bus_id: &str,
    ) -> Result<Option<MonthlyMileageReport>, AppError> {
        let report = sqlx::query_as::<_, MonthlyMileageReport>(
            r#"
            SELECT id, report_month, report_year, bus_year, bus_make, license_plate, bus_id,
                   located_at, beginning_miles, ending_miles, total_miles, created_at, updated_at
            FROM monthly_mileage_reports
            WHERE report_month = $1 AND report_year = $2 AND bus_id = $3
            "#,
        )
        .bind(report_month)
        .bind(report_year)
        .bind(bus_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(report)
    }

    pub async fn count_invariant_violations(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM monthly_mileage_reports WHERE {}",
            INVARIANT_VIOLATION_FILTER
        ))
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Pasada de reparación sobre las filas ya cargadas.
    /// Devuelve `(recalculadas, negativas_corregidas)`.
    pub async fn repair_totals(&self) -> Result<(u64, u64), AppError> {
        let recomputed = sqlx::query(&format!(
            "UPDATE monthly_mileage_reports \
             SET total_miles = ending_miles - beginning_miles, updated_at = NOW() \
             WHERE {}",
            INVARIANT_VIOLATION_FILTER
        ))
        .execute(&self.pool)
        .await?
        .rows_affected();

        let negated = sqlx::query(
            r#"
            UPDATE monthly_mileage_reports
            SET total_miles = ABS(total_miles), updated_at = NOW()
            WHERE total_miles < 0
            "#,
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok((recomputed, negated))
    }
}

/// Id de la fila con la clave natural `(report_month, report_year, bus_id)`
pub async fn find_id_by_key(
    conn: &mut PgConnection,
    report: &NewMileageReport,
) -> Result<Option<i32>, AppError> {
    let id = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT id FROM monthly_mileage_reports
        WHERE report_month = $1 AND report_year = $2 AND bus_id = $3
        LIMIT 1
        "#,
    )
    .bind(&report.report_month)
    .bind(report.report_year)
    .bind(&report.bus_id)
    .fetch_optional(conn)
    .await?;

    Ok(id)
}

pub async fn insert(conn: &mut PgConnection, report: &NewMileageReport) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO monthly_mileage_reports (
            report_month, report_year, bus_year, bus_make, license_plate, bus_id,
            located_at, beginning_miles, ending_miles, total_miles, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
        "#,
    )
    .bind(&report.report_month)
    .bind(report.report_year)
    .bind(report.bus_year)
    .bind(&report.bus_make)
    .bind(&report.license_plate)
    .bind(&report.bus_id)
    .bind(&report.located_at)
    .bind(report.beginning_miles)
    .bind(report.ending_miles)
    .bind(report.total_miles)
    .execute(conn)
    .await?;

    Ok(())
}

/// Reemplaza los campos descriptivos y de kilometraje. Solo escribe (y solo
/// refresca `updated_at`) si algún valor cambió; devuelve `true` en ese caso.
pub async fn update_if_changed(
    conn: &mut PgConnection,
    id: i32,
    report: &NewMileageReport,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE monthly_mileage_reports
        SET bus_year = $2, bus_make = $3, license_plate = $4, located_at = $5,
            beginning_miles = $6, ending_miles = $7, total_miles = $8, updated_at = NOW()
        WHERE id = $1
          AND (bus_year, bus_make, license_plate, located_at,
               beginning_miles, ending_miles, total_miles)
              IS DISTINCT FROM ($2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(report.bus_year)
    .bind(&report.bus_make)
    .bind(&report.license_plate)
    .bind(&report.located_at)
    .bind(report.beginning_miles)
    .bind(report.ending_miles)
    .bind(report.total_miles)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
