//! Validador post-migración
//!
//! Solo lectura. Cada chequeo produce una entrada del reporte; una consulta
//! que falla se convierte en una entrada ERROR en lugar de abortar.

use crate::models::{CheckStatus, NumberCollision, ValidationReport, ValidationResult, VehicleType};
use crate::repositories::schema_repository::quote_ident;
use crate::repositories::{MaintenanceRepository, MileageRepository, RelationKind, SchemaRepository};
use crate::utils::errors::AppError;
use sqlx::PgPool;
use tracing::{info, warn};

pub const CATEGORY_VEHICLES: &str = "Vehicle Consolidation";
pub const CATEGORY_MAINTENANCE: &str = "Maintenance Consolidation";
pub const CATEGORY_MILEAGE: &str = "Mileage Reports";
pub const CATEGORY_COLUMNS: &str = "Column Naming";
pub const CATEGORY_INTEGRITY: &str = "Data Integrity";
pub const CATEGORY_VIEWS: &str = "Compatibility Views";
pub const CATEGORY_TABLES: &str = "Empty Tables";

pub const CHECK_FLEET_COUNT: &str = "fleet_vehicles record count";
pub const CHECK_VEHICLE_TYPES: &str = "vehicle_type population";
pub const CHECK_MAINTENANCE_COUNT: &str = "maintenance_records count";
pub const CHECK_MAINTENANCE_NUMBERS: &str = "vehicle_number population";
pub const CHECK_SERVICE_RECORDS: &str = "service_records migration";
pub const CHECK_MILEAGE_TOTALS: &str = "total_miles consistency";
pub const CHECK_UNNAMED_COLUMNS: &str = "Unnamed columns";
pub const CHECK_UNIQUE_NUMBERS: &str = "Vehicle number uniqueness";
pub const CHECK_ORPHANS: &str = "Orphaned maintenance records";
pub const CHECK_COLLISION: &str = "Synthetic number collision";
pub const CHECK_EMPTY_TABLES: &str = "Empty table count";

/// Tablas legacy que no deberían sobrevivir a la limpieza
pub const LEGACY_VEHICLE_TABLES: [&str; 4] = ["buses", "vehicles", "school_buses", "agency_vehicles"];

/// Nombre del chequeo de una tabla legacy
pub fn legacy_table_check(table: &str) -> String {
    format!("Old table: {}", table)
}

/// Nombre del chequeo de una vista de compatibilidad
pub fn view_check(view: &str) -> String {
    format!("View: {}", view)
}

pub struct Validator {
    pool: PgPool,
    schema: SchemaRepository,
}

impl Validator {
    pub fn new(pool: PgPool) -> Self {
        Self {
            schema: SchemaRepository::new(pool.clone()),
            pool,
        }
    }

    /// Ejecutar todos los chequeos. `collisions` son las colisiones de número
    /// registradas por el migrador en esta misma ejecución.
    pub async fn validate(&self, collisions: &[NumberCollision]) -> ValidationReport {
        info!("🔎 Validando migración...");
        let mut report = ValidationReport::new();

        self.check_vehicles(&mut report).await;
        self.check_legacy_tables(&mut report).await;
        self.check_maintenance(&mut report).await;
        self.check_mileage(&mut report).await;
        self.check_unnamed_columns(&mut report).await;
        self.check_integrity(&mut report).await;
        self.check_views(&mut report).await;
        self.check_empty_tables(&mut report).await;

        for collision in collisions {
            report.push(ValidationResult::new(
                CATEGORY_INTEGRITY,
                CHECK_COLLISION,
                CheckStatus::Warning,
                format!("{} (incoming vehicle not imported)", collision),
            ));
        }

        info!(
            "📋 Validación terminada: {} chequeos, disposición {}",
            report.results.len(),
            report.disposition()
        );
        report
    }

    async fn scalar(&self, sql: &str) -> Result<i64, AppError> {
        Ok(sqlx::query_scalar::<_, i64>(sql).fetch_one(&self.pool).await?)
    }

    async fn check_vehicles(&self, report: &mut ValidationReport) {
        match self.scalar("SELECT COUNT(*) FROM fleet_vehicles").await {
            Ok(0) => report.push(ValidationResult::new(
                CATEGORY_VEHICLES,
                CHECK_FLEET_COUNT,
                CheckStatus::Warning,
                "fleet_vehicles is empty",
            )),
            Ok(count) => report.push(ValidationResult::new(
                CATEGORY_VEHICLES,
                CHECK_FLEET_COUNT,
                CheckStatus::Pass,
                format!("{} vehicles found", count),
            )),
            Err(e) => {
                report.push(query_failed(CATEGORY_VEHICLES, "fleet_vehicles table", &e));
                return;
            }
        }

        match self
            .scalar("SELECT COUNT(*) FROM fleet_vehicles WHERE vehicle_type IS NULL")
            .await
        {
            Ok(0) => report.push(ValidationResult::new(
                CATEGORY_VEHICLES,
                CHECK_VEHICLE_TYPES,
                CheckStatus::Pass,
                "All vehicles have type assigned",
            )),
            Ok(count) => report.push(ValidationResult::new(
                CATEGORY_VEHICLES,
                CHECK_VEHICLE_TYPES,
                CheckStatus::Warning,
                format!("{} vehicles without type", count),
            )),
            Err(e) => report.push(query_failed(CATEGORY_VEHICLES, CHECK_VEHICLE_TYPES, &e)),
        }
    }

    async fn check_legacy_tables(&self, report: &mut ValidationReport) {
        for table in LEGACY_VEHICLE_TABLES {
            let check = legacy_table_check(table);
            match self.schema.relation_kind(table).await {
                Ok(Some(RelationKind::BaseTable)) => {
                    let rows = self.schema.count_rows(table).await.unwrap_or_default();
                    report.push(ValidationResult::new(
                        CATEGORY_VEHICLES,
                        check,
                        CheckStatus::Warning,
                        format!("Table still exists ({} rows) - should be removed after verification", rows),
                    ));
                }
                Ok(_) => report.push(ValidationResult::new(
                    CATEGORY_VEHICLES,
                    check,
                    CheckStatus::Pass,
                    "Table removed",
                )),
                Err(e) => report.push(query_failed(CATEGORY_VEHICLES, &check, &e)),
            }
        }
    }

    async fn check_maintenance(&self, report: &mut ValidationReport) {
        let maintenance = MaintenanceRepository::new(self.pool.clone());
        match maintenance.count().await {
            Ok(count) => report.push(ValidationResult::new(
                CATEGORY_MAINTENANCE,
                CHECK_MAINTENANCE_COUNT,
                CheckStatus::Info,
                format!("{} maintenance records", count),
            )),
            Err(e) => {
                report.push(query_failed(CATEGORY_MAINTENANCE, CHECK_MAINTENANCE_COUNT, &e));
                return;
            }
        }

        match self
            .scalar("SELECT COUNT(*) FROM maintenance_records WHERE vehicle_number IS NULL")
            .await
        {
            Ok(0) => report.push(ValidationResult::new(
                CATEGORY_MAINTENANCE,
                CHECK_MAINTENANCE_NUMBERS,
                CheckStatus::Pass,
                "All records have vehicle_number",
            )),
            Ok(count) => report.push(ValidationResult::new(
                CATEGORY_MAINTENANCE,
                CHECK_MAINTENANCE_NUMBERS,
                CheckStatus::Warning,
                format!("{} records without vehicle_number", count),
            )),
            Err(e) => report.push(query_failed(CATEGORY_MAINTENANCE, CHECK_MAINTENANCE_NUMBERS, &e)),
        }

        match self.schema.base_table_exists("service_records").await {
            Ok(true) => match self.schema.count_rows("service_records").await {
                Ok(count) => report.push(ValidationResult::new(
                    CATEGORY_MAINTENANCE,
                    CHECK_SERVICE_RECORDS,
                    CheckStatus::Info,
                    format!("{} records still in service_records", count),
                )),
                Err(e) => report.push(query_failed(CATEGORY_MAINTENANCE, CHECK_SERVICE_RECORDS, &e)),
            },
            Ok(false) => report.push(ValidationResult::new(
                CATEGORY_MAINTENANCE,
                CHECK_SERVICE_RECORDS,
                CheckStatus::Info,
                "service_records removed",
            )),
            Err(e) => report.push(query_failed(CATEGORY_MAINTENANCE, CHECK_SERVICE_RECORDS, &e)),
        }
    }

    async fn check_mileage(&self, report: &mut ValidationReport) {
        match MileageRepository::new(self.pool.clone())
            .count_invariant_violations()
            .await
        {
            Ok(0) => report.push(ValidationResult::new(
                CATEGORY_MILEAGE,
                CHECK_MILEAGE_TOTALS,
                CheckStatus::Pass,
                "total_miles matches ending - beginning",
            )),
            Ok(count) => report.push(ValidationResult::new(
                CATEGORY_MILEAGE,
                CHECK_MILEAGE_TOTALS,
                CheckStatus::Warning,
                format!("{} reports with inconsistent total_miles", count),
            )),
            Err(e) => report.push(query_failed(CATEGORY_MILEAGE, CHECK_MILEAGE_TOTALS, &e)),
        }
    }

    async fn check_unnamed_columns(&self, report: &mut ValidationReport) {
        let columns = match self.schema.unnamed_columns().await {
            Ok(columns) => columns,
            Err(e) => {
                report.push(query_failed(CATEGORY_COLUMNS, CHECK_UNNAMED_COLUMNS, &e));
                return;
            }
        };

        if columns.is_empty() {
            report.push(ValidationResult::new(
                CATEGORY_COLUMNS,
                CHECK_UNNAMED_COLUMNS,
                CheckStatus::Pass,
                "No unnamed columns found",
            ));
            return;
        }

        let mut tables: Vec<(String, usize)> = Vec::new();
        for (table, _) in &columns {
            match tables.iter_mut().find(|(t, _)| t == table) {
                Some((_, count)) => *count += 1,
                None => tables.push((table.clone(), 1)),
            }
        }
        for (table, count) in tables {
            report.push(ValidationResult::new(
                CATEGORY_COLUMNS,
                CHECK_UNNAMED_COLUMNS,
                CheckStatus::Warning,
                format!("Table {}: {} unnamed columns", table, count),
            ));
        }
    }

    async fn check_integrity(&self, report: &mut ValidationReport) {
        match self
            .scalar(
                "SELECT COUNT(*) FROM (SELECT vehicle_number FROM fleet_vehicles \
                 WHERE vehicle_number IS NOT NULL GROUP BY vehicle_number HAVING COUNT(*) > 1) d",
            )
            .await
        {
            Ok(0) => report.push(ValidationResult::new(
                CATEGORY_INTEGRITY,
                CHECK_UNIQUE_NUMBERS,
                CheckStatus::Pass,
                "All vehicle numbers are unique",
            )),
            Ok(count) => report.push(ValidationResult::new(
                CATEGORY_INTEGRITY,
                CHECK_UNIQUE_NUMBERS,
                CheckStatus::Warning,
                format!("{} duplicate vehicle numbers found", count),
            )),
            Err(e) => report.push(query_failed(CATEGORY_INTEGRITY, CHECK_UNIQUE_NUMBERS, &e)),
        }

        match MaintenanceRepository::new(self.pool.clone()).count_orphans().await {
            Ok(0) => report.push(ValidationResult::new(
                CATEGORY_INTEGRITY,
                CHECK_ORPHANS,
                CheckStatus::Pass,
                "All maintenance records reference existing vehicles",
            )),
            Ok(count) => report.push(ValidationResult::new(
                CATEGORY_INTEGRITY,
                CHECK_ORPHANS,
                CheckStatus::Warning,
                format!("{} maintenance records reference non-existent vehicles", count),
            )),
            Err(e) => report.push(query_failed(CATEGORY_INTEGRITY, CHECK_ORPHANS, &e)),
        }
    }

    /// La vista debe tener exactamente las filas de su filtro sobre `fleet_vehicles`
    async fn check_views(&self, report: &mut ValidationReport) {
        let bus = VehicleType::Bus.as_str();
        let views = [
            ("buses", format!("SELECT COUNT(*) FROM fleet_vehicles WHERE vehicle_type = '{}'", bus)),
            ("vehicles", format!("SELECT COUNT(*) FROM fleet_vehicles WHERE vehicle_type <> '{}'", bus)),
        ];

        for (view, expected_sql) in views {
            let check = view_check(view);
            match self.schema.relation_kind(view).await {
                Ok(Some(RelationKind::View)) => {}
                Ok(_) => {
                    report.push(ValidationResult::new(
                        CATEGORY_VIEWS,
                        check,
                        CheckStatus::Warning,
                        "View not present",
                    ));
                    continue;
                }
                Err(e) => {
                    report.push(query_failed(CATEGORY_VIEWS, &check, &e));
                    continue;
                }
            }

            let counts = (
                self.scalar(&format!("SELECT COUNT(*) FROM {}", quote_ident(view))).await,
                self.scalar(&expected_sql).await,
            );
            match counts {
                (Ok(actual), Ok(expected)) if actual == expected => report.push(ValidationResult::new(
                    CATEGORY_VIEWS,
                    check,
                    CheckStatus::Pass,
                    format!("{} rows, matches fleet_vehicles", actual),
                )),
                (Ok(actual), Ok(expected)) => report.push(ValidationResult::new(
                    CATEGORY_VIEWS,
                    check,
                    CheckStatus::Error,
                    format!("{} rows, expected {}", actual, expected),
                )),
                (Err(e), _) | (_, Err(e)) => report.push(query_failed(CATEGORY_VIEWS, &check, &e)),
            }
        }
    }

    async fn check_empty_tables(&self, report: &mut ValidationReport) {
        let tables = match self.schema.list_base_tables().await {
            Ok(tables) => tables,
            Err(e) => {
                report.push(query_failed(CATEGORY_TABLES, CHECK_EMPTY_TABLES, &e));
                return;
            }
        };

        let mut empty = Vec::new();
        for table in tables {
            if let Ok(0) = self.schema.count_rows(&table).await {
                empty.push(table);
            }
        }

        if empty.is_empty() {
            report.push(ValidationResult::new(
                CATEGORY_TABLES,
                CHECK_EMPTY_TABLES,
                CheckStatus::Pass,
                "No empty tables found",
            ));
        } else {
            report.push(ValidationResult::new(
                CATEGORY_TABLES,
                CHECK_EMPTY_TABLES,
                CheckStatus::Info,
                format!("{} empty tables: {}", empty.len(), empty.join(", ")),
            ));
        }
    }
}

fn query_failed(category: &str, check: &str, err: &AppError) -> ValidationResult {
    warn!("⚠️ Chequeo '{}' no se pudo ejecutar: {}", check, err);
    ValidationResult::new(category, check, CheckStatus::Error, format!("Cannot check: {}", err))
}
