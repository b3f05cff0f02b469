//! Evolución del esquema
//!
//! Aditiva e idempotente: cada invocación se puede repetir. Solo la creación
//! de las tablas canónicas es obligatoria; el resto de pasos DDL se registran
//! y, si fallan, no detienen el pipeline. La eliminación de tablas legacy es
//! un paso explícito y separado (`cleanup`).

use crate::repositories::schema_repository::quote_ident;
use crate::repositories::SchemaRepository;
use crate::services::classifier;
use crate::utils::errors::{schema_error, AppError};
use sqlx::PgPool;
use std::fmt;
use tracing::{debug, info, warn};

/// Tablas canónicas con su DDL de creación
const CANONICAL_TABLES: &[(&str, &str)] = &[
    (
        "fleet_vehicles",
        r#"
        CREATE TABLE IF NOT EXISTS fleet_vehicles (
            id SERIAL PRIMARY KEY,
            vehicle_number INTEGER,
            sheet_name TEXT,
            year INTEGER,
            make TEXT,
            model TEXT,
            description TEXT,
            serial_number TEXT,
            license TEXT,
            location TEXT,
            tire_size TEXT,
            vehicle_type VARCHAR(50),
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    ),
    (
        "maintenance_records",
        r#"
        CREATE TABLE IF NOT EXISTS maintenance_records (
            id SERIAL PRIMARY KEY,
            vehicle_number INTEGER,
            vehicle_id TEXT,
            service_date DATE,
            date DATE,
            mileage INTEGER,
            po_number TEXT,
            cost TEXT,
            work_description TEXT,
            raw_data TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    ),
    (
        "monthly_mileage_reports",
        r#"
        CREATE TABLE IF NOT EXISTS monthly_mileage_reports (
            id SERIAL PRIMARY KEY,
            report_month TEXT,
            report_year INTEGER,
            bus_year INTEGER,
            bus_make TEXT,
            license_plate TEXT,
            bus_id TEXT,
            located_at TEXT,
            beginning_miles INTEGER,
            ending_miles INTEGER,
            total_miles INTEGER,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (report_month, report_year, bus_id)
        )
        "#,
    ),
];

/// Columnas añadidas sobre tablas existentes: `(tabla, columna, tipo)`
const ADDED_COLUMNS: &[(&str, &str, &str)] = &[
    ("fleet_vehicles", "vehicle_type", "VARCHAR(50)"),
    ("service_records", "maintenance_date", "DATE"),
    ("maintenance_records", "service_date", "DATE"),
];

/// Índices: `(nombre, tabla, columna)`
pub const INDEXES: &[(&str, &str, &str)] = &[
    ("idx_fleet_vehicles_number", "fleet_vehicles", "vehicle_number"),
    ("idx_fleet_vehicles_type", "fleet_vehicles", "vehicle_type"),
    ("idx_fleet_vehicles_license", "fleet_vehicles", "license"),
    ("idx_maintenance_vehicle", "maintenance_records", "vehicle_number"),
    ("idx_maintenance_date", "maintenance_records", "service_date"),
    ("idx_mileage_vehicle", "monthly_mileage_reports", "bus_id"),
    ("idx_mileage_month", "monthly_mileage_reports", "report_month"),
];

/// Vistas de compatibilidad sobre `fleet_vehicles`
pub const COMPAT_VIEWS: &[(&str, &str)] = &[
    (
        "buses",
        r#"
        CREATE OR REPLACE VIEW buses AS
        SELECT vehicle_number::text AS bus_id,
               'active'::text AS status,
               model,
               50 AS capacity,
               'good'::text AS oil_status,
               'good'::text AS tire_status,
               ''::text AS maintenance_notes,
               updated_at,
               created_at
        FROM fleet_vehicles
        WHERE vehicle_type = 'bus'
        "#,
    ),
    (
        "vehicles",
        r#"
        CREATE OR REPLACE VIEW vehicles AS
        SELECT vehicle_number::text AS vehicle_id,
               model,
               description,
               year::text AS year,
               tire_size,
               license,
               'good'::text AS oil_status,
               'good'::text AS tire_status,
               'active'::text AS status,
               ''::text AS maintenance_notes,
               serial_number,
               location AS base,
               3000 AS service_interval,
               updated_at,
               created_at,
               vehicle_number::text AS import_id
        FROM fleet_vehicles
        WHERE vehicle_type <> 'bus'
        "#,
    ),
];

/// Tablas legacy en orden de limpieza, con la consulta que cuenta las filas
/// que todavía no tienen copia en las tablas canónicas
pub const LEGACY_TABLES: &[(&str, &str)] = &[
    (
        "buses",
        r#"
        SELECT COUNT(*) FROM buses b
        WHERE NULLIF(TRIM(b.bus_id::text), '') IS NOT NULL
          AND NOT EXISTS (
              SELECT 1 FROM fleet_vehicles f
              WHERE f.sheet_name = TRIM(b.bus_id::text) OR f.license = TRIM(b.bus_id::text)
          )
        "#,
    ),
    (
        "vehicles",
        r#"
        SELECT COUNT(*) FROM vehicles v
        WHERE NULLIF(TRIM(v.vehicle_id::text), '') IS NOT NULL
          AND NOT EXISTS (
              SELECT 1 FROM fleet_vehicles f
              WHERE f.sheet_name = TRIM(v.vehicle_id::text)
                 OR f.license = COALESCE(NULLIF(TRIM(v.license::text), ''), TRIM(v.vehicle_id::text))
          )
        "#,
    ),
    (
        "service_records",
        r#"
        SELECT COUNT(*) FROM service_records s
        WHERE TRIM(s.unnamed_1::text) ~ '^[0-9]+$'
          AND NOT EXISTS (
              SELECT 1 FROM maintenance_records m
              WHERE m.vehicle_id = TRIM(s.unnamed_1::text)
          )
        "#,
    ),
    (
        "maintenance_sheets",
        r#"
        SELECT COUNT(*) FROM maintenance_sheets s
        WHERE NULLIF(TRIM(s.vehicle_id::text), '') IS NOT NULL
          AND NOT EXISTS (
              SELECT 1 FROM maintenance_records m
              WHERE m.vehicle_id = TRIM(s.vehicle_id::text)
          )
        "#,
    ),
    (
        "school_buses",
        r#"
        SELECT COUNT(*) FROM school_buses s
        WHERE NULLIF(TRIM(s.bus_id::text), '') IS NOT NULL
          AND COALESCE(s.beginning_miles::text, '') || COALESCE(s.ending_miles::text, '')
              || COALESCE(s.total_miles::text, '') ~ '[1-9]'
          AND NOT EXISTS (
              SELECT 1 FROM monthly_mileage_reports r
              WHERE r.bus_id = TRIM(s.bus_id::text)
                 OR r.bus_id = 'BUS' || regexp_replace(TRIM(s.bus_id::text), '^BUS[\s#-]*|,', '', 'gi')
          )
        "#,
    ),
    (
        "agency_vehicles",
        r#"
        SELECT COUNT(*) FROM agency_vehicles a
        WHERE NULLIF(TRIM(a.vehicle_id::text), '') IS NOT NULL
          AND COALESCE(a.beginning_miles::text, '') || COALESCE(a.ending_miles::text, '')
              || COALESCE(a.total_miles::text, '') ~ '[1-9]'
          AND NOT EXISTS (
              SELECT 1 FROM monthly_mileage_reports r
              WHERE r.bus_id = TRIM(a.vehicle_id::text)
          )
        "#,
    ),
];

/// Resultado de un paso DDL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Applied,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step: String,
    pub status: StepStatus,
}

/// Resumen de una evolución de esquema
#[derive(Debug, Clone, Default)]
pub struct EvolutionReport {
    pub steps: Vec<StepOutcome>,
    pub types_backfilled: u64,
}

impl EvolutionReport {
    pub fn failed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Failed(_)))
            .count()
    }

    fn record(&mut self, step: impl Into<String>, status: StepStatus) {
        self.steps.push(StepOutcome { step: step.into(), status });
    }
}

impl fmt::Display for EvolutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== SCHEMA EVOLUTION ===")?;
        for outcome in &self.steps {
            match &outcome.status {
                StepStatus::Applied => writeln!(f, "  ✓ {}", outcome.step)?,
                StepStatus::Skipped(reason) => writeln!(f, "  - {} ({})", outcome.step, reason)?,
                StepStatus::Failed(reason) => writeln!(f, "  ✗ {}: {}", outcome.step, reason)?,
            }
        }
        writeln!(f, "Vehicle types backfilled: {}", self.types_backfilled)
    }
}

/// Qué pasó con una tabla legacy durante la limpieza
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    Dropped { rows: i64 },
    Absent,
    /// Quedan filas sin copiar; se conserva la tabla
    Kept { pending: i64 },
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub tables: Vec<(String, CleanupAction)>,
    pub views: EvolutionReport,
}

impl CleanupReport {
    pub fn dropped(&self) -> usize {
        self.tables
            .iter()
            .filter(|(_, action)| matches!(action, CleanupAction::Dropped { .. }))
            .count()
    }
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== CLEANUP ===")?;
        for (table, action) in &self.tables {
            match action {
                CleanupAction::Dropped { rows } => writeln!(f, "  ✓ dropped {} ({} rows)", table, rows)?,
                CleanupAction::Absent => writeln!(f, "  - {} not present", table)?,
                CleanupAction::Kept { pending } => {
                    writeln!(f, "  ⚠ kept {} ({} rows not yet migrated)", table, pending)?
                }
                CleanupAction::Failed(reason) => writeln!(f, "  ✗ {}: {}", table, reason)?,
            }
        }
        write!(f, "{}", self.views)
    }
}

pub struct SchemaEvolver {
    pool: PgPool,
    schema: SchemaRepository,
}

impl SchemaEvolver {
    pub fn new(pool: PgPool) -> Self {
        Self {
            schema: SchemaRepository::new(pool.clone()),
            pool,
        }
    }

    /// Crear las tablas canónicas. Es el único paso obligatorio.
    pub async fn bootstrap(&self) -> Result<(), AppError> {
        for (table, ddl) in CANONICAL_TABLES {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| schema_error(&format!("create table {}", table), &e))?;
            debug!("📐 Tabla canónica lista: {}", table);
        }
        Ok(())
    }

    /// Evolución completa: tablas canónicas, columnas, índices, tipos y vistas
    pub async fn evolve(&self) -> Result<EvolutionReport, AppError> {
        info!("📐 Evolucionando esquema...");
        self.bootstrap().await?;

        let mut report = EvolutionReport::default();
        self.add_columns(&mut report).await?;
        self.create_indexes(&mut report).await;
        report.types_backfilled = self.backfill_vehicle_types(&mut report).await;
        self.create_compat_views(&mut report).await?;

        if report.failed_steps() > 0 {
            warn!("⚠️ Esquema evolucionado con {} pasos fallidos", report.failed_steps());
        } else {
            info!("✅ Esquema evolucionado ({} pasos)", report.steps.len());
        }
        Ok(report)
    }

    async fn add_columns(&self, report: &mut EvolutionReport) -> Result<(), AppError> {
        for (table, column, sql_type) in ADDED_COLUMNS {
            let step = format!("add column {}.{}", table, column);
            if !self.schema.base_table_exists(table).await? {
                report.record(step, StepStatus::Skipped("table not present".to_string()));
                continue;
            }
            if self.schema.column_exists(table, column).await? {
                report.record(step, StepStatus::Skipped("already present".to_string()));
                continue;
            }

            let ddl = format!(
                "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
                quote_ident(table),
                quote_ident(column),
                sql_type
            );
            let status = self.run_step(&step, &ddl).await;
            report.record(step, status);
        }
        Ok(())
    }

    async fn create_indexes(&self, report: &mut EvolutionReport) {
        for (name, table, column) in INDEXES {
            let ddl = format!("CREATE INDEX IF NOT EXISTS {} ON {} ({})", name, table, column);
            let step = format!("index {}", name);
            let status = self.run_step(&step, &ddl).await;
            report.record(step, status);
        }

        // Tablas antiguas creadas sin la restricción única
        let step = "index idx_mileage_natural_key";
        let status = self
            .run_step(
                step,
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_mileage_natural_key \
                 ON monthly_mileage_reports (report_month, report_year, bus_id)",
            )
            .await;
        report.record(step, status);
    }

    /// Rellenar `vehicle_type` nulo con la escalera del clasificador en SQL
    async fn backfill_vehicle_types(&self, report: &mut EvolutionReport) -> u64 {
        let sql = format!(
            "UPDATE fleet_vehicles SET vehicle_type = {} WHERE vehicle_type IS NULL",
            classifier::sql_case_expression("model", "description")
        );
        match sqlx::query(&sql).execute(&self.pool).await {
            Ok(result) => {
                report.record("backfill vehicle_type", StepStatus::Applied);
                if result.rows_affected() > 0 {
                    info!("🏷️ Tipos de vehículo rellenados: {}", result.rows_affected());
                }
                result.rows_affected()
            }
            Err(e) => {
                warn!("⚠️ Relleno de vehicle_type falló: {}", e);
                report.record("backfill vehicle_type", StepStatus::Failed(e.to_string()));
                0
            }
        }
    }

    /// Crear las vistas de compatibilidad cuyo nombre no ocupa una tabla base
    pub async fn create_compat_views(&self, report: &mut EvolutionReport) -> Result<(), AppError> {
        for (view, ddl) in COMPAT_VIEWS {
            let step = format!("view {}", view);
            if self.schema.base_table_exists(view).await? {
                report.record(step, StepStatus::Skipped("legacy table still present".to_string()));
                continue;
            }
            let status = self.run_step(&step, ddl).await;
            report.record(step, status);
        }
        Ok(())
    }

    /// Eliminar las tablas legacy ya migradas y recrear las vistas.
    /// Con `force` se eliminan aunque queden filas sin copiar.
    pub async fn cleanup(&self, force: bool) -> Result<CleanupReport, AppError> {
        info!("🧹 Limpiando tablas legacy (force = {})", force);
        let mut report = CleanupReport::default();

        for (table, pending_sql) in LEGACY_TABLES {
            let action = self.cleanup_table(table, pending_sql, force).await?;
            report.tables.push((table.to_string(), action));
        }

        self.create_compat_views(&mut report.views).await?;
        info!("✅ Limpieza terminada: {} tablas eliminadas", report.dropped());
        Ok(report)
    }

    async fn cleanup_table(
        &self,
        table: &str,
        pending_sql: &str,
        force: bool,
    ) -> Result<CleanupAction, AppError> {
        if !self.schema.base_table_exists(table).await? {
            debug!("⏭️ {} no existe como tabla", table);
            return Ok(CleanupAction::Absent);
        }

        let rows = self.schema.count_rows(table).await?;

        if !force {
            let pending = match sqlx::query_scalar::<_, i64>(pending_sql)
                .fetch_one(&self.pool)
                .await
            {
                Ok(pending) => pending,
                Err(e) => {
                    warn!("⚠️ No se pudo verificar {}: {}", table, e);
                    return Ok(CleanupAction::Failed(format!("pending-row check failed: {}", e)));
                }
            };
            if pending > 0 {
                warn!(
                    "⚠️ Se conserva {}: {} filas sin migrar (usar --force para eliminar)",
                    table, pending
                );
                return Ok(CleanupAction::Kept { pending });
            }
        }

        let ddl = format!("DROP TABLE IF EXISTS {} CASCADE", quote_ident(table));
        match sqlx::query(&ddl).execute(&self.pool).await {
            Ok(_) => {
                info!("🗑️ Tabla eliminada: {} ({} filas)", table, rows);
                Ok(CleanupAction::Dropped { rows })
            }
            Err(e) => {
                warn!("⚠️ No se pudo eliminar {}: {}", table, e);
                Ok(CleanupAction::Failed(e.to_string()))
            }
        }
    }

    async fn run_step(&self, step: &str, ddl: &str) -> StepStatus {
        match sqlx::query(ddl).execute(&self.pool).await {
            Ok(_) => {
                debug!("📐 {}", step);
                StepStatus::Applied
            }
            Err(e) => {
                warn!("⚠️ Paso de esquema fallido ({}): {}", step, e);
                StepStatus::Failed(e.to_string())
            }
        }
    }
}
