//! Estado de la base de datos y backup por filas
//!
//! Ambas operaciones son de solo lectura sobre la base de datos.

use crate::repositories::schema_repository::{count_rows, quote_ident};
use crate::repositories::{RelationKind, SchemaRepository};
use crate::utils::errors::AppError;
use chrono::Local;
use futures::TryStreamExt;
use sqlx::PgPool;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, warn};

/// Columnas esperadas de las tablas canónicas
pub const CANONICAL_COLUMNS: &[(&str, &[&str])] = &[
    (
        "fleet_vehicles",
        &[
            "vehicle_number", "sheet_name", "year", "make", "model", "description", "serial_number",
            "license", "location", "tire_size", "vehicle_type", "created_at", "updated_at",
        ],
    ),
    (
        "maintenance_records",
        &[
            "id", "vehicle_number", "vehicle_id", "service_date", "date", "mileage", "po_number",
            "cost", "work_description", "raw_data", "created_at", "updated_at",
        ],
    ),
    (
        "monthly_mileage_reports",
        &[
            "id", "report_month", "report_year", "bus_year", "bus_make", "license_plate", "bus_id",
            "located_at", "beginning_miles", "ending_miles", "total_miles", "created_at", "updated_at",
        ],
    ),
];

pub const LEGACY_TABLE_NAMES: [&str; 6] = [
    "buses",
    "vehicles",
    "service_records",
    "maintenance_sheets",
    "school_buses",
    "agency_vehicles",
];

pub const BACKUP_SUMMARY_FILE: &str = "backup_summary.txt";

/// Estado de una tabla conocida
#[derive(Debug, Clone)]
pub struct TableStatus {
    pub name: String,
    pub canonical: bool,
    pub kind: Option<RelationKind>,
    pub rows: Option<i64>,
    pub missing_columns: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    pub tables: Vec<TableStatus>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== DATABASE STATUS ===")?;
        for (title, canonical) in [("Canonical tables", true), ("Legacy tables", false)] {
            writeln!(f, "\n{}:", title)?;
            for table in self.tables.iter().filter(|t| t.canonical == canonical) {
                let kind = match table.kind {
                    Some(RelationKind::BaseTable) => "table",
                    Some(RelationKind::View) => "view",
                    None => "absent",
                };
                match table.rows {
                    Some(rows) => write!(f, "  {:<26} {:<7} {:>8} rows", table.name, kind, rows)?,
                    None => write!(f, "  {:<26} {:<7}", table.name, kind)?,
                }
                if !table.missing_columns.is_empty() {
                    write!(f, "  missing columns: {}", table.missing_columns.join(", "))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Existencia, filas y columnas faltantes de cada tabla conocida
pub async fn status(pool: &PgPool) -> Result<StatusReport, AppError> {
    let schema = SchemaRepository::new(pool.clone());
    let mut report = StatusReport::default();

    let canonical = CANONICAL_COLUMNS.iter().map(|(t, cols)| (*t, Some(*cols)));
    let legacy = LEGACY_TABLE_NAMES.iter().map(|t| (*t, None));

    for (name, expected) in canonical.chain(legacy) {
        let kind = schema.relation_kind(name).await?;
        let rows = match kind {
            Some(_) => Some(schema.count_rows(name).await?),
            None => None,
        };

        let mut missing_columns = Vec::new();
        if let (Some(expected), Some(_)) = (expected, kind) {
            let existing = schema.columns_of(name).await?;
            missing_columns = expected
                .iter()
                .filter(|c| !existing.iter().any(|e| e == *c))
                .map(|c| c.to_string())
                .collect();
        }

        report.tables.push(TableStatus {
            name: name.to_string(),
            canonical: expected.is_some(),
            kind,
            rows,
            missing_columns,
        });
    }

    Ok(report)
}

/// Resumen de un backup
#[derive(Debug, Clone)]
pub struct BackupSummary {
    pub directory: PathBuf,
    pub tables: Vec<(String, i64)>,
}

impl fmt::Display for BackupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backup written to {}", self.directory.display())?;
        for (table, rows) in &self.tables {
            writeln!(f, "  - {} ({} rows)", table, rows)?;
        }
        write!(f, "Total Tables: {}", self.tables.len())
    }
}

/// Volcar cada tabla base como JSON Lines (`<tabla>_data.jsonl`), su lista de
/// columnas (`<tabla>_structure.sql`) y un `backup_summary.txt`, dentro de
/// `out_dir/backup_<timestamp>`.
pub async fn backup(pool: &PgPool, out_dir: &Path) -> Result<BackupSummary, AppError> {
    let now = Local::now();
    let directory = out_dir.join(format!("backup_{}", now.format("%Y%m%d_%H%M%S")));
    fs::create_dir_all(&directory).await?;
    info!("💾 Backup en {}", directory.display());

    let schema = SchemaRepository::new(pool.clone());
    let mut summary = BackupSummary {
        directory: directory.clone(),
        tables: Vec::new(),
    };

    for table in schema.list_base_tables().await? {
        write_structure(pool, &directory, &table).await?;
        let written = write_rows(pool, &directory, &table).await?;
        let expected = count_rows(pool, &table).await?;
        if written != expected {
            warn!("⚠️ {}: {} filas escritas, {} en la tabla", table, written, expected);
        }
        info!("💾 {} ({} filas)", table, written);
        summary.tables.push((table, written));
    }

    let mut text = String::new();
    text.push_str("Database Backup Summary\n");
    text.push_str("=======================\n");
    text.push_str(&format!("Backup Date: {}\n", now.format("%Y-%m-%d %H:%M:%S")));
    text.push_str(&format!("Total Tables: {}\n\n", summary.tables.len()));
    text.push_str("Tables Backed Up:\n");
    for (table, rows) in &summary.tables {
        text.push_str(&format!("- {} ({} rows)\n", table, rows));
    }
    fs::write(directory.join(BACKUP_SUMMARY_FILE), text).await?;

    info!("✅ Backup completo: {} tablas", summary.tables.len());
    Ok(summary)
}

async fn write_structure(pool: &PgPool, directory: &Path, table: &str) -> Result<(), AppError> {
    let columns = sqlx::query_as::<_, (String, String, String)>(
        r#"
        SELECT column_name::text, data_type::text, is_nullable::text
        FROM information_schema.columns
        WHERE table_schema = current_schema() AND table_name = $1
        ORDER BY ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    let mut text = format!("-- Table: {}\n", table);
    for (name, data_type, nullable) in columns {
        text.push_str(&format!("-- {} {} {}\n", name, data_type, nullable));
    }
    fs::write(directory.join(format!("{}_structure.sql", table)), text).await?;
    Ok(())
}

async fn write_rows(pool: &PgPool, directory: &Path, table: &str) -> Result<i64, AppError> {
    let file = fs::File::create(directory.join(format!("{}_data.jsonl", table))).await?;
    let mut writer = BufWriter::new(file);

    let sql = format!("SELECT row_to_json(t)::text FROM {} t", quote_ident(table));
    let mut rows = sqlx::query_scalar::<_, String>(&sql).fetch(pool);
    let mut written = 0i64;
    while let Some(line) = rows.try_next().await? {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        written += 1;
    }
    writer.flush().await?;

    Ok(written)
}
