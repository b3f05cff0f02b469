//! Importación de kilometraje mensual
//!
//! Dos orígenes alimentan `monthly_mileage_reports`:
//! - el libro XLSX con una hoja por mes,
//! - las tablas legacy `school_buses` y `agency_vehicles`.
//!
//! Ambos hacen upsert por clave natural y terminan con la pasada de
//! reparación de totales.

use crate::models::legacy::LegacyMileageRow;
use crate::models::{NewMileageReport, RowOutcome, SkipReason, SourceStats};
use crate::repositories::{ColumnSpec, MileageRepository};
use crate::services::deduplicator::{self, UpsertOutcome};
use crate::services::identifier_normalizer::canonical_bus_id;
use crate::services::migrator::{migrate_source, LegacySource};
use crate::services::workbook_parser::{self, month_name, SheetPeriod, SLOTS_SHEET};
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::validation::{non_empty, parse_optional_int, valid_model_year};
use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, Reader};
use sqlx::{Acquire, PgConnection, Postgres, Transaction};
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Resumen de la importación de un libro
#[derive(Debug, Clone, Default)]
pub struct WorkbookStats {
    pub file: String,
    pub sheets_imported: Vec<String>,
    /// Hojas cuyo nombre no se pudo interpretar
    pub sheets_skipped: Vec<String>,
    /// Hojas corruptas o ilegibles
    pub sheets_failed: Vec<String>,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub totals_repaired: u64,
}

impl fmt::Display for WorkbookStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== WORKBOOK {} ===", self.file)?;
        writeln!(f, "  sheets imported: {}", self.sheets_imported.join(", "))?;
        if !self.sheets_skipped.is_empty() {
            writeln!(f, "  sheets skipped (unrecognized name): {}", self.sheets_skipped.join(", "))?;
        }
        if !self.sheets_failed.is_empty() {
            writeln!(f, "  sheets failed: {}", self.sheets_failed.join(", "))?;
        }
        writeln!(
            f,
            "  rows inserted {}  updated {}  unchanged {}  failed {}",
            self.inserted, self.updated, self.unchanged, self.failed
        )?;
        write!(f, "  totals repaired: {}", self.totals_repaired)
    }
}

/// Texto de una celda tal como se ve en la hoja
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(v) if v.fract() == 0.0 => format!("{}", *v as i64),
        other => other.to_string(),
    }
}

/// Importar un libro mensual en una sola transacción, con un SAVEPOINT por fila.
pub async fn import_workbook(state: &AppState, path: &Path) -> Result<WorkbookStats, AppError> {
    info!("📗 Importando libro de kilometraje: {}", path.display());
    let mut workbook = open_workbook_auto(path)?;
    let mut stats = WorkbookStats {
        file: path.display().to_string(),
        ..Default::default()
    };

    let mut tx = state.pool.begin().await?;

    for sheet in workbook.sheet_names() {
        if sheet.trim().eq_ignore_ascii_case(SLOTS_SHEET) {
            debug!("⏭️ Hoja {} omitida", sheet);
            continue;
        }

        let Some(period) = workbook_parser::parse_sheet_name(&sheet) else {
            warn!("⚠️ Hoja '{}' sin mes reconocible, se omite", sheet);
            stats.sheets_skipped.push(sheet);
            continue;
        };

        let range = match workbook.worksheet_range(&sheet) {
            Ok(range) => range,
            Err(e) => {
                error!("❌ Hoja '{}' ilegible: {}", sheet, e);
                stats.sheets_failed.push(sheet);
                continue;
            }
        };

        // Las columnas se indexan desde A aunque el rango empiece más a la derecha
        let column_offset = range.start().map(|(_, col)| col as usize).unwrap_or(0);
        let rows = range.rows().map(|cells| {
            let mut texts = vec![String::new(); column_offset];
            texts.extend(cells.iter().map(cell_text));
            texts
        });
        let reports = workbook_parser::parse_sheet_rows(&period, rows);
        debug!("📄 Hoja '{}' → {} {}: {} filas", sheet, period.month, period.year, reports.len());
        if let Err(e) = upsert_sheet(state, &mut tx, &sheet, &reports, &mut stats).await {
            return Err(finish_interrupted(tx, e).await);
        }
        info!("✅ Hoja '{}' importada ({} filas)", sheet, reports.len());
        stats.sheets_imported.push(sheet);
    }

    tx.commit().await?;
    stats.totals_repaired = repair_mileage_totals(state).await?;
    info!(
        "📊 Libro importado: {} nuevas, {} actualizadas, {} sin cambios",
        stats.inserted, stats.updated, stats.unchanged
    );
    Ok(stats)
}

/// Importar una hoja ya convertida a texto, con su propia transacción.
/// Es el mismo camino que sigue cada hoja de `import_workbook`.
pub async fn import_sheet_rows<I>(state: &AppState, sheet: &str, rows: I) -> Result<WorkbookStats, AppError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut stats = WorkbookStats {
        file: sheet.to_string(),
        ..Default::default()
    };
    let Some(period) = workbook_parser::parse_sheet_name(sheet) else {
        warn!("⚠️ Hoja '{}' sin mes reconocible, se omite", sheet);
        stats.sheets_skipped.push(sheet.to_string());
        return Ok(stats);
    };

    let reports = workbook_parser::parse_sheet_rows(&period, rows);
    let mut tx = state.pool.begin().await?;
    if let Err(e) = upsert_sheet(state, &mut tx, sheet, &reports, &mut stats).await {
        return Err(finish_interrupted(tx, e).await);
    }
    tx.commit().await?;
    stats.sheets_imported.push(sheet.to_string());
    stats.totals_repaired = repair_mileage_totals(state).await?;
    Ok(stats)
}

/// Upsert de las filas de una hoja, una por SAVEPOINT. Con cancelación se
/// confirma lo hecho y se devuelve `AppError::Cancelled`.
async fn upsert_sheet(
    state: &AppState,
    tx: &mut Transaction<'_, Postgres>,
    sheet: &str,
    reports: &[NewMileageReport],
    stats: &mut WorkbookStats,
) -> Result<(), AppError> {
    for report in reports {
        if state.cancel.is_cancelled() {
            warn!("🛑 Importación cancelada en la hoja '{}'", sheet);
            return Err(AppError::Cancelled(format!("workbook sheet {}", sheet)));
        }

        let mut savepoint = Acquire::begin(&mut **tx).await?;
        match deduplicator::upsert_mileage(&mut savepoint, report).await {
            Ok(outcome) => {
                savepoint.commit().await?;
                match outcome {
                    UpsertOutcome::Inserted => stats.inserted += 1,
                    UpsertOutcome::Updated => stats.updated += 1,
                    UpsertOutcome::Unchanged => stats.unchanged += 1,
                }
            }
            Err(e) if e.is_connection_lost() => return Err(e),
            Err(e) => {
                savepoint.rollback().await?;
                warn!("⚠️ Fila {} de '{}' rechazada: {}", report.bus_id, sheet, e);
                stats.failed += 1;
            }
        }
    }
    Ok(())
}

/// Tras una cancelación las filas ya escritas se confirman; cualquier otro
/// error deshace la transacción del libro.
async fn finish_interrupted(tx: Transaction<'_, Postgres>, err: AppError) -> AppError {
    if matches!(err, AppError::Cancelled(_)) {
        if let Err(commit_err) = tx.commit().await {
            return commit_err.into();
        }
    }
    err
}

/// Pasada de reparación sobre todo `monthly_mileage_reports`
pub async fn repair_mileage_totals(state: &AppState) -> Result<u64, AppError> {
    let (recomputed, negated) = MileageRepository::new(state.pool.clone()).repair_totals().await?;
    if recomputed + negated > 0 {
        info!("🔧 Totales reparados: {} recalculados, {} negativos", recomputed, negated);
    }
    Ok(recomputed + negated)
}

/// Importar las tablas legacy de kilometraje y reparar totales
pub async fn import_legacy_mileage(state: &AppState) -> Result<Vec<SourceStats>, AppError> {
    let stats = vec![
        migrate_source(state, &SchoolBusesSource).await?,
        migrate_source(state, &AgencyVehiclesSource).await?,
    ];
    repair_mileage_totals(state).await?;
    Ok(stats)
}

const SCHOOL_BUS_SELECT: &[ColumnSpec] = &[
    ColumnSpec::text("report_month"),
    ColumnSpec::text("report_year"),
    ColumnSpec::text("bus_year"),
    ColumnSpec::text("bus_make"),
    ColumnSpec::text("license_plate"),
    ColumnSpec::text("bus_id"),
    ColumnSpec::text_as("location", "located_at"),
    ColumnSpec::text("beginning_miles"),
    ColumnSpec::text("ending_miles"),
    ColumnSpec::text("total_miles"),
];

const AGENCY_VEHICLE_SELECT: &[ColumnSpec] = &[
    ColumnSpec::text("report_month"),
    ColumnSpec::text("report_year"),
    ColumnSpec::text_as("vehicle_year", "bus_year"),
    ColumnSpec::text_as("make_model", "bus_make"),
    ColumnSpec::text("license_plate"),
    ColumnSpec::text_as("vehicle_id", "bus_id"),
    ColumnSpec::text_as("location", "located_at"),
    ColumnSpec::text("beginning_miles"),
    ColumnSpec::text("ending_miles"),
    ColumnSpec::text("total_miles"),
];

/// Tabla legacy `school_buses`
pub struct SchoolBusesSource;

/// Tabla legacy `agency_vehicles`
pub struct AgencyVehiclesSource;

#[async_trait]
impl LegacySource for SchoolBusesSource {
    type Row = LegacyMileageRow;

    fn table(&self) -> &'static str {
        "school_buses"
    }

    fn columns(&self) -> &'static [ColumnSpec] {
        SCHOOL_BUS_SELECT
    }

    fn row_key(&self, row: &LegacyMileageRow) -> String {
        row.bus_id.clone().unwrap_or_default()
    }

    async fn migrate_row(
        &self,
        conn: &mut PgConnection,
        row: &LegacyMileageRow,
        _stats: &mut SourceStats,
    ) -> Result<RowOutcome, AppError> {
        upsert_legacy_row(conn, row, canonical_bus_id).await
    }
}

#[async_trait]
impl LegacySource for AgencyVehiclesSource {
    type Row = LegacyMileageRow;

    fn table(&self) -> &'static str {
        "agency_vehicles"
    }

    fn columns(&self) -> &'static [ColumnSpec] {
        AGENCY_VEHICLE_SELECT
    }

    fn row_key(&self, row: &LegacyMileageRow) -> String {
        row.bus_id.clone().unwrap_or_default()
    }

    async fn migrate_row(
        &self,
        conn: &mut PgConnection,
        row: &LegacyMileageRow,
        _stats: &mut SourceStats,
    ) -> Result<RowOutcome, AppError> {
        upsert_legacy_row(conn, row, |id| id.trim().to_string()).await
    }
}

/// Convertir una fila legacy en reporte. `None` si falta la clave natural.
pub fn legacy_report(
    row: &LegacyMileageRow,
    bus_id: impl Fn(&str) -> String,
) -> Result<NewMileageReport, SkipReason> {
    let month = non_empty(row.report_month.as_deref()).ok_or(SkipReason::MissingField("report_month"))?;
    let report_year =
        parse_optional_int(row.report_year.as_deref()).ok_or(SkipReason::MissingField("report_year"))?;
    let raw_id = non_empty(row.bus_id.as_deref()).ok_or(SkipReason::MissingField("bus_id"))?;

    let period = SheetPeriod {
        month: month_name(&month).map(str::to_string).unwrap_or(month),
        year: report_year,
    };

    let mut report = NewMileageReport {
        report_month: period.month,
        report_year: period.year,
        bus_year: parse_optional_int(row.bus_year.as_deref()).and_then(valid_model_year),
        bus_make: non_empty(row.bus_make.as_deref()),
        license_plate: non_empty(row.license_plate.as_deref()),
        bus_id: bus_id(&raw_id),
        located_at: non_empty(row.located_at.as_deref()),
        beginning_miles: parse_optional_int(row.beginning_miles.as_deref()),
        ending_miles: parse_optional_int(row.ending_miles.as_deref()),
        total_miles: parse_optional_int(row.total_miles.as_deref()),
    };
    if report.has_no_mileage() {
        return Err(SkipReason::MissingField("mileage"));
    }
    report.repair_totals();
    Ok(report)
}

async fn upsert_legacy_row(
    conn: &mut PgConnection,
    row: &LegacyMileageRow,
    bus_id: impl Fn(&str) -> String + Send,
) -> Result<RowOutcome, AppError> {
    let report = match legacy_report(row, bus_id) {
        Ok(report) => report,
        Err(reason) => return Ok(RowOutcome::Skipped(reason)),
    };

    let label = format!("{} {} {}", report.bus_id, report.report_month, report.report_year);
    match deduplicator::upsert_mileage(conn, &report).await? {
        UpsertOutcome::Inserted | UpsertOutcome::Updated => Ok(RowOutcome::Imported(label)),
        UpsertOutcome::Unchanged => Ok(RowOutcome::Skipped(SkipReason::Duplicate(label))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_row(bus_id: &str, begin: Option<&str>, end: Option<&str>, total: Option<&str>) -> LegacyMileageRow {
        LegacyMileageRow {
            report_month: Some("sept".into()),
            report_year: Some("2024".into()),
            bus_year: Some("2012".into()),
            bus_make: Some("CHEVY".into()),
            license_plate: None,
            bus_id: Some(bus_id.into()),
            located_at: Some("DEPOT".into()),
            beginning_miles: begin.map(String::from),
            ending_miles: end.map(String::from),
            total_miles: total.map(String::from),
        }
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(2012.0)), "2012");
        assert_eq!(cell_text(&Data::Float(1500.5)), "1500.5");
        assert_eq!(cell_text(&Data::String("ABC-123".into())), "ABC-123");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::Int(24)), "24");
    }

    #[test]
    fn test_legacy_school_bus_row() {
        let report = legacy_report(&legacy_row("24", Some("10000"), Some("11500"), Some("-1500")), canonical_bus_id)
            .unwrap();
        assert_eq!(report.report_month, "September");
        assert_eq!(report.bus_id, "BUS24");
        assert_eq!(report.total_miles, Some(1500));
    }

    #[test]
    fn test_legacy_row_without_mileage_is_skipped() {
        let result = legacy_report(&legacy_row("24", Some("0"), None, Some("0")), canonical_bus_id);
        assert_eq!(result, Err(SkipReason::MissingField("mileage")));

        let mut row = legacy_row("24", Some("1"), Some("2"), None);
        row.report_year = None;
        assert_eq!(
            legacy_report(&row, canonical_bus_id),
            Err(SkipReason::MissingField("report_year"))
        );
    }
}
