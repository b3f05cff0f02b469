//! Migrador genérico de fuentes legacy
//!
//! Cada fuente se recorre con un cursor en streaming (una conexión del pool)
//! mientras las escrituras van en una transacción por fuente (la otra
//! conexión). Cada fila se aplica dentro de un SAVEPOINT: si la base de datos
//! la rechaza se deshace solo esa fila y la fuente continúa.

use crate::models::{RowOutcome, SourceStats};
use crate::repositories::schema_repository::quote_ident;
use crate::repositories::{ColumnSpec, SchemaRepository};
use crate::state::AppState;
use crate::utils::errors::AppError;
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::PgRow;
use sqlx::{Acquire, FromRow, PgConnection};
use tracing::{debug, error, info, warn};

/// Cada cuántas importaciones se emite una línea de progreso
pub const PROGRESS_EVERY: usize = 10;

/// Una tabla legacy que se consume fila a fila
#[async_trait]
pub trait LegacySource: Send + Sync {
    type Row: for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin;

    /// Tabla legacy de origen
    fn table(&self) -> &'static str;

    /// Columnas a leer; las que falten en la tabla llegan como NULL
    fn columns(&self) -> &'static [ColumnSpec];

    /// Identificador de la fila para los logs
    fn row_key(&self, row: &Self::Row) -> String;

    /// Convertir y escribir una fila. Los errores devueltos se tratan como
    /// rechazo de la fila (WARN + contador de fallidas).
    async fn migrate_row(
        &self,
        conn: &mut PgConnection,
        row: &Self::Row,
        stats: &mut SourceStats,
    ) -> Result<RowOutcome, AppError>;
}

/// Recorrer una fuente completa.
///
/// - Tabla ausente (o solo una vista con ese nombre): estadísticas `absent`.
/// - Error del stream: se confirma lo hecho, se registra en `stats.error` y se
///   devuelve `Ok` para que el resto de fuentes continúe.
/// - Cancelación: se confirma lo hecho y se devuelve `AppError::Cancelled`.
pub async fn run_source<S: LegacySource>(state: &AppState, source: &S) -> Result<SourceStats, AppError> {
    let table = source.table();
    let schema = SchemaRepository::new(state.pool.clone());

    if !schema.base_table_exists(table).await? {
        info!("⏭️ Fuente {} no presente, se omite", table);
        return Ok(SourceStats::absent(table));
    }

    let select_list = schema.select_list(table, source.columns()).await?;
    let sql = format!("SELECT {} FROM {}", select_list, quote_ident(table));
    debug!("🔍 {}", sql);

    info!("🚚 Migrando {}...", table);
    let mut stats = SourceStats::new(table);
    let mut tx = state.pool.begin().await?;
    let mut rows = sqlx::query_as::<_, S::Row>(&sql).fetch(&state.pool);

    loop {
        if state.cancel.is_cancelled() {
            drop(rows);
            tx.commit().await?;
            warn!("🛑 Migración de {} cancelada tras {} filas importadas", table, stats.imported);
            return Err(AppError::Cancelled(table.to_string()));
        }

        let row = match rows.try_next().await {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) => {
                error!("❌ Lectura de {} interrumpida: {}", table, e);
                stats.error = Some(e.to_string());
                break;
            }
        };

        let key = source.row_key(&row);
        let mut savepoint = Acquire::begin(&mut tx).await?;

        match source.migrate_row(&mut savepoint, &row, &mut stats).await {
            Ok(outcome) => {
                savepoint.commit().await?;
                match &outcome {
                    RowOutcome::Imported(label) => {
                        debug!("✅ {} → {}", key, label);
                    }
                    RowOutcome::Skipped(reason) => {
                        debug!("⏭️ {} '{}' omitida: {}", table, key, reason);
                    }
                }
                stats.record(&outcome);
                if matches!(outcome, RowOutcome::Imported(_)) && stats.imported % PROGRESS_EVERY == 0 {
                    debug!("📈 {}: {} filas importadas", table, stats.imported);
                }
            }
            Err(e) if e.is_connection_lost() => {
                error!("❌ Conexión perdida migrando {} en '{}': {}", table, key, e);
                stats.error = Some(e.to_string());
                drop(savepoint);
                drop(rows);
                return Ok(stats);
            }
            Err(e) => {
                savepoint.rollback().await?;
                warn!("⚠️ Fila {} '{}' rechazada: {}", table, key, e);
                stats.failed += 1;
            }
        }
    }

    drop(rows);
    if let Err(e) = tx.commit().await {
        error!("❌ No se pudo confirmar {}: {}", table, e);
        stats.error.get_or_insert_with(|| e.to_string());
        return Ok(stats);
    }

    info!("📊 {}", stats);
    Ok(stats)
}

/// `run_source` para el pipeline: un error de la fuente se registra y el
/// pipeline sigue con la siguiente. Solo la cancelación se propaga.
pub async fn migrate_source<S: LegacySource>(state: &AppState, source: &S) -> Result<SourceStats, AppError> {
    match run_source(state, source).await {
        Ok(stats) => Ok(stats),
        Err(e @ AppError::Cancelled(_)) => Err(e),
        Err(e) => {
            error!("❌ Fuente {} abandonada: {}", source.table(), e);
            let mut stats = SourceStats::new(source.table());
            stats.error = Some(e.to_string());
            Ok(stats)
        }
    }
}
