//! Introspección del catálogo
//!
//! Todas las consultas se limitan a `current_schema()`, así el pipeline opera
//! sobre el esquema del `search_path` de la conexión.

use crate::utils::errors::AppError;
use sqlx::{PgExecutor, PgPool};

/// Columna que una fuente quiere leer, con el tipo al que se convierte.
/// Si la columna no existe en la tabla se selecciona `NULL`.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub column: &'static str,
    pub alias: &'static str,
    pub sql_type: &'static str,
}

impl ColumnSpec {
    pub const fn text(column: &'static str) -> Self {
        Self { column, alias: column, sql_type: "text" }
    }

    pub const fn text_as(column: &'static str, alias: &'static str) -> Self {
        Self { column, alias, sql_type: "text" }
    }

    pub const fn typed(column: &'static str, sql_type: &'static str) -> Self {
        Self { column, alias: column, sql_type }
    }
}

/// Tipo de relación en `information_schema.tables`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    BaseTable,
    View,
}

pub struct SchemaRepository {
    pool: PgPool,
}

impl SchemaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn relation_kind(&self, name: &str) -> Result<Option<RelationKind>, AppError> {
        relation_kind(&self.pool, name).await
    }

    /// `true` solo para tablas base: una vista de compatibilidad con el mismo
    /// nombre no cuenta como tabla legacy
    pub async fn base_table_exists(&self, name: &str) -> Result<bool, AppError> {
        Ok(self.relation_kind(name).await? == Some(RelationKind::BaseTable))
    }

    pub async fn columns_of(&self, table: &str) -> Result<Vec<String>, AppError> {
        columns_of(&self.pool, table).await
    }

    pub async fn column_exists(&self, table: &str, column: &str) -> Result<bool, AppError> {
        Ok(self.columns_of(table).await?.iter().any(|c| c == column))
    }

    /// Lista `SELECT` tolerante a columnas ausentes
    pub async fn select_list(&self, table: &str, specs: &[ColumnSpec]) -> Result<String, AppError> {
        let existing = self.columns_of(table).await?;
        Ok(build_select_list(&existing, specs))
    }

    pub async fn count_rows(&self, table: &str) -> Result<i64, AppError> {
        count_rows(&self.pool, table).await
    }

    /// Tablas base del esquema actual, ordenadas por nombre
    pub async fn list_base_tables(&self) -> Result<Vec<String>, AppError> {
        let tables = sqlx::query_scalar::<_, String>(
            r#"
            SELECT table_name::text FROM information_schema.tables
            WHERE table_schema = current_schema() AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }

    /// Pares `(tabla, columna)` de columnas `unnamed_*` en tablas base
    pub async fn unnamed_columns(&self) -> Result<Vec<(String, String)>, AppError> {
        let columns = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT c.table_name::text, c.column_name::text
            FROM information_schema.columns c
            JOIN information_schema.tables t
              ON t.table_schema = c.table_schema AND t.table_name = c.table_name
            WHERE c.table_schema = current_schema()
              AND t.table_type = 'BASE TABLE'
              AND c.column_name LIKE 'unnamed\_%'
            ORDER BY c.table_name, c.ordinal_position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(columns)
    }
}

pub async fn relation_kind<'e, E>(executor: E, name: &str) -> Result<Option<RelationKind>, AppError>
where
    E: PgExecutor<'e>,
{
    let kind = sqlx::query_scalar::<_, String>(
        r#"
        SELECT table_type::text FROM information_schema.tables
        WHERE table_schema = current_schema() AND table_name = $1
        "#,
    )
    .bind(name)
    .fetch_optional(executor)
    .await?;

    Ok(kind.and_then(|k| match k.as_str() {
        "BASE TABLE" => Some(RelationKind::BaseTable),
        "VIEW" => Some(RelationKind::View),
        _ => None,
    }))
}

pub async fn columns_of<'e, E>(executor: E, table: &str) -> Result<Vec<String>, AppError>
where
    E: PgExecutor<'e>,
{
    let columns = sqlx::query_scalar::<_, String>(
        r#"
        SELECT column_name::text FROM information_schema.columns
        WHERE table_schema = current_schema() AND table_name = $1
        ORDER BY ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(executor)
    .await?;

    Ok(columns)
}

pub async fn count_rows<'e, E>(executor: E, table: &str) -> Result<i64, AppError>
where
    E: PgExecutor<'e>,
{
    let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)))
        .fetch_one(executor)
        .await?;

    Ok(count)
}

/// Construye `"col"::tipo AS alias, NULL::tipo AS alias, ...`
pub fn build_select_list(existing: &[String], specs: &[ColumnSpec]) -> String {
    specs
        .iter()
        .map(|spec| {
            if existing.iter().any(|c| c == spec.column) {
                format!("{}::{} AS {}", quote_ident(spec.column), spec.sql_type, spec.alias)
            } else {
                format!("NULL::{} AS {}", spec.sql_type, spec.alias)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Comillas dobles para un identificador SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_list_fills_missing_columns() {
        let existing = vec!["bus_id".to_string(), "created_at".to_string()];
        let specs = [
            ColumnSpec::text("bus_id"),
            ColumnSpec::text_as("location", "located_at"),
            ColumnSpec::typed("created_at", "timestamp"),
        ];

        assert_eq!(
            build_select_list(&existing, &specs),
            "\"bus_id\"::text AS bus_id, NULL::text AS located_at, \"created_at\"::timestamp AS created_at"
        );
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("service_records"), "\"service_records\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }
}
