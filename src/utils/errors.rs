//! Sistema de manejo de errores
//!
//! Este módulo define los tipos de errores del pipeline de consolidación.
//! Los errores a nivel de fila no pasan por aquí: se cuentan en las
//! estadísticas de cada fuente y el pipeline continúa.

use thiserror::Error;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Run cancelled while processing {0}")]
    Cancelled(String),
}

impl AppError {
    /// Un error de conexión impide seguir con cualquier fuente
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            AppError::Database(sqlx::Error::Io(_))
                | AppError::Database(sqlx::Error::PoolClosed)
                | AppError::Database(sqlx::Error::PoolTimedOut)
        )
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de configuración
pub fn config_error(variable: &str, reason: &str) -> AppError {
    AppError::Config(format!("{}: {}", variable, reason))
}

/// Función helper para crear errores de esquema
pub fn schema_error(step: &str, err: &sqlx::Error) -> AppError {
    AppError::Schema(format!("{} failed: {}", step, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = config_error("PGHOST", "not set");
        assert_eq!(err.to_string(), "Configuration error: PGHOST: not set");
    }

    #[test]
    fn test_connection_lost_detection() {
        assert!(AppError::Database(sqlx::Error::PoolClosed).is_connection_lost());
        assert!(!AppError::Database(sqlx::Error::RowNotFound).is_connection_lost());
        assert!(!AppError::Cancelled("buses".to_string()).is_connection_lost());
    }
}
