//! Configuración de base de datos
//!
//! Este módulo maneja la configuración del pool de PostgreSQL con SQLx.
//! El pipeline es de un solo escritor: una conexión lleva el cursor de lectura
//! de la fuente actual y la otra la transacción de escritura.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use super::environment::EnvironmentConfig;

/// Configuración de la base de datos
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl DatabaseConfig {
    /// Configuración por defecto para una URL dada
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 2,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
        }
    }

    /// Crear un nuevo pool de conexiones
    pub async fn create_pool(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.connect_timeout)
            .idle_timeout(self.idle_timeout)
            .connect(&self.url)
            .await
    }
}

impl From<&EnvironmentConfig> for DatabaseConfig {
    fn from(env: &EnvironmentConfig) -> Self {
        Self::new(env.database_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_writer_pool_sizing() {
        let config = DatabaseConfig::new("postgres://localhost/fleet");
        // cursor de lectura + transacción de escritura
        assert_eq!(config.max_connections, 2);
        assert!(config.min_connections <= config.max_connections);
    }
}
