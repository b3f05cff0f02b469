//! Módulo de base de datos
//!
//! Maneja la conexión con PostgreSQL durante una ejecución del pipeline

pub mod connection;

pub use connection::DatabaseConnection;
