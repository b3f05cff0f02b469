//! Consolidación de las tablas legacy de flota, mantenimiento y kilometraje
//! en el esquema canónico (`fleet_vehicles`, `maintenance_records`,
//! `monthly_mileage_reports`).

pub mod cli;
pub mod config;
pub mod database;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod utils;
