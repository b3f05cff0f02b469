//! Services module
//!
//! Este módulo contiene la lógica de la consolidación: los componentes puros
//! (normalizador, clasificador, inferencia de columnas, lectura de hojas) y
//! los pasos que escriben en la base de datos (migradores, evolución de
//! esquema, validación).

pub mod classifier;
pub mod column_inferrer;
pub mod deduplicator;
pub mod identifier_normalizer;
pub mod introspection;
pub mod maintenance_migrator;
pub mod migrator;
pub mod mileage_importer;
pub mod pipeline;
pub mod schema_evolver;
pub mod validator;
pub mod vehicle_migrator;
pub mod workbook_parser;

pub use migrator::LegacySource;
pub use pipeline::{Pipeline, RunOptions, RunSummary};
pub use schema_evolver::SchemaEvolver;
pub use validator::Validator;
