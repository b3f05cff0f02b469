//! Repositorios
//!
//! Acceso SQL a las tablas canónicas y al catálogo. Las escrituras reciben la
//! conexión de la transacción activa; las lecturas usan el pool.

pub mod fleet_vehicle_repository;
pub mod maintenance_repository;
pub mod mileage_repository;
pub mod schema_repository;

pub use fleet_vehicle_repository::FleetVehicleRepository;
pub use maintenance_repository::MaintenanceRepository;
pub use mileage_repository::MileageRepository;
pub use schema_repository::{ColumnSpec, RelationKind, SchemaRepository};
