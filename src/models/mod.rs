//! Modelos del sistema
//!
//! Este módulo contiene los modelos de las tablas canónicas, las filas de las
//! tablas legacy y los tipos de reporte del pipeline.

pub mod fleet_vehicle;
pub mod legacy;
pub mod maintenance_record;
pub mod mileage_report;
pub mod report;
pub mod stats;

pub use fleet_vehicle::{FleetVehicle, NewFleetVehicle, VehicleType};
pub use maintenance_record::{MaintenanceRecord, NewMaintenanceRecord};
pub use mileage_report::{MonthlyMileageReport, NewMileageReport};
pub use report::{CheckStatus, Disposition, ValidationReport, ValidationResult};
pub use stats::{NumberCollision, RowOutcome, SkipReason, SourceStats};
