//! Modelo de MaintenanceRecord
//!
//! Un evento de mantenimiento ligado a un vehículo. La fecha efectiva del
//! evento es `COALESCE(service_date, date, created_at)`.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::FromRow;

/// Expresión SQL de la fecha efectiva, truncada a día
pub const EFFECTIVE_DATE_SQL: &str = "COALESCE(service_date, date, created_at::date)";

/// MaintenanceRecord - mapea a la tabla maintenance_records
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MaintenanceRecord {
    pub id: i32,
    pub vehicle_number: Option<i32>,
    pub vehicle_id: Option<String>,
    pub service_date: Option<NaiveDate>,
    pub date: Option<NaiveDate>,
    pub mileage: Option<i32>,
    pub po_number: Option<String>,
    pub cost: Option<String>,
    pub work_description: Option<String>,
    pub raw_data: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Datos para insertar un registro de mantenimiento nuevo
#[derive(Debug, Clone, PartialEq)]
pub struct NewMaintenanceRecord {
    pub vehicle_number: i32,
    pub vehicle_id: String,
    pub service_date: NaiveDate,
    pub mileage: Option<i32>,
    pub po_number: Option<String>,
    pub cost: Option<String>,
    pub work_description: String,
    pub raw_data: Option<String>,
    /// `created_at` del registro legacy, si existe
    pub source_created_at: Option<NaiveDateTime>,
}
