//! Modelo de MonthlyMileageReport
//!
//! Una tupla (vehículo, mes). La clave natural es
//! `(report_month, report_year, bus_id)`.

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// MonthlyMileageReport - mapea a la tabla monthly_mileage_reports
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MonthlyMileageReport {
    pub id: i32,
    pub report_month: Option<String>,
    pub report_year: Option<i32>,
    pub bus_year: Option<i32>,
    pub bus_make: Option<String>,
    pub license_plate: Option<String>,
    pub bus_id: Option<String>,
    pub located_at: Option<String>,
    pub beginning_miles: Option<i32>,
    pub ending_miles: Option<i32>,
    pub total_miles: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Fila lista para el upsert por clave natural
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMileageReport {
    pub report_month: String,
    pub report_year: i32,
    pub bus_year: Option<i32>,
    pub bus_make: Option<String>,
    pub license_plate: Option<String>,
    pub bus_id: String,
    pub located_at: Option<String>,
    pub beginning_miles: Option<i32>,
    pub ending_miles: Option<i32>,
    pub total_miles: Option<i32>,
}

impl NewMileageReport {
    /// Reparar `total_miles`:
    /// - un total negativo se lleva a cero,
    /// - con ambos extremos presentes y `ending >= beginning` el total es la diferencia.
    pub fn repair_totals(&mut self) {
        if let Some(total) = self.total_miles {
            if total < 0 {
                self.total_miles = Some(0);
            }
        }

        if let (Some(begin), Some(end)) = (self.beginning_miles, self.ending_miles) {
            if begin >= 0 && end >= begin {
                self.total_miles = Some(end - begin);
            }
        }
    }

    /// `true` si la fila no trae ningún kilometraje útil
    pub fn has_no_mileage(&self) -> bool {
        [self.beginning_miles, self.ending_miles, self.total_miles]
            .iter()
            .all(|m| m.unwrap_or(0) <= 0)
    }
}
