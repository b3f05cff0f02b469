//! Modelo de FleetVehicle
//!
//! Un vehículo físico de la flota. Mapea a la tabla canónica `fleet_vehicles`;
//! `vehicle_number` es la clave de negocio.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Tipo de vehículo - conjunto cerrado asignado por el clasificador
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Bus,
    Van,
    Truck,
    Car,
    Suv,
    Other,
}

impl VehicleType {
    pub const ALL: [VehicleType; 6] = [
        VehicleType::Bus,
        VehicleType::Van,
        VehicleType::Truck,
        VehicleType::Car,
        VehicleType::Suv,
        VehicleType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Bus => "bus",
            VehicleType::Van => "van",
            VehicleType::Truck => "truck",
            VehicleType::Car => "car",
            VehicleType::Suv => "suv",
            VehicleType::Other => "other",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VehicleType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown vehicle type '{}'", s))
    }
}

/// FleetVehicle - mapea a la tabla fleet_vehicles
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FleetVehicle {
    pub vehicle_number: Option<i32>,
    pub sheet_name: Option<String>,
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub serial_number: Option<String>,
    pub license: Option<String>,
    pub location: Option<String>,
    pub tire_size: Option<String>,
    pub vehicle_type: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Datos para insertar un vehículo nuevo
#[derive(Debug, Clone, PartialEq)]
pub struct NewFleetVehicle {
    pub vehicle_number: i32,
    pub sheet_name: String,
    pub year: Option<i32>,
    pub make: String,
    pub model: Option<String>,
    pub description: Option<String>,
    pub serial_number: Option<String>,
    pub license: String,
    pub location: Option<String>,
    pub tire_size: Option<String>,
    pub vehicle_type: VehicleType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_type_round_trip_names() {
        assert_eq!("BUS".parse::<VehicleType>().unwrap(), VehicleType::Bus);
        assert_eq!(" suv ".parse::<VehicleType>().unwrap(), VehicleType::Suv);
        assert!("tractor".parse::<VehicleType>().is_err());
        assert_eq!(VehicleType::Other.to_string(), "other");
    }
}
