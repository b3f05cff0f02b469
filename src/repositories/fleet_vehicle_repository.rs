use crate::models::{FleetVehicle, NewFleetVehicle, VehicleType};
use crate::utils::errors::AppError;
use sqlx::{PgConnection, PgPool};

const FLEET_COLUMNS: &str = "vehicle_number, sheet_name, year, make, model, description, \
     serial_number, license, location, tire_size, vehicle_type, created_at, updated_at";

/// Lecturas sobre `fleet_vehicles`
pub struct FleetVehicleRepository {
    pool: PgPool,
}

impl FleetVehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Todos los vehículos en un orden estable
    pub async fn list_all(&self) -> Result<Vec<FleetVehicle>, AppError> {
        let vehicles = sqlx::query_as::<_, FleetVehicle>(&format!(
            "SELECT {} FROM fleet_vehicles ORDER BY vehicle_number, license, sheet_name",
            FLEET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    pub async fn find_by_number(&self, vehicle_number: i32) -> Result<Option<FleetVehicle>, AppError> {
        let vehicle = sqlx::query_as::<_, FleetVehicle>(&format!(
            "SELECT {} FROM fleet_vehicles WHERE vehicle_number = $1 LIMIT 1",
            FLEET_COLUMNS
        ))
        .bind(vehicle_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vehicle)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM fleet_vehicles")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn count_by_type(&self, vehicle_type: VehicleType) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM fleet_vehicles WHERE vehicle_type = $1",
        )
        .bind(vehicle_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Insertar un vehículo dentro de la transacción de la fuente
pub async fn insert(conn: &mut PgConnection, vehicle: &NewFleetVehicle) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO fleet_vehicles (
            vehicle_number, sheet_name, year, make, model, description,
            serial_number, license, location, tire_size, vehicle_type,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW())
        "#,
    )
    .bind(vehicle.vehicle_number)
    .bind(&vehicle.sheet_name)
    .bind(vehicle.year)
    .bind(&vehicle.make)
    .bind(&vehicle.model)
    .bind(&vehicle.description)
    .bind(&vehicle.serial_number)
    .bind(&vehicle.license)
    .bind(&vehicle.location)
    .bind(&vehicle.tire_size)
    .bind(vehicle.vehicle_type.as_str())
    .execute(conn)
    .await?;

    Ok(())
}

/// `true` si existe algún vehículo con ese número
pub async fn number_exists(conn: &mut PgConnection, vehicle_number: i32) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM fleet_vehicles WHERE vehicle_number = $1)",
    )
    .bind(vehicle_number)
    .fetch_one(conn)
    .await?;

    Ok(exists)
}

/// Número del vehículo registrado con esa licencia
pub async fn number_for_license(
    conn: &mut PgConnection,
    license: &str,
) -> Result<Option<i32>, AppError> {
    let number = sqlx::query_scalar::<_, i32>(
        "SELECT vehicle_number FROM fleet_vehicles \
         WHERE license = $1 AND vehicle_number IS NOT NULL \
         ORDER BY vehicle_number LIMIT 1",
    )
    .bind(license)
    .fetch_optional(conn)
    .await?;

    Ok(number)
}
