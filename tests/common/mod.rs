//! Base de datos de prueba: un esquema propio por test
//!
//! Los tests solo corren si `TEST_DATABASE_URL` está definida.

#![allow(dead_code)]

use fleet_consolidation::services::Pipeline;
use fleet_consolidation::state::AppState;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;

pub struct TestDb {
    pub pool: PgPool,
    pub schema: String,
    admin: PgPool,
}

impl TestDb {
    pub async fn new() -> Option<Self> {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping");
            return None;
        };

        let schema = format!("fleet_test_{}", uuid::Uuid::new_v4().simple());
        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .expect("connect to TEST_DATABASE_URL");
        admin
            .execute(format!("CREATE SCHEMA {}", schema).as_str())
            .await
            .expect("create test schema");

        let search_path = format!("SET search_path TO {}", schema);
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .after_connect(move |conn, _meta| {
                let sql = search_path.clone();
                Box::pin(async move {
                    conn.execute(sql.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .expect("connect test pool");

        Some(Self { pool, schema, admin })
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(AppState::new(self.pool.clone()))
    }

    pub async fn exec(&self, sql: &str) {
        self.pool
            .execute(sql)
            .await
            .unwrap_or_else(|e| panic!("{}: {}", sql, e));
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await
            .unwrap_or_else(|e| panic!("{}: {}", sql, e))
    }

    /// Contenido completo de una tabla como JSON, en orden estable
    pub async fn snapshot(&self, table: &str, order_by: &str) -> Vec<String> {
        sqlx::query_scalar::<_, String>(&format!(
            "SELECT row_to_json(t)::text FROM {} t ORDER BY {}",
            table, order_by
        ))
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| panic!("snapshot {}: {}", table, e))
    }

    pub async fn teardown(self) {
        self.pool.close().await;
        let _ = self
            .admin
            .execute(format!("DROP SCHEMA {} CASCADE", self.schema).as_str())
            .await;
        self.admin.close().await;
    }
}

/// Tablas legacy tal como las dejaron los importadores de hojas de cálculo
pub const LEGACY_DDL: &str = r#"
CREATE TABLE buses (bus_id TEXT, model TEXT);
CREATE TABLE vehicles (
    vehicle_id TEXT, model TEXT, description TEXT, year TEXT,
    tire_size TEXT, license TEXT, serial_number TEXT, base TEXT
);
CREATE TABLE service_records (
    unnamed_0 TEXT, unnamed_1 TEXT, unnamed_2 TEXT, unnamed_3 TEXT, unnamed_4 TEXT,
    unnamed_5 TEXT, unnamed_6 TEXT, unnamed_7 TEXT, unnamed_8 TEXT, unnamed_9 TEXT,
    unnamed_10 TEXT, unnamed_11 TEXT, unnamed_12 TEXT, unnamed_13 TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE maintenance_sheets (
    vehicle_id TEXT, description TEXT,
    unnamed_1 TEXT, unnamed_2 TEXT, unnamed_3 TEXT, unnamed_4 TEXT,
    created_at TIMESTAMP
);
CREATE TABLE school_buses (
    report_month TEXT, report_year INTEGER, bus_year INTEGER, bus_make TEXT,
    license_plate TEXT, bus_id TEXT, location TEXT,
    beginning_miles INTEGER, ending_miles INTEGER, total_miles INTEGER
);
CREATE TABLE agency_vehicles (
    report_month TEXT, report_year INTEGER, vehicle_year INTEGER, make_model TEXT,
    license_plate TEXT, vehicle_id TEXT, location TEXT,
    beginning_miles INTEGER, ending_miles INTEGER, total_miles INTEGER
);
"#;

/// Filas de S1, S2 y S3 más algo de ruido realista
pub const LEGACY_SEED: &str = r#"
INSERT INTO buses (bus_id, model) VALUES
    ('Bus-24', '2015 Bluebird Vision'),
    ('', 'sin identificador');
INSERT INTO vehicles (vehicle_id, model, description, year, tire_size, license, serial_number, base) VALUES
    ('VAN-7', 'Ford Transit Van', NULL, '2019', '225/75R16', NULL, '1FTBW3XM', 'North Depot');
INSERT INTO service_records (unnamed_0, unnamed_1, unnamed_2, unnamed_3, unnamed_4, unnamed_5, unnamed_8, created_at) VALUES
    ('2018 Chevrolet Express', '12', 'Main Yard', '48,120', '45000', '51000', '3000', '2024-03-05 08:00:00'),
    ('2018 Chevrolet Express', '12', 'Main Yard', '48150', '45000', '51000', '3000', '2024-03-05 16:30:00'),
    ('Vehicle Description', 'Vehicle #', 'Location', 'Mileage', NULL, NULL, NULL, '2024-03-05 08:00:00');
INSERT INTO maintenance_sheets (vehicle_id, description, unnamed_1, unnamed_2, created_at) VALUES
    ('7', 'Ford Transit Van', 'Oil change', 'Rotate tires', '2024-04-02 10:00:00');
INSERT INTO school_buses VALUES
    ('sept', 2024, 2010, 'THOMAS', 'SB-1', '31', 'DEPOT', 5000, 5600, 0),
    ('oct', 2024, 2010, 'THOMAS', 'SB-1', '31', 'DEPOT', 0, 0, 0);
INSERT INTO agency_vehicles VALUES
    ('September', 2024, 2016, 'FORD FUSION', 'AG-9', 'CAR-9', 'CITY HALL', 1200, 1000, -200);
"#;

pub async fn seed_legacy(db: &TestDb) {
    db.exec(LEGACY_DDL).await;
    db.exec(LEGACY_SEED).await;
}

pub fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

/// Hoja "Sept 24" del libro mensual con una fila de datos
pub fn sept_sheet(ending_miles: &str) -> Vec<Vec<String>> {
    vec![
        row(&["MONTHLY MILEAGE REPORT"]),
        row(&["SCHOOL BUS"]),
        row(&["Year", "Make", "License", "ID", "Location", "Begin", "End", "Total"]),
        row(&["2012", "CHEVY", "ABC-123", "24", "DEPOT", "10,000", ending_miles, "-1500"]),
        row(&["AGENCY VEHICLE"]),
        row(&["2016", "FORD", "AG-1", "99", "CITY", "1", "2", "1"]),
    ]
}
