mod common;

use std::path::Path;
use std::time::Duration;

use common::{row, seed_legacy, sept_sheet, TestDb};
use fleet_consolidation::repositories::MileageRepository;
use fleet_consolidation::services::mileage_importer::import_sheet_rows;
use rust_xlsxwriter::{Workbook, Worksheet};

/// Escribe una fila a partir de `first_col`; los números van como celdas numéricas
fn write_row(sheet: &mut Worksheet, row: u32, first_col: u16, cells: &[&str]) {
    for (i, cell) in cells.iter().enumerate() {
        let col = first_col + i as u16;
        if cell.is_empty() {
            continue;
        }
        match cell.parse::<f64>() {
            Ok(number) => sheet.write_number(row, col, number).unwrap(),
            Err(_) => sheet.write_string(row, col, *cell).unwrap(),
        };
    }
}

/// Libro con `slots`, una hoja mensual que empieza en la columna B y una
/// hoja sin mes
fn write_monthly_workbook(path: &Path) {
    let mut workbook = Workbook::new();

    let slots = workbook.add_worksheet().set_name("slots").unwrap();
    write_row(slots, 0, 0, &["SCHOOL BUS"]);
    write_row(slots, 1, 0, &["2010", "THOMAS", "S-1", "99", "DEPOT", "1", "2", "1"]);

    // Columna A vacía: el rango leído empieza en B
    let sept = workbook.add_worksheet().set_name("Sept 24").unwrap();
    write_row(sept, 0, 1, &["MONTHLY MILEAGE REPORT"]);
    write_row(sept, 1, 1, &["SCHOOL BUS"]);
    write_row(sept, 2, 1, &["Make", "License", "ID", "Location", "Begin", "End", "Total"]);
    write_row(sept, 3, 1, &["CHEVY", "ABC-123", "24", "DEPOT", "10000", "11500", "-1500"]);
    write_row(sept, 4, 1, &["AGENCY VEHICLE"]);
    write_row(sept, 5, 1, &["FORD", "AG-1", "98", "CITY", "1", "2", "1"]);

    let summary = workbook.add_worksheet().set_name("Summary").unwrap();
    write_row(summary, 0, 0, &["SCHOOL BUS"]);
    write_row(summary, 1, 0, &["2011", "FORD", "S-2", "97", "DEPOT", "1", "2", "1"]);

    workbook.save(path).unwrap();
}

#[tokio::test]
async fn test_xlsx_workbook_is_ingested() {
    let Some(db) = TestDb::new().await else { return };
    let pipeline = db.pipeline();
    pipeline.evolve().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("monthly_mileage.xlsx");
    write_monthly_workbook(&path);

    let stats = pipeline.import_workbook(&path).await.unwrap();
    assert_eq!(stats.sheets_imported, vec!["Sept 24".to_string()]);
    assert_eq!(stats.sheets_skipped, vec!["Summary".to_string()]);
    assert!(stats.sheets_failed.is_empty());
    assert_eq!(stats.inserted, 1);

    let report = MileageRepository::new(db.pool.clone())
        .find_by_key("September", 2024, "BUS24")
        .await
        .unwrap()
        .expect("BUS24 September 2024");
    assert_eq!(report.bus_year, None);
    assert_eq!(report.bus_make.as_deref(), Some("CHEVY"));
    assert_eq!(report.license_plate.as_deref(), Some("ABC-123"));
    assert_eq!(report.beginning_miles, Some(10000));
    assert_eq!(report.ending_miles, Some(11500));
    assert_eq!(report.total_miles, Some(1500));

    // Ni `slots` ni la sección AGENCY VEHICLE aportan filas
    assert_eq!(db.count("SELECT COUNT(*) FROM monthly_mileage_reports").await, 1);

    db.teardown().await;
}

#[tokio::test]
async fn test_sept_sheet_row_is_imported() {
    let Some(db) = TestDb::new().await else { return };
    let pipeline = db.pipeline();
    pipeline.evolve().await.unwrap();

    let stats = import_sheet_rows(pipeline.state(), "Sept 24", sept_sheet("11,500"))
        .await
        .unwrap();
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.sheets_imported, vec!["Sept 24".to_string()]);

    let report = MileageRepository::new(db.pool.clone())
        .find_by_key("September", 2024, "BUS24")
        .await
        .unwrap()
        .expect("BUS24 September 2024");
    assert_eq!(report.bus_year, Some(2012));
    assert_eq!(report.bus_make.as_deref(), Some("CHEVY"));
    assert_eq!(report.license_plate.as_deref(), Some("ABC-123"));
    assert_eq!(report.located_at.as_deref(), Some("DEPOT"));
    assert_eq!(report.beginning_miles, Some(10000));
    assert_eq!(report.ending_miles, Some(11500));
    assert_eq!(report.total_miles, Some(1500));

    // La sección AGENCY VEHICLE no se importa
    assert_eq!(db.count("SELECT COUNT(*) FROM monthly_mileage_reports").await, 1);

    db.teardown().await;
}

#[tokio::test]
async fn test_reimport_updates_in_place() {
    let Some(db) = TestDb::new().await else { return };
    let pipeline = db.pipeline();
    pipeline.evolve().await.unwrap();
    let repo = MileageRepository::new(db.pool.clone());

    import_sheet_rows(pipeline.state(), "Sept 24", sept_sheet("11,500"))
        .await
        .unwrap();
    let first = repo.find_by_key("September", 2024, "BUS24").await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let stats = import_sheet_rows(pipeline.state(), "Sept 24", sept_sheet("12,000"))
        .await
        .unwrap();
    assert_eq!(stats.updated, 1);
    assert_eq!(stats.inserted, 0);

    let second = repo.find_by_key("September", 2024, "BUS24").await.unwrap().unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.ending_miles, Some(12000));
    assert_eq!(second.total_miles, Some(2000));
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at > first.updated_at);

    // Mismo contenido otra vez: sin cambios
    let unchanged = import_sheet_rows(pipeline.state(), "Sept 24", sept_sheet("12,000"))
        .await
        .unwrap();
    assert_eq!(unchanged.unchanged, 1);
    let third = repo.find_by_key("September", 2024, "BUS24").await.unwrap().unwrap();
    assert_eq!(third.updated_at, second.updated_at);

    db.teardown().await;
}

#[tokio::test]
async fn test_unrecognized_sheet_is_skipped() {
    let Some(db) = TestDb::new().await else { return };
    let pipeline = db.pipeline();
    pipeline.evolve().await.unwrap();

    let stats = import_sheet_rows(pipeline.state(), "Summary", sept_sheet("11,500"))
        .await
        .unwrap();
    assert_eq!(stats.sheets_skipped, vec!["Summary".to_string()]);
    assert_eq!(db.count("SELECT COUNT(*) FROM monthly_mileage_reports").await, 0);

    db.teardown().await;
}

#[tokio::test]
async fn test_mileage_invariant_holds_after_ingestion() {
    let Some(db) = TestDb::new().await else { return };
    seed_legacy(&db).await;
    let pipeline = db.pipeline();
    pipeline.evolve().await.unwrap();

    // Fila heredada con un total incoherente
    db.exec(
        "INSERT INTO monthly_mileage_reports \
         (report_month, report_year, bus_id, beginning_miles, ending_miles, total_miles) \
         VALUES ('August', 2024, 'BUS77', 100, 400, 999)",
    )
    .await;

    let sheet = vec![
        row(&["SCHOOL BUS"]),
        row(&["2014", "FORD", "XYZ-1", "5", "DEPOT", "2,000", "2,750.9", "0"]),
        row(&["2015", "FORD", "XYZ-2", "6", "DEPOT", "3000", "3500", "~~400~~"]),
    ];
    import_sheet_rows(pipeline.state(), "Oct 2024", sheet).await.unwrap();
    pipeline.import_legacy_mileage().await.unwrap();

    let violations = MileageRepository::new(db.pool.clone())
        .count_invariant_violations()
        .await
        .unwrap();
    assert_eq!(violations, 0);

    let repo = MileageRepository::new(db.pool.clone());
    let bus5 = repo.find_by_key("October", 2024, "BUS5").await.unwrap().unwrap();
    assert_eq!(bus5.total_miles, Some(750));
    let bus77 = repo.find_by_key("August", 2024, "BUS77").await.unwrap().unwrap();
    assert_eq!(bus77.total_miles, Some(300));

    db.teardown().await;
}

#[tokio::test]
async fn test_legacy_mileage_tables_are_upserted() {
    let Some(db) = TestDb::new().await else { return };
    seed_legacy(&db).await;
    let pipeline = db.pipeline();
    pipeline.evolve().await.unwrap();

    let stats = pipeline.import_legacy_mileage().await.unwrap();
    let school = &stats[0];
    assert_eq!(school.source, "school_buses");
    assert_eq!(school.imported, 1);
    assert_eq!(school.skipped, 1);

    let repo = MileageRepository::new(db.pool.clone());
    let bus31 = repo.find_by_key("September", 2024, "BUS31").await.unwrap().unwrap();
    assert_eq!(bus31.total_miles, Some(600));

    let agency = repo.find_by_key("September", 2024, "CAR-9").await.unwrap().unwrap();
    assert_eq!(agency.bus_make.as_deref(), Some("FORD FUSION"));
    assert_eq!(agency.total_miles, Some(0));

    let again = pipeline.import_legacy_mileage().await.unwrap();
    assert!(again.iter().all(|s| s.imported == 0));

    db.teardown().await;
}

#[tokio::test]
async fn test_repair_pass_fixes_negative_totals() {
    let Some(db) = TestDb::new().await else { return };
    let pipeline = db.pipeline();
    pipeline.evolve().await.unwrap();

    db.exec(
        "INSERT INTO monthly_mileage_reports \
         (report_month, report_year, bus_id, beginning_miles, ending_miles, total_miles) VALUES \
         ('May', 2024, 'BUS1', NULL, NULL, -250), \
         ('May', 2024, 'BUS2', 10, 60, 0)",
    )
    .await;

    let repaired = pipeline.repair_mileage().await.unwrap();
    assert_eq!(repaired, 2);

    let repo = MileageRepository::new(db.pool.clone());
    let bus1 = repo.find_by_key("May", 2024, "BUS1").await.unwrap().unwrap();
    assert_eq!(bus1.total_miles, Some(250));
    let bus2 = repo.find_by_key("May", 2024, "BUS2").await.unwrap().unwrap();
    assert_eq!(bus2.total_miles, Some(50));

    db.teardown().await;
}
