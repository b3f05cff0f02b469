mod common;

use common::{seed_legacy, TestDb};
use fleet_consolidation::repositories::RelationKind;
use fleet_consolidation::services::introspection::BACKUP_SUMMARY_FILE;

#[tokio::test]
async fn test_backup_writes_jsonl_per_table() {
    let Some(db) = TestDb::new().await else { return };
    seed_legacy(&db).await;
    let pipeline = db.pipeline();
    pipeline.run(&Default::default()).await.unwrap();

    let out = tempfile::tempdir().unwrap();
    let summary = pipeline.backup(out.path()).await.unwrap();
    assert!(summary.directory.starts_with(out.path()));

    let buses = summary
        .tables
        .iter()
        .find(|(table, _)| table == "buses")
        .expect("buses backed up");
    assert_eq!(buses.1, 2);

    let lines = std::fs::read_to_string(summary.directory.join("fleet_vehicles_data.jsonl")).unwrap();
    let rows: Vec<serde_json::Value> = lines
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(rows.len() as i64, db.count("SELECT COUNT(*) FROM fleet_vehicles").await);
    assert!(rows.iter().any(|r| r["license"] == "Bus-24"));

    let structure =
        std::fs::read_to_string(summary.directory.join("fleet_vehicles_structure.sql")).unwrap();
    assert!(structure.contains("vehicle_type"));

    let text = std::fs::read_to_string(summary.directory.join(BACKUP_SUMMARY_FILE)).unwrap();
    assert!(text.starts_with("Database Backup Summary"));
    assert!(text.contains(&format!("Total Tables: {}", summary.tables.len())));
    assert!(text.contains("- buses (2 rows)"));

    db.teardown().await;
}

#[tokio::test]
async fn test_status_reports_tables_and_drift() {
    let Some(db) = TestDb::new().await else { return };
    seed_legacy(&db).await;
    let pipeline = db.pipeline();

    pipeline.evolve().await.unwrap();
    db.exec("ALTER TABLE maintenance_records DROP COLUMN raw_data").await;

    let status = pipeline.status().await.unwrap();
    let table = |name: &str| {
        status
            .tables
            .iter()
            .find(|t| t.name == name)
            .unwrap_or_else(|| panic!("{} in status", name))
    };

    assert_eq!(table("fleet_vehicles").rows, Some(0));
    assert!(table("fleet_vehicles").missing_columns.is_empty());
    assert_eq!(table("maintenance_records").missing_columns, vec!["raw_data".to_string()]);
    assert_eq!(table("buses").kind, Some(RelationKind::BaseTable));
    assert_eq!(table("buses").rows, Some(2));

    let text = status.to_string();
    assert!(text.contains("=== DATABASE STATUS ==="));
    assert!(text.contains("missing columns: raw_data"));

    db.teardown().await;
}
