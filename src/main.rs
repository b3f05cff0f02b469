use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};

use fleet_consolidation::cli::{Cli, Command};
use fleet_consolidation::config::{DatabaseConfig, EnvironmentConfig};
use fleet_consolidation::database::DatabaseConnection;
use fleet_consolidation::models::{Disposition, ValidationReport};
use fleet_consolidation::services::pipeline::{render_sources, Pipeline};
use fleet_consolidation::state::{AppState, CancellationFlag};
use fleet_consolidation::utils::logging::init_logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Cargar variables de entorno
    dotenv().ok();
    let cli = Cli::parse();

    let config = EnvironmentConfig::with_database_url(cli.database_url.clone())
        .context("No se pudo leer la configuración")?;
    let errors = init_logging(config.log_level());

    info!("🚌 Fleet consolidation");
    info!("======================");

    // Inicializar base de datos
    let db_connection = match DatabaseConnection::connect(&DatabaseConfig::from(&config)).await {
        Ok(conn) => conn,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };

    let state = AppState::new(db_connection.pool().clone());
    tokio::spawn(cancel_on_ctrl_c(state.cancel.clone()));

    let pipeline = Pipeline::new(state);
    let outcome = execute(&pipeline, cli.command).await;

    // La conexión se libera en todas las salidas
    drop(pipeline);
    db_connection.close().await;

    let disposition = match outcome {
        Ok(disposition) => disposition,
        Err(e) => {
            error!("❌ {:#}", e);
            None
        }
    };

    if errors.has_errors() || disposition == Some(Disposition::Errors) {
        warn!("⚠️ Terminado con {} errores registrados", errors.count());
        return Ok(ExitCode::FAILURE);
    }
    info!("✅ Terminado");
    Ok(ExitCode::SUCCESS)
}

/// Ejecutar un comando. Devuelve la disposición del validador cuando el
/// comando la produce.
async fn execute(pipeline: &Pipeline, command: Command) -> Result<Option<Disposition>> {
    match command {
        Command::Evolve => {
            println!("{}", pipeline.evolve().await?);
        }
        Command::Vehicles => {
            println!("{}", render_sources(&pipeline.migrate_vehicles().await?));
        }
        Command::Maintenance => {
            println!("{}", render_sources(&pipeline.migrate_maintenance().await?));
        }
        Command::Mileage(args) => {
            let stats = pipeline
                .import_workbook(&args.workbook)
                .await
                .with_context(|| format!("Importando {}", args.workbook.display()))?;
            println!("{}", stats);
        }
        Command::LegacyMileage => {
            println!("{}", render_sources(&pipeline.import_legacy_mileage().await?));
        }
        Command::RepairMileage => {
            let repaired = pipeline.repair_mileage().await?;
            println!("Repaired total_miles on {} rows", repaired);
        }
        Command::Cleanup(args) => {
            println!("{}", pipeline.cleanup(args.force).await?);
        }
        Command::Verify(args) => {
            let report = pipeline.validate(&[]).await;
            if args.json {
                println!("{}", report.to_json()?);
                return Ok(Some(report.disposition()));
            }
            return Ok(Some(print_report(&report)));
        }
        Command::Status => {
            println!("{}", pipeline.status().await?);
        }
        Command::Backup(args) => {
            println!("{}", pipeline.backup(&args.out).await?);
        }
        Command::Run(args) => {
            let summary = pipeline.run(&args.into()).await?;
            println!("{}", summary);
            return Ok(Some(summary.validation.disposition()));
        }
    }
    Ok(None)
}

fn print_report(report: &ValidationReport) -> Disposition {
    println!("{}", report.render());
    report.disposition()
}

/// Ctrl-C marca la ejecución como cancelada; los migradores lo comprueban
/// entre filas
async fn cancel_on_ctrl_c(cancel: CancellationFlag) {
    if signal::ctrl_c().await.is_ok() {
        warn!("🛑 Ctrl-C recibido, deteniendo tras la fila en curso...");
        cancel.cancel();
    }
}
