//! Orquestación de la migración
//!
//! Orden fijo de una ejecución completa: evolución de esquema → vehículos →
//! mantenimiento → kilometraje (libro y tablas legacy) → limpieza (opcional)
//! → validación.

use crate::models::{NumberCollision, SourceStats, ValidationReport};
use crate::services::maintenance_migrator::{MaintenanceSheetsSource, ServiceRecordsSource};
use crate::services::introspection::{self, BackupSummary, StatusReport};
use crate::services::mileage_importer::{self, WorkbookStats};
use crate::services::migrator::migrate_source;
use crate::services::schema_evolver::{CleanupReport, EvolutionReport, SchemaEvolver};
use crate::services::validator::Validator;
use crate::services::vehicle_migrator::{BusesSource, VehiclesSource};
use crate::state::AppState;
use crate::utils::errors::AppError;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Opciones de `run`
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub workbook: Option<PathBuf>,
    pub cleanup: bool,
    pub force_cleanup: bool,
}

/// Todo lo que una ejecución completa muestra al operador
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub evolution: EvolutionReport,
    pub sources: Vec<SourceStats>,
    pub workbook: Option<WorkbookStats>,
    pub cleanup: Option<CleanupReport>,
    pub validation: ValidationReport,
}

impl RunSummary {
    pub fn collisions(&self) -> Vec<NumberCollision> {
        collisions_of(&self.sources)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.evolution)?;
        writeln!(f, "{}", render_sources(&self.sources))?;
        if let Some(workbook) = &self.workbook {
            writeln!(f, "{}\n", workbook)?;
        }
        if let Some(cleanup) = &self.cleanup {
            writeln!(f, "{}", cleanup)?;
        }
        write!(f, "{}", self.validation.render())
    }
}

/// Tabla de importación por fuente
pub fn render_sources(sources: &[SourceStats]) -> String {
    let mut out = String::from("=== MIGRATION ===\n");
    for stats in sources {
        out.push_str(&format!("  {}\n", stats));
    }
    out
}

pub fn collisions_of(sources: &[SourceStats]) -> Vec<NumberCollision> {
    sources
        .iter()
        .flat_map(|s| s.collisions.iter().cloned())
        .collect()
}

pub struct Pipeline {
    state: AppState,
    evolver: SchemaEvolver,
}

impl Pipeline {
    pub fn new(state: AppState) -> Self {
        Self {
            evolver: SchemaEvolver::new(state.pool.clone()),
            state,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn evolve(&self) -> Result<EvolutionReport, AppError> {
        self.evolver.evolve().await
    }

    /// `buses` y `vehicles` → `fleet_vehicles`
    pub async fn migrate_vehicles(&self) -> Result<Vec<SourceStats>, AppError> {
        Ok(vec![
            migrate_source(&self.state, &BusesSource).await?,
            migrate_source(&self.state, &VehiclesSource).await?,
        ])
    }

    /// `service_records` y `maintenance_sheets` → `maintenance_records`
    pub async fn migrate_maintenance(&self) -> Result<Vec<SourceStats>, AppError> {
        Ok(vec![
            migrate_source(&self.state, &ServiceRecordsSource).await?,
            migrate_source(&self.state, &MaintenanceSheetsSource).await?,
        ])
    }

    pub async fn import_workbook(&self, path: &Path) -> Result<WorkbookStats, AppError> {
        mileage_importer::import_workbook(&self.state, path).await
    }

    /// Corrige `total_miles` en las filas existentes
    pub async fn repair_mileage(&self) -> Result<u64, AppError> {
        mileage_importer::repair_mileage_totals(&self.state).await
    }

    pub async fn import_legacy_mileage(&self) -> Result<Vec<SourceStats>, AppError> {
        mileage_importer::import_legacy_mileage(&self.state).await
    }

    pub async fn cleanup(&self, force: bool) -> Result<CleanupReport, AppError> {
        self.evolver.cleanup(force).await
    }

    pub async fn validate(&self, collisions: &[NumberCollision]) -> ValidationReport {
        Validator::new(self.state.pool.clone()).validate(collisions).await
    }

    pub async fn status(&self) -> Result<StatusReport, AppError> {
        introspection::status(&self.state.pool).await
    }

    pub async fn backup(&self, out_dir: &Path) -> Result<BackupSummary, AppError> {
        introspection::backup(&self.state.pool, out_dir).await
    }

    /// Ejecución completa. Los errores de una fuente o de un libro se
    /// registran y la ejecución sigue; la cancelación y los fallos del
    /// arranque del esquema la detienen.
    pub async fn run(&self, options: &RunOptions) -> Result<RunSummary, AppError> {
        info!("🚀 Iniciando consolidación completa");
        let mut summary = RunSummary {
            evolution: self.evolve().await?,
            ..Default::default()
        };

        summary.sources.extend(self.migrate_vehicles().await?);
        summary.sources.extend(self.migrate_maintenance().await?);

        if let Some(path) = &options.workbook {
            match self.import_workbook(path).await {
                Ok(stats) => summary.workbook = Some(stats),
                Err(e @ AppError::Cancelled(_)) => return Err(e),
                Err(e) => error!("❌ No se pudo importar el libro {}: {}", path.display(), e),
            }
        }
        summary.sources.extend(self.import_legacy_mileage().await?);

        if options.cleanup {
            summary.cleanup = Some(self.cleanup(options.force_cleanup).await?);
        }

        summary.validation = self.validate(&summary.collisions()).await;
        info!("🏁 Consolidación terminada: {}", summary.validation.disposition());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collisions_are_gathered_from_all_sources() {
        let mut buses = SourceStats::new("buses");
        buses.collisions.push(NumberCollision {
            source: "buses".into(),
            incoming_key: "Bus-24".into(),
            vehicle_number: 24,
            existing_license: Some("24".into()),
            synthetic: false,
        });
        let vehicles = SourceStats::new("vehicles");

        let collisions = collisions_of(&[buses, vehicles]);
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].incoming_key, "Bus-24");
    }

    #[test]
    fn test_render_sources() {
        let text = render_sources(&[SourceStats::absent("school_buses"), SourceStats::new("buses")]);
        assert!(text.starts_with("=== MIGRATION ==="));
        assert!(text.contains("school_buses"));
        assert!(text.contains("not present"));
    }
}
