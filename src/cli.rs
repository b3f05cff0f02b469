//! Línea de comandos del operador

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::services::RunOptions;

#[derive(Debug, Parser)]
#[command(author, version, about = "Consolidate legacy fleet, maintenance and mileage tables", long_about = None)]
pub struct Cli {
    /// PostgreSQL connection URL (falls back to PGHOST/PGPORT/PGUSER/PGPASSWORD/PGDATABASE)
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create canonical tables, add columns, indexes, backfill types and compatibility views
    Evolve,
    /// Migrate `buses` and `vehicles` into fleet_vehicles
    Vehicles,
    /// Migrate `service_records` and `maintenance_sheets` into maintenance_records
    Maintenance,
    /// Import a monthly mileage workbook (.xlsx)
    Mileage(MileageArgs),
    /// Import `school_buses` and `agency_vehicles` into monthly_mileage_reports
    LegacyMileage,
    /// Recompute total_miles where it disagrees with ending - beginning
    RepairMileage,
    /// Drop legacy tables once their rows are represented canonically
    Cleanup(CleanupArgs),
    /// Run the post-migration checks and print the report
    Verify(VerifyArgs),
    /// Show which tables exist, their row counts and missing columns
    Status,
    /// Dump every base table as JSON Lines
    Backup(BackupArgs),
    /// Full run: evolve, vehicles, maintenance, mileage, optional cleanup, verify
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct MileageArgs {
    /// Workbook with one sheet per month
    #[arg(short, long)]
    pub workbook: PathBuf,
}

#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Drop legacy tables even when some rows have no canonical counterpart
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Print the report as JSON instead of plain text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct BackupArgs {
    /// Directory where `backup_<timestamp>/` is created
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Monthly mileage workbook to import during the run
    #[arg(short, long)]
    pub workbook: Option<PathBuf>,
    /// Drop legacy tables before verification
    #[arg(long)]
    pub cleanup: bool,
    /// With --cleanup, drop tables that still have pending rows
    #[arg(long, requires = "cleanup")]
    pub force: bool,
}

impl From<RunArgs> for RunOptions {
    fn from(args: RunArgs) -> Self {
        Self {
            workbook: args.workbook,
            cleanup: args.cleanup,
            force_cleanup: args.force,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_cleanup() {
        let cli = Cli::try_parse_from([
            "fleet_consolidation",
            "--database-url",
            "postgres://localhost/fleet",
            "run",
            "--workbook",
            "mileage.xlsx",
            "--cleanup",
            "--force",
        ])
        .unwrap();

        assert_eq!(cli.database_url.as_deref(), Some("postgres://localhost/fleet"));
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let options = RunOptions::from(args);
        assert_eq!(options.workbook, Some(PathBuf::from("mileage.xlsx")));
        assert!(options.cleanup);
        assert!(options.force_cleanup);
    }

    #[test]
    fn test_force_requires_cleanup() {
        assert!(Cli::try_parse_from(["fleet_consolidation", "run", "--force"]).is_err());
    }

    #[test]
    fn test_backup_defaults_to_current_directory() {
        let cli = Cli::try_parse_from(["fleet_consolidation", "backup"]).unwrap();
        let Command::Backup(args) = cli.command else {
            panic!("expected backup");
        };
        assert_eq!(args.out, PathBuf::from("."));
    }

    #[test]
    fn test_verify_json_flag() {
        let cli = Cli::try_parse_from(["fleet_consolidation", "verify", "--json"]).unwrap();
        let Command::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        assert!(args.json);
    }

    #[test]
    fn test_mileage_requires_workbook() {
        assert!(Cli::try_parse_from(["fleet_consolidation", "mileage"]).is_err());
    }
}
