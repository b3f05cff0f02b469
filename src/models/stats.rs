//! Estadísticas de migración por fuente

use serde::Serialize;
use std::fmt;

/// Resultado de procesar una fila legacy
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// Fila escrita en la tabla canónica (clave para logs)
    Imported(String),
    /// Fila saltada sin error
    Skipped(SkipReason),
}

/// Motivo de salto de una fila
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Falta un campo obligatorio o no se puede convertir
    MissingField(&'static str),
    /// El deduplicador encontró la clave natural
    Duplicate(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingField(field) => write!(f, "missing or invalid {}", field),
            SkipReason::Duplicate(key) => write!(f, "duplicate of {}", key),
        }
    }
}

/// Vehículo entrante saltado porque su número ya pertenece a otro vehículo
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberCollision {
    pub source: String,
    pub incoming_key: String,
    pub vehicle_number: i32,
    pub existing_license: Option<String>,
    pub synthetic: bool,
}

impl fmt::Display for NumberCollision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' -> #{} ({}) already used by license '{}'",
            self.source,
            self.incoming_key,
            self.vehicle_number,
            if self.synthetic { "synthetic" } else { "parsed" },
            self.existing_license.as_deref().unwrap_or("<none>")
        )
    }
}

/// Contadores de una fuente legacy
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceStats {
    pub source: String,
    pub imported: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// La tabla fuente no existe (o no es una tabla base)
    pub absent: bool,
    /// Error a nivel de fuente: el stream se abandonó
    pub error: Option<String>,
    pub collisions: Vec<NumberCollision>,
}

impl SourceStats {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn absent(source: impl Into<String>) -> Self {
        Self {
            absent: true,
            ..Self::new(source)
        }
    }

    /// `true` si la fuente se recorrió completa
    pub fn completed(&self) -> bool {
        self.error.is_none()
    }

    pub fn record(&mut self, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Imported(_) => self.imported += 1,
            RowOutcome::Skipped(SkipReason::Duplicate(_)) => {
                self.skipped += 1;
                self.duplicates += 1;
            }
            RowOutcome::Skipped(SkipReason::MissingField(_)) => self.skipped += 1,
        }
    }
}

impl fmt::Display for SourceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absent {
            return write!(f, "{:<22} not present", self.source);
        }
        write!(
            f,
            "{:<22} imported {:>5}  skipped {:>5} (duplicates {:>5})  failed {:>4}",
            self.source, self.imported, self.skipped, self.duplicates, self.failed
        )?;
        if let Some(err) = &self.error {
            write!(f, "  ERROR: {}", err)?;
        }
        Ok(())
    }
}
