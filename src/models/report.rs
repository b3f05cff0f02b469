//! Reporte de validación
//!
//! Entradas `{category, check, status, details}` y la disposición global que
//! se muestra al operador.

use crate::utils::errors::AppError;
use serde::Serialize;
use std::fmt;

/// Estado de un chequeo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Warning,
    Error,
    Info,
}

impl CheckStatus {
    fn label(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "✓ PASS",
            CheckStatus::Warning => "⚠ WARN",
            CheckStatus::Error => "✗ ERROR",
            CheckStatus::Info => "ℹ INFO",
        }
    }
}

/// Una entrada del reporte
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub category: String,
    pub check: String,
    pub status: CheckStatus,
    pub details: String,
}

impl ValidationResult {
    pub fn new(
        category: &str,
        check: impl Into<String>,
        status: CheckStatus,
        details: impl Into<String>,
    ) -> Self {
        Self {
            category: category.to_string(),
            check: check.into(),
            status,
            details: details.into(),
        }
    }
}

/// Disposición global de la ejecución
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Clean,
    Warnings,
    Errors,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Disposition::Clean => "clean",
            Disposition::Warnings => "warnings",
            Disposition::Errors => "errors",
        })
    }
}

/// Reporte completo del validador
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: ValidationResult) {
        self.results.push(result);
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = ValidationResult>) {
        self.results.extend(results);
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// ERROR gana sobre WARNING, y WARNING sobre limpio
    pub fn disposition(&self) -> Disposition {
        if self.count(CheckStatus::Error) > 0 {
            Disposition::Errors
        } else if self.count(CheckStatus::Warning) > 0 {
            Disposition::Warnings
        } else {
            Disposition::Clean
        }
    }

    /// Buscar una entrada por nombre de chequeo
    pub fn find(&self, check: &str) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.check == check)
    }

    /// Disposición y entradas como JSON
    pub fn to_json(&self) -> Result<String, AppError> {
        #[derive(Serialize)]
        struct Document<'a> {
            disposition: Disposition,
            results: &'a [ValidationResult],
        }

        let document = Document {
            disposition: self.disposition(),
            results: &self.results,
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Texto plano con una sección por categoría y un resumen final
    pub fn render(&self) -> String {
        let mut out = String::from("=== VALIDATION RESULTS ===\n");

        let mut categories: Vec<&str> = Vec::new();
        for result in &self.results {
            if !categories.contains(&result.category.as_str()) {
                categories.push(&result.category);
            }
        }

        for category in categories {
            out.push_str(&format!("\n{}:\n", category));
            for result in self.results.iter().filter(|r| r.category == category) {
                out.push_str(&format!(
                    "  {:<8} {:<40} {}\n",
                    result.status.label(),
                    result.check,
                    result.details
                ));
            }
        }

        out.push_str("\n=== SUMMARY ===\n");
        out.push_str(&format!("Total checks: {}\n", self.results.len()));
        out.push_str(&format!("  ✓ Passed:   {}\n", self.count(CheckStatus::Pass)));
        out.push_str(&format!("  ⚠ Warnings: {}\n", self.count(CheckStatus::Warning)));
        out.push_str(&format!("  ✗ Errors:   {}\n", self.count(CheckStatus::Error)));
        out.push_str(&format!("Disposition: {}\n", self.disposition()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(category: &str, status: CheckStatus) -> ValidationResult {
        ValidationResult::new(category, format!("{:?} check", status), status, "details")
    }

    #[test]
    fn test_disposition_precedence() {
        let mut report = ValidationReport::new();
        assert_eq!(report.disposition(), Disposition::Clean);

        report.push(entry("A", CheckStatus::Pass));
        report.push(entry("A", CheckStatus::Info));
        assert_eq!(report.disposition(), Disposition::Clean);

        report.push(entry("B", CheckStatus::Warning));
        assert_eq!(report.disposition(), Disposition::Warnings);

        report.push(entry("C", CheckStatus::Error));
        assert_eq!(report.disposition(), Disposition::Errors);
    }

    #[test]
    fn test_render_groups_by_category() {
        let mut report = ValidationReport::new();
        report.push(entry("Vehicle Consolidation", CheckStatus::Pass));
        report.push(entry("Data Integrity", CheckStatus::Warning));
        report.push(entry("Vehicle Consolidation", CheckStatus::Info));

        let text = report.render();
        assert_eq!(text.matches("Vehicle Consolidation:").count(), 1);
        assert!(text.find("Vehicle Consolidation:").unwrap() < text.find("Data Integrity:").unwrap());
        assert!(text.contains("⚠ WARN"));
        assert!(text.contains("Disposition: warnings"));
    }

    #[test]
    fn test_json_carries_disposition_and_statuses() {
        let mut report = ValidationReport::new();
        report.push(entry("Data Integrity", CheckStatus::Warning));

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["disposition"], "warnings");
        assert_eq!(value["results"][0]["status"], "WARNING");
        assert_eq!(value["results"][0]["category"], "Data Integrity");
    }
}
