//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación
//! de texto legacy y logging.

pub mod errors;
pub mod logging;
pub mod validation;
