//! Configuración de logging
//!
//! Inicializa `tracing-subscriber` y cuenta los eventos de nivel ERROR: el
//! proceso termina con estado distinto de cero si se emitió alguno.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Contador compartido de eventos ERROR
#[derive(Clone, Default)]
pub struct ErrorCounter {
    count: Arc<AtomicUsize>,
}

impl ErrorCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn has_errors(&self) -> bool {
        self.count() > 0
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Configurar logging global y devolver el contador de errores
pub fn init_logging(level: Level) -> ErrorCounter {
    let counter = ErrorCounter::new();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(counter.clone())
        .with(LevelFilter::from_level(level))
        .init();

    counter
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{error, info, warn};

    #[test]
    fn test_counts_only_error_events() {
        let counter = ErrorCounter::new();
        let subscriber = tracing_subscriber::registry().with(counter.clone());

        tracing::subscriber::with_default(subscriber, || {
            info!("📊 informativo");
            warn!("⚠️ advertencia");
            error!("❌ primero");
            error!("❌ segundo");
        });

        assert_eq!(counter.count(), 2);
        assert!(counter.has_errors());
    }
}
