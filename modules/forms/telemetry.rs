use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_event_bus::{EventPublisher, EventRecord};
use shared_logging::{JsonLogger, LogLevel, LogRecord};
use tokio::runtime::{Builder, Handle};

/// Builder for form telemetry sinks.
pub struct FormTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    event_publisher: Option<Arc<dyn EventPublisher>>,
    debug: bool,
}

impl FormTelemetryBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            event_publisher: None,
            debug: false,
        }
    }

    /// Sets the JSON-lines log path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Sets the event publisher.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Enables debug-level records.
    #[must_use]
    pub const fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Builds the telemetry handle.
    pub fn build(self) -> Result<FormTelemetry> {
        let floor = if self.debug {
            LogLevel::Debug
        } else {
            LogLevel::Info
        };
        let logger = self
            .log_path
            .map(|path| JsonLogger::new(path).map(|logger| logger.with_min_level(floor)))
            .transpose()?;
        Ok(FormTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                debug: self.debug,
                logger,
                publisher: self.event_publisher,
            }),
        })
    }
}

/// Telemetry handle shared by the commander and its render callbacks.
#[derive(Clone)]
pub struct FormTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for FormTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormTelemetry")
            .field("module", &self.inner.module)
            .field("debug", &self.inner.debug)
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    debug: bool,
    logger: Option<JsonLogger>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl FormTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> FormTelemetryBuilder {
        FormTelemetryBuilder::new(module)
    }

    /// Whether debug-level records are kept.
    #[must_use]
    pub fn debug_enabled(&self) -> bool {
        self.inner.debug
    }

    /// Logs structured metadata. Debug records are dropped unless enabled.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if level == LogLevel::Debug && !self.inner.debug {
            return Ok(());
        }
        mirror(&self.inner.module, level, message, &metadata);
        if let Some(logger) = &self.inner.logger {
            let record = LogRecord::new(&self.inner.module, level, message).with_metadata(metadata);
            logger.log(&record)?;
        }
        Ok(())
    }

    /// Emits an event on the bus.
    pub fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        let Some(publisher) = &self.inner.publisher else {
            return Ok(());
        };
        let record = EventRecord::new(&self.inner.module, event_type, payload);
        if let Ok(handle) = Handle::try_current() {
            let publisher = Arc::clone(publisher);
            handle.spawn(async move {
                if let Err(err) = publisher.publish(record).await {
                    tracing::warn!(error = %err, "telemetry event publish failed");
                }
            });
            Ok(())
        } else {
            let runtime = Builder::new_current_thread().enable_all().build()?;
            runtime.block_on(publisher.publish(record))
        }
    }
}

fn mirror(module: &str, level: LogLevel, message: &str, metadata: &Value) {
    match level {
        LogLevel::Debug => tracing::debug!(module, %metadata, "{message}"),
        LogLevel::Info => tracing::info!(module, %metadata, "{message}"),
        LogLevel::Warn => tracing::warn!(module, %metadata, "{message}"),
        LogLevel::Error => tracing::error!(module, %metadata, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_event_bus::MemoryEventBus;
    use tempfile::tempdir;

    #[test]
    fn telemetry_writes_log_and_event() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("forms.log");
        let bus = Arc::new(MemoryEventBus::new(16));
        let telemetry = FormTelemetry::builder("forms")
            .log_path(&path)
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        telemetry
            .log(LogLevel::Info, "forms.command.sent", json!({ "widgets": 2 }))
            .unwrap();
        telemetry
            .event("forms.command.dispatched", json!({ "command": "say hi" }))
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("forms.command.sent"));
        assert_eq!(bus.snapshot().len(), 1);
    }

    #[test]
    fn debug_records_need_debug_enabled() {
        let tmp = tempdir().unwrap();
        let quiet = tmp.path().join("quiet.log");
        let verbose = tmp.path().join("verbose.log");
        FormTelemetry::builder("forms")
            .log_path(&quiet)
            .build()
            .unwrap()
            .log(LogLevel::Debug, "forms.replace", json!({}))
            .unwrap();
        FormTelemetry::builder("forms")
            .log_path(&verbose)
            .debug(true)
            .build()
            .unwrap()
            .log(LogLevel::Debug, "forms.replace", json!({}))
            .unwrap();
        assert!(std::fs::read_to_string(&quiet).unwrap().is_empty());
        assert!(std::fs::read_to_string(&verbose)
            .unwrap()
            .contains("forms.replace"));
    }
}
