//! Composite logger for sending records to several sinks.
//!
//! # Example
//!
//! ```rust
//! use httplog::{MultiLogger, TracingLogger};
//!
//! let logger = MultiLogger::new().with(TracingLogger);
//! assert_eq!(logger.len(), 1);
//! ```

use axum::http::Extensions;
use std::sync::Arc;

use crate::types::Field;
use crate::Logger;

/// A logger that forwards every record to each inner logger, in the order they were added.
#[derive(Clone, Default)]
pub struct MultiLogger {
    loggers: Vec<Arc<dyn Logger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a logger to the chain. Returns self for builder pattern.
    pub fn with<L: Logger>(mut self, logger: L) -> Self {
        self.loggers.push(Arc::new(logger));
        self
    }

    /// Add an already shared logger to the chain.
    pub fn with_shared(mut self, logger: Arc<dyn Logger>) -> Self {
        self.loggers.push(logger);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }
}

impl Logger for MultiLogger {
    fn info(&self, context: &Extensions, message: &str, fields: &[Field]) {
        for logger in &self.loggers {
            logger.info(context, message, fields);
        }
    }

    fn error(&self, context: &Extensions, message: &str, fields: &[Field]) {
        for logger in &self.loggers {
            logger.error(context, message, fields);
        }
    }
}

impl std::fmt::Debug for MultiLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiLogger")
            .field("loggers", &self.loggers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Logger that remembers who saw what, in order
    struct NamedLogger {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Logger for NamedLogger {
        fn info(&self, _context: &Extensions, message: &str, _fields: &[Field]) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{} info {message}", self.name));
        }

        fn error(&self, _context: &Extensions, message: &str, _fields: &[Field]) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{} error {message}", self.name));
        }
    }

    #[test]
    fn test_multi_logger_empty() {
        let logger = MultiLogger::new();
        assert!(logger.is_empty());
        assert_eq!(logger.len(), 0);

        // Should not panic with no loggers
        logger.info(&Extensions::new(), "Request-> GET /", &[]);
        logger.error(&Extensions::new(), "Response<- GET /", &[]);
    }

    #[test]
    fn test_multi_logger_forwards_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let logger = MultiLogger::new()
            .with(NamedLogger {
                name: "first",
                seen: seen.clone(),
            })
            .with_shared(Arc::new(NamedLogger {
                name: "second",
                seen: seen.clone(),
            }));

        assert_eq!(logger.len(), 2);

        let fields = [Field::new("method", "GET")];
        logger.info(&Extensions::new(), "Request-> GET /", &fields);
        logger.error(&Extensions::new(), "Response<- GET /", &fields);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "first info Request-> GET /",
                "second info Request-> GET /",
                "first error Response<- GET /",
                "second error Response<- GET /",
            ]
        );
    }
}
