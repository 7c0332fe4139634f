//! Configuration validation.

use std::collections::HashSet;

use taskline_events::LifecycleEvent;

use crate::error::ConfigError;
use crate::schema::Config;

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Convert the first error, if any, into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::invalid(error.path, error.message)),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_queue(config, &mut result);
        Self::validate_events(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_queue(config: &Config, result: &mut ValidationResult) {
        if let Err(e) = config.queue.validate() {
            result.add_error(ValidationError::new("queue.default_retry_limit", e.to_string()));
        }

        if config.queue.max_retry_limit > 1000 {
            result.add_warning(ValidationWarning::new(
                "queue.max_retry_limit",
                "max_retry_limit is very high (>1000), so default_retry_limit is barely bounded",
            ));
        }
    }

    fn validate_events(config: &Config, result: &mut ValidationResult) {
        let Some(names) = &config.events.supported_events else {
            return;
        };

        if names.is_empty() {
            result.add_warning(ValidationWarning::new(
                "events.supported_events",
                "Empty allow-list, no event can be subscribed",
            ));
        }

        let mut seen = HashSet::new();
        for name in names {
            if name.trim().is_empty() {
                result.add_error(ValidationError::new(
                    "events.supported_events",
                    "Event names cannot be empty",
                ));
            } else if !seen.insert(name.as_str()) {
                result.add_warning(ValidationWarning::new(
                    "events.supported_events",
                    format!("Duplicate event name: {}", name),
                ));
            }
        }

        for event in LifecycleEvent::ALL {
            if !seen.contains(event.as_str()) {
                result.add_warning(ValidationWarning::new(
                    "events.supported_events",
                    format!("Lifecycle event '{}' is not in the allow-list", event),
                ));
            }
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.trim();
        if level.is_empty() {
            result.add_error(ValidationError::new("logging.level", "Level cannot be empty"));
            return;
        }

        // Directives such as "taskline=debug,info" are left to the filter parser.
        let is_directive = level.contains('=') || level.contains(',');
        if !is_directive && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            result.add_error(ValidationError::new(
                "logging.level",
                format!("Unknown level '{}', expected one of {}", level, LOG_LEVELS.join(", ")),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
