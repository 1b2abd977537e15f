use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::agents::config::{AgentConfig, HistoryConfig, ReasoningConfig};
use crate::config::{ChartSettings, DatabaseSettings, LoggingSettings, Settings};

/// Upper bound on per-table sample rows placed in prompts
const MAX_SAMPLE_ROWS: usize = 50;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Check every section, collecting all problems
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_database(&settings.database) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_reasoning(&settings.reasoning) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_agent(&settings.agent) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_history(&settings.history) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_chart(&settings.chart) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_logging(&settings.logging) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_database(database: &DatabaseSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if database.host.trim().is_empty() {
            errors.push(ValidationError::MissingField("database.host".to_string()));
        }
        if database.user.trim().is_empty() {
            errors.push(ValidationError::MissingField("database.user".to_string()));
        }
        if database.dbname.trim().is_empty() {
            errors.push(ValidationError::MissingField("database.dbname".to_string()));
        }
        if database.schema.trim().is_empty() {
            errors.push(ValidationError::MissingField("database.schema".to_string()));
        }

        if database.port == 0 {
            errors.push(invalid("database.port", "Port must be greater than 0"));
        }
        if database.max_connections == 0 {
            errors.push(invalid("database.max_connections", "Must be at least 1"));
        }
        if database.connect_timeout_seconds == 0 {
            errors.push(invalid("database.connect_timeout_seconds", "Must be greater than 0"));
        }
        if database.query_timeout_seconds == 0 {
            errors.push(invalid("database.query_timeout_seconds", "Must be greater than 0"));
        }
        if database.max_rows == 0 {
            errors.push(invalid("database.max_rows", "Must be at least 1"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_reasoning(reasoning: &ReasoningConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if reasoning.base_url.trim().is_empty() {
            errors.push(ValidationError::MissingField("reasoning.base_url".to_string()));
        } else if !reasoning.base_url.starts_with("http://")
            && !reasoning.base_url.starts_with("https://")
        {
            errors.push(invalid("reasoning.base_url", "Must be an http(s) URL"));
        }

        if reasoning.model.trim().is_empty() {
            errors.push(ValidationError::MissingField("reasoning.model".to_string()));
        }

        if let Some(temperature) = reasoning.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                errors.push(invalid("reasoning.temperature", "Must be between 0.0 and 2.0"));
            }
        }

        if reasoning.max_tokens == Some(0) {
            errors.push(invalid("reasoning.max_tokens", "Must be at least 1"));
        }

        if reasoning.timeout_seconds == 0 {
            errors.push(invalid("reasoning.timeout_seconds", "Must be greater than 0"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_agent(agent: &AgentConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if agent.max_iterations == 0 {
            errors.push(invalid("agent.max_iterations", "Must be at least 1"));
        }
        if agent.tool_timeout_seconds == 0 {
            errors.push(invalid("agent.tool_timeout_seconds", "Must be greater than 0"));
        }
        if agent.sample_rows > MAX_SAMPLE_ROWS {
            errors.push(invalid(
                "agent.sample_rows",
                format!("Must not exceed {}", MAX_SAMPLE_ROWS),
            ));
        }
        if let Some(prompt) = &agent.system_prompt {
            if prompt.trim().is_empty() {
                errors.push(invalid("agent.system_prompt", "Must not be empty when set"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_history(history: &HistoryConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if history.enabled {
            if history.path.as_os_str().is_empty() {
                errors.push(ValidationError::MissingField("history.path".to_string()));
            }
            if history.max_entries == 0 {
                errors.push(invalid("history.max_entries", "Must be at least 1"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_chart(chart: &ChartSettings) -> Result<(), Vec<ValidationError>> {
        if chart.output_dir.as_os_str().is_empty() {
            return Err(vec![ValidationError::MissingField("chart.output_dir".to_string())]);
        }
        Ok(())
    }

    fn validate_logging(logging: &LoggingSettings) -> Result<(), Vec<ValidationError>> {
        if let Err(e) = EnvFilter::try_new(&logging.level) {
            return Err(vec![invalid("logging.level", e.to_string())]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.database.user = "analyst".to_string();
        settings.database.dbname = "sales".to_string();
        settings
    }

    #[test]
    fn test_valid_settings() {
        assert!(ConfigValidator::validate(&valid_settings()).is_ok());
    }

    #[test]
    fn test_missing_connection_fields() {
        let errors = ConfigValidator::validate(&Settings::default()).unwrap_err();
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert!(messages.contains(&"Missing required field: database.user".to_string()));
        assert!(messages.contains(&"Missing required field: database.dbname".to_string()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut settings = valid_settings();
        settings.database.port = 0;
        settings.agent.max_iterations = 0;
        settings.reasoning.base_url = "ftp://example".to_string();
        settings.reasoning.temperature = Some(3.5);

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_history_checked_only_when_enabled() {
        let mut settings = valid_settings();
        settings.history.max_entries = 0;
        assert!(ConfigValidator::validate(&settings).is_err());

        settings.history.enabled = false;
        assert!(ConfigValidator::validate(&settings).is_ok());
    }

    #[test]
    fn test_invalid_log_filter() {
        let mut settings = valid_settings();
        settings.logging.level = "sqlsage=verbose".to_string();
        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert!(matches!(
            &errors[0],
            ValidationError::InvalidValue { field, .. } if field == "logging.level"
        ));
    }

    #[test]
    fn test_sample_rows_bound() {
        let mut settings = valid_settings();
        settings.agent.sample_rows = 51;
        assert!(ConfigValidator::validate(&settings).is_err());
    }
}
