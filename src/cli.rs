use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ask questions about a PostgreSQL database in plain language
#[derive(Parser, Debug, Clone)]
#[command(name = "sqlsage", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "SQLSAGE_CONFIG", default_value = "sqlsage.toml", global = true)]
    pub config: PathBuf,

    /// Log level or filter directive (e.g. "debug", "sqlsage=trace")
    #[arg(long, env = "SQLSAGE_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Maximum tool dispatch rounds per question
    #[arg(long, global = true)]
    pub max_iterations: Option<u32>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask a single question and print the answer
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Interactive session, one question per line (default)
    Chat,
    /// List the tables of the configured schema
    Tables,
    /// Describe the columns of a table
    Describe {
        /// Table name
        table: String,
    },
    /// Check the database connection
    Check,
    /// Show the persisted session log
    History {
        /// Remove every entry instead
        #[arg(long)]
        clear: bool,
    },
}

impl Cli {
    /// Subcommand to run; `chat` when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["sqlsage"]);
        assert_eq!(cli.config, PathBuf::from("sqlsage.toml"));
        assert!(cli.log_level.is_none());
        assert!(cli.max_iterations.is_none());
        assert_eq!(cli.command(), Command::Chat);
    }

    #[test]
    fn test_cli_ask_joins_words() {
        let cli = Cli::parse_from([
            "sqlsage",
            "--config",
            "custom.toml",
            "--max-iterations",
            "3",
            "ask",
            "top",
            "customers",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert_eq!(cli.max_iterations, Some(3));
        assert_eq!(
            cli.command(),
            Command::Ask {
                question: vec!["top".to_string(), "customers".to_string()]
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["sqlsage", "tables", "--log-level", "debug"]);
        assert_eq!(cli.command(), Command::Tables);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_history_clear() {
        let cli = Cli::parse_from(["sqlsage", "history", "--clear"]);
        assert_eq!(cli.command(), Command::History { clear: true });

        let cli = Cli::parse_from(["sqlsage", "describe", "orders"]);
        assert_eq!(
            cli.command(),
            Command::Describe {
                table: "orders".to_string()
            }
        );
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(Cli::try_parse_from(["sqlsage", "ask"]).is_err());
    }
}
