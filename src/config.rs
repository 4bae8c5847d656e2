//! Planner configuration
//!
//! Environment Variables:
//! - `NLPLAN_CASE_SENSITIVE` - Preserve identifier case (`true`/`false`)
//! - `NLPLAN_QUOTE_IDENTIFIERS` - Always single-quote identifiers
//! - `NLPLAN_DIALECT` - SQL dialect (`generic`, `sqlite`, `mysql`, `postgres`)
//! - `NLPLAN_SIMPLIFY` - Inline single-use checks after planning
//! - `NLPLAN_OUTPUT_SINK` - Destination named in the final step
//! - `NLPLAN_INTERSPERSE` - Instruction injected after every step

use std::env;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Default destination named by the final "write" step
pub const DEFAULT_OUTPUT_SINK: &str = "'result.csv'";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {var}: expected {expected}")]
    InvalidValue {
        var: String,
        value: String,
        expected: &'static str,
    },
}

/// SQL dialect used to parse queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    #[default]
    Generic,
    Sqlite,
    MySql,
    Postgres,
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "ansi" => Ok(SqlDialect::Generic),
            "sqlite" => Ok(SqlDialect::Sqlite),
            "mysql" => Ok(SqlDialect::MySql),
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            other => Err(format!("unknown SQL dialect '{}'", other)),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlDialect::Generic => "generic",
            SqlDialect::Sqlite => "sqlite",
            SqlDialect::MySql => "mysql",
            SqlDialect::Postgres => "postgres",
        };
        f.write_str(name)
    }
}

/// Read-only settings shared by every translation of one planner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Preserve identifier case; otherwise fold identifiers to lowercase
    pub case_sensitive: bool,
    /// Single-quote every identifier, not only those quoted in the source
    pub quote_identifiers: bool,
    /// Dialect handed to the SQL parser
    pub dialect: SqlDialect,
    /// Run the simplifier on finished plans
    pub simplify: bool,
    /// Destination named in the final step
    pub output_sink: String,
    /// Steps rendered before the query steps, in order
    pub prologue: Vec<String>,
    /// Instruction injected after every step
    pub intersperse: Option<String>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            quote_identifiers: false,
            dialect: SqlDialect::Generic,
            simplify: true,
            output_sink: DEFAULT_OUTPUT_SINK.to_string(),
            prologue: Vec::new(),
            intersperse: None,
        }
    }
}

impl PlannerConfig {
    /// Read configuration from environment variables, falling back to
    /// defaults for unset variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("NLPLAN_CASE_SENSITIVE") {
            config.case_sensitive = parse_bool("NLPLAN_CASE_SENSITIVE", &value)?;
        }
        if let Some(value) = lookup("NLPLAN_QUOTE_IDENTIFIERS") {
            config.quote_identifiers = parse_bool("NLPLAN_QUOTE_IDENTIFIERS", &value)?;
        }
        if let Some(value) = lookup("NLPLAN_SIMPLIFY") {
            config.simplify = parse_bool("NLPLAN_SIMPLIFY", &value)?;
        }
        if let Some(value) = lookup("NLPLAN_DIALECT") {
            config.dialect = value.parse().map_err(|_| ConfigError::InvalidValue {
                var: "NLPLAN_DIALECT".to_string(),
                value: value.clone(),
                expected: "one of generic, sqlite, mysql, postgres",
            })?;
        }
        if let Some(value) = lookup("NLPLAN_OUTPUT_SINK") {
            config.output_sink = value;
        }
        if let Some(value) = lookup("NLPLAN_INTERSPERSE") {
            if !value.trim().is_empty() {
                config.intersperse = Some(value);
            }
        }

        Ok(config)
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_quote_identifiers(mut self, quote_identifiers: bool) -> Self {
        self.quote_identifiers = quote_identifiers;
        self
    }

    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }

    pub fn with_output_sink(mut self, sink: impl Into<String>) -> Self {
        self.output_sink = sink.into();
        self
    }

    /// Append a step rendered before the query steps
    pub fn with_prologue_step(mut self, step: impl Into<String>) -> Self {
        self.prologue.push(step.into());
        self
    }

    pub fn with_intersperse(mut self, step: impl Into<String>) -> Self {
        self.intersperse = Some(step.into());
        self
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: value.to_string(),
            expected: "a boolean",
        }),
    }
}
