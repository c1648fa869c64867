//! Configuration loading and management for Email Domain Stats
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to validated settings before a run starts
//! - Defaults reproduce the standard customer export layout
//! - Command-line overrides are applied through the same builder

use crate::domain::{StatsError, StatsResult};
use crate::report::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Column of the customer export that holds the email address
/// (`first_name,last_name,email,gender,ip_address`)
pub const DEFAULT_EMAIL_COLUMN: usize = 2;

/// Main configuration structure for Email Domain Stats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Configuration format version
    pub version: String,
    /// How input records are read
    #[serde(default)]
    pub input: InputConfig,
    /// How results are written
    #[serde(default)]
    pub output: OutputConfig,
}

/// Input dialect and layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Field separator
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Where to find the email field
    #[serde(default)]
    pub email_column: EmailColumn,
    /// Accept rows whose field count differs from the header
    #[serde(default)]
    pub flexible: bool,
}

/// Output settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Email column selector, either a 0-based index or a header name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmailColumn {
    Index(usize),
    Name(String),
}

impl Default for EmailColumn {
    fn default() -> Self {
        Self::Index(DEFAULT_EMAIL_COLUMN)
    }
}

impl FromStr for EmailColumn {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(StatsError::config("email column must not be empty"));
        }
        Ok(match s.parse::<usize>() {
            Ok(index) => Self::Index(index),
            Err(_) => Self::Name(s.to_string()),
        })
    }
}

impl fmt::Display for EmailColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Name(name) => write!(f, "'{name}'"),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            email_column: EmailColumn::default(),
            flexible: false,
        }
    }
}

impl StatsConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> StatsResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            StatsError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            StatsError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> StatsResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| StatsError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Default configuration for the standard customer export
    pub fn with_defaults() -> Self {
        Self {
            version: "1.0".to_string(),
            input: InputConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> StatsResult<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            return Err(StatsError::config(format!(
                "Unsupported configuration version: {}. Supported versions: 1.0",
                self.version
            )));
        }

        let delimiter = self.input.delimiter;
        if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
            return Err(StatsError::config(format!(
                "Invalid delimiter {delimiter:?}: must be a single ASCII character other than a quote or line break"
            )));
        }

        if let EmailColumn::Name(name) = &self.input.email_column {
            if name.is_empty() {
                return Err(StatsError::config("email column name must not be empty"));
            }
        }

        Ok(())
    }

    /// Delimiter as the byte the CSV reader and writer expect
    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII
        self.input.delimiter as u8
    }

    /// Convert to YAML for display or as a starting config file
    pub fn to_yaml(&self) -> StatsResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| StatsError::config(format!("Failed to serialize config: {e}")))
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_delimiter() -> char {
    ','
}

/// Configuration builder for programmatic construction and CLI overrides
pub struct ConfigBuilder {
    config: StatsConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: StatsConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: StatsConfig) -> Self {
        Self { config }
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.config.input.delimiter = delimiter;
        self
    }

    pub fn email_column(mut self, column: EmailColumn) -> Self {
        self.config.input.email_column = column;
        self
    }

    pub fn flexible(mut self, flexible: bool) -> Self {
        self.config.input.flexible = flexible;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.output.format = format;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> StatsResult<StatsConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
