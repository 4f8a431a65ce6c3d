use std::collections::HashMap;
use std::fs::OpenOptions;
use std::str::FromStr;
use log::{debug, info, LevelFilter};
use serde::{Deserialize, Serialize};
use env_logger::{Builder, Target, WriteStyle};
use std::io::Write;
use strum_macros::EnumString;

/// Available logging subsystems in queuesplice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LoggingSubsystem {
    /// Main application logging
    Main,
    /// Insertion point search over the remote queue
    Walker,
    /// Insertion plan and commit
    Plan,
    /// Spotify integration
    Spotify,
    /// HTTP client operations
    Http,
    /// Configuration loading and parsing
    Config,
    /// Interactive prompts
    Cli,
}

impl LoggingSubsystem {
    /// Get the module prefix for this subsystem
    pub fn module_prefix(&self) -> &'static str {
        match self {
            LoggingSubsystem::Main => "queuesplice",
            LoggingSubsystem::Walker => "queuesplice::queue::walker,queuesplice::helpers::retry",
            LoggingSubsystem::Plan => "queuesplice::queue::plan,queuesplice::queue::materializer,queuesplice::queue::session",
            LoggingSubsystem::Spotify => "queuesplice::helpers::spotify",
            LoggingSubsystem::Http => "queuesplice::helpers::http_client,ureq",
            LoggingSubsystem::Config => "queuesplice::config",
            LoggingSubsystem::Cli => "queuesplice::cli",
        }
    }
}

/// Logging configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Target for log output (stdout, stderr, file)
    #[serde(default = "default_target")]
    pub target: String,

    /// Log file path (when target is "file")
    pub file_path: Option<String>,

    /// Whether to include timestamps
    #[serde(default = "default_timestamps")]
    pub timestamps: bool,

    /// Whether to use colored output
    #[serde(default = "default_colors")]
    pub colors: bool,

    /// Subsystem-specific log levels
    #[serde(default)]
    pub subsystems: HashMap<String, String>,

    /// Whether to include module paths in log output
    #[serde(default)]
    pub include_module_path: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

// stdout carries the interactive dialogue
fn default_target() -> String {
    "stderr".to_string()
}

fn default_timestamps() -> bool {
    true
}

fn default_colors() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            target: default_target(),
            file_path: None,
            timestamps: default_timestamps(),
            colors: default_colors(),
            subsystems: HashMap::new(),
            include_module_path: false,
        }
    }
}

impl LoggingConfig {
    /// Load logging configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json)
            .map_err(|e| format!("Failed to parse logging config JSON: {}", e))
    }

    /// Convert string log level to LevelFilter
    fn parse_log_level(level: &str) -> LevelFilter {
        LevelFilter::from_str(level).unwrap_or_else(|_| {
            eprintln!("Warning: Unknown log level '{}', defaulting to 'info'", level);
            LevelFilter::Info
        })
    }

    /// Module prefixes and levels for every configured subsystem
    fn subsystem_filters(&self) -> Vec<(String, LevelFilter)> {
        let mut filters = Vec::new();
        for (name, level) in &self.subsystems {
            let level_filter = Self::parse_log_level(level);
            match LoggingSubsystem::from_str(name) {
                Ok(subsystem) => {
                    for prefix in subsystem.module_prefix().split(',') {
                        filters.push((prefix.trim().to_string(), level_filter));
                    }
                }
                // Allow custom module specifications
                Err(_) => filters.push((name.clone(), level_filter)),
            }
        }
        filters.sort();
        filters
    }

    /// Build the environment filter string for env_logger
    pub fn build_filter_string(&self) -> String {
        let mut filter_parts = vec![self.level.to_lowercase()];
        for (module, level) in self.subsystem_filters() {
            filter_parts.push(format!("{}={}", module, level.as_str().to_lowercase()));
        }
        filter_parts.join(",")
    }

    /// Raise the global level to debug for `--verbose` and `--debug`.
    /// `--debug` also tags every line with its module path.
    pub fn apply_flags(&mut self, verbose: bool, debug_mode: bool) {
        if verbose || debug_mode {
            self.level = "debug".to_string();
        }
        if debug_mode {
            self.include_module_path = true;
        }
    }

    /// Initialize the logger with this configuration
    pub fn initialize_logger(&self) -> Result<(), String> {
        let filter_string = self.build_filter_string();

        let mut builder = Builder::new();
        builder.filter(None, Self::parse_log_level(&self.level));
        for (module, level_filter) in self.subsystem_filters() {
            builder.filter(Some(module.as_str()), level_filter);
        }

        // RUST_LOG wins over the configuration file
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            builder.parse_filters(&rust_log);
        }

        let write_style = if self.colors {
            WriteStyle::Auto
        } else {
            WriteStyle::Never
        };
        builder.write_style(write_style);

        match self.target.to_lowercase().as_str() {
            "stdout" => {
                builder.target(Target::Stdout);
            }
            "stderr" => {
                builder.target(Target::Stderr);
            }
            "file" => {
                let file_path = self
                    .file_path
                    .as_ref()
                    .ok_or_else(|| "File target specified but no file_path provided".to_string())?;
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(file_path)
                    .map_err(|e| format!("Failed to open log file {}: {}", file_path, e))?;
                builder.target(Target::Pipe(Box::new(file)));
            }
            _ => {
                return Err(format!("Unknown logging target: {}", self.target));
            }
        }

        let include_module_path = self.include_module_path;
        let timestamps = self.timestamps;

        builder.format(move |buf, record| {
            let mut output = String::new();

            if timestamps {
                output.push_str(&format!("[{}] ", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));
            }

            output.push_str(&format!("[{}] ", record.level()));

            if include_module_path {
                if let Some(module) = record.module_path() {
                    output.push_str(&format!("[{}] ", module));
                }
            }

            output.push_str(&format!("{}", record.args()));

            writeln!(buf, "{}", output)
        });

        builder.try_init()
            .map_err(|e| format!("Failed to initialize logger: {}", e))?;

        info!("Logging initialized with filter: {}", filter_string);
        debug!("Logging target: {}", self.target);
        Ok(())
    }
}

/// Initialize logging from the configuration file section and command line flags
pub fn initialize_logging_with_args(config: &LoggingConfig, verbose: bool, debug_mode: bool) -> Result<(), String> {
    let mut config = config.clone();
    config.apply_flags(verbose, debug_mode);
    config.initialize_logger()
}
