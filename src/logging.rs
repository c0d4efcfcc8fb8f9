/// Structured logging for the Ksat service
///
/// Provides context-rich logging with component and location identifiers,
/// timestamps, and severity levels. Console output goes to stderr so the
/// CLI's JSON on stdout stays clean; an optional log file receives every
/// entry in full.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

use crate::model::GatewayError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    SoilGrids,
    OpenMeteo,
    Model,
    Api,
    Sim,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::SoilGrids => write!(f, "SOILGRIDS"),
            Component::OpenMeteo => write!(f, "METEO"),
            Component::Model => write!(f, "MODEL"),
            Component::Api => write!(f, "API"),
            Component::Sim => write!(f, "SIM"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the API simply has no value here (e.g. open water)
    Expected,
    /// Unexpected failure - indicates service degradation or an API change
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn format_entry(level: LogLevel, component: Component, context: Option<&str>, message: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let context_part = context.map(|c| format!(" [{}]", c)).unwrap_or_default();
        format!("{} {} {}{}: {}", timestamp, level, component, context_part, message)
    }

    fn log(&self, level: LogLevel, component: Component, context: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, component, context, message);

        if self.console_timestamps {
            eprintln!("{}", log_entry);
        } else {
            let context_part = context.map(|c| format!(" [{}]", c)).unwrap_or_default();
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", component, context_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", component, context_part, message),
                LogLevel::Info => eprintln!("   {}", message),
                LogLevel::Debug => eprintln!("   [DEBUG] {}", message),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn dispatch(level: LogLevel, component: Component, context: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, component, context, message);
        }
    }
}

/// Log a general informational message
pub fn info(component: Component, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Info, component, context, message);
}

/// Log a warning message
pub fn warn(component: Component, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Warning, component, context, message);
}

/// Log an error message
pub fn error(component: Component, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Error, component, context, message);
}

/// Log a debug message
pub fn debug(component: Component, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Debug, component, context, message);
}

// ---------------------------------------------------------------------------
// Gateway Failure Logging
// ---------------------------------------------------------------------------

/// Classify a gateway failure by what it says about the remote service
pub fn classify_gateway_failure(err: &GatewayError) -> FailureType {
    match err {
        // SoilGrids has no soil under lakes, oceans and glaciers
        GatewayError::NoData(_) => FailureType::Expected,
        GatewayError::Transport(_) => FailureType::Unexpected,
        GatewayError::Http(status) if *status >= 500 => FailureType::Unexpected,
        // Parse errors suggest an API change
        GatewayError::Parse(_) => FailureType::Unexpected,
        GatewayError::Http(_) => FailureType::Unknown,
    }
}

/// Log a gateway failure with automatic classification
pub fn log_gateway_failure(component: Component, context: &str, operation: &str, err: &GatewayError) {
    let failure_type = classify_gateway_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(component, Some(context), &message),
        FailureType::Unexpected => error(component, Some(context), &message),
        FailureType::Unknown => warn(component, Some(context), &message),
    }
}

/// Log how many properties of a multi-property fetch came back
pub fn log_fetch_summary(component: Component, context: &str, total: usize, measured: usize) {
    let defaulted = total - measured.min(total);
    let message = format!(
        "Fetch complete: {}/{} properties measured, {} defaulted",
        measured, total, defaulted
    );

    if defaulted == 0 {
        debug(component, Some(context), &message);
    } else if measured == 0 {
        error(component, Some(context), &message);
    } else {
        warn(component, Some(context), &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("INFO".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!(" warn ".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_failure_classification() {
        assert_eq!(
            classify_gateway_failure(&GatewayError::NoData("clay".into())),
            FailureType::Expected
        );
        assert_eq!(classify_gateway_failure(&GatewayError::Http(502)), FailureType::Unexpected);
        assert_eq!(classify_gateway_failure(&GatewayError::Http(404)), FailureType::Unknown);
        assert_eq!(
            classify_gateway_failure(&GatewayError::Transport("timed out".into())),
            FailureType::Unexpected
        );
    }

    #[test]
    fn test_entry_format_includes_component_and_context() {
        let entry = Logger::format_entry(LogLevel::Warning, Component::SoilGrids, Some("40.69,-89.59"), "clay missing");
        assert!(entry.ends_with("WARN SOILGRIDS [40.69,-89.59]: clay missing"), "got '{}'", entry);
    }

    #[test]
    fn test_simulated_source_entries_are_tagged() {
        let entry = Logger::format_entry(LogLevel::Debug, Component::Sim, Some("40.6936,-89.5890"), "Synthetic sample");
        assert!(entry.ends_with("DEBUG SIM [40.6936,-89.5890]: Synthetic sample"), "got '{}'", entry);
    }
}
