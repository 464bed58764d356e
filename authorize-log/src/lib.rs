//! Gateway Logging
//!
//! Leveled logging for the Authorize.net gateway. Every line is passed
//! through [`redact`] before it is written, so card numbers and CVVs never
//! reach the log even when they end up in a format argument.
//!
//! # Usage
//!
//! ```rust
//! use authorize_log::{debug, info, warn};
//!
//! debug!("Issuing AUTH_ONLY");
//! info!("Transaction {} approved", "2171062816");
//! warn!(target: "authorize::legacy", "Declined: {}", "This transaction has been declined.");
//! ```
//!
//! # Environment Variables
//!
//! - `AUTHORIZE_DEBUG=1` - Enable debug logging
//! - `AUTHORIZE_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `AUTHORIZE_LOG_FORMAT=text|json` - Set output format
//! - `AUTHORIZE_LOG_TIMESTAMPS=1|0` - Include timestamps

pub mod redact;

pub use redact::{mask_card_number, redact};

use once_cell::sync::Lazy;
use std::env;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

pub const ENV_DEBUG: &str = "AUTHORIZE_DEBUG";
pub const ENV_LEVEL: &str = "AUTHORIZE_LOG_LEVEL";
pub const ENV_FORMAT: &str = "AUTHORIZE_LOG_FORMAT";
pub const ENV_TIMESTAMPS: &str = "AUTHORIZE_LOG_TIMESTAMPS";

/// Severity of a log line, most verbose first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Disables output entirely
    Off = 5,
}

impl Level {
    const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Off,
    ];

    /// Upper-case name as written in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    /// Case-insensitive; accepts `warning` and `none` as aliases
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("warning") {
            return Some(Level::Warn);
        }
        if name.eq_ignore_ascii_case("none") {
            return Some(Level::Off);
        }
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(name))
    }

    fn from_repr(value: u8) -> Self {
        Self::ALL
            .get(value as usize)
            .copied()
            .unwrap_or(Level::Off)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How lines are rendered on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `2024-01-01 12:00:00.000 WARN  [target] message`
    Text,
    /// One JSON object per line
    Json,
}

impl Format {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "plain" => Some(Format::Text),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Warn as u8);
static CONFIG: Lazy<LogConfig> = Lazy::new(|| {
    let config = LogConfig::from_env();
    DEBUG_ENABLED.store(config.debug, Ordering::SeqCst);
    LOG_LEVEL.store(config.level as u8, Ordering::SeqCst);
    config
});

/// Settings read once from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub debug: bool,
    pub level: Level,
    pub format: Format,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Warn,
            format: Format::Text,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Read `AUTHORIZE_*` variables; unset or unparsable ones keep their
    /// default. Debug mode lowers the default level to `Debug`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |name: &str| {
            lookup(name).map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        };

        let debug = flag(ENV_DEBUG).unwrap_or(defaults.debug);
        let level = lookup(ENV_LEVEL)
            .and_then(|v| Level::parse(&v))
            .unwrap_or(if debug { Level::Debug } else { defaults.level });
        let format = lookup(ENV_FORMAT)
            .and_then(|v| Format::parse(&v))
            .unwrap_or(defaults.format);
        let timestamps = flag(ENV_TIMESTAMPS).unwrap_or(defaults.timestamps);

        Self {
            debug,
            level,
            format,
            timestamps,
        }
    }
}

/// Apply the environment now rather than at the first log line
pub fn init() {
    Lazy::force(&CONFIG);
}

/// Global configuration
pub fn config() -> &'static LogConfig {
    &CONFIG
}

#[inline]
pub fn is_debug_enabled() -> bool {
    init();
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    init();
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

pub fn current_level() -> Level {
    init();
    Level::from_repr(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn set_level(level: Level) {
    init();
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Toggle debug mode; enabling it also lowers the level to `Debug`.
pub fn set_debug(enabled: bool) {
    init();
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        LOG_LEVEL.store(Level::Debug as u8, Ordering::SeqCst);
    }
}

/// One redacted log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    pub level: Level,
    pub target: &'a str,
    pub message: std::borrow::Cow<'a, str>,
}

impl<'a> Record<'a> {
    /// Build a record, masking card data in `message`
    pub fn new(level: Level, target: &'a str, message: &'a str) -> Self {
        Self {
            level,
            target,
            message: redact(message),
        }
    }

    /// Render as text, with a local timestamp when `timestamps` is set
    pub fn to_text(&self, timestamps: bool) -> String {
        let mut line = String::new();
        if timestamps {
            line.push_str(&chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f ").to_string());
        }
        line.push_str(&format!("{:5} ", self.level.as_str()));
        if !self.target.is_empty() {
            line.push_str(&format!("[{}] ", self.target));
        }
        line.push_str(&self.message);
        line
    }

    /// Render as a JSON object
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "level": self.level.as_str(),
            "target": self.target,
            "message": self.message,
        })
        .to_string()
    }

    #[cfg(not(feature = "json"))]
    pub fn to_json(&self) -> String {
        self.to_text(true)
    }
}

/// Write a line at `level`. Used by the macros.
#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    let config = config();
    if !is_level_enabled(level) {
        return;
    }

    let record = Record::new(level, target, message);
    let line = match config.format {
        Format::Text => record.to_text(config.timestamps),
        Format::Json => record.to_json(),
    };
    let _ = writeln!(std::io::stderr().lock(), "{}", line);
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:expr, target: $target:expr, $($arg:tt)+) => {{
        let level = $level;
        if $crate::is_level_enabled(level)
            || (level == $crate::Level::Debug && $crate::is_debug_enabled())
        {
            $crate::log(level, $target, &format!($($arg)+));
        }
    }};
}

/// Log at trace level
#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => { $crate::__log!($crate::Level::Trace, target: $target, $($arg)+) };
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Trace, target: module_path!(), $($arg)+) };
}

/// Log at debug level.
///
/// Enabled by `AUTHORIZE_DEBUG=1`, `AUTHORIZE_LOG_LEVEL=debug` or a gateway
/// configured in debug mode.
///
/// ```rust
/// use authorize_log::debug;
///
/// let transaction_id = "2171062816";
/// debug!("Settling transaction {}", transaction_id);
/// debug!(target: "authorize::legacy", "x_type={}", "PRIOR_AUTH_CAPTURE");
/// ```
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => { $crate::__log!($crate::Level::Debug, target: $target, $($arg)+) };
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Debug, target: module_path!(), $($arg)+) };
}

/// Log at info level
#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => { $crate::__log!($crate::Level::Info, target: $target, $($arg)+) };
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Info, target: module_path!(), $($arg)+) };
}

/// Log at warn level
#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => { $crate::__log!($crate::Level::Warn, target: $target, $($arg)+) };
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Warn, target: module_path!(), $($arg)+) };
}

/// Log at error level
#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => { $crate::__log!($crate::Level::Error, target: $target, $($arg)+) };
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Error, target: module_path!(), $($arg)+) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> LogConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("debug"), Some(Level::Debug));
        assert_eq!(Level::parse(" DEBUG "), Some(Level::Debug));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("none"), Some(Level::Off));
        assert_eq!(Level::parse("verbose"), None);
        assert!(Level::Trace < Level::Error);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("json"), Some(Format::Json));
        assert_eq!(Format::parse("Pretty"), Some(Format::Text));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn test_config_defaults_to_quiet_text() {
        assert_eq!(config_from(&[]), LogConfig::default());
    }

    #[test]
    fn test_debug_env_lowers_level() {
        let config = config_from(&[(ENV_DEBUG, "true")]);
        assert!(config.debug);
        assert_eq!(config.level, Level::Debug);

        let config = config_from(&[(ENV_DEBUG, "1"), (ENV_LEVEL, "error")]);
        assert_eq!(config.level, Level::Error);
    }

    #[test]
    fn test_config_ignores_bad_values() {
        let config = config_from(&[(ENV_LEVEL, "loud"), (ENV_FORMAT, "xml"), (ENV_TIMESTAMPS, "0")]);
        assert_eq!(config.level, Level::Warn);
        assert_eq!(config.format, Format::Text);
        assert!(!config.timestamps);
    }

    #[test]
    fn test_record_is_redacted() {
        let message = "charging 4111111111111111 x_card_code=123";
        let record = Record::new(Level::Warn, "authorize::legacy", message);
        assert_eq!(record.message, "charging ************1111 x_card_code=***");

        let text = record.to_text(false);
        assert_eq!(
            text,
            "WARN  [authorize::legacy] charging ************1111 x_card_code=***"
        );
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_record_json() {
        let record = Record::new(Level::Error, "authorize::soap", "fault");
        let value: serde_json::Value = serde_json::from_str(&record.to_json()).unwrap();
        assert_eq!(value["level"], "ERROR");
        assert_eq!(value["target"], "authorize::soap");
        assert_eq!(value["message"], "fault");
    }

    #[test]
    fn test_runtime_level_and_debug() {
        let original_level = current_level();
        let original_debug = is_debug_enabled();

        set_level(Level::Error);
        assert_eq!(current_level(), Level::Error);
        assert!(!is_level_enabled(Level::Warn));
        assert!(is_level_enabled(Level::Error));
        assert!(!is_level_enabled(Level::Off));

        set_debug(true);
        assert!(is_debug_enabled());
        assert_eq!(current_level(), Level::Debug);

        set_debug(original_debug);
        set_level(original_level);
    }

    #[test]
    fn test_macros_expand() {
        trace!("trace message");
        debug!("debug message");
        info!("info message");
        warn!(target: "authorize::test", "response code {}", 2);
        error!("card {}", "4111111111111111");
    }
}
