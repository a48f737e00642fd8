//! Client configuration and the optional defaults file.
//!
//! [`ClientConfig`] holds what the library needs at runtime. [`FileConfig`]
//! is read from `config.toml` (a flat `key = value` file) and supplies
//! defaults that command-line flags override.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::http_client::HttpTimeouts;
use crate::kind::HtmlMode;
use crate::upload::DEFAULT_CSRF_COOKIE;

/// Backend origin used when nothing else is configured.
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8000";

/// Interval between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Wall-clock ceiling over one job.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration errors, from validation or from parsing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The backend origin is not an absolute http(s) URL.
    #[error("invalid backend origin '{origin}': expected an absolute http(s) URL")]
    InvalidOrigin {
        /// The rejected value.
        origin: String,
    },

    /// A numeric setting is outside its allowed range.
    #[error("invalid config value for `{key}`: {value}. Expected range: {expected}")]
    OutOfRange {
        /// Setting name.
        key: &'static str,
        /// The rejected value.
        value: u64,
        /// Allowed range, for display.
        expected: &'static str,
    },

    /// A line is not `key = value`.
    #[error("invalid config syntax on line {line}: expected key = value")]
    Syntax {
        /// 1-based line number.
        line: usize,
    },

    /// A key this client does not know.
    #[error("unknown configuration key '{key}' on line {line}")]
    UnknownKey {
        /// The unknown key.
        key: String,
        /// 1-based line number.
        line: usize,
    },

    /// A value of the wrong shape.
    #[error("invalid `{key}` value on line {line}: {reason}")]
    InvalidValue {
        /// Setting name.
        key: String,
        /// 1-based line number.
        line: usize,
        /// What was expected.
        reason: String,
    },

    /// The config file exists but could not be read.
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Runtime settings of the conversion client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin every endpoint and result path is qualified against.
    pub origin: String,
    /// Interval between status queries.
    pub poll_interval: Duration,
    /// Wall-clock ceiling over one job.
    pub job_timeout: Duration,
    /// Cookie holding the anti-forgery token.
    pub csrf_cookie_name: String,
    /// HTTP client timeouts.
    pub timeouts: HttpTimeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            job_timeout: DEFAULT_JOB_TIMEOUT,
            csrf_cookie_name: DEFAULT_CSRF_COOKIE.to_string(),
            timeouts: HttpTimeouts::default(),
        }
    }
}

impl ClientConfig {
    /// Checks the origin and that intervals are non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin_ok = Url::parse(&self.origin).is_ok_and(|url| {
            matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
        });
        if !origin_ok {
            return Err(ConfigError::InvalidOrigin {
                origin: self.origin.clone(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::OutOfRange {
                key: "poll_interval_ms",
                value: 0,
                expected: "100..=60000",
            });
        }
        if self.job_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                key: "job_timeout_secs",
                value: 0,
                expected: "1..=3600",
            });
        }
        Ok(())
    }

    /// Applies every setting present in `file`.
    pub fn apply_file(&mut self, file: &FileConfig) {
        if let Some(origin) = &file.origin {
            self.origin.clone_from(origin);
        }
        if let Some(ms) = file.poll_interval_ms {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = file.job_timeout_secs {
            self.job_timeout = Duration::from_secs(secs);
        }
        if let Some(name) = &file.csrf_cookie {
            self.csrf_cookie_name.clone_from(name);
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.timeouts.connect = Duration::from_secs(secs);
        }
        if let Some(secs) = file.read_timeout_secs {
            self.timeouts.read = Duration::from_secs(secs);
        }
    }
}

/// Defaults read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Backend origin.
    pub origin: Option<String>,
    /// Directory converted files are saved to.
    pub output_dir: Option<PathBuf>,
    /// Cookie name holding the anti-forgery token.
    pub csrf_cookie: Option<String>,
    /// Fixed anti-forgery token.
    pub csrf_token: Option<String>,
    /// PDF to HTML output style.
    pub html_mode: Option<HtmlMode>,
    /// Keep graphics in PDF to Word output.
    pub preserve_graphics: Option<bool>,
    /// Status polling interval in milliseconds (100..=60000).
    pub poll_interval_ms: Option<u64>,
    /// Job timeout in seconds (1..=3600).
    pub job_timeout_secs: Option<u64>,
    /// HTTP connect timeout in seconds (1..=3600).
    pub connect_timeout_secs: Option<u64>,
    /// HTTP read timeout in seconds (1..=3600).
    pub read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates numeric ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("poll_interval_ms", self.poll_interval_ms, 100, 60_000, "100..=60000")?;
        check_range("job_timeout_secs", self.job_timeout_secs, 1, 3600, "1..=3600")?;
        check_range("connect_timeout_secs", self.connect_timeout_secs, 1, 3600, "1..=3600")?;
        check_range("read_timeout_secs", self.read_timeout_secs, 1, 3600, "1..=3600")?;
        Ok(())
    }
}

fn check_range(
    key: &'static str,
    value: Option<u64>,
    min: u64,
    max: u64,
    expected: &'static str,
) -> Result<(), ConfigError> {
    match value {
        Some(value) if !(min..=max).contains(&value) => Err(ConfigError::OutOfRange {
            key,
            value,
            expected,
        }),
        _ => Ok(()),
    }
}

/// Result of looking for the config file.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path, when a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed config when the file exists.
    pub config: Option<FileConfig>,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/converter/config.toml`
/// 2. `$HOME/.config/converter/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("converter")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("converter")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file from the default path if it exists.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file exists but cannot be read or parsed.
pub fn load_default_file_config() -> Result<LoadedConfig, ConfigError> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(existing) if existing.exists() => Some(load_file_config(existing)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

/// Reads and parses a config file.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read or parsed.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_str(&raw)
}

/// Parses config file contents.
///
/// # Errors
///
/// Returns [`ConfigError`] naming the line of the first problem.
pub fn parse_config_str(raw: &str) -> Result<FileConfig, ConfigError> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            return Err(ConfigError::Syntax { line: line_no });
        };
        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            line: line_no,
            reason: reason.to_string(),
        };

        match key {
            "origin" => {
                let parsed = parse_string_literal(value).ok_or_else(|| invalid(EXPECTED_STRING))?;
                cfg.origin = Some(parsed);
            }
            "output_dir" => {
                let parsed = parse_string_literal(value).ok_or_else(|| invalid(EXPECTED_STRING))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "csrf_cookie" => {
                let parsed = parse_string_literal(value).ok_or_else(|| invalid(EXPECTED_STRING))?;
                cfg.csrf_cookie = Some(parsed);
            }
            "csrf_token" => {
                let parsed = parse_string_literal(value).ok_or_else(|| invalid(EXPECTED_STRING))?;
                cfg.csrf_token = Some(parsed);
            }
            "html_mode" => {
                let parsed = parse_string_literal(value).ok_or_else(|| invalid(EXPECTED_STRING))?;
                cfg.html_mode = Some(
                    parsed
                        .parse::<HtmlMode>()
                        .map_err(|_| invalid("expected \"formatted\" or \"clean\""))?,
                );
            }
            "preserve_graphics" => {
                cfg.preserve_graphics =
                    Some(parse_boolean(value).ok_or_else(|| invalid("expected true or false"))?);
            }
            "poll_interval_ms" => {
                let parsed = parse_integer_u64(value).ok_or_else(|| invalid(EXPECTED_INTEGER))?;
                cfg.poll_interval_ms = Some(parsed);
            }
            "job_timeout_secs" => {
                let parsed = parse_integer_u64(value).ok_or_else(|| invalid(EXPECTED_INTEGER))?;
                cfg.job_timeout_secs = Some(parsed);
            }
            "connect_timeout_secs" => {
                let parsed = parse_integer_u64(value).ok_or_else(|| invalid(EXPECTED_INTEGER))?;
                cfg.connect_timeout_secs = Some(parsed);
            }
            "read_timeout_secs" => {
                let parsed = parse_integer_u64(value).ok_or_else(|| invalid(EXPECTED_INTEGER))?;
                cfg.read_timeout_secs = Some(parsed);
            }
            unknown => {
                return Err(ConfigError::UnknownKey {
                    key: unknown.to_string(),
                    line: line_no,
                });
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

const EXPECTED_STRING: &str = "expected double-quoted string";
const EXPECTED_INTEGER: &str = "expected non-negative integer";

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Option<String> {
    let inner = raw_value.strip_prefix('"')?.strip_suffix('"')?;
    Some(inner.to_string())
}

fn parse_integer_u64(raw_value: &str) -> Option<u64> {
    raw_value.trim().replace('_', "").parse::<u64>().ok()
}

fn parse_boolean(raw_value: &str) -> Option<bool> {
    match raw_value.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
