//! Application configuration loading for CLI defaults.
//!
//! The config file is optional. It uses a small `key = value` subset of
//! TOML; explicit CLI flags always win over file values.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use playlist_grabber_core::QualityPreference;
use playlist_grabber_core::resolve::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_PACING_DELAY, DEFAULT_WORKERS,
    RunOptions, Strategy,
};
use tracing::warn;

use crate::cli::Args;

/// Smallest pacing delay the CLI accepts before raising it.
pub const MIN_CLI_DELAY_SECS: f64 = 0.5;

/// File configuration for CLI defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileConfig {
    /// Directory for default-named output files.
    pub output_dir: Option<PathBuf>,
    /// Default quality.
    pub quality: Option<QualityPreference>,
    /// Default pacing delay in seconds.
    pub delay: Option<f64>,
    /// Default attempts per video.
    pub retries: Option<i64>,
    /// Default worker count.
    pub workers: Option<i64>,
    /// Default scheduling strategy.
    pub strategy: Option<Strategy>,
    /// Default per-attempt timeout in seconds (0 disables).
    pub timeout_secs: Option<u64>,
    /// Append name fragments to URLs by default.
    pub name_fragment: Option<bool>,
    /// Path to the yt-dlp executable.
    pub yt_dlp: Option<PathBuf>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config, or defaults when no file exists.
    pub config: FileConfig,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/playlist-grabber/config.toml`
/// 2. `$HOME/.config/playlist-grabber/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("playlist-grabber")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("playlist-grabber")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    match path.as_deref() {
        Some(path_ref) if path_ref.exists() => {
            let config = load_file_config(path_ref)?;
            Ok(LoadedConfig {
                path,
                config,
                loaded_from_file: true,
            })
        }
        _ => Ok(LoadedConfig {
            path,
            config: FileConfig::default(),
            loaded_from_file: false,
        }),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_no = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "quality" => {
                let label = parse_string_literal(value).with_context(invalid)?;
                cfg.quality = Some(
                    label
                        .parse::<QualityPreference>()
                        .with_context(invalid)?,
                );
            }
            "delay" => cfg.delay = Some(parse_float(value).with_context(invalid)?),
            "retries" => cfg.retries = Some(parse_integer(value).with_context(invalid)?),
            "workers" => cfg.workers = Some(parse_integer(value).with_context(invalid)?),
            "strategy" => {
                let label = parse_string_literal(value).with_context(invalid)?;
                cfg.strategy = Some(label.parse::<Strategy>().with_context(invalid)?);
            }
            "timeout_secs" => {
                let secs = parse_integer(value).with_context(invalid)?;
                cfg.timeout_secs = Some(
                    u64::try_from(secs)
                        .map_err(|_| anyhow::anyhow!("Expected non-negative integer"))
                        .with_context(invalid)?,
                );
            }
            "name_fragment" => {
                cfg.name_fragment = Some(parse_boolean(value).with_context(invalid)?);
            }
            "yt_dlp" => {
                cfg.yt_dlp = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "verbosity" => {
                let label = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&label).with_context(invalid)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    Ok(cfg)
}

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

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer(raw_value: &str) -> Result<i64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    Ok(token.parse::<i64>()?)
}

fn parse_float(raw_value: &str) -> Result<f64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected number");
    }
    Ok(token.parse::<f64>()?)
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

/// Settings after layering CLI flags over the config file.
#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    /// Options handed to the resolution pipeline.
    pub run: RunOptions,
    /// Explicit output file, if any.
    pub output: Option<PathBuf>,
    /// Directory for default-named output files.
    pub output_dir: Option<PathBuf>,
    /// JSON report destination.
    pub json: Option<PathBuf>,
    /// Append name fragments to URLs.
    pub name_fragment: bool,
    /// yt-dlp executable, if not the default.
    pub yt_dlp: Option<PathBuf>,
    /// Per-video quality overrides.
    pub overrides: HashMap<String, QualityPreference>,
}

/// Layers `args` over `file`: explicit flags win, then file values, then
/// built-in defaults.
///
/// Delays below [`MIN_CLI_DELAY_SECS`] are raised with a warning.
/// Non-positive delays pass through so the pipeline rejects them.
#[must_use]
pub fn effective_settings(args: &Args, file: &FileConfig) -> EffectiveSettings {
    let strategy = if args.concurrent {
        Strategy::Concurrent
    } else {
        file.strategy.unwrap_or_default()
    };

    let mut delay = args
        .delay
        .or(file.delay)
        .unwrap_or(DEFAULT_PACING_DELAY.as_secs_f64());
    if delay > 0.0 && delay < MIN_CLI_DELAY_SECS {
        warn!(
            requested = delay,
            minimum = MIN_CLI_DELAY_SECS,
            "delay too short; raising to minimum to avoid rate limiting"
        );
        delay = MIN_CLI_DELAY_SECS;
    }

    let attempt_timeout = match args.timeout.or(file.timeout_secs) {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => Some(DEFAULT_ATTEMPT_TIMEOUT),
    };

    EffectiveSettings {
        run: RunOptions {
            quality: args.quality.or(file.quality).unwrap_or_default(),
            overrides: HashMap::new(),
            strategy,
            workers: args.workers.or(file.workers).unwrap_or(DEFAULT_WORKERS),
            pacing_delay_secs: delay,
            max_retries: args
                .retries
                .or(file.retries)
                .unwrap_or(i64::from(DEFAULT_MAX_RETRIES)),
            attempt_timeout,
        },
        output: args.output.clone(),
        output_dir: file.output_dir.clone(),
        json: args.json.clone(),
        name_fragment: args.name_fragment || file.name_fragment.unwrap_or(false),
        yt_dlp: args.yt_dlp.clone().or_else(|| file.yt_dlp.clone()),
        overrides: args.overrides.iter().cloned().collect(),
    }
}

/// Log filter level from flags and config.
///
/// Priority: quiet flag > verbose flag > config verbosity > `info`.
/// `RUST_LOG` overrides all of these at subscriber setup.
#[must_use]
pub fn default_log_level(args: &Args, file: &FileConfig) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => match file.verbosity {
            Some(VerbositySetting::Quiet) => "error",
            Some(VerbositySetting::Verbose) => "debug",
            Some(VerbositySetting::Debug) => "trace",
            Some(VerbositySetting::Default) | None => "info",
        },
        1 => "debug",
        _ => "trace",
    }
}
