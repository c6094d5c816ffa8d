/// Command-line configuration.
///
/// `fat32_shell <image> [log=<level>] [grow=on|off] [color=on|off]`

use core::fmt;
use std::path::PathBuf;

use log::LevelFilter;

pub const LOG_ENV: &str = "FAT32_SHELL_LOG";

pub const USAGE: &str = "usage: fat32_shell <image> [log=off|error|warn|info|debug|trace] [grow=on|off] [color=on|off]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub image:     PathBuf,
    pub log_level: LevelFilter,
    /// Grow full directories by one cluster instead of failing.
    pub grow_dirs: bool,
    pub color:     bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingImage,
    ExtraArgument(String),
    UnknownOption(String),
    BadValue { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingImage => write!(f, "missing image path"),
            ConfigError::ExtraArgument(arg) => write!(f, "unexpected argument '{arg}'"),
            ConfigError::UnknownOption(key) => write!(f, "unknown option '{key}'"),
            ConfigError::BadValue { key, value } => write!(f, "invalid value '{value}' for '{key}'"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn parse_level(value: &str) -> Option<LevelFilter> {
    match value {
        "off"   => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn"  => Some(LevelFilter::Warn),
        "info"  => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _       => None,
    }
}

fn parse_switch(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "on"  => Ok(true),
        "off" => Ok(false),
        _     => Err(ConfigError::BadValue { key, value: value.into() }),
    }
}

impl Config {
    /// Build from the arguments after the program name. `env_level` is the
    /// value of `FAT32_SHELL_LOG`, used when no `log=` option is given.
    pub fn from_args<I>(args: I, env_level: Option<&str>) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut image = None;
        let mut log_level = None;
        let mut grow_dirs = false;
        let mut color = true;

        for arg in args {
            let arg = arg.as_ref();
            match arg.split_once('=') {
                Some(("log", v)) => {
                    log_level = Some(parse_level(v)
                        .ok_or_else(|| ConfigError::BadValue { key: "log", value: v.into() })?);
                }
                Some(("grow", v))  => grow_dirs = parse_switch("grow", v)?,
                Some(("color", v)) => color = parse_switch("color", v)?,
                Some((key, _)) if image.is_some() => return Err(ConfigError::UnknownOption(key.into())),
                _ if image.is_none() => image = Some(PathBuf::from(arg)),
                _ => return Err(ConfigError::ExtraArgument(arg.into())),
            }
        }

        let log_level = match log_level {
            Some(level) => level,
            None => env_level
                .map(|v| parse_level(v.trim())
                    .ok_or_else(|| ConfigError::BadValue { key: LOG_ENV, value: v.into() }))
                .transpose()?
                .unwrap_or(LevelFilter::Warn),
        };

        Ok(Config {
            image: image.ok_or(ConfigError::MissingImage)?,
            log_level,
            grow_dirs,
            color,
        })
    }
}
