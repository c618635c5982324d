use crate::theme::{Pattern, Rgb, Theme, parse_hex_color};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_SCALE: f32 = 6.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bg_color: Rgb,
    pub theme: Theme,
    pub generator: Option<String>,
    pub scale: f32,
    pub seed: Option<u64>,
    pub start_paused: bool,
    pub log_file: Option<PathBuf>,
    pub log_level: log::LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bg_color: (0, 0, 0),
            theme: Theme::default(),
            generator: None,
            scale: DEFAULT_SCALE,
            seed: None,
            start_paused: false,
            log_file: None,
            log_level: log::LevelFilter::Info,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Command {
    Run(Config),
    Help,
}

#[derive(Debug)]
pub enum ConfigError {
    UnknownOption(String),
    MissingValue(&'static str),
    InvalidColor(String),
    InvalidNumber { option: &'static str, value: String },
    UnknownPattern(String),
    UnknownLevel(String),
    ThemeFile { path: PathBuf, source: std::io::Error },
    ThemeJson { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownOption(opt) => write!(f, "Unknown option: {}", opt),
            ConfigError::MissingValue(opt) => write!(f, "{} requires a value", opt),
            ConfigError::InvalidColor(hex) => {
                write!(f, "Invalid hex color: {}\nExpected format: RRGGBB (e.g., 1a1b26)", hex)
            }
            ConfigError::InvalidNumber { option, value } => {
                write!(f, "Invalid number for {}: {}", option, value)
            }
            ConfigError::UnknownPattern(name) => {
                write!(f, "Unknown pattern: {} (expected standard, ring, heart or star)", name)
            }
            ConfigError::UnknownLevel(name) => write!(f, "Unknown log level: {}", name),
            ConfigError::ThemeFile { path, source } => {
                write!(f, "Failed to read theme file {}: {}", path.display(), source)
            }
            ConfigError::ThemeJson { path, source } => {
                write!(f, "Invalid theme file {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ThemeFile { source, .. } => Some(source),
            ConfigError::ThemeJson { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub fn usage() -> &'static str {
    "skyshow - Fireworks in the terminal

Usage: skyshow [OPTIONS]

Options:
  --bg-color RRGGBB   Set background color as hex (e.g., --bg-color 1a1b26)
  --theme FILE        Load a theme from a JSON file
  --pattern NAME      Explosion pattern: standard, ring, heart, star
  --generator CMD     Shell command that turns a mood into theme JSON
                      (instruction on stdin, JSON on stdout)
  --scale N           World units per pixel (default 6)
  --seed N            Seed the random generator for a repeatable show
  --paused            Start paused
  --log-file PATH     Write log records to PATH
  --log-level LEVEL   error, warn, info, debug or trace (default info)
  -h, --help          Show this help

Controls:
  click      launch a shell at the pointer     space   pause / resume
  1-4, p     choose / cycle pattern            + -     launch frequency
  [ ]        particle size                     , .     particle density
  a x        add / remove a color              r       reset theme
  g          describe a mood for the generator i       help overlay

Press 'q', ESC, or Ctrl+C to exit"
}

fn value<'a, I>(args: &mut I, option: &'static str) -> Result<String, ConfigError>
where
    I: Iterator<Item = &'a String>,
{
    args.next().cloned().ok_or(ConfigError::MissingValue(option))
}

fn number<T: std::str::FromStr>(raw: String, option: &'static str) -> Result<T, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::InvalidNumber { option, value: raw })
}

/// Parse the arguments after the program name.
pub fn parse(args: &[String]) -> Result<Command, ConfigError> {
    let mut config = Config::default();
    let mut pattern = None;
    let mut args = args.iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bg-color" => {
                let raw = value(&mut args, "--bg-color")?;
                config.bg_color = parse_hex_color(&raw).ok_or(ConfigError::InvalidColor(raw))?;
            }
            "--theme" => {
                let path = PathBuf::from(value(&mut args, "--theme")?);
                config.theme = load_theme(path)?;
            }
            "--pattern" => {
                let raw = value(&mut args, "--pattern")?;
                pattern = Some(Pattern::from_name(&raw).ok_or(ConfigError::UnknownPattern(raw))?);
            }
            "--generator" => config.generator = Some(value(&mut args, "--generator")?),
            "--scale" => {
                let scale: f32 = number(value(&mut args, "--scale")?, "--scale")?;
                if !(scale.is_finite() && scale >= 1.0) {
                    return Err(ConfigError::InvalidNumber { option: "--scale", value: scale.to_string() });
                }
                config.scale = scale;
            }
            "--seed" => config.seed = Some(number(value(&mut args, "--seed")?, "--seed")?),
            "--paused" => config.start_paused = true,
            "--log-file" => config.log_file = Some(PathBuf::from(value(&mut args, "--log-file")?)),
            "--log-level" => {
                let raw = value(&mut args, "--log-level")?;
                config.log_level = raw.parse().map_err(|_| ConfigError::UnknownLevel(raw))?;
            }
            "help" | "--help" | "-h" => return Ok(Command::Help),
            other => return Err(ConfigError::UnknownOption(other.to_string())),
        }
    }

    // Applied last so it overrides whatever the theme file says
    if let Some(pattern) = pattern {
        config.theme.pattern = pattern;
    }

    Ok(Command::Run(config))
}

fn load_theme(path: PathBuf) -> Result<Theme, ConfigError> {
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(source) => return Err(ConfigError::ThemeFile { path, source }),
    };
    Theme::from_json(&text).map_err(|source| ConfigError::ThemeJson { path, source })
}
