//! Theme generation from a free-text mood.
//!
//! The show only knows the [`ThemeGenerator`] trait. [`CommandGenerator`] is the
//! stock implementation: it pipes an instruction into any command line tool that
//! talks to a text model and reads a JSON theme back.

use crate::theme::Theme;
use std::fmt;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

/// Errors that keep a generator from producing any response at all.
#[derive(Debug)]
pub enum GenerationError {
    /// The generator command could not be started.
    Spawn(std::io::Error),
    /// Writing the request or reading the response failed.
    Io(std::io::Error),
    /// The command ran but reported failure.
    Status { code: Option<i32>, stderr: String },
    /// The response was not valid UTF-8.
    Encoding(std::string::FromUtf8Error),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Spawn(e) => write!(f, "Failed to start theme generator: {}", e),
            GenerationError::Io(e) => write!(f, "Theme generator I/O failed: {}", e),
            GenerationError::Status { code: Some(code), stderr } => {
                write!(f, "Theme generator exited with status {}: {}", code, stderr.trim())
            }
            GenerationError::Status { code: None, stderr } => {
                write!(f, "Theme generator was terminated: {}", stderr.trim())
            }
            GenerationError::Encoding(e) => write!(f, "Theme generator output is not UTF-8: {}", e),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::Spawn(e) => Some(e),
            GenerationError::Io(e) => Some(e),
            GenerationError::Encoding(e) => Some(e),
            GenerationError::Status { .. } => None,
        }
    }
}

impl From<std::io::Error> for GenerationError {
    fn from(e: std::io::Error) -> Self {
        GenerationError::Io(e)
    }
}

impl From<std::string::FromUtf8Error> for GenerationError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        GenerationError::Encoding(e)
    }
}

pub trait ThemeGenerator: Send + Sync {
    /// Turn a mood into a theme. A response that cannot be read as a theme is not an
    /// error: it yields [`Theme::stellar_default`].
    fn generate(&self, prompt: &str) -> Result<Theme, GenerationError>;
}

/// Instruction sent to the text model for a given mood.
pub fn instruction(prompt: &str) -> String {
    format!(
        "Create a unique firework show theme based on this mood: \"{}\". \
         Provide technical parameters for a fireworks engine.\n\
         Reply with a single JSON object and nothing else, with these fields:\n\
         - \"name\" (string): poetic name of the theme\n\
         - \"description\" (string): short description of the visual vibe\n\
         - \"colors\" (array of strings): hex color codes (e.g. #FF0000) that fit the theme\n\
         - \"launchFrequency\" (number): how often to launch (0.01 to 0.1)\n\
         - \"particleCount\" (number): density of explosions (50 to 200)\n\
         - \"particleSize\" (number): size of individual firework particles (0.5 to 5)\n\
         - \"explosionType\" (string): one of \"standard\", \"ring\", \"heart\", \"star\"\n",
        prompt.trim()
    )
}

/// Read a generator response, substituting the default theme if it does not parse.
pub fn theme_from_response(text: &str) -> Theme {
    match Theme::from_json(strip_code_fence(text)) {
        Ok(theme) => theme,
        Err(e) => {
            log::error!("Failed to parse theme, using default: {}", e);
            Theme::stellar_default()
        }
    }
}

/// Models like to wrap their JSON in a markdown fence (```json ... ```). Returns the
/// text inside a single surrounding fence, or the trimmed text if there is none.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the language tag on the opening line
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => body.trim(),
    }
}

/// Runs a shell command per request: instruction on stdin, theme JSON on stdout.
pub struct CommandGenerator {
    command: String,
}

impl CommandGenerator {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }

    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(&self.command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(&self.command);
            cmd
        }
    }
}

impl ThemeGenerator for CommandGenerator {
    fn generate(&self, prompt: &str) -> Result<Theme, GenerationError> {
        log::info!("generating theme for mood {:?} via `{}`", prompt, self.command);

        let mut child = self
            .shell()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(GenerationError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(instruction(prompt).as_bytes()) {
                Ok(()) => {}
                // The command answered without reading its input; its output still counts
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    log::debug!("theme generator closed stdin early: {}", e);
                }
                Err(e) => return Err(e.into()),
            }
            // Dropping stdin closes the pipe so the command sees EOF
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(GenerationError::Status {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let text = String::from_utf8(output.stdout)?;
        Ok(theme_from_response(&text))
    }
}
