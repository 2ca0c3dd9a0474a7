//! Structured CLI errors with meaningful exit codes.
//!
//! Exit code scheme:
//! - 0:  success
//! - 2:  clap arg parse error (automatic, before our code runs)
//! - 10: surface error (no display, config negotiation, context)
//! - 11: shader error (compile or link failure)
//! - 12: I/O error (config file read)
//! - 13: input error (bad config JSON)

use std::fmt;
use webgl_native_core::{InitError, ShaderError};

/// Errors produced by the demo, each mapped to a distinct exit code.
#[derive(Debug)]
pub enum CliError {
    /// A surface bring-up error (display, window, EGL, context).
    Surface(InitError),
    /// A shader compile or link error.
    Shader(ShaderError),
    /// An I/O error (config file read).
    Io(String),
    /// A user input error (malformed config JSON).
    Input(String),
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Surface(_) => 10,
            CliError::Shader(_) => 11,
            CliError::Io(_) => 12,
            CliError::Input(_) => 13,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Surface(e) => write!(f, "{e}"),
            CliError::Shader(e) => write!(f, "{e}"),
            CliError::Io(msg) => write!(f, "{msg}"),
            CliError::Input(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<InitError> for CliError {
    fn from(e: InitError) -> Self {
        CliError::Surface(e)
    }
}

impl From<ShaderError> for CliError {
    fn from(e: ShaderError) -> Self {
        CliError::Shader(e)
    }
}
