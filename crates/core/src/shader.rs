//! Shader error types and info-log formatting.
//!
//! Compilation and linking themselves live on
//! [`RenderingContext`](crate::RenderingContext) so that the shader and
//! program handles they produce are registered for teardown; this module
//! holds the pure string-processing side.

use thiserror::Error;

/// Errors produced while compiling or linking a shader program.
#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    /// A shader stage failed to compile.
    #[error("shader compile error ({stage}):\n{log}")]
    CompileError {
        /// The stage that failed ("vertex", "fragment").
        stage: String,
        /// Driver info log, with numbered source prepended.
        log: String,
    },
    /// The program failed to link.
    #[error("shader link error:\n{0}")]
    LinkError(String),
}

/// Human-readable stage name for a GL shader type constant.
pub fn stage_name(shader_type: u32) -> &'static str {
    match shader_type {
        glow::VERTEX_SHADER => "vertex",
        glow::FRAGMENT_SHADER => "fragment",
        _ => "unknown",
    }
}

/// Combines GLSL source and a driver info log into a debuggable message.
///
/// Each source line is prefixed with its right-aligned line number so
/// the driver's `ERROR: 0:<line>` references can be followed directly;
/// the log is appended after a blank line. Either part may be empty.
pub fn format_shader_error(source: &str, log: &str) -> String {
    let line_count = source.lines().count();
    let width = line_count.max(1).to_string().len();

    let mut out = String::new();
    for (i, line) in source.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{:>width$}: {line}", i + 1));
    }

    match (out.is_empty(), log.is_empty()) {
        (_, true) => out,
        (true, false) => log.to_string(),
        (false, false) => {
            out.push_str("\n\n");
            out.push_str(log);
            out
        }
    }
}
