//! Error types for both pipelines
//!
//! Import failures are split the way callers need to react to them: a file
//! that is not OBJ8 at all, a file we cannot read the contents of, a texture
//! that cannot be found, and everything else. Geometry problems are never
//! errors; they end up as warnings in the report.

use std::path::PathBuf;
use thiserror::Error;

/// Problems with the text of an OBJ8 file
#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    /// Header does not identify an OBJ8 file
    #[error("not a valid OBJ8 file")]
    NotValid,

    /// Recognized header with a version we do not read
    #[error("unsupported OBJ version {0}")]
    UnsupportedVersion(u32),

    /// A numeric token failed to parse, or a required token is missing
    #[error("line {line}: malformed {command} ({token:?})")]
    Malformed {
        line: usize,
        command: String,
        token: String,
    },

    /// An index refers past the end of the vertex table
    #[error("line {line}: index {index} out of range ({count} vertices)")]
    IndexOutOfRange {
        line: usize,
        index: usize,
        count: usize,
    },

    /// `ANIM_end` with no open animation, or an unterminated one
    #[error("line {line}: unbalanced animation block")]
    UnbalancedAnimation { line: usize },
}

/// Import failure. The scene is left untouched whenever one of these is
/// returned.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Referenced texture is missing or unreadable
    #[error("can't read texture file {}", path.display())]
    Resource { path: PathBuf },

    /// DDS textures are not supported
    #[error("can't read DDS files; convert {} to PNG format", path.display())]
    Dds { path: PathBuf },

    #[error("I/O error reading {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Export failure. No output file is written when one of these is returned.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export")]
    Empty,

    #[error("instance refers to missing definition {0}")]
    MissingDefinition(usize),

    /// The in-memory writer rejected the output
    #[error("failed to render OBJ8 text")]
    Render(#[source] std::io::Error),

    #[error("I/O error writing {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
