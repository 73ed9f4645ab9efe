//! obj8-convert library
//!
//! Converts between the host scene model and X-Plane OBJ8 text.
//!
//! # Modules
//!
//! - [`export`] - scene walk, primitive sorting and the OBJ8 writer
//! - [`import`] - OBJ8 parser and face reconstruction
//! - [`anim`] - animation nodes, Euler decomposition and keyframe rebuilding
//! - [`config`] - `obj8.toml` tolerances and precisions
//! - [`error`] - typed errors for both directions

pub mod anim;
pub mod config;
pub mod error;
pub mod export;
pub mod import;

pub use config::{Config, ExportConfig, ImportConfig};
pub use error::{ExportError, FormatError, ImportError};
pub use export::{export_file, export_scene, Export, ExportReport};
pub use import::{import_file, import_str, ImportReport};
