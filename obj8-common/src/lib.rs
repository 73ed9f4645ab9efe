//! Shared types and utilities for the OBJ8 codec
//!
//! This crate provides pieces used by both directions of `obj8-convert`:
//!
//! # Modules
//!
//! - [`formats`] - OBJ8 header, render-state bits and light vocabulary
//! - [`vertex`] - Rounded vertex records and the scoped dedup table

pub mod formats;
pub mod vertex;

pub use formats::{
    Attrs, LightKind, LightMarker, HEADER_OBJ, HEADER_VERSION, IDX_CHUNK, OBJ8_EXT, light_kind,
};
pub use vertex::{Precision, Vertex, VertexTable};
