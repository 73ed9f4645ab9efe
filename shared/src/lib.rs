//! Shared types for the OBJ8 scene codec.
//!
//! - [`scene`]: the host scene model both pipelines read and write
//! - [`attributes`]: the host's attribute storage and its typed views
//! - [`math`]: axis conversion, rounding and matrix helpers

pub mod attributes;
pub mod math;
pub mod scene;

pub use attributes::{AnimationRecord, AttrValue, Attributes, HideShow, HideShowMode, SurfaceFlags};
pub use scene::{
    Definition, DefinitionId, Edge, Entity, Face, FaceMesh, Group, Instance, Material, MaterialId,
    Scene, Text,
};
