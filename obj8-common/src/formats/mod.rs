//! OBJ8 text format vocabulary
//!
//! OBJ8 is line oriented: one command per line, whitespace separated tokens,
//! `//` or `#` start a comment. A file opens with a three line header
//! (`I` or `A`, the version, `OBJ`).

pub mod attrs;
pub mod lights;

pub use attrs::Attrs;
pub use lights::{light_kind, LightKind, LightMarker};

/// Only revision this codec reads and writes
pub const HEADER_VERSION: &str = "800";

/// Third header line
pub const HEADER_OBJ: &str = "OBJ";

/// Line-ending markers accepted on the first header line
pub const HEADER_ORIGINS: &[&str] = &["A", "I"];

/// Version line of the obsolete v6 dialect
pub const HEADER_VERSION_V6: &str = "2";

/// Indices per `IDX10` line
pub const IDX_CHUNK: usize = 10;

/// File extension
pub const OBJ8_EXT: &str = "obj";

/// Suffix marking a lit (night) texture next to the day texture
pub const LIT_SUFFIX: &str = "_LIT";

/// Alpha marker comments. They are legal comments to other readers, so they
/// must be recognized before comments are stripped.
pub const ALPHA_ON: &str = "####_alpha";
pub const ALPHA_OFF: &str = "####_no_alpha";

/// Layer group used for ground-level (poly-offset) geometry
pub const LAYER_GROUND: &str = "objects -5";
pub const LAYER_DEFAULT: &str = "objects 0";

/// Poly-offset depth used for ground-level geometry
pub const POLY_OS_GROUND: u32 = 2;
