//! Host attribute storage
//!
//! The host keeps per-entity data in named dictionaries of loosely typed
//! values. The codec never touches those strings directly: surface flags and
//! animation records are read and written through [`SurfaceFlags`] and
//! [`AnimationRecord`], which own the storage names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dictionary holding all codec data
pub const DICTIONARY: &str = "X-Plane";

// Stored names. HARD and poly-offset are swapped; files saved by every
// earlier release depend on it.
pub const ATTR_HARD_NAME: &str = "poly";
pub const ATTR_POLY_NAME: &str = "hard";
pub const ATTR_DECK_NAME: &str = "deck";
pub const ATTR_ALPHA_NAME: &str = "alpha";
pub const ATTR_SHINY_NAME: &str = "shiny";

pub const ANIM_DATAREF: &str = "ANIM_dataref";
pub const ANIM_INDEX: &str = "ANIM_index";
pub const ANIM_FRAME_: &str = "ANIM_frame_";
pub const ANIM_MATRIX_: &str = "ANIM_matrix_";
pub const ANIM_LOOP: &str = "ANIM_loop";
pub const ANIM_HS_: &str = "ANIM_HS_";
pub const ANIM_HS_HIDESHOW: &str = "_hideshow";
pub const ANIM_HS_DATAREF: &str = "_dataref";
pub const ANIM_HS_INDEX: &str = "_index";
pub const ANIM_HS_FROM: &str = "_from";
pub const ANIM_HS_TO: &str = "_to";

// ============================================================================
// Raw storage
// ============================================================================

/// One stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    Floats(Vec<f64>),
}

impl AttrValue {
    /// Numeric view; text is parsed, lists have none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Float(f) => Some(*f),
            AttrValue::Text(s) => s.trim().parse().ok(),
            AttrValue::Floats(_) => None,
        }
    }

    /// Text view; numbers are formatted the shortest way that round-trips
    pub fn as_text(&self) -> Option<String> {
        match self {
            AttrValue::Int(i) => Some(i.to_string()),
            AttrValue::Float(f) => Some(f.to_string()),
            AttrValue::Text(s) => Some(s.clone()),
            AttrValue::Floats(_) => None,
        }
    }
}

/// Named dictionaries of values attached to an entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, BTreeMap<String, AttrValue>>);

impl Attributes {
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|d| d.is_empty())
    }

    pub fn get(&self, dictionary: &str, key: &str) -> Option<&AttrValue> {
        self.0.get(dictionary).and_then(|d| d.get(key))
    }

    pub fn set(&mut self, dictionary: &str, key: &str, value: AttrValue) {
        self.0
            .entry(dictionary.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn remove(&mut self, dictionary: &str, key: &str) {
        if let Some(d) = self.0.get_mut(dictionary) {
            d.remove(key);
            if d.is_empty() {
                self.0.remove(dictionary);
            }
        }
    }

    /// Remove every key in `dictionary` starting with `prefix`
    pub fn remove_prefixed(&mut self, dictionary: &str, prefix: &str) {
        if let Some(d) = self.0.get_mut(dictionary) {
            d.retain(|k, _| !k.starts_with(prefix));
            if d.is_empty() {
                self.0.remove(dictionary);
            }
        }
    }

    fn flag(&self, key: &str) -> bool {
        self.get(DICTIONARY, key)
            .and_then(AttrValue::as_f64)
            .is_some_and(|v| v != 0.0)
    }

    fn set_flag(&mut self, key: &str, on: bool) {
        if on {
            self.set(DICTIONARY, key, AttrValue::Int(1));
        } else {
            self.remove(DICTIONARY, key);
        }
    }

    fn text(&self, key: &str) -> Option<String> {
        self.get(DICTIONARY, key)
            .and_then(AttrValue::as_text)
            .filter(|s| !s.is_empty())
    }
}

// ============================================================================
// Surface flags
// ============================================================================

/// Per-face render flags as the user set them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceFlags {
    pub hard: bool,
    pub deck: bool,
    /// Ground-level (poly-offset) surface
    pub poly: bool,
    pub alpha: bool,
    pub shiny: bool,
}

impl SurfaceFlags {
    pub fn read(attrs: &Attributes) -> Self {
        Self {
            hard: attrs.flag(ATTR_HARD_NAME),
            deck: attrs.flag(ATTR_DECK_NAME),
            poly: attrs.flag(ATTR_POLY_NAME),
            alpha: attrs.flag(ATTR_ALPHA_NAME),
            shiny: attrs.flag(ATTR_SHINY_NAME),
        }
    }

    pub fn write(&self, attrs: &mut Attributes) {
        attrs.set_flag(ATTR_HARD_NAME, self.hard);
        attrs.set_flag(ATTR_DECK_NAME, self.deck);
        attrs.set_flag(ATTR_POLY_NAME, self.poly);
        attrs.set_flag(ATTR_ALPHA_NAME, self.alpha);
        attrs.set_flag(ATTR_SHINY_NAME, self.shiny);
    }
}

// ============================================================================
// Animation record
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HideShowMode {
    Hide,
    Show,
}

impl HideShowMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HideShowMode::Hide => "hide",
            HideShowMode::Show => "show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hide" => Some(HideShowMode::Hide),
            "show" => Some(HideShowMode::Show),
            _ => None,
        }
    }
}

/// One hide/show rule, stored verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct HideShow {
    pub mode: HideShowMode,
    /// Dataref including any `[index]` suffix
    pub dataref: String,
    pub from: String,
    pub to: String,
}

/// Split `name[index]` into its parts
pub fn split_dataref(dataref: &str) -> (&str, Option<&str>) {
    match dataref.find('[') {
        Some(open) if dataref.ends_with(']') => {
            (&dataref[..open], Some(&dataref[open + 1..dataref.len() - 1]))
        }
        _ => (dataref, None),
    }
}

fn join_dataref(name: String, index: Option<String>) -> String {
    match index {
        Some(i) if !i.is_empty() => format!("{}[{}]", name, i),
        _ => name,
    }
}

/// Keyframed animation attached to a component instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationRecord {
    /// Dataref including any `[index]` suffix
    pub dataref: Option<String>,
    /// Dataref value at each keyframe, kept as written
    pub values: Vec<String>,
    /// Instance transform at each keyframe (column-major)
    pub matrices: Vec<[f64; 16]>,
    pub loop_value: Option<String>,
    pub hide_show: Vec<HideShow>,
}

impl AnimationRecord {
    pub fn frame_count(&self) -> usize {
        self.values.len().min(self.matrices.len())
    }

    pub fn is_empty(&self) -> bool {
        self.dataref.is_none() && self.frame_count() == 0 && self.hide_show.is_empty()
    }

    /// Read the record; `None` when the instance carries no animation data
    pub fn read(attrs: &Attributes) -> Option<Self> {
        let dataref = attrs
            .text(ANIM_DATAREF)
            .map(|name| join_dataref(name, attrs.text(ANIM_INDEX)));

        let mut values = Vec::new();
        let mut matrices = Vec::new();
        for frame in 0.. {
            let value = attrs.text(&format!("{}{}", ANIM_FRAME_, frame));
            let matrix = match attrs.get(DICTIONARY, &format!("{}{}", ANIM_MATRIX_, frame)) {
                Some(AttrValue::Floats(m)) if m.len() == 16 => {
                    let mut cols = [0.0; 16];
                    cols.copy_from_slice(m);
                    Some(cols)
                }
                _ => None,
            };
            match (value, matrix) {
                (Some(v), Some(m)) => {
                    values.push(v);
                    matrices.push(m);
                }
                _ => break,
            }
        }

        let mut hide_show = Vec::new();
        for n in 0.. {
            let prefix = format!("{}{}", ANIM_HS_, n);
            let Some(mode) = attrs.text(&format!("{}{}", prefix, ANIM_HS_HIDESHOW)) else {
                break;
            };
            let Some(name) = attrs.text(&format!("{}{}", prefix, ANIM_HS_DATAREF)) else {
                continue;
            };
            let Some(mode) = HideShowMode::parse(&mode) else {
                continue;
            };
            hide_show.push(HideShow {
                mode,
                dataref: join_dataref(name, attrs.text(&format!("{}{}", prefix, ANIM_HS_INDEX))),
                from: attrs
                    .text(&format!("{}{}", prefix, ANIM_HS_FROM))
                    .unwrap_or_else(|| "0".into()),
                to: attrs
                    .text(&format!("{}{}", prefix, ANIM_HS_TO))
                    .unwrap_or_else(|| "0".into()),
            });
        }

        let loop_value = attrs
            .text(ANIM_LOOP)
            .filter(|l| l.parse::<f64>().is_ok_and(|v| v != 0.0));

        let record = Self {
            dataref,
            values,
            matrices,
            loop_value,
            hide_show,
        };
        (!record.is_empty()).then_some(record)
    }

    /// Replace any stored animation data with this record
    pub fn write(&self, attrs: &mut Attributes) {
        attrs.remove_prefixed(DICTIONARY, "ANIM_");

        if let Some(dataref) = &self.dataref {
            let (name, index) = split_dataref(dataref);
            attrs.set(DICTIONARY, ANIM_DATAREF, AttrValue::Text(name.to_string()));
            if let Some(index) = index {
                attrs.set(DICTIONARY, ANIM_INDEX, AttrValue::Text(index.to_string()));
            }
        }
        for (frame, (value, matrix)) in self.values.iter().zip(&self.matrices).enumerate() {
            attrs.set(
                DICTIONARY,
                &format!("{}{}", ANIM_FRAME_, frame),
                AttrValue::Text(value.clone()),
            );
            attrs.set(
                DICTIONARY,
                &format!("{}{}", ANIM_MATRIX_, frame),
                AttrValue::Floats(matrix.to_vec()),
            );
        }
        if let Some(l) = &self.loop_value {
            attrs.set(DICTIONARY, ANIM_LOOP, AttrValue::Text(l.clone()));
        }
        for (n, hs) in self.hide_show.iter().enumerate() {
            let prefix = format!("{}{}", ANIM_HS_, n);
            let (name, index) = split_dataref(&hs.dataref);
            let mut put = |suffix: &str, value: &str| {
                attrs.set(
                    DICTIONARY,
                    &format!("{}{}", prefix, suffix),
                    AttrValue::Text(value.to_string()),
                )
            };
            put(ANIM_HS_HIDESHOW, hs.mode.as_str());
            put(ANIM_HS_DATAREF, name);
            if let Some(index) = index {
                put(ANIM_HS_INDEX, index);
            }
            put(ANIM_HS_FROM, &hs.from);
            put(ANIM_HS_TO, &hs.to);
        }
    }
}
