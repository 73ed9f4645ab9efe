//! Light commands
//!
//! Lights travel through the scene as text markers whose first word is the
//! light command, e.g. `LIGHT_NAMED airplane_beacon` or
//! `LIGHT_CUSTOM 1 1 1 0.5 0.4 0 0 1 1 sim/lights/nav`. The position is not
//! part of the text; it comes from where the marker sits in the scene.

/// Light types that take a name before the position
pub const LIGHT_NAMED: &[&str] = &["LIGHT_NAMED", "LIGHT_PARAM"];

/// Light types whose position comes right after the command
pub const LIGHT_CUSTOM: &[&str] = &[
    "LIGHT_CUSTOM",
    "LIGHT_SPILL_CUSTOM",
    "smoke_black",
    "smoke_white",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    /// `<type> <name> x y z [args]`
    Named,
    /// `<type> x y z [args]`
    Custom,
}

pub fn light_kind(command: &str) -> Option<LightKind> {
    if LIGHT_NAMED.contains(&command) {
        Some(LightKind::Named)
    } else if LIGHT_CUSTOM.contains(&command) {
        Some(LightKind::Custom)
    } else {
        None
    }
}

/// A parsed light marker
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightMarker {
    pub light_type: String,
    pub kind: LightKind,
    pub name: Option<String>,
    pub args: Vec<String>,
}

impl LightMarker {
    /// Parse marker text; `None` if it does not start with a light command
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let light_type = words.next()?;
        let kind = light_kind(light_type)?;
        let name = match kind {
            LightKind::Named => Some(words.next().unwrap_or_default().to_string()),
            LightKind::Custom => None,
        };
        Some(Self {
            light_type: light_type.to_string(),
            kind,
            name,
            args: words.map(str::to_string).collect(),
        })
    }

    /// Marker text as stored in the scene
    pub fn to_text(&self) -> String {
        let mut words = vec![self.light_type.as_str()];
        if let Some(name) = &self.name {
            words.push(name);
        }
        words.extend(self.args.iter().map(String::as_str));
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_light() {
        let m = LightMarker::parse("LIGHT_NAMED  airplane_beacon").expect("Failed to parse");
        assert_eq!(m.kind, LightKind::Named);
        assert_eq!(m.name.as_deref(), Some("airplane_beacon"));
        assert!(m.args.is_empty());
        assert_eq!(m.to_text(), "LIGHT_NAMED airplane_beacon");
    }

    #[test]
    fn test_custom_light_keeps_args() {
        let m = LightMarker::parse("smoke_black 2.5").expect("Failed to parse");
        assert_eq!(m.kind, LightKind::Custom);
        assert_eq!(m.name, None);
        assert_eq!(m.args, vec!["2.5"]);
    }

    #[test]
    fn test_plain_text_is_not_a_light() {
        assert_eq!(LightMarker::parse("Hello world"), None);
        assert_eq!(LightMarker::parse(""), None);
        assert_eq!(light_kind("VLIGHT"), None);
    }
}
