/*!
    Named encoder presets.

    A preset maps `(encoder, category, name)` to an ordered list of option
    strings. Categories are applied speed first, then tuning, then profile,
    so later categories can override earlier ones.
*/

use serde::{Deserialize, Serialize};

/**
    Preset category, in application order.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PresetCategory {
    Speed,
    Tune,
    Profile,
}

impl PresetCategory {
    pub const ORDER: [PresetCategory; 3] = [Self::Speed, Self::Tune, Self::Profile];
}

/**
    Preset names selected for one encoder.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetSelection {
    pub speed: Option<String>,
    pub tune: Option<String>,
    pub profile: Option<String>,
}

impl PresetSelection {
    pub fn get(&self, category: PresetCategory) -> Option<&str> {
        match category {
            PresetCategory::Speed => self.speed.as_deref(),
            PresetCategory::Tune => self.tune.as_deref(),
            PresetCategory::Profile => self.profile.as_deref(),
        }
    }
}

struct Preset {
    encoder: &'static str,
    category: PresetCategory,
    name: &'static str,
    options: &'static [&'static str],
}

const fn preset(
    encoder: &'static str,
    category: PresetCategory,
    name: &'static str,
    options: &'static [&'static str],
) -> Preset {
    Preset {
        encoder,
        category,
        name,
        options,
    }
}

use PresetCategory::{Profile, Speed, Tune};

static PRESETS: &[Preset] = &[
    preset("libx264", Speed, "ultrafast", &["preset=ultrafast"]),
    preset("libx264", Speed, "superfast", &["preset=superfast"]),
    preset("libx264", Speed, "veryfast", &["preset=veryfast"]),
    preset("libx264", Speed, "faster", &["preset=faster"]),
    preset("libx264", Speed, "fast", &["preset=fast"]),
    preset("libx264", Speed, "medium", &["preset=medium"]),
    preset("libx264", Speed, "slow", &["preset=slow"]),
    preset("libx264", Speed, "slower", &["preset=slower"]),
    preset("libx264", Speed, "veryslow", &["preset=veryslow"]),
    preset("libx264", Tune, "film", &["tune=film"]),
    preset("libx264", Tune, "animation", &["tune=animation"]),
    preset("libx264", Tune, "grain", &["tune=grain"]),
    preset("libx264", Tune, "stillimage", &["tune=stillimage"]),
    preset("libx264", Tune, "fastdecode", &["tune=fastdecode"]),
    preset("libx264", Tune, "zerolatency", &["tune=zerolatency", "bf=0"]),
    preset("libx264", Profile, "baseline", &["profile=baseline", "bf=0"]),
    preset("libx264", Profile, "main", &["profile=main"]),
    preset("libx264", Profile, "high", &["profile=high"]),
    preset("mpeg4", Speed, "fast", &["mbd=0"]),
    preset("mpeg4", Speed, "medium", &["mbd=1"]),
    preset("mpeg4", Speed, "slow", &["mbd=2", "trellis=1"]),
    preset("mpeg2video", Speed, "fast", &["mbd=0"]),
    preset("mpeg2video", Speed, "slow", &["mbd=2"]),
    preset("aac", Profile, "lc", &["profile=aac_low"]),
];

/**
    Speed preset applied when none is selected.
*/
pub fn default_speed(encoder: &str) -> Option<&'static str> {
    match encoder {
        "libx264" => Some("medium"),
        _ => None,
    }
}

/**
    Option strings for one preset, or `None` if the encoder has no such preset.
*/
pub fn lookup(encoder: &str, category: PresetCategory, name: &str) -> Option<&'static [&'static str]> {
    PRESETS
        .iter()
        .find(|p| p.encoder == encoder && p.category == category && p.name == name)
        .map(|p| p.options)
}

/**
    Resolve a selection into option strings in application order.

    Unknown preset names are returned in the second list so the caller can
    warn about them.
*/
pub fn resolve(encoder: &str, selection: &PresetSelection) -> (Vec<&'static str>, Vec<String>) {
    let mut options = Vec::new();
    let mut unknown = Vec::new();

    for category in PresetCategory::ORDER {
        let name = match (category, selection.get(category)) {
            (_, Some(name)) => name,
            (PresetCategory::Speed, None) => match default_speed(encoder) {
                Some(name) => name,
                None => continue,
            },
            (_, None) => continue,
        };
        match lookup(encoder, category, name) {
            Some(found) => options.extend_from_slice(found),
            None => unknown.push(name.to_string()),
        }
    }

    (options, unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x264_defaults_to_medium() {
        let (options, unknown) = resolve("libx264", &PresetSelection::default());
        assert_eq!(options, vec!["preset=medium"]);
        assert!(unknown.is_empty());
    }

    #[test]
    fn categories_apply_in_order() {
        let selection = PresetSelection {
            speed: Some("slow".into()),
            tune: Some("zerolatency".into()),
            profile: Some("high".into()),
        };
        let (options, _) = resolve("libx264", &selection);
        assert_eq!(options, vec!["preset=slow", "tune=zerolatency", "bf=0", "profile=high"]);
    }

    #[test]
    fn unknown_names_reported() {
        let selection = PresetSelection {
            speed: Some("warp".into()),
            ..Default::default()
        };
        let (options, unknown) = resolve("mpeg4", &selection);
        assert!(options.is_empty());
        assert_eq!(unknown, vec!["warp".to_string()]);
    }

    #[test]
    fn no_default_for_other_encoders() {
        let (options, unknown) = resolve("mpeg4", &PresetSelection::default());
        assert!(options.is_empty() && unknown.is_empty());
    }
}
