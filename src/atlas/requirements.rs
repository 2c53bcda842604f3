//! Required sprite sets per character.
//!
//! | Character | Primary | Fallback |
//! |---|---|---|
//! | plain | `{Pose}` | none |
//! | gendered | `{Pose}` | `{Gender}_{Pose}` per gender |
//! | protagonist with races | `{Race}_{Pose}` | `{Race}_{Gender}_{Pose}` per gender |
//!
//! Poses are `Base` plus the four emotion poses. The protagonist also needs
//! the three hair sprites when custom hair is configured. Every sprite name
//! is looked up as `{base_atlas}_{name}`.

use serde::{Deserialize, Serialize};

use crate::emotion::Emotion;
use crate::types::{CharacterMeta, RegistryConfig};

/// Pose suffixes, base pose first.
pub const POSES: [Emotion; 5] = [
    Emotion::Neutral,
    Emotion::Angry,
    Emotion::Happy,
    Emotion::Sad,
    Emotion::Surprised,
];

/// Hair sprites required when custom hair is enabled.
pub const HAIR_SPRITES: [&str; 3] = ["Hair_Front", "Hair_Back", "Hair_Shadow"];

/// A sprite that must exist, with an optional alternative name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpriteRequirement {
    /// Name checked first.
    pub primary: String,
    /// Name accepted instead.
    pub fallback: Option<String>,
}

impl SpriteRequirement {
    /// Requirement without fallback.
    pub fn single(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: None,
        }
    }

    /// Requirement with a fallback.
    pub fn pair(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: Some(fallback.into()),
        }
    }
}

/// Everything one character needs from its atlases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRequirements {
    /// Display name.
    pub name: String,
    /// Sprite name prefix (`{base_atlas}_`).
    pub prefix: String,
    /// Atlas manifest files in check order.
    pub atlas_files: Vec<String>,
    /// Missing sprites are tolerated (outfit chosen at game start).
    pub custom_outfit: bool,
    /// Required sprites, deduplicated, in build order.
    pub sprites: Vec<SpriteRequirement>,
}

impl CharacterRequirements {
    /// Add a requirement unless already present.
    pub fn require(&mut self, requirement: SpriteRequirement) {
        if !self.sprites.contains(&requirement) {
            self.sprites.push(requirement);
        }
    }
}

/// Build the requirement set for one character.
///
/// Placeholder rows (atlas `-`) need nothing and yield `None`.
pub fn character_requirements(meta: &CharacterMeta, config: &RegistryConfig) -> Option<CharacterRequirements> {
    if meta.is_placeholder() {
        return None;
    }
    let protagonist = config.is_protagonist(&meta.name);
    let mut req = CharacterRequirements {
        name: meta.name.clone(),
        prefix: format!("{}_", meta.base_atlas),
        atlas_files: meta.atlas_list().into_iter().map(str::to_string).collect(),
        custom_outfit: meta.custom_outfit,
        sprites: Vec::new(),
    };

    let genders: &[String] = if protagonist || meta.gendered { &config.genders } else { &[] };

    for pose in POSES.iter().map(Emotion::pose) {
        if protagonist && !config.races.is_empty() {
            for race in &config.races {
                let primary = format!("{}_{}", race, pose);
                if genders.is_empty() {
                    req.require(SpriteRequirement::single(primary));
                    continue;
                }
                for gender in genders {
                    req.require(SpriteRequirement::pair(primary.clone(), format!("{}_{}_{}", race, gender, pose)));
                }
            }
        } else if genders.is_empty() {
            req.require(SpriteRequirement::single(pose));
        } else {
            for gender in genders {
                req.require(SpriteRequirement::pair(pose, format!("{}_{}", gender, pose)));
            }
        }
    }

    if protagonist && config.custom_hair_count > 0 {
        for hair in HAIR_SPRITES {
            req.require(SpriteRequirement::single(hair));
        }
    }
    Some(req)
}

/// Build requirements for every given character.
pub fn build_requirements<'a>(
    characters: impl IntoIterator<Item = &'a CharacterMeta>,
    config: &RegistryConfig,
) -> Vec<CharacterRequirements> {
    characters
        .into_iter()
        .filter_map(|meta| character_requirements(meta, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RegistryConfig {
        RegistryConfig {
            protagonist: Some("Alex".into()),
            genders: vec!["Male".into(), "Female".into()],
            races: vec!["Human".into(), "Elf".into()],
            custom_hair_count: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_character() {
        let req = character_requirements(&CharacterMeta::new("Gunn", "gunn.txt", "Gunn"), &config()).unwrap();
        assert_eq!(req.prefix, "Gunn_");
        let names: Vec<&str> = req.sprites.iter().map(|s| s.primary.as_str()).collect();
        assert_eq!(names, vec!["Base", "Angry", "Happy", "Sad", "Surprised"]);
        assert!(req.sprites.iter().all(|s| s.fallback.is_none()));
    }

    #[test]
    fn test_gendered_character() {
        let mut meta = CharacterMeta::new("Mira", "mira.txt", "Mira");
        meta.gendered = true;
        let req = character_requirements(&meta, &config()).unwrap();
        assert_eq!(req.sprites.len(), 10);
        assert_eq!(req.sprites[0], SpriteRequirement::pair("Base", "Male_Base"));
        assert_eq!(req.sprites[1], SpriteRequirement::pair("Base", "Female_Base"));
    }

    #[test]
    fn test_protagonist_races_and_hair() {
        let req = character_requirements(&CharacterMeta::new("Alex", "alex.txt", "Alex"), &config()).unwrap();
        // 2 races x 2 genders x 5 poses + 3 hair
        assert_eq!(req.sprites.len(), 23);
        assert!(req.sprites.contains(&SpriteRequirement::pair("Elf_Sad", "Elf_Female_Sad")));
        assert!(req.sprites.contains(&SpriteRequirement::single("Hair_Shadow")));
    }

    #[test]
    fn test_protagonist_races_without_genders() {
        let config = RegistryConfig {
            genders: Vec::new(),
            custom_hair_count: 0,
            ..config()
        };
        let req = character_requirements(&CharacterMeta::new("Alex", "alex.txt", "Alex"), &config).unwrap();
        // 2 races x 5 poses, no gender fallbacks
        assert_eq!(req.sprites.len(), 10);
        assert_eq!(req.sprites[0], SpriteRequirement::single("Human_Base"));
        assert_eq!(req.sprites[1], SpriteRequirement::single("Elf_Base"));
        assert!(req.sprites.iter().all(|s| s.fallback.is_none()));
    }

    #[test]
    fn test_placeholder_needs_nothing() {
        assert!(character_requirements(&CharacterMeta::new("Crowd", "-", "-"), &config()).is_none());
        let all = build_requirements(
            [CharacterMeta::new("Crowd", "-", "-"), CharacterMeta::new("Gunn", "g.txt", "Gunn")].iter(),
            &config(),
        );
        assert_eq!(all.len(), 1);
    }
}
