//! Atlas: sprite completeness validation.
//!
//! A bundle is only valid if every sprite a character can show exists in one
//! of its atlas manifests:
//!
//! 1. **Requirements**: pose x gender x race combinations, plus hair sprites
//! 2. **Clothing**: sprites selected by clothes-variable assignments
//! 3. **Check**: substring search of `{prefix}{name}` in each manifest, in order
//!
//! ```text
//! characters ──► requirements ──┐
//! instructions ─► clothing ─────┼──► finalize(atlas_root) ──► AtlasReport
//! ```

pub mod requirements;
pub mod clothing;
pub mod checker;

pub use requirements::{
    build_requirements, character_requirements, CharacterRequirements, SpriteRequirement, HAIR_SPRITES, POSES,
};
pub use clothing::{ClothingOutcome, ClothingTracker};
pub use checker::{AtlasChecker, AtlasError, AtlasReport, MissingSprite};
