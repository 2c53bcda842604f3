//! Clothing usage tracking.
//!
//! A character's outfit is an integer scripting variable indexing the
//! registry's clothes-name table. Instruction nodes change it with
//! `Ns.Var = n`, `+= n`, `-= n` or `/= n`; every value it takes makes the
//! matching clothing sprite required for that character.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::FlowGraph;
use crate::registry::Registry;
use crate::script::{assignment_target, parse_assignment, statements};

/// Result of interpreting one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClothingOutcome {
    /// A clothes variable changed; `sprite` is now required.
    Applied {
        /// Character wearing it.
        character: String,
        /// Clothing sprite name.
        sprite: String,
    },
    /// Not a clothes-variable assignment.
    Ignored,
    /// Malformed clothes assignment, skipped.
    BadParse {
        /// Offending statement.
        statement: String,
        /// What is wrong.
        reason: String,
    },
}

/// Tracks clothes-variable values and the sprites they select.
#[derive(Debug, Clone, Default)]
pub struct ClothingTracker {
    names: Vec<String>,
    owners: BTreeMap<String, String>,
    values: BTreeMap<String, i64>,
    used: BTreeMap<String, BTreeSet<String>>,
}

impl ClothingTracker {
    /// Tracker seeded from registry variables and their declared defaults.
    pub fn new(registry: &Registry, graph: &FlowGraph) -> Self {
        let mut tracker = Self {
            names: registry.config.clothes_names.clone(),
            ..Default::default()
        };
        for meta in &registry.characters {
            let variable = match &meta.clothes_variable {
                Some(v) => v.rsplit('.').next().unwrap_or(v).to_string(),
                None => continue,
            };
            tracker.owners.insert(variable.clone(), meta.name.clone());

            let initial = graph
                .namespaces()
                .iter()
                .flat_map(|ns| ns.variables.iter())
                .find(|v| v.name == variable)
                .and_then(|v| v.initial_int());
            if let Some(value) = initial {
                tracker.values.insert(variable.clone(), value);
                if let Some(sprite) = tracker.sprite(value) {
                    let sprite = sprite.to_string();
                    tracker.used.entry(meta.name.clone()).or_default().insert(sprite);
                }
            }
        }
        tracker
    }

    fn sprite(&self, value: i64) -> Option<&str> {
        usize::try_from(value)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    /// Interpret every statement of a scripting expression.
    pub fn record_clothing_usage(&mut self, raw_script: &str) -> Vec<ClothingOutcome> {
        statements(raw_script).map(|s| self.record_statement(s)).collect()
    }

    fn record_statement(&mut self, statement: &str) -> ClothingOutcome {
        let bad = |reason: &str| ClothingOutcome::BadParse {
            statement: statement.to_string(),
            reason: reason.to_string(),
        };

        let assignment = match parse_assignment(statement) {
            Some(a) if self.owners.contains_key(&a.variable) => a,
            Some(_) => return ClothingOutcome::Ignored,
            None => {
                return match assignment_target(statement) {
                    Some((_, variable)) if self.owners.contains_key(variable) => {
                        bad("unsupported operator or missing value")
                    }
                    _ => ClothingOutcome::Ignored,
                };
            }
        };
        let literal = match assignment.literal() {
            Some(v) => v,
            None => return bad("value is not an integer or boolean literal"),
        };
        let current = self.values.get(&assignment.variable).copied().unwrap_or(0);
        let value = match assignment.op.apply(current, literal) {
            Some(v) => v,
            None => return bad("division by zero or overflow"),
        };
        let sprite = match self.sprite(value) {
            Some(s) => s.to_string(),
            None => return bad(&format!("clothing index {} has no name", value)),
        };

        self.values.insert(assignment.variable.clone(), value);
        let character = self.owners[&assignment.variable].clone();
        self.used.entry(character.clone()).or_default().insert(sprite.clone());
        ClothingOutcome::Applied { character, sprite }
    }

    /// Clothing sprites used by `character`, sorted.
    pub fn used(&self, character: &str) -> Vec<&str> {
        self.used
            .get(character)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Current value of a clothes variable.
    pub fn value(&self, variable: &str) -> Option<i64> {
        self.values.get(variable).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Namespace, Variable, VariableType};
    use crate::types::CharacterMeta;

    fn setup() -> ClothingTracker {
        let mut gunn = CharacterMeta::new("Gunn", "gunn.txt", "Gunn");
        gunn.clothes_variable = Some("Game.GunnClothes".into());
        let mut registry = Registry {
            characters: vec![gunn],
            ..Default::default()
        };
        registry.config.clothes_names = vec!["Casual".into(), "Armor".into(), "Robe".into()];

        let mut graph = FlowGraph::new();
        graph.add_namespace(Namespace {
            name: "Game".into(),
            variables: vec![Variable {
                name: "GunnClothes".into(),
                kind: VariableType::Integer,
                value: "0".into(),
            }],
        });
        ClothingTracker::new(&registry, &graph)
    }

    #[test]
    fn test_seeded_from_default() {
        let tracker = setup();
        assert_eq!(tracker.value("GunnClothes"), Some(0));
        assert_eq!(tracker.used("Gunn"), vec!["Casual"]);
    }

    #[test]
    fn test_operators() {
        let mut tracker = setup();
        let out = tracker.record_clothing_usage("Game.GunnClothes += 2; Game.GunnClothes -= 1");
        assert_eq!(
            out,
            vec![
                ClothingOutcome::Applied { character: "Gunn".into(), sprite: "Robe".into() },
                ClothingOutcome::Applied { character: "Gunn".into(), sprite: "Armor".into() },
            ]
        );
        tracker.record_clothing_usage("Game.GunnClothes /= 1");
        assert_eq!(tracker.value("GunnClothes"), Some(1));
        assert_eq!(tracker.used("Gunn"), vec!["Armor", "Casual", "Robe"]);
    }

    #[test]
    fn test_bad_parse_skipped() {
        let mut tracker = setup();
        let out = tracker.record_clothing_usage(
            "Game.GunnClothes /= 0\nGame.GunnClothes = Game.Other\nGame.GunnClothes = 7\n\
             Game.GunnClothes =\nGame.GunnClothes *= 2\nGame.GunnClothes ++",
        );
        assert_eq!(out.len(), 6);
        assert!(out.iter().all(|o| matches!(o, ClothingOutcome::BadParse { .. })));
        assert_eq!(tracker.value("GunnClothes"), Some(0));
    }

    #[test]
    fn test_other_variables_ignored() {
        let mut tracker = setup();
        assert_eq!(tracker.record_clothing_usage("Game.Gold += 5"), vec![ClothingOutcome::Ignored]);
        assert_eq!(tracker.record_clothing_usage("Game.Gold ++"), vec![ClothingOutcome::Ignored]);
        assert_eq!(tracker.record_clothing_usage("Game.GunnClothes == 1"), vec![ClothingOutcome::Ignored]);
        assert!(tracker.used("Mira").is_empty());
    }
}
