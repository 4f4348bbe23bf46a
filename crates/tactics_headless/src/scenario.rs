//! Scenario loading.
//!
//! A scenario names the units on each side of a battle. Scenarios are RON
//! files, and two are built in so the runner works without any files.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tactics_core::battle::{BattleSetup, RosterEntry, SideSetup};
use tactics_core::data::GameData;

use crate::error::{HeadlessError, Result};

/// Player id of the side that acts first.
pub const FIRST_PLAYER_ID: i32 = 1;
/// Player id of the side that acts second.
pub const SECOND_PLAYER_ID: i32 = 2;

/// Two rosters, by unit name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Units of the side that acts first, in slot order.
    pub first: Vec<String>,
    /// Units of the side that acts second, in slot order.
    pub second: Vec<String>,
}

impl Scenario {
    /// Knight against archer.
    #[must_use]
    pub fn knight_vs_archer() -> Self {
        Self {
            name: "knight_vs_archer".to_string(),
            description: "Knight against archer".to_string(),
            first: vec!["knight".to_string()],
            second: vec!["archer".to_string()],
        }
    }

    /// Four against four with every ability in play.
    #[must_use]
    pub fn mixed_4v4() -> Self {
        let names = |list: &[&str]| list.iter().map(|s| (*s).to_string()).collect();
        Self {
            name: "mixed_4v4".to_string(),
            description: "Frontline and support on both sides".to_string(),
            first: names(&["knight", "cleric", "mage", "warlord"]),
            second: names(&["archer", "exorcist", "knight", "mage"]),
        }
    }

    /// Look up a built-in scenario.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "knight_vs_archer" => Some(Self::knight_vs_archer()),
            "mixed_4v4" => Some(Self::mixed_4v4()),
            _ => None,
        }
    }

    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&contents)?)
    }

    /// Resolve a command-line argument: an existing file path, else a
    /// built-in name.
    pub fn resolve(arg: &str) -> Result<Self> {
        let path = Path::new(arg);
        if path.is_file() {
            return Self::load(path);
        }
        Self::builtin(arg).ok_or_else(|| HeadlessError::UnknownScenario(arg.to_string()))
    }

    /// Battle setup for this scenario.
    ///
    /// Unit ids are 100+ for the first side and 200+ for the second.
    pub fn to_setup(&self, data: &GameData, match_id: i32, seed: u32) -> Result<BattleSetup> {
        Ok(BattleSetup {
            match_id,
            seed,
            first: SideSetup {
                player_id: FIRST_PLAYER_ID,
                roster: roster(data, &self.first, 100)?,
            },
            second: SideSetup {
                player_id: SECOND_PLAYER_ID,
                roster: roster(data, &self.second, 200)?,
            },
        })
    }
}

fn roster(data: &GameData, names: &[String], first_unit_id: i32) -> Result<Vec<RosterEntry>> {
    names
        .iter()
        .zip(0..)
        .map(|(name, slot_id)| {
            let job_type = data
                .job_type_of(name)
                .ok_or_else(|| HeadlessError::UnknownUnit(name.clone()))?;
            Ok(RosterEntry {
                job_type,
                unit_id: first_unit_id + slot_id,
                slot_id,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_test_utils::fixtures::shipped_data;

    #[test]
    fn test_builtin_scenarios_resolve() {
        assert_eq!(Scenario::resolve("knight_vs_archer").unwrap().first, vec!["knight"]);
        assert_eq!(Scenario::resolve("mixed_4v4").unwrap().second.len(), 4);
        assert!(matches!(
            Scenario::resolve("no_such_scenario"),
            Err(HeadlessError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duel.ron");
        std::fs::write(
            &path,
            r#"Scenario(name: "duel", first: ["mage"], second: ["cleric", "cleric"])"#,
        )
        .unwrap();

        let scenario = Scenario::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(scenario.name, "duel");
        assert!(scenario.description.is_empty());
        assert_eq!(scenario.second.len(), 2);
    }

    #[test]
    fn test_to_setup_assigns_ids() {
        let data = shipped_data();
        let setup = Scenario::mixed_4v4().to_setup(&data, 3, 77).unwrap();
        assert_eq!(setup.match_id, 3);
        assert_eq!(setup.seed, 77);
        assert_eq!(setup.first.player_id, FIRST_PLAYER_ID);
        assert_eq!(setup.second.roster[3].unit_id, 203);
        assert_eq!(setup.second.roster[3].slot_id, 3);
        assert_eq!(setup.first.roster[0].job_type, data.job_type_of("knight").unwrap());
    }

    #[test]
    fn test_unknown_unit_name() {
        let data = shipped_data();
        let mut scenario = Scenario::knight_vs_archer();
        scenario.second.push("dragon".to_string());
        assert!(matches!(
            scenario.to_setup(&data, 0, 1),
            Err(HeadlessError::UnknownUnit(name)) if name == "dragon"
        ));
    }
}
