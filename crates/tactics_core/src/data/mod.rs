//! Data-driven game definitions.
//!
//! Ability and unit definitions are deserialized from RON files into the
//! plain data structs in this module, validated, and frozen into a
//! [`GameData`] value. `GameData` is loaded once at startup and shared by
//! reference with everything that needs a template; nothing reaches for a
//! global registry.

mod ability_data;
mod unit_data;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

pub use ability_data::{
    AbilityData, ActivationPeriod, DamageClass, EffectKind, MovementKind, TargetAlliance,
    TargetChoice, TermData, TermKind,
};
pub use unit_data::{UnitData, UnitStats};

use crate::ability::AbilityTemplate;
use crate::error::{GameError, Result};
use crate::math::Fixed;

/// File name of the ability definitions inside a data directory.
pub const ABILITIES_FILE: &str = "abilities.ron";

/// File name of the unit definitions inside a data directory.
pub const UNITS_FILE: &str = "units.ron";

/// Immutable store of every ability and unit template.
#[derive(Debug, Clone)]
pub struct GameData {
    abilities: BTreeMap<String, Arc<AbilityTemplate>>,
    units: Vec<Arc<UnitData>>,
}

impl GameData {
    /// Build the store from parsed definitions.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataValidation`] listing every problem found.
    pub fn from_data(abilities: Vec<AbilityData>, units: Vec<UnitData>) -> Result<Self> {
        let errors = validate(&abilities, &units);
        if !errors.is_empty() {
            return Err(GameError::DataValidation(errors));
        }

        let abilities = abilities
            .iter()
            .map(|data| (data.name.clone(), Arc::new(AbilityTemplate::from_data(data))))
            .collect();
        let units = units.into_iter().map(Arc::new).collect();

        Ok(Self { abilities, units })
    }

    /// Parse both definition files from RON source text.
    ///
    /// # Errors
    ///
    /// Returns an error if either source fails to parse or validate.
    pub fn from_ron_str(abilities_src: &str, units_src: &str) -> Result<Self> {
        let abilities = parse_ron(ABILITIES_FILE, abilities_src)?;
        let units = parse_ron(UNITS_FILE, units_src)?;
        Self::from_data(abilities, units)
    }

    /// Load `abilities.ron` and `units.ron` from a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a file is missing, malformed or inconsistent.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let abilities = read_ron(&dir.join(ABILITIES_FILE))?;
        let units = read_ron(&dir.join(UNITS_FILE))?;
        let data = Self::from_data(abilities, units)?;
        tracing::info!(
            abilities = data.abilities.len(),
            units = data.units.len(),
            dir = %dir.display(),
            "Loaded game data"
        );
        Ok(data)
    }

    /// Look up an ability template by name.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownAbility`] if no ability has that name.
    pub fn ability(&self, name: &str) -> Result<&Arc<AbilityTemplate>> {
        self.abilities
            .get(name)
            .ok_or_else(|| GameError::UnknownAbility(name.to_string()))
    }

    /// Look up a unit template by wire job type.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownUnitType`] for an out-of-range job type.
    pub fn unit_type(&self, job_type: i32) -> Result<&Arc<UnitData>> {
        usize::try_from(job_type)
            .ok()
            .and_then(|index| self.units.get(index))
            .ok_or(GameError::UnknownUnitType(job_type))
    }

    /// Wire job type of a unit template name.
    #[must_use]
    pub fn job_type_of(&self, name: &str) -> Option<i32> {
        self.units
            .iter()
            .position(|unit| unit.name == name)
            .map(|index| index as i32)
    }

    /// Number of unit templates.
    #[must_use]
    pub fn unit_type_count(&self) -> usize {
        self.units.len()
    }

    /// All ability templates, ordered by name.
    pub fn abilities(&self) -> impl Iterator<Item = &Arc<AbilityTemplate>> {
        self.abilities.values()
    }

    /// All unit templates in job type order.
    pub fn unit_types(&self) -> impl Iterator<Item = &Arc<UnitData>> {
        self.units.iter()
    }
}

fn parse_ron<T: serde::de::DeserializeOwned>(path: &str, src: &str) -> Result<T> {
    ron::from_str(src).map_err(|e| GameError::DataParseError {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn read_ron<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let src = std::fs::read_to_string(path).map_err(|e| GameError::DataParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_ron(&path.display().to_string(), &src)
}

/// Check ability and unit definitions for internal consistency.
///
/// Checks for:
/// - Duplicate ability or unit names
/// - Unknown abilities referenced by units or effect terms
/// - Buffs whose own target choice cannot receive them
/// - Damage terms without a target alliance
/// - Friendly physical damage terms (physical healing is unsupported)
/// - Negative term timings or out-of-range chances
///
/// Returns a list of validation errors.
#[must_use]
pub fn validate(abilities: &[AbilityData], units: &[UnitData]) -> Vec<String> {
    let mut errors = Vec::new();

    let mut names = HashSet::new();
    for ability in abilities {
        if !names.insert(ability.name.as_str()) {
            errors.push(format!("Duplicate ability '{}'", ability.name));
        }
    }
    let find = |name: &str| abilities.iter().find(|a| a.name == name);

    for ability in abilities {
        if ability.has_damage_terms() {
            match ability.target_alliance {
                None => errors.push(format!(
                    "Ability '{}' deals damage but declares no target alliance",
                    ability.name
                )),
                Some(TargetAlliance::Friendly) if ability.damage_class == DamageClass::Physical => {
                    errors.push(format!(
                        "Ability '{}' heals with the Physical damage class",
                        ability.name
                    ));
                }
                Some(_) => {}
            }
        }

        for term in &ability.sequence {
            if term.at_time < Fixed::ZERO || term.duration < Fixed::ZERO {
                errors.push(format!(
                    "Ability '{}' has a term with negative timing",
                    ability.name
                ));
            }

            let Some((kind, effect_name)) = term.kind.applied_effect() else {
                continue;
            };
            let Some(effect) = find(effect_name) else {
                errors.push(format!(
                    "Ability '{}' applies unknown {:?} '{}'",
                    ability.name, kind, effect_name
                ));
                continue;
            };
            if kind == EffectKind::Buff
                && !matches!(
                    effect.target_choice,
                    TargetChoice::SelfTarget | TargetChoice::Random
                )
            {
                errors.push(format!(
                    "Buff '{}' must target SelfTarget or Random, found {:?}",
                    effect.name, effect.target_choice
                ));
            }
        }

        for term in &ability.sequence {
            if let TermKind::Status { chance, .. }
            | TermKind::Buff { chance, .. }
            | TermKind::Debuff { chance, .. } = &term.kind
            {
                if *chance < Fixed::ZERO || *chance > Fixed::ONE {
                    errors.push(format!(
                        "Ability '{}' has a chance outside 0.0..=1.0",
                        ability.name
                    ));
                }
            }
        }
    }

    let mut unit_names = HashSet::new();
    for unit in units {
        if !unit_names.insert(unit.name.as_str()) {
            errors.push(format!("Duplicate unit '{}'", unit.name));
        }
        if find(&unit.main_ability).is_none() {
            errors.push(format!(
                "Unit '{}' uses unknown main ability '{}'",
                unit.name, unit.main_ability
            ));
        }
        if unit.stats.health <= 0 {
            errors.push(format!("Unit '{}' has no health", unit.name));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABILITIES: &str = r#"#![enable(implicit_some)]
[
    AbilityData(
        name: "slash",
        damage_class: Physical,
        target_choice: Random,
        target_alliance: Enemy,
        base_damage: 1,
        sequence: [
            TermData(duration: 0.2, kind: Damage(damage_modifier: 1)),
            TermData(kind: Status(ability: "bleed", chance: 0.5)),
        ],
    ),
    AbilityData(
        name: "bleed",
        damage_class: Physical,
        target_choice: Random,
        target_alliance: Enemy,
        base_damage: 1,
    ),
]"#;

    const UNITS: &str = r#"[
    UnitData(name: "knight", main_ability: "slash", stats: UnitStats(health: 30, strength: 10)),
]"#;

    #[test]
    fn test_load_from_ron() {
        let data = GameData::from_ron_str(ABILITIES, UNITS).unwrap();
        assert!(data.ability("slash").is_ok());
        assert!(data.ability("bleed").unwrap().prototypes().is_empty());
        assert_eq!(data.job_type_of("knight"), Some(0));
        assert_eq!(data.unit_type(0).unwrap().name, "knight");
        assert!(matches!(
            data.unit_type(1),
            Err(GameError::UnknownUnitType(1))
        ));
        assert!(matches!(
            data.ability("nope"),
            Err(GameError::UnknownAbility(_))
        ));
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = GameData::from_ron_str("[", UNITS).unwrap_err();
        match err {
            GameError::DataParseError { path, .. } => assert_eq!(path, ABILITIES_FILE),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_unknown_references() {
        let abilities: Vec<AbilityData> = ron::from_str(ABILITIES).unwrap();
        let mut units: Vec<UnitData> = ron::from_str(UNITS).unwrap();
        units[0].main_ability = "missing".to_string();

        let errors = validate(&abilities[..1], &units);
        assert_eq!(errors.len(), 2, "Errors: {errors:?}");
        assert!(errors.iter().any(|e| e.contains("unknown Status 'bleed'")));
        assert!(errors.iter().any(|e| e.contains("unknown main ability")));
    }

    #[test]
    fn test_validate_alliance_rules() {
        let mut abilities: Vec<AbilityData> = ron::from_str(ABILITIES).unwrap();
        let units: Vec<UnitData> = ron::from_str(UNITS).unwrap();

        abilities[0].target_alliance = None;
        let errors = validate(&abilities, &units);
        assert!(errors[0].contains("no target alliance"));

        abilities[0].target_alliance = Some(TargetAlliance::Friendly);
        let errors = validate(&abilities, &units);
        assert!(errors[0].contains("heals with the Physical"));
    }

    #[test]
    fn test_validate_buff_target_choice() {
        let mut abilities: Vec<AbilityData> = ron::from_str(ABILITIES).unwrap();
        let units: Vec<UnitData> = ron::from_str(UNITS).unwrap();
        abilities[0].sequence[1].kind = TermKind::Buff {
            ability: "bleed".to_string(),
            chance: Fixed::ONE,
        };
        abilities[1].target_choice = TargetChoice::MostDamageTaken;

        let errors = validate(&abilities, &units);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("must target SelfTarget or Random"));
    }

    #[test]
    fn test_validate_duplicates() {
        let mut abilities: Vec<AbilityData> = ron::from_str(ABILITIES).unwrap();
        abilities.push(abilities[1].clone());
        let mut units: Vec<UnitData> = ron::from_str(UNITS).unwrap();
        units.push(units[0].clone());

        let errors = validate(&abilities, &units);
        assert!(errors.iter().any(|e| e.contains("Duplicate ability 'bleed'")));
        assert!(errors.iter().any(|e| e.contains("Duplicate unit 'knight'")));
    }

    #[test]
    fn test_shipped_data_is_valid() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/data");
        let data = GameData::load_from_dir(&dir).unwrap();
        assert!(data.unit_type_count() > 0);
        for unit in data.unit_types() {
            assert!(data.ability(&unit.main_ability).is_ok());
        }
    }
}
