//! Ability timeline inspection.

use std::fmt::Write as _;

use tactics_core::ability::AbilityTemplate;
use tactics_core::data::{GameData, TermKind};
use tactics_core::error::Result;
use tactics_core::math::Fixed;

/// One term of an ability, placed on its timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    /// Seconds after the ability starts.
    pub start: Fixed,
    /// Seconds at which the term finishes.
    pub end: Fixed,
    /// Short description of the term.
    pub label: String,
}

/// Terms of `template` in sequence order.
#[must_use]
pub fn timeline(template: &AbilityTemplate) -> Vec<TimelineEntry> {
    template
        .prototypes()
        .iter()
        .map(|term| TimelineEntry {
            start: term.at_time(),
            end: term.end_time(),
            label: describe(term.kind()),
        })
        .collect()
}

fn describe(kind: &TermKind) -> String {
    match kind {
        TermKind::Anim { animation } => format!("anim {animation}"),
        TermKind::Movement { movement, .. } => format!("move {movement:?}"),
        TermKind::Effect { texture, .. } => format!("effect {texture}"),
        TermKind::Audio { sound } => format!("audio {sound}"),
        TermKind::Damage {
            damage_percent,
            damage_modifier,
        } => format!("damage {damage_percent}% x{damage_modifier}"),
        TermKind::Debuff { ability, chance } => format!("debuff {ability} ({chance})"),
        TermKind::Buff { ability, chance } => format!("buff {ability} ({chance})"),
        TermKind::Status { ability, chance } => format!("status {ability} ({chance})"),
        TermKind::AttackChange { amount } => format!("attack {amount:+}"),
        TermKind::Dispel => "dispel".to_string(),
    }
}

/// Render an ability's settings and timeline as text.
///
/// # Errors
///
/// Returns [`tactics_core::error::GameError::UnknownAbility`] for an unknown
/// name.
pub fn render_ability(data: &GameData, name: &str) -> Result<String> {
    let template = data.ability(name)?;
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{}", template.name());
    let _ = writeln!(
        out,
        "  {:?} / {:?} / {:?} / {:?}, base damage {}, activations {}",
        template.damage_class(),
        template.target_choice(),
        template.target_alliance(),
        template.activation_period(),
        template.base_damage(),
        template.activations()
    );
    let _ = writeln!(out, "  lifetime {}s", template.lifetime());

    for entry in timeline(template) {
        let _ = writeln!(out, "  {:>6} - {:<6} {}", entry.start, entry.end, entry.label);
    }
    Ok(out)
}
