//! Timed terms: the atomic steps an ability plays back.
//!
//! A term is a small state machine:
//!
//! ```text
//! SetupComplete ──clone_for_cast──► Start ──at_time reached──► Do ──duration elapsed──► End ──► Finished
//!                                     ▲                                                          │
//!                                     └──────────────────── set_state_to_start ◄─────────────────┘
//! ```
//!
//! Prototypes live in an [`AbilityTemplate`](crate::ability::AbilityTemplate)
//! in the `SetupComplete` state and are never run. Each cast clones them into
//! live terms. Terms do not touch units directly; they push [`TermEffect`]s
//! that the owning ability and the battle resolve.

use crate::data::{EffectKind, MovementKind, TermData, TermKind};
use crate::error::{GameError, Result};
use crate::math::{progress, Fixed, Vec2Fixed};
use crate::rng::RandomStream;

/// Height units are sent to when leaving through the top of the screen.
pub const OFFSCREEN_TOP_Y: i32 = 20;

/// Lifecycle state of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermState {
    /// Parsed prototype; never run.
    SetupComplete,
    /// Waiting for the ability's elapsed time to reach `at_time`.
    Start,
    /// Applying its effect every tick until the duration elapses.
    Do,
    /// One-shot cleanup pending.
    End,
    /// Terminal.
    Finished,
}

/// Data a term reads from its owning ability for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermContext {
    /// Seconds advanced this tick.
    pub dt: Fixed,
    /// Seconds since the owning ability started.
    pub elapsed: Fixed,
    /// Caster's current position.
    pub caster_position: Vec2Fixed,
    /// Where the caster stood when the ability was cast.
    pub original_position: Vec2Fixed,
    /// Target's position when the ability was cast.
    pub cast_location: Vec2Fixed,
}

/// A floating visual bound to an ability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visual {
    /// Texture name.
    pub texture: String,
    /// Width in world units.
    pub width: Fixed,
    /// Height in world units.
    pub height: Fixed,
    /// Current sprite frame.
    pub frame: u32,
}

/// Something a term asks its owning ability to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermEffect {
    /// Bind the caster's animation and restart its timer.
    SetAnimation {
        /// Animation name.
        animation: String,
    },
    /// Put the caster at a position.
    MoveCaster {
        /// New caster position.
        position: Vec2Fixed,
    },
    /// Show or update the ability's visual.
    ShowVisual(Visual),
    /// Hide the ability's visual.
    HideVisual,
    /// Play a one-shot sound.
    PlaySound {
        /// Sound name.
        sound: String,
    },
    /// Apply the ability's percent damage or healing to its target.
    PercentDamage {
        /// Percentage of the computed amount.
        damage_percent: i32,
        /// Integer modifier on base damage.
        damage_modifier: i32,
    },
    /// Attach a secondary ability.
    ApplyEffect {
        /// Status, buff or debuff.
        kind: EffectKind,
        /// Template name of the secondary ability.
        ability: String,
    },
    /// Add to the caster's strength.
    ChangeStrength {
        /// Signed change.
        amount: i32,
    },
    /// Dispel the target's status effects and the owning ability.
    Dispel,
}

/// A live (or prototype) term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    at_time: Fixed,
    duration: Fixed,
    kind: TermKind,
    state: TermState,
    running_timer: Fixed,
    start_offset: Fixed,
    path: Option<(Vec2Fixed, Vec2Fixed)>,
}

impl Term {
    /// Build a prototype from parsed data.
    #[must_use]
    pub fn prototype(data: &TermData) -> Self {
        Self {
            at_time: data.at_time,
            duration: data.duration,
            kind: data.kind.clone(),
            state: TermState::SetupComplete,
            running_timer: Fixed::ZERO,
            start_offset: Fixed::ZERO,
            path: None,
        }
    }

    /// Clone this term into a fresh live term waiting in `Start`.
    #[must_use]
    pub fn clone_for_cast(&self) -> Self {
        let mut term = self.clone();
        term.set_state_to_start();
        term.start_offset = Fixed::ZERO;
        term
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TermState {
        self.state
    }

    /// Check whether the term reached `Finished`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == TermState::Finished
    }

    /// Term payload.
    #[must_use]
    pub const fn kind(&self) -> &TermKind {
        &self.kind
    }

    /// Seconds after the ability start at which the term begins, including
    /// any stagger offset.
    #[must_use]
    pub fn at_time(&self) -> Fixed {
        self.at_time + self.start_offset
    }

    /// Seconds the term spends in `Do`.
    #[must_use]
    pub const fn duration(&self) -> Fixed {
        self.duration
    }

    /// Seconds spent in `Do` so far.
    #[must_use]
    pub const fn running_timer(&self) -> Fixed {
        self.running_timer
    }

    /// Seconds after the ability start at which the term stops.
    #[must_use]
    pub fn end_time(&self) -> Fixed {
        self.at_time + self.duration
    }

    /// Push the term's start back by `offset` seconds.
    pub fn set_start_offset(&mut self, offset: Fixed) {
        self.start_offset = offset;
    }

    /// Rewind to `Start` so the term plays again.
    pub fn set_state_to_start(&mut self) {
        self.state = TermState::Start;
        self.running_timer = Fixed::ZERO;
        self.path = None;
    }

    /// Advance the term by one tick.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] when called on a prototype.
    pub fn run(
        &mut self,
        ctx: &TermContext,
        rng: &mut RandomStream,
        effects: &mut Vec<TermEffect>,
    ) -> Result<()> {
        match self.state {
            TermState::SetupComplete => {
                return Err(GameError::InvalidState(
                    "term prototype cannot be run; clone it for a cast".to_string(),
                ));
            }
            TermState::Start => {
                if ctx.elapsed < self.at_time() {
                    return Ok(());
                }
                self.begin(ctx);
                self.state = TermState::Do;
                self.tick(ctx, rng, effects);
            }
            TermState::Do => self.tick(ctx, rng, effects),
            TermState::End => {
                self.end(effects);
                self.state = TermState::Finished;
            }
            TermState::Finished => {}
        }
        Ok(())
    }

    /// First-frame setup when `at_time` is reached.
    fn begin(&mut self, ctx: &TermContext) {
        if let TermKind::Movement { movement, offset } = &self.kind {
            let from = ctx.caster_position;
            let to = match movement {
                MovementKind::TargetX => Vec2Fixed::new(ctx.cast_location.x, from.y),
                MovementKind::TargetY => Vec2Fixed::new(from.x, ctx.cast_location.y),
                MovementKind::EnemyPos => ctx.cast_location,
                MovementKind::OriginalPos => ctx.original_position,
                MovementKind::OffscreenTop => {
                    Vec2Fixed::new(from.x, Fixed::from_num(OFFSCREEN_TOP_Y))
                }
            };
            self.path = Some((from, to + Vec2Fixed::from(*offset)));
        }
    }

    /// Per-tick work while in `Do`.
    fn tick(&mut self, ctx: &TermContext, rng: &mut RandomStream, effects: &mut Vec<TermEffect>) {
        self.running_timer += ctx.dt;

        match &self.kind {
            TermKind::Anim { animation } => effects.push(TermEffect::SetAnimation {
                animation: animation.clone(),
            }),
            TermKind::Movement { .. } => {
                if let Some((from, to)) = self.path {
                    let t = progress(self.running_timer, self.duration);
                    effects.push(TermEffect::MoveCaster {
                        position: from.lerp(to, t),
                    });
                }
            }
            TermKind::Effect {
                texture,
                width,
                height,
                frames,
                fps,
            } => {
                let elapsed_frames = (self.running_timer * *fps).to_num::<i64>().max(0) as u64;
                let frame = (elapsed_frames % u64::from((*frames).max(1))) as u32;
                effects.push(TermEffect::ShowVisual(Visual {
                    texture: texture.clone(),
                    width: *width,
                    height: *height,
                    frame,
                }));
            }
            TermKind::Audio { sound } => effects.push(TermEffect::PlaySound {
                sound: sound.clone(),
            }),
            TermKind::Damage {
                damage_percent,
                damage_modifier,
            } => effects.push(TermEffect::PercentDamage {
                damage_percent: *damage_percent,
                damage_modifier: *damage_modifier,
            }),
            TermKind::Status { ability, chance } => {
                roll_effect(rng, EffectKind::Status, ability, *chance, effects);
            }
            TermKind::Debuff { ability, chance } => {
                roll_effect(rng, EffectKind::Debuff, ability, *chance, effects);
            }
            TermKind::Buff { ability, chance } => {
                roll_effect(rng, EffectKind::Buff, ability, *chance, effects);
            }
            TermKind::AttackChange { amount } => {
                effects.push(TermEffect::ChangeStrength { amount: *amount });
            }
            TermKind::Dispel => effects.push(TermEffect::Dispel),
        }

        if self.running_timer >= self.duration {
            self.state = TermState::End;
        }
    }

    /// One-shot cleanup.
    fn end(&mut self, effects: &mut Vec<TermEffect>) {
        if let TermKind::Effect { .. } = self.kind {
            effects.push(TermEffect::HideVisual);
        }
    }
}

/// Roll `chance` and queue an attach of `ability` on success.
fn roll_effect(
    rng: &mut RandomStream,
    kind: EffectKind,
    ability: &str,
    chance: Fixed,
    effects: &mut Vec<TermEffect>,
) {
    if rng.roll_chance(chance) {
        effects.push(TermEffect::ApplyEffect {
            kind,
            ability: ability.to_string(),
        });
    }
}
