//! Damage application for players and the monster.
//!
//! Both kinds of target go through `Entity::apply_damage`; only the
//! consequences of reaching zero health differ. A dead player is removed from
//! the world, while the monster enters its depleted state and waits for the
//! respawn timer.

use crate::effects::Effect;
use crate::entity::EntityRef;
use crate::game::{GameState, Outcome};
use log::{debug, info};
use shared::{EffectView, PlayerId, ServerPacket};

/// Result of an attack that landed.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Monster {
        hp: u32,
        effect: EffectView,
        /// Set when this hit depleted the monster
        respawn_epoch: Option<u64>,
    },
    Player {
        id: PlayerId,
        hp: u32,
        effect: EffectView,
        killed: bool,
    },
}

/// Applies one attack from `attacker` against `target`.
///
/// Returns `None` when nothing happened: the attacker is not in the world, the
/// target is unknown, or the monster is already depleted.
pub fn resolve_attack(
    state: &mut GameState,
    attacker: &PlayerId,
    target: &EntityRef,
    at: Option<(f32, f32)>,
    now: u64,
) -> Option<Resolution> {
    let origin = match (at, state.world.player(attacker)) {
        (_, None) => {
            debug!("Ignoring attack from absent player {}", attacker);
            return None;
        }
        (Some(position), Some(_)) => position,
        (None, Some(player)) => player.position(),
    };

    let damage = state.config.attack_damage;
    let max_hp = state.world.max_hp();
    let (hp, reached_zero) = match state.world.entity_mut(target) {
        Some(entity) => {
            let reached_zero = entity.apply_damage(damage, max_hp);
            (entity.hp, reached_zero)
        }
        None => {
            debug!("Ignoring attack from {} on {:?}", attacker, target);
            return None;
        }
    };

    let effect = Effect::attack(origin.0, origin.1, now);
    let view = effect.view();
    state.effects.record(effect, now);

    let resolution = match target {
        EntityRef::Monster => {
            let respawn_epoch = reached_zero.then(|| state.world.mark_monster_depleted());
            if respawn_epoch.is_some() {
                info!("Player {} defeated the monster", attacker);
            }
            Resolution::Monster {
                hp,
                effect: view,
                respawn_epoch,
            }
        }
        EntityRef::Player(id) => {
            if reached_zero {
                state.world.remove_player(id);
                info!("Player {} was killed by {}", id, attacker);
            }
            Resolution::Player {
                id: id.clone(),
                hp,
                effect: view,
                killed: reached_zero,
            }
        }
    };

    Some(resolution)
}

impl Resolution {
    /// Turns a landed attack into the notices every client should receive.
    pub fn into_outcome(self, state: &GameState) -> Outcome {
        match self {
            Resolution::Monster {
                hp,
                effect,
                respawn_epoch,
            } => {
                let mut broadcasts = vec![
                    ServerPacket::UpdateMonsterHp { hp },
                    ServerPacket::Effect { effect },
                ];
                if respawn_epoch.is_some() {
                    broadcasts.push(ServerPacket::MonsterDead {});
                }
                Outcome {
                    broadcasts,
                    respawn: respawn_epoch,
                }
            }
            Resolution::Player {
                id,
                hp,
                effect,
                killed,
            } => {
                let mut broadcasts = vec![
                    ServerPacket::UpdatePlayerHp { id: id.clone(), hp },
                    ServerPacket::Effect { effect },
                ];
                if killed {
                    broadcasts.push(ServerPacket::PlayerDead { id });
                    broadcasts.push(state.snapshot());
                }
                Outcome {
                    broadcasts,
                    respawn: None,
                }
            }
        }
    }
}
