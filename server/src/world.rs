//! Authoritative record of every player and the monster.

use crate::config::GameConfig;
use crate::entity::{Entity, EntityRef};
use log::{debug, info};
use rand::Rng;
use shared::{PlayerId, PlayerView};
use std::collections::{BTreeMap, HashMap};

const SPAWN_MARGIN: f32 = 100.0;
const SPAWN_CLEARANCE: f32 = 100.0;
const SPAWN_ATTEMPTS: usize = 16;

/// The roaming monster. Depleted while its health is zero.
#[derive(Debug, Clone)]
pub struct Monster {
    pub body: Entity,
    /// Number of times the monster has been depleted
    epoch: u64,
}

impl Monster {
    pub fn is_depleted(&self) -> bool {
        self.body.is_depleted()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[derive(Debug, Clone)]
pub struct World {
    players: HashMap<PlayerId, Entity>,
    monster: Monster,
    width: f32,
    height: f32,
    spawn: (f32, f32),
    max_hp: u32,
}

impl World {
    pub fn new<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Self {
        let mut world = World {
            players: HashMap::new(),
            monster: Monster {
                body: Entity::new(0.0, 0.0, config.max_hp),
                epoch: 0,
            },
            width: config.world_width,
            height: config.world_height,
            spawn: config.spawn,
            max_hp: config.max_hp,
        };

        let (x, y) = world.random_monster_position(rng);
        world.monster.body.x = x;
        world.monster.body.y = y;
        world
    }

    /// Inserts a player at the spawn point with full health.
    pub fn add_player(&mut self, id: PlayerId) -> Entity {
        let player = Entity::new(self.spawn.0, self.spawn.1, self.max_hp);
        info!("Added player {} at ({}, {})", id, player.x, player.y);
        self.players.insert(id, player);
        player
    }

    pub fn remove_player(&mut self, id: &PlayerId) -> bool {
        let removed = self.players.remove(id).is_some();
        if removed {
            info!("Removed player {}", id);
        }
        removed
    }

    /// Overwrites a player's position. Unknown identities are a no-op.
    pub fn move_player(&mut self, id: &PlayerId, x: f32, y: f32) -> bool {
        match self.players.get_mut(id) {
            Some(player) => {
                player.x = x;
                player.y = y;
                true
            }
            None => false,
        }
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Entity> {
        self.players.get(id)
    }

    pub fn contains_player(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn snapshot(&self) -> BTreeMap<PlayerId, PlayerView> {
        self.players
            .iter()
            .map(|(id, player)| (id.clone(), player.view()))
            .collect()
    }

    pub fn monster(&self) -> &Monster {
        &self.monster
    }

    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    /// Looks up a damageable entity. A depleted monster is not damageable.
    pub fn entity_mut(&mut self, target: &EntityRef) -> Option<&mut Entity> {
        match target {
            EntityRef::Player(id) => self.players.get_mut(id),
            EntityRef::Monster if self.monster.is_depleted() => None,
            EntityRef::Monster => Some(&mut self.monster.body),
        }
    }

    /// Records that the monster just reached zero health and returns the
    /// epoch a respawn must present to take effect.
    pub fn mark_monster_depleted(&mut self) -> u64 {
        self.monster.epoch += 1;
        info!("Monster depleted (epoch {})", self.monster.epoch);
        self.monster.epoch
    }

    /// Nudges the monster by a random offset, clamped to the world bounds.
    /// A depleted monster stays put.
    pub fn drift_monster<R: Rng + ?Sized>(&mut self, rng: &mut R, max_offset: f32) -> bool {
        if self.monster.is_depleted() {
            return false;
        }

        let dx = rng.gen_range(-max_offset..=max_offset);
        let dy = rng.gen_range(-max_offset..=max_offset);
        let body = &mut self.monster.body;
        body.x += dx;
        body.y += dy;
        body.clamp_to(self.width, self.height);

        debug!("Monster drifted to ({:.1}, {:.1})", body.x, body.y);
        true
    }

    /// Restores the monster to full health at a new random position, but only
    /// if it is still depleted from the given epoch.
    pub fn respawn_monster<R: Rng + ?Sized>(&mut self, rng: &mut R, epoch: u64) -> bool {
        if !self.monster.is_depleted() || self.monster.epoch != epoch {
            debug!(
                "Ignoring stale respawn for epoch {} (current {})",
                epoch, self.monster.epoch
            );
            return false;
        }

        let (x, y) = self.random_monster_position(rng);
        self.monster.body = Entity::new(x, y, self.max_hp);
        info!("Monster respawned at ({:.1}, {:.1})", x, y);
        true
    }

    fn random_monster_position<R: Rng + ?Sized>(&self, rng: &mut R) -> (f32, f32) {
        let margin_x = SPAWN_MARGIN.min(self.width / 2.0);
        let margin_y = SPAWN_MARGIN.min(self.height / 2.0);
        let (spawn_x, spawn_y) = self.spawn;

        let mut candidate = (self.width / 2.0, self.height / 2.0);
        for _ in 0..SPAWN_ATTEMPTS {
            candidate = (
                rng.gen_range(margin_x..=self.width - margin_x),
                rng.gen_range(margin_y..=self.height - margin_y),
            );

            let crowds_spawn = (candidate.0 - spawn_x).abs() < SPAWN_CLEARANCE
                && (candidate.1 - spawn_y).abs() < SPAWN_CLEARANCE;
            if !crowds_spawn {
                break;
            }
        }
        candidate
    }
}
