use shared::{PlayerId, PlayerView, MONSTER_TARGET};

/// Position and health shared by players and the monster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entity {
    pub x: f32,
    pub y: f32,
    pub hp: u32,
}

/// Addresses one entity in the world.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Player(PlayerId),
    Monster,
}

impl EntityRef {
    pub fn parse(target: &str) -> Self {
        if target == MONSTER_TARGET {
            EntityRef::Monster
        } else {
            EntityRef::Player(PlayerId::from(target))
        }
    }
}

impl Entity {
    pub fn new(x: f32, y: f32, hp: u32) -> Self {
        Entity { x, y, hp }
    }

    // Subtract damage with health clamped to [0, max_hp].
    // Returns true only on the hit that brings health to zero.
    pub fn apply_damage(&mut self, damage: u32, max_hp: u32) -> bool {
        let before = self.hp;
        self.hp = before.saturating_sub(damage).min(max_hp);
        before > 0 && self.hp == 0
    }

    pub fn is_depleted(&self) -> bool {
        self.hp == 0
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    // Keep the entity inside [0, width] x [0, height]
    pub fn clamp_to(&mut self, width: f32, height: f32) {
        self.x = self.x.clamp(0.0, width);
        self.y = self.y.clamp(0.0, height);
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            x: self.x,
            y: self.y,
            hp: self.hp,
        }
    }
}
