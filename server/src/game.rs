use crate::config::GameConfig;
use crate::effects::EffectLog;
use crate::world::World;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{PlayerId, ServerPacket};

/// The single owned aggregate of world state, effect log and randomness.
///
/// Only the router, the combat resolver and the tick handlers mutate it, and
/// all of them run on the server event loop.
#[derive(Debug)]
pub struct GameState {
    pub(crate) world: World,
    pub(crate) effects: EffectLog,
    pub(crate) config: GameConfig,
    pub(crate) rng: StdRng,
}

/// What a handler wants the server to do next.
#[derive(Debug, Default, PartialEq)]
pub struct Outcome {
    /// Packets to fan out to every connection, in order
    pub broadcasts: Vec<ServerPacket>,
    /// Monster depletion epoch to schedule a respawn for
    pub respawn: Option<u64>,
}

impl Outcome {
    pub fn none() -> Self {
        Outcome::default()
    }

    pub fn broadcast(packet: ServerPacket) -> Self {
        Outcome {
            broadcasts: vec![packet],
            respawn: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.broadcasts.is_empty() && self.respawn.is_none()
    }
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: GameConfig, mut rng: StdRng) -> Self {
        let world = World::new(&config, &mut rng);
        let effects = EffectLog::new(config.effect_ttl_ms());
        Self {
            world,
            effects,
            config,
            rng,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn effects(&self) -> &EffectLog {
        &self.effects
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Spawns a player and returns its welcome packet.
    pub fn add_player(&mut self, id: PlayerId) -> ServerPacket {
        let player = self.world.add_player(id.clone());
        ServerPacket::Welcome {
            id,
            x: player.x,
            y: player.y,
            hp: player.hp,
        }
    }

    pub fn remove_player(&mut self, id: &PlayerId) -> bool {
        self.world.remove_player(id)
    }

    /// Full membership and position snapshot.
    pub fn snapshot(&self) -> ServerPacket {
        ServerPacket::Update {
            players: self.world.snapshot(),
        }
    }

    pub fn monster_position(&self) -> ServerPacket {
        let monster = &self.world.monster().body;
        ServerPacket::MonsterPosition {
            x: monster.x,
            y: monster.y,
            hp: monster.hp,
        }
    }

    /// One firing of the drift loop.
    pub fn drift_monster(&mut self) -> ServerPacket {
        let max_offset = self.config.monster_drift;
        self.world.drift_monster(&mut self.rng, max_offset);
        self.monster_position()
    }

    /// One firing of the sweep loop; reports the effects still live.
    pub fn sweep_effects(&mut self, now: u64) -> ServerPacket {
        let removed = self.effects.sweep(now);
        if removed > 0 {
            debug!("Swept {} expired effects", removed);
        }
        ServerPacket::Effects {
            effects: self.effects.active(now),
        }
    }

    /// Respawn timer firing for the given depletion epoch.
    pub fn respawn_monster(&mut self, epoch: u64) -> Option<ServerPacket> {
        if self.world.respawn_monster(&mut self.rng, epoch) {
            Some(self.monster_position())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;
    use crate::effects::Effect;

    fn test_game() -> GameState {
        GameState::with_seed(GameConfig::default(), 2024)
    }

    #[test]
    fn test_welcome_carries_spawn_state() {
        let mut game = test_game();
        let welcome = game.add_player(PlayerId::from("p1"));

        assert_eq!(
            welcome,
            ServerPacket::Welcome {
                id: PlayerId::from("p1"),
                x: 400.0,
                y: 300.0,
                hp: 100,
            }
        );
    }

    #[test]
    fn test_snapshot_tracks_membership() {
        let mut game = test_game();
        game.add_player(PlayerId::from("a"));
        game.add_player(PlayerId::from("b"));
        game.remove_player(&PlayerId::from("a"));

        match game.snapshot() {
            ServerPacket::Update { players } => {
                let ids: Vec<&str> = players.keys().map(PlayerId::as_str).collect();
                assert_eq!(ids, vec!["b"]);
            }
            other => panic!("Expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_drift_reports_monster_position() {
        let mut game = test_game();
        match game.drift_monster() {
            ServerPacket::MonsterPosition { x, y, hp } => {
                assert!((0.0..=800.0).contains(&x));
                assert!((0.0..=600.0).contains(&y));
                assert_eq!(hp, 100);
            }
            other => panic!("Expected monster position, got {:?}", other),
        }
    }

    #[test]
    fn test_sweep_reports_empty_set() {
        let mut game = test_game();
        assert_eq!(
            game.sweep_effects(1_000),
            ServerPacket::Effects { effects: vec![] }
        );
    }

    #[test]
    fn test_sweep_keeps_live_effects() {
        let mut game = test_game();
        game.effects.record(Effect::attack(1.0, 1.0, 100), 100);
        game.effects.record(Effect::attack(2.0, 2.0, 900), 900);

        match game.sweep_effects(1_500) {
            ServerPacket::Effects { effects } => {
                assert_eq!(effects.len(), 1);
                assert_eq!(effects[0].timestamp, 900);
            }
            other => panic!("Expected effects, got {:?}", other),
        }
        assert_eq!(game.effects().len(), 1);
    }

    #[test]
    fn test_respawn_only_when_depleted() {
        let mut game = test_game();
        assert!(game.respawn_monster(0).is_none());

        game.world.entity_mut(&EntityRef::Monster).unwrap().hp = 0;
        let epoch = game.world.mark_monster_depleted();

        match game.respawn_monster(epoch) {
            Some(ServerPacket::MonsterPosition { hp, .. }) => assert_eq!(hp, 100),
            other => panic!("Expected monster position, got {:?}", other),
        }
        assert!(game.respawn_monster(epoch).is_none());
    }

    #[test]
    fn test_outcome_helpers() {
        assert!(Outcome::none().is_empty());
        assert!(!Outcome::broadcast(ServerPacket::MonsterDead {}).is_empty());
    }
}
