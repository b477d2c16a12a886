use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const SPAWN_X: f32 = 400.0;
pub const SPAWN_Y: f32 = 300.0;
pub const MAX_HP: u32 = 100;

/// Attack target naming the monster rather than a player identity.
pub const MONSTER_TARGET: &str = "monster";

/// Opaque player identity assigned by the server at connect time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PlayerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Messages sent from clients to the server.
///
/// The `id` field is what the client believes its identity to be; the server
/// always trusts the identity bound to the connection instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientPacket {
    Move {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<PlayerId>,
        x: f32,
        y: f32,
    },
    Attack {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<PlayerId>,
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        x: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y: Option<f32>,
    },
    /// Any message kind this server does not understand.
    #[serde(other)]
    Unknown,
}

impl ClientPacket {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Position and health of a single player as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub x: f32,
    pub y: f32,
    pub hp: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Attack,
}

/// A transient combat effect; `timestamp` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectView {
    pub kind: EffectKind,
    pub x: f32,
    pub y: f32,
    pub timestamp: u64,
}

/// Messages sent from the server to clients.
///
/// Clients may receive any of these at any time and should only update the
/// fields present in each one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerPacket {
    Welcome {
        id: PlayerId,
        x: f32,
        y: f32,
        hp: u32,
    },
    Update {
        players: BTreeMap<PlayerId, PlayerView>,
    },
    MonsterPosition {
        x: f32,
        y: f32,
        hp: u32,
    },
    #[serde(rename = "updateMonsterHP")]
    UpdateMonsterHp {
        hp: u32,
    },
    #[serde(rename = "updatePlayerHP")]
    UpdatePlayerHp {
        id: PlayerId,
        hp: u32,
    },
    Effect {
        effect: EffectView,
    },
    Effects {
        effects: Vec<EffectView>,
    },
    PlayerDead {
        id: PlayerId,
    },
    MonsterDead {},
    Rejected {
        reason: String,
    },
}

impl ServerPacket {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The `type` tag this packet carries on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerPacket::Welcome { .. } => "welcome",
            ServerPacket::Update { .. } => "update",
            ServerPacket::MonsterPosition { .. } => "monsterPosition",
            ServerPacket::UpdateMonsterHp { .. } => "updateMonsterHP",
            ServerPacket::UpdatePlayerHp { .. } => "updatePlayerHP",
            ServerPacket::Effect { .. } => "effect",
            ServerPacket::Effects { .. } => "effects",
            ServerPacket::PlayerDead { .. } => "playerDead",
            ServerPacket::MonsterDead {} => "monsterDead",
            ServerPacket::Rejected { .. } => "rejected",
        }
    }
}
