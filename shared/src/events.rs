//! The closed tagged unions of inbound and outbound wire events.
//!
//! Every message is a single JSON object with a `type` discriminant, one per
//! line on the wire. Connect and disconnect are transport-level facts and
//! have no inbound payload.

use crate::{Direction, InventoryItem, Item, ItemId, Player, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Events a client may send. Anything that fails to parse into this enum is
/// dropped at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    SetName {
        name: String,
    },
    /// Movement intents: which axes are held this frame. The server derives
    /// the actual displacement from its own copy of the player's speed.
    Move {
        up: bool,
        down: bool,
        left: bool,
        right: bool,
        direction: Direction,
    },
    Attack,
    /// Consume the inventory slot at `slot` (insertion order, 0-based).
    UseItem {
        slot: usize,
    },
    Chat {
        message: String,
    },
}

/// Events the server emits. Broadcast unless noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Unicast snapshot sent to a freshly connected session.
    GameInit {
        player_id: PlayerId,
        players: HashMap<PlayerId, Player>,
    },
    PlayerJoined {
        player: Player,
    },
    PlayerLeft {
        id: PlayerId,
    },
    /// Sent to everyone except the mover.
    PlayerMoved {
        id: PlayerId,
        x: f32,
        y: f32,
        direction: Direction,
        step: u8,
    },
    /// Full record refresh (name changes, damage buffs).
    PlayerUpdated {
        player: Player,
    },
    /// Visual cue only; sent to everyone except the attacker.
    PlayerIsAttacking {
        id: PlayerId,
        attack_time: u64,
    },
    /// Authoritative health deltas, sent to everyone including the attacker.
    AttackResult {
        attacker: PlayerId,
        hits: HashMap<PlayerId, u32>,
    },
    ItemCreated {
        items: HashMap<ItemId, Item>,
    },
    ItemReached {
        items: HashMap<ItemId, Item>,
    },
    /// Unicast to the owning player.
    InventoryUpdated {
        items: Vec<InventoryItem>,
    },
    HealthIncreased {
        id: PlayerId,
        health: u32,
    },
    MovingSpeedChanged {
        id: PlayerId,
        speed: f32,
    },
    PlayerVisibility {
        id: PlayerId,
        visible: bool,
    },
    PlayersRespawned {
        players: Vec<Player>,
    },
    Chat {
        id: PlayerId,
        name: String,
        message: String,
        timestamp: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_tag_names() {
        let ev = ClientEvent::Move {
            up: true,
            down: false,
            left: false,
            right: true,
            direction: Direction::Right,
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"type\":\"move\""));
        assert!(json.contains("\"direction\":\"right\""));
    }

    #[test]
    fn test_client_event_parses_from_plain_json() {
        let ev: ClientEvent =
            serde_json::from_str(r#"{"type":"useItem","slot":2}"#).unwrap();
        match ev {
            ClientEvent::UseItem { slot } => assert_eq!(slot, 2),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_client_event_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"teleport"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>("not json").is_err());
    }

    #[test]
    fn test_server_event_field_casing() {
        let ev = ServerEvent::PlayerIsAttacking {
            id: 3,
            attack_time: 1234,
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"type\":\"playerIsAttacking\""));
        assert!(json.contains("\"attackTime\":1234"));
    }

    #[test]
    fn test_attack_result_roundtrip() {
        let mut hits = HashMap::new();
        hits.insert(2u32, 270u32);
        let ev = ServerEvent::AttackResult { attacker: 1, hits };
        let json = serde_json::to_string(&ev).unwrap();
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        match back {
            ServerEvent::AttackResult { attacker, hits } => {
                assert_eq!(attacker, 1);
                assert_eq!(hits.get(&2), Some(&270));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_game_init_includes_full_registry() {
        let mut players = HashMap::new();
        players.insert(1u32, Player::new(1, 100.0, 100.0, "red".to_string()));
        players.insert(2u32, Player::new(2, 400.0, 300.0, "blue".to_string()));
        let ev = ServerEvent::GameInit {
            player_id: 2,
            players,
        };
        let json = serde_json::to_string(&ev).unwrap();
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        match back {
            ServerEvent::GameInit { player_id, players } => {
                assert_eq!(player_id, 2);
                assert_eq!(players.len(), 2);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
