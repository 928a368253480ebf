//! The authoritative world aggregate.
//!
//! `World` owns every player and item and is only ever touched from the
//! single-writer game loop. Each mutating operation returns the outbound
//! events it produced; routing them is the dispatcher's job. Scheduled
//! future mutations (buff expiry, respawns) go through the owned
//! [`EffectQueue`] and are re-validated in [`World::tick_effects`], so a
//! deadline that outlives its player is a silent no-op.

use crate::effects::{EffectKind, EffectQueue};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::geometry::{diagonal_step, distance, footprints_overlap, within_range};
use shared::{
    Direction, InventoryItem, Item, ItemId, ItemKind, Player, PlayerId, ServerEvent,
    ATTACK_RANGE, DAMAGE_BUFF_FACTOR, DAMAGE_BUFF_MS, DAMAGE_CAP, EDGE_MARGIN, HEAL_AMOUNT,
    INVENTORY_CAP, INVISIBILITY_MS, ITEM_CAP, MAX_HEALTH, PICKUP_RADIUS, RESPAWN_DELAY_MS,
    SPAWN_X_MAX, SPAWN_X_MIN, SPAWN_Y_MAX, SPAWN_Y_MIN, SPEED_BUFF_FACTOR, SPEED_BUFF_MS,
    SPEED_CAP, STEP_WRAP, WORLD_HEIGHT, WORLD_WIDTH,
};
use std::collections::HashMap;

const SKINS: [&str; 10] = [
    "black", "blue1", "blue", "brown", "green1", "pink2", "pink", "red", "white", "yellow1",
];

const BOX_SPRITES: [&str; 3] = [
    "assets/items/box1.png",
    "assets/items/box2.png",
    "assets/items/box3.png",
];

/// An event plus where it should go. The world decides addressing; the
/// dispatcher performs the sends.
#[derive(Debug, Clone)]
pub enum Outbound {
    All(ServerEvent),
    AllExcept(PlayerId, ServerEvent),
    To(PlayerId, ServerEvent),
}

/// Movement intents for one inbound move event: which axes are held plus the
/// client's last horizontal facing.
#[derive(Debug, Clone, Copy)]
pub struct MoveInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub direction: Direction,
}

/// One considered target during attack resolution, for the analytics sink.
#[derive(Debug, Clone, Copy)]
pub struct AttackSample {
    pub attacker: PlayerId,
    pub target: PlayerId,
    pub distance: f32,
    pub hit: bool,
}

/// Outcome of one movement attempt, for the analytics sink.
#[derive(Debug, Clone, Copy)]
pub struct MoveSample {
    pub player: PlayerId,
    pub x: f32,
    pub y: f32,
    pub accepted: bool,
}

/// Per-player stacks of pre-buff values. LIFO: each expiry pops exactly one
/// value, so nested same-kind buffs never restore the base value while
/// another buff is still active underneath.
#[derive(Debug, Default)]
struct BuffStacks {
    speed: Vec<f32>,
    damage: Vec<f32>,
}

/// The single authoritative game state.
pub struct World {
    pub players: HashMap<PlayerId, Player>,
    pub items: HashMap<ItemId, Item>,
    pub effects: EffectQueue,
    buffs: HashMap<PlayerId, BuffStacks>,
    next_player_id: PlayerId,
    rng: StdRng,
}

impl World {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic world for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            players: HashMap::new(),
            items: HashMap::new(),
            effects: EffectQueue::new(),
            buffs: HashMap::new(),
            next_player_id: 1,
            rng,
        }
    }

    /// Rejection-samples a spawn position whose footprint overlaps no live
    /// player. Unbounded retries; the world is sparse relative to the spawn
    /// rectangle so this terminates quickly in practice.
    fn random_spawn_position(&mut self, exclude: Option<PlayerId>) -> (f32, f32) {
        loop {
            let x = self.rng.gen_range(SPAWN_X_MIN..SPAWN_X_MAX);
            let y = self.rng.gen_range(SPAWN_Y_MIN..SPAWN_Y_MAX);
            let clear = self
                .players
                .values()
                .filter(|p| p.is_alive() && Some(p.id) != exclude)
                .all(|p| !footprints_overlap(x, y, p.x, p.y));
            if clear {
                return (x, y);
            }
        }
    }

    /// Creates a player for a fresh connection: unique id, non-overlapping
    /// spawn, random skin, default stats. Returns the id together with the
    /// init snapshot for the new session and the join broadcast for the rest.
    pub fn add_player(&mut self) -> (PlayerId, Vec<Outbound>) {
        let id = self.next_player_id;
        self.next_player_id += 1;

        let (x, y) = self.random_spawn_position(None);
        let skin = SKINS[self.rng.gen_range(0..SKINS.len())].to_string();
        let player = Player::new(id, x, y, skin);

        info!("Player {} joined at ({:.1}, {:.1})", id, x, y);
        self.players.insert(id, player.clone());
        self.buffs.insert(id, BuffStacks::default());

        let events = vec![
            Outbound::To(
                id,
                ServerEvent::GameInit {
                    player_id: id,
                    players: self.players.clone(),
                },
            ),
            Outbound::AllExcept(id, ServerEvent::PlayerJoined { player }),
        ];
        (id, events)
    }

    /// Removes a player on disconnect. Pending deadlines referencing the id
    /// are left in place; they re-check liveness when they fire.
    pub fn remove_player(&mut self, id: PlayerId) -> Vec<Outbound> {
        if self.players.remove(&id).is_none() {
            return Vec::new();
        }
        self.buffs.remove(&id);
        info!("Player {} left", id);
        vec![Outbound::All(ServerEvent::PlayerLeft { id })]
    }

    pub fn set_name(&mut self, id: PlayerId, name: String) -> Vec<Outbound> {
        let Some(player) = self.players.get_mut(&id) else {
            return Vec::new();
        };
        let name = name.trim().to_string();
        player.name = if name.is_empty() { None } else { Some(name) };
        info!("Player {} is now \"{}\"", id, player.display_name());
        vec![Outbound::All(ServerEvent::PlayerUpdated {
            player: player.clone(),
        })]
    }

    /// Applies one movement intent. The displacement is derived from the
    /// server's copy of the player's speed, diagonals normalized so two held
    /// axes never exceed single-axis speed. The candidate position is
    /// clamped to world bounds and rolled back entirely if it lands within
    /// the separation box of another live player.
    pub fn apply_move(
        &mut self,
        id: PlayerId,
        input: &MoveInput,
    ) -> (Vec<Outbound>, Option<MoveSample>) {
        let Some(player) = self.players.get(&id) else {
            return (Vec::new(), None);
        };
        if !player.is_alive() {
            debug!("Ignoring move from dead player {}", id);
            return (Vec::new(), None);
        }

        let ax = (input.right as i8 - input.left as i8) as f32;
        let ay = (input.down as i8 - input.up as i8) as f32;
        let moving = ax != 0.0 || ay != 0.0;

        let mut sample = None;
        if moving {
            let (old_x, old_y, speed) = (player.x, player.y, player.speed);
            let mut new_x = (old_x + diagonal_step(ax, ay, speed))
                .clamp(0.0, WORLD_WIDTH - EDGE_MARGIN);
            let mut new_y = (old_y + diagonal_step(ay, ax, speed))
                .clamp(0.0, WORLD_HEIGHT - EDGE_MARGIN);

            // Coarse anti-stacking: reject rather than resolve.
            let blocked = self
                .players
                .values()
                .filter(|p| p.id != id && p.is_alive())
                .any(|p| footprints_overlap(new_x, new_y, p.x, p.y));
            if blocked {
                new_x = old_x;
                new_y = old_y;
            }

            let player = self.players.get_mut(&id).unwrap();
            player.x = new_x;
            player.y = new_y;
            player.step = (player.step + 1) % STEP_WRAP;
            sample = Some(MoveSample {
                player: id,
                x: new_x,
                y: new_y,
                accepted: !blocked,
            });
        } else {
            self.players.get_mut(&id).unwrap().step = 0;
        }

        let player = self.players.get_mut(&id).unwrap();
        player.direction = input.direction;
        let moved = ServerEvent::PlayerMoved {
            id,
            x: player.x,
            y: player.y,
            direction: player.direction,
            step: player.step,
        };

        let mut events = Vec::new();
        if moving {
            events.extend(self.check_pickup(id));
        }
        events.push(Outbound::AllExcept(id, moved));
        (events, sample)
    }

    /// Scans live items against the player's collection point. Each item is
    /// deleted the moment a check succeeds, so an item can never be awarded
    /// twice; the scan stops filling once the inventory is full.
    fn check_pickup(&mut self, id: PlayerId) -> Vec<Outbound> {
        let Some(player) = self.players.get(&id) else {
            return Vec::new();
        };
        let (px, py) = player.pickup_point();
        let mut room = INVENTORY_CAP.saturating_sub(player.inventory.len());

        let mut item_ids: Vec<ItemId> = self.items.keys().copied().collect();
        item_ids.sort_unstable();

        let mut events = Vec::new();
        for item_id in item_ids {
            if room == 0 {
                break;
            }
            let (cx, cy) = self.items[&item_id].center();
            if !within_range(cx - px, cy - py, PICKUP_RADIUS) {
                continue;
            }
            let item = self.items.remove(&item_id).unwrap();
            room -= 1;
            let player = self.players.get_mut(&id).unwrap();
            player.inventory.push(InventoryItem {
                kind: item.kind,
                sprite: item.item_sprite,
            });
            debug!("Player {} picked up {:?} ({})", id, item.kind, item_id);
            events.push(Outbound::All(ServerEvent::ItemReached {
                items: self.items.clone(),
            }));
            events.push(Outbound::To(
                id,
                ServerEvent::InventoryUpdated {
                    items: self.players[&id].inventory.clone(),
                },
            ));
        }
        events
    }

    /// Resolves one attack request. Dead attackers are ignored; an invisible
    /// attacker is revealed first. Every other live player within
    /// [`ATTACK_RANGE`] (boundary inclusive) takes the attacker's current
    /// damage, floored at zero health. Targets reaching exactly zero are
    /// batched onto a single respawn deadline.
    pub fn attack(&mut self, id: PlayerId, now_ms: u64) -> (Vec<Outbound>, Vec<AttackSample>) {
        let Some(attacker) = self.players.get_mut(&id) else {
            return (Vec::new(), Vec::new());
        };
        if !attacker.is_alive() {
            debug!("Ignoring attack from dead player {}", id);
            return (Vec::new(), Vec::new());
        }

        let mut events = Vec::new();
        if !attacker.visible {
            attacker.visible = true;
            events.push(Outbound::All(ServerEvent::PlayerVisibility {
                id,
                visible: true,
            }));
        }
        attacker.attack_time = Some(now_ms);
        let (ax, ay, damage) = (attacker.x, attacker.y, attacker.damage);

        let mut hits = HashMap::new();
        let mut newly_dead = Vec::new();
        let mut samples = Vec::new();

        for target in self.players.values_mut() {
            if target.id == id || !target.is_alive() {
                continue;
            }
            let dist = distance(ax, ay, target.x, target.y);
            let hit = dist <= ATTACK_RANGE;
            samples.push(AttackSample {
                attacker: id,
                target: target.id,
                distance: dist,
                hit,
            });
            if !hit {
                continue;
            }
            target.health = target.health.saturating_sub(damage as u32);
            hits.insert(target.id, target.health);
            if target.health == 0 {
                newly_dead.push(target.id);
            }
        }

        if !newly_dead.is_empty() {
            info!("Players {:?} died, respawn in {}ms", newly_dead, RESPAWN_DELAY_MS);
            self.effects.schedule(
                now_ms + RESPAWN_DELAY_MS,
                EffectKind::Respawn {
                    players: newly_dead,
                },
            );
        }

        events.push(Outbound::AllExcept(
            id,
            ServerEvent::PlayerIsAttacking {
                id,
                attack_time: now_ms,
            },
        ));
        events.push(Outbound::All(ServerEvent::AttackResult { attacker: id, hits }));
        (events, samples)
    }

    /// Spawner tick: creates one item while strictly under the cap, keyed by
    /// creation time (bumped until unique).
    pub fn spawn_item(&mut self, now_ms: u64) -> Vec<Outbound> {
        if self.items.len() >= ITEM_CAP {
            return Vec::new();
        }

        let mut item_id = now_ms;
        while self.items.contains_key(&item_id) {
            item_id += 1;
        }

        let kind = ItemKind::ALL[self.rng.gen_range(0..ItemKind::ALL.len())];
        let item = Item {
            x: self.rng.gen_range(SPAWN_X_MIN..SPAWN_X_MAX),
            y: self.rng.gen_range(SPAWN_Y_MIN..SPAWN_Y_MAX),
            kind,
            box_sprite: BOX_SPRITES[self.rng.gen_range(0..BOX_SPRITES.len())].to_string(),
            item_sprite: kind.sprite().to_string(),
        };
        debug!("Spawned {:?} at ({:.1}, {:.1})", kind, item.x, item.y);
        self.items.insert(item_id, item);

        vec![Outbound::All(ServerEvent::ItemCreated {
            items: self.items.clone(),
        })]
    }

    /// Consumes the inventory slot at `slot` and applies its effect.
    /// Consuming anything reveals the player first; the visibility flip is
    /// broadcast before the item's own effect.
    pub fn use_item(&mut self, id: PlayerId, slot: usize, now_ms: u64) -> Vec<Outbound> {
        let Some(player) = self.players.get_mut(&id) else {
            return Vec::new();
        };
        if !player.is_alive() {
            debug!("Ignoring item use from dead player {}", id);
            return Vec::new();
        }
        if slot >= player.inventory.len() {
            debug!("Player {} clicked empty inventory slot {}", id, slot);
            return Vec::new();
        }

        let used = player.inventory.remove(slot);
        let mut events = Vec::new();
        if !player.visible {
            player.visible = true;
            events.push(Outbound::All(ServerEvent::PlayerVisibility {
                id,
                visible: true,
            }));
        }

        events.extend(self.apply_item_effect(id, used.kind, now_ms));
        events.push(Outbound::To(
            id,
            ServerEvent::InventoryUpdated {
                items: self.players[&id].inventory.clone(),
            },
        ));
        events
    }

    fn apply_item_effect(&mut self, id: PlayerId, kind: ItemKind, now_ms: u64) -> Vec<Outbound> {
        let player = self.players.get_mut(&id).expect("caller checked liveness");
        match kind {
            ItemKind::Health => {
                player.health = (player.health + HEAL_AMOUNT).min(MAX_HEALTH);
                vec![Outbound::All(ServerEvent::HealthIncreased {
                    id,
                    health: player.health,
                })]
            }
            ItemKind::SpeedBoots => {
                let stacks = self.buffs.entry(id).or_default();
                stacks.speed.push(player.speed);
                player.speed = (player.speed * SPEED_BUFF_FACTOR).min(SPEED_CAP);
                self.effects
                    .schedule(now_ms + SPEED_BUFF_MS, EffectKind::SpeedExpiry { player: id });
                vec![Outbound::All(ServerEvent::MovingSpeedChanged {
                    id,
                    speed: player.speed,
                })]
            }
            ItemKind::Strength => {
                let stacks = self.buffs.entry(id).or_default();
                stacks.damage.push(player.damage);
                player.damage = (player.damage * DAMAGE_BUFF_FACTOR).min(DAMAGE_CAP);
                self.effects.schedule(
                    now_ms + DAMAGE_BUFF_MS,
                    EffectKind::DamageExpiry { player: id },
                );
                vec![Outbound::All(ServerEvent::PlayerUpdated {
                    player: player.clone(),
                })]
            }
            ItemKind::Invisibility => {
                player.visible = false;
                self.effects.schedule(
                    now_ms + INVISIBILITY_MS,
                    EffectKind::InvisibilityEnd { player: id },
                );
                vec![Outbound::All(ServerEvent::PlayerVisibility {
                    id,
                    visible: false,
                })]
            }
        }
    }

    /// Pure relay: no world mutation beyond reading the display name.
    pub fn chat(&self, id: PlayerId, message: String, now_ms: u64) -> Vec<Outbound> {
        let name = self
            .players
            .get(&id)
            .map(|p| p.display_name().to_string())
            .unwrap_or_else(|| "anonymous".to_string());
        vec![Outbound::All(ServerEvent::Chat {
            id,
            name,
            message,
            timestamp: now_ms,
        })]
    }

    /// Fires every due deadline. Each entry re-validates the target's state:
    /// missing players, already-consumed buff stacks and already-visible
    /// players all no-op silently.
    pub fn tick_effects(&mut self, now_ms: u64) -> Vec<Outbound> {
        let mut events = Vec::new();
        for effect in self.effects.pop_due(now_ms) {
            match effect {
                EffectKind::SpeedExpiry { player: id } => {
                    let (Some(player), Some(stacks)) =
                        (self.players.get_mut(&id), self.buffs.get_mut(&id))
                    else {
                        continue;
                    };
                    // An empty stack means a later action already consumed
                    // this slot; skip.
                    let Some(prev) = stacks.speed.pop() else {
                        continue;
                    };
                    player.speed = prev;
                    events.push(Outbound::All(ServerEvent::MovingSpeedChanged {
                        id,
                        speed: prev,
                    }));
                }
                EffectKind::DamageExpiry { player: id } => {
                    let (Some(player), Some(stacks)) =
                        (self.players.get_mut(&id), self.buffs.get_mut(&id))
                    else {
                        continue;
                    };
                    let Some(prev) = stacks.damage.pop() else {
                        continue;
                    };
                    player.damage = prev;
                    events.push(Outbound::All(ServerEvent::PlayerUpdated {
                        player: player.clone(),
                    }));
                }
                EffectKind::InvisibilityEnd { player: id } => {
                    let Some(player) = self.players.get_mut(&id) else {
                        continue;
                    };
                    if player.visible {
                        continue;
                    }
                    player.visible = true;
                    events.push(Outbound::All(ServerEvent::PlayerVisibility {
                        id,
                        visible: true,
                    }));
                }
                EffectKind::Respawn { players } => {
                    let mut respawned = Vec::new();
                    for id in players {
                        // Disconnected mid-wait: skip without error.
                        if !self.players.contains_key(&id) {
                            continue;
                        }
                        let (x, y) = self.random_spawn_position(Some(id));
                        let player = self.players.get_mut(&id).unwrap();
                        player.x = x;
                        player.y = y;
                        player.health = MAX_HEALTH;
                        player.visible = true;
                        player.step = 0;
                        respawned.push(player.clone());
                    }
                    if !respawned.is_empty() {
                        info!(
                            "Respawned players {:?}",
                            respawned.iter().map(|p| p.id).collect::<Vec<_>>()
                        );
                        events.push(Outbound::All(ServerEvent::PlayersRespawned {
                            players: respawned,
                        }));
                    }
                }
            }
        }
        events
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
