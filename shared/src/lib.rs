//! Protocol crate shared between the arena server and its clients.
//!
//! Holds the world constants, the serializable data model (players, items,
//! inventories) and the closed set of wire events. Everything here is plain
//! data; all authority lives in the server's `World`.

use serde::{Deserialize, Serialize};

pub mod events;
pub mod geometry;

pub use events::{ClientEvent, ServerEvent};

/// Connection-scoped player identifier. Allocated monotonically and never
/// reused while any timer may still reference it.
pub type PlayerId = u32;

/// Items are keyed by their creation timestamp in milliseconds.
pub type ItemId = u64;

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
/// Players are clamped to `[0, WORLD_WIDTH - EDGE_MARGIN]` on each axis.
pub const EDGE_MARGIN: f32 = 30.0;

/// Rendered player sprite footprint, also the separation half-extents used
/// for spawn placement and move rejection.
pub const PLAYER_WIDTH: f32 = 50.0;
pub const PLAYER_HEIGHT: f32 = 70.0;

/// Spawn rectangle for players and items.
pub const SPAWN_X_MIN: f32 = 50.0;
pub const SPAWN_X_MAX: f32 = 750.0;
pub const SPAWN_Y_MIN: f32 = 50.0;
pub const SPAWN_Y_MAX: f32 = 550.0;

pub const MAX_HEALTH: u32 = 300;
pub const BASE_SPEED: f32 = 3.0;
pub const BASE_DAMAGE: f32 = 30.0;
pub const ATTACK_RANGE: f32 = 100.0;
/// Client-side attack animation window; advisory only, the server never
/// enforces a lockout on it.
pub const ATTACK_ANIM_MS: u64 = 300;

pub const STEP_WRAP: u8 = 40;
pub const INVENTORY_CAP: usize = 4;

pub const ITEM_CAP: usize = 10;
pub const ITEM_SPAWN_INTERVAL_MS: u64 = 3000;
pub const PICKUP_RADIUS: f32 = 30.0;
/// Offset from a player's stored corner to their collection point.
pub const PICKUP_POINT_X: f32 = 25.0;
pub const PICKUP_POINT_Y: f32 = 35.0;
/// Offset from an item's stored corner to its center.
pub const ITEM_CENTER_OFFSET: f32 = 20.0;

pub const HEAL_AMOUNT: u32 = 150;
pub const SPEED_BUFF_FACTOR: f32 = 1.2;
pub const SPEED_CAP: f32 = 4.5;
pub const SPEED_BUFF_MS: u64 = 4000;
pub const DAMAGE_BUFF_FACTOR: f32 = 1.3;
pub const DAMAGE_CAP: f32 = 100.0;
pub const DAMAGE_BUFF_MS: u64 = 3000;
pub const INVISIBILITY_MS: u64 = 15000;
pub const RESPAWN_DELAY_MS: u64 = 10000;

/// Last horizontal facing of a player, used by clients to mirror sprites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    None,
    Left,
    Right,
}

/// World pickup categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    Health,
    SpeedBoots,
    Strength,
    Invisibility,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Health,
        ItemKind::SpeedBoots,
        ItemKind::Strength,
        ItemKind::Invisibility,
    ];

    /// Sprite asset for the item itself (the box sprite is rolled
    /// independently).
    pub fn sprite(&self) -> &'static str {
        match self {
            ItemKind::Health => "assets/items/health.png",
            ItemKind::SpeedBoots => "assets/items/speedBoots.png",
            ItemKind::Strength => "assets/items/strength.png",
            ItemKind::Invisibility => "assets/items/invisibility.png",
        }
    }
}

/// One slot of a player's inventory: the pickup's kind plus the display
/// reference copied from the collected item. Items never back-reference the
/// player who collected them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub kind: ItemKind,
    pub sprite: String,
}

/// A live world pickup. The map key (creation ms) doubles as its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub x: f32,
    pub y: f32,
    pub kind: ItemKind,
    pub box_sprite: String,
    pub item_sprite: String,
}

impl Item {
    /// Center of the item's visual, offset from its stored corner.
    pub fn center(&self) -> (f32, f32) {
        (self.x + ITEM_CENTER_OFFSET, self.y + ITEM_CENTER_OFFSET)
    }
}

/// One player entity, exactly one per live connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: Option<String>,
    pub skin: String,
    pub x: f32,
    pub y: f32,
    /// 0 means dead (rendered as a corpse) until respawn.
    pub health: u32,
    pub speed: f32,
    pub damage: f32,
    pub direction: Direction,
    /// Walk-cycle counter, wraps at [`STEP_WRAP`], 0 while idle.
    pub step: u8,
    pub visible: bool,
    pub inventory: Vec<InventoryItem>,
    /// Start of the in-progress attack animation window, if any.
    pub attack_time: Option<u64>,
}

impl Player {
    pub fn new(id: PlayerId, x: f32, y: f32, skin: String) -> Self {
        Self {
            id,
            name: None,
            skin,
            x,
            y,
            health: MAX_HEALTH,
            speed: BASE_SPEED,
            damage: BASE_DAMAGE,
            direction: Direction::None,
            step: 0,
            visible: true,
            inventory: Vec::new(),
            attack_time: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "anonymous",
        }
    }

    /// The point used for item pickup proximity tests.
    pub fn pickup_point(&self) -> (f32, f32) {
        (self.x + PICKUP_POINT_X, self.y + PICKUP_POINT_Y)
    }
}
