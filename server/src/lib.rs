//! # Arena Game Server Library
//!
//! Authoritative server for the real-time multiplayer arena. The server owns
//! the single source of truth for all shared state: player entities, world
//! items, buff timers and respawn scheduling. Clients submit intents (keys
//! held, attack requests, inventory clicks) and render the broadcast deltas;
//! they are never trusted with outcomes.
//!
//! ## Architecture
//!
//! All world mutation happens inside one game-loop task (single-writer).
//! Per-connection reader tasks translate newline-delimited JSON into
//! [`dispatcher::Command`] values on a bounded mpsc channel; the loop
//! `select!`s over that channel, the item-spawn interval and the earliest
//! deadline in the effect queue. Outbound events leave the loop through
//! per-connection queues and are written by dedicated tasks, so the loop
//! never blocks on socket I/O.
//!
//! Timed mutations (buff expiry, invisibility end, respawns) are not ad-hoc
//! timers: they are entries in [`effects::EffectQueue`], re-validated against
//! the live world when they fire. A deadline referencing a disconnected
//! player or an already-reverted buff is a silent no-op.
//!
//! ## Modules
//!
//! - [`world`] — the `World` aggregate: player registry, movement
//!   validation, combat resolution, item spawning and pickup.
//! - [`effects`] — deadline queue for scheduled future mutations.
//! - [`registry`] — session table mapping player ids to outbound queues,
//!   with unicast/broadcast routing.
//! - [`network`] — TCP transport boundary: accept loop, per-connection
//!   reader/writer tasks, payload validation.
//! - [`dispatcher`] — the single-writer game loop and command processing.
//! - [`analytics`] — optional append-only CSV sink for combat and movement
//!   telemetry.

pub mod analytics;
pub mod dispatcher;
pub mod effects;
pub mod network;
pub mod registry;
pub mod utils;
pub mod world;
