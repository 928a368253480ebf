//! Session table and broadcast routing.
//!
//! Maps each live player id to the outbound queue of its connection's writer
//! task. Events are serialized once per send call; a full queue drops the
//! message with a warning instead of blocking the game loop (the transport
//! is reliable and ordered, a stalled client just misses deltas until it
//! catches up or times out).

use log::{error, info, warn};
use shared::{PlayerId, ServerEvent};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Outbound lines buffered per connection before drops start.
pub const SESSION_QUEUE_DEPTH: usize = 256;

pub struct Registry {
    sessions: HashMap<PlayerId, mpsc::Sender<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    pub fn add_session(&mut self, id: PlayerId, sender: mpsc::Sender<String>) {
        info!("Session {} registered", id);
        self.sessions.insert(id, sender);
    }

    pub fn remove_session(&mut self, id: PlayerId) -> bool {
        if self.sessions.remove(&id).is_some() {
            info!("Session {} removed", id);
            true
        } else {
            false
        }
    }

    fn push(&self, id: PlayerId, line: &str) {
        if let Some(sender) = self.sessions.get(&id) {
            if sender.try_send(line.to_string()).is_err() {
                warn!("Dropping event for slow session {}", id);
            }
        }
    }

    fn serialize(event: &ServerEvent) -> Option<String> {
        match serde_json::to_string(event) {
            Ok(line) => Some(line),
            Err(e) => {
                error!("Failed to serialize server event: {}", e);
                None
            }
        }
    }

    pub fn unicast(&self, id: PlayerId, event: &ServerEvent) {
        if let Some(line) = Self::serialize(event) {
            self.push(id, &line);
        }
    }

    pub fn broadcast(&self, event: &ServerEvent) {
        if let Some(line) = Self::serialize(event) {
            for id in self.sessions.keys() {
                self.push(*id, &line);
            }
        }
    }

    pub fn broadcast_except(&self, except: PlayerId, event: &ServerEvent) {
        if let Some(line) = Self::serialize(event) {
            for id in self.sessions.keys().filter(|id| **id != except) {
                self.push(*id, &line);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
