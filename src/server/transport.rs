//! Room-aware connection registry.
//!
//! The controller talks to clients only through this narrow interface:
//! per-connection senders, named rooms, and targeted or room-wide emits.
//! Each sender is drained by that connection's writer task, so tests can
//! drive the controller with plain channels instead of sockets.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::Envelope;

/// Identity of one client connection.
pub type ConnectionId = Uuid;

/// Sender half of a connection's outbound queue.
pub type OutboundSender = mpsc::UnboundedSender<Envelope>;

#[derive(Debug, Default)]
pub struct Transport {
    connections: HashMap<ConnectionId, OutboundSender>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ConnectionId, sender: OutboundSender) {
        self.connections.insert(id, sender);
    }

    /// Drop a connection's sender and purge it from every room.
    pub fn unregister(&mut self, id: ConnectionId) {
        self.connections.remove(&id);
        self.rooms.retain(|_, members| {
            members.remove(&id);
            !members.is_empty()
        });
    }

    pub fn join_room(&mut self, id: ConnectionId, room: &str) {
        self.rooms.entry(room.to_string()).or_default().insert(id);
    }

    pub fn leave_room(&mut self, id: ConnectionId, room: &str) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&id);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }

    /// Dissolve a room entirely.
    pub fn force_all_to_leave(&mut self, room: &str) {
        self.rooms.remove(room);
    }

    /// Rooms the connection currently belongs to.
    pub fn rooms_of(&self, id: ConnectionId) -> Vec<String> {
        self.rooms
            .iter()
            .filter(|(_, members)| members.contains(&id))
            .map(|(room, _)| room.clone())
            .collect()
    }

    pub fn emit_to_one(&self, target: ConnectionId, envelope: Envelope) {
        if let Some(sender) = self.connections.get(&target) {
            let _ = sender.send(envelope);
        }
    }

    pub fn emit_to_room(&self, room: &str, envelope: Envelope) {
        let Some(members) = self.rooms.get(room) else {
            return;
        };
        for member in members {
            self.emit_to_one(*member, envelope.clone());
        }
    }

    pub fn emit_to_room_except(&self, room: &str, except: ConnectionId, envelope: Envelope) {
        let Some(members) = self.rooms.get(room) else {
            return;
        };
        for member in members {
            if *member != except {
                self.emit_to_one(*member, envelope.clone());
            }
        }
    }
}
