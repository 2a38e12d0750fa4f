//! Combat events
//!
//! One typed event per topic. Ledgers publish through the [`EventSink`] seam so
//! they can run inside a system (via `EventWriter`) or in a plain test (via a
//! `Vec`).

use bevy::prelude::*;

use super::ledger::EnemyId;

/// Anything that accepts events of type `E`
pub trait EventSink<E> {
    fn emit(&mut self, event: E);
}

impl<E> EventSink<E> for Vec<E> {
    fn emit(&mut self, event: E) {
        self.push(event);
    }
}

impl<E: Event> EventSink<E> for EventWriter<'_, E> {
    fn emit(&mut self, event: E) {
        self.send(event);
    }
}

impl<E: Event> EventSink<E> for Events<E> {
    fn emit(&mut self, event: E) {
        self.send(event);
    }
}

/// Name of the channel an event type travels on
pub trait Topic {
    const NAME: &'static str;
}

/// Lifecycle events of the player
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Survivable hit landed
    DamageReceived,
    /// Health reached zero; sent once
    Died,
    /// The player started a swing
    Attacked,
}

impl Topic for PlayerEvent {
    const NAME: &'static str = "player";
}

/// Lifecycle events of a single enemy
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub enum EnemyEvent {
    DamageReceived { id: EnemyId },
    Died { id: EnemyId },
}

impl EnemyEvent {
    pub fn id(&self) -> &EnemyId {
        match self {
            EnemyEvent::DamageReceived { id } | EnemyEvent::Died { id } => id,
        }
    }
}

impl Topic for EnemyEvent {
    const NAME: &'static str = "enemy";
}
