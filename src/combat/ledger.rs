//! Health ledgers
//!
//! The authoritative health and lifecycle records for the player and for every
//! live enemy. Ledgers mutate state and publish lifecycle events through an
//! [`EventSink`]; they never reach into animation or audio themselves.
//!
//! - Health is clamped to `[0, MAX_HEALTH]` on every mutation
//! - A dead record absorbs further damage and healing
//! - An enemy is removed from its ledger inside the call that kills it

use bevy::prelude::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use super::events::{EnemyEvent, EventSink, PlayerEvent};

pub const MAX_HEALTH: f32 = 100.0;

/// Damage multiplier for players on the reduced-input (touch) profile
pub const REDUCED_INPUT_DAMAGE_SCALE: f32 = 0.7;

/// Stable identifier of a live enemy
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(pub String);

impl EnemyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnemyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EnemyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Enemy archetypes roaming the graveyard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Skeleton,
    Zombie,
    Spider,
    Slime,
}

impl EnemyKind {
    pub fn all() -> [EnemyKind; 4] {
        [
            EnemyKind::Skeleton,
            EnemyKind::Zombie,
            EnemyKind::Spider,
            EnemyKind::Slime,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            EnemyKind::Skeleton => "Skeleton",
            EnemyKind::Zombie => "Zombie",
            EnemyKind::Spider => "Spider",
            EnemyKind::Slime => "Slime",
        }
    }

    /// Case-insensitive lookup by name
    pub fn parse(name: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Kinds whose attack holds the player in place until the swing ends
    pub fn grabs(&self) -> bool {
        matches!(self, EnemyKind::Spider | EnemyKind::Zombie)
    }
}

impl fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("enemy '{0}' is already registered")]
    DuplicateEnemy(EnemyId),
}

/// What a damage call did to its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Unknown or already dead target
    Ignored,
    Hurt { health: f32 },
    Killed,
}

/// Planar (XZ) distance; characters share the ground plane
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x - b.x, a.z - b.z).length()
}

pub fn within_reach(origin: Vec3, target: Vec3, reach: f32) -> bool {
    planar_distance(origin, target) <= reach
}

/// The player's health record, freeze holds and damage scaling
#[derive(Resource, Debug, Clone)]
pub struct PlayerLedger {
    health: f32,
    is_dead: bool,
    position: Vec3,
    frozen_by: HashSet<EnemyId>,
    damage_scale: f32,
}

impl Default for PlayerLedger {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl PlayerLedger {
    pub fn new(damage_scale: f32) -> Self {
        Self {
            health: MAX_HEALTH,
            is_dead: false,
            position: Vec3::ZERO,
            frozen_by: HashSet::new(),
            damage_scale,
        }
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn is_dead(&self) -> bool {
        self.is_dead
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn damage_scale(&self) -> f32 {
        self.damage_scale
    }

    pub fn set_damage_scale(&mut self, scale: f32) {
        self.damage_scale = scale;
    }

    pub fn update_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Apply `amount` (scaled by the input profile). Emits `DamageReceived`
    /// for a survivable hit and `Died` exactly once for the fatal one.
    pub fn damage(&mut self, amount: f32, sink: &mut impl EventSink<PlayerEvent>) -> DamageOutcome {
        if self.is_dead {
            debug!("Ignoring damage to dead player");
            return DamageOutcome::Ignored;
        }

        let scaled = amount.max(0.0) * self.damage_scale;
        self.health = (self.health - scaled).clamp(0.0, MAX_HEALTH);

        if self.health <= 0.0 {
            self.is_dead = true;
            sink.emit(PlayerEvent::Died);
            return DamageOutcome::Killed;
        }

        sink.emit(PlayerEvent::DamageReceived);
        DamageOutcome::Hurt {
            health: self.health,
        }
    }

    pub fn heal(&mut self, amount: f32) {
        if self.is_dead {
            return;
        }
        self.health = (self.health + amount.max(0.0)).clamp(0.0, MAX_HEALTH);
    }

    /// Announce a player swing to subscribers
    pub fn attack(&self, sink: &mut impl EventSink<PlayerEvent>) {
        if !self.is_dead {
            sink.emit(PlayerEvent::Attacked);
        }
    }

    pub fn freeze(&mut self, source: EnemyId) {
        self.frozen_by.insert(source);
    }

    pub fn unfreeze(&mut self, source: &EnemyId) {
        self.frozen_by.remove(source);
    }

    pub fn is_frozen(&self) -> bool {
        !self.frozen_by.is_empty()
    }

    pub fn frozen_by(&self) -> impl Iterator<Item = &EnemyId> {
        self.frozen_by.iter()
    }

    /// Full health, alive, no holds, moved to `position`
    pub fn reset(&mut self, position: Vec3) {
        self.health = MAX_HEALTH;
        self.is_dead = false;
        self.frozen_by.clear();
        self.position = position;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyRecord {
    pub id: EnemyId,
    pub kind: EnemyKind,
    pub health: f32,
    pub is_dead: bool,
    pub position: Vec3,
}

/// Live enemies in registration order
#[derive(Resource, Debug, Default)]
pub struct EnemyLedger {
    enemies: IndexMap<EnemyId, EnemyRecord>,
}

impl EnemyLedger {
    pub fn register_enemy(
        &mut self,
        id: EnemyId,
        position: Vec3,
        kind: EnemyKind,
    ) -> Result<(), LedgerError> {
        if self.enemies.contains_key(&id) {
            return Err(LedgerError::DuplicateEnemy(id));
        }
        self.enemies.insert(
            id.clone(),
            EnemyRecord {
                id,
                kind,
                health: MAX_HEALTH,
                is_dead: false,
                position,
            },
        );
        Ok(())
    }

    /// Remove an enemy, preserving the order of the rest
    pub fn remove_enemy(&mut self, id: &EnemyId) -> Option<EnemyRecord> {
        self.enemies.shift_remove(id)
    }

    pub fn update_enemy_position(&mut self, id: &EnemyId, position: Vec3) {
        match self.enemies.get_mut(id) {
            Some(record) => record.position = position,
            None => debug!("Position update for unknown enemy {}", id),
        }
    }

    /// Apply unscaled damage. The fatal hit emits `Died` and removes the
    /// record before returning.
    pub fn damage(
        &mut self,
        id: &EnemyId,
        amount: f32,
        sink: &mut impl EventSink<EnemyEvent>,
    ) -> DamageOutcome {
        let Some(record) = self.enemies.get_mut(id) else {
            debug!("Damage for unknown enemy {}", id);
            return DamageOutcome::Ignored;
        };
        if record.is_dead {
            return DamageOutcome::Ignored;
        }

        record.health = (record.health - amount.max(0.0)).clamp(0.0, MAX_HEALTH);
        if record.health > 0.0 {
            let health = record.health;
            sink.emit(EnemyEvent::DamageReceived { id: id.clone() });
            return DamageOutcome::Hurt { health };
        }

        record.is_dead = true;
        sink.emit(EnemyEvent::Died { id: id.clone() });
        self.enemies.shift_remove(id);
        DamageOutcome::Killed
    }

    pub fn heal(&mut self, id: &EnemyId, amount: f32) {
        if let Some(record) = self.enemies.get_mut(id) {
            if !record.is_dead {
                record.health = (record.health + amount.max(0.0)).clamp(0.0, MAX_HEALTH);
            }
        }
    }

    pub fn get(&self, id: &EnemyId) -> Option<&EnemyRecord> {
        self.enemies.get(id)
    }

    pub fn is_alive(&self, id: &EnemyId) -> bool {
        self.enemies.get(id).is_some_and(|record| !record.is_dead)
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnemyRecord> {
        self.enemies.values()
    }

    /// Ids of live enemies within `reach` of `origin`, in registration order
    pub fn within_reach(&self, origin: Vec3, reach: f32) -> Vec<EnemyId> {
        self.enemies
            .values()
            .filter(|record| !record.is_dead && within_reach(origin, record.position, reach))
            .map(|record| record.id.clone())
            .collect()
    }

    /// Closest live enemy to `origin`
    pub fn nearest(&self, origin: Vec3) -> Option<&EnemyRecord> {
        self.enemies
            .values()
            .filter(|record| !record.is_dead)
            .min_by(|a, b| {
                planar_distance(origin, a.position).total_cmp(&planar_distance(origin, b.position))
            })
    }

    pub fn clear(&mut self) {
        self.enemies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_damage_is_scaled() {
        let mut ledger = PlayerLedger::new(REDUCED_INPUT_DAMAGE_SCALE);
        let mut events = Vec::new();
        ledger.damage(10.0, &mut events);
        assert!((ledger.health() - 93.0).abs() < 1e-4);
        assert_eq!(events, vec![PlayerEvent::DamageReceived]);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut ledger = PlayerLedger::default();
        let mut events = Vec::new();
        ledger.damage(5.0, &mut events);
        ledger.heal(50.0);
        assert_eq!(ledger.health(), MAX_HEALTH);
    }

    #[test]
    fn test_duplicate_enemy_is_rejected() {
        let mut ledger = EnemyLedger::default();
        let id = EnemyId::from("skeleton-1");
        assert!(ledger
            .register_enemy(id.clone(), Vec3::ZERO, EnemyKind::Skeleton)
            .is_ok());
        assert_eq!(
            ledger.register_enemy(id.clone(), Vec3::X, EnemyKind::Zombie),
            Err(LedgerError::DuplicateEnemy(id))
        );
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_unknown_enemy_is_a_no_op() {
        let mut ledger = EnemyLedger::default();
        let mut events = Vec::new();
        let ghost = EnemyId::from("ghost");
        assert_eq!(ledger.damage(&ghost, 50.0, &mut events), DamageOutcome::Ignored);
        ledger.update_enemy_position(&ghost, Vec3::ONE);
        assert!(events.is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_within_reach_keeps_registration_order() {
        let mut ledger = EnemyLedger::default();
        for (name, x) in [("c", 1.0), ("a", 0.5), ("b", 9.0)] {
            ledger
                .register_enemy(EnemyId::from(name), Vec3::new(x, 0.0, 0.0), EnemyKind::Slime)
                .unwrap();
        }
        let hits = ledger.within_reach(Vec3::ZERO, 2.0);
        assert_eq!(hits, vec![EnemyId::from("c"), EnemyId::from("a")]);
        assert_eq!(ledger.nearest(Vec3::ZERO).map(|r| r.id.as_str()), Some("a"));
    }

    #[test]
    fn test_reach_ignores_height() {
        assert!(within_reach(Vec3::ZERO, Vec3::new(1.0, -8.0, 0.0), 1.5));
        assert!(!within_reach(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.5), 1.5));
    }

    #[test]
    fn test_kind_lookup_by_name() {
        assert_eq!(EnemyKind::parse("spider"), Some(EnemyKind::Spider));
        assert_eq!(EnemyKind::parse("Vampire"), None);
        assert!(EnemyKind::Zombie.grabs());
        assert!(!EnemyKind::Slime.grabs());
    }
}
