use serde::Serialize;

use crate::game::creature::{CreatureId, CreatureInstance, CreatureView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterError {
    Full,
    NotFound,
}

/// Ordered, bounded line of creatures. Order drives cleave adjacency and
/// merge priority.
#[derive(Debug, Clone, Serialize)]
pub struct Roster {
    slots: Vec<CreatureInstance>,
    capacity: usize,
}

impl Roster {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Builds a roster, silently dropping anything past `capacity`.
    pub fn from_creatures(creatures: Vec<CreatureInstance>, capacity: usize) -> Self {
        let mut slots = creatures;
        slots.truncate(capacity);
        Self { slots, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn push(&mut self, creature: CreatureInstance) -> Result<(), RosterError> {
        if self.is_full() {
            return Err(RosterError::Full);
        }
        self.slots.push(creature);
        Ok(())
    }

    pub fn remove(&mut self, id: CreatureId) -> Result<CreatureInstance, RosterError> {
        let position = self.position(id).ok_or(RosterError::NotFound)?;
        Ok(self.slots.remove(position))
    }

    /// Removes up to `limit` non-golden copies named `name`, front to back.
    pub fn remove_copies(&mut self, name: &str, limit: usize) -> Vec<CreatureInstance> {
        let mut removed = Vec::new();
        let mut index = 0;
        while index < self.slots.len() && removed.len() < limit {
            let slot = &self.slots[index];
            if !slot.golden && slot.name() == name {
                removed.push(self.slots.remove(index));
            } else {
                index += 1;
            }
        }
        removed
    }

    pub fn count_copies(&self, name: &str) -> usize {
        self.slots
            .iter()
            .filter(|creature| !creature.golden && creature.name() == name)
            .count()
    }

    pub fn position(&self, id: CreatureId) -> Option<usize> {
        self.slots.iter().position(|creature| creature.id == id)
    }

    pub fn get(&self, id: CreatureId) -> Option<&CreatureInstance> {
        self.slots.iter().find(|creature| creature.id == id)
    }

    pub fn get_mut(&mut self, id: CreatureId) -> Option<&mut CreatureInstance> {
        self.slots.iter_mut().find(|creature| creature.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&CreatureInstance> {
        self.slots.get(index)
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut CreatureInstance> {
        self.slots.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CreatureInstance> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CreatureInstance> {
        self.slots.iter_mut()
    }

    pub fn living_count(&self) -> usize {
        self.slots.iter().filter(|creature| creature.is_alive()).count()
    }

    pub fn as_slice(&self) -> &[CreatureInstance] {
        &self.slots
    }

    pub fn into_creatures(self) -> Vec<CreatureInstance> {
        self.slots
    }

    pub fn replace_all(&mut self, creatures: Vec<CreatureInstance>) {
        self.slots = creatures;
        self.slots.truncate(self.capacity);
    }

    pub fn views(&self) -> Vec<CreatureView> {
        self.slots.iter().map(CreatureInstance::view).collect()
    }
}
