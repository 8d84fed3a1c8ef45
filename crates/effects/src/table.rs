//! Fixed-capacity effect slot tables.

use serde::{Deserialize, Serialize};

use crate::classify::EffectId;
use crate::context::EffectRoutine;
use crate::decorator::TimingDecorator;
use crate::slot::EffectData;

/// Registration result handed to engine code when no slot was reserved.
pub const NO_SLOT: u16 = 0xFFFF;

/// The three effect tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Ten slots of character movement effects.
    Effect10,
    /// Sixty slots of general effects.
    Effect60,
    /// Hundred slots of battle-level effects. Only ticked while the battle
    /// main loop runs.
    Effect100,
}

impl TableKind {
    /// All tables in tick order.
    pub const ALL: [TableKind; 3] = [TableKind::Effect10, TableKind::Effect60, TableKind::Effect100];

    /// Number of slots.
    pub const fn capacity(self) -> usize {
        match self {
            TableKind::Effect10 => 10,
            TableKind::Effect60 => 60,
            TableKind::Effect100 => 100,
        }
    }

    /// Stable name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::Effect10 => "effect10",
            TableKind::Effect60 => "effect60",
            TableKind::Effect100 => "effect100",
        }
    }
}

pub(crate) struct Occupant {
    pub(crate) id: EffectId,
    pub(crate) routine: Box<dyn EffectRoutine>,
    pub(crate) decorator: TimingDecorator,
    pub(crate) first_frame: bool,
}

pub(crate) enum Slot {
    Free,
    Occupied(Occupant),
    /// Reserved while its routine is running.
    InFlight(EffectId),
}

impl Slot {
    fn id(&self) -> Option<EffectId> {
        match self {
            Slot::Free => None,
            Slot::Occupied(occupant) => Some(occupant.id),
            Slot::InFlight(id) => Some(*id),
        }
    }
}

/// One effect table: slots, their data blocks, and the reservation cursor.
pub struct EffectTable {
    kind: TableKind,
    slots: Vec<Slot>,
    pub(crate) data: Vec<EffectData>,
    cursor: usize,
    live: u16,
}

impl std::fmt::Debug for EffectTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectTable")
            .field("kind", &self.kind)
            .field("live", &self.live)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl EffectTable {
    /// Empty table of `kind`.
    pub fn new(kind: TableKind) -> Self {
        let capacity = kind.capacity();
        Self {
            kind,
            slots: (0..capacity).map(|_| Slot::Free).collect(),
            data: vec![EffectData::default(); capacity],
            cursor: 0,
            live: 0,
        }
    }

    /// Which table this is.
    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Occupied slots, including the one currently running.
    pub fn live_count(&self) -> u16 {
        self.live
    }

    /// Slot index being processed, `0` outside a tick.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether slot `index` is free. Out of range indices are not free.
    pub fn is_free(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Slot::Free))
    }

    /// Identity of the effect in slot `index`.
    pub fn effect_id(&self, index: usize) -> Option<EffectId> {
        self.slots.get(index).and_then(Slot::id)
    }

    /// Data block of slot `index`.
    pub fn data(&self, index: usize) -> Option<&EffectData> {
        self.data.get(index)
    }

    /// Mutable data block of slot `index`.
    pub fn data_mut(&mut self, index: usize) -> Option<&mut EffectData> {
        self.data.get_mut(index)
    }

    /// Decorator of the occupant in slot `index`, when not running.
    pub fn decorator(&self, index: usize) -> Option<&TimingDecorator> {
        match self.slots.get(index) {
            Some(Slot::Occupied(occupant)) => Some(&occupant.decorator),
            _ => None,
        }
    }

    pub(crate) fn set_cursor(&mut self, index: usize) {
        self.cursor = index;
    }

    /// First free slot at or after `from`.
    pub(crate) fn find_free(&self, from: usize) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(index, slot)| matches!(slot, Slot::Free).then_some(index))
    }

    /// Place a fresh occupant in `index`, replacing whatever was there.
    pub(crate) fn occupy(&mut self, index: usize, id: EffectId, routine: Box<dyn EffectRoutine>) {
        let was_free = matches!(self.slots[index], Slot::Free);
        self.slots[index] = Slot::Occupied(Occupant {
            id,
            routine,
            decorator: TimingDecorator::no_op(),
            first_frame: true,
        });
        self.data[index].state = self.cursor as u16;
        if was_free {
            self.live = self.live.saturating_add(1);
        }
    }

    pub(crate) fn take(&mut self, index: usize) -> Option<Occupant> {
        let id = match self.slots.get(index)? {
            Slot::Occupied(occupant) => occupant.id,
            _ => return None,
        };
        match std::mem::replace(&mut self.slots[index], Slot::InFlight(id)) {
            Slot::Occupied(occupant) => Some(occupant),
            _ => None,
        }
    }

    pub(crate) fn restore(&mut self, index: usize, occupant: Occupant) {
        self.slots[index] = Slot::Occupied(occupant);
    }

    /// Release slot `index` and clear its data.
    pub(crate) fn release(&mut self, index: usize) {
        self.slots[index] = Slot::Free;
        self.data[index] = EffectData::default();
        self.live = self.live.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle() -> Box<dyn EffectRoutine> {
        Box::new(|_: &mut crate::context::EffectContext<'_>| {})
    }

    #[test]
    fn capacities() {
        assert_eq!(EffectTable::new(TableKind::Effect10).capacity(), 10);
        assert_eq!(EffectTable::new(TableKind::Effect60).capacity(), 60);
        assert_eq!(EffectTable::new(TableKind::Effect100).capacity(), 100);
    }

    #[test]
    fn occupy_take_restore_release() {
        let mut table = EffectTable::new(TableKind::Effect10);
        let index = table.find_free(0).unwrap();
        table.occupy(index, EffectId::MoveToTarget, idle());
        assert_eq!(table.live_count(), 1);
        assert!(!table.is_free(index));

        let occupant = table.take(index).unwrap();
        assert!(!table.is_free(index), "running slot stays reserved");
        assert_eq!(table.effect_id(index), Some(EffectId::MoveToTarget));
        assert_eq!(table.find_free(0), Some(1));
        table.restore(index, occupant);

        table.data_mut(index).unwrap().frames = 9;
        table.release(index);
        assert!(table.is_free(index));
        assert_eq!(table.live_count(), 0);
        assert_eq!(table.data(index), Some(&EffectData::default()));
    }

    #[test]
    fn free_search_starts_at_cursor() {
        let mut table = EffectTable::new(TableKind::Effect10);
        table.occupy(4, EffectId::Custom(0), idle());
        assert_eq!(table.find_free(0), Some(0));
        assert_eq!(table.find_free(4), Some(5));
        table.occupy(9, EffectId::Custom(0), idle());
        assert_eq!(table.find_free(9), None);
        assert_eq!(table.find_free(10), None);
    }

    #[test]
    fn reoccupying_does_not_double_count() {
        let mut table = EffectTable::new(TableKind::Effect100);
        table.occupy(99, EffectId::KotrCamera, idle());
        table.occupy(99, EffectId::KotrCamera, idle());
        assert_eq!(table.live_count(), 1);
    }

    #[test]
    fn out_of_range_is_not_free() {
        let table = EffectTable::new(TableKind::Effect10);
        assert!(!table.is_free(10));
        assert_eq!(table.data(10), None);
    }
}
