//! Slot tables tracking satellite object creation per gateway instance
//!
//! Each gateway instance owns one [`SlotTable`]; every slot records one
//! satellite object's creation attempt. A slot is `Free`, `Created` or
//! `Failed`. `Failed` is kept distinct from `Free` so a create that ran out
//! of engine capacity is not retried until a deletion frees some.
//!
//! All tables live in a [`SlotArena`] allocated once at start-up and
//! addressed by [`TableId`].

use lwm2m_core::TableId;
use serde::Serialize;
use tracing::debug;

/// Creation state of one satellite object instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Slot {
    /// Available for a new satellite
    #[default]
    Free,
    /// The object instance exists in the engine
    Created { obj_type: u16, instance: u16 },
    /// The engine refused to create the object instance
    Failed { obj_type: u16, instance: u16 },
}

impl Slot {
    pub fn is_free(&self) -> bool {
        matches!(self, Slot::Free)
    }

    /// `(type, instance)` of an occupied slot
    pub fn key(&self) -> Option<(u16, u16)> {
        match *self {
            Slot::Free => None,
            Slot::Created { obj_type, instance } | Slot::Failed { obj_type, instance } => {
                Some((obj_type, instance))
            }
        }
    }

    pub fn matches(&self, obj_type: u16, instance: u16) -> bool {
        self.key() == Some((obj_type, instance))
    }
}

/// Fixed-capacity slots for one gateway instance
#[derive(Debug, Clone)]
pub struct SlotTable {
    base_instance: Option<u16>,
    slots: Vec<Slot>,
}

impl SlotTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            base_instance: None,
            slots: vec![Slot::Free; capacity],
        }
    }

    /// Base instance this table was assigned to, if any
    pub fn base_instance(&self) -> Option<u16> {
        self.base_instance
    }

    pub fn stamp(&mut self, base_instance: u16) {
        self.base_instance = Some(base_instance);
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Position of the occupied slot for `(type, instance)`
    pub fn find(&self, obj_type: u16, instance: u16) -> Option<usize> {
        self.slots.iter().position(|s| s.matches(obj_type, instance))
    }

    /// Position of the first free slot
    pub fn find_free(&self) -> Option<usize> {
        self.slots.iter().position(Slot::is_free)
    }

    pub fn get(&self, pos: usize) -> Option<Slot> {
        self.slots.get(pos).copied()
    }

    pub fn set(&mut self, pos: usize, slot: Slot) {
        if let Some(entry) = self.slots.get_mut(pos) {
            *entry = slot;
        }
    }

    /// Free the slot for `(type, instance)` and return what it held
    pub fn release(&mut self, obj_type: u16, instance: u16) -> Option<Slot> {
        let pos = self.find(obj_type, instance)?;
        debug!(obj_type, instance, "Reset slot");
        Some(std::mem::take(&mut self.slots[pos]))
    }

    /// Re-open every failed slot of `obj_type`. Returns how many were reset.
    pub fn reclaim_failed(&mut self, obj_type: u16) -> usize {
        let mut count = 0;
        for slot in self.slots.iter_mut() {
            if matches!(*slot, Slot::Failed { obj_type: t, .. } if t == obj_type) {
                *slot = Slot::Free;
                count += 1;
            }
        }
        count
    }

    /// `(type, instance)` of every created slot, in slot order
    pub fn created(&self) -> Vec<(u16, u16)> {
        self.slots
            .iter()
            .filter_map(|s| match *s {
                Slot::Created { obj_type, instance } => Some((obj_type, instance)),
                _ => None,
            })
            .collect()
    }

    /// Free every slot, created or not
    pub fn reset_all(&mut self) {
        self.slots.fill(Slot::Free);
    }
}

/// Every slot table the manager owns, one per gateway index
#[derive(Debug)]
pub struct SlotArena {
    tables: Vec<SlotTable>,
}

impl SlotArena {
    pub fn new(tables: usize, nodes_per_table: usize) -> Self {
        Self {
            tables: (0..tables).map(|_| SlotTable::new(nodes_per_table)).collect(),
        }
    }

    pub fn get(&self, id: TableId) -> Option<&SlotTable> {
        self.tables.get(id.0)
    }

    pub fn get_mut(&mut self, id: TableId) -> Option<&mut SlotTable> {
        self.tables.get_mut(id.0)
    }

    /// Re-open failed slots of `obj_type` in every table
    pub fn reclaim_failed(&mut self, obj_type: u16) -> usize {
        let count = self
            .tables
            .iter_mut()
            .map(|table| table.reclaim_failed(obj_type))
            .sum();
        debug!(obj_type, count, "Reset slots in the create fail state");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_table_is_free_and_unstamped() {
        let table = SlotTable::new(4);
        assert_eq!(table.slots().len(), 4);
        assert_eq!(table.base_instance(), None);
        assert!(table.slots().iter().all(Slot::is_free));
        assert_eq!(table.find_free(), Some(0));
    }

    #[test]
    fn test_find_ignores_free_slots() {
        let mut table = SlotTable::new(2);
        table.set(
            1,
            Slot::Created {
                obj_type: 3303,
                instance: 100,
            },
        );
        assert_eq!(table.find(3303, 100), Some(1));
        assert_eq!(table.find(3303, 101), None);
        // A free slot never matches, whatever it held before
        assert_eq!(table.find(0, 0), None);
        assert_eq!(table.find_free(), Some(0));
    }

    #[test]
    fn test_release() {
        let mut table = SlotTable::new(2);
        table.set(
            0,
            Slot::Failed {
                obj_type: 3303,
                instance: 100,
            },
        );
        assert_eq!(
            table.release(3303, 100),
            Some(Slot::Failed {
                obj_type: 3303,
                instance: 100
            })
        );
        assert_eq!(table.release(3303, 100), None);
        assert_eq!(table.get(0), Some(Slot::Free));
    }

    #[test]
    fn test_reclaim_failed_is_type_scoped() {
        let mut table = SlotTable::new(3);
        table.set(
            0,
            Slot::Failed {
                obj_type: 3303,
                instance: 100,
            },
        );
        table.set(
            1,
            Slot::Failed {
                obj_type: 3304,
                instance: 100,
            },
        );
        table.set(
            2,
            Slot::Created {
                obj_type: 3303,
                instance: 101,
            },
        );

        assert_eq!(table.reclaim_failed(3303), 1);
        assert_eq!(
            table.slots(),
            &[
                Slot::Free,
                Slot::Failed {
                    obj_type: 3304,
                    instance: 100
                },
                Slot::Created {
                    obj_type: 3303,
                    instance: 101
                },
            ]
        );
    }

    #[test]
    fn test_arena_reclaim_spans_tables() {
        let mut arena = SlotArena::new(3, 2);
        for id in [TableId(0), TableId(2)] {
            arena.get_mut(id).unwrap().set(
                1,
                Slot::Failed {
                    obj_type: 3303,
                    instance: 7,
                },
            );
        }
        assert_eq!(arena.reclaim_failed(3303), 2);
        assert_eq!(arena.reclaim_failed(3303), 0);
        assert!(arena.get(TableId(3)).is_none());
    }

    #[test]
    fn test_created_and_reset_all() {
        let mut table = SlotTable::new(3);
        table.set(
            0,
            Slot::Created {
                obj_type: 3303,
                instance: 100,
            },
        );
        table.set(
            1,
            Slot::Failed {
                obj_type: 3303,
                instance: 101,
            },
        );
        table.set(
            2,
            Slot::Created {
                obj_type: 3304,
                instance: 102,
            },
        );
        assert_eq!(table.created(), vec![(3303, 100), (3304, 102)]);

        table.reset_all();
        assert!(table.slots().iter().all(Slot::is_free));
    }
}
