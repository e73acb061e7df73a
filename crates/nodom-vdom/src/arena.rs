//! Generational Arena
//!
//! Slot map with generation-checked handles. Compiled templates keep their
//! expressions and event descriptors here; a handle from a discarded template
//! generation never resolves to a newer entry.

/// Generational index for safe references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenIndex {
    pub index: u32,
    pub generation: u32,
}

/// Generational arena (slot map)
#[derive(Debug, Clone, PartialEq)]
pub struct GenArena<T> {
    items: Vec<Option<(T, u32)>>,
    free_list: Vec<u32>,
    generations: Vec<u32>,
}

impl<T> GenArena<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            free_list: Vec::new(),
            generations: Vec::new(),
        }
    }

    /// Insert item
    pub fn insert(&mut self, value: T) -> GenIndex {
        if let Some(index) = self.free_list.pop() {
            let generation = self.generations[index as usize];
            self.items[index as usize] = Some((value, generation));
            GenIndex { index, generation }
        } else {
            let index = self.items.len() as u32;
            self.items.push(Some((value, 0)));
            self.generations.push(0);
            GenIndex {
                index,
                generation: 0,
            }
        }
    }

    /// Get item
    pub fn get(&self, idx: GenIndex) -> Option<&T> {
        self.items
            .get(idx.index as usize)
            .and_then(|opt| opt.as_ref())
            .filter(|(_, g)| *g == idx.generation)
            .map(|(val, _)| val)
    }

    pub fn get_mut(&mut self, idx: GenIndex) -> Option<&mut T> {
        self.items
            .get_mut(idx.index as usize)
            .and_then(|opt| opt.as_mut())
            .filter(|(_, g)| *g == idx.generation)
            .map(|(val, _)| val)
    }

    /// Remove item
    pub fn remove(&mut self, idx: GenIndex) -> Option<T> {
        let slot = self.items.get_mut(idx.index as usize)?;
        if !matches!(slot, Some((_, g)) if *g == idx.generation) {
            return None;
        }
        let (val, _) = slot.take()?;
        self.generations[idx.index as usize] += 1;
        self.free_list.push(idx.index);
        Some(val)
    }

    /// Drop every entry; outstanding handles become stale
    pub fn clear(&mut self) {
        for (index, slot) in self.items.iter_mut().enumerate() {
            if slot.take().is_some() {
                self.generations[index] += 1;
                self.free_list.push(index as u32);
            }
        }
    }

    /// Live entries with their handles
    pub fn iter(&self) -> impl Iterator<Item = (GenIndex, &T)> {
        self.items.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref().map(|(val, generation)| {
                (
                    GenIndex {
                        index: index as u32,
                        generation: *generation,
                    },
                    val,
                )
            })
        })
    }

    pub fn len(&self) -> usize {
        self.items.iter().filter(|i| i.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for GenArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_arena() {
        let mut arena = GenArena::new();
        let idx = arena.insert(42);

        assert_eq!(arena.get(idx), Some(&42));
        arena.remove(idx);
        assert_eq!(arena.get(idx), None);
    }

    #[test]
    fn test_reused_slot_rejects_stale_handle() {
        let mut arena = GenArena::new();
        let old = arena.insert("a");
        arena.remove(old);
        let new = arena.insert("b");

        assert_eq!(new.index, old.index);
        assert_eq!(arena.get(old), None);
        assert_eq!(arena.get(new), Some(&"b"));
    }

    #[test]
    fn test_clear_invalidates_all() {
        let mut arena = GenArena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        arena.clear();

        assert!(arena.is_empty());
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), None);
        assert_eq!(arena.iter().count(), 0);
    }
}
