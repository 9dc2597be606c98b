use serde::{Deserialize, Serialize};

/// Generation-tagged handle to a slot in an [`Arena`].
///
/// A handle stays valid until its slot is released; the slot's generation is
/// bumped on release so old handles can be told apart from the slot's next
/// occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle {
    pub index: u32,
    pub generation: u32,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    /// Position in the live list, `None` when the slot is dormant or free.
    live_position: Option<usize>,
    value: T,
}

/// Slab arena with a free list and a dense list of live slots.
///
/// Released slots keep their value so its heap buffers can be recycled by
/// the next occupant: [`reserve`](Arena::reserve) hands back a dormant slot
/// whose contents the caller overwrites in place (typically with
/// `clone_from`) before calling [`activate`](Arena::activate). Live
/// iteration is over a dense index list and removal is O(1) via swap-remove.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: Vec<u32>,
}

impl<T: Default> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: Vec::new(),
        }
    }

    /// Take a slot for a new value, recycling a free slot when one exists.
    ///
    /// The returned slot is dormant: it is neither live nor free until it is
    /// passed to [`activate`](Self::activate) or [`abandon`](Self::abandon).
    pub fn reserve(&mut self) -> u32 {
        if let Some(index) = self.free.pop() {
            return index;
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            live_position: None,
            value: T::default(),
        });
        index
    }

    /// Make a reserved slot live and return its handle.
    pub fn activate(&mut self, index: u32) -> Handle {
        let slot = &mut self.slots[index as usize];
        debug_assert!(slot.live_position.is_none(), "slot {index} activated twice");
        slot.live_position = Some(self.live.len());
        self.live.push(index);
        Handle {
            index,
            generation: slot.generation,
        }
    }

    /// Return a reserved slot to the free list without activating it.
    pub fn abandon(&mut self, index: u32) {
        debug_assert!(self.slots[index as usize].live_position.is_none());
        self.free.push(index);
    }

    /// Mutable access to a reserved (dormant) slot.
    #[inline]
    pub fn dormant_mut(&mut self, index: u32) -> &mut T {
        &mut self.slots[index as usize].value
    }

    /// Release a live slot. Returns `false` if the handle was not live.
    pub fn release(&mut self, handle: Handle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation {
            return false;
        }
        let Some(position) = slot.live_position.take() else {
            return false;
        };
        slot.generation = slot.generation.wrapping_add(1);

        self.live.swap_remove(position);
        if let Some(&moved) = self.live.get(position) {
            self.slots[moved as usize].live_position = Some(position);
        }
        self.free.push(handle.index);
        true
    }

    #[inline]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.live_position.is_some())
            .map(|slot| &slot.value)
    }

    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.live_position.is_some())
            .map(|slot| &mut slot.value)
    }

    /// Borrow a live slot immutably and a dormant slot mutably at once.
    ///
    /// Returns `None` if `live` is stale or both refer to the same slot.
    pub fn live_and_dormant(&mut self, live: Handle, dormant: u32) -> Option<(&T, &mut T)> {
        self.get(live)?;
        let (a, b) = (live.index as usize, dormant as usize);
        if a == b {
            return None;
        }
        if a < b {
            let (head, tail) = self.slots.split_at_mut(b);
            Some((&head[a].value, &mut tail[0].value))
        } else {
            let (head, tail) = self.slots.split_at_mut(a);
            Some((&tail[0].value, &mut head[b].value))
        }
    }

    /// Iterate over live slots in live-list order.
    pub fn iter_live(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.live.iter().map(move |&index| {
            let slot = &self.slots[index as usize];
            (
                Handle {
                    index,
                    generation: slot.generation,
                },
                &slot.value,
            )
        })
    }

    /// Iterate mutably over live slot values.
    pub fn values_live_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.slots
            .iter_mut()
            .filter(|slot| slot.live_position.is_some())
            .map(|slot| &mut slot.value)
    }

    #[inline]
    pub fn live_len(&self) -> usize {
        self.live.len()
    }

    #[inline]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Total slots ever allocated.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Indices currently on the free list.
    pub fn free_indices(&self) -> &[u32] {
        &self.free
    }
}

impl<T: Default> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
