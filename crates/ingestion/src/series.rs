//! Fixed-capacity ring buffer of bars.
//!
//! The newest slot is the open bar. Appending at capacity evicts the oldest
//! slot; prepending (historical backfill) only fills free slots.

use tickbar_core::{Bar, BarRecord, Error, Result};

/// What [`BoundedBarSeries::upsert`] did with a bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Upsert {
    /// Same timestamp as the newest bar; the previous value is returned.
    Replaced(Bar),
    /// Newer than the newest bar; carries the evicted bar, if any.
    Appended(Option<Bar>),
    /// Older than the newest bar; the series is unchanged.
    Stale,
}

/// Bounded, ordered bar series backed by a ring buffer.
#[derive(Debug, Clone)]
pub struct BoundedBarSeries {
    slots: Vec<Option<Bar>>,
    /// Physical index of the oldest bar.
    head: usize,
    len: usize,
}

impl BoundedBarSeries {
    /// Create an empty series. `capacity` must be positive.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::config("bar series capacity must be positive"));
        }
        Ok(Self {
            slots: vec![None; capacity],
            head: 0,
            len: 0,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Free slots left before appends start evicting.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    #[inline]
    fn physical(&self, logical: usize) -> usize {
        (self.head + logical) % self.capacity()
    }

    /// Logical index of the open (newest) bar.
    pub fn open_index(&self) -> Option<usize> {
        self.len.checked_sub(1)
    }

    /// Bar at a logical index, 0 being the oldest.
    pub fn get(&self, index: usize) -> Option<&Bar> {
        if index >= self.len {
            return None;
        }
        self.slots[self.physical(index)].as_ref()
    }

    /// Oldest bar.
    pub fn first(&self) -> Option<&Bar> {
        self.get(0)
    }

    /// Newest bar.
    pub fn last(&self) -> Option<&Bar> {
        self.open_index().and_then(|i| self.get(i))
    }

    /// Mutable access to the open bar. This is the only mutable access.
    pub fn open_bar_mut(&mut self) -> Option<&mut Bar> {
        let index = self.open_index()?;
        let physical = self.physical(index);
        self.slots[physical].as_mut()
    }

    /// Append a bar at the newest end, evicting the oldest when full.
    ///
    /// Returns the evicted bar, if any.
    pub fn push_back(&mut self, bar: Bar) -> Option<Bar> {
        if self.is_full() {
            let evicted = self.slots[self.head].replace(bar);
            self.head = (self.head + 1) % self.capacity();
            evicted
        } else {
            let physical = self.physical(self.len);
            self.slots[physical] = Some(bar);
            self.len += 1;
            None
        }
    }

    /// Insert a bar at the oldest end. Fails (returning the bar) when full.
    pub fn push_front(&mut self, bar: Bar) -> std::result::Result<(), Bar> {
        if self.is_full() {
            return Err(bar);
        }
        self.head = (self.head + self.capacity() - 1) % self.capacity();
        self.slots[self.head] = Some(bar);
        self.len += 1;
        Ok(())
    }

    /// Insert or replace by timestamp, as for exchange klines that are
    /// re-sent while their interval is still open.
    pub fn upsert(&mut self, bar: Bar) -> Upsert {
        let Some(newest) = self.last().map(|b| b.timestamp) else {
            return Upsert::Appended(self.push_back(bar));
        };

        if bar.timestamp > newest {
            Upsert::Appended(self.push_back(bar))
        } else if bar.timestamp == newest {
            match self.open_bar_mut() {
                Some(slot) => Upsert::Replaced(std::mem::replace(slot, bar)),
                None => Upsert::Stale,
            }
        } else {
            Upsert::Stale
        }
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Bar> + '_ {
        (0..self.len).filter_map(move |i| self.slots[self.physical(i)].as_ref())
    }

    /// Copy out the bars, oldest first.
    pub fn to_vec(&self) -> Vec<Bar> {
        self.iter().copied().collect()
    }

    /// Positional records, oldest first.
    pub fn records(&self) -> Vec<BarRecord> {
        self.iter().map(Bar::to_record).collect()
    }

    /// Remove all bars.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}
