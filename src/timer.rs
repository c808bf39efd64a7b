//! Timer storage.
//!
//! Timers live in an arena of slots addressed by stable index. Deletion is
//! lazy: a cancelled timer is tombstoned in place and only physically
//! released (finalizer run, slot recycled) when the next timer-processing
//! pass scans it. This keeps deletion safe while the pass that is walking
//! the arena is the one requesting it.
//!
//! The arena is unordered. Finding the nearest deadline is a full O(n)
//! scan, trading deadline lookup for O(1) scheduling and cancellation.

use crate::clock::WallTime;
use crate::event::{FinalizerProc, TimerAction, TimerId, TimerProc};

/// A live scheduled timer.
pub(crate) struct TimerEntry {
    pub(crate) id: TimerId,
    pub(crate) when: WallTime,
    pub(crate) proc: TimerProc,
    pub(crate) finalizer: Option<FinalizerProc>,
}

/// One arena slot.
pub(crate) enum TimerSlot {
    /// Unused, available for the next `schedule`.
    Free,

    /// A timer eligible for firing.
    Active(TimerEntry),

    /// Marked for removal; never fires again. The finalizer is kept so the
    /// reaping pass can run it exactly once.
    Tombstone {
        id: TimerId,
        finalizer: Option<FinalizerProc>,
    },
}

pub(crate) struct TimerArena {
    pub(crate) slots: Vec<TimerSlot>,
    free: Vec<usize>,
    next_id: u64,
}

impl TimerArena {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedules a timer for `when` and returns its id.
    pub(crate) fn schedule(
        &mut self,
        when: WallTime,
        proc: TimerProc,
        finalizer: Option<FinalizerProc>,
    ) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        let entry = TimerEntry {
            id,
            when,
            proc,
            finalizer,
        };

        match self.free.pop() {
            Some(index) => self.slots[index] = TimerSlot::Active(entry),
            None => self.slots.push(TimerSlot::Active(entry)),
        }

        id
    }

    /// Tombstones the live timer with the given id.
    ///
    /// The slot is not released here; the next processing pass reaps it.
    /// Returns `false` when no live timer matches.
    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        for slot in &mut self.slots {
            if let TimerSlot::Active(entry) = slot
                && entry.id == id
            {
                let finalizer = entry.finalizer.take();
                *slot = TimerSlot::Tombstone { id, finalizer };
                return true;
            }
        }

        false
    }

    /// Releases a tombstoned slot and hands back what the reaper needs to
    /// finalize it. Returns `None` if the slot is not a tombstone.
    pub(crate) fn reap(&mut self, index: usize) -> Option<(TimerId, Option<FinalizerProc>)> {
        if !matches!(self.slots[index], TimerSlot::Tombstone { .. }) {
            return None;
        }

        let slot = std::mem::replace(&mut self.slots[index], TimerSlot::Free);
        self.free.push(index);

        match slot {
            TimerSlot::Tombstone { id, finalizer } => Some((id, finalizer)),
            _ => None,
        }
    }

    /// Applies the callback's verdict to the slot it fired from.
    ///
    /// The callback may have cancelled its own timer (or the slot may have
    /// been recycled for a new one), so the slot is re-checked by id before
    /// anything is written back. A timer that cancelled itself is not
    /// resurrected by a `Again` return.
    pub(crate) fn settle(&mut self, index: usize, id: TimerId, action: TimerAction) {
        if let TimerSlot::Active(entry) = &mut self.slots[index]
            && entry.id == id
        {
            match action {
                TimerAction::Again(delay) => entry.when = WallTime::now().after(delay),
                TimerAction::Stop => {
                    let finalizer = entry.finalizer.take();
                    self.slots[index] = TimerSlot::Tombstone { id, finalizer };
                }
            }
        }
    }

    /// Deadline of the nearest live timer, or `None` when no timer is live.
    pub(crate) fn nearest(&self) -> Option<WallTime> {
        let mut nearest = None;

        for slot in &self.slots {
            if let TimerSlot::Active(entry) = slot {
                match nearest {
                    Some(when) if entry.when >= when => {}
                    _ => nearest = Some(entry.when),
                }
            }
        }

        nearest
    }

    /// Moves every live timer's deadline to `now`, making all of them
    /// immediately due. Used to drain pending timers on shutdown.
    pub(crate) fn make_all_due(&mut self, now: WallTime) {
        for slot in &mut self.slots {
            if let TimerSlot::Active(entry) = slot {
                entry.when = now;
            }
        }
    }

    /// Clock-regression response: zero the seconds field of every live
    /// deadline so all pending timers fire on the next pass instead of
    /// waiting out a clock jump.
    pub(crate) fn rewind_seconds(&mut self) {
        for slot in &mut self.slots {
            if let TimerSlot::Active(entry) = slot {
                entry.when.sec = 0;
            }
        }
    }

    /// Ids at or above this value were issued after the current processing
    /// pass captured it, and must not fire within that pass.
    pub(crate) fn horizon(&self) -> u64 {
        self.next_id
    }
}
