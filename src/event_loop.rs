//! The event-loop context and its dispatch cycle.
//!
//! An [`EventLoop`] owns a dense file-event table indexed by descriptor
//! value, a timer arena, a reusable fired-event buffer and one polling
//! backend. The embedding application registers interests and timers, then
//! repeatedly calls [`EventLoop::process_events`]; each call performs one
//! bounded wait in the poller and synchronously runs the callbacks for
//! whatever became ready or due.
//!
//! Everything is single-threaded and cooperative. Callbacks receive the
//! loop by `&mut` and may freely re-register, unregister and (re)schedule —
//! including the very descriptor or timer that is firing. The dispatch code
//! re-reads slot state before every invocation and timers are removed
//! lazily, so no callback ever observes a dangling entry.

use crate::clock::WallTime;
use crate::error::{Error, Result};
use crate::event::{
    DispatchFlags, EventMask, FileProc, FinalizerProc, Fired, TimerId, TimerProc,
};
use crate::poller::{Poller, default_poller};
use crate::timer::{TimerArena, TimerSlot};

use log::{debug, warn};
use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::Duration;

/// One entry of the file-event table.
struct FileSlot {
    mask: EventMask,
    read_proc: Option<FileProc>,
    write_proc: Option<FileProc>,
}

impl FileSlot {
    fn empty() -> Self {
        Self {
            mask: EventMask::empty(),
            read_proc: None,
            write_proc: None,
        }
    }
}

/// What the timer walk decided to do with one slot, captured before any
/// callback runs so the arena is not borrowed across the invocation.
enum TimerStep {
    Idle,
    Reap,
    Fire { id: TimerId, proc: TimerProc },
}

pub struct EventLoop {
    /// Capacity: highest trackable descriptor value plus one.
    setsize: usize,

    /// Highest descriptor with a non-empty mask, `None` when no slot is
    /// registered.
    maxfd: Option<RawFd>,

    /// Wall-clock second observed by the previous timer pass, for clock
    /// regression detection.
    last_clock_sec: i64,

    /// File-event table, indexed by descriptor value.
    events: Vec<FileSlot>,

    /// Scratch buffer the poller fills every cycle.
    fired: Vec<Fired>,

    timers: TimerArena,

    poller: Box<dyn Poller>,
}

impl EventLoop {
    /// Creates a loop able to track descriptors `0..setsize`, polling
    /// through the platform's default backend.
    pub fn new(setsize: usize) -> Result<Self> {
        Self::with_poller(setsize, default_poller(setsize)?)
    }

    /// Creates a loop around a caller-supplied poller.
    ///
    /// Fails atomically: on any error the partially built tables are
    /// dropped and nothing of the loop survives.
    pub fn with_poller(setsize: usize, poller: Box<dyn Poller>) -> Result<Self> {
        let mut events = Vec::new();
        events.try_reserve_exact(setsize)?;
        events.resize_with(setsize, FileSlot::empty);

        let mut fired = Vec::new();
        fired.try_reserve_exact(setsize)?;

        debug!(
            "event loop created: capacity {setsize}, poller {}",
            poller.name()
        );

        Ok(Self {
            setsize,
            maxfd: None,
            last_clock_sec: WallTime::now().sec,
            events,
            fired,
            timers: TimerArena::new(),
            poller,
        })
    }

    /// The current capacity (highest trackable descriptor plus one).
    pub fn capacity(&self) -> usize {
        self.setsize
    }

    /// The highest descriptor currently registered, if any.
    pub fn max_descriptor(&self) -> Option<RawFd> {
        self.maxfd
    }

    /// Grows or shrinks the tracked descriptor range.
    ///
    /// A no-op when the capacity is unchanged. Fails, leaving every table
    /// untouched, when a registered descriptor would fall outside the new
    /// range or when the poller cannot resize.
    pub fn resize(&mut self, setsize: usize) -> Result<()> {
        if setsize == self.setsize {
            return Ok(());
        }

        if let Some(highest) = self.maxfd
            && highest as usize >= setsize
        {
            return Err(Error::CapacityConflict {
                requested: setsize,
                highest,
            });
        }

        self.poller.resize(setsize)?;

        if setsize > self.setsize {
            self.events.try_reserve_exact(setsize - self.setsize)?;
            self.events.resize_with(setsize, FileSlot::empty);
        } else {
            self.events.truncate(setsize);
            self.events.shrink_to_fit();
        }

        self.fired.clear();
        self.fired.shrink_to(setsize);
        self.fired.try_reserve_exact(setsize)?;

        debug!("event loop resized: capacity {} -> {setsize}", self.setsize);
        self.setsize = setsize;

        Ok(())
    }

    /// Registers interest in `mask` for a descriptor and installs `proc`
    /// as the callback for each requested direction.
    ///
    /// Mask bits merge: adding `READABLE` leaves an earlier `WRITABLE`
    /// registration (and its callback) in place.
    pub fn add_file_event(&mut self, fd: RawFd, mask: EventMask, proc: FileProc) -> Result<()> {
        self.install_file_event(fd, mask, proc, false)
    }

    /// Same merge semantics as [`add_file_event`](Self::add_file_event),
    /// for callers updating a registration they expect to already exist.
    pub fn update_file_event(&mut self, fd: RawFd, mask: EventMask, proc: FileProc) -> Result<()> {
        self.install_file_event(fd, mask, proc, true)
    }

    fn install_file_event(
        &mut self,
        fd: RawFd,
        mask: EventMask,
        proc: FileProc,
        update: bool,
    ) -> Result<()> {
        if fd < 0 || fd as usize >= self.setsize {
            return Err(Error::OutOfRange(fd));
        }

        let prior = self.events[fd as usize].mask;
        if update {
            self.poller.update(fd, mask, prior)?;
        } else {
            self.poller.add(fd, mask, prior)?;
        }

        let slot = &mut self.events[fd as usize];
        slot.mask |= mask;
        if mask.contains(EventMask::READABLE) {
            slot.read_proc = Some(proc.clone());
        }
        if mask.contains(EventMask::WRITABLE) {
            slot.write_proc = Some(proc);
        }

        if self.maxfd.is_none_or(|highest| fd > highest) {
            self.maxfd = Some(fd);
        }

        Ok(())
    }

    /// Removes the given interest bits from a descriptor.
    ///
    /// Silently does nothing when the descriptor is out of range or was
    /// never registered. When the unregistered descriptor was the highest
    /// active one and its slot became empty, the next-highest registered
    /// descriptor is found by scanning downward.
    pub fn delete_file_event(&mut self, fd: RawFd, mask: EventMask) {
        if fd < 0 || fd as usize >= self.setsize {
            return;
        }

        let slot = &mut self.events[fd as usize];
        if slot.mask.is_empty() {
            return;
        }

        slot.mask &= !mask;
        if !slot.mask.contains(EventMask::READABLE) {
            slot.read_proc = None;
        }
        if !slot.mask.contains(EventMask::WRITABLE) {
            slot.write_proc = None;
        }
        let remaining = slot.mask;

        if self.maxfd == Some(fd) && remaining.is_empty() {
            self.maxfd = (0..fd)
                .rev()
                .find(|&below| !self.events[below as usize].mask.is_empty());
        }

        self.poller.delete(fd, mask, remaining);
    }

    /// The interest mask currently registered for a descriptor; empty when
    /// the descriptor is out of range or unregistered.
    pub fn file_events(&self, fd: RawFd) -> EventMask {
        if fd < 0 {
            return EventMask::empty();
        }

        self.events
            .get(fd as usize)
            .map_or(EventMask::empty(), |slot| slot.mask)
    }

    /// Schedules `proc` to fire once `delay` has elapsed.
    ///
    /// The callback's return value decides what happens next: rescheduling
    /// after a fresh delay, or no further firings. The optional finalizer
    /// runs exactly once when the timer is physically removed.
    pub fn add_timer(
        &mut self,
        delay: Duration,
        proc: TimerProc,
        finalizer: Option<FinalizerProc>,
    ) -> TimerId {
        let when = WallTime::now().after(delay);
        self.timers.schedule(when, proc, finalizer)
    }

    /// Marks the timer for removal. It will not fire again; the slot is
    /// physically reaped (and the finalizer run) by the next
    /// timer-processing pass.
    pub fn delete_timer(&mut self, id: TimerId) -> Result<()> {
        if self.timers.cancel(id) {
            Ok(())
        } else {
            Err(Error::TimerNotFound(id))
        }
    }

    /// Makes every pending timer immediately due, regardless of its
    /// scheduled deadline. Typically used to drain timers on shutdown.
    pub fn fire_all_timers(&mut self) {
        self.timers.make_all_due(WallTime::now());
    }

    /// The active poller's name. Diagnostic only.
    pub fn poller_name(&self) -> &'static str {
        self.poller.name()
    }

    /// The poller's native handle, for embedding this loop in an outer
    /// multiplexer. `None` when the poller has no single handle.
    pub fn poller_fd(&self) -> Option<RawFd> {
        self.poller.raw_fd()
    }

    /// Runs one dispatch cycle: one bounded wait in the poller, then the
    /// callbacks for every descriptor that fired, then — when time events
    /// are requested — one timer-processing pass.
    ///
    /// `timeout` governs the wait only when no timer does: `None` blocks
    /// indefinitely, `Some(ZERO)` polls without blocking, any other value
    /// bounds the wait. When time events are requested and a timer is
    /// pending, the wait lasts exactly until the nearest deadline.
    ///
    /// Returns the number of processed events: each fired descriptor counts
    /// once (however many of its callbacks ran) plus each fired timer.
    pub fn process_events(
        &mut self,
        flags: DispatchFlags,
        timeout: Option<Duration>,
    ) -> Result<usize> {
        let mut processed = 0;

        if !flags.intersects(DispatchFlags::ALL_EVENTS) {
            return Ok(0);
        }

        let want_timers = flags.contains(DispatchFlags::TIME_EVENTS);
        let may_sleep = timeout != Some(Duration::ZERO);

        // The poller runs even with no descriptor registered, as long as
        // timer processing is allowed to sleep until the nearest deadline.
        if self.maxfd.is_some() || (want_timers && may_sleep) {
            let mut wait = timeout;

            if want_timers
                && may_sleep
                && let Some(deadline) = self.timers.nearest()
            {
                wait = Some(WallTime::now().until(deadline));
            }

            let count = self.poller.poll(&mut self.fired, wait)?;

            for index in 0..count {
                let Fired { fd, mask } = self.fired[index];
                let mut read_fired = false;

                // Re-read the slot: an earlier callback in this cycle may
                // have unregistered bits that already fired.
                let Some(slot) = self.events.get(fd as usize) else {
                    continue;
                };

                if (slot.mask & mask).contains(EventMask::READABLE) {
                    read_fired = true;
                    if let Some(proc) = slot.read_proc.clone() {
                        proc(self, fd, mask);
                    }
                }

                let Some(slot) = self.events.get(fd as usize) else {
                    continue;
                };

                if (slot.mask & mask).contains(EventMask::WRITABLE)
                    && let Some(proc) = slot.write_proc.clone()
                {
                    // One handler registered for both directions runs once
                    // per cycle. Reference identity, on purpose: two
                    // distinct callbacks with equal behavior both run.
                    let same_handler = read_fired
                        && slot
                            .read_proc
                            .as_ref()
                            .is_some_and(|read| Rc::ptr_eq(read, &proc));

                    if !same_handler {
                        proc(self, fd, mask);
                    }
                }

                processed += 1;
            }
        }

        if want_timers {
            processed += self.process_timers();
        }

        Ok(processed)
    }

    /// One pass over the timer arena: reap tombstones, fire due timers,
    /// apply their verdicts. Returns how many timers fired.
    fn process_timers(&mut self) -> usize {
        let mut processed = 0;

        let now_sec = WallTime::now().sec;
        if now_sec < self.last_clock_sec {
            // Firing early is less dangerous than a timer stalled behind a
            // clock that jumped back.
            warn!("system clock moved backward; forcing pending timers due");
            self.timers.rewind_seconds();
        }
        self.last_clock_sec = now_sec;

        // Timers scheduled by callbacks during this very pass carry ids at
        // or past the horizon and must wait for the next pass.
        let horizon = self.timers.horizon();

        let mut index = 0;
        while index < self.timers.slots.len() {
            let step = match &self.timers.slots[index] {
                TimerSlot::Free => TimerStep::Idle,
                TimerSlot::Tombstone { .. } => TimerStep::Reap,
                TimerSlot::Active(entry) => {
                    if entry.id.0 >= horizon {
                        TimerStep::Idle
                    } else if WallTime::now() >= entry.when {
                        TimerStep::Fire {
                            id: entry.id,
                            proc: entry.proc.clone(),
                        }
                    } else {
                        TimerStep::Idle
                    }
                }
            };

            match step {
                TimerStep::Idle => {}
                TimerStep::Reap => {
                    if let Some((id, finalizer)) = self.timers.reap(index)
                        && let Some(finalizer) = finalizer
                    {
                        finalizer(self, id);
                    }
                }
                TimerStep::Fire { id, proc } => {
                    let action = proc(self, id);
                    processed += 1;
                    self.timers.settle(index, id, action);
                }
            }

            index += 1;
        }

        processed
    }
}
