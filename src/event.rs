//! Event masks, dispatch flags and callback types.
//!
//! Everything the embedding application exchanges with the event loop is
//! defined here: the readiness mask attached to a descriptor, the flags
//! selecting which event categories a dispatch cycle processes, the
//! per-cycle readiness report, and the callback aliases.

use crate::event_loop::EventLoop;

use bitflags::bitflags;
use std::fmt;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::Duration;

bitflags! {
    /// Readiness directions monitored on a descriptor.
    ///
    /// An empty mask means the slot is not registered. Registration merges
    /// masks bitwise, so adding `READABLE` never clears a previously
    /// registered `WRITABLE` interest.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventMask: u8 {
        const READABLE = 0b01;
        const WRITABLE = 0b10;
    }
}

bitflags! {
    /// Event categories processed by one dispatch cycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DispatchFlags: u8 {
        const FILE_EVENTS = 0b01;
        const TIME_EVENTS = 0b10;
        const ALL_EVENTS  = 0b11;
    }
}

/// One cycle's readiness report for one descriptor.
///
/// Produced by the poller into the loop's reusable buffer and consumed
/// immediately by the dispatch cycle; never retained across cycles.
#[derive(Debug, Clone, Copy)]
pub struct Fired {
    pub fd: RawFd,
    pub mask: EventMask,
}

/// Identifier of a scheduled timer.
///
/// Ids are issued by a per-loop monotonically increasing counter and are
/// never reused within a loop, even after the timer is reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a timer callback wants to happen to its timer next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Reschedule the timer to fire again after the given delay,
    /// measured from the moment the callback returned.
    Again(Duration),

    /// No further firings. The timer is tombstoned and reaped (its
    /// finalizer runs) on a later timer-processing pass.
    Stop,
}

/// Callback invoked when a registered descriptor becomes ready.
///
/// Receives the loop itself, so it may re-enter any registration or timer
/// operation, including on the descriptor currently firing. The mask is the
/// readiness reported by the poller for this cycle.
///
/// State the C heritage passed through `clientData` is captured by the
/// closure; registering one `Rc` for both directions shares that state.
pub type FileProc = Rc<dyn Fn(&mut EventLoop, RawFd, EventMask)>;

/// Callback invoked when a timer's deadline is reached.
pub type TimerProc = Rc<dyn Fn(&mut EventLoop, TimerId) -> TimerAction>;

/// Callback invoked exactly once when a tombstoned timer is reaped.
pub type FinalizerProc = Rc<dyn Fn(&mut EventLoop, TimerId)>;
