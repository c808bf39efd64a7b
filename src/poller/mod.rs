//! Platform-specific readiness-polling backends.
//!
//! The event loop drives its blocking wait through the [`Poller`] trait and
//! never touches a polling syscall itself. A concrete poller is picked once,
//! when the loop is created: [`default_poller`] selects by platform, or the
//! embedder hands its own implementation to
//! [`EventLoop::with_poller`](crate::EventLoop::with_poller) (which is also
//! how the test suites substitute a scripted poller).

use crate::event::{EventMask, Fired};

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(unix)]
mod pollfd;

#[cfg(target_os = "linux")]
pub use epoll::EpollPoller;

#[cfg(unix)]
pub use pollfd::PollfdPoller;

/// A readiness-polling strategy.
///
/// The loop mirrors every registration change into its poller and calls
/// [`poll`](Poller::poll) once per dispatch cycle. Pollers keep whatever
/// private state they need; releasing it happens on drop.
///
/// The loop passes the slot's prior (for add/update) or remaining (for
/// delete) interest bits alongside the changed ones, so a poller can decide
/// between creating, modifying and removing its own registration without
/// reaching back into the loop's tables.
pub trait Poller {
    /// Adjusts internal capacity for a loop resize. Must fail without side
    /// effects if the new capacity cannot be accommodated.
    fn resize(&mut self, setsize: usize) -> io::Result<()>;

    /// Starts monitoring `mask` on a descriptor whose interest so far was
    /// `prior` (empty for a brand-new registration).
    fn add(&mut self, fd: RawFd, mask: EventMask, prior: EventMask) -> io::Result<()>;

    /// Same contract as [`add`](Poller::add), for callers updating a slot
    /// they expect to already exist.
    fn update(&mut self, fd: RawFd, mask: EventMask, prior: EventMask) -> io::Result<()>;

    /// Stops monitoring the `removed` bits; `remaining` is what the slot
    /// still wants (empty once the descriptor is fully unregistered).
    fn delete(&mut self, fd: RawFd, removed: EventMask, remaining: EventMask);

    /// Blocks until readiness, up to `timeout` (`None` blocks forever,
    /// `Some(ZERO)` returns immediately). Writes this cycle's reports into
    /// `fired` and returns how many there are; 0 on timeout.
    fn poll(&mut self, fired: &mut Vec<Fired>, timeout: Option<Duration>) -> io::Result<usize>;

    /// Identifies the active strategy. Diagnostic only.
    fn name(&self) -> &'static str;

    /// The poller's own OS handle, when it has one, so the loop itself can
    /// be embedded in an outer multiplexer.
    fn raw_fd(&self) -> Option<RawFd>;
}

/// Picks the best poller supported by this platform.
#[cfg(target_os = "linux")]
pub fn default_poller(setsize: usize) -> io::Result<Box<dyn Poller>> {
    Ok(Box::new(EpollPoller::new(setsize)?))
}

/// Picks the best poller supported by this platform.
#[cfg(all(unix, not(target_os = "linux")))]
pub fn default_poller(setsize: usize) -> io::Result<Box<dyn Poller>> {
    Ok(Box::new(PollfdPoller::new(setsize)))
}
