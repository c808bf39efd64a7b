//! Error types reported by the event loop.

use crate::event::TimerId;

use std::collections::TryReserveError;
use std::io;
use std::os::fd::RawFd;
use thiserror::Error;

/// Convenience alias for event-loop results.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by the event loop.
///
/// All failures are returned, never panicked. The loop performs no retries
/// itself; a caller that receives [`Error::Poller`] from a dispatch cycle
/// decides whether to run another cycle.
#[derive(Debug, Error)]
pub enum Error {
    /// A registration named a descriptor the loop cannot track
    /// (negative, or at least the configured capacity).
    #[error("descriptor {0} is out of range for this event loop")]
    OutOfRange(RawFd),

    /// A resize would truncate a slot that is still registered.
    #[error("cannot resize capacity to {requested}: descriptor {highest} is still registered")]
    CapacityConflict { requested: usize, highest: RawFd },

    /// Backing storage for the event tables could not be obtained.
    /// Creation and resize fail atomically: partial allocations are
    /// released and existing state is left unchanged.
    #[error("failed to allocate event tables")]
    Allocation(#[from] TryReserveError),

    /// No live timer carries the given id; it was already reaped or was
    /// never issued.
    #[error("no timer with id {0}")]
    TimerNotFound(TimerId),

    /// The polling backend reported a failure, passed through opaquely.
    #[error("polling backend failure")]
    Poller(#[from] io::Error),
}
