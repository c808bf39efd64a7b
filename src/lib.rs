//! # Aevum
//!
//! **Aevum** is a minimal single-threaded reactor: one [`EventLoop`]
//! multiplexes descriptor readiness and timer deadlines through a single
//! wait/dispatch cycle, so networking and state-machine code gets
//! non-blocking I/O and timers without a thread per connection.
//!
//! There is no executor and no futures machinery here; the embedding
//! application registers plain callbacks and drives the loop itself:
//!
//! ```rust,ignore
//! use aevum::{DispatchFlags, EventLoop, EventMask, TimerAction};
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let mut event_loop = EventLoop::new(1024)?;
//!
//! event_loop.add_file_event(listener_fd, EventMask::READABLE, Rc::new(|el, fd, _mask| {
//!     // accept and register the new connection on `el`
//! }))?;
//!
//! event_loop.add_timer(Duration::from_secs(1), Rc::new(|_el, _id| {
//!     // periodic housekeeping
//!     TimerAction::Again(Duration::from_secs(1))
//! }), None);
//!
//! loop {
//!     event_loop.process_events(DispatchFlags::ALL_EVENTS, None)?;
//! }
//! ```
//!
//! Callbacks run synchronously inside the dispatch cycle and may mutate the
//! loop freely, including unregistering the descriptor or timer that is
//! currently firing.
//!
//! The blocking wait goes through a pluggable [`Poller`]; the platform
//! default is epoll on Linux and `poll(2)` elsewhere on unix.

mod clock;
mod event_loop;
mod timer;

pub mod error;
pub mod event;
pub mod poller;
pub mod wait;

pub use error::{Error, Result};
pub use event::{
    DispatchFlags, EventMask, FileProc, FinalizerProc, Fired, TimerAction, TimerId, TimerProc,
};
pub use event_loop::EventLoop;
pub use poller::{Poller, default_poller};
pub use wait::wait;
