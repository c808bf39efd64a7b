//! Ad-hoc single-descriptor wait.
//!
//! A standalone helper for one-off synchronous waits outside the reactor:
//! blocking handshakes, draining a descriptor before shutdown, and the
//! like. It never touches an [`EventLoop`](crate::EventLoop).

use crate::event::EventMask;

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Blocks until `fd` is ready in one of the requested directions, an error
/// or hangup condition is reported, or the timeout elapses (`None` waits
/// forever).
///
/// Returns the ready directions, with error and hangup conditions folded
/// into `WRITABLE` so the caller always receives an actionable bit; an
/// empty mask means the timeout elapsed. Failures preserve the underlying
/// OS error.
pub fn wait(fd: RawFd, mask: EventMask, timeout: Option<Duration>) -> io::Result<EventMask> {
    let mut events: libc::c_short = 0;

    if mask.contains(EventMask::READABLE) {
        events |= libc::POLLIN;
    }
    if mask.contains(EventMask::WRITABLE) {
        events |= libc::POLLOUT;
    }

    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };

    let timeout_ms = timeout.map_or(-1, |t| t.as_millis() as libc::c_int);

    let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    if rc == 0 {
        return Ok(EventMask::empty());
    }

    let mut ready = EventMask::empty();

    if pfd.revents & libc::POLLIN != 0 {
        ready |= EventMask::READABLE;
    }
    if pfd.revents & (libc::POLLOUT | libc::POLLERR | libc::POLLHUP) != 0 {
        ready |= EventMask::WRITABLE;
    }

    Ok(ready)
}
