//! Portable `poll(2)`-based poller.
//!
//! Keeps its own dense interest table and rebuilds the `pollfd` array on
//! every wait. Slower than the platform-specific pollers but available on
//! every unix target; it is the default everywhere epoll is not.

use super::Poller;
use crate::event::{EventMask, Fired};

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

pub struct PollfdPoller {
    /// Interest per descriptor, indexed like the loop's slot table.
    interest: Vec<EventMask>,

    /// Reusable `poll(2)` argument buffer.
    pollfds: Vec<libc::pollfd>,
}

impl PollfdPoller {
    pub fn new(setsize: usize) -> Self {
        Self {
            interest: vec![EventMask::empty(); setsize],
            pollfds: Vec::with_capacity(setsize),
        }
    }
}

impl Poller for PollfdPoller {
    fn resize(&mut self, setsize: usize) -> io::Result<()> {
        self.interest.resize(setsize, EventMask::empty());
        Ok(())
    }

    fn add(&mut self, fd: RawFd, mask: EventMask, _prior: EventMask) -> io::Result<()> {
        let slot = self
            .interest
            .get_mut(fd as usize)
            .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;

        *slot |= mask;
        Ok(())
    }

    fn update(&mut self, fd: RawFd, mask: EventMask, prior: EventMask) -> io::Result<()> {
        self.add(fd, mask, prior)
    }

    fn delete(&mut self, fd: RawFd, _removed: EventMask, remaining: EventMask) {
        if let Some(slot) = self.interest.get_mut(fd as usize) {
            *slot = remaining;
        }
    }

    fn poll(&mut self, fired: &mut Vec<Fired>, timeout: Option<Duration>) -> io::Result<usize> {
        let timeout_ms = timeout.map_or(-1, |t| t.as_millis() as libc::c_int);

        self.pollfds.clear();
        for (fd, mask) in self.interest.iter().enumerate() {
            if mask.is_empty() {
                continue;
            }

            let mut events: libc::c_short = 0;
            if mask.contains(EventMask::READABLE) {
                events |= libc::POLLIN;
            }
            if mask.contains(EventMask::WRITABLE) {
                events |= libc::POLLOUT;
            }

            self.pollfds.push(libc::pollfd {
                fd: fd as RawFd,
                events,
                revents: 0,
            });
        }

        let n = unsafe {
            libc::poll(
                self.pollfds.as_mut_ptr(),
                self.pollfds.len() as libc::nfds_t,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(0);
            }
            return Err(err);
        }

        fired.clear();

        for pfd in &self.pollfds {
            let mut mask = EventMask::empty();

            if pfd.revents & libc::POLLIN != 0 {
                mask |= EventMask::READABLE;
            }
            if pfd.revents & (libc::POLLOUT | libc::POLLERR | libc::POLLHUP) != 0 {
                mask |= EventMask::WRITABLE;
            }

            if !mask.is_empty() {
                fired.push(Fired { fd: pfd.fd, mask });
            }
        }

        Ok(fired.len())
    }

    fn name(&self) -> &'static str {
        "poll"
    }

    fn raw_fd(&self) -> Option<RawFd> {
        None
    }
}
