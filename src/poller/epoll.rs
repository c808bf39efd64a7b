//! Linux `epoll`-based poller.
//!
//! Registration changes map onto `epoll_ctl`: a descriptor whose prior
//! interest was empty is added, one with existing interest is modified, and
//! one whose remaining interest is empty is removed. The wait maps onto
//! `epoll_wait` with a millisecond timeout.
//!
//! Error and hangup conditions are reported as writable, so a callback
//! registered for writes gets to observe a broken descriptor and close it.

use super::Poller;
use crate::event::{EventMask, Fired};

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLERR, EPOLLHUP, EPOLLIN,
    EPOLLOUT, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

pub struct EpollPoller {
    /// Epoll instance descriptor.
    epoll: RawFd,

    /// Reusable buffer handed to `epoll_wait`.
    events: Vec<epoll_event>,
}

impl EpollPoller {
    pub fn new(setsize: usize) -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll,
            events: Vec::with_capacity(setsize.max(1)),
        })
    }

    fn interest_flags(mask: EventMask) -> u32 {
        let mut flags = 0;

        if mask.contains(EventMask::READABLE) {
            flags |= EPOLLIN;
        }
        if mask.contains(EventMask::WRITABLE) {
            flags |= EPOLLOUT;
        }

        flags as u32
    }

    fn apply(&mut self, fd: RawFd, mask: EventMask, prior: EventMask) -> io::Result<()> {
        let op = if prior.is_empty() {
            EPOLL_CTL_ADD
        } else {
            EPOLL_CTL_MOD
        };

        let mut event = epoll_event {
            events: Self::interest_flags(prior | mask),
            u64: fd as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, op, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}

impl Poller for EpollPoller {
    fn resize(&mut self, setsize: usize) -> io::Result<()> {
        // The kernel side needs no resizing; only the wait buffer tracks
        // the loop capacity.
        self.events = Vec::with_capacity(setsize.max(1));
        Ok(())
    }

    fn add(&mut self, fd: RawFd, mask: EventMask, prior: EventMask) -> io::Result<()> {
        self.apply(fd, mask, prior)
    }

    fn update(&mut self, fd: RawFd, mask: EventMask, prior: EventMask) -> io::Result<()> {
        self.apply(fd, mask, prior)
    }

    fn delete(&mut self, fd: RawFd, _removed: EventMask, remaining: EventMask) {
        if remaining.is_empty() {
            unsafe {
                epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut());
            }
        } else {
            let mut event = epoll_event {
                events: Self::interest_flags(remaining),
                u64: fd as u64,
            };

            unsafe {
                epoll_ctl(self.epoll, EPOLL_CTL_MOD, fd, &mut event);
            }
        }
    }

    fn poll(&mut self, fired: &mut Vec<Fired>, timeout: Option<Duration>) -> io::Result<usize> {
        let timeout_ms = timeout.map_or(-1, |t| t.as_millis() as i32);

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
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

        unsafe {
            self.events.set_len(n as usize);
        }

        fired.clear();

        for event in &self.events {
            let mut mask = EventMask::empty();

            if event.events & EPOLLIN as u32 != 0 {
                mask |= EventMask::READABLE;
            }
            if event.events & (EPOLLOUT | EPOLLERR | EPOLLHUP) as u32 != 0 {
                mask |= EventMask::WRITABLE;
            }

            fired.push(Fired {
                fd: event.u64 as RawFd,
                mask,
            });
        }

        Ok(fired.len())
    }

    fn name(&self) -> &'static str {
        "epoll"
    }

    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.epoll)
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epoll);
        }
    }
}
