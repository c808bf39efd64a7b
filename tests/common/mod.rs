#![allow(dead_code)]

use aevum::event::{EventMask, Fired};
use aevum::poller::Poller;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::Duration;

/// Everything a scripted poller observed, shared with the test body.
#[derive(Default)]
pub struct PollerLog {
    pub waits: Vec<Option<Duration>>,
    pub added: Vec<(RawFd, EventMask)>,
    pub removed: Vec<(RawFd, EventMask, EventMask)>,
}

/// A poller that replays pre-scripted readiness batches, one per
/// dispatch cycle, and records every call it receives.
pub struct ScriptedPoller {
    batches: VecDeque<Vec<Fired>>,
    log: Rc<RefCell<PollerLog>>,
}

impl ScriptedPoller {
    pub fn new(batches: Vec<Vec<Fired>>) -> (Box<Self>, Rc<RefCell<PollerLog>>) {
        let log = Rc::new(RefCell::new(PollerLog::default()));

        let poller = Box::new(Self {
            batches: batches.into(),
            log: log.clone(),
        });

        (poller, log)
    }
}

impl Poller for ScriptedPoller {
    fn resize(&mut self, _setsize: usize) -> io::Result<()> {
        Ok(())
    }

    fn add(&mut self, fd: RawFd, mask: EventMask, _prior: EventMask) -> io::Result<()> {
        self.log.borrow_mut().added.push((fd, mask));
        Ok(())
    }

    fn update(&mut self, fd: RawFd, mask: EventMask, prior: EventMask) -> io::Result<()> {
        self.add(fd, mask, prior)
    }

    fn delete(&mut self, fd: RawFd, removed: EventMask, remaining: EventMask) {
        self.log.borrow_mut().removed.push((fd, removed, remaining));
    }

    fn poll(&mut self, fired: &mut Vec<Fired>, timeout: Option<Duration>) -> io::Result<usize> {
        self.log.borrow_mut().waits.push(timeout);

        fired.clear();
        if let Some(batch) = self.batches.pop_front() {
            fired.extend(batch);
        }

        Ok(fired.len())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn raw_fd(&self) -> Option<RawFd> {
        None
    }
}
