#![cfg(unix)]

//! End-to-end cycles through the real platform pollers, driven by pipes.

use aevum::poller::PollfdPoller;
use aevum::{DispatchFlags, EventLoop, EventMask};

use std::cell::Cell;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::{Duration, Instant};

fn pipe() -> (RawFd, RawFd) {
    let mut fds = [0 as RawFd; 2];
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert_eq!(rc, 0, "pipe creation failed");
    (fds[0], fds[1])
}

fn close(fd: RawFd) {
    unsafe { libc::close(fd) };
}

fn write_byte(fd: RawFd) {
    let byte = [7u8];
    let written = unsafe { libc::write(fd, byte.as_ptr() as *const _, 1) };
    assert_eq!(written, 1);
}

fn readable_pipe_cycle(mut event_loop: EventLoop) {
    let (read_end, write_end) = pipe();

    let reads = Rc::new(Cell::new(0));
    let seen = reads.clone();

    event_loop
        .add_file_event(
            read_end,
            EventMask::READABLE,
            Rc::new(move |_, fd, _| {
                let mut buffer = [0u8; 8];
                let n = unsafe { libc::read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) };
                assert_eq!(n, 1);
                seen.set(seen.get() + 1);
            }),
        )
        .unwrap();

    write_byte(write_end);

    let processed = event_loop
        .process_events(
            DispatchFlags::FILE_EVENTS,
            Some(Duration::from_millis(500)),
        )
        .unwrap();

    assert_eq!(processed, 1);
    assert_eq!(reads.get(), 1);

    close(read_end);
    close(write_end);
}

#[cfg(target_os = "linux")]
#[test]
fn default_poller_on_linux_is_epoll() {
    let event_loop = EventLoop::new(64).unwrap();

    assert_eq!(event_loop.poller_name(), "epoll");
    assert!(event_loop.poller_fd().is_some());
}

#[cfg(target_os = "linux")]
#[test]
fn epoll_reports_a_readable_pipe() {
    readable_pipe_cycle(EventLoop::new(64).unwrap());
}

#[test]
fn pollfd_poller_reports_a_readable_pipe() {
    let poller = Box::new(PollfdPoller::new(64));
    let event_loop = EventLoop::with_poller(64, poller).unwrap();

    assert_eq!(event_loop.poller_name(), "poll");
    assert_eq!(event_loop.poller_fd(), None);

    readable_pipe_cycle(event_loop);
}

#[test]
fn writable_interest_fires_immediately_on_an_empty_pipe() {
    let mut event_loop = EventLoop::new(64).unwrap();
    let (read_end, write_end) = pipe();

    let writes = Rc::new(Cell::new(0));
    let seen = writes.clone();

    event_loop
        .add_file_event(
            write_end,
            EventMask::WRITABLE,
            Rc::new(move |event_loop, fd, _| {
                seen.set(seen.get() + 1);
                // One shot: writable would fire every cycle otherwise.
                event_loop.delete_file_event(fd, EventMask::WRITABLE);
            }),
        )
        .unwrap();

    let processed = event_loop
        .process_events(
            DispatchFlags::FILE_EVENTS,
            Some(Duration::from_millis(500)),
        )
        .unwrap();

    assert_eq!(processed, 1);
    assert_eq!(writes.get(), 1);
    assert_eq!(event_loop.max_descriptor(), None);

    close(read_end);
    close(write_end);
}

#[test]
fn blocking_cycle_wakes_for_the_nearest_timer() {
    let mut event_loop = EventLoop::new(8).unwrap();

    let fired = Rc::new(Cell::new(0));
    let seen = fired.clone();
    event_loop.add_timer(
        Duration::from_millis(30),
        Rc::new(move |_, _| {
            seen.set(seen.get() + 1);
            aevum::TimerAction::Stop
        }),
        None,
    );

    // No descriptor registered: the cycle still sleeps in the poller,
    // bounded by the timer deadline, then fires it.
    let start = Instant::now();
    let mut total = 0;
    while total == 0 && start.elapsed() < Duration::from_secs(2) {
        total += event_loop
            .process_events(DispatchFlags::ALL_EVENTS, None)
            .unwrap();
    }

    assert_eq!(total, 1);
    assert_eq!(fired.get(), 1);
    assert!(start.elapsed() >= Duration::from_millis(25));
}

#[test]
fn file_and_timer_events_share_one_cycle() {
    let mut event_loop = EventLoop::new(64).unwrap();
    let (read_end, write_end) = pipe();

    let reads = Rc::new(Cell::new(0));
    let seen = reads.clone();
    event_loop
        .add_file_event(
            read_end,
            EventMask::READABLE,
            Rc::new(move |_, fd, _| {
                let mut buffer = [0u8; 8];
                unsafe { libc::read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) };
                seen.set(seen.get() + 1);
            }),
        )
        .unwrap();

    let ticks = Rc::new(Cell::new(0));
    let seen = ticks.clone();
    event_loop.add_timer(
        Duration::ZERO,
        Rc::new(move |_, _| {
            seen.set(seen.get() + 1);
            aevum::TimerAction::Stop
        }),
        None,
    );

    write_byte(write_end);

    let processed = event_loop
        .process_events(DispatchFlags::ALL_EVENTS, None)
        .unwrap();

    assert_eq!(processed, 2);
    assert_eq!(reads.get(), 1);
    assert_eq!(ticks.get(), 1);

    close(read_end);
    close(write_end);
}
