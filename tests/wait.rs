#![cfg(unix)]

use aevum::{EventMask, wait};

use std::os::fd::RawFd;
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

#[test]
fn times_out_with_an_empty_mask() {
    let (read_end, write_end) = pipe();

    let start = Instant::now();
    let ready = wait(
        read_end,
        EventMask::READABLE,
        Some(Duration::from_millis(50)),
    )
    .unwrap();

    assert_eq!(ready, EventMask::empty());
    assert!(start.elapsed() >= Duration::from_millis(50));

    close(read_end);
    close(write_end);
}

#[test]
fn reports_readable_after_a_write() {
    let (read_end, write_end) = pipe();

    let byte = [1u8];
    let written = unsafe { libc::write(write_end, byte.as_ptr() as *const _, 1) };
    assert_eq!(written, 1);

    let ready = wait(
        read_end,
        EventMask::READABLE,
        Some(Duration::from_millis(100)),
    )
    .unwrap();

    assert!(ready.contains(EventMask::READABLE));

    close(read_end);
    close(write_end);
}

#[test]
fn reports_writable_on_an_empty_pipe_buffer() {
    let (read_end, write_end) = pipe();

    let ready = wait(
        write_end,
        EventMask::WRITABLE,
        Some(Duration::from_millis(100)),
    )
    .unwrap();

    assert!(ready.contains(EventMask::WRITABLE));

    close(read_end);
    close(write_end);
}

#[test]
fn hangup_reports_as_writable() {
    let (read_end, write_end) = pipe();
    close(write_end);

    // Only readability was requested, but the hangup must still surface as
    // an actionable bit.
    let ready = wait(
        read_end,
        EventMask::READABLE,
        Some(Duration::from_millis(100)),
    )
    .unwrap();

    assert!(ready.contains(EventMask::WRITABLE));

    close(read_end);
}
