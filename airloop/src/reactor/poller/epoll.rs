//! Linux `epoll`-based poller implementation.
//!
//! Responsibilities:
//! - Subscribe file descriptors with read/write interests
//! - Block until at least one descriptor is ready
//! - Report a bounded batch of readiness events per wait
//!
//! The poller never times out on its own. The event loop bounds each wait
//! with an interval timer whose signal arrives through a registered pipe.

use super::common::Interest;
use crate::reactor::event::Event;
use crate::utils::Key;

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLIN, EPOLLOUT, epoll_create1,
    epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::unix::io::RawFd;

/// Linux `epoll` poller.
///
/// Owns the epoll instance and a reusable buffer for raw kernel events.
pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for epoll events.
    events: Vec<epoll_event>,

    /// Most events reported by one wait.
    capacity: usize,

    /// Number of successful `EPOLL_CTL_ADD` calls.
    subscriptions: usize,
}

fn flags(interest: Interest) -> u32 {
    let mut flags = 0;

    if interest.contains(Interest::READ) {
        flags |= EPOLLIN;
    }
    if interest.contains(Interest::WRITE) {
        flags |= EPOLLOUT;
    }

    flags as u32
}

impl EpollPoller {
    /// Creates an epoll instance able to report `capacity` events per wait.
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll,
            events: Vec::with_capacity(capacity),
            capacity,
            subscriptions: 0,
        })
    }

    /// Subscribe a file descriptor.
    pub(crate) fn add(&mut self, fd: RawFd, key: Key, interest: Interest) -> io::Result<()> {
        let mut event = epoll_event {
            events: flags(interest),
            u64: key.to_token(),
        };

        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        self.subscriptions += 1;
        Ok(())
    }

    /// Update interest flags for an already subscribed descriptor.
    pub(crate) fn modify(&self, fd: RawFd, key: Key, interest: Interest) -> io::Result<()> {
        let mut event = epoll_event {
            events: flags(interest),
            u64: key.to_token(),
        };

        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_MOD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Remove a file descriptor from the poller.
    pub(crate) fn delete(&self, fd: RawFd) -> io::Result<()> {
        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Waits for subscribed descriptors to become ready.
    ///
    /// `timeout` is in milliseconds: `-1` blocks until at least one is
    /// ready, `0` only collects what is ready already. `batch` is replaced
    /// with at most `capacity` events. An interrupted wait is returned as an
    /// error of kind `Interrupted`.
    pub(crate) fn wait(&mut self, batch: &mut Vec<Event>, timeout: i32) -> io::Result<usize> {
        batch.clear();

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.capacity as i32,
                timeout,
            )
        };

        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        batch.extend(self.events.iter().map(|ev| Event {
            entry: Some(Key::from_token(ev.u64)),
            bits: ev.events,
        }));

        Ok(n as usize)
    }

    pub(crate) fn subscriptions(&self) -> usize {
        self.subscriptions
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        unsafe { libc::close(self.epoll) };
    }
}
