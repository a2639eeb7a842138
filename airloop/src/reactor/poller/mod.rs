//! Platform-specific readiness poller.
//!
//! The poller is used by the event loop to:
//! - subscribe descriptors with a read/write interest,
//! - block until one or more of them are ready,
//! - report a bounded batch of readiness events.
//!
//! The concrete implementation is selected at compile time
//! depending on the target operating system.

pub(crate) mod common;

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(not(target_os = "linux"))]
compile_error!("airloop needs epoll and setitimer; only Linux targets are supported");

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;
