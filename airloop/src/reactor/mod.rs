//! The event loop.
//!
//! This module implements the reactor: a single-threaded loop that
//! multiplexes three event sources into one blocking wait per iteration:
//! - readiness of registered file descriptors,
//! - a queue of software timers,
//! - process signals, through the [signal bridge](crate::signal).
//!
//! Each iteration fires the due timers, arms the process interval timer for
//! the next deadline, blocks in the readiness multiplexer, and dispatches the
//! callbacks of the ready descriptors. Callbacks receive `&mut Reactor` and
//! may mutate the loop while it is dispatching.

mod alarm;
mod builder;
mod core;
mod event;
mod io;
mod timer;

pub(crate) mod poller;

pub use self::core::Reactor;
pub use builder::{DEFAULT_BATCH_CAPACITY, DEFAULT_MIN_ARM_DELAY, ReactorBuilder};
pub use event::Events;
pub use poller::common::Interest;
pub use timer::Timer;
