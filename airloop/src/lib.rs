//! # Airloop
//!
//! **Airloop** is a small single-threaded event loop for Linux daemons.
//!
//! It multiplexes file-descriptor readiness, software timers and process
//! signals into one blocking `epoll` wait per iteration:
//!
//! - a **registry** of descriptors, each with a callback run when it is ready,
//! - a **timer queue** keyed by [`Timer`] handles, driven by the process
//!   interval timer (`ITIMER_REAL`),
//! - a **signal bridge** turning signals into readable descriptors, so they
//!   are handled by the same loop as everything else.
//!
//! Callbacks run to completion, one at a time, and receive `&mut Reactor` so
//! they can register, unregister and (re)schedule while the loop is
//! dispatching.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use airloop::{Reactor, Timer};
//!
//! fn main() -> airloop::Result<()> {
//!     let mut reactor = Reactor::new();
//!     reactor.init()?;
//!
//!     let tick = Timer::new(|reactor| {
//!         println!("tick");
//!     });
//!     reactor.schedule_after(1.0, &tick);
//!
//!     loop {
//!         match reactor.run_iteration(5.0) {
//!             Ok(_) => {}
//!             Err(err) if err.is_interrupted() => {}
//!             Err(err) => return Err(err),
//!         }
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`reactor`]: the loop, its builder, timers and readiness flags
//! - [`signal`]: signal sets and the signal bridge
//! - [`time`]: the monotonic clock used for deadlines
//! - [`error`]: the crate error type

pub mod error;
pub mod reactor;
pub mod signal;
pub mod time;

mod utils;

pub use error::{Error, Result};
pub use reactor::{Events, Interest, Reactor, ReactorBuilder, Timer};
pub use time::now;
