//! The interval timer bounding each blocking wait.
//!
//! `ITIMER_REAL` raises `SIGALRM`, which reaches the loop through a signal
//! bridge source shared by the whole process. Every reactor registers its own
//! duplicate of that source's read end, so a pending alarm makes the wait
//! return through the ordinary readiness path.

use super::poller::platform::{sys_dup_cloexec, sys_set_alarm};
use crate::error::{Error, Result};
use crate::signal::{SigSet, SignalSource, open_signal_source};

use libc::SIGALRM;
use std::os::fd::RawFd;
use std::sync::{Mutex, PoisonError};
use tracing::{trace, warn};

static SOURCE: Mutex<Option<SignalSource>> = Mutex::new(None);

/// Longest delay accepted by `setitimer` without overflowing `time_t`.
const MAX_MICROS: u64 = i32::MAX as u64 * 1_000_000;

/// Returns a private duplicate of the process-wide `SIGALRM` source.
///
/// The source is opened the first time any reactor asks for it.
pub(crate) fn open() -> Result<RawFd> {
    let mut source = SOURCE.lock().unwrap_or_else(PoisonError::into_inner);

    let shared = match *source {
        Some(shared) => shared,
        None => {
            let shared = open_signal_source(&SigSet::from_signals(&[SIGALRM])?)?;
            *source = Some(shared);
            shared
        }
    };

    sys_dup_cloexec(shared.fd()).map_err(Error::Pipe)
}

/// Readiness callback of the alarm entry: discards pending alarm records.
pub(crate) fn drain(fd: RawFd) {
    match SignalSource::from_raw_fd(fd).read_all() {
        Ok(records) => trace!(fd, count = records.len(), "alarm drained"),
        Err(err) => warn!(fd, %err, "failed to drain alarm pipe"),
    }
}

/// Converts a delay into the microseconds handed to `setitimer`.
///
/// Delays are rounded up, so the alarm never fires before the deadline.
/// Delays under `floor` (itself at least one microsecond) are raised to it,
/// so the alarm always fires.
pub(crate) fn micros(delay: f64, floor: f64) -> u64 {
    let floor = (floor * 1e6).round().max(1.0);
    let micros = (delay * 1e6).ceil();

    if micros.is_nan() || micros < floor {
        floor as u64
    } else {
        (micros as u64).min(MAX_MICROS)
    }
}

/// Arms the interval timer to fire once after `delay` seconds.
pub(crate) fn arm(delay: f64, floor: f64) -> Result<()> {
    let micros = micros(delay, floor);
    trace!(micros, "interval timer armed");
    sys_set_alarm(micros).map_err(Error::Timer)
}

/// Cancels a pending interval timer, if any.
pub(crate) fn disarm() -> Result<()> {
    sys_set_alarm(0).map_err(Error::Timer)
}
