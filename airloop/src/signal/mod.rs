//! Signal bridge: process signals as ordinary readable descriptors.
//!
//! [`open_signal_source`] installs a handler for a set of signals. Each
//! delivery is serialized into a fixed-size [`SignalInfo`] record and written
//! into a non-blocking, close-on-exec pipe. The read end is returned as a
//! [`SignalSource`], which is registered with the
//! [`Reactor`](crate::Reactor) like any other descriptor, so signals are
//! handled by the same single-threaded wait as I/O and timers.
//!
//! This mirrors the `signalfd(2)` contract, including its expectation that
//! the caller blocks the signals before opening the source: opening a source
//! unblocks them again in the calling thread.
//!
//! ```rust,ignore
//! let mut set = SigSet::new();
//! set.add(libc::SIGTERM)?;
//! set.add(libc::SIGCHLD)?;
//! set.block()?;
//!
//! let source = open_signal_source(&set)?;
//! reactor.register_fd(source.fd(), move |_, fd| {
//!     for info in SignalSource::from_raw_fd(fd).read_all().unwrap_or_default() {
//!         println!("got signal {}", info.signo);
//!     }
//! })?;
//! ```

mod handler;
mod info;

pub use info::{RECORD_SIZE, SignalInfo};

use crate::error::{Error, Result};
use crate::reactor::poller::platform::{sys_close, sys_pipe, sys_read};

use handler::NSIG;
use libc::{SIG_BLOCK, SIG_UNBLOCK, SIGKILL, SIGSTOP, c_int, pthread_sigmask, sigset_t};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::{Mutex, PoisonError};
use std::{fmt, io, mem, ptr};
use tracing::debug;

/// Pipe ends of an open source, with the routes it took over.
struct Bridge {
    read_end: RawFd,
    write_end: RawFd,
    previous: Vec<(c_int, RawFd)>,
}

static BRIDGES: Mutex<Vec<Bridge>> = Mutex::new(Vec::new());

/// A set of signal numbers.
#[derive(Clone, Copy)]
pub struct SigSet {
    raw: sigset_t,
}

impl SigSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        let mut raw: sigset_t = unsafe { mem::zeroed() };
        unsafe { libc::sigemptyset(&mut raw) };
        Self { raw }
    }

    /// Builds a set from a list of signal numbers.
    pub fn from_signals(signals: &[c_int]) -> Result<Self> {
        let mut set = Self::new();
        for &signo in signals {
            set.add(signo)?;
        }
        Ok(set)
    }

    /// Adds `signo` to the set.
    ///
    /// `SIGKILL` and `SIGSTOP` cannot be caught and are rejected, as are
    /// numbers outside the valid range.
    pub fn add(&mut self, signo: c_int) -> Result<()> {
        if signo <= 0 || signo as usize >= NSIG || signo == SIGKILL || signo == SIGSTOP {
            return Err(Error::InvalidSignal(signo));
        }

        unsafe { libc::sigaddset(&mut self.raw, signo) };
        Ok(())
    }

    pub fn contains(&self, signo: c_int) -> bool {
        signo > 0
            && (signo as usize) < NSIG
            && unsafe { libc::sigismember(&self.raw, signo) } == 1
    }

    /// Iterates over the signal numbers in the set, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = c_int> + '_ {
        (1..NSIG as c_int).filter(move |&signo| self.contains(signo))
    }

    /// Blocks the signals in the calling thread.
    pub fn block(&self) -> Result<()> {
        self.mask(SIG_BLOCK)
    }

    /// Unblocks the signals in the calling thread.
    pub fn unblock(&self) -> Result<()> {
        self.mask(SIG_UNBLOCK)
    }

    fn mask(&self, how: c_int) -> Result<()> {
        let rc = unsafe { pthread_sigmask(how, &self.raw, ptr::null_mut()) };
        if rc != 0 {
            return Err(Error::SignalMask(io::Error::from_raw_os_error(rc)));
        }
        Ok(())
    }
}

impl Default for SigSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SigSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Read end of a signal bridge pipe.
///
/// A `SignalSource` is a plain handle: it does not close the descriptor on
/// drop. Once registered, the [`Reactor`](crate::Reactor) closes it at
/// shutdown; otherwise call [`close`](Self::close).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSource {
    fd: RawFd,
}

impl SignalSource {
    /// Wraps a descriptor returned by [`open_signal_source`], typically the
    /// `fd` passed to a readiness callback.
    pub fn from_raw_fd(fd: RawFd) -> Self {
        Self { fd }
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Reads one record.
    ///
    /// Returns `Ok(None)` once the pipe is drained.
    pub fn read(&self) -> io::Result<Option<SignalInfo>> {
        let mut buf = [0u8; RECORD_SIZE];

        loop {
            let n = sys_read(self.fd, &mut buf);

            if n == RECORD_SIZE as isize {
                return Ok(Some(SignalInfo::from_bytes(&buf)));
            }
            if n == 0 {
                return Ok(None);
            }
            if n > 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "truncated signal record",
                ));
            }

            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::WouldBlock => return Ok(None),
                io::ErrorKind::Interrupted => continue,
                _ => return Err(err),
            }
        }
    }

    /// Reads every pending record.
    pub fn read_all(&self) -> io::Result<Vec<SignalInfo>> {
        let mut records = Vec::new();
        while let Some(info) = self.read()? {
            records.push(info);
        }
        Ok(records)
    }

    /// Stops routing signals to this source and closes both pipe ends.
    ///
    /// Only for sources that are not registered with a reactor.
    pub fn close(self) {
        release(self.fd);
        sys_close(self.fd);
    }
}

impl AsRawFd for SignalSource {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

/// Routes every signal in `set` into a new bridge pipe.
///
/// Installs the bridge handler for each signal, then unblocks the set in the
/// calling thread. A signal already routed to another source is taken over
/// by the new one.
///
/// Failing to install a handler is returned as
/// [`Error::SignalInstall`]; callers are expected to treat it as fatal since
/// signal delivery is what drives timers and child reaping.
pub fn open_signal_source(set: &SigSet) -> Result<SignalSource> {
    let (read_end, write_end) = sys_pipe().map_err(Error::Pipe)?;

    let mut previous = Vec::new();

    for signo in set.iter() {
        previous.push((signo, handler::route(signo, write_end)));

        if let Err(source) = handler::install(signo) {
            for &(signo, fd) in previous.iter().rev() {
                handler::route(signo, fd);
            }
            sys_close(read_end);
            sys_close(write_end);

            return Err(Error::SignalInstall {
                signal: signo,
                source,
            });
        }
    }

    BRIDGES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Bridge {
            read_end,
            write_end,
            previous,
        });

    set.unblock()?;

    debug!(fd = read_end, signals = ?set, "signal bridge opened");

    Ok(SignalSource { fd: read_end })
}

/// Detaches the source read through `read_end` and closes its write end.
///
/// Each signal it carried goes back to the source it was routed to before,
/// if that one is still open, and is discarded otherwise. The read end is
/// left to the caller. Descriptors that are not bridge read ends are
/// ignored.
pub(crate) fn release(read_end: RawFd) {
    let mut bridges = BRIDGES.lock().unwrap_or_else(PoisonError::into_inner);

    let Some(i) = bridges.iter().position(|b| b.read_end == read_end) else {
        return;
    };
    let bridge = bridges.swap_remove(i);

    for &(signo, previous) in &bridge.previous {
        let fallback = if bridges.iter().any(|b| b.write_end == previous) {
            previous
        } else {
            -1
        };
        handler::reroute(signo, bridge.write_end, fallback);
    }

    sys_close(bridge.write_end);
    debug!(fd = read_end, "signal bridge released");
}
