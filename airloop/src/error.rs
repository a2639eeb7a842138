//! Error type shared by every fallible operation of the event loop.

use std::io;
use std::os::fd::RawFd;

use thiserror::Error;

/// Errors reported by the event loop and the signal bridge.
///
/// Apart from [`Error::Wait`] with an interrupted source, every variant
/// describes a broken runtime environment or a logic error. Callers are
/// expected to log it and terminate rather than retry.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to create the readiness multiplexer: {0}")]
    CreatePoller(#[source] io::Error),

    #[error("failed to subscribe fd {fd} to the readiness multiplexer: {source}")]
    Subscribe {
        fd: RawFd,
        #[source]
        source: io::Error,
    },

    #[error("fd {0} is not registered")]
    NotRegistered(RawFd),

    #[error("readiness wait failed: {0}")]
    Wait(#[source] io::Error),

    #[error("interval timer failure: {0}")]
    Timer(#[source] io::Error),

    #[error("failed to set up the signal pipe: {0}")]
    Pipe(#[source] io::Error),

    #[error("failed to install a handler for signal {signal}: {source}")]
    SignalInstall {
        signal: i32,
        #[source]
        source: io::Error,
    },

    #[error("failed to change the signal mask: {0}")]
    SignalMask(#[source] io::Error),

    #[error("signal {0} cannot be bridged")]
    InvalidSignal(i32),
}

impl Error {
    /// Returns `true` when the blocking wait was cut short by a signal.
    ///
    /// This is the one retryable failure of [`Reactor::run_iteration`]:
    /// callers simply run the next iteration.
    ///
    /// [`Reactor::run_iteration`]: crate::Reactor::run_iteration
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Wait(err) if err.kind() == io::ErrorKind::Interrupted)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_interrupted_waits_are_retryable() {
        let eintr = Error::Wait(io::Error::from_raw_os_error(libc::EINTR));
        let ebadf = Error::Wait(io::Error::from_raw_os_error(libc::EBADF));
        let timer = Error::Timer(io::Error::from_raw_os_error(libc::EINTR));

        assert!(eintr.is_interrupted());
        assert!(!ebadf.is_interrupted());
        assert!(!timer.is_interrupted());
    }

    #[test]
    fn subscribe_error_names_the_descriptor() {
        let err = Error::Subscribe {
            fd: 42,
            source: io::Error::from_raw_os_error(libc::EBADF),
        };
        assert!(err.to_string().contains("fd 42"));
    }
}
