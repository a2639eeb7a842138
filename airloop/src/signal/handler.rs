//! The process-wide signal handler behind every bridge source.
//!
//! Each bridged signal number maps to the write end of the pipe of the
//! source that last claimed it. The handler only performs atomic loads and a
//! single `write(2)`, so it stays async-signal-safe.

use super::info::SignalInfo;
use crate::reactor::poller::platform::sys_write;

use libc::{SA_RESTART, SA_SIGINFO, c_int, c_void, sigaction, sigemptyset, siginfo_t};
use std::io;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};
use std::{mem, ptr};

/// One past the highest signal number on Linux.
pub(crate) const NSIG: usize = 65;

static ROUTES: [AtomicI32; NSIG] = [const { AtomicI32::new(-1) }; NSIG];

type Handler = extern "C" fn(c_int, *mut siginfo_t, *mut c_void);

/// Points `signo` at `fd` and returns the previous route (`-1` if none).
pub(crate) fn route(signo: c_int, fd: RawFd) -> RawFd {
    ROUTES[signo as usize].swap(fd, Ordering::AcqRel)
}

/// Points `signo` back at `to` if it is still routed to `from`.
pub(crate) fn reroute(signo: c_int, from: RawFd, to: RawFd) {
    let _ = ROUTES[signo as usize].compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire);
}

/// Installs the bridge handler for `signo`.
pub(crate) fn install(signo: c_int) -> io::Result<()> {
    let handler: Handler = on_signal;

    let mut action: sigaction = unsafe { mem::zeroed() };
    action.sa_sigaction = handler as libc::sighandler_t;
    action.sa_flags = SA_SIGINFO | SA_RESTART;
    unsafe { sigemptyset(&mut action.sa_mask) };

    let rc = unsafe { libc::sigaction(signo, &action, ptr::null_mut()) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

extern "C" fn on_signal(signo: c_int, info: *mut siginfo_t, _context: *mut c_void) {
    let errno = unsafe { *libc::__errno_location() };

    let fd = usize::try_from(signo)
        .ok()
        .and_then(|i| ROUTES.get(i))
        .map_or(-1, |route| route.load(Ordering::Acquire));

    if fd >= 0 {
        let record = match unsafe { info.as_ref() } {
            Some(info) => SignalInfo::from_siginfo(info),
            None => SignalInfo {
                signo: signo as u32,
                ..SignalInfo::default()
            },
        };

        let bytes = record.to_bytes();
        let n = sys_write(fd, &bytes);

        if n < 0 {
            // A source released under our feet drops the record.
            if unsafe { *libc::__errno_location() } == libc::EAGAIN {
                overflow();
            }
        } else if n != bytes.len() as isize {
            overflow();
        }
    }

    unsafe { *libc::__errno_location() = errno };
}

/// The reader fell behind: the pipe is full and the record would be lost.
fn overflow() -> ! {
    const MESSAGE: &[u8] = b"airloop: signal bridge pipe overflow, aborting\n";

    sys_write(libc::STDERR_FILENO, MESSAGE);
    unsafe { libc::abort() }
}
