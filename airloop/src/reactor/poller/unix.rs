use libc::{
    F_DUPFD_CLOEXEC, ITIMER_REAL, O_CLOEXEC, O_NONBLOCK, close, fcntl, itimerval, pipe2, read,
    setitimer, timeval, write,
};
use std::io;
use std::os::fd::RawFd;
use std::ptr;

/// Reads from a file descriptor into the given buffer.
///
/// Returns the number of bytes read, or a negative value on error.
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> isize {
    unsafe { read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) }
}

/// Writes the buffer to a file descriptor.
///
/// Returns the number of bytes written, or a negative value on error.
/// Async-signal-safe.
pub(crate) fn sys_write(fd: RawFd, buffer: &[u8]) -> isize {
    unsafe { write(fd, buffer.as_ptr() as *const _, buffer.len()) }
}

/// Closes a file descriptor.
pub(crate) fn sys_close(fd: RawFd) {
    unsafe { close(fd) };
}

/// Duplicates a file descriptor with `FD_CLOEXEC` set on the copy.
pub(crate) fn sys_dup_cloexec(fd: RawFd) -> io::Result<RawFd> {
    let copy = unsafe { fcntl(fd, F_DUPFD_CLOEXEC, 0) };
    if copy < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(copy)
}

/// Creates a non-blocking, close-on-exec pipe.
///
/// Returns `(read_end, write_end)`.
pub(crate) fn sys_pipe() -> io::Result<(RawFd, RawFd)> {
    let mut fds = [-1; 2];

    let rc = unsafe { pipe2(fds.as_mut_ptr(), O_NONBLOCK | O_CLOEXEC) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok((fds[0], fds[1]))
}

/// Arms the process-wide `ITIMER_REAL` to deliver `SIGALRM` once after
/// `micros` microseconds. Zero disarms it.
pub(crate) fn sys_set_alarm(micros: u64) -> io::Result<()> {
    let value = timeval {
        tv_sec: (micros / 1_000_000) as libc::time_t,
        tv_usec: (micros % 1_000_000) as libc::suseconds_t,
    };
    let timer = itimerval {
        it_interval: timeval {
            tv_sec: 0,
            tv_usec: 0,
        },
        it_value: value,
    };

    let rc = unsafe { setitimer(ITIMER_REAL, &timer, ptr::null_mut()) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}
