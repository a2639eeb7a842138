use libc::{
    SIGBUS, SIGCHLD, SIGFPE, SIGILL, SIGIO, SIGSEGV, SIGTRAP, c_int, c_long, c_void, clock_t,
    pid_t, siginfo_t, sigval, uid_t,
};

/// Size in bytes of one record written into the bridge pipe.
pub const RECORD_SIZE: usize = 128;

/// `si_code` of a signal raised by an expiring POSIX timer.
const SI_TIMER: c_int = -2;

/// Metadata of one delivered signal.
///
/// This is the record the bridge writes for every signal: the same fields,
/// in the same order, as the kernel's `signalfd_siginfo`, padded to
/// [`RECORD_SIZE`] bytes. Fields that do not apply to the signal are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalInfo {
    pub signo: u32,
    pub errno: i32,
    pub code: i32,
    /// PID of the sender, or of the child for `SIGCHLD`.
    pub pid: u32,
    pub uid: u32,
    /// Descriptor that triggered `SIGIO`.
    pub fd: i32,
    /// Kernel timer ID (POSIX timers).
    pub tid: u32,
    pub band: u32,
    /// POSIX timer overrun count.
    pub overrun: u32,
    pub trapno: u32,
    /// Exit status or terminating signal (`SIGCHLD`).
    pub status: i32,
    /// Integer sent with `sigqueue(3)`.
    pub int: i32,
    /// Pointer sent with `sigqueue(3)`.
    pub ptr: u64,
    pub utime: u64,
    pub stime: u64,
    /// Faulting address for hardware-generated signals.
    pub addr: u64,
}

// Overlay of the kernel's `siginfo_t`; the union starts at the first
// suitably aligned offset after the three leading ints, as in C.
#[repr(C)]
#[derive(Clone, Copy)]
struct Rt {
    pid: pid_t,
    uid: uid_t,
    value: sigval,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct PosixTimer {
    tid: c_int,
    overrun: c_int,
    value: sigval,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct Child {
    pid: pid_t,
    uid: uid_t,
    status: c_int,
    utime: clock_t,
    stime: clock_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct Fault {
    addr: *mut c_void,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct Poll {
    band: c_long,
    fd: c_int,
}

#[repr(C)]
union Fields {
    rt: Rt,
    timer: PosixTimer,
    child: Child,
    fault: Fault,
    poll: Poll,
}

#[repr(C)]
struct RawSiginfo {
    signo: c_int,
    errno: c_int,
    code: c_int,
    fields: Fields,
}

fn sigval_int(value: sigval) -> i32 {
    let bytes = (value.sival_ptr as usize).to_ne_bytes();
    i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn word(buf: &[u8; RECORD_SIZE], at: usize) -> [u8; 4] {
    let mut word = [0; 4];
    word.copy_from_slice(&buf[at..at + 4]);
    word
}

fn dword(buf: &[u8; RECORD_SIZE], at: usize) -> [u8; 8] {
    let mut dword = [0; 8];
    dword.copy_from_slice(&buf[at..at + 8]);
    dword
}

impl SignalInfo {
    /// Captures the metadata of a delivered signal.
    ///
    /// Async-signal-safe: no allocation, no locking.
    pub(crate) fn from_siginfo(info: &siginfo_t) -> Self {
        let raw = unsafe { &*(info as *const siginfo_t as *const RawSiginfo) };

        let mut out = SignalInfo {
            signo: raw.signo as u32,
            errno: raw.errno,
            code: raw.code,
            ..SignalInfo::default()
        };

        match raw.signo {
            SIGCHLD => {
                let child = unsafe { raw.fields.child };
                out.pid = child.pid as u32;
                out.uid = child.uid;
                out.status = child.status;
                out.utime = child.utime as u64;
                out.stime = child.stime as u64;
            }
            SIGSEGV | SIGBUS | SIGILL | SIGFPE | SIGTRAP => {
                let fault = unsafe { raw.fields.fault };
                out.addr = fault.addr as usize as u64;
            }
            SIGIO => {
                let poll = unsafe { raw.fields.poll };
                out.band = poll.band as u32;
                out.fd = poll.fd;
            }
            _ if raw.code == SI_TIMER => {
                let timer = unsafe { raw.fields.timer };
                out.tid = timer.tid as u32;
                out.overrun = timer.overrun as u32;
                out.int = sigval_int(timer.value);
                out.ptr = timer.value.sival_ptr as usize as u64;
            }
            _ => {
                let rt = unsafe { raw.fields.rt };
                out.pid = rt.pid as u32;
                out.uid = rt.uid;
                out.int = sigval_int(rt.value);
                out.ptr = rt.value.sival_ptr as usize as u64;
            }
        }

        out
    }

    /// Serializes the record. Async-signal-safe.
    pub(crate) fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        let mut at = 0;
        let mut put = |bytes: &[u8]| {
            buf[at..at + bytes.len()].copy_from_slice(bytes);
            at += bytes.len();
        };

        put(&self.signo.to_ne_bytes());
        put(&self.errno.to_ne_bytes());
        put(&self.code.to_ne_bytes());
        put(&self.pid.to_ne_bytes());
        put(&self.uid.to_ne_bytes());
        put(&self.fd.to_ne_bytes());
        put(&self.tid.to_ne_bytes());
        put(&self.band.to_ne_bytes());
        put(&self.overrun.to_ne_bytes());
        put(&self.trapno.to_ne_bytes());
        put(&self.status.to_ne_bytes());
        put(&self.int.to_ne_bytes());
        put(&self.ptr.to_ne_bytes());
        put(&self.utime.to_ne_bytes());
        put(&self.stime.to_ne_bytes());
        put(&self.addr.to_ne_bytes());

        buf
    }

    /// Decodes a record read from the bridge pipe.
    pub fn from_bytes(buf: &[u8; RECORD_SIZE]) -> Self {
        SignalInfo {
            signo: u32::from_ne_bytes(word(buf, 0)),
            errno: i32::from_ne_bytes(word(buf, 4)),
            code: i32::from_ne_bytes(word(buf, 8)),
            pid: u32::from_ne_bytes(word(buf, 12)),
            uid: u32::from_ne_bytes(word(buf, 16)),
            fd: i32::from_ne_bytes(word(buf, 20)),
            tid: u32::from_ne_bytes(word(buf, 24)),
            band: u32::from_ne_bytes(word(buf, 28)),
            overrun: u32::from_ne_bytes(word(buf, 32)),
            trapno: u32::from_ne_bytes(word(buf, 36)),
            status: i32::from_ne_bytes(word(buf, 40)),
            int: i32::from_ne_bytes(word(buf, 44)),
            ptr: u64::from_ne_bytes(dword(buf, 48)),
            utime: u64::from_ne_bytes(dword(buf, 56)),
            stime: u64::from_ne_bytes(dword(buf, 64)),
            addr: u64::from_ne_bytes(dword(buf, 72)),
        }
    }
}
