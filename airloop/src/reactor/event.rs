use crate::utils::Key;

use bitflags::bitflags;
use libc::{EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT, EPOLLRDHUP};

bitflags! {
    /// Readiness a dispatched callback is running because of.
    ///
    /// Only meaningful inside a descriptor callback; see
    /// [`Reactor::current_events`](crate::Reactor::current_events).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Events: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const ERROR = 0x04;
    }
}

impl Events {
    /// Translates raw epoll bits.
    ///
    /// Peer hang-up of the read side counts as readable and a full hang-up
    /// as writable, so a callback that only checks one direction still
    /// notices the descriptor is done.
    pub(crate) fn from_epoll(bits: u32) -> Self {
        let mut events = Events::empty();

        if bits & (EPOLLIN | EPOLLRDHUP) as u32 != 0 {
            events |= Events::READ;
        }
        if bits & (EPOLLOUT | EPOLLHUP) as u32 != 0 {
            events |= Events::WRITE;
        }
        if bits & EPOLLERR as u32 != 0 {
            events |= Events::ERROR;
        }

        events
    }
}

/// One slot of the batch reported by a single wait.
///
/// `entry` is cleared when the descriptor is unregistered while the batch
/// is still being dispatched.
pub(crate) struct Event {
    /// Key of the registry entry the event belongs to.
    pub(crate) entry: Option<Key>,

    /// Raw readiness bits reported by the multiplexer.
    pub(crate) bits: u32,
}
