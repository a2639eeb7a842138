use super::Reactor;
use super::poller::common::Interest;

use std::os::fd::RawFd;
use std::rc::Rc;

/// Callback invoked when a registered descriptor is ready.
pub(crate) type FdCallback = Rc<dyn Fn(&mut Reactor, RawFd)>;

/// A descriptor registered with the event loop.
///
/// The entry owns the callback (and through it, whatever context the
/// closure captured by reference). The descriptor itself belongs to the
/// caller until shutdown, where the loop closes every entry it still holds.
pub(crate) struct FdEntry {
    pub(crate) fd: RawFd,
    pub(crate) callback: FdCallback,
    pub(crate) interest: Interest,
}
