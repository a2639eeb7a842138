use bitflags::bitflags;

bitflags! {
    /// Readiness a descriptor entry subscribes to.
    ///
    /// New entries start with [`Interest::READ`]; use
    /// [`Reactor::set_interest`](crate::Reactor::set_interest) to change it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Interest: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
    }
}

impl Default for Interest {
    fn default() -> Self {
        Interest::READ
    }
}
