use super::alarm;
use super::builder::ReactorBuilder;
use super::event::{Event, Events};
use super::io::FdEntry;
use super::poller::Poller;
use super::poller::common::Interest;
use super::poller::platform::sys_close;
use super::timer::{Fired, Timer, TimerQueue};
use crate::error::{Error, Result};
use crate::signal;
use crate::time::now;
use crate::utils::{Key, Slab};

use std::io;
use std::os::fd::RawFd;
use std::rc::Rc;
use tracing::{debug, trace};

/// The event loop.
///
/// A `Reactor` multiplexes three event sources into one blocking wait per
/// iteration:
/// - readiness of registered file descriptors,
/// - a queue of software timers,
/// - process signals, delivered through the [signal bridge](crate::signal).
///
/// It is single-threaded and cooperative: callbacks run one at a time, to
/// completion, on the thread calling [`run_iteration`](Self::run_iteration),
/// and receive `&mut Reactor` so they can register, unregister, schedule and
/// cancel freely while the loop is dispatching.
///
/// # Examples
///
/// ```rust,ignore
/// let mut reactor = Reactor::new();
/// reactor.init()?;
///
/// reactor.register_fd(listener.as_raw_fd(), |reactor, fd| {
///     // accept and register the client
/// })?;
///
/// while !done.get() {
///     match reactor.run_iteration(5.0) {
///         Ok(_) => {}
///         Err(err) if err.is_interrupted() => {}
///         Err(err) => return Err(err),
///     }
/// }
/// reactor.shutdown();
/// ```
pub struct Reactor {
    /// Readiness multiplexer, created by `init` or the first iteration.
    poller: Option<Poller>,

    /// Registered descriptors. Lookup by descriptor is a linear scan.
    fds: Slab<FdEntry>,

    /// Pending timers.
    timers: TimerQueue,

    /// Timers fired by the running timer pass.
    completed: Vec<Fired>,

    /// Events reported by the last wait, scrubbed by `unregister_fd`.
    batch: Vec<Event>,

    batch_capacity: usize,
    min_arm_delay: f64,

    /// Readiness of the descriptor whose callback is running.
    current: Events,

    /// This reactor's duplicate of the `SIGALRM` bridge descriptor.
    alarm: Option<RawFd>,
}

impl Reactor {
    /// Creates a reactor with the default configuration.
    ///
    /// Equivalent to `ReactorBuilder::new().build()`.
    pub fn new() -> Self {
        ReactorBuilder::new().build()
    }

    pub(crate) fn with_config(batch_capacity: usize, min_arm_delay: f64) -> Self {
        Self {
            poller: None,
            fds: Slab::with_capacity(batch_capacity),
            timers: TimerQueue::default(),
            completed: Vec::new(),
            batch: Vec::with_capacity(batch_capacity),
            batch_capacity,
            min_arm_delay,
            current: Events::empty(),
            alarm: None,
        }
    }

    /// Creates the readiness multiplexer.
    ///
    /// Descriptors registered before this call are subscribed now, and the
    /// loop's interval-timer descriptor is registered. Calling `init` on an
    /// initialized reactor does nothing.
    pub fn init(&mut self) -> Result<()> {
        if self.poller.is_none() {
            let mut poller = Poller::new(self.batch_capacity).map_err(Error::CreatePoller)?;

            for (key, entry) in self.fds.iter() {
                poller
                    .add(entry.fd, key, entry.interest)
                    .map_err(|source| Error::Subscribe {
                        fd: entry.fd,
                        source,
                    })?;
            }

            debug!(
                capacity = self.batch_capacity,
                preregistered = self.fds.len(),
                "readiness multiplexer created"
            );
            self.poller = Some(poller);
        }

        if self.alarm.is_none() {
            let fd = alarm::open()?;
            // Alarms left unread by another loop would wake the first wait.
            alarm::drain(fd);
            if let Err(err) = self.register_fd(fd, |_, fd| alarm::drain(fd)) {
                sys_close(fd);
                return Err(err);
            }
            self.alarm = Some(fd);
        }

        Ok(())
    }

    /// Returns `true` once [`init`](Self::init) has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.poller.is_some() && self.alarm.is_some()
    }

    /// Runs one iteration of the loop.
    ///
    /// 1. Fires every timer due now.
    /// 2. Arms the interval timer for the earliest remaining deadline, or
    ///    `max_delay` seconds from now if that comes first.
    /// 3. Blocks until a registered descriptor is ready or the interval
    ///    timer fires.
    /// 4. Dispatches each ready descriptor's callback once.
    ///
    /// Returns the number of ready descriptors reported by the wait. When a
    /// signal interrupts the wait, the multiplexer is polled once more
    /// without blocking, so the bridge record the signal left behind is
    /// dispatched in the same iteration. Should that poll be interrupted
    /// too, the error is returned and [`Error::is_interrupted`] holds for
    /// it; callers just run the next iteration.
    ///
    /// The multiplexer is created first if [`init`](Self::init) has not been
    /// called. Must not be called from inside a callback.
    ///
    /// The interval timer is shared by the whole process: while one reactor
    /// waits, no other reactor may run an iteration.
    pub fn run_iteration(&mut self, max_delay: f64) -> Result<usize> {
        if !self.is_initialized() {
            self.init()?;
        }

        let start = now();
        let mut deadline = start + max_delay;
        self.run_due(start, &mut deadline);

        // A timer callback may have shut the loop down.
        let Some(poller) = self.poller.as_mut() else {
            return Ok(0);
        };

        alarm::arm(deadline - start, self.min_arm_delay)?;
        let mut waited = poller.wait(&mut self.batch, -1);
        if matches!(&waited, Err(err) if err.kind() == io::ErrorKind::Interrupted) {
            trace!("wait interrupted, polling for the signal record");
            waited = poller.wait(&mut self.batch, 0);
        }
        alarm::disarm()?;

        let ready = match waited {
            Ok(ready) => ready,
            Err(err) => {
                trace!(%err, "readiness wait failed");
                return Err(Error::Wait(err));
            }
        };

        self.dispatch();

        Ok(ready)
    }

    fn dispatch(&mut self) {
        let mut i = 0;

        while let Some(slot) = self.batch.get(i) {
            i += 1;

            let Some(key) = slot.entry else {
                trace!(slot = i - 1, "skipping unregistered descriptor");
                continue;
            };

            let Some(entry) = self.fds.get(key) else {
                continue;
            };

            let fd = entry.fd;
            let callback = Rc::clone(&entry.callback);

            self.current = Events::from_epoll(slot.bits);
            callback(self, fd);
        }

        self.current = Events::empty();
    }

    /// Closes the multiplexer and every registered descriptor, and drops
    /// every pending timer.
    ///
    /// Registered signal sources are closed like
    /// [`SignalSource::close`](crate::signal::SignalSource::close): their
    /// signals stop being routed to them.
    ///
    /// The reactor can be initialized again afterwards. Calling `shutdown`
    /// twice is harmless; it also runs on drop.
    pub fn shutdown(&mut self) {
        if self.poller.take().is_some() {
            debug!(
                descriptors = self.fds.len(),
                timers = self.timers.len(),
                "event loop shut down"
            );
        }

        for entry in self.fds.drain() {
            signal::release(entry.fd);
            sys_close(entry.fd);
        }

        self.batch.clear();
        self.timers.clear();
        self.completed.clear();
        self.current = Events::empty();
        self.alarm = None;
    }

    /// Looks up a caller's entry. The loop's own descriptor is never found.
    fn find(&self, fd: RawFd) -> Option<Key> {
        if self.alarm == Some(fd) {
            return None;
        }

        self.fds
            .iter()
            .find(|(_, entry)| entry.fd == fd)
            .map(|(key, _)| key)
    }

    /// Registers `fd` for readiness with `callback`.
    ///
    /// A new entry is subscribed with [`Interest::READ`]. Registering an
    /// `fd` that already has an entry only replaces its callback; interest
    /// and subscription are left untouched, which makes it safe from inside
    /// the descriptor's own callback.
    ///
    /// Before [`init`](Self::init), the entry is recorded and subscribed
    /// once the multiplexer exists.
    pub fn register_fd<F>(&mut self, fd: RawFd, callback: F) -> Result<()>
    where
        F: Fn(&mut Reactor, RawFd) + 'static,
    {
        if let Some(key) = self.find(fd) {
            if let Some(entry) = self.fds.get_mut(key) {
                entry.callback = Rc::new(callback);
            }
            return Ok(());
        }

        let interest = Interest::default();
        let key = self.fds.insert(FdEntry {
            fd,
            callback: Rc::new(callback),
            interest,
        });

        if let Some(poller) = self.poller.as_mut() {
            if let Err(source) = poller.add(fd, key, interest) {
                self.fds.remove(key);
                return Err(Error::Subscribe { fd, source });
            }
        }

        trace!(fd, "descriptor registered");
        Ok(())
    }

    /// Removes the entry of `fd`, if any.
    ///
    /// The descriptor is not closed. If it is still waiting for dispatch in
    /// the current batch, it will not be dispatched. The loop's own
    /// interval-timer descriptor cannot be removed.
    pub fn unregister_fd(&mut self, fd: RawFd) {
        let Some(key) = self.find(fd) else {
            return;
        };

        if let Some(poller) = self.poller.as_ref() {
            if let Err(err) = poller.delete(fd) {
                debug!(fd, %err, "ignoring failed unsubscribe");
            }
        }

        for slot in &mut self.batch {
            if slot.entry == Some(key) {
                slot.entry = None;
            }
        }

        self.fds.remove(key);
        trace!(fd, "descriptor unregistered");
    }

    /// Changes the readiness `fd` is subscribed to.
    pub fn set_interest(&mut self, fd: RawFd, interest: Interest) -> Result<()> {
        let key = self.find(fd).ok_or(Error::NotRegistered(fd))?;

        if let Some(poller) = self.poller.as_ref() {
            poller
                .modify(fd, key, interest)
                .map_err(|source| Error::Subscribe { fd, source })?;
        }

        if let Some(entry) = self.fds.get_mut(key) {
            entry.interest = interest;
        }

        Ok(())
    }

    /// Readiness the running descriptor callback was dispatched for.
    ///
    /// Empty outside of a descriptor callback.
    pub fn current_events(&self) -> Events {
        self.current
    }

    /// Descriptors registered by callers, in registration-slot order.
    ///
    /// The loop's own interval-timer descriptor is not listed.
    pub fn registered_fds(&self) -> Vec<RawFd> {
        self.fds
            .iter()
            .map(|(_, entry)| entry.fd)
            .filter(|&fd| Some(fd) != self.alarm)
            .collect()
    }

    /// Number of subscriptions made with the multiplexer since it was
    /// created, the loop's own descriptor included.
    pub fn subscriptions(&self) -> usize {
        self.poller.as_ref().map_or(0, Poller::subscriptions)
    }

    /// Schedules `timer` to fire `delay` seconds from now.
    ///
    /// A pending deadline for the same timer is replaced. A delay of zero or
    /// less makes the timer due on the next iteration.
    pub fn schedule_after(&mut self, delay: f64, timer: &Timer) {
        self.timers.schedule_at(now() + delay, timer);
    }

    /// Moves the deadline of `timer` by `increment` seconds.
    ///
    /// The new deadline is computed from the previous one, not from the
    /// current time, so a periodic timer re-arming itself from its own
    /// callback does not drift. Inside that callback the previous deadline
    /// is the one that just fired.
    ///
    /// A timer with no deadline to move is scheduled `increment` seconds
    /// from now, like [`schedule_after`](Self::schedule_after).
    pub fn reschedule_relative(&mut self, increment: f64, timer: &Timer) {
        if self.timers.advance(increment, timer) {
            return;
        }

        match self.completed.iter().find(|f| f.timer.same(timer)) {
            Some(fired) => self.timers.schedule_at(fired.wakeup + increment, timer),
            None => self.schedule_after(increment, timer),
        }
    }

    /// Cancels the pending deadline of `timer`, if any.
    pub fn cancel(&mut self, timer: &Timer) {
        if self.timers.cancel(timer) {
            trace!(?timer, "timer cancelled");
        }
    }

    /// Number of pending timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Pending deadline of `timer`, in [`now`](crate::now) seconds.
    pub fn deadline_of(&self, timer: &Timer) -> Option<f64> {
        self.timers.deadline_of(timer)
    }

    /// Fires every timer due at `now`, earliest first, and returns how many
    /// fired.
    ///
    /// Callbacks may schedule, reschedule and cancel timers. A timer fires
    /// at most once per call, even if it re-arms itself into the past; a
    /// timer scheduled during the pass that is already due at `now` fires in
    /// the same pass.
    ///
    /// On return `deadline` is the earlier of its input value and the
    /// earliest deadline still pending.
    pub fn run_due(&mut self, now: f64, deadline: &mut f64) -> usize {
        self.completed.clear();

        while let Some(fired) = self.timers.pop_due(now, &self.completed) {
            let timer = fired.timer.clone();
            trace!(?timer, wakeup = fired.wakeup, "timer fired");

            self.completed.push(fired);
            timer.fire(self);
        }

        if let Some(earliest) = self.timers.earliest() {
            if earliest < *deadline {
                *deadline = earliest;
            }
        }

        let count = self.completed.len();
        self.completed.clear();
        count
    }
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
