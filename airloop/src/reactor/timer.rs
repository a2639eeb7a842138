use super::Reactor;

use std::fmt;
use std::ptr;
use std::rc::Rc;

/// A timer callback handle.
///
/// A `Timer` wraps the callback together with whatever context it captures.
/// Clones share identity: the timer queue keys its entries by that identity,
/// so at most one deadline is pending per `Timer` at any time, and the same
/// handle is used to reschedule or cancel it.
///
/// # Examples
///
/// ```rust,ignore
/// let tick = Timer::new(|_reactor| println!("tick"));
///
/// reactor.schedule_after(1.0, &tick);
/// reactor.schedule_after(2.0, &tick.clone()); // moves the same entry
/// reactor.cancel(&tick);
/// ```
#[derive(Clone)]
pub struct Timer {
    callback: Rc<dyn Fn(&mut Reactor)>,
}

impl Timer {
    /// Creates a new timer handle around `callback`.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut Reactor) + 'static,
    {
        Self {
            callback: Rc::new(callback),
        }
    }

    /// Returns `true` if both handles denote the same timer.
    pub fn same(&self, other: &Timer) -> bool {
        ptr::addr_eq(Rc::as_ptr(&self.callback), Rc::as_ptr(&other.callback))
    }

    pub(crate) fn fire(&self, reactor: &mut Reactor) {
        (self.callback)(reactor)
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Timer")
            .field(&Rc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

/// An entry in the timer queue.
struct TimerEntry {
    timer: Timer,

    /// Absolute deadline, in [`now`](crate::now) seconds.
    wakeup: f64,
}

/// A timer that fired during the current pass, with the deadline it fired for.
pub(crate) struct Fired {
    pub(crate) timer: Timer,
    pub(crate) wakeup: f64,
}

/// Pending timers, at most one entry per [`Timer`].
///
/// Queues hold a handful of entries, so the queue is a plain vector that is
/// re-sorted whenever it is consulted for dispatch.
#[derive(Default)]
pub(crate) struct TimerQueue {
    entries: Vec<TimerEntry>,
}

impl TimerQueue {
    fn position(&self, timer: &Timer) -> Option<usize> {
        self.entries.iter().position(|e| e.timer.same(timer))
    }

    /// Sets the deadline of `timer`, creating its entry if needed.
    pub(crate) fn schedule_at(&mut self, wakeup: f64, timer: &Timer) {
        match self.position(timer) {
            Some(i) => self.entries[i].wakeup = wakeup,
            None => self.entries.push(TimerEntry {
                timer: timer.clone(),
                wakeup,
            }),
        }
    }

    /// Moves an existing deadline by `increment`.
    ///
    /// Returns `false` when `timer` has no pending entry.
    pub(crate) fn advance(&mut self, increment: f64, timer: &Timer) -> bool {
        match self.position(timer) {
            Some(i) => {
                self.entries[i].wakeup += increment;
                true
            }
            None => false,
        }
    }

    /// Removes the entry of `timer`. Returns `false` if there was none.
    pub(crate) fn cancel(&mut self, timer: &Timer) -> bool {
        match self.position(timer) {
            Some(i) => {
                self.entries.swap_remove(i);
                true
            }
            None => false,
        }
    }

    pub(crate) fn deadline_of(&self, timer: &Timer) -> Option<f64> {
        self.position(timer).map(|i| self.entries[i].wakeup)
    }

    /// Pops the earliest entry due at `now` that is not in `fired`.
    ///
    /// Entries in `fired` already ran during the current pass; they stay
    /// queued for the next one even when their new deadline is already due.
    pub(crate) fn pop_due(&mut self, now: f64, fired: &[Fired]) -> Option<Fired> {
        self.entries.sort_by(|a, b| a.wakeup.total_cmp(&b.wakeup));

        let i = self
            .entries
            .iter()
            .take_while(|e| e.wakeup <= now)
            .position(|e| !fired.iter().any(|f| f.timer.same(&e.timer)))?;

        let entry = self.entries.remove(i);
        Some(Fired {
            timer: entry.timer,
            wakeup: entry.wakeup,
        })
    }

    /// Earliest pending deadline, if any.
    pub(crate) fn earliest(&self) -> Option<f64> {
        self.entries
            .iter()
            .map(|e| e.wakeup)
            .min_by(|a, b| a.total_cmp(b))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Timer {
        Timer::new(|_| {})
    }

    #[test]
    fn clones_share_identity() {
        let a = noop();
        let b = noop();

        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }

    #[test]
    fn schedule_overwrites_existing_entry() {
        let mut queue = TimerQueue::default();
        let t = noop();

        queue.schedule_at(5.0, &t);
        queue.schedule_at(2.0, &t.clone());

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.deadline_of(&t), Some(2.0));
    }

    #[test]
    fn advance_is_relative_to_previous_deadline() {
        let mut queue = TimerQueue::default();
        let t = noop();

        assert!(!queue.advance(1.0, &t));
        queue.schedule_at(10.0, &t);
        assert!(queue.advance(0.5, &t));

        assert_eq!(queue.deadline_of(&t), Some(10.5));
    }

    #[test]
    fn pop_due_respects_order_and_fired_set() {
        let mut queue = TimerQueue::default();
        let (a, b, c) = (noop(), noop(), noop());

        queue.schedule_at(3.0, &c);
        queue.schedule_at(1.0, &a);
        queue.schedule_at(2.0, &b);

        let first = queue.pop_due(2.5, &[]).unwrap();
        assert!(first.timer.same(&a));
        assert_eq!(first.wakeup, 1.0);

        // `a` fired and was re-armed in the past: it must not run again
        queue.schedule_at(0.0, &a);
        let mut fired = vec![first];
        let second = queue.pop_due(2.5, &fired).unwrap();
        assert!(second.timer.same(&b));
        fired.push(second);

        assert!(queue.pop_due(2.5, &fired).is_none());
        assert_eq!(queue.earliest(), Some(0.0));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn cancel_is_a_noop_for_unknown_timers() {
        let mut queue = TimerQueue::default();
        let t = noop();

        assert!(!queue.cancel(&t));
        queue.schedule_at(1.0, &t);
        assert!(queue.cancel(&t));
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.earliest(), None);
    }
}
