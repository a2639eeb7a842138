use airloop::{Events, Reactor, ReactorBuilder, Timer, now};
use serial_test::serial;
use std::cell::{Cell, RefCell};
use std::io::Write;
use std::os::fd::IntoRawFd;
use std::os::unix::net::UnixStream;
use std::rc::Rc;

/// Runs iterations for `seconds`, retrying interrupted waits.
fn run_for(reactor: &mut Reactor, seconds: f64, max_delay: f64) {
    let end = now() + seconds;

    while now() < end {
        match reactor.run_iteration(max_delay) {
            Ok(_) => {}
            Err(err) if err.is_interrupted() => {}
            Err(err) => panic!("iteration failed: {err}"),
        }
    }
}

#[test]
#[serial]
fn test_ready_descriptor_without_timers() {
    let mut reactor = Reactor::new();
    reactor.init().unwrap();

    let (ours, mut peer) = UnixStream::pair().unwrap();
    let fd = ours.into_raw_fd();

    let calls = Rc::new(Cell::new(0));
    let seen = Rc::new(Cell::new(Events::empty()));
    let (c, s) = (calls.clone(), seen.clone());

    reactor
        .register_fd(fd, move |reactor, ready| {
            assert_eq!(ready, fd);
            c.set(c.get() + 1);
            s.set(reactor.current_events());
        })
        .unwrap();

    peer.write_all(b"ping").unwrap();

    let start = now();
    assert_eq!(reactor.run_iteration(5.0).unwrap(), 1);

    assert!(now() - start < 1.0, "a ready descriptor must not wait");
    assert_eq!(calls.get(), 1);
    assert_eq!(seen.get(), Events::READ);
}

#[test]
#[serial]
fn test_timer_fires_once_on_time() {
    let mut reactor = Reactor::new();
    let fired = Rc::new(RefCell::new(Vec::new()));
    let f = fired.clone();

    let timer = Timer::new(move |_| f.borrow_mut().push(now()));

    let start = now();
    reactor.schedule_after(0.1, &timer);
    run_for(&mut reactor, 0.5, 1.0);

    let fired = fired.borrow();
    assert_eq!(fired.len(), 1, "timer fired {} times", fired.len());

    let delay = fired[0] - start;
    assert!(delay >= 0.1, "fired early, after {delay}s");
    assert!(delay < 0.3, "fired late, after {delay}s");
    assert_eq!(reactor.pending_timers(), 0);
}

#[test]
#[serial]
fn test_cancelled_timer_never_fires() {
    let mut reactor = Reactor::new();
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();

    let timer = Timer::new(move |_| c.set(c.get() + 1));
    reactor.schedule_after(10.0, &timer);
    reactor.cancel(&timer);

    run_for(&mut reactor, 0.2, 0.05);

    let mut deadline = f64::INFINITY;
    assert_eq!(reactor.run_due(now() + 20.0, &mut deadline), 0);
    assert_eq!(calls.get(), 0);
}

#[test]
#[serial]
fn test_max_delay_bounds_the_wait() {
    let mut reactor = Reactor::new();

    let start = now();
    assert_eq!(
        reactor.run_iteration(0.05).unwrap(),
        1,
        "only the interval timer can wake an empty loop"
    );

    let waited = now() - start;
    assert!(waited >= 0.04 && waited < 1.0, "waited {waited}s");
}

#[test]
#[serial]
fn test_deadline_wakes_through_readiness() {
    let mut reactor = Reactor::new();
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();

    reactor.schedule_after(0.05, &Timer::new(move |_| c.set(c.get() + 1)));

    // the alarm record is dispatched by the iteration that armed it
    assert_eq!(reactor.run_iteration(5.0).unwrap(), 1);
    assert_eq!(calls.get(), 0);

    // and the timer runs first thing in the next one
    reactor.run_iteration(0.01).unwrap();
    assert_eq!(calls.get(), 1);
}

#[test]
#[serial]
fn test_run_iteration_initializes() {
    let mut reactor = ReactorBuilder::new().batch_capacity(4).build();
    assert!(!reactor.is_initialized());

    run_for(&mut reactor, 0.01, 0.001);

    assert!(reactor.is_initialized());
    assert_eq!(reactor.subscriptions(), 1);
    assert!(reactor.registered_fds().is_empty());
}

#[test]
#[serial]
fn test_timer_can_shut_the_loop_down() {
    let mut reactor = Reactor::new();
    reactor.init().unwrap();

    let (ours, _peer) = UnixStream::pair().unwrap();
    reactor.register_fd(ours.into_raw_fd(), |_, _| {}).unwrap();

    let stop = Timer::new(|reactor| reactor.shutdown());
    reactor.schedule_after(0.0, &stop);

    assert_eq!(reactor.run_iteration(5.0).unwrap(), 0);
    assert!(!reactor.is_initialized());
    assert!(reactor.registered_fds().is_empty());
}

#[test]
#[serial]
fn test_shutdown_is_idempotent() {
    let mut reactor = Reactor::new();
    reactor.init().unwrap();

    let (ours, _peer) = UnixStream::pair().unwrap();
    reactor.register_fd(ours.into_raw_fd(), |_, _| {}).unwrap();
    reactor.schedule_after(1.0, &Timer::new(|_| {}));

    reactor.shutdown();
    reactor.shutdown();

    assert!(!reactor.is_initialized());
    assert!(reactor.registered_fds().is_empty());
    assert_eq!(reactor.pending_timers(), 0);
    assert_eq!(reactor.subscriptions(), 0);

    reactor.init().unwrap();
    assert!(reactor.is_initialized());
    assert_eq!(reactor.subscriptions(), 1);
}

#[test]
#[serial]
fn test_independent_loops() {
    let mut first = Reactor::new();
    let mut second = Reactor::new();
    first.init().unwrap();
    second.init().unwrap();

    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    second.schedule_after(0.0, &Timer::new(move |_| c.set(c.get() + 1)));

    run_for(&mut first, 0.05, 0.01);
    assert_eq!(calls.get(), 0, "timers belong to the loop they were scheduled on");
    assert_eq!(second.pending_timers(), 1);

    run_for(&mut second, 0.05, 0.01);
    assert_eq!(calls.get(), 1);
}
