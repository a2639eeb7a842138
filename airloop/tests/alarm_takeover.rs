//! Runs alone in its own process: while a caller bridges `SIGALRM` itself,
//! the interval timer reports to that caller's source.

use airloop::signal::{SigSet, SignalSource, open_signal_source};
use airloop::{Reactor, Timer, now};
use libc::SIGALRM;
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_caller_source_takes_over_alarms() {
    let mut reactor = Reactor::new();
    reactor.init().unwrap();

    let set = SigSet::from_signals(&[SIGALRM]).unwrap();
    set.block().unwrap();
    let source = open_signal_source(&set).unwrap();

    let alarms = Rc::new(Cell::new(0));
    let a = alarms.clone();
    reactor
        .register_fd(source.fd(), move |_, fd| {
            let records = SignalSource::from_raw_fd(fd).read_all().unwrap();
            assert!(records.iter().all(|info| info.signo == SIGALRM as u32));
            a.set(a.get() + records.len());
        })
        .unwrap();

    let fired = Rc::new(Cell::new(false));
    let f = fired.clone();
    reactor.schedule_after(0.05, &Timer::new(move |_| f.set(true)));

    let end = now() + 2.0;
    while !fired.get() && now() < end {
        match reactor.run_iteration(5.0) {
            Ok(_) => {}
            Err(err) if err.is_interrupted() => {}
            Err(err) => panic!("iteration failed: {err}"),
        }
    }

    assert!(fired.get(), "the loop must still wake for its timers");
    assert!(alarms.get() >= 1, "alarms must reach the caller's source");

    // once the caller's source is gone, alarms go back to the loop
    reactor.unregister_fd(source.fd());
    source.close();

    let seen = alarms.get();
    fired.set(false);
    let f = fired.clone();
    reactor.schedule_after(0.05, &Timer::new(move |_| f.set(true)));

    let end = now() + 2.0;
    while !fired.get() && now() < end {
        match reactor.run_iteration(5.0) {
            Ok(_) => {}
            Err(err) if err.is_interrupted() => {}
            Err(err) => panic!("iteration failed: {err}"),
        }
    }

    assert!(fired.get(), "the loop must wake after the caller's source closed");
    assert_eq!(alarms.get(), seen);
}
