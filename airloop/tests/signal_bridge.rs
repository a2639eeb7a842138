use airloop::signal::{SigSet, SignalSource, open_signal_source};
use airloop::{Events, Reactor, now};
use libc::{SIGUSR1, SIGUSR2};
use serial_test::serial;
use std::cell::RefCell;
use std::rc::Rc;

fn raise(signo: libc::c_int) {
    assert_eq!(unsafe { libc::raise(signo) }, 0);
}

fn iterate_until(reactor: &mut Reactor, seconds: f64, done: impl Fn() -> bool) {
    let end = now() + seconds;

    while !done() && now() < end {
        match reactor.run_iteration(0.05) {
            Ok(_) => {}
            Err(err) if err.is_interrupted() => {}
            Err(err) => panic!("iteration failed: {err}"),
        }
    }
}

#[test]
#[serial]
fn test_raised_signal_is_dispatched_once() {
    let set = SigSet::from_signals(&[SIGUSR1]).unwrap();
    set.block().unwrap();

    let source = open_signal_source(&set).unwrap();

    let mut reactor = Reactor::new();
    reactor.init().unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();

    reactor
        .register_fd(source.fd(), move |reactor, fd| {
            assert!(reactor.current_events().contains(Events::READ));
            for info in SignalSource::from_raw_fd(fd).read_all().unwrap() {
                s.borrow_mut().push(info.signo);
            }
        })
        .unwrap();

    raise(SIGUSR1);
    iterate_until(&mut reactor, 2.0, || !seen.borrow().is_empty());

    // further iterations must not report the same delivery again
    iterate_until(&mut reactor, 0.1, || false);

    assert_eq!(*seen.borrow(), vec![SIGUSR1 as u32]);
}

#[test]
#[serial]
fn test_record_identifies_the_sender() {
    let set = SigSet::from_signals(&[SIGUSR2]).unwrap();
    set.block().unwrap();

    let source = open_signal_source(&set).unwrap();
    raise(SIGUSR2);

    let info = source.read().unwrap().expect("one record");
    assert_eq!(info.signo, SIGUSR2 as u32);
    assert_eq!(info.pid, std::process::id());
    assert_eq!(info.uid, unsafe { libc::getuid() });
    assert_eq!(source.read().unwrap(), None, "exactly one record");

    source.close();
}

#[test]
#[serial]
fn test_every_delivery_is_recorded() {
    let set = SigSet::from_signals(&[SIGUSR1, SIGUSR2]).unwrap();
    set.block().unwrap();

    let source = open_signal_source(&set).unwrap();
    raise(SIGUSR2);
    raise(SIGUSR1);
    raise(SIGUSR2);

    let signals: Vec<u32> = source
        .read_all()
        .unwrap()
        .into_iter()
        .map(|info| info.signo)
        .collect();

    assert_eq!(
        signals,
        vec![SIGUSR2 as u32, SIGUSR1 as u32, SIGUSR2 as u32]
    );

    source.close();
}

#[test]
#[serial]
fn test_signal_after_shutdown_is_discarded() {
    let set = SigSet::from_signals(&[SIGUSR1]).unwrap();
    set.block().unwrap();

    let source = open_signal_source(&set).unwrap();

    let mut reactor = Reactor::new();
    reactor.init().unwrap();
    reactor.register_fd(source.fd(), |_, _| {}).unwrap();
    reactor.shutdown();

    // nobody reads the old pipe anymore: the delivery is dropped
    raise(SIGUSR1);

    let source = open_signal_source(&set).unwrap();
    raise(SIGUSR1);

    let records = source.read_all().unwrap();
    assert_eq!(records.len(), 1, "only the delivery after reopening is recorded");
    assert_eq!(records[0].signo, SIGUSR1 as u32);

    source.close();
}

#[test]
#[serial]
fn test_closing_a_source_restores_the_previous_one() {
    let set = SigSet::from_signals(&[SIGUSR2]).unwrap();
    set.block().unwrap();

    let first = open_signal_source(&set).unwrap();
    let second = open_signal_source(&set).unwrap();

    raise(SIGUSR2);
    assert_eq!(second.read_all().unwrap().len(), 1);
    assert_eq!(first.read().unwrap(), None, "the newest source takes the signal");

    second.close();
    raise(SIGUSR2);
    assert_eq!(first.read_all().unwrap().len(), 1);

    first.close();
}
