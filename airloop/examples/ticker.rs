//! Prints a tick every second until interrupted.
//!
//! Run with: RUST_LOG=airloop=trace cargo run -p airloop --example ticker

use airloop::signal::{SigSet, SignalSource, open_signal_source};
use airloop::{Reactor, Timer};

use libc::{SIGINT, SIGTERM};
use std::cell::{Cell, OnceCell};
use std::rc::Rc;
use tracing::{info, warn};

const PERIOD: f64 = 1.0;

fn main() -> airloop::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut reactor = Reactor::new();
    reactor.init()?;

    let set = SigSet::from_signals(&[SIGINT, SIGTERM])?;
    set.block()?;
    let source = open_signal_source(&set)?;

    let done = Rc::new(Cell::new(false));
    let stop = done.clone();

    reactor.register_fd(source.fd(), move |_, fd| {
        match SignalSource::from_raw_fd(fd).read_all() {
            Ok(records) => {
                for record in records {
                    info!(signal = record.signo, pid = record.pid, "termination requested");
                    stop.set(true);
                }
            }
            Err(err) => warn!(%err, "failed to read signal records"),
        }
    })?;

    // The handle is only known once the timer exists.
    let slot: Rc<OnceCell<Timer>> = Rc::default();
    let handle = slot.clone();
    let ticks = Cell::new(0u64);

    let tick = Timer::new(move |reactor| {
        ticks.set(ticks.get() + 1);
        println!("tick {} at {:.3}s", ticks.get(), airloop::now());

        if let Some(me) = handle.get() {
            reactor.reschedule_relative(PERIOD, me);
        }
    });
    let _ = slot.set(tick.clone());
    reactor.schedule_after(PERIOD, &tick);

    println!("ticking every {PERIOD}s, press Ctrl-C to stop");

    while !done.get() {
        match reactor.run_iteration(5.0) {
            Ok(_) => {}
            Err(err) if err.is_interrupted() => {}
            Err(err) => return Err(err),
        }
    }

    reactor.shutdown();
    Ok(())
}
