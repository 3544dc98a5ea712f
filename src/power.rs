use crate::crossover::SchedulerHandle;
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info};

/// Host power-state transitions the calendar cares about.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum PowerEvent {
    Sleep,
    Wake,
}

/// Capability interface over the host's sleep/wake notification facility.
///
/// Implementations deliver events into the channel handed to `subscribe` and
/// stop delivering (dropping their end of the channel) after `unsubscribe`.
pub(crate) trait PowerEventSource {
    fn subscribe(&mut self, events: Sender<PowerEvent>) -> io::Result<()>;
    fn unsubscribe(&mut self);
}

/// Forces a crossover re-evaluation when the host wakes from sleep.
///
/// A suspended host runs no timers, so the pending deadline may be
/// arbitrarily stale by the time we resume; re-checking immediately is the
/// only way to catch the midnights that passed while asleep.
#[derive(Debug)]
pub(crate) struct SleepRecoveryMonitor<S> {
    source: S,
    worker: Option<JoinHandle<()>>,
}

impl<S: PowerEventSource> SleepRecoveryMonitor<S> {
    pub(crate) fn start(
        mut source: S,
        scheduler: SchedulerHandle,
    ) -> io::Result<SleepRecoveryMonitor<S>> {
        let (tx, rx) = mpsc::channel();
        source.subscribe(tx)?;
        let worker = thread::Builder::new()
            .name("sleepwatch".into())
            .spawn(move || listen(&rx, &scheduler))?;
        Ok(SleepRecoveryMonitor {
            source,
            worker: Some(worker),
        })
    }

    /// Unsubscribes from the event source and waits for the listener to
    /// drain.  Safe to call more than once.
    pub(crate) fn shutdown(&mut self) {
        self.source.unsubscribe();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn listen(events: &Receiver<PowerEvent>, scheduler: &SchedulerHandle) {
    loop {
        match events.recv() {
            Ok(PowerEvent::Sleep) => info!("host is about to sleep"),
            Ok(PowerEvent::Wake) => {
                info!("host woke up; re-checking the date");
                if let Err(e) = scheduler.reevaluate() {
                    debug!("{e}; ignoring wake event");
                }
            }
            // all senders unsubscribed
            Err(_) => break,
        }
    }
}

/// Poll interval for the clock-jump detector.
const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Extra wall-clock drift tolerated before a jump counts as a resume.
const JUMP_TOLERANCE: Duration = Duration::from_secs(30);

/// Detects system resume by watching the wall clock jump ahead of the
/// monotonic clock.
///
/// The monotonic clock does not advance while the host is suspended, so a
/// resume shows up as wall-clock time the poll never slept through.  On
/// hosts whose monotonic clock does tick through suspend this source stays
/// silent and the crossover timer's hourly cap bounds the staleness instead.
#[derive(Debug, Default)]
pub(crate) struct ClockJumpSource {
    poll: Option<Duration>,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ClockJumpSource {
    pub(crate) fn new() -> ClockJumpSource {
        ClockJumpSource::default()
    }

    #[cfg(test)]
    fn with_poll(poll: Duration) -> ClockJumpSource {
        ClockJumpSource {
            poll: Some(poll),
            stop: None,
            worker: None,
        }
    }
}

impl PowerEventSource for ClockJumpSource {
    fn subscribe(&mut self, events: Sender<PowerEvent>) -> io::Result<()> {
        let (stop, stopped) = mpsc::channel();
        let poll = self.poll.unwrap_or(POLL_INTERVAL);
        let worker = thread::Builder::new()
            .name("clockjump".into())
            .spawn(move || watch(poll, &events, &stopped))?;
        self.stop = Some(stop);
        self.worker = Some(worker);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        // Hanging up the stop channel wakes the poll immediately
        self.stop = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn watch(poll: Duration, events: &Sender<PowerEvent>, stopped: &Receiver<()>) {
    let mut wall = SystemTime::now();
    let mut mono = Instant::now();
    loop {
        match stopped.recv_timeout(poll) {
            Err(RecvTimeoutError::Timeout) => (),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        let wall_elapsed = wall.elapsed().unwrap_or(Duration::ZERO);
        if wall_jumped(wall_elapsed, mono.elapsed()) {
            debug!("wall clock jumped {}s past the poll", wall_elapsed.as_secs());
            if events.send(PowerEvent::Wake).is_err() {
                break;
            }
        }
        wall = SystemTime::now();
        mono = Instant::now();
    }
}

/// True when the wall clock advanced past what the poll could have slept
/// through, i.e. the host was suspended or the clock was stepped forward.
fn wall_jumped(wall_elapsed: Duration, mono_elapsed: Duration) -> bool {
    wall_elapsed > mono_elapsed + JUMP_TOLERANCE
}
