use crate::clock::ClockSource;
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use time::{Date, PrimitiveDateTime, Time};
use tracing::{debug, info, warn};

/// Longest interval the crossover timer will sleep before re-checking the
/// clock, so that a missed wake event leaves the calendar stale for at most
/// an hour.
pub(crate) const MAX_ARM_SECONDS: u64 = 3600;

/// Seconds until the next midnight after `now`, capped at [`MAX_ARM_SECONDS`].
pub(crate) fn seconds_till_tomorrow(now: PrimitiveDateTime) -> u64 {
    let Some(tomorrow) = now.date().next_day() else {
        // The end of representable time; keep re-checking at the cap.
        return MAX_ARM_SECONDS;
    };
    let midnight = PrimitiveDateTime::new(tomorrow, Time::MIDNIGHT);
    u64::try_from((midnight - now).whole_seconds())
        .unwrap_or(0)
        .min(MAX_ARM_SECONDS)
}

/// Outcome of a single crossover evaluation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Crossing {
    /// The new displayed date, if the clock's date moved past it.
    pub(crate) advanced: Option<Date>,
    /// Delay until the next scheduled evaluation.
    pub(crate) rearm_after: Duration,
}

/// The displayed date plus the rule for advancing it.
///
/// Owned exclusively by the timer thread; the date is equal to or one day
/// behind the host's current date, never ahead.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct CrossoverState {
    displayed: Date,
}

impl CrossoverState {
    pub(crate) fn new(displayed: Date) -> CrossoverState {
        CrossoverState { displayed }
    }

    /// Advances the displayed date iff the clock's date is strictly past it.
    /// Evaluating again without the clock moving only recomputes the re-arm
    /// delay.
    pub(crate) fn evaluate(&mut self, now: PrimitiveDateTime) -> Crossing {
        let advanced = (self.displayed < now.date()).then(|| {
            self.displayed = now.date();
            self.displayed
        });
        Crossing {
            advanced,
            rearm_after: Duration::from_secs(seconds_till_tomorrow(now)),
        }
    }
}

/// The UI side of the rebuild channel has hung up.
#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
#[error("ui context is gone")]
pub(crate) struct UiGone;

/// The timer thread is no longer accepting commands.
#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
#[error("crossover timer is shut down")]
pub(crate) struct TimerArmError;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Command {
    Reevaluate,
    Shutdown,
}

/// Owns the dedicated timer thread that advances the displayed date at
/// midnight and re-arms itself.
///
/// The pending timer is the thread's `recv_timeout` deadline: there is at
/// most one, and the timer firing and a forced re-evaluation both funnel
/// through the same loop, so a cancel/fire race can cost at most one
/// redundant no-op evaluation, never a double rebuild.
#[derive(Debug)]
pub(crate) struct CrossoverScheduler {
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl CrossoverScheduler {
    /// Starts the timer thread with `displayed` as the date currently shown.
    ///
    /// `post` hands a crossed-over date to the UI-owning context; it runs on
    /// the timer thread and must not touch UI state itself.
    pub(crate) fn start<C, F>(clock: C, displayed: Date, post: F) -> io::Result<CrossoverScheduler>
    where
        C: ClockSource + 'static,
        F: FnMut(Date) -> Result<(), UiGone> + Send + 'static,
    {
        let (commands, inbox) = mpsc::channel();
        let state = CrossoverState::new(displayed);
        let worker = thread::Builder::new()
            .name("crossover".into())
            .spawn(move || run(&clock, state, post, &inbox))?;
        Ok(CrossoverScheduler {
            commands,
            worker: Some(worker),
        })
    }

    pub(crate) fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            commands: self.commands.clone(),
        }
    }

    /// Stops the timer thread, cancelling any pending deadline.  Safe to
    /// call with no timer armed, or more than once.
    pub(crate) fn shutdown(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for CrossoverScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Clonable handle for collaborators that need to poke the scheduler.
#[derive(Clone, Debug)]
pub(crate) struct SchedulerHandle {
    commands: Sender<Command>,
}

impl SchedulerHandle {
    /// Cancels the pending deadline and evaluates the crossover right away.
    /// Idempotent: if the date has not advanced this only re-arms the timer.
    pub(crate) fn reevaluate(&self) -> Result<(), TimerArmError> {
        self.commands
            .send(Command::Reevaluate)
            .map_err(|_| TimerArmError)
    }
}

fn run<C, F>(clock: &C, mut state: CrossoverState, mut post: F, inbox: &Receiver<Command>)
where
    C: ClockSource,
    F: FnMut(Date) -> Result<(), UiGone>,
{
    loop {
        let delay = match clock.now() {
            Ok(now) => {
                let crossing = state.evaluate(now);
                if let Some(date) = crossing.advanced {
                    info!("date crossed over to {date}");
                    if post(date).is_err() {
                        debug!("ui context is gone; stopping the crossover timer");
                        break;
                    }
                }
                crossing.rearm_after
            }
            Err(e) => {
                // Keep the previous displayed date and retry later.
                warn!("{e}; retrying");
                Duration::from_secs(MAX_ARM_SECONDS)
            }
        };
        debug!("re-armed crossover check after {}s", delay.as_secs());
        match inbox.recv_timeout(delay) {
            Ok(Command::Reevaluate) | Err(RecvTimeoutError::Timeout) => (),
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ClockUnavailable, FakeClock};
    use std::sync::mpsc::TryRecvError;
    use std::sync::{Arc, Mutex};
    use time::macros::{date, datetime};

    fn collecting_scheduler(
        clock: &FakeClock,
        displayed: Date,
    ) -> (CrossoverScheduler, Receiver<Date>) {
        let (tx, rx) = mpsc::channel();
        let scheduler = CrossoverScheduler::start(clock.clone(), displayed, move |d| {
            tx.send(d).map_err(|_| UiGone)
        })
        .unwrap();
        (scheduler, rx)
    }

    #[test]
    fn test_cap_law() {
        for hour in 0..24u8 {
            for minute in [0, 1, 29, 30, 59] {
                let time = Time::from_hms(hour, minute, 17).unwrap();
                let now = PrimitiveDateTime::new(date!(2025 - 01 - 22), time);
                assert!(
                    seconds_till_tomorrow(now) <= MAX_ARM_SECONDS,
                    "cap exceeded at {now}"
                );
            }
        }
    }

    #[test]
    fn test_thirty_seconds_before_midnight() {
        assert_eq!(seconds_till_tomorrow(datetime!(2025 - 01 - 22 23:59:30)), 30);
    }

    #[test]
    fn test_cap_applies_far_from_midnight() {
        assert_eq!(
            seconds_till_tomorrow(datetime!(2025 - 01 - 22 00:00:05)),
            MAX_ARM_SECONDS
        );
    }

    #[test]
    fn test_just_after_midnight_advances_once() {
        let mut state = CrossoverState::new(date!(2025 - 01 - 22));
        let crossing = state.evaluate(datetime!(2025 - 01 - 23 00:00:05));
        assert_eq!(crossing.advanced, Some(date!(2025 - 01 - 23)));
        assert_eq!(crossing.rearm_after, Duration::from_secs(MAX_ARM_SECONDS));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let mut state = CrossoverState::new(date!(2025 - 01 - 22));
        let now = datetime!(2025 - 01 - 23 00:00:05);
        assert_eq!(state.evaluate(now).advanced, Some(date!(2025 - 01 - 23)));
        assert_eq!(state.evaluate(now).advanced, None);
    }

    #[test]
    fn test_displayed_date_never_decreases() {
        let mut state = CrossoverState::new(date!(2025 - 01 - 22));
        // the clock stepped backwards, e.g. an NTP correction
        assert_eq!(state.evaluate(datetime!(2025 - 01 - 21 08:00:00)).advanced, None);
        assert_eq!(
            state.evaluate(datetime!(2025 - 01 - 25 00:00:01)).advanced,
            Some(date!(2025 - 01 - 25))
        );
        assert_eq!(state.evaluate(datetime!(2025 - 01 - 24 12:00:00)).advanced, None);
    }

    #[test]
    fn test_wake_recovery_crosses_multiple_midnights() {
        let clock = FakeClock::new(datetime!(2025 - 01 - 22 12:00:00));
        let (mut scheduler, rx) = collecting_scheduler(&clock, date!(2025 - 01 - 22));
        // the host was suspended past three midnights
        clock.set(datetime!(2025 - 01 - 25 09:23:00));
        scheduler.handle().reevaluate().unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)),
            Ok(date!(2025 - 01 - 25))
        );
        scheduler.shutdown();
        // exactly one rebuild was posted
        assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn test_timer_fire_advances_date() {
        let clock = FakeClock::new(datetime!(2025 - 01 - 22 23:59:59));
        let (mut scheduler, rx) = collecting_scheduler(&clock, date!(2025 - 01 - 22));
        // the deadline is armed for one second out; move the clock under it
        clock.set(datetime!(2025 - 01 - 23 00:00:30));
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)),
            Ok(date!(2025 - 01 - 23))
        );
        scheduler.shutdown();
    }

    #[test]
    fn test_cancel_fire_race_rebuilds_at_most_once() {
        let clock = FakeClock::new(datetime!(2025 - 01 - 22 23:59:59));
        let (mut scheduler, rx) = collecting_scheduler(&clock, date!(2025 - 01 - 22));
        clock.set(datetime!(2025 - 01 - 23 00:00:00));
        let handle = scheduler.handle();
        handle.reevaluate().unwrap();
        handle.reevaluate().unwrap();
        scheduler.shutdown();
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![date!(2025 - 01 - 23)]);
    }

    #[test]
    fn test_clock_failure_retains_displayed_date() {
        #[derive(Clone, Debug)]
        struct FlakyClock {
            failures: Arc<Mutex<u32>>,
            inner: FakeClock,
        }

        impl ClockSource for FlakyClock {
            fn now(&self) -> Result<PrimitiveDateTime, ClockUnavailable> {
                let mut failures = self.failures.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    Err(ClockUnavailable)
                } else {
                    self.inner.now()
                }
            }
        }

        let inner = FakeClock::new(datetime!(2025 - 01 - 23 00:00:05));
        let clock = FlakyClock {
            failures: Arc::new(Mutex::new(1)),
            inner,
        };
        let (tx, rx) = mpsc::channel();
        let mut scheduler =
            CrossoverScheduler::start(clock, date!(2025 - 01 - 22), move |d| {
                tx.send(d).map_err(|_| UiGone)
            })
            .unwrap();
        // the first evaluation failed; the next one still sees Jan 22 displayed
        scheduler.handle().reevaluate().unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)),
            Ok(date!(2025 - 01 - 23))
        );
        scheduler.shutdown();
    }

    #[test]
    fn test_reevaluate_after_shutdown_is_an_error() {
        let clock = FakeClock::new(datetime!(2025 - 01 - 22 12:00:00));
        let (mut scheduler, _rx) = collecting_scheduler(&clock, date!(2025 - 01 - 22));
        let handle = scheduler.handle();
        scheduler.shutdown();
        assert_eq!(handle.reevaluate(), Err(TimerArmError));
    }
}
