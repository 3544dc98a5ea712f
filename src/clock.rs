use thiserror::Error;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Supplies the current civil date & time on demand.
pub(crate) trait ClockSource: Send {
    fn now(&self) -> Result<PrimitiveDateTime, ClockUnavailable>;
}

/// Reads the host's local wall clock.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> Result<PrimitiveDateTime, ClockUnavailable> {
        let now = OffsetDateTime::now_local().map_err(|_| ClockUnavailable)?;
        Ok(PrimitiveDateTime::new(now.date(), now.time()))
    }
}

#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
#[error("failed to determine the local date and time")]
pub(crate) struct ClockUnavailable;

/// Clock whose reading is set by hand.
#[cfg(test)]
#[derive(Clone, Debug)]
pub(crate) struct FakeClock(std::sync::Arc<std::sync::Mutex<PrimitiveDateTime>>);

#[cfg(test)]
impl FakeClock {
    pub(crate) fn new(now: PrimitiveDateTime) -> FakeClock {
        FakeClock(std::sync::Arc::new(std::sync::Mutex::new(now)))
    }

    pub(crate) fn set(&self, now: PrimitiveDateTime) {
        *self.0.lock().unwrap() = now;
    }
}

#[cfg(test)]
impl ClockSource for FakeClock {
    fn now(&self) -> Result<PrimitiveDateTime, ClockUnavailable> {
        Ok(*self.0.lock().unwrap())
    }
}
