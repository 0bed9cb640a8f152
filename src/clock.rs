use crate::error::Error;
use std::{
    fmt,
    str::FromStr,
    time::{Duration, Instant},
};

/// An elapsed time broken down for display.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Timestamp {
    pub(crate) hours: u64,
    pub(crate) minutes: u8,
    pub(crate) seconds: u8,
    pub(crate) milliseconds: u16,
}

impl Timestamp {
    /// Total milliseconds, `None` when the hours are too large to count.
    pub(crate) fn as_millis(&self) -> Option<u64> {
        self.hours
            .checked_mul(60)?
            .checked_add(u64::from(self.minutes))?
            .checked_mul(60)?
            .checked_add(u64::from(self.seconds))?
            .checked_mul(1000)?
            .checked_add(u64::from(self.milliseconds))
    }
}

impl From<Duration> for Timestamp {
    fn from(elapsed: Duration) -> Self {
        let total_seconds = elapsed.as_secs();
        Self {
            hours: total_seconds / 3600,
            minutes: ((total_seconds / 60) % 60) as u8,
            seconds: (total_seconds % 60) as u8,
            milliseconds: elapsed.subsec_millis() as u16,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hours, self.minutes, self.seconds, self.milliseconds
        )
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    /// Parses `HH:MM:SS.mmm`, also accepting `HH:MM:SS:mmm`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || Error::ParseTimestamp(s.to_owned());

        let mut parts = s.trim().split([':', '.']);
        let mut next = || parts.next().ok_or_else(err);

        let hours = next()?.parse::<u64>().map_err(|_| err())?;
        let minutes = next()?.parse::<u8>().map_err(|_| err())?;
        let seconds = next()?.parse::<u8>().map_err(|_| err())?;
        let milliseconds = next()?.parse::<u16>().map_err(|_| err())?;

        if parts.next().is_some() || minutes >= 60 || seconds >= 60 || milliseconds >= 1000 {
            return Err(err());
        }

        Ok(Self {
            hours,
            minutes,
            seconds,
            milliseconds,
        })
    }
}

/// A pausable stopwatch on the monotonic clock.
///
/// Starting a running stopwatch and pausing a paused one do nothing.
#[derive(Debug, Default, Clone)]
pub(crate) struct Stopwatch {
    // set while running
    started: Option<Instant>,
    // time accumulated before the current run
    accumulated: Duration,
}

impl Stopwatch {
    pub(crate) fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub(crate) fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub(crate) fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    pub(crate) fn reset(&mut self) {
        self.started = None;
        self.accumulated = Duration::ZERO;
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    pub(crate) fn snapshot(&self) -> Timestamp {
        Timestamp::from(self.elapsed())
    }

    fn start_at(&mut self, now: Instant) {
        if self.started.is_none() {
            self.started = Some(now);
        }
    }

    fn pause_at(&mut self, now: Instant) {
        if let Some(started) = self.started.take() {
            self.accumulated += now.saturating_duration_since(started);
        }
    }

    fn elapsed_at(&self, now: Instant) -> Duration {
        self.accumulated
            + self
                .started
                .map_or(Duration::ZERO, |started| now.saturating_duration_since(started))
    }
}
