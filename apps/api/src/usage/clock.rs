use chrono::{DateTime, Local, NaiveDate, Utc};

/// Time source for the gate. Daily and monthly periods follow the server's
/// local calendar.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn date_of(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&Local).date_naive()
    }

    fn today(&self) -> NaiveDate {
        self.date_of(self.now())
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use test_clock::FixedClock;

#[cfg(test)]
mod test_clock {
    use std::sync::Mutex;

    use chrono::{DateTime, Duration, NaiveDate, Utc};

    use super::Clock;

    /// Settable clock that buckets days in UTC so tests do not depend on the
    /// host timezone.
    pub struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        pub fn at(ts: DateTime<Utc>) -> Self {
            Self(Mutex::new(ts))
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }

        fn date_of(&self, ts: DateTime<Utc>) -> NaiveDate {
            ts.date_naive()
        }
    }
}
