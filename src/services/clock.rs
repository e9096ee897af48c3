use chrono::{DateTime, Utc};

use crate::modules::auth::interface::Clock;

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
