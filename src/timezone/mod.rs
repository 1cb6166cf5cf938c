//! Timezone offset and DST detection
//!
//! Works out the visitor's UTC offset and whether daylight saving time is
//! in effect right now, without a timezone database: the platform's offset
//! is sampled at the current instant and on the 1st of February and the
//! 1st of August of the current year.
//!
//! - February and August agree: the zone has no DST.
//! - February is further west (larger `getTimezoneOffset`): northern
//!   hemisphere, standard time in February.
//! - August is further west: southern hemisphere, standard time in August.
//!
//! DST is active unless the current offset equals the standard-time sample.
//!
//! Both findings are persisted together as cookies (`time_zone_offset`,
//! `time_zone_dst`) with the same expiry and path.

pub mod calendar;

pub use calendar::{BrowserCalendar, LocalCalendar};

use serde::Serialize;

use crate::clock::Clock;
use crate::config::HelperConfig;
use crate::cookies::{CookieOptions, CookieStore};
use crate::error::Result;

/// 0-based month index of February
pub const FEBRUARY: u32 = 1;
/// 0-based month index of August
pub const AUGUST: u32 = 7;

/// Which half of the year the zone observes DST in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Hemisphere {
    /// No DST observed
    NoDst,
    /// Standard time in February
    Northern,
    /// Standard time in August
    Southern,
}

/// Platform offsets (`getTimezoneOffset` convention) sampled for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetSample {
    pub now: i32,
    pub february: i32,
    pub august: i32,
}

impl OffsetSample {
    /// Sample the offsets at `now_millis` and on the 1st of February and
    /// August of the same year.
    pub fn observe<L: LocalCalendar>(calendar: &L, now_millis: u64) -> Self {
        let february = calendar.pin_day_and_month(now_millis, 1, FEBRUARY);
        let august = calendar.pin_day_and_month(now_millis, 1, AUGUST);
        Self {
            now: calendar.offset_minutes(now_millis),
            february: calendar.offset_minutes(february),
            august: calendar.offset_minutes(august),
        }
    }

    pub fn hemisphere(&self) -> Hemisphere {
        match self.february - self.august {
            0 => Hemisphere::NoDst,
            d if d > 0 => Hemisphere::Northern,
            _ => Hemisphere::Southern,
        }
    }

    pub fn dst_active(&self) -> bool {
        match self.hemisphere() {
            Hemisphere::NoDst => false,
            Hemisphere::Northern => self.now != self.february,
            Hemisphere::Southern => self.now != self.august,
        }
    }

    /// Offset in minutes, positive east of UTC
    pub fn utc_offset_minutes(&self) -> i32 {
        -self.now
    }
}

/// What one detection run found, plus when its cookies expire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimezoneFacts {
    /// Minutes ahead of UTC (negative west of Greenwich)
    pub offset_minutes: i32,
    pub dst_active: bool,
    pub hemisphere: Hemisphere,
    pub expires_millis: u64,
}

impl TimezoneFacts {
    pub fn offset_cookie_value(&self) -> String {
        self.offset_minutes.to_string()
    }

    pub fn dst_cookie_value(&self) -> &'static str {
        if self.dst_active {
            "1"
        } else {
            "0"
        }
    }
}

/// Timezone cookies as read back from a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTimezone {
    pub offset_minutes: i32,
    pub dst_active: bool,
}

impl PersistedTimezone {
    /// `None` unless both cookies are present and well-formed
    pub fn read<S: CookieStore>(store: &S, config: &HelperConfig) -> Option<Self> {
        let offset_minutes = store.get(&config.offset_cookie)?.trim().parse().ok()?;
        let dst_active = match store.get(&config.dst_cookie)?.as_str() {
            "0" => false,
            "1" => true,
            _ => return None,
        };
        Some(Self {
            offset_minutes,
            dst_active,
        })
    }
}

/// Detects the visitor's timezone facts and persists them as cookies
pub struct TimezoneDetector<C, L> {
    clock: C,
    calendar: L,
    config: HelperConfig,
}

impl<C: Clock, L: LocalCalendar> TimezoneDetector<C, L> {
    pub fn new(clock: C, calendar: L, config: HelperConfig) -> Self {
        Self {
            clock,
            calendar,
            config,
        }
    }

    pub fn detect(&self) -> TimezoneFacts {
        let now = self.clock.now_millis();
        let sample = OffsetSample::observe(&self.calendar, now);
        let facts = TimezoneFacts {
            offset_minutes: sample.utc_offset_minutes(),
            dst_active: sample.dst_active(),
            hemisphere: sample.hemisphere(),
            expires_millis: now + self.config.cookie_lifetime_ms(),
        };
        log::debug!(
            "Timezone sample {:?} -> offset {} dst {}",
            sample,
            facts.offset_minutes,
            facts.dst_active
        );
        facts
    }

    /// Write both cookies, with one shared expiry and path
    pub fn persist<S: CookieStore>(&self, facts: &TimezoneFacts, store: &S) -> Result<()> {
        let options = CookieOptions {
            expires_millis: facts.expires_millis,
            path: self.config.cookie_path.clone(),
        };
        store.set(&self.config.offset_cookie, &facts.offset_cookie_value(), &options)?;
        store.set(&self.config.dst_cookie, facts.dst_cookie_value(), &options)?;
        Ok(())
    }

    pub fn detect_and_persist<S: CookieStore>(&self, store: &S) -> Result<TimezoneFacts> {
        let facts = self.detect();
        self.persist(&facts, store)?;
        Ok(facts)
    }
}
