//! Local-time calendar operations

use js_sys::Date;
use wasm_bindgen::JsValue;

/// Local civil-time view of instants, as the platform's `Date` sees them
pub trait LocalCalendar {
    /// Minutes to add to local time to get UTC at `at_millis`
    /// (`Date.prototype.getTimezoneOffset`: positive west of UTC).
    fn offset_minutes(&self, at_millis: u64) -> i32;

    /// The instant `at_millis` with its local day-of-month set to `day`,
    /// then its local month (0-based) set to `month`.
    fn pin_day_and_month(&self, at_millis: u64, day: u32, month: u32) -> u64;
}

/// [`LocalCalendar`] over `js_sys::Date`
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserCalendar;

fn date_at(at_millis: u64) -> Date {
    Date::new(&JsValue::from_f64(at_millis as f64))
}

impl LocalCalendar for BrowserCalendar {
    fn offset_minutes(&self, at_millis: u64) -> i32 {
        // Historical zones can report fractional minutes; keep the integer part.
        date_at(at_millis).get_timezone_offset().trunc() as i32
    }

    fn pin_day_and_month(&self, at_millis: u64, day: u32, month: u32) -> u64 {
        let date = date_at(at_millis);
        // Day first: moving e.g. the 31st into a shorter month would roll over.
        date.set_date(day);
        date.set_month(month);
        date.get_time() as u64
    }
}
