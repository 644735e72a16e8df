//! Adaptive time axis ticks.

use super::types::{TimeWindow, HOUR_MS};
use chrono::{DateTime, FixedOffset, TimeZone};

const MINUTE_MS: f64 = 60_000.0;

/// Tick spacing, chosen from the current zoom scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickGranularity {
    FourHours,
    TwoHours,
    Hour,
    ThirtyMinutes,
    TenMinutes,
    FiveMinutes,
}

impl TickGranularity {
    pub fn for_scale(k: f64) -> Self {
        if k < 1.0 {
            TickGranularity::FourHours
        } else if k < 2.0 {
            TickGranularity::TwoHours
        } else if k < 5.0 {
            TickGranularity::Hour
        } else if k < 15.0 {
            TickGranularity::ThirtyMinutes
        } else if k < 40.0 {
            TickGranularity::TenMinutes
        } else {
            TickGranularity::FiveMinutes
        }
    }

    pub fn interval_ms(&self) -> f64 {
        match self {
            TickGranularity::FourHours => 4.0 * HOUR_MS,
            TickGranularity::TwoHours => 2.0 * HOUR_MS,
            TickGranularity::Hour => HOUR_MS,
            TickGranularity::ThirtyMinutes => 30.0 * MINUTE_MS,
            TickGranularity::TenMinutes => 10.0 * MINUTE_MS,
            TickGranularity::FiveMinutes => 5.0 * MINUTE_MS,
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            TickGranularity::FiveMinutes => "%H:%M:%S",
            _ => "%H:%M",
        }
    }

    pub fn format(&self, timestamp_ms: i64, offset: FixedOffset) -> String {
        match local_time(timestamp_ms, offset) {
            Some(dt) => dt.format(self.pattern()).to_string(),
            None => String::new(),
        }
    }
}

pub(crate) fn local_time(timestamp_ms: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    offset.timestamp_millis_opt(timestamp_ms).single()
}

/// First multiple of `interval` (in local time) at or after `start`.
pub(crate) fn align_up(start: f64, interval: f64, offset: FixedOffset) -> f64 {
    let off = offset.local_minus_utc() as f64 * 1000.0;
    ((start + off) / interval).ceil() * interval - off
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisTick {
    pub timestamp: i64,
    pub label: String,
}

/// Ticks aligned to local wall-clock boundaries inside `window`.
pub fn ticks_in_window(window: TimeWindow, k: f64, offset: FixedOffset) -> Vec<AxisTick> {
    let granularity = TickGranularity::for_scale(k);
    let interval = granularity.interval_ms();
    let mut t = align_up(window.start, interval, offset);
    let mut ticks = Vec::new();
    while t <= window.end {
        let timestamp = t.round() as i64;
        ticks.push(AxisTick {
            timestamp,
            label: granularity.format(timestamp, offset),
        });
        t += interval;
    }
    ticks
}
