use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, Timelike};
use storyboard_protocol::{AxisTick, TimeRange, TimeUnit};

use crate::model::Frame;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Upper bound on ticks generated before thinning.
const MAX_RAW_TICKS: usize = 10_000;

/// Pick the tick unit for a span of `[start, end]` milliseconds: the
/// smallest unit for which the span is under two of the next unit up.
pub fn unit_for_span(start: f64, end: f64) -> TimeUnit {
    let span = end - start;
    let thresholds = [
        (TimeUnit::Centisecond, TimeUnit::Millisecond),
        (TimeUnit::Decisecond, TimeUnit::Centisecond),
        (TimeUnit::Second, TimeUnit::Decisecond),
        (TimeUnit::Minute, TimeUnit::Second),
        (TimeUnit::Hour, TimeUnit::Minute),
        (TimeUnit::Day, TimeUnit::Hour),
        (TimeUnit::Month, TimeUnit::Day),
        (TimeUnit::Year, TimeUnit::Month),
    ];
    thresholds
        .iter()
        .find(|(limit, _)| span < 2.0 * limit.millis())
        .map_or(TimeUnit::Year, |&(_, unit)| unit)
}

fn to_datetime(ms: f64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms.floor() as i64).map(|dt| dt.naive_utc())
}

fn to_millis(dt: NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64
}

/// Round a UTC timestamp down to the start of its `unit`.
pub fn floor(unit: TimeUnit, ms: f64) -> f64 {
    let fixed = |step: f64| (ms / step).floor() * step;
    match unit {
        TimeUnit::Millisecond
        | TimeUnit::Centisecond
        | TimeUnit::Decisecond
        | TimeUnit::Second
        | TimeUnit::Minute
        | TimeUnit::Hour
        | TimeUnit::Day => fixed(unit.millis()),
        TimeUnit::Month | TimeUnit::Year => {
            let Some(dt) = to_datetime(ms) else {
                return ms;
            };
            let month = if unit == TimeUnit::Year { 1 } else { dt.month() };
            NaiveDate::from_ymd_opt(dt.year(), month, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(ms, to_millis)
        }
    }
}

/// Timestamp one `unit` after `ms`. Months and years follow the calendar.
pub fn next(unit: TimeUnit, ms: f64) -> f64 {
    let months = match unit {
        TimeUnit::Month => 1,
        TimeUnit::Year => 12,
        _ => return ms + unit.millis(),
    };
    to_datetime(ms)
        .and_then(|dt| dt.checked_add_months(Months::new(months)))
        .map_or(ms + unit.millis(), to_millis)
}

/// Label for a tick at `ms` in the given unit.
pub fn label(unit: TimeUnit, ms: f64) -> String {
    let Some(dt) = to_datetime(ms) else {
        return format!("{ms:.0}ms");
    };
    match unit {
        TimeUnit::Millisecond | TimeUnit::Centisecond | TimeUnit::Decisecond => {
            format!("{}ms", dt.nanosecond() / 1_000_000)
        }
        TimeUnit::Second => format!("{}s", dt.second()),
        TimeUnit::Minute => format!("{}m", dt.minute()),
        TimeUnit::Hour => format!("{}h", dt.hour()),
        TimeUnit::Day => dt.day().to_string(),
        TimeUnit::Month => MONTH_NAMES[dt.month0() as usize].to_string(),
        TimeUnit::Year => dt.year().to_string(),
    }
}

/// Ticks for a scrubber covering `range`, at most `max_ticks` of them.
///
/// Ticks fall on unit boundaries inside the range; when there are too many,
/// every n-th is kept.
pub fn ticks(range: TimeRange, max_ticks: usize) -> Vec<AxisTick> {
    let max_ticks = max_ticks.max(1);
    let duration = range.duration();
    let unit = unit_for_span(range.start, range.end);

    let mut raw = Vec::new();
    let mut t = floor(unit, range.start);
    if t < range.start {
        t = next(unit, t);
    }
    while t <= range.end && raw.len() < MAX_RAW_TICKS {
        raw.push(t);
        let advanced = next(unit, t);
        if advanced <= t {
            break;
        }
        t = advanced;
    }

    let stride = raw.len().div_ceil(max_ticks).max(1);
    raw.into_iter()
        .step_by(stride)
        .map(|timestamp| AxisTick {
            timestamp,
            position: if duration > 0.0 {
                ((timestamp - range.start) / duration).clamp(0.0, 1.0)
            } else {
                0.0
            },
            label: label(unit, timestamp),
        })
        .collect()
}

/// Time span covered by a row of frames.
pub fn row_span(frames: &[Frame]) -> Option<TimeRange> {
    frames
        .iter()
        .map(|f| f.time_range)
        .reduce(|acc, r| acc.union(&r))
}

/// Each frame's share of the row's time span, for proportional layout.
/// Zero-length spans fall back to equal shares.
pub fn relative_widths(frames: &[Frame]) -> Vec<f64> {
    let Some(span) = row_span(frames) else {
        return Vec::new();
    };
    let total = span.duration();
    if total <= 0.0 {
        let share = 1.0 / frames.len() as f64;
        return vec![share; frames.len()];
    }
    frames.iter().map(|f| f.duration() / total).collect()
}

/// Index of the frame a scrubber click at time `t` lands on: the last frame
/// starting at or before `t`, or the first frame for earlier times.
pub fn frame_index_at(frames: &[Frame], t: f64) -> Option<usize> {
    if frames.is_empty() {
        return None;
    }
    let after = frames.partition_point(|f| f.time_range.start <= t);
    Some(after.saturating_sub(1))
}
