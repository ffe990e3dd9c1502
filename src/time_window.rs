// Time-of-day windows for departure/arrival filtering.
//
// Windows are minute-of-day ranges that may wrap past midnight ("night" is 21:00-03:00).
// Expressions are deliberately loose: named periods, "6am-11am", "18:30 to 2130", "0600-1200".

use serde::{Serialize, Serializer};
use std::fmt;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

const PRESETS: &[(&str, TimeWindow)] = &[
    ("early morning", TimeWindow::new_unchecked(0, 6 * 60)),
    ("late morning", TimeWindow::new_unchecked(6 * 60, 12 * 60)),
    ("morning", TimeWindow::new_unchecked(6 * 60, 12 * 60)),
    ("afternoon", TimeWindow::new_unchecked(12 * 60, 17 * 60)),
    ("evening", TimeWindow::new_unchecked(17 * 60, 21 * 60)),
    ("night", TimeWindow::new_unchecked(21 * 60, 3 * 60)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: u16,
    end: u16,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::UNRESTRICTED
    }
}

impl TimeWindow {
    pub const UNRESTRICTED: TimeWindow = TimeWindow::new_unchecked(0, MINUTES_PER_DAY);

    const fn new_unchecked(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    // Bounds are minutes since midnight; 1440 ("24:00") is only meaningful as an end
    pub fn new(start: u16, end: u16) -> Option<Self> {
        (start <= MINUTES_PER_DAY && end <= MINUTES_PER_DAY).then_some(Self { start, end })
    }

    // Parse a loose expression. Anything unrecognised yields the unrestricted window.
    pub fn parse(expression: &str) -> Self {
        let text = expression.trim().to_lowercase();
        if text.is_empty() {
            return Self::UNRESTRICTED;
        }

        if let Some((_, window)) = PRESETS.iter().find(|(name, _)| *name == text) {
            return *window;
        }

        let parts = if text.contains('-') {
            text.split_once('-')
        } else {
            text.split_once("to")
        };
        let Some((start, end)) = parts else {
            return Self::UNRESTRICTED;
        };

        match (parse_clock_bound(start), parse_clock_bound(end)) {
            (Some(start), Some(end)) => Self { start, end },
            _ => Self::UNRESTRICTED,
        }
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    pub fn is_unrestricted(&self) -> bool {
        *self == Self::UNRESTRICTED
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    // Unrestricted windows match anything, even unparsable times.
    // Otherwise an unparsable clock time never matches.
    pub fn contains(&self, clock_time: &str) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        let Some(minutes) = clock_minutes(clock_time) else {
            return false;
        };
        if self.wraps_midnight() {
            minutes >= self.start || minutes <= self.end
        } else {
            self.start <= minutes && minutes <= self.end
        }
    }
}

pub fn is_within_window(clock_time: &str, window: &TimeWindow) -> bool {
    window.contains(clock_time)
}

fn format_minutes(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_minutes(self.start), format_minutes(self.end))
    }
}

impl Serialize for TimeWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// One side of a window expression: "6am", "12pm", "18:30", "1830", "06.00", "7"
fn parse_clock_bound(raw: &str) -> Option<u16> {
    let mut text = raw.trim().to_lowercase();
    let meridian = ["am", "pm"].into_iter().find(|m| text.ends_with(m));
    if let Some(m) = meridian {
        text.truncate(text.len() - m.len());
        text = text.trim().to_string();
    }
    let text = text.replace('.', ":");

    let (mut hour, minute) = if let Some((h, m)) = text.split_once(':') {
        if !is_digits(h) || !is_digits(m) {
            return None;
        }
        let padded = format!("{:0<2}", m);
        (h.parse::<u16>().ok()?, padded[..2].parse::<u16>().ok()?)
    } else {
        let digits: String = text.chars().filter(char::is_ascii_digit).collect();
        match digits.len() {
            0 => return None,
            3 | 4 => {
                let (h, m) = digits.split_at(digits.len() - 2);
                (h.parse::<u16>().ok()?, m.parse::<u16>().ok()?)
            }
            _ => (digits.parse::<u16>().ok()?, 0),
        }
    };

    if minute > 59 || hour > 24 || (hour == 24 && minute > 0) {
        return None;
    }

    match meridian {
        Some("pm") if hour != 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }
    if hour > 24 || (hour == 24 && minute > 0) {
        return None;
    }

    Some(hour * 60 + minute)
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

// Provider clock times: "0715", "07:15", "715", "18:30:00". Separators are ignored.
// "24:xx" is clamped to the last minute of the day.
pub fn clock_minutes(raw_time: &str) -> Option<u16> {
    let digits: String = raw_time.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    let (hour, minute) = if digits.len() == 3 {
        (digits[..1].parse::<u16>().ok()?, digits[1..].parse::<u16>().ok()?)
    } else {
        let hour_end = digits.len().min(2);
        let hour = digits[..hour_end].parse::<u16>().ok()?;
        let minute = if digits.len() >= 4 {
            digits[2..4].parse::<u16>().ok()?
        } else {
            0
        };
        (hour, minute)
    };

    if hour > 24 || minute > 59 {
        return None;
    }
    if hour == 24 && minute > 0 {
        return Some(23 * 60 + 59);
    }
    Some(hour * 60 + minute)
}
