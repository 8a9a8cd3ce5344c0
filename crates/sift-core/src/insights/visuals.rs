//! Text visuals for terminal reports

use std::fmt;

use serde::Serialize;

/// Glyph used to fill proportional bars
pub const BAR_GLYPH: char = '█';

/// Sparkline glyphs from lowest to highest
pub const SPARK_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Glyph for a window whose values are all equal
const FLAT_GLYPH: char = SPARK_GLYPHS[3];

/// Changes within this many percent count as flat
const FLAT_THRESHOLD_PERCENT: f64 = 2.0;

/// Proportional bar: `round(min(|value| / max_value, 1) * width)` glyphs
///
/// Empty when `max_value` is not positive or `value` is NaN.
pub fn bar(value: f64, max_value: f64, width: usize) -> String {
    if value.is_nan() || max_value.is_nan() || max_value <= 0.0 {
        return String::new();
    }
    let ratio = (value.abs() / max_value).min(1.0);
    let filled = (ratio * width as f64).round() as usize;
    BAR_GLYPH.to_string().repeat(filled.min(width))
}

/// Sparkline over the last `width` values of `series`
///
/// Values are min-max normalized across the window. A window of equal values
/// renders as a row of mid-height glyphs.
pub fn sparkline(series: &[f64], width: usize) -> String {
    let window = &series[series.len().saturating_sub(width)..];
    if window.is_empty() {
        return String::new();
    }

    let min = window.iter().copied().fold(f64::INFINITY, f64::min);
    let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if range.is_nan() || range <= f64::EPSILON {
        return std::iter::repeat(FLAT_GLYPH).take(window.len()).collect();
    }

    let top = (SPARK_GLYPHS.len() - 1) as f64;
    window
        .iter()
        .map(|v| {
            let idx = (((v - min) / range) * top).round() as usize;
            SPARK_GLYPHS[idx.min(SPARK_GLYPHS.len() - 1)]
        })
        .collect()
}

/// Direction of a period-over-period change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Flat => "flat",
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Self::Up => "↑",
            Self::Down => "↓",
            Self::Flat => "→",
        }
    }
}

/// A trend arrow with its percentage change
///
/// `percent` is `None` when there is no previous value to compare against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub percent: Option<f64>,
}

impl Trend {
    /// No baseline to compare against
    pub fn baseline() -> Self {
        Self {
            direction: TrendDirection::Flat,
            percent: None,
        }
    }

    pub fn is_baseline(&self) -> bool {
        self.percent.is_none()
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percent {
            Some(pct) => write!(f, "{} {:+.1}%", self.direction.arrow(), pct),
            None => write!(f, "{} new", self.direction.arrow()),
        }
    }
}

/// Compare `current` against `previous`
///
/// A zero previous value gives a flat baseline; changes of at most 2% are flat.
pub fn trend_indicator(current: f64, previous: f64) -> Trend {
    if previous == 0.0 {
        return Trend::baseline();
    }

    let percent = (current - previous) / previous.abs() * 100.0;
    let direction = if percent.abs() <= FLAT_THRESHOLD_PERCENT {
        TrendDirection::Flat
    } else if percent > 0.0 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };

    Trend {
        direction,
        percent: Some(percent),
    }
}
