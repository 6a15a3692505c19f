//! Image size flexibility: enumerated sizes and closed size ranges.
//!
//! An upper bound of `-1` means the range is unbounded above, matching how
//! Core ML stores `SizeRange.upperBound`.

use crate::error::{SpecError, SpecResult};
use crate::wire::RawMessage;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const UNBOUNDED: i64 = -1;

// SizeRange
const LOWER_BOUND: u32 = 1;
const UPPER_BOUND: u32 = 2;

// ImageSizeRange
const WIDTH_RANGE: u32 = 1;
const HEIGHT_RANGE: u32 = 2;

// ImageSize
const SIZE_WIDTH: u32 = 1;
const SIZE_HEIGHT: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeRange {
    lower: u64,
    upper: i64,
}

impl SizeRange {
    /// Build a validated range. `lower` must be at least 1 and `upper` either
    /// `UNBOUNDED` or no smaller than `lower`.
    pub fn new(lower: u64, upper: i64) -> SpecResult<Self> {
        if lower < 1 {
            return Err(SpecError::InvalidRange(format!(
                "lower bound must be at least 1, got {}",
                lower
            )));
        }
        if upper != UNBOUNDED && (upper < 1 || (upper as u64) < lower) {
            return Err(SpecError::InvalidRange(format!(
                "lowerBound > upperBound for range ({},{})",
                lower, upper
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn fixed(value: u64) -> SpecResult<Self> {
        Self::new(value, upper_bound(value)?)
    }

    pub fn lower(&self) -> u64 {
        self.lower
    }

    /// `None` when unbounded. A model may carry other negative values; they
    /// read as unbounded too.
    pub fn upper(&self) -> Option<u64> {
        u64::try_from(self.upper).ok()
    }

    pub fn contains(&self, value: u64) -> bool {
        value >= self.lower && self.upper().is_none_or(|upper| value <= upper)
    }

    /// Read a range as stored in the model; no validation, the model is
    /// reported as-is.
    pub(crate) fn from_raw(raw: &RawMessage) -> SpecResult<Self> {
        Ok(Self {
            lower: raw.uint64(LOWER_BOUND)?,
            upper: raw.int64(UPPER_BOUND)?,
        })
    }

    pub(crate) fn to_raw(self) -> RawMessage {
        let mut raw = RawMessage::new();
        raw.set_varint(LOWER_BOUND, self.lower);
        raw.set_int64(UPPER_BOUND, self.upper);
        raw
    }
}

impl Default for SizeRange {
    fn default() -> Self {
        Self {
            lower: 1,
            upper: UNBOUNDED,
        }
    }
}

impl fmt::Display for SizeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upper() {
            Some(upper) => write!(f, "{}..{}", self.lower, upper),
            None => write!(f, "{}..", self.lower),
        }
    }
}

/// Parse `LO..HI`, `LO..` (unbounded) or a single value `N` (fixed).
impl FromStr for SizeRange {
    type Err = SpecError;

    fn from_str(s: &str) -> SpecResult<Self> {
        let re = Regex::new(r"^\s*(\d+)\s*(\.\.\s*(\d+)?)?\s*$")?;
        let caps = re
            .captures(s)
            .ok_or_else(|| SpecError::InvalidRange(format!("cannot parse {:?}", s)))?;

        let parse = |m: regex::Match<'_>| {
            m.as_str()
                .parse::<u64>()
                .map_err(|_| SpecError::InvalidRange(format!("bound out of range in {:?}", s)))
        };

        let lower = parse(caps.get(1).ok_or_else(|| SpecError::InvalidRange(s.to_string()))?)?;
        match (caps.get(2), caps.get(3)) {
            (None, _) => Self::fixed(lower),
            (Some(_), None) => Self::new(lower, UNBOUNDED),
            (Some(_), Some(upper)) => Self::new(lower, upper_bound(parse(upper)?)?),
        }
    }
}

/// Upper bounds are stored as `int64`; anything larger would wrap, possibly
/// onto the `UNBOUNDED` sentinel.
fn upper_bound(value: u64) -> SpecResult<i64> {
    i64::try_from(value)
        .map_err(|_| SpecError::InvalidRange(format!("upper bound {} is too large", value)))
}

/// Height and width ranges for a flexible image feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ImageSizeRange {
    pub height: SizeRange,
    pub width: SizeRange,
}

impl ImageSizeRange {
    pub fn new(height: SizeRange, width: SizeRange) -> Self {
        Self { height, width }
    }

    pub fn contains(&self, height: u64, width: u64) -> bool {
        self.height.contains(height) && self.width.contains(width)
    }

    pub(crate) fn from_raw(raw: &RawMessage) -> SpecResult<Self> {
        let read = |tag| -> SpecResult<SizeRange> {
            match raw.message(tag)? {
                Some(r) => SizeRange::from_raw(&r),
                None => Ok(SizeRange { lower: 0, upper: 0 }),
            }
        };
        Ok(Self {
            height: read(HEIGHT_RANGE)?,
            width: read(WIDTH_RANGE)?,
        })
    }

    pub(crate) fn to_raw(self) -> RawMessage {
        let mut raw = RawMessage::new();
        raw.set_message(WIDTH_RANGE, &self.width.to_raw());
        raw.set_message(HEIGHT_RANGE, &self.height.to_raw());
        raw
    }
}

impl fmt::Display for ImageSizeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "height {} x width {}", self.height, self.width)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageSize {
    pub height: u64,
    pub width: u64,
}

impl ImageSize {
    pub(crate) fn from_raw(raw: &RawMessage) -> SpecResult<Self> {
        Ok(Self {
            height: raw.uint64(SIZE_HEIGHT)?,
            width: raw.uint64(SIZE_WIDTH)?,
        })
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}
