/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq)]
pub enum TimeRangesError {
    EndOlderThanStart,
    OutOfRange,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct TimeRange {
    start: f64,
    end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> TimeRange {
        TimeRange { start, end }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    fn overlaps_or_touches(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }
}

/// An ordered set of disjoint time ranges.
///
/// <https://html.spec.whatwg.org/multipage/#normalised-timeranges-object>
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TimeRanges {
    ranges: Vec<TimeRange>,
}

impl TimeRanges {
    pub fn new() -> TimeRanges {
        TimeRanges { ranges: Vec::new() }
    }

    /// A set holding the single range `[start, end]`. An inverted range
    /// yields the empty set.
    pub fn from_range(start: f64, end: f64) -> TimeRanges {
        let mut ranges = TimeRanges::new();
        let _ = ranges.add(start, end);
        ranges
    }

    pub fn ranges(&self) -> &[TimeRange] {
        &self.ranges
    }

    pub fn length(&self) -> u32 {
        self.ranges.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn start(&self, index: u32) -> Result<f64, TimeRangesError> {
        self.ranges
            .get(index as usize)
            .map(TimeRange::start)
            .ok_or(TimeRangesError::OutOfRange)
    }

    pub fn end(&self, index: u32) -> Result<f64, TimeRangesError> {
        self.ranges
            .get(index as usize)
            .map(TimeRange::end)
            .ok_or(TimeRangesError::OutOfRange)
    }

    /// Adds `[start, end]`, merging it with every range it overlaps or touches.
    pub fn add(&mut self, start: f64, end: f64) -> Result<(), TimeRangesError> {
        if end < start {
            return Err(TimeRangesError::EndOlderThanStart);
        }
        let mut merged = TimeRange::new(start, end);
        self.ranges.retain(|range| {
            if range.overlaps_or_touches(&merged) {
                merged.start = merged.start.min(range.start);
                merged.end = merged.end.max(range.end);
                false
            } else {
                true
            }
        });
        let index = self
            .ranges
            .partition_point(|range| range.start < merged.start);
        self.ranges.insert(index, merged);
        Ok(())
    }

    pub fn contain(&self, time: f64) -> bool {
        self.ranges.iter().any(|range| range.contains(time))
    }

    /// The time in the set closest to `time`, or `0` when the set is empty.
    pub fn nearest(&self, time: f64) -> f64 {
        let mut closest = 0.0;
        let mut closest_delta = f64::INFINITY;
        for range in &self.ranges {
            if range.contains(time) {
                return time;
            }
            for edge in [range.start, range.end] {
                let delta = (edge - time).abs();
                if delta < closest_delta {
                    closest = edge;
                    closest_delta = delta;
                }
            }
        }
        closest
    }

    pub fn union_with(&mut self, other: &TimeRanges) {
        for range in &other.ranges {
            let _ = self.add(range.start, range.end);
        }
    }

    pub fn intersect_with(&mut self, other: &TimeRanges) {
        let mut result = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a, b) = (self.ranges[i], other.ranges[j]);
            let start = a.start.max(b.start);
            let end = a.end.min(b.end);
            if start <= end {
                result.push(TimeRange::new(start, end));
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        self.ranges = result;
    }
}
