//! Keyframe choice: uniform sampling, peak ranking and backfill.
//!
//! Everything here works on timestamps and scores only, so the heuristic is
//! deterministic and independent of how frames were decoded.

use std::time::Duration;

use serde::Serialize;

/// Why a keyframe was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrigin {
    /// A local dissimilarity peak above the change threshold.
    ShotChange,
    /// An evenly spaced fill point.
    ///
    /// `relaxed` is `true` when the video was too short to honour the
    /// minimum separation and the point was taken anyway.
    Backfill {
        /// The minimum separation was not enforced for this point.
        relaxed: bool,
    },
}

/// A sampled position in the video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SamplePoint {
    pub(crate) frame_number: u64,
    pub(crate) timestamp: Duration,
}

/// One chosen sample point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Pick {
    /// Index into the sample points.
    pub(crate) point: usize,
    pub(crate) origin: SelectionOrigin,
    /// Score against the previous sample, if there was one.
    pub(crate) score: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SelectionParams {
    pub(crate) min_count: usize,
    pub(crate) max_count: usize,
    pub(crate) min_separation: Duration,
    pub(crate) change_threshold: f64,
}

/// Frame numbers visited while scanning: every `stride`-th frame, with the
/// stride chosen so that at most `max_samples` frames are decoded.
pub(crate) fn sample_frame_numbers(frame_count: u64, max_samples: usize) -> Vec<u64> {
    let max_samples = (max_samples as u64).max(1);
    let stride = frame_count.div_ceil(max_samples).max(1);
    (0..frame_count).step_by(stride as usize).collect()
}

/// Separation used when the caller did not fix one: half the spacing of
/// `max_count` evenly distributed picks.
pub(crate) fn default_separation(points: &[SamplePoint], max_count: usize) -> Duration {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if max_count > 0 => {
            let span = last.timestamp.saturating_sub(first.timestamp);
            Duration::from_secs_f64(span.as_secs_f64() / (2.0 * max_count as f64))
        }
        _ => Duration::ZERO,
    }
}

/// Choose keyframes among `points`.
///
/// `scores[i]` is the dissimilarity between `points[i - 1]` and `points[i]`
/// (`None` for the first point). The result is sorted by timestamp.
pub(crate) fn choose(
    points: &[SamplePoint],
    scores: &[Option<f64>],
    params: &SelectionParams,
) -> Vec<Pick> {
    let mut chooser = Chooser {
        points,
        scores,
        separation: params.min_separation,
        picks: Vec::with_capacity(params.max_count.min(points.len())),
    };

    if points.len() < params.min_count {
        for index in 0..points.len() {
            let relaxed = !chooser.is_separated(index);
            chooser.push(index, SelectionOrigin::Backfill { relaxed });
        }
        return chooser.finish();
    }

    for index in chooser.ranked_peaks(params.change_threshold) {
        if chooser.picks.len() >= params.max_count {
            break;
        }
        if chooser.is_separated(index) {
            chooser.push(index, SelectionOrigin::ShotChange);
        }
    }

    if chooser.picks.len() < params.min_count {
        log::debug!(
            "{} shot change(s) found, backfilling to {}",
            chooser.picks.len(),
            params.min_count
        );
        chooser.backfill(params.min_count, true);
    }
    if chooser.picks.len() < params.min_count {
        log::debug!(
            "Video too short for a {:?} separation, relaxing it",
            params.min_separation
        );
        chooser.backfill(params.min_count, false);
    }
    for index in 0..points.len() {
        if chooser.picks.len() >= params.min_count {
            break;
        }
        if !chooser.is_picked(index) {
            chooser.push(index, SelectionOrigin::Backfill { relaxed: true });
        }
    }

    chooser.finish()
}

struct Chooser<'a> {
    points: &'a [SamplePoint],
    scores: &'a [Option<f64>],
    separation: Duration,
    picks: Vec<Pick>,
}

impl Chooser<'_> {
    fn score(&self, index: usize) -> Option<f64> {
        self.scores.get(index).copied().flatten()
    }

    /// Local peaks above `threshold`, highest first, earlier first on ties.
    ///
    /// A plateau yields only its first point.
    fn ranked_peaks(&self, threshold: f64) -> Vec<usize> {
        let mut peaks: Vec<usize> = (0..self.points.len())
            .filter(|&index| {
                let Some(score) = self.score(index) else {
                    return false;
                };
                let previous = index.checked_sub(1).and_then(|i| self.score(i));
                let next = self.score(index + 1);
                score >= threshold
                    && previous.is_none_or(|p| score > p)
                    && next.is_none_or(|n| score >= n)
            })
            .collect();

        peaks.sort_by(|&a, &b| {
            let score_a = self.score(a).unwrap_or(0.0);
            let score_b = self.score(b).unwrap_or(0.0);
            score_b
                .total_cmp(&score_a)
                .then(self.points[a].timestamp.cmp(&self.points[b].timestamp))
        });
        peaks
    }

    /// Add evenly spaced points over the sampled span until `target` picks
    /// exist. Grids of `target, target + 1, …` positions are tried in turn;
    /// each position snaps to the nearest sample point.
    fn backfill(&mut self, target: usize, strict: bool) {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return;
        };
        let start = first.timestamp.as_secs_f64();
        let span = last.timestamp.as_secs_f64() - start;

        for slots in target..=self.points.len() {
            for slot in 0..slots {
                let position = if slots > 1 {
                    start + span * slot as f64 / (slots - 1) as f64
                } else {
                    start
                };
                let index = self.nearest(Duration::from_secs_f64(position.max(0.0)));
                if self.is_picked(index) || (strict && !self.is_separated(index)) {
                    continue;
                }
                let relaxed = !strict && !self.is_separated(index);
                self.push(index, SelectionOrigin::Backfill { relaxed });
                if self.picks.len() >= target {
                    return;
                }
            }
        }
    }

    /// Sample point closest to `timestamp`, the earlier one on ties.
    fn nearest(&self, timestamp: Duration) -> usize {
        self.points
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.timestamp
                    .abs_diff(timestamp)
                    .cmp(&b.timestamp.abs_diff(timestamp))
            })
            .map(|(index, _)| index)
            .unwrap_or(0)
    }

    fn is_picked(&self, index: usize) -> bool {
        self.picks.iter().any(|pick| pick.point == index)
    }

    fn is_separated(&self, index: usize) -> bool {
        let timestamp = self.points[index].timestamp;
        self.picks
            .iter()
            .all(|pick| self.points[pick.point].timestamp.abs_diff(timestamp) >= self.separation)
    }

    fn push(&mut self, index: usize, origin: SelectionOrigin) {
        self.picks.push(Pick {
            point: index,
            origin,
            score: self.score(index),
        });
    }

    fn finish(mut self) -> Vec<Pick> {
        let points = self.points;
        self.picks
            .sort_by(|a, b| points[a.point].timestamp.cmp(&points[b.point].timestamp));
        self.picks
    }
}
