//! Progression, consistency and KPI analytics
//!
//! Everything here is a pure computation over slices the query layer hands
//! in; recomputing from scratch on every call is the contract. Dates come
//! in explicitly so the numbers are reproducible in tests.

use crate::models::{BestsSnapshot, RaceRecord, Session, SessionWithSets};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// "Recent" window for recent-best and change percent
const RECENT_WINDOW_DAYS: i64 = 30;
/// Rolling window for the linear trend
const TREND_WINDOW_DAYS: i64 = 90;
/// Consistency looks at the last N results per distance
const CONSISTENCY_SAMPLES: usize = 8;
/// Target time bands read this far back
const TARGET_WINDOW_DAYS: i64 = 120;
/// Minimum samples before a target band is published
const TARGET_MIN_SAMPLES: usize = 3;

/// Distances the sprint dashboards care about
pub const SPRINT_DISTANCES: [i64; 4] = [60, 100, 200, 400];

/// ---------------------------------------------------------------------------
/// Per-Distance Progression
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceProgression {
  pub distance_m: f64,
  pub samples: usize,
  /// All-time best (minimum time)
  pub best_time_s: f64,
  /// Best of the last 30 days; None when the window is empty, never the
  /// all-time best in disguise
  pub recent_best_s: Option<f64>,
  /// (recent - best) / best * 100; positive = recent is slower
  pub change_percent: Option<f64>,
  /// Least-squares slope over the 90-day window, as percent of the mean
  /// time across the window; negative = getting faster
  pub trend_percent: Option<f64>,
  /// Standard deviation of the last 8 results; None below 2 samples (one
  /// result is not "perfectly consistent", it is no information)
  pub consistency_s: Option<f64>,
}

/// Compute progression rows per distance from the race record history.
pub fn compute_progression(records: &[RaceRecord], today: NaiveDate) -> Vec<DistanceProgression> {
  let mut by_distance: BTreeMap<i64, Vec<&RaceRecord>> = BTreeMap::new();
  for record in records {
    by_distance
      .entry(record.distance_m.round() as i64)
      .or_default()
      .push(record);
  }

  by_distance
    .into_iter()
    .filter_map(|(distance, mut rows)| {
      let best_time_s = rows.iter().map(|r| r.time_s).fold(f64::INFINITY, f64::min);
      if !best_time_s.is_finite() {
        return None;
      }

      // Window computations need dated rows in chronological order
      rows.sort_by_key(|r| r.date);
      let dated: Vec<(f64, NaiveDate)> =
        rows.iter().filter_map(|r| r.date.map(|d| (r.time_s, d))).collect();

      let recent_cutoff = today - Duration::days(RECENT_WINDOW_DAYS);
      let recent_best_s = dated
        .iter()
        .filter(|(_, d)| *d >= recent_cutoff)
        .map(|(t, _)| *t)
        .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.min(t))));

      let change_percent =
        recent_best_s.map(|recent| (recent - best_time_s) / best_time_s * 100.0);

      let trend_cutoff = today - Duration::days(TREND_WINDOW_DAYS);
      let trend_points: Vec<(f64, f64)> = dated
        .iter()
        .filter(|(_, d)| *d >= trend_cutoff)
        .map(|(t, d)| ((*d - trend_cutoff).num_days() as f64, *t))
        .collect();
      let trend_percent = trend_slope_percent(&trend_points);

      let last_times: Vec<f64> = dated
        .iter()
        .rev()
        .take(CONSISTENCY_SAMPLES)
        .map(|(t, _)| *t)
        .collect();
      let consistency_s = std_dev(&last_times);

      Some(DistanceProgression {
        distance_m: distance as f64,
        samples: rows.len(),
        best_time_s,
        recent_best_s,
        change_percent: change_percent.map(round2),
        trend_percent: trend_percent.map(round2),
        consistency_s: consistency_s.map(round2),
      })
    })
    .collect()
}

/// Least-squares slope normalized to a percent change over the window.
/// Needs at least two points on distinct days.
fn trend_slope_percent(points: &[(f64, f64)]) -> Option<f64> {
  if points.len() < 2 {
    return None;
  }

  let n = points.len() as f64;
  let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
  let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

  let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
  if sxx == 0.0 {
    // All results on the same day: no time axis to regress over
    return None;
  }
  let sxy: f64 = points
    .iter()
    .map(|(x, y)| (x - mean_x) * (y - mean_y))
    .sum();

  let slope_per_day = sxy / sxx;
  if mean_y == 0.0 {
    return None;
  }
  Some(slope_per_day * TREND_WINDOW_DAYS as f64 / mean_y * 100.0)
}

/// Population standard deviation; None below 2 samples.
fn std_dev(values: &[f64]) -> Option<f64> {
  if values.len() < 2 {
    return None;
  }
  let n = values.len() as f64;
  let mean = values.iter().sum::<f64>() / n;
  let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
  Some(variance.sqrt())
}

/// ---------------------------------------------------------------------------
/// Sprint Indices
/// ---------------------------------------------------------------------------

/// Derived sprint numbers. Every index is null-safe: a missing input
/// distance yields None, never a fabricated value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintIndices {
  /// Best 100m expressed as average velocity
  pub max_velocity_mps: Option<f64>,
  /// Best 30m against best 60m - acceleration quality
  pub accel_index: Option<f64>,
  /// Best 200m over best 100m - speed endurance
  pub speed_endurance: Option<f64>,
}

pub fn compute_sprint_indices(records: &[RaceRecord]) -> SprintIndices {
  let best = |distance: f64| -> Option<f64> {
    records
      .iter()
      .filter(|r| (r.distance_m - distance).abs() < 0.5 && r.time_s > 0.0)
      .map(|r| r.time_s)
      .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.min(t))))
  };

  let best_30 = best(30.0);
  let best_60 = best(60.0);
  let best_100 = best(100.0);
  let best_200 = best(200.0);

  SprintIndices {
    max_velocity_mps: best_100.map(|t| round2(100.0 / t)),
    accel_index: match (best_30, best_60) {
      (Some(t30), Some(t60)) if t60 > 0.0 => Some(round2(t30 / t60)),
      _ => None,
    },
    speed_endurance: match (best_100, best_200) {
      (Some(t100), Some(t200)) if t100 > 0.0 => Some(round2(t200 / t100)),
      _ => None,
    },
  }
}

/// ---------------------------------------------------------------------------
/// Target Time Bands
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetBand {
  pub distance_m: f64,
  pub samples: usize,
  /// Mean of the best 3 results in the window
  pub target_s: Option<f64>,
  /// Fastest result in the window
  pub low_s: Option<f64>,
  /// Window mean
  pub high_s: Option<f64>,
}

/// Estimated time bands per sprint distance over the last 120 days.
/// Below 3 samples the band stays empty rather than pretending.
pub fn compute_target_bands(records: &[RaceRecord], today: NaiveDate) -> Vec<TargetBand> {
  let cutoff = today - Duration::days(TARGET_WINDOW_DAYS);

  SPRINT_DISTANCES
    .iter()
    .map(|&distance| {
      let mut times: Vec<f64> = records
        .iter()
        .filter(|r| r.distance_m.round() as i64 == distance)
        .filter(|r| r.date.is_some_and(|d| d >= cutoff))
        .map(|r| r.time_s)
        .collect();
      times.sort_by(|a, b| a.total_cmp(b));

      let samples = times.len();
      if samples < TARGET_MIN_SAMPLES {
        return TargetBand {
          distance_m: distance as f64,
          samples,
          target_s: None,
          low_s: None,
          high_s: None,
        };
      }

      let top3 = &times[..TARGET_MIN_SAMPLES];
      let target = top3.iter().sum::<f64>() / top3.len() as f64;
      let mean = times.iter().sum::<f64>() / samples as f64;

      TargetBand {
        distance_m: distance as f64,
        samples,
        target_s: Some(round2(target)),
        low_s: Some(round2(times[0])),
        high_s: Some(round2(mean)),
      }
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// KPI Summary
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiSummary {
  pub total_sessions: usize,
  pub avg_rpe: Option<f64>,
  pub pb_count: usize,
  /// Consecutive training days ending at the most recent session date
  pub streak: i64,
}

pub fn compute_kpis(sessions: &[Session], bests: &BestsSnapshot) -> KpiSummary {
  let rated: Vec<i64> = sessions.iter().filter_map(|s| s.rpe).collect();
  let avg_rpe = if rated.is_empty() {
    None
  } else {
    Some(round1(rated.iter().sum::<i64>() as f64 / rated.len() as f64))
  };

  KpiSummary {
    total_sessions: sessions.len(),
    avg_rpe,
    pb_count: bests.race.len() + bests.strength.len() + bests.training.len(),
    streak: training_streak(sessions),
  }
}

/// Count consecutive calendar days with at least one session, walking back
/// from the most recent session date. Several sessions on one day count
/// once.
pub fn training_streak(sessions: &[Session]) -> i64 {
  let mut dates: Vec<NaiveDate> = sessions.iter().map(|s| s.date).collect();
  dates.sort_unstable();
  dates.dedup();

  let Some(&most_recent) = dates.last() else {
    return 0;
  };

  let mut streak = 1;
  let mut current = most_recent;
  for &date in dates.iter().rev().skip(1) {
    if date == current - Duration::days(1) {
      streak += 1;
      current = date;
    } else {
      break;
    }
  }
  streak
}

/// ---------------------------------------------------------------------------
/// Volume Totals
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeTotals {
  /// Sum of distance_m x sets
  pub total_distance_m: f64,
  /// Sum of weight_kg x reps x sets
  pub total_weight_kg: f64,
  /// Sum of time_s x sets
  pub total_time_s: f64,
  /// Session count per type
  pub type_distribution: BTreeMap<String, i64>,
}

pub fn compute_volume(entries: &[SessionWithSets]) -> VolumeTotals {
  let mut totals = VolumeTotals::default();

  for entry in entries {
    *totals
      .type_distribution
      .entry(entry.session.kind().as_str().to_string())
      .or_insert(0) += 1;

    for set in &entry.sets {
      let blocks = set.sets.unwrap_or(1) as f64;
      if let Some(d) = set.distance_m {
        totals.total_distance_m += d * blocks;
      }
      if let (Some(w), Some(r)) = (set.weight_kg, set.reps) {
        totals.total_weight_kg += w * r as f64 * blocks;
      }
      if let Some(t) = set.time_s {
        totals.total_time_s += t * blocks;
      }
    }
  }

  totals
}

fn round1(v: f64) -> f64 {
  (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
  (v * 100.0).round() / 100.0
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
