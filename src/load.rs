//! Sprint training-load model (ATL/CTL/TSB)
//!
//! Turns an irregular session history into a continuous daily stress series
//! and runs two exponential moving averages over it: a short one for acute
//! load (fatigue) and a long one for chronic load (fitness). Their lagged
//! difference is the training stress balance, the "form" signal.
//!
//! The whole computation is a pure fold over the daily series; callers can
//! recompute from scratch on every request.

use crate::models::{SessionType, SessionWithSets};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Acute load time constant (days)
const ACUTE_TAU: f64 = 7.0;
/// Chronic load time constant (days)
const CHRONIC_TAU: f64 = 28.0;
/// Below this many distinct stress-bearing days the model refuses to emit
/// numbers; a shorter history produces a misleading chart, not a noisy one.
const MIN_DISTINCT_DAYS: usize = 7;
/// RPE assumed for sessions the athlete did not rate
const NEUTRAL_RPE: f64 = 5.0;
/// Divisor keeping typical sprint days in chart-friendly double digits
const STRESS_SCALE: f64 = 10.0;

/// ---------------------------------------------------------------------------
/// Output Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyLoadPoint {
  pub date: NaiveDate,
  pub stress: f64,
  pub atl: f64,
  pub ctl: f64,
  pub tsb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSnapshot {
  pub atl: f64,
  pub ctl: f64,
  pub tsb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadModel {
  Computed {
    series: Vec<DailyLoadPoint>,
    current: LoadSnapshot,
  },
  InsufficientData {
    distinct_days: usize,
    required: usize,
  },
}

/// ---------------------------------------------------------------------------
/// Stress Scoring
/// ---------------------------------------------------------------------------

/// A session counts toward sprint load when its type says so (track or
/// race) or when it contains at least one sprint/jump set. The predicate
/// lives in one place so a user-configurable classification could replace
/// exactly one function.
pub fn is_sprint_relevant(entry: &SessionWithSets) -> bool {
  matches!(entry.session.kind(), SessionType::Track | SessionType::Race)
    || entry.sets.iter().any(|s| s.kind().is_sprint_like())
}

/// Daily stress score: RPE-weighted sprint volume.
///
/// Sum of `distance_m x sets` over sprint/jump sets, weighted by the
/// session RPE relative to neutral, scaled down for presentation.
pub fn session_stress(entry: &SessionWithSets) -> f64 {
  let volume_m: f64 = entry
    .sets
    .iter()
    .filter(|s| s.kind().is_sprint_like())
    .filter_map(|s| {
      let reps = s.sets.unwrap_or(1) as f64;
      s.distance_m.map(|d| d * reps)
    })
    .sum();

  let rpe = entry.session.rpe.map(|r| r as f64).unwrap_or(NEUTRAL_RPE);

  volume_m * (rpe / NEUTRAL_RPE) / STRESS_SCALE
}

/// ---------------------------------------------------------------------------
/// Model Computation
/// ---------------------------------------------------------------------------

/// Compute the full ATL/CTL/TSB series from a session history.
///
/// The exponential filters need a value for every calendar day, so the
/// series spans first..=last relevant date with zero-stress gap days.
pub fn compute(entries: &[SessionWithSets]) -> LoadModel {
  // Aggregate stress per calendar day (several sessions can share a date)
  let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
  for entry in entries.iter().filter(|e| is_sprint_relevant(e)) {
    *by_day.entry(entry.session.date).or_insert(0.0) += session_stress(entry);
  }

  let distinct_days = by_day.len();
  if distinct_days < MIN_DISTINCT_DAYS {
    return LoadModel::InsufficientData {
      distinct_days,
      required: MIN_DISTINCT_DAYS,
    };
  }

  // Continuous daily series, zero-filled between sessions
  let (Some(&first), Some(&last)) = (by_day.keys().next(), by_day.keys().next_back()) else {
    return LoadModel::InsufficientData {
      distinct_days: 0,
      required: MIN_DISTINCT_DAYS,
    };
  };

  let mut dates = Vec::new();
  let mut stress = Vec::new();
  let mut day = first;
  while day <= last {
    dates.push(day);
    stress.push(by_day.get(&day).copied().unwrap_or(0.0));
    match day.succ_opt() {
      Some(next) => day = next,
      None => break,
    }
  }

  let atl = ema_series(&stress, ACUTE_TAU);
  let ctl = ema_series(&stress, CHRONIC_TAU);

  // TSB uses yesterday's values: today's acute load is still accumulating,
  // and folding it in turns the form signal into noise. Keep the lag.
  let series: Vec<DailyLoadPoint> = dates
    .iter()
    .enumerate()
    .map(|(i, &date)| {
      let tsb = if i == 0 { 0.0 } else { ctl[i - 1] - atl[i - 1] };
      DailyLoadPoint {
        date,
        stress: round1(stress[i]),
        atl: round1(atl[i]),
        ctl: round1(ctl[i]),
        tsb: round1(tsb),
      }
    })
    .collect();

  let Some(current) = series.last().map(|p| LoadSnapshot {
    atl: p.atl,
    ctl: p.ctl,
    tsb: p.tsb,
  }) else {
    return LoadModel::InsufficientData {
      distinct_days,
      required: MIN_DISTINCT_DAYS,
    };
  };

  LoadModel::Computed { series, current }
}

/// Exponential moving average as a pure fold.
///
/// `ema[t] = stress[t] * alpha + ema[t-1] * (1 - alpha)` with
/// `alpha = 1 - exp(-1/tau)`, seeded with `ema[0] = stress[0]`.
fn ema_series(stress: &[f64], tau: f64) -> Vec<f64> {
  let alpha = 1.0 - (-1.0 / tau).exp();

  stress
    .iter()
    .scan(None::<f64>, |state, &s| {
      let next = match *state {
        None => s,
        Some(prev) => s * alpha + prev * (1.0 - alpha),
      };
      *state = Some(next);
      Some(next)
    })
    .collect()
}

fn round1(v: f64) -> f64 {
  (v * 10.0).round() / 10.0
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
