use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Trailing span of the instantaneous rate window.
pub const REALTIME_WINDOW_MS: i64 = 1000;

/// Amounts split by hit classification. Buckets are mutually exclusive;
/// `hp_lessen` and `total` accumulate on every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountBreakdown {
    pub normal: u64,
    pub critical: u64,
    pub lucky: u64,
    pub crit_lucky: u64,
    #[serde(rename = "hpLessen")]
    pub hp_lessen: u64,
    pub total: u64,
}

/// Hit counts. Unlike [`AmountBreakdown`] these overlap: a crit+lucky hit
/// counts toward `critical`, `lucky` and `crit_lucky` at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountBreakdown {
    pub normal: u64,
    pub critical: u64,
    pub lucky: u64,
    pub crit_lucky: u64,
    pub total: u64,
}

impl CountBreakdown {
    /// Field-wise sum.
    pub fn merged(&self, other: &CountBreakdown) -> CountBreakdown {
        CountBreakdown {
            normal: self.normal + other.normal,
            critical: self.critical + other.critical,
            lucky: self.lucky + other.lucky,
            crit_lucky: self.crit_lucky + other.crit_lucky,
            total: self.total + other.total,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instantaneous {
    pub value: u64,
    pub max: u64,
}

/// Running totals for one quantity (damage or healing) plus a one-second
/// sliding window for the instantaneous rate.
#[derive(Debug, Clone, Default)]
pub struct MetricAccumulator {
    pub stats: AmountBreakdown,
    pub count: CountBreakdown,
    window: VecDeque<(i64, u64)>,
    time_range: Option<(i64, i64)>,
    pub realtime: Instantaneous,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event at `now` (epoch millis).
    pub fn add_record(
        &mut self,
        now: i64,
        amount: u64,
        is_crit: bool,
        is_lucky: bool,
        hp_lessen: u64,
    ) {
        match (is_crit, is_lucky) {
            (true, true) => self.stats.crit_lucky += amount,
            (true, false) => self.stats.critical += amount,
            (false, true) => self.stats.lucky += amount,
            (false, false) => self.stats.normal += amount,
        }
        self.stats.total += amount;
        self.stats.hp_lessen += hp_lessen;

        if is_crit {
            self.count.critical += 1;
        }
        if is_lucky {
            self.count.lucky += 1;
        }
        if is_crit && is_lucky {
            self.count.crit_lucky += 1;
        }
        if !is_crit && !is_lucky {
            self.count.normal += 1;
        }
        self.count.total += 1;

        self.window.push_back((now, amount));
        self.time_range = match self.time_range {
            None => Some((now, now)),
            Some((first, _)) => Some((first, now)),
        };
    }

    /// Evict window entries older than [`REALTIME_WINDOW_MS`] relative to
    /// `now` and refresh the instantaneous value and its peak.
    pub fn update_realtime_stats(&mut self, now: i64) {
        while let Some(&(ts, _)) = self.window.front() {
            if now - ts > REALTIME_WINDOW_MS {
                self.window.pop_front();
            } else {
                break;
            }
        }

        self.realtime.value = self.window.iter().map(|&(_, amount)| amount).sum();
        if self.realtime.value > self.realtime.max {
            self.realtime.max = self.realtime.value;
        }
    }

    /// Lifetime average rate: total over the span between the first and the
    /// last record. Zero until two distinct timestamps have been seen.
    pub fn total_per_second(&self) -> f64 {
        let Some((first, last)) = self.time_range else {
            return 0.0;
        };
        if last <= first {
            return 0.0;
        }
        let rate = self.stats.total as f64 / ((last - first) as f64 / 1000.0);
        if rate.is_finite() { rate } else { 0.0 }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Drop the sliding window without touching totals.
    pub fn clear_window(&mut self) {
        self.window.clear();
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn window_sum(&self) -> u64 {
        self.window.iter().map(|&(_, amount)| amount).sum()
    }

    pub fn time_range(&self) -> Option<(i64, i64)> {
        self.time_range
    }

    pub fn is_empty(&self) -> bool {
        self.count.total == 0
    }
}
