//! Daily completion statistics
//!
//! Pure functions behind the progress charts. The backend feeds them the
//! tasks of a window; nothing here touches storage or the clock.

use crate::models::{StatsRange, TaskStatus};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One point of the progress chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStat {
    pub date: NaiveDate,
    /// Short label such as "Mon 12"
    pub display_date: String,
    pub completed: u32,
    pub total: u32,
    /// Whole-number percentage in `0..=100`
    pub rate: u32,
}

/// Completion percentage rounded half up; 0 for a day without tasks
pub fn completion_rate(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let completed = u64::from(completed.min(total));
    let total = u64::from(total);
    ((completed * 200 + total) / (total * 2)) as u32
}

/// First and last day of the window ending at `today`, both inclusive
pub fn window_bounds(range: StatsRange, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today - Duration::days(i64::from(range.days()) - 1);
    (start, today)
}

/// Chart label for a day
pub fn display_label(date: NaiveDate) -> String {
    date.format("%a %-d").to_string()
}

/// Build one entry per day of the window, oldest first.
///
/// `tasks` yields `(date, status)` pairs; entries outside the window are
/// ignored.
pub fn daily_stats<I>(range: StatsRange, today: NaiveDate, tasks: I) -> Vec<ProgressStat>
where
    I: IntoIterator<Item = (NaiveDate, TaskStatus)>,
{
    let (start, end) = window_bounds(range, today);

    let mut per_day: HashMap<NaiveDate, (u32, u32)> = HashMap::new();
    for (date, status) in tasks {
        if date < start || date > end {
            continue;
        }
        let entry = per_day.entry(date).or_default();
        entry.1 += 1;
        if status == TaskStatus::Completed {
            entry.0 += 1;
        }
    }

    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| {
            let (completed, total) = per_day.get(&date).copied().unwrap_or((0, 0));
            ProgressStat {
                date,
                display_date: display_label(date),
                completed,
                total,
                rate: completion_rate(completed, total),
            }
        })
        .collect()
}
