use crate::models::{DisconnectionEvent, Selection};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Trailing window lengths offered by the chart controls
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartDuration {
    #[default]
    #[serde(rename = "7 days")]
    SevenDays,
    #[serde(rename = "1 Month")]
    OneMonth,
    #[serde(rename = "3 Month")]
    ThreeMonths,
    #[serde(rename = "6 Month")]
    SixMonths,
}

impl ChartDuration {
    pub const ALL: [ChartDuration; 4] = [
        ChartDuration::SevenDays,
        ChartDuration::OneMonth,
        ChartDuration::ThreeMonths,
        ChartDuration::SixMonths,
    ];

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.label() == label)
    }

    pub fn days(&self) -> u64 {
        match self {
            ChartDuration::SevenDays => 7,
            ChartDuration::OneMonth => 30,
            ChartDuration::ThreeMonths => 90,
            ChartDuration::SixMonths => 180,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChartDuration::SevenDays => "7 days",
            ChartDuration::OneMonth => "1 Month",
            ChartDuration::ThreeMonths => "3 Month",
            ChartDuration::SixMonths => "6 Month",
        }
    }

    /// Inclusive `(start, end)` window ending at `end`
    pub fn window(&self, end: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = end
            .checked_sub_days(Days::new(self.days() - 1))
            .unwrap_or(NaiveDate::MIN);
        (start, end)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Every calendar day from `start` to `end`, inclusive
pub fn date_axis(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Distinct disconnected devices per day over a dense daily axis.
///
/// `device_type` pre-filters events by their `Device_type` tag. Days without
/// events are reported with a zero count.
pub fn disconnected_series(
    events: &[DisconnectionEvent],
    start: NaiveDate,
    end: NaiveDate,
    device_type: &Selection,
) -> Vec<DailyCount> {
    let mut per_day: HashMap<NaiveDate, HashSet<&str>> = HashMap::new();
    for e in events {
        let Some(date) = e.entry_date else { continue };
        if date < start || date > end || !e.is_disconnected() || !device_type.matches(&e.device_type) {
            continue;
        }
        per_day.entry(date).or_default().insert(e.deviceid.as_str());
    }

    date_axis(start, end)
        .into_iter()
        .map(|date| DailyCount {
            date,
            count: per_day.get(&date).map_or(0, HashSet::len),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::{date, event};

    #[test]
    fn test_duration_from_label() {
        assert_eq!(ChartDuration::from_label("3 Month"), Some(ChartDuration::ThreeMonths));
        assert_eq!(ChartDuration::from_label("7 days"), Some(ChartDuration::SevenDays));
        assert_eq!(ChartDuration::from_label("2 weeks"), None);
    }

    #[test]
    fn test_seven_day_window_is_inclusive() {
        let (start, end) = ChartDuration::SevenDays.window(date("2024-01-10"));
        assert_eq!(start, date("2024-01-04"));
        assert_eq!(end, date("2024-01-10"));

        let axis = date_axis(start, end);
        assert_eq!(axis.len(), 7);
        assert_eq!(axis.first(), Some(&date("2024-01-04")));
        assert_eq!(axis.last(), Some(&date("2024-01-10")));
    }

    #[test]
    fn test_window_lengths() {
        let end = date("2024-06-30");
        for duration in [
            ChartDuration::SevenDays,
            ChartDuration::OneMonth,
            ChartDuration::ThreeMonths,
            ChartDuration::SixMonths,
        ] {
            let (start, end) = duration.window(end);
            assert_eq!(date_axis(start, end).len() as u64, duration.days());
        }
    }

    #[test]
    fn test_duration_labels_deserialize() {
        let d: ChartDuration = serde_json::from_str(r#""1 Month""#).unwrap();
        assert_eq!(d, ChartDuration::OneMonth);
        let d: ChartDuration = serde_json::from_str(r#""6 Month""#).unwrap();
        assert_eq!(d.days(), 180);
        assert!(serde_json::from_str::<ChartDuration>(r#""2 weeks""#).is_err());
    }

    #[test]
    fn test_date_axis_empty_when_reversed() {
        assert!(date_axis(date("2024-01-10"), date("2024-01-09")).is_empty());
    }

    #[test]
    fn test_series_is_dense_and_ordered() {
        let events = vec![
            event("d1", "A", "2024-01-05", "B Type", "Disconnected", "T1"),
            event("d2", "A", "2024-01-05", "C Type", "Disconnected", "T2"),
            event("d1", "A", "2024-01-07", "B Type", "Disconnected", "T1"),
        ];

        let series = disconnected_series(&events, date("2024-01-04"), date("2024-01-10"), &Selection::All);

        assert_eq!(series.len(), 7);
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
        let counts: Vec<usize> = series.iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![0, 2, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_series_counts_distinct_devices() {
        let events = vec![
            event("d1", "A", "2024-01-05", "B Type", "Disconnected", "T1"),
            event("d1", "A", "2024-01-05 18:00:00", "B Type", "Disconnected", "T1"),
        ];

        let series = disconnected_series(&events, date("2024-01-05"), date("2024-01-05"), &Selection::All);

        assert_eq!(series, vec![DailyCount { date: date("2024-01-05"), count: 1 }]);
    }

    #[test]
    fn test_series_ignores_connected_and_out_of_range_rows() {
        let events = vec![
            event("d1", "A", "2024-01-05", "B Type", "Good", "T1"),
            event("d2", "A", "2024-01-03", "B Type", "Disconnected", "T2"),
            event("d3", "A", "2024-01-11", "B Type", "Disconnected", "T3"),
            event("d4", "A", "garbage", "B Type", "Disconnected", "T4"),
        ];

        let series = disconnected_series(&events, date("2024-01-04"), date("2024-01-10"), &Selection::All);

        assert!(series.iter().all(|c| c.count == 0));
    }

    #[test]
    fn test_series_device_type_filter() {
        let events = vec![
            event("d1", "A", "2024-01-05", "B Type", "Disconnected", "T1"),
            event("d2", "A", "2024-01-05", "C Type", "Disconnected", "T2"),
        ];

        let b_only = disconnected_series(&events, date("2024-01-05"), date("2024-01-05"), &"B Type".into());

        assert_eq!(b_only[0].count, 1);
    }
}
