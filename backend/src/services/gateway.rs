use crate::models::{DeviceRecord, DisconnectionEvent};
use crate::services::timeseries::{DailyCount, date_axis};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Number of gateway ids shown on the dashboard card
pub const GATEWAY_ID_DISPLAY_LIMIT: usize = 10;

/// Point-in-time gateway-issue result for the filtered farms
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayIssue {
    pub has_issue: bool,
    pub flagged_count: usize,
    pub flagged_farms: Vec<String>,
}

impl GatewayIssue {
    /// "Yes (n)" or "No"
    pub fn display(&self) -> String {
        if self.has_issue {
            format!("Yes ({})", self.flagged_count)
        } else {
            "No".to_string()
        }
    }
}

/// Known devices per farm, in first-appearance order of the farms
struct FarmInventory<'a> {
    farms: Vec<&'a str>,
    devices: HashMap<&'a str, HashSet<&'a str>>,
}

impl<'a> FarmInventory<'a> {
    fn new(devices: &'a [DeviceRecord]) -> Self {
        let mut farms = Vec::new();
        let mut by_farm: HashMap<&str, HashSet<&str>> = HashMap::new();
        for d in devices {
            let known = by_farm.entry(d.farm_name.as_str()).or_insert_with(|| {
                farms.push(d.farm_name.as_str());
                HashSet::new()
            });
            known.insert(d.deviceid.as_str());
        }
        Self {
            farms,
            devices: by_farm,
        }
    }

    /// Farms whose every known device is disconnected in `disconnected`.
    ///
    /// Compares set sizes, so a farm without devices is never flagged.
    fn flagged(&self, disconnected: &HashMap<&str, HashSet<&str>>) -> Vec<&'a str> {
        self.farms
            .iter()
            .copied()
            .filter(|farm| {
                let known = self.devices.get(farm).map_or(0, HashSet::len);
                let down = disconnected.get(farm).map_or(0, HashSet::len);
                known > 0 && known == down
            })
            .collect()
    }
}

fn disconnected_by_farm<'a>(
    events: impl IntoIterator<Item = &'a DisconnectionEvent>,
) -> HashMap<&'a str, HashSet<&'a str>> {
    let mut out: HashMap<&str, HashSet<&str>> = HashMap::new();
    for e in events.into_iter().filter(|e| e.is_disconnected()) {
        out.entry(e.farm_name.as_str())
            .or_default()
            .insert(e.deviceid.as_str());
    }
    out
}

/// True when `farm` has known devices and all of them are disconnected in `events`
pub fn farm_has_gateway_issue(
    farm: &str,
    devices: &[DeviceRecord],
    events: &[DisconnectionEvent],
) -> bool {
    let inventory = FarmInventory::new(devices);
    inventory
        .flagged(&disconnected_by_farm(events))
        .contains(&farm)
}

/// Evaluate the gateway-issue rule over every farm of the filtered device table.
///
/// `events` is used as-is; no date restriction is applied here.
pub fn evaluate_gateway_issue(
    devices: &[DeviceRecord],
    events: &[DisconnectionEvent],
) -> GatewayIssue {
    let inventory = FarmInventory::new(devices);
    let flagged: Vec<String> = inventory
        .flagged(&disconnected_by_farm(events))
        .into_iter()
        .map(str::to_string)
        .collect();

    GatewayIssue {
        has_issue: !flagged.is_empty(),
        flagged_count: flagged.len(),
        flagged_farms: flagged,
    }
}

/// Distinct gateways of the full inventory restricted to the farms and housing
/// types present in `filtered_devices`. Dates play no part in this count.
pub fn gateway_count(all_devices: &[DeviceRecord], filtered_devices: &[DeviceRecord]) -> usize {
    let farms: HashSet<&str> = filtered_devices.iter().map(|d| d.farm_name.as_str()).collect();
    let housing: HashSet<&str> = filtered_devices
        .iter()
        .map(|d| d.housing_type.as_str())
        .collect();

    all_devices
        .iter()
        .filter(|d| farms.contains(d.farm_name.as_str()) && housing.contains(d.housing_type.as_str()))
        .filter(|d| !d.gatewayid.is_empty())
        .map(|d| d.gatewayid.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Distinct gateway ids of the filtered devices, first `limit` in table order
pub fn gateway_ids(filtered_devices: &[DeviceRecord], limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    filtered_devices
        .iter()
        .map(|d| d.gatewayid.as_str())
        .filter(|g| !g.is_empty() && seen.insert(*g))
        .take(limit)
        .map(str::to_string)
        .collect()
}

/// Count of farms with a gateway issue on each day from `start` to `end`.
///
/// Each day only sees that day's events. Days without events report zero.
pub fn gateway_issue_series(
    devices: &[DeviceRecord],
    events: &[DisconnectionEvent],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DailyCount> {
    let inventory = FarmInventory::new(devices);

    let mut per_day: HashMap<NaiveDate, Vec<&DisconnectionEvent>> = HashMap::new();
    for e in events {
        if let Some(date) = e.entry_date.filter(|d| *d >= start && *d <= end) {
            per_day.entry(date).or_default().push(e);
        }
    }

    date_axis(start, end)
        .into_iter()
        .map(|date| {
            let count = per_day.get(&date).map_or(0, |day| {
                inventory
                    .flagged(&disconnected_by_farm(day.iter().copied()))
                    .len()
            });
            DailyCount { date, count }
        })
        .collect()
}
