use crate::models::{ALL, B_TYPE, C_TYPE, DeviceRecord, DisconnectionEvent, MasterRecord, Selection};
use crate::services::filters::{FilteredTables, FilterSelection, unique_values};
use crate::services::gateway::{self, GATEWAY_ID_DISPLAY_LIMIT, GatewayIssue};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FarmInfo {
    pub farm_count: usize,
    pub farm_name: String,
    pub cluster: String,
    pub vcm_name: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeBreakdown {
    pub total: usize,
    pub b_type: usize,
    pub c_type: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GatewayStats {
    pub gateway_count: usize,
    pub gateway_ids: Vec<String>,
    /// "Yes (n)" or "No"
    pub gateway_issue: String,
    pub issue: GatewayIssue,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BreedCount {
    pub breed: String,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DisconnectedDevice {
    pub deviceid: String,
    pub tag_number: String,
}

/// Every metric card of the dashboard for one filter selection
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DashboardMetrics {
    /// Day the device statistics were scoped to, if any
    pub snapshot_date: Option<NaiveDate>,
    pub farm_info: FarmInfo,
    pub devices: TypeBreakdown,
    pub disconnected: TypeBreakdown,
    pub gateways: GatewayStats,
    pub breed_counts: Vec<BreedCount>,
    pub disconnected_devices: Vec<DisconnectedDevice>,
}

pub fn farm_count(master: &[MasterRecord]) -> usize {
    master
        .iter()
        .map(|m| m.farm_name.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// The only distinct value, or "All" when there is not exactly one
fn single_or_all(values: Vec<String>) -> String {
    match values.as_slice() {
        [only] => only.clone(),
        _ => ALL.to_string(),
    }
}

pub fn farm_name_display(selection: &Selection, master: &[MasterRecord]) -> String {
    if selection.is_all() {
        return ALL.to_string();
    }
    single_or_all(unique_values(master, |m| m.farm_name.as_str()))
}

pub fn cluster_display(selection: &Selection, master: &[MasterRecord]) -> String {
    if selection.is_all() {
        return ALL.to_string();
    }
    single_or_all(unique_values(master, |m| m.cluster.as_str()))
}

pub fn vcm_name_display(master: &[MasterRecord]) -> String {
    single_or_all(unique_values(master, |m| m.vcm_name.as_str()))
}

fn distinct_devices<'a>(events: impl Iterator<Item = &'a DisconnectionEvent>) -> usize {
    events
        .map(|e| e.deviceid.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Distinct devices in `events`, optionally only those tagged `device_type`
pub fn device_count(events: &[DisconnectionEvent], device_type: Option<&str>) -> usize {
    distinct_devices(
        events
            .iter()
            .filter(|e| device_type.is_none_or(|t| e.device_type == t)),
    )
}

/// Distinct devices marked disconnected, optionally only those tagged `device_type`
pub fn disconnected_count(events: &[DisconnectionEvent], device_type: Option<&str>) -> usize {
    distinct_devices(
        events
            .iter()
            .filter(|e| e.is_disconnected())
            .filter(|e| device_type.is_none_or(|t| e.device_type == t)),
    )
}

/// Devices per breed, most common first. Ties keep table order.
pub fn breed_counts(devices: &[DeviceRecord]) -> Vec<BreedCount> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for d in devices {
        let count = counts.entry(d.breed.as_str()).or_insert_with(|| {
            order.push(d.breed.as_str());
            0
        });
        *count += 1;
    }

    let mut out: Vec<BreedCount> = order
        .into_iter()
        .map(|breed| BreedCount {
            breed: breed.to_string(),
            count: counts[breed],
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// Every disconnected row, in table order, duplicates included
pub fn disconnected_device_list(events: &[DisconnectionEvent]) -> Vec<DisconnectedDevice> {
    events
        .iter()
        .filter(|e| e.is_disconnected())
        .map(|e| DisconnectedDevice {
            deviceid: e.deviceid.clone(),
            tag_number: e.tag_number.clone(),
        })
        .collect()
}

/// Latest parseable entry date in the event log
pub fn latest_entry_date(events: &[DisconnectionEvent]) -> Option<NaiveDate> {
    events.iter().filter_map(|e| e.entry_date).max()
}

pub fn earliest_entry_date(events: &[DisconnectionEvent]) -> Option<NaiveDate> {
    events.iter().filter_map(|e| e.entry_date).min()
}

/// Build every metric card.
///
/// Device and disconnection statistics look at `snapshot_date` only. With
/// `None` they span every filtered event, which is what a dashboard without a
/// date picker shows; callers that want those whole-log cards pass `None`.
/// The gateway card always uses the full filtered event table, and its
/// gateway count goes back to `all_devices`.
pub fn compute_metrics(
    tables: &FilteredTables,
    selection: &FilterSelection,
    all_devices: &[DeviceRecord],
    snapshot_date: Option<NaiveDate>,
) -> DashboardMetrics {
    let snapshot: Vec<DisconnectionEvent> = match snapshot_date {
        Some(date) => tables
            .events
            .iter()
            .filter(|e| e.entry_date == Some(date))
            .cloned()
            .collect(),
        None => tables.events.clone(),
    };

    let issue = gateway::evaluate_gateway_issue(&tables.devices, &tables.events);

    DashboardMetrics {
        snapshot_date,
        farm_info: FarmInfo {
            farm_count: farm_count(&tables.master),
            farm_name: farm_name_display(&selection.farm_name, &tables.master),
            cluster: cluster_display(&selection.cluster, &tables.master),
            vcm_name: vcm_name_display(&tables.master),
        },
        devices: TypeBreakdown {
            total: device_count(&snapshot, None),
            b_type: device_count(&snapshot, Some(B_TYPE)),
            c_type: device_count(&snapshot, Some(C_TYPE)),
        },
        disconnected: TypeBreakdown {
            total: disconnected_count(&snapshot, None),
            b_type: disconnected_count(&snapshot, Some(B_TYPE)),
            c_type: disconnected_count(&snapshot, Some(C_TYPE)),
        },
        gateways: GatewayStats {
            gateway_count: gateway::gateway_count(all_devices, &tables.devices),
            gateway_ids: gateway::gateway_ids(&tables.devices, GATEWAY_ID_DISPLAY_LIMIT),
            gateway_issue: issue.display(),
            issue,
        },
        breed_counts: breed_counts(&tables.devices),
        disconnected_devices: disconnected_device_list(&snapshot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::filters::apply_filters;
    use crate::services::fixtures::{date, device, event, farm, sample_dataset};

    #[test]
    fn test_farm_count_is_distinct() {
        let master = vec![
            farm("A", "Active", "North", "V1"),
            farm("A", "Active", "North", "V1"),
            farm("B", "Active", "North", "V1"),
        ];
        assert_eq!(farm_count(&master), 2);
        assert_eq!(farm_count(&[]), 0);
    }

    #[test]
    fn test_farm_name_display_needs_explicit_selection() {
        let master = vec![farm("A", "Active", "North", "V1")];

        assert_eq!(farm_name_display(&Selection::All, &master), "All");
        assert_eq!(farm_name_display(&"A".into(), &master), "A");
        assert_eq!(farm_name_display(&"A".into(), &[]), "All");
    }

    #[test]
    fn test_cluster_display_collapses_to_all() {
        let master = vec![
            farm("A", "Active", "North", "V1"),
            farm("B", "Active", "South", "V1"),
        ];
        assert_eq!(cluster_display(&"North".into(), &master), "All");
        assert_eq!(cluster_display(&"North".into(), &master[..1]), "North");
        assert_eq!(cluster_display(&Selection::All, &master[..1]), "All");
    }

    #[test]
    fn test_vcm_name_display() {
        let master = vec![
            farm("A", "Active", "North", "V1"),
            farm("B", "Active", "South", "V1"),
        ];
        assert_eq!(vcm_name_display(&master), "V1");

        let mixed = vec![farm("A", "Active", "North", "V1"), farm("B", "Active", "South", "V2")];
        assert_eq!(vcm_name_display(&mixed), "All");
        assert_eq!(vcm_name_display(&[]), "All");
    }

    #[test]
    fn test_device_and_disconnected_counts() {
        let events = vec![
            event("d1", "A", "2024-01-05", "B Type", "Disconnected", "T1"),
            event("d1", "A", "2024-01-06", "B Type", "Disconnected", "T1"),
            event("d2", "A", "2024-01-05", "C Type", "Good", "T2"),
            event("d3", "A", "2024-01-05", "C Type", "Disconnected", "T3"),
        ];

        assert_eq!(device_count(&events, None), 3);
        assert_eq!(device_count(&events, Some(B_TYPE)), 1);
        assert_eq!(device_count(&events, Some(C_TYPE)), 2);
        assert_eq!(disconnected_count(&events, None), 2);
        assert_eq!(disconnected_count(&events, Some(B_TYPE)), 1);
        assert_eq!(disconnected_count(&events, Some(C_TYPE)), 1);
    }

    #[test]
    fn test_breed_counts_descending_and_sum_to_devices() {
        let devices = vec![
            device("d1", "A", "Barn", "g1", "Jersey"),
            device("d2", "A", "Barn", "g1", "Holstein"),
            device("d3", "A", "Barn", "g1", "Holstein"),
            device("d4", "A", "Barn", "g1", "Angus"),
            device("d5", "A", "Barn", "g1", ""),
        ];

        let counts = breed_counts(&devices);

        assert_eq!(counts[0], BreedCount { breed: "Holstein".to_string(), count: 2 });
        // Ties keep table order
        assert_eq!(counts[1].breed, "Jersey");
        assert_eq!(counts[2].breed, "Angus");
        assert_eq!(counts.iter().map(|b| b.count).sum::<usize>(), devices.len());
    }

    #[test]
    fn test_disconnected_list_keeps_duplicates_and_order() {
        let events = vec![
            event("d2", "A", "2024-01-05", "B Type", "Disconnected", "T2"),
            event("d1", "A", "2024-01-05", "B Type", "Good", "T1"),
            event("d2", "A", "2024-01-06", "B Type", "Disconnected", "T2"),
        ];

        let list = disconnected_device_list(&events);

        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|d| d.deviceid == "d2" && d.tag_number == "T2"));
    }

    #[test]
    fn test_entry_date_bounds() {
        let (_, _, events) = sample_dataset();
        assert_eq!(earliest_entry_date(&events), Some(date("2024-01-08")));
        assert_eq!(latest_entry_date(&events), Some(date("2024-01-10")));
        assert_eq!(latest_entry_date(&[]), None);
    }

    #[test]
    fn test_compute_metrics_for_single_farm() {
        let (master, devices, events) = sample_dataset();
        let selection = FilterSelection {
            farm_name: "A".into(),
            ..Default::default()
        };
        let tables = apply_filters(&master, &devices, &events, &selection);

        let metrics = compute_metrics(&tables, &selection, &devices, Some(date("2024-01-10")));

        assert_eq!(metrics.farm_info.farm_count, 1);
        assert_eq!(metrics.farm_info.farm_name, "A");
        assert_eq!(metrics.farm_info.cluster, "All");
        assert_eq!(metrics.farm_info.vcm_name, "Vcm One");
        assert_eq!(metrics.devices, TypeBreakdown { total: 2, b_type: 1, c_type: 1 });
        assert_eq!(metrics.disconnected, TypeBreakdown { total: 1, b_type: 1, c_type: 0 });
        assert_eq!(metrics.disconnected_devices.len(), 1);
        // a2 was disconnected on the 9th, so across all dates both devices are down
        assert_eq!(metrics.gateways.gateway_issue, "Yes (1)");
        assert_eq!(metrics.gateways.gateway_count, 1);
        assert_eq!(metrics.gateways.gateway_ids, vec!["g1".to_string()]);
    }

    #[test]
    fn test_compute_metrics_without_snapshot_uses_all_events() {
        let (master, devices, events) = sample_dataset();
        let selection = FilterSelection::default();
        let tables = apply_filters(&master, &devices, &events, &selection);

        let metrics = compute_metrics(&tables, &selection, &devices, None);

        assert_eq!(metrics.farm_info.farm_count, 4);
        assert_eq!(metrics.farm_info.farm_name, "All");
        assert_eq!(metrics.farm_info.vcm_name, "All");
        assert_eq!(metrics.devices.total, 6);
        assert_eq!(metrics.disconnected.total, 4);
        assert_eq!(metrics.gateways.gateway_count, 5);
        assert_eq!(
            metrics.breed_counts.iter().map(|b| b.count).sum::<usize>(),
            tables.devices.len()
        );
        // Farms A and C have every device disconnected at some point
        assert_eq!(metrics.gateways.issue.flagged_farms, vec!["A".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_compute_metrics_on_empty_selection() {
        let (master, devices, events) = sample_dataset();
        let selection = FilterSelection {
            cluster: "Nowhere".into(),
            ..Default::default()
        };
        let tables = apply_filters(&master, &devices, &events, &selection);

        let metrics = compute_metrics(&tables, &selection, &devices, Some(date("2024-01-10")));

        assert_eq!(metrics.farm_info.farm_count, 0);
        assert_eq!(metrics.devices.total, 0);
        assert_eq!(metrics.gateways.gateway_count, 0);
        assert_eq!(metrics.gateways.gateway_issue, "No");
        assert!(metrics.breed_counts.is_empty());
    }
}
