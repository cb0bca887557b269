use crate::models::{ALL, B_TYPE, C_TYPE, DeviceRecord, DisconnectionEvent, MasterRecord, Selection};
use crate::services::metrics::{earliest_entry_date, latest_entry_date};
use crate::services::timeseries::ChartDuration;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The four categorical filter controls
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    #[serde(default)]
    pub farm_status: Selection,
    #[serde(default)]
    pub housing_type: Selection,
    #[serde(default)]
    pub cluster: Selection,
    #[serde(default)]
    pub farm_name: Selection,
}

/// Working copies of the three tables after filtering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredTables {
    pub events: Vec<DisconnectionEvent>,
    pub devices: Vec<DeviceRecord>,
    pub master: Vec<MasterRecord>,
}

impl FilteredTables {
    fn restrict_to_farms(&mut self, farms: &HashSet<String>) {
        self.events.retain(|e| farms.contains(&e.farm_name));
        self.devices.retain(|d| farms.contains(&d.farm_name));
        self.master.retain(|m| farms.contains(&m.farm_name));
    }
}

fn farm_set<'a, T: 'a>(
    rows: impl IntoIterator<Item = &'a T>,
    keep: impl Fn(&T) -> bool,
    farm: impl Fn(&T) -> &str,
) -> HashSet<String> {
    rows.into_iter()
        .filter(|r| keep(r))
        .map(|r| farm(r).to_string())
        .collect()
}

/// Apply the cascading filters.
///
/// Order is fixed: farm status, housing type, cluster, farm name. Every step
/// narrows all three tables before the next step reads them. The inputs are
/// never modified.
pub fn apply_filters(
    master: &[MasterRecord],
    devices: &[DeviceRecord],
    events: &[DisconnectionEvent],
    selection: &FilterSelection,
) -> FilteredTables {
    let mut tables = FilteredTables {
        events: events.to_vec(),
        devices: devices.to_vec(),
        master: master.to_vec(),
    };

    if let Some(status) = selection.farm_status.value() {
        let farms = farm_set(&tables.master, |m| m.farm_status == status, |m| m.farm_name.as_str());
        tables.restrict_to_farms(&farms);
        tables.master.retain(|m| m.farm_status == status);
    }

    if let Some(housing) = selection.housing_type.value() {
        let farms = farm_set(&tables.devices, |d| d.housing_type == housing, |d| d.farm_name.as_str());
        tables.restrict_to_farms(&farms);
        tables.devices.retain(|d| d.housing_type == housing);
    }

    if let Some(cluster) = selection.cluster.value() {
        let farms = farm_set(&tables.master, |m| m.cluster == cluster, |m| m.farm_name.as_str());
        tables.restrict_to_farms(&farms);
        tables.master.retain(|m| m.cluster == cluster);
    }

    if let Some(farm) = selection.farm_name.value() {
        tables.events.retain(|e| e.farm_name == farm);
        tables.devices.retain(|d| d.farm_name == farm);
        tables.master.retain(|m| m.farm_name == farm);
    }

    tables
}

/// Distinct non-empty values of a column, in first-appearance order
pub fn unique_values<'a, T: 'a>(
    rows: impl IntoIterator<Item = &'a T>,
    column: impl Fn(&T) -> &str,
) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .map(column)
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Choices for every filter control, each list headed by "All"
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FilterOptions {
    pub farm_statuses: Vec<String>,
    pub housing_types: Vec<String>,
    pub clusters: Vec<String>,
    pub farm_names: Vec<String>,
    pub device_types: Vec<String>,
    pub durations: Vec<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

fn with_all(values: Vec<String>) -> Vec<String> {
    std::iter::once(ALL.to_string()).chain(values).collect()
}

pub fn filter_options(
    master: &[MasterRecord],
    devices: &[DeviceRecord],
    events: &[DisconnectionEvent],
) -> FilterOptions {
    FilterOptions {
        farm_statuses: with_all(unique_values(master, |m| m.farm_status.as_str())),
        housing_types: with_all(unique_values(devices, |d| d.housing_type.as_str())),
        clusters: with_all(unique_values(master, |m| m.cluster.as_str())),
        farm_names: with_all(unique_values(master, |m| m.farm_name.as_str())),
        device_types: with_all(vec![B_TYPE.to_string(), C_TYPE.to_string()]),
        durations: ChartDuration::ALL
            .iter()
            .map(|d| d.label().to_string())
            .collect(),
        min_date: earliest_entry_date(events),
        max_date: latest_entry_date(events),
    }
}
