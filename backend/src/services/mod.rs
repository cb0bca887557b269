pub mod auth;
pub mod filters;
pub mod gateway;
pub mod loader;
pub mod metrics;
pub mod timeseries;
pub mod users;

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{DeviceRecord, DisconnectionEvent, MasterRecord};
    use crate::services::loader::parse_entry_date;
    use chrono::NaiveDate;

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    pub fn farm(name: &str, status: &str, cluster: &str, vcm: &str) -> MasterRecord {
        MasterRecord {
            farm_name: name.to_string(),
            farm_status: status.to_string(),
            cluster: cluster.to_string(),
            vcm_name: vcm.to_string(),
        }
    }

    pub fn device(id: &str, farm: &str, housing: &str, gateway: &str, breed: &str) -> DeviceRecord {
        DeviceRecord {
            deviceid: id.to_string(),
            farm_name: farm.to_string(),
            housing_type: housing.to_string(),
            gatewayid: gateway.to_string(),
            breed: breed.to_string(),
        }
    }

    pub fn event(
        id: &str,
        farm: &str,
        entry_date: &str,
        device_type: &str,
        quality: &str,
        tag: &str,
    ) -> DisconnectionEvent {
        DisconnectionEvent {
            deviceid: id.to_string(),
            farm_name: farm.to_string(),
            entry_date: parse_entry_date(entry_date),
            device_type: device_type.to_string(),
            data_quality: quality.to_string(),
            tag_number: tag.to_string(),
        }
    }

    /// Four farms, every one present in all three tables
    pub fn sample_dataset() -> (Vec<MasterRecord>, Vec<DeviceRecord>, Vec<DisconnectionEvent>) {
        let master = vec![
            farm("A", "Active", "North", "Vcm One"),
            farm("B", "Active", "North", "Vcm One"),
            farm("C", "Active", "South", "Vcm Two"),
            farm("D", "Inactive", "South", "Vcm Three"),
        ];
        let devices = vec![
            device("a1", "A", "Barn", "g1", "Holstein"),
            device("a2", "A", "Barn", "g1", "Jersey"),
            device("b1", "B", "Barn", "g2", "Holstein"),
            device("b2", "B", "Pasture", "g3", "Holstein"),
            device("c1", "C", "Barn", "g4", "Jersey"),
            device("d1", "D", "Barn", "g5", "Angus"),
        ];
        let events = vec![
            event("a1", "A", "2024-01-09", "B Type", "Disconnected", "TA1"),
            event("a2", "A", "2024-01-09", "C Type", "Disconnected", "TA2"),
            event("a1", "A", "2024-01-10", "B Type", "Disconnected", "TA1"),
            event("a2", "A", "2024-01-10", "C Type", "Good", "TA2"),
            event("b1", "B", "2024-01-10", "B Type", "Disconnected", "TB1"),
            event("b2", "B", "2024-01-10", "C Type", "Good", "TB2"),
            event("c1", "C", "2024-01-10", "C Type", "Disconnected", "TC1"),
            event("d1", "D", "2024-01-08", "B Type", "Good", "TD1"),
        ];
        (master, devices, events)
    }
}
