use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Value of the `data_quality` column marking a device as disconnected
pub const DISCONNECTED: &str = "Disconnected";

/// `Device_type` tags
pub const B_TYPE: &str = "B Type";
pub const C_TYPE: &str = "C Type";

/// Sentinel used by every filter control for "no filtering"
pub const ALL: &str = "All";

/// One row of the master farm registry
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MasterRecord {
    pub farm_name: String,
    pub farm_status: String,
    pub cluster: String,
    pub vcm_name: String,
}

/// One row of the device inventory
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub deviceid: String,
    pub farm_name: String,
    pub housing_type: String,
    pub gatewayid: String,
    pub breed: String,
}

/// One device-day observation from the disconnection log
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DisconnectionEvent {
    pub deviceid: String,
    pub farm_name: String,
    /// `None` when the uploaded value could not be parsed as a date
    pub entry_date: Option<NaiveDate>,
    pub device_type: String,
    pub data_quality: String,
    pub tag_number: String,
}

impl DisconnectionEvent {
    pub fn is_disconnected(&self) -> bool {
        self.data_quality == DISCONNECTED
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// A single filter control: either a concrete value or "All"
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum Selection {
    #[default]
    All,
    Value(String),
}

impl Selection {
    pub fn value(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Value(v) => Some(v.as_str()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    /// True when `candidate` passes this selection
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Value(v) => v == candidate,
        }
    }
}

/// Blank values select nothing in particular and read as "All"
impl From<String> for Selection {
    fn from(value: String) -> Self {
        if value == ALL || value.trim().is_empty() {
            Selection::All
        } else {
            Selection::Value(value)
        }
    }
}

impl From<&str> for Selection {
    fn from(value: &str) -> Self {
        Selection::from(value.to_string())
    }
}

impl From<Selection> for String {
    fn from(value: Selection) -> Self {
        match value {
            Selection::All => ALL.to_string(),
            Selection::Value(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_all_sentinel() {
        assert_eq!(Selection::from("All"), Selection::All);
        assert_eq!(
            Selection::from("Active"),
            Selection::Value("Active".to_string())
        );
        assert_eq!(Selection::from(""), Selection::All);
        assert_eq!(Selection::from("   "), Selection::All);
    }

    #[test]
    fn test_selection_matches() {
        assert!(Selection::All.matches("anything"));
        assert!(Selection::from("A").matches("A"));
        assert!(!Selection::from("A").matches("B"));
        assert!(!Selection::from("A").matches(""));
    }

    #[test]
    fn test_selection_deserialization() {
        let sel: Selection = serde_json::from_str(r#""All""#).unwrap();
        assert!(sel.is_all());
        let sel: Selection = serde_json::from_str(r#""Farm 7""#).unwrap();
        assert_eq!(sel.value(), Some("Farm 7"));
        assert_eq!(serde_json::to_string(&Selection::All).unwrap(), r#""All""#);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""admin""#);
    }

    #[test]
    fn test_disconnected_flag() {
        let event = DisconnectionEvent {
            deviceid: "d1".to_string(),
            farm_name: "A".to_string(),
            entry_date: None,
            device_type: B_TYPE.to_string(),
            data_quality: "Disconnected".to_string(),
            tag_number: "T1".to_string(),
        };
        assert!(event.is_disconnected());
    }
}
