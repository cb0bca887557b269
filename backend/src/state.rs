use crate::models::{DeviceRecord, DisconnectionEvent, MasterRecord, Role};
use crate::services::filters::{self, FilterSelection, FilteredTables};
use crate::services::loader::{self, LoadError, Table, TableKind};
use crate::services::users::{UserError, UserRegistry};
use serde::Serialize;
use std::sync::Mutex;

pub type SharedState = Mutex<AppState>;

/// Who is logged in, if anyone
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub logged_in: bool,
    pub username: Option<String>,
    pub role: Option<Role>,
}

impl Session {
    pub fn login(&mut self, username: &str, role: Role) {
        self.logged_in = true;
        self.username = Some(username.to_string());
        self.role = Some(role);
    }

    pub fn logout(&mut self) {
        *self = Session::default();
    }

    /// True when `username` holds the current session with `role`
    pub fn is_active_for(&self, username: &str, role: Role) -> bool {
        self.logged_in && self.username.as_deref() == Some(username) && self.role == Some(role)
    }
}

/// Uploaded tables. Each one is replaced wholesale on upload.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    master: Option<Vec<MasterRecord>>,
    devices: Option<Vec<DeviceRecord>>,
    disconnections: Option<Vec<DisconnectionEvent>>,
}

/// Borrowed view over a complete set of tables
#[derive(Debug, Clone, Copy)]
pub struct Dataset<'a> {
    pub master: &'a [MasterRecord],
    pub devices: &'a [DeviceRecord],
    pub events: &'a [DisconnectionEvent],
}

impl Dataset<'_> {
    pub fn filter(&self, selection: &FilterSelection) -> FilteredTables {
        filters::apply_filters(self.master, self.devices, self.events, selection)
    }
}

impl DataStore {
    /// Validate and store `table` as `kind`. Returns the row count.
    ///
    /// On error the previously stored table is kept.
    pub fn store(&mut self, kind: TableKind, table: &Table) -> Result<usize, LoadError> {
        match kind {
            TableKind::Master => {
                let rows = loader::parse_master(table)?;
                let count = rows.len();
                self.master = Some(rows);
                Ok(count)
            }
            TableKind::Devices => {
                let rows = loader::parse_devices(table)?;
                let count = rows.len();
                self.devices = Some(rows);
                Ok(count)
            }
            TableKind::Disconnections => {
                let rows = loader::parse_disconnections(table)?;
                let count = rows.len();
                self.disconnections = Some(rows);
                Ok(count)
            }
        }
    }

    pub fn missing(&self) -> Vec<TableKind> {
        let mut missing = Vec::new();
        if self.master.is_none() {
            missing.push(TableKind::Master);
        }
        if self.devices.is_none() {
            missing.push(TableKind::Devices);
        }
        if self.disconnections.is_none() {
            missing.push(TableKind::Disconnections);
        }
        missing
    }

    /// All three tables, or `None` while any is still missing
    pub fn dataset(&self) -> Option<Dataset<'_>> {
        Some(Dataset {
            master: self.master.as_deref()?,
            devices: self.devices.as_deref()?,
            events: self.disconnections.as_deref()?,
        })
    }
}

/// Everything the service keeps between requests
#[derive(Debug, Clone)]
pub struct AppState {
    pub data: DataStore,
    pub users: UserRegistry,
    pub session: Session,
}

impl AppState {
    /// Empty tables, only the built-in admin, nobody logged in
    pub fn new(admin_password: &str) -> Result<Self, UserError> {
        Ok(Self {
            data: DataStore::default(),
            users: UserRegistry::new(admin_password)?,
            session: Session::default(),
        })
    }
}
