use crate::models::{DeviceRecord, DisconnectionEvent, MasterRecord};
use calamine::{Data, DataType, Reader};
use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

const SPREADSHEET_EXTENSIONS: [&str; 5] = [".xlsx", ".xlsm", ".xls", ".xlsb", ".ods"];

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y", "%d.%m.%Y",
];

/// A file as received from the upload form
#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

/// Untyped table: a header row plus string cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Checks that every column required by `kind` is present
    pub fn validate(&self, kind: TableKind) -> Result<(), LoadError> {
        let missing: Vec<String> = kind
            .required_columns()
            .iter()
            .filter(|c| self.column_index(c).is_none())
            .map(|c| c.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoadError::MissingColumns { kind, missing })
        }
    }

    /// Resolves `names` to column positions. Call `validate` first.
    fn indices<const N: usize>(&self, kind: TableKind, names: [&str; N]) -> Result<[usize; N], LoadError> {
        self.validate(kind)?;
        let mut out = [0; N];
        for (slot, name) in out.iter_mut().zip(names) {
            *slot = self.column_index(name).unwrap_or_default();
        }
        Ok(out)
    }

    fn cell(row: &[String], idx: usize) -> String {
        row.get(idx).cloned().unwrap_or_default()
    }
}

/// The three datasets the dashboard ingests
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Master,
    Devices,
    Disconnections,
}

impl TableKind {
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            TableKind::Master => &["farm_name", "farm_status", "Cluster", "vcm_name"],
            TableKind::Devices => &["deviceid", "farm_name", "housing_type", "gatewayid", "breed"],
            TableKind::Disconnections => &[
                "deviceid",
                "farm_name",
                "entry_date",
                "Device_type",
                "data_quality",
                "tag_number",
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Master => "master",
            TableKind::Devices => "devices",
            TableKind::Disconnections => "disconnections",
        }
    }
}

impl std::str::FromStr for TableKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(TableKind::Master),
            "devices" => Ok(TableKind::Devices),
            "disconnections" => Ok(TableKind::Disconnections),
            other => Err(format!("Unknown table kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Every decoder in the fallback chain rejected the file
    Decode(String),
    MissingColumns { kind: TableKind, missing: Vec<String> },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Decode(msg) => write!(f, "Could not read file: {}", msg),
            LoadError::MissingColumns { kind, missing } => write!(
                f,
                "The {} file is missing required columns: {}",
                kind.as_str(),
                missing.join(", ")
            ),
        }
    }
}

impl std::error::Error for LoadError {}

/// Decode an uploaded file into a table.
///
/// Tries the decoder implied by the filename, then CSV as Latin-1, then the
/// spreadsheet reader. `None` input is not an error.
pub fn load_table(upload: Option<&Upload<'_>>) -> Result<Option<Table>, LoadError> {
    let Some(upload) = upload else {
        return Ok(None);
    };

    let spreadsheet_first = is_spreadsheet(upload.filename);
    let first = if spreadsheet_first {
        parse_spreadsheet(upload.bytes)
    } else {
        parse_csv_utf8(upload.bytes)
    };

    let err = match first {
        Ok(table) => return Ok(Some(table)),
        Err(e) => e,
    };
    warn!("Failed to decode {}: {}. Retrying as Latin-1 CSV", upload.filename, err);

    let err = match parse_delimited(&decode_latin1(upload.bytes)) {
        Ok(table) => {
            info!("Decoded {} with the Latin-1 fallback", upload.filename);
            return Ok(Some(table));
        }
        Err(e) => e,
    };

    if spreadsheet_first {
        return Err(LoadError::Decode(err));
    }

    warn!("Latin-1 decoding of {} failed: {}. Retrying as spreadsheet", upload.filename, err);
    parse_spreadsheet(upload.bytes)
        .map(Some)
        .map_err(LoadError::Decode)
}

fn is_spreadsheet(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    SPREADSHEET_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn parse_csv_utf8(bytes: &[u8]) -> Result<Table, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("invalid UTF-8: {}", e))?;
    parse_delimited(text)
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn parse_delimited(text: &str) -> Result<Table, String> {
    if text.contains('\0') {
        return Err("binary content is not delimited text".to_string());
    }
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.iter().all(|c| c.is_empty()) {
        return Err("missing header row".to_string());
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { columns, rows })
}

fn parse_spreadsheet(bytes: &[u8]) -> Result<Table, String> {
    let mut workbook =
        calamine::open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no worksheets".to_string())?
        .map_err(|e| e.to_string())?;

    let mut rows = range.rows();
    let columns: Vec<String> = rows
        .next()
        .ok_or_else(|| "worksheet is empty".to_string())?
        .iter()
        .map(cell_text)
        .collect();
    let rows = rows.map(|row| row.iter().map(cell_text).collect()).collect();

    Ok(Table { columns, rows })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        // Ids typed into Excel come back as floats
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

/// Parses the date part of `raw`, discarding any time of day
pub fn parse_entry_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw
        .trim()
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or_default();

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

pub fn parse_master(table: &Table) -> Result<Vec<MasterRecord>, LoadError> {
    let [farm_name, farm_status, cluster, vcm_name] = table.indices(
        TableKind::Master,
        ["farm_name", "farm_status", "Cluster", "vcm_name"],
    )?;

    Ok(table
        .rows
        .iter()
        .map(|row| MasterRecord {
            farm_name: Table::cell(row, farm_name),
            farm_status: Table::cell(row, farm_status),
            cluster: Table::cell(row, cluster),
            vcm_name: Table::cell(row, vcm_name),
        })
        .collect())
}

pub fn parse_devices(table: &Table) -> Result<Vec<DeviceRecord>, LoadError> {
    let [deviceid, farm_name, housing_type, gatewayid, breed] = table.indices(
        TableKind::Devices,
        ["deviceid", "farm_name", "housing_type", "gatewayid", "breed"],
    )?;

    Ok(table
        .rows
        .iter()
        .map(|row| DeviceRecord {
            deviceid: Table::cell(row, deviceid),
            farm_name: Table::cell(row, farm_name),
            housing_type: Table::cell(row, housing_type),
            gatewayid: Table::cell(row, gatewayid),
            breed: Table::cell(row, breed),
        })
        .collect())
}

pub fn parse_disconnections(table: &Table) -> Result<Vec<DisconnectionEvent>, LoadError> {
    let [deviceid, farm_name, entry_date, device_type, data_quality, tag_number] = table.indices(
        TableKind::Disconnections,
        ["deviceid", "farm_name", "entry_date", "Device_type", "data_quality", "tag_number"],
    )?;

    let events: Vec<DisconnectionEvent> = table
        .rows
        .iter()
        .map(|row| DisconnectionEvent {
            deviceid: Table::cell(row, deviceid),
            farm_name: Table::cell(row, farm_name),
            entry_date: parse_entry_date(&Table::cell(row, entry_date)),
            device_type: Table::cell(row, device_type),
            data_quality: Table::cell(row, data_quality),
            tag_number: Table::cell(row, tag_number),
        })
        .collect();

    let undated = events.iter().filter(|e| e.entry_date.is_none()).count();
    if undated > 0 {
        warn!("{} disconnection rows have an unparseable entry_date", undated);
    }

    Ok(events)
}
