//! Core data models for the review grid

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::str::FromStr;

use treasury_config::ColumnConfig;

use super::types::{RecordStatus, SortDirection};
use crate::error::{CoreError, CoreResult};

/// Field name holding the record identifier
pub const ID_FIELD: &str = "id";
/// Field name holding the record status
pub const STATUS_FIELD: &str = "status";

/// Staged field -> value changes of one record
pub type FieldDiff = BTreeMap<String, Value>;

/// A domain row: business fields plus a workflow status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique record identifier
    pub id: String,
    /// Current workflow state
    pub status: RecordStatus,
    /// Arbitrary business fields (amount, bank, value date, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a record without business fields
    pub fn new(id: impl Into<String>, status: RecordStatus) -> Self {
        Self {
            id: id.into(),
            status,
            fields: Map::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Read a value by accessor name, including `id` and `status`
    pub fn value(&self, name: &str) -> Value {
        match name {
            ID_FIELD => Value::String(self.id.clone()),
            STATUS_FIELD => Value::String(self.status.to_string()),
            _ => self.fields.get(name).cloned().unwrap_or(Value::Null),
        }
    }

    /// Whether the field can be changed by a row edit
    pub fn is_editable_field(name: &str) -> bool {
        name != ID_FIELD && name != STATUS_FIELD
    }

    /// Merge a committed diff into the business fields
    pub(crate) fn merge(&mut self, diff: &FieldDiff) {
        for (name, value) in diff {
            self.fields.insert(name.clone(), value.clone());
        }
    }
}

/// Where a fixed column is locked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixedPosition {
    Start,
    End,
}

/// Closed set of column kinds; rendering and sorting dispatch on this tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    /// Row selection checkbox
    Select,
    /// Detail expansion toggle
    Expand,
    /// Plain text
    Text,
    /// One of a fixed set of values
    EnumSelect { options: Vec<String> },
    /// Calendar date (YYYY-MM-DD)
    Date,
    /// Monetary amount
    Currency { code: Option<String> },
    /// Workflow status badge
    Status,
    /// Per-row action buttons
    Action,
}

impl ColumnKind {
    /// Build from the configuration tag
    pub fn from_config(column: &ColumnConfig) -> CoreResult<Self> {
        match column.kind.as_str() {
            "select" => Ok(ColumnKind::Select),
            "expand" => Ok(ColumnKind::Expand),
            "text" => Ok(ColumnKind::Text),
            "enum" => Ok(ColumnKind::EnumSelect { options: column.options.clone() }),
            "date" => Ok(ColumnKind::Date),
            "currency" => Ok(ColumnKind::Currency { code: column.currency.clone() }),
            "status" => Ok(ColumnKind::Status),
            "action" => Ok(ColumnKind::Action),
            other => Err(CoreError::UnknownColumn { id: format!("{} ({})", column.id, other) }),
        }
    }

    /// Whether the kind reads a record value at all
    pub fn has_value(&self) -> bool {
        !matches!(self, ColumnKind::Select | ColumnKind::Expand | ColumnKind::Action)
    }

    /// Plain display text of a value
    pub fn display_text(&self, value: &Value) -> String {
        match self {
            ColumnKind::Select | ColumnKind::Expand | ColumnKind::Action => String::new(),
            ColumnKind::Text | ColumnKind::EnumSelect { .. } => value_text(value),
            ColumnKind::Date => match value_as_date(value) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => value_text(value),
            },
            ColumnKind::Currency { code } => match value_as_decimal(value) {
                Some(amount) => {
                    let amount = treasury_utils::group_thousands(&format!("{:.2}", amount), ',');
                    match code {
                        Some(code) => format!("{} {}", amount, code),
                        None => amount,
                    }
                }
                None => value_text(value),
            },
            ColumnKind::Status => match value.as_str().and_then(|s| RecordStatus::from_str(s).ok()) {
                Some(status) => status.label().to_string(),
                None => value_text(value),
            },
        }
    }

    /// Compare two values of this kind; nulls sort first
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        match self {
            ColumnKind::Currency { .. } => match (value_as_decimal(a), value_as_decimal(b)) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => compare_values(a, b),
            },
            ColumnKind::Date => match (value_as_date(a), value_as_date(b)) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => compare_values(a, b),
            },
            ColumnKind::Status => {
                let rank = |v: &Value| {
                    v.as_str()
                        .and_then(|s| RecordStatus::from_str(s).ok())
                        .map(|s| s as u8)
                };
                match (rank(a), rank(b)) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    _ => compare_values(a, b),
                }
            }
            _ => compare_values(a, b),
        }
    }
}

/// Text form of a JSON value without quotes
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Interpret a JSON number or numeric string as a decimal amount
pub fn value_as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok())),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Interpret a JSON string as a calendar date
pub fn value_as_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?;
    let date_part = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => value_text(a).to_lowercase().cmp(&value_text(b).to_lowercase()),
    }
}

/// A grid column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column identifier
    pub id: String,
    /// Record field the value is read from
    pub accessor: String,
    /// Header label
    pub header: String,
    /// Rendering and sorting tag
    #[serde(flatten)]
    pub kind: ColumnKind,
    pub visible: bool,
    pub sortable: bool,
    pub draggable: bool,
    /// False for permanently visible columns
    pub hideable: bool,
    pub editable: bool,
    /// Locked position for select/expand/action columns
    pub fixed: Option<FixedPosition>,
}

impl ColumnDescriptor {
    /// Text column reading the field of the same name
    pub fn new(id: impl Into<String>, header: impl Into<String>, kind: ColumnKind) -> Self {
        let id = id.into();
        Self {
            accessor: id.clone(),
            id,
            header: header.into(),
            kind,
            visible: true,
            sortable: true,
            draggable: true,
            hideable: true,
            editable: false,
            fixed: None,
        }
    }

    /// Fixed utility column: never draggable, never sortable, never hidden
    pub fn fixed(id: impl Into<String>, kind: ColumnKind, position: FixedPosition) -> Self {
        let mut column = Self::new(id, "", kind);
        column.sortable = false;
        column.draggable = false;
        column.hideable = false;
        column.fixed = Some(position);
        column
    }

    /// Builder: mark editable
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    /// Build from configuration
    pub fn from_config(column: &ColumnConfig) -> CoreResult<Self> {
        let kind = ColumnKind::from_config(column)?;
        let fixed = match column.fixed.as_deref() {
            Some("start") => Some(FixedPosition::Start),
            Some("end") => Some(FixedPosition::End),
            _ => None,
        };
        Ok(Self {
            id: column.id.clone(),
            accessor: column.field_name().to_string(),
            header: column.header.clone(),
            sortable: column.sortable && kind.has_value(),
            editable: column.editable && kind.has_value() && Record::is_editable_field(column.field_name()),
            kind,
            visible: column.visible || !column.hideable,
            draggable: column.draggable && fixed.is_none(),
            hideable: column.hideable,
            fixed,
        })
    }

    /// Whether the column keeps its index when others are reordered
    pub fn is_locked(&self) -> bool {
        self.fixed.is_some() || !self.draggable
    }

    /// Read this column's value from a record
    pub fn value(&self, record: &Record) -> Value {
        if self.kind.has_value() {
            record.value(&self.accessor)
        } else {
            Value::Null
        }
    }

    /// Display text of this column for a record
    pub fn display_text(&self, record: &Record) -> String {
        self.kind.display_text(&self.value(record))
    }
}

/// One key of a multi-key sort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), direction: SortDirection::Asc }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), direction: SortDirection::Desc }
    }
}

/// Row filter applied before sorting and grouping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridFilter {
    /// Case-insensitive text search over every value column
    #[serde(default)]
    pub search: Option<String>,
    /// Only rows in one of these states
    #[serde(default)]
    pub statuses: Option<BTreeSet<RecordStatus>>,
}

impl GridFilter {
    /// Search-only filter
    pub fn search(text: impl Into<String>) -> Self {
        Self { search: Some(text.into()), statuses: None }
    }

    /// Whether the filter lets every row through
    pub fn is_empty(&self) -> bool {
        self.search.as_deref().map_or(true, |s| s.trim().is_empty()) && self.statuses.is_none()
    }

    /// Test a record against the filter
    pub fn matches(&self, record: &Record, columns: &[ColumnDescriptor]) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&record.status) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                record.id.to_lowercase().contains(&needle)
                    || columns
                        .iter()
                        .filter(|c| c.kind.has_value())
                        .any(|c| c.display_text(record).to_lowercase().contains(&needle))
            }
        }
    }
}
