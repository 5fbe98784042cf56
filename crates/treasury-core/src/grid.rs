//! Review grid model
//!
//! Owns the loaded records together with column layout, sorting, filter,
//! selection, expansion and grouping state. Record fields only change
//! through [`DataGridModel::apply_transitions`] (bulk actions) and
//! [`DataGridModel::merge_fields`] (row edit commits), both crate-private.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use treasury_config::WorkspaceConfig;

use crate::error::{CoreError, CoreResult};
use crate::models::{ColumnDescriptor, FieldDiff, GridFilter, Record, SortKey};
use crate::pagination::PaginationView;
use crate::preferences::GridPreferences;
use crate::status::{PlannedTransition, TransitionTarget};
use crate::types::SortDirection;

/// Identifies one mount of the grid; responses carrying an old token are dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountToken(u64);

/// Synthetic row heading a group of records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    /// Path of column=value pairs from the outermost group
    pub key: String,
    pub column: String,
    pub value: Value,
    pub label: String,
    pub depth: usize,
    /// Records in the group, across all nested levels
    pub count: usize,
    pub collapsed: bool,
}

/// One entry of the row sequence
#[derive(Debug, Clone, PartialEq)]
pub enum GridRow<'a> {
    Group(GroupRow),
    Record { record: &'a Record, depth: usize },
}

impl<'a> GridRow<'a> {
    /// The record behind the row; group rows have none
    pub fn record(&self) -> Option<&'a Record> {
        match self {
            GridRow::Record { record, .. } => Some(record),
            GridRow::Group(_) => None,
        }
    }
}

/// Counts for the grid header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSummary {
    pub total_records: usize,
    pub visible_records: usize,
    pub selected: usize,
    pub by_status: BTreeMap<String, usize>,
}

/// The review grid
#[derive(Debug, Clone)]
pub struct DataGridModel {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Record>,
    // id -> position in the last load; the unsorted order
    load_order: HashMap<String, usize>,
    sorting: Vec<SortKey>,
    filter: GridFilter,
    filter_revision: u64,
    grouping: Vec<String>,
    selection: BTreeSet<String>,
    expanded: BTreeSet<String>,
    collapsed_groups: BTreeSet<String>,
    mount_epoch: u64,
    mounted: bool,
}

impl DataGridModel {
    /// Create an empty, mounted grid
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            load_order: HashMap::new(),
            sorting: Vec::new(),
            filter: GridFilter::default(),
            filter_revision: 0,
            grouping: Vec::new(),
            selection: BTreeSet::new(),
            expanded: BTreeSet::new(),
            collapsed_groups: BTreeSet::new(),
            mount_epoch: 0,
            mounted: true,
        }
    }

    /// Create a grid from a workspace definition
    pub fn from_config(workspace: &WorkspaceConfig) -> CoreResult<Self> {
        let columns = workspace
            .columns
            .iter()
            .map(ColumnDescriptor::from_config)
            .collect::<CoreResult<Vec<_>>>()?;
        let mut grid = Self::new(columns);
        grid.set_grouping(workspace.group_by.clone())?;
        Ok(grid)
    }

    // ==================== Columns ====================

    /// All columns in display order, hidden ones included
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Look up a column
    pub fn column(&self, id: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Column ids in display order
    pub fn column_order(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.id.clone()).collect()
    }

    /// Visible columns in display order
    pub fn get_visible_columns(&self) -> Vec<&ColumnDescriptor> {
        self.columns.iter().filter(|c| c.visible).collect()
    }

    /// Reorder columns
    ///
    /// No-op (returns false) unless `new_order` is a permutation of the
    /// current ids in which every locked column keeps its index and no
    /// other column crosses a locked column's position.
    pub fn set_column_order(&mut self, new_order: &[String]) -> bool {
        if new_order.len() != self.columns.len() {
            return false;
        }
        let mut positions = HashMap::new();
        for (index, id) in new_order.iter().enumerate() {
            if self.column(id).is_none() || positions.insert(id.as_str(), index).is_some() {
                return false;
            }
        }

        let current = self.column_order();
        if current.as_slice() == new_order {
            return false;
        }

        for (index, column) in self.columns.iter().enumerate() {
            if column.is_locked() && positions.get(column.id.as_str()) != Some(&index) {
                log::debug!(target: "treasury::grid", "Column '{}' is locked at position {}", column.id, index);
                return false;
            }
        }

        let segment = |order: &[String], index: usize| -> usize {
            order[..index]
                .iter()
                .filter(|id| self.column(id).map_or(false, |c| c.is_locked()))
                .count()
        };
        for (index, id) in current.iter().enumerate() {
            let new_index = positions[id.as_str()];
            if segment(&current, index) != segment(new_order, new_index) {
                log::debug!(target: "treasury::grid", "Column '{}' may not cross a locked column", id);
                return false;
            }
        }

        let mut reordered = Vec::with_capacity(self.columns.len());
        for id in new_order {
            if let Some(pos) = self.columns.iter().position(|c| &c.id == id) {
                reordered.push(self.columns[pos].clone());
            }
        }
        self.columns = reordered;
        true
    }

    /// Move one column to `to_index`, subject to the same rules as [`Self::set_column_order`]
    pub fn move_column(&mut self, id: &str, to_index: usize) -> bool {
        let mut order = self.column_order();
        let Some(from) = order.iter().position(|c| c == id) else {
            return false;
        };
        if to_index >= order.len() {
            return false;
        }
        let moved = order.remove(from);
        order.insert(to_index, moved);
        self.set_column_order(&order)
    }

    /// Show or hide a column; permanently visible columns are left alone
    pub fn set_column_visibility(&mut self, id: &str, visible: bool) -> bool {
        match self.columns.iter_mut().find(|c| c.id == id) {
            Some(column) if column.hideable && column.visible != visible => {
                column.visible = visible;
                true
            }
            _ => false,
        }
    }

    // ==================== Sorting ====================

    /// Current sort keys, primary first
    pub fn sorting(&self) -> &[SortKey] {
        &self.sorting
    }

    /// Apply a multi-key sort to the rows
    ///
    /// Keys naming unknown or unsortable columns are dropped. The sort is
    /// stable: rows that tie on every key keep their previous relative order.
    pub fn set_sorting(&mut self, spec: Vec<SortKey>) {
        let mut seen = BTreeSet::new();
        self.sorting = spec
            .into_iter()
            .filter(|key| self.column(&key.column).map_or(false, |c| c.sortable))
            .filter(|key| seen.insert(key.column.clone()))
            .collect();
        self.apply_sort();
    }

    /// Header click: cycle a column through ascending, descending and unsorted
    ///
    /// Unsorted means the order the rows were loaded in.
    ///
    /// With `append` the column is added as a secondary key instead of
    /// replacing the current spec.
    pub fn toggle_sort(&mut self, column: &str, append: bool) {
        let current = self.sorting.iter().find(|k| k.column == column).map(|k| k.direction);
        let mut spec: Vec<SortKey> = if append {
            self.sorting.iter().filter(|k| k.column != column).cloned().collect()
        } else {
            Vec::new()
        };
        let next = match current {
            None => Some(SortDirection::Asc),
            Some(SortDirection::Asc) => Some(SortDirection::Desc),
            Some(SortDirection::Desc) => None,
        };
        if let Some(direction) = next {
            let key = SortKey { column: column.to_string(), direction };
            match self.sorting.iter().position(|k| k.column == column) {
                Some(pos) if append => spec.insert(pos.min(spec.len()), key),
                _ => spec.push(key),
            }
        }
        self.set_sorting(spec);
    }

    fn apply_sort(&mut self) {
        if self.sorting.is_empty() {
            let load_order = &self.load_order;
            self.rows
                .sort_by_key(|r| load_order.get(&r.id).copied().unwrap_or(usize::MAX));
            return;
        }
        let keys: Vec<(ColumnDescriptor, SortDirection)> = self
            .sorting
            .iter()
            .filter_map(|k| self.column(&k.column).map(|c| (c.clone(), k.direction)))
            .collect();

        self.rows.sort_by(|a, b| {
            for (column, direction) in &keys {
                let ordering = column.kind.compare(&column.value(a), &column.value(b));
                let ordering = match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    // ==================== Filter ====================

    /// Current filter
    pub fn filter(&self) -> &GridFilter {
        &self.filter
    }

    /// Bumped on every filter change; pagination resets when it moves
    pub fn filter_revision(&self) -> u64 {
        self.filter_revision
    }

    /// Replace the filter
    pub fn set_filter(&mut self, filter: GridFilter) {
        if filter != self.filter {
            self.filter = filter;
            self.filter_revision += 1;
        }
    }

    // ==================== Grouping ====================

    /// Grouping columns, outermost first
    pub fn grouping(&self) -> &[String] {
        &self.grouping
    }

    /// Group rows by one or more columns; an empty list removes grouping
    pub fn set_grouping(&mut self, columns: Vec<String>) -> CoreResult<()> {
        for id in &columns {
            match self.column(id) {
                Some(column) if column.kind.has_value() => {}
                _ => return Err(CoreError::UnknownColumn { id: id.clone() }),
            }
        }
        self.grouping = columns;
        self.collapsed_groups.clear();
        Ok(())
    }

    /// Collapse or expand a group
    pub fn toggle_group_collapsed(&mut self, key: &str) {
        if !self.collapsed_groups.remove(key) {
            self.collapsed_groups.insert(key.to_string());
        }
    }

    // ==================== Rows ====================

    /// Replace the loaded records wholesale (initial load or refetch)
    ///
    /// The current sort is re-applied and selection/expansion state is
    /// pruned to ids that are still loaded.
    pub fn replace_rows(&mut self, rows: Vec<Record>) {
        self.load_order = rows.iter().enumerate().map(|(i, r)| (r.id.clone(), i)).collect();
        self.rows = rows;
        self.apply_sort();
        let loaded: BTreeSet<&str> = self.rows.iter().map(|r| r.id.as_str()).collect();
        self.selection.retain(|id| loaded.contains(id.as_str()));
        self.expanded.retain(|id| loaded.contains(id.as_str()));
        log::debug!(target: "treasury::grid", "Loaded {} records", self.rows.len());
    }

    /// All loaded records in sort order, ignoring the filter
    pub fn records(&self) -> &[Record] {
        &self.rows
    }

    /// Look up a loaded record
    pub fn record(&self, id: &str) -> Option<&Record> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Whether a record is loaded
    pub fn is_loaded(&self, id: &str) -> bool {
        self.record(id).is_some()
    }

    /// Records passing the filter, in sort order
    pub fn filtered_records(&self) -> Vec<&Record> {
        if self.filter.is_empty() {
            return self.rows.iter().collect();
        }
        self.rows
            .iter()
            .filter(|r| self.filter.matches(r, &self.columns))
            .collect()
    }

    /// The filtered, sorted and grouped row sequence pagination slices
    pub fn row_sequence(&self) -> Vec<GridRow<'_>> {
        let records = self.filtered_records();
        if self.grouping.is_empty() {
            return records
                .into_iter()
                .map(|record| GridRow::Record { record, depth: 0 })
                .collect();
        }
        let mut rows = Vec::new();
        self.push_groups(&records, 0, "", &mut rows);
        rows
    }

    fn push_groups<'a>(&self, records: &[&'a Record], level: usize, prefix: &str, out: &mut Vec<GridRow<'a>>) {
        let Some(column) = self.grouping.get(level).and_then(|id| self.column(id)) else {
            out.extend(records.iter().map(|&record| GridRow::Record { record, depth: level }));
            return;
        };

        // Buckets in first-appearance order so the sort order carries over.
        let mut order: Vec<(String, Value)> = Vec::new();
        let mut buckets: HashMap<String, Vec<&'a Record>> = HashMap::new();
        for &record in records {
            let label = column.display_text(record);
            if !buckets.contains_key(&label) {
                order.push((label.clone(), column.value(record)));
            }
            buckets.entry(label).or_default().push(record);
        }

        for (label, value) in order {
            let members = buckets.remove(&label).unwrap_or_default();
            let key = format!("{}{}={}", prefix, column.id, label);
            let collapsed = self.collapsed_groups.contains(&key);
            out.push(GridRow::Group(GroupRow {
                key: key.clone(),
                column: column.id.clone(),
                value,
                label,
                depth: level,
                count: members.len(),
                collapsed,
            }));
            if !collapsed {
                self.push_groups(&members, level + 1, &format!("{}|", key), out);
            }
        }
    }

    /// Number of rows in the row sequence, group rows included
    pub fn visible_row_count(&self) -> usize {
        self.row_sequence().len()
    }

    // ==================== Selection ====================

    /// Select or deselect a record; ids that are not loaded are ignored
    pub fn toggle_row_selection(&mut self, id: &str) -> bool {
        if !self.is_loaded(id) {
            return false;
        }
        if !self.selection.remove(id) {
            self.selection.insert(id.to_string());
        }
        true
    }

    /// Select every record row on the current page
    pub fn select_all_visible(&mut self, pagination: &PaginationView) -> usize {
        let ids: Vec<String> = pagination
            .window(self)
            .rows
            .iter()
            .filter_map(|row| row.record().map(|r| r.id.clone()))
            .collect();
        let count = ids.len();
        self.selection.extend(ids);
        count
    }

    /// Whether every record row on the current page is selected
    pub fn is_page_selected(&self, pagination: &PaginationView) -> bool {
        let window = pagination.window(self);
        let mut ids = window.rows.iter().filter_map(|row| row.record()).peekable();
        ids.peek().is_some() && ids.all(|r| self.selection.contains(&r.id))
    }

    /// Clear the selection
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected ids in row order
    pub fn get_selected_ids(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|r| self.selection.contains(&r.id))
            .map(|r| r.id.clone())
            .collect()
    }

    /// Whether a record is selected
    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    // ==================== Expansion ====================

    /// Open or close a record's detail panel
    pub fn toggle_row_expanded(&mut self, id: &str) -> bool {
        if !self.is_loaded(id) {
            return false;
        }
        if !self.expanded.remove(id) {
            self.expanded.insert(id.to_string());
        }
        true
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    // ==================== Liveness ====================

    /// Token for the current mount
    pub fn mount_token(&self) -> MountToken {
        MountToken(self.mount_epoch)
    }

    /// Whether a token still refers to the live view
    pub fn is_current(&self, token: MountToken) -> bool {
        self.mounted && token.0 == self.mount_epoch
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Tear the view down; in-flight responses will be discarded
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.mount_epoch += 1;
        self.selection.clear();
        self.expanded.clear();
    }

    /// Mount again after [`Self::unmount`]
    pub fn remount(&mut self) {
        if !self.mounted {
            self.mounted = true;
            self.mount_epoch += 1;
        }
    }

    // ==================== Sanctioned mutations ====================

    /// Apply successful bulk transitions; returns how many records changed
    pub(crate) fn apply_transitions(&mut self, planned: &[PlannedTransition]) -> usize {
        let mut applied = 0;
        for transition in planned {
            self.selection.remove(&transition.id);
            match transition.to {
                TransitionTarget::Removed => {
                    let before = self.rows.len();
                    self.rows.retain(|r| r.id != transition.id);
                    self.expanded.remove(&transition.id);
                    if self.rows.len() != before {
                        applied += 1;
                    }
                }
                TransitionTarget::Status(status) => {
                    if let Some(record) = self.rows.iter_mut().find(|r| r.id == transition.id) {
                        record.status = status;
                        applied += 1;
                    }
                }
            }
        }
        applied
    }

    /// Merge a committed edit into a record
    pub(crate) fn merge_fields(&mut self, id: &str, diff: &FieldDiff) -> CoreResult<()> {
        let record = self
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::RecordNotFound { id: id.to_string() })?;
        record.merge(diff);
        Ok(())
    }

    // ==================== Preferences ====================

    /// Snapshot of the user-adjustable layout
    pub fn preferences(&self) -> GridPreferences {
        GridPreferences {
            column_order: self.column_order(),
            hidden_columns: self
                .columns
                .iter()
                .filter(|c| !c.visible)
                .map(|c| c.id.clone())
                .collect(),
            sorting: self.sorting.clone(),
            grouping: self.grouping.clone(),
            page_size: None,
        }
    }

    /// Apply a saved layout; entries that no longer fit the columns are skipped
    pub fn apply_preferences(&mut self, preferences: &GridPreferences) {
        if !preferences.column_order.is_empty() {
            let mut order: Vec<String> = preferences
                .column_order
                .iter()
                .filter(|id| self.column(id).is_some())
                .cloned()
                .collect();
            for id in self.column_order() {
                if !order.contains(&id) {
                    order.push(id);
                }
            }
            self.set_column_order(&order);
        }

        let ids = self.column_order();
        for id in ids {
            let visible = !preferences.hidden_columns.contains(&id);
            self.set_column_visibility(&id, visible);
        }

        self.set_sorting(preferences.sorting.clone());

        if self.set_grouping(preferences.grouping.clone()).is_err() {
            log::warn!(target: "treasury::grid", "Ignoring saved grouping {:?}", preferences.grouping);
        }
    }

    /// Counts for the grid header
    pub fn summary(&self) -> GridSummary {
        let mut by_status = BTreeMap::new();
        for record in &self.rows {
            *by_status.entry(record.status.to_string()).or_insert(0) += 1;
        }
        GridSummary {
            total_records: self.rows.len(),
            visible_records: self.filtered_records().len(),
            selected: self.selection.len(),
            by_status,
        }
    }
}
