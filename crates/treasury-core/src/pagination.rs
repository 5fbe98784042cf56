//! Page windows over the grid's row sequence

use serde::Serialize;

use crate::grid::{DataGridModel, GridRow};

/// Smallest accepted page size
pub const MIN_PAGE_SIZE: usize = 1;

/// One page of rows
#[derive(Debug, Clone)]
pub struct PageWindow<'a> {
    /// Zero-based page index actually shown
    pub index: usize,
    pub page_size: usize,
    pub page_count: usize,
    /// Rows in the whole sequence, group rows included
    pub total_rows: usize,
    /// Index of the first row on this page
    pub first_row: usize,
    pub rows: Vec<GridRow<'a>>,
}

impl PageWindow<'_> {
    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.page_count
    }

    /// Pager numbers for display (1-based)
    pub fn info(&self) -> PageInfo {
        PageInfo {
            page: if self.page_count == 0 { 0 } else { self.index + 1 },
            page_count: self.page_count,
            page_size: self.page_size,
            total_rows: self.total_rows,
            first_row: if self.rows.is_empty() { 0 } else { self.first_row + 1 },
            last_row: self.first_row + self.rows.len(),
        }
    }
}

/// Serializable pager summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub first_row: usize,
    pub last_row: usize,
}

/// Client-side pagination state
///
/// The page index is clamped to the last page when the row count shrinks
/// and reset to the first page whenever the grid's filter changes.
#[derive(Debug, Clone)]
pub struct PaginationView {
    page_index: usize,
    page_size: usize,
    filter_revision: u64,
}

impl PaginationView {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_index: 0,
            page_size: page_size.max(MIN_PAGE_SIZE),
            filter_revision: 0,
        }
    }

    /// Requested page index, before clamping
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// ceil(visible rows / page size)
    pub fn page_count(&self, grid: &DataGridModel) -> usize {
        Self::count_pages(grid.visible_row_count(), self.page_size)
    }

    fn count_pages(rows: usize, page_size: usize) -> usize {
        (rows + page_size - 1) / page_size
    }

    fn effective_index(&self, grid: &DataGridModel, page_count: usize) -> usize {
        if grid.filter_revision() != self.filter_revision {
            0
        } else {
            self.page_index.min(page_count.saturating_sub(1))
        }
    }

    /// Slice the current page out of the grid's row sequence
    pub fn window<'a>(&self, grid: &'a DataGridModel) -> PageWindow<'a> {
        let sequence = grid.row_sequence();
        let total_rows = sequence.len();
        let page_count = Self::count_pages(total_rows, self.page_size);
        let index = self.effective_index(grid, page_count);
        let first_row = (index * self.page_size).min(total_rows);
        let rows = sequence
            .into_iter()
            .skip(first_row)
            .take(self.page_size)
            .collect();
        PageWindow {
            index,
            page_size: self.page_size,
            page_count,
            total_rows,
            first_row,
            rows,
        }
    }

    /// Record a filter reset or shrinking row count in the stored index
    pub fn sync(&mut self, grid: &DataGridModel) {
        let page_count = self.page_count(grid);
        self.page_index = self.effective_index(grid, page_count);
        self.filter_revision = grid.filter_revision();
    }

    /// Go to a page; out-of-range indices are clamped. Returns the new index.
    pub fn set_page(&mut self, grid: &DataGridModel, index: usize) -> usize {
        self.sync(grid);
        let page_count = self.page_count(grid);
        self.page_index = index.min(page_count.saturating_sub(1));
        self.page_index
    }

    pub fn next_page(&mut self, grid: &DataGridModel) -> usize {
        self.sync(grid);
        self.set_page(grid, self.page_index + 1)
    }

    pub fn previous_page(&mut self, grid: &DataGridModel) -> usize {
        self.sync(grid);
        self.set_page(grid, self.page_index.saturating_sub(1))
    }

    /// Change the page size, keeping the first visible row on screen
    pub fn set_page_size(&mut self, grid: &DataGridModel, page_size: usize) {
        self.sync(grid);
        let first_row = self.page_index * self.page_size;
        self.page_size = page_size.max(MIN_PAGE_SIZE);
        self.page_index = first_row / self.page_size;
        self.sync(grid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnDescriptor, ColumnKind, GridFilter, Record};
    use crate::status::{PlannedTransition, TransitionTarget};
    use crate::types::RecordStatus;
    use serde_json::json;

    fn grid(rows: usize) -> DataGridModel {
        let mut grid = DataGridModel::new(vec![ColumnDescriptor::new("bank", "Bank", ColumnKind::Text)]);
        grid.replace_rows(
            (0..rows)
                .map(|i| {
                    let bank = if i % 2 == 0 { "HSBC" } else { "Citi" };
                    Record::new(format!("R{:03}", i), RecordStatus::PendingDeleteApproval)
                        .with_field("bank", json!(bank))
                })
                .collect(),
        );
        grid
    }

    #[test]
    fn test_page_count_is_ceiling() {
        let pagination = PaginationView::new(10);
        assert_eq!(pagination.page_count(&grid(0)), 0);
        assert_eq!(pagination.page_count(&grid(10)), 1);
        assert_eq!(pagination.page_count(&grid(23)), 3);
    }

    #[test]
    fn test_window_slices_rows() {
        let grid = grid(23);
        let mut pagination = PaginationView::new(10);
        pagination.set_page(&grid, 2);
        let window = pagination.window(&grid);
        assert_eq!(window.index, 2);
        assert_eq!(window.rows.len(), 3);
        assert_eq!(window.rows[0].record().map(|r| r.id.as_str()), Some("R020"));
        assert!(window.has_previous());
        assert!(!window.has_next());
        assert_eq!(window.info().first_row, 21);
        assert_eq!(window.info().last_row, 23);
    }

    #[test]
    fn test_empty_grid_window() {
        let grid = grid(0);
        let pagination = PaginationView::new(10);
        let window = pagination.window(&grid);
        assert_eq!(window.page_count, 0);
        assert!(window.rows.is_empty());
        assert_eq!(window.info().page, 0);
    }

    #[test]
    fn test_set_page_clamps() {
        let grid = grid(23);
        let mut pagination = PaginationView::new(10);
        assert_eq!(pagination.set_page(&grid, 99), 2);
        assert_eq!(pagination.next_page(&grid), 2);
        assert_eq!(pagination.previous_page(&grid), 1);
    }

    #[test]
    fn test_index_clamped_when_rows_shrink() {
        let mut grid = grid(21);
        let mut pagination = PaginationView::new(10);
        pagination.set_page(&grid, 2);

        // Approving the deletion of the only row on the last page removes it.
        grid.apply_transitions(&[PlannedTransition {
            id: "R020".to_string(),
            from: RecordStatus::PendingDeleteApproval,
            to: TransitionTarget::Removed,
            requires_reason: false,
        }]);
        let window = pagination.window(&grid);
        assert_eq!(window.page_count, 2);
        assert_eq!(window.index, 1);
        assert_eq!(window.rows.len(), 10);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut grid = grid(40);
        let mut pagination = PaginationView::new(5);
        pagination.set_page(&grid, 3);
        grid.set_filter(GridFilter::search("citi"));
        assert_eq!(pagination.window(&grid).index, 0);
        pagination.sync(&grid);
        assert_eq!(pagination.page_index(), 0);

        // Moving within the filtered rows is not undone by later renders.
        pagination.set_page(&grid, 2);
        assert_eq!(pagination.window(&grid).index, 2);
    }

    #[test]
    fn test_page_size_change_keeps_first_row() {
        let grid = grid(100);
        let mut pagination = PaginationView::new(10);
        pagination.set_page(&grid, 5);
        pagination.set_page_size(&grid, 25);
        assert_eq!(pagination.page_index(), 2);
        pagination.set_page_size(&grid, 0);
        assert_eq!(pagination.page_size(), MIN_PAGE_SIZE);
    }
}
