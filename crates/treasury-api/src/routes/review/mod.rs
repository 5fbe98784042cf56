//! Review routes - grids, bulk actions and row editing per tab

pub mod api;
pub mod page;
pub mod view;
pub mod workflow;

pub use api::{api_review_preferences, api_review_rows};
pub use page::{htmx_review_grid, page_review};
pub use view::{
    htmx_collapse_group, htmx_column_order, htmx_column_visibility, htmx_expand_row, htmx_filter, htmx_group,
    htmx_page, htmx_page_size, htmx_select_clear, htmx_select_page, htmx_select_row, htmx_sort,
};
pub use workflow::{
    htmx_edit_cancel, htmx_edit_commit, htmx_edit_field, htmx_edit_start, htmx_prepare_action, htmx_refresh,
    htmx_run_action, htmx_unmount,
};

use std::collections::HashMap;

use treasury_core::{CoreError, NotifyLevel, Notifier, ReviewWorkspace};

use crate::interaction::ToastNotifier;
use crate::render::{render_grid, GridView};

/// Render the grid container with the collected notifications
///
/// Locks the grid before the pagination, like every other caller.
pub(crate) async fn grid_fragment(workspace: &ReviewWorkspace, notifier: &ToastNotifier, dialog: Option<String>) -> String {
    let grid = workspace.grid.read().await;
    let mut pagination = workspace.pagination.lock().await;
    pagination.sync(&grid);
    let draft = workspace.edit.draft();
    let view = GridView {
        tab: workspace.key(),
        grid: &grid,
        pagination: &pagination,
        draft: draft.as_ref(),
        table: workspace.bulk.table(),
        page_size_options: workspace.page_size_options(),
    };
    render_grid(&view, &notifier.take(), dialog.as_deref())
}

/// Surface an error through the notifier, if the user should see it
pub(crate) fn report(notifier: &ToastNotifier, err: &CoreError) {
    match err.notify_level() {
        Some(level) => notifier.notify(&err.user_message(), level),
        None => log::debug!(target: "treasury::http", "[{}] {}", notifier.request_id(), err),
    }
}

/// Persist the layout after a change; failures only warn
pub(crate) async fn save_layout(workspace: &ReviewWorkspace, notifier: &ToastNotifier) {
    if let Err(e) = workspace.save_preferences().await {
        log::warn!(target: "treasury::grid", "Could not save preferences for '{}': {}", workspace.key(), e);
        notifier.notify("Layout could not be saved", NotifyLevel::Warning);
    }
}

/// Trimmed, non-empty form value
pub(crate) fn form_value<'a>(form: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    form.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Comma separated form value as a list
pub(crate) fn form_list(form: &HashMap<String, String>, name: &str) -> Vec<String> {
    form_value(form, name)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
