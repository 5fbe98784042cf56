//! Review view state - HTMX partials for layout, paging and selection
//!
//! Every handler changes the grid or pager and answers with the re-rendered
//! grid container. Layout changes (columns, sorting, grouping, page size)
//! are persisted through the workspace's preferences store.

use axum::extract::{Form, Path, State};
use axum::response::Html;
use std::collections::{BTreeSet, HashMap};

use treasury_core::{GridFilter, NotifyLevel, Notifier, RecordStatus};

use super::{form_list, form_value, grid_fragment, report, save_layout};
use crate::interaction::ToastNotifier;
use crate::{ApiError, AppState};

// ==================== Filter, sort, group ====================

/// Search text and status restriction; the pager returns to page one
pub async fn htmx_filter(
    state: State<AppState>,
    Path(tab): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let statuses = match form_value(&form, "status") {
        Some(text) => {
            let status: RecordStatus = text.parse().map_err(ApiError::bad_request)?;
            Some(BTreeSet::from([status]))
        }
        None => None,
    };
    let filter = GridFilter {
        search: form_value(&form, "search").map(str::to_string),
        statuses,
    };
    workspace.grid.write().await.set_filter(filter);

    let notifier = ToastNotifier::new();
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

/// Header click; `append=true` adds a secondary key
pub async fn htmx_sort(
    state: State<AppState>,
    Path(tab): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let column = form_value(&form, "column").ok_or_else(|| ApiError::bad_request("Missing column"))?;
    let append = form_value(&form, "append") == Some("true");
    {
        let mut grid = workspace.grid.write().await;
        if grid.column(column).is_none() {
            return Err(ApiError::NotFound { resource: format!("column '{}'", column) });
        }
        grid.toggle_sort(column, append);
    }

    let notifier = ToastNotifier::new();
    save_layout(&workspace, &notifier).await;
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

/// Comma separated grouping columns; empty removes grouping
pub async fn htmx_group(
    state: State<AppState>,
    Path(tab): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let notifier = ToastNotifier::new();
    let result = workspace.grid.write().await.set_grouping(form_list(&form, "columns"));
    match result {
        Ok(()) => save_layout(&workspace, &notifier).await,
        Err(e) => report(&notifier, &e),
    }
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

// ==================== Paging ====================

/// `page` is `next`, `prev` or a 1-based page number
pub async fn htmx_page(
    state: State<AppState>,
    Path(tab): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let page = form_value(&form, "page").ok_or_else(|| ApiError::bad_request("Missing page"))?;
    {
        let grid = workspace.grid.read().await;
        let mut pagination = workspace.pagination.lock().await;
        match page {
            "next" => {
                pagination.next_page(&grid);
            }
            "prev" => {
                pagination.previous_page(&grid);
            }
            number => {
                let number: usize = number
                    .parse()
                    .map_err(|_| ApiError::bad_request(format!("Invalid page: {}", number)))?;
                pagination.set_page(&grid, number.saturating_sub(1));
            }
        }
    }

    let notifier = ToastNotifier::new();
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

pub async fn htmx_page_size(
    state: State<AppState>,
    Path(tab): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let size: usize = form_value(&form, "size")
        .and_then(|s| s.parse().ok())
        .filter(|s| *s > 0)
        .ok_or_else(|| ApiError::bad_request("Page size must be a positive number"))?;
    {
        let grid = workspace.grid.read().await;
        workspace.pagination.lock().await.set_page_size(&grid, size);
    }

    let notifier = ToastNotifier::new();
    save_layout(&workspace, &notifier).await;
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

// ==================== Columns ====================

/// Full column order as a comma separated id list
pub async fn htmx_column_order(
    state: State<AppState>,
    Path(tab): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let order = form_list(&form, "order");
    let notifier = ToastNotifier::new();

    let (changed, unchanged) = {
        let mut grid = workspace.grid.write().await;
        let unchanged = grid.column_order() == order;
        (grid.set_column_order(&order), unchanged)
    };
    if changed {
        save_layout(&workspace, &notifier).await;
    } else if !unchanged {
        notifier.notify("Fixed columns cannot be moved", NotifyLevel::Warning);
    }
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

pub async fn htmx_column_visibility(
    state: State<AppState>,
    Path((tab, column)): Path<(String, String)>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let visible = form_value(&form, "visible") != Some("false");
    let notifier = ToastNotifier::new();

    let changed = {
        let mut grid = workspace.grid.write().await;
        let Some(descriptor) = grid.column(&column) else {
            return Err(ApiError::NotFound { resource: format!("column '{}'", column) });
        };
        if !descriptor.hideable && !visible {
            notifier.notify(&format!("Column '{}' is always visible", descriptor.header), NotifyLevel::Info);
        }
        grid.set_column_visibility(&column, visible)
    };
    if changed {
        save_layout(&workspace, &notifier).await;
    }
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

// ==================== Selection and expansion ====================

pub async fn htmx_select_row(
    state: State<AppState>,
    Path((tab, id)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    if !workspace.grid.write().await.toggle_row_selection(&id) {
        return Err(treasury_core::CoreError::RecordNotFound { id }.into());
    }
    let notifier = ToastNotifier::new();
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

/// Select every record row on the current page (group rows are skipped)
pub async fn htmx_select_page(state: State<AppState>, Path(tab): Path<String>) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    {
        let mut grid = workspace.grid.write().await;
        let mut pagination = workspace.pagination.lock().await;
        pagination.sync(&grid);
        grid.select_all_visible(&pagination);
    }
    let notifier = ToastNotifier::new();
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

pub async fn htmx_select_clear(state: State<AppState>, Path(tab): Path<String>) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    workspace.grid.write().await.clear_selection();
    let notifier = ToastNotifier::new();
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

pub async fn htmx_expand_row(
    state: State<AppState>,
    Path((tab, id)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    if !workspace.grid.write().await.toggle_row_expanded(&id) {
        return Err(treasury_core::CoreError::RecordNotFound { id }.into());
    }
    let notifier = ToastNotifier::new();
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

pub async fn htmx_collapse_group(
    state: State<AppState>,
    Path((tab, key)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    workspace.grid.write().await.toggle_group_collapsed(&key);
    let notifier = ToastNotifier::new();
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}
