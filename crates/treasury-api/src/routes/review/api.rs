//! Review API endpoints - JSON API

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use treasury_core::{GridPreferences, GridRow};

use crate::{ApiError, AppState};

/// Current page of a review tab
///
/// Group rows and record rows are returned in display order together with
/// pager numbers, the selection and the id of the record being edited.
pub async fn api_review_rows(state: State<AppState>, Path(tab): Path<String>) -> Result<Json<Value>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    if let Err(e) = state.workspaces.ensure_mounted(&workspace).await {
        log::warn!(target: "treasury::http", "Initial load of '{}' failed: {}", tab, e);
    }

    let grid = workspace.grid.read().await;
    let mut pagination = workspace.pagination.lock().await;
    pagination.sync(&grid);
    let window = pagination.window(&grid);

    let rows: Vec<Value> = window
        .rows
        .iter()
        .map(|row| match row {
            GridRow::Group(group) => json!({ "type": "group", "group": group }),
            GridRow::Record { record, depth } => json!({ "type": "record", "depth": depth, "record": record }),
        })
        .collect();

    Ok(Json(json!({
        "tab": workspace.key(),
        "page": window.info(),
        "rows": rows,
        "selected": grid.get_selected_ids(),
        "editing": workspace.edit.active_id(),
        "summary": grid.summary(),
    })))
}

/// Saved-layout view of a tab
pub async fn api_review_preferences(
    state: State<AppState>,
    Path(tab): Path<String>,
) -> Result<Json<GridPreferences>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    Ok(Json(workspace.preferences().await))
}
