//! Review page rendering - Full page endpoints

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Html;

use treasury_utils::escape_html;

use super::{grid_fragment, report};
use crate::interaction::ToastNotifier;
use crate::render::tab_url;
use crate::{ApiError, AppState};

/// Review page - header, summary and grid; mounts the tab on first visit
pub async fn page_review(
    state: State<AppState>,
    headers: HeaderMap,
    Path(tab): Path<String>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let notifier = ToastNotifier::new();
    if let Err(e) = state.workspaces.ensure_mounted(&workspace).await {
        report(&notifier, &e);
    }

    let summary = workspace.grid.read().await.summary();
    let mut counts = String::new();
    for (status, count) in &summary.by_status {
        let label = status
            .parse::<treasury_core::RecordStatus>()
            .map(|s| s.label().to_string())
            .unwrap_or_else(|_| status.clone());
        counts.push_str(&format!(
            "<div class='bg-white p-3 rounded-lg border'><p class='text-xs text-gray-500'>{}</p><p class='text-xl font-bold'>{}</p></div>",
            escape_html(&label),
            count
        ));
    }

    let inner_content = format!(
        r#"<div class='flex items-center justify-between mb-4'>
            <h2 class='text-2xl font-bold'>{}</h2>
            <span class='text-sm text-gray-500'>{} record(s)</span>
        </div>
        <div class='grid grid-cols-2 md:grid-cols-5 gap-3 mb-4'>{}</div>
        {}"#,
        escape_html(workspace.title()),
        summary.total_records,
        counts,
        grid_fragment(&workspace, &notifier, None).await
    );

    let tabs = state.nav_links().await;
    Ok(Html(crate::page_response(
        &headers,
        &tabs,
        workspace.title(),
        &tab_url(workspace.key()),
        &inner_content,
    )))
}

/// Grid fragment only
pub async fn htmx_review_grid(state: State<AppState>, Path(tab): Path<String>) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let notifier = ToastNotifier::new();
    if let Err(e) = state.workspaces.ensure_mounted(&workspace).await {
        report(&notifier, &e);
    }
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}
