//! Review workflow - bulk actions, row editing, refresh and teardown

use axum::extract::{Form, Path, State};
use axum::response::Html;
use std::collections::HashMap;
use std::str::FromStr;

use treasury_core::{BulkOutcome, CommitOutcome, CoreError, NotifyLevel, Notifier, ReviewAction, ReviewWorkspace};

use super::{form_value, grid_fragment, report};
use crate::interaction::{FormConfirmer, ToastNotifier};
use crate::render::{render_confirm_dialog, tab_url, FIELD_PREFIX, GRID_ID};
use crate::{ApiError, AppState};

fn parse_action(action: &str) -> Result<ReviewAction, ApiError> {
    ReviewAction::from_str(action).map_err(|e| ApiError::NotFound { resource: e })
}

fn action_url(workspace: &ReviewWorkspace, action: ReviewAction) -> String {
    format!("{}/actions/{}", tab_url(workspace.key()), action.slug())
}

// ==================== Loading ====================

/// Refetch rows from the authority, replacing them wholesale
pub async fn htmx_refresh(state: State<AppState>, Path(tab): Path<String>) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let notifier = ToastNotifier::new();
    let result = match state.workspaces.ensure_mounted(&workspace).await {
        Ok(true) => Ok(()),
        Ok(false) => workspace.refresh().await.map(|_| ()),
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        report(&notifier, &e);
    }
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

/// Tear the view down; late responses for it are discarded
pub async fn htmx_unmount(state: State<AppState>, Path(tab): Path<String>) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    state.workspaces.unmount(&workspace).await;
    Ok(Html(format!(
        "<div id='{}' class='bg-white rounded-xl shadow-sm p-6 text-gray-500'>View closed. <a href='{}' class='text-indigo-600 hover:underline'>Reopen</a></div>",
        GRID_ID,
        tab_url(workspace.key())
    )))
}

// ==================== Bulk actions ====================

/// Target and guard steps only: answers with the confirmation dialog or a warning
pub async fn htmx_prepare_action(
    state: State<AppState>,
    Path((tab, action)): Path<(String, String)>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let action = parse_action(&action)?;
    let row = form_value(&form, "row");
    let notifier = ToastNotifier::new();

    let prepared = {
        let grid = workspace.grid.read().await;
        if workspace.bulk.targets_for(&grid, row).is_empty() {
            Err(CoreError::NoTargets { action })
        } else {
            workspace.bulk.prepare(&grid, action, row)
        }
    };

    let dialog = match prepared {
        Ok(plan) => {
            let hidden: Vec<(&str, &str)> = row.map(|id| vec![("row", id)]).unwrap_or_default();
            Some(render_confirm_dialog(&plan.prompt(), &action_url(&workspace, action), &hidden))
        }
        Err(e) => {
            log::warn!(target: "treasury::bulk", "[{}] {} blocked: {}", notifier.request_id(), action, e);
            report(&notifier, &e);
            None
        }
    };
    Ok(Html(grid_fragment(&workspace, &notifier, dialog).await))
}

/// Guard, confirm and execute; the form carries `confirmed`, `reason` and `row`
pub async fn htmx_run_action(
    state: State<AppState>,
    Path((tab, action)): Path<(String, String)>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let action = parse_action(&action)?;
    let row = form_value(&form, "row");
    let confirmer = FormConfirmer::from_form(&form);
    let notifier = ToastNotifier::new();

    let outcome = workspace
        .bulk
        .run(&workspace.grid, action, row, &confirmer, &notifier)
        .await;

    let dialog = match outcome {
        Ok(BulkOutcome::Declined) => confirmer.pending_prompt().map(|prompt| {
            let hidden: Vec<(&str, &str)> = row.map(|id| vec![("row", id)]).unwrap_or_default();
            render_confirm_dialog(&prompt, &action_url(&workspace, action), &hidden)
        }),
        Ok(BulkOutcome::Applied { .. }) | Err(_) => None,
    };
    Ok(Html(grid_fragment(&workspace, &notifier, dialog).await))
}

// ==================== Row editing ====================

/// Stage every `field:<name>` entry of the form into the active draft
fn stage_fields(workspace: &ReviewWorkspace, id: &str, form: &HashMap<String, String>) -> Result<usize, CoreError> {
    let fields: Vec<(&str, &str)> = form
        .iter()
        .filter_map(|(key, value)| key.strip_prefix(FIELD_PREFIX).map(|name| (name, value.as_str())))
        .collect();
    if fields.is_empty() {
        return Ok(0);
    }
    if workspace.edit.active_id().as_deref() != Some(id) {
        return Err(CoreError::NoActiveEdit);
    }
    for (name, value) in &fields {
        workspace.edit.set_field_text(name, value)?;
    }
    Ok(fields.len())
}

pub async fn htmx_edit_start(
    state: State<AppState>,
    Path((tab, id)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let notifier = ToastNotifier::new();
    let started = {
        let grid = workspace.grid.read().await;
        workspace.edit.start(&grid, &id)
    };
    if let Err(e) = started {
        report(&notifier, &e);
    }
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

pub async fn htmx_edit_field(
    state: State<AppState>,
    Path((tab, id)): Path<(String, String)>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let notifier = ToastNotifier::new();
    if let Err(e) = stage_fields(&workspace, &id, &form) {
        report(&notifier, &e);
    }
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}

/// Stage posted fields, then run the commit; asks for a reason first
pub async fn htmx_edit_commit(
    state: State<AppState>,
    Path((tab, id)): Path<(String, String)>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let notifier = ToastNotifier::new();

    if let Err(e) = stage_fields(&workspace, &id, &form) {
        report(&notifier, &e);
        return Ok(Html(grid_fragment(&workspace, &notifier, None).await));
    }
    if workspace.edit.active_id().as_deref() != Some(id.as_str()) {
        report(&notifier, &CoreError::NoActiveEdit);
        return Ok(Html(grid_fragment(&workspace, &notifier, None).await));
    }

    let confirmer = FormConfirmer::from_form(&form);
    let outcome = workspace.edit.commit(&workspace.grid, &confirmer, &notifier).await;

    let dialog = match outcome {
        Ok(CommitOutcome::Declined) => confirmer.pending_prompt().map(|prompt| {
            let url = format!("{}/rows/{}/commit", tab_url(workspace.key()), urlencoding::encode(&id));
            render_confirm_dialog(&prompt, &url, &[])
        }),
        Ok(CommitOutcome::NoChanges) | Ok(CommitOutcome::Committed { .. }) => None,
        Err(e @ (CoreError::EditSessionActive { .. } | CoreError::NoActiveEdit)) => {
            report(&notifier, &e);
            None
        }
        // reported by the session
        Err(_) => None,
    };
    Ok(Html(grid_fragment(&workspace, &notifier, dialog).await))
}

pub async fn htmx_edit_cancel(
    state: State<AppState>,
    Path((tab, id)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let workspace = state.workspace(&tab).await?;
    let notifier = ToastNotifier::new();
    if workspace.edit.active_id().as_deref() == Some(id.as_str()) && !workspace.edit.cancel() {
        notifier.notify("Changes are being saved and can no longer be cancelled", NotifyLevel::Info);
    }
    Ok(Html(grid_fragment(&workspace, &notifier, None).await))
}
