//! HTTP review console with HTMX support
//!
//! Routes are organized into modules:
//! - routes::review: review grids, bulk actions and row editing per tab
//!
//! Supporting modules:
//! - client: JSON client for the remote workflow authority
//! - interaction: web confirmation and notification collaborators
//! - registry: configured workspaces and their mount state
//! - render: HTML fragments per column kind

pub mod client;
pub mod error;
pub mod interaction;
pub mod registry;
pub mod render;
pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;

use treasury_config::{Config, ServerConfig};
use treasury_core::{PermissionService, ReviewWorkspace};
use treasury_utils::escape_html;

pub use client::HttpWorkflowEndpoint;
pub use error::ApiError;
pub use registry::WorkspaceRegistry;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub workspaces: Arc<WorkspaceRegistry>,
    pub permissions: Arc<dyn PermissionService>,
}

impl AppState {
    pub fn new(config: Config, workspaces: WorkspaceRegistry, permissions: Arc<dyn PermissionService>) -> Self {
        Self {
            config: Arc::new(config),
            workspaces: Arc::new(workspaces),
            permissions,
        }
    }

    /// Workspaces the permission service lets the user see
    ///
    /// Tabs missing from the visibility map are visible; if the permission
    /// service fails, nothing is.
    pub async fn visible_workspaces(&self) -> Vec<Arc<ReviewWorkspace>> {
        let visibility = match self.permissions.tab_visibility().await {
            Ok(visibility) => visibility,
            Err(e) => {
                log::error!(target: "treasury::http", "Permission lookup failed: {}", e);
                return Vec::new();
            }
        };
        self.workspaces
            .iter()
            .filter(|w| visibility.get(w.key()).copied().unwrap_or(true))
            .cloned()
            .collect()
    }

    /// Look a tab up, enforcing permissions
    pub async fn workspace(&self, tab: &str) -> Result<Arc<ReviewWorkspace>, ApiError> {
        let workspace = self
            .workspaces
            .get(tab)
            .ok_or_else(|| ApiError::NotFound { resource: format!("review tab '{}'", tab) })?;
        let visibility = self.permissions.tab_visibility().await?;
        if !visibility.get(tab).copied().unwrap_or(true) {
            return Err(ApiError::Forbidden { tab: tab.to_string() });
        }
        Ok(workspace)
    }

    /// (key, title) pairs for the navigation sidebar
    pub async fn nav_links(&self) -> Vec<(String, String)> {
        self.visible_workspaces()
            .await
            .iter()
            .map(|w| (w.key().to_string(), w.title().to_string()))
            .collect()
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::review::{
        api_review_preferences, api_review_rows, htmx_collapse_group, htmx_column_order, htmx_column_visibility,
        htmx_edit_cancel, htmx_edit_commit, htmx_edit_field, htmx_edit_start, htmx_expand_row, htmx_filter,
        htmx_group, htmx_page, htmx_page_size, htmx_prepare_action, htmx_refresh, htmx_review_grid, htmx_run_action,
        htmx_select_clear, htmx_select_page, htmx_select_row, htmx_sort, htmx_unmount, page_review,
    };

    Router::new()
        // API endpoints
        .route("/api/health", get(health_check))
        .route("/api/tabs", get(api_tabs))
        .route("/api/review/:tab/rows", get(api_review_rows))
        .route("/api/review/:tab/preferences", get(api_review_preferences))
        // HTMX page routes
        .route("/", get(index_page))
        .route("/review/:tab", get(page_review))
        // HTMX partial routes (grid fragment)
        .route("/review/:tab/grid", get(htmx_review_grid))
        .route("/review/:tab/refresh", post(htmx_refresh))
        .route("/review/:tab/unmount", post(htmx_unmount))
        .route("/review/:tab/filter", post(htmx_filter))
        .route("/review/:tab/sort", post(htmx_sort))
        .route("/review/:tab/group", post(htmx_group))
        .route("/review/:tab/page", post(htmx_page))
        .route("/review/:tab/page-size", post(htmx_page_size))
        .route("/review/:tab/columns/order", post(htmx_column_order))
        .route("/review/:tab/columns/:column/visibility", post(htmx_column_visibility))
        .route("/review/:tab/select/:id", post(htmx_select_row))
        .route("/review/:tab/select-page", post(htmx_select_page))
        .route("/review/:tab/select-clear", post(htmx_select_clear))
        .route("/review/:tab/rows/:id/expand", post(htmx_expand_row))
        .route("/review/:tab/groups/:key/collapse", post(htmx_collapse_group))
        // Bulk review actions
        .route("/review/:tab/actions/:action/prepare", post(htmx_prepare_action))
        .route("/review/:tab/actions/:action", post(htmx_run_action))
        // Row editing
        .route("/review/:tab/rows/:id/edit", post(htmx_edit_start))
        .route("/review/:tab/rows/:id/field", post(htmx_edit_field))
        .route("/review/:tab/rows/:id/commit", post(htmx_edit_commit))
        .route("/review/:tab/rows/:id/cancel", post(htmx_edit_cancel))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Visible tabs (JSON API)
async fn api_tabs(state: axum::extract::State<AppState>) -> axum::Json<serde_json::Value> {
    let mut tabs = Vec::new();
    for workspace in state.visible_workspaces().await {
        tabs.push(serde_json::json!({
            "key": workspace.key(),
            "title": workspace.title(),
            "resource": workspace.resource(),
            "mounted": state.workspaces.is_mounted(workspace.key()).await,
        }));
    }
    axum::Json(serde_json::Value::Array(tabs))
}

// ==================== Template Functions ====================

/// Base HTML template
pub fn base_html(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Treasury Review</title>
    <script src="https://unpkg.com/htmx.org@1.9.10"></script>
    <script src="https://cdn.tailwindcss.com"></script>
    <style>
        .htmx-indicator {{ opacity: 0; transition: opacity 0.3s; }}
        .htmx-request .htmx-indicator {{ opacity: 1; }}
        .htmx-request.htmx-indicator {{ opacity: 1; }}
    </style>
</head>
<body class="bg-gray-50 text-gray-900">
    {}
</body>
</html>"#,
        escape_html(title),
        content
    )
}

/// Navigation sidebar listing the visible review tabs
pub fn nav_sidebar(current_path: &str, tabs: &[(String, String)]) -> String {
    let mut nav = String::from("<div class='bg-white border-r h-screen flex flex-col'><div class='p-4 border-b'><h1 class='text-xl font-bold text-indigo-600'>Treasury Review</h1></div><ul class='flex-1 py-2 space-y-1 px-2'>");

    let mut links = vec![("/".to_string(), "Overview".to_string())];
    links.extend(tabs.iter().map(|(key, title)| (render::tab_url(key), title.clone())));

    for (path, label) in &links {
        let is_active = if path == "/" {
            current_path == "/"
        } else {
            current_path.starts_with(path.as_str())
        };
        let active_class = if is_active { "bg-indigo-50 text-indigo-600" } else { "text-gray-600 hover:bg-gray-50" };
        nav.push_str(&format!(
            r#"<li><a href='{}' class='flex items-center gap-2 px-3 py-2 rounded-lg {}'><span>{}</span></a></li>"#,
            path,
            active_class,
            escape_html(label)
        ));
    }
    nav.push_str("</ul></div>");
    nav
}

/// Generate response based on request type (HTMX partial or full page)
pub fn page_response(
    headers: &axum::http::HeaderMap,
    tabs: &[(String, String)],
    title: &str,
    current_path: &str,
    inner_content: &str,
) -> String {
    let is_htmx = headers.get("hx-request").is_some();

    if is_htmx {
        inner_content.to_string()
    } else {
        base_html(
            title,
            &format!(
                r#"<div class='flex flex-col h-screen'>
    <div class='flex flex-1 overflow-hidden'>
        <aside class='w-64 flex-shrink-0'>{}</aside>
        <main class='flex-1 overflow-auto bg-gray-50 p-6'>{}</main>
    </div>
</div>"#,
                nav_sidebar(current_path, tabs),
                inner_content
            ),
        )
    }
}

/// Index page listing the review tabs the user may open
async fn index_page(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
) -> axum::response::Html<String> {
    let workspaces = state.visible_workspaces().await;

    let mut cards = String::new();
    for workspace in &workspaces {
        let status = if state.workspaces.is_mounted(workspace.key()).await {
            let summary = workspace.grid.read().await.summary();
            format!("{} record(s), {} selected", summary.total_records, summary.selected)
        } else {
            "Not loaded yet".to_string()
        };
        cards.push_str(&format!(
            r#"<a href='{}' class='block bg-white rounded-xl shadow-sm p-6 hover:shadow-md'>
                <h3 class='text-lg font-semibold mb-1'>{}</h3>
                <p class='text-sm text-gray-500'>{}</p>
            </a>"#,
            render::tab_url(workspace.key()),
            escape_html(workspace.title()),
            status
        ));
    }
    if workspaces.is_empty() {
        cards.push_str("<p class='text-gray-500'>No review tabs are available for your account.</p>");
    }

    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>Review queues</h2>
            <p class='text-sm text-gray-500'>Workflow authority: {}</p></div>
        <div class='grid grid-cols-1 md:grid-cols-2 lg:grid-cols-3 gap-4'>{}</div>"#,
        escape_html(&state.config.authority.base_url),
        cards
    );

    let tabs = state.nav_links().await;
    axum::response::Html(page_response(&headers, &tabs, "Overview", "/", &inner_content))
}

/// Start the HTTP server
///
/// Binds the configured address and serves until Ctrl-C.
pub async fn start_server(config: &ServerConfig, state: AppState) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let tabs: Vec<String> = state.workspaces.iter().map(|w| w.key().to_string()).collect();

    let router = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    log::info!(target: "treasury::http", "Starting review console on http://{}", addr);
    for tab in &tabs {
        log::info!(target: "treasury::http", "  - {} (review tab)", render::tab_url(tab));
    }
    log::info!(target: "treasury::http", "  - /api/* (JSON API endpoints)");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!(target: "treasury::http", "Server stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!(target: "treasury::http", "Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
