//! HTML rendering for review grids
//!
//! One rendering function per [`ColumnKind`] variant; every other fragment
//! (toolbar, pager, dialogs, toasts) is built around those cells. All
//! interactive elements post back to `/review/{tab}/...` and swap the whole
//! `#review-grid` container.

use serde_json::{json, Value};
use std::str::FromStr;

use treasury_core::models::{value_as_date, value_text};
use treasury_core::{
    ColumnDescriptor, ColumnKind, ConfirmPrompt, DataGridModel, EditDraft, GridRow, GroupRow, Notification,
    NotifyLevel, PageWindow, PaginationView, Record, RecordStatus, ReviewAction, SortDirection, StatusStateMachine,
};
use treasury_utils::escape_html;

use crate::interaction::{CONFIRMED_FIELD, REASON_FIELD};

/// Id of the swappable grid container
pub const GRID_ID: &str = "review-grid";
/// Prefix of form fields carrying staged edit values
pub const FIELD_PREFIX: &str = "field:";

const SWAP: &str = "hx-target='#review-grid' hx-swap='outerHTML'";

/// Everything needed to draw one grid
pub struct GridView<'a> {
    pub tab: &'a str,
    pub grid: &'a DataGridModel,
    pub pagination: &'a PaginationView,
    pub draft: Option<&'a EditDraft>,
    pub table: &'a StatusStateMachine,
    pub page_size_options: &'a [usize],
}

impl GridView<'_> {
    fn base(&self) -> String {
        tab_url(self.tab)
    }

    fn is_editing(&self, id: &str) -> bool {
        self.draft.map(|d| d.id() == id).unwrap_or(false)
    }
}

/// Base URL of a review tab
pub fn tab_url(tab: &str) -> String {
    format!("/review/{}", urlencoding::encode(tab))
}

fn hx_vals(value: Value) -> String {
    escape_html(&value.to_string())
}

// ==================== Grid ====================

/// The whole `#review-grid` container
pub fn render_grid(view: &GridView, toasts: &[Notification], dialog: Option<&str>) -> String {
    let window = view.pagination.window(view.grid);
    format!(
        r#"<div id='{}' class='space-y-3'>
    {}
    {}
    <div class='bg-white rounded-xl shadow-sm overflow-x-auto'>
        <table class='min-w-full text-sm'>
            <thead class='bg-gray-50 border-b'>{}</thead>
            <tbody class='divide-y'>{}</tbody>
        </table>
    </div>
    {}
    {}
</div>"#,
        GRID_ID,
        render_toasts(toasts),
        render_toolbar(view),
        render_header(view),
        render_body(view, &window),
        render_pager(view, &window),
        dialog.unwrap_or("")
    )
}

fn render_header(view: &GridView) -> String {
    let mut cells = String::new();
    for column in view.grid.get_visible_columns() {
        let cell = match &column.kind {
            ColumnKind::Select => {
                let (target, checked) = if view.grid.is_page_selected(view.pagination) {
                    ("select-clear", "checked")
                } else {
                    ("select-page", "")
                };
                format!(
                    "<input type='checkbox' {} hx-post='{}/{}' {} title='Select page'>",
                    checked,
                    view.base(),
                    target,
                    SWAP
                )
            }
            ColumnKind::Expand => String::new(),
            ColumnKind::Action => "Actions".to_string(),
            _ if column.sortable => {
                let position = view.grid.sorting().iter().position(|k| k.column == column.id);
                let indicator = match position.map(|i| (i, view.grid.sorting()[i].direction)) {
                    Some((i, direction)) => {
                        let arrow = if direction == SortDirection::Asc { "▲" } else { "▼" };
                        if view.grid.sorting().len() > 1 {
                            format!(" {}{}", arrow, i + 1)
                        } else {
                            format!(" {}", arrow)
                        }
                    }
                    None => String::new(),
                };
                format!(
                    "<button class='font-semibold hover:text-indigo-600' hx-post='{}/sort' hx-vals='{}' {}>{}{}</button>",
                    view.base(),
                    hx_vals(json!({"column": column.id})),
                    SWAP,
                    escape_html(&column.header),
                    indicator
                )
            }
            _ => format!("<span class='font-semibold'>{}</span>", escape_html(&column.header)),
        };
        cells.push_str(&format!("<th class='px-3 py-2 text-left text-gray-600'>{}</th>", cell));
    }
    format!("<tr>{}</tr>", cells)
}

fn render_body(view: &GridView, window: &PageWindow) -> String {
    let columns = view.grid.get_visible_columns();
    if window.rows.is_empty() {
        let message = if view.grid.records().is_empty() {
            "No records loaded"
        } else {
            "No records match the current filter"
        };
        return format!(
            "<tr><td colspan='{}' class='px-3 py-8 text-center text-gray-500'>{}</td></tr>",
            columns.len().max(1),
            message
        );
    }

    let mut body = String::new();
    for row in &window.rows {
        match row {
            GridRow::Group(group) => body.push_str(&render_group_row(view, group, columns.len())),
            GridRow::Record { record, depth } => {
                if view.is_editing(&record.id) {
                    if let Some(draft) = view.draft {
                        body.push_str(&render_edit_row(view, &columns, draft));
                    }
                } else {
                    body.push_str(&render_record_row(view, &columns, record, *depth));
                }
                if view.grid.is_expanded(&record.id) {
                    body.push_str(&render_detail_row(view, record, columns.len()));
                }
            }
        }
    }
    body
}

fn render_group_row(view: &GridView, group: &GroupRow, colspan: usize) -> String {
    let header = view
        .grid
        .column(&group.column)
        .map(|c| c.header.as_str())
        .unwrap_or(group.column.as_str());
    let label = if group.label.is_empty() { "(blank)" } else { group.label.as_str() };
    format!(
        r#"<tr class='bg-gray-100'><td colspan='{}' class='px-3 py-2' style='padding-left: {}rem'>
            <button class='font-medium text-gray-700' hx-post='{}/groups/{}/collapse' {}>{} {}: {}</button>
            <span class='ml-2 text-xs text-gray-500'>{} record(s)</span>
        </td></tr>"#,
        colspan,
        0.75 + group.depth as f32 * 1.25,
        view.base(),
        urlencoding::encode(&group.key),
        SWAP,
        if group.collapsed { "▸" } else { "▾" },
        escape_html(header),
        escape_html(label),
        group.count
    )
}

fn render_record_row(view: &GridView, columns: &[&ColumnDescriptor], record: &Record, depth: usize) -> String {
    let selected = view.grid.is_selected(&record.id);
    let mut cells = String::new();
    for (i, column) in columns.iter().enumerate() {
        let indent = if i == 0 && depth > 0 {
            format!(" style='padding-left: {}rem'", 0.75 + depth as f32 * 1.25)
        } else {
            String::new()
        };
        cells.push_str(&format!(
            "<td class='px-3 py-2'{}>{}</td>",
            indent,
            render_cell(view, column, record)
        ));
    }
    format!(
        "<tr id='row-{}' class='{}'>{}</tr>",
        escape_html(&record.id),
        if selected { "bg-indigo-50" } else { "hover:bg-gray-50" },
        cells
    )
}

/// Render one cell; dispatches on the column kind
pub fn render_cell(view: &GridView, column: &ColumnDescriptor, record: &Record) -> String {
    match &column.kind {
        ColumnKind::Select => render_select_cell(view, record),
        ColumnKind::Expand => render_expand_cell(view, record),
        ColumnKind::Text | ColumnKind::EnumSelect { .. } => escape_html(&column.display_text(record)),
        ColumnKind::Date => format!(
            "<span class='whitespace-nowrap'>{}</span>",
            escape_html(&column.display_text(record))
        ),
        ColumnKind::Currency { .. } => format!(
            "<span class='block text-right tabular-nums whitespace-nowrap'>{}</span>",
            escape_html(&column.display_text(record))
        ),
        ColumnKind::Status => render_status_badge(&column.value(record)),
        ColumnKind::Action => render_action_cell(view, record),
    }
}

fn render_select_cell(view: &GridView, record: &Record) -> String {
    format!(
        "<input type='checkbox' {} hx-post='{}/select/{}' {}>",
        if view.grid.is_selected(&record.id) { "checked" } else { "" },
        view.base(),
        urlencoding::encode(&record.id),
        SWAP
    )
}

fn render_expand_cell(view: &GridView, record: &Record) -> String {
    format!(
        "<button class='text-gray-500 hover:text-gray-800' hx-post='{}/rows/{}/expand' {}>{}</button>",
        view.base(),
        urlencoding::encode(&record.id),
        SWAP,
        if view.grid.is_expanded(&record.id) { "▾" } else { "▸" }
    )
}

/// Colored badge for a workflow status value
pub fn render_status_badge(value: &Value) -> String {
    let status = value.as_str().and_then(|s| RecordStatus::from_str(s).ok());
    let class = match status {
        Some(RecordStatus::New) => "bg-gray-100 text-gray-700",
        Some(RecordStatus::PendingApproval) => "bg-yellow-100 text-yellow-800",
        Some(RecordStatus::Approved) => "bg-green-100 text-green-800",
        Some(RecordStatus::Rejected) => "bg-red-100 text-red-800",
        Some(RecordStatus::PendingDeleteApproval) => "bg-orange-100 text-orange-800",
        None => "bg-gray-100 text-gray-500",
    };
    let label = match status {
        Some(status) => status.label().to_string(),
        None => value_text(value),
    };
    format!(
        "<span class='px-2 py-0.5 rounded-full text-xs font-medium whitespace-nowrap {}'>{}</span>",
        class,
        escape_html(&label)
    )
}

fn render_action_cell(view: &GridView, record: &Record) -> String {
    let id = urlencoding::encode(&record.id);
    let mut buttons = String::new();
    for action in view.table.available_actions(record.status) {
        buttons.push_str(&format!(
            "<button class='px-2 py-1 text-xs rounded border {}' hx-post='{}/actions/{}/prepare' hx-vals='{}' {}>{}</button>",
            action_class(action),
            view.base(),
            action.slug(),
            hx_vals(json!({"row": record.id})),
            SWAP,
            action.label()
        ));
    }
    if view.grid.columns().iter().any(|c| c.editable) {
        buttons.push_str(&format!(
            "<button class='px-2 py-1 text-xs rounded border text-gray-700 hover:bg-gray-50' hx-post='{}/rows/{}/edit' {}>Edit</button>",
            view.base(),
            id,
            SWAP
        ));
    }
    format!("<div class='flex gap-1 justify-end'>{}</div>", buttons)
}

fn action_class(action: ReviewAction) -> &'static str {
    match action {
        ReviewAction::Approve => "border-green-300 text-green-700 hover:bg-green-50",
        ReviewAction::Reject => "border-red-300 text-red-700 hover:bg-red-50",
        ReviewAction::RequestDelete => "border-orange-300 text-orange-700 hover:bg-orange-50",
    }
}

fn render_detail_row(view: &GridView, record: &Record, colspan: usize) -> String {
    let mut items = String::new();
    for column in view.grid.columns().iter().filter(|c| c.kind.has_value()) {
        items.push_str(&format!(
            "<div><dt class='text-xs text-gray-500'>{}</dt><dd class='font-medium'>{}</dd></div>",
            escape_html(&column.header),
            escape_html(&column.display_text(record))
        ));
    }
    let shown: Vec<&str> = view.grid.columns().iter().map(|c| c.accessor.as_str()).collect();
    for (name, value) in record.fields.iter().filter(|(name, _)| !shown.contains(&name.as_str())) {
        items.push_str(&format!(
            "<div><dt class='text-xs text-gray-500'>{}</dt><dd class='font-medium'>{}</dd></div>",
            escape_html(name),
            escape_html(&value_text(value))
        ));
    }
    format!(
        "<tr class='bg-gray-50'><td colspan='{}' class='px-6 py-3'><dl class='grid grid-cols-2 md:grid-cols-4 gap-3'>{}</dl></td></tr>",
        colspan, items
    )
}

// ==================== Row editing ====================

fn render_edit_row(view: &GridView, columns: &[&ColumnDescriptor], draft: &EditDraft) -> String {
    let mut cells = String::new();
    for column in columns {
        let cell = if column.editable {
            render_edit_input(view, column, draft)
        } else if matches!(column.kind, ColumnKind::Action) {
            render_edit_buttons(view, draft)
        } else {
            render_cell(view, column, draft.baseline())
        };
        cells.push_str(&format!("<td class='px-3 py-2'>{}</td>", cell));
    }
    format!(
        "<tr id='row-{}' class='bg-yellow-50'>{}</tr>",
        escape_html(draft.id()),
        cells
    )
}

/// Input for an editable cell; the widget follows the column kind
pub fn render_edit_input(view: &GridView, column: &ColumnDescriptor, draft: &EditDraft) -> String {
    let value = draft.value(&column.accessor);
    let name = escape_html(&format!("{}{}", FIELD_PREFIX, column.accessor));
    let changed = draft.diff().contains_key(&column.accessor);
    let class = if changed {
        "w-full px-2 py-1 border border-yellow-400 rounded"
    } else {
        "w-full px-2 py-1 border rounded"
    };
    let post = format!(
        "hx-post='{}/rows/{}/field' hx-trigger='change' {}",
        view.base(),
        urlencoding::encode(draft.id()),
        SWAP
    );
    match &column.kind {
        ColumnKind::EnumSelect { options } => {
            let current = value_text(&value);
            let mut html = format!("<select name='{}' class='{}' {}>", name, class, post);
            if !options.iter().any(|o| *o == current) {
                html.push_str(&format!("<option value='{}' selected>{}</option>", escape_html(&current), escape_html(&current)));
            }
            for option in options {
                html.push_str(&format!(
                    "<option value='{}' {}>{}</option>",
                    escape_html(option),
                    if *option == current { "selected" } else { "" },
                    escape_html(option)
                ));
            }
            html.push_str("</select>");
            html
        }
        ColumnKind::Date => {
            let text = value_as_date(&value)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| value_text(&value));
            format!("<input type='date' name='{}' value='{}' class='{}' {}>", name, escape_html(&text), class, post)
        }
        ColumnKind::Currency { .. } => format!(
            "<input type='number' step='0.01' name='{}' value='{}' class='{} text-right' {}>",
            name,
            escape_html(&value_text(&value)),
            class,
            post
        ),
        _ => format!(
            "<input type='text' name='{}' value='{}' class='{}' {}>",
            name,
            escape_html(&value_text(&value)),
            class,
            post
        ),
    }
}

fn render_edit_buttons(view: &GridView, draft: &EditDraft) -> String {
    let id = urlencoding::encode(draft.id());
    format!(
        r#"<div class='flex gap-1 justify-end'>
            <button class='px-2 py-1 text-xs rounded bg-indigo-600 text-white hover:bg-indigo-700' hx-post='{base}/rows/{id}/commit' hx-include='closest tr' {swap}>Save</button>
            <button class='px-2 py-1 text-xs rounded border text-gray-700 hover:bg-gray-50' hx-post='{base}/rows/{id}/cancel' {swap}>Cancel</button>
        </div>"#,
        base = view.base(),
        id = id,
        swap = SWAP
    )
}

// ==================== Toolbar ====================

fn render_toolbar(view: &GridView) -> String {
    let base = view.base();
    let filter = view.grid.filter();
    let search = filter.search.clone().unwrap_or_default();
    let active_status = filter
        .statuses
        .as_ref()
        .and_then(|s| if s.len() == 1 { s.iter().next().copied() } else { None });

    let mut status_options = String::from("<option value=''>All statuses</option>");
    for status in RecordStatus::ALL {
        status_options.push_str(&format!(
            "<option value='{}' {}>{}</option>",
            status,
            if active_status == Some(status) { "selected" } else { "" },
            status.label()
        ));
    }

    let selected = view.grid.get_selected_ids().len();
    let mut actions = String::new();
    for action in ReviewAction::ALL {
        actions.push_str(&format!(
            "<button class='px-3 py-1.5 text-sm rounded-lg border {}' hx-post='{}/actions/{}/prepare' {}>{}</button>",
            action_class(action),
            base,
            action.slug(),
            SWAP,
            action.label()
        ));
    }

    format!(
        r#"<div class='flex flex-wrap items-center gap-2'>
        <form class='flex items-center gap-2' hx-post='{base}/filter' hx-trigger='submit, change, keyup changed delay:500ms from:find input' {swap}>
            <input type='text' name='search' value='{search}' placeholder='Search...' class='px-3 py-1.5 border rounded-lg w-48'>
            <select name='status' class='px-2 py-1.5 border rounded-lg bg-white'>{status_options}</select>
        </form>
        {group}
        {columns}
        <div class='flex-1'></div>
        <span class='text-sm text-gray-500'>{selected} selected</span>
        {clear}
        {actions}
        <button class='px-3 py-1.5 text-sm rounded-lg bg-gray-100 hover:bg-gray-200' hx-post='{base}/refresh' {swap}>Refresh</button>
    </div>"#,
        base = base,
        swap = SWAP,
        search = escape_html(&search),
        status_options = status_options,
        group = render_group_picker(view),
        columns = render_column_menu(view),
        selected = selected,
        clear = if selected > 0 {
            format!(
                "<button class='text-sm text-indigo-600 hover:underline' hx-post='{}/select-clear' {}>Clear</button>",
                base, SWAP
            )
        } else {
            String::new()
        },
        actions = actions
    )
}

fn render_group_picker(view: &GridView) -> String {
    let current = view.grid.grouping().join(",");
    let mut options = format!(
        "<option value='' {}>No grouping</option>",
        if current.is_empty() { "selected" } else { "" }
    );
    for column in view.grid.columns().iter().filter(|c| c.kind.has_value()) {
        options.push_str(&format!(
            "<option value='{}' {}>Group by {}</option>",
            escape_html(&column.id),
            if current == column.id { "selected" } else { "" },
            escape_html(&column.header)
        ));
    }
    if view.grid.grouping().len() > 1 {
        options.push_str(&format!("<option value='{}' selected>Grouped by {}</option>", escape_html(&current), escape_html(&current)));
    }
    format!(
        "<select name='columns' class='px-2 py-1.5 border rounded-lg bg-white text-sm' hx-post='{}/group' hx-trigger='change' {}>{}</select>",
        view.base(),
        SWAP,
        options
    )
}

fn render_column_menu(view: &GridView) -> String {
    let order = view.grid.column_order();
    let mut items = String::new();
    for (index, column) in view.grid.columns().iter().enumerate() {
        if !column.kind.has_value() {
            continue;
        }
        let toggle = if column.hideable {
            format!(
                "<input type='checkbox' {} hx-post='{}/columns/{}/visibility' hx-vals='{}' {}>",
                if column.visible { "checked" } else { "" },
                view.base(),
                urlencoding::encode(&column.id),
                hx_vals(json!({"visible": !column.visible})),
                SWAP
            )
        } else {
            "<input type='checkbox' checked disabled>".to_string()
        };
        let mut moves = String::new();
        if !column.is_locked() {
            for (label, target) in [("←", index.checked_sub(1)), ("→", Some(index + 1))] {
                let Some(target) = target.filter(|t| *t < order.len()) else {
                    continue;
                };
                let mut moved = order.clone();
                moved.swap(index, target);
                moves.push_str(&format!(
                    "<button class='px-1 text-gray-500 hover:text-gray-900' hx-post='{}/columns/order' hx-vals='{}' {}>{}</button>",
                    view.base(),
                    hx_vals(json!({"order": moved.join(",")})),
                    SWAP,
                    label
                ));
            }
        }
        items.push_str(&format!(
            "<li class='flex items-center gap-2 py-1'>{}<span class='flex-1'>{}</span>{}</li>",
            toggle,
            escape_html(&column.header),
            moves
        ));
    }
    format!(
        r#"<details class='relative'>
            <summary class='px-3 py-1.5 text-sm border rounded-lg cursor-pointer bg-white'>Columns</summary>
            <ul class='absolute z-10 mt-1 w-64 p-3 bg-white border rounded-lg shadow-lg text-sm'>{}</ul>
        </details>"#,
        items
    )
}

// ==================== Pager ====================

fn render_pager(view: &GridView, window: &PageWindow) -> String {
    let info = window.info();
    let mut sizes = String::new();
    let mut options: Vec<usize> = view.page_size_options.to_vec();
    if !options.contains(&info.page_size) {
        options.push(info.page_size);
        options.sort_unstable();
    }
    for size in options {
        sizes.push_str(&format!(
            "<option value='{}' {}>{} / page</option>",
            size,
            if size == info.page_size { "selected" } else { "" },
            size
        ));
    }
    let button = |label: &str, page: &str, enabled: bool| {
        if enabled {
            format!(
                "<button class='px-3 py-1 border rounded hover:bg-gray-50' hx-post='{}/page' hx-vals='{}' {}>{}</button>",
                view.base(),
                hx_vals(json!({"page": page})),
                SWAP,
                label
            )
        } else {
            format!("<button class='px-3 py-1 border rounded text-gray-300' disabled>{}</button>", label)
        }
    };
    format!(
        r#"<div class='flex items-center justify-between text-sm text-gray-600'>
        <span>Showing {}-{} of {} row(s)</span>
        <div class='flex items-center gap-2'>
            {}
            <span>Page {} of {}</span>
            {}
            <select name='size' class='px-2 py-1 border rounded bg-white' hx-post='{}/page-size' hx-trigger='change' {}>{}</select>
        </div>
    </div>"#,
        info.first_row,
        info.last_row,
        info.total_rows,
        button("Previous", "prev", window.has_previous()),
        info.page,
        info.page_count,
        button("Next", "next", window.has_next()),
        view.base(),
        SWAP,
        sizes
    )
}

// ==================== Dialogs and toasts ====================

/// Modal confirmation form posting back to `post_url`
pub fn render_confirm_dialog(prompt: &ConfirmPrompt, post_url: &str, hidden: &[(&str, &str)]) -> String {
    let hidden_inputs: String = hidden
        .iter()
        .map(|(name, value)| {
            format!(
                "<input type='hidden' name='{}' value='{}'>",
                escape_html(name),
                escape_html(value)
            )
        })
        .collect();
    let input = if prompt.input {
        format!(
            r#"<label class='block text-sm font-medium text-gray-700 mb-1'>{}</label>
            <textarea name='{}' rows='3' placeholder='{}' class='w-full px-3 py-2 border rounded-lg' {}></textarea>"#,
            escape_html(prompt.input_label.as_deref().unwrap_or("Comments")),
            REASON_FIELD,
            escape_html(prompt.input_placeholder.as_deref().unwrap_or("")),
            if prompt.input_required { "required" } else { "" }
        )
    } else {
        String::new()
    };
    format!(
        r#"<div class='fixed inset-0 z-50 flex items-center justify-center bg-black bg-opacity-30' id='confirm-dialog'>
    <form class='bg-white rounded-xl shadow-xl p-6 w-full max-w-md space-y-4' hx-post='{}' {}>
        <h3 class='text-lg font-semibold'>{}</h3>
        <p class='text-gray-700'>{}</p>
        {}
        {}
        <div class='flex justify-end gap-2'>
            <button type='submit' name='{confirmed}' value='false' formnovalidate class='px-4 py-2 border rounded-lg hover:bg-gray-50'>Cancel</button>
            <button type='submit' name='{confirmed}' value='true' class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Confirm</button>
        </div>
    </form>
</div>"#,
        escape_html(post_url),
        SWAP,
        escape_html(&prompt.title),
        escape_html(&prompt.message),
        hidden_inputs,
        input,
        confirmed = CONFIRMED_FIELD
    )
}

/// Notifications collected while handling the request
pub fn render_toasts(toasts: &[Notification]) -> String {
    if toasts.is_empty() {
        return String::new();
    }
    let mut html = String::from("<div class='space-y-2' id='grid-toasts'>");
    for toast in toasts {
        let class = match toast.level {
            NotifyLevel::Success => "bg-green-50 border-green-200 text-green-800",
            NotifyLevel::Error => "bg-red-50 border-red-200 text-red-800",
            NotifyLevel::Warning => "bg-yellow-50 border-yellow-200 text-yellow-800",
            NotifyLevel::Info => "bg-blue-50 border-blue-200 text-blue-800",
        };
        html.push_str(&format!(
            "<div class='px-4 py-2 border rounded-lg {}' role='status' data-level='{}'>{}</div>",
            class,
            toast.level,
            escape_html(&toast.message)
        ));
    }
    html.push_str("</div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use treasury_config::Config;

    fn grid() -> DataGridModel {
        let config = Config::from_yaml(Config::generate_default()).unwrap();
        let mut grid = DataGridModel::from_config(config.workspace("bank-statements").unwrap()).unwrap();
        grid.replace_rows(vec![
            Record::new("A", RecordStatus::PendingApproval)
                .with_field("bank", json!("HSBC"))
                .with_field("amount", json!(1234567.5))
                .with_field("value_date", json!("2024-03-31")),
            Record::new("B<script>", RecordStatus::PendingDeleteApproval).with_field("bank", json!("Citi")),
        ]);
        grid
    }

    fn render(grid: &DataGridModel, draft: Option<&EditDraft>) -> String {
        let pagination = PaginationView::new(25);
        let table = StatusStateMachine::standard();
        let view = GridView {
            tab: "bank-statements",
            grid,
            pagination: &pagination,
            draft,
            table: &table,
            page_size_options: &[10, 25],
        };
        render_grid(&view, &[], None)
    }

    #[test]
    fn test_cells_follow_column_kind() {
        let html = render(&grid(), None);
        assert!(html.contains("1,234,567.50 USD"));
        assert!(html.contains("2024-03-31"));
        assert!(html.contains("Pending approval"));
        assert!(html.contains("Pending delete approval"));
        assert!(html.contains("hx-post='/review/bank-statements/select/A'"));
    }

    #[test]
    fn test_row_actions_come_from_transition_table() {
        let html = render(&grid(), None);
        assert!(html.contains("/actions/request-delete/prepare' hx-vals='{&quot;row&quot;:&quot;A&quot;}'"));
        // pending deletions cannot be re-requested
        assert!(!html.contains("/actions/request-delete/prepare' hx-vals='{&quot;row&quot;:&quot;B&lt;script&gt;&quot;}'"));
    }

    #[test]
    fn test_values_are_escaped() {
        let html = render(&grid(), None);
        assert!(!html.contains("B<script>"));
        assert!(html.contains("B&lt;script&gt;"));
    }

    #[test]
    fn test_empty_grid_message() {
        let config = Config::from_yaml(Config::generate_default()).unwrap();
        let grid = DataGridModel::from_config(config.workspace("users").unwrap()).unwrap();
        assert!(render(&grid, None).contains("No records loaded"));
    }

    #[test]
    fn test_confirm_dialog_posts_answer() {
        let prompt = ConfirmPrompt {
            title: "Reject records".to_string(),
            message: "Reject 2 records?".to_string(),
            input: true,
            input_required: true,
            input_label: Some("Reason".to_string()),
            input_placeholder: Some("Required".to_string()),
        };
        let html = render_confirm_dialog(&prompt, "/review/users/actions/reject", &[("row", "A")]);
        assert!(html.contains("hx-post='/review/users/actions/reject'"));
        assert!(html.contains("name='reason'"));
        assert!(html.contains("required"));
        assert!(html.contains("name='confirmed' value='true'"));
        assert!(html.contains("<input type='hidden' name='row' value='A'>"));
    }

    #[test]
    fn test_toasts_render_levels() {
        let html = render_toasts(&[Notification {
            message: "stale version".to_string(),
            level: NotifyLevel::Error,
        }]);
        assert!(html.contains("data-level='error'"));
        assert!(html.contains("stale version"));
        assert!(render_toasts(&[]).is_empty());
    }
}
