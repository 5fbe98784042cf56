//! Route modules for the review console
//!
//! Each module follows a consistent structure:
//! - mod.rs: Module declaration, exports and shared helpers
//! - api.rs: JSON API endpoints
//! - page.rs: HTMX page rendering
//! - view.rs / workflow.rs: HTMX partials returning the grid fragment

pub mod review;
