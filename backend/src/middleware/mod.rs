//! Request middleware

pub mod auth;

pub use auth::{
    auth_middleware, cron_middleware, require_role, require_store_access, scope_store_filter,
    CurrentUser,
};
