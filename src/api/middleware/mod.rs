//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Auth validator: bearer token → session → user + profile
//! 2. Audit logger: logs after auth, has user id and role

pub mod audit;
pub mod auth;
