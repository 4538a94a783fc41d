/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Account endpoints (sign-up, activation, sign-in, refresh, reset)
/// - `tasks`: Task CRUD endpoints
pub mod auth;
pub mod health;
pub mod tasks;
