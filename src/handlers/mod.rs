//! HTTP request handlers.
//!
//! Handlers are thin: they deserialize and validate input, call the store,
//! and wrap results in the response envelope. Every fallible path returns
//! [`AppError`](crate::error::AppError), which owns the HTTP mapping.

pub mod health;
pub mod mangas;
pub mod tokens;
pub mod users;

pub use health::healthcheck;
pub use mangas::{create_manga, delete_manga, list_mangas, show_manga, update_manga};
pub use tokens::create_authentication_token;
pub use users::{activate_user, register_user};
