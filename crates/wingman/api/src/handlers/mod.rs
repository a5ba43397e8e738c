//! HTTP request handlers

mod approvals;
mod check;
mod claims;
mod health;
mod tokens;
mod watcher;

pub use approvals::*;
pub use check::*;
pub use claims::*;
pub use health::*;
pub use tokens::*;
pub use watcher::*;
