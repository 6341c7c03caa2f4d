//! Wire types for the taskboard REST API.
//!
//! Every type here mirrors a JSON document exchanged with the board
//! server (camelCase field names). Request types carry a `validate()`
//! method so malformed form input is rejected before it reaches the
//! network.

pub mod auth;
pub mod board;
pub mod ids;
pub mod notification;
pub mod task;
pub mod user;
pub mod validate;

pub use board::{Board, Column, ColumnUpdate, ConsistencyError};
pub use ids::{ColumnId, CommentId, NotificationId, TaskId, UserId};
pub use notification::Notification;
pub use task::{Attachments, Comment, Priority, Task};
pub use user::{Role, User};
pub use validate::ValidationError;
