//! Terminal Kanban client library.

pub mod app;
pub mod board;
pub mod config;
pub mod gateway;
pub mod net;
pub mod notifications;
pub mod session;
pub mod ui;
