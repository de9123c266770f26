//! `BoardSync` — board state synchronization engine for a team
//! collaboration dashboard.

pub mod api;
pub mod board;
pub mod chat;
pub mod config;
pub mod conn;
pub mod push;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod validate;
