//! Shared wire types for the BoardSync dashboard protocol.

pub mod api;
pub mod chat;
pub mod push;
pub mod task;
