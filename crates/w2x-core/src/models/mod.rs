//! Data models shared by every pipeline stage.

pub mod config;
pub mod result;
pub mod token;
