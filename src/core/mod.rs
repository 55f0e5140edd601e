//! Core modules for ZCP's platform access and workflow enforcement.
//!
//! Everything below the tool layer lives here: the Zerops API client
//! and its in-memory mock, credential resolution, the workflow engine
//! with its evidence gates, and the bootstrap conductor.

pub mod auth;
pub mod cache;
pub mod client;
pub mod conductor;
pub mod engine;
pub mod error;
pub mod helpers;
pub mod mock;
pub mod plan;
pub mod poll;
pub mod runtime;
pub mod state;
pub mod system;
pub mod time;
pub mod types;
pub mod zerops;
