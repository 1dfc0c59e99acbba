//! Field Visit Processor Library
//!
//! A Rust library for ingesting field-collected hydrological
//! observation files from a hot folder, consolidating them into
//! visits, and publishing the visits to a remote time-series store.
//!
//! This library provides tools for:
//! - Discovering stable files in a watched folder with glob filtering
//! - Parsing observation payloads through a chain of format plugins
//! - Unwrapping zip containers into primaries, attachments and fragments
//! - Merging fragments from one trip into consolidated visits
//! - Screening merged visits against the remote store for conflicts
//! - Routing every file to a terminal state folder exactly once

pub mod config;
pub mod constants;
pub mod error;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod archive;
        pub mod builtin;
        pub mod chain;
        pub mod conflict;
        pub mod location_cache;
        pub mod merge;
        pub mod plugins;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Hot-folder engine and remote store collaborator
pub mod processor;
pub mod remote;

// Re-export commonly used types
pub use app::models::{Activity, LocationInfo, OverlapMode, ProcessingStats, TimeInterval, Visit};
pub use config::Config;
pub use error::{Error, Result};
