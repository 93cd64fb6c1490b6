//! Testing utilities for tierload
//!
//! This crate provides:
//! - Scripted extensions with configurable install behavior
//! - A timeline recorder for asserting load ordering
//! - An on-disk extension tree builder

pub mod fixtures;
pub mod scripted;

pub use fixtures::{ExtensionTree, VALID_DESCRIPTOR};
pub use scripted::{Behavior, ScriptedExtension, Timeline, TimelineEvent};

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tierload_core=debug")),
        )
        .with_test_writer()
        .try_init();
}
