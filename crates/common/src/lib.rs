/**
 * Filesystem helpers: directory create/remove,
 *  guarded copies, template archive pack/unpack.
 */
pub mod files;
/**
 * Launcher script templates, one per platform.
 */
pub mod platform;
/**
 * Seam around the external whisper client binary.
 */
pub mod client;
/**
 * A single fixture node and the files it owns.
 */
pub mod node;
/**
 * Scenario definitions and the fixture builder.
 */
pub mod scenario;
/**
 * Canned action lists for the built-in scenarios.
 */
pub mod content;
/**
 * Persistent fixture settings (`wfx.toml`).
 */
pub mod config;
/**
 * Fake client and scratch fixtures for tests.
 */
pub mod testkit;

pub mod prelude {
    pub use crate::client::{Client, ClientError, ProcessClient};
    pub use crate::config::{ConfigError, FixtureConfig};
    pub use crate::files::FsError;
    pub use crate::node::{Node, NodeError};
    pub use crate::platform::Platform;
    pub use crate::scenario::{BuildReport, KeyExchange, Link, NodeSpec, Scenario, ScenarioError};
}
