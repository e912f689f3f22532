/// Lightweight harness for building fixtures in tests
///
/// This module provides a way to build scenarios end to end without the
/// real whisper client: a deterministic fake client that writes the same
/// files the real one does, and a scratch work directory holding a
/// template archive.
///
/// # Example
///
/// ```rust,ignore
/// use common::prelude::*;
/// use common::testkit::TestFixture;
///
/// #[test]
/// fn test_two_nodes() -> anyhow::Result<()> {
///     let fixture = TestFixture::new(Platform::Unix)?;
///
///     let report = fixture.build(&Scenario::two_node_chain(), false)?;
///     assert!(report.is_complete());
///
///     let boot = fixture.read("test1/node2/bootnodes/nodes.txt")?;
///     assert!(boot.starts_with("enode://"));
///     Ok(())
/// }
/// ```
mod client;
mod fixture;

pub use client::{BrokenClient, FakeClient};
pub use fixture::{template_archive, TestFixture, TEMPLATE_CLIENT};
