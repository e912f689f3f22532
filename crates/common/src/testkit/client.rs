use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::client::{Client, ClientError};
use crate::node::{BOOTNODES_DIR, PUBKEYS_DIR, SELF_PUBKEY_FILE, SELF_URL_FILE};

/// Stands in for the whisper client binary
///
/// Output only depends on the node directory name and listen address, so two
/// builds of the same scenario produce identical trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeClient;

impl FakeClient {
    /// The URL `urlsave` writes for a node
    pub fn url_for(name: &str, listen_addr: &str) -> String {
        format!("enode://{}@{}", hex_id(name), listen_addr)
    }

    /// The public key `keygenerate` writes for a node
    pub fn pubkey_for(name: &str) -> String {
        format!("04{}", hex_id(name))
    }
}

fn hex_id(name: &str) -> String {
    name.bytes().map(|b| format!("{:02x}", b)).collect()
}

fn node_name(node_dir: &Path) -> String {
    node_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write(node_dir: &Path, path: PathBuf, contents: String) -> Result<(), ClientError> {
    let io_err = |source| ClientError::Spawn {
        program: node_dir.join("fake-client"),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(&path, contents).map_err(io_err)
}

impl Client for FakeClient {
    fn keygenerate(&self, node_dir: &Path) -> Result<(), ClientError> {
        let name = node_name(node_dir);
        write(
            node_dir,
            node_dir.join("keys").join("local.key"),
            format!("secret-{}\n", hex_id(&name)),
        )?;
        write(
            node_dir,
            node_dir.join(PUBKEYS_DIR).join(SELF_PUBKEY_FILE),
            Self::pubkey_for(&name),
        )
    }

    fn urlsave(&self, node_dir: &Path, listen_addr: &str) -> Result<(), ClientError> {
        let name = node_name(node_dir);
        write(
            node_dir,
            node_dir.join(BOOTNODES_DIR).join(SELF_URL_FILE),
            format!("{}\n", Self::url_for(&name, listen_addr)),
        )
    }
}

/// A [`FakeClient`] whose `urlsave` fails for one node
#[derive(Debug, Clone)]
pub struct BrokenClient {
    pub node: String,
}

impl BrokenClient {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }
}

impl Client for BrokenClient {
    fn keygenerate(&self, node_dir: &Path) -> Result<(), ClientError> {
        FakeClient.keygenerate(node_dir)
    }

    fn urlsave(&self, node_dir: &Path, listen_addr: &str) -> Result<(), ClientError> {
        if node_name(node_dir) == self.node {
            return Err(ClientError::Spawn {
                program: node_dir.join("fake-client"),
                source: io::Error::new(io::ErrorKind::Other, "urlsave crashed"),
            });
        }
        FakeClient.urlsave(node_dir, listen_addr)
    }
}
