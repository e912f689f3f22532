use std::fs;
use std::path::{Path, PathBuf};

use crate::client::{Client, ClientError};
use crate::files::{self, FsError};
use crate::platform::Platform;

pub const PUBKEYS_DIR: &str = "pubkeys";
pub const BOOTNODES_DIR: &str = "bootnodes";
pub const ACTION_DIR: &str = "action";
pub const SELF_PUBKEY_FILE: &str = "self.pubkey";
pub const BOOTNODES_FILE: &str = "nodes.txt";
pub const SELF_URL_FILE: &str = "self.txt";
pub const ACTION_FILE: &str = "actionlist.txt";
pub const PUBKEY_EXTENSION: &str = "pubkey";

/// One participant of a fixture and the files it owns on disk.
///
/// Every path is namespaced under `dir`, so nodes never collide.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    /// `<scenario dir>/<name>`
    pub dir: PathBuf,
    /// host:port the client will listen on
    pub listen_addr: String,
    pub pubkey_path: PathBuf,
    pub bootnodes_path: PathBuf,
    pub self_url_path: PathBuf,
    pub actions_path: PathBuf,
    /// Connection URL written by the client, once read back
    pub url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("failed to unpack template: {0}")]
    Template(#[source] FsError),

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("can't read url from {path}: {source}")]
    ReadUrl {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("client wrote an empty url to {0}")]
    EmptyUrl(PathBuf),

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl Node {
    pub fn new(name: impl Into<String>, parent: &Path, listen_addr: impl Into<String>) -> Self {
        let name = name.into();
        let dir = parent.join(&name);
        Self {
            pubkey_path: dir.join(PUBKEYS_DIR).join(SELF_PUBKEY_FILE),
            bootnodes_path: dir.join(BOOTNODES_DIR).join(BOOTNODES_FILE),
            self_url_path: dir.join(BOOTNODES_DIR).join(SELF_URL_FILE),
            actions_path: dir.join(ACTION_DIR).join(ACTION_FILE),
            listen_addr: listen_addr.into(),
            url: None,
            name,
            dir,
        }
    }

    /// Path a peer's public key is stored under in this node.
    pub fn peer_pubkey_path(&self, peer_name: &str) -> PathBuf {
        self.dir
            .join(PUBKEYS_DIR)
            .join(format!("{}.{}", peer_name, PUBKEY_EXTENSION))
    }

    /// Unpack the template, generate keys, save and read back the node's URL.
    ///
    /// Stops at the first failing step; [`Node::url`] stays `None` in that case.
    pub fn initialize(&mut self, template: &Path, client: &dyn Client) -> Result<(), NodeError> {
        self.unpack_template(template)?;
        client.keygenerate(&self.dir)?;
        client.urlsave(&self.dir, &self.listen_addr)?;
        self.read_url()?;

        tracing::info!(node = %self.name, url = ?self.url, "node initialized");
        Ok(())
    }

    pub fn unpack_template(&self, template: &Path) -> Result<(), NodeError> {
        files::unzip(template, &self.dir).map_err(NodeError::Template)?;
        Ok(())
    }

    /// Load the first line of `bootnodes/self.txt` into [`Node::url`].
    pub fn read_url(&mut self) -> Result<&str, NodeError> {
        let contents = fs::read_to_string(&self.self_url_path).map_err(|source| {
            NodeError::ReadUrl {
                path: self.self_url_path.clone(),
                source,
            }
        })?;

        let url = contents.lines().next().unwrap_or_default().trim_end();
        if url.is_empty() {
            return Err(NodeError::EmptyUrl(self.self_url_path.clone()));
        }
        let url = self.url.insert(url.to_string());
        Ok(url.as_str())
    }

    /// Append `peer_url` to this node's bootstrap list. No dedup, no validation.
    pub fn add_bootstrap_peer(&self, peer_url: &str) -> Result<(), NodeError> {
        if let Some(parent) = self.bootnodes_path.parent() {
            files::create_dir(parent)?;
        }
        files::append(&self.bootnodes_path, &format!("{}\n", peer_url))?;
        tracing::debug!(node = %self.name, peer_url, "added bootstrap peer");
        Ok(())
    }

    /// Copy a peer's public key in as `pubkeys/<peer_name>.pubkey`.
    pub fn add_peer_public_key(&self, peer_key: &Path, peer_name: &str) -> Result<(), NodeError> {
        let dest = self.peer_pubkey_path(peer_name);
        files::copy_file(peer_key, &dest)?;
        tracing::debug!(node = %self.name, peer = peer_name, "added peer public key");
        Ok(())
    }

    /// Append a scripted command sequence to `action/actionlist.txt`.
    pub fn write_actions(&self, actions: &str) -> Result<(), NodeError> {
        if let Some(parent) = self.actions_path.parent() {
            files::create_dir(parent)?;
        }
        files::append(&self.actions_path, actions)?;
        Ok(())
    }

    /// Write the node's launcher as `<dir>/<base_name>.<ext>`.
    pub fn write_launcher(
        &self,
        platform: Platform,
        client_program: &str,
        base_name: &str,
    ) -> Result<PathBuf, NodeError> {
        let content = platform.node_launcher(client_program, &self.name, &self.listen_addr);
        Ok(platform.write_script(&self.dir, base_name, &content)?)
    }
}
