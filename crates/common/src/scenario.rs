//! Multi-node fixtures: roster, bootstrap topology, key exchange and
//! per-node action lists, assembled into a launchable directory tree.
//!
//! A build is best-effort: a step that fails is recorded in the
//! [`BuildReport`] and the remaining nodes and steps still run, so one broken
//! node does not hide problems in the others. Only an invalid definition or
//! an unusable scenario root aborts the build.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::config::FixtureConfig;
use crate::content;
use crate::files::{self, FsError};
use crate::node::{Node, NodeError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    /// host:port the node's client listens on
    pub listen_addr: String,
    /// Action list written to the node, verbatim
    #[serde(default)]
    pub actions: String,
}

/// A directed "knows about" edge: `from` learns `to`'s URL or key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub from: String,
    pub to: String,
}

impl Link {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyExchange {
    /// Every node holds every other node's public key
    #[default]
    Full,
    /// Only the listed edges
    Links(Vec<Link>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Also the name of the scenario directory under the work directory
    pub name: String,
    #[serde(default)]
    pub bootstrap: Vec<Link>,
    #[serde(default)]
    pub key_exchange: KeyExchange,
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("scenario {0:?} has no nodes")]
    Empty(String),

    #[error("invalid name {0:?}")]
    InvalidName(String),

    #[error("node {node:?} has invalid listen address {addr:?}")]
    InvalidListenAddr { node: String, addr: String },

    #[error("node {0:?} is declared more than once")]
    DuplicateNode(String),

    #[error("link {from} -> {to} references unknown node {unknown:?}")]
    UnknownNode {
        from: String,
        to: String,
        unknown: String,
    },

    #[error("node {0:?} is linked to itself")]
    SelfLink(String),

    #[error("scenario directory unusable: {0}")]
    Root(#[source] FsError),

    #[error("can't read scenario file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// The build phase a failure happened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Initialize,
    Bootstrap { peer: String },
    PublicKey { peer: String },
    Actions,
    Launcher,
    StartLauncher,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Initialize => write!(f, "initialize"),
            Step::Bootstrap { peer } => write!(f, "bootstrap from {}", peer),
            Step::PublicKey { peer } => write!(f, "public key of {}", peer),
            Step::Actions => write!(f, "action list"),
            Step::Launcher => write!(f, "launcher"),
            Step::StartLauncher => write!(f, "start launcher"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("{0} has no connection url")]
    MissingUrl(String),

    #[error("action list or launcher missing for {0:?}")]
    IncompleteNodes(Vec<String>),
}

#[derive(Debug)]
pub struct BuildFailure {
    /// `None` for scenario-level steps
    pub node: Option<String>,
    pub step: Step,
    pub error: StepError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub name: String,
    pub dir: PathBuf,
    pub listen_addr: String,
    pub url: Option<String>,
}

/// Outcome of [`Scenario::build`].
#[derive(Debug)]
pub struct BuildReport {
    pub scenario: String,
    pub root: PathBuf,
    pub nodes: Vec<NodeSummary>,
    pub start_script: Option<PathBuf>,
    pub failures: Vec<BuildFailure>,
}

impl BuildReport {
    fn new(scenario: &str, root: &Path) -> Self {
        Self {
            scenario: scenario.to_string(),
            root: root.to_path_buf(),
            nodes: Vec::new(),
            start_script: None,
            failures: Vec::new(),
        }
    }

    fn record(&mut self, node: Option<&str>, step: Step, error: impl Into<StepError>) {
        let error = error.into();
        tracing::warn!(
            scenario = %self.scenario,
            node = node.unwrap_or("-"),
            %step,
            %error,
            "fixture step failed"
        );
        self.failures.push(BuildFailure {
            node: node.map(str::to_string),
            step,
            error,
        });
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn node(&self, name: &str) -> Option<&NodeSummary> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Scenario {} at {} ({} nodes, {} failures)",
            self.scenario,
            self.root.display(),
            self.nodes.len(),
            self.failures.len()
        )?;
        for node in &self.nodes {
            writeln!(
                f,
                "  - {} [{}] {}",
                node.name,
                node.listen_addr,
                node.url.as_deref().unwrap_or("<no url>")
            )?;
        }
        if let Some(script) = &self.start_script {
            writeln!(f, "  start with: {}", script.display())?;
        }
        for failure in &self.failures {
            writeln!(
                f,
                "  ! {} / {}: {}",
                failure.node.as_deref().unwrap_or(&self.scenario),
                failure.step,
                failure.error
            )?;
        }
        Ok(())
    }
}

impl Scenario {
    /// Chain topology: node k+1 bootstraps from node k, full key exchange,
    /// empty action lists.
    pub fn chain(name: impl Into<String>, roster: &[(&str, &str)]) -> Self {
        let nodes = roster
            .iter()
            .map(|(name, addr)| NodeSpec {
                name: name.to_string(),
                listen_addr: addr.to_string(),
                actions: String::new(),
            })
            .collect::<Vec<_>>();
        let bootstrap = nodes
            .windows(2)
            .map(|pair| Link::new(&pair[1].name, &pair[0].name))
            .collect();

        Self {
            name: name.into(),
            bootstrap,
            key_exchange: KeyExchange::Full,
            nodes,
        }
    }

    /// Set the action list of node `name`; unknown names are ignored.
    pub fn with_actions(mut self, name: &str, actions: &str) -> Self {
        if let Some(spec) = self.nodes.iter_mut().find(|n| n.name == name) {
            spec.actions = actions.to_string();
        }
        self
    }

    /// `test1`: node2 bootstraps from node1, node1 messages node2 and back.
    pub fn two_node_chain() -> Self {
        Self::chain(
            "test1",
            &[("node1", "127.0.0.1:30301"), ("node2", "127.0.0.1:30302")],
        )
        .with_actions("node1", content::TWO_NODE_NODE1)
        .with_actions("node2", content::TWO_NODE_NODE2)
    }

    /// `test2`: node1 <- node2 <- node3, node3 reaches node1 through the chain.
    pub fn three_node_chain() -> Self {
        Self::chain(
            "test2",
            &[
                ("node1", "127.0.0.1:30301"),
                ("node2", "127.0.0.1:30302"),
                ("node3", "127.0.0.1:30303"),
            ],
        )
        .with_actions("node1", content::THREE_NODE_NODE1)
        .with_actions("node2", content::THREE_NODE_NODE2)
        .with_actions("node3", content::THREE_NODE_NODE3)
    }

    pub fn builtin() -> Vec<Scenario> {
        vec![Self::two_node_chain(), Self::three_node_chain()]
    }

    pub fn find_builtin(name: &str) -> Option<Scenario> {
        Self::builtin().into_iter().find(|s| s.name == name)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ScenarioError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario: Scenario = toml::from_str(&raw)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Key-exchange edges in application order.
    pub fn key_links(&self) -> Vec<Link> {
        match &self.key_exchange {
            KeyExchange::Full => self
                .nodes
                .iter()
                .flat_map(|a| {
                    self.nodes
                        .iter()
                        .filter(move |b| b.name != a.name)
                        .map(move |b| Link::new(&a.name, &b.name))
                })
                .collect(),
            KeyExchange::Links(links) => links.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        check_name(&self.name)?;
        if self.nodes.is_empty() {
            return Err(ScenarioError::Empty(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            check_name(&node.name)?;
            if !is_script_safe(&node.listen_addr) {
                return Err(ScenarioError::InvalidListenAddr {
                    node: node.name.clone(),
                    addr: node.listen_addr.clone(),
                });
            }
            if !seen.insert(node.name.as_str()) {
                return Err(ScenarioError::DuplicateNode(node.name.clone()));
            }
        }

        let key_links = self.key_links();
        for link in self.bootstrap.iter().chain(key_links.iter()) {
            for end in [&link.from, &link.to] {
                if !seen.contains(end.as_str()) {
                    return Err(ScenarioError::UnknownNode {
                        from: link.from.clone(),
                        to: link.to.clone(),
                        unknown: end.clone(),
                    });
                }
            }
            if link.from == link.to {
                return Err(ScenarioError::SelfLink(link.from.clone()));
            }
        }
        Ok(())
    }

    fn index_of(&self, name: &str) -> usize {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .unwrap_or_else(|| unreachable!("validated link to {}", name))
    }

    /// Assemble the scenario under `<work_dir>/<name>`.
    ///
    /// With `force`, an existing scenario directory is wiped first so the
    /// result matches a fresh build.
    pub fn build(
        &self,
        work_dir: &Path,
        config: &FixtureConfig,
        client: &dyn Client,
        force: bool,
    ) -> Result<BuildReport, ScenarioError> {
        self.validate()?;

        let root = work_dir.join(&self.name);
        tracing::info!(scenario = %self.name, root = %root.display(), force, "building scenario");
        if force {
            files::remove_dir(&root).map_err(ScenarioError::Root)?;
        }
        files::create_dir(&root).map_err(ScenarioError::Root)?;

        let template = config.template_in(work_dir);
        let mut report = BuildReport::new(&self.name, &root);

        let mut nodes = self
            .nodes
            .iter()
            .map(|spec| Node::new(&spec.name, &root, &spec.listen_addr))
            .collect::<Vec<_>>();

        for node in nodes.iter_mut() {
            if let Err(e) = node.initialize(&template, client) {
                report.record(Some(node.name.as_str()), Step::Initialize, e);
            }
        }

        for link in &self.bootstrap {
            let node = &nodes[self.index_of(&link.from)];
            let step = Step::Bootstrap {
                peer: link.to.clone(),
            };
            let result = match &nodes[self.index_of(&link.to)].url {
                Some(url) => node.add_bootstrap_peer(url).map_err(StepError::from),
                None => Err(StepError::MissingUrl(link.to.clone())),
            };
            if let Err(e) = result {
                report.record(Some(node.name.as_str()), step, e);
            }
        }

        for link in self.key_links() {
            let node = &nodes[self.index_of(&link.from)];
            let peer = &nodes[self.index_of(&link.to)];
            if let Err(e) = node.add_peer_public_key(&peer.pubkey_path, &peer.name) {
                report.record(
                    Some(node.name.as_str()),
                    Step::PublicKey {
                        peer: peer.name.clone(),
                    },
                    e,
                );
            }
        }

        // Nodes lacking an action list or a launcher can't be started
        let mut incomplete = Vec::new();
        for (node, spec) in nodes.iter().zip(&self.nodes) {
            let mut ready = true;
            if let Err(e) = node.write_actions(&spec.actions) {
                report.record(Some(node.name.as_str()), Step::Actions, e);
                ready = false;
            }
            if let Err(e) =
                node.write_launcher(config.platform, config.client_program(), &config.node_script)
            {
                report.record(Some(node.name.as_str()), Step::Launcher, e);
                ready = false;
            }
            if !ready {
                incomplete.push(node.name.clone());
            }
        }

        if incomplete.is_empty() {
            let content = config.platform.start_launcher(
                self.nodes.iter().map(|n| n.name.as_str()),
                &config.node_script,
            );
            match config
                .platform
                .write_script(&root, &config.start_script, &content)
            {
                Ok(path) => report.start_script = Some(path),
                Err(e) => report.record(None, Step::StartLauncher, e),
            }
        } else {
            report.record(
                None,
                Step::StartLauncher,
                StepError::IncompleteNodes(incomplete),
            );
        }

        report.nodes = nodes
            .into_iter()
            .map(|node| NodeSummary {
                name: node.name,
                dir: node.dir,
                listen_addr: node.listen_addr,
                url: node.url,
            })
            .collect();

        tracing::info!(
            scenario = %self.name,
            failures = report.failures.len(),
            "scenario built"
        );
        Ok(report)
    }
}

/// Characters a `.sh` or `.bat` launcher would interpret
const SCRIPT_META: &[char] = &[
    '&', '|', ';', '<', '>', '(', ')', '$', '`', '"', '\'', '*', '?', '^', '%', '!',
];

/// Non-empty, no whitespace and nothing a launcher script would interpret.
fn is_script_safe(value: &str) -> bool {
    !value.is_empty()
        && !value.chars().any(char::is_whitespace)
        && !value.contains(SCRIPT_META)
}

fn check_name(name: &str) -> Result<(), ScenarioError> {
    let bad = !is_script_safe(name)
        || name == "."
        || name == ".."
        || name.contains(['/', '\\']);
    if bad {
        return Err(ScenarioError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_chain_topology() {
        let scenario = Scenario::three_node_chain();
        assert_eq!(
            scenario.bootstrap,
            vec![Link::new("node2", "node1"), Link::new("node3", "node2")]
        );
        assert_eq!(scenario.key_exchange, KeyExchange::Full);
    }

    #[test]
    fn test_full_key_exchange_order() {
        let links = Scenario::three_node_chain().key_links();
        assert_eq!(
            links,
            vec![
                Link::new("node1", "node2"),
                Link::new("node1", "node3"),
                Link::new("node2", "node1"),
                Link::new("node2", "node3"),
                Link::new("node3", "node1"),
                Link::new("node3", "node2"),
            ]
        );
    }

    #[test]
    fn test_builtin_catalog() {
        let names: Vec<_> = Scenario::builtin().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["test1", "test2"]);
        assert!(Scenario::find_builtin("test2").is_some());
        assert!(Scenario::find_builtin("test3").is_none());

        let three = Scenario::three_node_chain();
        assert!(three.nodes[0].actions.contains("WATCH|SELF|D"));
        assert!(!three.nodes[2].actions.contains("WATCH"));
    }

    #[test]
    fn test_validate_rejects_bad_definitions() {
        let mut dup = Scenario::two_node_chain();
        dup.nodes[1].name = "node1".to_string();
        assert!(matches!(
            dup.validate(),
            Err(ScenarioError::DuplicateNode(name)) if name == "node1"
        ));

        let mut unknown = Scenario::two_node_chain();
        unknown.bootstrap.push(Link::new("node2", "node9"));
        assert!(matches!(
            unknown.validate(),
            Err(ScenarioError::UnknownNode { unknown, .. }) if unknown == "node9"
        ));

        let mut looped = Scenario::two_node_chain();
        looped.key_exchange = KeyExchange::Links(vec![Link::new("node1", "node1")]);
        assert!(matches!(looped.validate(), Err(ScenarioError::SelfLink(_))));

        let traversal = Scenario::chain("../escape", &[("node1", "127.0.0.1:1")]);
        assert!(matches!(
            traversal.validate(),
            Err(ScenarioError::InvalidName(_))
        ));

        let mut shell = Scenario::two_node_chain();
        shell.nodes[0].name = "node1&calc".to_string();
        assert!(matches!(shell.validate(), Err(ScenarioError::InvalidName(_))));

        let mut spaced = Scenario::two_node_chain();
        spaced.nodes[1].listen_addr = "127.0.0.1:30302 -debug".to_string();
        assert!(matches!(
            spaced.validate(),
            Err(ScenarioError::InvalidListenAddr { node, .. }) if node == "node2"
        ));

        let mut chained = Scenario::two_node_chain();
        chained.nodes[0].listen_addr = "127.0.0.1:30301;rm".to_string();
        assert!(matches!(
            chained.validate(),
            Err(ScenarioError::InvalidListenAddr { .. })
        ));

        let mut ipv6 = Scenario::two_node_chain();
        ipv6.nodes[0].listen_addr = "[::1]:30301".to_string();
        ipv6.validate().unwrap();

        let empty = Scenario::chain("empty", &[]);
        assert!(matches!(empty.validate(), Err(ScenarioError::Empty(_))));
    }

    #[test]
    fn test_parse_scenario_toml() {
        let raw = r#"
name = "star"
bootstrap = [
    { from = "leaf1", to = "hub" },
    { from = "leaf2", to = "hub" },
]

[key_exchange]
links = [
    { from = "leaf1", to = "hub" },
    { from = "hub", to = "leaf1" },
]

[[nodes]]
name = "hub"
listen_addr = "127.0.0.1:30301"
actions = "SELFKEYREGISTER\nSLEEP|5\n"

[[nodes]]
name = "leaf1"
listen_addr = "127.0.0.1:30302"

[[nodes]]
name = "leaf2"
listen_addr = "127.0.0.1:30303"
"#;
        let scenario: Scenario = toml::from_str(raw).unwrap();
        scenario.validate().unwrap();

        assert_eq!(scenario.nodes.len(), 3);
        assert_eq!(scenario.nodes[0].actions, "SELFKEYREGISTER\nSLEEP|5\n");
        assert_eq!(scenario.nodes[1].actions, "");
        assert_eq!(scenario.key_links().len(), 2);
    }

    #[test]
    fn test_key_exchange_defaults_to_full() {
        let raw = r#"
name = "pair"

[[nodes]]
name = "a"
listen_addr = "127.0.0.1:1"

[[nodes]]
name = "b"
listen_addr = "127.0.0.1:2"
"#;
        let scenario: Scenario = toml::from_str(raw).unwrap();
        assert!(scenario.bootstrap.is_empty());
        assert_eq!(
            scenario.key_links(),
            vec![Link::new("a", "b"), Link::new("b", "a")]
        );
    }
}
