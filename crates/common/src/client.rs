use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// The whisper client binary a node directory is built around.
///
/// Key generation and URL derivation are owned by the client itself; the
/// fixture only asks it to write its outputs into the node directory.
pub trait Client {
    /// Generate the node's keypair (`keys/local.key`, `pubkeys/self.pubkey`).
    fn keygenerate(&self, node_dir: &Path) -> Result<(), ClientError>;

    /// Derive the node's connection URL for `listen_addr` into `bootnodes/self.txt`.
    fn urlsave(&self, node_dir: &Path, listen_addr: &str) -> Result<(), ClientError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program} {command}` exited with {status}")]
    Failed {
        program: PathBuf,
        command: String,
        status: ExitStatus,
    },
}

/// Runs the client executable unpacked into each node directory.
#[derive(Debug, Clone)]
pub struct ProcessClient {
    program: String,
}

impl ProcessClient {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, node_dir: &Path, args: &[&str]) -> Result<(), ClientError> {
        // Relative program paths resolve differently once current_dir is set
        let program = node_dir.join(&self.program);
        let program = std::path::absolute(&program).map_err(|source| ClientError::Spawn {
            program: program.clone(),
            source,
        })?;
        tracing::debug!(program = %program.display(), ?args, "invoking client");

        let status = Command::new(&program)
            .args(args)
            .current_dir(node_dir)
            .status()
            .map_err(|source| ClientError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ClientError::Failed {
                program,
                command: args.join(" "),
                status,
            });
        }
        Ok(())
    }
}

impl Client for ProcessClient {
    fn keygenerate(&self, node_dir: &Path) -> Result<(), ClientError> {
        self.run(node_dir, &["keygenerate"])
    }

    fn urlsave(&self, node_dir: &Path, listen_addr: &str) -> Result<(), ClientError> {
        self.run(node_dir, &["urlsave", "-addr", listen_addr])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let client = ProcessClient::new("whisper_client");

        let err = client.keygenerate(tmp.path()).unwrap_err();
        match err {
            ClientError::Spawn { program, .. } => {
                assert_eq!(program, tmp.path().join("whisper_client"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let program = tmp.path().join("whisper_client");
        std::fs::write(&program, "#!/bin/sh\nexit 3\n").unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = ProcessClient::new("whisper_client")
            .urlsave(tmp.path(), "127.0.0.1:30301")
            .unwrap_err();
        match err {
            ClientError::Failed { command, status, .. } => {
                assert_eq!(command, "urlsave -addr 127.0.0.1:30301");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_client_runs_in_node_dir() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let program = tmp.path().join("whisper_client");
        std::fs::write(&program, "#!/bin/sh\necho \"$@\" > args.txt\n").unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        ProcessClient::new("whisper_client")
            .keygenerate(tmp.path())
            .unwrap();
        let args = std::fs::read_to_string(tmp.path().join("args.txt")).unwrap();
        assert_eq!(args.trim(), "keygenerate");
    }

    #[cfg(unix)]
    #[test]
    fn test_client_runs_from_relative_node_dir() {
        use std::os::unix::fs::PermissionsExt;

        // tempdir_in(".") yields a path relative to the test's working directory
        let tmp = tempfile::tempdir_in(".").unwrap();
        assert!(tmp.path().is_relative());
        let node_dir = tmp.path().join("node1");
        std::fs::create_dir(&node_dir).unwrap();
        let program = node_dir.join("whisper_client");
        std::fs::write(&program, "#!/bin/sh\necho \"$@\" > args.txt\n").unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        ProcessClient::new("whisper_client")
            .urlsave(&node_dir, "127.0.0.1:30301")
            .unwrap();
        let args = std::fs::read_to_string(node_dir.join("args.txt")).unwrap();
        assert_eq!(args.trim(), "urlsave -addr 127.0.0.1:30301");
    }
}
