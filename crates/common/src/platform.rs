//! Launcher script templates, keyed by host platform.
//!
//! A fixture is generated for exactly one platform; the template is picked
//! once from [`Platform`] and every launcher in the fixture uses it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::files::{self, FsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Windows,
    Unix,
}

/// Text fragments making up a platform's launchers.
#[derive(Debug)]
pub struct ScriptTemplate {
    pub extension: &'static str,
    /// Prefix used to run a program from the current directory
    pub local_prefix: &'static str,
    pub node_header: &'static str,
    /// Keeps a spawned console window open after the client exits
    pub node_footer: &'static str,
    pub start_header: &'static str,
    /// `{dir}` and `{script}` are substituted per node
    pub start_line: &'static str,
    pub default_client: &'static str,
    /// Mode applied to written scripts, if the platform has one
    pub mode: Option<u32>,
}

static WINDOWS: ScriptTemplate = ScriptTemplate {
    extension: "bat",
    local_prefix: ".\\",
    node_header: "",
    node_footer: "\npause",
    start_header: "@echo off\n",
    start_line: "start /D \".\\{dir}\" {script}\n",
    default_client: "whisper_client.exe",
    mode: None,
};

static UNIX: ScriptTemplate = ScriptTemplate {
    extension: "sh",
    local_prefix: "./",
    node_header: "#!/bin/bash\n",
    node_footer: "\n",
    start_header: "#!/bin/sh\n",
    start_line: "(cd ./{dir} && sh ./{script})\n",
    default_client: "whisper_client",
    mode: Some(0o755),
};

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    pub fn template(self) -> &'static ScriptTemplate {
        match self {
            Platform::Windows => &WINDOWS,
            Platform::Unix => &UNIX,
        }
    }

    pub fn default_client_program(self) -> &'static str {
        self.template().default_client
    }

    /// `<base>.<ext>` for this platform.
    pub fn script_file_name(self, base: &str) -> String {
        format!("{}.{}", base, self.template().extension)
    }

    /// Launcher for one node: runs the client in discovery + automated mode.
    pub fn node_launcher(self, client_program: &str, name: &str, listen_addr: &str) -> String {
        let t = self.template();
        format!(
            "{}{}{} clientstart -name {} -discovery -addr {} -automode{}",
            t.node_header, t.local_prefix, client_program, name, listen_addr, t.node_footer
        )
    }

    /// Launcher that starts every node's launcher, in roster order.
    pub fn start_launcher<'a>(
        self,
        node_dirs: impl IntoIterator<Item = &'a str>,
        node_script: &str,
    ) -> String {
        let t = self.template();
        let script = self.script_file_name(node_script);
        let mut out = String::from(t.start_header);
        for dir in node_dirs {
            out.push_str(&t.start_line.replace("{dir}", dir).replace("{script}", &script));
        }
        out
    }

    /// Write `content` to `<dir>/<base>.<ext>`, replacing any previous script.
    pub fn write_script(self, dir: &Path, base: &str, content: &str) -> Result<PathBuf, FsError> {
        let path = dir.join(self.script_file_name(base));
        std::fs::write(&path, content).map_err(FsError::io(&path))?;
        if let Some(mode) = self.template().mode {
            files::set_mode(&path, mode)?;
        }
        tracing::debug!(path = %path.display(), "wrote launcher script");
        Ok(path)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "windows"),
            Platform::Unix => write!(f, "unix"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown platform {0:?} (expected \"windows\" or \"unix\")")]
pub struct UnknownPlatform(String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "windows" => Ok(Platform::Windows),
            "unix" | "linux" | "macos" => Ok(Platform::Unix),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_windows_node_launcher_pauses() {
        let script = Platform::Windows.node_launcher("whisper_client.exe", "node1", "127.0.0.1:30301");
        assert_eq!(
            script,
            ".\\whisper_client.exe clientstart -name node1 -discovery -addr 127.0.0.1:30301 -automode\npause"
        );
    }

    #[test]
    fn test_unix_node_launcher() {
        let script = Platform::Unix.node_launcher("whisper_client", "node2", "127.0.0.1:30302");
        assert_eq!(
            script,
            "#!/bin/bash\n./whisper_client clientstart -name node2 -discovery -addr 127.0.0.1:30302 -automode\n"
        );
        assert!(!script.contains("pause"));
    }

    #[test]
    fn test_start_launchers() {
        let win = Platform::Windows.start_launcher(["node1", "node2"], "test");
        assert_eq!(
            win,
            "@echo off\nstart /D \".\\node1\" test.bat\nstart /D \".\\node2\" test.bat\n"
        );

        let unix = Platform::Unix.start_launcher(["node1", "node2"], "test");
        assert_eq!(
            unix,
            "#!/bin/sh\n(cd ./node1 && sh ./test.sh)\n(cd ./node2 && sh ./test.sh)\n"
        );
    }

    #[test]
    fn test_parse_platform() {
        assert_eq!("Windows".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!("linux".parse::<Platform>().unwrap(), Platform::Unix);
        assert!("beos".parse::<Platform>().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_script_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = Platform::Unix
            .write_script(tmp.path(), "test", "#!/bin/sh\n")
            .unwrap();
        assert_eq!(path, tmp.path().join("test.sh"));
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }
}
