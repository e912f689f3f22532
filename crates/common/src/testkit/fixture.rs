use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use walkdir::WalkDir;

use super::client::FakeClient;
use crate::client::Client;
use crate::config::{FixtureConfig, DEFAULT_TEMPLATE_FILE};
use crate::files;
use crate::platform::Platform;
use crate::scenario::{BuildReport, Scenario};

/// Executable shipped in the test template
pub const TEMPLATE_CLIENT: &str = "whisper_client";

/// Build `<dir>/templatenode.zip` with the skeleton a real template carries.
pub fn template_archive(dir: &Path) -> Result<PathBuf> {
    let skeleton = dir.join("template-skeleton");
    for sub in ["pubkeys", "bootnodes", "action", "keys", "log"] {
        fs::create_dir_all(skeleton.join(sub))?;
        fs::write(skeleton.join(sub).join(".keep"), "")?;
    }
    fs::write(skeleton.join("bootnodes").join("nodes.txt"), "")?;
    fs::write(skeleton.join("action").join("actionlist.txt"), "")?;
    fs::write(skeleton.join(TEMPLATE_CLIENT), "#!/bin/sh\nexit 0\n")?;

    let stem = DEFAULT_TEMPLATE_FILE.trim_end_matches(".zip");
    let archive = files::zip(&skeleton, &dir.join(stem))?;
    fs::remove_dir_all(&skeleton)?;
    Ok(archive)
}

/// A scratch work directory with a template archive in place
pub struct TestFixture {
    dir: tempfile::TempDir,
    pub config: FixtureConfig,
}

impl TestFixture {
    pub fn new(platform: Platform) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        template_archive(dir.path())?;
        Ok(Self {
            dir,
            config: FixtureConfig::for_platform(platform),
        })
    }

    pub fn work_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Build with the [`FakeClient`]
    pub fn build(&self, scenario: &Scenario, force: bool) -> Result<BuildReport> {
        self.build_with(scenario, &FakeClient, force)
    }

    pub fn build_with(
        &self,
        scenario: &Scenario,
        client: &dyn Client,
        force: bool,
    ) -> Result<BuildReport> {
        Ok(scenario.build(self.work_dir(), &self.config, client, force)?)
    }

    /// Read a file relative to the work directory
    pub fn read(&self, relative: impl AsRef<Path>) -> Result<String> {
        Ok(fs::read_to_string(self.work_dir().join(relative))?)
    }

    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.work_dir().join(relative).exists()
    }

    /// Every file under `relative`, keyed by path relative to it
    pub fn snapshot(&self, relative: impl AsRef<Path>) -> Result<BTreeMap<PathBuf, Vec<u8>>> {
        let root = self.work_dir().join(relative);
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(&root) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let key = entry.path().strip_prefix(&root)?.to_path_buf();
                files.insert(key, fs::read(entry.path())?);
            }
        }
        Ok(files)
    }
}
