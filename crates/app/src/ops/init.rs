use std::path::PathBuf;

use clap::Args;

use common::config::{ConfigError, FixtureConfig};
use common::platform::Platform;

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Launcher flavour to generate (default: the host platform)
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Template archive, relative to the work directory (default: templatenode.zip)
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Client executable name inside the template (default: per platform)
    #[arg(long)]
    pub client_program: Option<String>,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("config already exists at {0} (use --force to overwrite)")]
    AlreadyInitialized(PathBuf),

    #[error("init failed: {0}")]
    Config(#[from] ConfigError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        if ctx.config_path.exists() && !self.force {
            return Err(InitError::AlreadyInitialized(ctx.config_path.clone()));
        }

        let mut config = FixtureConfig::for_platform(self.platform.unwrap_or_default());
        if let Some(template) = &self.template {
            config.template_path = template.clone();
        }
        config.client_program = self.client_program.clone();
        config.save(&ctx.config_path)?;

        Ok(format!(
            "Initialized fixture config at: {}\n\
             - Platform: {}\n\
             - Template: {}\n\
             - Client: {}\n\
             - Launchers: {} / {}",
            ctx.config_path.display(),
            config.platform,
            config.template_in(&ctx.work_dir).display(),
            config.client_program(),
            config.platform.script_file_name(&config.node_script),
            config.platform.script_file_name(&config.start_script),
        ))
    }
}
