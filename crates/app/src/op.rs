use std::error::Error;
use std::path::{Path, PathBuf};

use common::config::{ConfigError, FixtureConfig, CONFIG_FILE_NAME};

/// Resolve the config file path.
///
/// Priority: explicit `--config` flag > `<work-dir>/wfx.toml`.
pub fn resolve_config_path(explicit: Option<PathBuf>, work_dir: &Path) -> PathBuf {
    explicit.unwrap_or_else(|| work_dir.join(CONFIG_FILE_NAME))
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("can't resolve work directory: {0}")]
    WorkDir(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone)]
pub struct OpContext {
    /// Directory scenarios, the template and the config live in
    pub work_dir: PathBuf,
    /// Where the config was (or would be) loaded from
    pub config_path: PathBuf,
    /// Loaded configuration, or the defaults if no file exists yet
    pub config: FixtureConfig,
}

impl OpContext {
    /// Create context for a work directory and optional config path
    pub fn new(work_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self, ContextError> {
        let work_dir = match work_dir {
            Some(dir) => std::path::absolute(dir)?,
            None => std::env::current_dir()?,
        };
        let config_path = resolve_config_path(config_path, &work_dir);
        let config = FixtureConfig::load_or_default(&config_path)?;

        Ok(Self {
            work_dir,
            config_path,
            config,
        })
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
