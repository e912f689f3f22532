use std::path::PathBuf;

use clap::Args;

use common::files::{self, FsError};

#[derive(Args, Debug, Clone)]
pub struct Pack {
    /// Skeleton directory to archive (node layout + client binary)
    pub src: PathBuf,

    /// Archive path without the .zip extension (default: the configured template)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("pack failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Pack {
    type Error = PackError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        if !self.src.is_dir() {
            return Err(PackError::NotADirectory(self.src.clone()));
        }

        let output = match &self.output {
            Some(path) => path.clone(),
            None => ctx.config.template_in(&ctx.work_dir).with_extension(""),
        };
        let archive = files::zip(&self.src, &output)?;

        Ok(format!(
            "Packed {} into {}",
            self.src.display(),
            archive.display()
        ))
    }
}
