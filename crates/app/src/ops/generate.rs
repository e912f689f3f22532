use std::path::PathBuf;

use clap::Args;

use common::client::Client;
use common::platform::Platform;
use common::scenario::{Scenario, ScenarioError};

#[derive(Args, Debug, Clone)]
pub struct Generate {
    /// Built-in scenarios to generate (default: all of them, unless --file is given)
    pub scenarios: Vec<String>,

    /// Scenario definition (TOML) to generate; may be repeated
    #[arg(long = "file", short = 'f')]
    pub files: Vec<PathBuf>,

    /// Wipe existing scenario directories before generating
    #[arg(long)]
    pub force: bool,

    /// Override the configured launcher platform
    #[arg(long)]
    pub platform: Option<Platform>,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("unknown scenario {0:?} (see `wfx list`)")]
    UnknownScenario(String),

    #[error("template archive not found at {0} (see `wfx pack`)")]
    MissingTemplate(PathBuf),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error("{failures} fixture step(s) failed\n{report}")]
    Incomplete { failures: usize, report: String },
}

impl Generate {
    /// Scenarios to build, in command-line order.
    pub fn resolve(&self) -> Result<Vec<Scenario>, GenerateError> {
        if self.scenarios.is_empty() && self.files.is_empty() {
            return Ok(Scenario::builtin());
        }

        let mut scenarios = self
            .scenarios
            .iter()
            .map(|name| {
                Scenario::find_builtin(name)
                    .ok_or_else(|| GenerateError::UnknownScenario(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        for path in &self.files {
            scenarios.push(Scenario::from_toml_file(path)?);
        }
        Ok(scenarios)
    }

    pub fn run(
        &self,
        ctx: &crate::op::OpContext,
        client: &dyn Client,
    ) -> Result<String, GenerateError> {
        let scenarios = self.resolve()?;

        let mut config = ctx.config.clone();
        if let Some(platform) = self.platform {
            config.platform = platform;
        }

        let template = config.template_in(&ctx.work_dir);
        if !template.is_file() {
            return Err(GenerateError::MissingTemplate(template));
        }

        let mut output = String::new();
        let mut failures = 0;
        for scenario in &scenarios {
            let report = scenario.build(&ctx.work_dir, &config, client, self.force)?;
            failures += report.failures.len();
            output.push_str(&report.to_string());
        }

        let output = output.trim_end().to_string();
        if failures > 0 {
            return Err(GenerateError::Incomplete {
                failures,
                report: output,
            });
        }
        Ok(output)
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Generate {
    type Error = GenerateError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let client = ctx.config.process_client();
        self.run(ctx, &client)
    }
}
