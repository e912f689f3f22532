// CLI modules
mod args;
mod op;
mod ops;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Generate, Init, List, Pack, Version};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

command_enum! {
    (Generate, Generate),
    (Init, Init),
    (List, List),
    (Pack, Pack),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logs go to stderr so command output stays clean on stdout
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let log_level: tracing::Level = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();

    let ctx = match op::OpContext::new(args.work_dir, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to load fixture context: {}", e);
            std::process::exit(1);
        }
    };

    // std::process::exit skips destructors, so flush the log writer first
    let result = args.command.execute(&ctx).await;
    drop(guard);

    match result {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
