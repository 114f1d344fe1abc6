use anyhow::Result;
use clap::Parser;
use stego_cli::cli::Cli;
use stego_cli::{commands, StegoConfig};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志，RUST_LOG 可进一步调整
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("chess_stego={}", level).parse()?)
                .add_directive(format!("stego_cli={}", level).parse()?),
        )
        .init();

    let config = StegoConfig::load(cli.config.as_deref()).await?;
    debug!("配置: {:?}", config);

    commands::run(cli.command, &config).await
}
