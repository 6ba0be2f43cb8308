use clap::Parser;
use texttools_cli::{cli::Cli, commands, config::AppConfig, logging};
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let mut cfg = match AppConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(target = "texttools", error = %format!("{err:#}"), "invalid configuration");
            std::process::exit(1);
        }
    };
    if let Some(rpc_url) = cli.rpc_url {
        cfg.network.rpc_url = rpc_url;
    }

    if let Err(err) = commands::dispatch(cli.command, &cfg).await {
        error!(target = "texttools", error = %err, "command failed");
        std::process::exit(1);
    }
}
