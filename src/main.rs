// src/main.rs

use cmdrun::config::load_or_default;
use cmdrun::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("cmdrun error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    let config = load_or_default(&args.config)?;
    let _log_guard = logging::init_logging(args.log_level, config.security())?;
    run(args, config).await
}
