use catalog_scout::Cli;
use clap::Parser;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = catalog_scout::run(cli).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}
