use clap::{Parser, Subcommand};

use snaplink::config::StaticConfig;
use snaplink::runtime::modes::run_server;
use snaplink::system::init_logging;

/// snaplink - URL shortener with batched click analytics
#[derive(Parser)]
#[command(name = "snaplink")]
#[command(version)]
#[command(about = "A small URL shortener service", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Print a sample configuration file
    GenerateConfig,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::GenerateConfig => {
            println!("{}", StaticConfig::generate_sample_config());
            Ok(())
        }
        Commands::Serve => {
            let config = StaticConfig::load(cli.config.as_deref());
            let _guard = init_logging(&config.logging)?;
            run_server(config).await
        }
    }
}
