use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use legai::models::kinds::CrawlTarget;
use legai::{Command, run_with_config_path};

/// LegAI - legal portal harvester and chatbot action server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl the legal-document portal, the contract templates, or both
    Crawl {
        #[arg(value_enum, default_value_t = Target::All)]
        target: Target,
    },
    /// Serve the chatbot action webhook
    Serve,
    /// Re-classify stored documents without a type from their source URL
    Retype,
    /// Print tables, document counts per type and a few samples
    Inspect,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Legal,
    Contracts,
    All,
}

impl From<Commands> for Command {
    fn from(c: Commands) -> Self {
        match c {
            Commands::Crawl { target } => Command::Crawl(match target {
                Target::Legal => vec![CrawlTarget::Legal],
                Target::Contracts => vec![CrawlTarget::Contracts],
                Target::All => Vec::new(),
            }),
            Commands::Serve => Command::Serve,
            Commands::Retype => Command::Retype,
            Commands::Inspect => Command::Inspect,
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from `.env` file into std::env (optional)
    dotenv().ok();

    let args = Args::parse();
    run_with_config_path(&args.config, args.command.into()).await
}
