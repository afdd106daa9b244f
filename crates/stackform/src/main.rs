mod commands;

use clap::{Parser, Subcommand};
use stackform_cloud::{OrderingStrategy, StackStatus};
use stackform_config::Settings;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stackform")]
#[command(about = "Declarative DigitalOcean stacks from YAML templates", long_about = None)]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create every resource declared in a template
    Create {
        /// Template file (YAML)
        template: PathBuf,
        /// Stack name, attached as a tag to created droplets
        #[arg(short, long)]
        name: String,
        /// Build order: priority or dependency_graph
        #[arg(long)]
        ordering: Option<OrderingStrategy>,
    },
    /// Check a template without calling the provider
    Validate {
        /// Template file (YAML)
        template: PathBuf,
        /// Stack name used for tags
        #[arg(short, long, default_value = "validate")]
        name: String,
        /// Build order: priority or dependency_graph
        #[arg(long)]
        ordering: Option<OrderingStrategy>,
    },
    /// Show the order resources would be created in
    Plan {
        /// Template file (YAML)
        template: PathBuf,
        /// Build order: priority or dependency_graph
        #[arg(long)]
        ordering: Option<OrderingStrategy>,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("stackform {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut settings = Settings::load()?;
    debug!(
        ordering = %settings.ordering,
        api_base_url = %settings.api_base_url,
        "Settings loaded"
    );

    match cli.command {
        Commands::Create {
            template,
            name,
            ordering,
        } => {
            if let Some(ordering) = ordering {
                settings.ordering = ordering;
            }
            let status = commands::create::handle(&template, &name, &settings, cli.json).await?;
            match status {
                StackStatus::Created => {}
                StackStatus::PartiallyFailed => std::process::exit(2),
                StackStatus::Failed => std::process::exit(1),
            }
        }
        Commands::Validate {
            template,
            name,
            ordering,
        } => {
            if let Some(ordering) = ordering {
                settings.ordering = ordering;
            }
            if !commands::validate::handle(&template, &name, &settings, cli.json)? {
                std::process::exit(1);
            }
        }
        Commands::Plan { template, ordering } => {
            if let Some(ordering) = ordering {
                settings.ordering = ordering;
            }
            commands::plan::handle(&template, &settings, cli.json)?;
        }
        Commands::Version => {
            unreachable!("Version is handled before settings are loaded");
        }
    }

    Ok(())
}
