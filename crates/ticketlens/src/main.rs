mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project = match cli.project_path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init => commands::init::run(&project),
        Commands::Check => commands::check::run(&project),
        Commands::Prepare(args) => commands::prepare::run(&project, &args),
        Commands::Refine { ticket_id } => commands::refine::run(&project, &ticket_id),
        Commands::Prevalence { ticket_id } => commands::prevalence::run(&project, &ticket_id),
        Commands::Status { ticket_id } => commands::status::run(&project, ticket_id.as_deref()),
        Commands::Version => commands::version::run(),
    }
}
