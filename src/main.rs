use std::path::Path;

use clap::Parser;
use keepsake::cli::{commands, output, Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let result = match cli.command {
        Commands::Register {
            ref username,
            ref email,
        } => commands::register::execute(&cli, username, email),
        Commands::Login { ref username } => commands::login::execute(&cli, username),
        Commands::Add {
            ref username,
            kind,
            ref name,
            ref metadata,
            ref data,
            ref file,
        } => commands::add::execute(
            &cli,
            username,
            kind,
            name,
            metadata.as_deref(),
            data.as_deref(),
            file.as_deref(),
        ),
        Commands::Get { ref username, id } => commands::get::execute(&cli, username, id),
        Commands::List { ref username } => commands::list::execute(&cli, username),
        Commands::Delete {
            ref username,
            id,
            force,
        } => commands::delete::execute(&cli, username, id, force),
        Commands::Sync {
            ref username,
            ref cache_dir,
        } => commands::sync::execute(&cli, username, cache_dir.as_deref()),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Log filter precedence: RUST_LOG env var, then keepsake.toml, then
/// "info".
fn init_tracing(cli: &Cli) {
    use tracing_subscriber::EnvFilter;

    let configured = keepsake::config::Settings::load(Path::new(&cli.dir))
        .map(|s| s.log)
        .unwrap_or_else(|_| "info".to_string());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
