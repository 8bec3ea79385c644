use clap::Parser;
use tracing_subscriber::EnvFilter;

use strongbox::cli::commands;
use strongbox::cli::{Cli, Commands};
use strongbox::list::ListOptions;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init {
            recover,
            hash,
            ref git_url,
        } => commands::init::execute(&cli, recover, hash, git_url.as_deref()),
        Commands::Insert { ref name, force } => commands::insert::execute(&cli, name, force),
        Commands::Show { ref name, clip } => commands::show::execute(&cli, name, clip),
        Commands::List {
            ref subfolder,
            flat,
            details,
            depth,
            ref filter,
        } => {
            let opts = ListOptions {
                flat,
                details,
                max_depth: depth,
                filter: filter.clone(),
            };
            commands::list::execute(&cli, subfolder.as_deref(), &opts)
        }
        Commands::Find { ref text } => commands::list::find(&cli, text),
        Commands::Remove { ref name, force } => commands::remove::execute(&cli, name, force),
        Commands::Edit { ref name } => commands::edit::execute(&cli, name),
        Commands::Generate {
            ref name,
            length,
            no_symbols,
            force,
            clip,
        } => commands::generate::execute(&cli, name, length, !no_symbols, force, clip),
        Commands::Cache { ref action } => commands::cache_cmd::execute(&cli, action),
        Commands::Git { ref action } => commands::git_cmd::execute(&cli, action),
        Commands::Completions { shell } => commands::completions::execute(shell),
    };

    if let Err(e) = result {
        strongbox::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Log to stderr.  `RUST_LOG` overrides `-v`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("strongbox={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
