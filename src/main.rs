use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use passvault::cli::commands::{
    add, completions, delete, edit, generate, init, list, shell, show,
};
use passvault::cli::{Cli, Commands};

/// Log to stderr; stdout carries command output.
///
/// `PASSVAULT_LOG` takes a full filter (e.g. `passvault=debug`); `-v`
/// flags raise the default level when it is unset.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("PASSVAULT_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init => init::execute(&cli),
        Commands::Add {
            ref title,
            ref username,
            ref url,
            ref notes,
            ref tags,
            generate: flag,
        } => add::execute(
            &cli,
            &add::NewEntry {
                title,
                username,
                url: url.as_deref(),
                notes: notes.as_deref(),
                tags,
                generate: flag,
            },
        ),
        Commands::List { show_passwords } => list::execute(&cli, show_passwords),
        Commands::Show {
            ref entry,
            password,
        } => show::execute(&cli, entry, password),
        Commands::Edit {
            ref entry,
            ref title,
            ref username,
            password,
            ref url,
            ref notes,
            ref tags,
            generate: flag,
        } => edit::execute(
            &cli,
            entry,
            &edit::EntryChanges {
                title: title.as_deref(),
                username: username.as_deref(),
                url: url.as_deref(),
                notes: notes.as_deref(),
                tags,
                new_password: password,
                generate: flag,
            },
        ),
        Commands::Delete { ref entry, force } => delete::execute(&cli, entry, force),
        Commands::Generate { options, count } => generate::execute(options.into(), count),
        Commands::Shell => shell::execute(&cli),
        Commands::Completions { shell: target } => completions::execute(target),
    };

    if let Err(e) = result {
        passvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
