//! `passvault shell` — unlock once, then run commands until `quit`.
//!
//! Every command goes through `SessionManager::current`, so the idle
//! timeout from `config.toml` applies between commands.  When the
//! session has expired (or was locked with `lock`) the master password
//! is asked for again before the command runs.

use std::io::{self, BufRead, Write};

use tracing::debug;
use zeroize::Zeroizing;

use crate::cli::commands::{delete, list, show};
use crate::cli::output;
use crate::cli::{prompt_secret, unlock, Cli, Context, MIN_GENERATED_LENGTH};
use crate::errors::{Result, VaultError};
use crate::generator::{generate_password, PasswordOptions};
use crate::vault::{Entry, SessionHandle, SessionManager, SessionState};

const HELP: &str = "\
Commands:
  list [-p]                  list entries (-p shows passwords)
  show <id|#> [-p]           show an entry (-p reveals the password)
  add <title> [username]     add an entry (password is prompted for)
  gen <title> [username]     add an entry with a generated password
  delete <id|#> [-f]         delete an entry (-f skips confirmation)
  generate [length]          print a random password
  lock                       lock the vault now
  help                       show this help
  quit                       lock and leave";

/// Execute the `shell` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let manager = ctx.session_manager();

    unlock(cli, &ctx, &manager)?;
    output::success("Vault unlocked.");
    output::tip(&format!(
        "Type `help` for commands. The vault locks after {} idle minute(s).",
        ctx.settings.session_timeout_minutes
    ));

    let stdin = io::stdin();
    loop {
        print!("passvault> ");
        io::stdout().flush()?;

        let mut line = Zeroizing::new(String::new());
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            continue;
        };

        match command {
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "lock" => {
                manager.close();
                output::info("Vault locked.");
            }
            _ => {
                let Some(session) = current_or_unlock(cli, &ctx, &manager) else {
                    continue;
                };
                if let Err(e) = run(cli, &session, command, args) {
                    output::error(&e.to_string());
                }
            }
        }
    }

    manager.close();
    Ok(())
}

/// The live session, or a freshly unlocked one.  Unlock failures are
/// reported and yield `None`.
fn current_or_unlock<'m>(
    cli: &Cli,
    ctx: &Context,
    manager: &'m SessionManager,
) -> Option<SessionHandle<'m>> {
    let before = manager.state();
    if let Some(session) = manager.current() {
        return Some(session);
    }

    if before == SessionState::Expired {
        output::warning("Session expired after inactivity. Unlock to continue.");
    } else {
        output::info("Vault is locked. Unlock to continue.");
    }
    match unlock(cli, ctx, manager) {
        Ok(session) => Some(session),
        Err(e) => {
            output::error(&e.to_string());
            None
        }
    }
}

/// Parse a `generate` length with the same bounds as `passvault generate --length`.
fn parse_length(arg: &str) -> Result<usize> {
    match arg.parse::<u16>() {
        Ok(n) if n >= MIN_GENERATED_LENGTH => Ok(usize::from(n)),
        _ => Err(VaultError::CommandFailed(format!(
            "'{arg}' is not a valid length (use {MIN_GENERATED_LENGTH} to {})",
            u16::MAX
        ))),
    }
}

fn run(cli: &Cli, session: &SessionHandle<'_>, command: &str, args: &[&str]) -> Result<()> {
    debug!(command, "shell command");
    let has_flag = |short: &str, long: &str| args.iter().any(|a| *a == short || *a == long);
    let positional: Vec<&str> = args
        .iter()
        .copied()
        .filter(|a| !a.starts_with('-'))
        .collect();

    match (command, positional.as_slice()) {
        ("list" | "ls", _) => list::print(session, has_flag("-p", "--show-passwords")),
        ("show", [reference, ..]) => show::print(session, reference, has_flag("-p", "--password")),
        ("delete" | "rm", [reference, ..]) => {
            delete::remove(session, reference, has_flag("-f", "--force"))
        }
        ("add", [title, rest @ ..]) => {
            let password = prompt_secret(cli, &format!("Password for '{title}'"))?;
            add(session, title, rest.first().copied(), password)
        }
        ("gen", [title, rest @ ..]) => {
            let password = Zeroizing::new(generate_password(&PasswordOptions::default()));
            add(session, title, rest.first().copied(), password)
        }
        ("generate", rest) => {
            let length = match rest.first() {
                Some(n) => parse_length(n)?,
                None => PasswordOptions::default().length,
            };
            let options = PasswordOptions {
                length,
                ..PasswordOptions::default()
            };
            println!("{}", generate_password(&options));
            Ok(())
        }
        ("show" | "delete" | "rm" | "add" | "gen", []) => Err(VaultError::CommandFailed(format!(
            "`{command}` needs an argument; type `help` for usage"
        ))),
        _ => Err(VaultError::CommandFailed(format!(
            "unknown command '{command}'; type `help` for usage"
        ))),
    }
}

fn add(
    session: &SessionHandle<'_>,
    title: &str,
    username: Option<&str>,
    password: Zeroizing<String>,
) -> Result<()> {
    let entry = Entry::new(title, username.unwrap_or(""), password.as_str());
    let id = entry.id.clone();
    session.add_entry(entry)?;
    session.persist()?;
    output::success(&format!("Added '{title}' ({id})"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_length_uses_the_cli_bounds() {
        assert_eq!(parse_length("4").unwrap(), 4);
        assert_eq!(parse_length("65535").unwrap(), 65_535);

        for bad in ["0", "3", "65536", "99999999999999999999", "-1", "ten"] {
            assert!(
                matches!(parse_length(bad), Err(VaultError::CommandFailed(_))),
                "'{bad}' was accepted"
            );
        }
    }
}
