//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::BufRead;
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use clap_complete::Shell;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::generator::PasswordOptions;
use crate::vault::{self, sort_by_title, SessionHandle, SessionManager};

/// Minimum master password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// passvault CLI: encrypted password vault.
#[derive(Parser)]
#[command(name = "passvault", about = "Encrypted password vault", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault file (overrides `vault_file` from config.toml)
    #[arg(long, env = "PASSVAULT_VAULT", global = true)]
    pub vault: Option<PathBuf>,

    /// Config directory (default: <platform config dir>/passvault)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Read passwords from stdin, one per line, instead of prompting
    #[arg(long, global = true)]
    pub password_stdin: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new, empty vault
    Init,

    /// Add a password entry
    Add {
        /// Entry title (e.g. "GitHub")
        title: String,
        /// Username or email
        #[arg(short, long, default_value = "")]
        username: String,
        /// Website URL
        #[arg(long)]
        url: Option<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        #[command(flatten)]
        generate: GenerateFlag,
    },

    /// List all entries
    List {
        /// Show passwords in the table
        #[arg(long)]
        show_passwords: bool,
    },

    /// Show one entry
    Show {
        /// Entry id, or its number from `list`
        entry: String,
        /// Reveal the password
        #[arg(short, long)]
        password: bool,
    },

    /// Change fields of an entry (prompts for each field if none given)
    Edit {
        /// Entry id, or its number from `list`
        entry: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        username: Option<String>,
        /// Prompt for a new password
        #[arg(short, long)]
        password: bool,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Replace the tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        #[command(flatten)]
        generate: GenerateFlag,
    },

    /// Delete an entry permanently
    Delete {
        /// Entry id, or its number from `list`
        entry: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Generate random passwords (no vault needed)
    Generate {
        #[command(flatten)]
        options: GeneratorArgs,
        /// How many passwords to print
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=50))]
        count: u8,
    },

    /// Interactive session: unlock once, run several commands
    Shell,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Shortest password `generate` will produce on request.
pub const MIN_GENERATED_LENGTH: u16 = 4;

/// `--generate [--length N]` for commands that set an entry password.
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct GenerateFlag {
    /// Generate the entry password instead of prompting for it
    #[arg(short, long)]
    pub generate: bool,

    /// Length of the generated password
    #[arg(short, long, default_value_t = 16, requires = "generate",
          value_parser = clap::value_parser!(u16).range(i64::from(MIN_GENERATED_LENGTH)..))]
    pub length: u16,
}

impl GenerateFlag {
    pub fn options(&self) -> PasswordOptions {
        PasswordOptions {
            length: usize::from(self.length),
            ..PasswordOptions::default()
        }
    }
}

/// Character-class switches for `passvault generate`.
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct GeneratorArgs {
    /// Password length
    #[arg(short, long, default_value_t = 16, value_parser = clap::value_parser!(u16).range(i64::from(MIN_GENERATED_LENGTH)..))]
    pub length: u16,
    /// Leave out uppercase letters
    #[arg(long)]
    pub no_upper: bool,
    /// Leave out lowercase letters
    #[arg(long)]
    pub no_lower: bool,
    /// Leave out digits
    #[arg(long)]
    pub no_numbers: bool,
    /// Leave out symbols
    #[arg(long)]
    pub no_symbols: bool,
    /// Allow look-alike characters (0 O 1 l I |)
    #[arg(long)]
    pub ambiguous: bool,
}

impl From<GeneratorArgs> for PasswordOptions {
    fn from(args: GeneratorArgs) -> Self {
        PasswordOptions {
            length: usize::from(args.length),
            include_lower: !args.no_lower,
            include_upper: !args.no_upper,
            include_numbers: !args.no_numbers,
            include_symbols: !args.no_symbols,
            exclude_ambiguous: !args.ambiguous,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Settings and the resolved vault path for one invocation.
pub struct Context {
    pub settings: Settings,
    pub vault_path: PathBuf,
}

impl Context {
    /// Resolve the config directory, load `config.toml` and apply the
    /// `--vault` override.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_dir = match &cli.config_dir {
            Some(dir) => dir.clone(),
            None => Settings::default_config_dir()?,
        };
        let settings = Settings::load(&config_dir)?;
        let vault_path = match &cli.vault {
            Some(path) => path.clone(),
            None => settings.vault_path(&config_dir),
        };
        Ok(Self {
            settings,
            vault_path,
        })
    }

    /// A session manager using the configured idle timeout.
    pub fn session_manager(&self) -> SessionManager {
        SessionManager::new(self.settings.session_timeout())
    }

    /// Fail early, with a hint, when there is nothing to unlock.
    pub fn require_vault(&self) -> Result<()> {
        if !vault::vault_exists(&self.vault_path) {
            output::tip("Run `passvault init` to create a vault.");
            return Err(VaultError::VaultNotFound(self.vault_path.clone()));
        }
        Ok(())
    }
}

/// Prompt for the master password and open a session on the vault.
pub fn unlock<'m>(
    cli: &Cli,
    ctx: &Context,
    manager: &'m SessionManager,
) -> Result<SessionHandle<'m>> {
    ctx.require_vault()?;
    let password = prompt_password(cli)?;
    manager.open(password.as_bytes(), &ctx.vault_path)
}

/// Get the master password, from stdin with `--password-stdin` or an
/// interactive prompt otherwise.
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password(cli: &Cli) -> Result<Zeroizing<String>> {
    prompt_secret(cli, "Master password")
}

/// Prompt for a new master password with confirmation (used during `init`).
///
/// Enforces a minimum password length.
pub fn prompt_new_password(cli: &Cli) -> Result<Zeroizing<String>> {
    if cli.password_stdin {
        let pw = read_stdin_line()?;
        if pw.chars().count() < MIN_PASSWORD_LEN {
            return Err(VaultError::CommandFailed(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        return Ok(pw);
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose master password")
            .with_confirmation(
                "Confirm master password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
        let password = Zeroizing::new(password);

        if password.chars().count() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(password);
    }
}

/// Read any secret (master or entry password) without echo.
pub fn prompt_secret(cli: &Cli, prompt: &str) -> Result<Zeroizing<String>> {
    if cli.password_stdin {
        return read_stdin_line();
    }

    let pw = dialoguer::Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Next line of stdin, without its line ending.
fn read_stdin_line() -> Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    let read = std::io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Err(VaultError::CommandFailed(
            "expected a password on stdin, got end of input".into(),
        ));
    }
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(line)
}

/// Resolve what the user typed to an entry id.
///
/// An exact id wins.  Otherwise a number is taken as a 1-based position
/// in the title-sorted listing.  Positions shift whenever entries are
/// added or removed, so they are only meaningful right after a `list`.
pub fn resolve_entry(session: &SessionHandle<'_>, reference: &str) -> Result<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(VaultError::InvalidEntryReference(String::new()));
    }

    match session.get_entry(reference) {
        Ok(entry) => return Ok(entry.id),
        Err(VaultError::EntryNotFound(_)) => {}
        Err(e) => return Err(e),
    }

    let Ok(position) = reference.parse::<usize>() else {
        return Err(VaultError::EntryNotFound(reference.to_string()));
    };

    let mut entries = session.list_entries()?;
    sort_by_title(&mut entries);
    position
        .checked_sub(1)
        .and_then(|i| entries.get(i))
        .map(|entry| entry.id.clone())
        .ok_or_else(|| VaultError::InvalidEntryReference(reference.to_string()))
}
