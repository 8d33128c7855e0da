//! `passvault init` — create a new, empty vault.

use crate::cli::output;
use crate::cli::{prompt_new_password, Cli, Context};
use crate::errors::{Result, VaultError};
use crate::vault;

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;

    // 1. Refuse to touch an existing container.
    if vault::vault_exists(&ctx.vault_path) {
        output::tip("Use `passvault add` to add entries to the existing vault.");
        return Err(VaultError::VaultAlreadyExists(ctx.vault_path));
    }

    // 2. Prompt for a new master password (with confirmation).
    let password = prompt_new_password(cli)?;

    // 3. Derive, hash and write the empty container.
    vault::create(
        &ctx.vault_path,
        password.as_bytes(),
        &ctx.settings.kdf_profile(),
    )?;
    output::success(&format!("Vault created at {}", ctx.vault_path.display()));

    output::tip("Run `passvault add <TITLE>` to add an entry.");
    output::tip("Run `passvault generate` for a strong random password.");
    output::warning("There is no way to recover a forgotten master password.");

    Ok(())
}
