//! `passvault delete` — remove an entry from the vault.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{resolve_entry, unlock, Cli, Context};
use crate::errors::{Result, VaultError};
use crate::vault::SessionHandle;

/// Execute the `delete` command.
pub fn execute(cli: &Cli, reference: &str, force: bool) -> Result<()> {
    let ctx = Context::load(cli)?;
    let manager = ctx.session_manager();
    let session = unlock(cli, &ctx, &manager)?;

    let result = remove(&session, reference, force);
    manager.close();
    result
}

/// Resolve, confirm, delete and persist.
pub fn remove(session: &SessionHandle<'_>, reference: &str, force: bool) -> Result<()> {
    let id = resolve_entry(session, reference)?;
    let entry = session.get_entry(&id)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete '{}' ({})? This cannot be undone.",
                entry.title, entry.username
            ))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let removed = session.delete_entry(&id)?;
    session.persist()?;

    output::success(&format!("Deleted '{}'", removed.title));
    Ok(())
}
