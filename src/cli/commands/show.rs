//! `passvault show` — print one entry.

use crate::cli::output;
use crate::cli::{resolve_entry, unlock, Cli, Context};
use crate::errors::Result;
use crate::vault::SessionHandle;

/// Execute the `show` command.
pub fn execute(cli: &Cli, reference: &str, reveal_password: bool) -> Result<()> {
    let ctx = Context::load(cli)?;
    let manager = ctx.session_manager();
    let session = unlock(cli, &ctx, &manager)?;

    print(&session, reference, reveal_password)?;
    manager.close();
    Ok(())
}

/// Resolve, view and print an entry, then save the new access time.
pub fn print(session: &SessionHandle<'_>, reference: &str, reveal_password: bool) -> Result<()> {
    let id = resolve_entry(session, reference)?;
    let entry = session.view_entry(&id)?;
    session.persist()?;

    output::print_entry(&entry, reveal_password);
    if !reveal_password {
        output::tip("Pass --password to reveal the password.");
    }
    Ok(())
}
