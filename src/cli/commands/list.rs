//! `passvault list` — show every entry as a numbered table.

use crate::cli::output;
use crate::cli::{unlock, Cli, Context};
use crate::errors::Result;
use crate::vault::{sort_by_title, SessionHandle};

/// Execute the `list` command.
pub fn execute(cli: &Cli, show_passwords: bool) -> Result<()> {
    let ctx = Context::load(cli)?;
    let manager = ctx.session_manager();
    let session = unlock(cli, &ctx, &manager)?;

    print(&session, show_passwords)?;
    manager.close();
    Ok(())
}

/// Print the title-sorted table for an open session.
pub fn print(session: &SessionHandle<'_>, show_passwords: bool) -> Result<()> {
    let mut entries = session.list_entries()?;
    sort_by_title(&mut entries);
    output::print_entries_table(&entries, show_passwords);
    Ok(())
}
