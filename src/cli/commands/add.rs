//! `passvault add` — store a new password entry.

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{prompt_secret, unlock, Cli, Context, GenerateFlag};
use crate::errors::Result;
use crate::generator::generate_password;
use crate::vault::Entry;

/// Fields for a new entry, as given on the command line.
pub struct NewEntry<'a> {
    pub title: &'a str,
    pub username: &'a str,
    pub url: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub tags: &'a [String],
    pub generate: GenerateFlag,
}

/// Execute the `add` command.
pub fn execute(cli: &Cli, new: &NewEntry<'_>) -> Result<()> {
    let ctx = Context::load(cli)?;
    let manager = ctx.session_manager();
    let session = unlock(cli, &ctx, &manager)?;

    // Entry password: generated, or prompted for.
    let password = if new.generate.generate {
        Zeroizing::new(generate_password(&new.generate.options()))
    } else {
        prompt_secret(cli, &format!("Password for '{}'", new.title))?
    };

    let mut entry = Entry::new(new.title, new.username, password.as_str())
        .with_tags(new.tags.iter().cloned());
    if let Some(url) = new.url {
        entry = entry.with_url(url);
    }
    if let Some(notes) = new.notes {
        entry = entry.with_notes(notes);
    }
    let id = entry.id.clone();

    session.add_entry(entry)?;
    session.persist()?;
    manager.close();

    output::success(&format!("Added '{}' ({id})", new.title));
    if new.generate.generate {
        output::tip(&format!(
            "Generated a {}-character password. Run `passvault show {id} --password` to see it.",
            new.generate.length
        ));
    }

    Ok(())
}
