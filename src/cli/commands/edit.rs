//! `passvault edit` — change fields of an existing entry.

use dialoguer::{Confirm, Input};
use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{prompt_secret, resolve_entry, unlock, Cli, Context, GenerateFlag};
use crate::errors::{Result, VaultError};
use crate::generator::generate_password;
use crate::vault::Entry;

/// Requested changes.  `None` / empty means "leave as is".
pub struct EntryChanges<'a> {
    pub title: Option<&'a str>,
    pub username: Option<&'a str>,
    pub url: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub tags: &'a [String],
    /// Prompt for a new password.
    pub new_password: bool,
    pub generate: GenerateFlag,
}

impl EntryChanges<'_> {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.username.is_none()
            && self.url.is_none()
            && self.notes.is_none()
            && self.tags.is_empty()
            && !self.new_password
            && !self.generate.generate
    }
}

/// Execute the `edit` command.
pub fn execute(cli: &Cli, reference: &str, changes: &EntryChanges<'_>) -> Result<()> {
    let ctx = Context::load(cli)?;
    let manager = ctx.session_manager();
    let session = unlock(cli, &ctx, &manager)?;

    let id = resolve_entry(&session, reference)?;
    let mut entry = session.get_entry(&id)?;

    if changes.is_empty() {
        edit_interactively(cli, &mut entry)?;
    } else {
        apply(&mut entry, changes);
        if changes.generate.generate {
            entry.password = generate_password(&changes.generate.options());
        } else if changes.new_password {
            let password = prompt_secret(cli, &format!("New password for '{}'", entry.title))?;
            entry.password = password.as_str().to_owned();
        }
    }

    let stored = session.update_entry(entry)?;
    session.persist()?;
    manager.close();

    output::success(&format!("Updated '{}'", stored.title));
    Ok(())
}

/// Copy the non-password changes onto `entry`.  An empty URL or notes
/// value clears the field.
fn apply(entry: &mut Entry, changes: &EntryChanges<'_>) {
    if let Some(title) = changes.title {
        entry.title = title.to_string();
    }
    if let Some(username) = changes.username {
        entry.username = username.to_string();
    }
    if let Some(url) = changes.url {
        entry.url = non_empty(url);
    }
    if let Some(notes) = changes.notes {
        entry.notes = non_empty(notes);
    }
    if !changes.tags.is_empty() {
        entry.tags = changes.tags.to_vec();
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Walk through each field with the current value pre-filled.
fn edit_interactively(cli: &Cli, entry: &mut Entry) -> Result<()> {
    let ask = |prompt: &str, current: &str, allow_empty: bool| -> Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .with_initial_text(current)
            .allow_empty(allow_empty)
            .interact_text()
            .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))
    };

    entry.title = ask("Title", &entry.title, false)?;
    entry.username = ask("Username", &entry.username, true)?;
    entry.url = non_empty(&ask("URL", entry.url.as_deref().unwrap_or(""), true)?);
    entry.notes = non_empty(&ask("Notes", entry.notes.as_deref().unwrap_or(""), true)?);

    let change_password = Confirm::new()
        .with_prompt("Change password?")
        .default(false)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;
    if change_password {
        let password: Zeroizing<String> = prompt_secret(cli, "New password")?;
        entry.password = password.as_str().to_owned();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_generate() -> GenerateFlag {
        GenerateFlag {
            generate: false,
            length: 16,
        }
    }

    fn changes<'a>() -> EntryChanges<'a> {
        EntryChanges {
            title: None,
            username: None,
            url: None,
            notes: None,
            tags: &[],
            new_password: false,
            generate: no_generate(),
        }
    }

    #[test]
    fn no_flags_means_no_changes() {
        assert!(changes().is_empty());
        assert!(!EntryChanges {
            new_password: true,
            ..changes()
        }
        .is_empty());
    }

    #[test]
    fn apply_only_touches_given_fields() {
        let mut entry = Entry::new("GitHub", "me", "pw").with_url("https://github.com");
        apply(
            &mut entry,
            &EntryChanges {
                username: Some("octocat"),
                ..changes()
            },
        );
        assert_eq!(entry.title, "GitHub");
        assert_eq!(entry.username, "octocat");
        assert_eq!(entry.url.as_deref(), Some("https://github.com"));
        assert_eq!(entry.password, "pw");
    }

    #[test]
    fn empty_url_and_notes_clear_the_field() {
        let mut entry = Entry::new("GitHub", "me", "pw")
            .with_url("https://github.com")
            .with_notes("2FA on");
        apply(
            &mut entry,
            &EntryChanges {
                url: Some(""),
                notes: Some("  "),
                ..changes()
            },
        );
        assert_eq!(entry.url, None);
        assert_eq!(entry.notes, None);
    }

    #[test]
    fn tags_are_replaced_not_merged() {
        let mut entry = Entry::new("GitHub", "me", "pw").with_tags(["dev", "work"]);
        let tags = vec!["personal".to_string()];
        apply(
            &mut entry,
            &EntryChanges {
                tags: &tags,
                ..changes()
            },
        );
        assert_eq!(entry.tags, ["personal"]);
    }
}
