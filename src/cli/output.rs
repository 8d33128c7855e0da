//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::Entry;

/// Shown instead of a password unless the user asks to reveal it.
const MASK: &str = "********";

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Print entries as a numbered table, in the order given.
///
/// The `#` column is what `show`, `edit` and `delete` accept in place of
/// an id.
pub fn print_entries_table(entries: &[Entry], show_passwords: bool) {
    if entries.is_empty() {
        info("No entries in this vault yet.");
        tip("Run `passvault add <TITLE>` to add your first entry.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let mut header = vec!["#", "Title", "Username", "URL"];
    if show_passwords {
        header.push("Password");
    }
    header.push("Updated");
    table.set_header(header);

    for (i, e) in entries.iter().enumerate() {
        let mut row = vec![
            (i + 1).to_string(),
            e.title.clone(),
            e.username.clone(),
            e.url.clone().unwrap_or_default(),
        ];
        if show_passwords {
            row.push(e.password.clone());
        }
        row.push(timestamp(&e.updated_at));
        table.add_row(row);
    }

    println!("{table}");
}

/// Print every field of one entry.
pub fn print_entry(entry: &Entry, reveal_password: bool) {
    let label = |name: &str| style(format!("{name:>10}")).bold();

    println!("{} {}", label("Title:"), entry.title);
    println!("{} {}", label("Id:"), style(&entry.id).dim());
    println!("{} {}", label("Username:"), entry.username);
    if reveal_password {
        println!("{} {}", label("Password:"), entry.password);
    } else {
        println!("{} {}", label("Password:"), style(MASK).dim());
    }
    if let Some(url) = &entry.url {
        println!("{} {}", label("URL:"), url);
    }
    if !entry.tags.is_empty() {
        println!("{} {}", label("Tags:"), entry.tags.join(", "));
    }
    for (key, value) in &entry.custom {
        println!("{} {}", label(&format!("{key}:")), value);
    }
    if let Some(notes) = &entry.notes {
        println!("{}", label("Notes:"));
        for line in notes.lines() {
            println!("           {line}");
        }
    }
    println!("{} {}", label("Created:"), timestamp(&entry.created_at));
    println!("{} {}", label("Updated:"), timestamp(&entry.updated_at));
    println!("{} {}", label("Accessed:"), timestamp(&entry.accessed_at));
}
