//! One module per subcommand.
//!
//! Commands that touch the vault unlock it through a `SessionManager`,
//! do their work through the `SessionHandle`, persist, and let the
//! manager drop (which wipes the session) on the way out.

pub mod add;
pub mod completions;
pub mod delete;
pub mod edit;
pub mod generate;
pub mod init;
pub mod list;
pub mod shell;
pub mod show;
