//! `passvault generate` — print random passwords.

use crate::errors::Result;
use crate::generator::{generate_password, PasswordOptions};

/// Execute the `generate` command.
pub fn execute(options: PasswordOptions, count: u8) -> Result<()> {
    for _ in 0..count {
        println!("{}", generate_password(&options));
    }
    Ok(())
}
