//! Random password generation.

use rand::Rng;

const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMBERS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Characters that are easy to misread in most fonts.
pub const AMBIGUOUS: &str = "0O1lI|";

/// Length used when none (or zero) is requested.
pub const DEFAULT_LENGTH: usize = 16;

/// What a generated password may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordOptions {
    pub length: usize,
    pub include_lower: bool,
    pub include_upper: bool,
    pub include_numbers: bool,
    pub include_symbols: bool,
    pub exclude_ambiguous: bool,
}

impl Default for PasswordOptions {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            include_lower: true,
            include_upper: true,
            include_numbers: true,
            include_symbols: true,
            exclude_ambiguous: true,
        }
    }
}

impl PasswordOptions {
    /// The characters a password is drawn from.
    ///
    /// Falls back to letters and digits when every class is switched off.
    pub fn charset(&self) -> Vec<char> {
        let mut charset = String::new();
        if self.include_lower {
            charset.push_str(LOWERCASE);
        }
        if self.include_upper {
            charset.push_str(UPPERCASE);
        }
        if self.include_numbers {
            charset.push_str(NUMBERS);
        }
        if self.include_symbols {
            charset.push_str(SYMBOLS);
        }

        let mut chars: Vec<char> = charset
            .chars()
            .filter(|c| !(self.exclude_ambiguous && AMBIGUOUS.contains(*c)))
            .collect();

        if chars.is_empty() {
            chars = LOWERCASE
                .chars()
                .chain(UPPERCASE.chars())
                .chain(NUMBERS.chars())
                .collect();
        }
        chars
    }
}

/// Generate a password by sampling the charset uniformly with the
/// thread-local CSPRNG.
pub fn generate_password(options: &PasswordOptions) -> String {
    let length = if options.length == 0 {
        DEFAULT_LENGTH
    } else {
        options.length
    };
    let charset = options.charset();

    let mut rng = rand::rng();
    (0..length)
        .map(|_| charset[rng.random_range(0..charset.len())])
        .collect()
}
