//! Shell quoting for values rendered into bash programs.
//!
//! Every user-supplied value passes through `quote` exactly once. The result
//! is a single shell word that bash reads back byte-for-byte.

use crate::error::{ProvisionError, Result};

/// Quote `value` as one POSIX shell word.
///
/// Fails only for values containing NUL, which no shell word can carry.
pub fn quote(value: &str) -> Result<String> {
    shlex::try_quote(value)
        .map(|quoted| quoted.into_owned())
        .map_err(|_| ProvisionError::script("value contains a NUL byte and cannot be quoted"))
}

/// Quote `value` and label the error with the field it came from.
pub fn quote_field(field: &str, value: &str) -> Result<String> {
    quote(value).map_err(|_| {
        ProvisionError::script(format!("{} contains a NUL byte and cannot be quoted", field))
    })
}

/// `readonly NAME=<quoted value>` line.
pub fn readonly_assignment(name: &str, field: &str, value: &str) -> Result<String> {
    debug_assert!(
        name.chars().all(|c| c.is_ascii_uppercase() || c == '_'),
        "shell variable names are upper-case identifiers"
    );
    Ok(format!("readonly {}={}", name, quote_field(field, value)?))
}

/// Join already-trusted words with single spaces, quoting each one.
pub fn join(words: &[&str]) -> Result<String> {
    let quoted: Result<Vec<String>> = words.iter().map(|w| quote(w)).collect();
    Ok(quoted?.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words_stay_readable() {
        assert_eq!(quote("archbox").unwrap(), "archbox");
        assert_eq!(quote("Europe/London").unwrap(), "Europe/London");
    }

    #[test]
    fn test_metacharacters_are_quoted() {
        let quoted = quote("a\"; rm -rf /").unwrap();
        assert_ne!(quoted, "a\"; rm -rf /");
        assert!(quoted.starts_with('\'') || quoted.starts_with('"'));
    }

    #[test]
    fn test_empty_value_is_a_word() {
        assert_eq!(quote("").unwrap(), "''");
    }

    #[test]
    fn test_nul_rejected() {
        let err = quote_field("Hostname", "arch\0box").unwrap_err();
        assert!(matches!(err, ProvisionError::Script(_)));
        assert!(err.to_string().contains("Hostname"));
    }

    #[test]
    fn test_readonly_assignment() {
        assert_eq!(
            readonly_assignment("HOSTNAME", "Hostname", "archbox").unwrap(),
            "readonly HOSTNAME=archbox"
        );
    }

    #[test]
    fn test_join() {
        assert_eq!(join(&["nodejs", "npm"]).unwrap(), "nodejs npm");
        assert_eq!(join(&["it's"]).unwrap().split(' ').count(), 1);
    }
}
