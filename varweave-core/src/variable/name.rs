//! Identifier validation.

use crate::error::{Result, VarError};

/// Check that `name` matches `^[A-Za-z_][A-Za-z0-9_]*$`.
pub fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();

    let Some(first) = chars.next() else {
        return Err(invalid(name, "name is empty"));
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(invalid(name, "must start with a letter or underscore"));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid(
            name,
            "may only contain letters, digits and underscores",
        ));
    }

    Ok(())
}

fn invalid(name: &str, reason: &'static str) -> VarError {
    VarError::InvalidName {
        name: name.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_identifiers() {
        for name in ["a", "_", "_private", "total_2024", "CamelCase", "x1"] {
            assert!(validate_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_names() {
        for name in ["", "1abc", "with space", "dash-ed", "dot.ted", "é", "a$"] {
            assert!(
                matches!(validate_name(name), Err(VarError::InvalidName { .. })),
                "{name:?} should be rejected"
            );
        }
    }
}
