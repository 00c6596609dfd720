//! Naming strategies for collections and stored property names

use serde::{Deserialize, Serialize};

/// How a Rust identifier is turned into a stored name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// Use the name as declared
    #[default]
    Identity,
    /// `directReports`
    LowerCamelCase,
    /// `direct_reports`
    SnakeCase,
    /// `direct-reports`
    KebabCase,
    /// `directreports`
    LowerCase,
}

impl NamingStrategy {
    /// Apply the strategy to a name
    pub fn apply(&self, name: &str) -> String {
        match self {
            NamingStrategy::Identity => name.to_string(),
            NamingStrategy::LowerCase => name.to_lowercase(),
            NamingStrategy::SnakeCase => words(name).join("_"),
            NamingStrategy::KebabCase => words(name).join("-"),
            NamingStrategy::LowerCamelCase => {
                let mut out = String::with_capacity(name.len());
                for (i, word) in words(name).into_iter().enumerate() {
                    if i == 0 {
                        out.push_str(&word);
                    } else {
                        let mut chars = word.chars();
                        if let Some(first) = chars.next() {
                            out.extend(first.to_uppercase());
                            out.push_str(chars.as_str());
                        }
                    }
                }
                out
            }
        }
    }
}

impl std::fmt::Display for NamingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamingStrategy::Identity => write!(f, "identity"),
            NamingStrategy::LowerCamelCase => write!(f, "lower_camel_case"),
            NamingStrategy::SnakeCase => write!(f, "snake_case"),
            NamingStrategy::KebabCase => write!(f, "kebab_case"),
            NamingStrategy::LowerCase => write!(f, "lower_case"),
        }
    }
}

/// Split an identifier into lowercase words.
///
/// Boundaries are `_`, `-`, spaces, and lower-to-upper transitions. A run of
/// capitals is kept together (`HTTPServer` → `http`, `server`).
fn words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }

        current.extend(c.to_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        assert_eq!(NamingStrategy::Identity.apply("Employee"), "Employee");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(NamingStrategy::SnakeCase.apply("DirectReports"), "direct_reports");
        assert_eq!(NamingStrategy::SnakeCase.apply("HTTPServer"), "http_server");
        assert_eq!(NamingStrategy::SnakeCase.apply("already_snake"), "already_snake");
    }

    #[test]
    fn test_kebab_case() {
        assert_eq!(NamingStrategy::KebabCase.apply("gameScores"), "game-scores");
    }

    #[test]
    fn test_lower_camel_case() {
        assert_eq!(NamingStrategy::LowerCamelCase.apply("direct_reports"), "directReports");
        assert_eq!(NamingStrategy::LowerCamelCase.apply("Employee"), "employee");
    }

    #[test]
    fn test_lower_case() {
        assert_eq!(NamingStrategy::LowerCase.apply("GameScore"), "gamescore");
    }

    #[test]
    fn test_deserialize_from_toml_value() {
        let strategy: NamingStrategy = serde_json::from_str("\"kebab_case\"").unwrap();
        assert_eq!(strategy, NamingStrategy::KebabCase);
    }
}
