//! Common types used across CLI modules

use anyhow::{Result, anyhow};
use datawatch_core::domain::variable::Variable;
use uuid::Uuid;

/// Identifier that can be either a full UUID or an unambiguous prefix
#[derive(Debug, Clone)]
pub enum IdOrPrefix {
    /// Full UUID
    Full(Uuid),
    /// Prefix that should uniquely identify a resource
    Prefix(String),
}

impl IdOrPrefix {
    /// Parse a string into an IdOrPrefix
    ///
    /// Attempts to parse as a full UUID first, otherwise treats as a prefix
    pub fn parse(input: &str) -> Self {
        if let Ok(uuid) = Uuid::parse_str(input) {
            IdOrPrefix::Full(uuid)
        } else {
            IdOrPrefix::Prefix(input.to_string())
        }
    }

    /// Get the UUID if this is a full ID
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            IdOrPrefix::Full(uuid) => Some(*uuid),
            IdOrPrefix::Prefix(_) => None,
        }
    }

    /// Get the prefix string
    pub fn as_str(&self) -> String {
        match self {
            IdOrPrefix::Full(uuid) => uuid.to_string(),
            IdOrPrefix::Prefix(prefix) => prefix.clone(),
        }
    }
}

/// Parse a `NAME=VALUE` or `NAME=VALUE:INCREMENT` variable
pub fn parse_var(s: &str) -> Result<(String, Variable)> {
    let (name, rest) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid NAME=VALUE[:INC]: no `=` found in `{}`", s))?;
    if name.is_empty() {
        return Err(anyhow!("variable name is empty in `{}`", s));
    }

    let (value, increment) = match rest.split_once(':') {
        Some((value, increment)) => (value, increment),
        None => (rest, "0"),
    };
    let value: i64 = value
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid value for {}: `{}`", name, value))?;
    let increment: i64 = increment
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid increment for {}: `{}`", name, increment))?;

    Ok((name.to_string(), Variable::new(value, increment)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_or_prefix() {
        let uuid = Uuid::new_v4();
        assert_eq!(IdOrPrefix::parse(&uuid.to_string()).as_uuid(), Some(uuid));

        let prefix = IdOrPrefix::parse("3f2a");
        assert_eq!(prefix.as_uuid(), None);
        assert_eq!(prefix.as_str(), "3f2a");
    }

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("DAY=13:1").unwrap(),
            ("DAY".to_string(), Variable::new(13, 1))
        );
        assert_eq!(
            parse_var("YEAR=2024").unwrap(),
            ("YEAR".to_string(), Variable::fixed(2024))
        );
        assert!(parse_var("DAY").is_err());
        assert!(parse_var("=3").is_err());
        assert!(parse_var("DAY=x").is_err());
        assert!(parse_var("DAY=1:y").is_err());
    }
}
