//! Path patterns
//!
//! A path pattern is a template such as
//! `/data/events/${YEAR}/${MONTH}/${DAY}/${HOUR}`. Placeholder names may
//! contain ASCII letters, digits, `_` and `.`. Anything that does not form a
//! valid placeholder is kept literally.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::variable::VariableSet;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("variable '{name}' referenced by pattern '{pattern}' is not declared")]
    UnknownVariable { name: String, pattern: String },
}

/// A date/time-templated path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathPattern(String);

impl PathPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Names of all placeholders, in order of appearance
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name),
            Segment::Literal(_) => None,
        })
    }

    /// Fails with the first placeholder not declared in `vars`
    pub fn check(&self, vars: &VariableSet) -> Result<(), PatternError> {
        match self.placeholders().find(|name| !vars.contains(name)) {
            Some(name) => Err(self.unknown(name)),
            None => Ok(()),
        }
    }

    /// Substitutes the decimal value of each placeholder's variable
    pub fn resolve(&self, vars: &VariableSet) -> Result<String, PatternError> {
        let mut resolved = String::with_capacity(self.0.len());
        for segment in self.segments() {
            match segment {
                Segment::Literal(text) => resolved.push_str(text),
                Segment::Placeholder(name) => {
                    let value = vars.value(name).ok_or_else(|| self.unknown(name))?;
                    resolved.push_str(&value.to_string());
                }
            }
        }
        Ok(resolved)
    }

    fn unknown(&self, name: &str) -> PatternError {
        PatternError::UnknownVariable {
            name: name.to_string(),
            pattern: self.0.clone(),
        }
    }

    fn segments(&self) -> Segments<'_> {
        Segments { rest: &self.0 }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PathPattern {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PathPattern {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let rest = self.rest;
        match find_placeholder(rest) {
            Some((0, name, end)) => {
                self.rest = &rest[end..];
                Some(Segment::Placeholder(name))
            }
            Some((start, _, _)) => {
                self.rest = &rest[start..];
                Some(Segment::Literal(&rest[..start]))
            }
            None => {
                self.rest = "";
                Some(Segment::Literal(rest))
            }
        }
    }
}

/// Finds the first well-formed `${NAME}`, returning its start, name and end
fn find_placeholder(s: &str) -> Option<(usize, &str, usize)> {
    let mut offset = 0;
    while let Some(i) = s[offset..].find("${") {
        let start = offset + i;
        let body = &s[start + 2..];
        if let Some(close) = body.find('}') {
            let name = &body[..close];
            if is_valid_name(name) {
                return Some((start, name, start + 2 + close + 1));
            }
        }
        offset = start + 2;
    }
    None
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::variable::Variable;

    fn vars() -> VariableSet {
        VariableSet::new()
            .with("YEAR", Variable::fixed(2024))
            .with("MONTH", Variable::fixed(6))
            .with("DAY", Variable::new(13, 1))
            .with("feed.name", Variable::fixed(42))
    }

    #[test]
    fn test_resolve_substitutes_every_placeholder() {
        let pattern = PathPattern::new("/data/${YEAR}/${MONTH}/${DAY}/part-${DAY}");
        assert_eq!(pattern.resolve(&vars()).unwrap(), "/data/2024/6/13/part-13");
    }

    #[test]
    fn test_resolve_allows_dots_and_underscores() {
        let pattern = PathPattern::new("/feeds/${feed.name}/_SUCCESS");
        assert_eq!(pattern.resolve(&vars()).unwrap(), "/feeds/42/_SUCCESS");
    }

    #[test]
    fn test_resolve_unknown_variable() {
        let pattern = PathPattern::new("/data/${YEAR}/${REGION}");
        let err = pattern.resolve(&vars()).unwrap_err();
        assert_eq!(
            err,
            PatternError::UnknownVariable {
                name: "REGION".to_string(),
                pattern: "/data/${YEAR}/${REGION}".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_keeps_malformed_tokens_literally() {
        let pattern = PathPattern::new("/a/${}/${not-valid}/${YEAR/$YEAR");
        assert_eq!(
            pattern.resolve(&vars()).unwrap(),
            "/a/${}/${not-valid}/${YEAR/$YEAR"
        );
    }

    #[test]
    fn test_resolve_nested_braces_uses_inner_token() {
        let pattern = PathPattern::new("/a/${X${YEAR}}");
        assert_eq!(pattern.resolve(&vars()).unwrap(), "/a/${X2024}");
    }

    #[test]
    fn test_resolve_does_not_mutate_and_is_repeatable() {
        let vars = vars();
        let pattern = PathPattern::new("/data/${DAY}");
        let first = pattern.resolve(&vars).unwrap();
        let second = pattern.resolve(&vars).unwrap();
        assert_eq!(first, second);
        assert_eq!(vars.get("DAY"), Some(&Variable::new(13, 1)));
    }

    #[test]
    fn test_resolve_without_placeholders() {
        let pattern = PathPattern::new("/static/path");
        assert_eq!(
            pattern.resolve(&VariableSet::new()).unwrap(),
            "/static/path"
        );
    }

    #[test]
    fn test_placeholders_in_order() {
        let pattern = PathPattern::new("${A}/x/${B.c}/${A}");
        let names: Vec<_> = pattern.placeholders().collect();
        assert_eq!(names, vec!["A", "B.c", "A"]);
    }

    #[test]
    fn test_check_reports_first_missing_variable() {
        let pattern = PathPattern::new("/${YEAR}/${ZONE}/${SHARD}");
        match pattern.check(&vars()) {
            Err(PatternError::UnknownVariable { name, .. }) => assert_eq!(name, "ZONE"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(PathPattern::new("/${YEAR}").check(&vars()).is_ok());
    }
}
