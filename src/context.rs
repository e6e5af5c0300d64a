use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::SchemaRegistryError;

/// The default registry context. Elided from wire-encoded subject names.
pub const DEFAULT_CONTEXT: &str = ".";

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap())
}

/// A subject name split into its registry context and its context-local name.
///
/// On the wire a context-qualified subject reads `:.<context>:<subject>`; a
/// bare subject belongs to the default context `"."`. The context-only form
/// `:.<context>:` (empty subject) addresses context-global configuration.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct QualifiedSubject {
    context: String,
    subject: String,
}

impl QualifiedSubject {
    pub fn new(context: &str, subject: &str) -> Result<Self, SchemaRegistryError> {
        if context != DEFAULT_CONTEXT && !name_pattern().is_match(context) {
            return Err(SchemaRegistryError::InvalidSubject {
                subject: format!(":.{}:{}", context, subject),
            });
        }

        if !subject.is_empty() && !name_pattern().is_match(subject) {
            return Err(SchemaRegistryError::InvalidSubject {
                subject: subject.to_string(),
            });
        }

        Ok(Self {
            context: context.to_string(),
            subject: subject.to_string(),
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// False when the caller submitted only a context qualifier.
    pub fn has_subject(&self) -> bool {
        !self.subject.is_empty()
    }

    pub fn into_parts(self) -> (String, String) {
        (self.context, self.subject)
    }
}

impl FromStr for QualifiedSubject {
    type Err = SchemaRegistryError;

    fn from_str(wire: &str) -> Result<Self, Self::Err> {
        let Some(rest) = wire.strip_prefix(":.") else {
            return QualifiedSubject::new(DEFAULT_CONTEXT, wire);
        };

        let Some((context, subject)) = rest.split_once(':') else {
            return Err(SchemaRegistryError::InvalidSubject {
                subject: wire.to_string(),
            });
        };

        if context.is_empty() || context == DEFAULT_CONTEXT {
            return QualifiedSubject::new(DEFAULT_CONTEXT, subject);
        }

        QualifiedSubject::new(context, subject)
    }
}

impl fmt::Display for QualifiedSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context == DEFAULT_CONTEXT {
            write!(f, "{}", self.subject)
        } else {
            write!(f, ":.{}:{}", self.context, self.subject)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_subject_maps_to_default_context() {
        let qualified: QualifiedSubject = "orders-value".parse().unwrap();
        assert_eq!(qualified.context(), DEFAULT_CONTEXT);
        assert_eq!(qualified.subject(), "orders-value");
        assert_eq!(qualified.to_string(), "orders-value");
    }

    #[test]
    fn qualified_subject_round_trips() {
        let qualified: QualifiedSubject = ":.tenant-a:orders-value".parse().unwrap();
        assert_eq!(qualified.context(), "tenant-a");
        assert_eq!(qualified.subject(), "orders-value");
        assert_eq!(qualified.to_string(), ":.tenant-a:orders-value");
    }

    #[test]
    fn explicit_default_context_is_elided() {
        let qualified: QualifiedSubject = ":.:orders-value".parse().unwrap();
        assert_eq!(qualified.context(), DEFAULT_CONTEXT);
        assert_eq!(qualified.to_string(), "orders-value");
    }

    #[test]
    fn context_only_form_has_empty_subject() {
        let qualified: QualifiedSubject = ":.tenant-a:".parse().unwrap();
        assert_eq!(qualified.context(), "tenant-a");
        assert!(!qualified.has_subject());
    }

    #[test]
    fn names_may_contain_dots_dashes_and_underscores() {
        assert!("my.subject_name-v2".parse::<QualifiedSubject>().is_ok());
        assert!(":.ctx_1:a.b-c".parse::<QualifiedSubject>().is_ok());
    }

    #[test]
    fn malformed_wire_forms_are_rejected() {
        assert!(":.unterminated".parse::<QualifiedSubject>().is_err());
        assert!("spaced subject".parse::<QualifiedSubject>().is_err());
        assert!(":.bad ctx:subject".parse::<QualifiedSubject>().is_err());
    }
}
