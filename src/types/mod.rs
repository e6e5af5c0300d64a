use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SchemaRegistryError;

/// Opaque metadata blob attached to a schema or a config.
pub type Metadata = serde_json::Value;

/// Opaque rule-set blob attached to a schema or a config.
pub type RuleSet = serde_json::Value;

#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaType {
    #[default]
    Avro,
    Protobuf,
    Json,
}

impl SchemaType {
    /// AVRO is the wire default and is omitted from serialized responses.
    pub fn is_avro(&self) -> bool {
        matches!(self, SchemaType::Avro)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaType::Avro => write!(f, "AVRO"),
            SchemaType::Protobuf => write!(f, "PROTOBUF"),
            SchemaType::Json => write!(f, "JSON"),
        }
    }
}

impl FromStr for SchemaType {
    type Err = SchemaRegistryError;

    fn from_str(str: &str) -> Result<Self, Self::Err> {
        match str {
            s if s.eq_ignore_ascii_case("AVRO") => Ok(SchemaType::Avro),
            s if s.eq_ignore_ascii_case("PROTOBUF") => Ok(SchemaType::Protobuf),
            s if s.eq_ignore_ascii_case("JSON") => Ok(SchemaType::Json),
            _ => Err(SchemaRegistryError::invalid_schema_type(str)),
        }
    }
}

#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompatibilityLevel {
    #[default]
    Backward,
    BackwardTransitive,
    Forward,
    ForwardTransitive,
    Full,
    FullTransitive,
    None,
}

impl CompatibilityLevel {
    pub fn is_transitive(&self) -> bool {
        matches!(
            self,
            CompatibilityLevel::BackwardTransitive
                | CompatibilityLevel::ForwardTransitive
                | CompatibilityLevel::FullTransitive
        )
    }
}

impl fmt::Display for CompatibilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatibilityLevel::Backward => write!(f, "BACKWARD"),
            CompatibilityLevel::BackwardTransitive => write!(f, "BACKWARD_TRANSITIVE"),
            CompatibilityLevel::Forward => write!(f, "FORWARD"),
            CompatibilityLevel::ForwardTransitive => write!(f, "FORWARD_TRANSITIVE"),
            CompatibilityLevel::Full => write!(f, "FULL"),
            CompatibilityLevel::FullTransitive => write!(f, "FULL_TRANSITIVE"),
            CompatibilityLevel::None => write!(f, "NONE"),
        }
    }
}

impl FromStr for CompatibilityLevel {
    type Err = SchemaRegistryError;

    fn from_str(str: &str) -> Result<Self, Self::Err> {
        match str {
            s if s.eq_ignore_ascii_case("BACKWARD") => Ok(CompatibilityLevel::Backward),
            s if s.eq_ignore_ascii_case("BACKWARD_TRANSITIVE") => {
                Ok(CompatibilityLevel::BackwardTransitive)
            }
            s if s.eq_ignore_ascii_case("FORWARD") => Ok(CompatibilityLevel::Forward),
            s if s.eq_ignore_ascii_case("FORWARD_TRANSITIVE") => {
                Ok(CompatibilityLevel::ForwardTransitive)
            }
            s if s.eq_ignore_ascii_case("FULL") => Ok(CompatibilityLevel::Full),
            s if s.eq_ignore_ascii_case("FULL_TRANSITIVE") => {
                Ok(CompatibilityLevel::FullTransitive)
            }
            s if s.eq_ignore_ascii_case("NONE") => Ok(CompatibilityLevel::None),
            _ => Err(SchemaRegistryError::invalid_compatibility_level(str)),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    #[serde(rename = "READWRITE")]
    ReadWrite,
    #[serde(rename = "READONLY")]
    ReadOnly,
    #[serde(rename = "READONLY_OVERRIDE")]
    ReadOnlyOverride,
    #[serde(rename = "IMPORT")]
    Import,
}

impl Mode {
    /// Whether schema and config writes are rejected under this mode.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Mode::ReadOnly | Mode::ReadOnlyOverride)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::ReadWrite => write!(f, "READWRITE"),
            Mode::ReadOnly => write!(f, "READONLY"),
            Mode::ReadOnlyOverride => write!(f, "READONLY_OVERRIDE"),
            Mode::Import => write!(f, "IMPORT"),
        }
    }
}

impl FromStr for Mode {
    type Err = SchemaRegistryError;

    fn from_str(str: &str) -> Result<Self, Self::Err> {
        match str {
            s if s.eq_ignore_ascii_case("READWRITE") => Ok(Mode::ReadWrite),
            s if s.eq_ignore_ascii_case("READONLY") => Ok(Mode::ReadOnly),
            s if s.eq_ignore_ascii_case("READONLY_OVERRIDE") => Ok(Mode::ReadOnlyOverride),
            s if s.eq_ignore_ascii_case("IMPORT") => Ok(Mode::Import),
            _ => Err(SchemaRegistryError::invalid_mode(str)),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResourceMode {
    pub mode: Mode,
}

/// A version selector as it appears on the wire: a positive integer, the
/// literal `latest`, or `-1` (an alias for `latest`).
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub enum Version {
    #[default]
    Latest,
    Number(u32),
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Latest => write!(f, "latest"),
            Version::Number(version) => write!(f, "{}", version),
        }
    }
}

impl From<u32> for Version {
    fn from(version: u32) -> Self {
        Version::Number(version)
    }
}

impl FromStr for Version {
    type Err = SchemaRegistryError;

    fn from_str(str: &str) -> Result<Self, Self::Err> {
        match str {
            s if s.eq_ignore_ascii_case("latest") => Ok(Version::Latest),
            "-1" => Ok(Version::Latest),
            s => match s.parse::<u32>() {
                Ok(version) if version >= 1 => Ok(Version::Number(version)),
                _ => Err(SchemaRegistryError::invalid_version(s)),
            },
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub name: String,
    pub subject: String,
    pub version: u32,
}

impl Reference {
    pub fn new(name: &str, subject: &str) -> Self {
        Self {
            name: name.to_string(),
            subject: subject.to_string(),
            version: 1,
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
}

/// A `(subject, version)` pair, as returned by the schema-id reverse lookup.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubjectVersion {
    pub subject: String,
    pub version: u32,
}

/// The body of a register or lookup request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnregisteredSchema {
    pub schema: String,
    #[serde(default)]
    pub schema_type: SchemaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_set: Option<RuleSet>,
    /// Honored only while the effective mode is IMPORT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// Honored only while the effective mode is IMPORT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl UnregisteredSchema {
    pub fn schema<T>(schema: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            schema: schema.into(),
            schema_type: SchemaType::Avro,
            references: None,
            metadata: None,
            rule_set: None,
            id: None,
            version: None,
        }
    }

    pub fn schema_type(mut self, schema_type: SchemaType) -> Self {
        self.schema_type = schema_type;
        self
    }

    pub fn reference(mut self, reference: Reference) -> Self {
        if let Some(references) = self.references.as_mut() {
            references.push(reference);
        } else {
            self.references = Some(vec![reference]);
        }

        self
    }

    pub fn references<I>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = Reference>,
    {
        if let Some(refs) = self.references.as_mut() {
            refs.extend(references);
        } else {
            self.references = Some(references.into_iter().collect());
        }

        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn rule_set(mut self, rule_set: RuleSet) -> Self {
        self.rule_set = Some(rule_set);
        self
    }

    /// Pin the schema id for IMPORT-mode registration.
    pub fn id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Pin the version for IMPORT-mode registration.
    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}

/// The response body of a successful registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredSchema {
    pub id: u32,
}

/// A schema as returned by the id lookup endpoints.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default, skip_serializing_if = "SchemaType::is_avro")]
    pub schema_type: SchemaType,
    pub schema: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
}

/// A raw schema body, with no envelope around it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct StringSchema(pub Cow<'static, str>);

/// The full view of one subject version: the binding plus the schema content
/// it points at.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: u32,
    pub subject: String,
    pub version: u32,
    #[serde(default, skip_serializing_if = "SchemaType::is_avro")]
    pub schema_type: SchemaType,
    pub schema: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

/// A compatibility configuration, at subject or global scope.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate_fields: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility_level: Option<CompatibilityLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_rule_set: Option<RuleSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_rule_set: Option<RuleSet>,
}

impl Config {
    pub fn compatibility(level: CompatibilityLevel) -> Self {
        Self {
            compatibility_level: Some(level),
            ..Self::default()
        }
    }
}

/// GET config responses carry the level as `compatibilityLevel`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigGetResponse {
    pub compatibility_level: CompatibilityLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalize: Option<bool>,
}

/// PUT config responses carry the level as `compatibility`; the field name
/// differs from GET on the wire and deployed clients depend on both shapes.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPutResponse {
    pub compatibility: CompatibilityLevel,
}

/// The verdict of a compatibility check. `messages` is only populated when
/// the caller asked for verbose output; an absent field stays off the wire.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityCheck {
    pub is_compatible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<String>>,
}

/// Filters for the schema listing endpoint.
#[derive(Debug, Default, Clone)]
pub struct SchemaQuery {
    pub subject_prefix: Option<String>,
    pub latest_only: bool,
    pub include_deleted: bool,
    pub offset: usize,
    pub limit: Option<usize>,
}

/// A registry user record. Credential verification lives outside the core;
/// storage only persists the records.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// An API key record, owned by a user.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub key_id: String,
    pub secret_hash: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parses_wire_forms() {
        assert_eq!("latest".parse::<Version>().unwrap(), Version::Latest);
        assert_eq!("-1".parse::<Version>().unwrap(), Version::Latest);
        assert_eq!("3".parse::<Version>().unwrap(), Version::Number(3));
        assert!("0".parse::<Version>().is_err());
        assert!("-2".parse::<Version>().is_err());
        assert!("newest".parse::<Version>().is_err());
    }

    #[test]
    fn schema_type_is_omitted_for_avro() {
        let schema = Schema {
            schema_type: SchemaType::Avro,
            schema: Cow::Borrowed(r#""string""#),
            references: None,
        };
        let json = serde_json::to_value(&schema).unwrap();
        assert!(json.get("schemaType").is_none());

        let schema = Schema {
            schema_type: SchemaType::Protobuf,
            schema: Cow::Borrowed("syntax = \"proto3\";"),
            references: None,
        };
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["schemaType"], "PROTOBUF");
    }

    #[test]
    fn config_field_name_asymmetry_is_preserved() {
        let get = ConfigGetResponse {
            compatibility_level: CompatibilityLevel::Full,
            alias: None,
            normalize: None,
        };
        let json = serde_json::to_value(&get).unwrap();
        assert_eq!(json["compatibilityLevel"], "FULL");

        let put = ConfigPutResponse {
            compatibility: CompatibilityLevel::Full,
        };
        let json = serde_json::to_value(&put).unwrap();
        assert_eq!(json["compatibility"], "FULL");
    }

    #[test]
    fn mode_round_trips() {
        for mode in [
            Mode::ReadWrite,
            Mode::ReadOnly,
            Mode::ReadOnlyOverride,
            Mode::Import,
        ] {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
        assert!("WRITEONLY".parse::<Mode>().is_err());
    }
}
