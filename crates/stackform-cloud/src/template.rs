//! Template parsing
//!
//! A template is a YAML document with two sections:
//!
//! ```yaml
//! Parameters:
//!   Port:
//!     Description: Exposed port
//!     Type: Number
//!     Default: 80
//! Resources:
//!   Web:
//!     Type: Droplet
//!     Name: web-1
//!     ...
//! ```
//!
//! Resource declarations are kept in the order they appear in the document.
//! Two declarations may not share a key, but a field repeated inside one
//! declaration keeps its last value.

use crate::error::{ResourceError, Result, StackError};
use serde::de::{self, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// Field selecting the resource variant
pub const TYPE_FIELD: &str = "Type";
/// Optional author-controlled ordering override
pub const PRIORITY_FIELD: &str = "Priority";
/// Provider-facing name of a resource, usable as a reference alias
pub const NAME_FIELD: &str = "Name";

/// Parsed stack template
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StackTemplate {
    #[serde(rename = "Parameters", default)]
    pub parameters: BTreeMap<String, Parameter>,

    #[serde(
        rename = "Resources",
        default,
        deserialize_with = "deserialize_resources"
    )]
    pub resources: Vec<ResourceDeclaration>,
}

impl StackTemplate {
    /// Look up a declaration by its template key
    pub fn resource(&self, name: &str) -> Option<&ResourceDeclaration> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// Stack parameter
///
/// All values are kept as strings. `Type` is informational only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "Default", default, deserialize_with = "scalar_string")]
    pub default: String,

    #[serde(rename = "Type", default, deserialize_with = "scalar_string")]
    pub param_type: String,

    #[serde(rename = "Description", default, deserialize_with = "scalar_string")]
    pub description: String,
}

/// One entry of the `Resources` section, as authored
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDeclaration {
    /// Template key
    pub name: String,

    /// Raw fields, including `Type`
    pub fields: Mapping,
}

impl ResourceDeclaration {
    pub fn new(name: impl Into<String>, fields: Mapping) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// The `Type` discriminator, if present and a string
    pub fn resource_type(&self) -> Option<&str> {
        self.fields.get(TYPE_FIELD).and_then(Value::as_str)
    }

    /// The `Name` field, if present and a string
    pub fn display_name(&self) -> Option<&str> {
        self.fields.get(NAME_FIELD).and_then(Value::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Author supplied `Priority`, overriding the variant default
    pub fn priority_override(&self) -> std::result::Result<Option<i32>, ResourceError> {
        let Some(value) = self.fields.get(PRIORITY_FIELD) else {
            return Ok(None);
        };
        value
            .as_i64()
            .and_then(|p| i32::try_from(p).ok())
            .map(Some)
            .ok_or_else(|| ResourceError::InvalidField {
                field: PRIORITY_FIELD.to_string(),
                message: format!("expected an integer, got {}", describe_value(value)),
            })
    }
}

/// Parse template bytes into a [`StackTemplate`]
///
/// Parsing is pure: the same bytes always produce an equal template. An
/// empty document (blank, comments only, or `~`) is an empty stack.
pub fn parse_template(template: &[u8]) -> Result<StackTemplate> {
    let parsed: StackTemplate = serde_yaml::from_slice::<Option<StackTemplate>>(template)
        .map_err(|e| StackError::TemplateParse(e.to_string()))?
        .unwrap_or_default();

    let mut seen = HashSet::new();
    for declaration in &parsed.resources {
        if !seen.insert(declaration.name.as_str()) {
            return Err(StackError::DuplicateResource(declaration.name.clone()));
        }
    }

    debug!(
        parameters = parsed.parameters.len(),
        resources = parsed.resources.len(),
        "Parsed template"
    );
    Ok(parsed)
}

/// Short human description of a YAML value for error messages
pub(crate) fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s),
        Value::Sequence(_) => "a list".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(t) => format!("tagged value {}", t.tag),
    }
}

fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s),
        other => Err(de::Error::custom(format!(
            "expected a scalar, got {}",
            describe_value(&other)
        ))),
    }
}

// Duplicate keys are collected rather than rejected here so that
// parse_template can report them as DuplicateResource.
fn deserialize_resources<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<ResourceDeclaration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ResourcesVisitor;

    impl<'de> Visitor<'de> for ResourcesVisitor {
        type Value = Vec<ResourceDeclaration>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of resource name to resource declaration")
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut resources = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, LastWins(value))) = map.next_entry::<String, LastWins>()? {
                let fields = match value {
                    Value::Mapping(fields) => fields,
                    // fails later as MissingType, scoped to this resource
                    Value::Null => Mapping::new(),
                    other => {
                        return Err(de::Error::custom(format!(
                            "resource '{}' must be a mapping, got {}",
                            name,
                            describe_value(&other)
                        )));
                    }
                };
                resources.push(ResourceDeclaration { name, fields });
            }
            Ok(resources)
        }
    }

    deserializer.deserialize_any(ResourcesVisitor)
}

/// YAML value whose mappings keep the last of repeated keys
///
/// `Value`'s own deserializer rejects them instead.
struct LastWins(Value);

impl<'de> Deserialize<'de> for LastWins {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LastWinsVisitor;

        impl<'de> Visitor<'de> for LastWinsVisitor {
            type Value = LastWins;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("any YAML value")
            }

            fn visit_bool<E: de::Error>(self, b: bool) -> std::result::Result<LastWins, E> {
                Ok(LastWins(Value::Bool(b)))
            }

            fn visit_i64<E: de::Error>(self, n: i64) -> std::result::Result<LastWins, E> {
                Ok(LastWins(Value::Number(n.into())))
            }

            fn visit_u64<E: de::Error>(self, n: u64) -> std::result::Result<LastWins, E> {
                Ok(LastWins(Value::Number(n.into())))
            }

            fn visit_f64<E: de::Error>(self, n: f64) -> std::result::Result<LastWins, E> {
                Ok(LastWins(Value::Number(n.into())))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> std::result::Result<LastWins, E> {
                Ok(LastWins(Value::String(s.to_string())))
            }

            fn visit_string<E: de::Error>(self, s: String) -> std::result::Result<LastWins, E> {
                Ok(LastWins(Value::String(s)))
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<LastWins, E> {
                Ok(LastWins(Value::Null))
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<LastWins, E> {
                Ok(LastWins(Value::Null))
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<LastWins, D::Error>
            where
                D: Deserializer<'de>,
            {
                LastWins::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<LastWins, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(LastWins(item)) = seq.next_element()? {
                    items.push(item);
                }
                Ok(LastWins(Value::Sequence(items)))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<LastWins, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut mapping = Mapping::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((LastWins(key), LastWins(value))) = map.next_entry()? {
                    // a repeated key keeps its first position
                    if mapping.insert(key.clone(), value).is_some() {
                        warn!(
                            field = %describe_value(&key),
                            "Repeated field, keeping the last value"
                        );
                    }
                }
                Ok(LastWins(Value::Mapping(mapping)))
            }

            fn visit_enum<A>(self, data: A) -> std::result::Result<LastWins, A::Error>
            where
                A: EnumAccess<'de>,
            {
                let (tag, contents) = data.variant::<String>()?;
                if tag.is_empty() {
                    return Err(de::Error::custom("empty YAML tag"));
                }
                let LastWins(value) = contents.newtype_variant()?;
                Ok(LastWins(Value::Tagged(Box::new(TaggedValue {
                    tag: Tag::new(tag),
                    value,
                }))))
            }
        }

        deserializer.deserialize_any(LastWinsVisitor)
    }
}
