//! Strict field validation shared by all resource variants

use crate::error::ResourceError;
use crate::template::{PRIORITY_FIELD, ResourceDeclaration, TYPE_FIELD, describe_value};
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

/// Keys every declaration may carry regardless of variant
const COMMON_FIELDS: [&str; 2] = [TYPE_FIELD, PRIORITY_FIELD];

/// Reject any key of `mapping` not listed in `known`
///
/// `path` prefixes reported field names for nested mappings
/// (e.g. `Image.Foo`).
pub fn check_fields(path: Option<&str>, mapping: &Mapping, known: &[&str]) -> Result<(), ResourceError> {
    for key in mapping.keys() {
        let recognized = key
            .as_str()
            .is_some_and(|k| known.contains(&k) || (path.is_none() && COMMON_FIELDS.contains(&k)));
        if !recognized {
            let name = key
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| describe_value(key));
            let field = match path {
                Some(prefix) => format!("{}.{}", prefix, name),
                None => name,
            };
            return Err(ResourceError::UnknownField { field });
        }
    }
    Ok(())
}

/// Validate a declaration against `known` and decode it into a typed schema
pub fn decode<T: DeserializeOwned>(
    declaration: &ResourceDeclaration,
    known: &[&str],
) -> Result<T, ResourceError> {
    check_fields(None, &declaration.fields, known)?;

    let mut fields = declaration.fields.clone();
    for common in COMMON_FIELDS {
        fields.remove(common);
    }

    serde_yaml::from_value(Value::Mapping(fields))
        .map_err(|e| ResourceError::InvalidDeclaration(e.to_string()))
}
