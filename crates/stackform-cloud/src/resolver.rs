//! Cross-resource reference resolution
//!
//! A field value that is exactly the template key (or the `Name`) of another
//! declaration in the same stack refers to that resource. Once the resource
//! has been created the value is replaced by its provider identifier:
//!
//! ```yaml
//! Resources:
//!   Web:
//!     Type: Droplet
//!     Name: MyDroplet
//!     ...
//!   PublicIp:
//!     Type: FloatingIP
//!     DropletID: MyDroplet   # becomes the droplet's numeric ID
//! ```
//!
//! Matching is by whole value only; no substring or template syntax.

use crate::error::ResourceError;
use crate::provider::{ProviderHandle, ResourceId};
use crate::template::{NAME_FIELD, PRIORITY_FIELD, ResourceDeclaration, TYPE_FIELD};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeSet, HashMap};

/// Fields that identify a declaration and are never treated as references
const IDENTITY_FIELDS: [&str; 3] = [TYPE_FIELD, NAME_FIELD, PRIORITY_FIELD];

/// Handles of created resources, keyed by template key
pub type BuiltHandles = HashMap<String, ProviderHandle>;

/// Lookup from referencable names to template keys
///
/// Template keys take precedence over `Name` aliases. When several
/// declarations share a `Name`, the first one declared owns the alias.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    names: HashMap<String, String>,
}

impl ReferenceIndex {
    pub fn new(declarations: &[ResourceDeclaration]) -> Self {
        let mut names: HashMap<String, String> = declarations
            .iter()
            .map(|d| (d.name.clone(), d.name.clone()))
            .collect();

        for declaration in declarations {
            if let Some(alias) = declaration.display_name() {
                names
                    .entry(alias.to_string())
                    .or_insert_with(|| declaration.name.clone());
            }
        }

        Self { names }
    }

    /// Template key referenced by `value`, if any
    pub fn lookup(&self, value: &str) -> Option<&str> {
        self.names.get(value).map(String::as_str)
    }
}

/// Template keys referenced by a declaration
pub fn references(declaration: &ResourceDeclaration, index: &ReferenceIndex) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for (_, value) in referencable_fields(&declaration.fields) {
        collect(value, declaration, index, &mut found);
    }
    found
}

fn collect(
    value: &Value,
    owner: &ResourceDeclaration,
    index: &ReferenceIndex,
    found: &mut BTreeSet<String>,
) {
    match value {
        Value::String(s) => {
            if let Some(target) = index.lookup(s).filter(|t| *t != owner.name) {
                found.insert(target.to_string());
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect(item, owner, index, found);
            }
        }
        Value::Mapping(mapping) => {
            for item in mapping.values() {
                collect(item, owner, index, found);
            }
        }
        _ => {}
    }
}

/// A reference replaced by a provider identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    /// Field path, e.g. `DropletIDs[1]` or `Target.Droplet`
    pub field: String,
    /// Value as authored
    pub reference: String,
    pub id: ResourceId,
}

/// Declaration with references replaced, and what was replaced
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub declaration: ResourceDeclaration,
    /// In field order
    pub substitutions: Vec<Substitution>,
}

/// Rewrite references in `declaration` to provider identifiers
///
/// Returns a resolved copy; the declaration itself is never modified. A
/// reference to a resource missing from `built` (not created yet, or failed)
/// is an [`ResourceError::UnresolvedReference`].
pub fn resolve(
    declaration: &ResourceDeclaration,
    built: &BuiltHandles,
    index: &ReferenceIndex,
) -> Result<Resolved, ResourceError> {
    let mut resolver = Resolver::new(declaration, built, index, None);
    let declaration = resolver.run()?;
    Ok(Resolved {
        declaration,
        substitutions: resolver.substitutions,
    })
}

/// Like [`resolve`], but the `keep`-th substitution is left as authored
pub fn resolve_keeping(
    declaration: &ResourceDeclaration,
    built: &BuiltHandles,
    index: &ReferenceIndex,
    keep: usize,
) -> Result<ResourceDeclaration, ResourceError> {
    Resolver::new(declaration, built, index, Some(keep)).run()
}

struct Resolver<'a> {
    owner: &'a ResourceDeclaration,
    built: &'a BuiltHandles,
    index: &'a ReferenceIndex,
    keep: Option<usize>,
    seen: usize,
    substitutions: Vec<Substitution>,
}

impl<'a> Resolver<'a> {
    fn new(
        owner: &'a ResourceDeclaration,
        built: &'a BuiltHandles,
        index: &'a ReferenceIndex,
        keep: Option<usize>,
    ) -> Self {
        Self {
            owner,
            built,
            index,
            keep,
            seen: 0,
            substitutions: Vec::new(),
        }
    }

    fn run(&mut self) -> Result<ResourceDeclaration, ResourceError> {
        let mut fields = Mapping::with_capacity(self.owner.fields.len());

        for (key, value) in &self.owner.fields {
            let resolved = match key.as_str() {
                Some(field) if !IDENTITY_FIELDS.contains(&field) => {
                    self.resolve_value(field.to_string(), value)?
                }
                _ => value.clone(),
            };
            fields.insert(key.clone(), resolved);
        }

        Ok(ResourceDeclaration::new(self.owner.name.clone(), fields))
    }

    fn resolve_value(&mut self, path: String, value: &Value) -> Result<Value, ResourceError> {
        match value {
            Value::String(s) => {
                let Some(target) = self.index.lookup(s).filter(|t| *t != self.owner.name) else {
                    return Ok(value.clone());
                };
                let Some(handle) = self.built.get(target) else {
                    return Err(ResourceError::UnresolvedReference {
                        field: path,
                        reference: s.clone(),
                    });
                };

                let position = self.seen;
                self.seen += 1;
                if self.keep == Some(position) {
                    return Ok(value.clone());
                }
                self.substitutions.push(Substitution {
                    field: path,
                    reference: s.clone(),
                    id: handle.id.clone(),
                });
                Ok(handle.id.to_yaml())
            }
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.resolve_value(format!("{}[{}]", path, i), item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence),
            Value::Mapping(mapping) => {
                let mut resolved = Mapping::with_capacity(mapping.len());
                for (key, item) in mapping {
                    let child = match key.as_str() {
                        Some(k) => format!("{}.{}", path, k),
                        None => path.clone(),
                    };
                    resolved.insert(key.clone(), self.resolve_value(child, item)?);
                }
                Ok(Value::Mapping(resolved))
            }
            _ => Ok(value.clone()),
        }
    }
}

fn referencable_fields(fields: &Mapping) -> impl Iterator<Item = (&str, &Value)> {
    fields.iter().filter_map(|(key, value)| {
        key.as_str()
            .filter(|k| !IDENTITY_FIELDS.contains(k))
            .map(|k| (k, value))
    })
}
