//! Stack and resource error types

use crate::response::ResourceFailure;
use thiserror::Error;

/// Stack-level errors
///
/// Only template problems are fatal to a whole stack. Everything that goes
/// wrong while building an individual resource is a [`ResourceError`] and is
/// reported inside the response instead.
#[derive(Error, Debug)]
pub enum StackError {
    #[error("Template parse error: {0}")]
    TemplateParse(String),

    #[error("Duplicate resource name in template: {0}")]
    DuplicateResource(String),

    #[error("Stack '{stack}' failed: {} resource(s) could not be created", failures.len())]
    Failed {
        stack: String,
        failures: Vec<ResourceFailure>,
    },
}

/// Errors scoped to a single resource declaration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    #[error("Resource declaration has no Type field")]
    MissingType,

    #[error("Unknown resource type: {tag}")]
    UnknownResourceType { tag: String },

    #[error("Resource type '{tag}' is recognized but not supported yet")]
    UnsupportedResourceType { tag: String },

    #[error("Unknown field: {field}")]
    UnknownField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid declaration: {0}")]
    InvalidDeclaration(String),

    #[error("Field '{field}' references '{reference}', which has not been created")]
    UnresolvedReference { field: String, reference: String },

    #[error("Field '{field}' references '{reference}', replaced by its ID {id}: {source}")]
    SubstitutedReference {
        field: String,
        reference: String,
        id: String,
        source: Box<ResourceError>,
    },

    #[error("Create request was not built before build was called")]
    RequestNotBuilt,

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Errors reported by a provider client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

pub type Result<T> = std::result::Result<T, StackError>;

#[cfg(test)]
mod tests {
    use super::*;

    // Every stack-level error comes from the template or from aggregation
    fn origin(error: &StackError) -> &'static str {
        match error {
            StackError::TemplateParse(_) | StackError::DuplicateResource(_) => "template",
            StackError::Failed { .. } => "aggregation",
        }
    }

    #[test]
    fn test_stack_error_origins() {
        let failed = StackError::Failed {
            stack: "TestStack".to_string(),
            failures: vec![ResourceFailure::new("Web", ResourceError::MissingType)],
        };
        assert_eq!(origin(&failed), "aggregation");
        assert_eq!(
            failed.to_string(),
            "Stack 'TestStack' failed: 1 resource(s) could not be created"
        );
        assert_eq!(origin(&StackError::DuplicateResource("Web".into())), "template");
    }

    #[test]
    fn test_substituted_reference_message() {
        let error = ResourceError::SubstitutedReference {
            field: "Tags[0]".to_string(),
            reference: "web".to_string(),
            id: "1".to_string(),
            source: Box::new(ResourceError::InvalidDeclaration(
                "invalid type: integer `1`, expected a string".to_string(),
            )),
        };
        assert_eq!(
            error.to_string(),
            "Field 'Tags[0]' references 'web', replaced by its ID 1: \
             Invalid declaration: invalid type: integer `1`, expected a string"
        );
        assert!(std::error::Error::source(&error).is_some());
    }
}
