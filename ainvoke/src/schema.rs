//! JSON Schema gate shared by the input and output sides of the contract.

use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result, SchemaRole};

/// Validate `document` against `schema`.
///
/// A blank schema is a configuration error, never "accept anything". A
/// document that is not JSON at all counts as a mismatch.
pub fn validate(role: SchemaRole, schema: &str, document: &[u8]) -> Result<()> {
    if schema.trim().is_empty() {
        return Err(Error::SchemaEmpty { role });
    }

    let schema_value: Value =
        serde_json::from_str(schema).map_err(|err| Error::SchemaMalformed {
            role,
            message: err.to_string(),
        })?;
    let compiled = validator_for(&schema_value).map_err(|err| Error::SchemaMalformed {
        role,
        message: err.to_string(),
    })?;

    let instance: Value =
        serde_json::from_slice(document).map_err(|err| Error::SchemaMismatch {
            role,
            details: format!("document is not valid JSON: {err}"),
        })?;

    let messages = compiled
        .iter_errors(&instance)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    if !messages.is_empty() {
        debug!(%role, violations = messages.len(), "schema validation failed");
        return Err(Error::SchemaMismatch {
            role,
            details: messages.join("; "),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const NAME_SCHEMA: &str = r#"{
        "type": "object",
        "properties": { "name": { "type": "string" } },
        "required": ["name"]
    }"#;

    #[test]
    fn conforming_document_passes() {
        validate(SchemaRole::Input, NAME_SCHEMA, br#"{"name":"Ada"}"#).expect("valid");
    }

    #[test]
    fn blank_schema_is_rejected() {
        let err = validate(SchemaRole::Input, "  \n\t", b"{}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaEmpty);
        assert_eq!(err.schema_role(), Some(SchemaRole::Input));
    }

    #[test]
    fn unparsable_schema_is_malformed() {
        let err = validate(SchemaRole::Output, "{", b"{}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMalformed);
    }

    #[test]
    fn uncompilable_schema_is_malformed() {
        let err = validate(SchemaRole::Output, r#"{"type": 12}"#, b"{}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMalformed);
    }

    #[test]
    fn every_violation_is_reported() {
        let schema = r#"{
            "type": "object",
            "properties": { "a": { "type": "string" }, "b": { "type": "integer" } },
            "required": ["a", "b"]
        }"#;
        let err = validate(SchemaRole::Output, schema, br#"{"a": 1, "b": "x"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
        match err {
            Error::SchemaMismatch { details, .. } => {
                assert_eq!(details.split("; ").count(), 2, "details: {details}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_json_document_is_a_mismatch() {
        let err = validate(SchemaRole::Input, NAME_SCHEMA, b"not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
        assert!(err.to_string().contains("not valid JSON"));
    }
}
