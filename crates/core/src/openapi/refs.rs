//! Document-level `$ref` resolution.
//!
//! Only request bodies, responses, parameters and headers are chased, and only
//! one level: the referenced component is returned as-is even if it is itself
//! a reference. Schema-level `$ref` is never followed.

use std::collections::BTreeMap;

/// Last segment of a reference, e.g. `#/components/responses/NotFound` -> `NotFound`.
pub fn simple_ref(ref_path: &str) -> &str {
    ref_path.rsplit('/').next().unwrap_or(ref_path)
}

/// Resolve a reference against one components table.
///
/// Returns `None` when the target does not exist.
pub fn resolve<'a, T>(table: &'a mut BTreeMap<String, T>, ref_path: &str) -> Option<&'a mut T> {
    table.get_mut(simple_ref(ref_path))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::openapi::spec::{ApiResponse, Components, Parameter};

    #[test]
    fn test_simple_ref() {
        assert_eq!(simple_ref("#/components/requestBodies/Pet"), "Pet");
        assert_eq!(simple_ref("Pet"), "Pet");
        assert_eq!(simple_ref("#/components/schemas/"), "");
    }

    #[test]
    fn test_dangling_reference_is_none() {
        let mut components = Components::default();
        components
            .responses
            .insert("NotFound".into(), ApiResponse::default());

        assert!(resolve(&mut components.responses, "#/components/responses/NotFound").is_some());
        assert!(resolve(&mut components.responses, "#/components/responses/Gone").is_none());
        assert!(resolve(&mut components.request_bodies, "#/components/requestBodies/Pet").is_none());
    }

    #[test]
    fn test_reference_is_not_chased_twice() {
        let mut components = Components::default();
        components.parameters.insert(
            "Limit".into(),
            Parameter {
                ref_path: Some("#/components/parameters/PageSize".into()),
                ..Parameter::default()
            },
        );
        components
            .parameters
            .insert("PageSize".into(), Parameter::default());

        let resolved = resolve(&mut components.parameters, "#/components/parameters/Limit").unwrap();
        assert_eq!(
            resolved.ref_path.as_deref(),
            Some("#/components/parameters/PageSize")
        );
    }
}
