//! Schema de-aliasing pass.
//!
//! A document loader may reuse one schema node for every structurally
//! identical fragment it meets. Later passes edit schemas in place, so an
//! edit meant for one position would leak into every other position sharing
//! that node. This pass walks every schema root of the document and gives
//! each structural position its own node. Sharing through `$ref` to a named
//! component is intentional and is left alone.
//!
//! ## Module Structure
//!
//! - `identity`: `IdentityTracker` (pass scoped) and `CycleGuard` (root scoped)
//! - `clone`: shallow copies of aliased nodes
//! - `classify`: node shape detection in priority order
//! - `walk`: the depth-first walker
//!
//! The driver below enumerates the roots: path-level parameters; for every
//! operation (callback operations included) its request body, parameters and
//! responses; then the component tables.

mod classify;
mod clone;
mod identity;
mod walk;

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, warn};

pub use classify::{NodeKind, classify};
pub use clone::clone_node;
pub use identity::{CycleGuard, IdentityTracker};
pub use walk::Walker;

use super::refs::{resolve, simple_ref};
use super::spec::{
    ApiResponse, Components, Document, Header, MediaType, Operation, Parameter, PathItem,
    RequestBody, SchemaId,
};
use crate::error::Result;

/// Outcome of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Root entry points walked.
    pub roots: usize,
    /// Schema copies made to break aliasing.
    pub clones: usize,
    /// Component schema names whose definition was absent.
    pub missing_component_schemas: Vec<String>,
    /// References whose target does not exist; those subtrees were skipped.
    pub dangling_refs: Vec<String>,
}

impl PassSummary {
    /// Number of warnings emitted during the pass.
    pub fn warnings(&self) -> usize {
        self.missing_component_schemas.len()
    }
}

/// Break every structural schema alias in `document`, in place.
///
/// Fails only on a structurally invalid document (a composition member that
/// is neither a schema nor null); the document is then left partially
/// processed.
///
/// Schema nesting is walked on a heap-allocated stack, so documents built in
/// code may nest arbitrarily deep. Emitting such a document still recurses.
pub fn dealias(document: &mut Document) -> Result<PassSummary> {
    let Document {
        paths,
        components,
        schemas,
        ..
    } = document;

    let mut absent = Components::default();
    let components = components.as_mut().unwrap_or(&mut absent);
    let Components {
        schemas: component_schemas,
        responses,
        request_bodies,
        parameters,
        headers,
        ..
    } = components;

    let mut driver = Driver {
        walker: Walker::new(schemas),
        tables: Tables {
            request_bodies,
            responses,
            parameters,
            headers,
        },
        book: Bookkeeping::default(),
    };

    driver.paths(paths)?;
    let missing = driver.component_schemas(component_schemas)?;
    driver.component_responses()?;
    driver.component_request_bodies()?;
    driver.component_parameters()?;
    driver.component_headers()?;

    let summary = PassSummary {
        roots: driver.walker.roots(),
        clones: driver.walker.clones(),
        missing_component_schemas: missing,
        dangling_refs: driver.book.dangling_refs,
    };
    info!(
        roots = summary.roots,
        clones = summary.clones,
        warnings = summary.warnings(),
        "Schema de-aliasing complete."
    );
    Ok(summary)
}

/// Component tables that `$ref`s resolve against.
struct Tables<'a> {
    request_bodies: &'a mut BTreeMap<String, RequestBody>,
    responses: &'a mut BTreeMap<String, ApiResponse>,
    parameters: &'a mut BTreeMap<String, Parameter>,
    headers: &'a mut BTreeMap<String, Header>,
}

/// Components already walked, and references that led nowhere.
///
/// A named component is a single position however many `$ref`s point at it,
/// so it is walked once per pass.
#[derive(Default)]
struct Bookkeeping {
    walked: HashSet<String>,
    dangling_refs: Vec<String>,
}

impl Bookkeeping {
    fn first_walk(&mut self, table: &str, name: &str) -> bool {
        self.walked.insert(format!("{table}/{name}"))
    }
}

struct Driver<'a> {
    walker: Walker<'a>,
    tables: Tables<'a>,
    book: Bookkeeping,
}

impl Driver<'_> {
    fn paths(&mut self, paths: &mut BTreeMap<String, PathItem>) -> Result<()> {
        for (path, item) in paths.iter_mut() {
            debug!(path = %path, "Dealiasing path item.");

            self.parameters(item.parameters.as_mut())?;

            for operation in item.operations_mut() {
                self.operation(operation)?;
            }

            // Callback operations are handled like the path's own.
            for operation in item.operations_mut() {
                let Some(callbacks) = operation.callbacks.as_mut() else {
                    continue;
                };
                for callback in callbacks.values_mut() {
                    for callback_item in callback.values_mut() {
                        for callback_op in callback_item.operations_mut() {
                            self.operation(callback_op)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn operation(&mut self, operation: &mut Operation) -> Result<()> {
        if let Some(body) = operation.request_body.as_mut() {
            self.request_body(body)?;
        }
        self.parameters(operation.parameters.as_mut())?;
        if let Some(responses) = operation.responses.as_mut() {
            for response in responses.values_mut() {
                self.response(response)?;
            }
        }
        Ok(())
    }

    fn request_body(&mut self, body: &mut RequestBody) -> Result<()> {
        let Some(ref_path) = body.ref_path.clone() else {
            return content_roots(&mut self.walker, body.content.as_mut());
        };
        if !self.book.first_walk(REQUEST_BODIES, simple_ref(&ref_path)) {
            return Ok(());
        }
        match resolve(self.tables.request_bodies, &ref_path) {
            Some(target) => content_roots(&mut self.walker, target.content.as_mut()),
            None => {
                self.book.dangling_refs.push(ref_path);
                Ok(())
            }
        }
    }

    fn parameters(&mut self, parameters: Option<&mut Vec<Parameter>>) -> Result<()> {
        let Some(parameters) = parameters else {
            return Ok(());
        };
        for parameter in parameters.iter_mut() {
            let Some(ref_path) = parameter.ref_path.clone() else {
                parameter_roots(&mut self.walker, parameter)?;
                continue;
            };
            if !self.book.first_walk(PARAMETERS, simple_ref(&ref_path)) {
                continue;
            }
            match resolve(self.tables.parameters, &ref_path) {
                Some(target) => parameter_roots(&mut self.walker, target)?,
                None => self.book.dangling_refs.push(ref_path),
            }
        }
        Ok(())
    }

    fn response(&mut self, response: &mut ApiResponse) -> Result<()> {
        let target = match response.ref_path.clone() {
            Some(ref_path) => {
                if !self.book.first_walk(RESPONSES, simple_ref(&ref_path)) {
                    return Ok(());
                }
                match resolve(self.tables.responses, &ref_path) {
                    Some(target) => target,
                    None => {
                        self.book.dangling_refs.push(ref_path);
                        return Ok(());
                    }
                }
            }
            None => response,
        };
        response_roots(&mut self.walker, self.tables.headers, &mut self.book, target)
    }

    /// Returns the names whose definition was absent.
    fn component_schemas(
        &mut self,
        schemas: &mut BTreeMap<String, Option<SchemaId>>,
    ) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        let names: Vec<String> = schemas.keys().cloned().collect();
        for name in names {
            match schemas.get_mut(&name) {
                Some(Some(slot)) => {
                    debug!(schema = %name, "Dealiasing component schema.");
                    self.walker.walk_root(slot)?;
                }
                _ => {
                    warn!(schema = %name, "{name} not found in openapi/components/schemas.");
                    missing.push(name);
                }
            }
        }
        Ok(missing)
    }

    fn component_responses(&mut self) -> Result<()> {
        let names: Vec<String> = self.tables.responses.keys().cloned().collect();
        for name in names {
            let target_name = component_target(self.tables.responses.get(&name), name, |r| {
                r.ref_path.as_deref()
            });
            if !self.book.first_walk(RESPONSES, &target_name) {
                continue;
            }
            match self.tables.responses.get_mut(&target_name) {
                Some(target) => {
                    response_roots(&mut self.walker, self.tables.headers, &mut self.book, target)?;
                }
                None => self.book.dangling_refs.push(target_name),
            }
        }
        Ok(())
    }

    fn component_request_bodies(&mut self) -> Result<()> {
        for (name, body) in self.tables.request_bodies.iter_mut() {
            if body.ref_path.is_none() && self.book.first_walk(REQUEST_BODIES, name) {
                content_roots(&mut self.walker, body.content.as_mut())?;
            }
        }
        Ok(())
    }

    fn component_parameters(&mut self) -> Result<()> {
        for (name, parameter) in self.tables.parameters.iter_mut() {
            if parameter.ref_path.is_none() && self.book.first_walk(PARAMETERS, name) {
                parameter_roots(&mut self.walker, parameter)?;
            }
        }
        Ok(())
    }

    fn component_headers(&mut self) -> Result<()> {
        for (name, header) in self.tables.headers.iter_mut() {
            if header.ref_path.is_none() && self.book.first_walk(HEADERS, name) {
                self.walker.walk_optional_root(header.schema.as_mut())?;
            }
        }
        Ok(())
    }
}

const REQUEST_BODIES: &str = "requestBodies";
const RESPONSES: &str = "responses";
const PARAMETERS: &str = "parameters";
const HEADERS: &str = "headers";

/// Name of the entry a component table entry stands for: its `$ref` target,
/// or itself.
fn component_target<T>(
    entry: Option<&T>,
    name: String,
    ref_path: impl Fn(&T) -> Option<&str>,
) -> String {
    match entry.and_then(ref_path) {
        Some(ref_path) => simple_ref(ref_path).to_string(),
        None => name,
    }
}

fn content_roots(
    walker: &mut Walker<'_>,
    content: Option<&mut BTreeMap<String, MediaType>>,
) -> Result<()> {
    if let Some(content) = content {
        for media_type in content.values_mut() {
            walker.walk_optional_root(media_type.schema.as_mut())?;
        }
    }
    Ok(())
}

fn parameter_roots(walker: &mut Walker<'_>, parameter: &mut Parameter) -> Result<()> {
    walker.walk_optional_root(parameter.schema.as_mut())?;
    content_roots(walker, parameter.content.as_mut())
}

fn response_roots(
    walker: &mut Walker<'_>,
    headers_table: &mut BTreeMap<String, Header>,
    book: &mut Bookkeeping,
    response: &mut ApiResponse,
) -> Result<()> {
    content_roots(walker, response.content.as_mut())?;
    let Some(headers) = response.headers.as_mut() else {
        return Ok(());
    };
    for header in headers.values_mut() {
        let target = match header.ref_path.clone() {
            Some(ref_path) => {
                if !book.first_walk(HEADERS, simple_ref(&ref_path)) {
                    continue;
                }
                match resolve(headers_table, &ref_path) {
                    Some(target) => target,
                    None => {
                        book.dangling_refs.push(ref_path);
                        continue;
                    }
                }
            }
            None => header,
        };
        walker.walk_optional_root(target.schema.as_mut())?;
    }
    Ok(())
}
