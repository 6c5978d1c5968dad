//! Local `$ref` resolver.
//!
//! `openapiv3` models `$ref`s as `ReferenceOr<T>` without resolving them. Only same-document
//! refs under `#/components/...` are followed; external, missing and cyclic refs resolve to
//! `None` and the caller falls back to a default.

use openapiv3::{Components, OpenAPI, Parameter, ReferenceOr, RequestBody, Schema};
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct LocalResolver<'a> {
    components: Option<&'a Components>,
}

impl<'a> LocalResolver<'a> {
    #[must_use]
    pub fn new(doc: &'a OpenAPI) -> Self {
        Self {
            components: doc.components.as_ref(),
        }
    }

    #[must_use]
    pub fn parameter(&self, r: &'a ReferenceOr<Parameter>) -> Option<&'a Parameter> {
        self.follow(r, "#/components/parameters/", |c, name| {
            c.parameters.get(name)
        })
    }

    #[must_use]
    pub fn request_body(&self, r: &'a ReferenceOr<RequestBody>) -> Option<&'a RequestBody> {
        self.follow(r, "#/components/requestBodies/", |c, name| {
            c.request_bodies.get(name)
        })
    }

    #[must_use]
    pub fn schema(&self, r: &'a ReferenceOr<Schema>) -> Option<&'a Schema> {
        self.follow(r, "#/components/schemas/", |c, name| c.schemas.get(name))
    }

    fn follow<T>(
        &self,
        start: &'a ReferenceOr<T>,
        prefix: &str,
        lookup: impl Fn(&'a Components, &str) -> Option<&'a ReferenceOr<T>>,
    ) -> Option<&'a T> {
        let mut seen: HashSet<&'a str> = HashSet::new();
        let mut cur = start;

        loop {
            match cur {
                ReferenceOr::Item(item) => return Some(item),
                ReferenceOr::Reference { reference } => {
                    if !seen.insert(reference.as_str()) {
                        warn!(reference = %reference, "cyclic $ref");
                        return None;
                    }
                    let Some(name) = reference.strip_prefix(prefix) else {
                        warn!(reference = %reference, "unsupported $ref (only {prefix}* is followed)");
                        return None;
                    };
                    let name = unescape_pointer_token(name);
                    let Some(next) = self.components.and_then(|c| lookup(c, &name)) else {
                        warn!(reference = %reference, "unresolved $ref");
                        return None;
                    };
                    cur = next;
                }
            }
        }
    }
}

/// JSON pointer token unescaping (`~1` is `/`, `~0` is `~`).
fn unescape_pointer_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}
