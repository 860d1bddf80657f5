//! Tag template expansion.

use std::collections::BTreeSet;

use etag_core::Placeholder;

/// Expand tag templates against placeholder bindings.
///
/// Each binding replaces every occurrence of its braces-form name, in binding
/// order. Placeholders without a binding stay verbatim.
pub fn expand_tags<S: AsRef<str>>(templates: &[S], placeholders: &[Placeholder]) -> BTreeSet<String> {
    templates
        .iter()
        .map(|template| {
            placeholders
                .iter()
                .fold(template.as_ref().to_string(), |tag, p| {
                    tag.replace(&p.name, &p.value)
                })
        })
        .collect()
}
