//! Tags command - expand tag templates.

use anyhow::Result;
use etag_cache::expand_tags;

use super::{placeholders, TagsArgs};
use crate::output::Output;

/// Run the tags command.
pub fn run(args: TagsArgs, output: &Output) -> Result<()> {
    let placeholders = placeholders(&args.bindings);
    let tags = expand_tags(&args.templates, &placeholders);

    for tag in tags.iter().filter(|t| t.contains('{')) {
        output.warn(&format!("Unbound placeholder left in tag: {}", tag));
    }

    if output.is_json() {
        output.json(&tags);
    } else {
        for tag in &tags {
            output.value(tag);
        }
    }

    Ok(())
}
