//! Key command - print the cache key of a request.

use anyhow::Result;
use etag_cache::{client_cache_key, origin_cache_key};
use serde::Serialize;

use super::{request_views, KeyArgs};
use crate::output::Output;

#[derive(Serialize)]
struct KeyResult {
    source: &'static str,
    key: String,
}

/// Run the key command.
pub fn run(args: KeyArgs, output: &Output) -> Result<()> {
    let (origin, client) = request_views(&args.method, &args.url)?;
    let (source, key) = if args.client {
        ("client", client_cache_key(&client))
    } else {
        ("origin", origin_cache_key(&origin))
    };

    output.debug(&format!("Derived from the {}-facing request", source));

    if output.is_json() {
        output.json(&KeyResult { source, key });
    } else {
        output.value(&key);
    }

    Ok(())
}
