//! CLI commands.

pub mod check;
pub mod explain;
pub mod key;
pub mod tags;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use etag_core::{Placeholder, RequestView};
use http::{HeaderName, HeaderValue, Method, Uri};

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Configuration file (.toml or .json)
    pub config: PathBuf,
}

/// Arguments for the explain command.
#[derive(Args)]
pub struct ExplainArgs {
    /// Configuration file (.toml or .json)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Route key to resolve
    #[arg(short, long)]
    pub route: String,

    /// HTTP method
    pub method: String,

    /// Request URL as seen by the origin
    pub url: String,

    /// Request header ("Name: value"), repeatable
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(HeaderName, HeaderValue)>,

    /// Placeholder binding (name=value), repeatable
    #[arg(short, long = "bind", value_parser = parse_binding)]
    pub bindings: Vec<(String, String)>,
}

/// Arguments for the key command.
#[derive(Args)]
pub struct KeyArgs {
    /// HTTP method
    pub method: String,

    /// Request URL
    pub url: String,

    /// Keep the port, as the client-facing key does
    #[arg(long)]
    pub client: bool,
}

/// Arguments for the tags command.
#[derive(Args)]
pub struct TagsArgs {
    /// Tag template, repeatable
    #[arg(short, long = "template", required = true)]
    pub templates: Vec<String>,

    /// Placeholder binding (name=value), repeatable
    #[arg(short, long = "bind", value_parser = parse_binding)]
    pub bindings: Vec<(String, String)>,
}

/// Parse a `name=value` placeholder binding.
fn parse_binding(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty placeholder name in '{}'", s));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Parse a `Name: value` request header.
fn parse_header(s: &str) -> Result<(HeaderName, HeaderValue), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected 'Name: value', got '{}'", s))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| e.to_string())?;
    let value = HeaderValue::from_str(value.trim()).map_err(|e| e.to_string())?;
    Ok((name, value))
}

pub(crate) fn placeholders(bindings: &[(String, String)]) -> Vec<Placeholder> {
    bindings
        .iter()
        .map(|(name, value)| Placeholder::new(name, value.clone()))
        .collect()
}

pub(crate) fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", method))
}

/// Origin- and client-facing views of a URL.
pub(crate) fn request_views(method: &str, url: &str) -> Result<(RequestView, RequestView)> {
    let method = parse_method(method)?;
    let uri: Uri = url
        .parse()
        .with_context(|| format!("Invalid URL: {}", url))?;
    if uri.scheme().is_none() {
        return Err(anyhow!("URL must be absolute: {}", url));
    }

    let origin = RequestView::origin_from_uri(method.clone(), &uri)?;
    let client = RequestView::client_from_uri(method, &uri)?;
    Ok((origin, client))
}
