mod client;
mod endpoints;

pub use client::{UPSTREAM_BODY_PREVIEW_CHARS, UpstairsClient};
pub use endpoints::UpstairsEndpoints;
