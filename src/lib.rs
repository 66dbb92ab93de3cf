//! Fetch a single article page and reduce it to its paragraphs and one
//! representative image.
//!
//! The same [`extract::Extractor`] backs two front ends: a loopback HTTP proxy
//! with permissive CORS for browser clients, and a one-shot tool that writes
//! the result to a JSON file.

pub mod batch;
pub mod config;
pub mod encoding;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod profile;
pub mod server;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
