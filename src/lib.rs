// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod context;
pub mod credentials;
pub mod display;
pub mod error;
pub mod http;
pub mod logging;
pub mod memo;
pub mod mock;
pub mod model;
pub mod render;
pub mod snapshot;
pub mod sources;
pub mod text;

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Local};
use tracing::info;

pub use crate::aggregator::Aggregator;
pub use crate::context::RuntimeContext;
pub use crate::error::{FetchError, FetchResult};
pub use crate::render::{Renderer, TemplateRenderer};
pub use crate::snapshot::Snapshot;

/// One full generation cycle: collect, render, write.
///
/// Source failures never reach the caller; only rendering or writing the
/// output fails the cycle.
pub async fn generate_once(
    aggregator: &mut Aggregator,
    renderer: &dyn Renderer,
    now: DateTime<Local>,
) -> anyhow::Result<PathBuf> {
    let snapshot = aggregator.collect(now).await;
    let html = renderer.render(&snapshot).context("rendering dashboard")?;
    let paths = &aggregator.context().config.paths;
    let page = render::write_output(&paths.output_dir, &paths.static_dir, &html)
        .context("writing dashboard output")?;
    info!(path = %page.display(), "dashboard generated");
    Ok(page)
}
