//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::sync::Arc;

use super::error::ConverterError;
use super::types::{ConversionRequest, ConversionResult, JobProgress, ProgressSink};

/// Performs (or simulates) the conversion of a single file.
///
/// Implementations never fail the call: every problem is captured into the
/// returned [`ConversionResult`].
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Converts one request, reporting ticks through `progress`.
    async fn convert(
        &self,
        request: &ConversionRequest,
        progress: &mut JobProgress,
    ) -> ConversionResult;

    /// Stops in-flight work. Must be idempotent.
    fn release(&self) {}
}

/// A backend that runs whole batches.
#[async_trait]
pub trait ConversionBackend: Send + Sync {
    /// Returns the name of the converter driving this backend.
    fn name(&self) -> &str;

    /// Runs every request and returns one result per request, in request order.
    async fn run_batch(
        &self,
        requests: Vec<ConversionRequest>,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Vec<ConversionResult>, ConverterError>;

    /// Stops accepting work and releases held resources.
    ///
    /// Safe to call repeatedly, concurrently, and before any batch ran.
    fn release(&self);
}
