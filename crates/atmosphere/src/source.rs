//! Where atmosphere grids come from.

use std::future::Future;

use common::{AtmosphereGrid, FetchRequest, Result};
use open_meteo_client::OpenMeteoClient;

/// A type that can produce an [`AtmosphereGrid`] for a location and window.
///
/// Implementations validate the request and report invalid properties or
/// day counts as errors; callers propagate them unchanged.
pub trait AtmosphereSource {
    fn fetch(&self, request: &FetchRequest) -> impl Future<Output = Result<AtmosphereGrid>> + Send;
}

impl AtmosphereSource for OpenMeteoClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<AtmosphereGrid> {
        self.fetch_grid(request).await
    }
}
