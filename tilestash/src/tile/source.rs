//! Tile sources with an explicit initialization lifecycle.
//!
//! A source starts `Uninitialized`, moves to `Ready` once its tiling schema
//! is built, or to `Failed` if that is impossible. Status changes are
//! published on a `tokio::sync::watch` channel so renderers can wait for
//! readiness instead of polling.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::schema::TileSchema;
use super::url::TileUrlTemplate;
use crate::cache::BoxFuture;
use crate::coord::{AddressError, TileCoord, ZoomRange};
use crate::fetch::{CachingFetcher, FetchError};

/// Lifecycle state of a tile source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Uninitialized,
    Ready,
    Failed(String),
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceStatus::Uninitialized => f.write_str("uninitialized"),
            SourceStatus::Ready => f.write_str("ready"),
            SourceStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Errors raised by tile sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The configured zoom levels do not fit the resolution table.
    #[error("Minimum or maximum zoom levels are not set correctly: {0}")]
    InvalidZoomLevels(#[from] AddressError),

    /// Initialization failed; the source stays unusable.
    #[error("Tile source initialization failed: {0}")]
    InitFailed(String),

    /// A tile was requested before the source became ready.
    #[error("Tile source is not ready ({0})")]
    NotReady(SourceStatus),

    /// Fetching the tile failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A provider of raster tiles for a map view.
pub trait TileSource: Send + Sync {
    fn name(&self) -> &str;

    /// Current lifecycle state.
    fn status(&self) -> SourceStatus;

    /// Receiver notified on every status change.
    fn subscribe(&self) -> watch::Receiver<SourceStatus>;

    /// Builds the tiling schema and moves the source to `Ready` or `Failed`.
    ///
    /// Calling it on a ready source is a no-op.
    fn initialize(&self) -> BoxFuture<'_, Result<(), SourceError>>;

    /// Tiling schema, available once ready.
    fn schema(&self) -> Option<TileSchema>;

    /// Image bytes of one tile.
    ///
    /// Zoom levels outside the source's range yield an empty tile.
    fn tile(&self, coord: TileCoord) -> BoxFuture<'_, Result<Bytes, SourceError>>;
}

/// Tile source streaming slippy-map tiles through a [`CachingFetcher`].
pub struct StreamingTileSource {
    name: String,
    zoom_range: ZoomRange,
    template: TileUrlTemplate,
    fetcher: Option<Arc<CachingFetcher>>,
    status: watch::Sender<SourceStatus>,
    schema: RwLock<Option<TileSchema>>,
}

impl StreamingTileSource {
    /// Creates an uninitialized source.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidZoomLevels`] if the zoom range is
    /// inverted or exceeds the resolution table.
    pub fn new(
        name: impl Into<String>,
        zoom_range: ZoomRange,
        template: TileUrlTemplate,
        fetcher: Option<Arc<CachingFetcher>>,
    ) -> Result<Self, SourceError> {
        zoom_range.validate()?;
        let (status, _) = watch::channel(SourceStatus::Uninitialized);
        Ok(Self {
            name: name.into(),
            zoom_range,
            template,
            fetcher,
            status,
            schema: RwLock::new(None),
        })
    }

    pub fn zoom_range(&self) -> ZoomRange {
        self.zoom_range
    }

    fn set_status(&self, status: SourceStatus) {
        info!(source = %self.name, status = %status, "Tile source status changed");
        self.status.send_replace(status);
    }

    fn build_schema(&self) -> Result<TileSchema, String> {
        reqwest::Url::parse(self.template.base_url())
            .map_err(|e| format!("invalid base URL '{}': {}", self.template.base_url(), e))?;
        Ok(TileSchema::web_mercator(self.zoom_range))
    }

    async fn load_tile(&self, coord: TileCoord) -> Result<Bytes, SourceError> {
        let status = self.status();
        if status != SourceStatus::Ready {
            return Err(SourceError::NotReady(status));
        }

        if !self.zoom_range.contains(coord.zoom) || !coord.is_valid() {
            warn!(source = %self.name, tile = %coord, "Tile outside source range, returning empty tile");
            return Ok(Bytes::new());
        }

        let Some(fetcher) = &self.fetcher else {
            error!(source = %self.name, tile = %coord, "No fetcher attached, returning empty tile");
            return Ok(Bytes::new());
        };

        let url = self.template.url(&coord);
        Ok(fetcher.fetch(&url).await?.bytes)
    }
}

impl TileSource for StreamingTileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> SourceStatus {
        self.status.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<SourceStatus> {
        self.status.subscribe()
    }

    fn initialize(&self) -> BoxFuture<'_, Result<(), SourceError>> {
        Box::pin(async move {
            if self.status() == SourceStatus::Ready {
                return Ok(());
            }

            match self.build_schema() {
                Ok(schema) => {
                    *self.schema.write() = Some(schema);
                    self.set_status(SourceStatus::Ready);
                    Ok(())
                }
                Err(reason) => {
                    error!(source = %self.name, reason = %reason, "Tile source initialization failed");
                    self.set_status(SourceStatus::Failed(reason.clone()));
                    Err(SourceError::InitFailed(reason))
                }
            }
        })
    }

    fn schema(&self) -> Option<TileSchema> {
        self.schema.read().clone()
    }

    fn tile(&self, coord: TileCoord) -> BoxFuture<'_, Result<Bytes, SourceError>> {
        Box::pin(self.load_tile(coord))
    }
}
