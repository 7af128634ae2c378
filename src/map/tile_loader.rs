use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use log::{debug, error};
use surf::http::{Method, StatusCode};
use surf::{Config, Request, Url};
use surf_governor::GovernorMiddleware;
use thiserror::Error;

use crate::config::TileProvider;
use crate::map::coordinates::Tile;

#[derive(Error, Debug)]
pub enum TileLoaderError {
  #[error("Tile {tile:?} not available.")]
  TileNotAvailable { tile: Tile },
  #[error("Download of {tile:?} failed: {message}")]
  Transfer { tile: Tile, message: String },
  #[error("Too many tile requests, {tile:?} was not downloaded.")]
  RateLimited { tile: Tile },
  #[error("Download of {tile:?} already in progress.")]
  TileDownloadInProgress { tile: Tile },
  #[error("Invalid tile url {url}.")]
  InvalidUrl { url: String },
  #[error("Failed to decode {tile:?}: {message}")]
  Decode { tile: Tile, message: String },
}

impl TileLoaderError {
  /// Whether asking again for the same tile is pointless.
  #[must_use]
  pub fn is_permanent(&self) -> bool {
    matches!(
      self,
      TileLoaderError::TileNotAvailable { .. }
        | TileLoaderError::InvalidUrl { .. }
        | TileLoaderError::Decode { .. }
    )
  }
}

/// How often a rate limited download is tried again before giving up for now.
const RATE_LIMIT_RETRIES: u32 = 40;
const RATE_LIMIT_BACKOFF: Duration = Duration::from_millis(150);

/// The encoded image data of a tile.
pub type TileData = Vec<u8>;

/// Downloads tiles from one provider. Tiles are only held in memory by the caller.
#[derive(Debug)]
pub struct TileDownloader {
  name: String,
  url_template: String,
  max_zoom: u8,
  tiles_in_download: Arc<Mutex<HashSet<Tile>>>,
  client: surf::Client,
}

impl TileDownloader {
  pub fn from_config(config: &crate::config::Config) -> impl Iterator<Item = Self> + '_ {
    config.tile_provider.iter().filter_map(|provider| {
      Self::from_provider(provider)
        .inspect_err(|e| error!("Skipping tile provider {}: {e}", provider.name))
        .ok()
    })
  }

  /// # Errors
  /// Fails if the http client cannot be created.
  pub fn from_provider(provider: &TileProvider) -> Result<Self> {
    let client: surf::Client = Config::new()
      .set_timeout(Some(Duration::from_secs(5)))
      .try_into()?;
    Ok(Self {
      name: provider.name.clone(),
      url_template: provider.url.clone(),
      max_zoom: provider.get_max_zoom(),
      tiles_in_download: Arc::default(),
      client: client.with(GovernorMiddleware::per_second(10).map_err(surf::Error::into_inner)?),
    })
  }

  #[must_use]
  pub fn name(&self) -> &str {
    &self.name
  }

  #[must_use]
  pub fn max_zoom(&self) -> u8 {
    self.max_zoom
  }

  fn url_for_tile(&self, tile: &Tile) -> String {
    self
      .url_template
      .replace("{x}", &tile.x.to_string())
      .replace("{y}", &tile.y.to_string())
      .replace("{zoom}", &tile.zoom.to_string())
      .replace("{z}", &tile.zoom.to_string())
  }

  /// Downloads the tile.
  ///
  /// # Errors
  /// Fails when the tile is already being downloaded or the server does not deliver it.
  pub async fn tile_data(&self, tile: &Tile) -> Result<TileData> {
    {
      let mut tiles_in_download = self.tiles_in_download.lock().unwrap();
      if !tiles_in_download.insert(*tile) {
        return Err(TileLoaderError::TileDownloadInProgress { tile: *tile }.into());
      }
    }

    let result = self.download_when_allowed(tile).await;
    debug!("Download of {tile:?} finished, success: {}", result.is_ok());

    self.tiles_in_download.lock().unwrap().remove(tile);
    result
  }

  /// Retries downloads the rate limiter answered with 429.
  async fn download_when_allowed(&self, tile: &Tile) -> Result<TileData> {
    let mut attempt = 0;
    loop {
      match self.download(tile).await {
        Err(TileLoaderError::RateLimited { .. }) if attempt < RATE_LIMIT_RETRIES => {
          attempt += 1;
          tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
        }
        result => return result.map_err(anyhow::Error::from),
      }
    }
  }

  async fn download(&self, tile: &Tile) -> Result<TileData, TileLoaderError> {
    let url = self.url_for_tile(tile);
    let url = Url::parse(&url).map_err(|_| TileLoaderError::InvalidUrl { url })?;
    let mut response = self
      .client
      .send(Request::new(Method::Get, url))
      .await
      .inspect_err(|e| error!("Error when downloading tile: {e}"))
      .map_err(|e| TileLoaderError::Transfer {
        tile: *tile,
        message: e.to_string(),
      })?;

    if response.status() == StatusCode::TooManyRequests {
      debug!("Download of {tile:?} rate limited");
      return Err(TileLoaderError::RateLimited { tile: *tile });
    }
    if response.status() != StatusCode::Ok {
      error!(
        "Error when downloading tile {tile:?}: status {}",
        response.status()
      );
      return Err(TileLoaderError::TileNotAvailable { tile: *tile });
    }

    let data = response
      .body_bytes()
      .await
      .map_err(|e| TileLoaderError::Transfer {
        tile: *tile,
        message: e.to_string(),
      })?;
    match data.len() {
      0..=100 => Err(TileLoaderError::TileNotAvailable { tile: *tile }),
      _ => Ok(data),
    }
  }
}

/// Decodes PNG/JPEG tile data into an image egui can upload.
///
/// # Errors
/// Fails for data that is not a supported image.
pub fn decode_tile(tile: &Tile, data: &[u8]) -> Result<egui::ColorImage, TileLoaderError> {
  let decode_error = |message: String| TileLoaderError::Decode {
    tile: *tile,
    message,
  };
  let img = image::ImageReader::new(std::io::Cursor::new(data))
    .with_guessed_format()
    .map_err(|e| decode_error(e.to_string()))?
    .decode()
    .map_err(|e| decode_error(e.to_string()))?;

  let size = [img.width() as usize, img.height() as usize];
  let image_buffer = img.to_rgba8();
  Ok(egui::ColorImage::from_rgba_unmultiplied(
    size,
    image_buffer.as_flat_samples().as_slice(),
  ))
}

#[cfg(test)]
mod tests {
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;

  use super::*;

  /// Answers every request with a 256 byte body. Returns the url template.
  async fn serve_tiles() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("address");
    tokio::spawn(async move {
      while let Ok((mut socket, _)) = listener.accept().await {
        tokio::spawn(async move {
          let mut request = [0u8; 2048];
          let _ = socket.read(&mut request).await;
          let body = [7u8; 256];
          let header = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
          );
          let _ = socket.write_all(header.as_bytes()).await;
          let _ = socket.write_all(&body).await;
          let _ = socket.shutdown().await;
        });
      }
    });
    format!("http://{addr}/{{zoom}}/{{x}}/{{y}}.png")
  }

  fn provider(url: &str) -> TileProvider {
    TileProvider {
      name: "test".to_string(),
      url: url.to_string(),
      max_zoom: None,
    }
  }

  #[test]
  fn url_template() {
    let downloader =
      TileDownloader::from_provider(&provider("https://tiles.example/{zoom}/{x}/{y}.png"))
        .expect("client");
    let tile = Tile {
      x: 3,
      y: 5,
      zoom: 7,
    };
    assert_eq!(
      downloader.url_for_tile(&tile),
      "https://tiles.example/7/3/5.png"
    );
    assert_eq!(downloader.max_zoom(), 19);

    let short = TileDownloader::from_provider(&provider("https://t/{z}/{x}/{y}")).expect("client");
    assert_eq!(short.url_for_tile(&tile), "https://t/7/3/5");
  }

  #[tokio::test]
  async fn invalid_url_fails() {
    let downloader = TileDownloader::from_provider(&provider("not a url/{zoom}")).expect("client");
    let result = downloader.tile_data(&Tile { x: 0, y: 0, zoom: 0 }).await;
    assert!(result.is_err());
    assert!(downloader.tiles_in_download.lock().unwrap().is_empty());
  }

  #[test]
  fn decode_garbage_fails() {
    let tile = Tile { x: 0, y: 0, zoom: 0 };
    assert!(decode_tile(&tile, &[0, 1, 2, 3]).is_err());
  }

  #[test]
  fn decode_png() {
    let mut png = Vec::new();
    image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]))
      .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
      .expect("encode");
    let decoded = decode_tile(&Tile { x: 0, y: 0, zoom: 0 }, &png).expect("decodes");
    assert_eq!(decoded.size, [4, 2]);
  }

  #[tokio::test]
  async fn burst_above_rate_limit_is_downloaded() {
    let url = serve_tiles().await;
    let downloader = Arc::new(TileDownloader::from_provider(&provider(&url)).expect("client"));

    // About one screen of tiles at once, more than the limiter lets through per second.
    let downloads: Vec<_> = (0..24)
      .map(|x| {
        let downloader = downloader.clone();
        tokio::spawn(async move { downloader.tile_data(&Tile { x, y: 3, zoom: 5 }).await })
      })
      .collect();

    let mut downloaded = 0;
    for download in downloads {
      let data = download.await.expect("task").expect("tile");
      assert_eq!(data.len(), 256);
      downloaded += 1;
    }
    assert_eq!(downloaded, 24);
  }

  #[test]
  fn only_missing_or_broken_tiles_are_permanent() {
    let tile = Tile { x: 1, y: 2, zoom: 3 };
    assert!(TileLoaderError::TileNotAvailable { tile }.is_permanent());
    assert!(
      TileLoaderError::Decode {
        tile,
        message: String::new()
      }
      .is_permanent()
    );
    assert!(!TileLoaderError::RateLimited { tile }.is_permanent());
    assert!(!TileLoaderError::TileDownloadInProgress { tile }.is_permanent());
    assert!(
      !TileLoaderError::Transfer {
        tile,
        message: "timeout".to_string()
      }
      .is_permanent()
    );
  }
}
