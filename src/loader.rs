use std::{
  fmt::Display,
  path::PathBuf,
  str::FromStr,
  sync::mpsc::{Receiver, channel},
};

use surf::Url;
use thiserror::Error;

use crate::feature::FeatureCollection;

/// Everything that can go wrong while loading the location data.
#[derive(Error, Debug)]
pub enum LoadError {
  #[error("Failed to read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to fetch {url}: {message}")]
  Fetch { url: String, message: String },
  #[error("Fetching {url} returned status {status}")]
  Status { url: String, status: u16 },
  #[error("Malformed JSON: {0}")]
  Json(#[from] serde_json::Error),
  #[error("Not a GeoJSON FeatureCollection: {0}")]
  Format(String),
}

/// The location of the `GeoJSON` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
  File(PathBuf),
  Url(Url),
}

impl FromStr for DataSource {
  type Err = surf::http::url::ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.starts_with("http://") || s.starts_with("https://") {
      Ok(Self::Url(Url::parse(s)?))
    } else {
      Ok(Self::File(PathBuf::from(s)))
    }
  }
}

impl Display for DataSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      DataSource::File(path) => write!(f, "{}", path.display()),
      DataSource::Url(url) => write!(f, "{url}"),
    }
  }
}

/// Loads and parses the complete document. There is no partial result.
///
/// # Errors
/// See [`LoadError`].
pub async fn load(source: &DataSource) -> Result<FeatureCollection, LoadError> {
  let data = match source {
    DataSource::File(path) => {
      tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Io {
          path: path.clone(),
          source,
        })?
    }
    DataSource::Url(url) => fetch(url).await?,
  };
  let collection = FeatureCollection::from_geojson(&data)?;
  log::info!("Loaded {} features from {source}", collection.len());
  Ok(collection)
}

async fn fetch(url: &Url) -> Result<String, LoadError> {
  let fetch_error = |e: surf::Error| LoadError::Fetch {
    url: url.to_string(),
    message: e.to_string(),
  };
  let mut response = surf::get(url.clone()).await.map_err(fetch_error)?;
  if !response.status().is_success() {
    return Err(LoadError::Status {
      url: url.to_string(),
      status: response.status().into(),
    });
  }
  response.body_string().await.map_err(fetch_error)
}

/// Runs [`load`] on the tokio runtime. The receiver gets exactly one result, after which a repaint
/// is requested.
pub fn spawn_load(
  source: DataSource,
  ctx: egui::Context,
) -> Receiver<Result<FeatureCollection, LoadError>> {
  let (send, recv) = channel();
  tokio::spawn(async move {
    let result = load(&source).await;
    if send.send(result).is_err() {
      log::debug!("Load of {source} finished after the receiver was dropped");
    }
    ctx.request_repaint();
  });
  recv
}

#[cfg(test)]
mod tests {
  use super::*;

  fn resource(name: &str) -> DataSource {
    DataSource::File(
      [env!("CARGO_MANIFEST_DIR"), "tests", "resources", name]
        .iter()
        .collect(),
    )
  }

  #[test]
  fn data_source_from_str() {
    assert_eq!(
      "data/locations.geojson".parse::<DataSource>().ok(),
      Some(DataSource::File(PathBuf::from("data/locations.geojson")))
    );
    assert!(matches!(
      "https://example.org/places.geojson".parse::<DataSource>(),
      Ok(DataSource::Url(_))
    ));
    assert!("http://".parse::<DataSource>().is_err());
  }

  #[tokio::test]
  async fn load_file() {
    let collection = load(&resource("plazas.geojson")).await.expect("loads");
    assert_eq!(collection.len(), 3);
  }

  #[tokio::test]
  async fn missing_file_is_io_error() {
    let result = load(&resource("does_not_exist.geojson")).await;
    assert!(matches!(result, Err(LoadError::Io { .. })));
  }

  #[tokio::test]
  async fn malformed_file_is_json_error() {
    let result = load(&resource("malformed.geojson")).await;
    assert!(matches!(result, Err(LoadError::Json(_))));
  }

  #[tokio::test]
  async fn spawned_load_delivers_one_result() {
    let recv = spawn_load(resource("empty.geojson"), egui::Context::default());
    let result = tokio::task::spawn_blocking(move || recv.recv())
      .await
      .expect("join");
    let collection = result.expect("sent").expect("loads");
    assert!(collection.is_empty());
  }
}
