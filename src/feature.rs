use std::{collections::HashMap, fmt::Display};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{loader::LoadError, map::coordinates::WGS84Coordinate};

/// Category of features without one.
pub const UNCATEGORIZED: &str = "Uncategorized";
/// Name shown for features without one.
pub const UNNAMED: &str = "Unnamed";

/// Identifies a feature within its collection. The index in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(String);

impl FeatureId {
  #[must_use]
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  #[must_use]
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<usize> for FeatureId {
  fn from(index: usize) -> Self {
    Self(index.to_string())
  }
}

impl From<&str> for FeatureId {
  fn from(id: &str) -> Self {
    Self(id.to_string())
  }
}

impl Display for FeatureId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// A point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
  pub id: FeatureId,
  pub name: Option<String>,
  pub description: Option<String>,
  pub category: Option<String>,
  pub position: Option<WGS84Coordinate>,
}

impl Feature {
  #[must_use]
  pub fn new(id: impl Into<FeatureId>) -> Self {
    Self {
      id: id.into(),
      name: None,
      description: None,
      category: None,
      position: None,
    }
  }

  #[must_use]
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  #[must_use]
  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  #[must_use]
  pub fn with_category(mut self, category: impl Into<String>) -> Self {
    self.category = Some(category.into());
    self
  }

  #[must_use]
  pub fn with_position(mut self, position: WGS84Coordinate) -> Self {
    self.position = Some(position);
    self
  }

  #[must_use]
  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or(UNNAMED)
  }

  #[must_use]
  pub fn description(&self) -> &str {
    self.description.as_deref().unwrap_or_default()
  }

  #[must_use]
  pub fn category(&self) -> &str {
    self.category.as_deref().unwrap_or(UNCATEGORIZED)
  }

  fn from_geojson(index: usize, value: &Value) -> Self {
    let mut feature = Self::new(index);
    let Some(obj) = value.as_object() else {
      log::warn!("Feature {index} is not an object, keeping it without attributes");
      return feature;
    };

    if let Some(properties) = obj.get("properties").and_then(Value::as_object) {
      feature.name = property_text(properties, "name");
      feature.description = property_text(properties, "description");
      feature.category = property_text(properties, "category");
    }

    feature.position = obj.get("geometry").and_then(parse_point);
    if feature.position.is_none() {
      log::debug!("Feature {index} has no usable point geometry");
    }
    feature
  }
}

/// Text of a property. Scalars are stringified, `null` and structured values are ignored.
fn property_text(properties: &Map<String, Value>, key: &str) -> Option<String> {
  match properties.get(key)? {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Null | Value::Array(_) | Value::Object(_) => None,
  }
}

/// `GeoJSON` stores points as `[lon, lat, (elevation)]`.
#[allow(clippy::cast_possible_truncation)]
fn parse_point(geometry: &Value) -> Option<WGS84Coordinate> {
  let obj = geometry.as_object()?;
  if obj.get("type")?.as_str()? != "Point" {
    return None;
  }
  let coordinates = obj.get("coordinates")?.as_array()?;
  if coordinates.len() < 2 {
    return None;
  }
  let lon = coordinates[0].as_f64()? as f32;
  let lat = coordinates[1].as_f64()? as f32;
  Some(WGS84Coordinate::new(lat, lon)).filter(WGS84Coordinate::is_valid)
}

/// All features of one data source in document order. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
  features: Vec<Feature>,
  index: HashMap<FeatureId, usize>,
}

impl FeatureCollection {
  /// Parses a `GeoJSON` `FeatureCollection`. Ids are assigned from the position in the document.
  ///
  /// # Errors
  /// Fails on invalid JSON or when the document is not a `FeatureCollection`.
  pub fn from_geojson(data: &str) -> Result<Self, LoadError> {
    let value: Value = serde_json::from_str(data)?;
    let obj = value
      .as_object()
      .ok_or_else(|| LoadError::Format("document is not an object".to_string()))?;

    match obj.get("type").and_then(Value::as_str) {
      Some("FeatureCollection") => {}
      Some(other) => {
        return Err(LoadError::Format(format!(
          "expected a FeatureCollection, found {other}"
        )));
      }
      None => return Err(LoadError::Format("missing 'type'".to_string())),
    }

    let features = match obj.get("features") {
      None | Some(Value::Null) => Vec::new(),
      Some(Value::Array(features)) => features
        .iter()
        .enumerate()
        .map(|(i, f)| Feature::from_geojson(i, f))
        .collect(),
      Some(_) => return Err(LoadError::Format("'features' is not an array".to_string())),
    };

    Ok(Self::from_features(features))
  }

  /// Builds a collection from features that already carry their ids. Later duplicates of an id
  /// are dropped.
  #[must_use]
  pub fn from_features(features: impl IntoIterator<Item = Feature>) -> Self {
    let mut collection = Self::default();
    for feature in features {
      if collection.index.contains_key(&feature.id) {
        log::warn!("Dropping feature with duplicate id {}", feature.id);
        continue;
      }
      collection
        .index
        .insert(feature.id.clone(), collection.features.len());
      collection.features.push(feature);
    }
    collection
  }

  #[must_use]
  pub fn features(&self) -> &[Feature] {
    &self.features
  }

  #[must_use]
  pub fn get(&self, id: &FeatureId) -> Option<&Feature> {
    self.index.get(id).map(|&i| &self.features[i])
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.features.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.features.is_empty()
  }
}
