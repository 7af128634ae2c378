//! The contracts between the coordinator and whatever draws the features.

use crate::feature::{Feature, FeatureId};

/// User input, as reported by the views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
  /// The search text changed.
  QueryChanged(String),
  /// Another category was picked, `None` for all categories.
  CategoryChanged(Option<String>),
  /// A marker or a list entry was clicked.
  Activated(FeatureId),
}

/// Shows features as markers on a map.
pub trait MapRenderer {
  /// Replaces all markers by one marker per feature with a position. The marker of `active` is
  /// highlighted and only its popup may stay open.
  fn render(&mut self, features: &[&Feature], active: Option<&FeatureId>);

  /// Moves the viewport so that all features with a position are visible. Does nothing if there
  /// are none.
  fn fit_to_bounds(&mut self, features: &[&Feature]);

  /// Centers on the feature and opens its popup. Called after `render` made it active.
  fn focus(&mut self, feature: &Feature);
}

/// Shows features as a list next to the map.
pub trait ListRenderer {
  /// Replaces the list content. The entry of `active` is highlighted.
  fn render(&mut self, features: &[&Feature], active: Option<&FeatureId>);

  /// Replaces the list content by a single message.
  fn show_message(&mut self, message: &str);
}

/// The text of the results counter.
#[must_use]
pub fn result_count(count: usize) -> String {
  format!("({count})")
}

/// Shown instead of an empty list.
pub const NO_RESULTS: &str = "No places match the current search.";
/// Shown when the data could not be loaded.
pub const LOAD_FAILED: &str = "Could not load the location data.";

/// Content of a marker popup or a list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
  pub title: String,
  pub description: String,
  pub category: String,
}

impl From<&Feature> for Summary {
  fn from(feature: &Feature) -> Self {
    Self {
      title: feature.display_name().to_string(),
      description: feature.description().to_string(),
      category: format!("Category: {}", feature.category()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn summary_of_bare_feature() {
    let summary = Summary::from(&Feature::new(0usize));
    assert_eq!(summary.title, "Unnamed");
    assert_eq!(summary.description, "");
    assert_eq!(summary.category, "Category: Uncategorized");
  }

  #[test]
  fn counter_format() {
    assert_eq!(result_count(0), "(0)");
    assert_eq!(result_count(12), "(12)");
  }
}
