use itertools::Itertools as _;

use crate::feature::Feature;

/// The current search criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
  /// Free text, matched case-insensitively against the feature name.
  pub query: String,
  /// The category picked in the selector. Recorded, but not used for matching.
  pub category: Option<String>,
}

impl FilterState {
  #[must_use]
  pub fn with_query(query: impl Into<String>) -> Self {
    Self {
      query: query.into(),
      category: None,
    }
  }

  fn needle(&self) -> String {
    self.query.trim().to_lowercase()
  }

  fn matches_needle(needle: &str, feature: &Feature) -> bool {
    needle.is_empty()
      || feature
        .name
        .as_deref()
        .is_some_and(|name| name.to_lowercase().contains(needle))
  }
}

/// The features matching `filter`, in their original order.
#[must_use]
pub fn apply<'a>(features: &'a [Feature], filter: &FilterState) -> Vec<&'a Feature> {
  let needle = filter.needle();
  let filtered: Vec<_> = features
    .iter()
    .filter(|f| FilterState::matches_needle(&needle, f))
    .collect();
  log::debug!(
    "Filter {:?} matched {} of {} features",
    filter.query,
    filtered.len(),
    features.len()
  );
  filtered
}

/// The distinct categories in order of first appearance. Used to fill the category selector.
#[must_use]
pub fn categories(features: &[Feature]) -> Vec<&str> {
  features.iter().map(Feature::category).unique().collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::feature::{FeatureCollection, UNCATEGORIZED};
  use rstest::{fixture, rstest};

  #[fixture]
  fn places() -> Vec<Feature> {
    [
      ("Plaza Central", Some("Plaza")),
      ("Parque Norte", Some("Parque")),
      ("Plaza Sur", None),
      ("Mercado 4", Some("Mercado")),
      ("PLAZA de los Héroes", Some("Plaza")),
      ("Costanera", Some("Parque")),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (name, category))| {
      let f = Feature::new(i).with_name(name);
      match category {
        Some(c) => f.with_category(c),
        None => f,
      }
    })
    .chain(std::iter::once(Feature::new(6usize)))
    .collect()
  }

  fn ids(features: &[&Feature]) -> Vec<String> {
    features.iter().map(|f| f.id.to_string()).collect()
  }

  #[rstest]
  #[case("plaza", &["0", "2", "4"])]
  #[case("PLAZA", &["0", "2", "4"])]
  #[case("  sur ", &["2"])]
  #[case("er", &["3", "5"])]
  #[case("héroes", &["4"])]
  #[case("nothing", &[])]
  fn matches_names_case_insensitively(
    places: Vec<Feature>,
    #[case] query: &str,
    #[case] expected: &[&str],
  ) {
    let filtered = apply(&places, &FilterState::with_query(query));
    assert_eq!(ids(&filtered), expected);
  }

  #[rstest]
  fn empty_query_matches_everything(places: Vec<Feature>) {
    assert_eq!(apply(&places, &FilterState::default()).len(), places.len());
    assert_eq!(
      apply(&places, &FilterState::with_query("   ")).len(),
      places.len()
    );
  }

  #[rstest]
  fn category_is_not_applied(places: Vec<Feature>) {
    let filter = FilterState {
      query: String::new(),
      category: Some("Mercado".to_string()),
    };
    assert_eq!(apply(&places, &filter).len(), places.len());
  }

  #[rstest]
  fn result_is_an_ordered_subset(
    places: Vec<Feature>,
    #[values("", "p", "pla", "plaza s", "e", "z", "x")] query: &str,
  ) {
    let filtered = apply(&places, &FilterState::with_query(query));
    let positions: Vec<_> = filtered
      .iter()
      .map(|f| {
        places
          .iter()
          .position(|p| p.id == f.id)
          .expect("filtered feature comes from the collection")
      })
      .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
  }

  #[rstest]
  fn tightening_never_grows_the_result(
    places: Vec<Feature>,
    #[values("", "p", "pl", "pla", "plaz", "plaza", "plaza ", "plaza c")] query: &str,
  ) {
    let loose = apply(&places, &FilterState::with_query(query));
    for extra in ["a", "z", " ", "s"] {
      let tight = apply(&places, &FilterState::with_query(format!("{query}{extra}")));
      assert!(tight.iter().all(|t| loose.iter().any(|l| l.id == t.id)));
    }
  }

  #[rstest]
  fn idempotent(places: Vec<Feature>, #[values("", "plaza", "r", "missing")] query: &str) {
    let filter = FilterState::with_query(query);
    let once = apply(&places, &filter);
    let again = apply(&places, &filter);
    assert_eq!(ids(&once), ids(&again));

    let narrowed = FeatureCollection::from_features(once.iter().map(|&f| f.clone()));
    let twice = apply(narrowed.features(), &filter);
    assert_eq!(ids(&once), ids(&twice));
  }

  #[rstest]
  fn categories_in_first_seen_order(places: Vec<Feature>) {
    assert_eq!(
      categories(&places),
      ["Plaza", "Parque", UNCATEGORIZED, "Mercado"]
    );
    assert!(categories(&[]).is_empty());
  }
}
