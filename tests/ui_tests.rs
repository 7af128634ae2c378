use eframe::App;
use egui::accesskit::Role;
use egui_kittest::Harness;
use egui_kittest::kittest::Queryable;
use poimap::{
  app::PoiApp,
  config::Config,
  feature::{FeatureCollection, FeatureId},
  loader::LoadError,
  render::{LOAD_FAILED, NO_RESULTS},
  selection::ActiveSelection,
};

const PLAZAS: &str = include_str!("resources/plazas.geojson");

fn create_test_app(result: Result<FeatureCollection, LoadError>) -> PoiApp {
  PoiApp::with_result(&egui::Context::default(), &Config::offline(), result)
}

fn harness(app: PoiApp) -> Harness<'static, PoiApp> {
  Harness::new_state(
    |ctx, app: &mut PoiApp| {
      let mut frame = eframe::Frame::_new_kittest();
      app.update(ctx, &mut frame);
    },
    app,
  )
}

fn plazas() -> PoiApp {
  create_test_app(FeatureCollection::from_geojson(PLAZAS))
}

#[test]
fn sidebar_shows_all_places() {
  let mut harness = harness(plazas());
  harness.run();

  harness.get_by_label("Places");
  harness.get_by_label("(3)");
  harness.get_by_label("Plaza Central");
  harness.get_by_label("Parque Norte");
  harness.get_by_label("Plaza Sur");
  harness.get_by_label("Category: Parque");
}

#[test]
fn search_updates_list_and_counter() {
  let mut harness = harness(plazas());
  harness.run();

  harness.state_mut().set_query("plaza");
  harness.run();

  harness.get_by_label("(2)");
  assert!(harness.query_by_label("Parque Norte").is_none());
  harness.get_by_label("Plaza Central");
  harness.get_by_label("Plaza Sur");

  harness.state_mut().set_query("zzz");
  harness.run();

  harness.get_by_label("(0)");
  harness.get_by_label(NO_RESULTS);
}

#[test]
fn clicking_list_entry_selects_it() {
  let mut harness = harness(plazas());
  harness.run();

  harness.get_by_label("Plaza Sur").click();
  harness.run();

  let state = harness.state();
  assert_eq!(
    state.state().selection,
    ActiveSelection::Selected(FeatureId::new("2"))
  );
  assert_eq!(
    state.coordinator().map().open_popup(),
    Some(&FeatureId::new("2"))
  );
  assert_eq!(
    state.coordinator().list().active(),
    Some(&FeatureId::new("2"))
  );
  assert!(!state.coordinator().map().transform().is_invalid());
}

#[test]
fn failed_load_shows_message() {
  let mut harness = harness(create_test_app(Err(LoadError::Format(
    "not geojson".to_string(),
  ))));
  harness.run();

  harness.get_by_label(LOAD_FAILED);
  harness.get_by_label("(0)");
}

#[test]
fn map_layers_section() {
  let mut harness = harness(plazas());
  harness.run();

  harness.get_by_label("Map Layers").click();
  harness.run();

  harness.get_by_label("Markers");
  assert!(harness.query_by_label("Tile Layer").is_none());
}

#[test]
fn category_selector_is_present() {
  let mut harness = harness(plazas());
  harness.run();

  let combo_boxes: Vec<_> = harness.get_all_by_role(Role::ComboBox).collect();
  assert!(!combo_boxes.is_empty());
}
