use std::sync::mpsc::Sender;

use egui::{Align, Color32, Frame, Label, RichText, ScrollArea, Sense, Ui};

use crate::{
  feature::{Feature, FeatureId},
  render::{ListRenderer, NO_RESULTS, Summary, ViewEvent, result_count},
};

/// One rendered list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
  pub id: FeatureId,
  pub summary: Summary,
  pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
  Entries(Vec<Entry>),
  Message(String),
}

/// The result list next to the map. Draws the last rendered snapshot every frame.
pub struct LocationList {
  content: Content,
  count: usize,
  events: Sender<ViewEvent>,
  scroll_to_active: bool,
}

impl LocationList {
  #[must_use]
  pub fn new(events: Sender<ViewEvent>) -> Self {
    Self {
      content: Content::Entries(Vec::new()),
      count: 0,
      events,
      scroll_to_active: false,
    }
  }

  /// The counter text, e.g. `(3)`.
  #[must_use]
  pub fn counter(&self) -> String {
    result_count(self.count)
  }

  #[must_use]
  pub fn entries(&self) -> &[Entry] {
    match &self.content {
      Content::Entries(entries) => entries,
      Content::Message(_) => &[],
    }
  }

  /// The text shown instead of entries, if any.
  #[must_use]
  pub fn message(&self) -> Option<&str> {
    match &self.content {
      Content::Entries(_) => None,
      Content::Message(message) => Some(message),
    }
  }

  #[must_use]
  pub fn active(&self) -> Option<&FeatureId> {
    self.entries().iter().find(|e| e.active).map(|e| &e.id)
  }

  pub fn ui(&mut self, ui: &mut Ui) {
    let entries = match &self.content {
      Content::Message(message) => {
        ui.weak(message.as_str());
        return;
      }
      Content::Entries(entries) => entries,
    };

    let mut clicked = None;
    ScrollArea::vertical()
      .auto_shrink([false, false])
      .show(ui, |ui| {
        for entry in entries {
          if entry_ui(ui, entry, self.scroll_to_active && entry.active) {
            clicked = Some(entry.id.clone());
          }
        }
      });
    self.scroll_to_active = false;

    if let Some(id) = clicked {
      log::debug!("List entry {id} clicked");
      if let Err(e) = self.events.send(ViewEvent::Activated(id)) {
        log::error!("Failed to report list click: {e}");
      }
    }
  }
}

/// Draws one entry, returns whether it was clicked.
fn entry_ui(ui: &mut Ui, entry: &Entry, scroll_to: bool) -> bool {
  let fill = if entry.active {
    ui.visuals().selection.bg_fill.gamma_multiply(0.4)
  } else {
    Color32::TRANSPARENT
  };
  let frame = Frame::group(ui.style()).fill(fill).show(ui, |ui| {
    ui.set_width(ui.available_width());
    let title =
      ui.add(Label::new(RichText::new(&entry.summary.title).strong()).sense(Sense::click()));
    if !entry.summary.description.is_empty() {
      ui.label(&entry.summary.description);
    }
    ui.weak(&entry.summary.category);
    title.clicked()
  });

  let response = frame.response.interact(Sense::click());
  if scroll_to {
    response.scroll_to_me(Some(Align::Center));
  }
  frame.inner || response.clicked()
}

impl ListRenderer for LocationList {
  fn render(&mut self, features: &[&Feature], active: Option<&FeatureId>) {
    self.count = features.len();
    if features.is_empty() {
      self.content = Content::Message(NO_RESULTS.to_string());
      return;
    }
    let entries: Vec<_> = features
      .iter()
      .map(|f| Entry {
        id: f.id.clone(),
        summary: Summary::from(*f),
        active: active == Some(&f.id),
      })
      .collect();
    self.scroll_to_active = entries.iter().any(|e| e.active);
    self.content = Content::Entries(entries);
  }

  fn show_message(&mut self, message: &str) {
    self.count = 0;
    self.content = Content::Message(message.to_string());
  }
}
