use std::{
  collections::{HashMap, HashSet},
  sync::{
    Arc, Mutex,
    mpsc::{Receiver, Sender},
  },
  time::Duration,
};

use egui::{Color32, ColorImage, Rect, Ui};
use log::error;

use crate::map::{
  coordinates::{Tile, TileCoordinate, Transform, tiles_in_box},
  map_view::helpers::level_for_zoom,
  tile_loader::{TileDownloader, TileLoaderError, decode_tile},
};

use super::{Layer, LayerProperties};

const NAME: &str = "Tile Layer";

/// Delay before a frame asks again for tiles that could not be loaded for now.
const RETRY_AFTER: Duration = Duration::from_secs(1);

/// Only tiles the server does not have, or that cannot be decoded, are never asked for again.
fn is_permanent(e: &anyhow::Error) -> bool {
  e.downcast_ref::<TileLoaderError>()
    .is_some_and(TileLoaderError::is_permanent)
}

/// A layer that loads and displays the raster map tiles. Tiles are only kept in memory.
pub struct TileLayer {
  receiver: Receiver<(usize, Tile, ColorImage)>,
  sender: Sender<(usize, Tile, ColorImage)>,
  tile_loader_index: usize,
  tile_loader_old_index: usize,
  all_tile_loader: Vec<Arc<TileDownloader>>,
  loaded_tiles: HashMap<Tile, egui::TextureHandle>,
  in_flight_tiles: Arc<Mutex<HashSet<Tile>>>,
  failed_tiles: Arc<Mutex<HashSet<(usize, Tile)>>>,
  ctx: egui::Context,
  layer_properties: LayerProperties,
  current_request_zoom: u8,
}

impl TileLayer {
  /// `None` if no tile provider is configured. The map is drawn without a background then.
  #[must_use]
  pub fn from_config(ctx: egui::Context, config: &crate::config::Config) -> Option<TileLayer> {
    let all_tile_loader: Vec<_> = TileDownloader::from_config(config).map(Arc::new).collect();
    if all_tile_loader.is_empty() {
      log::warn!("No tile provider configured, the map has no background");
      return None;
    }
    let (sender, receiver) = std::sync::mpsc::channel();
    Some(TileLayer {
      receiver,
      sender,
      tile_loader_index: 0,
      tile_loader_old_index: 0,
      all_tile_loader,
      loaded_tiles: HashMap::new(),
      in_flight_tiles: Arc::default(),
      failed_tiles: Arc::default(),
      ctx,
      layer_properties: LayerProperties::default(),
      current_request_zoom: 0,
    })
  }

  fn tile_loader(&self) -> Arc<TileDownloader> {
    self.all_tile_loader[self.tile_loader_index].clone()
  }

  fn draw_tile(&self, ui: &Ui, rect: Rect, tile: &Tile, transform: &Transform) -> bool {
    if let Some(texture) = self.loaded_tiles.get(tile) {
      let (nw, se) = tile.position();
      let (nw, se) = (transform.apply(nw), transform.apply(se));
      let tile_rect = Rect::from_min_max(nw.into(), se.into());
      ui.painter_at(rect).image(
        texture.id(),
        tile_rect,
        Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        Color32::WHITE,
      );
      return true;
    }
    false
  }

  fn get_tile(&self, tile: Tile) {
    let index = self.tile_loader_index;
    if self.loaded_tiles.contains_key(&tile)
      || self.failed_tiles.lock().unwrap().contains(&(index, tile))
    {
      return;
    }
    if !self.in_flight_tiles.lock().unwrap().insert(tile) {
      return;
    }

    let sender = self.sender.clone();
    let tile_loader = self.tile_loader();
    let ctx = self.ctx.clone();
    let in_flight_tiles = self.in_flight_tiles.clone();
    let failed_tiles = self.failed_tiles.clone();

    tokio::spawn(async move {
      let image = match tile_loader.tile_data(&tile).await {
        Ok(data) => tokio::task::spawn_blocking(move || decode_tile(&tile, &data))
          .await
          .map_err(anyhow::Error::from)
          .and_then(|r| r.map_err(anyhow::Error::from)),
        Err(e) => Err(e),
      };

      match image {
        Ok(image) => {
          if let Err(e) = sender.send((index, tile, image)) {
            error!("Failed to hand over tile {tile:?}: {e}");
          }
          ctx.request_repaint();
        }
        Err(e) if is_permanent(&e) => {
          log::debug!("Tile {tile:?} unavailable: {e}");
          failed_tiles.lock().unwrap().insert((index, tile));
        }
        Err(e) => {
          log::debug!("Tile {tile:?} not loaded yet: {e}");
          ctx.request_repaint_after(RETRY_AFTER);
        }
      }
      in_flight_tiles.lock().unwrap().remove(&tile);
    });
  }

  fn collect_new_tile_data(&mut self, ui: &Ui) {
    let current = self.tile_loader_index;
    for (index, tile, image) in self.receiver.try_iter() {
      if index != current {
        continue;
      }
      let texture = ui.ctx().load_texture(
        format!("{}-{}-{}", tile.zoom, tile.x, tile.y),
        image,
        egui::TextureOptions::default(),
      );
      self.loaded_tiles.insert(tile, texture);
    }
  }

  fn switch_provider_if_changed(&mut self) {
    if self.tile_loader_index == self.tile_loader_old_index {
      return;
    }
    log::info!(
      "Provider switched from {} to {}, clearing {} tiles",
      self.all_tile_loader[self.tile_loader_old_index].name(),
      self.all_tile_loader[self.tile_loader_index].name(),
      self.loaded_tiles.len()
    );
    self.loaded_tiles.clear();
    self.in_flight_tiles.lock().unwrap().clear();
    self.tile_loader_old_index = self.tile_loader_index;
  }
}

impl Layer for TileLayer {
  fn draw(&mut self, ui: &mut Ui, transform: &Transform, rect: Rect) {
    self.switch_provider_if_changed();
    self.collect_new_tile_data(ui);

    if !self.visible() {
      return;
    }

    let request_zoom = level_for_zoom(transform.zoom, &rect).min(self.tile_loader().max_zoom());
    if request_zoom != self.current_request_zoom {
      log::debug!("Requesting tiles at zoom {request_zoom}");
      self.current_request_zoom = request_zoom;
    }

    let inv = transform.invert();
    let min_pos = TileCoordinate::from_pixel_position(inv.apply(rect.min.into()), request_zoom);
    let max_pos = TileCoordinate::from_pixel_position(inv.apply(rect.max.into()), request_zoom);

    for tile in tiles_in_box(min_pos, max_pos) {
      self.get_tile(tile);
    }

    // Draw parent tiles if detailed tiles are not available yet. Coarser tiles are drawn first to
    // have detailed textures visible on top.
    let mut tiles_to_draw = tiles_in_box(min_pos, max_pos)
      .filter_map(|mut tile| {
        while !self.loaded_tiles.contains_key(&tile) {
          tile = tile.parent()?;
        }
        Some(tile)
      })
      .collect::<Vec<_>>();
    tiles_to_draw.sort_unstable_by_key(|tile| (tile.zoom, tile.y, tile.x));
    tiles_to_draw.dedup();

    for tile in tiles_to_draw {
      self.draw_tile(ui, rect, &tile, transform);
    }
  }

  fn name(&self) -> &str {
    NAME
  }

  fn visible(&self) -> bool {
    self.layer_properties.visible
  }

  fn visible_mut(&mut self) -> &mut bool {
    &mut self.layer_properties.visible
  }

  fn ui_content(&mut self, ui: &mut Ui) {
    egui::ComboBox::from_label("tile provider")
      .selected_text(self.tile_loader().name().to_string())
      .show_ui(ui, |ui| {
        for (i, tile_loader) in self.all_tile_loader.iter().enumerate() {
          ui.selectable_value(
            &mut self.tile_loader_index,
            i,
            tile_loader.name().to_string(),
          );
        }
      });

    ui.horizontal(|ui| {
      ui.label("Request zoom:");
      ui.label(format!("{}", self.current_request_zoom));
    });
    ui.horizontal(|ui| {
      ui.label("Tiles loaded:");
      ui.label(format!("{}", self.loaded_tiles.len()));
    });
    ui.horizontal(|ui| {
      ui.label("Tiles in flight:");
      ui.label(format!("{}", self.in_flight_tiles.lock().unwrap().len()));
    });
  }
}
