pub mod coordinates;
pub mod map_view;
mod tile_loader;

pub use map_view::{MapView, ViewportRequest};
