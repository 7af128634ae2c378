pub mod app;
pub mod config;
pub mod feature;
pub mod filter;
pub mod list;
pub mod loader;
pub mod map;
pub mod render;
pub mod selection;
