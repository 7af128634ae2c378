use clap::Parser as _;
use log::error;
use poimap::{
  app::PoiApp,
  config::{Config, TileProvider},
  loader::DataSource,
};

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// GeoJSON file or http(s) URL with the places. Defaults to the configured data source.
  source: Option<String>,

  /// Tile URL template with {zoom}, {x} and {y}. Used before the configured providers.
  #[arg(long)]
  tile_url: Option<String>,
}

fn main() -> eframe::Result {
  let args = Args::parse();

  // init logger.
  env_logger::init();

  let mut config = Config::new();
  if let Some(url) = args.tile_url {
    config.tile_provider.insert(
      0,
      TileProvider {
        name: "Command line".to_string(),
        url,
        max_zoom: None,
      },
    );
  }

  let source = args.source.as_deref().unwrap_or(config.data_source());
  let source: DataSource = match source.parse() {
    Ok(source) => source,
    Err(e) => {
      error!("Invalid data source {source}: {e}");
      std::process::exit(2);
    }
  };

  // start tokio on another thread.
  let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
  let _enter = rt.enter();
  std::thread::spawn(move || {
    rt.block_on(async {
      loop {
        tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
      }
    });
  });

  let options = eframe::NativeOptions {
    viewport: egui::ViewportBuilder {
      inner_size: Some(egui::vec2(1280.0, 800.0)),
      clamp_size_to_monitor_size: Some(true),
      ..Default::default()
    },
    ..Default::default()
  };

  eframe::run_native(
    "poimap",
    options,
    Box::new(move |cc| {
      // Image support
      egui_extras::install_image_loaders(&cc.egui_ctx);

      Ok(Box::new(PoiApp::new(&cc.egui_ctx, &config, source)))
    }),
  )
}
