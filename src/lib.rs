mod assets;
pub mod animation;
pub mod config;
pub mod entities;
pub mod render;
pub mod telemetry;
pub mod world;

use std::sync::Arc;
use std::time::Instant;

use render::draw_pool::{DrawCommand, RecordingDrawPool};
use render::light_view::LightView;
use render::map_view::MapView;
use world::scene::Scene;
use world::thing_types::ThingTypeCatalog;
use world::time::FrameClock;

/// Totals gathered while the probe plays the scene.
#[derive(Debug, Default)]
struct FrameStats {
    frames: u32,
    sprites: usize,
    texts: usize,
    light_passes: usize,
    max_light_sources: usize,
    lagged: u32,
}

impl FrameStats {
    fn record(&mut self, pool: &RecordingDrawPool, light_view: &LightView) {
        self.frames += 1;
        for command in &pool.commands {
            match command {
                DrawCommand::Sprite(_) => self.sprites += 1,
                DrawCommand::Text(_) => self.texts += 1,
                DrawCommand::TexturedRect { .. } => self.light_passes += 1,
                _ => {}
            }
        }
        self.max_light_sources = self.max_light_sources.max(light_view.sources().len());
    }
}

/// Darkest and brightest light-map pixel by channel sum.
fn light_extremes(light_view: &LightView) -> Option<([u8; 3], [u8; 3])> {
    let mut pixels = light_view
        .pixels()
        .chunks_exact(4)
        .map(|pixel| [pixel[0], pixel[1], pixel[2]]);
    let first = pixels.next()?;
    let brightness = |pixel: &[u8; 3]| pixel.iter().map(|channel| u32::from(*channel)).sum::<u32>();
    let (darkest, brightest) = pixels.fold((first, first), |(dark, bright), pixel| {
        let dark = if brightness(&pixel) < brightness(&dark) { pixel } else { dark };
        let bright = if brightness(&pixel) > brightness(&bright) { pixel } else { bright };
        (dark, bright)
    });
    Some((darkest, brightest))
}

pub fn run(args: &[String]) -> Result<(), String> {
    let config = config::ClientConfig::from_args(args)?;
    telemetry::logging::init(&config.log_filter)?;
    let summary = assets::scan(&config.root)?;
    telemetry::logging::log_game(&format!(
        "asset scan: yaml={}, settings={}, scene={}",
        summary.yaml_files,
        summary.settings.is_some(),
        summary.scene.is_some()
    ));

    let catalog = ThingTypeCatalog::load(&summary.catalog).map_err(|err| err.to_string())?;
    let scene = match &summary.scene {
        Some(path) => Scene::load(path).map_err(|err| err.to_string())?,
        None => Scene::default(),
    };

    let mut view = MapView::new(config.settings.clone(), Arc::new(catalog), FrameClock::manual(0));
    scene.apply(&mut view).map_err(|err| err.to_string())?;

    let mut pool = RecordingDrawPool::new();
    let mut stats = FrameStats::default();
    let mut played = None;
    for frame in 0..config.frames {
        if frame > 0 {
            view.advance(config.frame_ms);
        }
        let now = view.now();
        if let Err(err) = scene.play(&mut view, played, now) {
            telemetry::logging::log_error(&format!("scene cue failed at {} ms: {}", now, err));
            return Err(err.to_string());
        }
        played = Some(now);
        view.poll();

        pool.clear();
        let started = Instant::now();
        view.draw(&mut pool);
        let spent = started.elapsed().as_millis();
        if spent > u128::from(config.frame_ms) {
            stats.lagged += 1;
            telemetry::logging::log_lag(&format!("frame {} took {} ms", frame, spent));
        }
        stats.record(&pool, view.light_view());
    }

    telemetry::logging::log_render(&format!(
        "{} frames drawn, {} sprites",
        stats.frames, stats.sprites
    ));

    println!("tibia-client: frame probe");
    println!("- root: {}", config.root.display());
    println!("- catalog: {}", summary.catalog.display());
    println!(
        "- frames: {} x {} ms (scene length {} ms), lagged={}",
        stats.frames,
        config.frame_ms,
        scene.duration_ms(),
        stats.lagged
    );
    println!(
        "- map: tiles={}, creatures={}, missiles={}, texts={}, pending events={}",
        view.map().tile_count(),
        view.map().creatures().count(),
        view.map().missiles().len(),
        view.map().animated_texts().len(),
        view.pending_events()
    );
    println!(
        "- draw calls: sprites={}, texts={}, light passes={}",
        stats.sprites, stats.texts, stats.light_passes
    );
    println!("- light sources (max per frame): {}", stats.max_light_sources);
    match light_extremes(view.light_view()) {
        Some((darkest, brightest)) if view.light_view().is_dark() => {
            println!("- light map: darkest={:?}, brightest={:?}", darkest, brightest);
        }
        _ => println!("- light map: daylight"),
    }
    let metrics = view.metrics_stats();
    println!(
        "- text metrics: hits={}, misses={}, hit rate={:.2}",
        metrics.hits,
        metrics.misses,
        metrics.hit_rate()
    );
    Ok(())
}
