use std::path::PathBuf;
use std::time::Duration;

use biomekit_common::{Aabb, FrameTime, GraphicsSetting, SceneConfig, WorldBounds};
use biomekit_instancing::{AnimationOutcome, GroupInspector, GroupOptions, InstanceGroup, sample};
use biomekit_pool::TransformPool;
use biomekit_render::{ModelAsset, RecordingBackend};
use biomekit_visibility::{AnimationVisibilityContext, FrameVisibility};
use clap::{Parser, Subcommand, ValueEnum};
use glam::{Mat4, Vec3};
use tracing_subscriber::EnvFilter;

/// Simulated frame length.
const FRAME: Duration = Duration::from_millis(16);
/// World units between neighbouring instances in the simulated grid.
const SPACING: f32 = 3.0;

#[derive(Parser)]
#[command(name = "biomekit-cli", about = "CLI tool for biomekit instance groups")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum GraphicsArg {
    Low,
    Mid,
    High,
}

impl From<GraphicsArg> for GraphicsSetting {
    fn from(arg: GraphicsArg) -> Self {
        match arg {
            GraphicsArg::Low => GraphicsSetting::Low,
            GraphicsArg::Mid => GraphicsSetting::Mid,
            GraphicsArg::High => GraphicsSetting::High,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Animate a grid of instances for a number of frames
    Simulate {
        /// Number of instances to spawn
        #[arg(short, long, default_value = "1000")]
        instances: usize,
        /// Number of 16ms frames to run
        #[arg(short, long, default_value = "120")]
        frames: u64,
        /// Bucket assignment seed (random when omitted)
        #[arg(short, long)]
        seed: Option<u64>,
        /// Scene config JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Model asset JSON (a synthetic creature when omitted)
        #[arg(short, long)]
        asset: Option<PathBuf>,
        /// Override the config's graphics tier
        #[arg(short, long, value_enum)]
        graphics: Option<GraphicsArg>,
    },
    /// Acquire and release pooled transform buffers, printing tiers and stats
    Pool {
        /// Requested instance counts
        #[arg(value_delimiter = ',', default_values_t = [100, 300, 513, 200])]
        sizes: Vec<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("biomekit-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", biomekit_common::crate_info());
            println!("pool: {}", biomekit_pool::crate_info());
            println!("render: {}", biomekit_render::crate_info());
            println!("anim: {}", biomekit_anim::crate_info());
            println!("visibility: {}", biomekit_visibility::crate_info());
            println!("instancing: {}", biomekit_instancing::crate_info());
        }
        Commands::Simulate {
            instances,
            frames,
            seed,
            config,
            asset,
            graphics,
        } => {
            let mut scene = match config {
                Some(path) => SceneConfig::load(path)?,
                None => SceneConfig::default(),
            };
            if let Some(g) = graphics {
                scene.graphics = g.into();
            }
            let asset = match asset {
                Some(path) => ModelAsset::load(path)?,
                None => sample::creature(8),
            };
            simulate(&scene, &asset, instances, frames, seed)?;
        }
        Commands::Pool { sizes } => {
            let mut pool = TransformPool::default();
            let mut held = Vec::new();
            for &size in &sizes {
                let buffer = pool.acquire(size);
                println!(
                    "acquire({size}) -> capacity {} (tier {})",
                    buffer.capacity(),
                    pool.tier_for(size)
                );
                held.push(buffer);
            }
            println!("{}", pool.stats());

            for buffer in held {
                pool.release(buffer);
            }
            println!("after release: {}", pool.stats());

            for &size in &sizes {
                let buffer = pool.acquire(size);
                println!("re-acquire({size}) -> capacity {}", buffer.capacity());
                pool.release(buffer);
            }
            println!("after reuse: {}", pool.stats());
        }
    }

    Ok(())
}

fn simulate(
    scene: &SceneConfig,
    asset: &ModelAsset,
    instances: usize,
    frames: u64,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    scene.validate()?;
    println!(
        "Simulating '{}': instances={instances}, frames={frames}, graphics={:?}",
        asset.name, scene.graphics
    );

    tracing::info!(
        asset = %asset.name,
        instances,
        frames,
        graphics = ?scene.graphics,
        "starting simulation"
    );

    let mut backend = RecordingBackend::new();
    let mut pool = TransformPool::new(scene.pool.clone());
    let options = GroupOptions {
        seed,
        pickable: false,
        animation: scene.animation.clone(),
    };
    let mut group = InstanceGroup::new(asset, instances, &options, &mut backend)?;

    let side = (instances as f32).sqrt().ceil().max(1.0) as usize;
    for i in 0..instances {
        let x = (i % side) as f32 * SPACING;
        let z = (i / side) as f32 * SPACING;
        group.set_instance_transform(i, &Mat4::from_translation(Vec3::new(x, 0.0, z)));
    }
    group.set_active_count(instances as i64);

    let extent = side as f32 * SPACING;
    group.set_world_bounds(Some(&WorldBounds::from_aabb(Aabb::new(
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(extent, 2.0, extent),
    ))));

    let mut visibility = FrameVisibility::new(scene.visibility.clone());
    let projection = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 2000.0);
    let target = Vec3::new(extent * 0.5, 0.0, extent * 0.5);

    let mut frame = FrameTime::default();
    let (mut updated, mut throttled, mut gated) = (0u64, 0u64, 0u64);
    for _ in 0..frames {
        frame.advance(FRAME);

        // Orbit the camera around the grid.
        let angle = frame.elapsed_secs() as f32 * 0.5;
        let eye = target + Vec3::new(angle.cos(), 0.6, angle.sin()) * (extent * 0.75 + 20.0);
        visibility.begin_frame(&(projection * Mat4::look_at_rh(eye, target, Vec3::Y)), eye);

        let ctx = AnimationVisibilityContext::with_visibility_manager(&visibility);
        match group.update_animation(&frame, scene.graphics, Some(&ctx)) {
            AnimationOutcome::Updated { .. } => updated += 1,
            AnimationOutcome::Throttled => throttled += 1,
            AnimationOutcome::GraphicsSuppressed | AnimationOutcome::NotVisible => gated += 1,
            AnimationOutcome::Idle => {}
        }

        // Periodic hand-off through the pool.
        if frame.elapsed.as_millis() % 1000 < FRAME.as_millis() {
            let (buffer, count) = group.snapshot_transforms(&mut pool);
            group.restore_transforms(&buffer, count as i64);
            pool.release(buffer);
        }
    }

    tracing::debug!(
        updated,
        throttled,
        gated,
        cache = ?visibility.cache_stats(),
        "simulation finished"
    );
    println!("Frames: updated={updated} throttled={throttled} gated={gated}");
    println!("{}", GroupInspector::summary(&group));
    println!("{}", pool.stats());

    group.dispose(&mut backend);
    println!(
        "Backend: events={} live_textures={}",
        backend.events().len(),
        backend.live_textures()
    );
    Ok(())
}
