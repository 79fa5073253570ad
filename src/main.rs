use std::path::PathBuf;

use clap::Parser;
use engine::assets::Assets;
use game::{
    camera::{Camera, Matrices},
    config::GameConfig,
    math::{BoundingBox, Frustum},
    terrain::{Terrain, gpu::GpuTerrain},
};
use glam::{Vec2, Vec3};
use renderer::BufferDescriptor;
use tracing::{error, info, warn};

mod engine;
mod game;

const FRAME_TIME: f32 = 1.0 / 60.0;

#[derive(clap::Parser)]
struct Opts {
    /// Path to the data directory holding the terrain assets.
    path: PathBuf,

    /// Terrain config file, relative to the data directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Amount of frames to simulate.
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Override the cells per patch exponent from the config.
    #[arg(long)]
    exponent: Option<u32>,

    /// Override the height scale from the config.
    #[arg(long)]
    height_scale: Option<f32>,

    /// Override the cell spacing from the config.
    #[arg(long)]
    cell_spacing: Option<f32>,

    /// Build the view from high above the terrain center.
    #[arg(long)]
    overhead: bool,

    /// Upload the terrain to the GPU.
    #[arg(long)]
    gpu: bool,
}

fn visible_patches<'a>(
    terrain: &'a Terrain,
    frustum: &'a Frustum,
) -> impl Iterator<Item = BoundingBox> + 'a {
    let mesh = terrain.mesh();
    (0..mesh.layout().patch_total())
        .filter_map(move |index| mesh.patch_bounding_box(index))
        .filter(move |bounding_box| frustum.intersects_bounding_box(bounding_box))
}

/// Depth buffer value of the closest visible patch center in front of the camera.
fn nearest_patch_depth(matrices: &Matrices, patches: &[BoundingBox]) -> Option<f32> {
    patches
        .iter()
        .map(|bounding_box| matrices.view.transform_point3(bounding_box.center()))
        .filter(|view_position| view_position.z > 0.0)
        .min_by(|a, b| a.z.total_cmp(&b.z))
        .map(|view_position| matrices.projection.project_point3(view_position).z)
}

fn main() {
    tracing_subscriber::fmt().init();

    let opts = Opts::parse();

    let assets = Assets::new(&opts.path);

    let config = match opts.config {
        Some(ref path) => GameConfig::load(&assets, path).unwrap_or_else(|err| {
            warn!("Could not load config ({}), using defaults: {err}", path.display());
            GameConfig::default()
        }),
        None => GameConfig::default(),
    };

    let mut terrain = Terrain::new(config.terrain.clone(), &assets);

    // Overrides go through the deferred rebuild like any other settings change.
    if let Some(exponent) = opts.exponent {
        terrain.set_cells_per_patch_exponent(exponent);
    }
    if let Some(height_scale) = opts.height_scale {
        terrain.set_height_scale(height_scale);
    }
    if let Some(cell_spacing) = opts.cell_spacing {
        terrain.set_cell_spacing(cell_spacing);
    }
    if terrain.is_dirty() {
        info!("Applying terrain overrides");
        terrain.sync();
    }

    let size = terrain.size();
    let height_range = terrain
        .mesh()
        .bounds()
        .iter()
        .fold(None, |range: Option<Vec2>, bounds| {
            Some(range.map_or(*bounds, |range| {
                Vec2::new(range.x.min(bounds.x), range.y.max(bounds.y))
            }))
        })
        .unwrap_or(Vec2::ZERO);
    info!(
        "Terrain {} ({}x{} samples): {:.1} x {:.1} world units, heights {:.1}..{:.1}",
        terrain.info().height_map.display(),
        size.x,
        size.y,
        terrain.width(),
        terrain.depth(),
        height_range.x,
        height_range.y,
    );
    let layout = terrain.mesh().layout();
    info!(
        "{}x{} patches of {} cells, {}x{} cells left uncovered",
        layout.patch_count.x,
        layout.patch_count.y,
        layout.cells_per_patch,
        layout.dropped_cells.x,
        layout.dropped_cells.y,
    );

    let ground_follow = config.camera.ground_follow;

    let start = Vec3::new(terrain.width() * 0.25, 0.0, terrain.depth() * 0.25);
    let mut camera = Camera::new(Vec3::ZERO);
    camera.walk_speed = config.camera.walk_speed;
    if let Err(err) = camera.set_lens(std::f32::consts::FRAC_PI_4, 1280.0 / 800.0, 1.0, 1000.0) {
        error!("{err}");
        return;
    }
    camera.set_position(Vec3::new(
        start.x,
        terrain.height_at(start.x, start.z) + ground_follow.height,
        start.z,
    ));
    camera.look_at(Vec3::new(terrain.width() * 0.5, 0.0, terrain.depth() * 0.5));
    camera.pitch(0.2);
    camera.update_view_matrix();
    camera.set_overhead_debug(opts.overhead);

    let lens = camera.lens();
    info!(
        "Lens: fov {:.2}, aspect {:.2}, near {} ({:.2} high), far {} ({:.1} high), overhead {}",
        lens.fov_y,
        lens.aspect,
        lens.near,
        camera.near_window_height(),
        lens.far,
        camera.far_window_height(),
        camera.overhead_debug(),
    );
    info!(
        "{} patches visible from the start position",
        visible_patches(&terrain, &camera.frustum()).count()
    );

    let mut gpu = if opts.gpu {
        match engine::device::create_headless() {
            Ok(mut renderer) => {
                let gpu_terrain = GpuTerrain::new(&mut renderer, &terrain);
                let camera_buffer = renderer.create_buffer_init(
                    BufferDescriptor::uniform("camera_matrices"),
                    &[camera.sync()],
                );
                Some((renderer, gpu_terrain, camera_buffer))
            }
            Err(err) => {
                error!("GPU upload disabled: {err}");
                None
            }
        }
    } else {
        None
    };

    let mut total_visible = 0;
    for frame in 0..opts.frames {
        if terrain.sync() {
            if let Some((renderer, gpu_terrain, _)) = gpu.as_mut() {
                gpu_terrain.update(renderer, &terrain);
            }
        }

        let time = frame as f32 * FRAME_TIME;
        camera.walk(FRAME_TIME);
        camera.strafe(0.5 * time.sin() * FRAME_TIME);
        camera.rotate_y(0.25 * FRAME_TIME);

        let position = camera.position();
        ground_follow.apply(
            &mut camera,
            terrain.height_at(position.x, position.z),
            FRAME_TIME,
        );

        let matrices = camera.sync();
        if let Some((renderer, _, camera_buffer)) = gpu.as_ref() {
            renderer.write_buffer(*camera_buffer, &[matrices]);
        }

        let frustum = Frustum::from(matrices.view_projection);
        let visible: Vec<BoundingBox> = visible_patches(&terrain, &frustum).collect();
        total_visible += visible.len();

        if frame % 60 == 0 {
            let eye = matrices.position.truncate();
            info!(
                "frame {frame}: eye {eye:.1}, look {:.2}, up {:.2}, {}/{} patches visible",
                camera.look(),
                camera.up(),
                visible.len(),
                terrain.mesh().layout().patch_total(),
            );
            if let Some(depth) = nearest_patch_depth(&matrices, &visible) {
                info!("frame {frame}: nearest patch depth {depth:.4}");
            }
        }
    }

    if opts.frames > 0 {
        info!(
            "Average visible patches: {:.1}",
            total_visible as f32 / opts.frames as f32
        );
    }

    if let Some((mut renderer, gpu_terrain, camera_buffer)) = gpu {
        info!(
            "GPU terrain: {} patches of {} control points, {} layers",
            gpu_terrain.patch_count,
            GpuTerrain::patch_control_points(),
            gpu_terrain.layer_count,
        );
        info!(
            "GPU buffers: {} indices, {} triangle indices, {} byte vertices",
            gpu_terrain.index_count,
            gpu_terrain.triangle_index_count,
            GpuTerrain::vertex_layout().array_stride,
        );
        info!(
            "GPU height texture: texel size {:.5}, cell spacing {}",
            gpu_terrain.texel_size,
            gpu_terrain.cell_spacing,
        );
        gpu_terrain.release(&mut renderer);
        renderer.remove_buffer(camera_buffer);
    }
}
