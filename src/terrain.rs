//! Voxel terrain sampling: surface types, the cached terrain context, and
//! the query-provider boundary to the voxel engine.
//!
//! The crate never talks to a voxel engine directly. A game registers a
//! [`TerrainQueryProvider`] in the [`TerrainWorld`] resource; the terrain
//! cache system samples it at a bounded rate and derives friction, hardness,
//! and water state from the raw material it returns. The mapping from raw
//! material to gameplay feel is owned entirely by this module, as explicit
//! exhaustive tables.

use std::sync::Arc;

use bevy::prelude::*;

/// Logical surface type derived from the voxel material beneath the character.
/// Drives movement friction and footstep/impact feedback.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceType {
    #[default]
    Default,
    Stone,
    Dirt,
    Grass,
    Sand,
    Snow,
    Ice,
    Mud,
    Wood,
    Metal,
    Water,
}

impl SurfaceType {
    /// Ground friction multiplier for this surface.
    ///
    /// Multiplies the integrator's base ground friction. Every variant is
    /// listed explicitly so a new surface type cannot silently inherit a
    /// mapping.
    pub fn friction_multiplier(self) -> f32 {
        match self {
            Self::Ice => 0.2,
            Self::Mud => 0.6,
            Self::Sand => 0.8,
            Self::Snow => 0.7,
            Self::Grass => 1.0,
            Self::Dirt => 0.9,
            Self::Stone => 1.0,
            Self::Wood => 1.0,
            Self::Metal => 0.9,
            Self::Water => 0.5,
            Self::Default => 1.0,
        }
    }

    /// Surface hardness, 0..=1. Affects footstep/impact feedback, not physics.
    pub fn hardness(self) -> f32 {
        match self {
            Self::Stone | Self::Metal => 1.0,
            Self::Dirt | Self::Grass => 0.5,
            Self::Sand | Self::Snow => 0.3,
            Self::Mud => 0.2,
            Self::Wood | Self::Ice | Self::Water | Self::Default => 1.0,
        }
    }

    /// Map a raw voxel material ID to a logical surface type.
    ///
    /// The IDs follow the voxel engine's material registry. Unknown IDs map
    /// to `Default`, never anything else.
    pub fn from_material_id(material_id: u8) -> Self {
        match material_id {
            0 => Self::Grass,
            1 => Self::Dirt,
            2 => Self::Stone,
            3 => Self::Sand,
            4 => Self::Snow,
            5 => Self::Sand,  // sandstone
            6 => Self::Ice,   // frozen dirt
            10 => Self::Stone, // coal
            11 => Self::Metal, // iron
            12 => Self::Metal, // gold
            13 => Self::Metal, // copper
            14 => Self::Stone, // diamond
            20 => Self::Wood,
            21 => Self::Grass, // leaves
            _ => Self::Default,
        }
    }
}

/// Cached terrain data beneath the character.
///
/// Recomputed wholesale on each refresh, never partially mutated. Created
/// with defaults at spawn and retained as-is when the provider has no
/// answer (e.g. the world is not streamed in yet).
///
/// Invariant: `water_depth > 0.0` implies `is_underwater`, and
/// `!is_underwater` implies `water_depth == 0.0`.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct TerrainContext {
    /// Logical surface type at the character's feet.
    pub surface_type: SurfaceType,
    /// Raw voxel material ID the surface type was derived from.
    pub material_id: u8,
    /// Surface hardness (footstep/impact feedback).
    pub surface_hardness: f32,
    /// Ground friction multiplier derived from the surface type.
    pub friction_multiplier: f32,
    /// True when the sample point is below the water surface.
    pub is_underwater: bool,
    /// Depth below the water surface; 0 when above water.
    pub water_depth: f32,
    /// Chunk coordinate owning the sample, compared against edit events.
    pub chunk_coord: IVec3,
}

impl Default for TerrainContext {
    fn default() -> Self {
        Self {
            surface_type: SurfaceType::Default,
            material_id: 0,
            surface_hardness: 1.0,
            friction_multiplier: 1.0,
            is_underwater: false,
            water_depth: 0.0,
            chunk_coord: IVec3::ZERO,
        }
    }
}

impl TerrainContext {
    /// Build a context by sampling the provider.
    ///
    /// `material_point` sits slightly below the capsule so the query lands
    /// inside the surface voxel; `water_point` is the true capsule bottom,
    /// so reported depth is the character's actual submersion and not
    /// deepened by the material offset.
    ///
    /// Returns `None` when the provider has no answer for the position, in
    /// which case callers keep the last-known context.
    pub fn sample(
        provider: &dyn TerrainQueryProvider,
        material_point: Vec3,
        water_point: Vec3,
    ) -> Option<Self> {
        let material_id = provider.sample_material(material_point)?;
        let surface_type = SurfaceType::from_material_id(material_id);

        let water_depth = provider.water_depth(water_point).unwrap_or(0.0).max(0.0);

        Some(Self {
            surface_type,
            material_id,
            surface_hardness: surface_type.hardness(),
            friction_multiplier: surface_type.friction_multiplier(),
            is_underwater: water_depth > 0.0,
            water_depth,
            chunk_coord: provider.chunk_of(material_point),
        })
    }

    /// Merge a positive water check from a second sample point into this
    /// context. Used for the body-center fallback when the feet sample lands
    /// in solid ground but the torso is submerged.
    pub fn merge_water(&mut self, water_depth: f32) {
        if water_depth > 0.0 {
            self.is_underwater = true;
            self.water_depth = water_depth;
        }
    }

    /// Fraction (0..=1) of a capsule of the given height that is submerged.
    ///
    /// Exposed for downstream visual/audio effects; mode transitions use the
    /// raw depth thresholds instead.
    pub fn immersion_ratio(&self, capsule_height: f32) -> f32 {
        if !self.is_underwater || capsule_height <= 0.0 {
            return 0.0;
        }
        (self.water_depth / capsule_height).clamp(0.0, 1.0)
    }
}

/// Query interface to the voxel terrain engine.
///
/// All calls are synchronous and expected to return a best-effort immediate
/// answer; the core never polls or waits. A provider that streams chunks
/// asynchronously should answer `None` for unloaded regions rather than
/// block.
pub trait TerrainQueryProvider: Send + Sync + 'static {
    /// Raw material ID at a world position, or `None` if unknown/unloaded.
    fn sample_material(&self, position: Vec3) -> Option<u8>;

    /// Depth below the water surface at a world position.
    ///
    /// `Some(0.0)` means "above water", `Some(d > 0)` means submerged by
    /// `d`, `None` means the provider has no answer.
    fn water_depth(&self, position: Vec3) -> Option<f32>;

    /// Chunk coordinate owning a world position.
    fn chunk_of(&self, position: Vec3) -> IVec3;
}

/// Optional provider capability: deterministic terrain height queries that
/// do not require chunks to be loaded (pure math from noise parameters).
/// Used by [`find_spawnable_position`].
pub trait TerrainHeightProvider: Send + Sync + 'static {
    /// Terrain surface height at a horizontal position.
    fn terrain_height(&self, x: f32, z: f32) -> f32;

    /// Water surface height, or `None` when the world has no water level.
    fn water_level(&self) -> Option<f32>;
}

/// Per-world registry entry for the terrain provider.
///
/// Bevy resources are owned by a single `World`, so registering the provider
/// here gives each session its own handle with no stale cross-world
/// references. Replacing the resource replaces the provider for every
/// character in that world.
#[derive(Resource, Clone)]
pub struct TerrainWorld {
    provider: Arc<dyn TerrainQueryProvider>,
}

impl TerrainWorld {
    /// Register a terrain provider for this world.
    pub fn new(provider: Arc<dyn TerrainQueryProvider>) -> Self {
        Self { provider }
    }

    /// Access the registered provider.
    pub fn provider(&self) -> &dyn TerrainQueryProvider {
        self.provider.as_ref()
    }
}

/// Event fired by the voxel engine whenever terrain geometry changes.
///
/// Characters compare `chunk` against their cached
/// [`TerrainContext::chunk_coord`] to decide relevance; unrelated chunks
/// have zero effect on their cache.
#[derive(Event, Debug, Clone, Copy)]
pub struct ChunkEdited {
    /// Coordinate of the modified chunk.
    pub chunk: IVec3,
    /// World-space center of the edit (unused by the locomotion core).
    pub center: Vec3,
    /// Radius of the edit (unused by the locomotion core).
    pub radius: f32,
}

impl ChunkEdited {
    /// Create an edit event for a chunk.
    pub fn new(chunk: IVec3) -> Self {
        Self {
            chunk,
            center: Vec3::ZERO,
            radius: 0.0,
        }
    }
}

/// Bookkeeping for the per-character terrain cache.
///
/// Tracks time since the last successful provider sample and whether an
/// edit event invalidated the cache out of band.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct TerrainCacheState {
    /// Seconds since the last refresh.
    pub elapsed: f32,
    /// Set when a relevant chunk edit arrived; forces a refresh regardless
    /// of the cache interval.
    pub dirty: bool,
}

impl Default for TerrainCacheState {
    fn default() -> Self {
        Self {
            // Force a sample on the first tick after spawn.
            elapsed: f32::MAX,
            dirty: false,
        }
    }
}

impl TerrainCacheState {
    pub fn tick(&mut self, dt: f32) {
        if self.elapsed < f32::MAX {
            self.elapsed += dt;
        }
    }

    /// Whether a refresh is due under the given cache interval.
    pub fn due(&self, cache_duration: f32) -> bool {
        self.dirty || self.elapsed >= cache_duration
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_refreshed(&mut self) {
        self.elapsed = 0.0;
        self.dirty = false;
    }
}

/// Find a spawn position on terrain above the water level.
///
/// Tries `near` first; if that column is underwater, searches outward in 8
/// directions at `step` intervals (typically the chunk world size) up to
/// `max_search_radius`. Returns `None` when no above-water column exists in
/// range.
pub fn find_spawnable_position(
    heights: &dyn TerrainHeightProvider,
    near: Vec3,
    step: f32,
    max_search_radius: f32,
) -> Option<Vec3> {
    if step <= 0.0 {
        return None;
    }

    let water = heights.water_level();
    let above_water = |x: f32, z: f32| -> Option<f32> {
        let h = heights.terrain_height(x, z);
        match water {
            Some(level) if h <= level => None,
            _ => Some(h),
        }
    };

    if let Some(h) = above_water(near.x, near.z) {
        return Some(Vec3::new(near.x, h, near.z));
    }

    debug!(
        "find_spawnable_position: ({:.0}, {:.0}) is underwater, searching outward",
        near.x, near.z
    );

    const DIRECTIONS: [(f32, f32); 8] = [
        (1.0, 0.0),
        (1.0, 1.0),
        (0.0, 1.0),
        (-1.0, 1.0),
        (-1.0, 0.0),
        (-1.0, -1.0),
        (0.0, -1.0),
        (1.0, -1.0),
    ];

    let max_rings = (max_search_radius / step).ceil() as i32;
    for ring in 1..=max_rings {
        let radius = ring as f32 * step;
        for (dx, dz) in DIRECTIONS {
            let x = near.x + dx * radius;
            let z = near.z + dz * radius;
            if let Some(h) = above_water(x, z) {
                return Some(Vec3::new(x, h, z));
            }
        }
    }

    warn!(
        "find_spawnable_position: no land within {:.0} units of ({:.0}, {:.0})",
        max_search_radius, near.x, near.z
    );
    None
}
