use bevy::{
    asset::RenderAssetUsages,
    mesh::{Indices, PrimitiveTopology},
    prelude::*,
};

use crate::{
    error::Result,
    extract::{ExtractionConfig, extract_surface, par_extract_surface},
    field::ScalarField,
    mesh::SurfaceMesh,
};

/// System sets for the per-frame metaball pipeline.
///
/// ```text
/// MetaballsSet::Advance  →  MetaballsSet::Extract
/// (field motion)            (scan + triangulate + mesh upload)
/// ```
///
/// Use these to order your own systems relative to the pipeline, e.g. a
/// system that nudges ball anchors should run before `Advance`:
///
/// ```rust,ignore
/// app.add_systems(Update, steer_balls.before(MetaballsSet::Advance));
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetaballsSet {
    /// Advances every field's motion state, exactly once per frame.
    Advance,
    /// Re-extracts each surface and replaces its [`Mesh3d`] contents.
    Extract,
}

/// An animated metaball surface, re-polygonised every frame.
///
/// The entity's mesh is rebuilt from scratch each frame — no topology is
/// cached across frames, and the whole buffer is replaced on upload.
#[derive(Component)]
#[require(Transform)]
pub struct Metaballs {
    field: Box<dyn ScalarField + Send + Sync>,
    config: ExtractionConfig,
    /// Scan grid slabs on rayon instead of a single thread. Output is
    /// identical either way.
    pub parallel: bool,
}

impl Metaballs {
    /// Wraps a field with the given extraction settings.
    ///
    /// Fails if the config is invalid (non-positive step or normal delta,
    /// negative margin).
    pub fn new(
        field: impl ScalarField + Send + Sync + 'static,
        config: ExtractionConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            field: Box::new(field),
            config,
            parallel: false,
        })
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn field(&self) -> &(dyn ScalarField + Send + Sync) {
        self.field.as_ref()
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }
}

/// Bevy plugin that re-extracts every [`Metaballs`] surface each frame.
///
/// ```text
/// Update:
///   advance_fields        (MetaballsSet::Advance)
///   regenerate_meshes     (MetaballsSet::Extract)
/// ```
///
/// Extraction is synchronous: a frame's mesh is always the surface of that
/// frame's field state, never a stale async result.
#[derive(Default)]
pub struct MetaballsPlugin;

impl Plugin for MetaballsPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (MetaballsSet::Advance, MetaballsSet::Extract).chain(),
        )
        .add_systems(
            Update,
            (
                advance_fields.in_set(MetaballsSet::Advance),
                regenerate_meshes.in_set(MetaballsSet::Extract),
            ),
        );
    }
}

/// Advances each field's motion state by the frame delta.
fn advance_fields(time: Res<Time>, mut query: Query<&mut Metaballs>) {
    for mut metaballs in query.iter_mut() {
        metaballs.field.advance(time.delta_secs());
    }
}

/// Extracts each surface and publishes it, replacing the prior frame's mesh
/// entirely.
///
/// The first frame allocates a mesh asset and inserts [`Mesh3d`]; later
/// frames overwrite the same asset so the handle stays stable.
fn regenerate_meshes(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    query: Query<(Entity, &Metaballs, Option<&Mesh3d>)>,
) {
    for (entity, metaballs, mesh3d) in query.iter() {
        let surface = if metaballs.parallel {
            par_extract_surface(metaballs.field.as_ref(), &metaballs.config)
        } else {
            extract_surface(metaballs.field.as_ref(), &metaballs.config)
        };
        trace!(
            "metaballs {entity}: {} vertices, {} triangles",
            surface.vertex_count(),
            surface.triangle_count()
        );

        let render_mesh = build_render_mesh(surface);
        match mesh3d {
            Some(handle) => {
                meshes.insert(handle.id(), render_mesh);
            }
            None => {
                commands.entity(entity).insert(Mesh3d(meshes.add(render_mesh)));
            }
        }
    }
}

/// Moves a [`SurfaceMesh`]'s buffers into a Bevy [`Mesh`] with no copies.
fn build_render_mesh(surface: SurfaceMesh) -> Mesh {
    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, surface.positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, surface.normals);
    mesh.insert_indices(Indices::U32(surface.indices));
    mesh
}
