use bevy::prelude::*;
use bevy_metaballs::{
    MetaballsPlugin,
    extract::ExtractionConfig,
    field::{Metaball, MetaballField},
    plugin::Metaballs,
    types::Point,
};
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};

fn main() {
    App::new()
        .add_plugins((DefaultPlugins, MetaballsPlugin, PanOrbitCameraPlugin))
        .add_systems(Startup, setup)
        .run();
}

fn setup(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    commands.spawn((
        Camera3d::default(),
        PanOrbitCamera {
            button_orbit: MouseButton::Right,
            button_pan: MouseButton::Middle,
            ..default()
        },
        Transform::from_xyz(6.0, 4.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: light_consts::lux::FULL_DAYLIGHT,
            ..Default::default()
        },
        Transform::default().with_rotation(Quat::from_rotation_x(-45.0_f32.to_radians())),
    ));

    let field = MetaballField::new(vec![
        Metaball::new(Point::new(-1.0, 0.0, 0.0), 0.9),
        Metaball::new(Point::new(1.0, 0.4, 0.0), 1.1),
        Metaball::new(Point::new(0.0, -0.6, 0.8), 0.7),
    ]);

    // A coarser step than the default keeps the per-frame rebuild interactive.
    let config = ExtractionConfig {
        step: 0.12,
        ..Default::default()
    };

    commands.spawn((
        Metaballs::new(field, config)
            .expect("extraction config is valid")
            .with_parallel(true),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.9, 0.3, 0.2),
            perceptual_roughness: 0.3,
            ..Default::default()
        })),
    ));
}
