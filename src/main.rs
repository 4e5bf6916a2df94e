mod camera;
mod config;
mod decorators;
mod error;
mod game;
mod input;
mod movement;
mod prefs;
mod session;
mod spawn;
mod tween;
mod ui;

use bevy::core_pipeline::bloom::BloomSettings;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::prelude::*;
use camera::{CameraPlugin, FollowCamera};
use config::GameSettings;
use decorators::DecoratorPlugin;
use game::{GamePlugin, Player};
use input::InputPlugin;
use session::AppState;
use spawn::{Arena, LevelTheme};
use ui::UiPlugin;

const WALL_HEIGHT: f32 = 1.0;
const WALL_THICKNESS: f32 = 0.5;

fn main() {
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.05, 0.06, 0.09)))
        .insert_resource(Msaa::Sample4)
        .insert_resource(AmbientLight {
            color: Color::WHITE,
            brightness: 300.0,
        })
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "roll-collect".into(),
                resolution: (1280., 800.).into(),
                ..default()
            }),
            ..default()
        }))
        .init_state::<AppState>()
        .add_plugins((GamePlugin, DecoratorPlugin, CameraPlugin, InputPlugin, UiPlugin))
        .add_systems(Startup, setup_scene)
        .run();
}

fn setup_scene(
    mut commands: Commands,
    settings: Res<GameSettings>,
    arena: Option<Res<Arena>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let arena = arena.map_or_else(|| Arena::square(settings.arena_size), |a| *a);
    let size = arena.half_extent * 2.0;

    // Ground
    commands.spawn(PbrBundle {
        mesh: meshes.add(Plane3d::default().mesh().size(size.x, size.y)),
        material: materials.add(Color::srgb(0.18, 0.2, 0.26)),
        transform: Transform::from_xyz(0.0, arena.top_y, 0.0),
        ..default()
    });

    // Walls
    let wall_material = materials.add(Color::srgb(0.35, 0.37, 0.45));
    let y = arena.top_y + WALL_HEIGHT * 0.5;
    let hx = arena.half_extent.x + WALL_THICKNESS * 0.5;
    let hz = arena.half_extent.y + WALL_THICKNESS * 0.5;
    let long_x = size.x + WALL_THICKNESS * 2.0;
    for (pos, dims) in [
        (Vec3::new(0.0, y, -hz), Vec3::new(long_x, WALL_HEIGHT, WALL_THICKNESS)),
        (Vec3::new(0.0, y, hz), Vec3::new(long_x, WALL_HEIGHT, WALL_THICKNESS)),
        (Vec3::new(-hx, y, 0.0), Vec3::new(WALL_THICKNESS, WALL_HEIGHT, size.y)),
        (Vec3::new(hx, y, 0.0), Vec3::new(WALL_THICKNESS, WALL_HEIGHT, size.y)),
    ] {
        commands.spawn(PbrBundle {
            mesh: meshes.add(Cuboid::from_size(dims)),
            material: wall_material.clone(),
            transform: Transform::from_translation(pos),
            ..default()
        });
    }

    // Ball
    let start = Vec3::new(0.0, arena.top_y + settings.player_radius, 0.0);
    let player = commands
        .spawn((
            PbrBundle {
                mesh: meshes.add(Sphere::new(settings.player_radius).mesh().uv(32, 18)),
                material: materials.add(StandardMaterial {
                    base_color: LevelTheme::for_level(1).ball_color,
                    perceptual_roughness: 0.4,
                    ..default()
                }),
                transform: Transform::from_translation(start),
                ..default()
            },
            Player::default(),
        ))
        .id();

    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        transform: Transform::from_xyz(4.0, 10.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });

    let offset = settings.camera_offset();
    commands.spawn((
        Camera3dBundle {
            camera: Camera {
                hdr: true,
                ..default()
            },
            tonemapping: Tonemapping::TonyMcMapface,
            transform: Transform::from_translation(start + offset).looking_at(start, Vec3::Y),
            ..default()
        },
        BloomSettings::default(),
        FollowCamera {
            target: Some(player),
            offset,
            smooth_speed: settings.camera_smooth_speed,
            smoothing: settings.camera_smoothing,
        },
    ));
}
