use bevy::color::LinearRgba;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::GameSettings;
use crate::decorators::Rotator;
use crate::input::{MoveAxes, StartRequested};
use crate::movement::{confine, integrate_velocity, rolling_rotation, MovementTuning};
use crate::prefs::{record_finish, FinishRecord, Prefs};
use crate::session::{AppState, CollectOutcome, GameSession};
use crate::spawn::{place_pickups, Arena, LevelTheme, PlacementRules};
use crate::tween::{run_spawn_pops, CountdownSequence, SpawnPop};

pub const PICKUP_SCALE: f32 = 0.5;
const PICKUP_TILT_DEG: f32 = 45.0;

const BURST_PARTICLES: usize = 20;
const BURST_LIFETIME: f32 = 0.5;
const BURST_SPEED: f32 = 3.0;
const BURST_RADIUS: f32 = 0.5;
const BURST_SIZE: f32 = 0.2;

#[derive(Resource)]
pub struct SeededRng(pub StdRng);

#[derive(Component, Default)]
pub struct Player {
    pub vel: Vec3,
}

/// Tag for collectables.
#[derive(Component)]
pub struct Pickup;

#[derive(Component)]
pub struct Particle {
    pub vel: Vec3,
    pub lifespan: f32,
}

/// Meshes and materials shared by every pickup and particle.
#[derive(Resource)]
pub struct PickupAssets {
    pub pickup_mesh: Handle<Mesh>,
    pub particle_mesh: Handle<Mesh>,
    pub particle_material: Handle<StandardMaterial>,
}

#[derive(Event)]
pub struct SpawnWave {
    pub level: u32,
}

#[derive(Event)]
pub struct CollectBurst {
    pub position: Vec3,
}

#[derive(Event)]
pub struct LevelUp {
    pub level: u32,
}

#[derive(Event)]
pub struct GameWon(pub FinishRecord);

#[derive(Event, Default)]
pub struct ResetEvent;

pub struct GamePlugin;
impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, load_session);
        add_gameplay(app);
    }
}

/// Events and systems of a run, without the settings/prefs loading.
fn add_gameplay(app: &mut App) {
    app.add_event::<SpawnWave>()
        .add_event::<CollectBurst>()
        .add_event::<LevelUp>()
        .add_event::<GameWon>()
        .add_event::<ResetEvent>()
        .add_systems(Startup, create_pickup_assets)
        .add_systems(Update, start_countdown.run_if(in_state(AppState::Idle)))
        .add_systems(Update, run_countdown.run_if(in_state(AppState::Countdown)))
        .add_systems(
            Update,
            (drive_player, update_clock, collect_pickups)
                .chain()
                .run_if(in_state(AppState::Playing)),
        )
        .add_systems(
            Update,
            (
                // A reset must win over waves and bursts queued in the same frame.
                handle_reset
                    .before(spawn_pickups)
                    .before(spawn_collect_bursts)
                    .before(drive_player),
                spawn_pickups,
                spawn_collect_bursts,
                update_particles,
                run_spawn_pops,
            ),
        );
}

fn load_session(mut commands: Commands) {
    let settings = GameSettings::load_or_default();
    let rng = match settings.seed {
        Some(seed) => {
            info!("pickup placement seeded with {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    commands.insert_resource(GameSession::from_settings(&settings));
    commands.insert_resource(Prefs::open_or_memory(&settings.prefs_path));
    commands.insert_resource(Arena::square(settings.arena_size));
    commands.insert_resource(SeededRng(rng));
    commands.insert_resource(settings);
}

fn create_pickup_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(PickupAssets {
        pickup_mesh: meshes.add(Cuboid::new(1.0, 1.0, 1.0)),
        particle_mesh: meshes.add(Sphere::new(BURST_SIZE * 0.5)),
        particle_material: materials.add(StandardMaterial {
            base_color: Color::srgb(1.0, 0.92, 0.016),
            emissive: LinearRgba::rgb(1.0, 0.9, 0.0),
            unlit: true,
            ..default()
        }),
    });
}

fn start_countdown(
    mut commands: Commands,
    mut ev_start: EventReader<StartRequested>,
    mut session: ResMut<GameSession>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if ev_start.read().next().is_none() {
        return;
    }
    ev_start.clear();

    if session.request_start() {
        info!("countdown started");
        commands.insert_resource(CountdownSequence::new(true));
        next_state.set(AppState::Countdown);
    }
}

fn run_countdown(
    mut commands: Commands,
    time: Res<Time>,
    countdown: Option<ResMut<CountdownSequence>>,
    mut session: ResMut<GameSession>,
    mut next_state: ResMut<NextState<AppState>>,
    mut ev_wave: EventWriter<SpawnWave>,
) {
    let Some(mut countdown) = countdown else {
        warn!("countdown state without a countdown sequence");
        return;
    };
    if !countdown.tick(time.delta_seconds()) {
        return;
    }

    commands.remove_resource::<CountdownSequence>();
    if session.begin_play(time.elapsed_seconds()) {
        info!("GO! level {} of {}", session.level(), session.total_levels());
        ev_wave.send(SpawnWave {
            level: session.level(),
        });
        next_state.set(AppState::Playing);
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_pickups(
    mut commands: Commands,
    mut ev_wave: EventReader<SpawnWave>,
    settings: Res<GameSettings>,
    arena: Option<Res<Arena>>,
    assets: Option<Res<PickupAssets>>,
    mut rng: ResMut<SeededRng>,
    mut session: ResMut<GameSession>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    player_q: Query<&Handle<StandardMaterial>, With<Player>>,
) {
    for wave in ev_wave.read() {
        if session.phase() != AppState::Playing {
            debug!("dropping level {} wave, no run in progress", wave.level);
            continue;
        }
        let theme = LevelTheme::for_level(wave.level);

        if let Ok(handle) = player_q.get_single() {
            if let Some(mat) = materials.get_mut(handle) {
                mat.base_color = theme.ball_color;
            }
        }

        let (Some(arena), Some(assets)) = (arena.as_deref(), assets.as_deref()) else {
            warn!("no arena or pickup assets, level {} has no pickups", wave.level);
            session.begin_wave(0);
            continue;
        };

        let material = materials.add(StandardMaterial {
            base_color: theme.pickup_color,
            emissive: theme.emission,
            ..default()
        });
        let tilt = PICKUP_TILT_DEG.to_radians();
        let rotation = Quat::from_euler(EulerRot::YXZ, tilt, tilt, tilt);
        let positions = place_pickups(
            &mut rng.0,
            arena,
            settings.pickups_per_level as usize,
            &PlacementRules::from(&*settings),
        );

        for pos in &positions {
            let mut entity = commands.spawn((
                PbrBundle {
                    mesh: assets.pickup_mesh.clone(),
                    material: material.clone(),
                    transform: Transform::from_translation(*pos)
                        .with_rotation(rotation)
                        .with_scale(Vec3::ZERO),
                    ..default()
                },
                Pickup,
                Rotator {
                    speed: settings.rotator_speed(),
                },
                SpawnPop::new(Vec3::splat(PICKUP_SCALE)),
            ));
            if let Some(bounce) = &theme.bounce {
                entity.insert(bounce.clone());
            }
            if let Some(pulse) = &theme.pulse {
                entity.insert(pulse.clone());
            }
        }

        session.begin_wave(positions.len() as u32);
        debug!("spawned {} pickups for level {}", positions.len(), wave.level);
    }
}

fn drive_player(
    time: Res<Time>,
    settings: Res<GameSettings>,
    axes: Res<MoveAxes>,
    arena: Option<Res<Arena>>,
    mut players: Query<(&mut Player, &mut Transform)>,
) {
    let dt = time.delta_seconds();
    let Ok((mut player, mut t)) = players.get_single_mut() else {
        return;
    };

    let tuning = MovementTuning::from(&*settings);
    player.vel = integrate_velocity(player.vel, axes.0, &tuning, dt);
    let mut pos = t.translation + player.vel * dt;

    if let Some(arena) = arena.as_deref() {
        let (confined, vel) = confine(pos, player.vel, arena.half_extent, settings.player_radius);
        pos = confined;
        pos.y = arena.top_y + settings.player_radius;
        player.vel = vel;
    }
    t.translation = pos;

    if let Some(roll) = rolling_rotation(player.vel, settings.player_radius, dt) {
        t.rotation = roll * t.rotation;
    }
}

fn update_clock(time: Res<Time>, mut session: ResMut<GameSession>) {
    session.update_clock(time.elapsed_seconds());
}

#[allow(clippy::too_many_arguments)]
fn collect_pickups(
    mut commands: Commands,
    settings: Res<GameSettings>,
    mut session: ResMut<GameSession>,
    mut prefs: Option<ResMut<Prefs>>,
    mut virtual_time: ResMut<Time<Virtual>>,
    mut next_state: ResMut<NextState<AppState>>,
    player_q: Query<&Transform, With<Player>>,
    pickup_q: Query<(Entity, &Transform), With<Pickup>>,
    mut ev_burst: EventWriter<CollectBurst>,
    mut ev_wave: EventWriter<SpawnWave>,
    mut ev_level: EventWriter<LevelUp>,
    mut ev_won: EventWriter<GameWon>,
) {
    let Ok(player) = player_q.get_single() else {
        return;
    };
    let reach = settings.player_radius + settings.pickup_trigger_radius;
    let reach_sq = reach * reach;

    for (e, t) in &pickup_q {
        if player.translation.distance_squared(t.translation) > reach_sq {
            continue;
        }

        commands.entity(e).despawn_recursive();
        ev_burst.send(CollectBurst {
            position: t.translation,
        });

        match session.collect() {
            CollectOutcome::Ignored => {}
            CollectOutcome::Continue => {
                debug!(
                    "pickup collected, {} left in level {}",
                    session.remaining_in_level(),
                    session.level()
                );
            }
            CollectOutcome::LevelUp(level) => {
                info!("level {} reached", level);
                ev_level.send(LevelUp { level });
                ev_wave.send(SpawnWave { level });
            }
            CollectOutcome::Finished => {
                let elapsed = session.elapsed();
                let record = match prefs.as_deref_mut() {
                    Some(prefs) => record_finish(prefs.0.as_mut(), elapsed),
                    None => {
                        warn!("no preference store, best time not recorded");
                        FinishRecord {
                            elapsed,
                            best: elapsed,
                            new_record: false,
                        }
                    }
                };
                info!(
                    "finished in {:.2}s (best {:.2}s{})",
                    record.elapsed,
                    record.best,
                    if record.new_record { ", new record" } else { "" }
                );
                ev_won.send(GameWon(record));
                virtual_time.pause();
                next_state.set(AppState::Finished);
            }
        }
    }
}

fn spawn_collect_bursts(
    mut commands: Commands,
    mut ev_burst: EventReader<CollectBurst>,
    session: Res<GameSession>,
    assets: Option<Res<PickupAssets>>,
    mut rng: ResMut<SeededRng>,
) {
    let Some(assets) = assets.filter(|_| session.phase() != AppState::Idle) else {
        ev_burst.clear();
        return;
    };
    for burst in ev_burst.read() {
        for _ in 0..BURST_PARTICLES {
            let dir = Vec3::new(
                rng.0.gen_range(-1.0..1.0),
                rng.0.gen_range(-1.0..1.0),
                rng.0.gen_range(-1.0..1.0),
            )
            .normalize_or_zero();
            let dir = if dir == Vec3::ZERO { Vec3::Y } else { dir };
            commands.spawn((
                PbrBundle {
                    mesh: assets.particle_mesh.clone(),
                    material: assets.particle_material.clone(),
                    transform: Transform::from_translation(burst.position + dir * BURST_RADIUS),
                    ..default()
                },
                Particle {
                    vel: dir * BURST_SPEED,
                    lifespan: BURST_LIFETIME,
                },
            ));
        }
    }
}

fn update_particles(
    mut commands: Commands,
    time: Res<Time>,
    mut q: Query<(Entity, &mut Particle, &mut Transform)>,
) {
    let dt = time.delta_seconds();
    for (e, mut p, mut t) in &mut q {
        p.lifespan -= dt;
        if p.lifespan <= 0.0 {
            commands.entity(e).despawn();
        } else {
            t.translation += p.vel * dt;
            t.scale = Vec3::splat(p.lifespan / BURST_LIFETIME);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_reset(
    mut commands: Commands,
    mut ev_reset: EventReader<ResetEvent>,
    settings: Res<GameSettings>,
    arena: Option<Res<Arena>>,
    mut session: ResMut<GameSession>,
    mut virtual_time: ResMut<Time<Virtual>>,
    mut next_state: ResMut<NextState<AppState>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    cleanup_q: Query<Entity, Or<(With<Pickup>, With<Particle>)>>,
    mut player_q: Query<(&mut Player, &mut Transform, &Handle<StandardMaterial>)>,
) {
    if ev_reset.is_empty() {
        return;
    }
    ev_reset.clear();

    for e in &cleanup_q {
        commands.entity(e).despawn_recursive();
    }
    commands.remove_resource::<CountdownSequence>();

    if let Ok((mut player, mut t, handle)) = player_q.get_single_mut() {
        player.vel = Vec3::ZERO;
        let ground = arena.map_or(0.0, |a| a.top_y);
        *t = Transform::from_xyz(0.0, ground + settings.player_radius, 0.0);
        if let Some(mat) = materials.get_mut(handle) {
            mat.base_color = LevelTheme::for_level(1).ball_color;
        }
    }

    session.reset();
    virtual_time.unpause();
    next_state.set(AppState::Idle);
    info!("session reset");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorators::{Bounce, Pulse};
    use crate::input::MoveAxes;
    use crate::prefs::MemoryPrefs;
    use bevy::ecs::query::QueryFilter;
    use bevy::state::app::StatesPlugin;

    fn test_app(settings: GameSettings) -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default(), StatesPlugin))
            .init_asset::<Mesh>()
            .init_asset::<StandardMaterial>()
            .init_state::<AppState>()
            .add_event::<StartRequested>()
            .init_resource::<MoveAxes>()
            .insert_resource(GameSession::from_settings(&settings))
            .insert_resource(Prefs(Box::new(MemoryPrefs::default())))
            .insert_resource(Arena::square(settings.arena_size))
            .insert_resource(SeededRng(StdRng::seed_from_u64(11)))
            .insert_resource(settings);
        add_gameplay(&mut app);

        let material = app
            .world_mut()
            .resource_mut::<Assets<StandardMaterial>>()
            .add(StandardMaterial::default());
        app.world_mut().spawn((
            Player::default(),
            Transform::from_xyz(0.0, 0.5, 0.0),
            material,
        ));

        // Startup: pickup assets.
        app.update();
        app
    }

    /// Puts the session into play without going through the countdown.
    fn begin_run(app: &mut App) {
        let mut session = app.world_mut().resource_mut::<GameSession>();
        assert!(session.request_start());
        assert!(session.begin_play(0.0));
    }

    fn count<F: QueryFilter>(app: &mut App) -> usize {
        let mut q = app.world_mut().query_filtered::<Entity, F>();
        q.iter(app.world()).count()
    }

    #[test]
    fn wave_spawns_one_tagged_pickup_per_slot() {
        let mut app = test_app(GameSettings::default());
        begin_run(&mut app);

        app.world_mut().send_event(SpawnWave { level: 1 });
        app.update();

        assert_eq!(count::<With<Pickup>>(&mut app), 7);
        assert_eq!(count::<(With<Pickup>, With<Rotator>)>(&mut app), 7);
        assert_eq!(count::<Or<(With<Bounce>, With<Pulse>)>>(&mut app), 0);
        assert_eq!(app.world().resource::<GameSession>().remaining_in_level(), 7);
    }

    #[test]
    fn third_level_pickups_bounce_and_pulse() {
        let mut app = test_app(GameSettings {
            pickups_per_level: 4,
            ..default()
        });
        begin_run(&mut app);

        app.world_mut().send_event(SpawnWave { level: 3 });
        app.update();

        assert_eq!(count::<(With<Pickup>, With<Bounce>, With<Pulse>)>(&mut app), 4);
    }

    #[test]
    fn collecting_the_last_pickup_finishes_and_pauses() {
        let mut app = test_app(GameSettings {
            total_levels: 1,
            pickups_per_level: 1,
            ..default()
        });
        begin_run(&mut app);
        app.world_mut().resource_mut::<GameSession>().begin_wave(1);
        app.world_mut()
            .resource_mut::<NextState<AppState>>()
            .set(AppState::Playing);
        app.world_mut()
            .spawn((Pickup, Transform::from_xyz(0.0, 0.5, 0.0)));

        app.update();
        app.update();

        assert_eq!(count::<With<Pickup>>(&mut app), 0);
        assert!(app.world().resource::<Time<Virtual>>().is_paused());
        assert_eq!(
            *app.world().resource::<State<AppState>>().get(),
            AppState::Finished
        );
        assert_eq!(app.world().resource::<GameSession>().collected(), 1);
    }

    #[test]
    fn reset_clears_the_field() {
        let mut app = test_app(GameSettings::default());
        begin_run(&mut app);
        app.world_mut().send_event(SpawnWave { level: 2 });
        app.update();
        app.world_mut().spawn((
            Particle {
                vel: Vec3::Y,
                lifespan: BURST_LIFETIME,
            },
            Transform::default(),
        ));
        app.world_mut().resource_mut::<Time<Virtual>>().pause();

        app.world_mut().send_event(ResetEvent);
        app.update();

        assert_eq!(count::<With<Pickup>>(&mut app), 0);
        assert_eq!(count::<With<Particle>>(&mut app), 0);
        assert!(!app.world().resource::<Time<Virtual>>().is_paused());
        let session = app.world().resource::<GameSession>();
        assert_eq!(session.phase(), AppState::Idle);
        assert_eq!(session.level(), 1);
    }

    #[test]
    fn wave_queued_with_a_reset_is_dropped() {
        let mut app = test_app(GameSettings::default());
        begin_run(&mut app);

        app.world_mut().send_event(SpawnWave { level: 2 });
        app.world_mut().send_event(ResetEvent);
        app.update();
        app.update();

        assert_eq!(count::<With<Pickup>>(&mut app), 0);
        let session = app.world().resource::<GameSession>();
        assert_eq!(session.phase(), AppState::Idle);
        assert_eq!(session.remaining_in_level(), 0);
    }

    #[test]
    fn burst_queued_with_a_reset_is_dropped() {
        let mut app = test_app(GameSettings::default());
        begin_run(&mut app);

        app.world_mut().send_event(CollectBurst {
            position: Vec3::ONE,
        });
        app.world_mut().send_event(ResetEvent);
        app.update();

        assert_eq!(count::<With<Particle>>(&mut app), 0);
    }
}
