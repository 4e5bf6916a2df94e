use bevy::input::gamepad::{GamepadConnection, GamepadConnectionEvent};
use bevy::prelude::*;

use crate::game::ResetEvent;
use crate::session::AppState;

#[derive(Resource)]
pub struct Keybinds {
    pub up: [KeyCode; 2],
    pub down: [KeyCode; 2],
    pub left: [KeyCode; 2],
    pub right: [KeyCode; 2],
    pub reset: KeyCode,
}

impl Default for Keybinds {
    fn default() -> Self {
        Self {
            up: [KeyCode::ArrowUp, KeyCode::KeyW],
            down: [KeyCode::ArrowDown, KeyCode::KeyS],
            left: [KeyCode::ArrowLeft, KeyCode::KeyA],
            right: [KeyCode::ArrowRight, KeyCode::KeyD],
            reset: KeyCode::KeyR,
        }
    }
}

/// Horizontal/vertical movement input for this frame, each in -1..=1.
#[derive(Resource, Default, Deref, DerefMut)]
pub struct MoveAxes(pub Vec2);

/// Something was pressed on the start screen.
#[derive(Event, Default)]
pub struct StartRequested;

#[derive(Resource)]
struct MyGamepad(Gamepad);

pub struct InputPlugin;
impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Keybinds>()
            .init_resource::<MoveAxes>()
            .add_event::<StartRequested>()
            .add_systems(
                Update,
                (
                    track_gamepad,
                    read_move_axes,
                    detect_start.run_if(in_state(AppState::Idle)),
                    reset_trigger
                        .run_if(in_state(AppState::Playing).or_else(in_state(AppState::Finished))),
                ),
            );
    }
}

fn any_pressed(keys: &ButtonInput<KeyCode>, codes: &[KeyCode]) -> bool {
    codes.iter().any(|k| keys.pressed(*k))
}

/// Digital keys and the left stick combined, clamped to the unit circle.
pub fn combine_axes(up: bool, down: bool, left: bool, right: bool, stick: Vec2) -> Vec2 {
    let mut dir = stick;
    if up {
        dir.y += 1.0;
    }
    if down {
        dir.y -= 1.0;
    }
    if left {
        dir.x -= 1.0;
    }
    if right {
        dir.x += 1.0;
    }
    dir.clamp_length_max(1.0)
}

fn read_move_axes(
    keys: Res<ButtonInput<KeyCode>>,
    keybinds: Res<Keybinds>,
    my_gamepad: Option<Res<MyGamepad>>,
    axes: Res<Axis<GamepadAxis>>,
    mut move_axes: ResMut<MoveAxes>,
) {
    let mut stick = Vec2::ZERO;
    if let Some(MyGamepad(gamepad)) = my_gamepad.as_deref() {
        let axis_lx = GamepadAxis {
            gamepad: *gamepad,
            axis_type: GamepadAxisType::LeftStickX,
        };
        let axis_ly = GamepadAxis {
            gamepad: *gamepad,
            axis_type: GamepadAxisType::LeftStickY,
        };
        if let (Some(x), Some(y)) = (axes.get(axis_lx), axes.get(axis_ly)) {
            stick = Vec2::new(x, y);
        }
    }

    move_axes.0 = combine_axes(
        any_pressed(&keys, &keybinds.up),
        any_pressed(&keys, &keybinds.down),
        any_pressed(&keys, &keybinds.left),
        any_pressed(&keys, &keybinds.right),
        stick,
    );
}

fn detect_start(
    keys: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    pad_buttons: Res<ButtonInput<GamepadButton>>,
    my_gamepad: Option<Res<MyGamepad>>,
    mut ev_start: EventWriter<StartRequested>,
) {
    let pad_start = my_gamepad.as_deref().is_some_and(|MyGamepad(gamepad)| {
        pad_buttons.just_pressed(GamepadButton {
            gamepad: *gamepad,
            button_type: GamepadButtonType::South,
        })
    });
    if keys.get_just_pressed().next().is_some() || mouse.just_pressed(MouseButton::Left) || pad_start
    {
        ev_start.send(StartRequested);
    }
}

fn reset_trigger(
    mut ev_reset: EventWriter<ResetEvent>,
    keys: Res<ButtonInput<KeyCode>>,
    keybinds: Res<Keybinds>,
) {
    if keys.just_pressed(keybinds.reset) {
        ev_reset.send(ResetEvent);
    }
}

/// Which pad steers the ball after `changed` connects or disconnects. A new
/// pad only takes over when none is active; losing the active pad hands
/// control to any other connected one.
pub fn choose_gamepad(
    active: Option<Gamepad>,
    changed: Gamepad,
    connected: bool,
    mut others: impl Iterator<Item = Gamepad>,
) -> Option<Gamepad> {
    match (active, connected) {
        (None, true) => Some(changed),
        (Some(current), false) if current == changed => others.find(|g| *g != changed),
        _ => active,
    }
}

fn track_gamepad(
    mut commands: Commands,
    my_gamepad: Option<Res<MyGamepad>>,
    gamepads: Res<Gamepads>,
    mut ev_connection: EventReader<GamepadConnectionEvent>,
) {
    let before = my_gamepad.as_deref().map(|MyGamepad(g)| *g);
    let mut active = before;
    for ev in ev_connection.read() {
        let connected = match &ev.connection {
            GamepadConnection::Connected(info) => {
                info!("gamepad {:?} connected: {}", ev.gamepad, info.name);
                true
            }
            GamepadConnection::Disconnected => {
                info!("gamepad {:?} disconnected", ev.gamepad);
                false
            }
        };
        active = choose_gamepad(active, ev.gamepad, connected, gamepads.iter());
    }

    if active == before {
        return;
    }
    match active {
        Some(gamepad) => {
            debug!("ball steered by gamepad {:?}", gamepad);
            commands.insert_resource(MyGamepad(gamepad));
        }
        None => {
            debug!("no gamepad left, keyboard only");
            commands.remove_resource::<MyGamepad>();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_keys_cancel() {
        assert_eq!(combine_axes(true, true, false, false, Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn diagonal_is_unit_length() {
        let d = combine_axes(true, false, false, true, Vec2::ZERO);
        assert!((d.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn stick_passes_through() {
        assert_eq!(
            combine_axes(false, false, false, false, Vec2::new(0.3, -0.2)),
            Vec2::new(0.3, -0.2)
        );
    }

    #[test]
    fn first_pad_takes_over_and_later_pads_wait() {
        let (a, b) = (Gamepad::new(0), Gamepad::new(1));
        assert_eq!(choose_gamepad(None, a, true, std::iter::empty()), Some(a));
        assert_eq!(choose_gamepad(Some(a), b, true, std::iter::empty()), Some(a));
    }

    #[test]
    fn losing_the_active_pad_falls_back_to_another() {
        let (a, b) = (Gamepad::new(0), Gamepad::new(1));
        assert_eq!(choose_gamepad(Some(a), a, false, [a, b].into_iter()), Some(b));
        assert_eq!(choose_gamepad(Some(a), a, false, [a].into_iter()), None);
        assert_eq!(choose_gamepad(Some(a), b, false, std::iter::empty()), Some(a));
    }
}
