use bevy::prelude::*;

use crate::spawn::Arena;

pub const BOUNCE_MIN_ABOVE_GROUND: f32 = 0.3;
pub const PULSE_MIN_MULTIPLIER: f32 = 0.95;
pub const PULSE_EVERY_N_FRAMES: u32 = 2;
pub const PULSE_DELAY_SECS: f32 = 0.5;

/// Vertical bob around the position the pickup was spawned at.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct Bounce {
    pub height: f32,
    pub speed: f32,
    pub min_above_ground: f32,
    start: Option<Vec3>,
}

impl Bounce {
    pub fn new(height: f32, speed: f32) -> Self {
        Self {
            height,
            speed,
            min_above_ground: BOUNCE_MIN_ABOVE_GROUND,
            start: None,
        }
    }
}

pub fn bounce_y(start_y: f32, t: f32, height: f32, speed: f32, floor: f32) -> f32 {
    (start_y + (t * speed).sin() * height).max(floor)
}

/// Uniform scale throb around the scale the pickup settled at.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct Pulse {
    pub amplitude: f32,
    pub speed: f32,
    pub min_multiplier: f32,
    pub every_n_frames: u32,
    delay: f32,
    base_scale: Option<Vec3>,
    frame: u32,
}

impl Pulse {
    pub fn new(amplitude: f32, speed: f32) -> Self {
        Self {
            amplitude,
            speed,
            min_multiplier: PULSE_MIN_MULTIPLIER,
            every_n_frames: PULSE_EVERY_N_FRAMES,
            delay: PULSE_DELAY_SECS,
            base_scale: None,
            frame: 0,
        }
    }

    /// Advances one frame. Returns the scale to apply, if this frame updates it.
    pub fn step(&mut self, dt: f32, t: f32, current_scale: Vec3) -> Option<Vec3> {
        let base = match self.base_scale {
            Some(base) => base,
            None => {
                self.delay -= dt;
                if self.delay > 0.0 {
                    return None;
                }
                self.base_scale = Some(current_scale);
                current_scale
            }
        };

        self.frame += 1;
        if self.frame % self.every_n_frames.max(1) != 0 {
            return None;
        }
        Some(base * pulse_multiplier(t, self.amplitude, self.speed, self.min_multiplier))
    }
}

pub fn pulse_multiplier(t: f32, amplitude: f32, speed: f32, min_multiplier: f32) -> f32 {
    (1.0 + (t * speed).sin() * amplitude).max(min_multiplier)
}

/// Constant spin in degrees per second about each axis.
#[derive(Component, Clone, Copy, Debug)]
pub struct Rotator {
    pub speed: Vec3,
}

/// Rotation for one frame of `speed` degrees per second, applied Z, then X, then Y.
pub fn rotator_step(speed: Vec3, dt: f32) -> Quat {
    let d = speed * dt;
    Quat::from_euler(
        EulerRot::YXZ,
        d.y.to_radians(),
        d.x.to_radians(),
        d.z.to_radians(),
    )
}

pub struct DecoratorPlugin;
impl Plugin for DecoratorPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (rotate, bounce, pulse));
    }
}

fn rotate(time: Res<Time>, mut q: Query<(&Rotator, &mut Transform)>) {
    let dt = time.delta_seconds();
    for (rotator, mut t) in &mut q {
        t.rotate_local(rotator_step(rotator.speed, dt));
    }
}

fn bounce(time: Res<Time>, arena: Option<Res<Arena>>, mut q: Query<(&mut Bounce, &mut Transform)>) {
    let ground_y = arena.map_or(0.0, |a| a.top_y);
    let t = time.elapsed_seconds();
    for (mut b, mut transform) in &mut q {
        let start = *b.start.get_or_insert(transform.translation);
        let y = bounce_y(start.y, t, b.height, b.speed, ground_y + b.min_above_ground);
        transform.translation = Vec3::new(start.x, y, start.z);
    }
}

fn pulse(time: Res<Time>, mut q: Query<(&mut Pulse, &mut Transform)>) {
    let dt = time.delta_seconds();
    let t = time.elapsed_seconds();
    for (mut p, mut transform) in &mut q {
        if let Some(scale) = p.step(dt, t, transform.scale) {
            transform.scale = scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn bounce_oscillates_around_start() {
        assert_eq!(bounce_y(1.0, 0.0, 0.25, 2.0, 0.3), 1.0);
        let peak = bounce_y(1.0, FRAC_PI_2 / 2.0, 0.25, 2.0, 0.3);
        assert!((peak - 1.25).abs() < 1e-5);
    }

    #[test]
    fn bounce_never_dips_below_floor() {
        // Trough would be 0.2, floor is 0.3.
        let trough = bounce_y(0.4, 3.0 * FRAC_PI_2, 0.2, 1.0, 0.3);
        assert_eq!(trough, 0.3);
    }

    #[test]
    fn pulse_multiplier_is_clamped() {
        assert!((pulse_multiplier(FRAC_PI_2, 0.08, 1.0, 0.95) - 1.08).abs() < 1e-5);
        assert_eq!(pulse_multiplier(3.0 * FRAC_PI_2, 0.08, 1.0, 0.95), 0.95);
    }

    #[test]
    fn pulse_waits_then_updates_every_other_frame() {
        let mut p = Pulse::new(0.08, 3.0);
        let dt = 0.2;
        let base = Vec3::splat(0.5);

        for _ in 0..2 {
            assert_eq!(p.step(dt, 0.0, base), None);
        }
        // Delay elapses on the third frame; base captured, frame 1 skipped.
        assert_eq!(p.step(dt, 0.0, base), None);
        assert_eq!(p.step(dt, 0.0, Vec3::ONE), Some(base));
        assert_eq!(p.step(dt, 0.0, Vec3::ONE), None);
        assert_eq!(p.step(dt, 0.0, Vec3::ONE), Some(base));
    }

    #[test]
    fn rotator_turns_by_speed_times_dt() {
        let q = rotator_step(Vec3::new(0.0, 90.0, 0.0), 1.0);
        let v = q * Vec3::X;
        assert!(v.abs_diff_eq(Vec3::NEG_Z, 1e-5));
        assert_eq!(rotator_step(Vec3::new(15.0, 30.0, 45.0), 0.0), Quat::IDENTITY);
    }
}
