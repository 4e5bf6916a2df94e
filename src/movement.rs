use bevy::prelude::*;

use crate::config::GameSettings;

/// Force, drag and speed cap for the rolling ball.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementTuning {
    pub move_speed: f32,
    pub max_speed: f32,
    pub drag: f32,
}

impl From<&GameSettings> for MovementTuning {
    fn from(s: &GameSettings) -> Self {
        Self {
            move_speed: s.move_speed,
            max_speed: s.max_speed,
            drag: s.drag,
        }
    }
}

/// Rescales `vel` so its magnitude is at most `max_speed`, keeping direction.
pub fn clamp_speed(vel: Vec3, max_speed: f32) -> Vec3 {
    vel.clamp_length_max(max_speed)
}

/// Maps the two input axes onto the ground plane. Positive `y` rolls away
/// from the camera.
pub fn input_force(axis: Vec2, move_speed: f32) -> Vec3 {
    Vec3::new(axis.x, 0.0, -axis.y) * move_speed
}

/// One frame of arcade rolling: push, drag, cap.
pub fn integrate_velocity(vel: Vec3, axis: Vec2, tuning: &MovementTuning, dt: f32) -> Vec3 {
    let pushed = vel + input_force(axis, tuning.move_speed) * dt;
    let dragged = pushed * (1.0 - tuning.drag * dt).clamp(0.0, 1.0);
    clamp_speed(dragged, tuning.max_speed)
}

/// Keeps a ball of `radius` inside the arena half extents on x/z, zeroing the
/// velocity components that push it through a wall.
pub fn confine(pos: Vec3, vel: Vec3, half_extent: Vec2, radius: f32) -> (Vec3, Vec3) {
    let limit = (half_extent - Vec2::splat(radius)).max(Vec2::ZERO);
    let mut p = pos;
    let mut v = vel;
    if p.x.abs() > limit.x {
        p.x = p.x.clamp(-limit.x, limit.x);
        if v.x * p.x.signum() > 0.0 {
            v.x = 0.0;
        }
    }
    if p.z.abs() > limit.y {
        p.z = p.z.clamp(-limit.y, limit.y);
        if v.z * p.z.signum() > 0.0 {
            v.z = 0.0;
        }
    }
    (p, v)
}

/// Rotation a ball of `radius` picks up rolling with `vel` for `dt` seconds.
pub fn rolling_rotation(vel: Vec3, radius: f32, dt: f32) -> Option<Quat> {
    let planar = Vec3::new(vel.x, 0.0, vel.z);
    let speed = planar.length();
    if speed < 1e-4 || radius <= 0.0 {
        return None;
    }
    let axis = Vec3::Y.cross(planar / speed);
    Some(Quat::from_axis_angle(axis, speed / radius * dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TUNING: MovementTuning = MovementTuning {
        move_speed: 10.0,
        max_speed: 15.0,
        drag: 2.0,
    };

    #[test]
    fn clamps_twenty_to_fifteen() {
        let raw = Vec3::new(12.0, 0.0, 16.0);
        assert_eq!(raw.length(), 20.0);
        let capped = clamp_speed(raw, 15.0);
        assert!((capped.length() - 15.0).abs() < 1e-5);
        assert!(capped.normalize().abs_diff_eq(raw.normalize(), 1e-6));
    }

    #[test]
    fn slow_velocity_is_untouched() {
        let v = Vec3::new(1.0, 0.0, 2.0);
        assert_eq!(clamp_speed(v, 15.0), v);
    }

    #[test]
    fn forward_input_rolls_away_from_camera() {
        let v = integrate_velocity(Vec3::ZERO, Vec2::Y, &TUNING, 0.1);
        assert!(v.z < 0.0);
        assert_eq!(v.x, 0.0);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn drag_slows_a_coasting_ball() {
        let v = integrate_velocity(Vec3::new(5.0, 0.0, 0.0), Vec2::ZERO, &TUNING, 0.1);
        assert!((v.x - 4.0).abs() < 1e-5);
    }

    #[test]
    fn holding_input_never_exceeds_cap() {
        let mut v = Vec3::ZERO;
        let tuning = MovementTuning { drag: 0.0, ..TUNING };
        for _ in 0..1000 {
            v = integrate_velocity(v, Vec2::new(1.0, 1.0), &tuning, 1.0 / 60.0);
        }
        assert!((v.length() - 15.0).abs() < 1e-3);
    }

    #[test]
    fn walls_stop_outward_motion_only() {
        let (p, v) = confine(
            Vec3::new(9.8, 0.5, 0.0),
            Vec3::new(3.0, 0.0, 1.0),
            Vec2::splat(10.0),
            0.5,
        );
        assert_eq!(p.x, 9.5);
        assert_eq!(v, Vec3::new(0.0, 0.0, 1.0));

        let (_, v) = confine(
            Vec3::new(-9.8, 0.5, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            Vec2::splat(10.0),
            0.5,
        );
        assert_eq!(v.x, 3.0);
    }

    #[test]
    fn resting_ball_does_not_roll() {
        assert!(rolling_rotation(Vec3::ZERO, 0.5, 0.1).is_none());
        assert!(rolling_rotation(Vec3::X, 0.5, 0.1).is_some());
    }

    proptest! {
        #[test]
        fn cap_preserves_direction(
            x in -100.0f32..100.0,
            y in -100.0f32..100.0,
            z in -100.0f32..100.0,
            max in 0.5f32..50.0,
        ) {
            let v = Vec3::new(x, y, z);
            prop_assume!(v.length() > max);
            let capped = clamp_speed(v, max);
            prop_assert!((capped.length() - max).abs() < 1e-3 * max.max(1.0));
            prop_assert!(capped.normalize().dot(v.normalize()) > 0.9999);
        }
    }
}
