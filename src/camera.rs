use bevy::log::warn_once;
use bevy::prelude::*;
use bevy::transform::TransformSystem;

/// Keeps the camera at a fixed offset from its target.
#[derive(Component, Clone, Debug)]
pub struct FollowCamera {
    pub target: Option<Entity>,
    pub offset: Vec3,
    pub smooth_speed: f32,
    pub smoothing: bool,
}

pub struct CameraPlugin;
impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            PostUpdate,
            follow_target.before(TransformSystem::TransformPropagate),
        );
    }
}

/// Where the camera should be this frame.
pub fn follow_position(
    current: Vec3,
    target: Vec3,
    offset: Vec3,
    smooth_speed: f32,
    smoothing: bool,
    dt: f32,
) -> Vec3 {
    let desired = target + offset;
    if smoothing {
        current.lerp(desired, (smooth_speed * dt).clamp(0.0, 1.0))
    } else {
        desired
    }
}

fn follow_target(
    time: Res<Time>,
    mut q_cam: Query<(&FollowCamera, &mut Transform)>,
    targets: Query<&Transform, Without<FollowCamera>>,
) {
    let dt = time.delta_seconds();
    for (follow, mut t) in &mut q_cam {
        let Some(target) = follow.target.and_then(|e| targets.get(e).ok()) else {
            warn_once!("follow camera has no target");
            continue;
        };
        t.translation = follow_position(
            t.translation,
            target.translation,
            follow.offset,
            follow.smooth_speed,
            follow.smoothing,
            dt,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFSET: Vec3 = Vec3::new(0.0, 7.0, 7.0);

    #[test]
    fn snaps_without_smoothing() {
        let p = follow_position(Vec3::ZERO, Vec3::new(3.0, 0.5, -2.0), OFFSET, 5.0, false, 0.016);
        assert_eq!(p, Vec3::new(3.0, 7.5, 5.0));
    }

    #[test]
    fn smoothing_moves_part_of_the_way() {
        let current = OFFSET;
        let p = follow_position(current, Vec3::new(10.0, 0.0, 0.0), OFFSET, 5.0, true, 0.1);
        assert!((p.x - 5.0).abs() < 1e-5);
        assert_eq!(p.y, 7.0);
    }

    #[test]
    fn long_frames_do_not_overshoot() {
        let p = follow_position(Vec3::ZERO, Vec3::X, OFFSET, 5.0, true, 1.0);
        assert_eq!(p, Vec3::X + OFFSET);
    }
}
