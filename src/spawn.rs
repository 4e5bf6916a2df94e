use bevy::color::LinearRgba;
use bevy::prelude::*;
use rand::Rng;

use crate::config::GameSettings;
use crate::decorators::{Bounce, Pulse};

/// Ground footprint pickups are scattered over.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct Arena {
    pub half_extent: Vec2,
    pub top_y: f32,
}

impl Arena {
    pub fn square(size: f32) -> Self {
        Self {
            half_extent: Vec2::splat(size * 0.5),
            top_y: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementRules {
    pub margin: f32,
    pub height: f32,
    pub min_separation: f32,
    pub max_attempts: u32,
}

impl From<&GameSettings> for PlacementRules {
    fn from(s: &GameSettings) -> Self {
        Self {
            margin: s.spawn_margin,
            height: s.spawn_height,
            min_separation: s.min_pickup_separation,
            max_attempts: s.max_spawn_attempts,
        }
    }
}

fn sample_axis<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if lo < hi {
        rng.gen_range(lo..hi)
    } else {
        (lo + hi) * 0.5
    }
}

/// Picks `count` spawn points. Candidates closer than `min_separation` to an
/// accepted point are resampled; after `max_attempts` the last candidate is
/// kept even if it overlaps.
pub fn place_pickups<R: Rng + ?Sized>(
    rng: &mut R,
    arena: &Arena,
    count: usize,
    rules: &PlacementRules,
) -> Vec<Vec3> {
    let min = -arena.half_extent + Vec2::splat(rules.margin);
    let max = arena.half_extent - Vec2::splat(rules.margin);
    let y = arena.top_y + rules.height;
    let min_sep_sq = rules.min_separation * rules.min_separation;

    let mut placed: Vec<Vec3> = Vec::with_capacity(count);
    for _ in 0..count {
        let mut candidate = Vec3::ZERO;
        for attempt in 1..=rules.max_attempts.max(1) {
            candidate = Vec3::new(
                sample_axis(rng, min.x, max.x),
                y,
                sample_axis(rng, min.y, max.y),
            );
            if placed
                .iter()
                .all(|p| p.distance_squared(candidate) >= min_sep_sq)
            {
                break;
            }
            if attempt == rules.max_attempts {
                debug!("placement retries exhausted, accepting overlap at {:?}", candidate);
            }
        }
        placed.push(candidate);
    }
    placed
}

/// Look and behaviour of a level's pickups and of the ball during it.
#[derive(Clone, Debug)]
pub struct LevelTheme {
    pub pickup_color: Color,
    pub emission: LinearRgba,
    pub ball_color: Color,
    pub bounce: Option<Bounce>,
    pub pulse: Option<Pulse>,
}

impl LevelTheme {
    pub fn for_level(level: u32) -> Self {
        let yellow = Color::srgb(1.0, 0.92, 0.016);
        let cyan = Color::srgb(0.0, 1.0, 1.0);
        let magenta = Color::srgb(1.0, 0.0, 1.0);
        match level {
            0 | 1 => Self {
                pickup_color: yellow,
                emission: LinearRgba::from(yellow) * 0.5,
                ball_color: Color::WHITE,
                bounce: None,
                pulse: None,
            },
            2 => Self {
                pickup_color: cyan,
                emission: LinearRgba::from(cyan) * 0.8,
                ball_color: Color::srgb(0.5, 0.8, 1.0),
                bounce: Some(Bounce::new(0.25, 2.0)),
                pulse: None,
            },
            _ => Self {
                pickup_color: magenta,
                emission: LinearRgba::from(magenta),
                ball_color: Color::srgb(1.0, 0.5, 1.0),
                bounce: Some(Bounce::new(0.2, 2.0)),
                pulse: Some(Pulse::new(0.08, 3.0)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rules() -> PlacementRules {
        PlacementRules::from(&GameSettings::default())
    }

    #[test]
    fn spawns_exactly_the_requested_count() {
        let arena = Arena::square(20.0);
        let mut rng = StdRng::seed_from_u64(1);
        for n in [0, 1, 7, 30] {
            assert_eq!(place_pickups(&mut rng, &arena, n, &rules()).len(), n);
        }
    }

    #[test]
    fn points_stay_inside_inset_footprint_at_spawn_height() {
        let arena = Arena {
            half_extent: Vec2::new(10.0, 5.0),
            top_y: 0.25,
        };
        let mut rng = StdRng::seed_from_u64(9);
        for p in place_pickups(&mut rng, &arena, 40, &rules()) {
            assert!(p.x >= -9.0 && p.x <= 9.0);
            assert!(p.z >= -4.0 && p.z <= 4.0);
            assert_eq!(p.y, 1.25);
        }
    }

    #[test]
    fn crowded_arena_still_places_everything() {
        // A 1x1 usable area can't hold 20 points 1.5 apart.
        let arena = Arena::square(3.0);
        let mut rng = StdRng::seed_from_u64(3);
        let points = place_pickups(&mut rng, &arena, 20, &rules());
        assert_eq!(points.len(), 20);
    }

    #[test]
    fn degenerate_arena_uses_the_centre() {
        let arena = Arena::square(1.0);
        let mut rng = StdRng::seed_from_u64(3);
        let points = place_pickups(&mut rng, &arena, 2, &rules());
        assert_eq!(points[0], Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn same_seed_same_layout() {
        let arena = Arena::square(20.0);
        let a = place_pickups(&mut StdRng::seed_from_u64(42), &arena, 7, &rules());
        let b = place_pickups(&mut StdRng::seed_from_u64(42), &arena, 7, &rules());
        assert_eq!(a, b);
    }

    #[test]
    fn themes_add_decorators_by_level() {
        let l1 = LevelTheme::for_level(1);
        assert!(l1.bounce.is_none() && l1.pulse.is_none());
        assert_eq!(l1.ball_color, Color::WHITE);

        let l2 = LevelTheme::for_level(2);
        assert!(l2.bounce.is_some() && l2.pulse.is_none());

        let l3 = LevelTheme::for_level(3);
        assert!(l3.bounce.is_some() && l3.pulse.is_some());
        assert!(LevelTheme::for_level(5).pulse.is_some());
    }

    proptest! {
        #[test]
        fn roomy_arenas_keep_pickups_apart(seed in any::<u64>(), count in 1usize..10) {
            let arena = Arena::square(20.0);
            let mut rng = StdRng::seed_from_u64(seed);
            let points = place_pickups(&mut rng, &arena, count, &rules());
            for (i, a) in points.iter().enumerate() {
                for b in &points[i + 1..] {
                    prop_assert!(a.distance(*b) >= 1.5 - 1e-4);
                }
            }
        }
    }
}
