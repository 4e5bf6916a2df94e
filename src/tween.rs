//! Frame-driven animations. Each one is advanced with `tick(dt)` from a
//! system and reports its current value; dropping it cancels it.

use bevy::prelude::*;

/// Linear interpolation of a scalar over a fixed duration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween {
    pub from: f32,
    pub to: f32,
    pub duration: f32,
    elapsed: f32,
}

impl Tween {
    pub fn new(from: f32, to: f32, duration: f32) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: 0.0,
        }
    }

    pub fn tick(&mut self, dt: f32) -> f32 {
        self.elapsed += dt;
        self.value()
    }

    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    pub fn value(&self) -> f32 {
        self.from + (self.to - self.from) * self.progress()
    }

    pub fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

pub const START_FADE_SECS: f32 = 0.5;
pub const COUNTDOWN_SHRINK_SECS: f32 = 0.7;
pub const COUNTDOWN_HOLD_SECS: f32 = 0.3;
pub const COUNTDOWN_LABELS: [&str; 4] = ["3", "2", "1", "GO!"];

#[derive(Clone, Copy, Debug, PartialEq)]
enum CountdownStage {
    FadeStartScreen(Tween),
    Shrink { index: usize, scale: Tween },
    Hold { index: usize, left: f32 },
    Done,
}

/// Start screen fade followed by "3", "2", "1", "GO!".
#[derive(Resource, Clone, Debug)]
pub struct CountdownSequence {
    stage: CountdownStage,
}

impl CountdownSequence {
    /// `fade_start_screen` is false when there is no start screen to fade.
    pub fn new(fade_start_screen: bool) -> Self {
        let stage = if fade_start_screen {
            CountdownStage::FadeStartScreen(Tween::new(1.0, 0.0, START_FADE_SECS))
        } else {
            Self::shrink(0)
        };
        Self { stage }
    }

    fn shrink(index: usize) -> CountdownStage {
        CountdownStage::Shrink {
            index,
            scale: Tween::new(2.0, 1.0, COUNTDOWN_SHRINK_SECS),
        }
    }

    /// Advances the sequence. Returns true once the last label has been held.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.stage = match self.stage {
            CountdownStage::FadeStartScreen(mut fade) => {
                fade.tick(dt);
                if fade.finished() {
                    Self::shrink(0)
                } else {
                    CountdownStage::FadeStartScreen(fade)
                }
            }
            CountdownStage::Shrink { index, mut scale } => {
                scale.tick(dt);
                if scale.finished() {
                    CountdownStage::Hold {
                        index,
                        left: COUNTDOWN_HOLD_SECS,
                    }
                } else {
                    CountdownStage::Shrink { index, scale }
                }
            }
            CountdownStage::Hold { index, left } => {
                let left = left - dt;
                if left > 0.0 {
                    CountdownStage::Hold { index, left }
                } else if index + 1 < COUNTDOWN_LABELS.len() {
                    Self::shrink(index + 1)
                } else {
                    CountdownStage::Done
                }
            }
            CountdownStage::Done => CountdownStage::Done,
        };
        self.is_done()
    }

    pub fn is_done(&self) -> bool {
        self.stage == CountdownStage::Done
    }

    /// Opacity of the start screen while it fades; zero once the labels start.
    pub fn start_screen_alpha(&self) -> f32 {
        match self.stage {
            CountdownStage::FadeStartScreen(fade) => fade.value(),
            _ => 0.0,
        }
    }

    /// The label on screen and its scale, if one is showing.
    pub fn label(&self) -> Option<(&'static str, f32)> {
        match self.stage {
            CountdownStage::Shrink { index, scale } => Some((COUNTDOWN_LABELS[index], scale.value())),
            CountdownStage::Hold { index, .. } => Some((COUNTDOWN_LABELS[index], 1.0)),
            _ => None,
        }
    }

    /// "GO!" is drawn differently from the digits.
    pub fn is_go(&self) -> bool {
        matches!(self.label(), Some((label, _)) if label == COUNTDOWN_LABELS[3])
    }
}

pub const LEVEL_BANNER_SECS: f32 = 1.5;

/// "LEVEL N!" grows from nothing while fading out.
#[derive(Clone, Debug)]
pub struct LevelBanner {
    pub level: u32,
    anim: Tween,
}

impl LevelBanner {
    pub fn new(level: u32) -> Self {
        Self {
            level,
            anim: Tween::new(0.0, 1.0, LEVEL_BANNER_SECS),
        }
    }

    pub fn tick(&mut self, dt: f32) -> bool {
        self.anim.tick(dt);
        self.anim.finished()
    }

    pub fn text(&self) -> String {
        format!("LEVEL {}!", self.level)
    }

    pub fn scale(&self) -> f32 {
        self.anim.progress() * 1.5
    }

    pub fn alpha(&self) -> f32 {
        1.0 - self.anim.progress()
    }
}

pub const TEXT_PULSE_HALF_SECS: f32 = 0.3;

/// Scale 1 -> 1.5 -> 1, used on the level label when it changes.
#[derive(Clone, Copy, Debug)]
pub struct TextPulse {
    grow: Tween,
    shrink: Tween,
}

impl Default for TextPulse {
    fn default() -> Self {
        Self {
            grow: Tween::new(1.0, 1.5, TEXT_PULSE_HALF_SECS),
            shrink: Tween::new(1.5, 1.0, TEXT_PULSE_HALF_SECS),
        }
    }
}

impl TextPulse {
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.grow.finished() {
            self.grow.tick(dt);
        } else {
            self.shrink.tick(dt);
        }
        self.shrink.finished()
    }

    pub fn scale(&self) -> f32 {
        if self.grow.finished() {
            self.shrink.value()
        } else {
            self.grow.value()
        }
    }
}

pub const SPAWN_POP_SECS: f32 = 0.3;

/// Scales a freshly spawned entity up from zero to its original scale.
#[derive(Component, Clone, Debug)]
pub struct SpawnPop {
    pub target_scale: Vec3,
    anim: Tween,
}

impl SpawnPop {
    pub fn new(target_scale: Vec3) -> Self {
        Self {
            target_scale,
            anim: Tween::new(0.0, 1.0, SPAWN_POP_SECS),
        }
    }

    /// Returns the scale to apply and whether the pop is over.
    pub fn tick(&mut self, dt: f32) -> (Vec3, bool) {
        let k = self.anim.tick(dt);
        if self.anim.finished() {
            (self.target_scale, true)
        } else {
            (self.target_scale * k, false)
        }
    }
}

/// Removes `SpawnPop` once the entity has reached full size.
pub fn run_spawn_pops(
    mut commands: Commands,
    time: Res<Time>,
    mut q: Query<(Entity, &mut SpawnPop, &mut Transform)>,
) {
    let dt = time.delta_seconds();
    for (e, mut pop, mut t) in &mut q {
        let (scale, done) = pop.tick(dt);
        t.scale = scale;
        if done {
            commands.entity(e).remove::<SpawnPop>();
        }
    }
}
