use bevy::prelude::*;

use crate::config::GameSettings;

#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppState {
    #[default]
    Idle,
    Countdown,
    Playing,
    Finished,
}

/// What a single pickup collection did to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectOutcome {
    /// Collected outside of play; nothing changed.
    Ignored,
    Continue,
    LevelUp(u32),
    Finished,
}

/// Level, pickup and timer bookkeeping for one run.
#[derive(Resource, Clone, Debug)]
pub struct GameSession {
    phase: AppState,
    level: u32,
    total_levels: u32,
    remaining_in_level: u32,
    collected: u32,
    started_at: f32,
    elapsed: f32,
}

impl GameSession {
    pub fn new(total_levels: u32) -> Self {
        Self {
            phase: AppState::Idle,
            level: 1,
            total_levels: total_levels.max(1),
            remaining_in_level: 0,
            collected: 0,
            started_at: 0.0,
            elapsed: 0.0,
        }
    }

    pub fn from_settings(settings: &GameSettings) -> Self {
        Self::new(settings.total_levels)
    }

    pub fn phase(&self) -> AppState {
        self.phase
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn total_levels(&self) -> u32 {
        self.total_levels
    }

    pub fn remaining_in_level(&self) -> u32 {
        self.remaining_in_level
    }

    pub fn collected(&self) -> u32 {
        self.collected
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Idle -> Countdown. Returns false when a run or countdown is already under way.
    pub fn request_start(&mut self) -> bool {
        if self.phase != AppState::Idle {
            return false;
        }
        self.phase = AppState::Countdown;
        true
    }

    /// Countdown -> Playing, with the clock origin at `now`.
    pub fn begin_play(&mut self, now: f32) -> bool {
        if self.phase != AppState::Countdown {
            return false;
        }
        self.phase = AppState::Playing;
        self.started_at = now;
        self.elapsed = 0.0;
        true
    }

    pub fn update_clock(&mut self, now: f32) {
        if self.phase == AppState::Playing {
            self.elapsed = (now - self.started_at).max(0.0);
        }
    }

    /// Sets the number of pickups the current level needs.
    pub fn begin_wave(&mut self, spawned: u32) {
        self.remaining_in_level = spawned;
    }

    pub fn collect(&mut self) -> CollectOutcome {
        if self.phase != AppState::Playing || self.remaining_in_level == 0 {
            return CollectOutcome::Ignored;
        }
        self.collected += 1;
        self.remaining_in_level -= 1;
        if self.remaining_in_level > 0 {
            return CollectOutcome::Continue;
        }

        if self.level < self.total_levels {
            self.level += 1;
            CollectOutcome::LevelUp(self.level)
        } else {
            self.phase = AppState::Finished;
            CollectOutcome::Finished
        }
    }

    /// Back to the start screen with a fresh run.
    pub fn reset(&mut self) {
        *self = Self::new(self.total_levels);
    }
}

/// Formats seconds as `mm:ss.cc`.
pub fn format_time(seconds: f32) -> String {
    let centis = (seconds.max(0.0) * 100.0).floor() as u64;
    let minutes = centis / 6000;
    let secs = (centis / 100) % 60;
    format!("{:02}:{:02}.{:02}", minutes, secs, centis % 100)
}

/// Start screen line for a stored best time.
pub fn best_time_label(best: Option<f32>) -> String {
    match best {
        Some(t) => format!("Best Time: {}", format_time(t)),
        None => "Best Time: --:--.--".to_string(),
    }
}
