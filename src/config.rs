use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PersistError;

/// Environment variable that overrides where settings are read from.
pub const CONFIG_ENV: &str = "ROLL_COLLECT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "roll_collect.json";

/// Tuning for the whole game. Every field has a default so a settings file
/// only needs to name the values it changes.
#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    // Ball
    pub move_speed: f32,
    pub max_speed: f32,
    pub drag: f32,
    pub player_radius: f32,

    // Levels
    pub pickups_per_level: u32,
    pub total_levels: u32,
    pub pickup_trigger_radius: f32,

    // Placement
    pub arena_size: f32,
    pub spawn_margin: f32,
    pub spawn_height: f32,
    pub min_pickup_separation: f32,
    pub max_spawn_attempts: u32,
    pub seed: Option<u64>,

    // Camera
    pub camera_offset: [f32; 3],
    pub camera_smooth_speed: f32,
    pub camera_smoothing: bool,

    // Pickup visuals
    pub rotator_speed: [f32; 3],
    pub timer_refresh_frames: u32,

    pub prefs_path: String,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            move_speed: 10.0,
            max_speed: 15.0,
            drag: 2.0,
            player_radius: 0.5,
            pickups_per_level: 7,
            total_levels: 3,
            pickup_trigger_radius: 0.5,
            arena_size: 20.0,
            spawn_margin: 1.0,
            spawn_height: 1.0,
            min_pickup_separation: 1.5,
            max_spawn_attempts: 50,
            seed: None,
            camera_offset: [0.0, 7.0, 7.0],
            camera_smooth_speed: 5.0,
            camera_smoothing: true,
            rotator_speed: [15.0, 30.0, 45.0],
            timer_refresh_frames: 3,
            prefs_path: "roll_collect_prefs.json".into(),
        }
    }
}

impl GameSettings {
    /// Reads settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let text = std::fs::read_to_string(path)?;
        let settings: GameSettings = serde_json::from_str(&text)?;
        Ok(settings.sanitized())
    }

    /// Reads the settings file named by `ROLL_COLLECT_CONFIG` (or the default
    /// path). A missing file is not an error; a broken one is logged.
    pub fn load_or_default() -> Self {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let path = Path::new(&path);
        if !path.exists() {
            info!("no settings file at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => {
                info!("loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("ignoring settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Clamps values that would break the level loop or the integrator.
    pub fn sanitized(mut self) -> Self {
        if self.total_levels == 0 {
            warn!("total_levels must be at least 1");
            self.total_levels = 1;
        }
        if self.pickups_per_level == 0 {
            warn!("pickups_per_level must be at least 1");
            self.pickups_per_level = 1;
        }
        self.move_speed = self.move_speed.max(0.0);
        self.max_speed = self.max_speed.max(0.0);
        self.drag = self.drag.max(0.0);
        self.arena_size = self.arena_size.max(1.0);
        self.max_spawn_attempts = self.max_spawn_attempts.max(1);
        self.timer_refresh_frames = self.timer_refresh_frames.max(1);
        self
    }

    pub fn camera_offset(&self) -> Vec3 {
        Vec3::from_array(self.camera_offset)
    }

    pub fn rotator_speed(&self) -> Vec3 {
        Vec3::from_array(self.rotator_speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let s: GameSettings = serde_json::from_str(r#"{ "total_levels": 5, "seed": 7 }"#).unwrap();
        assert_eq!(s.total_levels, 5);
        assert_eq!(s.seed, Some(7));
        assert_eq!(s.pickups_per_level, 7);
        assert_eq!(s.max_speed, 15.0);
    }

    #[test]
    fn sanitize_rejects_empty_games() {
        let s = GameSettings {
            total_levels: 0,
            pickups_per_level: 0,
            drag: -1.0,
            ..default()
        }
        .sanitized();
        assert_eq!(s.total_levels, 1);
        assert_eq!(s.pickups_per_level, 1);
        assert_eq!(s.drag, 0.0);
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let missing = std::env::temp_dir().join("roll_collect_missing_settings.json");
        let _ = std::fs::remove_file(&missing);
        assert!(matches!(GameSettings::load(&missing), Err(PersistError::Io(_))));

        let broken = std::env::temp_dir().join("roll_collect_broken_settings.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(GameSettings::load(&broken), Err(PersistError::Json(_))));
        let _ = std::fs::remove_file(&broken);
    }
}
