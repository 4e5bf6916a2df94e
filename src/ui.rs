use bevy::prelude::*;
use bevy_egui::{
    egui::{self, Align2, Color32, FontId, RichText},
    EguiContexts, EguiPlugin,
};

use crate::config::GameSettings;
use crate::game::{GameWon, LevelUp, ResetEvent};
use crate::prefs::{best_time, FinishRecord, Prefs};
use crate::session::{best_time_label, format_time, AppState, GameSession};
use crate::tween::{CountdownSequence, LevelBanner, TextPulse};

const HUD_FONT: f32 = 24.0;
const COUNTDOWN_FONT: f32 = 120.0;
const BANNER_FONT: f32 = 80.0;

/// Transient HUD state: running animations and the last finish.
#[derive(Resource, Default)]
pub struct HudState {
    pub timer_label: String,
    pub level_pulse: Option<TextPulse>,
    pub banner: Option<LevelBanner>,
    pub finish: Option<FinishRecord>,
}

pub struct UiPlugin;
impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin)
            .init_resource::<HudState>()
            .add_systems(OnEnter(AppState::Idle), reset_hud)
            .add_systems(
                Update,
                (track_game_events, animate_hud, refresh_timer_label).chain(),
            )
            .add_systems(
                Update,
                start_screen_ui.run_if(in_state(AppState::Idle).or_else(in_state(AppState::Countdown))),
            )
            .add_systems(Update, countdown_ui.run_if(in_state(AppState::Countdown)))
            .add_systems(
                Update,
                hud_ui.run_if(in_state(AppState::Playing).or_else(in_state(AppState::Finished))),
            )
            .add_systems(Update, win_panel_ui.run_if(in_state(AppState::Finished)));
    }
}

fn with_alpha(color: Color32, alpha: f32) -> Color32 {
    let a = (alpha.clamp(0.0, 1.0) * 255.0) as u8;
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), a)
}

fn reset_hud(mut hud: ResMut<HudState>) {
    *hud = HudState::default();
}

fn track_game_events(
    mut hud: ResMut<HudState>,
    mut ev_level: EventReader<LevelUp>,
    mut ev_won: EventReader<GameWon>,
) {
    for ev in ev_level.read() {
        hud.banner = Some(LevelBanner::new(ev.level));
        hud.level_pulse = Some(TextPulse::default());
    }
    for GameWon(record) in ev_won.read() {
        hud.finish = Some(*record);
    }
}

fn animate_hud(time: Res<Time>, mut hud: ResMut<HudState>) {
    let dt = time.delta_seconds();
    if let Some(banner) = hud.banner.as_mut() {
        if banner.tick(dt) {
            hud.banner = None;
        }
    }
    if let Some(pulse) = hud.level_pulse.as_mut() {
        if pulse.tick(dt) {
            hud.level_pulse = None;
        }
    }
}

fn refresh_timer_label(
    settings: Option<Res<GameSettings>>,
    session: Option<Res<GameSession>>,
    mut hud: ResMut<HudState>,
    mut frame: Local<u32>,
) {
    let Some(session) = session else {
        return;
    };
    let every = settings.map_or(1, |s| s.timer_refresh_frames.max(1));
    *frame = frame.wrapping_add(1);
    // The final time is always shown exactly.
    if *frame % every == 0 || session.phase() == AppState::Finished || hud.timer_label.is_empty() {
        hud.timer_label = format!("Time: {}", format_time(session.elapsed()));
    }
}

fn start_screen_ui(
    mut contexts: EguiContexts,
    prefs: Option<Res<Prefs>>,
    countdown: Option<Res<CountdownSequence>>,
) {
    let Some(ctx) = contexts.try_ctx_mut() else {
        return;
    };
    let alpha = countdown.map_or(1.0, |c| c.start_screen_alpha());
    if alpha <= 0.0 {
        return;
    }
    let best = prefs.and_then(|p| best_time(p.0.as_ref()));

    egui::Area::new("start_screen".into())
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.label(
                    RichText::new("ROLL & COLLECT")
                        .font(FontId::proportional(64.0))
                        .color(with_alpha(Color32::WHITE, alpha)),
                );
                ui.label(
                    RichText::new("Press any key to start")
                        .font(FontId::proportional(28.0))
                        .color(with_alpha(Color32::LIGHT_GRAY, alpha)),
                );
                ui.label(
                    RichText::new(best_time_label(best))
                        .font(FontId::proportional(HUD_FONT))
                        .color(with_alpha(Color32::YELLOW, alpha)),
                );
            });
        });
}

fn countdown_ui(mut contexts: EguiContexts, countdown: Option<Res<CountdownSequence>>) {
    let Some(countdown) = countdown else {
        return;
    };
    let Some((label, scale)) = countdown.label() else {
        return;
    };
    let Some(ctx) = contexts.try_ctx_mut() else {
        return;
    };
    let color = if countdown.is_go() {
        Color32::GREEN
    } else {
        Color32::YELLOW
    };

    egui::Area::new("countdown".into())
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label(
                RichText::new(label)
                    .font(FontId::proportional(COUNTDOWN_FONT * scale))
                    .strong()
                    .color(color),
            );
        });
}

fn hud_ui(mut contexts: EguiContexts, session: Option<Res<GameSession>>, hud: Res<HudState>) {
    let Some(session) = session else {
        return;
    };
    let Some(ctx) = contexts.try_ctx_mut() else {
        return;
    };

    egui::Area::new("hud".into())
        .anchor(Align2::LEFT_TOP, egui::vec2(16.0, 16.0))
        .show(ctx, |ui| {
            ui.label(
                RichText::new(format!("Pickups: {}", session.collected()))
                    .font(FontId::proportional(HUD_FONT))
                    .color(Color32::WHITE),
            );
            ui.label(
                RichText::new(&hud.timer_label)
                    .font(FontId::proportional(HUD_FONT))
                    .color(Color32::WHITE),
            );
            let pulse = hud.level_pulse.map_or(1.0, |p| p.scale());
            ui.label(
                RichText::new(format!("Level: {}", session.level()))
                    .font(FontId::proportional(HUD_FONT * pulse))
                    .color(Color32::WHITE),
            );
        });

    if let Some(banner) = &hud.banner {
        let size = BANNER_FONT * banner.scale();
        if size > 1.0 {
            egui::Area::new("level_banner".into())
                .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label(
                        RichText::new(banner.text())
                            .font(FontId::proportional(size))
                            .strong()
                            .color(with_alpha(Color32::YELLOW, banner.alpha())),
                    );
                });
        }
    }
}

fn win_panel_ui(mut contexts: EguiContexts, hud: Res<HudState>, mut ev_reset: EventWriter<ResetEvent>) {
    let Some(record) = hud.finish else {
        return;
    };
    let Some(ctx) = contexts.try_ctx_mut() else {
        return;
    };

    egui::Window::new("You Win!")
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            let (text, color) = final_time_text(&record);
            ui.label(
                RichText::new(text)
                    .font(FontId::proportional(32.0))
                    .color(color),
            );
            ui.label(
                RichText::new(format!("Best Time: {}", format_time(record.best)))
                    .font(FontId::proportional(HUD_FONT)),
            );
            ui.separator();
            if ui.button("Play Again").clicked() {
                ev_reset.send(ResetEvent);
            }
        });
}

fn final_time_text(record: &FinishRecord) -> (String, Color32) {
    let time = format_time(record.elapsed);
    if record.new_record {
        (format!("NEW RECORD!\nTime: {}", time), Color32::YELLOW)
    } else {
        (format!("Your Time: {}", time), Color32::WHITE)
    }
}
