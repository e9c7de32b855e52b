//! Per-mode transient UI state: layouts, hitboxes and drawing
//!
//! Layouts are computed on enter and on resize, and thrown away on exit.

use crate::economy::{Economy, StoreItemKey, StoreSystem, UpgradeKey};
use crate::renderer::shapes;
use crate::renderer::vertex::colors;
use crate::settings::VolumeSettings;
use crate::sim::World;
use crate::ui::{Align, Frame, Rect, TextLabel};

pub const CHANGELOG_LOADING: &str = "Loading...";
pub const CHANGELOG_FAILED: &str = "Failed to load changelog.";

const UPGRADE_COLUMNS: usize = 3;
const UPGRADE_GAP: f32 = 16.0;
const UPGRADE_BUTTON_H: f32 = 80.0;

const STORE_BOX_W: f32 = 440.0;
const STORE_BOX_H: f32 = 70.0;
const STORE_SPACING: f32 = 18.0;
const STORE_BUTTON_W: f32 = 64.0;
const STORE_BUTTON_H: f32 = 36.0;

const CHANGELOG_LINE_H: f32 = 20.0;

fn dim(frame: &mut Frame, world: &World) {
    frame.extend_vertices(shapes::rect(
        Rect::new(0.0, 0.0, world.arena.width, world.arena.height),
        colors::DIM,
    ));
}

fn panel(frame: &mut Frame, r: Rect) {
    frame.extend_vertices(shapes::rect(r, colors::PANEL));
    frame.extend_vertices(shapes::rect_outline(r, 2.0, colors::PANEL_BORDER));
}

fn button(frame: &mut Frame, r: Rect, color: [f32; 4], label: &str) {
    frame.extend_vertices(shapes::rect(r, color));
    frame.push_label(TextLabel::new(label, r.center_x(), r.center_y()).size(15.0).bold());
}

/// Title screen
pub fn render_menu(frame: &mut Frame, world: &World) {
    dim(frame, world);
    let (cx, cy) = (world.arena.width / 2.0, world.arena.height / 2.0);
    frame.push_label(TextLabel::new("Cannon Tycoon", cx, cy - 40.0).size(48.0).bold());
    frame.push_label(TextLabel::new("Press SPACE to start", cx, cy + 20.0).size(22.0));
    frame.push_label(
        TextLabel::new("S: Settings | T: Store | M: Mute", cx, cy + 60.0)
            .size(15.0)
            .color(colors::TEXT_MUTED),
    );
}

/// In-game HUD
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayingHud {
    /// Clock time the max-blocks notice was raised
    pub notice_since: Option<f64>,
}

impl PlayingHud {
    pub fn raise_notice(&mut self, clock: f64) {
        self.notice_since = Some(clock);
    }

    /// Notice opacity, or `None` once it has faded
    pub fn notice_alpha(&self, clock: f64) -> Option<f32> {
        let elapsed = clock - self.notice_since?;
        (elapsed < crate::consts::MAX_BLOCKS_NOTICE_SECS)
            .then(|| 1.0 - (elapsed / crate::consts::MAX_BLOCKS_NOTICE_SECS) as f32)
    }

    pub fn render(&self, frame: &mut Frame, world: &World, economy: &Economy, clock: f64) {
        let max = economy.settings().max_blocks().floor() as usize;
        frame.push_label(
            TextLabel::new(format!("Coins: {}", economy.coins()), 10.0, 50.0)
                .size(22.0)
                .bold()
                .align(Align::Left)
                .color(colors::TEXT_DARK),
        );
        frame.push_label(
            TextLabel::new(format!("Blocks: {}/{}", world.live_blocks(), max), 10.0, 80.0)
                .size(16.0)
                .align(Align::Left)
                .color(colors::TEXT_DARK),
        );

        if let Some(alpha) = self.notice_alpha(clock) {
            let cx = world.arena.width / 2.0;
            let mut warn = colors::TEXT_WARN;
            warn[3] = alpha;
            let mut hint = colors::TEXT_DARK;
            hint[3] = alpha;
            frame.push_label(
                TextLabel::new(format!("Maximum Blocks Reached ({max})"), cx, 100.0)
                    .size(24.0)
                    .bold()
                    .color(warn),
            );
            frame.push_label(
                TextLabel::new("Press 'U' to upgrade Max Blocks", cx, 130.0)
                    .size(16.0)
                    .color(hint),
            );
        }

        frame.push_label(
            TextLabel::new(
                "Arrows/A/D: Move | U: Upgrades | T: Store | S: Settings | M: Mute",
                world.arena.width / 2.0,
                world.arena.height - 10.0,
            )
            .size(12.0),
        );
    }
}

/// Upgrade shop grid, or the locked notice
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeScreen {
    pub panel: Rect,
    pub buttons: Vec<(UpgradeKey, Rect)>,
    pub locked: bool,
}

impl UpgradeScreen {
    pub fn layout(width: f32, height: f32, unlocked: bool) -> Self {
        if !unlocked {
            return Self {
                panel: Rect::centered_panel(width, height, 0.6, 0.3),
                buttons: Vec::new(),
                locked: true,
            };
        }

        let panel = Rect::centered_panel(width, height, 0.6, 0.6);
        let cols = UPGRADE_COLUMNS as f32;
        let btn_w = (panel.w - UPGRADE_GAP * (cols + 1.0)) / cols;
        let start_y = panel.y + 100.0;
        let buttons = UpgradeKey::ALL
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let col = (i % UPGRADE_COLUMNS) as f32;
                let row = (i / UPGRADE_COLUMNS) as f32;
                let bx = panel.x + UPGRADE_GAP + col * (btn_w + UPGRADE_GAP);
                let by = start_y + row * (UPGRADE_BUTTON_H + UPGRADE_GAP);
                (*key, Rect::new(bx, by, btn_w, UPGRADE_BUTTON_H))
            })
            .collect();

        Self {
            panel,
            buttons,
            locked: false,
        }
    }

    pub fn hit(&self, x: f32, y: f32) -> Option<UpgradeKey> {
        self.buttons
            .iter()
            .find(|(_, r)| r.contains(x, y))
            .map(|(key, _)| *key)
    }

    pub fn render(&self, frame: &mut Frame, world: &World, economy: &Economy) {
        dim(frame, world);
        panel(frame, self.panel);
        let cx = self.panel.center_x();

        if self.locked {
            frame.push_label(
                TextLabel::new("Upgrade Shop Locked", cx, self.panel.y + 45.0)
                    .size(28.0)
                    .bold(),
            );
            frame.push_label(
                TextLabel::new("Unlock it in the Store!", cx, self.panel.y + 90.0).size(18.0),
            );
            frame.push_label(
                TextLabel::new(
                    "Press 'ESC' to return to game",
                    cx,
                    self.panel.y + self.panel.h - 20.0,
                )
                .size(14.0)
                .color(colors::TEXT_MUTED),
            );
            return;
        }

        frame.push_label(TextLabel::new("Upgrade Shop", cx, self.panel.y + 35.0).size(28.0).bold());
        frame.push_label(
            TextLabel::new(format!("Coins: {}", economy.coins()), cx, self.panel.y + 68.0).size(18.0),
        );

        for (key, r) in &self.buttons {
            let upgrade = economy.upgrades().get(*key);
            let affordable = economy.can_afford(upgrade.cost());
            let fill = if affordable {
                colors::BUTTON
            } else {
                colors::BUTTON_DISABLED
            };
            frame.extend_vertices(shapes::rect(*r, fill));
            frame.extend_vertices(shapes::rect_outline(*r, 1.0, colors::PANEL_BORDER));

            let bx = r.center_x();
            let sign = if upgrade.next_value() < upgrade.value() { "-" } else { "+" };
            frame.push_label(
                TextLabel::new(format!("{} (Lv {})", upgrade.name(), upgrade.level()), bx, r.y + 10.0)
                    .size(14.0)
                    .bold(),
            );
            frame.push_label(
                TextLabel::new(
                    format!("Current: {}", upgrade.format_value(upgrade.value())),
                    bx,
                    r.y + 30.0,
                )
                .size(12.0),
            );
            frame.push_label(
                TextLabel::new(
                    format!(
                        "Next: {} ({}{})",
                        upgrade.format_value(upgrade.next_value()),
                        sign,
                        upgrade.format_value(upgrade.value_increase())
                    ),
                    bx,
                    r.y + 50.0,
                )
                .size(12.0)
                .color(if affordable { colors::TEXT_GOOD } else { colors::TEXT }),
            );
            frame.push_label(
                TextLabel::new(format!("Cost: {}", upgrade.cost()), bx, r.y + 65.0)
                    .size(12.0)
                    .color(if affordable { colors::TEXT } else { colors::TEXT_BAD }),
            );
        }

        frame.push_label(
            TextLabel::new(
                "Click an upgrade to purchase | Press 'ESC' to return to game",
                cx,
                self.panel.y + self.panel.h - 20.0,
            )
            .size(14.0)
            .color(colors::TEXT_MUTED),
        );
    }
}

/// One-time purchase list
#[derive(Debug, Clone, PartialEq)]
pub struct StoreScreen {
    pub boxes: Vec<(StoreItemKey, Rect)>,
    /// Buy buttons, only for items not yet owned
    pub buttons: Vec<(StoreItemKey, Rect)>,
    pub start_y: f32,
}

impl StoreScreen {
    pub fn layout(width: f32, height: f32, store: &StoreSystem) -> Self {
        let n = store.iter().count() as f32;
        let start_x = width / 2.0 - STORE_BOX_W / 2.0;
        let start_y = height / 2.0 - n * (STORE_BOX_H + STORE_SPACING) / 2.0;

        let mut boxes = Vec::new();
        let mut buttons = Vec::new();
        for (i, item) in store.iter().enumerate() {
            let item_y = start_y + i as f32 * (STORE_BOX_H + STORE_SPACING);
            boxes.push((item.key, Rect::new(start_x, item_y, STORE_BOX_W, STORE_BOX_H)));
            if !item.purchased {
                let btn_x = start_x + STORE_BOX_W - 48.0 - STORE_BUTTON_W;
                let btn_y = item_y + (STORE_BOX_H - STORE_BUTTON_H) / 2.0;
                buttons.push((
                    item.key,
                    Rect::new(btn_x, btn_y, STORE_BUTTON_W, STORE_BUTTON_H),
                ));
            }
        }

        Self {
            boxes,
            buttons,
            start_y,
        }
    }

    pub fn hit(&self, x: f32, y: f32) -> Option<StoreItemKey> {
        self.buttons
            .iter()
            .find(|(_, r)| r.contains(x, y))
            .map(|(key, _)| *key)
    }

    pub fn render(&self, frame: &mut Frame, world: &World, economy: &Economy) {
        dim(frame, world);
        let cx = world.arena.width / 2.0;
        frame.push_label(
            TextLabel::new("Store: One-Time Purchases", cx, self.start_y - 70.0)
                .size(28.0)
                .bold(),
        );
        frame.push_label(
            TextLabel::new(format!("Your Coins: {}", economy.coins()), cx, self.start_y - 40.0)
                .size(18.0),
        );

        for (key, r) in &self.boxes {
            let Some(item) = economy.store().get(*key) else {
                continue;
            };
            panel(frame, *r);
            frame.push_label(
                TextLabel::new(item.name, r.x + 16.0, r.y + 22.0)
                    .size(17.0)
                    .bold()
                    .align(Align::Left),
            );
            frame.push_label(
                TextLabel::new(item.description, r.x + 16.0, r.y + 48.0)
                    .size(13.0)
                    .align(Align::Left)
                    .color(colors::TEXT_MUTED),
            );

            if item.purchased {
                frame.push_label(
                    TextLabel::new("Purchased", r.x + r.w - 16.0, r.center_y())
                        .size(15.0)
                        .bold()
                        .align(Align::Right)
                        .color(colors::TEXT_GOOD),
                );
            } else if let Some((_, btn)) = self.buttons.iter().find(|(k, _)| k == key) {
                let affordable = economy.can_afford(item.cost);
                frame.push_label(
                    TextLabel::new(format!("Cost: {} coins", item.cost), btn.x - 10.0, r.center_y())
                        .size(13.0)
                        .align(Align::Right)
                        .color(if affordable { colors::TEXT } else { colors::TEXT_BAD }),
                );
                let fill = if affordable {
                    colors::BUTTON
                } else {
                    colors::BUTTON_DISABLED
                };
                button(frame, *btn, fill, "Buy");
            }
        }

        let bottom = self.boxes.last().map_or(self.start_y, |(_, r)| r.y + r.h);
        frame.push_label(
            TextLabel::new("Press 'T' or 'ESC' to return to game", cx, bottom + 30.0)
                .size(14.0)
                .color(colors::TEXT_MUTED),
        );
    }
}

/// What a click on the settings screen means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsClick {
    /// Outside the panel or on the back button
    Back,
    /// First click on reset; asks for confirmation
    ArmReset,
    ConfirmReset,
    /// Somewhere on the panel with no button
    Panel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsScreen {
    pub panel: Rect,
    pub back: Rect,
    pub reset: Rect,
    pub reset_armed: bool,
}

impl SettingsScreen {
    pub fn layout(width: f32, height: f32, reset_armed: bool) -> Self {
        let panel = Rect::centered_panel(width, height, 0.6, 0.6);
        let bx = panel.center_x() - 60.0;
        Self {
            panel,
            back: Rect::new(bx, panel.y + panel.h - 80.0, 120.0, 40.0),
            reset: Rect::new(bx, panel.y + panel.h - 130.0, 120.0, 40.0),
            reset_armed,
        }
    }

    /// Classify a click, updating the reset confirmation state
    pub fn click(&mut self, x: f32, y: f32) -> SettingsClick {
        if !self.panel.contains(x, y) || self.back.contains(x, y) {
            self.reset_armed = false;
            return SettingsClick::Back;
        }
        if self.reset.contains(x, y) {
            if self.reset_armed {
                self.reset_armed = false;
                return SettingsClick::ConfirmReset;
            }
            self.reset_armed = true;
            return SettingsClick::ArmReset;
        }
        self.reset_armed = false;
        SettingsClick::Panel
    }

    pub fn render(&self, frame: &mut Frame, world: &World, volume: &VolumeSettings) {
        dim(frame, world);
        panel(frame, self.panel);
        let cx = self.panel.center_x();
        frame.push_label(TextLabel::new("Settings", cx, self.panel.y + 40.0).size(28.0).bold());

        let percent = |v: f32| format!("{}%", (v * 100.0).round() as i32);
        frame.push_label(
            TextLabel::new(
                format!("Music: {}", percent(volume.music_volume)),
                cx,
                self.panel.y + 90.0,
            )
            .size(16.0),
        );
        frame.push_label(
            TextLabel::new(
                format!("Sound Effects: {}", percent(volume.sfx_volume)),
                cx,
                self.panel.y + 115.0,
            )
            .size(16.0),
        );
        let mute = if volume.is_muted {
            "Muted (press 'M' to unmute)"
        } else {
            "Press 'M' to mute"
        };
        frame.push_label(
            TextLabel::new(mute, cx, self.panel.y + 140.0)
                .size(14.0)
                .color(colors::TEXT_MUTED),
        );

        let reset_label = if self.reset_armed {
            "Confirm Reset"
        } else {
            "Reset Game"
        };
        button(frame, self.reset, colors::BUTTON_DANGER, reset_label);
        button(frame, self.back, colors::BUTTON, "Back to Game");
        if self.reset_armed {
            frame.push_label(
                TextLabel::new(
                    "All progress and store items will be lost!",
                    cx,
                    self.reset.y - 16.0,
                )
                .size(13.0)
                .color(colors::TEXT_BAD),
            );
        }

        frame.push_label(
            TextLabel::new(
                "Press 'ESC' to return to game",
                cx,
                self.panel.y + self.panel.h - 20.0,
            )
            .size(14.0)
            .color(colors::TEXT_MUTED),
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangelogScreen {
    pub panel: Rect,
    pub back: Rect,
    pub lines: Vec<String>,
}

impl ChangelogScreen {
    pub fn layout(width: f32, height: f32, lines: Vec<String>) -> Self {
        let panel = Rect::centered_panel(width, height, 0.6, 0.7);
        Self {
            back: Rect::new(
                panel.x + (panel.w - 100.0) / 2.0,
                panel.y + panel.h - 60.0,
                100.0,
                40.0,
            ),
            panel,
            lines,
        }
    }

    pub fn loading(width: f32, height: f32) -> Self {
        Self::layout(width, height, vec![CHANGELOG_LOADING.to_string()])
    }

    /// Lines that fit between the title and the back button
    pub fn visible_lines(&self) -> usize {
        ((self.panel.h - 140.0) / CHANGELOG_LINE_H).max(0.0) as usize
    }

    pub fn render(&self, frame: &mut Frame, world: &World) {
        dim(frame, world);
        panel(frame, self.panel);
        frame.push_label(
            TextLabel::new("Changelog", self.panel.center_x(), self.panel.y + 35.0)
                .size(26.0)
                .bold(),
        );
        for (i, line) in self.lines.iter().take(self.visible_lines()).enumerate() {
            frame.push_label(
                TextLabel::new(
                    line.as_str(),
                    self.panel.x + 24.0,
                    self.panel.y + 70.0 + i as f32 * CHANGELOG_LINE_H,
                )
                .size(14.0)
                .align(Align::Left),
            );
        }
        button(frame, self.back, colors::BUTTON, "Back");
    }
}
