//! Audio preferences
//!
//! Persisted as part of the save record (see `persistence`).

use serde::{Deserialize, Serialize};

/// Music/SFX volume and mute state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSettings {
    /// Background music volume (0.0 - 1.0)
    pub music_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Master mute toggle
    pub is_muted: bool,
    /// Volumes to restore on unmute
    pub previous_music_volume: f32,
    pub previous_sfx_volume: f32,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            music_volume: 1.0,
            sfx_volume: 1.0,
            is_muted: false,
            previous_music_volume: 1.0,
            previous_sfx_volume: 1.0,
        }
    }
}

impl VolumeSettings {
    /// Flip mute. Muting remembers the current volumes and zeroes them;
    /// unmuting restores what was remembered. Returns the new mute state.
    pub fn toggle_mute(&mut self) -> bool {
        if self.is_muted {
            self.music_volume = self.previous_music_volume;
            self.sfx_volume = self.previous_sfx_volume;
            self.is_muted = false;
        } else {
            self.previous_music_volume = self.music_volume;
            self.previous_sfx_volume = self.sfx_volume;
            self.music_volume = 0.0;
            self.sfx_volume = 0.0;
            self.is_muted = true;
        }
        self.is_muted
    }

    /// Set music volume (clamped). Raising it above zero while muted unmutes.
    pub fn set_music_volume(&mut self, vol: f32) {
        let vol = clamp_volume(vol);
        if self.is_muted && vol > 0.0 {
            self.unmute_keeping_previous();
        }
        self.music_volume = vol;
    }

    /// Set SFX volume (clamped). Raising it above zero while muted unmutes.
    pub fn set_sfx_volume(&mut self, vol: f32) {
        let vol = clamp_volume(vol);
        if self.is_muted && vol > 0.0 {
            self.unmute_keeping_previous();
        }
        self.sfx_volume = vol;
    }

    /// Volume to apply to music right now
    pub fn effective_music(&self) -> f32 {
        if self.is_muted { 0.0 } else { self.music_volume }
    }

    /// Volume to apply to effects right now
    pub fn effective_sfx(&self) -> f32 {
        if self.is_muted { 0.0 } else { self.sfx_volume }
    }

    /// Replace any out-of-range or non-finite values with defaults
    pub fn sanitized(self) -> Self {
        let fix = |v: f32, fallback: f32| if v.is_finite() { clamp_volume(v) } else { fallback };
        Self {
            music_volume: fix(self.music_volume, 1.0),
            sfx_volume: fix(self.sfx_volume, 1.0),
            is_muted: self.is_muted,
            previous_music_volume: fix(self.previous_music_volume, 1.0),
            previous_sfx_volume: fix(self.previous_sfx_volume, 1.0),
        }
    }

    fn unmute_keeping_previous(&mut self) {
        self.music_volume = self.previous_music_volume;
        self.sfx_volume = self.previous_sfx_volume;
        self.is_muted = false;
    }
}

fn clamp_volume(vol: f32) -> f32 {
    if vol.is_nan() { 0.0 } else { vol.clamp(0.0, 1.0) }
}
