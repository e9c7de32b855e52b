//! Audio system using Web Audio API
//!
//! Procedurally generated sound effects and music - no external files needed.
//! When no audio device can be opened (native builds, blocked autoplay
//! contexts) every sound loads as [`SoundAsset::Unavailable`], which accepts
//! the same calls and does nothing.

use std::collections::HashMap;
use std::rc::Rc;

use crate::events::{EventBus, GameEvent};
use crate::settings::VolumeSettings;

use backend::{Output, Sustain};

/// Sounds the game can make
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    /// Block caught
    Coin,
    /// Cannon shot
    Cannon,
    /// Upgrade or store purchase
    Purchase,
    /// Background loop
    MainTheme,
}

impl SoundEffect {
    pub fn id(&self) -> &'static str {
        match self {
            SoundEffect::Coin => "coin",
            SoundEffect::Cannon => "cannon",
            SoundEffect::Purchase => "purchase",
            SoundEffect::MainTheme => "mainTheme",
        }
    }
}

/// A playable sound bound to an open output
#[derive(Debug)]
pub struct Voice {
    effect: SoundEffect,
    volume: f32,
    output: Rc<Output>,
    /// Output clock time the last one-shot finishes
    ends_at: f64,
    /// Running loop, if any
    sustain: Option<Sustain>,
}

impl Voice {
    fn new(effect: SoundEffect, output: Rc<Output>) -> Self {
        Self {
            effect,
            volume: 1.0,
            output,
            ends_at: 0.0,
            sustain: None,
        }
    }
}

/// A loaded sound, or an inert stand-in for one that could not be loaded
#[derive(Debug)]
pub enum SoundAsset {
    Loaded(Voice),
    Unavailable(SoundEffect),
}

impl SoundAsset {
    pub fn effect(&self) -> SoundEffect {
        match self {
            SoundAsset::Loaded(voice) => voice.effect,
            SoundAsset::Unavailable(effect) => *effect,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, SoundAsset::Loaded(_))
    }

    /// Fire once at the current volume
    pub fn play(&mut self) {
        if let SoundAsset::Loaded(voice) = self {
            if voice.volume <= 0.0 {
                return;
            }
            voice.output.resume();
            voice.ends_at = voice.output.one_shot(voice.effect, voice.volume);
        }
    }

    /// Start playing until [`SoundAsset::stop`]
    pub fn play_looped(&mut self) {
        if let SoundAsset::Loaded(voice) = self {
            if voice.sustain.is_some() {
                return;
            }
            voice.output.resume();
            voice.sustain = voice.output.sustain(voice.effect, voice.volume);
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        if let SoundAsset::Loaded(voice) = self {
            voice.volume = volume.clamp(0.0, 1.0);
            if let Some(sustain) = &voice.sustain {
                sustain.set_volume(voice.volume);
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        match self {
            SoundAsset::Loaded(voice) => {
                voice.sustain.is_some() || voice.output.now() < voice.ends_at
            }
            SoundAsset::Unavailable(_) => false,
        }
    }

    pub fn stop(&mut self) {
        if let SoundAsset::Loaded(voice) = self {
            if let Some(sustain) = voice.sustain.take() {
                sustain.stop();
            }
        }
    }
}

/// Owns every sound, the music channel and the volume preferences
#[derive(Debug)]
pub struct SoundManager {
    output: Option<Rc<Output>>,
    sounds: HashMap<SoundEffect, SoundAsset>,
    current_music: Option<SoundEffect>,
    settings: VolumeSettings,
    loading_errors: Vec<String>,
    bus: EventBus,
}

impl SoundManager {
    pub fn new(bus: EventBus) -> Self {
        let output = Output::open().map(Rc::new);
        if output.is_none() {
            log::warn!("No audio output available - sound disabled");
        }
        Self {
            output,
            sounds: HashMap::new(),
            current_music: None,
            settings: VolumeSettings::default(),
            loading_errors: Vec::new(),
            bus,
        }
    }

    /// Register a sound effect, substituting an inert asset on failure
    pub fn load_sound(&mut self, effect: SoundEffect) -> &SoundAsset {
        let asset = match &self.output {
            Some(output) => {
                log::debug!("Sound \"{}\" ready", effect.id());
                SoundAsset::Loaded(Voice::new(effect, Rc::clone(output)))
            }
            None => {
                self.loading_errors
                    .push(format!("No audio output for {}", effect.id()));
                SoundAsset::Unavailable(effect)
            }
        };
        self.sounds.entry(effect).insert_entry(asset).into_mut()
    }

    /// Register a music track
    pub fn load_music(&mut self, effect: SoundEffect) -> &SoundAsset {
        self.load_sound(effect)
    }

    pub fn asset(&self, effect: SoundEffect) -> Option<&SoundAsset> {
        self.sounds.get(&effect)
    }

    pub fn loading_errors(&self) -> &[String] {
        &self.loading_errors
    }

    pub fn settings(&self) -> &VolumeSettings {
        &self.settings
    }

    pub fn current_music(&self) -> Option<SoundEffect> {
        self.current_music
    }

    /// Play an effect at the SFX volume. Unknown sounds are ignored.
    pub fn play_sound(&mut self, effect: SoundEffect) {
        let volume = self.settings.effective_sfx();
        match self.sounds.get_mut(&effect) {
            Some(asset) => {
                asset.set_volume(volume);
                asset.play();
            }
            None => log::warn!("Sound \"{}\" not loaded", effect.id()),
        }
    }

    /// Switch the music channel to a track
    pub fn play_music(&mut self, effect: SoundEffect, looped: bool) {
        self.stop_music();
        let volume = self.settings.effective_music();
        let Some(asset) = self.sounds.get_mut(&effect) else {
            log::warn!("Music \"{}\" not loaded", effect.id());
            return;
        };
        asset.set_volume(volume);
        if looped {
            asset.play_looped();
        } else {
            asset.play();
        }
        self.current_music = Some(effect);
    }

    pub fn stop_music(&mut self) {
        if let Some(current) = self.current_music.take() {
            if let Some(asset) = self.sounds.get_mut(&current) {
                asset.stop();
            }
        }
    }

    /// Unlock the output after a user gesture
    pub fn resume(&self) {
        if let Some(output) = &self.output {
            output.resume();
        }
    }

    /// Resume output and start the theme if nothing is playing
    pub fn ensure_music(&mut self) {
        self.resume();
        let playing = self
            .current_music
            .and_then(|m| self.sounds.get(&m))
            .is_some_and(SoundAsset::is_playing);
        if !playing && self.sounds.contains_key(&SoundEffect::MainTheme) {
            self.play_music(SoundEffect::MainTheme, true);
        }
    }

    pub fn set_music_volume(&mut self, volume: f32) {
        self.settings.set_music_volume(volume);
        self.apply_volumes();
        self.publish_volume();
    }

    pub fn set_sfx_volume(&mut self, volume: f32) {
        self.settings.set_sfx_volume(volume);
        self.apply_volumes();
        self.publish_volume();
    }

    /// Flip mute; returns the new state
    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.settings.toggle_mute();
        log::info!("Audio {}", if muted { "muted" } else { "unmuted" });
        self.apply_volumes();
        self.publish_volume();
        muted
    }

    /// Adopt saved preferences without announcing them
    pub fn apply_settings(&mut self, settings: VolumeSettings) {
        self.settings = settings.sanitized();
        self.apply_volumes();
    }

    fn apply_volumes(&mut self) {
        if let Some(current) = self.current_music {
            let volume = self.settings.effective_music();
            if let Some(asset) = self.sounds.get_mut(&current) {
                asset.set_volume(volume);
            }
        }
    }

    fn publish_volume(&self) {
        self.bus.publish(GameEvent::VolumeChanged {
            music: self.settings.music_volume,
            sfx: self.settings.sfx_volume,
            is_muted: self.settings.is_muted,
        });
    }
}

#[cfg(target_arch = "wasm32")]
mod backend {
    use web_sys::{AudioContext, AudioContextState, GainNode, OscillatorNode, OscillatorType};

    use super::SoundEffect;

    #[derive(Debug)]
    pub struct Output {
        ctx: AudioContext,
    }

    /// A running looped voice
    #[derive(Debug)]
    pub struct Sustain {
        oscs: Vec<OscillatorNode>,
        gain: GainNode,
    }

    impl Sustain {
        pub fn set_volume(&self, vol: f32) {
            self.gain.gain().set_value(vol * 0.12);
        }

        pub fn stop(&self) {
            for osc in &self.oscs {
                osc.stop().ok();
            }
        }
    }

    impl Output {
        pub fn open() -> Option<Self> {
            AudioContext::new().ok().map(|ctx| Self { ctx })
        }

        /// Resume context if suspended (browsers require user gesture)
        pub fn resume(&self) {
            if self.ctx.state() == AudioContextState::Suspended {
                let _ = self.ctx.resume();
            }
        }

        pub fn now(&self) -> f64 {
            self.ctx.current_time()
        }

        /// Schedule a one-shot; returns when it ends
        pub fn one_shot(&self, effect: SoundEffect, vol: f32) -> f64 {
            match effect {
                SoundEffect::Coin => self.play_coin(vol),
                SoundEffect::Cannon => self.play_cannon(vol),
                SoundEffect::Purchase => self.play_purchase(vol),
                SoundEffect::MainTheme => self.play_theme_sting(vol),
            }
        }

        /// Start a held voice for looping playback
        pub fn sustain(&self, effect: SoundEffect, vol: f32) -> Option<Sustain> {
            let gain = self.ctx.create_gain().ok()?;
            gain.connect_with_audio_node(&self.ctx.destination()).ok()?;
            let voicing: &[(f32, OscillatorType)] = match effect {
                SoundEffect::MainTheme => &[
                    (110.0, OscillatorType::Sine),
                    (164.8, OscillatorType::Sine),
                    (220.0, OscillatorType::Triangle),
                ],
                _ => &[(440.0, OscillatorType::Sine)],
            };
            let mut oscs = Vec::with_capacity(voicing.len());
            for &(freq, kind) in voicing {
                let osc = self.ctx.create_oscillator().ok()?;
                osc.set_type(kind);
                osc.frequency().set_value(freq);
                osc.connect_with_audio_node(&gain).ok()?;
                osc.start().ok()?;
                oscs.push(osc);
            }
            let sustain = Sustain { oscs, gain };
            sustain.set_volume(vol);
            Some(sustain)
        }

        /// Create an oscillator with gain envelope
        fn create_osc(
            &self,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = self.ctx.create_oscillator().ok()?;
            let gain = self.ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&self.ctx.destination()).ok()?;

            Some((osc, gain))
        }

        /// Coin - two bright blips
        fn play_coin(&self, vol: f32) -> f64 {
            let t = self.ctx.current_time();
            for (i, freq) in [988.0, 1319.0].iter().enumerate() {
                let start = t + i as f64 * 0.07;
                if let Some((osc, gain)) = self.create_osc(*freq, OscillatorType::Square) {
                    gain.gain().set_value_at_time(vol * 0.15, start).ok();
                    gain.gain()
                        .exponential_ramp_to_value_at_time(0.01, start + 0.12)
                        .ok();
                    osc.start_with_when(start).ok();
                    osc.stop_with_when(start + 0.15).ok();
                }
            }
            t + 0.22
        }

        /// Cannon - low boom with a crack on top
        fn play_cannon(&self, vol: f32) -> f64 {
            let t = self.ctx.current_time();

            if let Some((osc, gain)) = self.create_osc(120.0, OscillatorType::Sawtooth) {
                gain.gain().set_value_at_time(vol * 0.4, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.3)
                    .ok();
                osc.frequency().set_value_at_time(120.0, t).ok();
                osc.frequency()
                    .exponential_ramp_to_value_at_time(35.0, t + 0.3)
                    .ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.35).ok();
            }

            if let Some((osc, gain)) = self.create_osc(1400.0, OscillatorType::Square) {
                gain.gain().set_value_at_time(vol * 0.12, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.06)
                    .ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.08).ok();
            }
            t + 0.35
        }

        /// Purchase - rising arpeggio
        fn play_purchase(&self, vol: f32) -> f64 {
            let t = self.ctx.current_time();
            for (i, freq) in [500.0, 630.0, 800.0].iter().enumerate() {
                let start = t + i as f64 * 0.08;
                if let Some((osc, gain)) = self.create_osc(*freq, OscillatorType::Triangle) {
                    gain.gain().set_value_at_time(vol * 0.25, start).ok();
                    gain.gain()
                        .exponential_ramp_to_value_at_time(0.01, start + 0.2)
                        .ok();
                    osc.start_with_when(start).ok();
                    osc.stop_with_when(start + 0.25).ok();
                }
            }
            t + 0.41
        }

        /// Theme played once - short chord swell
        fn play_theme_sting(&self, vol: f32) -> f64 {
            let t = self.ctx.current_time();
            for freq in [220.0, 277.2, 329.6] {
                if let Some((osc, gain)) = self.create_osc(freq, OscillatorType::Sine) {
                    gain.gain().set_value_at_time(0.01, t).ok();
                    gain.gain()
                        .linear_ramp_to_value_at_time(vol * 0.15, t + 0.3)
                        .ok();
                    gain.gain()
                        .exponential_ramp_to_value_at_time(0.01, t + 1.5)
                        .ok();
                    osc.start().ok();
                    osc.stop_with_when(t + 1.6).ok();
                }
            }
            t + 1.6
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod backend {
    use super::SoundEffect;

    /// Native builds have no audio device
    #[derive(Debug)]
    pub struct Output;

    #[derive(Debug)]
    pub struct Sustain;

    impl Sustain {
        pub fn set_volume(&self, _vol: f32) {}

        pub fn stop(&self) {}
    }

    impl Output {
        pub fn open() -> Option<Self> {
            None
        }

        pub fn resume(&self) {}

        pub fn now(&self) -> f64 {
            0.0
        }

        pub fn one_shot(&self, _effect: SoundEffect, _vol: f32) -> f64 {
            0.0
        }

        pub fn sustain(&self, _effect: SoundEffect, _vol: f32) -> Option<Sustain> {
            None
        }
    }
}
