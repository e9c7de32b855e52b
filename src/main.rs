//! Cannon Tycoon entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Document, HtmlCanvasElement, HtmlInputElement, KeyboardEvent, MouseEvent};

    use cannon_tycoon::consts::*;
    use cannon_tycoon::persistence::SaveManager;
    use cannon_tycoon::platform::{Debouncer, InputState, Key};
    use cannon_tycoon::renderer::RenderState;
    use cannon_tycoon::sim::{Arena, World};
    use cannon_tycoon::ui::TextLabel;
    use cannon_tycoon::{EventBus, GameContext, GameMode, ModeMachine};

    const CHANGELOG_URL: &str = "changelog.txt";
    const CHEAT_COINS: i64 = 1000;

    /// Game instance holding all state
    struct Game {
        ctx: GameContext,
        machine: ModeMachine,
        render_state: Option<RenderState>,
        accumulator: f64,
        last_time: f64,
        input: InputState,
        resize_save: Debouncer,
        /// Labels currently in the DOM overlay
        shown_labels: Vec<TextLabel>,
        sliders_shown: bool,
    }

    impl Game {
        fn new(ctx: GameContext, machine: ModeMachine) -> Self {
            Self {
                ctx,
                machine,
                render_state: None,
                accumulator: 0.0,
                last_time: 0.0,
                input: InputState::default(),
                resize_save: Debouncer::new(RESIZE_SAVE_DEBOUNCE_MS),
                shown_labels: Vec::new(),
                sliders_shown: false,
            }
        }

        /// Run simulation ticks, then flush sounds and saves
        fn update(&mut self, dt: f64) {
            self.accumulator += dt.min(0.1);

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                let input = self.input.tick_input();
                self.machine.update(&input, &mut self.ctx, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;
            }

            if self.resize_save.poll(js_sys::Date::now()) {
                self.ctx.request_save();
            }
            self.ctx.flush();
        }

        /// Render the current frame
        fn render(&mut self, document: &Document) {
            let frame = self.machine.render(&self.ctx);
            if let Some(ref mut render_state) = self.render_state {
                match render_state.render(&frame.vertices) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        render_state.resize(render_state.size.0, render_state.size.1);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory!");
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }

            if frame.labels != self.shown_labels {
                draw_labels(document, &frame.labels);
                self.shown_labels = frame.labels;
            }

            let settings_open = self.machine.current() == GameMode::Settings;
            if settings_open != self.sliders_shown {
                if let Some(el) = document.get_element_by_id("volume-controls") {
                    let _ = el.class_list().toggle_with_force("hidden", !settings_open);
                }
                if settings_open {
                    sync_sliders(document, &self.ctx);
                }
                self.sliders_shown = settings_open;
            }
        }

        fn resize(&mut self, css_w: f32, css_h: f32, device_w: u32, device_h: u32) {
            if let Some(ref mut render_state) = self.render_state {
                render_state.resize(device_w, device_h);
                render_state.set_view(css_w, css_h);
            }
            self.machine.resize(css_w, css_h, &self.ctx);
            self.resize_save.schedule(js_sys::Date::now());
        }
    }

    /// Replace the text overlay
    fn draw_labels(document: &Document, labels: &[TextLabel]) {
        let Some(overlay) = document.get_element_by_id("labels") else {
            return;
        };
        overlay.set_inner_html("");
        for label in labels {
            let Ok(el) = document.create_element("div") else {
                continue;
            };
            let style = format!(
                "left:{}px;top:{}px;transform:{};font-size:{}px;color:{};font-weight:{}",
                label.x,
                label.y,
                label.align.css_translate(),
                label.size,
                label.css_color(),
                if label.bold { "bold" } else { "normal" },
            );
            let _ = el.set_attribute("class", "label");
            let _ = el.set_attribute("style", &style);
            el.set_text_content(Some(&label.text));
            let _ = overlay.append_child(&el);
        }
    }

    fn slider(document: &Document, id: &str) -> Option<HtmlInputElement> {
        document.get_element_by_id(id)?.dyn_into().ok()
    }

    /// Move the volume sliders to the current preferences
    fn sync_sliders(document: &Document, ctx: &GameContext) {
        let volume = ctx.sound.settings();
        if let Some(input) = slider(document, "music-volume") {
            input.set_value(&((volume.music_volume * 100.0).round() as i32).to_string());
        }
        if let Some(input) = slider(document, "sfx-volume") {
            input.set_value(&((volume.sfx_volume * 100.0).round() as i32).to_string());
        }
    }

    /// Canvas size in CSS pixels and device pixels
    fn canvas_size(window: &web_sys::Window, canvas: &HtmlCanvasElement) -> (f32, f32, u32, u32) {
        let dpr = window.device_pixel_ratio();
        let client_w = canvas.client_width().max(1);
        let client_h = canvas.client_height().max(1);
        (
            client_w as f32,
            client_h as f32,
            (client_w as f64 * dpr) as u32,
            (client_h as f64 * dpr) as u32,
        )
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Cannon Tycoon starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");

        let (css_w, css_h, width, height) = canvas_size(&window, &canvas);
        canvas.set_width(width);
        canvas.set_height(height);

        // Shared context and state machine
        let bus = EventBus::new();
        let mut ctx = GameContext::new(bus.clone(), SaveManager::browser());
        ctx.load_saved();

        let seed = js_sys::Date::now() as u64;
        let world = World::new(Arena::new(css_w, css_h), seed, bus.clone());
        let machine = ModeMachine::new(world, bus, &ctx.economy);
        let game = Rc::new(RefCell::new(Game::new(ctx, machine)));
        log::info!("Game initialized with seed: {}", seed);

        // Initialize WebGPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .expect("Failed to create surface");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("Failed to get adapter");

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        match RenderState::new(surface, &adapter, width, height).await {
            Ok(mut render_state) => {
                render_state.set_view(css_w, css_h);
                game.borrow_mut().render_state = Some(render_state);
            }
            Err(err) => log::error!("Failed to create device: {}", err),
        }

        setup_input_handlers(&canvas, game.clone());
        setup_resize(canvas.clone(), game.clone());
        setup_buttons(game.clone());
        setup_sliders(game.clone());
        setup_visibility(game.clone());

        request_animation_frame(game);

        log::info!("Cannon Tycoon running!");
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        let window = web_sys::window().expect("no window");

        // Key down: held movement plus mode keys
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let Some(key) = Key::from_dom(&event.key()) else {
                    return;
                };
                if key.blocks_default() {
                    event.prevent_default();
                }
                let mut g = game.borrow_mut();
                g.input.press(key);
                if !event.repeat() {
                    let Game { machine, ctx, .. } = &mut *g;
                    machine.handle_key(key, ctx);
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Key up
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if let Some(key) = Key::from_dom(&event.key()) {
                    game.borrow_mut().input.release(key);
                }
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse click on the canvas
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                let Game { machine, ctx, .. } = &mut *g;
                machine.handle_click(event.offset_x() as f32, event.offset_y() as f32, ctx);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Window blur drops held keys
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                game.borrow_mut().input.clear();
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_resize(canvas: HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        let window = web_sys::window().expect("no window");
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let Some(window) = web_sys::window() else {
                return;
            };
            let (css_w, css_h, width, height) = canvas_size(&window, &canvas);
            canvas.set_width(width);
            canvas.set_height(height);
            game.borrow_mut().resize(css_w, css_h, width, height);
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn on_click(document: &Document, id: &str, handler: impl FnMut(MouseEvent) + 'static) {
        let Some(btn) = document.get_element_by_id(id) else {
            log::warn!("Missing #{} button", id);
            return;
        };
        let closure = Closure::<dyn FnMut(MouseEvent)>::new(handler);
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_buttons(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        {
            let game = game.clone();
            on_click(&document, "cheat-btn", move |_| {
                let mut g = game.borrow_mut();
                g.ctx.sound.ensure_music();
                g.ctx.economy.change_coins(CHEAT_COINS, false);
                log::info!("Cheat: +{} coins", CHEAT_COINS);
            });
        }

        for (id, mode) in [
            ("settings-btn", GameMode::Settings),
            ("store-btn", GameMode::Store),
            ("changelog-btn", GameMode::Changelog),
        ] {
            let game = game.clone();
            on_click(&document, id, move |_| {
                let mut g = game.borrow_mut();
                g.ctx.sound.ensure_music();
                g.machine.request(mode);
            });
        }
    }

    fn setup_sliders(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        for id in ["music-volume", "sfx-volume"] {
            let Some(input) = slider(&document, id) else {
                log::warn!("Missing #{} slider", id);
                continue;
            };
            let game = game.clone();
            let source = input.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let volume = (source.value_as_number() / 100.0) as f32;
                let mut g = game.borrow_mut();
                if id == "music-volume" {
                    g.ctx.set_music_volume(volume);
                } else {
                    g.ctx.set_sfx_volume(volume);
                }
            });
            let _ = input.add_event_listener_with_callback("input", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Save when the tab is hidden; it may never come back
    fn setup_visibility(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let doc = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if doc.visibility_state() == web_sys::VisibilityState::Hidden {
                let mut g = game.borrow_mut();
                g.input.clear();
                g.ctx.request_save();
                g.ctx.flush();
            }
        });
        let _ = document.add_event_listener_with_callback(
            "visibilitychange",
            closure.as_ref().unchecked_ref(),
        );
        closure.forget();
    }

    async fn fetch_text(url: &str) -> Result<String, String> {
        let window = web_sys::window().ok_or("no window")?;
        let response = JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(|e| format!("{:?}", e))?;
        let response: web_sys::Response = response
            .dyn_into()
            .map_err(|_| "not a response".to_string())?;
        if !response.ok() {
            return Err(format!("HTTP {}", response.status()));
        }
        let body = response.text().map_err(|e| format!("{:?}", e))?;
        JsFuture::from(body)
            .await
            .map_err(|e| format!("{:?}", e))?
            .as_string()
            .ok_or_else(|| "body is not text".to_string())
    }

    fn fetch_changelog(game: Rc<RefCell<Game>>) {
        wasm_bindgen_futures::spawn_local(async move {
            let result = fetch_text(CHANGELOG_URL).await;
            game.borrow_mut().machine.set_changelog(result);
        });
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        let wants_changelog = {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                (time - g.last_time) / 1000.0
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt);
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                g.render(&document);
            }
            g.machine.take_changelog_request()
        };

        if wants_changelog {
            fetch_changelog(game.clone());
        }
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use cannon_tycoon::consts::SIM_DT;
    use cannon_tycoon::economy::{StoreItemKey, UpgradeKey};
    use cannon_tycoon::persistence::SaveManager;
    use cannon_tycoon::platform::Key;
    use cannon_tycoon::sim::{Arena, TickInput, World};
    use cannon_tycoon::{EventBus, GameContext, ModeMachine};

    /// Steer toward the lowest block, landed ones first
    fn autopilot(world: &World) -> TickInput {
        let target = world
            .blocks
            .iter()
            .max_by(|a, b| {
                (a.landed, a.pos.y)
                    .partial_cmp(&(b.landed, b.pos.y))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|b| b.pos.x);
        let Some(x) = target else {
            return TickInput::default();
        };
        let dx = x - world.player.pos.x;
        TickInput {
            left: dx < -4.0,
            right: dx > 4.0,
        }
    }

    /// Spend coins: the shop unlock first, then the cheapest upgrade
    fn shop(ctx: &mut GameContext) {
        if !ctx.economy.settings().upgrades_unlocked() {
            ctx.economy.try_purchase_store_item(StoreItemKey::UnlockUpgrades);
            return;
        }
        let cheapest = UpgradeKey::ALL
            .into_iter()
            .min_by_key(|k| ctx.economy.upgrades().get(*k).cost());
        if let Some(key) = cheapest {
            ctx.economy.try_purchase_upgrade(key);
        }
    }

    pub fn run(seconds: f64, seed: u64) {
        let bus = EventBus::new();
        let mut ctx = GameContext::new(bus.clone(), SaveManager::browser());
        let world = World::new(Arena::new(1280.0, 720.0), seed, bus.clone());
        let mut machine = ModeMachine::new(world, bus, &ctx.economy);
        machine.handle_key(Key::Space, &mut ctx);

        let ticks = (seconds / SIM_DT) as u64;
        let (mut fired, mut caught, mut dropped, mut capped) = (0u32, 0u32, 0u32, 0u32);
        for tick in 0..ticks {
            let input = autopilot(&machine.world());
            if let Some(report) = machine.update(&input, &mut ctx, SIM_DT) {
                fired += report.fired as u32;
                caught += report.collected;
                dropped += report.despawned;
                capped += report.suppressed as u32;
            }
            if tick % 60 == 0 {
                shop(&mut ctx);
            }
            ctx.flush();
        }

        log::info!(
            "{:.0}s simulated: {} shots, {} caught, {} despawned, {} capped",
            seconds,
            fired,
            caught,
            dropped,
            capped
        );
        log::info!("Coins: {}", ctx.economy.coins());
        for upgrade in ctx.economy.upgrades().iter() {
            log::info!(
                "  {:<20} Lv {:>2}  {}  (next cost {})",
                upgrade.name(),
                upgrade.level(),
                upgrade.format_value(upgrade.value()),
                upgrade.cost()
            );
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Cannon Tycoon (native) starting...");
    log::info!("Native mode runs headless - serve the wasm build for the playable game");

    let seconds = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(600.0);
    let seed = std::env::args()
        .nth(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    headless::run(seconds, seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
