use crate::config::{load_settings, project_paths, save_settings_atomic, Paths, Settings};
use crate::input::{collect_input_nonblocking, Action, UiEvent};
use crate::model::{Cadence, Creature, RngState, Tuning};
use crate::render::{
    self, blob_hit, lerp3, stone_hit_test, Particles, Sky, StoneHit, Terminal,
};
use crate::stones::{notify_found, StoneBox};
use crate::storage::{load_creature, load_stones, save_creature, save_stones};
use crate::weather::{FetchOutcome, WeatherService};
use std::time::{Duration, Instant};

const BODY_LERP_SPEED: f32 = 0.03;
const STATUS_TTL_MS: i64 = 6_000;

pub(crate) fn run() -> anyhow::Result<()> {
    App::init()?.run()
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) struct App {
    settings: Settings,
    tuning: Tuning,
    paths: Paths,
    creature: Creature,
    stones: StoneBox,
    weather: WeatherService,
    rng: RngState,
    rt: tokio::runtime::Runtime,
    term: Terminal,
    sky: Sky,
    particles: Particles,
    // eased toward mood/stone color each frame
    body_color: [f32; 3],
    focused: bool,
    show_stats: bool,
    status: Option<(String, i64)>,
    autosave: Cadence,
    frame: u64,
    should_quit: bool,
}

impl App {
    fn init() -> anyhow::Result<Self> {
        let paths = project_paths()?;
        let settings = load_settings(&paths.settings_path);
        let tuning = Tuning::default();
        let now = now_ms();

        let mut creature = load_creature(&paths.creature_path);
        let mut status = None;
        if let Some(last_visit) = creature.last_visit_ms {
            let hours = creature.catch_up(last_visit, now, &tuning);
            if hours >= 0.1 {
                status = Some((
                    format!("you were away {hours:.1}h, need rose to {:.0}%", creature.need),
                    now,
                ));
            }
        }

        let mut stones = StoneBox::new(&tuning, now);
        let (inventory, active) = load_stones(&paths.stones_path);
        stones.inventory = inventory;
        stones.active_color = active;

        let rt = tokio::runtime::Runtime::new()?;
        let mut weather = WeatherService::new(&tuning, (settings.latitude, settings.longitude));
        weather.force_refresh(rt.handle());

        let term = Terminal::begin()?;
        let sky = Sky::new();
        let particles = Particles::new(term.cols, term.rows);

        let body_color = {
            let c = creature.mood().rgb();
            [c[0] as f32, c[1] as f32, c[2] as f32]
        };
        let rng = RngState::new(settings.seed ^ now as u64);
        let autosave = Cadence::new(tuning.autosave_ms, now);

        Ok(Self {
            settings,
            tuning,
            paths,
            creature,
            stones,
            weather,
            rng,
            rt,
            term,
            sky,
            particles,
            body_color,
            focused: true,
            show_stats: false,
            status,
            autosave,
            frame: 0,
            should_quit: false,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);
        let sim_step = Duration::from_millis(self.tuning.tick_step_ms);

        let mut last_frame = Instant::now();
        let mut sim_accum = Duration::ZERO;

        while !self.should_quit {
            if self.term.resize_if_needed()? {
                self.particles.reinit(self.term.cols, self.term.rows);
            }

            let now = now_ms();

            // weather first, so this frame already sees a finished fetch
            if let Some(FetchOutcome::Failed) = self.weather.drain(now) {
                self.set_status("weather unavailable, assuming clouds".to_string(), now);
            }
            self.weather.refresh_if_due(now, self.rt.handle());

            for ev in collect_input_nonblocking(frame_dt)? {
                self.handle_event(ev, now);
            }

            // sim fixed-step
            let frame_start = Instant::now();
            let real_dt = frame_start.saturating_duration_since(last_frame);
            last_frame = frame_start;
            sim_accum = sim_accum.saturating_add(real_dt);

            let anim_speed = if self.weather.effective_is_day() { 1.0 } else { 0.6 };
            while sim_accum >= sim_step {
                self.creature
                    .tick(self.focused, anim_speed, &self.tuning, &mut self.rng);
                sim_accum -= sim_step;
                if sim_accum > Duration::from_millis(250) {
                    sim_accum = Duration::ZERO; // drop backlog after a stall
                }
            }

            if let Some(kind) = self.stones.poll(now, &mut self.rng) {
                if self.settings.enable_notifications {
                    notify_found(kind);
                }
                self.set_status(format!("found a {}!", kind.name()), now);
                self.save_stones_soft(now);
            }

            self.render_frame();
            self.term.present()?;
            self.frame += 1;

            if self.autosave.due(now) {
                self.save_creature_soft(now);
            }

            if let Some((_, since)) = self.status {
                if now - since > STATUS_TTL_MS {
                    self.status = None;
                }
            }

            spin_sleep(frame_dt, frame_start);
        }

        let now = now_ms();
        self.save_creature_soft(now);
        self.save_stones_soft(now);
        self.term.end()?;
        save_settings_atomic(&self.paths.settings_path, &self.settings)?;
        Ok(())
    }

    fn handle_event(&mut self, ev: UiEvent, now: i64) {
        match ev {
            UiEvent::Action(Action::Quit) => self.should_quit = true,
            UiEvent::Action(Action::RefreshWeather) => {
                self.weather.force_refresh(self.rt.handle());
                self.set_status("refreshing weather...".to_string(), now);
            }
            UiEvent::Action(Action::CycleConditionOverride) => {
                self.weather.cycle_condition_override();
            }
            UiEvent::Action(Action::CycleDayOverride) => {
                self.weather.cycle_day_override();
            }
            UiEvent::Action(Action::ClearStone) => {
                self.stones.clear_active();
                self.save_stones_soft(now);
            }
            UiEvent::Action(Action::ToggleStats) => self.show_stats = !self.show_stats,
            UiEvent::Action(Action::ToggleUi) => self.settings.show_ui = !self.settings.show_ui,
            UiEvent::Click { x, y } => self.handle_click(x, y, now),
            UiEvent::FocusGained => self.focused = true,
            UiEvent::FocusLost => self.focused = false,
            UiEvent::Resized => {} // picked up at the top of the loop
        }
    }

    fn handle_click(&mut self, x: u16, y: u16, now: i64) {
        if self.show_stats {
            self.show_stats = false;
            return;
        }

        let (cols, rows) = (self.term.cols, self.term.rows);
        match stone_hit_test(
            x,
            y,
            cols,
            rows,
            self.stones.inventory.len(),
            self.stones.active_color.is_some(),
        ) {
            Some(StoneHit::Clear) => {
                self.stones.clear_active();
                self.save_stones_soft(now);
                return;
            }
            Some(StoneHit::Stone(slot)) => {
                // tray shows newest first; map back to acquisition order
                let index = self.stones.inventory.len() - 1 - slot;
                if self.stones.select(index) {
                    self.save_stones_soft(now);
                }
                return;
            }
            None => {}
        }

        if blob_hit(x, y, cols, rows) {
            self.creature.feed(&self.tuning);
            self.save_creature_soft(now);
        }
    }

    fn render_frame(&mut self) {
        self.sky.update(&self.weather);
        self.sky.draw(&mut self.term.cur);

        let condition = self.weather.effective_condition();
        let is_day = self.weather.effective_is_day();
        self.particles
            .update_and_draw(&mut self.term.cur, condition, is_day, self.frame, &mut self.rng);

        let target = self.stones.body_color(self.creature.mood().rgb());
        self.body_color = lerp3(
            self.body_color,
            [target[0] as f32, target[1] as f32, target[2] as f32],
            BODY_LERP_SPEED,
        );
        let body = [
            self.body_color[0] as u8,
            self.body_color[1] as u8,
            self.body_color[2] as u8,
        ];

        let shivering = self.creature.mood() == crate::model::Mood::Distressed
            || (self.weather.state.loaded && self.weather.state.temperature < 10.0);
        let pose = render::blob_pose(&self.creature, shivering, &mut self.rng);
        render::draw_blob(&mut self.term.cur, &self.creature, body, condition, is_day, &pose);

        render::draw_inventory(
            &mut self.term.cur,
            &self.stones.inventory,
            self.stones.active_color,
        );

        if self.settings.show_ui {
            render::ui_overlay(
                &mut self.term.cur,
                &self.creature,
                &self.weather,
                body,
                self.status.as_ref().map(|(s, _)| s.as_str()),
            );
        }

        if self.show_stats {
            let body_text = self.stats_text();
            render::draw_center_box(&mut self.term.cur, "Stats", &body_text);
        }
    }

    fn stats_text(&self) -> String {
        let last_visit = match self.creature.last_visit_ms {
            Some(ms) => {
                let hours = (now_ms() - ms).max(0) as f32 / 3_600_000.0;
                format!("{hours:.1}h ago")
            }
            None => "first visit".to_string(),
        };
        format!(
            "mood      {}\n\
             need      {:.0}%\n\
             visits    {}\n\
             times left alone  {}\n\
             last visit  {}\n\
             stones    {}\n\
             weather   {}\n\n\
             click anywhere to close",
            self.creature.mood().label(),
            self.creature.need,
            self.creature.total_visits,
            self.creature.times_left,
            last_visit,
            self.stones.inventory.len(),
            self.weather.status_line(),
        )
    }

    fn set_status(&mut self, msg: String, now: i64) {
        self.status = Some((msg, now));
    }

    // Saves are best-effort mid-session; failures surface in the status
    // line instead of tearing the toy down.
    fn save_creature_soft(&mut self, now: i64) {
        if let Err(e) = save_creature(&self.paths.creature_path, &self.creature, now) {
            self.set_status(format!("save failed: {e}"), now);
        }
    }

    fn save_stones_soft(&mut self, now: i64) {
        if let Err(e) = save_stones(
            &self.paths.stones_path,
            &self.stones.inventory,
            self.stones.active_color,
        ) {
            self.set_status(format!("save failed: {e}"), now);
        }
    }
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
