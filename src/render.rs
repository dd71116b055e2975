use crate::model::{Condition, Creature, Mood, RngState, Stone};
use crate::weather::WeatherService;
use crossterm::{
    cursor,
    event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use rand::Rng;
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }

    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub(crate) fn set(&mut self, x: i32, y: i32, c: Cell) {
        if x >= 0 && y >= 0 && (x as u16) < self.w && (y as u16) < self.h {
            let i = self.idx(x as u16, y as u16);
            self.cells[i] = c;
        }
    }

    pub(crate) fn set_bg(&mut self, x: i32, y: i32, bg: [u8; 3]) {
        if x >= 0 && y >= 0 && (x as u16) < self.w && (y as u16) < self.h {
            let i = self.idx(x as u16, y as u16);
            self.cells[i].bg = rgb(bg);
            self.cells[i].ch = ' ';
        }
    }

    fn bg_at(&self, x: i32, y: i32) -> Color {
        if x >= 0 && y >= 0 && (x as u16) < self.w && (y as u16) < self.h {
            self.cells[self.idx(x as u16, y as u16)].bg
        } else {
            Color::Black
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            EnableMouseCapture,
            EnableFocusChange,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            DisableMouseCapture,
            DisableFocusChange,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        Ok(true)
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

fn rgb(c: [u8; 3]) -> Color {
    Color::Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
    }
}

pub(crate) fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

fn as_u8(c: [f32; 3]) -> [u8; 3] {
    [
        c[0].clamp(0.0, 255.0) as u8,
        c[1].clamp(0.0, 255.0) as u8,
        c[2].clamp(0.0, 255.0) as u8,
    ]
}

fn as_f32(c: [u8; 3]) -> [f32; 3] {
    [c[0] as f32, c[1] as f32, c[2] as f32]
}

/* -----------------------------
   Sky gradient
------------------------------ */

const SKY_LERP_SPEED: f32 = 0.015;

pub(crate) struct Sky {
    top: [f32; 3],
    bottom: [f32; 3],
}

impl Sky {
    pub(crate) fn new() -> Self {
        let (top, bottom) = sky_palette(None);
        Self {
            top: as_f32(top),
            bottom: as_f32(bottom),
        }
    }

    /// Eases toward the palette for the effective conditions. Until the
    /// first load (and with no override) the dusk default stays put.
    pub(crate) fn update(&mut self, weather: &WeatherService) {
        let key = if weather.state.loaded
            || weather.overrides.condition.is_some()
            || weather.overrides.is_day.is_some()
        {
            Some((weather.effective_condition(), weather.effective_is_day()))
        } else {
            None
        };
        let (top, bottom) = sky_palette(key);
        self.top = lerp3(self.top, as_f32(top), SKY_LERP_SPEED);
        self.bottom = lerp3(self.bottom, as_f32(bottom), SKY_LERP_SPEED);
    }

    pub(crate) fn draw(&self, buf: &mut CellBuffer) {
        let rows = buf.h.max(1) as f32;
        for y in 0..buf.h {
            let t = y as f32 / rows;
            let c = as_u8(lerp3(self.top, self.bottom, t));
            for x in 0..buf.w {
                buf.set_bg(x as i32, y as i32, c);
            }
        }
    }
}

fn sky_palette(key: Option<(Condition, bool)>) -> ([u8; 3], [u8; 3]) {
    match key {
        None | Some((Condition::Unknown, _)) => ([26, 26, 46], [40, 35, 50]),
        Some((_, false)) => ([10, 10, 30], [20, 15, 40]),
        Some((Condition::Sunny, true)) => ([100, 160, 220], [160, 200, 240]),
        Some((Condition::Cloudy, true)) => ([120, 130, 150], [150, 160, 175]),
        Some((Condition::Rainy, true)) => ([60, 70, 90], [80, 90, 110]),
        Some((Condition::Stormy, true)) => ([30, 35, 50], [50, 45, 65]),
        Some((Condition::Snowy, true)) => ([170, 180, 200], [200, 210, 225]),
    }
}

/* -----------------------------
   Weather particle fields
------------------------------ */

struct Raindrop {
    x: f32,
    y: f32,
    speed: f32,
}

struct Snowflake {
    x: f32,
    y: f32,
    speed: f32,
    wobble: f32,
    wobble_speed: f32,
}

struct Star {
    x: i32,
    y: i32,
    twinkle_speed: f32,
    twinkle_offset: f32,
}

struct Cloud {
    x: f32,
    y: i32,
    size: i32,
    speed: f32,
    brightness: u8,
}

pub(crate) struct Particles {
    rain: Vec<Raindrop>,
    snow: Vec<Snowflake>,
    stars: Vec<Star>,
    clouds: Vec<Cloud>,
    cols: i32,
    rows: i32,
}

impl Particles {
    pub(crate) fn new(cols: u16, rows: u16) -> Self {
        let mut p = Self {
            rain: Vec::new(),
            snow: Vec::new(),
            stars: Vec::new(),
            clouds: Vec::new(),
            cols: 0,
            rows: 0,
        };
        p.reinit(cols, rows);
        p
    }

    /// Rebuilds every field for the new size; called unconditionally on
    /// resize rather than probing which fields exist.
    pub(crate) fn reinit(&mut self, cols: u16, rows: u16) {
        let (w, h) = (cols as i32, rows as i32);
        self.cols = w;
        self.rows = h;
        let mut rng = rand::thread_rng();

        self.rain = (0..(w * h / 30).clamp(20, 150))
            .map(|_| Raindrop {
                x: rng.gen_range(0.0..w.max(1) as f32),
                y: rng.gen_range(-(h.max(1) as f32)..h.max(1) as f32),
                speed: rng.gen_range(0.8..1.6),
            })
            .collect();

        self.snow = (0..(w * h / 45).clamp(15, 100))
            .map(|_| Snowflake {
                x: rng.gen_range(0.0..w.max(1) as f32),
                y: rng.gen_range(-4.0..h.max(1) as f32),
                speed: rng.gen_range(0.1..0.35),
                wobble: rng.gen_range(0.0..std::f32::consts::TAU),
                wobble_speed: rng.gen_range(0.02..0.05),
            })
            .collect();

        self.stars = (0..(w * h / 25).clamp(30, 150))
            .map(|_| Star {
                x: rng.gen_range(0..w.max(1)),
                y: rng.gen_range(0..((h * 7 / 10).max(1))),
                twinkle_speed: rng.gen_range(0.02..0.08),
                twinkle_offset: rng.gen_range(0.0..std::f32::consts::TAU),
            })
            .collect();

        self.clouds = (0..(w / 14).clamp(3, 8))
            .map(|_| Cloud {
                x: rng.gen_range(0.0..w.max(1) as f32),
                y: rng.gen_range(1..(h * 2 / 5).max(2)),
                size: rng.gen_range(6..16),
                speed: rng.gen_range(0.03..0.1),
                brightness: rng.gen_range(170..220),
            })
            .collect();
    }

    pub(crate) fn update_and_draw(
        &mut self,
        buf: &mut CellBuffer,
        condition: Condition,
        is_day: bool,
        frame: u64,
        rng: &mut RngState,
    ) {
        if !is_day {
            self.draw_stars(buf, frame);
        }

        if matches!(
            condition,
            Condition::Cloudy | Condition::Rainy | Condition::Stormy
        ) {
            self.draw_clouds(buf);
        }

        if condition == Condition::Sunny && is_day {
            draw_sun_glow(buf);
        }

        if matches!(condition, Condition::Rainy | Condition::Stormy) {
            self.draw_rain(buf);
        }

        if condition == Condition::Snowy {
            self.draw_snow(buf);
        }

        if condition == Condition::Stormy && rng.roll(0.003) {
            draw_lightning(buf, rng);
        }
    }

    fn draw_stars(&self, buf: &mut CellBuffer, frame: u64) {
        for star in &self.stars {
            let twinkle = (frame as f32 * star.twinkle_speed + star.twinkle_offset).sin();
            let ch = if twinkle > 0.3 { '✦' } else { '·' };
            let v = (150.0 + twinkle * 100.0).clamp(80.0, 255.0) as u8;
            let bg = buf.bg_at(star.x, star.y);
            buf.set(
                star.x,
                star.y,
                Cell {
                    ch,
                    fg: rgb([v, v, v]),
                    bg,
                },
            );
        }
    }

    fn draw_clouds(&mut self, buf: &mut CellBuffer) {
        for cloud in &mut self.clouds {
            cloud.x += cloud.speed;
            if cloud.x > (self.cols + cloud.size) as f32 {
                cloud.x = -(cloud.size as f32);
            }

            let b = cloud.brightness;
            let cx = cloud.x as i32;
            for dx in 0..cloud.size {
                let fade = 1.0 - ((dx as f32 / cloud.size as f32) - 0.5).abs();
                let half = (fade * 1.8) as i32;
                for dy in -half..=half {
                    buf.set_bg(cx + dx, cloud.y + dy, [b, b, b.saturating_add(8)]);
                }
            }
        }
    }

    fn draw_rain(&mut self, buf: &mut CellBuffer) {
        for drop in &mut self.rain {
            let bg = buf.bg_at(drop.x as i32, drop.y as i32);
            buf.set(
                drop.x as i32,
                drop.y as i32,
                Cell {
                    ch: '╱',
                    fg: rgb([150, 180, 210]),
                    bg,
                },
            );

            drop.y += drop.speed;
            drop.x += 0.15; // wind drift

            if drop.y >= self.rows as f32 {
                drop.y = -1.0;
                drop.x = (drop.x as i32 % self.cols.max(1)) as f32;
            }
        }
    }

    fn draw_snow(&mut self, buf: &mut CellBuffer) {
        for flake in &mut self.snow {
            flake.wobble += flake.wobble_speed;
            let wobble_x = flake.wobble.sin() * 1.2;

            let bg = buf.bg_at((flake.x + wobble_x) as i32, flake.y as i32);
            buf.set(
                (flake.x + wobble_x) as i32,
                flake.y as i32,
                Cell {
                    ch: '❄',
                    fg: rgb([245, 245, 255]),
                    bg,
                },
            );

            flake.y += flake.speed;
            flake.x += wobble_x * 0.05;

            if flake.y >= self.rows as f32 {
                flake.y = -1.0;
                flake.x = (flake.x as i32 % self.cols.max(1)).abs() as f32;
            }
        }
    }
}

fn draw_sun_glow(buf: &mut CellBuffer) {
    let sx = (buf.w as i32 * 85) / 100;
    let sy = (buf.h as i32 * 15) / 100;

    for dy in -3..=3 {
        for dx in -7..=7 {
            let d = ((dx * dx) as f32 / 49.0 + (dy * dy) as f32 / 9.0).sqrt();
            if d > 1.0 {
                continue;
            }
            let core = d < 0.45;
            let c: [u8; 3] = if core {
                [255, 250, 220]
            } else {
                [255, 240, 180]
            };
            if core {
                buf.set_bg(sx + dx, sy + dy, c);
            } else if d < 0.8 {
                buf.set(
                    sx + dx,
                    sy + dy,
                    Cell {
                        ch: '░',
                        fg: rgb(c),
                        bg: buf.bg_at(sx + dx, sy + dy),
                    },
                );
            }
        }
    }
}

fn draw_lightning(buf: &mut CellBuffer, rng: &mut RngState) {
    // Flash: brighten the whole sky for one frame.
    for cell in buf.cells.iter_mut() {
        if let Color::Rgb { r, g, b } = cell.bg {
            cell.bg = Color::Rgb {
                r: r.saturating_add(90),
                g: g.saturating_add(90),
                b: b.saturating_add(90),
            };
        }
    }

    let mut x = rng.range_i32(buf.w as i32 / 5, buf.w as i32 * 4 / 5);
    let mut y = 0;
    while y < buf.h as i32 {
        buf.set(
            x,
            y,
            Cell {
                ch: '█',
                fg: rgb([255, 255, 255]),
                bg: buf.bg_at(x, y),
            },
        );
        y += 1;
        x += rng.range_i32(-2, 3);
    }
}

/* -----------------------------
   Blob geometry (shared with hit testing)
------------------------------ */

pub(crate) fn blob_center(cols: u16, rows: u16) -> (i32, i32) {
    (cols as i32 / 2, rows as i32 / 2)
}

/// Cell radii; x is doubled for the ~2:1 cell aspect, body slightly wider
/// than tall like the original ellipse.
pub(crate) fn blob_radii(cols: u16, rows: u16) -> (i32, i32) {
    let ry = ((rows as i32) / 4).min((cols as i32) / 5).max(3);
    let rx = ry * 2;
    (rx, ry)
}

pub(crate) fn blob_hit(x: u16, y: u16, cols: u16, rows: u16) -> bool {
    let (cx, cy) = blob_center(cols, rows);
    let (rx, ry) = blob_radii(cols, rows);
    // generous radius, like feeding on a click anywhere near the creature
    let (rx, ry) = ((rx * 2) as f32, (ry * 2) as f32);
    let dx = x as i32 - cx;
    let dy = y as i32 - cy;
    (dx as f32 / rx).powi(2) + (dy as f32 / ry).powi(2) <= 1.0
}

pub(crate) struct BlobPose {
    pub(crate) offset: (i32, i32),
    pub(crate) scale: f32,
}

pub(crate) fn blob_pose(
    creature: &Creature,
    shivering: bool,
    rng: &mut RngState,
) -> BlobPose {
    let mut offset = (0, (creature.bob.sin() * 1.5) as i32);
    if shivering {
        offset.0 += rng.range_i32(-1, 2);
    }

    let mut scale = 1.0 + creature.breathe.sin() * 0.03;
    if creature.just_returned {
        scale += (creature.return_timer as f32 * 0.5).sin() * 0.1;
    }
    BlobPose { offset, scale }
}

pub(crate) fn draw_blob(
    buf: &mut CellBuffer,
    creature: &Creature,
    body: [u8; 3],
    condition: Condition,
    is_day: bool,
    pose: &BlobPose,
) {
    let (cx, cy) = blob_center(buf.w, buf.h);
    let cx = cx + pose.offset.0;
    let cy = cy + pose.offset.1;
    let (rx, ry) = blob_radii(buf.w, buf.h);
    let rx = ((rx as f32) * pose.scale).round() as i32;
    let ry = ((ry as f32) * pose.scale).round().max(2.0) as i32;

    // Warm halo behind the body when the sun is out.
    if condition == Condition::Sunny && is_day {
        for dy in -(ry + 1)..=(ry + 1) {
            for dx in -(rx + 2)..=(rx + 2) {
                let d = (dx as f32 / (rx + 2) as f32).powi(2)
                    + (dy as f32 / (ry + 1) as f32).powi(2);
                if d <= 1.0 && d > 0.72 {
                    buf.set(
                        cx + dx,
                        cy + dy,
                        Cell {
                            ch: '░',
                            fg: rgb([255, 220, 150]),
                            bg: buf.bg_at(cx + dx, cy + dy),
                        },
                    );
                }
            }
        }
    }

    // Body
    for dy in -ry..=ry {
        for dx in -rx..=rx {
            let d = (dx as f32 / rx as f32).powi(2) + (dy as f32 / ry as f32).powi(2);
            if d <= 1.0 {
                buf.set_bg(cx + dx, cy + dy, body);
            }
        }
    }

    // Highlight patch
    let hl = as_u8(lerp3(as_f32(body), [255.0, 255.0, 255.0], 0.25));
    for dy in 0..(ry / 3).max(1) {
        for dx in 0..(rx / 3).max(1) {
            buf.set_bg(cx - rx / 2 + dx, cy - ry / 2 + dy, hl);
        }
    }

    draw_eyes(buf, creature, body, is_day, cx, cy, rx, ry);
    draw_mouth(buf, creature.mood(), body, cx, cy, ry);

    if matches!(condition, Condition::Rainy | Condition::Stormy) {
        draw_umbrella(buf, condition == Condition::Stormy, creature.bob, cx, cy - ry);
    }
}

fn draw_eyes(
    buf: &mut CellBuffer,
    creature: &Creature,
    body: [u8; 3],
    is_day: bool,
    cx: i32,
    cy: i32,
    rx: i32,
    ry: i32,
) {
    let spacing = (rx / 3).max(2);
    let mut eye_y = cy - (ry / 4).max(1);
    if creature.mood() == Mood::Distressed {
        eye_y += 1;
    }
    if !is_day {
        eye_y += 1; // droopy at night
    }

    let dark = rgb([40, 40, 48]);
    for ex in [cx - spacing, cx + spacing] {
        if creature.is_blinking {
            for dx in -1..=1 {
                buf.set(
                    ex + dx,
                    eye_y,
                    Cell {
                        ch: '─',
                        fg: rgb([80, 80, 90]),
                        bg: rgb(body),
                    },
                );
            }
        } else {
            for dx in -1..=1 {
                buf.set_bg(ex + dx, eye_y, [255, 255, 255]);
            }
            buf.set(
                ex,
                eye_y,
                Cell {
                    ch: '●',
                    fg: dark,
                    bg: rgb([255, 255, 255]),
                },
            );
        }
    }
}

fn draw_mouth(buf: &mut CellBuffer, mood: Mood, body: [u8; 3], cx: i32, cy: i32, ry: i32) {
    let my = cy + (ry / 2).max(1);
    let fg = rgb([80, 80, 90]);
    let bg = rgb(body);
    let mouth: &str = match mood {
        Mood::Happy => r"\___/",
        Mood::Neutral => "_____",
        Mood::Distressed => r"/---\",
    };
    let x0 = cx - mouth.chars().count() as i32 / 2;
    for (i, ch) in mouth.chars().enumerate() {
        buf.set(x0 + i as i32, my, Cell { ch, fg, bg });
    }
}

fn draw_umbrella(buf: &mut CellBuffer, flipped: bool, phase: f32, cx: i32, top_y: i32) {
    let sway = if flipped {
        ((phase * 5.7).sin() * 2.0) as i32
    } else {
        ((phase * 3.6).sin() * 1.0) as i32
    };
    let cx = cx + sway;
    let canopy_y = top_y - 3;

    let (canopy, ribs): (&[&str], [u8; 3]) = if flipped {
        // inside-out cup after a gust
        (&[r"\_______/", r" \_____/ "], [180, 60, 80])
    } else {
        (&[r"  _____  ", r" /     \ ", r"/_______\"], [255, 100, 120])
    };

    for (i, line) in canopy.iter().enumerate() {
        let x0 = cx - line.chars().count() as i32 / 2;
        let y = canopy_y + i as i32;
        for (j, ch) in line.chars().enumerate() {
            if ch != ' ' {
                buf.set(
                    x0 + j as i32,
                    y,
                    Cell {
                        ch,
                        fg: rgb(ribs),
                        bg: buf.bg_at(x0 + j as i32, y),
                    },
                );
            }
        }
    }

    // Handle down to the blob
    let handle_top = canopy_y + canopy.len() as i32;
    for y in handle_top..top_y {
        buf.set(
            cx,
            y,
            Cell {
                ch: '│',
                fg: rgb([110, 70, 45]),
                bg: buf.bg_at(cx, y),
            },
        );
    }
}

/* -----------------------------
   UI overlay + stone inventory
------------------------------ */

pub(crate) fn draw_text_over(buf: &mut CellBuffer, x: i32, y: i32, s: &str, fg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x + i as i32;
        let bg = buf.bg_at(xx, y);
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

fn need_bar(value: f32, width: usize) -> String {
    let fill = ((value / 100.0).clamp(0.0, 1.0) * width as f32 + 0.5) as usize;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { ' ' });
    }
    s.push(']');
    s
}

pub(crate) fn ui_overlay(
    buf: &mut CellBuffer,
    creature: &Creature,
    weather: &WeatherService,
    body: [u8; 3],
    status: Option<&str>,
) {
    let white = rgb([255, 255, 255]);
    let dim = rgb([200, 200, 205]);

    let mood_line = format!(
        "{:<12} Visit #{}",
        creature.mood().label(),
        creature.total_visits
    );
    draw_text_over(buf, 1, 0, &mood_line, white);

    let bar = need_bar(creature.need, 20);
    draw_text_over(buf, 1, 1, &bar, rgb(body));

    let watching = if creature.is_being_watched {
        "[watching]"
    } else {
        "[away]"
    };
    let watch_fg = if creature.is_being_watched {
        rgb([150, 255, 150])
    } else {
        rgb([255, 150, 150])
    };
    draw_text_over(buf, 1, 2, &format!("Need: {:.0}%", creature.need), dim);
    draw_text_over(buf, 13, 2, watching, watch_fg);

    draw_text_over(buf, 1, 3, &weather.status_line(), dim);

    if let Some(msg) = status {
        draw_text_over(buf, 1, 4, msg, rgb([255, 170, 120]));
    }

    let help = "q quit | click blob to feed | w/n weather override | c clear stone | s stats | u ui";
    draw_text_over(buf, 1, buf.h as i32 - 1, help, dim);
}

const STONE_SLOT_W: i32 = 4;

/// Slot i counts from the right edge, newest stone outermost, matching the
/// original's right-to-left tray.
pub(crate) fn stone_slot_x(i: usize, cols: u16) -> i32 {
    cols as i32 - 2 - STONE_SLOT_W * (i as i32 + 1)
}

pub(crate) fn stone_row_y(rows: u16) -> i32 {
    rows as i32 - 3
}

pub(crate) enum StoneHit {
    Stone(usize),
    Clear,
}

pub(crate) fn stone_hit_test(
    x: u16,
    y: u16,
    cols: u16,
    rows: u16,
    count: usize,
    has_active: bool,
) -> Option<StoneHit> {
    if count == 0 {
        return None;
    }
    let row = stone_row_y(rows);
    if (y as i32) != row {
        return None;
    }
    for i in 0..count {
        let x0 = stone_slot_x(i, cols);
        if (x as i32) >= x0 && (x as i32) < x0 + STONE_SLOT_W {
            return Some(StoneHit::Stone(i));
        }
    }
    if has_active {
        let clear_x = stone_slot_x(count, cols) - 7;
        if (x as i32) >= clear_x && (x as i32) < clear_x + 7 {
            return Some(StoneHit::Clear);
        }
    }
    None
}

pub(crate) fn draw_inventory(
    buf: &mut CellBuffer,
    inventory: &[Stone],
    active_color: Option<[u8; 3]>,
) {
    if inventory.is_empty() {
        return;
    }

    let row = stone_row_y(buf.h);
    let label = "Stones (click to use)";
    let label_x = buf.w as i32 - 2 - label.chars().count() as i32;
    draw_text_over(buf, label_x, row - 1, label, rgb([230, 230, 235]));

    // newest first, walking left from the edge
    for (i, stone) in inventory.iter().rev().enumerate() {
        let x0 = stone_slot_x(i, buf.w);
        let color = stone.kind.rgb();
        let selected = active_color == Some(color);
        let (open, close) = if selected { ('[', ']') } else { ('(', ')') };
        let frame_fg = if selected {
            rgb([255, 255, 255])
        } else {
            rgb([160, 160, 170])
        };
        buf.set(
            x0,
            row,
            Cell {
                ch: open,
                fg: frame_fg,
                bg: buf.bg_at(x0, row),
            },
        );
        buf.set(
            x0 + 1,
            row,
            Cell {
                ch: '●',
                fg: rgb(color),
                bg: buf.bg_at(x0 + 1, row),
            },
        );
        buf.set(
            x0 + 2,
            row,
            Cell {
                ch: close,
                fg: frame_fg,
                bg: buf.bg_at(x0 + 2, row),
            },
        );
    }

    if active_color.is_some() {
        let clear_x = stone_slot_x(inventory.len(), buf.w) - 7;
        draw_text_over(buf, clear_x, row, "[clear]", rgb([200, 200, 205]));
    }
}

/* -----------------------------
   Stats overlay
------------------------------ */

pub(crate) fn draw_center_box(buf: &mut CellBuffer, title: &str, body: &str) {
    let w = buf.w as i32;
    let h = buf.h as i32;
    let bw = 46.min(w - 4).max(10);
    let bh = (body.lines().count() as i32 + 5).min(h - 2).max(5);
    let x0 = (w - bw) / 2;
    let y0 = (h - bh) / 2;

    let fg = rgb([255, 255, 255]);
    let bg = rgb([20, 20, 32]);

    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            let ch = if y == y0 || y == y0 + bh - 1 {
                '─'
            } else if x == x0 || x == x0 + bw - 1 {
                '│'
            } else {
                ' '
            };
            buf.set(x, y, Cell { ch, fg, bg });
        }
    }
    buf.set(x0, y0, Cell { ch: '┌', fg, bg });
    buf.set(x0 + bw - 1, y0, Cell { ch: '┐', fg, bg });
    buf.set(x0, y0 + bh - 1, Cell { ch: '└', fg, bg });
    buf.set(x0 + bw - 1, y0 + bh - 1, Cell { ch: '┘', fg, bg });

    for (i, ch) in title.chars().enumerate() {
        buf.set(x0 + 2 + i as i32, y0 + 1, Cell { ch, fg, bg });
    }
    let mut yy = y0 + 3;
    for line in body.lines() {
        if yy >= y0 + bh - 1 {
            break;
        }
        for (i, ch) in line.chars().enumerate() {
            if x0 + 2 + (i as i32) < x0 + bw - 1 {
                buf.set(x0 + 2 + i as i32, yy, Cell { ch, fg, bg });
            }
        }
        yy += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_hit_is_centered_and_bounded() {
        let (cols, rows) = (120u16, 40u16);
        let (cx, cy) = blob_center(cols, rows);
        assert!(blob_hit(cx as u16, cy as u16, cols, rows));
        assert!(!blob_hit(0, 0, cols, rows));
        assert!(!blob_hit(cols - 1, rows - 1, cols, rows));
    }

    #[test]
    fn stone_slots_walk_left_from_the_edge() {
        let cols = 100u16;
        let x0 = stone_slot_x(0, cols);
        let x1 = stone_slot_x(1, cols);
        assert!(x1 < x0);
        assert_eq!(x0 - x1, STONE_SLOT_W);
        assert!(x0 + STONE_SLOT_W <= cols as i32);
    }

    #[test]
    fn stone_hit_test_resolves_slots_and_clear() {
        let (cols, rows) = (100u16, 40u16);
        let row = stone_row_y(rows) as u16;
        let x0 = stone_slot_x(0, cols) as u16;
        match stone_hit_test(x0 + 1, row, cols, rows, 3, true) {
            Some(StoneHit::Stone(0)) => {}
            _ => panic!("expected first slot"),
        }
        let clear_x = (stone_slot_x(3, cols) - 7) as u16;
        match stone_hit_test(clear_x + 1, row, cols, rows, 3, true) {
            Some(StoneHit::Clear) => {}
            _ => panic!("expected clear button"),
        }
        // clear region only exists while a stone is applied
        assert!(matches!(
            stone_hit_test(clear_x + 1, row, cols, rows, 3, false),
            None
        ));
        // off the tray row nothing hits
        assert!(stone_hit_test(x0 + 1, row - 2, cols, rows, 3, true).is_none());
    }

    #[test]
    fn sky_eases_toward_palette() {
        let mut sky = Sky::new();
        let weather = {
            let mut w = crate::weather::WeatherService::new(
                &crate::model::Tuning::default(),
                (0.0, 0.0),
            );
            w.state.loaded = true;
            w.state.condition = Condition::Sunny;
            w.state.is_day = true;
            w
        };
        let before = sky.top;
        for _ in 0..600 {
            sky.update(&weather);
        }
        let (target, _) = sky_palette(Some((Condition::Sunny, true)));
        assert!((sky.top[0] - target[0] as f32).abs() < 2.0);
        assert_ne!(before, sky.top);
    }
}
