use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) enum Mood {
    Happy,
    Neutral,
    Distressed,
}

impl Mood {
    pub(crate) fn rgb(self) -> [u8; 3] {
        match self {
            Mood::Happy => [145, 137, 240],    // lavender
            Mood::Neutral => [126, 102, 145],  // muted purple
            Mood::Distressed => [184, 51, 65], // reddish
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Neutral => "Neutral",
            Mood::Distressed => "Distressed",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) enum Condition {
    Sunny,
    Cloudy,
    Rainy,
    Stormy,
    Snowy,
    Unknown,
}

impl Condition {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Condition::Sunny => "sunny",
            Condition::Cloudy => "cloudy",
            Condition::Rainy => "rainy",
            Condition::Stormy => "stormy",
            Condition::Snowy => "snowy",
            Condition::Unknown => "unknown",
        }
    }
}

/// Live weather snapshot. Mutated only when a fetch outcome is merged;
/// everything else reads it (through the override accessors).
#[derive(Clone, Copy, Debug)]
pub(crate) struct WeatherState {
    pub(crate) loaded: bool,
    pub(crate) fetching: bool,
    pub(crate) error: bool,
    pub(crate) temperature: f32,
    pub(crate) condition: Condition,
    pub(crate) is_day: bool,
    pub(crate) last_update_ms: i64,
}

impl Default for WeatherState {
    fn default() -> Self {
        Self {
            loaded: false,
            fetching: false,
            error: false,
            temperature: 20.0,
            condition: Condition::Unknown,
            is_day: true,
            last_update_ms: 0,
        }
    }
}

/// Manual test hook: either half, when set, supersedes the live value
/// everywhere conditions are consulted.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct WeatherOverride {
    pub(crate) condition: Option<Condition>,
    pub(crate) is_day: Option<bool>,
}

#[derive(Clone, Debug)]
pub(crate) struct Creature {
    pub(crate) need: f32,
    pub(crate) is_being_watched: bool,
    pub(crate) times_left: u32,
    pub(crate) just_returned: bool,
    pub(crate) return_timer: u32,
    pub(crate) total_visits: u32,
    pub(crate) last_visit_ms: Option<i64>,

    // Animation phases
    pub(crate) breathe: f32,
    pub(crate) bob: f32,
    pub(crate) is_blinking: bool,
    pub(crate) blink_timer: i32,
}

impl Creature {
    pub(crate) fn new() -> Self {
        Self {
            need: 50.0,
            is_being_watched: true,
            times_left: 0,
            just_returned: false,
            return_timer: 0,
            total_visits: 0,
            last_visit_ms: None,
            breathe: 0.0,
            bob: 0.0,
            is_blinking: false,
            blink_timer: 0,
        }
    }

    /// Mood is always derived from need, never stored.
    pub(crate) fn mood(&self) -> Mood {
        if self.need <= 30.0 {
            Mood::Happy
        } else if self.need <= 70.0 {
            Mood::Neutral
        } else {
            Mood::Distressed
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) enum StoneKind {
    Blue,
    Orange,
    Green,
    Pink,
    Gold,
    Purple,
}

impl StoneKind {
    pub(crate) const ALL: [StoneKind; 6] = [
        StoneKind::Blue,
        StoneKind::Orange,
        StoneKind::Green,
        StoneKind::Pink,
        StoneKind::Gold,
        StoneKind::Purple,
    ];

    pub(crate) fn name(self) -> &'static str {
        match self {
            StoneKind::Blue => "Blue Stone",
            StoneKind::Orange => "Orange Stone",
            StoneKind::Green => "Green Stone",
            StoneKind::Pink => "Pink Stone",
            StoneKind::Gold => "Gold Stone",
            StoneKind::Purple => "Purple Stone",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    pub(crate) fn rgb(self) -> [u8; 3] {
        match self {
            StoneKind::Blue => [100, 150, 255],
            StoneKind::Orange => [255, 150, 80],
            StoneKind::Green => [100, 200, 120],
            StoneKind::Pink => [255, 130, 180],
            StoneKind::Gold => [255, 215, 100],
            StoneKind::Purple => [180, 100, 255],
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Stone {
    pub(crate) kind: StoneKind,
    pub(crate) found_at_ms: i64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub(crate) struct Tuning {
    pub(crate) feed_amount: f32,
    pub(crate) decay_rate: f32,      // need per tick while watched
    pub(crate) away_decay_rate: f32, // need per tick while unwatched
    pub(crate) afk_decay_per_hour: f32,
    pub(crate) max_decay_hours: f32,
    pub(crate) return_anim_ticks: u32,
    pub(crate) tick_step_ms: u64,
    pub(crate) stone_check_ms: i64,
    pub(crate) stone_find_chance: f32,
    pub(crate) weather_refresh_ms: i64,
    pub(crate) geolocate_timeout_secs: u64,
    pub(crate) autosave_ms: i64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            feed_amount: 20.0,
            decay_rate: 0.005,
            away_decay_rate: 0.15,
            afk_decay_per_hour: 5.0,
            max_decay_hours: 168.0, // 7 days
            return_anim_ticks: 60,
            tick_step_ms: 16, // ~60 Hz nominal sim rate
            stone_check_ms: 5_000,
            stone_find_chance: 0.15,
            weather_refresh_ms: 600_000, // 10 minutes
            geolocate_timeout_secs: 5,
            autosave_ms: 30_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct RngState {
    pub(crate) seed: u64,
    pub(crate) event_counter: u64,
}

impl RngState {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            seed,
            event_counter: 0,
        }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        // Counter-based SplitMix64: deterministic and cheap.
        let mut z = self
            .seed
            .wrapping_add(self.event_counter.wrapping_mul(0x9E3779B97F4A7C15));
        self.event_counter = self.event_counter.wrapping_add(1);

        z = z.wrapping_add(0x9E3779B97F4A7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    pub(crate) fn next_f32(&mut self) -> f32 {
        // [0,1)
        let v = self.next_u64() >> 40; // 24 bits
        (v as f32) / ((1u64 << 24) as f32)
    }

    pub(crate) fn roll(&mut self, p: f32) -> bool {
        self.next_f32() < p.clamp(0.0, 1.0)
    }

    pub(crate) fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.next_u64() % len as u64) as usize
    }

    pub(crate) fn range_i32(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        lo + (self.next_u64() % (hi - lo) as u64) as i32
    }
}

/// A periodic side effect keyed by last-run timestamp, checked once per
/// tick instead of running on its own timer.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Cadence {
    pub(crate) last_run_ms: i64,
    pub(crate) every_ms: i64,
}

impl Cadence {
    pub(crate) fn new(every_ms: i64, now_ms: i64) -> Self {
        Self {
            last_run_ms: now_ms,
            every_ms,
        }
    }

    pub(crate) fn due(&mut self, now_ms: i64) -> bool {
        if now_ms - self.last_run_ms > self.every_ms {
            self.last_run_ms = now_ms;
            true
        } else {
            false
        }
    }
}

/* -----------------------------
   Persisted record shapes
------------------------------ */

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatureRecord {
    pub(crate) need: f32,
    pub(crate) last_visit: i64,
    pub(crate) total_visits: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoneRecord {
    pub(crate) name: String,
    pub(crate) rgb: [u8; 3],
    pub(crate) found_at: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StonesRecord {
    pub(crate) inventory: Vec<StoneRecord>,
    pub(crate) active_color: Option<[u8; 3]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_boundaries_are_inclusive_as_documented() {
        let mut c = Creature::new();
        c.need = 30.0;
        assert_eq!(c.mood(), Mood::Happy);
        c.need = 31.0;
        assert_eq!(c.mood(), Mood::Neutral);
        c.need = 70.0;
        assert_eq!(c.mood(), Mood::Neutral);
        c.need = 71.0;
        assert_eq!(c.mood(), Mood::Distressed);
    }

    #[test]
    fn stone_names_round_trip() {
        for kind in StoneKind::ALL {
            assert_eq!(StoneKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(StoneKind::from_name("Opal Stone"), None);
    }

    #[test]
    fn rng_stream_is_deterministic_and_in_range() {
        let mut a = RngState::new(7);
        let mut b = RngState::new(7);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let mut c = RngState::new(7);
        for _ in 0..1000 {
            let v = c.next_f32();
            assert!((0.0..1.0).contains(&v));
            assert!(c.index(6) < 6);
        }
    }

    #[test]
    fn cadence_fires_once_per_interval() {
        let mut cad = Cadence::new(5_000, 0);
        assert!(!cad.due(1_000));
        assert!(!cad.due(5_000));
        assert!(cad.due(5_001));
        // re-armed from the fire time, not the check time
        assert!(!cad.due(9_000));
        assert!(cad.due(10_002));
    }
}
