use crate::model::{Creature, RngState, Tuning};

impl Creature {
    /// One fixed-rate tick: decay, focus bookkeeping, animation phases.
    /// `anim_speed` comes from the effective day/night flag (slower at night).
    pub(crate) fn tick(&mut self, focused: bool, anim_speed: f32, tuning: &Tuning, rng: &mut RngState) {
        self.set_watched(focused, tuning);

        let rate = if self.is_being_watched {
            tuning.decay_rate
        } else {
            tuning.away_decay_rate
        };
        self.need = (self.need + rate).clamp(0.0, 100.0);

        self.breathe += 0.02 * anim_speed;
        self.bob += 0.014 * anim_speed;

        self.blink_timer -= 1;
        if self.blink_timer <= 0 {
            self.is_blinking = !self.is_blinking;
            self.blink_timer = if self.is_blinking {
                6
            } else {
                rng.range_i32(60, 180)
            };
        }

        if self.just_returned {
            self.return_timer = self.return_timer.saturating_sub(1);
            if self.return_timer == 0 {
                self.just_returned = false;
            }
        }
    }

    fn set_watched(&mut self, focused: bool, tuning: &Tuning) {
        let was_watching = self.is_being_watched;
        self.is_being_watched = focused;

        if was_watching && !focused {
            self.times_left += 1;
        }
        if !was_watching && focused {
            self.just_returned = true;
            self.return_timer = tuning.return_anim_ticks;
        }
    }

    pub(crate) fn feed(&mut self, tuning: &Tuning) {
        self.need = (self.need - tuning.feed_amount).max(0.0);
    }

    /// One-time catch-up decay for time spent away, applied at load before
    /// the tick loop starts. Returns the (capped) hours credited.
    pub(crate) fn catch_up(&mut self, last_visit_ms: i64, now_ms: i64, tuning: &Tuning) -> f32 {
        let elapsed_ms = (now_ms - last_visit_ms).max(0);
        let hours = (elapsed_ms as f32 / 3_600_000.0).min(tuning.max_decay_hours);
        self.need = (self.need + hours * tuning.afk_decay_per_hour).clamp(0.0, 100.0);
        hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mood;

    fn setup() -> (Creature, Tuning, RngState) {
        (Creature::new(), Tuning::default(), RngState::new(1))
    }

    #[test]
    fn need_stays_clamped_under_decay() {
        let (mut c, t, mut rng) = setup();
        c.need = 99.9;
        for _ in 0..100 {
            c.tick(false, 1.0, &t, &mut rng);
            assert!(c.need >= 0.0 && c.need <= 100.0);
        }
        assert_eq!(c.need, 100.0);
        assert_eq!(c.mood(), Mood::Distressed);
    }

    #[test]
    fn feed_floors_at_zero() {
        let (mut c, t, _) = setup();
        c.need = 15.0;
        c.feed(&t);
        assert_eq!(c.need, 0.0);
        c.feed(&t);
        assert_eq!(c.need, 0.0);
    }

    #[test]
    fn unfocused_decay_strictly_exceeds_focused() {
        let (mut watched, t, mut rng_a) = setup();
        let (mut away, _, mut rng_b) = setup();
        watched.need = 10.0;
        away.need = 10.0;
        // Skip the first tick on each so neither pays a focus-edge transition.
        for _ in 0..200 {
            watched.tick(true, 1.0, &t, &mut rng_a);
            away.tick(false, 1.0, &t, &mut rng_b);
        }
        assert!(away.need > watched.need);
        let per_tick_watched = (watched.need - 10.0) / 200.0;
        let per_tick_away = (away.need - 10.0) / 200.0;
        assert!((per_tick_watched - t.decay_rate).abs() < 1e-4);
        assert!((per_tick_away - t.away_decay_rate).abs() < 1e-4);
    }

    #[test]
    fn focus_edges_update_counters() {
        let (mut c, t, mut rng) = setup();
        assert_eq!(c.times_left, 0);
        c.tick(false, 1.0, &t, &mut rng);
        assert_eq!(c.times_left, 1);
        assert!(!c.just_returned);
        c.tick(true, 1.0, &t, &mut rng);
        assert!(c.just_returned);
        assert!(c.return_timer > 0);
        // countdown clears the flag
        for _ in 0..t.return_anim_ticks {
            c.tick(true, 1.0, &t, &mut rng);
        }
        assert!(!c.just_returned);
        // repeated same-state ticks add nothing
        c.tick(true, 1.0, &t, &mut rng);
        assert_eq!(c.times_left, 1);
    }

    #[test]
    fn catch_up_is_monotonic_and_capped() {
        let t = Tuning::default();
        let hour_ms: i64 = 3_600_000;

        let need_after = |hours_away: i64| {
            let mut c = Creature::new();
            c.need = 10.0;
            c.catch_up(0, hours_away * hour_ms, &t);
            c.need
        };

        assert!(need_after(2) > need_after(1));
        assert_eq!(need_after(1), 10.0 + t.afk_decay_per_hour);
        // 1000h behaves identically to the 168h ceiling
        assert_eq!(need_after(1000), need_after(168));
        // still clamped to 100
        assert!(need_after(1000) <= 100.0);
    }

    #[test]
    fn catch_up_ignores_clock_skew() {
        let (mut c, t, _) = setup();
        c.need = 40.0;
        let hours = c.catch_up(10_000, 5_000, &t);
        assert_eq!(hours, 0.0);
        assert_eq!(c.need, 40.0);
    }
}
