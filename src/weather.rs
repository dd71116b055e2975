use crate::model::{Condition, Tuning, WeatherOverride, WeatherState};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// What a finished fetch hands back to the tick loop.
#[derive(Clone, Copy, Debug)]
pub(crate) enum FetchOutcome {
    Loaded {
        temperature: f32,
        condition: Condition,
        is_day: bool,
    },
    Failed,
}

/// Weather provider: Idle -> Fetching -> {Loaded | Failed}, re-entered on a
/// fixed interval. The fetch runs as a tokio task and never blocks the tick
/// loop; its outcome is merged at the start of whichever tick sees it.
pub(crate) struct WeatherService {
    pub(crate) state: WeatherState,
    pub(crate) overrides: WeatherOverride,
    refresh_every_ms: i64,
    geolocate_timeout: Duration,
    default_coord: (f64, f64),
    tx: UnboundedSender<FetchOutcome>,
    rx: UnboundedReceiver<FetchOutcome>,
}

impl WeatherService {
    pub(crate) fn new(tuning: &Tuning, default_coord: (f64, f64)) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: WeatherState::default(),
            overrides: WeatherOverride::default(),
            refresh_every_ms: tuning.weather_refresh_ms,
            geolocate_timeout: Duration::from_secs(tuning.geolocate_timeout_secs),
            default_coord,
            tx,
            rx,
        }
    }

    /// Every consumer of current conditions goes through these two, so the
    /// override and live paths can never diverge.
    pub(crate) fn effective_condition(&self) -> Condition {
        self.overrides.condition.unwrap_or(self.state.condition)
    }

    pub(crate) fn effective_is_day(&self) -> bool {
        self.overrides.is_day.unwrap_or(self.state.is_day)
    }

    pub(crate) fn cycle_condition_override(&mut self) {
        use Condition::*;
        self.overrides.condition = match self.overrides.condition {
            None => Some(Sunny),
            Some(Sunny) => Some(Cloudy),
            Some(Cloudy) => Some(Rainy),
            Some(Rainy) => Some(Stormy),
            Some(Stormy) => Some(Snowy),
            Some(Snowy) | Some(Unknown) => None,
        };
    }

    pub(crate) fn cycle_day_override(&mut self) {
        self.overrides.is_day = match self.overrides.is_day {
            None => Some(true),
            Some(true) => Some(false),
            Some(false) => None,
        };
    }

    /// Merge any completed fetches. Failure still marks the state loaded so
    /// nothing downstream waits forever on a spinner.
    pub(crate) fn drain(&mut self, now_ms: i64) -> Option<FetchOutcome> {
        let mut last = None;
        while let Ok(outcome) = self.rx.try_recv() {
            match outcome {
                FetchOutcome::Loaded {
                    temperature,
                    condition,
                    is_day,
                } => {
                    self.state.temperature = temperature;
                    self.state.condition = condition;
                    self.state.is_day = is_day;
                    self.state.error = false;
                }
                FetchOutcome::Failed => {
                    self.state.error = true;
                    self.state.condition = Condition::Cloudy;
                }
            }
            self.state.loaded = true;
            self.state.fetching = false;
            self.state.last_update_ms = now_ms;
            last = Some(outcome);
        }
        last
    }

    pub(crate) fn refresh_if_due(&mut self, now_ms: i64, rt: &tokio::runtime::Handle) {
        if !self.state.fetching && now_ms - self.state.last_update_ms > self.refresh_every_ms {
            self.begin_fetch(rt);
        }
    }

    pub(crate) fn force_refresh(&mut self, rt: &tokio::runtime::Handle) {
        if !self.state.fetching {
            self.begin_fetch(rt);
        }
    }

    fn begin_fetch(&mut self, rt: &tokio::runtime::Handle) {
        self.state.fetching = true;
        let tx = self.tx.clone();
        let fallback = self.default_coord;
        let geo_timeout = self.geolocate_timeout;
        rt.spawn(async move {
            let outcome = match fetch_current(fallback, geo_timeout).await {
                Ok(o) => o,
                Err(_) => FetchOutcome::Failed,
            };
            // Receiver gone means we are shutting down.
            let _ = tx.send(outcome);
        });
    }

    pub(crate) fn status_line(&self) -> String {
        if self.overrides.condition.is_some() || self.overrides.is_day.is_some() {
            return format!(
                "{} ({}) (testing)",
                self.effective_condition().label(),
                if self.effective_is_day() { "day" } else { "night" }
            );
        }
        if !self.state.loaded {
            return "loading weather...".to_string();
        }
        format!(
            "{:.0}C . {} . {}",
            self.state.temperature,
            self.state.condition.label(),
            if self.state.is_day { "day" } else { "night" }
        )
    }
}

/// Open-Meteo WMO code buckets. Valid codes stop at 99; anything outside
/// the table is treated as overcast rather than guessed at.
pub(crate) fn condition_for_code(code: i32) -> Condition {
    match code {
        0 => Condition::Sunny,
        1..=59 => Condition::Cloudy,
        60..=69 => Condition::Rainy,
        70..=86 => Condition::Snowy,
        95..=99 => Condition::Stormy,
        _ => Condition::Cloudy,
    }
}

#[derive(Debug, Deserialize)]
struct GeoResp {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResp {
    current: OpenMeteoCurrent,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    temperature_2m: f64,
    weather_code: i32,
    is_day: u8,
}

async fn geolocate(client: &reqwest::Client) -> Result<(f64, f64)> {
    let resp = client
        .get("https://ipapi.co/json/")
        .send()
        .await
        .context("geolocation request failed")?;
    if !resp.status().is_success() {
        return Err(anyhow!("geolocation HTTP {}", resp.status()));
    }
    let geo: GeoResp = resp.json().await.context("geolocation JSON parse failed")?;
    Ok((geo.latitude, geo.longitude))
}

async fn fetch_current(fallback: (f64, f64), geo_timeout: Duration) -> Result<FetchOutcome> {
    let client = reqwest::Client::new();

    // Best-effort geolocation with a hard timeout; default coordinate on
    // any failure, same as the weather call itself would.
    let (lat, lon) = match tokio::time::timeout(geo_timeout, geolocate(&client)).await {
        Ok(Ok(coord)) => coord,
        _ => fallback,
    };

    let url = format!(
        "https://api.open-meteo.com/v1/forecast?latitude={lat}&longitude={lon}\
&current=temperature_2m,weather_code,is_day"
    );

    let resp = client.get(url).send().await.context("forecast request failed")?;
    if !resp.status().is_success() {
        return Err(anyhow!("forecast HTTP {}", resp.status()));
    }
    let om: OpenMeteoResp = resp.json().await.context("forecast JSON parse failed")?;

    Ok(FetchOutcome::Loaded {
        temperature: om.current.temperature_2m as f32,
        condition: condition_for_code(om.current.weather_code),
        is_day: om.current.is_day == 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tuning;

    fn service() -> WeatherService {
        WeatherService::new(&Tuning::default(), (-41.29, 174.78))
    }

    #[test]
    fn code_mapping_is_total() {
        assert_eq!(condition_for_code(0), Condition::Sunny);
        assert_eq!(condition_for_code(45), Condition::Cloudy);
        assert_eq!(condition_for_code(65), Condition::Rainy);
        assert_eq!(condition_for_code(75), Condition::Snowy);
        assert_eq!(condition_for_code(96), Condition::Stormy);
        // out-of-table codes fall back to cloudy
        assert_eq!(condition_for_code(999), Condition::Cloudy);
        assert_eq!(condition_for_code(90), Condition::Cloudy);
        assert_eq!(condition_for_code(-3), Condition::Cloudy);
    }

    #[test]
    fn override_wins_and_falls_back() {
        let mut w = service();
        w.state.condition = Condition::Rainy;
        w.state.is_day = false;
        assert_eq!(w.effective_condition(), Condition::Rainy);
        assert!(!w.effective_is_day());

        w.overrides.condition = Some(Condition::Snowy);
        w.overrides.is_day = Some(true);
        assert_eq!(w.effective_condition(), Condition::Snowy);
        assert!(w.effective_is_day());

        w.overrides.condition = None;
        w.overrides.is_day = None;
        assert_eq!(w.effective_condition(), Condition::Rainy);
        assert!(!w.effective_is_day());
    }

    #[test]
    fn override_cycles_return_to_live() {
        let mut w = service();
        for _ in 0..6 {
            w.cycle_condition_override();
        }
        assert!(w.overrides.condition.is_none());
        for _ in 0..3 {
            w.cycle_day_override();
        }
        assert!(w.overrides.is_day.is_none());
    }

    #[test]
    fn failed_fetch_degrades_to_loaded_cloudy() {
        let mut w = service();
        w.state.fetching = true;
        w.tx.send(FetchOutcome::Failed).unwrap();
        w.drain(1_000);
        assert!(w.state.loaded);
        assert!(w.state.error);
        assert!(!w.state.fetching);
        assert_eq!(w.state.condition, Condition::Cloudy);
        assert_eq!(w.state.last_update_ms, 1_000);
    }

    #[test]
    fn successful_fetch_merges_and_clears_error() {
        let mut w = service();
        w.state.error = true;
        w.state.fetching = true;
        w.tx.send(FetchOutcome::Loaded {
            temperature: 7.5,
            condition: Condition::Snowy,
            is_day: false,
        })
        .unwrap();
        w.drain(2_000);
        assert!(w.state.loaded);
        assert!(!w.state.error);
        assert_eq!(w.state.condition, Condition::Snowy);
        assert_eq!(w.state.temperature, 7.5);
        assert!(!w.state.is_day);
    }

    #[test]
    fn drain_with_nothing_pending_changes_nothing() {
        let mut w = service();
        assert!(w.drain(5_000).is_none());
        assert!(!w.state.loaded);
        assert_eq!(w.state.last_update_ms, 0);
    }
}
