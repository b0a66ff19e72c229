use crate::{error::RelayError, live_data::LiveDataProvider, LOG_TARGET};

const LOCATION_KEYWORDS: [&str; 2] = ["galway", "ireland"];

const LIVE_DATA_INSTRUCTION: &str = "Use ONLY the facts in the LIVE_DATA section below for the current time or weather. \
If a fact is missing or marked unavailable, say so plainly and do not guess or invent it.";

const LENGTH_HINT: &str = "Answer in 1-4 sentences.";

pub const WEATHER_UNAVAILABLE: &str = "Weather in Galway: unavailable right now (the weather service could not be reached).";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Triggers {
    pub time: bool,
    pub weather: bool,
}

impl Triggers {
    /// Time and weather are triggered independently; each needs a location keyword.
    pub fn detect(message: &str) -> Self {
        let lower = message.to_lowercase();
        let at_location = LOCATION_KEYWORDS.iter().any(|k| lower.contains(k));
        Triggers {
            time: at_location && lower.contains("time"),
            weather: at_location && lower.contains("weather"),
        }
    }

    pub fn any(&self) -> bool {
        self.time || self.weather
    }
}

/// Wraps the question with the LIVE_DATA block. No facts means no wrapping.
pub fn build_prompt(message: &str, facts: &[String]) -> String {
    if facts.is_empty() {
        return message.to_string();
    }

    let live_data = facts
        .iter()
        .map(|f| format!("- {f}"))
        .collect::<Vec<_>>()
        .join("\n");

    [
        LIVE_DATA_INSTRUCTION,
        "",
        "LIVE_DATA:",
        live_data.as_str(),
        "",
        "QUESTION:",
        message,
        "",
        LENGTH_HINT,
    ]
    .join("\n")
}

pub fn weather_fact(weather: &Result<crate::live_data::WeatherSnapshot, RelayError>) -> String {
    match weather {
        Ok(snapshot) => snapshot.fact_line(),
        Err(RelayError::UpstreamUnavailable(reason)) => {
            tracing::warn!(target: LOG_TARGET, "weather degraded: {reason}");
            WEATHER_UNAVAILABLE.to_string()
        }
        Err(other) => {
            tracing::warn!(target: LOG_TARGET, "unexpected weather error: {other}");
            WEATHER_UNAVAILABLE.to_string()
        }
    }
}

/// Returns the prompt to send to the model. Never fails: a weather outage
/// becomes an "unavailable" line inside LIVE_DATA.
pub async fn augment(message: &str, live: &LiveDataProvider) -> String {
    let triggers = Triggers::detect(message);
    if !triggers.any() {
        return message.to_string();
    }

    let mut facts = Vec::new();
    if triggers.time {
        facts.push(format!("Current time in Galway: {}", live.local_time()));
    }
    if triggers.weather {
        facts.push(weather_fact(&live.weather().await));
    }
    tracing::debug!(target: LOG_TARGET, "augmented prompt with {} live fact(s)", facts.len());

    build_prompt(message, &facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_data::{WeatherSnapshot, WeatherSource};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    struct FixedSource {
        result: Result<WeatherSnapshot, RelayError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherSource for FixedSource {
        async fn current_weather(&self, _lat: f64, _lon: f64) -> Result<WeatherSnapshot, RelayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn live(result: Result<WeatherSnapshot, RelayError>) -> (LiveDataProvider, Arc<FixedSource>) {
        let source = Arc::new(FixedSource {
            result,
            calls: AtomicUsize::new(0),
        });
        let provider =
            LiveDataProvider::new(chrono_tz::Europe::Dublin, 53.2707, -9.0568, source.clone());
        (provider, source)
    }

    fn sunny() -> WeatherSnapshot {
        WeatherSnapshot {
            temperature_c: 12.3,
            wind_kmh: 5.0,
            precipitation_mm: 0.0,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_trigger_detection() {
        assert_eq!(
            Triggers::detect("What TIME is it in Galway?"),
            Triggers { time: true, weather: false }
        );
        assert_eq!(
            Triggers::detect("how's the weather in ireland"),
            Triggers { time: false, weather: true }
        );
        assert_eq!(
            Triggers::detect("Galway weather and time please"),
            Triggers { time: true, weather: true }
        );
        assert!(!Triggers::detect("what's the weather like?").any());
        assert!(!Triggers::detect("tell me about Galway").any());
    }

    #[test]
    fn test_build_prompt_without_facts_is_identity() {
        let msg = "  Write me a haiku about Rust ";
        assert_eq!(build_prompt(msg, &[]), msg);
    }

    #[test]
    fn test_build_prompt_layout() {
        let prompt = build_prompt(
            "What time is it in Galway?",
            &["Current time in Galway: Monday, 19 October 2026 14:05 (IST)".to_string()],
        );
        assert!(prompt.starts_with(LIVE_DATA_INSTRUCTION));
        assert!(prompt.contains("LIVE_DATA:\n- Current time in Galway: Monday"));
        assert!(prompt.contains("QUESTION:\nWhat time is it in Galway?"));
        assert!(prompt.ends_with(LENGTH_HINT));
    }

    #[tokio::test]
    async fn test_augment_passthrough_skips_live_data() {
        let (live, source) = live(Ok(sunny()));
        let msg = "Explain borrow checking in one line";
        assert_eq!(augment(msg, &live).await, msg);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_augment_preserves_casing() {
        let (live, _) = live(Ok(sunny()));
        let prompt = augment("What's the WEATHER in Galway?", &live).await;
        assert!(prompt.contains("QUESTION:\nWhat's the WEATHER in Galway?"));
        assert!(prompt.contains("temperature 12.3°C, wind 5 km/h, precipitation 0 mm"));
    }

    #[tokio::test]
    async fn test_augment_time_only_does_not_fetch_weather() {
        let (live, source) = live(Ok(sunny()));
        let prompt = augment("what time is it in ireland", &live).await;
        assert!(prompt.contains("Current time in Galway: "));
        assert!(!prompt.contains("Weather in Galway"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_augment_degrades_when_weather_unavailable() {
        let (live, source) = live(Err(RelayError::upstream("timed out")));
        let prompt = augment("weather in galway?", &live).await;
        assert!(prompt.contains(WEATHER_UNAVAILABLE));
        assert!(prompt.contains("QUESTION:\nweather in galway?"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
