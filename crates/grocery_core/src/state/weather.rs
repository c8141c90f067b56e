//! Delivery-region weather state container.

use async_trait::async_trait;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::watch;

/// Current conditions for a region.
#[derive(Debug, Clone, PartialEq)]
pub struct Weather {
    pub location: String,
    pub temperature_c: f64,
    pub description: String,
    pub humidity_pct: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherError {
    pub message: String,
}

impl WeatherError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for WeatherError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "weather service error: {}", self.message)
    }
}

impl Error for WeatherError {}

/// External weather lookup.
#[async_trait]
pub trait WeatherService: Send + Sync {
    async fn current(&self, region: &str) -> Result<Weather, WeatherError>;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum WeatherStatus {
    #[default]
    Idle,
    Loading,
    Ready(Weather),
    Failed(String),
}

pub struct WeatherState {
    service: Arc<dyn WeatherService>,
    status: watch::Sender<WeatherStatus>,
}

impl WeatherState {
    pub fn new(service: Arc<dyn WeatherService>) -> Self {
        let (status, _) = watch::channel(WeatherStatus::Idle);
        Self { service, status }
    }

    pub fn subscribe(&self) -> watch::Receiver<WeatherStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> WeatherStatus {
        self.status.borrow().clone()
    }

    /// Loads conditions for `region`; a blank region resets to `Idle`.
    pub async fn load(&self, region: &str) -> WeatherStatus {
        let region = region.trim();
        if region.is_empty() {
            self.status.send_replace(WeatherStatus::Idle);
            return WeatherStatus::Idle;
        }
        self.status.send_replace(WeatherStatus::Loading);
        let next = match self.service.current(region).await {
            Ok(weather) => WeatherStatus::Ready(weather),
            Err(err) => {
                warn!("event=weather_load module=state status=error error={}", err);
                WeatherStatus::Failed("No se pudo obtener el clima.".to_string())
            }
        };
        self.status.send_replace(next.clone());
        next
    }
}

#[cfg(test)]
mod tests {
    use super::{Weather, WeatherError, WeatherService, WeatherState, WeatherStatus};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedWeather;

    #[async_trait]
    impl WeatherService for FixedWeather {
        async fn current(&self, region: &str) -> Result<Weather, WeatherError> {
            if region == "Atlantis" {
                return Err(WeatherError::new("unknown region"));
            }
            Ok(Weather {
                location: region.to_string(),
                temperature_c: 18.5,
                description: "Despejado".to_string(),
                humidity_pct: Some(40),
            })
        }
    }

    #[tokio::test]
    async fn load_publishes_ready_or_failed() {
        let state = WeatherState::new(Arc::new(FixedWeather));
        assert_eq!(state.status(), WeatherStatus::Idle);

        let ready = state.load("Santiago").await;
        assert!(matches!(ready, WeatherStatus::Ready(ref weather) if weather.location == "Santiago"));

        let failed = state.load("Atlantis").await;
        assert!(matches!(failed, WeatherStatus::Failed(_)));
        assert_eq!(state.status(), failed);

        assert_eq!(state.load("  ").await, WeatherStatus::Idle);
    }
}
