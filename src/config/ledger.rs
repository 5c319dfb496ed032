//! Configuración del ledger de combustible

use std::str::FromStr;
use std::time::Duration;

use super::environment::{parse_var, ConfigError};

/// Qué hacer cuando ya existe un viaje abierto para (vehículo, empleado)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenTripPolicy {
    /// Rechazar el nuevo check-in con `Conflict`
    Reject,
    /// Permitir viajes solapados; el check-out cierra el más reciente
    NewestWins,
}

impl FromStr for OpenTripPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(OpenTripPolicy::Reject),
            "newest_wins" | "newest-wins" => Ok(OpenTripPolicy::NewestWins),
            other => Err(format!("expected 'reject' or 'newest_wins', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Límite para cada acceso al store o al registro de vehículos
    pub store_timeout: Duration,
    /// Reintentos ante `Conflict` en compare-and-append
    pub max_append_retries: u32,
    pub open_trip_policy: OpenTripPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(10),
            max_append_retries: 5,
            open_trip_policy: OpenTripPolicy::NewestWins,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            store_timeout: parse_var::<u64>("STORE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.store_timeout),
            max_append_retries: parse_var("MAX_APPEND_RETRIES")?
                .unwrap_or(defaults.max_append_retries),
            open_trip_policy: parse_var("OPEN_TRIP_POLICY")?
                .unwrap_or(defaults.open_trip_policy),
        })
    }
}
