//! Modelo de FuelRecord
//!
//! Un registro de combustible es inmutable una vez creado. Para un vehículo,
//! los registros forman una cadena: el `previous_fuel` de cada registro es
//! el `new_fuel` del registro anterior (o `0` para el primero).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Tolerancia usada al comparar eslabones de la cadena
pub const CHAIN_TOLERANCE: f64 = 1e-9;

/// Origen del registro - mapea al ENUM fuel_record_kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "fuel_record_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FuelRecordKind {
    /// Consumo calculado al cerrar un viaje
    Consumption,
    /// Abastecimiento manual
    Refuel,
    /// Corrección hacia adelante al borrar un viaje cerrado
    Compensation,
}

/// FuelRecord - mapea a la tabla fuel_records
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct FuelRecord {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    /// Posición 1-based en la cadena del vehículo; única por vehículo
    pub sequence: i64,
    pub kind: FuelRecordKind,
    pub trip_id: Option<Uuid>,
    pub previous_fuel: f64,
    pub new_fuel: f64,
    pub distance_driven: f64,
    pub created_at: DateTime<Utc>,
}

impl FuelRecord {
    /// Cambio con signo aplicado por este registro
    pub fn fuel_delta(&self) -> f64 {
        self.new_fuel - self.previous_fuel
    }

    /// Verdadero si este registro continúa correctamente a `prior`
    pub fn links_to(&self, prior: &FuelRecord) -> bool {
        self.sequence == prior.sequence + 1
            && (self.previous_fuel - prior.new_fuel).abs() <= CHAIN_TOLERANCE
    }
}

/// Datos para construir el siguiente eslabón de la cadena
#[derive(Debug, Clone, Copy)]
pub struct NextFuelRecord {
    pub kind: FuelRecordKind,
    pub trip_id: Option<Uuid>,
    pub new_fuel: f64,
    pub distance_driven: f64,
}

impl NextFuelRecord {
    /// Construye el registro encadenado a `latest` (o al caso base si no hay)
    pub fn chain_after(self, vehicle_id: Uuid, latest: Option<&FuelRecord>) -> FuelRecord {
        let now = Utc::now();
        let (previous_fuel, sequence, created_at) = match latest {
            Some(prior) => (prior.new_fuel, prior.sequence + 1, now.max(prior.created_at)),
            None => (0.0, 1, now),
        };

        FuelRecord {
            id: Uuid::new_v4(),
            vehicle_id,
            sequence,
            kind: self.kind,
            trip_id: self.trip_id,
            previous_fuel,
            new_fuel: self.new_fuel,
            distance_driven: self.distance_driven,
            created_at,
        }
    }
}

/// Resultado de recorrer la cadena de un vehículo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainReport {
    pub vehicle_id: Uuid,
    pub record_count: usize,
    pub is_linked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_broken_sequence: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ChainReport {
    /// Recorre los registros ordenados del más antiguo al más nuevo
    pub fn from_oldest_first(vehicle_id: Uuid, records: &[FuelRecord]) -> Self {
        let broken = |sequence: i64, reason: String| ChainReport {
            vehicle_id,
            record_count: records.len(),
            is_linked: false,
            first_broken_sequence: Some(sequence),
            reason: Some(reason),
        };

        if let Some(first) = records.first() {
            if first.sequence != 1 || first.previous_fuel.abs() > CHAIN_TOLERANCE {
                return broken(
                    first.sequence,
                    format!(
                        "first record must have sequence 1 and previous_fuel 0 (got {} / {})",
                        first.sequence, first.previous_fuel
                    ),
                );
            }
        }

        for pair in records.windows(2) {
            let (prior, next) = (&pair[0], &pair[1]);
            if !next.links_to(prior) {
                return broken(
                    next.sequence,
                    format!(
                        "record {} has previous_fuel {} but record {} ended at {}",
                        next.sequence, next.previous_fuel, prior.sequence, prior.new_fuel
                    ),
                );
            }
        }

        ChainReport {
            vehicle_id,
            record_count: records.len(),
            is_linked: true,
            first_broken_sequence: None,
            reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next(kind: FuelRecordKind, new_fuel: f64) -> NextFuelRecord {
        NextFuelRecord {
            kind,
            trip_id: None,
            new_fuel,
            distance_driven: 0.0,
        }
    }

    #[test]
    fn test_first_record_starts_from_zero() {
        let vehicle_id = Uuid::new_v4();
        let record = next(FuelRecordKind::Refuel, 20.0).chain_after(vehicle_id, None);
        assert_eq!(record.sequence, 1);
        assert_eq!(record.previous_fuel, 0.0);
        assert_eq!(record.fuel_delta(), 20.0);
    }

    #[test]
    fn test_chain_report_detects_broken_link() {
        let vehicle_id = Uuid::new_v4();
        let first = next(FuelRecordKind::Refuel, 20.0).chain_after(vehicle_id, None);
        let mut second = next(FuelRecordKind::Consumption, 8.0).chain_after(vehicle_id, Some(&first));
        assert!(ChainReport::from_oldest_first(vehicle_id, &[first.clone(), second.clone()]).is_linked);

        second.previous_fuel = 15.0;
        let report = ChainReport::from_oldest_first(vehicle_id, &[first, second]);
        assert!(!report.is_linked);
        assert_eq!(report.first_broken_sequence, Some(2));
    }
}
