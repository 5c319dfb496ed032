//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validar cantidades numéricas
//! del ledger y los datos de check-in / check-out.

use validator::{Validate, ValidationError};

use super::errors::{invalid_input_error, AppResult};

/// Máximo de imágenes por etapa de un viaje (check-in o check-out)
pub const MAX_IMAGES_PER_STAGE: usize = 5;

/// Validar que un valor sea un número finito
pub fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        let mut error = ValidationError::new("finite");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un string no esté vacío ni sea solo espacios
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_blank");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Distancia recorrida: finita y no negativa
pub fn ensure_distance(field: &str, value: f64) -> AppResult<f64> {
    if validate_finite(value).is_err() || value < 0.0 {
        return Err(invalid_input_error(format!(
            "{} must be a finite, non-negative number (got {})",
            field, value
        )));
    }
    Ok(value)
}

/// Combustible añadido: finito y estrictamente positivo
pub fn ensure_fuel_added(value: f64) -> AppResult<f64> {
    if validate_finite(value).is_err() || value <= 0.0 {
        return Err(invalid_input_error(format!(
            "fuel_added must be a finite, positive number (got {})",
            value
        )));
    }
    Ok(value)
}

/// Tasa de consumo (distancia por unidad de combustible): finita y positiva
pub fn ensure_consumption_rate(value: f64) -> AppResult<f64> {
    if validate_finite(value).is_err() || value <= 0.0 {
        return Err(invalid_input_error(format!(
            "vehicle consumption rate must be positive (got {})",
            value
        )));
    }
    Ok(value)
}

/// Ejecuta las validaciones derivadas y además verifica los textos obligatorios
pub fn ensure_valid<T: Validate>(value: &T, required_text: &[(&str, &str)]) -> AppResult<()> {
    value.validate()?;
    for (field, text) in required_text {
        if validate_not_blank(text).is_err() {
            return Err(invalid_input_error(format!("{} is required", field)));
        }
    }
    Ok(())
}

/// Verificar que la lista combinada de imágenes no supere el límite
pub fn ensure_image_limit(current: usize, added: usize) -> AppResult<()> {
    if current + added > MAX_IMAGES_PER_STAGE {
        return Err(invalid_input_error(format!(
            "at most {} images are allowed per stage ({} already stored, {} added)",
            MAX_IMAGES_PER_STAGE, current, added
        )));
    }
    Ok(())
}
