//! Contexto del llamador
//!
//! La autenticación ocurre en el gateway anterior a este servicio. Aquí solo
//! se leen las cabeceras que el gateway reenvía (`x-subject-id`,
//! `x-subject-admin`) y se inyecta un `CallerContext` en las extensions.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};
use uuid::Uuid;
use woothee::parser::Parser;

use crate::models::DeviceInfo;
use crate::utils::errors::AppError;

pub const SUBJECT_ID_HEADER: &str = "x-subject-id";
pub const SUBJECT_ADMIN_HEADER: &str = "x-subject-admin";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Llamador ya autenticado por el gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    pub subject_id: Uuid,
    pub is_admin: bool,
}

impl CallerContext {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let subject_id = headers
            .get(SUBJECT_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(format!("{} header is required", SUBJECT_ID_HEADER)))?;
        let subject_id = Uuid::parse_str(subject_id.trim())
            .map_err(|_| AppError::Unauthorized(format!("{} is not a valid id", SUBJECT_ID_HEADER)))?;

        let is_admin = headers
            .get(SUBJECT_ADMIN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);

        Ok(Self { subject_id, is_admin })
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if !self.is_admin {
            return Err(AppError::Forbidden("administrator permission required".to_string()));
        }
        Ok(())
    }
}

/// Información del dispositivo a partir de las cabeceras de la request
pub fn device_info_from_headers(headers: &HeaderMap) -> DeviceInfo {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    // El primer salto de x-forwarded-for es el cliente
    let ip_address = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());

    let (os, device_type, browser) = match user_agent.as_deref().and_then(|ua| Parser::new().parse(ua)) {
        Some(parsed) => (
            known(parsed.os),
            known(parsed.category).map(|category| device_kind(&category)),
            known(parsed.name),
        ),
        None => (None, None, None),
    };

    DeviceInfo {
        user_agent,
        ip_address,
        os,
        device_type,
        browser,
    }
}

/// woothee usa "UNKNOWN" para los campos que no reconoce
fn known(value: impl AsRef<str>) -> Option<String> {
    let value = value.as_ref().trim();
    (!value.is_empty() && value != "UNKNOWN").then(|| value.to_string())
}

fn device_kind(category: &str) -> String {
    match category {
        "pc" => "desktop",
        "smartphone" | "mobilephone" => "mobile",
        "crawler" => "bot",
        other => other,
    }
    .to_string()
}

/// Middleware que exige el contexto del llamador
pub async fn caller_context_middleware(mut request: Request, next: Next) -> Result<Response, AppError> {
    let caller = CallerContext::from_headers(request.headers())?;
    let device_info = device_info_from_headers(request.headers());

    request.extensions_mut().insert(caller);
    request.extensions_mut().insert(device_info);

    Ok(next.run(request).await)
}

/// Middleware para verificar permisos de admin
pub async fn admin_only_middleware(
    Extension(caller): Extension<CallerContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    caller.require_admin()?;
    Ok(next.run(request).await)
}
