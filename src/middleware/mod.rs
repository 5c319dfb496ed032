//! Middleware del sistema
//!
//! Este módulo contiene el middleware de contexto del llamador y CORS.

pub mod caller;
pub mod cors;

pub use caller::*;
pub use cors::*;
