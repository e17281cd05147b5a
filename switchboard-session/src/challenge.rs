//! Scannable authentication challenge.

use crate::error::{SessionError, SessionResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use qrcode::{QrCode, render::svg};
use serde::Serialize;

/// A challenge payload emitted by the transport while it waits for the
/// user to scan a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    payload: String,
    issued_at: DateTime<Utc>,
}

impl Challenge {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            issued_at: Utc::now(),
        }
    }

    /// Raw payload as produced by the transport
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Render the payload as an SVG QR code.
    pub fn to_svg(&self) -> SessionResult<String> {
        let code = QrCode::new(self.payload.as_bytes())
            .map_err(|e| SessionError::Challenge(e.to_string()))?;

        Ok(code.render::<svg::Color>().min_dimensions(200, 200).build())
    }

    /// Render the payload as a `data:image/svg+xml;base64,...` URL.
    pub fn to_data_url(&self) -> SessionResult<String> {
        let svg = self.to_svg()?;
        Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)))
    }
}
