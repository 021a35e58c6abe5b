//! Raster output for stored codes.
//!
//! Encoding is delegated to the `qrcode` crate. Shape masking and logo
//! overlays are applied by clients over the returned image.

use std::fmt::Display;

use anyhow::{Result, anyhow};
use mockall::automock;
use qrcode::{EcLevel, QrCode, render::svg, types::QrError};

use crate::domain::value_objects::qr_styles::QrStyle;

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";
const LIGHT_COLOR: &str = "#ffffff";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    pub content_type: String,
    pub data: String,
}

/// The payload does not fit in the largest symbol at the chosen error
/// correction level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityExceeded {
    pub payload_len: usize,
    pub with_logo: bool,
}

impl Display for CapacityExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "URL of {} bytes is too long to encode{}",
            self.payload_len,
            if self.with_logo { " with a logo" } else { "" }
        )
    }
}

impl std::error::Error for CapacityExceeded {}

pub fn is_capacity_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CapacityExceeded>().is_some()
}

#[automock]
pub trait QrRenderer: Send + Sync {
    fn render(&self, url: &str, style: &QrStyle) -> Result<QrImage>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QrSvgRenderer;

impl QrRenderer for QrSvgRenderer {
    fn render(&self, url: &str, style: &QrStyle) -> Result<QrImage> {
        // A centred logo hides modules, so reserve more redundancy for it.
        let ec_level = if style.logo_url.is_some() {
            EcLevel::H
        } else {
            EcLevel::M
        };

        let code = QrCode::with_error_correction_level(url.as_bytes(), ec_level).map_err(
            |err| match err {
                QrError::DataTooLong => anyhow::Error::new(CapacityExceeded {
                    payload_len: url.len(),
                    with_logo: style.logo_url.is_some(),
                }),
                other => anyhow!("failed to encode QR code: {other}"),
            },
        )?;

        let size = u32::try_from(style.size).map_err(|_| anyhow!("invalid size {}", style.size))?;
        let data = code
            .render::<svg::Color<'_>>()
            .min_dimensions(size, size)
            .dark_color(svg::Color(&style.color))
            .light_color(svg::Color(LIGHT_COLOR))
            .quiet_zone(true)
            .build();

        Ok(QrImage {
            content_type: SVG_CONTENT_TYPE.to_string(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_svg_with_the_module_color() {
        let mut style = QrStyle::free();
        style.color = "#123abc".to_string();

        let image = QrSvgRenderer
            .render("https://example.com/", &style)
            .unwrap();

        assert_eq!(image.content_type, "image/svg+xml");
        assert!(image.data.contains("<svg"));
        assert!(image.data.contains("#123abc"));
    }

    #[test]
    fn oversized_payload_with_logo_reports_capacity() {
        let mut style = QrStyle::free();
        style.logo_url = Some("https://example.com/logo.png".to_string());
        let url = format!("https://example.com/{}", "a".repeat(1500));

        let err = QrSvgRenderer.render(&url, &style).unwrap_err();
        assert!(is_capacity_error(&err));

        style.logo_url = None;
        assert!(QrSvgRenderer.render(&url, &style).is_ok());
    }
}
