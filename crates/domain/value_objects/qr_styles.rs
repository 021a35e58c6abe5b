use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::qr_shapes::QrShape;

pub const FREE_SIZE: i32 = 500;
pub const FREE_COLOR: &str = "#000000";
pub const DEFAULT_PREMIUM_SIZE: i32 = 1000;
pub const PREMIUM_SIZES: [i32; 5] = [500, 800, 1000, 1500, 2000];
pub const MAX_LOGO_REF_LEN: usize = 2 * 1024 * 1024;

/// Visual parameters stored with every code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrStyle {
    pub size: i32,
    pub shape: QrShape,
    pub color: String,
    pub logo_url: Option<String>,
}

impl QrStyle {
    /// The only style the free tier gets.
    pub fn free() -> Self {
        Self {
            size: FREE_SIZE,
            shape: QrShape::Square,
            color: FREE_COLOR.to_string(),
            logo_url: None,
        }
    }

    pub fn premium(
        size: Option<i32>,
        shape: Option<QrShape>,
        color: Option<&str>,
        logo_url: Option<&str>,
    ) -> Result<Self> {
        let size = size.unwrap_or(DEFAULT_PREMIUM_SIZE);
        if !PREMIUM_SIZES.contains(&size) {
            bail!("Unsupported size {size}, expected one of {PREMIUM_SIZES:?}");
        }

        let color = match color {
            Some(raw) => normalize_hex_color(raw)?,
            None => FREE_COLOR.to_string(),
        };

        let logo_url = match logo_url.map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => Some(validate_logo_ref(raw)?),
            None => None,
        };

        Ok(Self {
            size,
            shape: shape.unwrap_or_default(),
            color,
            logo_url,
        })
    }
}

/// Accepts `#RRGGBB` in any case and returns it lowercased.
pub fn normalize_hex_color(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let Some(hex) = trimmed.strip_prefix('#') else {
        bail!("Invalid color: must start with '#'");
    };
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("Invalid color: expected #RRGGBB");
    }
    Ok(format!("#{}", hex.to_ascii_lowercase()))
}

// Logos arrive either as an uploaded image data URL or as a link to one.
fn validate_logo_ref(raw: &str) -> Result<String> {
    if raw.len() > MAX_LOGO_REF_LEN {
        bail!("Invalid logo: reference too large");
    }
    if raw.starts_with("data:image/") || raw.starts_with("https://") {
        return Ok(raw.to_string());
    }
    bail!("Invalid logo: expected an image data URL or https link")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_style_is_fixed() {
        let style = QrStyle::free();
        assert_eq!(style.size, 500);
        assert_eq!(style.shape, QrShape::Square);
        assert_eq!(style.color, "#000000");
        assert!(style.logo_url.is_none());
    }

    #[test]
    fn premium_style_defaults() {
        let style = QrStyle::premium(None, None, None, None).unwrap();
        assert_eq!(style.size, 1000);
        assert_eq!(style.shape, QrShape::Square);
        assert_eq!(style.color, "#000000");
    }

    #[test]
    fn premium_style_accepts_custom_values() {
        let style = QrStyle::premium(
            Some(1500),
            Some(QrShape::Circle),
            Some("#FF00aa"),
            Some("data:image/png;base64,iVBORw0KGgo="),
        )
        .unwrap();
        assert_eq!(style.size, 1500);
        assert_eq!(style.shape, QrShape::Circle);
        assert_eq!(style.color, "#ff00aa");
        assert!(style.logo_url.is_some());
    }

    #[test]
    fn premium_style_rejects_unknown_size() {
        assert!(QrStyle::premium(Some(640), None, None, None).is_err());
    }

    #[test]
    fn invalid_colors_are_rejected() {
        for raw in ["000000", "#000", "#GGGGGG", "#0000000", "red"] {
            assert!(normalize_hex_color(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn blank_logo_is_ignored_and_plain_http_is_rejected() {
        let style = QrStyle::premium(None, None, None, Some("  ")).unwrap();
        assert!(style.logo_url.is_none());
        assert!(QrStyle::premium(None, None, None, Some("http://x/logo.png")).is_err());
    }
}
