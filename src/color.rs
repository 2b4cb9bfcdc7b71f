//! Color helpers shared by the quantizer, the editor and the exporter.
//!
//! Display colors are `Srgb<u8>`. Clustering happens in CIE Lab (D65),
//! reached through linear sRGB.

use palette::{IntoColor, Lab, LinSrgb, Srgb};

use crate::error::InputError;

/// Convert an 8-bit display color to Lab.
pub fn to_lab(color: Srgb<u8>) -> Lab {
    let linear: LinSrgb = color.into_linear::<f32>();
    linear.into_color()
}

/// Convert a Lab color back to an 8-bit display color, clamping anything
/// that falls outside the sRGB gamut.
pub fn from_lab(lab: Lab) -> Srgb<u8> {
    let linear: LinSrgb = lab.into_color();
    let rgb_f32: Srgb<f32> = Srgb::from_linear(linear);
    rgb_f32.into_format::<u8>()
}

/// Squared Euclidean distance in Lab.
#[inline(always)]
pub fn lab_distance_sq(a: &Lab, b: &Lab) -> f32 {
    let dl = a.l - b.l;
    let da = a.a - b.a;
    let db = a.b - b.b;
    dl * dl + da * da + db * db
}

/// Lowercase `#rrggbb`.
pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

/// Parse `#rrggbb`, `rrggbb`, `#rgb` or `rgb` (any case).
pub fn parse_hex(input: &str) -> Result<Srgb<u8>, InputError> {
    let invalid = || InputError::InvalidColor(input.to_string());
    let hex = input.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    match hex.len() {
        6 => Ok(Srgb::new(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        // #abc is shorthand for #aabbcc
        3 => {
            let r = channel(&hex[0..1])?;
            let g = channel(&hex[1..2])?;
            let b = channel(&hex[2..3])?;
            Ok(Srgb::new(r * 17, g * 17, b * 17))
        }
        _ => Err(invalid()),
    }
}
