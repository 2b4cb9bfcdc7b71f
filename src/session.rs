//! In-memory state for one user working on one image.

use std::path::Path;

use image::RgbImage;
use palette::Srgb;

use crate::editor::{PaletteEditor, PaletteOverrides};
use crate::error::{ExportError, InputError, Result};
use crate::export::render_pdf;
use crate::image_io::decode_upload;
use crate::quantize::{DEFAULT_COLORS, PaletteEntry, QuantizeOptions, quantize, validate_color_count};

/// Upload → quantize → edit → export, all held in memory.
///
/// Uploading a new image or changing the color count replaces the editor
/// wholesale, which drops every override.
#[derive(Clone, Debug)]
pub struct Session {
    options: QuantizeOptions,
    n_colors: usize,
    source: Option<RgbImage>,
    editor: Option<PaletteEditor>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(QuantizeOptions::default())
    }
}

impl Session {
    pub fn new(options: QuantizeOptions) -> Self {
        Self {
            options,
            n_colors: DEFAULT_COLORS,
            source: None,
            editor: None,
        }
    }

    pub fn options(&self) -> &QuantizeOptions {
        &self.options
    }

    pub fn n_colors(&self) -> usize {
        self.n_colors
    }

    /// The uploaded image, untouched.
    pub fn source(&self) -> Option<&RgbImage> {
        self.source.as_ref()
    }

    pub fn editor(&self) -> Option<&PaletteEditor> {
        self.editor.as_ref()
    }

    /// Decode an uploaded PNG/JPEG and make it the current image. The
    /// previous quantization is discarded.
    pub fn upload(&mut self, bytes: &[u8]) -> Result<()> {
        let img = decode_upload(bytes)?;
        self.set_image(img);
        Ok(())
    }

    /// Make `img` the current image. It is not quantized until
    /// [`quantize`](Self::quantize) is called.
    pub fn set_image(&mut self, img: RgbImage) {
        tracing::debug!(width = img.width(), height = img.height(), "New source image");
        self.source = Some(img);
        self.editor = None;
    }

    /// Quantize the current image to `n_colors`, resetting all overrides.
    pub fn quantize(&mut self, n_colors: usize) -> Result<()> {
        validate_color_count(n_colors)?;
        let source = self.source.as_ref().ok_or(InputError::NoImage)?;
        let quantization = quantize(source, n_colors, &self.options)?;
        self.n_colors = n_colors;
        self.editor = Some(PaletteEditor::new(quantization));
        Ok(())
    }

    /// Upload and quantize in one step, as happens when a file is dropped in.
    pub fn load(&mut self, bytes: &[u8], n_colors: usize) -> Result<()> {
        validate_color_count(n_colors)?;
        self.upload(bytes)?;
        self.quantize(n_colors)
    }

    fn editor_mut(&mut self) -> Result<&mut PaletteEditor, InputError> {
        self.editor.as_mut().ok_or(InputError::NotQuantized)
    }

    pub fn set_override(&mut self, cluster: usize, color: Srgb<u8>) -> Result<()> {
        self.editor_mut()?.set_override(cluster, color)?;
        Ok(())
    }

    pub fn set_override_hex(&mut self, cluster: usize, hex: &str) -> Result<()> {
        self.editor_mut()?.set_override_hex(cluster, hex)?;
        Ok(())
    }

    pub fn clear_override(&mut self, cluster: usize) -> Result<()> {
        self.editor_mut()?.clear_override(cluster)?;
        Ok(())
    }

    pub fn clear_overrides(&mut self) {
        if let Some(editor) = self.editor.as_mut() {
            editor.clear_overrides();
        }
    }

    pub fn overrides(&self) -> Option<&PaletteOverrides> {
        self.editor.as_ref().map(PaletteEditor::overrides)
    }

    pub fn cluster_for_hex(&self, hex: &str) -> Result<usize> {
        let editor = self.editor.as_ref().ok_or(InputError::NotQuantized)?;
        Ok(editor.cluster_for_hex(hex)?)
    }

    /// Effective palette, most-used first. Empty before quantization.
    pub fn palette(&self) -> Vec<PaletteEntry> {
        self.editor
            .as_ref()
            .map(PaletteEditor::effective_palette)
            .unwrap_or_default()
    }

    /// The reduced image with overrides applied, if quantized.
    pub fn render_image(&self) -> Option<RgbImage> {
        self.editor.as_ref().map(PaletteEditor::render_image)
    }

    /// PDF bytes for the current reduced image on `page_size`.
    pub fn export_pdf(&self, page_size: &str) -> Result<Vec<u8>, ExportError> {
        let rendered = self.render_image();
        render_pdf(rendered.as_ref(), &self.palette(), page_size)
    }

    /// Write the PDF to `path`. Nothing is created if rendering fails.
    pub fn save_pdf(&self, path: &Path, page_size: &str) -> Result<(), ExportError> {
        let bytes = self.export_pdf(page_size)?;
        std::fs::write(path, bytes)?;
        tracing::info!(path = %path.display(), "Saved PDF");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReduceError;
    use crate::image_io::encode_png;
    use image::Rgb;

    fn checker() -> RgbImage {
        RgbImage::from_fn(8, 8, |x, y| {
            if (x + y) % 2 == 0 { Rgb([240, 240, 240]) } else { Rgb([20, 60, 120]) }
        })
    }

    #[test]
    fn test_fresh_session_has_nothing() {
        let session = Session::default();
        assert_eq!(session.n_colors(), DEFAULT_COLORS);
        assert!(session.source().is_none());
        assert!(session.render_image().is_none());
        assert!(session.palette().is_empty());
    }

    #[test]
    fn test_quantize_without_image() {
        let mut session = Session::default();
        assert!(matches!(
            session.quantize(4),
            Err(ReduceError::InvalidInput(InputError::NoImage))
        ));
    }

    #[test]
    fn test_override_before_quantize() {
        let mut session = Session::default();
        session.set_image(checker());
        assert!(matches!(
            session.set_override(0, Srgb::new(0, 0, 0)),
            Err(ReduceError::InvalidInput(InputError::NotQuantized))
        ));
    }

    #[test]
    fn test_upload_discards_previous_quantization() {
        let mut session = Session::default();
        session.set_image(checker());
        session.quantize(2).unwrap();
        assert!(session.render_image().is_some());

        session.upload(&encode_png(&checker()).unwrap()).unwrap();
        assert!(session.render_image().is_none());
        assert!(matches!(session.export_pdf("A4"), Err(ExportError::MissingImage)));
    }

    #[test]
    fn test_requantize_resets_overrides() {
        let mut session = Session::default();
        session.set_image(checker());
        session.quantize(2).unwrap();
        session.set_override_hex(0, "#ff00ff").unwrap();
        assert_eq!(session.overrides().map(PaletteOverrides::len), Some(1));

        session.quantize(3).unwrap();
        assert_eq!(session.n_colors(), 3);
        assert_eq!(session.overrides().map(PaletteOverrides::len), Some(0));
        assert!(session.palette().iter().all(|e| e.hex() != "#ff00ff"));
    }

    #[test]
    fn test_invalid_color_count_keeps_state() {
        let mut session = Session::default();
        session.set_image(checker());
        session.quantize(2).unwrap();
        session.set_override_hex(1, "#010203").unwrap();

        assert!(matches!(
            session.quantize(40),
            Err(ReduceError::InvalidInput(InputError::ColorCount(40)))
        ));
        assert_eq!(session.n_colors(), 2);
        assert_eq!(session.overrides().map(PaletteOverrides::len), Some(1));
    }

    #[test]
    fn test_clear_overrides_is_noop_before_quantize() {
        let mut session = Session::default();
        session.clear_overrides();
        assert!(session.overrides().is_none());
    }
}
