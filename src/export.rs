//! Single-page PDF export: the reduced image above a palette legend.
//!
//! Page layout (all units in points):
//!
//! ```text
//! +------------------------------+
//! |  margin                      |
//! |     +----------------+       |
//! |     |     image      |       |  scaled to fit, centered horizontally
//! |     +----------------+       |
//! |  [#] #aabbcc 41.2%  [#] ...  |  legend rows flow into columns
//! |  margin                      |
//! +------------------------------+
//! ```

use image::RgbImage;
use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::error::ExportError;
use crate::page::PageSize;
use crate::quantize::{PaletteEntry, sort_by_usage};

const MARGIN: f32 = 50.0;
const SWATCH: f32 = 20.0;
const ROW_PITCH: f32 = 25.0;
const COLUMN_WIDTH: f32 = 160.0;
const LEGEND_GAP: f32 = 20.0;
const FONT_SIZE: f32 = 10.0;
const DEFLATE_LEVEL: u8 = 6;

const IMAGE_NAME: Name<'static> = Name(b"Im1");
const FONT_NAME: Name<'static> = Name(b"F1");

/// Where things go on the page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    pub page: (f32, f32),
    /// Image placement `(x, y, width, height)`, origin bottom-left.
    pub image: (f32, f32, f32, f32),
    pub legend_columns: usize,
    pub legend_rows: usize,
    /// Baseline of the first legend row (its swatch's bottom edge).
    pub legend_top: f32,
}

impl Layout {
    pub fn compute(page: PageSize, image_size: (u32, u32), entries: usize) -> Self {
        let (page_w, page_h) = page.dimensions();
        let avail_w = page_w - 2.0 * MARGIN;

        let legend_columns = ((avail_w / COLUMN_WIDTH).floor() as usize).max(1);
        let legend_rows = entries.div_ceil(legend_columns);
        let legend_h = legend_rows as f32 * ROW_PITCH;

        let avail_h = (page_h - 2.0 * MARGIN - legend_h - LEGEND_GAP).max(1.0);
        let (img_w, img_h) = (image_size.0.max(1) as f32, image_size.1.max(1) as f32);
        let scale = (avail_w / img_w).min(avail_h / img_h);
        let (w, h) = (img_w * scale, img_h * scale);

        let x = (page_w - w) / 2.0;
        let y = page_h - MARGIN - h;
        let legend_top = y - LEGEND_GAP - SWATCH;

        Self {
            page: (page_w, page_h),
            image: (x, y, w, h),
            legend_columns,
            legend_rows,
            legend_top,
        }
    }

    /// Bottom-left corner of the swatch for the `i`-th legend entry.
    fn legend_slot(&self, i: usize) -> (f32, f32) {
        let column = i / self.legend_rows.max(1);
        let row = i % self.legend_rows.max(1);
        (
            MARGIN + column as f32 * COLUMN_WIDTH,
            self.legend_top - row as f32 * ROW_PITCH,
        )
    }
}

/// Legend text for one palette row, e.g. `#ff0000  50.0%`.
pub fn legend_label(entry: &PaletteEntry) -> String {
    format!("{}  {:.1}%", entry.hex(), entry.percentage())
}

/// Render `image` and its palette as a one-page PDF.
///
/// `image` is `None` until something has been quantized; that, like an
/// unknown `page_size`, is an error and produces no bytes.
pub fn render_pdf(
    image: Option<&RgbImage>,
    palette: &[PaletteEntry],
    page_size: &str,
) -> Result<Vec<u8>, ExportError> {
    let image = image.ok_or(ExportError::MissingImage)?;
    let page: PageSize = page_size.parse()?;
    Ok(write_document(image, palette, page))
}

fn write_document(image: &RgbImage, palette: &[PaletteEntry], page: PageSize) -> Vec<u8> {
    let mut entries = palette.to_vec();
    sort_by_usage(&mut entries);
    let layout = Layout::compute(page, image.dimensions(), entries.len());

    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let page_id = Ref::new(3);
    let image_id = Ref::new(4);
    let content_id = Ref::new(5);
    let font_id = Ref::new(6);
    let info_id = Ref::new(7);

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id).kids([page_id]).count(1);
    pdf.document_info(info_id)
        .title(TextStr("Reduced color image"))
        .producer(TextStr("color_reduce"));

    let mut pdf_page = pdf.page(page_id);
    pdf_page.media_box(Rect::new(0.0, 0.0, layout.page.0, layout.page.1));
    pdf_page.parent(page_tree_id);
    pdf_page.contents(content_id);
    let mut resources = pdf_page.resources();
    resources.x_objects().pair(IMAGE_NAME, image_id);
    resources.fonts().pair(FONT_NAME, font_id);
    resources.finish();
    pdf_page.finish();

    pdf.type1_font(font_id).base_font(Name(b"Helvetica"));

    let compressed = compress_to_vec_zlib(image.as_raw(), DEFLATE_LEVEL);
    let mut xobject = pdf.image_xobject(image_id, &compressed);
    xobject.filter(Filter::FlateDecode);
    xobject.width(image.width() as i32);
    xobject.height(image.height() as i32);
    xobject.color_space().device_rgb();
    xobject.bits_per_component(8);
    xobject.finish();

    let mut content = Content::new();
    let (x, y, w, h) = layout.image;
    content.save_state();
    content.transform([w, 0.0, 0.0, h, x, y]);
    content.x_object(IMAGE_NAME);
    content.restore_state();

    content.set_line_width(0.5);
    content.set_stroke_gray(0.5);
    for (i, entry) in entries.iter().enumerate() {
        let (sx, sy) = layout.legend_slot(i);
        let c = entry.color;
        content.set_fill_rgb(
            c.red as f32 / 255.0,
            c.green as f32 / 255.0,
            c.blue as f32 / 255.0,
        );
        content.rect(sx, sy, SWATCH, SWATCH);
        content.fill_nonzero_and_stroke();

        let label = legend_label(entry);
        content.set_fill_gray(0.0);
        content.begin_text();
        content.set_font(FONT_NAME, FONT_SIZE);
        content.next_line(sx + SWATCH + 10.0, sy + 5.0);
        content.show(Str(label.as_bytes()));
        content.end_text();
    }
    pdf.stream(content_id, &content.finish());

    let bytes = pdf.finish();
    tracing::info!(
        page = %page,
        width = image.width(),
        height = image.height(),
        colors = entries.len(),
        bytes = bytes.len(),
        "Rendered PDF"
    );
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use palette::Srgb;

    fn entry(cluster: usize, rgb: (u8, u8, u8), fraction: f64) -> PaletteEntry {
        PaletteEntry {
            cluster,
            color: Srgb::new(rgb.0, rgb.1, rgb.2),
            fraction,
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_pdf_has_header_trailer_and_legend() {
        let img = RgbImage::from_pixel(4, 2, Rgb([255, 0, 0]));
        let palette = [entry(0, (255, 0, 0), 0.75), entry(1, (0, 0, 255), 0.25)];

        let pdf = render_pdf(Some(&img), &palette, "A4").unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert!(contains(&pdf, b"%%EOF"));
        assert!(contains(&pdf, b"/FlateDecode"));
        assert!(contains(&pdf, b"/Helvetica"));
        assert!(contains(&pdf, b"#ff0000  75.0%"));
        assert!(contains(&pdf, b"#0000ff  25.0%"));
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let result = render_pdf(None, &[], "A4");
        assert!(matches!(result, Err(ExportError::MissingImage)));
    }

    #[test]
    fn test_unknown_page_size_is_an_error() {
        let img = RgbImage::new(1, 1);
        let result = render_pdf(Some(&img), &[], "B5");
        assert!(matches!(result, Err(ExportError::UnknownPageSize(s)) if s == "B5"));
    }

    #[test]
    fn test_legend_label_format() {
        assert_eq!(legend_label(&entry(3, (18, 52, 86), 0.12345)), "#123456  12.3%");
    }

    #[test]
    fn test_layout_fits_image_inside_margins() {
        for page in PageSize::ALL {
            for size in [(4000, 1000), (1000, 4000), (10, 10)] {
                let layout = Layout::compute(page, size, 32);
                let (page_w, page_h) = layout.page;
                let (x, y, w, h) = layout.image;
                assert!(x >= MARGIN - 0.01 && x + w <= page_w - MARGIN + 0.01);
                assert!(y + h <= page_h - MARGIN + 0.01);
                // Aspect ratio preserved.
                let ratio = size.0 as f32 / size.1 as f32;
                assert!((w / h - ratio).abs() / ratio < 1e-3);
                // Last legend row stays above the bottom margin.
                let (_, last_y) = layout.legend_slot(31);
                assert!(last_y >= MARGIN - 0.01, "{page} {size:?} {last_y}");
                assert!(layout.legend_top + SWATCH <= y);
            }
        }
    }

    #[test]
    fn test_legend_uses_columns_on_a4() {
        let layout = Layout::compute(PageSize::A4, (100, 100), 32);
        assert_eq!(layout.legend_columns, 3);
        assert_eq!(layout.legend_rows, 11);
    }
}
