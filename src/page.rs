use std::fmt;
use std::str::FromStr;

use crate::error::ExportError;

/// ISO 216 page sizes offered for export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A2,
    A1,
    A0,
}

impl PageSize {
    pub const ALL: [PageSize; 5] = [
        PageSize::A4,
        PageSize::A3,
        PageSize::A2,
        PageSize::A1,
        PageSize::A0,
    ];

    /// Portrait `(width, height)` in PostScript points (1/72 inch).
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.2756, 841.8898),
            PageSize::A3 => (841.8898, 1190.5512),
            PageSize::A2 => (1190.5512, 1683.7795),
            PageSize::A1 => (1683.7795, 2383.937),
            PageSize::A0 => (2383.937, 3370.3938),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PageSize::A4 => "A4",
            PageSize::A3 => "A3",
            PageSize::A2 => "A2",
            PageSize::A1 => "A1",
            PageSize::A0 => "A0",
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PageSize {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        PageSize::ALL
            .into_iter()
            .find(|size| size.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ExportError::UnknownPageSize(s.to_string()))
    }
}
