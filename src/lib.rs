//! Reduce an image to a small palette, recolor palette entries, and export
//! the result as a printable PDF.
//!
//! The pipeline is:
//!
//! 1. [`quantize`]: k-means in Lab space, `k` in 2..=32. Every pixel gets a
//!    cluster index and every cluster a representative color.
//! 2. [`PaletteEditor`]: per-cluster color overrides, applied at render time
//!    without moving any pixel to another cluster.
//! 3. [`render_pdf`]: the reduced image plus a swatch/hex/percentage legend
//!    on an A4–A0 page.
//!
//! [`Session`] strings the three together for an interactive front-end; the
//! `wasm` module exposes it to JavaScript as `ReducerSession`.
//!
//! ```no_run
//! use color_reduce::Session;
//!
//! let bytes = std::fs::read("photo.png")?;
//! let mut session = Session::default();
//! session.load(&bytes, 8)?;
//! let top = session.palette()[0].cluster;
//! session.set_override_hex(top, "#204080")?;
//! std::fs::write("reduced.pdf", session.export_pdf("A4")?)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod color;
pub mod editor;
pub mod error;
pub mod export;
pub mod image_io;
pub mod page;
pub mod quantize;
pub mod session;
pub mod wasm;

pub use editor::{PaletteEditor, PaletteOverrides};
pub use error::{ExportError, InputError, ReduceError, Result};
pub use export::render_pdf;
pub use page::PageSize;
pub use quantize::{
    ClusterAssignment, DEFAULT_COLORS, MAX_COLORS, MIN_COLORS, PaletteEntry, QuantizeOptions,
    Quantization, quantize,
};
pub use session::Session;
pub use wasm::ReducerSession;
