//! Palette editing on top of a fixed quantization.
//!
//! A [`PaletteEditor`] pairs an immutable [`Quantization`] with the user's
//! [`PaletteOverrides`]. Edits only change which color a cluster is drawn
//! with; pixel groupings never move. A new quantization means a new editor,
//! so overrides can never leak onto a different clustering.

use std::collections::BTreeMap;

use image::{Rgb, RgbImage};
use palette::Srgb;

use crate::color::{parse_hex, to_hex};
use crate::error::InputError;
use crate::quantize::{PaletteEntry, Quantization, sort_by_usage};

/// User-chosen replacement colors, keyed by cluster index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PaletteOverrides {
    colors: BTreeMap<usize, Srgb<u8>>,
}

impl PaletteOverrides {
    pub fn get(&self, cluster: usize) -> Option<Srgb<u8>> {
        self.colors.get(&cluster).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Srgb<u8>)> + '_ {
        self.colors.iter().map(|(&k, &v)| (k, v))
    }

    fn insert(&mut self, cluster: usize, color: Srgb<u8>) -> Option<Srgb<u8>> {
        self.colors.insert(cluster, color)
    }

    fn remove(&mut self, cluster: usize) -> Option<Srgb<u8>> {
        self.colors.remove(&cluster)
    }

    fn clear(&mut self) {
        self.colors.clear();
    }
}

#[derive(Clone, Debug)]
pub struct PaletteEditor {
    quantization: Quantization,
    overrides: PaletteOverrides,
}

impl PaletteEditor {
    /// Start editing a fresh quantization with no overrides.
    pub fn new(quantization: Quantization) -> Self {
        Self {
            quantization,
            overrides: PaletteOverrides::default(),
        }
    }

    pub fn quantization(&self) -> &Quantization {
        &self.quantization
    }

    pub fn overrides(&self) -> &PaletteOverrides {
        &self.overrides
    }

    pub fn n_colors(&self) -> usize {
        self.quantization.n_colors()
    }

    fn check_cluster(&self, cluster: usize) -> Result<(), InputError> {
        let len = self.n_colors();
        if cluster < len {
            Ok(())
        } else {
            Err(InputError::UnknownCluster {
                index: cluster,
                len,
            })
        }
    }

    /// Draw `cluster` with `color` from now on.
    pub fn set_override(&mut self, cluster: usize, color: Srgb<u8>) -> Result<(), InputError> {
        self.check_cluster(cluster)?;
        let previous = self.overrides.insert(cluster, color);
        tracing::debug!(
            cluster,
            color = %to_hex(color),
            replaced = previous.is_some(),
            "Set palette override"
        );
        Ok(())
    }

    /// Same as [`set_override`](Self::set_override), taking a hex string.
    pub fn set_override_hex(&mut self, cluster: usize, hex: &str) -> Result<(), InputError> {
        let color = parse_hex(hex)?;
        self.set_override(cluster, color)
    }

    /// Go back to the computed color for `cluster`.
    pub fn clear_override(&mut self, cluster: usize) -> Result<(), InputError> {
        self.check_cluster(cluster)?;
        if self.overrides.remove(cluster).is_some() {
            tracing::debug!(cluster, "Cleared palette override");
        }
        Ok(())
    }

    pub fn clear_overrides(&mut self) {
        tracing::debug!(count = self.overrides.len(), "Cleared all palette overrides");
        self.overrides.clear();
    }

    /// Override color if one is set, otherwise the cluster's centroid.
    pub fn effective_color(&self, cluster: usize) -> Option<Srgb<u8>> {
        let computed = *self.quantization.colors().get(cluster)?;
        Some(self.overrides.get(cluster).unwrap_or(computed))
    }

    /// Current palette with overrides applied, most-used color first.
    pub fn effective_palette(&self) -> Vec<PaletteEntry> {
        let mut entries: Vec<PaletteEntry> = (0..self.n_colors())
            .map(|cluster| PaletteEntry {
                cluster,
                color: self.overrides.get(cluster).unwrap_or(self.quantization.colors()[cluster]),
                fraction: self.quantization.fraction(cluster),
            })
            .collect();
        sort_by_usage(&mut entries);
        entries
    }

    /// Palette as computed by the quantizer, ignoring overrides.
    pub fn representative_palette(&self) -> Vec<PaletteEntry> {
        self.quantization.palette()
    }

    /// Cluster currently drawn with `hex`, preferring the most-used one when
    /// several share the color.
    pub fn cluster_for_hex(&self, hex: &str) -> Result<usize, InputError> {
        let wanted = parse_hex(hex)?;
        self.effective_palette()
            .into_iter()
            .find(|entry| entry.color == wanted)
            .map(|entry| entry.cluster)
            .ok_or_else(|| InputError::ColorNotInPalette(to_hex(wanted)))
    }

    /// Paint every pixel with its cluster's effective color.
    pub fn render_image(&self) -> RgbImage {
        let lut: Vec<Rgb<u8>> = (0..self.n_colors())
            .filter_map(|cluster| self.effective_color(cluster))
            .map(|c| Rgb([c.red, c.green, c.blue]))
            .collect();
        let assignment = self.quantization.assignment();
        let mut raw = Vec::with_capacity(assignment.len() * 3);
        for &idx in assignment.as_slice() {
            raw.extend_from_slice(&lut[idx as usize].0);
        }
        RgbImage::from_raw(assignment.width(), assignment.height(), raw)
            .unwrap_or_else(|| RgbImage::new(assignment.width(), assignment.height()))
    }
}
