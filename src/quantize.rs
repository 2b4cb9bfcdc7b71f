//! Palette reduction by k-means clustering in Lab space.
//!
//! [`quantize`] produces a [`Quantization`]: one cluster index per pixel plus
//! a representative display color for each cluster. The two are computed
//! together and never change afterwards; palette edits live in
//! [`crate::editor::PaletteOverrides`].

use std::collections::HashMap;

use image::RgbImage;
use kmeans_colors::{Kmeans, get_kmeans};
use palette::{Lab, Srgb};
use serde::{Deserialize, Serialize};

use crate::color::{from_lab, lab_distance_sq, to_hex, to_lab};
use crate::error::InputError;

/// Smallest palette the reducer will produce.
pub const MIN_COLORS: usize = 2;
/// Largest palette the reducer will produce.
pub const MAX_COLORS: usize = 32;
/// Palette size used when the caller does not pick one.
pub const DEFAULT_COLORS: usize = 8;

/// Tuning for the k-means runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizeOptions {
    /// Independent k-means runs; the lowest-scoring one wins.
    pub runs: u32,
    /// Iteration cap for each run.
    pub max_iter: usize,
    /// Convergence threshold passed to `kmeans_colors`.
    pub converge: f32,
    /// Seed of the first run. Run `n` uses `seed + n`.
    pub seed: u64,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self {
            runs: 3,
            max_iter: 20,
            converge: 1e-4,
            seed: 42,
        }
    }
}

/// Check that `n_colors` is a palette size we support.
pub fn validate_color_count(n_colors: usize) -> Result<(), InputError> {
    if (MIN_COLORS..=MAX_COLORS).contains(&n_colors) {
        Ok(())
    } else {
        Err(InputError::ColorCount(n_colors))
    }
}

/// Cluster index of every pixel, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterAssignment {
    width: u32,
    height: u32,
    indices: Vec<u8>,
}

impl ClusterAssignment {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.indices
    }

    /// Cluster of the pixel at `(x, y)`.
    pub fn cluster_at(&self, x: u32, y: u32) -> usize {
        self.indices[(y as usize) * (self.width as usize) + x as usize] as usize
    }

    /// Number of different cluster indices actually used by some pixel.
    pub fn distinct_clusters(&self) -> usize {
        let mut seen = [false; 256];
        for &idx in &self.indices {
            seen[idx as usize] = true;
        }
        seen.iter().filter(|&&s| s).count()
    }
}

/// One palette row: a cluster, the color it is drawn with, and its share of
/// the image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PaletteEntry {
    pub cluster: usize,
    pub color: Srgb<u8>,
    /// Pixels in the cluster divided by total pixels.
    pub fraction: f64,
}

impl PaletteEntry {
    pub fn hex(&self) -> String {
        to_hex(self.color)
    }

    pub fn percentage(&self) -> f64 {
        self.fraction * 100.0
    }
}

/// Sort palette rows most-used first, keeping cluster order among ties.
pub fn sort_by_usage(entries: &mut [PaletteEntry]) {
    entries.sort_by(|a, b| {
        b.fraction
            .total_cmp(&a.fraction)
            .then(a.cluster.cmp(&b.cluster))
    });
}

/// Result of one quantization run over one image.
#[derive(Clone, Debug)]
pub struct Quantization {
    assignment: ClusterAssignment,
    colors: Vec<Srgb<u8>>,
    counts: Vec<usize>,
}

impl Quantization {
    /// Number of clusters (the requested palette size).
    pub fn n_colors(&self) -> usize {
        self.colors.len()
    }

    pub fn assignment(&self) -> &ClusterAssignment {
        &self.assignment
    }

    /// Representative (centroid) color of every cluster, by cluster index.
    pub fn colors(&self) -> &[Srgb<u8>] {
        &self.colors
    }

    /// Pixel count of every cluster, by cluster index.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Share of the image covered by `cluster`.
    pub fn fraction(&self, cluster: usize) -> f64 {
        let total = self.assignment.len();
        if total == 0 {
            return 0.0;
        }
        self.counts.get(cluster).copied().unwrap_or(0) as f64 / total as f64
    }

    /// Palette built from the computed centroids, sorted by usage.
    pub fn palette(&self) -> Vec<PaletteEntry> {
        let mut entries: Vec<PaletteEntry> = self
            .colors
            .iter()
            .enumerate()
            .map(|(cluster, &color)| PaletteEntry {
                cluster,
                color,
                fraction: self.fraction(cluster),
            })
            .collect();
        sort_by_usage(&mut entries);
        entries
    }
}

/// Reduce `image` to `n_colors` clusters.
///
/// Pixels are clustered in Lab so that distances follow perceived color
/// difference. The outcome depends only on the image, `n_colors` and
/// `options`.
///
/// When the image has no more distinct colors than requested, every distinct
/// color becomes its own cluster (in first-seen order) and the leftover
/// clusters stay empty, reusing the color of cluster 0.
pub fn quantize(
    image: &RgbImage,
    n_colors: usize,
    options: &QuantizeOptions,
) -> Result<Quantization, InputError> {
    validate_color_count(n_colors)?;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(InputError::EmptyImage);
    }

    let (colors, indices) = match exact_palette(image, n_colors) {
        Some(exact) => {
            tracing::debug!(n_colors, "Image has few colors, skipping k-means");
            exact
        }
        None => cluster_lab(image, n_colors, options),
    };

    let mut counts = vec![0usize; colors.len()];
    for &idx in &indices {
        counts[idx as usize] += 1;
    }

    let quantization = Quantization {
        assignment: ClusterAssignment {
            width,
            height,
            indices,
        },
        colors,
        counts,
    };
    tracing::info!(
        width,
        height,
        n_colors,
        used = quantization.assignment.distinct_clusters(),
        "Quantized image"
    );
    Ok(quantization)
}

/// Palette and indices when the image has at most `n_colors` distinct
/// colors, `None` otherwise.
fn exact_palette(image: &RgbImage, n_colors: usize) -> Option<(Vec<Srgb<u8>>, Vec<u8>)> {
    let mut lookup: HashMap<[u8; 3], u8> = HashMap::new();
    let mut colors: Vec<Srgb<u8>> = Vec::new();
    let mut indices: Vec<u8> = Vec::with_capacity(image.len() / 3);

    for pixel in image.pixels() {
        let idx = match lookup.get(&pixel.0) {
            Some(&idx) => idx,
            None => {
                if colors.len() == n_colors {
                    return None;
                }
                let idx = colors.len() as u8;
                lookup.insert(pixel.0, idx);
                colors.push(Srgb::new(pixel[0], pixel[1], pixel[2]));
                idx
            }
        };
        indices.push(idx);
    }

    let filler = colors[0];
    colors.resize(n_colors, filler);
    Some((colors, indices))
}

fn cluster_lab(
    image: &RgbImage,
    n_colors: usize,
    options: &QuantizeOptions,
) -> (Vec<Srgb<u8>>, Vec<u8>) {
    let lab_pixels: Vec<Lab> = image
        .pixels()
        .map(|p| to_lab(Srgb::new(p[0], p[1], p[2])))
        .collect();

    let mut best = Kmeans::<Lab>::new();
    for run in 0..options.runs.max(1) {
        let seed = options.seed.wrapping_add(run as u64);
        let result = get_kmeans(
            n_colors,
            options.max_iter,
            options.converge,
            false,
            &lab_pixels,
            seed,
        );
        tracing::debug!(run, seed, score = result.score, "k-means run finished");
        if result.score < best.score {
            best = result;
        }
    }

    // Final labels come from the final centroids, not the last iteration.
    let indices: Vec<u8> = lab_pixels
        .iter()
        .map(|lab| nearest_centroid(lab, &best.centroids))
        .collect();
    let colors = best.centroids.iter().map(|&lab| from_lab(lab)).collect();
    (colors, indices)
}

/// Index of the closest centroid; the lowest index wins ties.
fn nearest_centroid(lab: &Lab, centroids: &[Lab]) -> u8 {
    let mut best_idx = 0;
    let mut best_dist = f32::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = lab_distance_sq(lab, centroid);
        if dist < best_dist {
            best_dist = dist;
            best_idx = idx;
        }
    }
    best_idx as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use pretty_assertions::assert_eq;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                ((x + y) * 127 / (width + height)) as u8,
            ])
        })
    }

    #[test]
    fn test_red_blue_two_by_two() {
        let img = RgbImage::from_fn(2, 2, |_, y| if y == 0 { RED } else { BLUE });
        let q = quantize(&img, 2, &QuantizeOptions::default()).unwrap();

        let palette = q.palette();
        assert_eq!(palette.len(), 2);
        for entry in &palette {
            assert!((entry.fraction - 0.5).abs() < 1e-9);
        }
        let mut hexes: Vec<String> = palette.iter().map(|e| e.hex()).collect();
        hexes.sort();
        assert_eq!(hexes, vec!["#0000ff".to_string(), "#ff0000".to_string()]);

        let a = q.assignment();
        assert_eq!(a.cluster_at(0, 0), a.cluster_at(1, 0));
        assert_eq!(a.cluster_at(0, 1), a.cluster_at(1, 1));
        assert_ne!(a.cluster_at(0, 0), a.cluster_at(0, 1));
    }

    #[test]
    fn test_rejects_out_of_range_color_count() {
        let img = gradient(4, 4);
        for k in [0, 1, 33, 100] {
            assert!(matches!(
                quantize(&img, k, &QuantizeOptions::default()),
                Err(InputError::ColorCount(n)) if n == k
            ));
        }
    }

    #[test]
    fn test_rejects_empty_image() {
        let img = RgbImage::new(0, 5);
        assert!(matches!(
            quantize(&img, 4, &QuantizeOptions::default()),
            Err(InputError::EmptyImage)
        ));
    }

    #[test]
    fn test_kmeans_uses_at_most_k_clusters_and_fractions_sum_to_one() {
        let img = gradient(32, 24);
        for k in [2, 5, 8, 16, 32] {
            let q = quantize(&img, k, &QuantizeOptions::default()).unwrap();
            assert_eq!(q.n_colors(), k);
            assert_eq!(q.assignment().len(), 32 * 24);
            assert!(q.assignment().distinct_clusters() <= k);
            assert!(q.assignment().as_slice().iter().all(|&i| (i as usize) < k));

            let sum: f64 = q.palette().iter().map(|e| e.fraction).sum();
            assert!((sum - 1.0).abs() < 1e-6, "k={k} sum={sum}");
        }
    }

    #[test]
    fn test_same_input_gives_same_result() {
        let img = gradient(20, 20);
        let options = QuantizeOptions::default();
        let first = quantize(&img, 6, &options).unwrap();
        let second = quantize(&img, 6, &options).unwrap();
        assert_eq!(first.assignment(), second.assignment());
        assert_eq!(first.palette(), second.palette());
    }

    #[test]
    fn test_nearest_centroid_prefers_lowest_index_on_ties() {
        let centroids = [
            Lab::new(50.0, 10.0, 0.0),
            Lab::new(50.0, -10.0, 0.0),
            Lab::new(90.0, 0.0, 0.0),
        ];
        assert_eq!(nearest_centroid(&Lab::new(50.0, 0.0, 0.0), &centroids), 0);
        assert_eq!(nearest_centroid(&Lab::new(50.0, -8.0, 1.0), &centroids), 1);
        assert_eq!(nearest_centroid(&Lab::new(85.0, 0.0, 0.0), &centroids), 2);
    }

    #[test]
    fn test_few_colors_yield_empty_clusters() {
        let img = RgbImage::from_fn(3, 1, |x, _| if x == 0 { RED } else { BLUE });
        let q = quantize(&img, 5, &QuantizeOptions::default()).unwrap();

        assert_eq!(q.n_colors(), 5);
        assert_eq!(q.counts(), &[1, 2, 0, 0, 0]);
        assert_eq!(q.colors()[0], Srgb::new(255, 0, 0));
        assert_eq!(q.colors()[1], Srgb::new(0, 0, 255));
        // Unused clusters repeat cluster 0.
        assert!(q.colors()[2..].iter().all(|&c| c == q.colors()[0]));

        let palette = q.palette();
        assert_eq!(palette[0].cluster, 1);
        assert_eq!(palette.iter().filter(|e| e.fraction == 0.0).count(), 3);
    }

    #[test]
    fn test_single_color_image() {
        let img = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let q = quantize(&img, 3, &QuantizeOptions::default()).unwrap();
        assert_eq!(q.assignment().distinct_clusters(), 1);
        let top = q.palette()[0];
        assert_eq!(top.color, Srgb::new(10, 20, 30));
        assert_eq!(top.fraction, 1.0);
    }

    #[test]
    fn test_palette_sorted_by_usage() {
        let img = RgbImage::from_fn(10, 1, |x, _| {
            if x < 7 { Rgb([0, 200, 0]) } else { Rgb([250, 250, 250]) }
        });
        let palette = quantize(&img, 2, &QuantizeOptions::default())
            .unwrap()
            .palette();
        assert_eq!(palette[0].hex(), "#00c800");
        assert!((palette[0].percentage() - 70.0).abs() < 1e-9);
        assert!((palette[1].percentage() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: QuantizeOptions = serde_json::from_str(r#"{"runs": 5}"#).unwrap();
        assert_eq!(
            options,
            QuantizeOptions {
                runs: 5,
                ..QuantizeOptions::default()
            }
        );
    }
}
