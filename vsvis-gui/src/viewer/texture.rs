//! Texture generation for image frames.

use egui::ColorImage;
use ndarray::Array2;

use crate::util::f64_to_f32;
use crate::viewer::Colormap;

/// Finite minimum and maximum of a frame, or `None` if it has no finite
/// values.
#[must_use]
pub fn intensity_range(image: &Array2<f64>) -> Option<(f64, f64)> {
    image
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Rescale a frame to its own intensity range and color it.
///
/// Rows become image rows, so `image[[y, x]]` lands at pixel `(x, y)`.
/// Non-finite values are drawn black; a constant frame maps to the low end
/// of the colormap.
#[must_use]
pub fn generate_frame_image(image: &Array2<f64>, colormap: Colormap, log_scale: bool) -> ColorImage {
    let (height, width) = image.dim();
    let transform = |v: f64| if log_scale { (v.max(0.0) + 1.0).ln() } else { v };
    let (lo, hi) = intensity_range(image).map_or((0.0, 1.0), |(lo, hi)| (transform(lo), transform(hi)));
    let span = if hi > lo { hi - lo } else { 1.0 };

    let mut pixels = Vec::with_capacity(width * height * 4);
    for &value in image {
        if value.is_finite() {
            let val = f64_to_f32((transform(value) - lo) / span);
            pixels.extend_from_slice(&colormap.apply(val));
        } else {
            pixels.extend_from_slice(&[0, 0, 0, 255]);
        }
    }
    ColorImage::from_rgba_unmultiplied([width, height], &pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_range_skips_non_finite() {
        let image = arr2(&[[f64::NAN, 2.0], [-1.0, f64::INFINITY]]);
        assert_eq!(intensity_range(&image), Some((-1.0, 2.0)));
        assert_eq!(intensity_range(&arr2(&[[f64::NAN]])), None);
    }

    #[test]
    fn test_rescaled_grayscale() {
        let image = arr2(&[[10.0, 20.0, 30.0], [30.0, 20.0, 10.0]]);
        let color = generate_frame_image(&image, Colormap::Grayscale, false);
        assert_eq!(color.size, [3, 2]);
        assert_eq!(color.pixels[0], egui::Color32::from_rgb(0, 0, 0));
        assert_eq!(color.pixels[2], egui::Color32::from_rgb(255, 255, 255));
        assert_eq!(color.pixels[1], egui::Color32::from_rgb(128, 128, 128));
    }

    #[test]
    fn test_constant_frame() {
        let image = Array2::from_elem((2, 2), 5.0);
        let color = generate_frame_image(&image, Colormap::Grayscale, true);
        assert!(color
            .pixels
            .iter()
            .all(|&p| p == egui::Color32::from_rgb(0, 0, 0)));
    }
}
