use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette
// ---------------------------------------------------------------------------

/// Colorblind-friendly base colours, used before any generated hue.
pub const COLORBLIND_SAFE: [Color32; 8] = [
    Color32::from_rgb(0x33, 0x22, 0x88),
    Color32::from_rgb(0x11, 0x77, 0x33),
    Color32::from_rgb(0x88, 0x22, 0x55),
    Color32::from_rgb(0xAA, 0x44, 0x99),
    Color32::from_rgb(0xCC, 0x66, 0x77),
    Color32::from_rgb(0x44, 0xAA, 0x99),
    Color32::from_rgb(0xDD, 0xCC, 0x77),
    Color32::from_rgb(0x88, 0xCC, 0xEE),
];

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// `n` colours: the colorblind-safe set first, then generated hues.
pub fn series_colors(n: usize) -> Vec<Color32> {
    let mut colors: Vec<Color32> = COLORBLIND_SAFE.iter().copied().take(n).collect();
    if n > COLORBLIND_SAFE.len() {
        colors.extend(generate_palette(n - COLORBLIND_SAFE.len()));
    }
    colors
}

/// Colour of the `i`-th series in a chart.
pub fn series_color(i: usize) -> Color32 {
    COLORBLIND_SAFE[i % COLORBLIND_SAFE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_colors_come_first() {
        let colors = series_colors(3);
        assert_eq!(colors, COLORBLIND_SAFE[..3].to_vec());
    }

    #[test]
    fn extends_with_distinct_generated_hues() {
        let colors = series_colors(11);
        assert_eq!(colors.len(), 11);
        assert_eq!(&colors[..8], &COLORBLIND_SAFE[..]);
        assert_ne!(colors[8], colors[9]);
        assert!(generate_palette(0).is_empty());
    }
}
