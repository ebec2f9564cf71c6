use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
/// Series in a grouped figure are coloured by their index.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            to_color32(hsl.into_color())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Diverging gradient for correlation heatmaps
// ---------------------------------------------------------------------------

/// Map a correlation in [-1, 1] to a blue–white–red gradient.
/// NaN (degenerate pair) renders as neutral gray.
pub fn diverging_color(r: f64) -> Color32 {
    if !r.is_finite() {
        return Color32::GRAY;
    }
    let r = r.clamp(-1.0, 1.0) as f32;

    let blue: LinSrgb = Hsl::new(225.0, 0.70, 0.45).into_color();
    let white = LinSrgb::new(0.94, 0.94, 0.94);
    let red: LinSrgb = Hsl::new(5.0, 0.75, 0.50).into_color();

    let mixed = if r < 0.0 {
        white.mix(blue, -r)
    } else {
        white.mix(red, r)
    };
    to_color32(Srgb::from_linear(mixed))
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}
