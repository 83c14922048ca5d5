// ============================================================
// Layer 6: Loss Curve Plot
// ============================================================
// Renders the per-epoch average training loss as a PNG:
// epochs on x, loss on y, a framed plot area with labelled
// ticks, "epoch" / "loss" axis titles and a blue "Train loss"
// line with its legend entry.
//
// Drawing uses imageproc primitives on an image::RgbImage.
// Text needs a TrueType font: an explicit path, else the first
// of FONT_CANDIDATES that exists. Without one the curve is still
// drawn, just unlabelled.

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{
        draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
        text_size,
    },
    rect::Rect,
};
use std::{fs, path::Path};

pub const WIDTH:  u32 = 600;
pub const HEIGHT: u32 = 500;
const MARGIN:     f32 = 50.0;
const X_TICKS:    usize = 10;
const Y_TICKS:    usize = 5;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GREY:  Rgb<u8> = Rgb([220, 220, 220]);
const BLUE:  Rgb<u8> = Rgb([31, 119, 180]);

const TICK_SCALE:  f32 = 12.0;
const LABEL_SCALE: f32 = 15.0;

const FONT_CANDIDATES: [&str; 7] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

fn read_font(path: &Path) -> Result<FontVec> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read font '{}'", path.display()))?;
    FontVec::try_from_vec(bytes)
        .with_context(|| format!("'{}' is not a TrueType/OpenType font", path.display()))
}

/// Font for plot text: `explicit` first, then the system candidates.
pub fn load_font(explicit: Option<&Path>) -> Option<FontVec> {
    if let Some(path) = explicit {
        match read_font(path) {
            Ok(font) => return Some(font),
            Err(e)   => tracing::warn!("{e:#}; trying system fonts"),
        }
    }

    let font = FONT_CANDIDATES
        .iter()
        .map(Path::new)
        .filter(|p| p.is_file())
        .find_map(|p| read_font(p).ok());
    if font.is_none() {
        tracing::warn!("No font found; the loss curve will have no labels");
    }
    font
}

/// Tick value text: whole numbers without decimals.
fn tick_label(v: f32, decimals: usize) -> String {
    if (v - v.round()).abs() < 1e-4 && decimals <= 1 {
        format!("{:.0}", v)
    } else {
        format!("{:.*}", decimals, v)
    }
}

/// Maps data coordinates onto the framed plot area.
#[derive(Debug, Clone, Copy)]
struct PlotArea {
    x_min: f32,
    x_max: f32,
    y_min: f32,
    y_max: f32,
}

impl PlotArea {
    fn fit(points: &[(f64, f64)]) -> Self {
        let (mut x_min, mut x_max) = (f32::INFINITY, f32::NEG_INFINITY);
        let (mut y_min, mut y_max) = (f32::INFINITY, f32::NEG_INFINITY);
        for &(x, y) in points {
            x_min = x_min.min(x as f32);
            x_max = x_max.max(x as f32);
            y_min = y_min.min(y as f32);
            y_max = y_max.max(y as f32);
        }
        // Degenerate ranges still need a non-zero span
        if x_max - x_min < f32::EPSILON {
            x_min -= 1.0;
            x_max += 1.0;
        }
        if y_max - y_min < f32::EPSILON {
            y_min -= 0.5;
            y_max += 0.5;
        }
        Self { x_min, x_max, y_min, y_max }
    }

    fn to_pixel(&self, x: f64, y: f64) -> (f32, f32) {
        let w = WIDTH as f32 - 2.0 * MARGIN;
        let h = HEIGHT as f32 - 2.0 * MARGIN;
        let px = MARGIN + (x as f32 - self.x_min) / (self.x_max - self.x_min) * w;
        let py = HEIGHT as f32 - MARGIN - (y as f32 - self.y_min) / (self.y_max - self.y_min) * h;
        (px, py)
    }
}

/// Draw `(epoch, loss)` points. Non-finite losses are left out.
pub fn render_loss_curve(points: &[(f64, f64)], font: Option<&FontVec>) -> Option<RgbImage> {
    let points: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if points.is_empty() {
        return None;
    }

    let area = PlotArea::fit(&points);
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, WHITE);

    let left   = MARGIN;
    let right  = WIDTH as f32 - MARGIN;
    let top    = MARGIN;
    let bottom = HEIGHT as f32 - MARGIN;

    // Grid and ticks
    for i in 0..=Y_TICKS {
        let y = bottom - (bottom - top) * i as f32 / Y_TICKS as f32;
        draw_line_segment_mut(&mut img, (left, y), (right, y), GREY);
        draw_line_segment_mut(&mut img, (left - 5.0, y), (left, y), BLACK);
    }
    for i in 0..=X_TICKS {
        let x = left + (right - left) * i as f32 / X_TICKS as f32;
        draw_line_segment_mut(&mut img, (x, bottom), (x, bottom + 5.0), BLACK);
    }
    draw_hollow_rect_mut(
        &mut img,
        Rect::at(left as i32, top as i32)
            .of_size((right - left) as u32 + 1, (bottom - top) as u32 + 1),
        BLACK,
    );

    // Curve
    for pair in points.windows(2) {
        let a = area.to_pixel(pair[0].0, pair[0].1);
        let b = area.to_pixel(pair[1].0, pair[1].1);
        draw_line_segment_mut(&mut img, a, b, BLUE);
    }
    for &(x, y) in &points {
        let (px, py) = area.to_pixel(x, y);
        draw_filled_circle_mut(&mut img, (px.round() as i32, py.round() as i32), 2, BLUE);
    }

    // Legend swatch for "Train loss"
    let (lx, ly) = (right - 110.0, top + 15.0);
    draw_line_segment_mut(&mut img, (lx, ly), (lx + 30.0, ly), BLUE);
    draw_line_segment_mut(&mut img, (lx, ly + 1.0), (lx + 30.0, ly + 1.0), BLUE);

    if let Some(font) = font {
        draw_labels(&mut img, &area, font, (lx + 36.0, ly));
    }

    Some(img)
}

fn draw_labels(img: &mut RgbImage, area: &PlotArea, font: &FontVec, legend_at: (f32, f32)) {
    let tick  = PxScale::from(TICK_SCALE);
    let label = PxScale::from(LABEL_SCALE);

    let left   = MARGIN;
    let right  = WIDTH as f32 - MARGIN;
    let top    = MARGIN;
    let bottom = HEIGHT as f32 - MARGIN;

    // Loss values left of the y ticks
    for i in 0..=Y_TICKS {
        let y     = bottom - (bottom - top) * i as f32 / Y_TICKS as f32;
        let value = area.y_min + (area.y_max - area.y_min) * i as f32 / Y_TICKS as f32;
        let text  = tick_label(value, 3);
        let (w, h) = text_size(tick, font, &text);
        draw_text_mut(img, BLACK, (left - 8.0) as i32 - w as i32, y as i32 - h as i32 / 2, tick, font, &text);
    }

    // Epoch values under the x ticks
    for i in 0..=X_TICKS {
        let x     = left + (right - left) * i as f32 / X_TICKS as f32;
        let value = area.x_min + (area.x_max - area.x_min) * i as f32 / X_TICKS as f32;
        let text  = tick_label(value, 1);
        let (w, _) = text_size(tick, font, &text);
        draw_text_mut(img, BLACK, x as i32 - w as i32 / 2, (bottom + 8.0) as i32, tick, font, &text);
    }

    let (w, _) = text_size(label, font, "epoch");
    draw_text_mut(img, BLACK, ((left + right) / 2.0) as i32 - w as i32 / 2, (bottom + 25.0) as i32, label, font, "epoch");
    draw_text_mut(img, BLACK, 8, (top - 25.0) as i32, label, font, "loss");

    let (_, h) = text_size(tick, font, "Train loss");
    draw_text_mut(img, BLACK, legend_at.0 as i32, legend_at.1 as i32 - h as i32 / 2, tick, font, "Train loss");
}

/// Render and save; returns false when there was nothing to draw.
pub fn save_loss_curve(points: &[(f64, f64)], path: &Path, font: Option<&FontVec>) -> Result<bool> {
    match render_loss_curve(points, font) {
        Some(img) => {
            img.save(path)
                .with_context(|| format!("Cannot write loss curve '{}'", path.display()))?;
            tracing::info!("Loss curve written to '{}'", path.display());
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_draws_nothing() {
        assert!(render_loss_curve(&[], None).is_none());
        assert!(render_loss_curve(&[(1.0, f64::NAN)], None).is_none());
    }

    #[test]
    fn test_curve_endpoints_map_to_plot_corners() {
        let area = PlotArea::fit(&[(1.0, 3.0), (20.0, 1.0)]);
        let (x0, y0) = area.to_pixel(1.0, 3.0);
        let (x1, y1) = area.to_pixel(20.0, 1.0);
        assert_eq!((x0, y0), (MARGIN, MARGIN));
        assert_eq!((x1, y1), (WIDTH as f32 - MARGIN, HEIGHT as f32 - MARGIN));
    }

    #[test]
    fn test_rendered_curve_has_blue_pixels() {
        let img = render_loss_curve(&[(1.0, 2.0), (2.0, 1.5), (3.0, 1.2)], None).unwrap();
        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
        // First point sits in the top-left corner of the plot area
        assert_eq!(*img.get_pixel(MARGIN as u32, MARGIN as u32), BLUE);
    }

    #[test]
    fn test_single_point_is_drawn() {
        let img = render_loss_curve(&[(1.0, 0.7)], None).unwrap();
        assert!(img.pixels().any(|p| *p == BLUE));
    }

    #[test]
    fn test_save_writes_png() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("loss.png");
        assert!(save_loss_curve(&[(1.0, 1.0), (2.0, 0.5)], &path, None).unwrap());
        assert_eq!(image::image_dimensions(&path).unwrap(), (WIDTH, HEIGHT));
    }

    /// Any non-white pixel inside the given column/row range.
    fn has_ink(img: &RgbImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> bool {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .any(|(x, y)| *img.get_pixel(x, y) != WHITE)
    }

    #[test]
    fn test_tick_labels() {
        assert_eq!(tick_label(3.0, 1), "3");
        assert_eq!(tick_label(2.5, 1), "2.5");
        assert_eq!(tick_label(1.0, 3), "1.000");
        assert_eq!(tick_label(0.12345, 3), "0.123");
    }

    #[test]
    fn test_label_area_blank_without_font() {
        let img    = render_loss_curve(&[(1.0, 2.0), (5.0, 1.0)], None).unwrap();
        let bottom = HEIGHT - MARGIN as u32;
        assert!(!has_ink(&img, 0..WIDTH, bottom + 20..HEIGHT));
    }

    #[test]
    fn test_axis_titles_and_ticks_are_drawn() {
        let Some(font) = load_font(None) else {
            eprintln!("no system font installed; label drawing not checked");
            return;
        };
        let img    = render_loss_curve(&[(1.0, 2.0), (5.0, 1.0)], Some(&font)).unwrap();
        let bottom = HEIGHT - MARGIN as u32;
        let left   = MARGIN as u32;

        // "epoch" under the x tick values
        assert!(has_ink(&img, 0..WIDTH, bottom + 20..HEIGHT));
        // Loss tick values left of the frame
        assert!(has_ink(&img, 0..left - 8, left..bottom));
        // "loss" above the frame
        assert!(has_ink(&img, 0..left, 0..left - 5));
    }

    #[test]
    fn test_unreadable_font_falls_back_to_system() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("font.ttf");
        fs::write(&bad, b"not a font").unwrap();

        assert_eq!(load_font(Some(&bad)).is_some(), load_font(None).is_some());
        assert_eq!(load_font(Some(&dir.path().join("missing.ttf"))).is_some(), load_font(None).is_some());
    }
}
