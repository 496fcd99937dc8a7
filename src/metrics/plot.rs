use crate::error::{Error, Result};
use image::{Rgb, RgbImage};
use std::path::Path;

pub const PLOT_WIDTH: u32 = 640;
pub const PLOT_HEIGHT: u32 = 400;
const MARGIN: u32 = 40;
const TICKS: u32 = 5;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);

/// Line colors, assigned to series in order.
pub const PALETTE: [Rgb<u8>; 4] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
];

/// A named, append-only sequence of `(step, value)` points.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    name: String,
    points: Vec<(usize, f64)>,
}

impl Series {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, step: usize, value: f64) {
        self.points.push((step, value));
    }

    pub fn points(&self) -> &[(usize, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Data range mapped onto the plotting area.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Bounds {
    /// `None` when no series holds a finite point.
    fn of(series: &[&Series]) -> Option<Self> {
        let mut points = series
            .iter()
            .flat_map(|s| s.points())
            .map(|&(step, value)| (step as f64, value))
            .filter(|(_, value)| value.is_finite());
        let (x, y) = points.next()?;
        let mut bounds = Bounds {
            x_min: x,
            x_max: x,
            y_min: y,
            y_max: y,
        };
        for (x, y) in points {
            bounds.x_min = bounds.x_min.min(x);
            bounds.x_max = bounds.x_max.max(x);
            bounds.y_min = bounds.y_min.min(y);
            bounds.y_max = bounds.y_max.max(y);
        }
        if bounds.x_max == bounds.x_min {
            bounds.x_max += 1.0;
        }
        if bounds.y_max == bounds.y_min {
            bounds.y_min -= 0.5;
            bounds.y_max += 0.5;
        }
        Some(bounds)
    }

    /// Pixel coordinates of a data point; larger values are drawn higher.
    fn project(&self, x: f64, y: f64) -> (f64, f64) {
        let inner_width = f64::from(PLOT_WIDTH - 2 * MARGIN);
        let inner_height = f64::from(PLOT_HEIGHT - 2 * MARGIN);
        let px = f64::from(MARGIN) + (x - self.x_min) / (self.x_max - self.x_min) * inner_width;
        let py = f64::from(PLOT_HEIGHT - MARGIN)
            - (y - self.y_min) / (self.y_max - self.y_min) * inner_height;
        (px, py)
    }
}

/// Renders the series as polylines over a shared pair of axes and writes a PNG.
///
/// Each series gets a legend swatch in the top-right corner, in [`PALETTE`] order.
pub fn render(path: &Path, series: &[&Series]) -> Result<()> {
    let mut canvas = RgbImage::from_pixel(PLOT_WIDTH, PLOT_HEIGHT, WHITE);
    draw_grid(&mut canvas);
    draw_axes(&mut canvas);

    if let Some(bounds) = Bounds::of(series) {
        for (s, color) in series.iter().zip(PALETTE.iter().cycle()) {
            log::debug!("{path:?}: {} drawn in {:?}", s.name, color.0);
            let points: Vec<(f64, f64)> = s
                .points()
                .iter()
                .filter(|(_, value)| value.is_finite())
                .map(|&(step, value)| bounds.project(step as f64, value))
                .collect();
            for pair in points.windows(2) {
                draw_line(&mut canvas, pair[0], pair[1], *color);
            }
            for point in &points {
                draw_marker(&mut canvas, *point, *color);
            }
        }
    }
    draw_legend(&mut canvas, series.len());

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    canvas.save(path).map_err(|source| Error::Plot {
        path: path.to_path_buf(),
        source,
    })
}

fn put(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if (0..i64::from(canvas.width())).contains(&x) && (0..i64::from(canvas.height())).contains(&y) {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_line(canvas: &mut RgbImage, from: (f64, f64), to: (f64, f64), color: Rgb<u8>) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = (from.0 + dx * t).round() as i64;
        let y = (from.1 + dy * t).round() as i64;
        put(canvas, x, y, color);
        put(canvas, x, y + 1, color);
    }
}

fn draw_marker(canvas: &mut RgbImage, (x, y): (f64, f64), color: Rgb<u8>) {
    let (x, y) = (x.round() as i64, y.round() as i64);
    for ox in -1..=1 {
        for oy in -1..=1 {
            put(canvas, x + ox, y + oy, color);
        }
    }
}

fn draw_grid(canvas: &mut RgbImage) {
    let (left, right) = (MARGIN, PLOT_WIDTH - MARGIN);
    let (top, bottom) = (MARGIN, PLOT_HEIGHT - MARGIN);
    for tick in 1..=TICKS {
        let x = left + (right - left) * tick / TICKS;
        let y = bottom - (bottom - top) * tick / TICKS;
        for py in top..bottom {
            canvas.put_pixel(x, py, GRID);
        }
        for px in left..right {
            canvas.put_pixel(px, y, GRID);
        }
    }
}

fn draw_axes(canvas: &mut RgbImage) {
    let (left, right) = (MARGIN, PLOT_WIDTH - MARGIN);
    let (top, bottom) = (MARGIN, PLOT_HEIGHT - MARGIN);
    for x in left..=right {
        canvas.put_pixel(x, bottom, BLACK);
    }
    for y in top..=bottom {
        canvas.put_pixel(left, y, BLACK);
    }
    for tick in 0..=TICKS {
        let x = left + (right - left) * tick / TICKS;
        let y = bottom - (bottom - top) * tick / TICKS;
        for offset in 1..=4 {
            canvas.put_pixel(x, bottom + offset, BLACK);
            canvas.put_pixel(left - offset, y, BLACK);
        }
    }
}

fn draw_legend(canvas: &mut RgbImage, entries: usize) {
    let x = PLOT_WIDTH - MARGIN - 24;
    for (i, color) in PALETTE.iter().cycle().take(entries).enumerate() {
        let y = MARGIN / 4 + i as u32 * 10;
        for px in x..x + 20 {
            for py in y..y + 6 {
                put(canvas, i64::from(px), i64::from(py), *color);
            }
        }
    }
}
