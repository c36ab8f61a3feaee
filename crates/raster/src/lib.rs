//! Porkchop raster: per-column cost colouring with iso-cost banding.
//!
//! Column `c` of the grid maps to pixel column `c`; time-of-flight offset `i` maps
//! to pixel row `rows - i`, so longer flights sit higher in the image. The surface
//! therefore carries `rows + 1` pixel rows, the top one being headroom that only the
//! sweep overlay touches.

/// 8-bit RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    fn darkened(self, factor: f64) -> Self {
        let scale = |c: u8| (f64::from(c) * factor).round().clamp(0.0, 255.0) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b), self.a)
    }
}

/// Unpainted pixels.
pub const BACKGROUND: Rgba = Rgba::new(0, 0, 0, 0);
/// Cells without a transfer the vessel can fly.
pub const INFEASIBLE: Rgba = Rgba::opaque(0, 0, 0);
/// Scan progress marker.
pub const SWEEP: Rgba = Rgba::opaque(255, 255, 255);
/// Gradient stops at 0, 1/3, 2/3 and 1 of the Δv budget.
pub const GRADIENT: [Rgba; 4] = [
    Rgba::opaque(46, 204, 113),
    Rgba::opaque(241, 196, 15),
    Rgba::opaque(230, 126, 34),
    Rgba::opaque(192, 57, 43),
];
/// Number of equal-width iso-cost bands across the budget.
pub const CONTOUR_BINS: usize = 8;
/// Brightness kept by band-boundary pixels.
pub const CONTOUR_SHADE: f64 = 0.6;
pub const SWEEP_WIDTH: usize = 2;

/// Whether `delta_v` is a flyable cost within `max_delta_v` (inclusive).
fn in_budget(delta_v: f64, max_delta_v: f64) -> bool {
    delta_v.is_finite() && delta_v > 0.0 && delta_v <= max_delta_v
}

/// Colour of one cell.
pub fn color_of(delta_v: f64, max_delta_v: f64) -> Rgba {
    if !in_budget(delta_v, max_delta_v) {
        return INFEASIBLE;
    }
    let t = (delta_v / max_delta_v * 3.0).clamp(0.0, 3.0);
    let segment = (t.floor() as usize).min(2);
    let local = t - segment as f64;
    let (from, to) = (GRADIENT[segment], GRADIENT[segment + 1]);
    let lerp = |a: u8, b: u8| {
        (f64::from(a) + (f64::from(b) - f64::from(a)) * local)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    Rgba::opaque(lerp(from.r, to.r), lerp(from.g, to.g), lerp(from.b, to.b))
}

/// Iso-cost band of `delta_v`, or `None` outside the budget.
pub fn contour_bucket(delta_v: f64, max_delta_v: f64) -> Option<usize> {
    if !in_budget(delta_v, max_delta_v) {
        return None;
    }
    let bucket = (delta_v / max_delta_v * CONTOUR_BINS as f64).floor() as usize;
    Some(bucket.min(CONTOUR_BINS - 1))
}

/// Row-major RGBA buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterSurface {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl RasterSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![BACKGROUND; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    fn set(&mut self, x: usize, y: usize, color: Rgba) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: Rgba) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.pixels[row * self.width + col] = color;
            }
        }
    }

    fn clear(&mut self) {
        self.pixels.fill(BACKGROUND);
    }
}

/// Paints scan columns into a [`RasterSurface`] and tracks the sweep position.
#[derive(Debug, Clone)]
pub struct Compositor {
    columns: usize,
    rows: usize,
    surface: RasterSurface,
    sweep: Option<usize>,
    sweep_visible: bool,
}

impl Compositor {
    /// Compositor for a `columns × rows` grid.
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            surface: RasterSurface::new(columns, rows + 1),
            sweep: None,
            sweep_visible: true,
        }
    }

    /// Discard everything painted and resize for a new grid.
    pub fn reset(&mut self, columns: usize, rows: usize) {
        if columns == self.columns && rows == self.rows {
            self.surface.clear();
        } else {
            self.columns = columns;
            self.rows = rows;
            self.surface = RasterSurface::new(columns, rows + 1);
        }
        self.sweep = None;
        self.sweep_visible = true;
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Paint one grid column. Out-of-range columns are ignored.
    pub fn paint_column(&mut self, col: usize, delta_vs: &[f64], max_delta_v: f64) {
        if col >= self.columns {
            return;
        }
        let rows = self.rows.min(delta_vs.len());
        for (i, &delta_v) in delta_vs.iter().take(rows).enumerate() {
            self.surface
                .set(col, self.rows - i, color_of(delta_v, max_delta_v));
        }

        // Top-to-bottom scan: the largest time-of-flight offset is the top row.
        let mut previous: Option<usize> = None;
        for i in (0..rows).rev() {
            let bucket = contour_bucket(delta_vs[i], max_delta_v);
            if let (Some(prev), Some(current)) = (previous, bucket) {
                if prev != current {
                    let y = self.rows - i;
                    let shaded = color_of(delta_vs[i], max_delta_v).darkened(CONTOUR_SHADE);
                    self.surface.set(col, y, shaded);
                }
            }
            previous = bucket;
        }

        self.sweep = Some(self.sweep.map_or(col, |s| s.max(col)));
    }

    /// Largest column painted since the last reset.
    pub fn sweep_column(&self) -> Option<usize> {
        self.sweep
    }

    /// Stop drawing the sweep marker (the scan has finished).
    pub fn hide_sweep(&mut self) {
        self.sweep_visible = false;
    }

    /// Painted cells only, without overlays.
    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    /// Painted cells plus the sweep marker, ready for display.
    pub fn frame(&self) -> RasterSurface {
        let mut frame = self.surface.clone();
        if let (true, Some(col)) = (self.sweep_visible, self.sweep) {
            // Keep the full marker width at the right edge.
            let x = col.min(frame.width().saturating_sub(SWEEP_WIDTH));
            frame.fill_rect(x, 0, SWEEP_WIDTH, frame.height(), SWEEP);
        }
        frame
    }
}
