//! Export helpers for porkchop artifacts: grid CSV, rendered frames, and JSON sidecars.

use thiserror::Error;

/// Errors raised while writing artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid base epoch '{0}' (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)")]
    Epoch(String),
    #[error("render error: {0}")]
    Render(String),
}

/// Calendar dates for day offsets.
pub mod epoch {
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use window_core::time::DayOffset;

    use super::ExportError;

    const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    /// Base epoch of a scenario; day offset zero.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BaseEpoch(NaiveDateTime);

    impl BaseEpoch {
        /// Parse `YYYY-MM-DDTHH:MM:SS` or a bare `YYYY-MM-DD` (midnight UTC).
        pub fn parse(text: &str) -> Result<Self, ExportError> {
            let text = text.trim();
            NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT)
                .or_else(|_| {
                    NaiveDate::parse_from_str(text, "%Y-%m-%d")
                        .map(|date| date.and_time(chrono::NaiveTime::MIN))
                })
                .map(Self)
                .map_err(|_| ExportError::Epoch(text.to_string()))
        }

        /// Calendar date `day` days after the epoch, as `YYYY-MM-DDTHH:MM:SS`.
        pub fn format_day(&self, day: DayOffset) -> String {
            (self.0 + Duration::days(i64::from(day)))
                .format(DATE_TIME_FORMAT)
                .to_string()
        }
    }
}

/// Porkchop grid CSV.
pub mod grid {
    use std::fs::{self, File};
    use std::io::{self, BufWriter, Write};
    use std::path::Path;

    use serde::Serialize;
    use window_core::time::DayOffset;

    use super::ExportError;
    use super::epoch::BaseEpoch;

    /// Create a writer for the target path, handling stdout (`-`) by convention.
    pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
        if path == Path::new("-") {
            return Ok(Box::new(BufWriter::new(io::stdout())));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }

    /// One grid cell; the header follows field order.
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct GridRow {
        pub delay_days: DayOffset,
        pub tof_days: DayOffset,
        pub departure_utc: String,
        pub arrival_utc: String,
        /// Empty when the cell has no transfer.
        pub delta_v: Option<f64>,
    }

    impl GridRow {
        pub fn new(epoch: &BaseEpoch, delay: DayOffset, tof: DayOffset, delta_v: f64) -> Self {
            Self {
                delay_days: delay,
                tof_days: tof,
                departure_utc: epoch.format_day(delay),
                arrival_utc: epoch.format_day(delay.saturating_add(tof)),
                delta_v: (delta_v.is_finite() && delta_v > 0.0).then_some(delta_v),
            }
        }
    }

    /// Write every cell of the accepted columns, column by column.
    ///
    /// `columns` yields `(delay, costs)` with `costs[i]` at `min_tof + i`.
    pub fn write_grid<'a, W, I>(
        writer: W,
        epoch: &BaseEpoch,
        min_tof: DayOffset,
        columns: I,
    ) -> Result<usize, ExportError>
    where
        W: Write,
        I: IntoIterator<Item = (DayOffset, &'a [f64])>,
    {
        let mut csv = csv::Writer::from_writer(writer);
        let mut rows = 0;
        for (delay, delta_vs) in columns {
            for (i, &delta_v) in delta_vs.iter().enumerate() {
                csv.serialize(GridRow::new(epoch, delay, min_tof + i as DayOffset, delta_v))?;
                rows += 1;
            }
        }
        csv.flush()?;
        Ok(rows)
    }
}

/// Raster frame to PNG.
pub mod image {
    use std::fs;
    use std::path::Path;

    use plotters::prelude::*;
    use window_raster::RasterSurface;

    use super::ExportError;

    /// Render `frame` with each pixel scaled to a `scale × scale` block over white.
    pub fn write_png(path: &Path, frame: &RasterSurface, scale: u32) -> Result<(), ExportError> {
        let scale = scale.max(1);
        let (width, height) = (frame.width() as u32, frame.height() as u32);
        if width == 0 || height == 0 {
            return Err(ExportError::Render("frame is empty".into()));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let render = |err: &dyn std::fmt::Display| ExportError::Render(err.to_string());
        let root = BitMapBackend::new(path, (width * scale, height * scale)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| render(&e))?;

        let block = scale as i32;
        for y in 0..frame.height() {
            for x in 0..frame.width() {
                let Some(pixel) = frame.pixel(x, y) else {
                    continue;
                };
                if pixel.a == 0 {
                    continue;
                }
                let x0 = x as i32 * block;
                let y0 = y as i32 * block;
                let color = RGBAColor(pixel.r, pixel.g, pixel.b, f64::from(pixel.a) / 255.0);
                root.draw(&Rectangle::new(
                    [(x0, y0), (x0 + block - 1, y0 + block - 1)],
                    color.filled(),
                ))
                .map_err(|e| render(&e))?;
            }
        }
        root.present().map_err(|e| render(&e))?;
        Ok(())
    }
}

/// JSON sidecars.
pub mod sidecar {
    use std::fs::{self, File};
    use std::io::{BufWriter, Write};
    use std::path::Path;

    use serde::Serialize;
    use serde_json::to_writer_pretty;
    use window_core::time::DayOffset;

    use super::ExportError;
    use super::epoch::BaseEpoch;

    /// Committed transfer annotated with calendar dates.
    #[derive(Debug, Serialize)]
    pub struct DatedSolution<'a, T: Serialize> {
        pub departure_utc: String,
        pub arrival_utc: String,
        #[serde(flatten)]
        pub solution: &'a T,
    }

    impl<'a, T: Serialize> DatedSolution<'a, T> {
        pub fn new(
            epoch: &BaseEpoch,
            departure_day: DayOffset,
            arrival_day: DayOffset,
            solution: &'a T,
        ) -> Self {
            Self {
                departure_utc: epoch.format_day(departure_day),
                arrival_utc: epoch.format_day(arrival_day),
                solution,
            }
        }
    }

    /// Pretty-print `value` as JSON.
    pub fn write_json<W: Write, T: Serialize>(writer: W, value: &T) -> Result<(), ExportError> {
        to_writer_pretty(writer, value)?;
        Ok(())
    }

    /// Pretty-print `value` to a JSON file, creating parent directories.
    pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(path)?);
        write_json(&mut writer, value)?;
        writer.flush()?;
        Ok(())
    }
}
