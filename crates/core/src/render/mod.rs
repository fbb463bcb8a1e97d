//! Zoom-adaptive scope geometry.
//!
//! [`ViewportRenderer::render`] turns the current history and zoom into a
//! display list for one frame. The strategy depends only on the time zoom,
//! measured in pixels per raw sample:
//!
//! | zone                       | time zoom                    | source             |
//! |----------------------------|------------------------------|--------------------|
//! | [`Zone::Interpolated`]     | `>= 1.0`                     | interpolated raw   |
//! | [`Zone::PixelEnvelope`]    | `[pyramid_threshold, 1.0)`   | raw min/max scans  |
//! | [`Zone::PyramidEnvelope`]  | `< pyramid_threshold`        | overview ring      |
//!
//! The rightmost column is always the newest sample. Paths stop where the
//! retained history ends instead of reading slots that were never written.

use serde::{Deserialize, Serialize};

use crate::{config::RenderConfig, history::MinMax, HistoryStore, Result, ZoomState};

/// Rendering strategy bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    /// One interpolated vertex per pixel.
    Interpolated,
    /// Filled min/max band from raw scans.
    PixelEnvelope,
    /// Filled min/max band from the decimated overview.
    PyramidEnvelope,
}

impl Zone {
    /// Picks the zone for `time_zoom`. A value exactly on a boundary selects
    /// the finer zone (`1.0` is interpolated, `pyramid_threshold` is a pixel
    /// envelope).
    pub fn select(time_zoom: f64, pyramid_threshold: f64) -> Self {
        if time_zoom >= 1.0 {
            Zone::Interpolated
        } else if time_zoom >= pyramid_threshold {
            Zone::PixelEnvelope
        } else {
            Zone::PyramidEnvelope
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Zone::Interpolated => "Interpolated",
            Zone::PixelEnvelope => "Envelope",
            Zone::PyramidEnvelope => "Overview",
        }
    }
}

/// Drawable area in device-independent pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Geometry handed to the drawing backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "points", rename_all = "snake_case")]
pub enum DisplayList {
    /// Open path starting at the newest sample and running back in time.
    Polyline(Vec<Point>),
    /// Closed outline to be filled and stroked: the roof from left to right,
    /// then the floor from right to left.
    Polygon(Vec<Point>),
}

impl DisplayList {
    pub fn points(&self) -> &[Point] {
        match self {
            DisplayList::Polyline(points) | DisplayList::Polygon(points) => points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points().is_empty()
    }
}

/// Immutable output of one render pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub zone: Zone,
    pub geometry: DisplayList,
    /// Baseline the one-sided signal rises from.
    pub midline_y: f32,
    pub status: String,
}

/// One pixel column of an envelope, in screen space.
#[derive(Debug, Clone, Copy)]
struct Band {
    x: f32,
    top: f32,
    bottom: f32,
}

/// Stateless geometry builder.
#[derive(Debug, Clone)]
pub struct ViewportRenderer {
    config: RenderConfig,
}

impl ViewportRenderer {
    pub fn new(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn zone_for(&self, time_zoom: f64) -> Zone {
        Zone::select(time_zoom, self.config.pyramid_threshold)
    }

    /// Builds the display list for the current history and zoom. Never
    /// mutates the history.
    pub fn render(&self, history: &HistoryStore, zoom: &ZoomState, viewport: Viewport) -> Frame {
        let zone = self.zone_for(zoom.time_zoom);
        let midline_y = if viewport.is_drawable() {
            viewport.height * 0.5
        } else {
            0.0
        };
        let geometry = if !viewport.is_drawable() || history.is_empty() {
            match zone {
                Zone::Interpolated => DisplayList::Polyline(Vec::new()),
                _ => DisplayList::Polygon(Vec::new()),
            }
        } else {
            let mapper = VerticalMapper::new(viewport, zoom.amplitude_zoom, self.config.vertical_margin);
            match zone {
                Zone::Interpolated => self.interpolated(history, zoom.time_zoom, viewport, &mapper),
                Zone::PixelEnvelope => self.pixel_envelope(history, zoom.time_zoom, viewport, &mapper),
                Zone::PyramidEnvelope => {
                    self.pyramid_envelope(history, zoom.time_zoom, viewport, &mapper)
                }
            }
        };

        Frame {
            zone,
            geometry,
            midline_y,
            status: format!(
                "Mode: {} | Zoom X: {:.5} | Zoom Y: {:.2}",
                zone.label(),
                zoom.time_zoom,
                zoom.amplitude_zoom
            ),
        }
    }

    fn interpolated(
        &self,
        history: &HistoryStore,
        time_zoom: f64,
        viewport: Viewport,
        mapper: &VerticalMapper,
    ) -> DisplayList {
        let columns = viewport.width.ceil() as usize;
        let oldest = (history.len() - 1) as f64;
        let mut points = Vec::with_capacity(columns + 1);

        for column in 0..=columns {
            let samples_ago = column as f64 / time_zoom;
            if samples_ago > oldest {
                break;
            }
            points.push(Point {
                x: viewport.width - column as f32,
                y: mapper.map(history.query_raw_interpolated(samples_ago)),
            });
        }

        DisplayList::Polyline(points)
    }

    fn pixel_envelope(
        &self,
        history: &HistoryStore,
        time_zoom: f64,
        viewport: Viewport,
        mapper: &VerticalMapper,
    ) -> DisplayList {
        let available = history.len();
        let bands = column_ranges(viewport, time_zoom)
            .take_while(|(_, start, _)| *start < available)
            .map(|(x, start, end)| {
                let extrema = history.query_min_max_in_range(start, end);
                self.band(x, extrema, mapper)
            });

        DisplayList::Polygon(outline(bands))
    }

    fn pyramid_envelope(
        &self,
        history: &HistoryStore,
        time_zoom: f64,
        viewport: Viewport,
        mapper: &VerticalMapper,
    ) -> DisplayList {
        let decimation = history.decimation();
        let committed = history.pyramid_len();
        let (pending, pending_count) = match history.pending() {
            Some((extrema, count)) => (Some(extrema), count),
            None => (None, 0),
        };

        let bands = column_ranges(viewport, time_zoom)
            .map_while(|(x, start, end)| {
                // The newest `pending_count` samples are not in the overview yet.
                let mut extrema = if start < pending_count { pending } else { None };

                if end >= pending_count && committed > 0 {
                    let first_block = (start.max(pending_count) - pending_count) / decimation;
                    let last_block = ((end - pending_count) / decimation).min(committed - 1);
                    for block in first_block..=last_block {
                        let entry = history.query_pyramid(block);
                        extrema = Some(extrema.map_or(entry, |acc| acc.merge(entry)));
                    }
                }

                extrema.map(|extrema| self.band(x, extrema, mapper))
            });

        DisplayList::Polygon(outline(bands))
    }

    /// Maps a column's extremes to screen space and widens it to the minimum
    /// thickness around its own midpoint.
    fn band(&self, x: f32, extrema: MinMax, mapper: &VerticalMapper) -> Band {
        let top = mapper.map(extrema.max);
        let bottom = mapper.map(extrema.min);
        let (top, bottom) = enforce_thickness(top, bottom, self.config.min_band_thickness);
        Band { x, top, bottom }
    }
}

/// Value → screen y for a one-sided signal rising above the midline.
struct VerticalMapper {
    mid_y: f32,
    scale: f32,
    height: f32,
}

impl VerticalMapper {
    fn new(viewport: Viewport, amplitude_zoom: f32, margin: f32) -> Self {
        let mid_y = viewport.height * 0.5;
        Self {
            mid_y,
            scale: mid_y * margin * amplitude_zoom,
            height: viewport.height,
        }
    }

    fn map(&self, value: f32) -> f32 {
        (self.mid_y - value * self.scale).clamp(0.0, self.height)
    }
}

/// Screen x and inclusive raw offset range for each pixel column, newest
/// first. Column `k` covers offsets `[k / z, (k + 1) / z)`.
fn column_ranges(viewport: Viewport, time_zoom: f64) -> impl Iterator<Item = (f32, usize, usize)> {
    let columns = viewport.width.ceil() as usize;
    (0..columns).map(move |column| {
        let start = (column as f64 / time_zoom).floor() as usize;
        let end = (((column + 1) as f64 / time_zoom).ceil() as usize)
            .saturating_sub(1)
            .max(start);
        (viewport.width - column as f32, start, end)
    })
}

/// Widens `[top, bottom]` to `thickness` around its midpoint when narrower.
fn enforce_thickness(top: f32, bottom: f32, thickness: f32) -> (f32, f32) {
    let (top, bottom) = if top <= bottom { (top, bottom) } else { (bottom, top) };
    if bottom - top >= thickness {
        return (top, bottom);
    }
    let center = (top + bottom) * 0.5;
    let half = thickness * 0.5;
    (center - half, center + half)
}

/// Closes newest-first bands into a single outline.
fn outline(bands: impl Iterator<Item = Band>) -> Vec<Point> {
    let bands: Vec<Band> = bands.collect();
    let mut points = Vec::with_capacity(bands.len() * 2);
    points.extend(bands.iter().rev().map(|band| Point {
        x: band.x,
        y: band.top,
    }));
    points.extend(bands.iter().map(|band| Point {
        x: band.x,
        y: band.bottom,
    }));
    points
}
