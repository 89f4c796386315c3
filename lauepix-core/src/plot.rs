//! Interactive line plot state: series, overlays and rubber-band zoom.
//!
//! The plot renders a 1-D signal (intensity against time of flight) with
//! overlay regions and centroids tied to reflection ids. Zooming works on the
//! x labels under the pointer:
//!
//! 1. pointer down records the left edge,
//! 2. pointer moves update the right edge while a drag is active,
//! 3. pointer up either zooms to `[left, right]` or discards the gesture.
//!
//! Only one zoom level is kept; zooming out always returns to full extent.

use serde::Deserialize;

use crate::error::ProtocolError;
use crate::reflection::{ReflectionId, ReflectionRegistry};

/// Narrowest drag (in x units) that is treated as a zoom request.
pub const MIN_SELECTION_WIDTH: f64 = 200.0;

/// Headroom factor applied above the tallest sample in view.
pub const Y_HEADROOM: f64 = 1.2;

/// One `(x, y)` sample of the plotted signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
}

/// Ordered samples, monotonic in x.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotSeries {
    samples: Vec<Sample>,
}

impl PlotSeries {
    /// Pair up parallel x and y arrays.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::SeriesLength`] if the arrays differ in length.
    pub fn from_xy(x: &[f64], y: &[f64]) -> Result<Self, ProtocolError> {
        if x.len() != y.len() {
            return Err(ProtocolError::SeriesLength {
                x: x.len(),
                y: y.len(),
            });
        }
        Ok(Self {
            samples: x.iter().zip(y).map(|(&x, &y)| Sample { x, y }).collect(),
        })
    }

    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First and last x value.
    #[must_use]
    pub fn x_extent(&self) -> Option<(f64, f64)> {
        Some((self.samples.first()?.x, self.samples.last()?.x))
    }

    /// Tallest sample with `left <= x <= right`, or `None` if the window is empty.
    #[must_use]
    pub fn max_y_between(&self, left: f64, right: f64) -> Option<f64> {
        let start = self.samples.partition_point(|s| s.x < left);
        let end = self.samples.partition_point(|s| s.x <= right);
        self.samples
            .get(start..end)?
            .iter()
            .map(|s| s.y)
            .reduce(f64::max)
    }

    #[must_use]
    pub fn max_y(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.y).reduce(f64::max)
    }

    /// X of the sample nearest to `x`; this is the label the pointer is over.
    #[must_use]
    pub fn nearest_x(&self, x: f64) -> Option<f64> {
        if !x.is_finite() {
            return None;
        }
        let idx = self.samples.partition_point(|s| s.x < x);
        let after = self.samples.get(idx);
        let before = idx.checked_sub(1).and_then(|i| self.samples.get(i));
        match (before, after) {
            (Some(b), Some(a)) => Some(if x - b.x <= a.x - x { b.x } else { a.x }),
            (Some(s), None) | (None, Some(s)) => Some(s.x),
            (None, None) => None,
        }
    }
}

/// Bounding region of a reflection along the x axis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverlayRegion {
    pub id: ReflectionId,
    pub x1: f64,
    pub x2: f64,
}

impl OverlayRegion {
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        let (lo, hi) = if self.x1 <= self.x2 {
            (self.x1, self.x2)
        } else {
            (self.x2, self.x1)
        };
        (lo..=hi).contains(&x)
    }
}

/// Centroid marker of a reflection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverlayPoint {
    pub id: ReflectionId,
    pub x: f64,
    pub y: f64,
    #[serde(default, rename = "millerIdx")]
    pub miller_idx: Vec<i64>,
}

impl OverlayPoint {
    /// Miller-index label, if the point is indexed.
    ///
    /// `(0, 0, 0)` is the backend's marker for "not indexed" and is never
    /// labelled.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        match self.miller_idx.as_slice() {
            [h, k, l] if [h, k, l].iter().any(|v| **v != 0) => Some(format!("({h}, {k}, {l})")),
            _ => None,
        }
    }
}

/// Closed interval shown on one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisDomain {
    pub min: f64,
    pub max: f64,
}

impl AxisDomain {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Visible axis domains of the plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomWindow {
    pub x: AxisDomain,
    pub y: AxisDomain,
    pub full_extent: bool,
}

impl ZoomWindow {
    /// Full data extent with headroom above the tallest sample.
    #[must_use]
    pub fn full(series: &PlotSeries) -> Self {
        let (x_min, x_max) = series.x_extent().unwrap_or((0.0, 0.0));
        Self {
            x: AxisDomain::new(x_min, x_max),
            y: AxisDomain::new(0.0, headroom_top(series.max_y().unwrap_or(0.0))),
            full_extent: true,
        }
    }
}

fn headroom_top(max_y: f64) -> f64 {
    (max_y * Y_HEADROOM).ceil()
}

/// What a completed drag gesture did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomOutcome {
    /// Nothing usable was dragged; the band was cleared.
    Cancelled,
    /// The band was narrower than [`MIN_SELECTION_WIDTH`].
    TooNarrow,
    /// The plot now shows the dragged range.
    Zoomed,
}

/// Rubber band being dragged across the plot.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    left: Option<f64>,
    right: Option<f64>,
}

/// Payload of an `update_lineplot` push.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineplotUpdate {
    pub title: String,
    pub series: PlotSeries,
    pub regions: Vec<OverlayRegion>,
    pub points: Vec<OverlayPoint>,
    pub update_table_selection: bool,
}

impl LineplotUpdate {
    /// Id the table should jump to, if the backend asked for it.
    #[must_use]
    pub fn table_selection(&self) -> Option<&ReflectionId> {
        if self.update_table_selection {
            self.points.first().map(|p| &p.id)
        } else {
            None
        }
    }
}

/// State of the experiment viewer's line plot.
#[derive(Debug, Clone)]
pub struct PlotState {
    title: String,
    series: PlotSeries,
    regions: Vec<OverlayRegion>,
    points: Vec<OverlayPoint>,
    window: ZoomWindow,
    drag: Option<Drag>,
}

impl Default for PlotState {
    fn default() -> Self {
        let series = PlotSeries {
            samples: vec![Sample { x: 0.0, y: 0.0 }],
        };
        Self {
            title: crate::reflection::UNKNOWN.to_string(),
            window: ZoomWindow::full(&series),
            series,
            regions: Vec::new(),
            points: Vec::new(),
            drag: None,
        }
    }
}

impl PlotState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole dataset and return to full extent.
    ///
    /// Any zoom or drag in progress belongs to the previous dataset and is
    /// dropped.
    pub fn replace(&mut self, update: LineplotUpdate) {
        self.title = update.title;
        self.series = update.series;
        self.regions = update.regions;
        self.points = update.points;
        self.window = ZoomWindow::full(&self.series);
        self.drag = None;
    }

    /// Pointer pressed inside the plot at data coordinate `x`.
    pub fn pointer_down(&mut self, x: Option<f64>) {
        self.drag = Some(Drag {
            left: x.and_then(|x| self.series.nearest_x(x)),
            right: None,
        });
    }

    /// Pointer moved; only tracked while a drag with a left edge is active.
    pub fn pointer_move(&mut self, x: Option<f64>) {
        let snapped = x.and_then(|x| self.series.nearest_x(x));
        if let Some(drag) = self.drag.as_mut() {
            if drag.left.is_some() && snapped.is_some() {
                drag.right = snapped;
            }
        }
    }

    /// Pointer released: zoom to the dragged band or discard it.
    pub fn pointer_up(&mut self) -> ZoomOutcome {
        let Some(Drag {
            left: Some(left),
            right: Some(right),
        }) = self.drag.take()
        else {
            return ZoomOutcome::Cancelled;
        };
        if left == right || !left.is_finite() || !right.is_finite() {
            return ZoomOutcome::Cancelled;
        }

        let (left, right) = if left > right {
            (right, left)
        } else {
            (left, right)
        };
        if right - left < MIN_SELECTION_WIDTH {
            return ZoomOutcome::TooNarrow;
        }

        let Some(top) = self.series.max_y_between(left, right) else {
            return ZoomOutcome::Cancelled;
        };

        self.window = ZoomWindow {
            x: AxisDomain::new(left, right),
            y: AxisDomain::new(0.0, headroom_top(top)),
            full_extent: false,
        };
        ZoomOutcome::Zoomed
    }

    /// Return to the full data extent. Returns `false` if already there.
    pub fn zoom_out(&mut self) -> bool {
        if self.window.full_extent {
            return false;
        }
        self.window = ZoomWindow::full(&self.series);
        self.drag = None;
        true
    }

    #[must_use]
    pub fn can_zoom_out(&self) -> bool {
        !self.window.full_extent
    }

    #[must_use]
    pub fn window(&self) -> ZoomWindow {
        self.window
    }

    /// Band currently being dragged, for drawing the rubber band.
    #[must_use]
    pub fn drag_band(&self) -> Option<(f64, f64)> {
        let drag = self.drag?;
        Some((drag.left?, drag.right?))
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn series(&self) -> &PlotSeries {
        &self.series
    }

    #[must_use]
    pub fn regions(&self) -> &[OverlayRegion] {
        &self.regions
    }

    #[must_use]
    pub fn points(&self) -> &[OverlayPoint] {
        &self.points
    }

    /// Topmost overlay region under `x`.
    #[must_use]
    pub fn region_at(&self, x: f64) -> Option<&OverlayRegion> {
        self.regions.iter().rev().find(|r| r.contains(x))
    }

    /// Click at data coordinate `x`: select the region under it, if any.
    pub fn click(&self, x: f64, registry: &mut ReflectionRegistry) -> Option<ReflectionId> {
        let id = self.region_at(x)?.id.clone();
        registry.select(id.clone());
        Some(id)
    }

    /// Region drawn highlighted for the current selection.
    ///
    /// `None` when nothing is selected or the selected id is not part of this
    /// dataset.
    #[must_use]
    pub fn highlighted_region(&self, registry: &ReflectionRegistry) -> Option<&OverlayRegion> {
        let selected = registry.selected()?;
        self.regions.iter().find(|r| &r.id == selected)
    }

    #[must_use]
    pub fn highlighted_point(&self, registry: &ReflectionRegistry) -> Option<&OverlayPoint> {
        let selected = registry.selected()?;
        self.points.iter().find(|p| &p.id == selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp_update() -> LineplotUpdate {
        // x = 0, 50, ..., 1000; peak of 50 at x = 300
        let x: Vec<f64> = (0..=20).map(|i| f64::from(i) * 50.0).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&x| if (x - 300.0).abs() < f64::EPSILON { 50.0 } else { 10.0 })
            .collect();
        LineplotUpdate {
            title: "panel0".into(),
            series: PlotSeries::from_xy(&x, &y).unwrap(),
            regions: vec![
                OverlayRegion {
                    id: ReflectionId::from(0),
                    x1: 250.0,
                    x2: 350.0,
                },
                OverlayRegion {
                    id: ReflectionId::from(1),
                    x1: 600.0,
                    x2: 700.0,
                },
            ],
            points: vec![OverlayPoint {
                id: ReflectionId::from(0),
                x: 300.0,
                y: 50.0,
                miller_idx: vec![1, 0, 0],
            }],
            update_table_selection: false,
        }
    }

    fn plot() -> PlotState {
        let mut plot = PlotState::new();
        plot.replace(ramp_update());
        plot
    }

    fn drag(plot: &mut PlotState, from: f64, to: f64) -> ZoomOutcome {
        plot.pointer_down(Some(from));
        plot.pointer_move(Some(to));
        plot.pointer_up()
    }

    #[test]
    fn test_full_extent_after_replace() {
        let window = plot().window();
        assert!(window.full_extent);
        assert_relative_eq!(window.x.min, 0.0);
        assert_relative_eq!(window.x.max, 1000.0);
        assert_relative_eq!(window.y.max, 60.0);
    }

    #[test]
    fn test_zoom_sets_domains() {
        let mut plot = plot();
        assert_eq!(drag(&mut plot, 100.0, 500.0), ZoomOutcome::Zoomed);

        let window = plot.window();
        assert!(!window.full_extent);
        assert_relative_eq!(window.x.min, 100.0);
        assert_relative_eq!(window.x.max, 500.0);
        assert_relative_eq!(window.y.min, 0.0);
        assert_relative_eq!(window.y.max, 60.0);
        assert!(plot.can_zoom_out());
    }

    #[test]
    fn test_reverse_drag_is_normalised() {
        let mut plot = plot();
        assert_eq!(drag(&mut plot, 900.0, 600.0), ZoomOutcome::Zoomed);
        let window = plot.window();
        assert_relative_eq!(window.x.min, 600.0);
        assert_relative_eq!(window.x.max, 900.0);
        assert_relative_eq!(window.y.max, 12.0);
    }

    #[test]
    fn test_narrow_drag_is_noise() {
        let mut plot = plot();
        let before = plot.window();
        assert_eq!(drag(&mut plot, 100.0, 250.0), ZoomOutcome::TooNarrow);
        assert_eq!(plot.window(), before);
        assert!(!plot.is_dragging());

        // exactly the minimum width still zooms
        assert_eq!(
            drag(&mut plot, 100.0, 100.0 + MIN_SELECTION_WIDTH),
            ZoomOutcome::Zoomed
        );
        let window = plot.window();
        assert!(!window.full_extent);
        assert_relative_eq!(window.x.min, 100.0);
        assert_relative_eq!(window.x.max, 300.0);
    }

    #[test]
    fn test_click_without_move_cancels() {
        let mut plot = plot();
        let before = plot.window();
        plot.pointer_down(Some(400.0));
        assert_eq!(plot.pointer_up(), ZoomOutcome::Cancelled);
        assert_eq!(plot.window(), before);

        plot.pointer_down(None);
        plot.pointer_move(Some(800.0));
        assert_eq!(plot.pointer_up(), ZoomOutcome::Cancelled);
        assert_eq!(plot.window(), before);
    }

    #[test]
    fn test_pointer_snaps_to_samples() {
        let mut plot = plot();
        plot.pointer_down(Some(112.0));
        plot.pointer_move(Some(489.0));
        assert_eq!(plot.drag_band(), Some((100.0, 500.0)));
    }

    #[test]
    fn test_zoom_out_restores_full_extent() {
        let mut plot = plot();
        let full = plot.window();
        drag(&mut plot, 100.0, 500.0);

        assert!(plot.zoom_out());
        assert_eq!(plot.window(), full);
        assert!(!plot.can_zoom_out());
        assert!(!plot.zoom_out());
    }

    #[test]
    fn test_replace_discards_zoom_and_drag() {
        let mut plot = plot();
        drag(&mut plot, 100.0, 500.0);
        plot.pointer_down(Some(700.0));

        let mut update = ramp_update();
        update.series = PlotSeries::from_xy(&[0.0, 10.0], &[4.0, 5.0]).unwrap();
        plot.replace(update);

        assert!(plot.window().full_extent);
        assert!(!plot.is_dragging());
        assert_relative_eq!(plot.window().x.max, 10.0);
        assert_relative_eq!(plot.window().y.max, 6.0);
    }

    #[test]
    fn test_miller_label_sentinel() {
        let mut point = OverlayPoint {
            id: ReflectionId::from(0),
            x: 0.0,
            y: 0.0,
            miller_idx: vec![0, 0, 0],
        };
        assert_eq!(point.label(), None);

        point.miller_idx = vec![1, 0, 0];
        assert_eq!(point.label().as_deref(), Some("(1, 0, 0)"));

        point.miller_idx = vec![1, 0];
        assert_eq!(point.label(), None);
    }

    #[test]
    fn test_click_selects_region() {
        let plot = plot();
        let mut registry = ReflectionRegistry::new();

        assert_eq!(plot.click(650.0, &mut registry), Some(ReflectionId::from(1)));
        assert_eq!(registry.selected(), Some(&ReflectionId::from(1)));
        assert_eq!(
            plot.highlighted_region(&registry).map(|r| r.id.clone()),
            Some(ReflectionId::from(1))
        );

        assert_eq!(plot.click(500.0, &mut registry), None);
        assert_eq!(registry.selected(), Some(&ReflectionId::from(1)));
    }

    #[test]
    fn test_unknown_selection_is_inert() {
        let plot = plot();
        let mut registry = ReflectionRegistry::new();
        registry.select(ReflectionId::from(42));
        assert!(plot.highlighted_region(&registry).is_none());
        assert!(plot.highlighted_point(&registry).is_none());
    }

    #[test]
    fn test_series_length_mismatch() {
        assert!(matches!(
            PlotSeries::from_xy(&[1.0, 2.0], &[1.0]),
            Err(ProtocolError::SeriesLength { x: 2, y: 1 })
        ));
    }
}
