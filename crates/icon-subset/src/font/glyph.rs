//! Glyph outlines in the quadratic TrueType representation.

use kurbo::{BezPath, CubicBez, PathEl, Point};

/// Maximum deviation of the quadratic approximation of a cubic curve, in font units.
const CUBIC_TOLERANCE: f64 = 0.5;

/// Point of a glyph contour in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ContourPoint {
    pub(crate) x: i16,
    pub(crate) y: i16,
    pub(crate) on_curve: bool,
}

impl ContourPoint {
    pub(crate) const fn on(x: i16, y: i16) -> Self {
        Self {
            x,
            y,
            on_curve: true,
        }
    }

    fn rounded(point: Point, on_curve: bool) -> Self {
        Self {
            x: round_coordinate(point.x),
            y: round_coordinate(point.y),
            on_curve,
        }
    }
}

#[allow(clippy::cast_possible_truncation)] // clamped to the `i16` range
fn round_coordinate(value: f64) -> i16 {
    value
        .round()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

/// Simple (non-composite) TrueType glyph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SimpleGlyph {
    pub(crate) contours: Vec<Vec<ContourPoint>>,
    pub(crate) instructions: Vec<u8>,
}

impl SimpleGlyph {
    /// Converts an outline in font units. Cubic segments are approximated with quadratic ones;
    /// on-curve points that lie exactly between two off-curve points are left implicit.
    pub(crate) fn from_outline(outline: &BezPath) -> Self {
        let mut builder = ContourBuilder::default();
        for &element in outline.elements() {
            builder.push(element);
        }
        builder.finish_contour();
        Self {
            contours: builder.contours,
            instructions: vec![],
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub(crate) fn point_count(&self) -> usize {
        self.contours.iter().map(Vec::len).sum()
    }

    /// Returns `[xMin, yMin, xMax, yMax]` over all points, or `None` for an empty glyph.
    pub(crate) fn bbox(&self) -> Option<[i16; 4]> {
        let mut points = self.contours.iter().flatten();
        let first = points.next()?;
        let init = [first.x, first.y, first.x, first.y];
        Some(points.fold(init, |[x_min, y_min, x_max, y_max], point| {
            [
                x_min.min(point.x),
                y_min.min(point.y),
                x_max.max(point.x),
                y_max.max(point.y),
            ]
        }))
    }
}

#[derive(Debug, Default)]
struct ContourBuilder {
    contours: Vec<Vec<ContourPoint>>,
    current: Vec<ContourPoint>,
    last: Point,
}

impl ContourBuilder {
    fn push(&mut self, element: PathEl) {
        match element {
            PathEl::MoveTo(point) => {
                self.finish_contour();
                self.current.push(ContourPoint::rounded(point, true));
            }
            PathEl::LineTo(point) => {
                self.start_if_needed();
                self.current.push(ContourPoint::rounded(point, true));
            }
            PathEl::QuadTo(control, point) => {
                self.start_if_needed();
                self.current.push(ContourPoint::rounded(control, false));
                self.current.push(ContourPoint::rounded(point, true));
            }
            PathEl::CurveTo(control1, control2, point) => {
                self.start_if_needed();
                let cubic = CubicBez::new(self.last, control1, control2, point);
                for (_, _, quad) in cubic.to_quads(CUBIC_TOLERANCE) {
                    self.current.push(ContourPoint::rounded(quad.p1, false));
                    self.current.push(ContourPoint::rounded(quad.p2, true));
                }
            }
            PathEl::ClosePath => {
                self.finish_contour();
                return;
            }
        }
        if let Some(point) = element.end_point() {
            self.last = point;
        }
    }

    fn start_if_needed(&mut self) {
        if self.current.is_empty() {
            self.current.push(ContourPoint::rounded(self.last, true));
        }
    }

    fn finish_contour(&mut self) {
        let mut contour = std::mem::take(&mut self.current);
        // Contours are implicitly closed, so a point duplicating the start is redundant.
        if contour.len() > 1 && contour.first() == contour.last() {
            contour.pop();
        }
        if contour.len() < 2 {
            return;
        }

        let len = contour.len();
        let is_implied = |idx: usize| {
            let point = contour[idx];
            let prev = contour[(idx + len - 1) % len];
            let next = contour[(idx + 1) % len];
            point.on_curve
                && !prev.on_curve
                && !next.on_curve
                && 2 * i32::from(point.x) == i32::from(prev.x) + i32::from(next.x)
                && 2 * i32::from(point.y) == i32::from(prev.y) + i32::from(next.y)
        };
        let kept: Vec<_> = (0..len)
            .filter(|&idx| !is_implied(idx))
            .map(|idx| contour[idx])
            .collect();
        self.contours.push(kept);
    }
}

/// Glyph included into a produced font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubsetGlyph {
    pub(crate) outline: SimpleGlyph,
    pub(crate) advance: u16,
}

impl SubsetGlyph {
    /// Creates an empty zero-width glyph. Such glyphs stand in for ligature components
    /// that are not a part of the subset themselves.
    pub(crate) fn placeholder() -> Self {
        Self {
            outline: SimpleGlyph::default(),
            advance: 0,
        }
    }

    /// Left side bearing, which is equal to `xMin` for glyphs with contours.
    pub(crate) fn lsb(&self) -> i16 {
        self.outline.bbox().map_or(0, |[x_min, ..]| x_min)
    }
}
