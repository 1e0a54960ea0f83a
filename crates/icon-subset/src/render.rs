//! Rendering glyph outlines to SVG.

use kurbo::{Affine, BezPath, PathEl, Point};
use rustybuzz::ttf_parser::OutlineBuilder;
use svg::{node::element::Path, Document};

use crate::reader::FontHandle;

/// Minimum canvas size of a rendered glyph, in font units.
pub(crate) const MIN_CANVAS_SIZE: u32 = 1_000;

/// Transform from the glyph space (y axis pointing up) to the SVG space (y axis pointing down):
/// mirroring the x axis followed by rotating by π.
pub(crate) const GLYPH_SPACE_TO_SVG: Affine = Affine::new([1.0, 0.0, 0.0, -1.0, 0.0, 0.0]);

/// Collects outline commands into a [`BezPath`].
#[derive(Debug, Default)]
struct PathPen {
    path: BezPath,
}

#[allow(clippy::many_single_char_names)]
impl OutlineBuilder for PathPen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to(point(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.path.line_to(point(x, y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.path.quad_to(point(x1, y1), point(x, y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.path.curve_to(point(x1, y1), point(x2, y2), point(x, y));
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}

fn point(x: f32, y: f32) -> Point {
    Point::new(x.into(), y.into())
}

/// Replaces `-0.0` coordinates with `0.0` so that they are not serialized as `-0`.
fn normalize_zeros(element: PathEl) -> PathEl {
    let normalize = |p: Point| Point::new(p.x + 0.0, p.y + 0.0);
    match element {
        PathEl::MoveTo(p) => PathEl::MoveTo(normalize(p)),
        PathEl::LineTo(p) => PathEl::LineTo(normalize(p)),
        PathEl::QuadTo(p1, p) => PathEl::QuadTo(normalize(p1), normalize(p)),
        PathEl::CurveTo(p1, p2, p) => PathEl::CurveTo(normalize(p1), normalize(p2), normalize(p)),
        PathEl::ClosePath => PathEl::ClosePath,
    }
}

/// Standalone SVG document wrapping a rendered glyph.
#[derive(Debug, Clone, Default)]
pub(crate) struct SvgTemplate {
    /// Top of the view box. Set to `-ascender` so that the glyph baseline is placed
    /// at the ascender distance from the top.
    view_box_top: i32,
}

impl SvgTemplate {
    pub(crate) fn new(ascender: i16) -> Self {
        Self {
            view_box_top: -i32::from(ascender),
        }
    }

    pub(crate) fn render(&self, path: &str, width: u32, height: u32) -> String {
        let top = self.view_box_top;
        Document::new()
            .set("xmlns", "http://www.w3.org/2000/svg")
            .set("width", width)
            .set("height", height)
            .set("viewBox", format!("0 {top} {width} {height}"))
            .add(Path::new().set("d", path))
            .to_string()
    }
}

/// Reads the glyph outline in font units with the y axis pointing up. Glyphs without
/// an outline produce an empty path.
pub(crate) fn glyph_outline(handle: &FontHandle<'_>, glyph: u16) -> BezPath {
    let mut pen = PathPen::default();
    if !handle.outline(glyph, &mut pen) {
        log::trace!("glyph {glyph} has no outline");
    }
    pen.path
}

/// Glyph rendered by an [`OutlineRenderer`].
#[derive(Debug, Clone)]
pub(crate) struct RenderedGlyph {
    /// Outline in font units with the y axis pointing up.
    pub(crate) outline: BezPath,
    /// SVG path data in the SVG space.
    pub(crate) path: String,
    /// Standalone SVG document.
    pub(crate) svg: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// Horizontal advance from the font; 0 if the font doesn't specify one.
    pub(crate) advance_width: u16,
}

/// Renders glyph outlines into SVG documents using a shared template.
#[derive(Debug, Clone)]
pub(crate) struct OutlineRenderer {
    template: SvgTemplate,
}

impl OutlineRenderer {
    pub(crate) fn new(template: SvgTemplate) -> Self {
        Self { template }
    }

    pub(crate) fn render(&self, handle: &FontHandle<'_>, glyph: u16) -> RenderedGlyph {
        let outline = glyph_outline(handle, glyph);
        let svg_path: BezPath = outline
            .elements()
            .iter()
            .map(|&element| normalize_zeros(GLYPH_SPACE_TO_SVG * element))
            .collect();
        let path = svg_path.to_svg();

        let advance_width = handle.advance_width(glyph).unwrap_or(0);
        let width = u32::from(advance_width).max(MIN_CANVAS_SIZE);
        let height = handle
            .advance_height(glyph)
            .map_or(MIN_CANVAS_SIZE, |height| u32::from(height).max(MIN_CANVAS_SIZE));
        let svg = self.template.render(&path, width, height);

        RenderedGlyph {
            outline,
            path,
            svg,
            width,
            height,
            advance_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use kurbo::{Rect, Shape};

    use super::*;
    use crate::tests::{ligature_font, CoverageFormat, GLYPH_A, GLYPH_ABC, GLYPH_SPACE};

    #[test]
    fn glyph_transform_is_mirroring_and_rotation() {
        let expected = Affine::rotate(PI) * Affine::FLIP_X;
        for (actual, expected) in GLYPH_SPACE_TO_SVG.as_coeffs().iter().zip(expected.as_coeffs()) {
            assert!((actual - expected).abs() < 1e-12, "{GLYPH_SPACE_TO_SVG:?}");
        }
        assert_eq!(GLYPH_SPACE_TO_SVG * Point::new(3.0, 5.0), Point::new(3.0, -5.0));
    }

    #[test]
    fn zeros_are_normalized() {
        let element = normalize_zeros(GLYPH_SPACE_TO_SVG * PathEl::MoveTo(Point::new(10.0, 0.0)));
        let PathEl::MoveTo(p) = element else {
            panic!("unexpected element: {element:?}");
        };
        assert!(p.y.is_sign_positive());
        assert!(!BezPath::from_vec(vec![element]).to_svg().contains("-0"));
    }

    #[test]
    fn rendering_glyph() {
        let bytes = ligature_font(CoverageFormat::Glyphs);
        let handle = FontHandle::open(&bytes).unwrap();
        let renderer = OutlineRenderer::new(SvgTemplate::new(handle.ascender()));

        let glyph = renderer.render(&handle, GLYPH_A);
        assert_eq!(glyph.outline.bounding_box(), Rect::new(100.0, 0.0, 500.0, 700.0));
        let svg_path = BezPath::from_svg(&glyph.path).unwrap();
        assert_eq!(svg_path.bounding_box(), Rect::new(100.0, -700.0, 500.0, 0.0));
        // Advance (600) is less than the minimum canvas size.
        assert_eq!((glyph.width, glyph.height), (1_000, 1_000));
        assert_eq!(glyph.advance_width, 600);
        assert!(glyph.svg.contains("viewBox=\"0 -800 1000 1000\""), "{}", glyph.svg);
        assert!(glyph.svg.contains(&format!("d=\"{}\"", glyph.path)));
        assert!(glyph.svg.starts_with("<svg "), "{}", glyph.svg);
        assert!(glyph.svg.contains("width=\"1000\""), "{}", glyph.svg);
    }

    #[test]
    fn rendering_wide_glyph() {
        let bytes = ligature_font(CoverageFormat::Glyphs);
        let handle = FontHandle::open(&bytes).unwrap();
        let renderer = OutlineRenderer::new(SvgTemplate::default());

        let glyph = renderer.render(&handle, GLYPH_ABC);
        assert_eq!((glyph.width, glyph.height), (1_200, 1_000));
        assert_eq!(glyph.outline.bounding_box(), Rect::new(100.0, 0.0, 1_100.0, 700.0));
    }

    #[test]
    fn rendering_empty_glyph() {
        let bytes = ligature_font(CoverageFormat::Glyphs);
        let handle = FontHandle::open(&bytes).unwrap();
        let renderer = OutlineRenderer::new(SvgTemplate::default());

        let glyph = renderer.render(&handle, GLYPH_SPACE);
        assert!(glyph.path.is_empty());
        assert_eq!(glyph.outline.elements().len(), 0);
        assert_eq!((glyph.width, glyph.height), (1_000, 1_000));
    }
}
