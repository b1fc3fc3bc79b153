//! Plotters overlay chart: observed points, fitted curves, reference lines.
//!
//! The drawing code is generic over the Plotters backend so the same chart is
//! written to PNG/SVG files and rendered in the terminal viewer.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::domain::{
    Family, ObservedPoint, PLOT_X_RANGE, PLOT_Y_RANGE, THRESHOLD_N, THRESHOLD_PROBABILITY,
};
use crate::error::AppError;
use crate::fit::FitSelection;
use crate::models::sample_curve;

pub const CAPTION: &str = "Birthday Paradox - Best Fit Functions";
pub const X_DESC: &str = "Number of People (n)";
pub const Y_DESC: &str = "Collision Probability";
const OBSERVED_LABEL: &str = "Exact Birthday Paradox";

/// Fitted curves are sampled on this many points over `[1, 100]`.
pub const CURVE_SAMPLES: usize = 1000;
const CURVE_DOMAIN: [f64; 2] = [1.0, 100.0];

/// Number of dashes across a reference line.
const DASHES: usize = 40;

/// One fitted curve, ready to draw.
#[derive(Debug, Clone)]
pub struct CurveSeries {
    pub family: Family,
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub is_best: bool,
}

/// Everything the chart needs, computed outside the draw call.
#[derive(Debug, Clone)]
pub struct OverlayScene {
    pub observed: Vec<(f64, f64)>,
    pub curves: Vec<CurveSeries>,
    pub x_range: [f64; 2],
    pub y_range: [f64; 2],
    pub threshold_y: f64,
    pub marker_x: f64,
}

/// How observed points are drawn.
#[derive(Debug, Clone, Copy)]
pub enum Marker {
    Circle(u32),
    /// Single-cell dots; the terminal backend maps circle radii incorrectly.
    Pixel,
}

/// Backend-dependent styling.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub foreground: RGBColor,
    pub background: Option<RGBColor>,
    pub marker: Marker,
    pub font_size: u32,
    pub line_width: u32,
    /// Whether the backend can draw text at all. When false, only geometry is
    /// drawn: no caption, tick labels, axis descriptions or legend.
    pub text: bool,
    pub caption: bool,
    pub legend: bool,
    pub axis_desc: bool,
    /// Requested tick count per axis.
    pub ticks: usize,
    /// Draw the P = 0.5 and n = 23 reference lines.
    pub guides: bool,
    pub margin: u32,
    pub x_label_area: u32,
    pub y_label_area: u32,
}

impl ChartStyle {
    /// Styling for PNG/SVG output.
    pub fn file() -> Self {
        Self {
            foreground: BLACK,
            background: Some(WHITE),
            marker: Marker::Circle(4),
            font_size: 18,
            line_width: 2,
            text: true,
            caption: true,
            legend: true,
            axis_desc: true,
            ticks: 11,
            guides: true,
            margin: 20,
            x_label_area: 50,
            y_label_area: 70,
        }
    }

    /// Styling for a chart file in `format`.
    ///
    /// Bitmap text needs a font backend (the `fonts` feature); without one
    /// Plotters panics on the first glyph, so PNGs are drawn text-free.
    pub fn for_format(format: ChartFormat) -> Self {
        let style = Self::file();
        match format {
            ChartFormat::Svg => style,
            ChartFormat::Png if cfg!(feature = "fonts") => style,
            ChartFormat::Png => style.without_text(),
        }
    }

    /// The same style with every text element switched off.
    pub fn without_text(self) -> Self {
        Self {
            text: false,
            caption: false,
            legend: false,
            axis_desc: false,
            x_label_area: 0,
            y_label_area: 0,
            ..self
        }
    }

    /// Styling for the terminal viewer.
    pub fn terminal() -> Self {
        Self {
            foreground: WHITE,
            background: None,
            marker: Marker::Pixel,
            font_size: 10,
            line_width: 1,
            text: true,
            caption: false,
            legend: false,
            axis_desc: false,
            ticks: 5,
            guides: true,
            margin: 1,
            // Terminal cells are low-res, so keep label areas compact.
            x_label_area: 3,
            y_label_area: 6,
        }
    }
}

/// Color used for a family's curve (points are blue).
pub fn family_color(family: Family) -> RGBColor {
    match family {
        Family::Exponential => RED,
        Family::Logistic => GREEN,
        Family::Power => MAGENTA,
        Family::Polynomial => CYAN,
    }
}

/// Build the scene for the observed points and every fitted family.
pub fn build_scene(points: &[ObservedPoint], selection: &FitSelection) -> OverlayScene {
    let observed = points.iter().map(|p| (p.n, p.p)).collect();

    let curves = selection
        .fits
        .iter()
        .map(|f| CurveSeries {
            family: f.family,
            label: format!("{} (R²={:.4})", f.family.display_name(), f.quality.r_squared),
            points: sample_curve(f.family, &f.params, CURVE_DOMAIN[0], CURVE_DOMAIN[1], CURVE_SAMPLES),
            is_best: f.family == selection.best,
        })
        .collect();

    OverlayScene {
        observed,
        curves,
        x_range: PLOT_X_RANGE,
        y_range: PLOT_Y_RANGE,
        threshold_y: THRESHOLD_PROBABILITY,
        marker_x: THRESHOLD_N,
    }
}

/// Draw the overlay chart onto any Plotters drawing area.
pub fn draw_overlay<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    scene: &OverlayScene,
    style: &ChartStyle,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    if let Some(bg) = style.background {
        root.fill(&bg)?;
    }

    let [x0, x1] = scene.x_range;
    let [y0, y1] = scene.y_range;
    let fg = style.foreground;

    let mut builder = ChartBuilder::on(root);
    builder
        .margin(style.margin)
        .x_label_area_size(style.x_label_area)
        .y_label_area_size(style.y_label_area);
    if style.text && style.caption {
        builder.caption(CAPTION, ("sans-serif", style.font_size + 6).into_font().color(&fg));
    }
    let mut chart = builder.build_cartesian_2d(x0..x1, y0..y1)?;

    if style.text {
        let mut mesh = chart.configure_mesh();
        if style.axis_desc {
            mesh.x_desc(X_DESC).y_desc(Y_DESC);
        }
        mesh.x_labels(style.ticks)
            .y_labels(style.ticks)
            .x_label_formatter(&fmt_group_size)
            .y_label_formatter(&fmt_probability)
            .label_style(("sans-serif", style.font_size).into_font().color(&fg))
            .axis_style(fg)
            .bold_line_style(fg.mix(0.3))
            .light_line_style(fg.mix(0.1))
            .draw()?;
    } else {
        // Plain grid and frame; the mesh would lay out tick labels.
        let grid = fg.mix(0.2).stroke_width(1);
        let steps = style.ticks.max(2) - 1;
        chart.draw_series((0..=steps).flat_map(|i| {
            let u = i as f64 / steps as f64;
            let x = x0 + u * (x1 - x0);
            let y = y0 + u * (y1 - y0);
            [
                PathElement::new(vec![(x, y0), (x, y1)], grid),
                PathElement::new(vec![(x0, y), (x1, y)], grid),
            ]
        }))?;
        chart.draw_series(std::iter::once(Rectangle::new([(x0, y0), (x1, y1)], fg.stroke_width(1))))?;
    }

    // Observed points.
    let point_color = BLUE;
    let observed = match style.marker {
        Marker::Circle(r) => chart.draw_series(
            scene
                .observed
                .iter()
                .map(|&p| Circle::new(p, r, point_color.filled())),
        )?,
        Marker::Pixel => chart.draw_series(scene.observed.iter().map(|&p| Pixel::new(p, point_color)))?,
    };
    observed
        .label(OBSERVED_LABEL)
        .legend(move |(x, y)| Rectangle::new([(x + 6, y - 3), (x + 12, y + 3)], point_color.filled()));

    // Fitted curves, clamped to the fixed probability range.
    for curve in &scene.curves {
        let width = if curve.is_best { style.line_width + 1 } else { style.line_width };
        let stroke = family_color(curve.family).mix(0.7).stroke_width(width);
        chart
            .draw_series(LineSeries::new(
                curve.points.iter().map(|&(x, y)| (x, y.clamp(y0, y1))),
                stroke,
            ))?
            .label(curve.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], stroke));
    }

    // Reference lines: 50% threshold and n = 23.
    if style.guides {
        let reference = RED.mix(0.5).stroke_width(style.line_width);
        chart
            .draw_series(dashes((x0, scene.threshold_y), (x1, scene.threshold_y), reference))?
            .label(format!("{:.0}% threshold", scene.threshold_y * 100.0))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 6, y)], reference));
        chart
            .draw_series(dashes((scene.marker_x, y0), (scene.marker_x, y1), reference))?
            .label(format!("n={}", scene.marker_x))
            .legend(move |(x, y)| PathElement::new(vec![(x + 9, y - 4), (x + 9, y + 4)], reference));
    }

    if style.text && style.legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .background_style(style.background.unwrap_or(BLACK).mix(0.8))
            .border_style(fg)
            .label_font(("sans-serif", style.font_size).into_font().color(&fg))
            .draw()?;
    }

    Ok(())
}

fn fmt_group_size(v: &f64) -> String {
    format!("{v:.0}")
}

fn fmt_probability(v: &f64) -> String {
    format!("{v:.1}")
}

/// Split the segment `a → b` into evenly spaced dashes.
fn dashes(a: (f64, f64), b: (f64, f64), style: ShapeStyle) -> Vec<PathElement<(f64, f64)>> {
    let lerp = |t: f64| (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1));
    (0..DASHES)
        .map(|i| {
            let t0 = i as f64 / DASHES as f64;
            let t1 = (i as f64 + 0.6) / DASHES as f64;
            PathElement::new(vec![lerp(t0), lerp(t1)], style)
        })
        .collect()
}

/// Image format chosen from the output path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFormat {
    Png,
    Svg,
}

impl ChartFormat {
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => Ok(ChartFormat::Png),
            Some("svg") => Ok(ChartFormat::Svg),
            _ => Err(AppError::new(format!(
                "Unsupported chart format for '{}' (use .png or .svg).",
                path.display()
            ))),
        }
    }
}

/// Render the scene to `path` (PNG or SVG by extension).
pub fn save_chart(path: &Path, scene: &OverlayScene, width: u32, height: u32) -> Result<(), AppError> {
    let format = ChartFormat::from_path(path)?;
    let style = ChartStyle::for_format(format);
    let size = (width.max(200), height.max(150));
    let fail = |e: String| AppError::new(format!("Failed to render chart '{}': {e}", path.display()));

    match format {
        ChartFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_overlay(&root, scene, &style).map_err(|e| fail(e.to_string()))?;
            root.present().map_err(|e| fail(e.to_string()))?;
        }
        ChartFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_overlay(&root, scene, &style).map_err(|e| fail(e.to_string()))?;
            root.present().map_err(|e| fail(e.to_string()))?;
        }
    }

    tracing::info!(
        path = %path.display(),
        width = size.0,
        height = size.1,
        text = style.text,
        "chart written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FamilyFit, FitQuality, SolverSummary};
    use crate::math::Termination;

    fn selection() -> FitSelection {
        let fit = |family: Family, params: Vec<f64>, r_squared: f64| FamilyFit {
            family,
            params,
            quality: FitQuality {
                r_squared,
                sse: 0.0,
                rmse: 0.0,
                n: 3,
            },
            solver: SolverSummary {
                iterations: 1,
                evaluations: 1,
                termination: Termination::ExactSolve,
                start_index: 0,
            },
        };
        FitSelection {
            fits: vec![
                fit(Family::Exponential, vec![1.0, 1.0 / 730.0, 2.0], 0.99991),
                fit(Family::Polynomial, vec![0.0, 0.0, 0.01, 0.0], 0.9),
            ],
            best: Family::Exponential,
        }
    }

    fn points() -> Vec<ObservedPoint> {
        vec![
            ObservedPoint { n: 1.0, p: 0.0 },
            ObservedPoint { n: 23.0, p: 0.507297 },
            ObservedPoint { n: 60.0, p: 0.994123 },
        ]
    }

    #[test]
    fn scene_covers_fixed_domain() {
        let scene = build_scene(&points(), &selection());
        assert_eq!(scene.x_range, [0.0, 100.0]);
        assert_eq!(scene.y_range, [0.0, 1.0]);
        assert_eq!(scene.curves.len(), 2);
        assert_eq!(scene.curves[0].points.len(), CURVE_SAMPLES);
        assert_eq!(scene.curves[0].label, "Exponential (R²=0.9999)");
        assert!(scene.curves[0].is_best && !scene.curves[1].is_best);

        // The n = 23 observation lies inside the plotted domain.
        let (n, p) = scene.observed[1];
        assert!(n >= scene.x_range[0] && n <= scene.x_range[1]);
        assert!(p >= scene.y_range[0] && p <= scene.y_range[1]);
        assert_eq!(scene.marker_x, 23.0);
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ChartFormat::from_path(Path::new("a/birthday_curve.PNG")).unwrap(), ChartFormat::Png);
        assert_eq!(ChartFormat::from_path(Path::new("chart.svg")).unwrap(), ChartFormat::Svg);
        assert!(ChartFormat::from_path(Path::new("chart.jpg")).is_err());
        assert!(ChartFormat::from_path(Path::new("chart")).is_err());
    }

    #[test]
    fn svg_chart_is_written() {
        let path = std::env::temp_dir().join(format!("bday-{}-chart.svg", std::process::id()));
        let scene = build_scene(&points(), &selection());
        save_chart(&path, &scene, 600, 400).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(svg.contains("<svg"));
        assert!(svg.contains(CAPTION));
        assert!(svg.contains(X_DESC));
    }

    #[test]
    fn png_chart_is_written_with_default_features() {
        let path = std::env::temp_dir().join(format!("bday-{}-chart.png", std::process::id()));
        let scene = build_scene(&points(), &selection());
        save_chart(&path, &scene, 1200, 800).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(bytes.len() > 8);
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn bitmap_style_drops_text_without_font_backend() {
        let png = ChartStyle::for_format(ChartFormat::Png);
        assert_eq!(png.text, cfg!(feature = "fonts"));
        if !png.text {
            assert!(!png.caption && !png.legend && !png.axis_desc);
            assert_eq!((png.x_label_area, png.y_label_area), (0, 0));
        }
        assert!(ChartStyle::for_format(ChartFormat::Svg).text);
    }
}
