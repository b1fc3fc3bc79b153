//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed points: `o`
//! - fitted curves: one letter per family (`e`, `l`, `p`, `c`)
//! - reference lines: `.` at P = 0.5, `:` at n = 23

use crate::domain::{
    Family, ObservedPoint, PLOT_X_RANGE, PLOT_Y_RANGE, THRESHOLD_N, THRESHOLD_PROBABILITY,
};
use crate::fit::FitSelection;
use crate::models::sample_curve;

const GUIDE_H: char = '.';
const GUIDE_V: char = ':';

/// Glyph used for a family's curve.
pub fn family_glyph(family: Family) -> char {
    match family {
        Family::Exponential => 'e',
        Family::Logistic => 'l',
        Family::Power => 'p',
        Family::Polynomial => 'c',
    }
}

/// Render observed points and every fitted curve on the fixed `[0,100]×[0,1]` frame.
///
/// The best family is drawn first so its glyph wins where curves overlap.
pub fn render_ascii_plot(points: &[ObservedPoint], selection: &FitSelection, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let [x_min, x_max] = PLOT_X_RANGE;
    let [y_min, y_max] = PLOT_Y_RANGE;
    let frame = Frame {
        x_min,
        x_max,
        y_min,
        y_max,
        width,
        height,
    };

    let mut grid = vec![vec![' '; width]; height];

    // Guides first so curves and points overlay them.
    let row = frame.map_y(THRESHOLD_PROBABILITY);
    for cell in grid[row].iter_mut() {
        *cell = GUIDE_H;
    }
    let col = frame.map_x(THRESHOLD_N);
    for line in grid.iter_mut() {
        if line[col] == ' ' {
            line[col] = GUIDE_V;
        }
    }

    let mut order: Vec<_> = selection.fits.iter().collect();
    order.sort_by_key(|f| f.family != selection.best);
    for fit in &order {
        let curve = sample_curve(fit.family, &fit.params, 1.0, x_max, width);
        draw_curve(&mut grid, &frame, &curve, family_glyph(fit.family));
    }

    for p in points {
        if !(p.n.is_finite() && p.p.is_finite()) {
            continue;
        }
        grid[frame.map_y(p.p)][frame.map_x(p.n)] = 'o';
    }

    let mut out = format!("Plot: n=[{x_min}, {x_max}] | P=[{y_min:.2}, {y_max:.2}] | o observed");
    for fit in &selection.fits {
        let best = if fit.family == selection.best { " (best)" } else { "" };
        out.push_str(&format!(
            " | {} {}{best}",
            family_glyph(fit.family),
            fit.family.display_name()
        ));
    }
    out.push('\n');

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

struct Frame {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    width: usize,
    height: usize,
}

impl Frame {
    fn map_x(&self, x: f64) -> usize {
        let u = ((x - self.x_min) / (self.x_max - self.x_min)).clamp(0.0, 1.0);
        (u * (self.width as f64 - 1.0)).round() as usize
    }

    fn map_y(&self, y: f64) -> usize {
        let u = ((y - self.y_min) / (self.y_max - self.y_min)).clamp(0.0, 1.0);
        // y=top is max -> row 0
        (self.height as f64 - 1.0 - (u * (self.height as f64 - 1.0))).round() as usize
    }
}

fn draw_curve(grid: &mut [Vec<char>], frame: &Frame, curve: &[(f64, f64)], ch: char) {
    let mut prev = None;
    for &(x, y) in curve {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let cx = frame.map_x(x);
        let cy = frame.map_y(y);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, cx, cy, ch),
            None => plot_cell(grid, cx as isize, cy as isize, ch),
        }
        prev = Some((cx, cy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        plot_cell(grid, x0, y0, ch);

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Curves replace blanks and guides, never another curve.
fn plot_cell(grid: &mut [Vec<char>], x: isize, y: isize, ch: char) {
    if y < 0 || x < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if let Some(cell) = grid.get_mut(y).and_then(|row| row.get_mut(x)) {
        if matches!(*cell, ' ' | GUIDE_H | GUIDE_V) {
            *cell = ch;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FamilyFit, FitQuality, SolverSummary};
    use crate::math::Termination;

    #[test]
    fn plot_golden_snapshot_small() {
        let points = vec![
            ObservedPoint { n: 1.0, p: 0.0 },
            ObservedPoint { n: 23.0, p: 0.507297 },
            ObservedPoint { n: 60.0, p: 0.994123 },
        ];
        let selection = FitSelection {
            fits: vec![FamilyFit {
                family: Family::Polynomial,
                params: vec![0.0, 0.0, 0.01, 0.0],
                quality: FitQuality {
                    r_squared: 0.9,
                    sse: 0.0,
                    rmse: 0.0,
                    n: 3,
                },
                solver: SolverSummary {
                    iterations: 0,
                    evaluations: 1,
                    termination: Termination::ExactSolve,
                    start_index: 0,
                },
            }],
            best: Family::Polynomial,
        };

        let txt = render_ascii_plot(&points, &selection, 10, 5);
        let expected = concat!(
            "Plot: n=[0, 100] | P=[0.00, 1.00] | o observed | c Polynomial (best)\n",
            "  :  o  cc\n",
            "  :   cc  \n",
            "..o.cc....\n",
            "  cc      \n",
            "oc:       \n",
        );
        assert_eq!(txt, expected);
    }
}
