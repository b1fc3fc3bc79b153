//! Ratatui-based chart viewer.
//!
//! Shows the overlay chart (observed points, fitted curves, reference lines)
//! next to a panel with each family's R² and parameters. Curves can be toggled
//! individually; the viewer never refits.

use std::io;
use std::path::Path;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Terminal,
};

use crate::domain::{Family, ObservedPoint};
use crate::error::AppError;
use crate::fit::FitSelection;
use crate::plot::{build_scene, ChartStyle, OverlayScene, X_DESC, Y_DESC};

mod plotters_chart;

use plotters_chart::BirthdayChart;

/// Open the viewer and block until the user quits.
pub fn run(points: &[ObservedPoint], selection: &FitSelection, saved_to: Option<&Path>) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(points, selection, saved_to);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    scene: OverlayScene,
    selection: FitSelection,
    n_points: usize,
    /// One flag per entry of `scene.curves`.
    visible: Vec<bool>,
    guides: bool,
    saved_to: Option<String>,
    status: String,
}

impl App {
    fn new(points: &[ObservedPoint], selection: &FitSelection, saved_to: Option<&Path>) -> Self {
        let scene = build_scene(points, selection);
        let visible = vec![true; scene.curves.len()];
        Self {
            scene,
            selection: selection.clone(),
            n_points: points.len(),
            visible,
            guides: true,
            saved_to: saved_to.map(|p| p.display().to_string()),
            status: "Showing all fitted families.".to_string(),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the viewer should close.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char(c @ '1'..='9') => {
                let idx = (c as usize) - ('1' as usize);
                if let Some(flag) = self.visible.get_mut(idx) {
                    *flag = !*flag;
                    let curve = &self.scene.curves[idx];
                    let state = if *flag { "shown" } else { "hidden" };
                    self.status = format!("{} {state}.", curve.family.display_name());
                }
            }
            KeyCode::Char('a') => {
                self.visible.iter_mut().for_each(|v| *v = true);
                self.status = "Showing all fitted families.".to_string();
            }
            KeyCode::Char('b') => {
                for (flag, curve) in self.visible.iter_mut().zip(&self.scene.curves) {
                    *flag = curve.is_best;
                }
                self.status = format!("Showing best fit only ({}).", self.selection.best.display_name());
            }
            KeyCode::Char('t') => {
                self.guides = !self.guides;
                let state = if self.guides { "shown" } else { "hidden" };
                self.status = format!("Reference lines {state}.");
            }
            _ => {}
        }
        false
    }

    /// The scene restricted to the curves currently toggled on.
    fn visible_scene(&self) -> OverlayScene {
        let mut scene = self.scene.clone();
        scene.curves = self
            .scene
            .curves
            .iter()
            .zip(&self.visible)
            .filter(|(_, on)| **on)
            .map(|(c, _)| c.clone())
            .collect();
        scene
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let best = self.selection.best_fit();
        let saved = self.saved_to.as_deref().unwrap_or("-");

        let lines = vec![
            Line::from(vec![
                Span::styled("bday", Style::default().fg(Color::Cyan)),
                Span::raw(" | Birthday Paradox - Best Fit Functions"),
            ]),
            Line::from(Span::styled(
                format!(
                    "points: {} | best: {} (R² = {:.6}) | chart: {saved}",
                    self.n_points,
                    best.family.display_name(),
                    best.quality.r_squared,
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(40)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_fits(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = format!("{Y_DESC} vs {X_DESC}");
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let scene = self.visible_scene();
        let mut style = ChartStyle::terminal();
        style.guides = self.guides;

        // Tick labels come from the Plotters mesh on the fixed [0,100]×[0,1] frame.
        frame.render_widget(BirthdayChart { scene: &scene, style }, inner);
    }

    fn draw_fits(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut items = Vec::new();
        for (i, (fit, &on)) in self.selection.fits.iter().zip(&self.visible).enumerate() {
            let mark = if on { "[x]" } else { "[ ]" };
            let best = if fit.family == self.selection.best { " *" } else { "" };
            let mut style = Style::default().fg(family_color(fit.family));
            if !on {
                style = style.add_modifier(Modifier::DIM);
            }

            let params = fit
                .family
                .param_names()
                .iter()
                .zip(&fit.params)
                .map(|(name, v)| format!("{name}={v:.4e}"))
                .collect::<Vec<_>>();

            let mut lines = vec![Line::from(Span::styled(
                format!(
                    "{mark} {} {}{best}  R²={:.6}",
                    i + 1,
                    fit.family.display_name(),
                    fit.quality.r_squared
                ),
                style,
            ))];
            for pair in params.chunks(2) {
                lines.push(Line::from(Span::styled(
                    format!("      {}", pair.join("  ")),
                    Style::default().fg(Color::Gray),
                )));
            }
            items.push(ListItem::new(Text::from(lines)));
        }

        let list = List::new(items).block(Block::default().title("Fits").borders(Borders::ALL));
        frame.render_widget(list, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "1-4 toggle family  a all  b best only  t reference lines  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Terminal counterpart of the chart palette.
fn family_color(family: Family) -> Color {
    match family {
        Family::Exponential => Color::Red,
        Family::Logistic => Color::Green,
        Family::Power => Color::Magenta,
        Family::Polynomial => Color::Cyan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FamilyFit, FitQuality, SolverSummary};
    use crate::math::Termination;

    fn app() -> App {
        let fit = |family: Family, r_squared: f64| FamilyFit {
            family,
            params: vec![0.0; family.param_count()],
            quality: FitQuality {
                r_squared,
                sse: 0.0,
                rmse: 0.0,
                n: 2,
            },
            solver: SolverSummary {
                iterations: 0,
                evaluations: 1,
                termination: Termination::SmallStep,
                start_index: 0,
            },
        };
        let selection = FitSelection {
            fits: vec![fit(Family::Exponential, 0.9), fit(Family::Logistic, 0.99)],
            best: Family::Logistic,
        };
        let points = [ObservedPoint { n: 1.0, p: 0.0 }, ObservedPoint { n: 2.0, p: 0.0027 }];
        App::new(&points, &selection, None)
    }

    #[test]
    fn number_keys_toggle_curves() {
        let mut app = app();
        assert!(!app.handle_key(KeyCode::Char('1')));
        let scene = app.visible_scene();
        assert_eq!(scene.curves.len(), 1);
        assert_eq!(scene.curves[0].family, Family::Logistic);

        // Keys beyond the fitted families are ignored.
        app.handle_key(KeyCode::Char('9'));
        assert_eq!(app.visible, vec![false, true]);

        app.handle_key(KeyCode::Char('a'));
        assert_eq!(app.visible_scene().curves.len(), 2);
    }

    #[test]
    fn viewer_draws_chart_and_panel() {
        let mut app = app();
        let mut terminal = Terminal::new(ratatui::backend::TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("best: Logistic"));
        assert!(text.contains("Exponential"));
    }

    #[test]
    fn best_only_and_quit() {
        let mut app = app();
        app.handle_key(KeyCode::Char('b'));
        assert_eq!(app.visible, vec![false, true]);

        app.handle_key(KeyCode::Char('t'));
        assert!(!app.guides);

        assert!(app.handle_key(KeyCode::Char('q')));
        assert!(app.handle_key(KeyCode::Esc));
    }
}
