//! Plotters-powered birthday chart widget for Ratatui.
//!
//! The same `draw_overlay` used for PNG/SVG output is rendered into the Ratatui
//! buffer using `plotters-ratatui-backend`.

use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::plot::{draw_overlay, ChartStyle, OverlayScene};

/// A render-only chart: the scene is computed outside the render call.
pub struct BirthdayChart<'a> {
    pub scene: &'a OverlayScene,
    pub style: ChartStyle,
}

impl<'a> Widget for BirthdayChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        // In that case, we render a small hint rather than panicking.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let widget = widget_fn(move |root| {
            draw_overlay(&root, self.scene, &self.style)?;
            Ok(())
        });

        widget.render(area, buf);
    }
}
