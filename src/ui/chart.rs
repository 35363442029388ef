use crate::ui::theme;
use owo_colors::OwoColorize;
use std::fmt::Write;

const BAR: &str = "█";

/// Horizontal bar chart, one line per point, scaled to `width` cells
pub fn bar_chart(points: &[(String, f64)], width: usize) -> String {
    let mut out = String::new();
    if points.is_empty() {
        return out;
    }

    let label_width = points
        .iter()
        .map(|(label, _)| console::measure_text_width(label))
        .max()
        .unwrap_or(0);
    let max = points.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);

    for (label, value) in points {
        let cells = if max > 0.0 && *value > 0.0 {
            ((value / max) * width as f64).round() as usize
        } else {
            0
        };
        let padding = label_width.saturating_sub(console::measure_text_width(label));
        writeln!(
            out,
            "{}{} │ {} {}",
            label,
            " ".repeat(padding),
            BAR.repeat(cells).style(theme().bar.clone()),
            format_value(*value)
        )
        .ok();
    }
    out
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}
