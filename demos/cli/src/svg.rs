//! Xuất `ChartModel` thành một file SVG độc lập.

use std::fmt::Write;

use labs_core::{ChartModel, MarkerState};

pub fn render(chart: &ChartModel) -> String {
    let width = chart.viewport.width;
    let height = chart.viewport.height;
    let plot = chart.plot;
    let mut out = String::new();

    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{width}" height="{height}" font-family="sans-serif" font-size="12">"#
    );
    let _ = writeln!(out, r#"<rect width="{width}" height="{height}" fill="white"/>"#);

    for tick in &chart.y_ticks {
        let _ = writeln!(
            out,
            r##"<line x1="{:.2}" x2="{:.2}" y1="{y:.2}" y2="{y:.2}" stroke="#e5e7eb" stroke-dasharray="3 3"/><text x="{:.2}" y="{:.2}" text-anchor="end" fill="#52606d">{}</text>"##,
            plot.left,
            plot.right(),
            plot.left - 8.0,
            tick.position + 4.0,
            escape(&tick.label),
            y = tick.position,
        );
    }

    for tick in &chart.x_ticks {
        let _ = writeln!(
            out,
            r##"<line x1="{x:.2}" x2="{x:.2}" y1="{:.2}" y2="{:.2}" stroke="#e5e7eb" stroke-dasharray="3 3"/><text x="{x:.2}" y="{:.2}" text-anchor="middle" fill="#52606d">{}</text>"##,
            plot.top,
            plot.bottom(),
            plot.bottom() + 20.0,
            escape(&tick.label),
            x = tick.position,
        );
    }

    let _ = writeln!(
        out,
        r##"<path d="{}" fill="#2563eb" fill-opacity="0.12"/>"##,
        chart.area_path()
    );
    let _ = writeln!(
        out,
        r##"<path d="{}" fill="none" stroke="#2563eb" stroke-width="2.5"/>"##,
        chart.line_path()
    );
    let _ = writeln!(
        out,
        r##"<line x1="{:.2}" x2="{:.2}" y1="{y:.2}" y2="{y:.2}" stroke="#059669" stroke-dasharray="6 4"/><text x="{:.2}" y="{:.2}" text-anchor="end" fill="#059669">{}</text>"##,
        plot.left,
        plot.right(),
        plot.right() - 4.0,
        chart.mean_y - 6.0,
        escape(&chart.mean_label),
        y = chart.mean_y,
    );

    for marker in &chart.markers {
        let (stroke, opacity) = match marker.state {
            MarkerState::Included => ("#2563eb", 1.0),
            MarkerState::Excluded => ("#9aa5b1", 0.6),
        };
        let _ = writeln!(
            out,
            r#"<circle cx="{:.2}" cy="{:.2}" r="5" fill="white" stroke="{stroke}" stroke-width="2" opacity="{opacity}"><title>{}</title></circle>"#,
            marker.x,
            marker.y,
            escape(marker.id.as_str())
        );
    }

    let _ = writeln!(
        out,
        r##"<text x="{:.2}" y="{:.2}" text-anchor="middle" fill="#52606d">{}</text>"##,
        plot.center_x(),
        height - 12.0,
        escape(&chart.date_axis_label)
    );
    let _ = writeln!(
        out,
        r##"<text x="16" y="{y:.2}" text-anchor="middle" fill="#52606d" transform="rotate(-90 16 {y:.2})">{}</text>"##,
        escape(&chart.value_axis_label),
        y = plot.center_y(),
    );

    out.push_str("</svg>\n");
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
