//! Plotters-powered line chart widget for Ratatui.
//!
//! Why Plotters instead of Ratatui's built-in `Chart` widget?
//! - nicer axis + mesh rendering
//! - less manual work for ticks/labels
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use chrono::{Datelike, NaiveDate};
use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// One named line. Missing points split the line into segments.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    pub color: RGBColor,
    pub points: Vec<Option<(f64, f64)>>,
}

impl ChartSeries {
    /// Build a dated series; x is the day number, see [`date_x`].
    pub fn dated<I>(label: impl Into<String>, color: RGBColor, dates: &[NaiveDate], values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let points = dates
            .iter()
            .zip(values)
            .map(|(&d, v)| v.filter(|v| v.is_finite()).map(|v| (date_x(d), v)))
            .collect();
        Self {
            label: label.into(),
            color,
            points,
        }
    }

    /// Contiguous runs of defined points.
    pub fn segments(&self) -> Vec<Vec<(f64, f64)>> {
        let mut out = Vec::new();
        let mut current = Vec::new();
        for p in &self.points {
            match p {
                Some(p) => current.push(*p),
                None if !current.is_empty() => out.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }

    /// Ratatui color matching the plotted line (for legends).
    pub fn tui_color(&self) -> Color {
        Color::Rgb(self.color.0, self.color.1, self.color.2)
    }
}

pub fn date_x(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

pub fn fmt_date_x(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

/// Data bounds over every series, with 5% y padding.
pub fn bounds(series: &[ChartSeries]) -> Option<([f64; 2], [f64; 2])> {
    let (mut x0, mut x1) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y0, mut y1) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in series.iter().flat_map(|s| s.points.iter().flatten()) {
        x0 = x0.min(x);
        x1 = x1.max(x);
        y0 = y0.min(y);
        y1 = y1.max(y);
    }
    if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) {
        return None;
    }
    if x1 <= x0 {
        x1 = x0 + 1.0;
    }
    if y1 <= y0 {
        y0 -= 1.0;
        y1 += 1.0;
    }
    let pad = ((y1 - y0).abs() * 0.05).max(1e-12);
    Some(([x0, x1], [y0 - pad, y1 + pad]))
}

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct LineChart<'a> {
    pub series: &'a [ChartSeries],
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for LineChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            for s in self.series {
                for segment in s.segments() {
                    if segment.len() == 1 {
                        chart.draw_series(segment.iter().map(|&p| Pixel::new(p, s.color)))?;
                    } else {
                        chart.draw_series(LineSeries::new(segment.into_iter(), &s.color))?;
                    }
                }
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, day).unwrap()
    }

    #[test]
    fn gaps_split_segments() {
        let dates: Vec<NaiveDate> = (1..=6).map(d).collect();
        let s = ChartSeries::dated(
            "x",
            WHITE,
            &dates,
            [Some(1.0), Some(2.0), None, Some(f64::NAN), Some(3.0), Some(4.0)],
        );
        let segs = s.segments();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].len(), 2);
        assert_eq!(segs[1][0], (date_x(d(5)), 3.0));
    }

    #[test]
    fn bounds_cover_all_series_and_handle_flat_lines() {
        let dates = [d(1), d(2)];
        let a = ChartSeries::dated("a", WHITE, &dates, [Some(5.0), Some(5.0)]);
        let (xb, yb) = bounds(std::slice::from_ref(&a)).unwrap();
        assert_eq!(xb, [date_x(d(1)), date_x(d(2))]);
        assert!(yb[0] < 4.0 && yb[1] > 6.0);

        let empty = ChartSeries::dated("e", WHITE, &dates, [None, None]);
        assert!(bounds(&[empty]).is_none());
    }

    #[test]
    fn date_axis_labels_round_trip() {
        assert_eq!(fmt_date_x(date_x(d(15))), "2021-03");
    }
}
