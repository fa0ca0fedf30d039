//! ASCII plotting for terminal output.
//!
//! Fixed-size grid, deterministic output. Two series share the x axis (row
//! index) but each gets its own y-scale, so columns with very different
//! magnitudes (cases vs. ICU patients) stay readable side by side.
//!
//! Plot elements:
//! - first series: `*`
//! - second series: `-`
//! - gaps (missing values) break the line

use crate::correlate::LaggedCorrelation;

/// Plot the shifted first column against the second one.
pub fn render_lagged_plot(lagged: &LaggedCorrelation, width: usize, height: usize) -> String {
    let b: Vec<Option<f64>> = lagged.b_values.iter().map(|&v| Some(v)).collect();
    let mut out = String::new();
    if let (Some(first), Some(last)) = (lagged.dates.first(), lagged.dates.last()) {
        out.push_str(&format!("Dates: {first} .. {last}\n"));
    }
    out.push_str(&render_dual_plot(
        &format!("{} (+{}d)", lagged.a.label(), lagged.alignment.shift),
        &lagged.shifted_a,
        lagged.b.label(),
        &b,
        width,
        height,
    ));
    out
}

/// Render two aligned series on independent y-scales.
pub fn render_dual_plot(
    a_label: &str,
    a: &[Option<f64>],
    b_label: &str,
    b: &[Option<f64>],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let n = a.len().max(b.len());

    let mut grid = vec![vec![' '; width]; height];

    // Second series first so the first one overlays it.
    let b_range = y_range(b).map(|(lo, hi)| pad_range(lo, hi, 0.05));
    if let Some((lo, hi)) = b_range {
        draw_series(&mut grid, b, n, lo, hi, '-');
    }
    let a_range = y_range(a).map(|(lo, hi)| pad_range(lo, hi, 0.05));
    if let Some((lo, hi)) = a_range {
        draw_series(&mut grid, a, n, lo, hi, '*');
    }

    let mut out = String::new();
    out.push_str(&format!("* {a_label}: {}\n", fmt_range(a_range)));
    out.push_str(&format!("- {b_label}: {}\n", fmt_range(b_range)));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn fmt_range(range: Option<(f64, f64)>) -> String {
    match range {
        Some((lo, hi)) => format!("y=[{lo:.2}, {hi:.2}]"),
        None => "no data".to_string(),
    }
}

fn y_range(values: &[Option<f64>]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &y in values.iter().flatten() {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if !(min_y.is_finite() && max_y.is_finite()) {
        None
    } else if max_y > min_y {
        Some((min_y, max_y))
    } else {
        // Flat line: center it.
        Some((min_y - 1.0, max_y + 1.0))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(i: usize, n: usize, width: usize) -> usize {
    if n < 2 {
        return 0;
    }
    let u = i as f64 / (n as f64 - 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // top row is max
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(grid: &mut [Vec<char>], values: &[Option<f64>], n: usize, y_min: f64, y_max: f64, ch: char) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev: Option<(usize, usize)> = None;
    for (i, v) in values.iter().enumerate() {
        let Some(y) = v.filter(|y| y.is_finite()) else {
            prev = None;
            continue;
        };
        let x = map_x(i, n, width);
        let yy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, ch),
            None => grid[yy][x] = ch,
        }
        prev = Some((x, yy));
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
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            grid[y0 as usize][x0 as usize] = ch;
        }

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
