//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the derivation/correlation code stays clean and testable
//! - output changes are localized

use crate::correlate::{Alignment, CorrelatedPair, CorrelationTable, LaggedCorrelation};
use crate::domain::{CountrySeries, Metric};
use crate::views::{Comparison, CountryTrajectory, ExplorerView, LinearTrend, TrendReport};

/// Dataset coverage plus the latest value of every column.
pub fn format_series_summary(series: &CountrySeries) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== covx - {} ===\n", series.country));
    match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => {
            out.push_str(&format!("Rows: {} | {first} .. {last}\n", series.len()));
        }
        _ => {
            out.push_str("Rows: 0 (no complete rows after smoothing)\n");
            return out;
        }
    }

    if let Some(last) = series.rows.last() {
        out.push_str(&format!("\nLatest ({}):\n", last.date));
        for m in Metric::ALL {
            out.push_str(&format!("  {:<42} {:>16}\n", m.label(), fmt_num(m.value(last))));
        }
    }

    out
}

/// One-line description of a lag search.
pub fn format_alignment(a: Metric, b: Metric, alignment: &Alignment) -> String {
    format!(
        "{} shifted {} days ahead is correlated with {}. r={:.2}",
        a.label(),
        alignment.shift,
        b.label(),
        alignment.r
    )
}

pub fn format_lagged(lagged: &LaggedCorrelation) -> String {
    let mut out = format_alignment(lagged.a, lagged.b, &lagged.alignment);
    out.push('\n');
    if let (Some(first), Some(last)) = (lagged.dates.first(), lagged.dates.last()) {
        out.push_str(&format!("Lookback: {} days ({first} .. {last})\n", lagged.lookback));
    }
    out
}

/// Square correlation matrix with abbreviated headers.
pub fn format_correlation_table(table: &CorrelationTable) -> String {
    let mut out = String::new();

    out.push_str(&format!("{:<26}", ""));
    for &c in &table.columns {
        out.push_str(&format!(" {:>9}", truncate(c.key(), 9)));
    }
    out.push('\n');

    for (i, &row) in table.columns.iter().enumerate() {
        out.push_str(&format!("{:<26}", truncate(row.label(), 26)));
        for v in &table.values[i] {
            out.push_str(&format!(" {:>9}", fmt_r(*v)));
        }
        out.push('\n');
    }

    out
}

/// Top pair followed by the ranked list of pairs.
pub fn format_pairs(top: Option<&CorrelatedPair>, pairs: &[CorrelatedPair]) -> String {
    let mut out = String::new();

    match top {
        Some(p) => out.push_str(&format!(
            "Most correlated: {} / {} (r={})\n\n",
            p.a.label(),
            p.b.label(),
            fmt_r(p.r)
        )),
        None => out.push_str("Most correlated: - (not enough overlapping data)\n\n"),
    }

    out.push_str(
        format!("{:<42} {:<42} {:>7}\n", "a", "b", "r")
            .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<42} {:-<42} {:->7}\n", "", "", "").trim_end());
    out.push('\n');
    for p in pairs {
        out.push_str(&format!("{:<42} {:<42} {:>7}\n", p.a.label(), p.b.label(), fmt_r(p.r)));
    }

    out
}

pub fn format_trends(report: &TrendReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Linear trends for {} ===\n", report.country));
    out.push_str(&format_trend("Total cases", &report.cases));
    out.push_str(&format_trend("People fully vaccinated", &report.vaccinations));
    out
}

fn format_trend(title: &str, trend: &LinearTrend) -> String {
    let span = match (trend.dates.first(), trend.dates.last()) {
        (Some(a), Some(b)) => format!("{a} .. {b}"),
        _ => "-".to_string(),
    };
    let r2 = trend.r_squared.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".to_string());
    format!(
        "{title}: y = {} + {} * day | R²={r2} | n={} ({span})\n",
        fmt_num(trend.intercept),
        fmt_num(trend.slope),
        trend.observed.len(),
    )
}

/// The explorer summary table (last N days).
pub fn format_explorer(view: &ExplorerView) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Summary for {} (last {} days, {}-day moving average of new cases)\n",
        view.country,
        view.summary().len(),
        view.options.moving_average_days
    ));
    out.push_str(
        format!(
            "{:<10} {:>14} {:>12} {:>14} {:>14}\n",
            "date", "total_cases", "new_cases", "total_deaths", "moving_avg"
        )
        .trim_end(),
    );
    out.push('\n');
    for r in view.summary() {
        out.push_str(&format!(
            "{:<10} {:>14} {:>12} {:>14} {:>14}\n",
            r.date,
            fmt_opt(r.total_cases),
            fmt_opt(r.new_cases),
            fmt_opt(r.total_deaths),
            fmt_opt(r.moving_average),
        ));
    }
    out
}

pub fn format_comparison(cmp: &Comparison) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== {} vs {} ===\n",
        cmp.first.country, cmp.second.country
    ));
    out.push_str(&format_trajectory(&cmp.first));
    out.push_str(&format_trajectory(&cmp.second));
    out
}

fn format_trajectory(t: &CountryTrajectory) -> String {
    let latest = t
        .latest_total_cases()
        .map(|(d, v)| format!("{} on {d}", fmt_num(v)))
        .unwrap_or_else(|| "-".to_string());
    let peak = t
        .peak_new_cases()
        .map(|(d, v)| format!("{} on {d}", fmt_num(v)))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<24} days={:<5} total cases: {latest} | peak new cases: {peak}\n",
        truncate(&t.country, 24),
        t.dates.len()
    )
}

fn fmt_num(v: f64) -> String {
    if v.abs() >= 1000.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.3}")
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(fmt_num).unwrap_or_else(|| "-".to_string())
}

fn fmt_r(v: Option<f64>) -> String {
    v.map(|r| format!("{r:.3}")).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_sentence() {
        let s = format_alignment(
            Metric::NewCases,
            Metric::NewDeaths,
            &Alignment { r: 0.8765, shift: 12 },
        );
        assert_eq!(s, "New cases shifted 12 days ahead is correlated with New deaths. r=0.88");
    }

    #[test]
    fn undefined_cells_render_as_dash() {
        let table = CorrelationTable {
            columns: vec![Metric::NewCases, Metric::IcuPatients],
            values: vec![vec![Some(1.0), None], vec![None, None]],
        };
        let text = format_correlation_table(&table);
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(2).unwrap().trim_end().ends_with('-'));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("infection_fatality_rate", 9), "infectio.");
        assert_eq!(truncate("short", 9), "short");
    }
}
