//! Ratatui-based terminal dashboard.
//!
//! Four modes share one settings panel (country, comparison country, column
//! pickers, lookback and explorer sliders):
//! - Explorer: raw data, moving average and a summary table
//! - Correlation Explorer: best lag between two columns plus the correlation table
//! - Linear Regression: case and vaccination trends
//! - TimeSeries Analysis: two countries side by side
//!
//! Analysis failures are shown in the status line; they never end the session.

use std::io;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use plotters::style::RGBColor;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Tabs},
};
use tracing::{debug, info};

use crate::app::pipeline::{Dataset, load_dataset, resolve_columns, resolve_country};
use crate::cli::DataArgs;
use crate::config::Settings;
use crate::correlate::{CorrelationTable, LaggedCorrelation, correlation_table, default_lookback, search_columns};
use crate::domain::{AnalysisColumns, Metric};
use crate::error::AppError;
use crate::views::{
    Comparison, ExplorerOptions, ExplorerView, LinearTrend, MOVING_AVERAGE_RANGE, TABLE_DAYS_RANGE, TrendReport,
    compare_countries, explore, fit_trends,
};

mod plotters_chart;

use plotters_chart::{ChartSeries, LineChart, bounds, fmt_date_x};

/// Lookback slider step (rows).
const LOOKBACK_STEP: usize = 10;

const CYAN: RGBColor = RGBColor(0, 255, 255);
const ORANGE: RGBColor = RGBColor(255, 165, 0);
const GREEN: RGBColor = RGBColor(0, 255, 0);
const MAGENTA: RGBColor = RGBColor(255, 0, 255);

/// Start the dashboard.
pub fn run(args: DataArgs, settings: Settings) -> Result<(), AppError> {
    // Load before taking over the terminal so input errors print normally.
    let dataset = load_dataset(&args, &settings)?;
    let country = resolve_country(&args, &settings, &dataset);
    let columns = resolve_columns(&[], &settings)?;
    let mut app = App::new(dataset, &country, columns);

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Explorer,
    Correlation,
    Regression,
    TimeSeries,
}

impl Mode {
    const ALL: [Mode; 4] = [Mode::Explorer, Mode::Correlation, Mode::Regression, Mode::TimeSeries];

    fn title(self) -> &'static str {
        match self {
            Mode::Explorer => "Explorer",
            Mode::Correlation => "Correlation Explorer",
            Mode::Regression => "Linear Regression",
            Mode::TimeSeries => "TimeSeries Analysis",
        }
    }

    fn index(self) -> usize {
        Mode::ALL.iter().position(|&m| m == self).unwrap_or(0)
    }

    fn shifted(self, delta: i32) -> Self {
        Mode::ALL[cycle(self.index(), Mode::ALL.len(), delta)]
    }

    fn fields(self) -> &'static [Field] {
        match self {
            Mode::Explorer => &[Field::Country, Field::ExplorerChart, Field::TableDays, Field::MovingAverage],
            Mode::Correlation => &[Field::Country, Field::ColumnA, Field::ColumnB, Field::Lookback],
            Mode::Regression => &[Field::Country],
            Mode::TimeSeries => &[Field::Country, Field::Other],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Country,
    Other,
    ExplorerChart,
    TableDays,
    MovingAverage,
    ColumnA,
    ColumnB,
    Lookback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExplorerChart {
    TotalCases,
    MovingAverage,
    TotalDeaths,
}

impl ExplorerChart {
    const ALL: [ExplorerChart; 3] = [ExplorerChart::TotalCases, ExplorerChart::MovingAverage, ExplorerChart::TotalDeaths];

    fn title(self) -> &'static str {
        match self {
            ExplorerChart::TotalCases => "Total cases",
            ExplorerChart::MovingAverage => "New cases (moving average)",
            ExplorerChart::TotalDeaths => "Total deaths",
        }
    }
}

#[derive(Debug, Default)]
struct Results {
    explorer: Option<ExplorerView>,
    table: Option<CorrelationTable>,
    lagged: Option<LaggedCorrelation>,
    trends: Option<TrendReport>,
    comparison: Option<Comparison>,
}

struct App {
    dataset: Dataset,
    columns: AnalysisColumns,
    mode: Mode,
    selected_field: usize,
    country_idx: usize,
    other_idx: usize,
    column_a: usize,
    column_b: usize,
    /// `None` = default window for the current series.
    lookback: Option<usize>,
    series_len: usize,
    explorer: ExplorerOptions,
    explorer_chart: ExplorerChart,
    results: Results,
    status: String,
}

impl App {
    fn new(dataset: Dataset, country: &str, columns: AnalysisColumns) -> Self {
        let found = dataset.countries.iter().position(|c| c == country);
        let country_idx = found.unwrap_or(0);
        let other_idx = cycle(country_idx, dataset.countries.len(), 1);
        let column_a = columns.position(Metric::NewCases).unwrap_or(0);
        let column_b = columns.position(Metric::NewDeaths).unwrap_or(1.min(columns.len().saturating_sub(1)));

        let mut app = Self {
            dataset,
            columns,
            mode: Mode::Explorer,
            selected_field: 0,
            country_idx,
            other_idx,
            column_a,
            column_b,
            lookback: None,
            series_len: 0,
            explorer: ExplorerOptions::default(),
            explorer_chart: ExplorerChart::TotalCases,
            results: Results::default(),
            status: String::new(),
        };
        app.refresh();
        if found.is_none() {
            app.status = format!("Country '{country}' not in dataset; showing {}.", app.country_label());
        }
        app
    }

    fn country(&self) -> Option<&str> {
        self.dataset.countries.get(self.country_idx).map(String::as_str)
    }

    fn other(&self) -> Option<&str> {
        self.dataset.countries.get(self.other_idx).map(String::as_str)
    }

    fn country_label(&self) -> String {
        self.country().unwrap_or("-").to_string()
    }

    fn metric_a(&self) -> Option<Metric> {
        self.columns.get(self.column_a)
    }

    fn metric_b(&self) -> Option<Metric> {
        self.columns.get(self.column_b)
    }

    fn effective_lookback(&self) -> usize {
        self.lookback.unwrap_or_else(|| default_lookback(self.series_len))
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100)).map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
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
        info!(hits = self.dataset.cache.hits(), misses = self.dataset.cache.misses(), "dashboard closed");
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        let fields = self.mode.fields();
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => self.switch_mode(1),
            KeyCode::BackTab => self.switch_mode(-1),
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < fields.len() {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::PageUp => self.adjust_field(-10),
            KeyCode::PageDown => self.adjust_field(10),
            _ => {}
        }
        false
    }

    fn switch_mode(&mut self, delta: i32) {
        self.mode = self.mode.shifted(delta);
        self.selected_field = 0;
        self.refresh();
    }

    fn adjust_field(&mut self, delta: i32) {
        let Some(&field) = self.mode.fields().get(self.selected_field) else {
            return;
        };
        let step = delta.signum();

        match field {
            Field::Country => {
                self.country_idx = cycle(self.country_idx, self.dataset.countries.len(), delta);
                self.lookback = None;
            }
            Field::Other => {
                self.other_idx = cycle(self.other_idx, self.dataset.countries.len(), delta);
            }
            Field::ExplorerChart => {
                let i = ExplorerChart::ALL.iter().position(|&c| c == self.explorer_chart).unwrap_or(0);
                self.explorer_chart = ExplorerChart::ALL[cycle(i, ExplorerChart::ALL.len(), step)];
                return;
            }
            Field::TableDays => {
                self.explorer.table_days = step_in_range(self.explorer.table_days, step, TABLE_DAYS_RANGE);
            }
            Field::MovingAverage => {
                self.explorer.moving_average_days =
                    step_in_range(self.explorer.moving_average_days, step, MOVING_AVERAGE_RANGE);
            }
            Field::ColumnA => {
                self.column_a = cycle(self.column_a, self.columns.len(), step);
            }
            Field::ColumnB => {
                self.column_b = cycle(self.column_b, self.columns.len(), step);
            }
            Field::Lookback => {
                let current = self.effective_lookback() as i64;
                let next = (current + step as i64 * LOOKBACK_STEP as i64).clamp(0, self.series_len as i64);
                self.lookback = Some(next as usize);
            }
        }
        self.refresh();
    }

    /// Recompute the results shown by the current mode.
    fn refresh(&mut self) {
        let Some(country) = self.country().map(str::to_string) else {
            self.status = "Dataset has no countries.".to_string();
            return;
        };
        self.status = String::new();

        match self.mode {
            Mode::Explorer => match explore(self.dataset.records(), &country, self.explorer) {
                Ok(view) => self.results.explorer = Some(view),
                Err(e) => {
                    self.results.explorer = None;
                    self.status = format!("No data: {e}");
                }
            },
            Mode::Correlation => self.refresh_correlation(&country),
            Mode::Regression => match fit_trends(self.dataset.records(), &country) {
                Ok(report) => self.results.trends = Some(report),
                Err(e) => {
                    self.results.trends = None;
                    self.status = format!("No data: {e}");
                }
            },
            Mode::TimeSeries => {
                let other = self.other().unwrap_or_default().to_string();
                match compare_countries(self.dataset.records(), &country, &other) {
                    Ok(cmp) => self.results.comparison = Some(cmp),
                    Err(e) => {
                        self.results.comparison = None;
                        self.status = format!("No data: {e}");
                    }
                }
            }
        }
        debug!(mode = self.mode.title(), country = %country, status = %self.status, "refreshed");
    }

    fn refresh_correlation(&mut self, country: &str) {
        self.results.table = None;
        self.results.lagged = None;

        let series = match self.dataset.cache.series(country) {
            Ok(s) => s,
            Err(e) => {
                self.series_len = 0;
                self.status = format!("No data: {e}");
                return;
            }
        };
        self.series_len = series.len();
        if let Some(lb) = self.lookback {
            self.lookback = Some(lb.min(self.series_len));
        }

        self.results.table = Some(correlation_table(&series, &self.columns));

        let (Some(a), Some(b)) = (self.metric_a(), self.metric_b()) else {
            self.status = "No analysis columns configured.".to_string();
            return;
        };
        match search_columns(&series, a, b, self.effective_lookback()) {
            Ok(lagged) => self.results.lagged = Some(lagged),
            Err(e) => self.status = format!("No data: {e}"),
        }
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
        let block = Block::default().borders(Borders::ALL).title(Line::from(vec![
            Span::styled("covx", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" | COVID-19 data explorer | {}", self.dataset.source)),
        ]));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        let tabs = Tabs::new(Mode::ALL.iter().map(|m| m.title()).collect::<Vec<_>>())
            .select(self.mode.index())
            .style(Style::default().fg(Color::Gray))
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, rows[0]);

        let info = format!(
            "country: {} | countries: {} | series rows: {}",
            self.country_label(),
            self.dataset.countries.len(),
            self.series_len
        );
        frame.render_widget(Paragraph::new(info).style(Style::default().fg(Color::Gray)), rows[1]);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(36), Constraint::Min(0)])
            .split(area);

        self.draw_settings(frame, chunks[0]);
        match self.mode {
            Mode::Explorer => self.draw_explorer(frame, chunks[1]),
            Mode::Correlation => self.draw_correlation(frame, chunks[1]),
            Mode::Regression => self.draw_regression(frame, chunks[1]),
            Mode::TimeSeries => self.draw_timeseries(frame, chunks[1]),
        }
    }

    fn field_label(&self, field: Field) -> String {
        let metric = |m: Option<Metric>| m.map(|m| m.label()).unwrap_or("-");
        match field {
            Field::Country => format!("Country: {}", self.country_label()),
            Field::Other => format!("Compare with: {}", self.other().unwrap_or("-")),
            Field::ExplorerChart => format!("Chart: {}", self.explorer_chart.title()),
            Field::TableDays => format!("Table days: {}", self.explorer.table_days),
            Field::MovingAverage => format!("Moving average: {}d", self.explorer.moving_average_days),
            Field::ColumnA => format!("A: {}", metric(self.metric_a())),
            Field::ColumnB => format!("B: {}", metric(self.metric_b())),
            Field::Lookback => match self.effective_lookback() {
                0 => "Lookback: all rows".to_string(),
                n => format!("Lookback: {n} rows"),
            },
        }
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .mode
            .fields()
            .iter()
            .map(|&f| ListItem::new(self.field_label(f)))
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_explorer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(view) = &self.results.explorer else {
            self.draw_no_data(frame, area, Mode::Explorer.title());
            return;
        };

        let summary = view.summary();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(summary.len() as u16 + 3)])
            .split(area);

        let (pairs, color) = match self.explorer_chart {
            ExplorerChart::TotalCases => (view.total_cases(), CYAN),
            ExplorerChart::MovingAverage => (view.moving_average(), ORANGE),
            ExplorerChart::TotalDeaths => (view.total_deaths(), MAGENTA),
        };
        let series = [series_from_pairs(self.explorer_chart.title(), color, &pairs)];
        draw_chart(frame, chunks[0], &view.country, &series, "count");

        let header = Row::new(["date", "total cases", "new cases", "total deaths", "moving avg"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        let rows = summary.iter().map(|r| {
            Row::new([
                Cell::from(r.date.to_string()),
                Cell::from(fmt_cell(r.total_cases)),
                Cell::from(fmt_cell(r.new_cases)),
                Cell::from(fmt_cell(r.total_deaths)),
                Cell::from(fmt_cell(r.moving_average)),
            ])
        });
        let table = Table::new(rows, [Constraint::Length(12); 5]).header(header).block(
            Block::default()
                .title(format!("Last {} days", summary.len()))
                .borders(Borders::ALL),
        );
        frame.render_widget(table, chunks[1]);
    }

    fn draw_correlation(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let table_height = self.results.table.as_ref().map(|t| t.columns.len() as u16 + 3).unwrap_or(3);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(4), Constraint::Length(table_height)])
            .split(area);

        match &self.results.lagged {
            Some(lagged) => {
                let series = [
                    ChartSeries::dated(
                        format!("{} (+{}d)", lagged.a.label(), lagged.alignment.shift),
                        CYAN,
                        &lagged.dates,
                        normalize(&lagged.shifted_a),
                    ),
                    ChartSeries::dated(
                        lagged.b.label(),
                        ORANGE,
                        &lagged.dates,
                        normalize(&lagged.b_values.iter().map(|&v| Some(v)).collect::<Vec<_>>()),
                    ),
                ];
                draw_chart(frame, chunks[0], "scaled 0..1", &series, "scaled");
            }
            None => self.draw_no_data(frame, chunks[0], Mode::Correlation.title()),
        }

        let mut lines = Vec::new();
        if let Some(lagged) = &self.results.lagged {
            lines.push(Line::from(crate::report::format_alignment(lagged.a, lagged.b, &lagged.alignment)));
        }
        if let Some(top) = self.results.table.as_ref().and_then(|t| t.top_pair()) {
            lines.push(Line::from(format!(
                "Most correlated: {} / {} (r={})",
                top.a.label(),
                top.b.label(),
                fmt_r(top.r)
            )));
        }
        let p = Paragraph::new(Text::from(lines)).block(Block::default().title("Result").borders(Borders::ALL));
        frame.render_widget(p, chunks[1]);

        if let Some(table) = &self.results.table {
            frame.render_widget(correlation_widget(table), chunks[2]);
        }
    }

    fn draw_regression(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(report) = &self.results.trends else {
            self.draw_no_data(frame, area, Mode::Regression.title());
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        for (trend, name, rect) in [
            (&report.cases, "Total cases", chunks[0]),
            (&report.vaccinations, "People fully vaccinated", chunks[1]),
        ] {
            let title = trend_title(name, trend);
            draw_chart(frame, rect, &title, &trend_series(trend), "count");
        }
    }

    fn draw_timeseries(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(cmp) = &self.results.comparison else {
            self.draw_no_data(frame, area, Mode::TimeSeries.title());
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let totals = [
            ChartSeries::dated(&cmp.first.country, CYAN, &cmp.first.dates, cmp.first.total_cases.clone()),
            ChartSeries::dated(&cmp.second.country, ORANGE, &cmp.second.dates, cmp.second.total_cases.clone()),
        ];
        draw_chart(frame, chunks[0], "Total cases", &totals, "cases");

        let daily = [
            ChartSeries::dated(&cmp.first.country, CYAN, &cmp.first.dates, cmp.first.new_cases.clone()),
            ChartSeries::dated(&cmp.second.country, ORANGE, &cmp.second.dates, cmp.second.new_cases.clone()),
        ];
        draw_chart(frame, chunks[1], "New cases", &daily, "cases");
    }

    fn draw_no_data(&self, frame: &mut ratatui::Frame<'_>, area: Rect, title: &str) {
        let msg = if self.status.is_empty() { "No data." } else { self.status.as_str() };
        let p = Paragraph::new(msg)
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().title(title.to_string()).borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab mode  ↑/↓ select  ←/→ adjust  PgUp/PgDn jump  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Wrap `idx + delta` into `0..len`.
fn cycle(idx: usize, len: usize, delta: i32) -> usize {
    if len == 0 {
        return 0;
    }
    (idx as i64 + delta as i64).rem_euclid(len as i64) as usize
}

fn step_in_range(value: usize, delta: i32, (lo, hi): (usize, usize)) -> usize {
    (value as i64 + delta as i64).clamp(lo as i64, hi as i64) as usize
}

/// Min-max scale to `0..=1`; a flat series sits at 0.5.
fn normalize(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let defined = values.iter().flatten().filter(|v| v.is_finite());
    let (lo, hi) = defined.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = hi - lo;
    values
        .iter()
        .map(|v| {
            v.filter(|v| v.is_finite())
                .map(|v| if span > 0.0 { (v - lo) / span } else { 0.5 })
        })
        .collect()
}

fn series_from_pairs(label: &str, color: RGBColor, pairs: &[(NaiveDate, Option<f64>)]) -> ChartSeries {
    let dates: Vec<NaiveDate> = pairs.iter().map(|p| p.0).collect();
    ChartSeries::dated(label, color, &dates, pairs.iter().map(|p| p.1))
}

fn trend_series(trend: &LinearTrend) -> Vec<ChartSeries> {
    vec![
        ChartSeries::dated("observed", CYAN, &trend.dates, trend.observed.iter().map(|&v| Some(v))),
        ChartSeries::dated("fitted", GREEN, &trend.dates, trend.fitted.iter().map(|&v| Some(v))),
    ]
}

fn trend_title(name: &str, trend: &LinearTrend) -> String {
    let r2 = trend.r_squared.map(|v| format!("{v:.3}")).unwrap_or_else(|| "-".to_string());
    format!("{name}: {}/day, R²={r2}", fmt_compact(trend.slope))
}

fn correlation_widget(table: &CorrelationTable) -> Table<'static> {
    let mut header_cells = vec![Cell::from("")];
    header_cells.extend(table.columns.iter().map(|c| Cell::from(c.key())));
    let header = Row::new(header_cells).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let rows = table.columns.iter().enumerate().map(|(i, c)| {
        let mut cells = vec![Cell::from(c.label())];
        cells.extend(table.values[i].iter().map(|v| {
            let style = match v {
                Some(r) if *r >= 0.7 => Style::default().fg(Color::Green),
                Some(r) if *r <= -0.7 => Style::default().fg(Color::Red),
                _ => Style::default(),
            };
            Cell::from(fmt_r(*v)).style(style)
        }));
        Row::new(cells)
    });

    let mut widths = vec![Constraint::Length(24)];
    widths.extend(std::iter::repeat_n(Constraint::Length(9), table.columns.len()));

    Table::new(rows, widths)
        .header(header)
        .block(Block::default().title("Correlation table").borders(Borders::ALL))
}

fn draw_chart(frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, series: &[ChartSeries], y_label: &str) {
    let mut spans = vec![Span::raw(format!("{title} "))];
    for s in series {
        spans.push(Span::styled(format!("■ {} ", s.label), Style::default().fg(s.tui_color())));
    }
    let block = Block::default().title(Line::from(spans)).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    let Some((x_bounds, y_bounds)) = bounds(series) else {
        let msg = Paragraph::new("No data.")
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default());
        frame.render_widget(msg, inner);
        return;
    };

    let (chart_rect, insets) = chart_layout(inner);
    let widget = LineChart {
        series,
        x_bounds,
        y_bounds,
        x_label: "date",
        y_label,
        fmt_x: fmt_date_x,
        fmt_y: fmt_compact,
    };

    frame.render_widget(widget, chart_rect);
    if let Some(insets) = insets {
        draw_axis_ticks(frame, inner, chart_rect, insets, x_bounds, y_bounds);
    }
}

fn fmt_cell(v: Option<f64>) -> String {
    v.map(fmt_compact).unwrap_or_else(|| "-".to_string())
}

fn fmt_r(v: Option<f64>) -> String {
    v.map(|r| format!("{r:.3}")).unwrap_or_else(|| "-".to_string())
}

fn fmt_compact(v: f64) -> String {
    let a = v.abs();
    if a >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if a >= 1e3 {
        format!("{:.1}k", v / 1e3)
    } else if a >= 10.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 4usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_date_x(x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub(label_len / 2);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_compact(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("date")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::DataSource;
    use crate::data::{SampleConfig, generate_sample};

    fn app() -> App {
        let dataset = Dataset::from_records(DataSource::Sample, generate_sample(&SampleConfig::default()));
        let country = dataset.countries[0].clone();
        App::new(dataset, &country, AnalysisColumns::default())
    }

    #[test]
    fn tab_cycles_modes_and_resets_selection() {
        let mut app = app();
        app.selected_field = 2;
        assert!(!app.handle_key(KeyCode::Tab));
        assert_eq!(app.mode, Mode::Correlation);
        assert_eq!(app.selected_field, 0);
        app.handle_key(KeyCode::BackTab);
        app.handle_key(KeyCode::BackTab);
        assert_eq!(app.mode, Mode::TimeSeries);
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn correlation_mode_computes_lag_and_table() {
        let mut app = app();
        app.switch_mode(1);
        assert!(app.series_len > 0);
        assert!(app.results.table.is_some());
        let lagged = app.results.lagged.as_ref().unwrap();
        assert_eq!(lagged.lookback, default_lookback(app.series_len));
    }

    #[test]
    fn lookback_moves_in_steps_of_ten_and_clamps() {
        let mut app = app();
        app.switch_mode(1);
        app.selected_field = 3;
        let start = app.effective_lookback();
        app.handle_key(KeyCode::Left);
        assert_eq!(app.effective_lookback(), start - LOOKBACK_STEP);
        for _ in 0..100 {
            app.handle_key(KeyCode::Right);
        }
        assert_eq!(app.effective_lookback(), app.series_len);
    }

    #[test]
    fn explorer_sliders_stay_in_range() {
        let mut app = app();
        app.selected_field = 2;
        for _ in 0..20 {
            app.handle_key(KeyCode::Right);
        }
        assert_eq!(app.explorer.table_days, TABLE_DAYS_RANGE.1);
        app.selected_field = 3;
        for _ in 0..20 {
            app.handle_key(KeyCode::Left);
        }
        assert_eq!(app.explorer.moving_average_days, MOVING_AVERAGE_RANGE.0);
        assert_eq!(app.results.explorer.as_ref().unwrap().options.moving_average_days, 5);
    }

    #[test]
    fn same_country_comparison_reports_status() {
        let mut app = app();
        app.switch_mode(-1);
        assert_eq!(app.mode, Mode::TimeSeries);
        assert!(app.results.comparison.is_some());

        app.other_idx = app.country_idx;
        app.refresh();
        assert!(app.results.comparison.is_none());
        assert!(app.status.starts_with("No data"));
    }

    #[test]
    fn unknown_initial_country_falls_back() {
        let dataset = Dataset::from_records(DataSource::Sample, generate_sample(&SampleConfig::default()));
        let app = App::new(dataset, "Atlantis", AnalysisColumns::default());
        assert_eq!(app.country_idx, 0);
        assert!(app.status.contains("Atlantis"));
    }

    #[test]
    fn normalize_scales_and_keeps_gaps() {
        let out = normalize(&[Some(2.0), None, Some(4.0), Some(3.0)]);
        assert_eq!(out, vec![Some(0.0), None, Some(1.0), Some(0.5)]);
        assert_eq!(normalize(&[Some(7.0), Some(7.0)]), vec![Some(0.5), Some(0.5)]);
    }

    #[test]
    fn cycle_wraps_both_ways() {
        assert_eq!(cycle(0, 3, -1), 2);
        assert_eq!(cycle(2, 3, 1), 0);
        assert_eq!(cycle(1, 3, 10), 2);
        assert_eq!(cycle(0, 0, 1), 0);
    }
}
