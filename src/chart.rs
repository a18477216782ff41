use super::yearly::YearlyTable;
use super::TrendTable;
use chrono::prelude::*;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

pub const TREND_Y_DESC: &str = "Search Interest (normalized)";

/// Size, resolution, colors and font sizes shared by both charts.
/// Lengths are in points and converted to pixels with `px`.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
    pub colors: [RGBColor; 2],
    pub fill_alpha: f64,
    pub bar_alpha: f64,
    pub grid_alpha: f64,
    pub line_width: f64,
    pub marker_size: f64,
    pub highlight_size: f64,
    pub title_size: f64,
    pub desc_size: f64,
    pub tick_size: f64,
    pub legend_size: f64,
    pub annotation_size: f64,
    pub bar_label_size: f64,
    pub bar_width: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        ChartStyle {
            width_in: 14.,
            height_in: 6.,
            dpi: 300,
            colors: [RGBColor(0x6A, 0x3D, 0x9A), RGBColor(0xFF, 0x7F, 0x00)],
            fill_alpha: 0.18,
            bar_alpha: 0.8,
            grid_alpha: 0.12,
            line_width: 2.6,
            marker_size: 4.,
            highlight_size: 11.,
            title_size: 18.,
            desc_size: 15.,
            tick_size: 13.,
            legend_size: 13.,
            annotation_size: 12.,
            bar_label_size: 9.,
            bar_width: 0.35,
        }
    }
}

impl ChartStyle {
    /// canvas size in pixels
    pub fn size(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi as f64).round() as u32,
            (self.height_in * self.dpi as f64).round() as u32,
        )
    }

    /// points to pixels, at least one pixel
    pub fn px(&self, pt: f64) -> u32 {
        ((pt * self.dpi as f64 / 72.).round() as u32).max(1)
    }

    fn font(&self, pt: f64) -> FontDesc<'static> {
        FontDesc::new(FontFamily::SansSerif, self.px(pt) as f64, FontStyle::Normal)
    }

    fn bold(&self, pt: f64) -> FontDesc<'static> {
        FontDesc::new(FontFamily::SansSerif, self.px(pt) as f64, FontStyle::Bold)
    }
}

/// Dates of the x ticks and the format of their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticks {
    pub dates: Vec<NaiveDate>,
    pub format: &'static str,
}

/// Yearly ticks (1st of January) when the span exceeds two years,
/// otherwise quarterly ticks (1st of January, April, July, October).
pub fn suitable_ticks(first: NaiveDate, last: NaiveDate) -> Ticks {
    let mut dates = Vec::new();
    if last - first > chrono::Duration::days(365 * 2) {
        for y in first.year()..=last.year() {
            if let Some(d) = NaiveDate::from_ymd_opt(y, 1, 1) {
                if d >= first && d <= last {
                    dates.push(d);
                }
            }
        }
        Ticks { dates, format: "%Y" }
    } else {
        let (mut y, mut m) = (first.year(), first.month());
        loop {
            let d = match NaiveDate::from_ymd_opt(y, m, 1) {
                Some(d) => d,
                None => break,
            };
            if d > last {
                break;
            }
            if d >= first && (m - 1) % 3 == 0 {
                dates.push(d);
            }
            m += 1;
            if m > 12 {
                m = 1;
                y += 1;
            }
        }
        Ticks {
            dates,
            format: "%b %Y",
        }
    }
}

/// x coordinate of a date on the trend chart
pub fn day_number(d: NaiveDate) -> i32 {
    d.num_days_from_ce()
}

fn day_label(x: i32, format: &str) -> String {
    NaiveDate::from_num_days_from_ce_opt(x)
        .map(|d| d.format(format).to_string())
        .unwrap_or_default()
}

/// Splits a series at its missing values,
/// so that each run is drawn on its own and the gaps stay visible.
pub fn contiguous_runs(dates: &[NaiveDate], values: &[f64]) -> Vec<Vec<(i32, f64)>> {
    let mut runs = Vec::new();
    let mut run: Vec<(i32, f64)> = Vec::new();
    for (d, &v) in dates.iter().zip(values.iter()) {
        if v.is_nan() {
            if !run.is_empty() {
                runs.push(std::mem::take(&mut run));
            }
        } else {
            run.push((day_number(*d), v));
        }
    }
    if !run.is_empty() {
        runs.push(run);
    }
    runs
}

/// Splits [x0, x1] into dashes of length `dash` separated by `gap`.
pub fn dashed_segments(x0: i32, x1: i32, dash: i32, gap: i32) -> Vec<(i32, i32)> {
    let mut segments = Vec::new();
    if dash <= 0 || gap < 0 {
        return segments;
    }
    let mut x = x0;
    while x < x1 {
        segments.push((x, (x + dash).min(x1)));
        x += dash + gap;
    }
    segments
}

/// Width of one year on the ratio chart's x axis.
/// Year `i` has its tick at `i * YEAR_SLOT`.
pub const YEAR_SLOT: i32 = 1000;

/// x span of the peak bar (`k == 0`) or the total bar (`k == 1`) of year `i`.
/// The pair touches at the year tick.
pub fn bar_span(i: usize, k: usize, width: f64) -> (i32, i32) {
    let w = (width * YEAR_SLOT as f64).round() as i32;
    let tick = i as i32 * YEAR_SLOT;
    if k == 0 {
        (tick - w, tick)
    } else {
        (tick, tick + w)
    }
}

/// Label of the ratio chart tick at `x`, empty between ticks.
pub fn year_at(years: &[i32], x: i32) -> String {
    if x < 0 || x % YEAR_SLOT != 0 {
        return String::new();
    }
    years
        .get((x / YEAR_SLOT) as usize)
        .map(|y| y.to_string())
        .unwrap_or_default()
}

/// Runs of a series as drawn on the trend chart.
/// An entirely missing series yields one empty run so it keeps its legend entry.
pub fn legend_runs(dates: &[NaiveDate], values: &[f64]) -> Vec<Vec<(i32, f64)>> {
    let mut runs = contiguous_runs(dates, values);
    if runs.is_empty() {
        runs.push(Vec::new());
    }
    runs
}

/// Draws the interest of both terms over time:
/// shaded areas, lines with markers and the latest value highlighted.
pub fn draw_trend<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    table: &TrendTable,
    style: &ChartStyle,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB::ErrorType: 'static,
{
    let (first, last) = match (table.first_date(), table.last_date()) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err("no data to plot".into()),
    };
    let xmin = day_number(first);
    let xmax = day_number(last).max(xmin + 1);
    let ticks = suitable_ticks(first, last);
    let key_days: Vec<i32> = ticks.dates.iter().map(|d| day_number(*d)).collect();
    let ymax = match table.max_value() {
        Some(m) if m > 0. => m * 1.08,
        _ => 1.,
    };

    root.fill(&WHITE)?;
    let title = format!(
        "Google Search Interest over Time: {} vs {}",
        table.terms[0], table.terms[1]
    );
    let mut chart = ChartBuilder::on(root)
        .caption(title, style.bold(style.title_size))
        .margin(style.px(8.))
        .margin_right(style.px(36.))
        .x_label_area_size(style.px(48.))
        .y_label_area_size(style.px(48.))
        .build_cartesian_2d((xmin..xmax).with_key_points(key_days.clone()), 0f64..ymax)?;

    let tick_font = style.font(style.tick_size);
    let tick_format = ticks.format;
    chart
        .configure_mesh()
        .light_line_style(&TRANSPARENT)
        .bold_line_style(BLACK.mix(style.grid_alpha).stroke_width(1))
        .x_labels(key_days.len().max(1))
        .x_label_formatter(&|x: &i32| day_label(*x, tick_format))
        .x_label_style(tick_font.clone())
        .y_label_style(tick_font)
        .y_desc(TREND_Y_DESC)
        .axis_desc_style(style.font(style.desc_size))
        .draw()?;

    for (k, values) in table.values.iter().enumerate() {
        let fill = style.colors[k].mix(style.fill_alpha).filled();
        for run in contiguous_runs(&table.date, values) {
            chart.draw_series(AreaSeries::new(run, 0., fill))?;
        }
    }

    for (k, values) in table.values.iter().enumerate() {
        let line = style.colors[k].stroke_width(style.px(style.line_width));
        let marker = style.px(style.marker_size / 2.);
        let legend_len = style.px(20.) as i32;
        for (r, run) in legend_runs(&table.date, values).into_iter().enumerate() {
            let series = chart.draw_series(LineSeries::new(run, line).point_size(marker))?;
            if r == 0 {
                series
                    .label(table.terms[k].clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + legend_len, y)], line));
            }
        }
    }

    if let Some((_, date, values)) = table.last() {
        let x = day_number(date);
        let radius = style.px(style.highlight_size / 2.);
        for (k, &v) in values.iter().enumerate() {
            if v.is_nan() {
                continue;
            }
            let color = style.colors[k];
            chart.draw_series(std::iter::once(Circle::new(
                (x, v),
                radius + style.px(1.),
                WHITE.filled(),
            )))?;
            chart.draw_series(std::iter::once(Circle::new((x, v), radius, color.filled())))?;
            chart.draw_series(std::iter::once(Text::new(
                format!(" {:.0}", v),
                (x, v),
                style
                    .font(style.annotation_size)
                    .color(&color)
                    .pos(Pos::new(HPos::Left, VPos::Center)),
            )))?;
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&TRANSPARENT)
        .border_style(&TRANSPARENT)
        .label_font(style.font(style.legend_size))
        .draw()?;
    Ok(())
}

/// Draws the yearly ratios of peaks and totals as grouped bars,
/// with the value above each bar and a dashed line at ratio 1.
pub fn draw_ratio<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    yearly: &YearlyTable,
    style: &ChartStyle,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB::ErrorType: 'static,
{
    let n = yearly.rows.len();
    if n == 0 {
        return Err("no years to plot".into());
    }
    let years = yearly.years();
    let xmin = -YEAR_SLOT / 2;
    let xmax = n as i32 * YEAR_SLOT - YEAR_SLOT / 2;
    let key_points: Vec<i32> = (0..n as i32).map(|i| i * YEAR_SLOT).collect();
    let ymax = yearly.max_ratio().unwrap_or(1.).max(1.) * 1.15;
    let (a, b) = (&yearly.terms[0], &yearly.terms[1]);

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(root)
        .caption(
            format!("Yearly Peak vs Total Interest Ratios: {}/{}", a, b),
            style.bold(style.title_size),
        )
        .margin(style.px(8.))
        .x_label_area_size(style.px(56.))
        .y_label_area_size(style.px(48.))
        .build_cartesian_2d((xmin..xmax).with_key_points(key_points), 0f64..ymax)?;

    let tick_font = style.font(style.tick_size);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .light_line_style(&TRANSPARENT)
        .bold_line_style(BLACK.mix(style.grid_alpha).stroke_width(1))
        .x_labels(n)
        .x_label_formatter(&|x: &i32| year_at(&years, *x))
        .x_label_style(tick_font.clone())
        .y_label_style(tick_font)
        .x_desc("Year")
        .y_desc(format!("Ratio ({} / {})", a, b))
        .axis_desc_style(style.bold(style.desc_size))
        .draw()?;

    let swatch = style.px(5.) as i32;
    let bars: [(String, Vec<f64>); 2] = [
        (
            format!("Peak Ratio ({}/{})", a, b),
            yearly.rows.iter().map(|r| r.ratio_peaks).collect(),
        ),
        (
            format!("Total Ratio ({}/{})", a, b),
            yearly.rows.iter().map(|r| r.ratio_totals).collect(),
        ),
    ];
    let label_font = style
        .font(style.bar_label_size)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    for (k, (label, ratios)) in bars.iter().enumerate() {
        let fill = style.colors[k].mix(style.bar_alpha).filled();
        chart
            .draw_series(ratios.iter().enumerate().map(|(i, &v)| {
                let (x0, x1) = bar_span(i, k, style.bar_width);
                Rectangle::new([(x0, 0.), (x1, v)], fill)
            }))?
            .label(label.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - swatch), (x + 3 * swatch, y + swatch)], fill));
        chart.draw_series(
            ratios
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, &v)| {
                    let (x0, x1) = bar_span(i, k, style.bar_width);
                    Text::new(format!("{:.2}", v), ((x0 + x1) / 2, v), label_font.clone())
                }),
        )?;
    }

    let reference = RGBColor(0x44, 0x44, 0x44)
        .mix(0.6)
        .stroke_width(style.px(1.));
    let dash = ((xmax - xmin) / 120).max(1);
    let legend_len = style.px(20.) as i32;
    chart
        .draw_series(
            dashed_segments(xmin, xmax, dash, dash / 2)
                .into_iter()
                .map(|(x0, x1)| PathElement::new(vec![(x0, 1.), (x1, 1.)], reference)),
        )?
        .label("Equal interest (ratio=1)")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + legend_len, y)], reference));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&TRANSPARENT)
        .border_style(&TRANSPARENT)
        .label_font(style.font(style.legend_size))
        .draw()?;
    Ok(())
}
