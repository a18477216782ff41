use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use trends_lpp::chart::ChartStyle;
use trends_lpp::export::{export_all, render, Chart, Outputs};
use trends_lpp::yearly::YearlyTable;
use trends_lpp::{ExportError, LoadError, ParsePolicy, TrendTable};

const EXPORT: &str = "Category: All categories

Week,Fondue: (Worldwide),Raclette: (Worldwide)
2023-06-01,20,0
2023-01-01,10,5
bad date,99,99
2024-01-01,5,5
2024-02-01,<1,3
";

fn write_export(dir: &Path, contents: &str) -> PathBuf {
    let p = dir.join("multiTimeline.csv");
    fs::write(&p, contents).unwrap();
    p
}

fn small_style() -> ChartStyle {
    ChartStyle {
        dpi: 30,
        ..ChartStyle::default()
    }
}

fn outputs(dir: &Path, ext: &str) -> Outputs {
    Outputs {
        trend: dir.join(format!("trend.{}", ext)),
        ratio: dir.join(format!("ratio.{}", ext)),
        stats: Some(dir.join("yearly.csv")),
    }
}

#[test]
fn test_load_aggregate_and_export() {
    let dir = TempDir::new().unwrap();
    let csvin = write_export(dir.path(), EXPORT);
    let table = TrendTable::from_csv(&csvin, ParsePolicy::Tolerant).unwrap();
    assert_eq!(table.len(), 4);
    assert!(table.date.windows(2).all(|w| w[0] <= w[1]));

    let yearly = YearlyTable::from_trend(&table);
    assert_eq!(yearly.years(), vec![2023, 2024]);
    let y2023 = yearly.get(2023).unwrap();
    assert_eq!((y2023.peak_a, y2023.total_a), (20., 30.));
    assert!((y2023.ratio_totals - 6.).abs() < 1e-4);
    let y2024 = yearly.get(2024).unwrap();
    assert_eq!((y2024.peak_b, y2024.total_b), (5., 8.));

    let out = outputs(dir.path(), "png");
    export_all(&table, &yearly, &out, &small_style()).unwrap();
    for p in [&out.trend, &out.ratio].iter() {
        let meta = fs::metadata(p).unwrap();
        assert!(meta.len() > 0, "{} is empty", p.display());
    }

    let stats = fs::read_to_string(out.stats.as_ref().unwrap()).unwrap();
    let mut lines = stats.lines();
    assert_eq!(
        lines.next(),
        Some("year,fondue_peak,fondue_total,raclette_peak,raclette_total,ratio_peaks,ratio_totals")
    );
    assert!(lines.next().unwrap().starts_with("2023,20,30,5,5,"));
    assert!(lines.next().unwrap().starts_with("2024,5,5,5,8,"));
}

#[test]
fn test_svg_export() {
    let dir = TempDir::new().unwrap();
    let csvin = write_export(dir.path(), EXPORT);
    let table = TrendTable::from_csv(&csvin, ParsePolicy::Tolerant).unwrap();
    let yearly = YearlyTable::from_trend(&table);
    let out = outputs(dir.path(), "svg");
    export_all(&table, &yearly, &out, &small_style()).unwrap();
    let svg = fs::read_to_string(&out.trend).unwrap();
    assert!(svg.contains("<svg"));
    let svg = fs::read_to_string(&out.ratio).unwrap();
    assert!(svg.contains("2023"));
    assert!(svg.contains("2024"));
}

#[test]
fn test_all_missing_series_stays_in_legend() {
    let dir = TempDir::new().unwrap();
    let csvin = write_export(
        dir.path(),
        "x\n\ndate,Alpine,Bistro\n2020-01-01,3,<1\n2020-02-01,4,<1\n",
    );
    let table = TrendTable::from_csv(&csvin, ParsePolicy::Tolerant).unwrap();
    let fout = dir.path().join("trend.svg");
    render(&fout, Chart::Trend(&table), &small_style()).unwrap();
    let svg = fs::read_to_string(&fout).unwrap();
    // once in the title, once in the legend
    assert!(svg.matches("Bistro").count() >= 2);
    assert!(svg.matches("Alpine").count() >= 2);
}

#[test]
fn test_rendering_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let csvin = write_export(dir.path(), EXPORT);
    let style = small_style();
    let mut trend_bytes = Vec::new();
    let mut yearly_tables = Vec::new();
    for run in 0..2 {
        let table = TrendTable::from_csv(&csvin, ParsePolicy::Tolerant).unwrap();
        let fout = dir.path().join(format!("trend_{}.png", run));
        render(&fout, Chart::Trend(&table), &style).unwrap();
        trend_bytes.push(fs::read(&fout).unwrap());
        yearly_tables.push(YearlyTable::from_trend(&table));
    }
    assert_eq!(trend_bytes[0], trend_bytes[1]);
    assert_eq!(yearly_tables[0], yearly_tables[1]);
}

#[test]
fn test_existing_outputs_are_overwritten() {
    let dir = TempDir::new().unwrap();
    let csvin = write_export(dir.path(), EXPORT);
    let out = outputs(dir.path(), "png");
    fs::write(&out.trend, b"old").unwrap();
    let table = TrendTable::from_csv(&csvin, ParsePolicy::Tolerant).unwrap();
    let yearly = YearlyTable::from_trend(&table);
    export_all(&table, &yearly, &out, &small_style()).unwrap();
    assert_ne!(fs::read(&out.trend).unwrap(), b"old".to_vec());
}

#[test]
fn test_strict_policy_fails_on_bad_date() {
    let dir = TempDir::new().unwrap();
    let csvin = write_export(dir.path(), EXPORT);
    let err = TrendTable::from_csv(&csvin, ParsePolicy::Strict).unwrap_err();
    match err {
        LoadError::InvalidCell { line, column, .. } => assert_eq!((line, column), (6, 1)),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_missing_input_is_load_error() {
    let dir = TempDir::new().unwrap();
    let err = TrendTable::from_csv(&dir.path().join("nope.csv"), ParsePolicy::Tolerant).unwrap_err();
    assert!(matches!(err, LoadError::Open { .. }));
}

#[test]
fn test_unwritable_output_is_export_error() {
    let dir = TempDir::new().unwrap();
    let csvin = write_export(dir.path(), EXPORT);
    let table = TrendTable::from_csv(&csvin, ParsePolicy::Tolerant).unwrap();
    let fout = dir.path().join("missing_dir").join("trend.png");
    let err = render(&fout, Chart::Trend(&table), &small_style()).unwrap_err();
    match err {
        ExportError::Draw { path, .. } => assert_eq!(path, fout),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_single_row_and_all_missing_series() {
    let dir = TempDir::new().unwrap();
    let csvin = write_export(dir.path(), "x\n\ndate,a,b\n2020-01-01,<1,<1\n");
    let table = TrendTable::from_csv(&csvin, ParsePolicy::Tolerant).unwrap();
    let yearly = YearlyTable::from_trend(&table);
    let r = &yearly.rows[0];
    assert_eq!((r.peak_a, r.total_a, r.peak_b, r.total_b), (0., 0., 0., 0.));
    assert!(r.ratio_peaks.is_finite() && r.ratio_totals.is_finite());
    let out = Outputs {
        stats: None,
        ..outputs(dir.path(), "png")
    };
    export_all(&table, &yearly, &out, &small_style()).unwrap();
    assert!(fs::metadata(&out.trend).unwrap().len() > 0);
    assert!(fs::metadata(&out.ratio).unwrap().len() > 0);
}
