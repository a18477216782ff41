use super::chart::{draw_ratio, draw_trend, ChartStyle};
use super::yearly::YearlyTable;
use super::{ExportError, TrendTable};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

/// Backend used for an output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Bitmap,
    Svg,
}

impl ImageKind {
    /// svg for a `.svg` extension, raster image otherwise
    pub fn from_path(p: &Path) -> ImageKind {
        match p.extension().and_then(|e| e.to_str()) {
            Some(e) if e.eq_ignore_ascii_case("svg") => ImageKind::Svg,
            _ => ImageKind::Bitmap,
        }
    }
}

/// Which chart to draw.
#[derive(Debug, Clone, Copy)]
pub enum Chart<'a> {
    Trend(&'a TrendTable),
    Ratio(&'a YearlyTable),
}

/// Where the outputs go.
#[derive(Debug, Clone)]
pub struct Outputs {
    pub trend: PathBuf,
    pub ratio: PathBuf,
    pub stats: Option<PathBuf>,
}

impl Default for Outputs {
    fn default() -> Self {
        Outputs {
            trend: PathBuf::from(super::DEFAULT_TREND),
            ratio: PathBuf::from(super::DEFAULT_RATIO),
            stats: None,
        }
    }
}

fn draw_and_present<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    chart: Chart,
    style: &ChartStyle,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB::ErrorType: 'static,
{
    match chart {
        Chart::Trend(table) => draw_trend(&root, table, style)?,
        Chart::Ratio(yearly) => draw_ratio(&root, yearly, style)?,
    }
    root.present()?;
    Ok(())
}

/// Draws one chart to `fout`, overwriting it.
pub fn render(fout: &Path, chart: Chart, style: &ChartStyle) -> Result<(), ExportError> {
    let result = match ImageKind::from_path(fout) {
        ImageKind::Bitmap => {
            let root = BitMapBackend::new(fout, style.size()).into_drawing_area();
            draw_and_present(root, chart, style)
        }
        ImageKind::Svg => {
            let root = SVGBackend::new(fout, style.size()).into_drawing_area();
            draw_and_present(root, chart, style)
        }
    };
    result.map_err(|e| ExportError::Draw {
        path: fout.to_path_buf(),
        message: e.to_string(),
    })?;
    info!("saved {}", fout.display());
    Ok(())
}

/// Writes the trend chart, the ratio chart and, if requested, the yearly table.
pub fn export_all(
    table: &TrendTable,
    yearly: &YearlyTable,
    outputs: &Outputs,
    style: &ChartStyle,
) -> Result<(), ExportError> {
    render(&outputs.trend, Chart::Trend(table), style)?;
    render(&outputs.ratio, Chart::Ratio(yearly), style)?;
    if let Some(stats) = &outputs.stats {
        yearly.to_csv(stats)?;
    }
    Ok(())
}
