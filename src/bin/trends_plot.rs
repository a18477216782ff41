use anyhow::{Context, Result};
use tracing::{debug, info};
use trends_lpp::chart::ChartStyle;
use trends_lpp::export::export_all;
use trends_lpp::plot::{init_logging, parse_cli};
use trends_lpp::yearly::YearlyTable;
use trends_lpp::TrendTable;

fn main() -> Result<()> {
    let config = parse_cli();
    init_logging(config.verbose);
    info!(
        "read data from {} and plot to {}, {}",
        config.csvin.display(),
        config.outputs.trend.display(),
        config.outputs.ratio.display()
    );

    let mut table = TrendTable::from_csv(&config.csvin, config.policy)
        .with_context(|| format!("failed to load {}", config.csvin.display()))?;
    if let Some(terms) = config.terms.clone() {
        table.terms = terms;
    }

    let yearly = YearlyTable::from_trend(&table);
    debug!("yearly table\n{}", yearly);

    let style = ChartStyle {
        dpi: config.dpi,
        ..ChartStyle::default()
    };
    export_all(&table, &yearly, &config.outputs, &style).context("failed to export the charts")?;

    println!(
        "Saved visuals: {}, {}",
        config.outputs.trend.display(),
        config.outputs.ratio.display()
    );
    Ok(())
}
