use super::{ExportError, TrendTable, RATIO_EPS};
use chrono::Datelike;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Peak and total of both terms for one calendar year, with their ratios.
#[derive(Debug, Clone, PartialEq)]
pub struct YearStats {
    pub year: i32,
    pub peak_a: f64,
    pub total_a: f64,
    pub peak_b: f64,
    pub total_b: f64,
    pub ratio_peaks: f64,
    pub ratio_totals: f64,
}

/// One row per calendar year, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyTable {
    pub terms: [String; 2],
    pub rows: Vec<YearStats>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Acc {
    peak: Option<f64>,
    total: f64,
}

impl Acc {
    fn add(&mut self, v: f64) {
        if v.is_nan() {
            return;
        }
        self.peak = Some(self.peak.map_or(v, |p| p.max(v)));
        self.total += v;
    }
}

impl YearlyTable {
    /// Group the rows by the year of their date.
    /// Missing values are skipped; a year without any value for a term
    /// gets peak and total 0 for that term.
    /// Peaks and totals are rounded to 2 decimals before taking the ratios.
    pub fn from_trend(table: &TrendTable) -> YearlyTable {
        let mut groups: BTreeMap<i32, [Acc; 2]> = BTreeMap::new();
        for (i, d) in table.date.iter().enumerate() {
            let acc = groups.entry(d.year()).or_default();
            acc[0].add(table.values[0][i]);
            acc[1].add(table.values[1][i]);
        }

        let rows: Vec<YearStats> = groups
            .into_iter()
            .map(|(year, [a, b])| {
                if a.peak.is_none() || b.peak.is_none() {
                    debug!("year {} has a term without values, its peak is set to 0", year);
                }
                let peak_a = round2(a.peak.unwrap_or(0.));
                let peak_b = round2(b.peak.unwrap_or(0.));
                let total_a = round2(a.total);
                let total_b = round2(b.total);
                YearStats {
                    year,
                    peak_a,
                    total_a,
                    peak_b,
                    total_b,
                    ratio_peaks: ratio(peak_a, peak_b),
                    ratio_totals: ratio(total_a, total_b),
                }
            })
            .collect();
        info!(
            "aggregated {} years: {:?}",
            rows.len(),
            rows.iter().map(|r| r.year).collect::<Vec<i32>>()
        );
        YearlyTable {
            terms: table.terms.clone(),
            rows,
        }
    }

    pub fn get(&self, year: i32) -> Option<&YearStats> {
        self.rows.iter().find(|r| r.year == year)
    }

    pub fn years(&self) -> Vec<i32> {
        self.rows.iter().map(|r| r.year).collect()
    }

    /// largest finite ratio of either kind
    pub fn max_ratio(&self) -> Option<f64> {
        self.rows
            .iter()
            .flat_map(|r| vec![r.ratio_peaks, r.ratio_totals])
            .filter(|v| v.is_finite())
            .fold(None, |m: Option<f64>, v| Some(m.map_or(v, |m| m.max(v))))
    }

    fn header(&self) -> Vec<String> {
        let a = self.terms[0].to_lowercase();
        let b = self.terms[1].to_lowercase();
        vec![
            "year".to_string(),
            format!("{}_peak", a),
            format!("{}_total", a),
            format!("{}_peak", b),
            format!("{}_total", b),
            "ratio_peaks".to_string(),
            "ratio_totals".to_string(),
        ]
    }

    /// writes the yearly table as a csv at the given path
    pub fn to_csv(&self, fout: &Path) -> Result<(), ExportError> {
        let csv_err = |source: csv::Error| ExportError::Csv {
            path: fout.to_path_buf(),
            source,
        };
        let mut wtr = csv::Writer::from_path(fout).map_err(csv_err)?;
        wtr.write_record(self.header()).map_err(csv_err)?;
        for r in self.rows.iter() {
            wtr.write_record(&[
                r.year.to_string(),
                r.peak_a.to_string(),
                r.total_a.to_string(),
                r.peak_b.to_string(),
                r.total_b.to_string(),
                r.ratio_peaks.to_string(),
                r.ratio_totals.to_string(),
            ])
            .map_err(csv_err)?;
        }
        wtr.flush().map_err(|source| ExportError::Io {
            path: fout.to_path_buf(),
            source,
        })?;
        info!("wrote yearly table to {}", fout.display());
        Ok(())
    }
}

impl std::fmt::Display for YearlyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.header().join(","))?;
        for r in self.rows.iter() {
            writeln!(
                f,
                "{},{},{},{},{},{:.4},{:.4}",
                r.year, r.peak_a, r.total_a, r.peak_b, r.total_b, r.ratio_peaks, r.ratio_totals
            )?;
        }
        Ok(())
    }
}

/// two decimals, halves to even
pub fn round2(v: f64) -> f64 {
    (v * 100.).round_ties_even() / 100.
}

/// a / (b + RATIO_EPS)
pub fn ratio(a: f64, b: f64) -> f64 {
    a / (b + RATIO_EPS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table(rows: &[(NaiveDate, f64, f64)]) -> TrendTable {
        let mut t = TrendTable::new(rows.len(), ["Fondue".to_string(), "Raclette".to_string()]);
        for &(d, a, b) in rows {
            t.push(d, a, b);
        }
        t
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_two_years() {
        let t = table(&[
            (ymd(2023, 1, 1), 10., 5.),
            (ymd(2023, 6, 1), 20., 0.),
            (ymd(2024, 1, 1), 5., 5.),
        ]);
        let y = YearlyTable::from_trend(&t);
        assert_eq!(y.years(), vec![2023, 2024]);

        let r = y.get(2023).unwrap();
        assert_eq!((r.peak_a, r.total_a, r.peak_b, r.total_b), (20., 30., 5., 5.));
        assert!(close(r.ratio_peaks, 4.0));
        assert!(close(r.ratio_totals, 6.0));

        let r = y.get(2024).unwrap();
        assert_eq!((r.peak_a, r.total_a, r.peak_b, r.total_b), (5., 5., 5., 5.));
        assert!(close(r.ratio_peaks, 1.0));
        assert!(close(r.ratio_totals, 1.0));
    }

    #[test]
    fn test_every_year_once() {
        let t = table(&[
            (ymd(2019, 12, 31), 1., 1.),
            (ymd(2021, 3, 1), 2., 2.),
            (ymd(2019, 1, 1), 3., 3.),
            (ymd(2021, 4, 1), 4., 4.),
        ]);
        let y = YearlyTable::from_trend(&t);
        assert_eq!(y.years(), vec![2019, 2021]);
    }

    #[test]
    fn test_missing_values_ignored() {
        let t = table(&[
            (ymd(2022, 1, 1), f64::NAN, 2.),
            (ymd(2022, 2, 1), 8., f64::NAN),
            (ymd(2022, 3, 1), 4., 6.),
        ]);
        let r = YearlyTable::from_trend(&t).rows[0].clone();
        assert_eq!((r.peak_a, r.total_a, r.peak_b, r.total_b), (8., 12., 6., 8.));
    }

    #[test]
    fn test_all_missing_year_is_zero_and_finite() {
        let t = table(&[(ymd(2022, 1, 1), 3., f64::NAN), (ymd(2022, 2, 1), 1., f64::NAN)]);
        let r = YearlyTable::from_trend(&t).rows[0].clone();
        assert_eq!((r.peak_b, r.total_b), (0., 0.));
        assert!(r.ratio_peaks.is_finite());
        assert!(r.ratio_totals.is_finite());
        assert!(close(r.ratio_totals, 4. / RATIO_EPS));
    }

    #[test]
    fn test_zero_denominator_finite() {
        let t = table(&[(ymd(2020, 1, 1), 0., 0.), (ymd(2020, 5, 1), 0., 0.)]);
        let r = YearlyTable::from_trend(&t).rows[0].clone();
        assert_eq!(r.ratio_peaks, 0.);
        assert_eq!(r.ratio_totals, 0.);
    }

    #[test]
    fn test_rounding_before_ratio() {
        let t = table(&[(ymd(2020, 1, 1), 1.006, 2.004)]);
        let r = YearlyTable::from_trend(&t).rows[0].clone();
        assert_eq!(r.peak_a, 1.01);
        assert_eq!(r.peak_b, 2.0);
        assert_eq!(r.ratio_peaks, 1.01 / (2.0 + RATIO_EPS));
    }

    #[test]
    fn test_round2_halves_to_even() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(2.5), 2.5);
        assert_eq!(round2(1.006), 1.01);
    }

    #[test]
    fn test_max_ratio() {
        let t = table(&[(ymd(2020, 1, 1), 2., 1.), (ymd(2021, 1, 1), 1., 4.)]);
        let y = YearlyTable::from_trend(&t);
        assert!(close(y.max_ratio().unwrap(), 2.0));
    }

    #[test]
    fn test_display_header() {
        let t = table(&[(ymd(2020, 1, 1), 2., 1.)]);
        let s = YearlyTable::from_trend(&t).to_string();
        assert!(s.starts_with(
            "year,fondue_peak,fondue_total,raclette_peak,raclette_total,ratio_peaks,ratio_totals\n"
        ));
        assert!(s.contains("2020,2,2,1,1,"));
    }
}
