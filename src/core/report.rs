//! Year-over-year urban growth table and summary statistics.
use std::fmt::Write;

use serde::Serialize;

use crate::core::raster::ClassifiedRaster;
use crate::error::{Error, Result};

/// Outcome of one successfully processed year.
#[derive(Debug, Clone)]
pub struct YearResult {
    pub year: i32,
    pub urban_area_km2: f64,
    pub classified: ClassifiedRaster,
}

/// One row of the growth table, relative to the base (earliest) year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearRecord {
    pub year: i32,
    pub urban_area_km2: f64,
    pub percent_of_region: f64,
    pub growth_km2: f64,
    /// None when the base area is zero
    pub growth_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthSummary {
    pub base_year: i32,
    pub last_year: i32,
    pub base_area_km2: f64,
    pub last_area_km2: f64,
    pub total_growth_km2: f64,
    pub total_growth_pct: Option<f64>,
    /// Averages over the elapsed year span; None when base and last year coincide
    pub avg_annual_growth_km2: Option<f64>,
    pub avg_annual_growth_rate_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthReport {
    pub region_name: String,
    pub region_area_km2: f64,
    pub records: Vec<YearRecord>,
    pub summary: GrowthSummary,
}

impl GrowthReport {
    /// Build from (year, urban km²) pairs in any order.
    pub fn build<I>(region_name: &str, region_area_km2: f64, areas: I) -> Result<Self>
    where
        I: IntoIterator<Item = (i32, f64)>,
    {
        let mut areas: Vec<(i32, f64)> = areas.into_iter().collect();
        areas.sort_by_key(|&(year, _)| year);
        let (&(base_year, base_area), &(last_year, last_area)) =
            match (areas.first(), areas.last()) {
                (Some(first), Some(last)) => (first, last),
                _ => return Err(Error::EmptyReport),
            };

        let growth_pct = |area: f64| {
            (base_area != 0.0).then(|| (area - base_area) / base_area * 100.0)
        };
        let records = areas
            .iter()
            .map(|&(year, area)| YearRecord {
                year,
                urban_area_km2: area,
                percent_of_region: area / region_area_km2 * 100.0,
                growth_km2: area - base_area,
                growth_pct: growth_pct(area),
            })
            .collect();

        let total_growth_km2 = last_area - base_area;
        let total_growth_pct = growth_pct(last_area);
        let span = (last_year - base_year) as f64;
        let summary = GrowthSummary {
            base_year,
            last_year,
            base_area_km2: base_area,
            last_area_km2: last_area,
            total_growth_km2,
            total_growth_pct,
            avg_annual_growth_km2: (span > 0.0).then(|| total_growth_km2 / span),
            avg_annual_growth_rate_pct: total_growth_pct
                .filter(|_| span > 0.0)
                .map(|pct| pct / span),
        };

        Ok(Self {
            region_name: region_name.to_string(),
            region_area_km2,
            records,
            summary,
        })
    }

    pub fn base_year(&self) -> i32 {
        self.summary.base_year
    }

    pub fn last_year(&self) -> i32 {
        self.summary.last_year
    }

    /// Fixed-width table followed by the summary block.
    pub fn render(&self) -> String {
        let s = &self.summary;
        let region = &self.region_name;
        let mut out = String::new();

        let _ = writeln!(out, "{}", "=".repeat(55));
        let _ = writeln!(
            out,
            "URBAN GROWTH ANALYSIS - {} ({}-{})",
            region, s.base_year, s.last_year
        );
        let _ = writeln!(out, "{}", "=".repeat(55));
        let _ = writeln!(out, "{} Total Area: {:.2} km²", region, self.region_area_km2);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Year | Urban Area (km²) | % of {} | Growth from {}",
            region, s.base_year
        );
        let _ = writeln!(out, "{}", "-".repeat(55));
        for r in &self.records {
            let _ = writeln!(
                out,
                "{:<4} | {:>12} | {:>9} | {:>6}",
                r.year,
                format!("{:.2}", r.urban_area_km2),
                format!("{:.2}%", r.percent_of_region),
                fmt_pct(r.growth_pct, 1)
            );
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "=".repeat(35));
        let _ = writeln!(out, "SUMMARY ({}-{})", s.base_year, s.last_year);
        let _ = writeln!(out, "{}", "=".repeat(35));
        let _ = writeln!(out, "Urban area in {}: {:.2} km²", s.base_year, s.base_area_km2);
        let _ = writeln!(out, "Urban area in {}: {:.2} km²", s.last_year, s.last_area_km2);
        let _ = writeln!(out, "Total urban growth: {:.2} km²", s.total_growth_km2);
        let _ = writeln!(out, "Percentage growth: {}", fmt_pct(s.total_growth_pct, 1));
        let _ = writeln!(
            out,
            "Average annual growth: {}",
            s.avg_annual_growth_km2
                .map_or_else(|| "N/A".to_string(), |v| format!("{:.2} km²/year", v))
        );
        let _ = writeln!(
            out,
            "Average annual growth rate: {}",
            s.avg_annual_growth_rate_pct
                .map_or_else(|| "N/A".to_string(), |v| format!("{:.2}%/year", v))
        );
        out
    }
}

fn fmt_pct(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) => format!("{:.*}%", decimals, v),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn growth_arithmetic() {
        let report = GrowthReport::build("UAE", 1000.0, [(2018, 100.0), (2024, 115.0)]).unwrap();
        let last = &report.records[1];
        assert_relative_eq!(last.growth_km2, 15.0, epsilon = 1e-9);
        assert_relative_eq!(last.growth_pct.unwrap(), 15.0, epsilon = 1e-9);
        assert_relative_eq!(last.percent_of_region, 11.5, epsilon = 1e-9);

        let text = report.render();
        assert!(text.contains("2024 |       115.00 |    11.50% |  15.0%"), "{text}");
        assert!(text.contains("Total urban growth: 15.00 km²"));
        assert!(text.contains("Percentage growth: 15.0%"));
        // averaged over the 6-year span
        assert!(text.contains("Average annual growth: 2.50 km²/year"));
        assert!(text.contains("Average annual growth rate: 2.50%/year"));
    }

    #[test]
    fn unordered_input_is_sorted() {
        let report = GrowthReport::build(
            "UAE",
            500.0,
            [(2022, 130.0), (2018, 100.0), (2024, 150.0), (2020, 110.0)],
        )
        .unwrap();
        let years: Vec<i32> = report.records.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2018, 2020, 2022, 2024]);
        assert_eq!(report.base_year(), 2018);
        assert_eq!(report.last_year(), 2024);
        assert_eq!(report.records[0].growth_pct, Some(0.0));
    }

    #[test]
    fn header_uses_region_and_base_year() {
        let report = GrowthReport::build("Dubai", 4000.0, [(2019, 10.0), (2021, 12.0)]).unwrap();
        let text = report.render();
        assert!(text.contains("URBAN GROWTH ANALYSIS - Dubai (2019-2021)"));
        assert!(text.contains("Year | Urban Area (km²) | % of Dubai | Growth from 2019"));
        assert!(text.contains("Dubai Total Area: 4000.00 km²"));
    }

    #[test]
    fn zero_base_and_single_year_give_na() {
        let zero = GrowthReport::build("UAE", 100.0, [(2018, 0.0), (2020, 5.0)]).unwrap();
        assert_eq!(zero.summary.total_growth_pct, None);
        assert_eq!(zero.summary.avg_annual_growth_rate_pct, None);
        assert_relative_eq!(zero.summary.avg_annual_growth_km2.unwrap(), 2.5);
        assert!(zero.render().contains("Percentage growth: N/A"));

        let single = GrowthReport::build("UAE", 100.0, [(2018, 7.0)]).unwrap();
        assert_eq!(single.summary.avg_annual_growth_km2, None);
        assert!(single.render().contains("Average annual growth: N/A"));
    }

    #[test]
    fn empty_input_is_an_error() {
        let none: Vec<(i32, f64)> = Vec::new();
        assert!(matches!(
            GrowthReport::build("UAE", 1.0, none),
            Err(Error::EmptyReport)
        ));
    }
}
