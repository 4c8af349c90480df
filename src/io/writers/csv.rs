use std::io::Write;
use std::path::Path;

use csv::Writer;

use crate::core::report::GrowthReport;
use crate::error::Result;

/// Column names; two of them embed the region name and the base year.
pub fn growth_table_header(report: &GrowthReport) -> [String; 5] {
    let base = report.base_year();
    [
        "Year".to_string(),
        "Urban_Area_km2".to_string(),
        format!("Percentage_of_{}", report.region_name),
        format!("Growth_from_{}_km2", base),
        format!("Growth_from_{}_pct", base),
    ]
}

/// One row per year; an undefined growth percentage is left empty.
pub fn write_growth_table<W: Write>(report: &GrowthReport, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(growth_table_header(report))?;
    for r in &report.records {
        wtr.write_record([
            r.year.to_string(),
            r.urban_area_km2.to_string(),
            r.percent_of_region.to_string(),
            r.growth_km2.to_string(),
            r.growth_pct.map(|p| p.to_string()).unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_growth_csv(path: &Path, report: &GrowthReport) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_growth_table(report, file)
}
