//! Annual median composites.
//!
//! Tiles acquired in the seasonal window are cloud-masked, reduced to the six
//! selected bands, mosaicked onto the analysis grid and reduced per pixel by
//! the median. The result is clipped to the region and extended with the
//! spectral index bands.
use chrono::NaiveDate;
use ndarray::parallel::prelude::*;
use ndarray::{Array2, Array3, Axis};
use tracing::{debug, info};

use crate::core::params::CompositeParams;
use crate::core::processing::indices::add_indices;
use crate::core::processing::mask::mask_clouds;
use crate::core::raster::{Composite, Grid, Tile};
use crate::core::region::Region;
use crate::error::{Error, Result};
use crate::io::source::RasterSource;
use crate::types::Band;

/// Half-open acquisition window [start, end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Season starting in `year` and ending in `year + 1`.
    pub fn for_year(year: i32, params: &CompositeParams) -> Result<Self> {
        let (sm, sd) = params.start_month_day;
        let (em, ed) = params.end_month_day;
        let start = NaiveDate::from_ymd_opt(year, sm, sd).ok_or(Error::InvalidArgument {
            arg: "composite.start_month_day",
            value: format!("{}-{}", sm, sd),
        })?;
        let end = NaiveDate::from_ymd_opt(year + 1, em, ed).ok_or(Error::InvalidArgument {
            arg: "composite.end_month_day",
            value: format!("{}-{}", em, ed),
        })?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// Fetch, mask and reduce one year's imagery.
pub fn annual_composite(
    source: &dyn RasterSource,
    region: &Region,
    grid: &Grid,
    region_mask: &Array2<bool>,
    year: i32,
    params: &CompositeParams,
) -> Result<Composite> {
    let window = DateWindow::for_year(year, params)?;
    let tiles = source.tiles(region, &window)?;
    info!(year, tiles = tiles.len(), "Total images before filtering");
    build_composite(year, &window, tiles, grid, region_mask, params)
}

/// Reduce a tile stack to a clipped, index-augmented median composite.
pub fn build_composite(
    year: i32,
    window: &DateWindow,
    tiles: Vec<Tile>,
    grid: &Grid,
    region_mask: &Array2<bool>,
    params: &CompositeParams,
) -> Result<Composite> {
    let missing = || Error::MissingImagery {
        year,
        start: window.start,
        end: window.end,
    };

    let mut selected = Vec::with_capacity(tiles.len());
    for mut tile in tiles {
        if !window.contains(tile.acquired) {
            debug!(tile = %tile.id, acquired = %tile.acquired, "outside window, dropped");
            continue;
        }
        let offset = tile.offset_on(grid)?;
        let masked = mask_clouds(&mut tile, &params.masked_scl_codes);
        debug!(tile = %tile.id, masked, "cloud mask applied");
        selected.push((tile, offset));
    }
    info!(year, tiles = selected.len(), "Images after band selection");

    if selected.is_empty() {
        return Err(missing());
    }

    let (rows, cols) = grid.shape();
    let mut data = Array3::from_elem((Band::ALL.len(), rows, cols), f32::NAN);

    // One grid row at a time: only a per-pixel scratch buffer is held besides
    // the output, and pixels outside the region are never reduced.
    data.axis_iter_mut(Axis(1))
        .into_par_iter()
        .enumerate()
        .for_each(|(row, mut plane)| {
            let mut values = Vec::with_capacity(selected.len());
            for col in 0..cols {
                if !region_mask[[row, col]] {
                    continue;
                }
                for band in Band::SELECTED {
                    values.clear();
                    values.extend(
                        selected
                            .iter()
                            .filter_map(|(tile, offset)| sample_band(tile, band, *offset, row, col)),
                    );
                    plane[[band.index(), col]] = median(&mut values);
                }
            }
        });

    let mut composite = Composite {
        year,
        grid: *grid,
        data,
    };
    if composite.valid_pixel_count() == 0 {
        return Err(missing());
    }
    add_indices(&mut composite);
    Ok(composite)
}

/// Value of `band` from `tile` at grid pixel (row, col); None where the tile
/// does not reach or the pixel is cloud-masked. SCL follows the blue band's validity.
fn sample_band(
    tile: &Tile,
    band: Band,
    (row_off, col_off): (isize, isize),
    row: usize,
    col: usize,
) -> Option<f32> {
    let (t_rows, t_cols) = tile.shape();
    let tr = usize::try_from(row as isize - row_off).ok()?;
    let tc = usize::try_from(col as isize - col_off).ok()?;
    if tr >= t_rows || tc >= t_cols {
        return None;
    }
    let value = match Band::REFLECTANCE.iter().position(|b| *b == band) {
        Some(i) => tile.reflectance[[i, tr, tc]],
        None if tile.reflectance[[0, tr, tc]].is_nan() => return None,
        None => tile.scl[[tr, tc]] as f32,
    };
    value.is_finite().then_some(value)
}

/// Median of the finite values; NaN when there are none.
fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return f32::NAN;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
