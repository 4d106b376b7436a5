//! Fractional-area weights between catchments and grid cells.

use std::collections::BTreeMap;

use geo::orient::{Direction, Orient};
use geo::{BooleanOps, BoundingRect, GeodesicArea};
use rayon::prelude::*;
use rp_core::{CellIndex, PrepError, PrepResult, ReachId};
use rp_grid::LsmGrid;

use crate::catchment::CatchmentSet;
use crate::table::{IndexLabels, WeightRecord, WeightTable};
use crate::thiessen::Tessellation;

#[derive(Debug, Clone, PartialEq)]
pub struct WeightOptions {
    /// Extra margin around the catchment extent, degrees. Never smaller than
    /// twice the largest grid spacing.
    pub buffer_deg: Option<f64>,
    /// First header token of the written table.
    pub reach_field: String,
    pub labels: IndexLabels,
}

impl Default for WeightOptions {
    fn default() -> Self {
        Self {
            buffer_deg: None,
            reach_field: "rivid".to_string(),
            labels: IndexLabels::LonLat,
        }
    }
}

/// Weight table plus the cells it was computed from.
#[derive(Debug)]
pub struct WeightBuild {
    pub table: WeightTable,
    pub tessellation: Tessellation,
    /// Reaches that received a dummy record.
    pub dummies: usize,
}

#[derive(Debug, Clone, Default)]
pub struct WeightTableBuilder {
    options: WeightOptions,
}

impl WeightTableBuilder {
    pub fn new(options: WeightOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WeightOptions {
        &self.options
    }

    pub fn build(
        &self,
        catchments: &CatchmentSet,
        grid: &LsmGrid,
        universe: &[ReachId],
    ) -> PrepResult<WeightTable> {
        Ok(self.build_with_cells(catchments, grid, universe)?.table)
    }

    /// Rows follow `universe` order; every reach gets at least one row.
    pub fn build_with_cells(
        &self,
        catchments: &CatchmentSet,
        grid: &LsmGrid,
        universe: &[ReachId],
    ) -> PrepResult<WeightBuild> {
        if universe.is_empty() {
            return Err(PrepError::config("reach id universe is empty"));
        }
        let catchments = catchments.to_geographic();
        let extent = catchments
            .extent()
            .ok_or_else(|| PrepError::config("catchment collection has no geometry"))?;

        let min_buffer = 2.0 * grid.max_spacing();
        let buffer = self.options.buffer_deg.map_or(min_buffer, |b| b.max(min_buffer));
        let points = grid.points_within(
            extent.min().x - buffer,
            extent.max().x + buffer,
            extent.min().y - buffer,
            extent.max().y + buffer,
        );
        if points.is_empty() {
            return Err(PrepError::config(format!(
                "no grid points within {buffer} degrees of the catchment extent \
                 ({:.4}, {:.4}) - ({:.4}, {:.4})",
                extent.min().x,
                extent.min().y,
                extent.max().x,
                extent.max().y
            )));
        }
        let tessellation = Tessellation::new(grid, &points);
        tracing::debug!(cells = tessellation.len(), buffer, "built Thiessen cells");

        let overlaps: Vec<BTreeMap<CellIndex, f64>> = universe
            .par_iter()
            .map(|&id| {
                let mut areas = BTreeMap::new();
                let Some(catchment) = catchments.get(id) else {
                    return areas;
                };
                let Some(bounds) = catchment.geometry.bounding_rect() else {
                    return areas;
                };
                for cell in tessellation.candidates(&bounds) {
                    // overlay output winds clockwise; geodesic area needs CCW shells
                    let piece = cell.polygon.intersection(&catchment.geometry);
                    let area = piece.orient(Direction::Default).geodesic_area_unsigned();
                    if area > 0.0 {
                        *areas.entry(cell.cell).or_insert(0.0) += area;
                    }
                }
                areas
            })
            .collect();

        let fallback = match overlaps.iter().find_map(|a| a.keys().next().copied()) {
            Some(cell) => cell,
            None => {
                let c = extent.center();
                grid.locate(c.x, c.y)?
            }
        };

        let mut records = Vec::new();
        let mut dummies = 0;
        for (&reach_id, areas) in universe.iter().zip(&overlaps) {
            if areas.is_empty() {
                if catchments.get(reach_id).is_none() {
                    tracing::debug!(reach_id, "reach has no catchment polygon");
                }
                dummies += 1;
                let (lon, lat) = grid.point(fallback);
                records.push(WeightRecord {
                    reach_id,
                    area_sqm: 0.0,
                    cell: fallback,
                    npoints: 1,
                    weight: 1.0,
                    lon,
                    lat,
                });
                continue;
            }
            let total: f64 = areas.values().sum();
            for (&cell, &area) in areas {
                let (lon, lat) = grid.point(cell);
                records.push(WeightRecord {
                    reach_id,
                    area_sqm: area,
                    cell,
                    npoints: areas.len(),
                    weight: area / total,
                    lon,
                    lat,
                });
            }
        }

        tracing::info!(
            reaches = universe.len(),
            rows = records.len(),
            dummies,
            "built weight table"
        );
        Ok(WeightBuild {
            table: WeightTable::new(self.options.reach_field.clone(), self.options.labels, records),
            tessellation,
            dummies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use geo::{polygon, MultiPolygon};
    use rp_grid::LonConvention;

    fn unit_grid() -> LsmGrid {
        LsmGrid::rectilinear(
            (0..8).map(|i| i as f64 * 0.25).collect(),
            (0..8).map(|j| 1.75 - j as f64 * 0.25).collect(),
            LonConvention::Signed,
        )
        .unwrap()
    }

    #[test]
    fn empty_universe_is_rejected() {
        let set = CatchmentSet::new(Crs::Geographic, vec![]);
        let err = WeightTableBuilder::default()
            .build(&set, &unit_grid(), &[])
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn single_cell_catchment() {
        // entirely inside the cell of the point (0.5, 1.0)
        let poly = polygon![(x: 0.45, y: 0.95), (x: 0.55, y: 0.95), (x: 0.55, y: 1.05), (x: 0.45, y: 1.05)];
        let expected = poly.geodesic_area_unsigned();
        let set = CatchmentSet::new(Crs::Geographic, vec![(1, MultiPolygon::new(vec![poly]))]);
        let table = WeightTableBuilder::default()
            .build(&set, &unit_grid(), &[1, 2])
            .unwrap();

        assert_eq!(table.len(), 2);
        let r = &table.records()[0];
        assert_eq!(r.cell, CellIndex::new(2, 3));
        assert_eq!((r.npoints, r.weight, r.lon, r.lat), (1, 1.0, 0.5, 1.0));
        assert!((r.area_sqm - expected).abs() / expected < 1e-6);

        // reach 2 has no catchment: dummy borrowing the first valid indices
        let d = &table.records()[1];
        assert_eq!((d.reach_id, d.area_sqm, d.npoints, d.weight), (2, 0.0, 1, 1.0));
        assert_eq!(d.cell, CellIndex::new(2, 3));
    }

    #[test]
    fn clockwise_catchment_keeps_its_own_area() {
        // 0.1 degree square wound clockwise, well inside one 0.25 degree cell
        let poly = polygon![(x: 0.45, y: 0.95), (x: 0.45, y: 1.05), (x: 0.55, y: 1.05), (x: 0.55, y: 0.95)];
        let expected = poly.orient(Direction::Default).geodesic_area_unsigned();
        let set = CatchmentSet::new(Crs::Geographic, vec![(1, MultiPolygon::new(vec![poly]))]);
        let table = WeightTableBuilder::default()
            .build(&set, &unit_grid(), &[1])
            .unwrap();

        assert_eq!(table.len(), 1);
        let r = &table.records()[0];
        assert!(r.area_sqm < 2.0e8, "{}", r.area_sqm);
        assert!((r.area_sqm - expected).abs() / expected < 1e-6);
    }

    #[test]
    fn records_sorted_by_lat_then_lon() {
        // straddles the corner shared by four cells
        let poly = polygon![(x: 0.5, y: 0.5), (x: 0.75, y: 0.5), (x: 0.75, y: 0.75), (x: 0.5, y: 0.75)];
        let set = CatchmentSet::new(Crs::Geographic, vec![(9, MultiPolygon::new(vec![poly]))]);
        let build = WeightTableBuilder::default()
            .build_with_cells(&set, &unit_grid(), &[9])
            .unwrap();
        let cells: Vec<CellIndex> = build.table.records().iter().map(|r| r.cell).collect();
        let mut sorted = cells.clone();
        sorted.sort();
        assert_eq!(cells, sorted);
        assert_eq!(cells.len(), 4);
        assert!(build.table.records().iter().all(|r| r.npoints == 4));
        let total: f64 = build.table.records().iter().map(|r| r.weight).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(build.dummies, 0);
    }
}
