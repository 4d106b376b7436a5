//! Weight table records and their delimited-text form.

use std::ops::Range;
use std::path::Path;

use rp_core::{CellIndex, PrepError, PrepResult, ReachId};

/// One (reach, grid point) overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightRecord {
    pub reach_id: ReachId,
    /// Overlap area in square meters.
    pub area_sqm: f64,
    pub cell: CellIndex,
    /// Number of records of this reach.
    pub npoints: usize,
    /// `area_sqm` over the reach total; 1.0 for a dummy record.
    pub weight: f64,
    /// Grid point coordinates (NaN when read from a 5-column table).
    pub lon: f64,
    pub lat: f64,
}

/// Header labels of the two index columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexLabels {
    #[default]
    LonLat,
    /// WRF-Hydro style.
    WestEastSouthNorth,
}

impl IndexLabels {
    pub fn names(self) -> (&'static str, &'static str) {
        match self {
            IndexLabels::LonLat => ("lon_index", "lat_index"),
            IndexLabels::WestEastSouthNorth => ("west_east", "south_north"),
        }
    }

    fn detect(lon: &str, lat: &str) -> Option<Self> {
        [IndexLabels::LonLat, IndexLabels::WestEastSouthNorth]
            .into_iter()
            .find(|l| {
                let (x, y) = l.names();
                lon.eq_ignore_ascii_case(x) && lat.eq_ignore_ascii_case(y)
            })
    }
}

/// Consecutive rows of one reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachGroup {
    pub reach_id: ReachId,
    pub rows: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    reach_field: String,
    labels: IndexLabels,
    records: Vec<WeightRecord>,
}

impl WeightTable {
    pub fn new(reach_field: impl Into<String>, labels: IndexLabels, records: Vec<WeightRecord>) -> Self {
        Self {
            reach_field: reach_field.into(),
            labels,
            records,
        }
    }

    /// First header token, used verbatim as the reach dimension name downstream.
    pub fn reach_field(&self) -> &str {
        &self.reach_field
    }

    pub fn labels(&self) -> IndexLabels {
        self.labels
    }

    pub fn records(&self) -> &[WeightRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Split rows into per-reach groups, in table order.
    ///
    /// Each group must hold exactly `npoints` rows and a reach may not
    /// reappear after another reach's rows.
    pub fn groups(&self) -> PrepResult<Vec<ReachGroup>> {
        let mut groups: Vec<ReachGroup> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut start = 0;
        while start < self.records.len() {
            let id = self.records[start].reach_id;
            let mut end = start + 1;
            while end < self.records.len() && self.records[end].reach_id == id {
                end += 1;
            }
            if !seen.insert(id) {
                return Err(malformed(format!(
                    "reach {id} appears in separate groups (row {})",
                    start + 1
                )));
            }
            let npoints = self.records[start].npoints;
            if let Some(bad) = self.records[start..end].iter().find(|r| r.npoints != npoints) {
                return Err(malformed(format!(
                    "reach {id} has inconsistent npoints ({} and {})",
                    npoints, bad.npoints
                )));
            }
            if npoints != end - start {
                return Err(malformed(format!(
                    "reach {id} declares npoints = {npoints} but has {} rows",
                    end - start
                )));
            }
            groups.push(ReachGroup {
                reach_id: id,
                rows: start..end,
            });
            start = end;
        }
        Ok(groups)
    }

    /// Reach ids in table order, one per group.
    pub fn reach_ids(&self) -> Vec<ReachId> {
        let mut ids: Vec<ReachId> = Vec::new();
        for r in &self.records {
            if ids.last() != Some(&r.reach_id) {
                ids.push(r.reach_id);
            }
        }
        ids
    }

    pub fn write_csv(&self, path: &Path) -> PrepResult<()> {
        self.write_to(csv::Writer::from_path(path)?)?;
        tracing::info!(path = %path.display(), rows = self.len(), "wrote weight table");
        Ok(())
    }

    pub fn to_csv(&self) -> PrepResult<String> {
        let mut buf = Vec::new();
        self.write_to(csv::Writer::from_writer(&mut buf))?;
        String::from_utf8(buf).map_err(|e| PrepError::data(e.to_string()))
    }

    fn write_to<W: std::io::Write>(&self, mut out: csv::Writer<W>) -> PrepResult<()> {
        let (lon_label, lat_label) = self.labels.names();
        out.write_record([
            self.reach_field.as_str(),
            "area_sqm",
            lon_label,
            lat_label,
            "npoints",
            "weight",
            "Lon",
            "Lat",
        ])?;
        for r in &self.records {
            out.write_record([
                r.reach_id.to_string(),
                r.area_sqm.to_string(),
                r.cell.lon.to_string(),
                r.cell.lat.to_string(),
                r.npoints.to_string(),
                r.weight.to_string(),
                r.lon.to_string(),
                r.lat.to_string(),
            ])?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn read_csv(path: &Path) -> PrepResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_csv(&content)
    }

    /// Parse a weight table.
    ///
    /// Accepts the full 8-column layout and the short 5-column layout
    /// (`id, area_sqm, lon_index, lat_index, npoints`), whose weights are
    /// recomputed from the areas.
    pub fn parse_csv(content: &str) -> PrepResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let header = reader.headers().map_err(malformed)?.clone();
        let columns = header.len();
        if columns != 5 && columns < 8 {
            return Err(malformed(format!(
                "expected 5 or 8 columns, header has {columns}"
            )));
        }
        if header[0].is_empty() || !header[1].eq_ignore_ascii_case("area_sqm") {
            return Err(malformed(format!("unexpected header {header:?}")));
        }
        let labels = IndexLabels::detect(&header[2], &header[3]).ok_or_else(|| {
            malformed(format!(
                "index columns '{}', '{}' are neither lon_index/lat_index nor west_east/south_north",
                &header[2], &header[3]
            ))
        })?;
        if !header[4].eq_ignore_ascii_case("npoints") {
            return Err(malformed(format!("fifth column is '{}', not npoints", &header[4])));
        }
        let extended = columns >= 8;

        let mut records = Vec::new();
        for cells in reader.records() {
            let cells = cells.map_err(malformed)?;
            if cells.iter().all(str::is_empty) {
                continue;
            }
            let row = cells.position().map_or(0, |p| p.line());
            if cells.len() != columns {
                return Err(malformed(format!(
                    "row {row} has {} columns, header has {columns}",
                    cells.len()
                )));
            }
            let float = |k: usize| -> PrepResult<f64> {
                cells[k]
                    .parse::<f64>()
                    .map_err(|_| malformed(format!("row {row}: '{}' is not a number", &cells[k])))
            };
            let count = |k: usize| -> PrepResult<usize> {
                cells[k]
                    .parse::<usize>()
                    .map_err(|_| malformed(format!("row {row}: '{}' is not an index", &cells[k])))
            };
            let reach_id = cells[0].parse::<ReachId>().map_err(|_| {
                malformed(format!("row {row}: '{}' is not a reach id", &cells[0]))
            })?;
            let (weight, lon, lat) = if extended {
                (float(5)?, float(6)?, float(7)?)
            } else {
                (f64::NAN, f64::NAN, f64::NAN)
            };
            records.push(WeightRecord {
                reach_id,
                area_sqm: float(1)?,
                cell: CellIndex::new(count(2)?, count(3)?),
                npoints: count(4)?,
                weight,
                lon,
                lat,
            });
        }

        let mut table = WeightTable::new(&header[0], labels, records);
        if !extended {
            table.recompute_weights();
        }
        Ok(table)
    }

    /// Weights from areas; reaches without area share weight evenly.
    fn recompute_weights(&mut self) {
        let mut start = 0;
        while start < self.records.len() {
            let id = self.records[start].reach_id;
            let end = self.records[start..]
                .iter()
                .position(|r| r.reach_id != id)
                .map_or(self.records.len(), |k| start + k);
            let total: f64 = self.records[start..end].iter().map(|r| r.area_sqm).sum();
            let n = (end - start) as f64;
            for r in &mut self.records[start..end] {
                r.weight = if total > 0.0 { r.area_sqm / total } else { 1.0 / n };
            }
            start = end;
        }
    }

    /// Inclusive `(min, max)` of the referenced cells, `None` when empty.
    pub fn index_bounds(&self) -> Option<(CellIndex, CellIndex)> {
        let mut iter = self.records.iter().map(|r| r.cell);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), c| {
            (
                CellIndex::new(lo.lon.min(c.lon), lo.lat.min(c.lat)),
                CellIndex::new(hi.lon.max(c.lon), hi.lat.max(c.lat)),
            )
        }))
    }
}

fn malformed(what: impl std::fmt::Display) -> PrepError {
    PrepError::config(format!("malformed weight table: {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(reach_id: ReachId, area: f64, lon: usize, lat: usize, npoints: usize) -> WeightRecord {
        WeightRecord {
            reach_id,
            area_sqm: area,
            cell: CellIndex::new(lon, lat),
            npoints,
            weight: 0.0,
            lon: 0.0,
            lat: 0.0,
        }
    }

    #[test]
    fn short_table_gets_weights() {
        let text = "COMID,area_sqm,west_east,south_north,npoints\n\
                    5,1000,3,4,2\n\
                    5,3000,3,5,2\n\
                    6,0,3,4,1\n";
        let table = WeightTable::parse_csv(text).unwrap();
        assert_eq!(table.reach_field(), "COMID");
        assert_eq!(table.labels(), IndexLabels::WestEastSouthNorth);
        let weights: Vec<f64> = table.records().iter().map(|r| r.weight).collect();
        assert_eq!(weights, vec![0.25, 0.75, 1.0]);
        assert!(table.records()[0].lon.is_nan());
        assert_eq!(table.reach_ids(), vec![5, 6]);
        assert_eq!(
            table.index_bounds(),
            Some((CellIndex::new(3, 4), CellIndex::new(3, 5)))
        );
    }

    #[test]
    fn full_table_survives_text() {
        let mut records = vec![record(101, 12.5, 0, 1, 1), record(102, 0.0, 0, 1, 1)];
        records[0].weight = 1.0;
        records[0].lon = -97.25;
        records[0].lat = 30.125;
        records[1].weight = 1.0;
        let table = WeightTable::new("HydroID", IndexLabels::LonLat, records);
        let text = table.to_csv().unwrap();
        assert!(text.starts_with("HydroID,area_sqm,lon_index,lat_index,npoints,weight,Lon,Lat\n"));
        assert_eq!(WeightTable::parse_csv(&text).unwrap(), table);
    }

    #[test]
    fn quoted_reach_field_is_unwrapped() {
        let text = "\"COMID\",area_sqm,lon_index,lat_index,npoints\n\"7\",2.0,1,1,1\n";
        let table = WeightTable::parse_csv(text).unwrap();
        assert_eq!(table.reach_field(), "COMID");
        assert_eq!(table.reach_ids(), vec![7]);
    }

    #[test]
    fn malformed_tables_are_configuration_errors() {
        for text in [
            "",
            "id,area_sqm,lon_index\n1,2,3\n",
            "id,area_sqm,x,y,npoints\n1,2,3,4,1\n",
            "id,area_sqm,lon_index,lat_index,npoints\n1,2,3\n",
            "id,area_sqm,lon_index,lat_index,npoints\n1,abc,3,4,1\n",
            "id,area_sqm,lon_index,lat_index,npoints\n1,2,-3,4,1\n",
        ] {
            let err = WeightTable::parse_csv(text).unwrap_err();
            assert!(err.is_configuration(), "{text:?}: {err}");
        }
    }

    #[test]
    fn groups_check_npoints_and_contiguity() {
        let ok = WeightTable::new(
            "id",
            IndexLabels::LonLat,
            vec![record(5, 1.0, 0, 0, 2), record(5, 1.0, 1, 0, 2), record(3, 0.0, 0, 0, 1)],
        );
        let groups = ok.groups().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].rows, 0..2);
        assert_eq!(groups[1].reach_id, 3);

        let short = WeightTable::new(
            "id",
            IndexLabels::LonLat,
            vec![record(5, 1.0, 0, 0, 3), record(5, 1.0, 1, 0, 3)],
        );
        assert!(short.groups().unwrap_err().is_configuration());

        let split = WeightTable::new(
            "id",
            IndexLabels::LonLat,
            vec![record(5, 1.0, 0, 0, 1), record(6, 1.0, 0, 0, 1), record(5, 1.0, 0, 0, 1)],
        );
        let err = split.groups().unwrap_err();
        assert!(err.to_string().contains("separate groups"));
    }
}
