//! Connectivity and basin id files.
//!
//! Both are headerless comma-delimited tables in the layout the routing
//! model reads directly.

use rp_core::{PrepError, PrepResult, ReachId};
use std::path::Path;

use crate::connectivity::{Connectivity, ConnectivityRow};
use crate::error::NetworkError;
use crate::validate;

fn headerless_writer(path: &Path) -> PrepResult<csv::Writer<std::fs::File>> {
    Ok(csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)?)
}

/// Write `[id, downstream|sentinel, count, up_1..up_N]` rows, fixed width.
pub fn write_connectivity_csv(network: &Connectivity, path: &Path) -> PrepResult<()> {
    let mut out = headerless_writer(path)?;
    for i in 0..network.len() {
        out.write_record(network.padded_row(i).iter().map(|v| v.to_string()))?;
    }
    out.flush()?;
    tracing::info!(path = %path.display(), reaches = network.len(), "wrote connectivity");
    Ok(())
}

/// Read a connectivity file back; `sentinel` marks outlets.
pub fn read_connectivity_csv(path: &Path, sentinel: ReachId) -> PrepResult<Connectivity> {
    let content = std::fs::read_to_string(path)?;
    parse_connectivity_csv(&content, sentinel)
}

pub fn parse_connectivity_csv(content: &str, sentinel: ReachId) -> PrepResult<Connectivity> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut rows = Vec::new();
    let mut width: Option<usize> = None;

    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line_no = record.position().map_or(0, |p| p.line() as usize);
        let malformed = |what: String| -> PrepError {
            NetworkError::MalformedRow {
                line: line_no,
                what,
            }
            .into()
        };

        let values = record
            .iter()
            .map(|s| s.parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| malformed(format!("non-integer value ({e})")))?;
        if values.len() < 3 {
            return Err(malformed(format!("expected at least 3 columns, found {}", values.len())));
        }

        let row_width = values.len() - 3;
        match width {
            None => width = Some(row_width),
            Some(w) if w != row_width => {
                return Err(malformed(format!(
                    "row has {row_width} upstream columns, previous rows have {w}"
                )))
            }
            Some(_) => {}
        }

        let count = usize::try_from(values[2])
            .ok()
            .filter(|&c| c <= row_width)
            .ok_or_else(|| malformed(format!("upstream count {} out of range", values[2])))?;

        rows.push(ConnectivityRow {
            id: values[0],
            downstream: (values[1] != sentinel).then_some(values[1]),
            upstream: values[3..3 + count].to_vec(),
        });
    }

    validate::validate_unique(rows.iter().map(|r| r.id))?;
    if rows.windows(2).any(|w| w[0].id > w[1].id) {
        return Err(PrepError::data("connectivity rows are not ascending by reach id"));
    }

    Ok(Connectivity::from_sorted_rows(
        rows,
        width.unwrap_or(0),
        sentinel,
    ))
}

/// Write the basin id file: one reach id per row in descending
/// (downstream, id) order.
pub fn write_basin_id_csv(network: &Connectivity, path: &Path) -> PrepResult<()> {
    let mut out = headerless_writer(path)?;
    for id in network.basin_order() {
        out.write_record([id.to_string()])?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_ragged_rows() {
        let err = parse_connectivity_csv("1,0,1,2\n2,1,0\n", 0).unwrap_err();
        assert!(err.to_string().contains("upstream columns"));
    }

    #[test]
    fn parse_rejects_count_above_width() {
        let err = parse_connectivity_csv("1,0,2,2\n", 0).unwrap_err();
        assert!(err.is_data_validation());
    }

    #[test]
    fn parse_reports_the_offending_line() {
        let err = parse_connectivity_csv("1,0,0,0\n2,x,0,0\n", 0).unwrap_err();
        assert!(err.to_string().contains("row 2"), "{err}");
    }

    #[test]
    fn parse_reads_sentinel_as_outlet() {
        let net = parse_connectivity_csv("101,0,1,102\n102,101,0,0\n", 0).unwrap();
        assert_eq!(net.width(), 1);
        assert_eq!(net.row(101).unwrap().downstream, None);
        assert_eq!(net.row(101).unwrap().upstream, vec![102]);
        assert_eq!(net.row(102).unwrap().downstream, Some(101));
    }
}
