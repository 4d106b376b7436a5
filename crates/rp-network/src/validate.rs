//! Connectivity validation logic.

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use rp_core::{PrepResult, ReachId};
use std::collections::HashSet;

use crate::connectivity::ConnectivityRow;
use crate::error::NetworkError;
use crate::MAX_UPSTREAM_LIMIT;

pub(crate) fn validate_cap(cap: Option<usize>) -> PrepResult<()> {
    match cap {
        Some(c) if !(1..=MAX_UPSTREAM_LIMIT).contains(&c) => {
            Err(NetworkError::InvalidUpstreamCap { cap: c }.into())
        }
        _ => Ok(()),
    }
}

/// Reject repeated reach ids.
pub(crate) fn validate_unique<I>(ids: I) -> PrepResult<()>
where
    I: IntoIterator<Item = ReachId>,
{
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(NetworkError::DuplicateReach { id }.into());
        }
    }
    Ok(())
}

/// Every reach must drain to an outlet; a topological order exists iff
/// the downstream relation has no cycle.
pub(crate) fn validate_acyclic(rows: &[ConnectivityRow]) -> PrepResult<()> {
    let mut graph: DiGraphMap<ReachId, ()> = DiGraphMap::with_capacity(rows.len(), rows.len());
    for row in rows {
        graph.add_node(row.id);
    }
    for row in rows {
        if let Some(down) = row.downstream {
            if graph.contains_node(down) {
                graph.add_edge(row.id, down, ());
            }
        }
    }

    toposort(&graph, None)
        .map(|_| ())
        .map_err(|cycle| NetworkError::Cycle { id: cycle.node_id() }.into())
}

/// Sentinel must not be a reach id when any reach is written as an outlet.
pub(crate) fn validate_sentinel(rows: &[ConnectivityRow], sentinel: ReachId) -> PrepResult<()> {
    let has_outlet = rows.iter().any(|r| r.downstream.is_none());
    if has_outlet && rows.iter().any(|r| r.id == sentinel) {
        return Err(NetworkError::SentinelCollision { sentinel }.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: ReachId, downstream: Option<ReachId>) -> ConnectivityRow {
        ConnectivityRow {
            id,
            downstream,
            upstream: vec![],
        }
    }

    #[test]
    fn detects_two_reach_cycle() {
        let rows = vec![row(1, Some(2)), row(2, Some(1))];
        let err = validate_acyclic(&rows).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn downstream_outside_network_is_not_a_cycle() {
        let rows = vec![row(1, Some(2)), row(2, Some(99))];
        validate_acyclic(&rows).unwrap();
    }

    #[test]
    fn sentinel_without_outlets_is_allowed() {
        let rows = vec![row(0, Some(5))];
        validate_sentinel(&rows, 0).unwrap();
        let rows = vec![row(0, None)];
        assert!(validate_sentinel(&rows, 0).unwrap_err().is_configuration());
    }

    #[test]
    fn cap_range() {
        validate_cap(None).unwrap();
        validate_cap(Some(1)).unwrap();
        validate_cap(Some(12)).unwrap();
        assert!(validate_cap(Some(0)).is_err());
        assert!(validate_cap(Some(13)).is_err());
    }
}
