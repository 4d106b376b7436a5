//! Immutable reach topology.

use rp_core::ReachId;
use std::collections::HashMap;

/// One reach with its downstream neighbor and sorted upstream neighbors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityRow {
    pub id: ReachId,
    pub downstream: Option<ReachId>,
    pub upstream: Vec<ReachId>,
}

/// Validated river network, rows ascending by reach id.
///
/// Built through [`crate::ConnectivityBuilder`] or read back from a
/// connectivity file. `width` is the fixed number of upstream columns.
#[derive(Debug, Clone)]
pub struct Connectivity {
    rows: Vec<ConnectivityRow>,
    width: usize,
    sentinel: ReachId,
    index: HashMap<ReachId, usize>,
}

impl Connectivity {
    pub(crate) fn from_sorted_rows(
        rows: Vec<ConnectivityRow>,
        width: usize,
        sentinel: ReachId,
    ) -> Self {
        let index = rows.iter().enumerate().map(|(i, r)| (r.id, i)).collect();
        Self {
            rows,
            width,
            sentinel,
            index,
        }
    }

    pub fn rows(&self) -> &[ConnectivityRow] {
        &self.rows
    }

    /// Number of upstream columns in the written table.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Value written in place of a missing downstream id.
    pub fn outlet_sentinel(&self) -> ReachId {
        self.sentinel
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reach id universe in file order.
    pub fn reach_ids(&self) -> Vec<ReachId> {
        self.rows.iter().map(|r| r.id).collect()
    }

    pub fn position(&self, id: ReachId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn row(&self, id: ReachId) -> Option<&ConnectivityRow> {
        self.position(id).map(|i| &self.rows[i])
    }

    pub fn contains(&self, id: ReachId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn outlets(&self) -> impl Iterator<Item = ReachId> + '_ {
        self.rows
            .iter()
            .filter(|r| r.downstream.is_none())
            .map(|r| r.id)
    }

    /// Row `i` as written: id, downstream or sentinel, count, zero-padded upstream ids.
    pub fn padded_row(&self, i: usize) -> Vec<ReachId> {
        let row = &self.rows[i];
        let mut out = Vec::with_capacity(3 + self.width);
        out.push(row.id);
        out.push(row.downstream.unwrap_or(self.sentinel));
        out.push(row.upstream.len() as ReachId);
        out.extend(row.upstream.iter().copied());
        out.resize(3 + self.width, 0);
        out
    }

    /// Reach ids ordered by descending (downstream, id), the basin id order
    /// expected by the routing model.
    pub fn basin_order(&self) -> Vec<ReachId> {
        let mut keyed: Vec<(ReachId, ReachId)> = self
            .rows
            .iter()
            .map(|r| (r.downstream.unwrap_or(self.sentinel), r.id))
            .collect();
        keyed.sort_unstable_by(|a, b| b.cmp(a));
        keyed.into_iter().map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::{ConnectivityBuilder, ConnectivityOptions};

    #[test]
    fn basin_order_descends_by_downstream_then_id() {
        let mut b = ConnectivityBuilder::new(ConnectivityOptions::default());
        b.add_reach(1, None);
        b.add_reach(2, Some(1));
        b.add_reach(3, Some(1));
        b.add_reach(4, Some(3));
        let net = b.build().unwrap();
        assert_eq!(net.basin_order(), vec![4, 3, 2, 1]);
    }

    #[test]
    fn lookup_by_id() {
        let mut b = ConnectivityBuilder::new(ConnectivityOptions::default());
        b.add_reach(30, None);
        b.add_reach(10, Some(30));
        let net = b.build().unwrap();
        assert_eq!(net.position(10), Some(0));
        assert_eq!(net.row(30).unwrap().upstream, vec![10]);
        assert!(!net.contains(20));
        assert_eq!(net.outlets().collect::<Vec<_>>(), vec![30]);
    }
}
