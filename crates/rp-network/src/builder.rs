//! Incremental connectivity builder.

use rp_core::{PrepResult, ReachId};
use std::collections::HashMap;

use crate::connectivity::{Connectivity, ConnectivityRow};
use crate::error::NetworkError;
use crate::features::DrainageRecord;
use crate::validate;

/// Immutable options passed to the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityOptions {
    /// Fixed upstream width; `None` uses the observed maximum.
    pub max_upstream: Option<usize>,
    /// Value written when a reach has no downstream neighbor.
    pub outlet_sentinel: ReachId,
}

impl Default for ConnectivityOptions {
    fn default() -> Self {
        Self {
            max_upstream: None,
            outlet_sentinel: 0,
        }
    }
}

/// Node-based topology of one reach (NHDPlus style flowline attributes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLink {
    pub id: ReachId,
    pub from_node: i64,
    pub to_node: i64,
    /// 0 = none, 1 = main path of a divergence, 2 = minor path.
    pub divergence: i64,
}

/// How downstream links are derived from drainage records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkSource {
    /// Explicit downstream id attribute.
    #[default]
    NextDown,
    /// From-node / to-node ids plus divergence code.
    NodeTopology,
}

/// Builder for constructing a river network incrementally.
///
/// Use `add_reach` to collect links, then call `build()` to validate and
/// freeze them into an immutable `Connectivity`.
#[derive(Debug, Default)]
pub struct ConnectivityBuilder {
    links: Vec<(ReachId, Option<ReachId>)>,
    options: ConnectivityOptions,
}

impl ConnectivityBuilder {
    pub fn new(options: ConnectivityOptions) -> Self {
        Self {
            links: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> &ConnectivityOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Add a reach with an explicit downstream neighbor.
    pub fn add_reach(&mut self, id: ReachId, downstream: Option<ReachId>) {
        self.links.push((id, downstream));
    }

    /// Add a reach whose downstream id comes from a source attribute.
    ///
    /// Negative values and the outlet sentinel mean "no downstream".
    pub fn add_link(&mut self, id: ReachId, raw_downstream: i64) {
        let downstream = if raw_downstream < 0 || raw_downstream == self.options.outlet_sentinel {
            None
        } else {
            Some(raw_downstream)
        };
        self.add_reach(id, downstream);
    }

    /// Builder over `(reach_id, raw_downstream)` pairs.
    pub fn from_links<I>(links: I, options: ConnectivityOptions) -> Self
    where
        I: IntoIterator<Item = (ReachId, i64)>,
    {
        let mut builder = Self::new(options);
        for (id, down) in links {
            builder.add_link(id, down);
        }
        builder
    }

    /// Builder deriving downstream ids from node topology.
    ///
    /// A from-node of 0 is unknown and a minor divergence branch (code 2)
    /// is cut at its from-node, so each node keeps only its primary
    /// successor. The downstream of a reach is the reach starting at its
    /// to-node; the lowest id wins if several remain.
    pub fn from_node_topology(rows: &[NodeLink], options: ConnectivityOptions) -> Self {
        let mut by_from_node: HashMap<i64, ReachId> = HashMap::with_capacity(rows.len());
        for row in rows {
            if row.from_node == 0 || row.divergence == 2 {
                continue;
            }
            by_from_node
                .entry(row.from_node)
                .and_modify(|id| {
                    if row.id < *id {
                        *id = row.id;
                    }
                })
                .or_insert(row.id);
        }

        let mut builder = Self::new(options);
        for row in rows {
            let downstream = if row.to_node == 0 {
                None
            } else {
                by_from_node
                    .get(&row.to_node)
                    .copied()
                    .filter(|&d| d != row.id)
            };
            builder.add_reach(row.id, downstream);
        }
        builder
    }

    /// Builder over drainage records using the requested link source.
    pub fn from_drainage(
        records: &[DrainageRecord],
        source: LinkSource,
        options: ConnectivityOptions,
    ) -> PrepResult<Self> {
        match source {
            LinkSource::NextDown => {
                let mut builder = Self::new(options);
                for rec in records {
                    let down = rec.next_down.ok_or_else(|| NetworkError::MissingField {
                        field: format!("downstream id of reach {}", rec.id),
                    })?;
                    builder.add_link(rec.id, down);
                }
                Ok(builder)
            }
            LinkSource::NodeTopology => {
                let mut nodes = Vec::with_capacity(records.len());
                for rec in records {
                    let (from_node, to_node) = match (rec.from_node, rec.to_node) {
                        (Some(f), Some(t)) => (f, t),
                        _ => {
                            return Err(NetworkError::MissingField {
                                field: format!("from/to node of reach {}", rec.id),
                            }
                            .into())
                        }
                    };
                    nodes.push(NodeLink {
                        id: rec.id,
                        from_node,
                        to_node,
                        divergence: rec.divergence.unwrap_or(0),
                    });
                }
                Ok(Self::from_node_topology(&nodes, options))
            }
        }
    }

    /// Build and validate the network, returning an immutable `Connectivity`.
    pub fn build(self) -> PrepResult<Connectivity> {
        let ConnectivityOptions {
            max_upstream,
            outlet_sentinel,
        } = self.options;

        validate::validate_cap(max_upstream)?;
        validate::validate_unique(self.links.iter().map(|(id, _)| *id))?;

        let mut links = self.links;
        links.sort_unstable_by_key(|(id, _)| *id);

        // Group upstream ids by their downstream reach
        let mut upstream_of: HashMap<ReachId, Vec<ReachId>> = HashMap::new();
        for (id, down) in &links {
            if let Some(d) = down {
                upstream_of.entry(*d).or_default().push(*id);
            }
        }

        let rows: Vec<ConnectivityRow> = links
            .into_iter()
            .map(|(id, downstream)| {
                let mut upstream = upstream_of.remove(&id).unwrap_or_default();
                upstream.sort_unstable();
                ConnectivityRow {
                    id,
                    downstream,
                    upstream,
                }
            })
            .collect();

        let observed = rows.iter().map(|r| r.upstream.len()).max().unwrap_or(0);
        let width = max_upstream.unwrap_or(observed);
        if let Some(row) = rows.iter().find(|r| r.upstream.len() > width) {
            return Err(NetworkError::UpstreamOverflow {
                id: row.id,
                count: row.upstream.len(),
                cap: width,
            }
            .into());
        }

        validate::validate_sentinel(&rows, outlet_sentinel)?;
        validate::validate_acyclic(&rows)?;

        tracing::info!(
            reaches = rows.len(),
            width,
            outlets = rows.iter().filter(|r| r.downstream.is_none()).count(),
            "built connectivity"
        );

        Ok(Connectivity::from_sorted_rows(rows, width, outlet_sentinel))
    }
}
