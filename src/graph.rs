//! The routing graph over routable cells.

use crate::index::SpatialIndex;
use crate::signal::SignalPhase;
use crate::{Cell, Direction, SignalSet};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// The weight of an ordinary edge.
pub const BASE_WEIGHT: u32 = 1;

/// The factor applied to the weight of an edge entering a restrictive signal.
pub const RESTRICTIVE_FACTOR: u32 = 10;

/// The base weight of a diagonal lane-change connector.
pub const CONNECTOR_WEIGHT: u32 = 3 * BASE_WEIGHT;

/// Options controlling how the graph is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct GraphOptions {
    /// Whether to add diagonal lane-change connectors from each road cell to
    /// the two cells diagonally ahead of it.
    pub lane_change_connectors: bool,
}

/// The kind of cell a node represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Road,
    Signal,
    Destination,
}

/// The kind of move an edge represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    /// A single step in a cardinal direction.
    Straight,
    /// A diagonal lane change while travelling in the `forward` direction.
    Connector { forward: Direction },
}

/// A directed edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// The cell the edge leads to.
    to: Cell,
    /// The weight of the edge when its target is not a restrictive signal.
    base: u32,
    /// The current weight.
    weight: u32,
    kind: EdgeKind,
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    /// Outgoing edges, in construction order.
    edges_out: SmallVec<[Edge; 4]>,
    /// The cells with an edge into this node.
    edges_in: SmallVec<[Cell; 4]>,
}

/// A directed, weighted graph over the road, signal and destination cells of
/// the city.
///
/// The node set and edge set are fixed when the graph is built. Only edge
/// weights change afterwards, when a signal changes phase.
#[derive(Clone, Debug)]
pub struct CityGraph {
    width: u32,
    height: u32,
    nodes: Vec<Option<Node>>,
    edge_count: usize,
}

impl Edge {
    /// The cell the edge leads to.
    pub fn to(&self) -> Cell {
        self.to
    }

    /// The weight of the edge when its target is not a restrictive signal.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// The current weight.
    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    /// The weight of the edge given the phase of the signal at its target, if any.
    fn weight_for(base: u32, target: Option<SignalPhase>) -> u32 {
        match target {
            Some(SignalPhase::Restrictive) => base * RESTRICTIVE_FACTOR,
            _ => base,
        }
    }
}

impl CityGraph {
    /// Builds the graph from the stationary contents of the spatial index.
    ///
    /// Road and signal edges follow the permitted travel directions. Edges into
    /// a destination are the exception: every road cell orthogonally adjacent
    /// to a destination gets an edge into it, whichever way the road points.
    ///
    /// Edges to cells that are out of bounds or not routable are skipped.
    pub fn build(index: &SpatialIndex, signals: &SignalSet, options: &GraphOptions) -> Self {
        let (width, height) = (index.width(), index.height());
        let mut graph = Self {
            width,
            height,
            nodes: vec![None; width as usize * height as usize],
            edge_count: 0,
        };
        let cells = (0..height as i32)
            .flat_map(|y| (0..width as i32).map(move |x| Cell::new(x, y)))
            .collect::<Vec<_>>();

        for &cell in &cells {
            let kind = if index.is_destination(cell) {
                NodeKind::Destination
            } else if index.is_signal(cell) {
                NodeKind::Signal
            } else if index.is_road(cell) {
                NodeKind::Road
            } else {
                continue;
            };
            if let Some(idx) = graph.slot(cell) {
                graph.nodes[idx] = Some(Node {
                    kind,
                    edges_out: SmallVec::new(),
                    edges_in: SmallVec::new(),
                });
            }
        }

        let phase_at = |cell: Cell| {
            index
                .signal_at(cell)
                .and_then(|id| signals.get(id))
                .map(|signal| signal.phase())
        };

        // Roads
        for &cell in &cells {
            if graph.node_kind(cell) != Some(NodeKind::Road) {
                continue;
            }
            let dirs = index.road_directions(cell).cloned().unwrap_or_default();
            for dir in dirs {
                let next = cell.step(dir);
                if !index.is_routable(next) {
                    continue;
                }
                graph.add_edge(cell, next, BASE_WEIGHT, EdgeKind::Straight, phase_at(next));
                if options.lane_change_connectors {
                    for lateral in dir.perpendicular() {
                        let diag = next.step(lateral);
                        if index.is_routable(diag) && !index.is_signal(diag) {
                            let kind = EdgeKind::Connector { forward: dir };
                            graph.add_edge(cell, diag, CONNECTOR_WEIGHT, kind, None);
                        }
                    }
                }
            }
        }

        // Signals pass traffic through in the direction of the roads feeding them
        for (cell, dirs) in signal_flows(index, &cells) {
            for dir in dirs {
                let next = cell.step(dir);
                if index.is_routable(next) {
                    graph.add_edge(cell, next, BASE_WEIGHT, EdgeKind::Straight, phase_at(next));
                }
            }
        }

        // Destinations can be entered from any adjacent road
        for &cell in &cells {
            if graph.node_kind(cell) != Some(NodeKind::Destination) {
                continue;
            }
            for (_, prev) in cell.neighbours() {
                if index.is_road(prev) {
                    graph.add_edge(prev, cell, BASE_WEIGHT, EdgeKind::Straight, None);
                }
            }
        }

        log::info!(
            "built city graph with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    /// Whether the cell is a node of the graph.
    pub fn contains(&self, cell: Cell) -> bool {
        self.node(cell).is_some()
    }

    /// The kind of node at a cell, if the cell is a node.
    pub fn node_kind(&self, cell: Cell) -> Option<NodeKind> {
        self.node(cell).map(|node| node.kind)
    }

    /// The outgoing edges of a node. Empty if the cell is not a node.
    pub fn edges_from(&self, cell: Cell) -> &[Edge] {
        self.node(cell)
            .map(|node| node.edges_out.as_slice())
            .unwrap_or(&[])
    }

    /// The cells with an edge into a node.
    pub fn edges_into(&self, cell: Cell) -> &[Cell] {
        self.node(cell)
            .map(|node| node.edges_in.as_slice())
            .unwrap_or(&[])
    }

    /// Gets the edge between two cells, if there is one.
    pub fn edge(&self, from: Cell, to: Cell) -> Option<&Edge> {
        self.edges_from(from).iter().find(|edge| edge.to == to)
    }

    /// Gets the current weight of the edge between two cells.
    pub fn weight(&self, from: Cell, to: Cell) -> Option<u32> {
        self.edge(from, to).map(|edge| edge.weight)
    }

    /// The successors of a node and the weights of the edges to them.
    pub fn successors(&self, cell: Cell) -> impl Iterator<Item = (Cell, u32)> + '_ {
        self.edges_from(cell).iter().map(|edge| (edge.to, edge.weight))
    }

    /// Iterates over every edge as `(from, edge)`.
    pub fn edges(&self) -> impl Iterator<Item = (Cell, &Edge)> + '_ {
        self.nodes.iter().enumerate().flat_map(move |(idx, node)| {
            let from = self.cell_of(idx);
            node.iter().flat_map(move |n| n.edges_out.iter().map(move |e| (from, e)))
        })
    }

    /// The number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// The number of edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// The total weight of travelling from `start` along `path`,
    /// or `None` if some step is not an edge.
    pub fn path_cost(&self, start: Cell, path: &[Cell]) -> Option<u32> {
        let mut cost = 0;
        let mut prev = start;
        for &cell in path {
            cost += self.weight(prev, cell)?;
            prev = cell;
        }
        Some(cost)
    }

    /// Recomputes the weight of every edge entering the signal at `cell`.
    /// Returns the number of edges updated.
    pub fn reweight_signal(&mut self, cell: Cell, phase: SignalPhase) -> usize {
        let sources = self.edges_into(cell).to_vec();
        let mut count = 0;
        for from in sources {
            let Some(idx) = self.slot(from) else { continue };
            let Some(node) = self.nodes[idx].as_mut() else { continue };
            for edge in node.edges_out.iter_mut().filter(|edge| edge.to == cell) {
                edge.weight = Edge::weight_for(edge.base, Some(phase));
                count += 1;
            }
        }
        count
    }

    /// Adds an edge unless one between the same cells already exists.
    fn add_edge(
        &mut self,
        from: Cell,
        to: Cell,
        base: u32,
        kind: EdgeKind,
        target: Option<SignalPhase>,
    ) {
        if self.edge(from, to).is_some() {
            return;
        }
        let (Some(from_idx), Some(to_idx)) = (self.slot(from), self.slot(to)) else {
            return;
        };
        let (Some(_), Some(_)) = (&self.nodes[from_idx], &self.nodes[to_idx]) else {
            return;
        };
        let edge = Edge {
            to,
            base,
            weight: Edge::weight_for(base, target),
            kind,
        };
        if let Some(node) = self.nodes[from_idx].as_mut() {
            node.edges_out.push(edge);
        }
        if let Some(node) = self.nodes[to_idx].as_mut() {
            node.edges_in.push(from);
        }
        self.edge_count += 1;
    }

    fn node(&self, cell: Cell) -> Option<&Node> {
        self.slot(cell).and_then(|idx| self.nodes[idx].as_ref())
    }

    fn slot(&self, cell: Cell) -> Option<usize> {
        let in_bounds = cell.x >= 0
            && cell.y >= 0
            && (cell.x as u32) < self.width
            && (cell.y as u32) < self.height;
        in_bounds.then(|| cell.y as usize * self.width as usize + cell.x as usize)
    }

    fn cell_of(&self, idx: usize) -> Cell {
        let width = self.width as usize;
        Cell::new((idx % width) as i32, (idx / width) as i32)
    }
}

/// Determines the directions in which each signal passes traffic through.
///
/// A signal takes the direction of every road flowing into it. Signals fed by
/// other signals (crossings several cells deep) take their upstream signal's
/// directions.
fn signal_flows(index: &SpatialIndex, cells: &[Cell]) -> BTreeMap<Cell, SmallVec<[Direction; 2]>> {
    let mut flows = BTreeMap::<Cell, SmallVec<[Direction; 2]>>::new();
    for &cell in cells.iter().filter(|c| index.is_signal(**c)) {
        let dirs = flows.entry(cell).or_default();
        for (dir, prev) in cell.neighbours() {
            let inflow = dir.reverse();
            let feeds = index
                .road_directions(prev)
                .map_or(false, |road| road.contains(&inflow));
            if feeds && !dirs.contains(&inflow) {
                dirs.push(inflow);
            }
        }
    }

    loop {
        let mut changed = false;
        let snapshot = flows.clone();
        for (cell, dirs) in &snapshot {
            for &dir in dirs {
                if let Some(next) = flows.get_mut(&cell.step(dir)) {
                    if !next.contains(&dir) {
                        next.push(dir);
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
    flows
}
