use crate::error::RouteError;
use crate::graph::CityGraph;
use crate::Cell;
use cgmath::MetricSpace;

/// Finds a minimum-weight route through the graph.
///
/// The returned route excludes `src` and ends with `dst`; it is empty when the
/// two cells coincide. The search is A* with the straight-line distance between
/// cells as its heuristic, rounded down so that it never overestimates: every
/// edge costs at least the distance it covers. For a fixed graph the result is
/// deterministic, as successors are expanded in edge construction order.
pub fn find_path(graph: &CityGraph, src: Cell, dst: Cell) -> Result<Vec<Cell>, RouteError> {
    if !graph.contains(src) || !graph.contains(dst) {
        return Err(RouteError::NoPathFound { from: src, to: dst });
    }
    if src == dst {
        return Ok(vec![]);
    }

    let goal = dst.to_point();
    let result = pathfinding::directed::astar::astar(
        &src,
        |cell| graph.successors(*cell),
        |cell| cell.to_point().distance(goal).floor() as u32,
        |cell| *cell == dst,
    );

    match result {
        Some((mut route, _)) => {
            route.remove(0);
            Ok(route)
        }
        None => Err(RouteError::NoPathFound { from: src, to: dst }),
    }
}
