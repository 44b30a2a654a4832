//! Topological sort using depth-first search (DFS)
//!
//! ## Algorithm
//!
//! Uses DFS with three-color marking to detect cycles and produce ordering:
//!
//! 1. **WHITE** (unvisited): node hasn't been processed
//! 2. **GRAY** (on the current path): node is in the recursion stack
//! 3. **BLACK** (visited): node and all its dependencies are ordered
//!
//! Reaching a GRAY node means the current path loops back on itself; the
//! path from that node onwards is reported as the cycle.
//!
//! ```text
//! ex/a@1 -> ex/b@1 -> ex/c@1        order: [ex/c@1, ex/b@1, ex/a@1]
//! ex/a@1 -> ex/b@1 -> ex/a@1        error: ex/a@1 -> ex/b@1 -> ex/a@1
//! ```

use super::graph::{DependencyGraph, NodeId};
use crate::error::{GraphpackError, Result};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Context for topological sort operations
struct TopoSortContext<'a> {
    graph: &'a DependencyGraph,
    colors: Vec<Color>,
    /// Current DFS path, used to name a cycle
    path: Vec<NodeId>,
    /// Nodes in dependency order
    result: Vec<NodeId>,
}

/// Order every node reachable from `roots`, dependencies first.
///
/// Roots are visited in the given order and each node's dependencies in
/// declared order, so the result is deterministic.
///
/// # Errors
///
/// Returns [`GraphpackError::CyclicDependency`] naming the cycle.
pub fn topological_sort(graph: &DependencyGraph, roots: &[NodeId]) -> Result<Vec<NodeId>> {
    let mut ctx = TopoSortContext {
        graph,
        colors: vec![Color::White; graph.len()],
        path: Vec::new(),
        result: Vec::with_capacity(graph.len()),
    };

    for &root in roots {
        if ctx.colors[root] == Color::White {
            topo_dfs(&mut ctx, root)?;
        }
    }

    Ok(ctx.result)
}

fn topo_dfs(ctx: &mut TopoSortContext, node: NodeId) -> Result<()> {
    match ctx.colors[node] {
        Color::Black => return Ok(()),
        Color::Gray => return Err(cycle_error(ctx, node)),
        Color::White => {}
    }

    ctx.colors[node] = Color::Gray;
    ctx.path.push(node);

    for &dep in ctx.graph.dependencies(node) {
        topo_dfs(ctx, dep)?;
    }

    ctx.path.pop();
    ctx.colors[node] = Color::Black;
    // Post-order: dependencies are already in the result
    ctx.result.push(node);
    Ok(())
}

fn cycle_error(ctx: &TopoSortContext, node: NodeId) -> GraphpackError {
    let start = ctx.path.iter().position(|&n| n == node).unwrap_or(0);
    let mut chain: Vec<String> = ctx.path[start..]
        .iter()
        .map(|&n| ctx.graph.key(n).to_string())
        .collect();
    chain.push(ctx.graph.key(node).to_string());
    GraphpackError::CyclicDependency {
        chain: chain.join(" -> "),
    }
}
