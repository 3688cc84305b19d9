use std::collections::{BTreeMap, BTreeSet, HashMap};

use chainedgraphs_graph::{Chain, ChainLinkTable, Graph, GraphId, NodeRef, check_registered};
use tracing::debug;

use crate::error::ResolveError;
use crate::plan::ExecutionPlan;

/// Resolver turns a chain of graphs into an execution plan.
pub trait Resolver: Send + Sync {
  /// Resolve a chain into a plan.
  ///
  /// This process:
  /// 1. Re-validates every link against the chain's graphs
  /// 2. Merges intra-graph edges and links into one dependency graph
  /// 3. Assigns each node to the earliest level its dependencies allow
  ///
  /// No partial plan is returned on failure.
  fn resolve(&self, chain: &Chain) -> Result<ExecutionPlan, ResolveError>;
}

/// Level-by-level topological resolver.
///
/// Plans are deterministic: identical input yields identical levels with
/// identical ordering inside each level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelResolver;

impl LevelResolver {
  pub fn new() -> Self {
    Self
  }

  /// Resolve graphs and links held separately.
  pub fn resolve_parts(
    &self,
    graphs: &BTreeMap<GraphId, Graph>,
    links: &ChainLinkTable,
  ) -> Result<ExecutionPlan, ResolveError> {
    for link in links.iter() {
      check_registered(graphs, &link.source)?;
      check_registered(graphs, &link.target)?;
    }

    let merged = MergedGraph::build(graphs, links);
    let levels = merged.levels().map_err(|path| {
      debug!(cycle_len = path.len(), "chain_cycle_detected");
      ResolveError::Cycle { path }
    })?;

    debug!(
      graphs = graphs.len(),
      links = links.len(),
      nodes = merged.vertices.len(),
      levels = levels.len(),
      "chain_resolved"
    );

    let dependencies = merged
      .vertices
      .iter()
      .zip(&merged.predecessors)
      .map(|(node, preds)| {
        let deps = preds.iter().map(|&p| merged.vertices[p].clone()).collect();
        (node.clone(), deps)
      })
      .collect();

    Ok(ExecutionPlan::new(levels, dependencies))
  }
}

impl Resolver for LevelResolver {
  fn resolve(&self, chain: &Chain) -> Result<ExecutionPlan, ResolveError> {
    self.resolve_parts(chain.graphs(), chain.links())
  }
}

/// Combined dependency graph over (graph, node) vertices.
///
/// Vertices are indexed in ascending (graph, node) order, so sorting indices
/// is the same as sorting node references.
struct MergedGraph {
  vertices: Vec<NodeRef>,
  predecessors: Vec<BTreeSet<usize>>,
  successors: Vec<Vec<usize>>,
}

impl MergedGraph {
  fn build(graphs: &BTreeMap<GraphId, Graph>, links: &ChainLinkTable) -> Self {
    // Vertices take the graph id from the map key, the same key links are
    // validated against.
    let mut vertices: Vec<NodeRef> = graphs
      .iter()
      .flat_map(|(graph_id, graph)| {
        graph
          .nodes()
          .map(move |node| NodeRef::new(graph_id.clone(), node.clone()))
      })
      .collect();
    vertices.sort();

    let index: HashMap<&NodeRef, usize> = vertices.iter().enumerate().map(|(i, v)| (v, i)).collect();

    let mut predecessors = vec![BTreeSet::new(); vertices.len()];
    for (graph_id, graph) in graphs {
      for (from, to) in graph.edges() {
        let from = index[&NodeRef::new(graph_id.clone(), from.clone())];
        let to = index[&NodeRef::new(graph_id.clone(), to.clone())];
        predecessors[to].insert(from);
      }
    }
    for link in links.iter() {
      predecessors[index[&link.target]].insert(index[&link.source]);
    }

    let mut successors = vec![Vec::new(); vertices.len()];
    for (to, preds) in predecessors.iter().enumerate() {
      for &from in preds {
        successors[from].push(to);
      }
    }

    Self {
      vertices,
      predecessors,
      successors,
    }
  }

  /// Kahn's algorithm, one level at a time.
  ///
  /// On failure returns a cycle among the vertices that could not be placed.
  fn levels(&self) -> Result<Vec<Vec<NodeRef>>, Vec<NodeRef>> {
    let mut in_degree: Vec<usize> = self.predecessors.iter().map(BTreeSet::len).collect();
    let mut placed = vec![false; self.vertices.len()];
    let mut levels = Vec::new();

    let mut current: Vec<usize> = (0..self.vertices.len())
      .filter(|&v| in_degree[v] == 0)
      .collect();

    while !current.is_empty() {
      let mut next = Vec::new();
      for &v in &current {
        placed[v] = true;
        for &s in &self.successors[v] {
          in_degree[s] -= 1;
          if in_degree[s] == 0 {
            next.push(s);
          }
        }
      }
      levels.push(current.iter().map(|&v| self.vertices[v].clone()).collect());
      next.sort_unstable();
      current = next;
    }

    match placed.iter().position(|&p| !p) {
      None => Ok(levels),
      Some(start) => Err(self.cycle_from(start, &placed)),
    }
  }

  /// Follow unplaced predecessors from `start` until a vertex repeats.
  ///
  /// Every unplaced vertex has at least one unplaced predecessor, so the walk
  /// always closes. The cycle is returned in dependency order, rotated to
  /// begin at its smallest vertex, with that vertex repeated at the end.
  fn cycle_from(&self, start: usize, placed: &[bool]) -> Vec<NodeRef> {
    let mut walk: Vec<usize> = Vec::new();
    let mut position: HashMap<usize, usize> = HashMap::new();
    let mut v = start;

    let cycle_start = loop {
      if let Some(&pos) = position.get(&v) {
        break pos;
      }
      position.insert(v, walk.len());
      walk.push(v);
      v = match self.predecessors[v].iter().find(|&&p| !placed[p]) {
        Some(&p) => p,
        None => break walk.len() - 1,
      };
    };

    let mut cycle: Vec<usize> = walk[cycle_start..].iter().rev().copied().collect();
    if let Some(min_pos) = cycle
      .iter()
      .enumerate()
      .min_by_key(|&(_, v)| *v)
      .map(|(i, _)| i)
    {
      cycle.rotate_left(min_pos);
    }
    if let Some(&first) = cycle.first() {
      cycle.push(first);
    }

    cycle.into_iter().map(|v| self.vertices[v].clone()).collect()
  }
}
