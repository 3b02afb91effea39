use crate::cfg::{ControlFlowGraph, NodeId};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

/// Strongly connected components of a control-flow graph, in the order the
/// use-def driver consumes them.
///
/// Components come out in topological order (every edge between two groups
/// points forward) and the nodes of each component are sorted by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SccOrder {
    groups: Vec<Vec<NodeId>>,
}

impl SccOrder {
    pub fn new(cfg: &ControlFlowGraph) -> Self {
        let mut graph: DiGraph<NodeId, ()> = DiGraph::with_capacity(cfg.count(), 0);
        for node in cfg.nodes() {
            graph.add_node(node.id());
        }
        for node in cfg.nodes() {
            for succ in node.successors() {
                graph.add_edge(NodeIndex::new(node.id().0), NodeIndex::new(succ.0), ());
            }
        }

        // tarjan_scc yields components in reverse topological order
        let mut groups: Vec<Vec<NodeId>> = tarjan_scc(&graph)
            .into_iter()
            .map(|scc| {
                let mut group: Vec<NodeId> = scc.into_iter().map(|idx| graph[idx]).collect();
                group.sort();
                group
            })
            .collect();
        groups.reverse();

        Self { groups }
    }

    pub fn groups(&self) -> &[Vec<NodeId>] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<Vec<NodeId>> {
        self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{Assembly, Instruction, Opcode};
    use pretty_assertions::assert_eq;

    fn graph(nodes: usize, edges: &[(usize, usize)]) -> ControlFlowGraph {
        let mut cfg = ControlFlowGraph::new();
        for n in 0..nodes {
            cfg.add_node(vec![Instruction::new(n as u64 * 4, Assembly::new(Opcode::Nop))]);
        }
        for (from, to) in edges {
            cfg.add_edge(NodeId(*from), NodeId(*to)).unwrap();
        }
        cfg
    }

    fn ids(group: &[usize]) -> Vec<NodeId> {
        group.iter().map(|n| NodeId(*n)).collect()
    }

    #[test]
    fn test_straight_line() {
        let cfg = graph(3, &[(0, 1), (1, 2)]);
        let order = SccOrder::new(&cfg);

        assert_eq!(order.groups(), &[ids(&[0]), ids(&[1]), ids(&[2])]);
    }

    #[test]
    fn test_loop_is_one_group() {
        // 0 -> 1 -> 2 -> 1, 2 -> 3
        let cfg = graph(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        let order = SccOrder::new(&cfg);

        assert_eq!(order.into_groups(), vec![ids(&[0]), ids(&[1, 2]), ids(&[3])]);
    }

    #[test]
    fn test_diamond_respects_edges() {
        let cfg = graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let order = SccOrder::new(&cfg);
        let position = |n: usize| {
            order
                .groups()
                .iter()
                .position(|g| g.contains(&NodeId(n)))
                .unwrap()
        };

        assert_eq!(order.len(), 4);
        assert_eq!(position(0), 0);
        assert_eq!(position(3), 3);
    }

    #[test]
    fn test_empty_graph() {
        assert!(SccOrder::new(&ControlFlowGraph::new()).is_empty());
    }
}
