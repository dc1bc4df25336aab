//! Node splitting for irreducible graphs.
//!
//! The graph is reduced with the classic T1/T2 transformations over regions:
//! a region with a single predecessor region is absorbed into it, self loops
//! are ignored. Every region built this way has a single entry, its header.
//! When no region can be absorbed and more than one is left, the graph is
//! irreducible; the smallest stuck region is then cloned once per extra
//! predecessor region, after which each copy has a single predecessor and the
//! reduction continues. Each clone round removes one region in net, so the
//! loop terminates; the number of cloned blocks is bounded by the caller.

use std::collections::HashMap;

use crate::{
    structure::graph::{StructBlock, StructGraph},
    utils::graph::{algorithms, NodeId, Predecessors, RootedGraph},
    Error, Result,
};

struct Regions {
    region_of: Vec<Option<usize>>,
    members: Vec<Vec<NodeId>>,
    header: Vec<NodeId>,
    alive: Vec<bool>,
}

impl Regions {
    fn new(graph: &StructGraph) -> Self {
        let reachable = algorithms::reachable(graph, graph.entry());
        let mut regions = Regions {
            region_of: vec![None; reachable.len()],
            members: Vec::new(),
            header: Vec::new(),
            alive: Vec::new(),
        };
        for (index, _) in reachable.iter().enumerate().filter(|(_, r)| **r) {
            regions.add(vec![NodeId::new(index)]);
        }
        regions
    }

    fn add(&mut self, members: Vec<NodeId>) -> usize {
        let region = self.members.len();
        for node in &members {
            if node.index() >= self.region_of.len() {
                self.region_of.resize(node.index() + 1, None);
            }
            self.region_of[node.index()] = Some(region);
        }
        self.header.push(members[0]);
        self.members.push(members);
        self.alive.push(true);
        region
    }

    fn live_count(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    /// Distinct regions holding an edge into the header of `region`, in
    /// predecessor order.
    fn predecessor_regions(&self, graph: &StructGraph, region: usize) -> Vec<usize> {
        let mut preds = Vec::new();
        for pred in graph.predecessors(self.header[region]) {
            if let Some(r) = self.region_of.get(pred.index()).copied().flatten() {
                if r != region && !preds.contains(&r) {
                    preds.push(r);
                }
            }
        }
        preds
    }

    fn absorb(&mut self, into: usize, region: usize) {
        let members = std::mem::take(&mut self.members[region]);
        for node in &members {
            self.region_of[node.index()] = Some(into);
        }
        self.members[into].extend(members);
        self.alive[region] = false;
    }
}

/// Splits nodes until `graph` is reducible.
///
/// Returns the number of blocks cloned. `method` names the method in the
/// error raised when more than `max_splits` blocks would be cloned.
pub(crate) fn make_reducible(graph: &mut StructGraph, max_splits: usize, method: &str) -> Result<usize> {
    let mut regions = Regions::new(graph);
    let Some(entry_region) = regions.region_of[graph.entry().index()] else {
        return Ok(0);
    };
    let mut splits = 0;

    loop {
        let mut changed = false;
        for region in 0..regions.members.len() {
            if !regions.alive[region] || region == entry_region {
                continue;
            }
            if let [single] = regions.predecessor_regions(graph, region)[..] {
                regions.absorb(single, region);
                changed = true;
            }
        }
        if changed {
            continue;
        }
        if regions.live_count() <= 1 {
            return Ok(splits);
        }

        let Some(stuck) = (0..regions.members.len())
            .filter(|&r| regions.alive[r] && r != entry_region)
            .min_by_key(|&r| (regions.members[r].len(), regions.header[r]))
        else {
            return Ok(splits);
        };
        let preds = regions.predecessor_regions(graph, stuck);
        if preds.len() < 2 {
            return Err(consistency_error!(
                "irreducible region at {} has {} predecessor regions",
                regions.header[stuck],
                preds.len()
            ));
        }

        for &pred in &preds[1..] {
            splits += regions.members[stuck].len();
            if splits > max_splits {
                return Err(Error::UnsupportedConstruct {
                    method: method.to_string(),
                    message: format!(
                        "irreducible control flow needs more than {max_splits} node splits"
                    ),
                });
            }
            let copy = clone_region(graph, &regions.members[stuck], &regions.members[pred]);
            log::debug!(
                "{method}: split region at {} for predecessor region at {}",
                regions.header[stuck],
                regions.header[pred]
            );
            regions.add(copy);
        }
        graph.rebuild_predecessors();
    }
}

/// Clones `members` (header first) and redirects the edges of `from` that
/// enter the header to the clone. Returns the clone ids, header first.
fn clone_region(graph: &mut StructGraph, members: &[NodeId], from: &[NodeId]) -> Vec<NodeId> {
    let mut map = HashMap::with_capacity(members.len());
    for &node in members {
        let block = graph.block(node);
        let copy = StructBlock {
            instructions: block
                .instructions
                .iter()
                .map(|instr| instr.transform(Clone::clone, Clone::clone))
                .collect(),
            terminator: block.terminator.clone(),
        };
        map.insert(node, graph.push(copy));
    }
    for &node in members {
        let retargeted = graph
            .block(node)
            .terminator
            .retarget(|t| map.get(&t).copied().unwrap_or(t));
        graph.set_terminator(map[&node], retargeted);
    }

    let header = members[0];
    let header_copy = map[&header];
    for &node in from {
        let retargeted = graph
            .block(node)
            .terminator
            .retarget(|t| if t == header { header_copy } else { t });
        graph.set_terminator(node, retargeted);
    }

    members.iter().map(|node| map[node]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::Value,
        structure::graph::Terminator,
        utils::graph::{algorithms::compute_dominators, GraphBase, Successors},
    };

    fn block(terminator: Terminator) -> StructBlock {
        StructBlock {
            instructions: Vec::new(),
            terminator,
        }
    }

    fn n(i: usize) -> NodeId {
        NodeId::new(i)
    }

    fn branch(taken: usize, fallthrough: usize) -> Terminator {
        Terminator::Branch {
            condition: Value::bool(true),
            taken: n(taken),
            fallthrough: n(fallthrough),
        }
    }

    /// 0 -> {1, 2}, 1 <-> 2, 2 -> 3: a loop with two entries.
    fn two_entry_loop() -> StructGraph {
        StructGraph::from_blocks(
            vec![
                block(branch(1, 2)),
                block(Terminator::Goto(n(2))),
                block(branch(1, 3)),
                block(Terminator::Return(None)),
            ],
            n(0),
        )
    }

    fn is_reducible(graph: &StructGraph) -> bool {
        let rpo = algorithms::rpo_numbering(graph, graph.entry());
        let dom = compute_dominators(graph, graph.entry());
        (0..rpo.len()).filter(|&i| rpo[i].is_some()).all(|from| {
            graph
                .successors(n(from))
                .filter(|to| rpo[to.index()] <= rpo[from])
                .all(|to| dom.dominates(to, n(from)))
        })
    }

    #[test]
    fn test_reducible_graph_untouched() -> Result<()> {
        let mut graph = StructGraph::from_blocks(
            vec![
                block(Terminator::Goto(n(1))),
                block(branch(1, 2)),
                block(Terminator::Return(None)),
            ],
            n(0),
        );
        assert_eq!(make_reducible(&mut graph, 8, "m")?, 0);
        assert_eq!(graph.node_count(), 3);
        Ok(())
    }

    #[test]
    fn test_two_entry_loop_split() -> Result<()> {
        let mut graph = two_entry_loop();
        assert!(!is_reducible(&graph));
        let splits = make_reducible(&mut graph, 8, "m")?;
        assert_eq!(splits, 1);
        assert_eq!(graph.node_count(), 5);
        assert!(is_reducible(&graph));
        Ok(())
    }

    #[test]
    fn test_split_budget() {
        let mut graph = two_entry_loop();
        assert!(matches!(
            make_reducible(&mut graph, 0, "m"),
            Err(Error::UnsupportedConstruct { .. })
        ));
    }
}
