//! Parent/child hierarchy rebuilt from one enumeration pass.

use crate::model::ProcessRecord;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Nesting deeper than this is cut off during `walk`.
pub const MAX_TREE_DEPTH: usize = 64;

/// Process hierarchy keyed by pid.
///
/// Children are kept in pid order. A process is a root when its ppid is 0
/// or 1, or when its parent is not part of the enumeration. Children of
/// pid 1 are both roots and children of 1; `walk` emits each pid once.
#[derive(Debug, Clone, Default)]
pub struct ProcessTree {
    pids: BTreeSet<u32>,
    children: HashMap<u32, BTreeSet<u32>>,
    roots: BTreeSet<u32>,
}

impl ProcessTree {
    pub fn build(processes: &[ProcessRecord]) -> Self {
        let present: HashSet<u32> = processes.iter().map(|p| p.pid).collect();
        let mut tree = Self::default();

        for proc in processes {
            tree.pids.insert(proc.pid);
            let parent_present = present.contains(&proc.ppid) && proc.ppid != proc.pid;
            if parent_present {
                tree.children.entry(proc.ppid).or_default().insert(proc.pid);
            }
            if proc.ppid <= 1 || !parent_present {
                tree.roots.insert(proc.pid);
            }
        }

        tree
    }

    pub fn roots(&self) -> impl Iterator<Item = u32> + '_ {
        self.roots.iter().copied()
    }

    /// Direct children of `pid`, in pid order.
    pub fn children_of(&self, pid: u32) -> Vec<u32> {
        self.children
            .get(&pid)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Depth-first pre-order traversal from every root, as `(depth, pid)`.
    ///
    /// Each pid is emitted at most once, and nothing deeper than
    /// `MAX_TREE_DEPTH` is visited, so a corrupt parent chain cannot loop.
    /// Pids no root leads to (a ppid cycle) are walked afterwards, each
    /// smallest unvisited pid starting a new tree at depth 0.
    pub fn walk(&self) -> Vec<(usize, u32)> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let reachable = self.reachable_from_roots();
        let detached = self.pids.iter().filter(|pid| !reachable.contains(*pid));

        for root in self.roots.iter().chain(detached) {
            let mut stack = vec![(0usize, *root)];
            while let Some((depth, pid)) = stack.pop() {
                if depth > MAX_TREE_DEPTH || !visited.insert(pid) {
                    continue;
                }
                out.push((depth, pid));
                if let Some(children) = self.children.get(&pid) {
                    // Reverse so the smallest pid is popped first.
                    for child in children.iter().rev() {
                        stack.push((depth + 1, *child));
                    }
                }
            }
        }

        out
    }

    /// Every pid below some root, ignoring the depth cap.
    fn reachable_from_roots(&self) -> HashSet<u32> {
        let mut reached: HashSet<u32> = self.roots.iter().copied().collect();
        let mut stack: Vec<u32> = self.roots.iter().copied().collect();
        while let Some(pid) = stack.pop() {
            for child in self.children.get(&pid).into_iter().flatten() {
                if reached.insert(*child) {
                    stack.push(*child);
                }
            }
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(pid: u32, ppid: u32) -> ProcessRecord {
        ProcessRecord {
            pid,
            ppid,
            name: format!("p{}", pid),
            ..Default::default()
        }
    }

    #[test]
    fn test_children_of() {
        let procs = vec![proc(1, 0), proc(10, 1), proc(11, 10), proc(12, 10), proc(5, 10)];
        let tree = ProcessTree::build(&procs);

        assert_eq!(tree.children_of(10), vec![5, 11, 12]);
        assert_eq!(tree.children_of(1), vec![10]);
        assert!(tree.children_of(11).is_empty());
        assert!(tree.children_of(999).is_empty());
    }

    #[test]
    fn test_walk_nests_under_init() {
        let procs = vec![proc(1, 0), proc(2, 0), proc(10, 1), proc(11, 10), proc(20, 2)];
        let tree = ProcessTree::build(&procs);

        assert_eq!(
            tree.walk(),
            vec![(0, 1), (1, 10), (2, 11), (0, 2), (1, 20)]
        );
    }

    #[test]
    fn test_orphan_becomes_root() {
        let procs = vec![proc(1, 0), proc(300, 9999), proc(301, 300)];
        let tree = ProcessTree::build(&procs);

        let roots: Vec<u32> = tree.roots().collect();
        assert_eq!(roots, vec![1, 300]);
        assert_eq!(tree.walk(), vec![(0, 1), (0, 300), (1, 301)]);
    }

    #[test]
    fn test_without_init_ppid_one_are_roots() {
        // Containers often have no pid 1 in view.
        let procs = vec![proc(7, 1), proc(8, 1), proc(9, 7)];
        let tree = ProcessTree::build(&procs);
        assert_eq!(tree.walk(), vec![(0, 7), (1, 9), (0, 8)]);
    }

    #[test]
    fn test_cycle_is_walked_once_after_roots() {
        let procs = vec![proc(1, 0), proc(50, 51), proc(51, 50), proc(52, 1)];
        let tree = ProcessTree::build(&procs);

        let walked = tree.walk();
        assert_eq!(walked, vec![(0, 1), (1, 52), (0, 50), (1, 51)]);
        assert_eq!(tree.children_of(50), vec![51]);
        assert_eq!(tree.roots().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_cycle_with_subtree_keeps_every_pid() {
        // 60 <-> 61 with 62 hanging off 61; none of them reach a root.
        let procs = vec![proc(1, 0), proc(60, 61), proc(61, 60), proc(62, 61)];
        let tree = ProcessTree::build(&procs);

        let walked = tree.walk();
        assert_eq!(walked, vec![(0, 1), (0, 60), (1, 61), (2, 62)]);
    }

    #[test]
    fn test_self_parent_is_root() {
        let procs = vec![proc(5, 5)];
        let tree = ProcessTree::build(&procs);
        assert_eq!(tree.walk(), vec![(0, 5)]);
    }

    #[test]
    fn test_depth_cap() {
        let mut procs = vec![proc(2, 0)];
        for pid in 3..(MAX_TREE_DEPTH as u32 + 10) {
            procs.push(proc(pid, pid - 1));
        }
        let tree = ProcessTree::build(&procs);
        let walked = tree.walk();

        assert_eq!(walked.len(), MAX_TREE_DEPTH + 1);
        assert_eq!(walked.last().map(|(d, _)| *d), Some(MAX_TREE_DEPTH));
    }
}
