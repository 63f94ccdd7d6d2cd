//! Canonical topological ordering of identified nodes with user-declared
//! precedence edges.
//!
//! The sorter is the building block [`crate::event::Event`] uses to turn
//! phase-ordering edges into a deterministic dispatch order. It is exposed
//! publicly so callers can reuse it outside of an [`crate::event::Event`],
//! mirroring the source's `NodeSorting.sort` helper.

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

/// A node that can be reordered by [`sort_nodes`].
///
/// Implementors carry their own identity and their precedence relations to
/// other nodes of the same sort call. The `visited` flag is transient sort
/// bookkeeping, not user state; implementations typically back it with a
/// [`Cell<bool>`] so the DFS passes can mutate it through a shared reference.
pub trait SortableNode: Sized {
    /// Stable identity used for comparator tie-breaking and warning output.
    type Id: Clone + Ord + std::hash::Hash + std::fmt::Debug;

    /// This node's identifier.
    fn id(&self) -> &Self::Id;

    /// Identifiers of nodes that must run before this one.
    fn preceding(&self) -> &BTreeSet<Self::Id>;

    /// Identifiers of nodes that must run after this one.
    fn following(&self) -> &BTreeSet<Self::Id>;

    /// Transient DFS visitation flag, cleared before each sort pass.
    fn visited(&self) -> &Cell<bool>;
}

static SUPPRESS_CYCLE_WARNINGS: AtomicBool = AtomicBool::new(false);

/// Test-only switch silencing the cycle warning normally emitted by
/// [`sort_nodes`]. Intended for single-threaded test harnesses that
/// deliberately exercise cyclic input and don't want the warning in their
/// captured output.
pub fn suppress_cycle_warnings(suppress: bool) {
    SUPPRESS_CYCLE_WARNINGS.store(suppress, AtomicOrdering::Relaxed);
}

/// Reorders `nodes` in place into a canonical topological order and reports
/// whether the input was acyclic.
///
/// `description` labels the node collection in the emitted cycle warning
/// (e.g. an event's debug name); `comparator` breaks ties and orders members
/// within a strongly connected component.
///
/// # Algorithm
///
/// Canonical-Kosaraju with a priority-driven Kahn drain, as specified:
/// 1. Forward DFS over `following` edges to build a reverse postorder.
/// 2. Backward DFS in that order over `preceding` edges to collect SCCs,
///    each internally sorted by `comparator`.
/// 3. Build the condensation DAG, count in-degrees, and drain SCCs in
///    priority order of each SCC's minimum member.
///
/// The result is always a permutation of `nodes`; honoured edges between
/// nodes in different SCCs always place the predecessor first; the returned
/// `bool` is `false` iff some emitted SCC has more than one member.
pub fn sort_nodes<N>(nodes: &mut Vec<N>, description: &str, comparator: impl Fn(&N, &N) -> Ordering) -> bool
where
    N: SortableNode,
{
    let len = nodes.len();
    if len <= 1 {
        return true;
    }

    let index_of: HashMap<N::Id, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id().clone(), i))
        .collect();

    for n in nodes.iter() {
        n.visited().set(false);
    }
    let mut postorder = Vec::with_capacity(len);
    for start in 0..len {
        forward_dfs(nodes, &index_of, start, &mut postorder);
    }
    let mut reverse_postorder = postorder;
    reverse_postorder.reverse();

    for n in nodes.iter() {
        n.visited().set(false);
    }
    let mut scc_of = vec![usize::MAX; len];
    let mut sccs: Vec<Vec<usize>> = Vec::new();
    for &start in &reverse_postorder {
        if nodes[start].visited().get() {
            continue;
        }
        let mut members = Vec::new();
        backward_dfs(nodes, &index_of, start, &mut members);
        let scc_id = sccs.len();
        for &m in &members {
            scc_of[m] = scc_id;
        }
        members.sort_unstable_by(|&a, &b| comparator(&nodes[a], &nodes[b]));
        sccs.push(members);
    }

    let scc_count = sccs.len();
    let mut scc_edges: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); scc_count];
    let mut in_degree = vec![0usize; scc_count];
    for (i, n) in nodes.iter().enumerate() {
        let from = scc_of[i];
        for next_id in n.following() {
            let Some(&j) = index_of.get(next_id) else {
                continue;
            };
            let to = scc_of[j];
            if to != from && scc_edges[from].insert(to) {
                in_degree[to] += 1;
            }
        }
    }

    let mut ready: Vec<usize> = (0..scc_count).filter(|&s| in_degree[s] == 0).collect();
    let mut queued = vec![false; scc_count];
    for &s in &ready {
        queued[s] = true;
    }
    let mut emit_order: Vec<usize> = Vec::with_capacity(scc_count);
    while !ready.is_empty() {
        // Pick the ready SCC whose minimum member sorts first under `comparator`.
        let (pos, _) = ready
            .iter()
            .enumerate()
            .min_by(|(_, &a), (_, &b)| comparator(&nodes[sccs[a][0]], &nodes[sccs[b][0]]))
            .expect("ready is non-empty");
        let scc = ready.remove(pos);
        emit_order.push(scc);
        for &next in &scc_edges[scc] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 && !queued[next] {
                ready.push(next);
                queued[next] = true;
            }
        }
    }

    let mut cyclic_groups: Vec<Vec<N::Id>> = Vec::new();
    let mut any_cycle = false;
    for &scc in &emit_order {
        if sccs[scc].len() > 1 {
            any_cycle = true;
            cyclic_groups.push(sccs[scc].iter().map(|&i| nodes[i].id().clone()).collect());
        }
    }

    let mut slots: Vec<Option<N>> = nodes.drain(..).map(Some).collect();
    let mut out = Vec::with_capacity(len);
    for scc in emit_order {
        for &member in &sccs[scc] {
            out.push(slots[member].take().expect("each node taken exactly once"));
        }
    }
    *nodes = out;

    if any_cycle && !SUPPRESS_CYCLE_WARNINGS.load(AtomicOrdering::Relaxed) {
        warn_cycle(description, &cyclic_groups);
    }

    !any_cycle
}

fn forward_dfs<N: SortableNode>(
    nodes: &[N],
    index_of: &HashMap<N::Id, usize>,
    start: usize,
    postorder: &mut Vec<usize>,
) {
    if nodes[start].visited().get() {
        return;
    }
    nodes[start].visited().set(true);
    let mut next_ids: Vec<_> = nodes[start].following().iter().cloned().collect();
    next_ids.sort();
    for next_id in next_ids {
        if let Some(&j) = index_of.get(&next_id) {
            forward_dfs(nodes, index_of, j, postorder);
        }
    }
    postorder.push(start);
}

fn backward_dfs<N: SortableNode>(
    nodes: &[N],
    index_of: &HashMap<N::Id, usize>,
    start: usize,
    members: &mut Vec<usize>,
) {
    if nodes[start].visited().get() {
        return;
    }
    nodes[start].visited().set(true);
    members.push(start);
    let mut prev_ids: Vec<_> = nodes[start].preceding().iter().cloned().collect();
    prev_ids.sort();
    for prev_id in prev_ids {
        if let Some(&j) = index_of.get(&prev_id) {
            backward_dfs(nodes, index_of, j, members);
        }
    }
}

#[cfg(feature = "tracing")]
fn warn_cycle<Id: std::fmt::Debug>(description: &str, cycles: &[Vec<Id>]) {
    tracing::warn!(
        target: "phasic_events::sort",
        %description,
        cycles = ?cycles,
        "phase ordering contains a cycle; grouping into an SCC block",
    );
}

#[cfg(not(feature = "tracing"))]
fn warn_cycle<Id>(_description: &str, _cycles: &[Vec<Id>]) {}
