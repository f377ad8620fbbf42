/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! offline, centralized algorithm: given a map of snapshots, compute the maximal subset of
//! actors that are provably terminated.
//!
//! `G` is built with `petgraph` and its strongly-connected components are removed whenever one
//! has an edge leaving the current candidate set, iterated to a fixed point - the graph
//! construction this crate's detector is grounded on is `ChainSafe-forest`'s use of `petgraph`
//! for graph-structured reasoning over chain/actor state (see DESIGN.md); `odin_actor` itself
//! has no precedent for cross-actor reachability analysis since a single actor never needs it.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::snapshot::Snapshot;
use crate::{debug, warn};

/// an edge `A -> Y` means: "`A`'s snapshot still lists an unreleased refob or fabricated refob
/// targeting `Y`, and `Y`'s own bookkeeping (or the absence of a snapshot for `Y` at all) does
/// not let us rule out that the refob is still live." Refined by one deliberate, documented
/// choice below for deciding what counts as "Y's snapshot does not yet record release"
/// (DESIGN.md records it as an explicit Open Question resolution).
fn edge_exists<A>(token: &crate::token::Token<A>, target_addr: &A, snapshots: &HashMap<A, Snapshot<A>>) -> bool
where
    A: Eq + Hash + Clone + Debug,
{
    match snapshots.get(target_addr) {
        // no evidence this refob was ever released from the target's point of view - treat
        // conservatively as still outstanding, so partial snapshot coverage never closes early
        None => true,
        Some(target_snap) => target_snap.still_tracks(token),
    }
}

/// compute `detect(M)`: the largest subset of locally-quiescent actors in `M` that is closed
/// under `G` (no outbound edge leaves the subset).
pub fn detect<A>(snapshots: &HashMap<A, Snapshot<A>>) -> HashSet<A>
where
    A: Eq + Hash + Clone + Debug,
{
    let mut candidates: HashSet<A> =
        snapshots.iter().filter(|(_, s)| s.is_locally_quiescent()).map(|(a, _)| a.clone()).collect();

    if candidates.is_empty() {
        return candidates;
    }

    loop {
        let before = candidates.len();
        let to_remove = scc_closure_violators(&candidates, snapshots);
        if to_remove.is_empty() {
            break;
        }
        for a in &to_remove {
            warn!("detector: excluding {:?}, its outbound refs are not provably retired", a);
            candidates.remove(a);
        }
        if candidates.len() == before {
            break;
        }
    }

    debug!("detector: {} actor(s) provably terminated", candidates.len());
    candidates
}

/// one round of the fixed-point loop: build `G` restricted to `candidates`, compute its SCCs,
/// and return every node belonging to an SCC that has an edge leaving `candidates` entirely
/// (to a non-candidate actor, or to a target whose bookkeeping can't confirm release).
fn scc_closure_violators<A>(candidates: &HashSet<A>, snapshots: &HashMap<A, Snapshot<A>>) -> HashSet<A>
where
    A: Eq + Hash + Clone + Debug,
{
    let mut graph = DiGraph::<A, ()>::new();
    let mut index_of: HashMap<A, NodeIndex> = HashMap::new();
    for a in candidates {
        index_of.insert(a.clone(), graph.add_node(a.clone()));
    }

    // nodes with at least one edge that is not resolvable within `candidates`
    let mut unresolved: HashSet<A> = HashSet::new();

    for a in candidates {
        let snap = &snapshots[a];
        for r in snap.outbound_refs() {
            let y = &r.target;
            if !edge_exists(&r.token, y, snapshots) {
                continue; // the target's own bookkeeping already shows this refob retired
            }
            if candidates.contains(y) {
                graph.add_edge(index_of[a], index_of[y], ());
            } else {
                unresolved.insert(a.clone());
            }
        }
    }

    // an SCC is safe only if none of its members has an edge leaving the SCC (to a candidate
    // outside the component) or an unresolved external edge.
    let sccs = tarjan_scc(&graph);
    let mut component_of: HashMap<A, usize> = HashMap::new();
    for (i, scc) in sccs.iter().enumerate() {
        for &idx in scc {
            component_of.insert(graph[idx].clone(), i);
        }
    }

    let mut violators = HashSet::new();
    for a in candidates {
        if unresolved.contains(a) {
            violators.insert(a.clone());
            continue;
        }
        let my_component = component_of[a];
        for edge in graph.edges(index_of[a]) {
            let target_node = &graph[edge.target()];
            if component_of[target_node] != my_component {
                violators.insert(a.clone());
                break;
            }
        }
    }
    violators
}
