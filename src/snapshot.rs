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

//! immutable per-actor GC summary gathered for the [`crate::detector`]. Taken only while an
//! actor is idle; sets/maps may serialize in any order since snapshots compare by value.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::refob::Refob;
use crate::state::ActorState;
use crate::token::Token;

#[derive(Clone, Debug)]
pub struct Snapshot<A>
where
    A: Eq + Hash + Clone + Debug,
{
    pub addr: A,
    pub self_token: Token<A>,
    pub refs: HashSet<Refob<A>>,
    pub owners: HashSet<Refob<A>>,
    pub created_flat: HashSet<Refob<A>>,
    pub released_owners: HashSet<Refob<A>>,
    pub sent: HashMap<Token<A>, u64>,
    pub recv: HashMap<Token<A>, u64>,
    /// set by the actor context at spawn time for a distinguished, externally-owned actor -
    /// never by a received message. Receptionists are perpetually owned from outside and are
    /// never a detector candidate regardless of local quiescence.
    pub is_receptionist: bool,
}

impl<A> ActorState<A>
where
    A: Eq + Hash + Clone + Debug,
{
    pub fn snapshot(&self, is_receptionist: bool) -> Snapshot<A> {
        let created_flat = self.created().values().flat_map(|s| s.iter().cloned()).collect();
        Snapshot {
            addr: self.addr().clone(),
            self_token: self.self_token().clone(),
            refs: self.refs().clone(),
            owners: self.owners().clone(),
            created_flat,
            released_owners: self.released_owners().clone(),
            sent: self.sent().clone(),
            recv: self.recv().clone(),
            is_receptionist,
        }
    }
}

impl<A> Snapshot<A>
where
    A: Eq + Hash + Clone + Debug,
{
    /// the local quiescence check: `owners = {s_A}`, `released_owners = ∅`, and the self-refob's
    /// send/recv counters balance. Receptionists never qualify, no matter what their counters
    /// say. Deliberately does not also require `refs = {s_A}` - an actor that still holds a live
    /// ref to someone else can still pass this check; it is the detector's graph closure that
    /// has to catch that case, not this one.
    pub fn is_locally_quiescent(&self) -> bool {
        if self.is_receptionist {
            return false;
        }
        let only_self_owner = self.owners.len() == 1
            && self.owners.iter().next().map(|r| r.token == self.self_token).unwrap_or(false);
        let counters_balance =
            self.sent.get(&self.self_token).copied().unwrap_or(0) == self.recv.get(&self.self_token).copied().unwrap_or(0);
        only_self_owner && self.released_owners.is_empty() && counters_balance
    }

    /// refobs this actor still has unreleased, outbound business with - the refs it holds
    /// (other than the self-refob) plus everything it has fabricated for others. Used by the
    /// detector to build its reachability graph over candidate actors.
    pub fn outbound_refs(&self) -> impl Iterator<Item = &Refob<A>> + '_ {
        self.refs.iter().filter(move |r| r.token != self.self_token).chain(self.created_flat.iter())
    }

    /// whether `token` still appears in this actor's `owners` or `released_owners` - i.e.
    /// whether, from this actor's own bookkeeping, the refob is still outstanding.
    pub fn still_tracks(&self, token: &Token<A>) -> bool {
        self.owners.iter().any(|r| &r.token == token) || self.released_owners.iter().any(|r| &r.token == token)
    }
}
