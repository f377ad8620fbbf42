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

//! per-actor GC bookkeeping: owned refobs, owners, created refobs, send/recv counters, and the
//! operations that keep them consistent (spawn, create_ref, send, receive_app, release,
//! receive_release, try_terminate). This is the reference-counting core; it knows nothing about
//! channels, tasks or wire formats - see [`crate::actor`] for the runtime that hosts it.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::errors::{precondition_violation, Result};
use crate::protocol::{AckReleaseMsg, ReleaseMsg};
use crate::refob::{refob, Refob};
use crate::token::{new_token, Token};
use crate::{debug, trace, warn};

/// outcome of [`ActorState::try_terminate`]. `Continue*` variants carry whatever side-effecting
/// messages the caller must actually send (the GC core never sends messages itself - see
/// [`crate::context::GcContext`]).
#[derive(Debug)]
pub enum TerminationOutcome<A> {
    /// `owners = {s_A}`, `released_owners = ∅`, self counters balance, `refs = {s_A}`
    Stop,
    /// `refs` still held more than the self-refob; the releases below must be sent and the
    /// actor re-checked once they are acknowledged
    ContinueWithReleases(Vec<ReleaseMsg<A>>),
    /// inbound conditions hold but self-messages are still in flight; re-enqueue `SelfCheck`
    ContinueSelfCheck,
    /// not yet eligible to stop
    Continue,
}

/// the complete per-actor GC state: every refob `A` owns, every refob `A` knows points at it,
/// what `A` has fabricated for others, and the send/recv counters that let `A` reason about
/// messages still in flight.
#[derive(Clone, Debug)]
pub struct ActorState<A>
where
    A: Eq + Hash + Clone + Debug,
{
    self_addr: A,
    self_token: Token<A>,
    refs: HashSet<Refob<A>>,
    created: HashMap<A, HashSet<Refob<A>>>,
    owners: HashSet<Refob<A>>,
    released_owners: HashSet<Refob<A>>,
    sent: HashMap<Token<A>, u64>,
    recv: HashMap<Token<A>, u64>,
    token_counter: u64,
    release_seq: u64,
    /// turns the tolerated-anomaly `warn!` paths below into panics - set via
    /// [`ActorState::set_strict_protocol`], never by default. Useful for test harnesses that
    /// want to fail fast rather than silently absorb an unexpected condition.
    strict_protocol: bool,
}

impl<A> ActorState<A>
where
    A: Eq + Hash + Clone + Debug,
{
    /// state for a freshly spawned root actor: `s_A` is the only refob and the only owner.
    /// Token sequence 0 is reserved for `s_A` so a fresh `new_token` call never collides with it.
    pub fn new(self_addr: A) -> Self {
        let self_token = Token::debug_self(&self_addr);
        let s_a = refob(self_token.clone(), Some(self_addr.clone()), self_addr.clone());

        let mut refs = HashSet::new();
        refs.insert(s_a.clone());
        let mut owners = HashSet::new();
        owners.insert(s_a);
        let mut sent = HashMap::new();
        sent.insert(self_token.clone(), 0);

        ActorState {
            self_addr,
            self_token,
            refs,
            created: HashMap::new(),
            owners,
            released_owners: HashSet::new(),
            sent,
            recv: HashMap::new(),
            token_counter: 1, // 0 is reserved for s_A
            release_seq: 0,
            strict_protocol: false,
        }
    }

    /// turn tolerated protocol anomalies into panics instead of `warn!` logs - see
    /// [`GcConfig::strict_protocol`](crate::config::GcConfig::strict_protocol).
    pub fn set_strict_protocol(&mut self, strict: bool) {
        self.strict_protocol = strict;
    }

    /// state for a newly spawned child: in addition to `s_child`, the parent's refob to it is
    /// a known owner from the moment it starts.
    pub fn new_child(self_addr: A, parent_ref: Refob<A>) -> Self {
        let mut st = Self::new(self_addr);
        st.owners.insert(parent_ref);
        st
    }

    pub fn addr(&self) -> &A {
        &self.self_addr
    }

    pub fn self_token(&self) -> &Token<A> {
        &self.self_token
    }

    pub fn self_refob(&self) -> Refob<A> {
        refob(self.self_token.clone(), Some(self.self_addr.clone()), self.self_addr.clone())
    }

    pub fn refs(&self) -> &HashSet<Refob<A>> {
        &self.refs
    }

    pub fn owners(&self) -> &HashSet<Refob<A>> {
        &self.owners
    }

    pub fn released_owners(&self) -> &HashSet<Refob<A>> {
        &self.released_owners
    }

    pub fn created(&self) -> &HashMap<A, HashSet<Refob<A>>> {
        &self.created
    }

    pub fn sent(&self) -> &HashMap<Token<A>, u64> {
        &self.sent
    }

    pub fn recv(&self) -> &HashMap<Token<A>, u64> {
        &self.recv
    }

    fn mint_token(&mut self) -> Token<A> {
        new_token(&self.self_addr, &mut self.token_counter)
    }

    /* ---- spawn ------------------------------------------------------------------------- */

    /// generate the refob the parent keeps for a new child, and register it in `self.refs`
    /// with a zeroed send counter. The runtime pairs this with [`ActorState::new_child`] on the
    /// child's side to seed its `owners`.
    pub fn spawn_ref(&mut self, child_addr: A) -> Refob<A> {
        let tok = self.mint_token();
        let r = refob(tok.clone(), Some(self.self_addr.clone()), child_addr);
        self.refs.insert(r.clone());
        self.sent.insert(tok, 0);
        trace!("{:?} spawned child refob {:?}", self.self_addr, r.token);
        r
    }

    /* ---- create_ref -------------------------------------------------------------------- */

    /// fabricate a refob `(x, recipient.target, target.target)` for `recipient` to use when
    /// talking to `target`. Preconditions: both `target` and `recipient` are in `self.refs`.
    pub fn create_ref(&mut self, target: &Refob<A>, recipient: &Refob<A>) -> Result<Refob<A>> {
        if !self.refs.contains(target) {
            return Err(precondition_violation(format!(
                "create_ref: target {:?} is not in {:?}'s refs",
                target.token, self.self_addr
            )));
        }
        if !self.refs.contains(recipient) {
            return Err(precondition_violation(format!(
                "create_ref: recipient {:?} is not in {:?}'s refs",
                recipient.token, self.self_addr
            )));
        }

        let tok = self.mint_token();
        let shared = refob(tok, Some(recipient.target.clone()), target.target.clone());
        self.created.entry(target.target.clone()).or_default().insert(shared.clone());
        debug!(
            "{:?} created ref {:?} for {:?} -> {:?}",
            self.self_addr, shared.token, recipient.target, target.target
        );
        Ok(shared)
    }

    /* ---- send --------------------------------------------------------------------------- */

    /// bookkeeping half of sending an application message: bump `sent[via.token]`. The caller
    /// (the runtime) is responsible for actually enqueueing the `AppMsg`.
    pub fn send(&mut self, via: &Refob<A>) -> Result<Token<A>> {
        if !self.refs.contains(via) {
            return Err(precondition_violation(format!(
                "send: {:?} does not own refob {:?}",
                self.self_addr, via.token
            )));
        }
        *self.sent.entry(via.token.clone()).or_insert(0) += 1;
        Ok(via.token.clone())
    }

    /* ---- receive_app -------------------------------------------------------------------- */

    pub fn receive_app(&mut self, travel_token: &Token<A>, refs_in_msg: &[Refob<A>]) {
        *self.recv.entry(travel_token.clone()).or_insert(0) += 1;

        for r in refs_in_msg {
            if r.target == self.self_addr {
                if !self.released_owners.remove(r) {
                    self.owners.insert(r.clone());
                }
            } else if r.owner.as_ref() == Some(&self.self_addr) {
                self.refs.insert(r.clone());
                self.sent.entry(r.token.clone()).or_insert(0);
            } else {
                // neither owner nor target of r: a misrouted share, tolerated rather than fatal
                let msg = format!(
                    "{:?} received unroutable refob {:?} (owner={:?}, target={:?})",
                    self.self_addr, r.token, r.owner, r.target
                );
                if self.strict_protocol {
                    panic!("{msg}");
                }
                warn!("{msg}");
            }
        }
    }

    /* ---- release ------------------------------------------------------------------------ */

    /// group `refs_to_drop` by target and emit one `ReleaseMsg` per target, forwarding any
    /// refobs this actor fabricated for that target along the way. The self-refob is never
    /// released (dropping it is what `try_terminate` observes as `refs = {s_A}`, not a message).
    pub fn release(&mut self, refs_to_drop: impl IntoIterator<Item = Refob<A>>) -> Vec<ReleaseMsg<A>> {
        let mut groups: HashMap<A, Vec<Refob<A>>> = HashMap::new();
        for r in refs_to_drop {
            if r.token == self.self_token {
                continue;
            }
            groups.entry(r.target.clone()).or_default().push(r);
        }

        let mut out = Vec::with_capacity(groups.len());
        for (target, group_refs) in groups {
            let created_for_target: Vec<Refob<A>> =
                self.created.remove(&target).map(|s| s.into_iter().collect()).unwrap_or_default();

            for r in &group_refs {
                self.refs.remove(r);
                self.sent.remove(&r.token);
            }

            self.release_seq += 1;
            debug!(
                "{:?} releasing {} refob(s) to {:?} (seq {})",
                self.self_addr,
                group_refs.len(),
                target,
                self.release_seq
            );
            out.push(ReleaseMsg {
                from: self.self_addr.clone(),
                releasing: group_refs,
                created: created_for_target,
                seq: self.release_seq,
            });
        }
        out
    }

    /// release every non-self refob, e.g. as a precursor to shutting down
    pub fn release_all(&mut self) -> Vec<ReleaseMsg<A>> {
        let drop: Vec<Refob<A>> = self.refs.iter().filter(|r| r.token != self.self_token).cloned().collect();
        self.release(drop)
    }

    /* ---- receive_release ------------------------------------------------------------------ */

    pub fn receive_release(&mut self, msg: ReleaseMsg<A>) -> AckReleaseMsg<A> {
        for r in &msg.releasing {
            self.recv.remove(&r.token);
            if !self.owners.remove(r) {
                // release raced ahead of the creation we'd otherwise have witnessed - tolerated,
                // not a protocol violation, since create/release orderings can race legitimately
                let msg = format!(
                    "{:?} saw a release for {:?} before ever witnessing its creation; treating as a race, not a violation",
                    self.self_addr, r.token
                );
                if self.strict_protocol {
                    panic!("{msg}");
                }
                warn!("{msg}");
                self.released_owners.insert(r.clone());
            }
        }

        for c in &msg.created {
            if c.target != self.self_addr {
                warn!("{:?} received created-ref {:?} not targeting self", self.self_addr, c.token);
                continue;
            }
            if !self.released_owners.remove(c) {
                self.owners.insert(c.clone());
            }
        }

        AckReleaseMsg { releasing: msg.releasing, created: msg.created, seq: msg.seq }
    }

    /// finalize bookkeeping for an acknowledged release. The sender's own state was already
    /// mutated synchronously inside `release`; the ack carries nothing further to retract, it
    /// only confirms the target processed it - kept as a hook for callers that want to
    /// log/trace completion.
    pub fn receive_ack_release(&mut self, ack: &AckReleaseMsg<A>) {
        trace!("{:?} release seq {} acknowledged", self.self_addr, ack.seq);
    }

    /* ---- try_terminate -------------------------------------------------------------------- */

    pub fn try_terminate(&mut self) -> TerminationOutcome<A> {
        let non_self_refs: Vec<Refob<A>> =
            self.refs.iter().filter(|r| r.token != self.self_token).cloned().collect();
        if !non_self_refs.is_empty() {
            let msgs = self.release(non_self_refs);
            return TerminationOutcome::ContinueWithReleases(msgs);
        }

        let only_self_owner = self.owners.len() == 1 && self.owners.contains(&self.self_refob());
        if !(only_self_owner && self.released_owners.is_empty()) {
            return TerminationOutcome::Continue;
        }

        let sent_self = *self.sent.get(&self.self_token).unwrap_or(&0);
        let recv_self = *self.recv.get(&self.self_token).unwrap_or(&0);
        if sent_self == recv_self {
            debug!("{:?} terminated", self.self_addr);
            TerminationOutcome::Stop
        } else {
            TerminationOutcome::ContinueSelfCheck
        }
    }

    /* ---- invariant checks (used by tests / strict_protocol mode) --------------------------- */

    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let s_a = self.self_refob();
        if !self.refs.contains(&s_a) {
            return Err(format!("{:?}: s_A missing from refs", self.self_addr));
        }
        if !self.owners.contains(&s_a) {
            return Err(format!("{:?}: s_A missing from owners", self.self_addr));
        }
        if !self.owners.is_disjoint(&self.released_owners) {
            return Err(format!("{:?}: owners and released_owners overlap", self.self_addr));
        }
        let refs_tokens: HashSet<&Token<A>> = self.refs.iter().map(|r| &r.token).collect();
        let sent_tokens: HashSet<&Token<A>> = self.sent.keys().collect();
        if refs_tokens != sent_tokens {
            return Err(format!(
                "{:?}: domain(sent) != {{r.token | r in refs}}",
                self.self_addr
            ));
        }
        for (target, created_for_target) in &self.created {
            for r in created_for_target {
                if self.refs.contains(r) {
                    return Err(format!(
                        "{:?}: created refob {:?} (for {:?}) leaked into refs",
                        self.self_addr, r.token, target
                    ));
                }
            }
        }
        Ok(())
    }
}

// Token::debug_self is a tiny extension used only to build `s_A` with a fixed, reserved seq
// number of 0 (distinct from the regular `new_token` counter, which starts at 1).
impl<A: Clone> Token<A> {
    fn debug_self(self_addr: &A) -> Token<A> {
        let mut zero = 0u64;
        new_token(self_addr, &mut zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type St = ActorState<String>;

    fn addr(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn fresh_actor_satisfies_invariants() {
        let st = St::new(addr("A"));
        assert!(st.check_invariants().is_ok());
        assert_eq!(st.refs().len(), 1);
        assert_eq!(st.owners().len(), 1);
    }

    #[test]
    fn spawn_adds_child_refob_and_zeroes_sent() {
        let mut a = St::new(addr("A"));
        let r = a.spawn_ref(addr("B"));
        assert!(a.refs().contains(&r));
        assert_eq!(*a.sent().get(&r.token).unwrap(), 0);
        assert!(a.check_invariants().is_ok());

        let b = St::new_child(addr("B"), r.clone());
        assert!(b.owners().contains(&r));
        assert_eq!(b.owners().len(), 2); // s_B and the parent's refob
        assert!(b.check_invariants().is_ok());
    }

    #[test]
    fn create_ref_requires_both_refs_to_be_owned() {
        let mut a = St::new(addr("A"));
        let to_b = a.spawn_ref(addr("B"));
        let bogus = refob(new_token(&addr("X"), &mut 0), Some(addr("A")), addr("C"));
        assert!(a.create_ref(&bogus, &to_b).is_err());
    }

    #[test]
    fn create_ref_is_not_inserted_into_own_refs() {
        let mut a = St::new(addr("A"));
        let to_b = a.spawn_ref(addr("B"));
        let to_c = a.spawn_ref(addr("C"));
        let shared = a.create_ref(&to_c, &to_b).unwrap();
        assert!(!a.refs().contains(&shared));
        assert!(a.created().get(&addr("C")).unwrap().contains(&shared));
        assert!(a.check_invariants().is_ok());
    }

    #[test]
    fn receive_app_registers_inbound_and_outbound_shares() {
        let mut c = St::new(addr("C"));
        let mut b = St::new(addr("B"));

        // simulate A creating shared = (x, B, C) and handing it to B via an AppMsg
        let mut ctr = 7u64;
        let shared = refob(new_token(&addr("A"), &mut ctr), Some(addr("B")), addr("C"));
        let carrying_token = new_token(&addr("A"), &mut ctr);
        b.receive_app(&carrying_token, &[shared.clone()]);
        assert!(b.refs().contains(&shared));
        assert_eq!(*b.sent().get(&shared.token).unwrap(), 0);

        // B now uses it to message C
        let tok = b.send(&shared).unwrap();
        c.receive_app(&tok, &[]);
        assert_eq!(*c.recv().get(&tok).unwrap_or(&0), 1);
    }

    #[test]
    fn release_then_receive_release_then_ack_balances_owners() {
        let mut a = St::new(addr("A"));
        let to_b = a.spawn_ref(addr("B"));
        let mut b = St::new_child(addr("B"), to_b.clone());

        let releases = a.release(vec![to_b.clone()]);
        assert_eq!(releases.len(), 1);
        assert!(!a.refs().contains(&to_b));
        assert!(a.check_invariants().is_ok());

        let ack = b.receive_release(releases.into_iter().next().unwrap());
        assert!(!b.owners().contains(&to_b));
        assert!(b.check_invariants().is_ok());

        a.receive_ack_release(&ack);
    }

    #[test]
    fn create_release_race_is_tolerated() {
        // B learns of a release for a refob it never saw created (S4-style race)
        let mut c = St::new(addr("C"));
        let phantom = refob(new_token(&addr("B"), &mut 3), Some(addr("B")), addr("C"));
        let release = ReleaseMsg { from: addr("B"), releasing: vec![phantom.clone()], created: vec![], seq: 1 };
        let _ack = c.receive_release(release);
        assert!(c.released_owners().contains(&phantom));
        assert!(c.check_invariants().is_ok());

        // later the matching `created` entry turns up
        let r2 = refob(new_token(&addr("A"), &mut 9), Some(addr("B")), addr("C"));
        // reuse the same token so it matches what's pending
        let r2 = Refob { token: phantom.token.clone(), ..r2 };
        let release2 = ReleaseMsg { from: addr("A"), releasing: vec![], created: vec![r2], seq: 2 };
        let _ack2 = c.receive_release(release2);
        assert!(!c.released_owners().contains(&phantom));
        assert!(c.check_invariants().is_ok());
    }

    #[test]
    fn try_terminate_releases_outstanding_refs_before_stopping() {
        let mut a = St::new(addr("A"));
        let to_b = a.spawn_ref(addr("B"));
        match a.try_terminate() {
            TerminationOutcome::ContinueWithReleases(msgs) => {
                assert_eq!(msgs.len(), 1);
                assert_eq!(msgs[0].releasing[0].token, to_b.token);
            }
            other => panic!("expected ContinueWithReleases, got {other:?}"),
        }
        assert!(matches!(a.try_terminate(), TerminationOutcome::Stop));
    }

    #[test]
    fn try_terminate_waits_on_self_messages() {
        let mut a = St::new(addr("A"));
        let self_tok = a.self_token().clone();
        *a.sent.get_mut(&self_tok).unwrap() += 3;
        assert!(matches!(a.try_terminate(), TerminationOutcome::ContinueSelfCheck));
        for _ in 0..3 {
            *a.recv.entry(self_tok.clone()).or_insert(0) += 1;
        }
        assert!(matches!(a.try_terminate(), TerminationOutcome::Stop));
    }
}
