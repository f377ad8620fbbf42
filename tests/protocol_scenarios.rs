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

//! black-box protocol scenarios driven entirely through `actor_gc`'s public API - no Tokio
//! runtime needed, since `ActorState` and `detect` have no dependency on it.

use std::collections::HashMap;

use actor_gc::{detect, ActorState, ReleaseMsg, TerminationOutcome};

fn addr(s: &str) -> String {
    s.to_string()
}

#[test]
fn spawned_child_terminates_once_its_only_owner_releases_it() {
    let mut a = ActorState::new(addr("A"));
    let to_b = a.spawn_ref(addr("B"));
    let mut b = ActorState::new_child(addr("B"), to_b.clone());

    for msg in a.release(vec![to_b]) {
        b.receive_release(msg);
    }

    assert!(matches!(b.try_terminate(), TerminationOutcome::Stop));
}

#[test]
fn self_messages_in_flight_delay_termination_until_drained() {
    let mut a = ActorState::new(addr("A"));
    // simulate two outstanding self-sent messages (e.g. timers an actor sent to itself)
    let via = a.self_refob();
    a.send(&via).unwrap();
    a.send(&via).unwrap();

    assert!(matches!(a.try_terminate(), TerminationOutcome::ContinueSelfCheck));

    let self_token = a.self_token().clone();
    a.receive_app(&self_token, &[]);
    assert!(matches!(a.try_terminate(), TerminationOutcome::ContinueSelfCheck));
    a.receive_app(&self_token, &[]);
    assert!(matches!(a.try_terminate(), TerminationOutcome::Stop));
}

#[test]
fn release_racing_ahead_of_the_matching_create_is_tolerated_then_resolved() {
    // C hears about a release for a refob it never saw created yet (a create/release race),
    // then the create catches up via a later message - this must not be treated as a protocol
    // violation.
    let mut c = ActorState::new(addr("C"));

    let premature = ReleaseMsg {
        from: addr("B"),
        releasing: vec![actor_gc::refob(actor_gc::new_token(&addr("B"), &mut 3), Some(addr("B")), addr("C"))],
        created: vec![],
        seq: 1,
    };
    let phantom_token = premature.releasing[0].token.clone();
    c.receive_release(premature);
    assert!(c.released_owners().iter().any(|r| r.token == phantom_token));
    assert!(c.check_invariants().is_ok());

    let belated_create = ReleaseMsg {
        from: addr("A"),
        releasing: vec![],
        created: vec![actor_gc::refob(phantom_token.clone(), Some(addr("B")), addr("C"))],
        seq: 2,
    };
    c.receive_release(belated_create);
    assert!(!c.released_owners().iter().any(|r| r.token == phantom_token));
    assert!(c.check_invariants().is_ok());
}

#[test]
fn sharing_then_fully_releasing_a_chain_closes_every_participant() {
    let mut a = ActorState::new(addr("A"));
    let to_b = a.spawn_ref(addr("B"));
    let to_c = a.spawn_ref(addr("C"));
    let mut b = ActorState::new_child(addr("B"), to_b.clone());
    let mut c = ActorState::new_child(addr("C"), to_c.clone());

    let shared = a.create_ref(&to_c, &to_b).unwrap();
    let travel = a.send(&to_b).unwrap();
    b.receive_app(&travel, &[shared.clone()]);

    for msg in a.release(vec![to_b, to_c]) {
        if msg.releasing.iter().any(|r| r.target == addr("B")) {
            b.receive_release(msg);
        } else {
            c.receive_release(msg);
        }
    }
    for msg in b.release(vec![shared]) {
        c.receive_release(msg);
    }

    let mut snapshots = HashMap::new();
    snapshots.insert(addr("A"), a.snapshot(false));
    snapshots.insert(addr("B"), b.snapshot(false));
    snapshots.insert(addr("C"), c.snapshot(false));

    let terminated = detect(&snapshots);
    assert_eq!(terminated.len(), 3);
}

#[test]
fn receptionist_actor_is_never_declared_terminated_even_when_idle() {
    let root = ActorState::<String>::new(addr("root"));
    let mut snapshots = HashMap::new();
    snapshots.insert(addr("root"), root.snapshot(true));
    assert!(detect(&snapshots).is_empty());
}
