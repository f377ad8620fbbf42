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

//! drives the offline quiescence detector directly over a hand-built snapshot map, no Tokio
//! runtime required - this is the scenario local `try_terminate` checks can never resolve on
//! their own: two actors holding live refobs to each other, with the actor that introduced them
//! long gone. Mirrors the "spawn a root, share a cycle, step down" shape of `spawn_and_release`
//! but drives `ActorState` directly instead of through the actor runtime.

use std::collections::HashMap;

use actor_gc::{detect, ActorState};

fn main() {
    tracing_subscriber::fmt::init();

    let mut a = ActorState::new("A".to_string());
    let to_b = a.spawn_ref("B".to_string());
    let to_c = a.spawn_ref("C".to_string());
    let mut b = ActorState::new_child("B".to_string(), to_b.clone());
    let mut c = ActorState::new_child("C".to_string(), to_c.clone());

    let b_to_c = a.create_ref(&to_c, &to_b).unwrap();
    let c_to_b = a.create_ref(&to_b, &to_c).unwrap();
    let t1 = a.send(&to_b).unwrap();
    b.receive_app(&t1, &[b_to_c]);
    let t2 = a.send(&to_c).unwrap();
    c.receive_app(&t2, &[c_to_b]);

    // A hands off and steps down, forwarding the fabricated refs so B and C learn of each other
    for msg in a.release(vec![to_b, to_c]) {
        if msg.releasing.iter().any(|r| r.target == "B") {
            b.receive_release(msg);
        } else {
            c.receive_release(msg);
        }
    }

    let mut snapshots = HashMap::new();
    snapshots.insert(a.addr().clone(), a.snapshot(false));
    snapshots.insert(b.addr().clone(), b.snapshot(false));
    snapshots.insert(c.addr().clone(), c.snapshot(false));

    let terminated = detect(&snapshots);
    println!("A is independent and terminates: {}", terminated.contains("A"));
    println!("B and C keep each other alive: {}", !terminated.contains("B") && !terminated.contains("C"));
}
