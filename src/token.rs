/*
 * Copyright (c) 2024, United States Government, as represented by the
 * Administrator of the National Aeronautics and Space Administration.
 * All rights reserved.
 *
 * The ODIN - Open Data Integration Framework is licensed under the
 * Apache License, Version 2.0 (the "License"); you may not use this file
 * except in compliance with the License. You may obtain a copy of the
 * License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! globally unique identity of a [`crate::refob::Refob`]

use std::fmt::Debug;
use std::hash::Hash;

/// opaque identifier of a refob. Uniqueness is guaranteed because `creator` is per-actor
/// unique (an [`crate::actor::Addr`] in the runtime) and `seq` is strictly increasing within
/// the creating actor - see `ActorState::new_token`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token<A> {
    creator: A,
    seq: u64,
}

impl<A> Token<A> {
    pub fn creator(&self) -> &A {
        &self.creator
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// combine `self_addr` with a strictly increasing counter to mint a fresh token.
/// `counter` is the caller's `token_counter`; this bumps it.
pub fn new_token<A: Clone>(self_addr: &A, counter: &mut u64) -> Token<A> {
    let seq = *counter;
    *counter += 1;
    Token { creator: self_addr.clone(), seq }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_from_same_actor_are_distinct() {
        let mut counter = 0u64;
        let a = "actor-a".to_string();
        let t1 = new_token(&a, &mut counter);
        let t2 = new_token(&a, &mut counter);
        assert_ne!(t1, t2);
        assert_eq!(counter, 2);
    }

    #[test]
    fn tokens_from_different_actors_are_distinct_even_at_same_seq() {
        let mut ca = 0u64;
        let mut cb = 0u64;
        let a = "actor-a".to_string();
        let b = "actor-b".to_string();
        let ta = new_token(&a, &mut ca);
        let tb = new_token(&b, &mut cb);
        assert_ne!(ta, tb);
    }
}
