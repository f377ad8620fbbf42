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

//! a directed `(token, owner?, target)` binding authorizing `owner` to send to `target`.

use std::fmt::Debug;
use std::hash::{Hash, Hasher};

use crate::token::Token;

/// `owner` is absent only for an initial/external receptionist refob. Equality and hashing are
/// by `token` alone - two refobs with the same token are the same refob even if cloned copies
/// disagree about `owner`/`target` due to a bug, which is exactly the structural-equality rule
/// the protocol assumes.
#[derive(Clone, Debug)]
pub struct Refob<A> {
    pub token: Token<A>,
    pub owner: Option<A>,
    pub target: A,
}

impl<A> PartialEq for Refob<A>
where
    A: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl<A> Eq for Refob<A> where A: Eq {}

impl<A> Hash for Refob<A>
where
    A: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

pub fn refob<A>(token: Token<A>, owner: Option<A>, target: A) -> Refob<A> {
    Refob { token, owner, target }
}

impl<A: Clone> Refob<A> {
    pub fn owned_by(&self, addr: &A) -> bool
    where
        A: PartialEq,
    {
        self.owner.as_ref() == Some(addr)
    }
}
