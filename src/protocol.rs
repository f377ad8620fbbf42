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

//! wire-level messages piggybacked on (or interleaved with) application traffic.

use std::fmt::Debug;

use crate::refob::Refob;
use crate::token::Token;

/// user payload with optional refobs attached, addressed along `travel_token`'s refob.
#[derive(Clone, Debug)]
pub struct AppMsg<A, P> {
    pub travel_token: Token<A>,
    pub refs: Vec<Refob<A>>,
    pub payload: P,
}

/// sent by the releasing actor to each target it is dropping refobs to.
#[derive(Clone, Debug)]
pub struct ReleaseMsg<A> {
    pub from: A,
    pub releasing: Vec<Refob<A>>,
    pub created: Vec<Refob<A>>,
    pub seq: u64,
}

/// reply to a `ReleaseMsg`, letting the releaser finalize its own bookkeeping. Carries the same
/// payload as the `ReleaseMsg` it acknowledges.
#[derive(Clone, Debug)]
pub struct AckReleaseMsg<A> {
    pub releasing: Vec<Refob<A>>,
    pub created: Vec<Refob<A>>,
    pub seq: u64,
}

/// internal wake-up used by `try_terminate` to re-check self-message counters. Never counted
/// toward `sent`/`recv` - see the dedicated `GcEnvelope::SelfCheck` variant below, which keeps
/// it out of band from `AppMsg` so implementations can't accidentally run it through the
/// counter-incrementing path.
#[derive(Clone, Copy, Debug)]
pub struct SelfCheck;

/// the sum type actually carried over an actor's single inbound channel: either a user payload
/// or one of the three GC protocol messages.
#[derive(Clone, Debug)]
pub enum GcEnvelope<A, P> {
    App(AppMsg<A, P>),
    Release(ReleaseMsg<A>),
    AckRelease(AckReleaseMsg<A>),
    SelfCheck(SelfCheck),
}

impl<A, P> From<AppMsg<A, P>> for GcEnvelope<A, P> {
    fn from(m: AppMsg<A, P>) -> Self {
        GcEnvelope::App(m)
    }
}

impl<A, P> From<ReleaseMsg<A>> for GcEnvelope<A, P> {
    fn from(m: ReleaseMsg<A>) -> Self {
        GcEnvelope::Release(m)
    }
}

impl<A, P> From<AckReleaseMsg<A>> for GcEnvelope<A, P> {
    fn from(m: AckReleaseMsg<A>) -> Self {
        GcEnvelope::AckRelease(m)
    }
}

impl<A, P> From<SelfCheck> for GcEnvelope<A, P> {
    fn from(m: SelfCheck) -> Self {
        GcEnvelope::SelfCheck(m)
    }
}
