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

//! distributed reference-counting garbage collection for actor systems: per-actor bookkeeping
//! ([`state`]) that tracks live refobs and drives local termination, a wire protocol
//! ([`protocol`]) for sharing and releasing them, and an offline [`detector`] that closes the
//! gap local checks can't - cyclic garbage spanning actors that never individually quiesce.
//! [`actor`] and [`context`] host this on top of Tokio; [`config`] and [`errors`] are the
//! ambient plumbing every actor in the system shares.

pub mod prelude;

/// default bound of an actor's mailbox, used whenever [`config::GcConfig`] isn't overridden.
pub const DEFAULT_CHANNEL_BOUNDS: usize = 16;

pub mod errors;
pub use errors::{GcError, Result};

pub mod config;
pub use config::GcConfig;

pub mod token;
pub use token::{new_token, Token};

pub mod refob;
pub use refob::{refob, Refob};

pub mod protocol;
pub use protocol::{AckReleaseMsg, AppMsg, GcEnvelope, ReleaseMsg, SelfCheck};

pub mod state;
pub use state::{ActorState, TerminationOutcome};

pub mod snapshot;
pub use snapshot::Snapshot;

pub mod detector;
pub use detector::detect;

pub mod actor;
pub use actor::{Addr, ActorHandle, ActorSystem, ControlSink, ReceiveAction};

pub mod context;
pub use context::{spawn_root, Behavior, GcContext};

/*
 * we intercept logging/tracing macros here to have a central place where we can remove/replace them,
 * following the same pattern ODIN uses for its own actor framework.
 */

#[macro_export]
macro_rules! trace {
    ( $( $id:ident = $e:expr ),* ) => { tracing::trace!( $( $id = $e ),* ) };
    ( $( $e: expr ),* ) => { tracing::trace!( $( $e ),* ) }
}

#[macro_export]
macro_rules! debug {
    ( $( $id:ident = $e:expr ),* ) => { tracing::debug!( $( $id = $e ),* ) };
    ( $( $e: expr ),* ) => { tracing::debug!( $( $e ),* ) }
}

#[macro_export]
macro_rules! info {
    ( $( $id:ident = $e:expr ),* ) => { tracing::info!( $( $id = $e ),* ) };
    ( $( $e: expr ),* ) => { tracing::info!( $( $e ),* ) }
}

#[macro_export]
macro_rules! warn {
    ( $( $id:ident = $e:expr ),* ) => { tracing::warn!( $( $id = $e ),* ) };
    ( $( $e: expr ),* ) => { tracing::warn!( $( $e ),* ) }
}

#[macro_export]
macro_rules! error {
    ( $( $id:ident = $e:expr ),* ) => { tracing::error!( $( $id = $e ),* ) };
    ( $( $e: expr ),* ) => { tracing::error!( $( $e ),* ) }
}
