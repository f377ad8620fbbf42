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

//! the Tokio-specific runtime: actor addresses, mailboxes and the spawn loop that drives
//! [`crate::context::GcContext`]. Shaped after ODIN's `tokio_rt` `Actor`/`ActorHandle` pair, but
//! committed to a single channel implementation (`tokio::sync::mpsc`) since this crate has no
//! need for ODIN's kanal/flume feature split.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task;

use crate::errors::{GcError, Result};
use crate::protocol::{AckReleaseMsg, GcEnvelope, ReleaseMsg, SelfCheck};
use crate::{debug, trace, warn};

/// opaque runtime address - the concrete instantiation of the core's generic `A: Eq + Hash +
/// Clone + Debug` type parameter. Assigned by [`ActorSystem::next_addr`] at spawn time; has no
/// meaning outside a single `ActorSystem`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Addr(u64);

impl Addr {
    /// reserved address for code outside the actor system (a `main()` driver, a test harness)
    /// that needs to mint a throwaway travel token to kick off a receptionist actor.
    /// `ActorSystem::next_addr` starts at 1, so this never collides with a real actor.
    pub const EXTERNAL: Addr = Addr(0);
}

impl fmt::Debug for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub type ObjSafeFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type MsgSendFuture<'a> = ObjSafeFuture<'a, Result<()>>;

/// handle for sending typed application messages (and, piggybacked on the same channel, the GC
/// protocol's control messages) to one actor. Cheap to clone - it is just a sender and an addr.
pub struct ActorHandle<P> {
    addr: Addr,
    tx: mpsc::Sender<GcEnvelope<Addr, P>>,
}

impl<P> Clone for ActorHandle<P> {
    fn clone(&self) -> Self {
        ActorHandle { addr: self.addr, tx: self.tx.clone() }
    }
}

impl<P> fmt::Debug for ActorHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorHandle({:?})", self.addr)
    }
}

impl<P> ActorHandle<P>
where
    P: Send + 'static,
{
    pub fn addr(&self) -> Addr {
        self.addr
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    /// waits until the envelope can be enqueued or the actor's mailbox is gone.
    pub async fn send_msg(&self, msg: impl Into<GcEnvelope<Addr, P>>) -> Result<()> {
        self.tx.send(msg.into()).await.map_err(|_| GcError::ReceiverClosed)
    }

    pub async fn timeout_send_msg(&self, msg: impl Into<GcEnvelope<Addr, P>>, to: Duration) -> Result<()> {
        match tokio::time::timeout(to, self.send_msg(msg)).await {
            Ok(r) => r,
            Err(_) => Err(GcError::Timeout(to)),
        }
    }

    pub fn try_send_msg(&self, msg: impl Into<GcEnvelope<Addr, P>>) -> Result<()> {
        match self.tx.try_send(msg.into()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("{:?}: mailbox full", self.addr);
                Err(GcError::ReceiverFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(GcError::ReceiverClosed),
        }
    }
}

/// object-safe sink for the GC protocol's control messages, used to address actors whose
/// application payload type `P` is not (and need not be) known to the caller - the detector
/// and the release machinery only ever deal in control traffic. Mirrors the role ODIN's
/// `DynMsgReceiver` plays for heterogeneous actor handles.
pub trait ControlSink: Send + Sync {
    fn send_release(&self, msg: ReleaseMsg<Addr>) -> MsgSendFuture<'_>;
    fn send_ack_release(&self, msg: AckReleaseMsg<Addr>) -> MsgSendFuture<'_>;
    fn send_self_check(&self) -> MsgSendFuture<'_>;
}

impl<P> ControlSink for ActorHandle<P>
where
    P: Send + 'static,
{
    fn send_release(&self, msg: ReleaseMsg<Addr>) -> MsgSendFuture<'_> {
        Box::pin(self.send_msg(msg))
    }

    fn send_ack_release(&self, msg: AckReleaseMsg<Addr>) -> MsgSendFuture<'_> {
        Box::pin(self.send_msg(msg))
    }

    fn send_self_check(&self) -> MsgSendFuture<'_> {
        Box::pin(self.send_msg(SelfCheck))
    }
}

/// what an actor's `Behavior::receive` returns after handling one application message -
/// mirrors ODIN's `ReceiveAction` but drops the system-message variants this crate has no use
/// for (there is no heartbeat/ping subsystem here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveAction {
    Continue,
    Stop,
}

/// shared, address-keyed directory of control sinks. Every spawned actor registers itself here
/// so that releases and self-checks can reach it without the sender knowing its payload type.
#[derive(Clone)]
pub struct ActorSystem {
    next: Arc<AtomicU64>,
    directory: Arc<Mutex<HashMap<Addr, Arc<dyn ControlSink>>>>,
    pub(crate) channel_bound: usize,
}

impl ActorSystem {
    pub fn new(channel_bound: usize) -> Self {
        ActorSystem { next: Arc::new(AtomicU64::new(1)), directory: Arc::new(Mutex::new(HashMap::new())), channel_bound }
    }

    pub fn next_addr(&self) -> Addr {
        Addr(self.next.fetch_add(1, Ordering::Relaxed))
    }

    pub async fn register(&self, addr: Addr, sink: Arc<dyn ControlSink>) {
        self.directory.lock().await.insert(addr, sink);
        trace!("registered actor {:?}", addr);
    }

    pub async fn unregister(&self, addr: &Addr) {
        self.directory.lock().await.remove(addr);
        debug!("unregistered actor {:?}", addr);
    }

    pub async fn control_sink(&self, addr: &Addr) -> Option<Arc<dyn ControlSink>> {
        self.directory.lock().await.get(addr).cloned()
    }

    /// whether `addr` was ever minted by this system's `next_addr` - distinguishes a refob whose
    /// target has already terminated (ordinary) from one that never resolved to any actor this
    /// system ever spawned (a programmer error, the fatal case).
    pub fn addr_ever_existed(&self, addr: &Addr) -> bool {
        addr.0 > 0 && addr.0 < self.next.load(Ordering::Relaxed)
    }

    /// create a fresh mailbox for a to-be-spawned actor without handing out its address to
    /// anyone yet - lets a parent mint the child's `Addr` and refob before the child task exists.
    pub fn new_mailbox<P>(&self) -> (mpsc::Sender<GcEnvelope<Addr, P>>, mpsc::Receiver<GcEnvelope<Addr, P>>) {
        self.new_mailbox_with_bound(self.channel_bound)
    }

    /// same as [`ActorSystem::new_mailbox`] but with an explicit bound, so a [`GcConfig`](crate::config::GcConfig)
    /// passed into a particular spawn can override this system's default.
    pub fn new_mailbox_with_bound<P>(&self, bound: usize) -> (mpsc::Sender<GcEnvelope<Addr, P>>, mpsc::Receiver<GcEnvelope<Addr, P>>) {
        mpsc::channel(bound)
    }

    pub fn handle_for<P>(&self, addr: Addr, tx: mpsc::Sender<GcEnvelope<Addr, P>>) -> ActorHandle<P> {
        ActorHandle { addr, tx }
    }

    pub fn spawn_task<F>(&self, name: &str, fut: F) -> Result<task::JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        task::Builder::new().name(name).spawn(fut).map_err(|e| crate::errors::op_failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_and_try_send_round_trip() {
        let sys = ActorSystem::new(4);
        let (tx, mut rx) = sys.new_mailbox::<u32>();
        let addr = sys.next_addr();
        let handle = sys.handle_for(addr, tx);

        handle.try_send_msg(crate::protocol::AppMsg {
            travel_token: crate::token::new_token(&addr, &mut 0),
            refs: vec![],
            payload: 7u32,
        }).unwrap();

        match rx.recv().await.unwrap() {
            GcEnvelope::App(m) => assert_eq!(m.payload, 7),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn directory_round_trip() {
        let sys = ActorSystem::new(4);
        let (tx, _rx) = sys.new_mailbox::<()>();
        let addr = sys.next_addr();
        let handle: Arc<dyn ControlSink> = Arc::new(sys.handle_for(addr, tx));
        sys.register(addr, handle).await;
        assert!(sys.control_sink(&addr).await.is_some());
        sys.unregister(&addr).await;
        assert!(sys.control_sink(&addr).await.is_none());
    }
}
