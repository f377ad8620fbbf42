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

//! the per-actor facade an application actually programs against: [`GcContext`] pairs an
//! [`ActorState`] with the handles needed to actually move bytes, and [`Behavior`] is the
//! single-method trait a user implements instead of subclassing - ODIN's Design Notes for this
//! protocol call this out explicitly ("express as a polymorphic Behavior<T>... does not need
//! subclassing"), and it plays the same role `ActorReceiver<MsgType>` plays for ODIN itself.

use std::future::Future;

use crate::actor::{Addr, ActorHandle, ActorSystem, ControlSink, ReceiveAction};
use crate::config::GcConfig;
use crate::errors::{GcError, Result};
use crate::protocol::{AppMsg, GcEnvelope, ReleaseMsg};
use crate::refob::Refob;
use crate::snapshot::Snapshot;
use crate::state::{ActorState, TerminationOutcome};
use crate::{debug, error, trace, warn};
use std::sync::Arc;

/// a user-defined actor's message handler. `P` is the application payload type carried in
/// [`AppMsg`] - the GC control traffic (`Release`/`AckRelease`/`SelfCheck`) never reaches this
/// trait at all; [`GcContext::run`] intercepts and handles it before `receive` is ever called.
pub trait Behavior<P>: Send + 'static {
    fn receive(&mut self, ctx: &mut GcContext<P>, msg: P) -> impl Future<Output = ReceiveAction> + Send;
}

/// the facade exposed to [`Behavior::receive`]: the actor's own GC bookkeeping plus enough of
/// the runtime to spawn children, share refobs and send application messages. One instance is
/// owned by the task loop in [`GcContext::run`] and handed to the behavior by `&mut` reference.
pub struct GcContext<P> {
    state: ActorState<Addr>,
    hself: ActorHandle<P>,
    system: ActorSystem,
    config: GcConfig,
    is_receptionist: bool,
}

impl<P> GcContext<P>
where
    P: Send + 'static,
{
    pub fn addr(&self) -> Addr {
        self.hself.addr()
    }

    pub fn self_handle(&self) -> ActorHandle<P> {
        self.hself.clone()
    }

    pub fn self_refob(&self) -> Refob<Addr> {
        self.state.self_refob()
    }

    pub fn refs(&self) -> &std::collections::HashSet<Refob<Addr>> {
        self.state.refs()
    }

    /// spawn a child actor running `behavior`, returning the refob the caller should keep to
    /// talk to it. Registers the child's control sink with the system and seeds the child's own
    /// state with the parent refob, so it is a known owner from the moment it starts.
    pub async fn spawn<B, F>(&mut self, name: &str, make_behavior: F) -> Result<Refob<Addr>>
    where
        B: Behavior<P> + 'static,
        F: FnOnce(Addr) -> B + Send + 'static,
        P: 'static,
    {
        let child_addr = self.system.next_addr();
        let parent_ref = self.state.spawn_ref(child_addr);

        let (tx, rx) = self.system.new_mailbox_with_bound::<P>(self.config.channel_bound);
        let child_handle = self.system.handle_for(child_addr, tx);
        self.system.register(child_addr, Arc::new(child_handle.clone()) as Arc<dyn ControlSink>).await;

        let mut child_state = ActorState::new_child(child_addr, parent_ref.clone());
        child_state.set_strict_protocol(self.config.strict_protocol);
        let behavior = make_behavior(child_addr);
        let mut child_ctx = GcContext {
            state: child_state,
            hself: child_handle,
            system: self.system.clone(),
            config: self.config.clone(),
            is_receptionist: false,
        };

        let task_name = name.to_string();
        self.system.spawn_task(&task_name, async move {
            child_ctx.run(behavior, rx).await;
        })?;

        Ok(parent_ref)
    }

    /// fabricate a refob to `target` for `recipient` to use.
    pub fn create_ref(&mut self, target: &Refob<Addr>, recipient: &Refob<Addr>) -> Result<Refob<Addr>> {
        self.state.create_ref(target, recipient)
    }

    /// send an application payload via `handle`, attaching `refs` to the envelope. `via` must be
    /// a refob this actor holds that targets `handle`'s address - precisely the refob the
    /// caller would have received when `handle` was spawned or shared with it.
    pub async fn send_app(&mut self, via: &Refob<Addr>, handle: &ActorHandle<P>, refs: Vec<Refob<Addr>>, payload: P) -> Result<()> {
        let travel_token = self.state.send(via)?;
        handle.send_msg(AppMsg { travel_token, refs, payload }).await
    }

    /// release refobs the actor no longer needs; dispatches the resulting `ReleaseMsg`s to
    /// whichever control sinks are registered for their targets, one target's send never
    /// waiting on another's - the same `futures::future::try_join_all` fan-out ODIN's own
    /// `tokio_rt` reaches for (via `TryFutureExt`) whenever it awaits more than one send future.
    pub async fn release(&mut self, refs_to_drop: impl IntoIterator<Item = Refob<Addr>>) -> Result<()> {
        let msgs = self.state.release(refs_to_drop);
        self.dispatch_releases(msgs).await
    }

    /// release every refob this actor currently holds other than its own self-refob - used when
    /// a behavior signals it is done (`ReceiveAction::Stop`) so the actual unregistration can
    /// still be gated on `try_terminate_and_act` seeing the owners/counters settle.
    pub async fn release_all(&mut self) -> Result<()> {
        let msgs = self.state.release_all();
        self.dispatch_releases(msgs).await
    }

    /// resolve `addr`'s control sink, distinguishing a target that simply isn't registered right
    /// now (already terminated, tolerated) from one that was never a valid actor address in this
    /// system at all (a programmer error - fatal, per the protocol's handling of a refob whose
    /// target never resolves).
    async fn resolve_sink(&self, addr: Addr) -> Result<Option<Arc<dyn ControlSink>>> {
        match self.system.control_sink(&addr).await {
            Some(sink) => Ok(Some(sink)),
            None if self.system.addr_ever_existed(&addr) => Ok(None),
            None => Err(GcError::UnresolvedTarget(format!("{addr:?}"))),
        }
    }

    async fn dispatch_release(&self, msg: ReleaseMsg<Addr>) -> Result<()> {
        let self_addr = self.addr();
        let target = msg.releasing.first().map(|r| r.target).or_else(|| msg.created.first().map(|r| r.target));
        match target {
            Some(target) => match self.resolve_sink(target).await? {
                Some(sink) => sink.send_release(msg).await,
                None => {
                    warn!("{:?}: no control sink for release target {:?}, dropping", self_addr, target);
                    Ok(())
                }
            },
            None => Ok(()),
        }
    }

    async fn dispatch_releases(&self, msgs: impl IntoIterator<Item = ReleaseMsg<Addr>>) -> Result<()> {
        let sends = msgs.into_iter().map(|msg| self.dispatch_release(msg));
        futures::future::try_join_all(sends).await?;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot<Addr> {
        self.state.snapshot(self.is_receptionist)
    }

    pub fn mark_receptionist(&mut self) {
        self.is_receptionist = true;
    }

    /// terminate the actor at `addr`: unregister it so no further message can be delivered, in
    /// response to a refob whose target never resolved to any actor this system ever spawned.
    async fn terminate_on_fatal_error(&self, err: &GcError) {
        error!("{:?}: fatal protocol error, terminating: {err}", self.addr());
        self.system.unregister(&self.addr()).await;
    }

    /* ---- internal control-message handling, never seen by Behavior::receive ------------- */

    async fn handle_release(&mut self, msg: crate::protocol::ReleaseMsg<Addr>) -> Result<()> {
        let from = msg.from;
        let ack = self.state.receive_release(msg);
        match self.resolve_sink(from).await? {
            Some(sink) => sink.send_ack_release(ack).await,
            None => {
                warn!("{:?}: no control sink to ack release to {:?}, dropping", self.addr(), from);
                Ok(())
            }
        }
    }

    async fn try_terminate_and_act(&mut self) -> bool {
        loop {
            match self.state.try_terminate() {
                TerminationOutcome::Stop => {
                    self.system.unregister(&self.addr()).await;
                    return true;
                }
                TerminationOutcome::ContinueWithReleases(msgs) => {
                    if let Err(e) = self.dispatch_releases(msgs).await {
                        self.terminate_on_fatal_error(&e).await;
                        return true;
                    }
                    // state was already updated synchronously inside `release`; loop once more
                    // to see whether we can now pass the owners/counters gate
                    continue;
                }
                TerminationOutcome::ContinueSelfCheck => {
                    let backoff = self.config.self_check_backoff();
                    let hself = self.hself.clone();
                    let _ = self.system.spawn_task("self-check-delay", async move {
                        tokio::time::sleep(backoff).await;
                        let _ = hself.send_msg(crate::protocol::SelfCheck).await;
                    });
                    return false;
                }
                TerminationOutcome::Continue => return false,
            }
        }
    }

    /// the task loop: receive one envelope at a time, route GC control traffic internally,
    /// hand application payloads to `behavior`, and re-check termination after every message -
    /// mirrors the shape of ODIN's actor task loop in `tokio_rt::actor_task`.
    async fn run<B>(&mut self, mut behavior: B, mut rx: tokio::sync::mpsc::Receiver<GcEnvelope<Addr, P>>)
    where
        B: Behavior<P>,
    {
        debug!("{:?} starting", self.addr());
        loop {
            let envelope = match rx.recv().await {
                Some(e) => e,
                None => break,
            };
            match envelope {
                GcEnvelope::App(AppMsg { travel_token, refs, payload }) => {
                    self.state.receive_app(&travel_token, &refs);
                    match behavior.receive(self, payload).await {
                        ReceiveAction::Continue => {}
                        ReceiveAction::Stop => {
                            // drop everything this actor holds; whether it can actually
                            // unregister is still gated by the owners/counters check below, the
                            // same as for any other envelope
                            if let Err(e) = self.release_all().await {
                                self.terminate_on_fatal_error(&e).await;
                                break;
                            }
                        }
                    }
                }
                GcEnvelope::Release(msg) => {
                    if let Err(e) = self.handle_release(msg).await {
                        self.terminate_on_fatal_error(&e).await;
                        break;
                    }
                }
                GcEnvelope::AckRelease(ack) => {
                    self.state.receive_ack_release(&ack);
                }
                GcEnvelope::SelfCheck(_) => {
                    trace!("{:?}: self-check", self.addr());
                }
            }

            if self.try_terminate_and_act().await {
                break;
            }
        }
        debug!("{:?} stopped", self.addr());
    }
}

/// spin up the root actor of a system: mints address 0's successor, registers its control sink,
/// and hands back the handle a driver program uses to talk to it.
pub async fn spawn_root<B, P, F>(system: &ActorSystem, config: GcConfig, make_behavior: F) -> Result<ActorHandle<P>>
where
    B: Behavior<P> + 'static,
    P: Send + 'static,
    F: FnOnce(Addr) -> B + Send + 'static,
{
    let addr = system.next_addr();
    let (tx, rx) = system.new_mailbox_with_bound::<P>(config.channel_bound);
    let handle = system.handle_for(addr, tx);
    system.register(addr, Arc::new(handle.clone()) as Arc<dyn ControlSink>).await;

    let mut state = ActorState::new(addr);
    state.set_strict_protocol(config.strict_protocol);
    let behavior = make_behavior(addr);
    let mut ctx = GcContext { state, hself: handle.clone(), system: system.clone(), config, is_receptionist: true };

    system.spawn_task("root", async move {
        ctx.run(behavior, rx).await;
    })?;

    Ok(handle)
}
