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

//! a root actor spawns a greeter, talks to it once, then releases it and lets its own
//! `try_terminate` loop notice the mailbox is empty and stop - the simplest end-to-end run of
//! the GC protocol over real Tokio tasks.
#![allow(unused)]

use std::time::Duration;

use actor_gc::prelude::*;

#[derive(Debug)]
enum GreeterMsg {
    Greet(String),
}

struct Greeter;

impl Behavior<GreeterMsg> for Greeter {
    async fn receive(&mut self, _ctx: &mut GcContext<GreeterMsg>, msg: GreeterMsg) -> ReceiveAction {
        match msg {
            GreeterMsg::Greet(name) => {
                println!("hello {name}!");
                ReceiveAction::Stop
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let system = ActorSystem::new(DEFAULT_CHANNEL_BOUNDS);
    let handle = spawn_root::<Greeter, GreeterMsg, _>(&system, GcConfig::default(), |_addr| Greeter).await?;

    // main() is not itself a GC-tracked actor, so it mints a throwaway token off the reserved
    // external address rather than a refob it owns - see `Addr::EXTERNAL`.
    handle
        .send_msg(AppMsg { travel_token: new_token(&Addr::EXTERNAL, &mut 0), refs: vec![], payload: GreeterMsg::Greet("world".to_string()) })
        .await?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
