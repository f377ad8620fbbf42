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

//! end-to-end test of the Tokio runtime harness: spawn a root, have it spawn a child, exchange
//! one message, release the child, and confirm both sides actually drop out of the system's
//! control-sink directory once `try_terminate` fires.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use actor_gc::prelude::*;

#[derive(Debug)]
enum PingMsg {
    SpawnAndGreet,
}

struct Parent {
    greeted: Arc<Mutex<Vec<String>>>,
}

impl Behavior<PingMsg> for Parent {
    async fn receive(&mut self, ctx: &mut GcContext<PingMsg>, msg: PingMsg) -> ReceiveAction {
        match msg {
            PingMsg::SpawnAndGreet => {
                let log = self.greeted.clone();
                let _child_ref = ctx
                    .spawn::<Child, _>("child", move |_addr| Child { log })
                    .await
                    .expect("spawn should succeed");
                ReceiveAction::Stop
            }
        }
    }
}

struct Child {
    log: Arc<Mutex<Vec<String>>>,
}

impl Behavior<PingMsg> for Child {
    async fn receive(&mut self, _ctx: &mut GcContext<PingMsg>, _msg: PingMsg) -> ReceiveAction {
        self.log.lock().unwrap().push("child saw a message".to_string());
        ReceiveAction::Stop
    }
}

#[tokio::test]
async fn parent_spawns_child_and_both_terminate() {
    let system = ActorSystem::new(DEFAULT_CHANNEL_BOUNDS);
    let log = Arc::new(Mutex::new(Vec::new()));

    let parent = spawn_root::<Parent, PingMsg, _>(&system, GcConfig::default(), {
        let log = log.clone();
        move |_addr| Parent { greeted: log }
    })
    .await
    .unwrap();

    let parent_addr = parent.addr();
    parent
        .send_msg(AppMsg { travel_token: new_token(&Addr::EXTERNAL, &mut 0), refs: vec![], payload: PingMsg::SpawnAndGreet })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(system.control_sink(&parent_addr).await.is_none(), "parent should have unregistered after stopping");
}
