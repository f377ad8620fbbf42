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

//! operating parameters the protocol leaves implementation-defined. Parsed from RON the same
//! way ODIN's actors load their `ron`-encoded config structs.

use serde::Deserialize;
use std::time::Duration;

use crate::errors::{GcError, Result};
use crate::DEFAULT_CHANNEL_BOUNDS;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    /// bound of the mpsc channel backing each actor's mailbox
    pub channel_bound: usize,

    /// how long a `try_terminate` that needs to wait for self-messages to drain backs off
    /// before re-enqueuing `SelfCheck`
    pub self_check_backoff_millis: u64,

    /// when set, protocol anomalies that are normally tolerated and logged (an unroutable
    /// refob, a release racing ahead of the creation it retires) are turned into panics -
    /// useful for test harnesses that want to fail fast on an invariant breach, never set by
    /// production actors
    pub strict_protocol: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            channel_bound: DEFAULT_CHANNEL_BOUNDS,
            self_check_backoff_millis: 5,
            strict_protocol: false,
        }
    }
}

impl GcConfig {
    pub fn self_check_backoff(&self) -> Duration {
        Duration::from_millis(self.self_check_backoff_millis)
    }

    pub fn from_ron_str(s: &str) -> Result<Self> {
        ron::from_str(s).map_err(|e| GcError::ConfigParseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_bounds() {
        let cfg = GcConfig::default();
        assert!(cfg.channel_bound > 0);
        assert!(!cfg.strict_protocol);
    }

    #[test]
    fn parses_partial_ron_overrides() {
        let cfg = GcConfig::from_ron_str("(strict_protocol: true)").unwrap();
        assert!(cfg.strict_protocol);
        assert_eq!(cfg.channel_bound, DEFAULT_CHANNEL_BOUNDS);
    }
}
