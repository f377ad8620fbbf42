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

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GcError>;

/// per the protocol's error-handling design: channel/runtime failures are real `Err`s that
/// propagate out of context operations, while recoverable protocol conditions (unexpected
/// release, missing counter) are logged and absorbed locally - they never surface here.
#[derive(Error, Debug)]
pub enum GcError {
    #[error("receiver closed")]
    ReceiverClosed,

    #[error("receiver queue full")]
    ReceiverFull,

    #[error("senders dropped")]
    SendersDropped,

    #[error("timeout error: {0:?}")]
    Timeout(Duration),

    #[error("refob precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("fatal: target address does not resolve to a live actor: {0}")]
    UnresolvedTarget(String),

    #[error("config parse error {0}")]
    ConfigParseError(String),

    // a generic error
    #[error("operation failed {0}")]
    OpFailed(String),
}

pub fn op_failed(msg: impl ToString) -> GcError {
    GcError::OpFailed(msg.to_string())
}

pub fn precondition_violation(msg: impl ToString) -> GcError {
    GcError::PreconditionViolation(msg.to_string())
}
