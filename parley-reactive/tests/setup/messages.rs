/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

#![allow(dead_code)]

use parley_reactive::prelude::*;

/// Request echoed back by test receivers.
#[parley_message(tag = "Echo")]
pub struct Echo {
    pub text: String,
}

#[parley_message(tag = "EchoReply")]
pub struct EchoReply {
    pub text: String,
}

/// Fault-injected request for exercising the attempt tracker end to end.
#[parley_message(tag = "Flaky", fault = fault)]
pub struct Flaky {
    pub label: String,
    #[serde(flatten)]
    pub fault: FaultSpecification,
}

#[parley_message(tag = "FlakyReply")]
pub struct FlakyReply {
    pub label: String,
}
