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

//! Sample message kinds and the receiver-side handlers for them.
//!
//! | Message | Pattern | Behavior |
//! |---------|---------|----------|
//! | [`SimpleMessage`] | send-only | logs its text |
//! | [`AdvancedMessage`] | send-only | logs the person and address |
//! | [`ExceptionMessage`] | send-only | fails until its fault specification allows success |
//! | [`RectangularPrismRequest`] | send-and-reply | surface area and volume, fault-injected |
//! | [`ProcessTimeoutRequest`] | send-and-reply | sleeps, then echoes the process name |

pub use generator::RandomMessageGenerator;
pub use handlers::{handle_process_timeout, handle_rectangular_prism, register_receiver_handlers};
pub use messages::{
    AdvancedMessage, AdvancedMessageAddress, ExceptionMessage, ProcessTimeoutRequest,
    ProcessTimeoutResponse, RectangularPrismRequest, RectangularPrismResponse, SimpleMessage,
};

mod generator;
mod handlers;
mod messages;
