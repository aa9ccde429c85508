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

use std::time::Duration;

use tracing::info;

use crate::common::ReplyDispatcher;
use crate::samples::{
    AdvancedMessage, ExceptionMessage, ProcessTimeoutRequest, ProcessTimeoutResponse,
    RectangularPrismRequest, RectangularPrismResponse, SimpleMessage,
};

/// Registers the receiver-side handlers for every sample message kind.
pub fn register_receiver_handlers(dispatcher: &ReplyDispatcher) {
    dispatcher
        .on_message(handle_simple_message)
        .on_message(handle_advanced_message)
        .on_message(handle_exception_message)
        .on_request(handle_rectangular_prism)
        .on_request(handle_process_timeout);
}

async fn handle_simple_message(message: SimpleMessage) -> anyhow::Result<()> {
    info!(text = %message.text, "simple message received");
    Ok(())
}

async fn handle_advanced_message(message: AdvancedMessage) -> anyhow::Result<()> {
    info!(
        name = %message.name,
        surname = %message.surname,
        age = message.age,
        city = %message.address.city,
        "advanced message received"
    );
    Ok(())
}

// Only reached once the attempt tracker lets the message through.
async fn handle_exception_message(message: ExceptionMessage) -> anyhow::Result<()> {
    info!(
        succeed_on = message.fault.succeed_on_attempt,
        "exception message succeeded"
    );
    Ok(())
}

/// Computes surface area and volume.
pub async fn handle_rectangular_prism(
    request: RectangularPrismRequest,
) -> anyhow::Result<RectangularPrismResponse> {
    info!(%request, "rectangular prism request received");
    let response = RectangularPrismResponse::for_edges(request.edge_a, request.edge_b, request.edge_c);
    info!(%response, "sending rectangular prism response");
    Ok(response)
}

/// Sleeps for the requested time, then answers with the caller's process name.
pub async fn handle_process_timeout(
    request: ProcessTimeoutRequest,
) -> anyhow::Result<ProcessTimeoutResponse> {
    info!(
        process = %request.process_name,
        milliseconds = request.milliseconds_timeout,
        "process timeout request received"
    );
    tokio::time::sleep(Duration::from_millis(request.milliseconds_timeout)).await;
    Ok(ProcessTimeoutResponse {
        process_name: request.process_name,
    })
}
