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

use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::common::config::TracingConfig;

/// Installs the global tracing subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over `config.filter`. With a log directory
/// configured, output goes through a non-blocking file appender and the
/// returned guard must be held for as long as logs should be flushed;
/// otherwise output goes to stdout and `None` is returned.
///
/// Installing a second subscriber is a no-op.
///
/// # Panics
///
/// Panics if the log directory cannot be created.
pub fn init_tracing(config: &TracingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::NONE)
        .with_target(true)
        .compact();

    match &config.log_directory {
        Some(directory) => {
            let appender = RollingFileAppender::new(Rotation::NEVER, directory, &config.log_file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let subscriber = builder.with_ansi(false).with_writer(writer).finish();
            if tracing::subscriber::set_global_default(subscriber).is_err() {
                debug!("tracing subscriber already installed");
            }
            Some(guard)
        }
        None => {
            let subscriber = builder.with_ansi(config.ansi).finish();
            if tracing::subscriber::set_global_default(subscriber).is_err() {
                debug!("tracing subscriber already installed");
            }
            None
        }
    }
}
