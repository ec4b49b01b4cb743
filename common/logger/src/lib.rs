/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Initializes the process-wide `tracing` subscriber. Interactive mode logs
//! at span-per-mutation granularity; batch mode logs one span per
//! transaction, matching how much a human is expected to be watching.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Span per mutation: type creation, instance creation, casting writes.
    Interactive,
    /// Span per transaction only.
    Batch,
}

impl Verbosity {
    fn default_filter(self) -> &'static str {
        match self {
            Verbosity::Interactive => "info",
            Verbosity::Batch => "warn",
        }
    }
}

/// Installs the global subscriber. Safe to call more than once per process
/// only in tests, where `try_init` failures (subscriber already set) are
/// swallowed rather than panicking the test.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.default_filter()));
    let _ = tracing_subscriber::registry().with(filter).with(fmt::layer().with_target(true)).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_does_not_panic_when_called_twice() {
        init(Verbosity::Interactive);
        init(Verbosity::Batch);
    }
}
