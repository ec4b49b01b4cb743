/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

mod bootstrap;
pub mod commit_log;
pub mod database;
pub mod error;
pub mod fingerprint;
pub mod log;
pub mod reconciler;
pub mod transaction;
pub mod validator;

pub use commit_log::{CommitLogPayload, CommitLogSink, InMemorySink, NoOpSink};
pub use database::Database;
pub use error::TransactionError;
pub use reconciler::Reconciler;
pub use transaction::{CommitOutcome, Transaction, TransactionKind};
pub use validator::ValidationFailure;
