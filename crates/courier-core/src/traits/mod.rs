// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the forwarding worker and its collaborators.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility, so the
//! worker can hold them as `Arc<dyn ...>` and tests can swap in mocks.

pub mod connection;
pub mod credential;
pub mod store;

pub use connection::{Connector, InboundStream, RelayConnection};
pub use credential::CredentialDecryptor;
pub use store::RelayStore;
