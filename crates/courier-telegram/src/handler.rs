// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update routing from the teloxide dispatcher into the inbound stream.
//!
//! Both ordinary messages (groups, supergroups) and channel posts are
//! surfaced. Source filtering happens in the worker, not here.

use courier_core::InboundMessage;
use teloxide::dispatching::UpdateHandler;
use teloxide::RequestError;
use teloxide::prelude::*;
use tokio::sync::mpsc;
use tracing::debug;

/// Convert a Telegram message into the transport-neutral inbound form.
pub fn to_inbound(msg: &Message) -> InboundMessage {
    InboundMessage {
        chat_id: msg.chat.id.0,
        message_id: i64::from(msg.id.0),
    }
}

async fn push_inbound(msg: Message, tx: mpsc::Sender<InboundMessage>) -> ResponseResult<()> {
    let inbound = to_inbound(&msg);
    if tx.send(inbound).await.is_err() {
        debug!(chat_id = msg.chat.id.0, "inbound stream closed, dropping update");
    }
    respond(())
}

/// Dispatcher schema. Expects an `mpsc::Sender<InboundMessage>` dependency.
pub fn schema() -> UpdateHandler<RequestError> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(push_inbound))
        .branch(Update::filter_channel_post().endpoint(push_inbound))
}
