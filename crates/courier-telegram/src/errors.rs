// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of teloxide request errors onto [`ForwardError`].

use std::time::Duration;

use courier_core::ForwardError;
use teloxide::ApiError;
use teloxide::RequestError;

/// Classify a failed Bot API request.
pub fn classify(err: RequestError) -> ForwardError {
    match err {
        RequestError::RetryAfter(secs) => ForwardError::RateLimited {
            wait: Some(Duration::from_secs(u64::from(secs.seconds()))),
            message: format!("retry after {}s", secs.seconds()),
        },
        RequestError::Api(ApiError::MessageIsTooLong) => ForwardError::Retryable {
            message: ApiError::MessageIsTooLong.to_string(),
        },
        RequestError::Api(api) => {
            let message = api.to_string();
            if message.contains("Too Many Requests") {
                // 429 without retry_after parameters.
                return ForwardError::RateLimited {
                    wait: None,
                    message,
                };
            }
            ForwardError::Protocol {
                code: api_code(&api),
                message,
            }
        }
        RequestError::MigrateToChatId(chat) => ForwardError::Protocol {
            code: "MigrateToChatId".to_string(),
            message: format!("group migrated to supergroup {}", chat.0),
        },
        other => ForwardError::failure(other.to_string()),
    }
}

/// Variant name of an API error, used as its code.
fn api_code(api: &ApiError) -> String {
    let debug = format!("{api:?}");
    debug
        .split(['(', ' ', '{'])
        .next()
        .unwrap_or("Unknown")
        .to_string()
}
