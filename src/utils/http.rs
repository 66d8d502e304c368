// src/utils/http.rs

//! HTTP client utilities.

use std::error::Error as StdError;

use reqwest::redirect::{Attempt, Policy};
use thiserror::Error;

use crate::error::FetchError;
use crate::models::FetchConfig;

/// Raised from the redirect policy when the chain is already at its cap.
#[derive(Error, Debug)]
#[error("preventing redirect (after {hops} earlier request(s)) to {destination}")]
pub struct RedirectRefused {
    pub destination: String,
    pub hops: usize,
}

/// Create a configured asynchronous HTTP client.
///
/// The request timeout comes from `fetch.timeout_secs`; redirects follow
/// [`bounded_redirects`].
pub fn create_client(config: &FetchConfig) -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout())
        .redirect(bounded_redirects(config.max_redirects))
        .build()?;
    Ok(client)
}

/// Redirect policy refusing any redirect once `max_chain` requests have been
/// made in the current chain. Every redirect is logged with its chain.
pub fn bounded_redirects(max_chain: usize) -> Policy {
    Policy::custom(move |attempt| {
        log_redirect(&attempt);

        let hops = attempt.previous().len();
        if hops < max_chain {
            attempt.follow()
        } else {
            let destination = attempt.url().to_string();
            attempt.error(RedirectRefused { destination, hops })
        }
    })
}

fn log_redirect(attempt: &Attempt<'_>) {
    let chain = attempt
        .previous()
        .iter()
        .enumerate()
        .map(|(i, url)| format!("via{i}={url}"))
        .collect::<Vec<_>>()
        .join(", ");
    log::warn!(
        "Redirected ({}) to {} [{}]",
        attempt.status(),
        attempt.url(),
        chain
    );
}

/// Map a client error to the fetch taxonomy, surfacing refused redirects.
pub fn classify_error(err: reqwest::Error) -> FetchError {
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(refused) = inner.downcast_ref::<RedirectRefused>() {
            return FetchError::TooManyRedirects {
                destination: refused.destination.clone(),
                hops: refused.hops,
            };
        }
        source = inner.source();
    }
    FetchError::Http(err)
}
