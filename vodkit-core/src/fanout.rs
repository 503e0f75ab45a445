//! "Settle all" fan-out for independent, supplementary work.
//!
//! [`settle_each`] is the ordered variant for branches that write the same
//! remote record.

use std::fmt::Display;

use futures::future::{BoxFuture, join_all};
use tracing::warn;

/// Outcome of one branch of [`settle_all`].
#[derive(Debug)]
pub struct Settled<E> {
    pub label: &'static str,
    pub result: Result<(), E>,
}

/// Run every branch to completion concurrently.
///
/// A failing branch never cancels its siblings. Failures are logged at
/// `warn` and returned so callers can inspect them if they care.
pub async fn settle_all<'a, E: Display>(
    context: &'static str,
    branches: Vec<(&'static str, BoxFuture<'a, Result<(), E>>)>,
) -> Vec<Settled<E>> {
    let (labels, futures): (Vec<_>, Vec<_>) = branches.into_iter().unzip();
    let results = join_all(futures).await;

    labels
        .into_iter()
        .zip(results)
        .map(|(label, result)| {
            if let Err(err) = &result {
                warn!(context, branch = label, error = %err, "fan-out branch failed");
            }
            Settled { label, result }
        })
        .collect()
}

/// Run every branch to completion, one after another in the given order.
///
/// Same failure handling as [`settle_all`].
pub async fn settle_each<'a, E: Display>(
    context: &'static str,
    branches: Vec<(&'static str, BoxFuture<'a, Result<(), E>>)>,
) -> Vec<Settled<E>> {
    let mut settled = Vec::with_capacity(branches.len());
    for (label, branch) in branches {
        let result = branch.await;
        if let Err(err) = &result {
            warn!(context, branch = label, error = %err, "fan-out branch failed");
        }
        settled.push(Settled { label, result });
    }
    settled
}
