//! Ordered fallback
//!
//! Tries candidates strictly in order and stops at the first success. Every
//! failure is kept, in candidate order, so callers can report all of them.

use std::future::Future;

/// The candidate that succeeded, and the failures before it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstSuccess<T, E> {
    /// Index of the candidate that succeeded
    pub index: usize,
    /// Value it produced
    pub value: T,
    /// Failures of the earlier candidates, in candidate order
    pub failures: Vec<E>,
}

/// Run `attempt` against each candidate in order until one succeeds
///
/// # Returns
///
/// - `Ok(FirstSuccess)`: The first candidate that succeeded
/// - `Err(failures)`: One failure per candidate, in candidate order
///   (empty when there were no candidates)
pub async fn first_success<'a, C, T, E, F, Fut>(
    candidates: &'a [C],
    mut attempt: F,
) -> Result<FirstSuccess<T, E>, Vec<E>>
where
    F: FnMut(&'a C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut failures = Vec::with_capacity(candidates.len());

    for (index, candidate) in candidates.iter().enumerate() {
        match attempt(candidate).await {
            Ok(value) => {
                return Ok(FirstSuccess {
                    index,
                    value,
                    failures,
                });
            }
            Err(e) => failures.push(e),
        }
    }

    Err(failures)
}
