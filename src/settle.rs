use std::future::Future;

use futures::future::join_all;

/// Outcomes of a batch, split by success.
#[derive(Debug)]
pub struct Settled<T, E> {
    pub fulfilled: Vec<T>,
    pub rejected: Vec<E>,
}

impl<T, E> Settled<T, E> {
    /// Hand each failure to `on_rejected` and keep the successes.
    pub fn into_fulfilled(self, mut on_rejected: impl FnMut(E)) -> Vec<T> {
        self.rejected.into_iter().for_each(&mut on_rejected);
        self.fulfilled
    }
}

/// Run every future concurrently and wait for all of them; one failure never
/// cancels the others.
pub async fn settle_all<I, F, T, E>(futures: I) -> Settled<T, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    let mut settled = Settled {
        fulfilled: vec![],
        rejected: vec![],
    };

    for outcome in join_all(futures).await {
        match outcome {
            Ok(value) => settled.fulfilled.push(value),
            Err(error) => settled.rejected.push(error),
        }
    }

    settled
}
