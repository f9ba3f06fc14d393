use std::panic;

use futures::{future::BoxFuture, FutureExt, StreamExt};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{
    client::EventStream,
    error::Error,
    subscription::{Completion, Subscription},
};

type Opener = Box<dyn FnOnce() -> BoxFuture<'static, Result<Opened, Error>> + Send>;

/// Drives a set of subscriptions, one worker per subscription.
#[derive(Default)]
pub struct Runtime {
    openers: Vec<Opener>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscription. Streams are opened in the order subscriptions are added.
    pub fn with<S>(mut self, mut subscription: S) -> Self
    where
        S: Subscription + Send + 'static,
    {
        self.openers.push(Box::new(move || {
            async move {
                let stream = subscription.subscribe().await?;
                Ok::<_, Error>(Opened {
                    kind: subscription.kind().to_owned(),
                    completion: subscription.is_complete(),
                    worker: Box::new(move |shutdown| drive(subscription, stream, shutdown).boxed()),
                })
            }
            .boxed()
        }));
        self
    }

    /// Opens every subscription's stream, then reconciles events until all workers end.
    ///
    /// Cancelling `shutdown` stops every worker at its next stream read.
    /// Fails if any stream cannot be opened; no worker is started in that case.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), RunError> {
        let mut opened = Vec::with_capacity(self.openers.len());
        for open in self.openers {
            let subscription = tokio::select! {
                biased;
                () = shutdown.cancelled() => return Err(RunError::Cancelled),
                result = open() => result.map_err(RunError::Subscribe)?,
            };
            opened.push(subscription);
        }

        let mut workers = JoinSet::new();
        let mut completions = Vec::with_capacity(opened.len());
        for Opened {
            kind,
            completion,
            worker,
        } in opened
        {
            workers.spawn(worker(shutdown.child_token()));
            completions.push((kind, completion));
        }

        while let Some(result) = workers.join_next().await {
            if let Err(err) = result {
                if let Ok(panic) = err.try_into_panic() {
                    panic::resume_unwind(panic)
                }
            }
        }

        for (kind, completion) in completions {
            if !completion.is_complete() {
                tracing::warn!(
                    subscription = %kind,
                    "Subscription stopped without completing"
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to start subscription: {0}")]
    Subscribe(#[source] Error),
    #[error("shutdown requested while opening subscriptions")]
    Cancelled,
}

struct Opened {
    kind: String,
    completion: Completion,
    worker: Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, ()> + Send>,
}

async fn drive<S: Subscription>(
    mut subscription: S,
    mut stream: EventStream<S::Object>,
    shutdown: CancellationToken,
) {
    let kind = subscription.kind().to_owned();
    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                subscription.close();
                tracing::info!(subscription = %kind, "Closed watch stream");
                return;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(event)) => subscription.reconcile(&event.object, event.kind).await,
            Some(Err(err)) => tracing::error!(
                subscription = %kind,
                error = %err,
                "Watch stream reported an error"
            ),
            None => {
                tracing::warn!(subscription = %kind, "Watch stream ended");
                return;
            }
        }
    }
}
