//! Concurrent processing of SQS batches with partial batch responses.

use std::fmt;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::future::{self, BoxFuture};
use futures::{FutureExt, StreamExt, stream};
use tracing::warn;

use super::RequestHandler;
use crate::Error;
use crate::log::{LOGGER_TARGET, error_chain};
use crate::schemas::{LambdaCheckpointItem, LambdaCheckpointResponse, SqsEvent, SqsRecord};

/// Runs `func` on every record body of a batch, at most `max_workers` at a time.
///
/// A record whose body handler fails or panics is reported back by message id
/// so SQS only redelivers that record. The batch itself always succeeds.
pub struct ParallelSqs<F, B> {
    func: F,
    max_workers: usize,
    _body: PhantomData<fn(B)>,
}

impl<F: fmt::Debug, B> fmt::Debug for ParallelSqs<F, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelSqs")
            .field("func", &self.func)
            .field("max_workers", &self.max_workers)
            .finish()
    }
}

/// `max_workers` below one is treated as one.
pub fn parallel_sqs_handler<B, F>(max_workers: usize, func: F) -> ParallelSqs<F, B>
where
    B: Send + 'static,
    F: RequestHandler<B>,
{
    ParallelSqs {
        func,
        max_workers: max_workers.max(1),
        _body: PhantomData,
    }
}

impl<F, B> ParallelSqs<F, B>
where
    B: Send + 'static,
    F: RequestHandler<B>,
{
    #[must_use]
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    async fn process(&self, record: SqsRecord<B>) -> Option<LambdaCheckpointItem> {
        let SqsRecord { message_id, body, .. } = record;

        match AssertUnwindSafe(self.func.handle(body)).catch_unwind().await {
            Ok(Ok(_)) => None,
            Ok(Err(error)) => {
                warn!(
                    target: LOGGER_TARGET,
                    message_id = %message_id,
                    error = %error_chain(&*error),
                    "sqs_record_failed"
                );
                Some(LambdaCheckpointItem {
                    item_identifier: message_id,
                })
            }
            Err(_) => {
                warn!(target: LOGGER_TARGET, message_id = %message_id, "sqs_record_panicked");
                Some(LambdaCheckpointItem {
                    item_identifier: message_id,
                })
            }
        }
    }
}

#[async_trait]
impl<F, B> RequestHandler<SqsEvent<B>> for ParallelSqs<F, B>
where
    B: Send + 'static,
    F: RequestHandler<B>,
{
    type Response = LambdaCheckpointResponse;

    async fn handle(&self, event: SqsEvent<B>) -> Result<LambdaCheckpointResponse, Error> {
        let pending: Vec<BoxFuture<'_, Option<LambdaCheckpointItem>>> = event
            .records
            .into_iter()
            .map(|record| self.process(record).boxed())
            .collect();

        let failures: LambdaCheckpointResponse = stream::iter(pending)
            .buffered(self.max_workers)
            .filter_map(future::ready)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect();

        if !failures.is_empty() {
            warn!(
                target: LOGGER_TARGET,
                failed = failures.batch_item_failures.len(),
                "sqs_batch_partial_failure"
            );
        }
        Ok(failures)
    }
}
