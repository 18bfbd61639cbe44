//! Sequential chunked processing.

use std::future::Future;

use crate::error::BatchError;

/// Apply `transform` to consecutive chunks of `items`, one chunk at a time.
///
/// `items` is split into chunks of `batch_size` (the last one may be
/// shorter). Each chunk is awaited before the next starts, and the outputs
/// are concatenated in chunk order, so the result lines up with the input.
/// An empty input returns an empty vector without calling `transform`.
///
/// # Errors
///
/// - [`BatchError::InvalidBatchSize`] if `batch_size` is zero, checked before
///   anything runs.
/// - [`BatchError::Chunk`] with the first failing chunk's error. Later chunks
///   are not run and results of earlier chunks are discarded.
///
/// # Example
///
/// ```
/// # tokio_test::block_on(async {
/// use backstop_gate::process_batch;
///
/// let doubled = process_batch(vec![1, 2, 3, 4, 5], 2, |chunk: Vec<i32>| async move {
///     Ok::<_, std::convert::Infallible>(chunk.into_iter().map(|x| x * 2).collect())
/// })
/// .await
/// .unwrap();
///
/// assert_eq!(doubled, vec![2, 4, 6, 8, 10]);
/// # });
/// ```
pub async fn process_batch<I, T, R, E, F, Fut>(
    items: I,
    batch_size: usize,
    mut transform: F,
) -> Result<Vec<R>, BatchError<E>>
where
    I: IntoIterator<Item = T>,
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<Vec<R>, E>>,
{
    if batch_size == 0 {
        return Err(BatchError::InvalidBatchSize);
    }

    let mut remaining = items.into_iter().peekable();
    let mut results = Vec::with_capacity(remaining.size_hint().0);
    let mut index = 0;

    while remaining.peek().is_some() {
        let chunk: Vec<T> = remaining.by_ref().take(batch_size).collect();
        let chunk_len = chunk.len();
        tracing::debug!(chunk = index, size = chunk_len, "processing batch chunk");

        match transform(chunk).await {
            Ok(mut output) => results.append(&mut output),
            Err(error) => {
                tracing::warn!(chunk = index, size = chunk_len, "batch chunk failed, aborting batch");
                return Err(BatchError::Chunk { index, error });
            }
        }
        index += 1;
    }

    Ok(results)
}
