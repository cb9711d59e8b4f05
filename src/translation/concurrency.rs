/*!
 * Bounded fan-out of translation groups.
 *
 * Groups produced by the regrouper are split into at most `max_workers`
 * contiguous chunks of roughly equal size. Each chunk is handled by one
 * worker that processes its groups in order; the caller waits for every
 * worker before looking at the outcome, so no work is left running behind a
 * returned error.
 */

use futures::future::{join_all, BoxFuture};
use log::{debug, error};
use std::ops::Range;

use crate::errors::PipelineError;

/// Split `count` items into at most `max_workers` contiguous ranges
///
/// Earlier ranges take the remainder, so sizes differ by at most one.
/// `max_workers == 0` means unbounded: one range per item.
pub fn partition(count: usize, max_workers: usize) -> Vec<Range<usize>> {
    if count == 0 {
        return Vec::new();
    }

    let workers = if max_workers == 0 { count } else { max_workers.min(count) };
    let base = count / workers;
    let extra = count % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for worker in 0..workers {
        let size = base + usize::from(worker < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// Run `process` over every group with at most `max_workers` workers
///
/// `process` receives the group's index and texts and must return one result
/// per text. Results are concatenated in group order. If any worker fails,
/// the first error in group order is returned once all workers are done.
pub async fn fan_out<'a, F>(
    groups: Vec<Vec<String>>,
    max_workers: usize,
    process: F,
) -> Result<Vec<String>, PipelineError>
where
    F: Fn(usize, Vec<String>) -> BoxFuture<'a, Result<Vec<String>, PipelineError>>,
{
    let expected: usize = groups.iter().map(Vec::len).sum();
    let ranges = partition(groups.len(), max_workers);
    debug!("Dispatching {} groups to {} workers", groups.len(), ranges.len());

    let mut remaining = groups.into_iter().enumerate();
    let mut chunks: Vec<Vec<(usize, Vec<String>)>> = Vec::with_capacity(ranges.len());
    for range in &ranges {
        chunks.push(remaining.by_ref().take(range.len()).collect());
    }

    let process = &process;
    let workers = chunks.into_iter().map(|chunk| async move {
        let mut output = Vec::new();
        for (index, group) in chunk {
            let group_len = group.len();
            let translated = process(index, group).await?;
            if translated.len() != group_len {
                return Err(PipelineError::MergeMismatch {
                    expected: group_len,
                    actual: translated.len(),
                });
            }
            output.extend(translated);
        }
        Ok(output)
    });

    let mut merged = Vec::with_capacity(expected);
    for outcome in join_all(workers).await {
        merged.extend(outcome?);
    }

    if merged.len() != expected {
        error!("Merged {} translations for {} texts", merged.len(), expected);
        return Err(PipelineError::MergeMismatch {
            expected,
            actual: merged.len(),
        });
    }
    Ok(merged)
}
