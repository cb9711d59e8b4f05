/*!
 * Size-bounded batching of translation texts.
 *
 * Two algorithms keep every provider request under a byte limit:
 * - `regroup_texts` packs an ordered list of texts into contiguous groups
 *   whose summed length fits the limit
 * - `split_long_texts` breaks any single text that is too long on its own into
 *   segments appended at the end of the batch, and `merge_back` reassembles
 *   the translated segments into their original slot
 */

use log::debug;
use std::collections::BTreeMap;

use crate::errors::PipelineError;

const LINE_BREAK: &str = "\n";
const SENTENCE_END: &str = ". ";

/// Pack `texts` into contiguous groups whose summed byte length is at most `max_len`
///
/// Greedy and stable: a text is appended to the current group while it fits,
/// otherwise it opens the next group. A text longer than `max_len` on its own
/// is an error; run it through `split_long_texts` first.
pub fn regroup_texts(texts: &[String], max_len: usize) -> Result<Vec<Vec<String>>, PipelineError> {
    let mut groups = Vec::new();
    let mut group: Vec<String> = Vec::new();
    let mut group_len = 0;

    for text in texts {
        let text_len = text.len();
        if text_len > max_len {
            return Err(PipelineError::TextTooLong { len: text_len, max: max_len });
        }

        if !group.is_empty() && group_len + text_len > max_len {
            groups.push(std::mem::take(&mut group));
            group_len = 0;
        }
        group.push(text.clone());
        group_len += text_len;
    }

    if !group.is_empty() {
        groups.push(group);
    }
    Ok(groups)
}

/// One appended segment of a split text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSegment {
    /// Position of the segment in the expanded batch
    pub index: usize,
    /// Text that joined this segment to the previous one in the source
    pub separator: &'static str,
}

/// Records where the segments of each split text were appended
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitMapping {
    original_len: usize,
    segments: BTreeMap<usize, Vec<SplitSegment>>,
}

impl SplitMapping {
    /// Length of the batch before splitting
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    /// Whether no text had to be split
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Appended indices for the text at `original_index`, in order
    pub fn indices(&self, original_index: usize) -> Option<Vec<usize>> {
        self.segments
            .get(&original_index)
            .map(|segments| segments.iter().map(|segment| segment.index).collect())
    }

    /// Length of the batch after splitting
    pub fn expanded_len(&self) -> usize {
        self.original_len + self.segments.values().map(Vec::len).sum::<usize>()
    }
}

/// Break every text longer than `max_len` into appended segments
///
/// The original slot of a split text is blanked and its segments are pushed
/// to the end of the batch. Returns the expanded batch and the mapping needed
/// by `merge_back`.
pub fn split_long_texts(
    mut texts: Vec<String>,
    max_len: usize,
) -> Result<(Vec<String>, SplitMapping), PipelineError> {
    let mut mapping = SplitMapping {
        original_len: texts.len(),
        segments: BTreeMap::new(),
    };

    for i in 0..mapping.original_len {
        if texts[i].len() <= max_len {
            continue;
        }

        let chunks = split_long_text(&texts[i], max_len)?;
        debug!(
            "Split text #{} ({} bytes) into {} segments",
            i,
            texts[i].len(),
            chunks.len()
        );

        let segments = mapping.segments.entry(i).or_default();
        for (chunk, separator) in chunks {
            segments.push(SplitSegment {
                index: texts.len(),
                separator,
            });
            texts.push(chunk);
        }
        texts[i].clear();
    }

    Ok((texts, mapping))
}

/// Reassemble split texts from the results of an expanded batch
///
/// Each original slot receives its segments' translations joined with the
/// separators they had in the source: a line break between segments cut at
/// a line boundary, nothing between segments cut at a sentence end (the
/// sentence keeps its trailing `". "`). An identity translation therefore
/// reproduces the source exactly. The result is truncated back to the
/// original length.
pub fn merge_back(mut results: Vec<String>, mapping: &SplitMapping) -> Result<Vec<String>, PipelineError> {
    if results.len() != mapping.expanded_len() {
        return Err(PipelineError::SplitMapping(format!(
            "expected {} results for the expanded batch, got {}",
            mapping.expanded_len(),
            results.len()
        )));
    }

    for (&original, segments) in &mapping.segments {
        let mut merged = String::new();
        for (k, segment) in segments.iter().enumerate() {
            let translated = results.get(segment.index).ok_or_else(|| {
                PipelineError::SplitMapping(format!(
                    "segment index {} of text #{} is out of range",
                    segment.index, original
                ))
            })?;
            if k > 0 {
                merged.push_str(segment.separator);
            }
            merged.push_str(translated);
        }
        results[original] = merged;
    }

    results.truncate(mapping.original_len);
    Ok(results)
}

/// Split one text on line breaks, then overlong lines on sentence ends,
/// and pack the pieces greedily into chunks of at most `max_len` bytes.
///
/// Each chunk carries the separator that preceded it in the source.
fn split_long_text(text: &str, max_len: usize) -> Result<Vec<(String, &'static str)>, PipelineError> {
    let mut pieces: Vec<(String, &'static str)> = Vec::new();

    for (line_no, line) in text.split(LINE_BREAK).enumerate() {
        let line_separator = if line_no == 0 { "" } else { LINE_BREAK };
        if line.len() <= max_len {
            pieces.push((line.to_string(), line_separator));
            continue;
        }

        let sentences: Vec<&str> = line.split(SENTENCE_END).collect();
        let last = sentences.len() - 1;
        for (k, sentence) in sentences.into_iter().enumerate() {
            let mut piece = sentence.to_string();
            if k < last {
                piece.push_str(SENTENCE_END);
            }
            let separator = if k == 0 { line_separator } else { "" };
            pieces.push((piece, separator));
        }
    }

    let mut chunks = Vec::new();
    let mut current: Option<(String, &'static str)> = None;

    for (piece, separator) in pieces {
        if piece.len() > max_len {
            return Err(PipelineError::TextTooLong { len: piece.len(), max: max_len });
        }

        let fits = matches!(
            &current,
            Some((chunk, _)) if chunk.len() + separator.len() + piece.len() <= max_len
        );
        if fits {
            if let Some((chunk, _)) = current.as_mut() {
                chunk.push_str(separator);
                chunk.push_str(&piece);
            }
        } else {
            chunks.extend(current.take());
            current = Some((piece, separator));
        }
    }
    chunks.extend(current);

    Ok(chunks)
}
