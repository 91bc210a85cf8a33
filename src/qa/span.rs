// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Answer span decoding from start/end logits

/// Longest answer, in tokens, the reader will return
pub const MAX_ANSWER_TOKENS: usize = 15;

/// Best token span found in one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanCandidate {
    /// First token of the answer (inclusive)
    pub start: usize,
    /// Last token of the answer (inclusive)
    pub end: usize,
    /// `p_start * p_end` under softmax over the context tokens and `[CLS]`
    pub score: f32,
}

/// Picks the highest scoring span whose tokens all belong to the context.
///
/// Probabilities come from a softmax over the context positions plus
/// `cls_index`, which takes probability mass but is never a candidate. This
/// keeps scores comparable across windows: a window where the reader prefers
/// "no answer" scores lower.
/// Spans must satisfy `start <= end` and `end - start + 1 <= max_answer_tokens`.
/// Returns `None` when no position is marked as context.
pub fn best_span(
    start_logits: &[f32],
    end_logits: &[f32],
    is_context: &[bool],
    cls_index: Option<usize>,
    max_answer_tokens: usize,
) -> Option<SpanCandidate> {
    let len = start_logits.len().min(end_logits.len()).min(is_context.len());
    if !is_context[..len].iter().any(|&c| c) {
        return None;
    }

    let mut normaliser = is_context[..len].to_vec();
    if let Some(cls) = cls_index.filter(|&i| i < len) {
        normaliser[cls] = true;
    }
    let start_probs = masked_softmax(&start_logits[..len], &normaliser)?;
    let end_probs = masked_softmax(&end_logits[..len], &normaliser)?;

    let mut best: Option<SpanCandidate> = None;
    for start in (0..len).filter(|&i| is_context[i]) {
        let limit = (start + max_answer_tokens.max(1)).min(len);
        for end in start..limit {
            if !is_context[end] {
                // Context tokens are contiguous; a gap ends the window.
                break;
            }
            let score = start_probs[start] * end_probs[end];
            if best.map_or(true, |b| score > b.score) {
                best = Some(SpanCandidate { start, end, score });
            }
        }
    }
    best
}

/// Softmax over masked positions; unmasked positions get probability 0.
fn masked_softmax(logits: &[f32], mask: &[bool]) -> Option<Vec<f32>> {
    let max = logits
        .iter()
        .zip(mask)
        .filter(|(_, &m)| m)
        .map(|(&l, _)| l)
        .fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return None;
    }

    let exps: Vec<f32> = logits
        .iter()
        .zip(mask)
        .map(|(&l, &m)| if m { (l - max).exp() } else { 0.0 })
        .collect();
    let sum: f32 = exps.iter().sum();
    Some(exps.into_iter().map(|e| e / sum).collect())
}
