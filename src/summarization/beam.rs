// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Beam search decoding
//!
//! Model-agnostic: the caller supplies a step function that maps the current
//! beams to next-token logits, so the search can drive any seq2seq decoder.

use anyhow::Result;
use std::cmp::Ordering;

/// Decoding parameters for beam search.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Maximum sequence length, including the decoder start token
    pub max_length: usize,
    /// EOS is suppressed until a sequence reaches this length
    pub min_length: usize,
    pub num_beams: usize,
    /// Exponent applied to the hypothesis length when scoring finished beams
    pub length_penalty: f32,
    /// Stop as soon as `num_beams` hypotheses have finished
    pub early_stopping: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: 150,
            min_length: 40,
            num_beams: 4,
            length_penalty: 2.0,
            early_stopping: true,
        }
    }
}

/// Finished hypotheses, keeping only the `capacity` best.
#[derive(Debug)]
struct Hypotheses {
    capacity: usize,
    length_penalty: f32,
    early_stopping: bool,
    entries: Vec<(f32, Vec<u32>)>,
}

impl Hypotheses {
    fn new(config: &GenerationConfig, capacity: usize) -> Self {
        Self {
            capacity,
            length_penalty: config.length_penalty,
            early_stopping: config.early_stopping,
            entries: Vec::with_capacity(capacity + 1),
        }
    }

    fn normalized(&self, sum_logprobs: f32, len: usize) -> f32 {
        sum_logprobs / (len.max(1) as f32).powf(self.length_penalty)
    }

    fn worst_score(&self) -> f32 {
        self.entries
            .iter()
            .map(|(s, _)| *s)
            .fold(f32::INFINITY, f32::min)
    }

    fn add(&mut self, tokens: Vec<u32>, sum_logprobs: f32) {
        let score = self.normalized(sum_logprobs, tokens.len());
        if self.entries.len() < self.capacity || score > self.worst_score() {
            self.entries.push((score, tokens));
            if self.entries.len() > self.capacity {
                if let Some(worst) = self
                    .entries
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1 .0.partial_cmp(&b.1 .0).unwrap_or(Ordering::Equal))
                    .map(|(i, _)| i)
                {
                    self.entries.remove(worst);
                }
            }
        }
    }

    /// Whether no open beam can still beat the finished ones.
    fn is_done(&self, best_sum_logprobs: f32, cur_len: usize) -> bool {
        if self.entries.len() < self.capacity {
            return false;
        }
        if self.early_stopping {
            return true;
        }
        self.worst_score() >= self.normalized(best_sum_logprobs, cur_len)
    }

    fn into_best(self) -> Option<Vec<u32>> {
        self.entries
            .into_iter()
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal))
            .map(|(_, tokens)| tokens)
    }
}

/// Runs beam search from `start_token` until EOS hypotheses fill the beam
/// or `max_length` is reached.
///
/// `step` receives every live beam (all of equal length) and must return one
/// logits row per beam. The returned tokens exclude the start token and EOS.
pub fn beam_search<F>(
    config: &GenerationConfig,
    start_token: u32,
    eos_token: u32,
    mut step: F,
) -> Result<Vec<u32>>
where
    F: FnMut(&[Vec<u32>]) -> Result<Vec<Vec<f32>>>,
{
    let num_beams = config.num_beams.max(1);
    let mut beams: Vec<Vec<u32>> = vec![vec![start_token]; num_beams];
    // Identical beams at step 0: only the first may expand, or the top-k
    // would be filled with duplicates.
    let mut beam_scores: Vec<f32> = (0..num_beams)
        .map(|i| if i == 0 { 0.0 } else { -1e9 })
        .collect();
    let mut hypotheses = Hypotheses::new(config, num_beams);

    while beams[0].len() < config.max_length {
        let cur_len = beams[0].len();
        let logits = step(&beams)?;
        if logits.len() != beams.len() {
            anyhow::bail!(
                "Decoder returned {} logit rows for {} beams",
                logits.len(),
                beams.len()
            );
        }

        let mut candidates: Vec<(f32, usize, u32)> = Vec::new();
        for (beam_idx, row) in logits.iter().enumerate() {
            let mut logprobs = log_softmax(row);
            if cur_len < config.min_length {
                if let Some(eos) = logprobs.get_mut(eos_token as usize) {
                    *eos = f32::NEG_INFINITY;
                }
            }
            let base = beam_scores[beam_idx];
            candidates.extend(
                logprobs
                    .iter()
                    .enumerate()
                    .map(|(token, lp)| (base + lp, beam_idx, token as u32)),
            );
        }
        let top = top_k(candidates, 2 * num_beams);

        let mut next_beams = Vec::with_capacity(num_beams);
        let mut next_scores = Vec::with_capacity(num_beams);
        for (rank, (score, beam_idx, token)) in top.iter().copied().enumerate() {
            if !score.is_finite() {
                continue;
            }
            if token == eos_token {
                // Only EOS within the first num_beams candidates closes a hypothesis
                if rank < num_beams {
                    hypotheses.add(beams[beam_idx].clone(), score);
                }
            } else {
                let mut sequence = beams[beam_idx].clone();
                sequence.push(token);
                next_beams.push(sequence);
                next_scores.push(score);
            }
            if next_beams.len() == num_beams {
                break;
            }
        }

        if next_beams.is_empty() {
            break;
        }

        let best_next = next_scores
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        beams = next_beams;
        beam_scores = next_scores;

        if hypotheses.is_done(best_next, cur_len + 1) {
            return Ok(strip_start(hypotheses.into_best(), start_token));
        }
    }

    // Hit max_length: open beams count as finished.
    for (beam, score) in beams.into_iter().zip(beam_scores) {
        if score.is_finite() && score > -1e8 {
            hypotheses.add(beam, score);
        }
    }
    Ok(strip_start(hypotheses.into_best(), start_token))
}

fn strip_start(tokens: Option<Vec<u32>>, start_token: u32) -> Vec<u32> {
    let mut tokens = tokens.unwrap_or_default();
    if tokens.first() == Some(&start_token) {
        tokens.remove(0);
    }
    tokens
}

/// Numerically stable log-softmax.
pub fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![f32::NEG_INFINITY; logits.len()];
    }
    let log_sum = logits.iter().map(|&l| (l - max).exp()).sum::<f32>().ln() + max;
    logits.iter().map(|&l| l - log_sum).collect()
}

/// The `k` highest scoring candidates, best first.
fn top_k(mut candidates: Vec<(f32, usize, u32)>, k: usize) -> Vec<(f32, usize, u32)> {
    let descending =
        |a: &(f32, usize, u32), b: &(f32, usize, u32)| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal);
    if candidates.len() > k && k > 0 {
        candidates.select_nth_unstable_by(k - 1, descending);
        candidates.truncate(k);
    }
    candidates.sort_by(descending);
    candidates
}
