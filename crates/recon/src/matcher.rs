use std::collections::HashMap;

use rayon::prelude::*;

use crate::config::{MatchingConfig, SelectionPolicy};
use crate::fuzz::partial_ratio;
use crate::model::{KeyedRecord, MatchOutput, MatchedPair, RejectionTally};

/// Amount difference used when either side's amount did not parse.
/// No finite tolerance accepts it.
pub const UNPARSEABLE_AMOUNT_DIFF: f64 = f64::INFINITY;

/// Scores for one (left, right) candidate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub party_score: u8,
    pub amount_diff: f64,
    pub tax_id_match: bool,
}

/// Outcome of the three acceptance gates, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    PartyBelowThreshold,
    AmountOutsideTolerance,
    TaxIdMismatch,
}

/// An empty tax-ID key on either side means "no evidence", so it passes.
pub fn tax_ids_agree(left: &str, right: &str) -> bool {
    left.is_empty() || right.is_empty() || left == right
}

pub fn amount_diff(left: Option<f64>, right: Option<f64>) -> f64 {
    match (left, right) {
        (Some(l), Some(r)) => (l - r).abs(),
        _ => UNPARSEABLE_AMOUNT_DIFF,
    }
}

pub fn score_candidate(left: &KeyedRecord, right: &KeyedRecord) -> CandidateScore {
    CandidateScore {
        party_score: partial_ratio(&left.key.party_key, &right.key.party_key),
        amount_diff: amount_diff(left.amount, right.amount),
        tax_id_match: tax_ids_agree(&left.key.tax_id_key, &right.key.tax_id_key),
    }
}

pub fn judge(score: &CandidateScore, threshold: u8, amount_tolerance: f64) -> Verdict {
    if score.party_score < threshold {
        Verdict::PartyBelowThreshold
    } else if score.amount_diff.is_nan() || score.amount_diff > amount_tolerance {
        Verdict::AmountOutsideTolerance
    } else if !score.tax_id_match {
        Verdict::TaxIdMismatch
    } else {
        Verdict::Accept
    }
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// Left rows and right rows sharing one normalized invoice key.
/// Positions index into the keyed slices, in original table order.
#[derive(Debug)]
struct Bucket<'a> {
    key: &'a str,
    left: Vec<usize>,
    right: &'a [usize],
}

#[derive(Debug, Default)]
struct BucketOutcome {
    matched: Vec<MatchedPair>,
    unmatched_left: Vec<usize>,
    claimed_right: Vec<usize>,
    tally: RejectionTally,
}

fn index_by_invoice(records: &[KeyedRecord]) -> HashMap<&str, Vec<usize>> {
    let mut map: HashMap<&str, Vec<usize>> = HashMap::new();
    for (pos, rec) in records.iter().enumerate() {
        map.entry(rec.key.invoice_key.as_str()).or_default().push(pos);
    }
    map
}

/// Group left rows by invoice key in order of first appearance.
fn build_buckets<'a>(
    left: &'a [KeyedRecord],
    right_index: &'a HashMap<&'a str, Vec<usize>>,
) -> Vec<Bucket<'a>> {
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<Bucket<'a>> = Vec::new();
    for (pos, rec) in left.iter().enumerate() {
        let key = rec.key.invoice_key.as_str();
        let idx = *slot.entry(key).or_insert_with(|| {
            buckets.push(Bucket {
                key,
                left: Vec::new(),
                right: right_index.get(key).map(|v| v.as_slice()).unwrap_or(&[]),
            });
            buckets.len() - 1
        });
        buckets[idx].left.push(pos);
    }
    buckets
}

/// Sequential claim loop within one bucket. Later left rows see the shrunken pool.
fn match_bucket(
    bucket: &Bucket<'_>,
    left: &[KeyedRecord],
    right: &[KeyedRecord],
    matching: &MatchingConfig,
) -> BucketOutcome {
    let mut out = BucketOutcome::default();
    let mut claimed = vec![false; bucket.right.len()];

    for &lpos in &bucket.left {
        let l = &left[lpos];
        if bucket.right.is_empty() {
            out.tally.no_candidate += 1;
            out.unmatched_left.push(l.row);
            continue;
        }

        let mut chosen: Option<(usize, CandidateScore)> = None;
        for (slot, &rpos) in bucket.right.iter().enumerate() {
            if claimed[slot] {
                continue;
            }
            let r = &right[rpos];
            let score = score_candidate(l, r);
            out.tally.candidates_scored += 1;

            match judge(&score, matching.threshold, matching.amount_tolerance) {
                Verdict::Accept => {}
                verdict => {
                    match verdict {
                        Verdict::PartyBelowThreshold => out.tally.rejected_party += 1,
                        Verdict::AmountOutsideTolerance => out.tally.rejected_amount += 1,
                        Verdict::TaxIdMismatch => out.tally.rejected_tax_id += 1,
                        Verdict::Accept => {}
                    }
                    log::trace!(
                        "invoice '{}': left row {} vs right row {} rejected ({:?}, score {}, diff {})",
                        bucket.key,
                        l.row,
                        r.row,
                        verdict,
                        score.party_score,
                        score.amount_diff,
                    );
                    continue;
                }
            }

            match matching.selection {
                SelectionPolicy::FirstMatch => {
                    chosen = Some((slot, score));
                    break;
                }
                SelectionPolicy::BestScore => {
                    // Strictly greater keeps the earliest right row on ties
                    if chosen.map_or(true, |(_, best)| score.party_score > best.party_score) {
                        chosen = Some((slot, score));
                    }
                }
            }
        }

        match chosen {
            Some((slot, score)) => {
                claimed[slot] = true;
                let r = &right[bucket.right[slot]];
                out.claimed_right.push(bucket.right[slot]);
                out.matched.push(MatchedPair {
                    left_row: l.row,
                    right_row: r.row,
                    fuzzy_score: score.party_score,
                    amount_diff: score.amount_diff,
                    tax_id_match: score.tax_id_match,
                });
            }
            None => out.unmatched_left.push(l.row),
        }
    }

    out
}

/// Link left records to right records on an exact invoice key, gated by
/// party similarity, amount tolerance and tax-ID agreement.
///
/// Every left record ends up matched or unmatched; each right record is
/// claimed at most once. Buckets are independent, so `parallel` only changes
/// scheduling, never the result.
pub fn match_records(
    left: &[KeyedRecord],
    right: &[KeyedRecord],
    matching: &MatchingConfig,
) -> MatchOutput {
    let right_index = index_by_invoice(right);
    let buckets = build_buckets(left, &right_index);

    log::debug!(
        "matching {} left rows against {} right rows in {} buckets ({} distinct right keys)",
        left.len(),
        right.len(),
        buckets.len(),
        right_index.len(),
    );

    let outcomes: Vec<BucketOutcome> = if matching.parallel {
        buckets
            .par_iter()
            .map(|b| match_bucket(b, left, right, matching))
            .collect()
    } else {
        buckets
            .iter()
            .map(|b| match_bucket(b, left, right, matching))
            .collect()
    };

    let mut matched = Vec::new();
    let mut unmatched_left = Vec::new();
    let mut right_claimed = vec![false; right.len()];
    let mut tally = RejectionTally::default();

    for outcome in outcomes {
        matched.extend(outcome.matched);
        unmatched_left.extend(outcome.unmatched_left);
        for rpos in outcome.claimed_right {
            right_claimed[rpos] = true;
        }
        tally.absorb(&outcome.tally);
    }

    matched.sort_by_key(|m| m.left_row);
    unmatched_left.sort_unstable();

    let unmatched_right: Vec<usize> = right
        .iter()
        .enumerate()
        .filter(|(pos, _)| !right_claimed[*pos])
        .map(|(_, r)| r.row)
        .collect();

    MatchOutput {
        matched,
        unmatched_left,
        unmatched_right,
        tally,
        buckets: buckets.len(),
    }
}
