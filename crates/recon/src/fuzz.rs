//! String similarity on a 0-100 scale.
//!
//! Scores come from a longest-matching-block sequence matcher (the classic
//! Ratcliff/Obershelp `SequenceMatcher`): `ratio = 2*M / (len_a + len_b)`
//! where `M` is the total size of the matching blocks. `partial_ratio` anchors
//! a window of the shorter string's length at every matching block of the
//! longer string and keeps the best window ratio. Reported integers are
//! rounded half-to-even.

use std::collections::HashMap;

/// Sequences at least this long get their popular elements junked.
const AUTOJUNK_MIN_LEN: usize = 200;

/// A window ratio above this reports as a full match.
const FULL_MATCH_RATIO: f64 = 0.995;

/// A run of `size` equal elements at `a[a_start..]` and `b[b_start..]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Block {
    a_start: usize,
    b_start: usize,
    size: usize,
}

struct SequenceMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Positions of each element of `b`, ascending. Popular elements are left out.
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }
        if b.len() >= AUTOJUNK_MIN_LEN {
            let ntest = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= ntest);
        }
        Self { a, b, b2j }
    }

    /// Longest block inside `a[alo..ahi]` x `b[blo..bhi]`; earliest in `a`,
    /// then earliest in `b`, on ties.
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Block {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular elements are missing from b2j; grow the block across them.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        Block { a_start: besti, b_start: bestj, size: bestsize }
    }

    /// Non-adjacent matching blocks in ascending order, closed by a
    /// zero-size sentinel at `(len_a, len_b)`.
    fn matching_blocks(&self) -> Vec<Block> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let block = self.find_longest_match(alo, ahi, blo, bhi);
            if block.size == 0 {
                continue;
            }
            let (i, j, k) = (block.a_start, block.b_start, block.size);
            blocks.push(block);
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        blocks.sort();

        let mut merged: Vec<Block> = Vec::with_capacity(blocks.len() + 1);
        for block in blocks {
            if let Some(last) = merged.last_mut() {
                if last.a_start + last.size == block.a_start
                    && last.b_start + last.size == block.b_start
                {
                    last.size += block.size;
                    continue;
                }
            }
            merged.push(block);
        }
        merged.push(Block { a_start: la, b_start: lb, size: 0 });
        merged
    }

    fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matches: usize = self.matching_blocks().iter().map(|b| b.size).sum();
        2.0 * matches as f64 / total as f64
    }
}

/// Best block-anchored window ratio in `0.0..=1.0`. `a` plays the shorter
/// role when the lengths tie.
fn partial_ratio_raw(a: &[char], b: &[char]) -> f64 {
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let matcher = SequenceMatcher::new(shorter, longer);

    let mut best = 0.0f64;
    for block in matcher.matching_blocks() {
        let start = block.b_start.saturating_sub(block.a_start);
        let end = (start + shorter.len()).min(longer.len());
        let window = &longer[start..end];
        let r = SequenceMatcher::new(shorter, window).ratio();
        if r > FULL_MATCH_RATIO {
            return 1.0;
        }
        best = best.max(r);
    }
    best
}

/// Best-aligned substring similarity as a float score, 0.0-100.0.
pub fn partial_ratio_f64(a: &str, b: &str) -> f64 {
    if a == b {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    100.0 * partial_ratio_raw(&a, &b)
}

/// Partial-ratio similarity, 0-100.
///
/// Equal strings (including two empty ones) score 100, exactly one empty
/// scores 0. For equal lengths the first argument is the one slid over the
/// second, so the score is not symmetric.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    round_score(partial_ratio_f64(a, b))
}

/// Full-string sequence-matcher similarity, 0-100.
pub fn ratio(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    round_score(100.0 * SequenceMatcher::new(&a, &b).ratio())
}

fn round_score(score: f64) -> u8 {
    score.round_ties_even().clamp(0.0, 100.0) as u8
}
