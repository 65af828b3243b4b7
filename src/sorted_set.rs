use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Ordering key of the score index: by score, then by member bytes.
#[derive(Debug, Clone)]
struct ScoreKey {
    score: f64,
    member: String,
}

impl PartialEq for ScoreKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoreKey {}

impl PartialOrd for ScoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoreKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.member.as_bytes().cmp(other.member.as_bytes()))
    }
}

/// A set of unique members, each with a score, iterable in ascending score order.
///
/// Two structures are kept in sync: a map for member lookups and an ordered index for
/// range queries.
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    scores: HashMap<String, f64>,
    by_score: BTreeSet<ScoreKey>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Inserts `member` or updates its score. Returns true if the member is new.
    pub fn add(&mut self, member: String, score: f64) -> bool {
        let previous = self.scores.insert(member.clone(), score);

        if let Some(previous) = previous {
            self.by_score.remove(&ScoreKey {
                score: previous,
                member: member.clone(),
            });
        }
        self.by_score.insert(ScoreKey { score, member });

        previous.is_none()
    }

    /// Members within the inclusive rank window `[start, stop]`. Negative ranks count from the
    /// end, out of range ranks are clamped and an inverted window is empty.
    pub fn range(&self, start: i64, stop: i64) -> Vec<String> {
        let len = self.len() as i64;
        if len == 0 {
            return vec![];
        }

        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

        if start > stop {
            return vec![];
        }

        self.by_score
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .map(|key| key.member.clone())
            .collect()
    }
}
