//! Merge-rank table and the greedy lowest-rank BPE merge.

use std::collections::HashMap;

/// Suffix appended to the last symbol of every pre-token.
pub const END_OF_WORD: &str = "</w>";

/// Ordered merge rules: a pair's rank is its position in the rule list.
///
/// Stored as a two-level map so lookups borrow `&str` instead of
/// allocating a pair key for every adjacent symbol.
#[derive(Debug, Default)]
pub struct MergeRanks {
    ranks: HashMap<String, HashMap<String, usize>>,
    len: usize,
}

impl MergeRanks {
    /// Parse the `merges.txt` format: one `left right` rule per line.
    ///
    /// A leading `#` line is a version header and is skipped; blank lines
    /// and lines without a separating space are ignored. A rule repeated
    /// later in the file takes the rank of the table size at that point.
    pub fn parse(text: &str) -> Self {
        let mut table = Self::default();
        for (i, line) in text.split('\n').enumerate() {
            if i == 0 && line.starts_with('#') {
                continue;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((left, right)) = line.split_once(' ') {
                table.insert(left, right);
            }
        }
        table
    }

    fn insert(&mut self, left: &str, right: &str) {
        let rank = self.len;
        let previous = self
            .ranks
            .entry(left.to_string())
            .or_default()
            .insert(right.to_string(), rank);
        if previous.is_none() {
            self.len += 1;
        }
    }

    /// Rank of the pair `(left, right)`, if it is a known merge.
    pub fn rank(&self, left: &str, right: &str) -> Option<usize> {
        self.ranks.get(left)?.get(right).copied()
    }

    /// Number of distinct merge rules.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Merge a byte-remapped pre-token into its final BPE symbols.
    ///
    /// Starts from one symbol per character (the last one carrying
    /// [`END_OF_WORD`]) and repeatedly merges every occurrence of the
    /// lowest-ranked adjacent pair until no pair is mergeable or a single
    /// symbol remains. On equal ranks the first pair in scan order wins.
    pub fn merge(&self, word: &str) -> Vec<String> {
        let count = word.chars().count();
        if count == 0 {
            return Vec::new();
        }

        let mut symbols: Vec<String> = word
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let mut s = c.to_string();
                if i + 1 == count {
                    s.push_str(END_OF_WORD);
                }
                s
            })
            .collect();

        while symbols.len() > 1 {
            let mut best: Option<(usize, usize)> = None;
            for (i, pair) in symbols.windows(2).enumerate() {
                if let Some(rank) = self.rank(&pair[0], &pair[1]) {
                    if best.map_or(true, |(best_rank, _)| rank < best_rank) {
                        best = Some((rank, i));
                    }
                }
            }

            let Some((_, at)) = best else {
                break;
            };
            let (left, right) = (symbols[at].clone(), symbols[at + 1].clone());

            let mut merged = Vec::with_capacity(symbols.len());
            let mut i = 0;
            while i < symbols.len() {
                if i + 1 < symbols.len() && symbols[i] == left && symbols[i + 1] == right {
                    merged.push(format!("{left}{right}"));
                    i += 2;
                } else {
                    merged.push(std::mem::take(&mut symbols[i]));
                    i += 1;
                }
            }
            symbols = merged;
        }

        symbols
    }
}
