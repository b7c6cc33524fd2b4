// src/scoring/diff.rs

//! Longest-matching-block sequence alignment (Ratcliff/Obershelp).
//!
//! The matcher finds the longest contiguous block common to both sequences,
//! then recurses on the pieces to the left and right of it. The resulting
//! matching blocks are turned into an opcode list describing how to turn
//! `a` into `b`.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Range;

use serde::Serialize;

/// Sequences at least this long are subject to the popular-element heuristic.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Kind of an alignment opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// One alignment step: `a[a]` relates to `b[b]` as described by `tag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Opcode {
    pub tag: Tag,
    pub a: Range<usize>,
    pub b: Range<usize>,
}

impl Opcode {
    /// True for every opcode that is not a matching run.
    pub fn is_edit(&self) -> bool {
        self.tag != Tag::Equal
    }
}

/// A maximal run where `a[a..a + size] == b[b..b + size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Block {
    a: usize,
    b: usize,
    size: usize,
}

pub struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    /// Positions of every element of `b`, minus popular elements.
    b2j: HashMap<&'a T, Vec<usize>>,
}

impl<'a, T: Eq + Hash> SequenceMatcher<'a, T> {
    /// Builds a matcher from `a` to `b`.
    ///
    /// With `autojunk` set and `b` at least 200 elements long, any element
    /// occurring more than `len / 100 + 1` times in `b` is never used to seed
    /// a match. Matches can still grow across such elements once seeded.
    pub fn new(a: &'a [T], b: &'a [T], autojunk: bool) -> Self {
        let mut b2j: HashMap<&'a T, Vec<usize>> = HashMap::new();
        for (j, elt) in b.iter().enumerate() {
            b2j.entry(elt).or_default().push(j);
        }

        if autojunk && b.len() >= AUTOJUNK_MIN_LEN {
            let ntest = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= ntest);
        }

        Self { a, b, b2j }
    }

    /// Longest matching block in `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Ties resolve to the block starting earliest in `a`, then earliest in `b`.
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Block {
        let (mut best_a, mut best_b, mut best_size) = (alo, blo, 0);

        // j2len[j] = length of the longest match ending at a[i - 1] and b[j]
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
                    if k > best_size {
                        best_a = i + 1 - k;
                        best_b = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next;
        }

        while best_a > alo && best_b > blo && self.a[best_a - 1] == self.b[best_b - 1] {
            best_a -= 1;
            best_b -= 1;
            best_size += 1;
        }
        while best_a + best_size < ahi
            && best_b + best_size < bhi
            && self.a[best_a + best_size] == self.b[best_b + best_size]
        {
            best_size += 1;
        }

        Block {
            a: best_a,
            b: best_b,
            size: best_size,
        }
    }

    /// Matching blocks in ascending order, adjacent blocks merged, terminated
    /// by a zero-sized sentinel at `(len(a), len(b))`.
    fn matching_blocks(&self) -> Vec<Block> {
        let (la, lb) = (self.a.len(), self.b.len());

        let mut pending = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();
        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let block = self.find_longest_match(alo, ahi, blo, bhi);
            if block.size == 0 {
                continue;
            }
            if alo < block.a && blo < block.b {
                pending.push((alo, block.a, blo, block.b));
            }
            if block.a + block.size < ahi && block.b + block.size < bhi {
                pending.push((block.a + block.size, ahi, block.b + block.size, bhi));
            }
            blocks.push(block);
        }
        blocks.sort();

        let mut merged: Vec<Block> = Vec::with_capacity(blocks.len() + 1);
        for block in blocks {
            match merged.last_mut() {
                Some(last) if last.a + last.size == block.a && last.b + last.size == block.b => {
                    last.size += block.size;
                }
                _ => merged.push(block),
            }
        }
        merged.push(Block {
            a: la,
            b: lb,
            size: 0,
        });
        merged
    }

    /// Opcodes describing how to turn `a` into `b`.
    pub fn opcodes(&self) -> Vec<Opcode> {
        let (mut i, mut j) = (0, 0);
        let mut opcodes = Vec::new();

        for block in self.matching_blocks() {
            let tag = match (i < block.a, j < block.b) {
                (true, true) => Some(Tag::Replace),
                (true, false) => Some(Tag::Delete),
                (false, true) => Some(Tag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                opcodes.push(Opcode {
                    tag,
                    a: i..block.a,
                    b: j..block.b,
                });
            }

            i = block.a + block.size;
            j = block.b + block.size;
            if block.size > 0 {
                opcodes.push(Opcode {
                    tag: Tag::Equal,
                    a: block.a..i,
                    b: block.b..j,
                });
            }
        }

        opcodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn opcodes(a: &str, b: &str, autojunk: bool) -> Vec<Opcode> {
        let (a, b) = (chars(a), chars(b));
        SequenceMatcher::new(&a, &b, autojunk).opcodes()
    }

    fn tags(ops: &[Opcode]) -> Vec<Tag> {
        ops.iter().map(|op| op.tag).collect()
    }

    #[test]
    fn empty_inputs_produce_no_opcodes() {
        assert!(opcodes("", "", true).is_empty());
    }

    #[test]
    fn identical_inputs_are_one_equal_run() {
        let ops = opcodes("the quick brown fox", "the quick brown fox", true);
        assert_eq!(
            ops,
            vec![Opcode {
                tag: Tag::Equal,
                a: 0..19,
                b: 0..19
            }]
        );
    }

    #[test]
    fn mixed_edits() {
        let ops = opcodes("qabxcd", "abycdf", true);
        assert_eq!(
            ops,
            vec![
                Opcode { tag: Tag::Delete, a: 0..1, b: 0..0 },
                Opcode { tag: Tag::Equal, a: 1..3, b: 0..2 },
                Opcode { tag: Tag::Replace, a: 3..4, b: 2..3 },
                Opcode { tag: Tag::Equal, a: 4..6, b: 3..5 },
                Opcode { tag: Tag::Insert, a: 6..6, b: 5..6 },
            ]
        );
    }

    #[test]
    fn dropped_character_against_truncated_reference() {
        // "the quick brown fox" cut to the 18 typed characters
        let ops = opcodes("the quick brown fo", "the qick brown fox", true);
        assert_eq!(
            tags(&ops),
            vec![Tag::Equal, Tag::Delete, Tag::Equal, Tag::Insert]
        );
        assert_eq!(ops[1].a, 5..6);
        assert_eq!(ops[3].b, 17..18);
    }

    #[test]
    fn a_long_edit_is_a_single_opcode() {
        let ops = opcodes("abcdefghij", "abcXYZWij", true);
        assert_eq!(ops.iter().filter(|op| op.is_edit()).count(), 1);
    }

    #[test]
    fn matches_extend_across_popular_characters() {
        let text: String = "lorem ipsum dolor sit amet, ".repeat(10);
        assert!(text.len() >= AUTOJUNK_MIN_LEN);
        let ops = opcodes(&text, &text, true);
        assert_eq!(tags(&ops), vec![Tag::Equal]);
    }

    #[test]
    fn popular_characters_cannot_reanchor_after_a_typo() {
        let unit = "lorem ipsum dolor sit amet, ";
        let reference = unit.repeat(10);
        let typed = format!(
            "{}lorem ipsum dolxr sit amet, {}",
            unit.repeat(5),
            unit.repeat(4)
        );

        let junked = opcodes(&reference, &typed, true);
        assert_eq!(
            junked,
            vec![
                Opcode { tag: Tag::Equal, a: 0..155, b: 0..155 },
                Opcode { tag: Tag::Replace, a: 155..280, b: 155..280 },
            ]
        );

        let plain = opcodes(&reference, &typed, false);
        assert_eq!(tags(&plain), vec![Tag::Equal, Tag::Replace, Tag::Equal]);
        assert_eq!(plain[1].a, 155..156);
    }
}
