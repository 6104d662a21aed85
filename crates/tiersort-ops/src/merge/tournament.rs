//! Loser tree over `k` sorted runs.
//!
//! Cursors live in a flat arena and tree nodes hold cursor indices, so the
//! tree works for any `k >= 1` without padding. An exhausted cursor ranks
//! after every live one; ties (which a total order only allows between
//! exhausted cursors) go to the lower run index.

use std::mem;

use tiersort_core::tuple::Tuple;

/// Read position inside one input run. Tuples are moved out as they win.
#[derive(Debug)]
pub struct Cursor<'a> {
    run: &'a mut [Tuple],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(run: &'a mut [Tuple]) -> Self {
        Self { run, pos: 0 }
    }

    #[inline]
    pub fn head(&self) -> Option<&Tuple> {
        self.run.get(self.pos)
    }

    #[inline]
    fn advance(&mut self) -> Option<Tuple> {
        let t = self.run.get_mut(self.pos).map(mem::take)?;
        self.pos += 1;
        Some(t)
    }

    pub fn remaining(&self) -> usize {
        self.run.len() - self.pos
    }
}

#[derive(Debug)]
pub struct LoserTree<'a> {
    cursors: Vec<Cursor<'a>>,
    /// `losers[n]` for internal node `n` in `1..k`; slot 0 unused.
    losers: Vec<usize>,
    winner: usize,
}

impl<'a> LoserTree<'a> {
    pub fn new(runs: Vec<&'a mut [Tuple]>) -> Self {
        let cursors: Vec<Cursor<'a>> = runs.into_iter().map(Cursor::new).collect();
        let k = cursors.len();
        let mut tree = Self {
            cursors,
            losers: vec![0; k.max(1)],
            winner: 0,
        };
        if k == 0 {
            return tree;
        }

        // leaves sit at k..2k; play every internal node bottom-up
        let mut winners = vec![0usize; 2 * k];
        for (i, slot) in winners[k..].iter_mut().enumerate() {
            *slot = i;
        }
        for node in (1..k).rev() {
            let (l, r) = (winners[2 * node], winners[2 * node + 1]);
            let (w, lose) = if tree.beats(l, r) { (l, r) } else { (r, l) };
            winners[node] = w;
            tree.losers[node] = lose;
        }
        tree.winner = winners[1];
        tree
    }

    /// Bytes a tree over `k` runs keeps in its arena and node array.
    pub fn arena_bytes(k: usize) -> usize {
        k * (mem::size_of::<Cursor<'static>>() + mem::size_of::<usize>())
    }

    pub fn fan_in(&self) -> usize {
        self.cursors.len()
    }

    /// True if cursor `a` must be emitted before cursor `b`.
    #[inline]
    fn beats(&self, a: usize, b: usize) -> bool {
        match (self.cursors[a].head(), self.cursors[b].head()) {
            (Some(x), Some(y)) => x.precedes(y) || (!y.precedes(x) && a < b),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => a < b,
        }
    }

    /// Smallest remaining tuple, or `None` once every run is drained.
    pub fn pop(&mut self) -> Option<Tuple> {
        let k = self.cursors.len();
        if k == 0 {
            return None;
        }
        let mut w = self.winner;
        let out = self.cursors[w].advance()?;

        let mut node = (w + k) / 2;
        while node > 0 {
            let l = self.losers[node];
            if self.beats(l, w) {
                self.losers[node] = w;
                w = l;
            }
            node /= 2;
        }
        self.winner = w;
        Some(out)
    }

    pub fn remaining(&self) -> usize {
        self.cursors.iter().map(Cursor::remaining).sum()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursors.iter().all(|c| c.head().is_none())
    }
}

impl Iterator for LoserTree<'_> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Tuple> {
        self.pop()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiersort_core::id::TupleId;
    use tiersort_core::tuple::is_sorted;

    fn run(keys: &[i64], id_base: u64) -> Vec<Tuple> {
        keys.iter()
            .enumerate()
            .map(|(i, &k)| Tuple::new(k, TupleId::new(id_base + i as u64), ""))
            .collect()
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let mut tree = LoserTree::new(Vec::new());
        assert_eq!(tree.pop(), None);
        assert!(tree.is_exhausted());
    }

    #[test]
    fn single_run_passes_through() {
        let mut a = run(&[1, 2, 3], 0);
        let out: Vec<i64> = LoserTree::new(vec![&mut a[..]]).map(|t| t.key).collect();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn merges_non_power_of_two_fan_in() {
        let mut a = run(&[1, 4, 9], 0);
        let mut b = run(&[2, 3], 10);
        let mut c = run(&[], 20);
        let mut d = run(&[0, 5, 6, 7], 30);
        let mut e = run(&[8], 40);
        let tree = LoserTree::new(vec![&mut a[..], &mut b[..], &mut c[..], &mut d[..], &mut e[..]]);
        assert_eq!(tree.fan_in(), 5);
        assert_eq!(tree.size_hint(), (10, Some(10)));
        let out: Vec<i64> = tree.map(|t| t.key).collect();
        assert_eq!(out, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn equal_keys_come_out_in_id_order() {
        let mut a = run(&[5, 5], 2);
        let mut b = run(&[5, 5], 0);
        let mut c = run(&[5], 4);
        let out: Vec<Tuple> = LoserTree::new(vec![&mut a[..], &mut b[..], &mut c[..]]).collect();
        assert!(is_sorted(&out));
        let ids: Vec<u64> = out.iter().map(|t| t.id.get()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn inputs_are_drained() {
        let mut a = run(&[1, 3], 0);
        let mut b = run(&[2], 5);
        let mut tree = LoserTree::new(vec![&mut a[..], &mut b[..]]);
        while tree.pop().is_some() {}
        assert!(tree.is_exhausted());
        assert_eq!(tree.remaining(), 0);
    }
}
