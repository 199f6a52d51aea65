/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::ptr;
use std::sync::atomic::Ordering;

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};

/// A lock-free ordered set of keys, used as the backing store for sampled
/// instruments.
///
/// Nodes form a forward-linked tower per key: the bottom level is the full
/// ordered list and defines membership, upper levels are shortcuts. Each
/// forward pointer carries a one-bit deletion mark in its tag; a node whose
/// level-0 pointer is tagged is logically removed. Any traversal that runs
/// into a marked successor unlinks it before moving on, so removal finishes
/// regardless of which thread started it.
///
/// Reclamation is epoch-based: unlinked nodes are handed to the collector
/// and freed only once no [`Entry`] or [`Iter`] pin can still reach them.
pub struct SkipList<K, const MAX_HEIGHT: usize = 16> {
    head: [Atomic<Node<K, MAX_HEIGHT>>; MAX_HEIGHT],
}

struct Node<K, const H: usize> {
    key: K,
    height: usize,
    tower: [Atomic<Node<K, H>>; H],
}

impl<K, const H: usize> Node<K, H> {
    fn new(key: K, height: usize) -> Self {
        Node {
            key,
            height,
            tower: std::array::from_fn(|_| Atomic::null()),
        }
    }
}

struct SearchResult<'g, K, const H: usize> {
    preds: [&'g Atomic<Node<K, H>>; H],
    succs: [Shared<'g, Node<K, H>>; H],
    found: Option<Shared<'g, Node<K, H>>>,
}

/// A geometric height with p = 1/2, drawn from the thread local generator.
fn random_height(max: usize) -> usize {
    let mut height = 1;
    while height < max && fastrand::bool() {
        height += 1;
    }
    height
}

impl<K, const MAX_HEIGHT: usize> Default for SkipList<K, MAX_HEIGHT> {
    fn default() -> Self {
        SkipList::new()
    }
}

impl<K, const MAX_HEIGHT: usize> SkipList<K, MAX_HEIGHT> {
    pub fn new() -> Self {
        assert!(MAX_HEIGHT > 0);
        SkipList {
            head: std::array::from_fn(|_| Atomic::null()),
        }
    }
}

impl<K, const MAX_HEIGHT: usize> SkipList<K, MAX_HEIGHT>
where
    K: Ord + Clone,
{
    /// Locate `key`, recording at every level the rightmost link whose
    /// successor is null or not less than `key`. Marked nodes met on the way
    /// are unlinked; a failed unlink restarts from the top.
    fn search<'g>(&'g self, key: &K, guard: &'g Guard) -> SearchResult<'g, K, MAX_HEIGHT> {
        'search: loop {
            let mut preds: [&'g Atomic<Node<K, MAX_HEIGHT>>; MAX_HEIGHT] =
                std::array::from_fn(|i| &self.head[i]);
            let mut succs = [Shared::null(); MAX_HEIGHT];
            let mut found = None;
            let mut pred_node: Option<&'g Node<K, MAX_HEIGHT>> = None;

            for level in (0..MAX_HEIGHT).rev() {
                let mut link = match pred_node {
                    Some(node) => &node.tower[level],
                    None => &self.head[level],
                };

                loop {
                    let curr = link.load(Ordering::Acquire, guard);
                    if curr.tag() != 0 {
                        // the node owning this link got marked under us and
                        // we cannot unlink from a dead predecessor
                        continue 'search;
                    }
                    let Some(curr_ref) = (unsafe { curr.as_ref() }) else {
                        preds[level] = link;
                        succs[level] = Shared::null();
                        break;
                    };
                    let succ = curr_ref.tower[level].load(Ordering::Acquire, guard);
                    if succ.tag() != 0 {
                        // curr is marked: unlink it here before moving on
                        match link.compare_exchange(
                            curr,
                            succ.with_tag(0),
                            Ordering::AcqRel,
                            Ordering::Acquire,
                            guard,
                        ) {
                            Ok(_) => continue,
                            Err(_) => continue 'search,
                        }
                    }
                    if curr_ref.key < *key {
                        pred_node = Some(curr_ref);
                        link = &curr_ref.tower[level];
                    } else {
                        preds[level] = link;
                        succs[level] = curr;
                        if level == 0 && curr_ref.key == *key {
                            found = Some(curr);
                        }
                        break;
                    }
                }
            }

            return SearchResult {
                preds,
                succs,
                found,
            };
        }
    }

    /// Insert `key`, returning false if it is already present. Concurrent
    /// inserts of the same key elect exactly one winner at the level-0 CAS.
    pub fn insert(&self, key: K) -> bool {
        let guard = epoch::pin();
        let height = random_height(MAX_HEIGHT);
        let mut spare: Option<Owned<Node<K, MAX_HEIGHT>>> = None;

        loop {
            let search = self.search(&key, &guard);
            if search.found.is_some() {
                return false;
            }

            let node = match spare.take() {
                Some(node) => node,
                None => Owned::new(Node::new(key.clone(), height)),
            };
            for level in 0..height {
                node.tower[level].store(search.succs[level], Ordering::Relaxed);
            }

            match search.preds[0].compare_exchange(
                search.succs[0],
                node,
                Ordering::AcqRel,
                Ordering::Acquire,
                &guard,
            ) {
                Ok(linked) => {
                    // the key is present from here on; upper levels are
                    // only shortcuts and can be linked lazily
                    self.link_upper_levels(linked, height, &key, &guard);
                    return true;
                }
                Err(e) => spare = Some(e.new),
            }
        }
    }

    fn link_upper_levels<'g>(
        &'g self,
        node: Shared<'g, Node<K, MAX_HEIGHT>>,
        height: usize,
        key: &K,
        guard: &'g Guard,
    ) {
        let node_ref = unsafe { node.deref() };
        for level in 1..height {
            loop {
                let search = self.search(key, guard);
                match search.found {
                    Some(found) if found.as_raw() == node.as_raw() => {}
                    // removed while linking, leave the rest unlinked
                    _ => return,
                }
                let succ = search.succs[level];
                if succ.as_raw() == node.as_raw() {
                    break;
                }

                let cur = node_ref.tower[level].load(Ordering::Acquire, guard);
                if cur.tag() != 0 {
                    return;
                }
                if cur.as_raw() != succ.as_raw()
                    && node_ref.tower[level]
                        .compare_exchange(cur, succ, Ordering::AcqRel, Ordering::Acquire, guard)
                        .is_err()
                {
                    continue;
                }
                if search.preds[level]
                    .compare_exchange(succ, node, Ordering::AcqRel, Ordering::Acquire, guard)
                    .is_ok()
                {
                    break;
                }
            }
        }
    }

    /// An entry for the live node holding `key`, if present.
    pub fn find(&self, key: &K) -> Option<Entry<'_, K, MAX_HEIGHT>> {
        let guard = epoch::pin();
        let node = {
            let search = self.search(key, &guard);
            search.found?.as_raw()
        };
        Some(Entry {
            list: self,
            guard,
            node,
        })
    }

    pub fn contains(&self, key: &K) -> bool {
        let guard = epoch::pin();
        self.search(key, &guard).found.is_some()
    }

    /// Remove `key`. Returns true only if this call performed the logical
    /// removal.
    pub fn remove(&self, key: &K) -> bool {
        match self.find(key) {
            Some(entry) => entry.remove(),
            None => false,
        }
    }

    /// The first live entry in key order, or `None` on an empty list.
    pub fn front(&self) -> Option<Entry<'_, K, MAX_HEIGHT>> {
        let guard = epoch::pin();
        let mut link = &self.head[0];
        let node: *const Node<K, MAX_HEIGHT> = loop {
            let curr = link.load(Ordering::Acquire, &guard);
            let curr_ref = unsafe { curr.as_ref() }?;
            if curr_ref.tower[0].load(Ordering::Acquire, &guard).tag() == 0 {
                break curr.as_raw();
            }
            link = &curr_ref.tower[0];
        };
        Some(Entry {
            list: self,
            guard,
            node,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.front().is_none()
    }

    pub fn iter(&self) -> Iter<'_, K, MAX_HEIGHT> {
        Iter {
            list: self,
            guard: epoch::pin(),
            current: ptr::null(),
        }
    }

    /// Mark every forward pointer of `node` top-down. Whichever thread tags
    /// level 0 owns the removal: it unlinks the node everywhere and retires
    /// it to the collector.
    fn remove_node(&self, node: &Node<K, MAX_HEIGHT>, guard: &Guard) -> bool {
        for level in (1..node.height).rev() {
            loop {
                let succ = node.tower[level].load(Ordering::Acquire, guard);
                if succ.tag() != 0 {
                    break;
                }
                if node.tower[level]
                    .compare_exchange(
                        succ,
                        succ.with_tag(1),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                        guard,
                    )
                    .is_ok()
                {
                    break;
                }
            }
        }

        loop {
            let succ = node.tower[0].load(Ordering::Acquire, guard);
            if succ.tag() != 0 {
                return false;
            }
            if node.tower[0]
                .compare_exchange(
                    succ,
                    succ.with_tag(1),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                    guard,
                )
                .is_ok()
            {
                break;
            }
        }

        // a completed search pass unlinks the node at every level where it
        // is still reachable; once nothing points at it, retire it
        let _ = self.search(&node.key, guard);
        unsafe {
            guard.defer_destroy(Shared::from(node as *const Node<K, MAX_HEIGHT>));
        }
        true
    }
}

impl<K, const MAX_HEIGHT: usize> Drop for SkipList<K, MAX_HEIGHT> {
    fn drop(&mut self) {
        unsafe {
            let guard = epoch::unprotected();
            let mut curr = self.head[0].load(Ordering::Relaxed, guard);
            while let Some(node) = curr.as_ref() {
                let next = node.tower[0].load(Ordering::Relaxed, guard);
                drop(curr.into_owned());
                curr = next.with_tag(0);
            }
        }
    }
}

/// A position at one node. The entry pins the current epoch, so the node
/// stays dereferenceable even after concurrent removal.
pub struct Entry<'a, K, const MAX_HEIGHT: usize> {
    list: &'a SkipList<K, MAX_HEIGHT>,
    guard: Guard,
    node: *const Node<K, MAX_HEIGHT>,
}

impl<K, const MAX_HEIGHT: usize> Entry<'_, K, MAX_HEIGHT>
where
    K: Ord + Clone,
{
    pub fn key(&self) -> &K {
        unsafe { &(*self.node).key }
    }

    /// Logically remove the referenced node. Returns false if another
    /// thread removed it first.
    pub fn remove(&self) -> bool {
        let node = unsafe { &*self.node };
        self.list.remove_node(node, &self.guard)
    }
}

/// Forward iteration over live keys in ascending order.
///
/// The iterator stays usable across concurrent inserts and removals: each
/// step follows level-0 links from the last yielded node, skipping marked
/// nodes and anything not strictly greater than the last yielded key, even
/// if that node has itself been removed in the meantime.
pub struct Iter<'a, K, const MAX_HEIGHT: usize> {
    list: &'a SkipList<K, MAX_HEIGHT>,
    guard: Guard,
    current: *const Node<K, MAX_HEIGHT>,
}

impl<K, const MAX_HEIGHT: usize> Iterator for Iter<'_, K, MAX_HEIGHT>
where
    K: Ord + Clone,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let mut link = match unsafe { self.current.as_ref() } {
            Some(node) => &node.tower[0],
            None => &self.list.head[0],
        };
        loop {
            let curr = link.load(Ordering::Acquire, &self.guard);
            let curr_ref = unsafe { curr.as_ref() }?;
            let live = curr_ref.tower[0].load(Ordering::Acquire, &self.guard).tag() == 0;
            let ascending = match unsafe { self.current.as_ref() } {
                Some(prev) => curr_ref.key > prev.key,
                None => true,
            };
            if live && ascending {
                self.current = curr.as_raw();
                return Some(curr_ref.key.clone());
            }
            link = &curr_ref.tower[0];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_head() {
        let list = SkipList::<u64>::new();

        assert!(list.insert(89));

        let values: Vec<u64> = list.iter().collect();
        assert_eq!(values, vec![89]);

        assert!(list.find(&89).is_some());
        assert!(list.find(&90).is_none());
    }

    #[test]
    fn insert_sorts() {
        let list = SkipList::<u64>::new();

        for v in [8000, 1000, 5233, 8, 15] {
            assert!(list.insert(v));
        }

        let values: Vec<u64> = list.iter().collect();
        assert_eq!(values, vec![8, 15, 1000, 5233, 8000]);
    }

    #[test]
    fn insert_duplicate() {
        let list = SkipList::<u64>::new();

        assert!(list.insert(8));
        assert!(list.insert(15));
        assert!(!list.insert(8));
        assert!(list.insert(5233));

        let values: Vec<u64> = list.iter().collect();
        assert_eq!(values, vec![8, 15, 5233]);
    }

    #[test]
    fn empty_list() {
        let list = SkipList::<u64>::new();
        assert!(list.is_empty());
        assert!(list.iter().next().is_none());
        assert!(list.find(&1).is_none());
        assert!(list.front().is_none());
        assert!(!list.remove(&1));
    }

    #[test]
    fn remove_front() {
        let list = SkipList::<u64>::new();
        for v in [8000, 1000, 5233, 8, 15] {
            list.insert(v);
        }

        assert!(list.front().unwrap().remove());

        let values: Vec<u64> = list.iter().collect();
        assert_eq!(values, vec![15, 1000, 5233, 8000]);
    }

    #[test]
    fn remove_tail_and_mid() {
        let list = SkipList::<u64>::new();
        for v in [8000, 1000, 5233, 8, 15] {
            list.insert(v);
        }

        assert!(list.remove(&8000));
        assert!(list.remove(&5233));
        assert!(!list.remove(&5233));

        let values: Vec<u64> = list.iter().collect();
        assert_eq!(values, vec![8, 15, 1000]);
    }

    #[test]
    fn removed_entry_reports_loser() {
        let list = SkipList::<u64>::new();
        list.insert(42);

        let a = list.find(&42).unwrap();
        let b = list.find(&42).unwrap();
        assert!(a.remove());
        assert!(!b.remove());
        assert_eq!(*a.key(), 42);
    }

    #[test]
    fn reinsert_after_remove() {
        let list = SkipList::<u64>::new();
        list.insert(7);
        assert!(list.remove(&7));
        assert!(!list.contains(&7));
        assert!(list.insert(7));
        assert!(list.contains(&7));
        assert_eq!(list.iter().count(), 1);
    }

    #[test]
    fn iterator_survives_mutation() {
        let list = SkipList::<u64>::new();
        list.insert(8000);
        list.insert(5233);
        list.insert(8);

        let mut iter = list.iter();
        assert_eq!(iter.next(), Some(8));

        list.insert(15);
        assert_eq!(iter.next(), Some(15));
        assert_eq!(iter.next(), Some(5233));

        list.insert(10000);
        assert_eq!(iter.next(), Some(8000));

        assert!(list.remove(&8000));
        assert_eq!(iter.next(), Some(10000));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn height_distribution_is_bounded() {
        for _ in 0..1000 {
            let h = random_height(16);
            assert!((1..=16).contains(&h));
        }
    }
}
