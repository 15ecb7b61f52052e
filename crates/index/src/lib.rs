//! Dynamic 3D R-tree
//!
//! The spatial index behind a geodex collection: entries are opaque
//! handles keyed by their 3D bounding box. The tree supports insert,
//! exact remove, tree-wide bounds, and a cursored box search.
//!
//! Shape: nodes hold up to [`MAX_ENTRIES`] children; inserts descend by
//! least enlargement of the node margin and split overfull nodes with a
//! quadratic seed pick; removals unlink the entry and prune emptied
//! nodes on the way back up.
//!
//! Search visits matching entries in depth-first order. The order is
//! deterministic for a given tree state, which is what makes the
//! pre-visit cursor skip usable for pagination: a search that stopped
//! after `n` matches can resume by passing `n` as the cursor, as long
//! as the tree has not been mutated in between.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::cmp::Ordering;

use geodex_core::BBox;

/// Maximum number of entries or children per node
pub const MAX_ENTRIES: usize = 8;

struct Entry<T> {
    value: T,
    rect: BBox,
}

enum Node<T> {
    Leaf { entries: Vec<Entry<T>>, cover: BBox },
    Internal { children: Vec<Box<Node<T>>>, cover: BBox },
}

impl<T: Copy + PartialEq> Node<T> {
    fn cover(&self) -> BBox {
        match self {
            Node::Leaf { cover, .. } | Node::Internal { cover, .. } => *cover,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Node::Leaf { entries, .. } => entries.is_empty(),
            Node::Internal { children, .. } => children.is_empty(),
        }
    }

    fn recompute_cover(&mut self) {
        match self {
            Node::Leaf { entries, cover } => {
                *cover = cover_of(entries.iter().map(|e| e.rect));
            }
            Node::Internal { children, cover } => {
                *cover = cover_of(children.iter().map(|c| c.cover()));
            }
        }
    }
}

fn cover_of(rects: impl Iterator<Item = BBox>) -> BBox {
    let mut cover: Option<BBox> = None;
    for rect in rects {
        cover = Some(match cover.take() {
            Some(mut c) => {
                c.expand(&rect);
                c
            }
            None => rect,
        });
    }
    cover.unwrap_or_default()
}

fn margin(rect: &BBox) -> f64 {
    (rect.max.x - rect.min.x) + (rect.max.y - rect.min.y) + (rect.max.z - rect.min.z)
}

fn union(a: &BBox, b: &BBox) -> BBox {
    let mut u = *a;
    u.expand(b);
    u
}

fn enlargement(cover: &BBox, rect: &BBox) -> f64 {
    margin(&union(cover, rect)) - margin(cover)
}

/// Split an overfull group in two: quadratic seed pick by wasted
/// margin, remaining members distributed to the group whose cover
/// their rect enlarges least (ties favor the smaller group).
fn split<E>(mut members: Vec<E>, rect_of: impl Fn(&E) -> BBox) -> (Vec<E>, Vec<E>) {
    let mut seeds = (0, 1);
    let mut worst_waste = f64::NEG_INFINITY;
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            let (ra, rb) = (rect_of(&members[i]), rect_of(&members[j]));
            let waste = margin(&union(&ra, &rb)) - margin(&ra) - margin(&rb);
            if waste > worst_waste {
                worst_waste = waste;
                seeds = (i, j);
            }
        }
    }
    // pull the higher index first so the lower one stays valid
    let seed_b = members.remove(seeds.1);
    let seed_a = members.remove(seeds.0);
    let mut cover_a = rect_of(&seed_a);
    let mut cover_b = rect_of(&seed_b);
    let mut group_a = vec![seed_a];
    let mut group_b = vec![seed_b];
    for member in members {
        let rect = rect_of(&member);
        let grow_a = enlargement(&cover_a, &rect);
        let grow_b = enlargement(&cover_b, &rect);
        let to_a = match grow_a.partial_cmp(&grow_b) {
            Some(Ordering::Less) => true,
            Some(Ordering::Greater) => false,
            _ => group_a.len() <= group_b.len(),
        };
        if to_a {
            cover_a.expand(&rect);
            group_a.push(member);
        } else {
            cover_b.expand(&rect);
            group_b.push(member);
        }
    }
    (group_a, group_b)
}

/// A dynamic 3D R-tree over values keyed by bounding box
pub struct RTreeIndex<T> {
    root: Option<Box<Node<T>>>,
    len: usize,
}

impl<T: Copy + PartialEq> Default for RTreeIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + PartialEq> RTreeIndex<T> {
    /// Create an empty tree
    pub fn new() -> Self {
        RTreeIndex { root: None, len: 0 }
    }

    /// Number of entries in the tree
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tree-wide bounds across all entries; a zero box when empty
    pub fn bounds(&self) -> BBox {
        self.root.as_ref().map(|r| r.cover()).unwrap_or_default()
    }

    /// Insert a value under the given rect
    pub fn insert(&mut self, value: T, rect: BBox) {
        let entry = Entry { value, rect };
        match self.root.take() {
            None => {
                self.root = Some(Box::new(Node::Leaf {
                    cover: rect,
                    entries: vec![entry],
                }));
            }
            Some(mut root) => {
                if let Some(sibling) = Self::insert_into(&mut root, entry) {
                    let children = vec![root, sibling];
                    let cover = cover_of(children.iter().map(|c| c.cover()));
                    self.root = Some(Box::new(Node::Internal { children, cover }));
                } else {
                    self.root = Some(root);
                }
            }
        }
        self.len += 1;
    }

    fn insert_into(node: &mut Node<T>, entry: Entry<T>) -> Option<Box<Node<T>>> {
        match node {
            Node::Leaf { entries, cover } => {
                if entries.is_empty() {
                    *cover = entry.rect;
                } else {
                    cover.expand(&entry.rect);
                }
                entries.push(entry);
                if entries.len() <= MAX_ENTRIES {
                    return None;
                }
                let (kept, spill) = split(std::mem::take(entries), |e| e.rect);
                *entries = kept;
                *cover = cover_of(entries.iter().map(|e| e.rect));
                Some(Box::new(Node::Leaf {
                    cover: cover_of(spill.iter().map(|e| e.rect)),
                    entries: spill,
                }))
            }
            Node::Internal { children, cover } => {
                let best = Self::choose_child(children, &entry.rect);
                let sibling = Self::insert_into(&mut children[best], entry);
                if let Some(sibling) = sibling {
                    children.push(sibling);
                    if children.len() > MAX_ENTRIES {
                        let (kept, spill) = split(std::mem::take(children), |c| c.cover());
                        *children = kept;
                        *cover = cover_of(children.iter().map(|c| c.cover()));
                        return Some(Box::new(Node::Internal {
                            cover: cover_of(spill.iter().map(|c| c.cover())),
                            children: spill,
                        }));
                    }
                }
                *cover = cover_of(children.iter().map(|c| c.cover()));
                None
            }
        }
    }

    fn choose_child(children: &[Box<Node<T>>], rect: &BBox) -> usize {
        let mut best = 0;
        let mut best_delta = f64::INFINITY;
        for (i, child) in children.iter().enumerate() {
            let delta = enlargement(&child.cover(), rect);
            if delta < best_delta {
                best = i;
                best_delta = delta;
            }
        }
        best
    }

    /// Remove the entry for `value`
    ///
    /// `rect` must be the box the value was inserted under; it prunes
    /// the subtrees the removal has to look at. Returns `true` when an
    /// entry was found and removed.
    pub fn remove(&mut self, value: T, rect: BBox) -> bool {
        let Some(root) = self.root.as_mut() else {
            return false;
        };
        if !Self::remove_from(root, value, &rect) {
            return false;
        }
        self.len -= 1;
        if root.is_empty() {
            self.root = None;
            return true;
        }
        // collapse single-child internal roots left behind by pruning
        loop {
            let promoted = match self.root.as_mut() {
                Some(node) => match node.as_mut() {
                    Node::Internal { children, .. } if children.len() == 1 => children.pop(),
                    _ => None,
                },
                None => None,
            };
            match promoted {
                Some(child) => self.root = Some(child),
                None => break,
            }
        }
        true
    }

    fn remove_from(node: &mut Node<T>, value: T, rect: &BBox) -> bool {
        match node {
            Node::Leaf { entries, .. } => {
                let Some(at) = entries.iter().position(|e| e.value == value) else {
                    return false;
                };
                entries.remove(at);
                node.recompute_cover();
                true
            }
            Node::Internal { children, .. } => {
                let mut removed = false;
                for i in 0..children.len() {
                    if !children[i].cover().intersects(rect) {
                        continue;
                    }
                    if Self::remove_from(&mut children[i], value, rect) {
                        if children[i].is_empty() {
                            children.remove(i);
                        }
                        removed = true;
                        break;
                    }
                }
                if removed {
                    node.recompute_cover();
                }
                removed
            }
        }
    }

    /// Search every entry whose rect intersects `rect`
    ///
    /// Matches are visited in deterministic depth-first order. The
    /// first `cursor` matches are skipped before `visit` is called;
    /// `visit` returning `false` stops the search. The return value is
    /// the number of matches seen so far (skipped plus visited),
    /// suitable as the cursor of a resumed search.
    pub fn search<F>(&self, cursor: u64, rect: BBox, mut visit: F) -> u64
    where
        F: FnMut(T) -> bool,
    {
        let mut seen = 0u64;
        if let Some(root) = &self.root {
            Self::search_node(root, &rect, cursor, &mut seen, &mut visit);
        }
        seen
    }

    fn search_node<F>(
        node: &Node<T>,
        rect: &BBox,
        cursor: u64,
        seen: &mut u64,
        visit: &mut F,
    ) -> bool
    where
        F: FnMut(T) -> bool,
    {
        match node {
            Node::Leaf { entries, .. } => {
                for entry in entries {
                    if entry.rect.intersects(rect) {
                        *seen += 1;
                        if *seen > cursor && !visit(entry.value) {
                            return false;
                        }
                    }
                }
                true
            }
            Node::Internal { children, .. } => {
                for child in children {
                    if child.cover().intersects(rect)
                        && !Self::search_node(child, rect, cursor, seen, visit)
                    {
                        return false;
                    }
                }
                true
            }
        }
    }
}
