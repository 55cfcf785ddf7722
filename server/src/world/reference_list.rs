// grid_map_server/server/src/world/reference_list.rs
//! Membership list of one object category inside one cell.
//!
//! Nodes live in a slot arena owned by the list and are chained into a doubly
//! linked list through arena keys. An object keeps a [`Reference`] holding the key
//! of its node, never a pointer into the list.
//!
//! While a traversal is running, removal only marks the node as unlinked and the
//! physical unlink is postponed until the last traversal over the list finishes.
//! The traversal cursor therefore never points at a freed node, whatever the
//! visiting callback removes. Nodes appended during a traversal lie past the
//! cursor's end marker and are not visited by it.

use crate::core::error::{GridError, GridResult};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

new_key_type! {
    pub struct RefKey;
}

static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListId(u64);

impl ListId {
    fn next() -> Self {
        ListId(NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Object-side handle to a list slot. Not `Clone`: one object, one link.
#[derive(Debug, Default)]
pub struct Reference {
    link: Option<(ListId, RefKey)>,
}

impl Reference {
    pub fn new() -> Self {
        Reference { link: None }
    }

    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<RefKey>,
    next: Option<RefKey>,
    linked: bool,
}

/// Position of an in-progress traversal. Obtained from
/// [`ReferenceList::begin_pass`] and handed back to [`ReferenceList::end_pass`].
#[derive(Debug)]
#[must_use = "a cursor must be returned through end_pass"]
pub struct Cursor {
    list: ListId,
    next: Option<RefKey>,
    last: Option<RefKey>,
}

#[derive(Debug)]
pub struct ReferenceList<T> {
    id: ListId,
    nodes: SlotMap<RefKey, Node<T>>,
    head: Option<RefKey>,
    tail: Option<RefKey>,
    len: usize,
    passes: u32,
    pending: SmallVec<[RefKey; 8]>,
}

impl<T> Default for ReferenceList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReferenceList<T> {
    pub fn new() -> Self {
        ReferenceList {
            id: ListId::next(),
            nodes: SlotMap::with_key(),
            head: None,
            tail: None,
            len: 0,
            passes: 0,
            pending: SmallVec::new(),
        }
    }

    pub fn id(&self) -> ListId {
        self.id
    }

    /// Number of linked elements. Elements removed during a running traversal are
    /// no longer counted even though their nodes are still allocated.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_iterating(&self) -> bool {
        self.passes > 0
    }

    /// Links `value` at the tail and stores the link in `reference`.
    pub fn insert(&mut self, reference: &mut Reference, value: T) -> GridResult<()> {
        if reference.is_linked() {
            error!(list = ?self.id, "insert of a reference that is already linked");
            return Err(GridError::AlreadyLinked.fail_loudly());
        }

        let key = self.nodes.insert(Node { value, prev: self.tail, next: None, linked: true });
        match self.tail.and_then(|t| self.nodes.get_mut(t)) {
            Some(tail) => tail.next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
        self.len += 1;
        reference.link = Some((self.id, key));
        Ok(())
    }

    /// Unlinks `reference`. Returns `Ok(false)` when it was not linked at all.
    pub fn remove(&mut self, reference: &mut Reference) -> GridResult<bool> {
        let Some((list, key)) = reference.link else {
            return Ok(false);
        };
        if list != self.id {
            error!(list = ?self.id, owner = ?list, "remove of a reference owned by another list");
            return Err(GridError::ForeignReference.fail_loudly());
        }
        reference.link = None;

        if self.passes > 0 {
            if let Some(node) = self.nodes.get_mut(key) {
                node.linked = false;
                self.pending.push(key);
            }
        } else {
            self.unlink_node(key);
        }
        self.len -= 1;
        Ok(true)
    }

    pub fn get(&self, reference: &Reference) -> Option<&T> {
        let (list, key) = reference.link?;
        if list != self.id {
            return None;
        }
        self.nodes.get(key).filter(|n| n.linked).map(|n| &n.value)
    }

    pub fn contains(&self, reference: &Reference) -> bool {
        self.get(reference).is_some()
    }

    /// Iterates linked elements in insertion order. Read-only.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let mut next = self.head;
        std::iter::from_fn(move || {
            while let Some(key) = next {
                let node = self.nodes.get(key)?;
                next = node.next;
                if node.linked {
                    return Some(&node.value);
                }
            }
            None
        })
    }

    pub fn begin_pass(&mut self) -> Cursor {
        self.passes += 1;
        Cursor { list: self.id, next: self.head, last: self.tail }
    }

    /// Next linked element of the pass, skipping anything unlinked since the pass
    /// began.
    pub fn advance(&self, cursor: &mut Cursor) -> Option<&T> {
        if cursor.list != self.id {
            return None;
        }
        while let Some(key) = cursor.next.take() {
            let node = self.nodes.get(key)?;
            if cursor.last != Some(key) {
                cursor.next = node.next;
            }
            if node.linked {
                return Some(&node.value);
            }
        }
        None
    }

    pub fn end_pass(&mut self, cursor: Cursor) {
        debug_assert_eq!(cursor.list, self.id, "cursor returned to the wrong list");
        self.passes = self.passes.saturating_sub(1);
        if self.passes == 0 {
            let pending = std::mem::take(&mut self.pending);
            for key in pending {
                self.unlink_node(key);
            }
        }
    }

    /// Calls `op` for every element linked when the call starts. `op` receives the
    /// list itself and may remove or insert anything, including the element being
    /// visited.
    pub fn for_each<F>(&mut self, mut op: F) -> usize
    where
        T: Clone,
        F: FnMut(&mut Self, T),
    {
        let mut cursor = self.begin_pass();
        let mut visited = 0;
        while let Some(value) = self.advance(&mut cursor).cloned() {
            visited += 1;
            op(self, value);
        }
        self.end_pass(cursor);
        visited
    }

    fn unlink_node(&mut self, key: RefKey) -> Option<T> {
        let node = self.nodes.remove(key)?;
        match node.prev.and_then(|p| self.nodes.get_mut(p)) {
            Some(prev) => prev.next = node.next,
            None => self.head = node.next,
        }
        match node.next.and_then(|n| self.nodes.get_mut(n)) {
            Some(next) => next.prev = node.prev,
            None => self.tail = node.prev,
        }
        Some(node.value)
    }
}
