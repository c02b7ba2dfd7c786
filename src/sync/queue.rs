/*!
 * Wait Node Arena
 *
 * Blocked callers are stored as `WaitNode`s in a growable slab and linked by
 * index into doubly-linked lists: one list for the synchronizer's wait queue
 * and one per condition variable. Indices stay valid while a node moves
 * between lists, so a waiter keeps the same `NodeId` from `wait()` through
 * re-acquisition.
 *
 * # Design: Arena Plus Index
 *
 * - Unlink and transfer are O(1) regardless of queue depth
 * - Vacant slots are recycled through a free list
 * - No reference cycles; the arena owns every node
 *
 * The arena is not thread-safe on its own. The synchronizer keeps it behind a
 * short critical section that never spans a park.
 */

use super::suspend::SuspensionToken;

/// Stable index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Index of a condition list in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConditionId(usize);

/// Lifecycle of a wait node
///
/// Queue order never depends on the status: abandoned nodes are unlinked
/// rather than skipped. The status records how a node reached the wait queue,
/// which the synchronizer reports when the node's thread finally acquires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Parked in the list that currently owns it
    Waiting,
    /// Moved from a condition list to the wait queue by a signal
    Signaled,
    /// Abandoned by its thread (cancelled or timed out)
    Cancelled,
}

/// Which list currently owns a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLocation {
    WaitQueue,
    Condition(ConditionId),
}

/// One blocked caller
#[derive(Debug)]
pub struct WaitNode {
    thread: SuspensionToken,
    status: NodeStatus,
    location: NodeLocation,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

impl WaitNode {
    #[inline]
    pub fn thread(&self) -> &SuspensionToken {
        &self.thread
    }

    #[inline]
    pub fn status(&self) -> NodeStatus {
        self.status
    }

    #[inline]
    pub fn location(&self) -> NodeLocation {
        self.location
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Links {
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

#[derive(Debug)]
enum Slot {
    Occupied(WaitNode),
    Vacant { next_free: Option<usize> },
}

/// Slab of wait nodes with one wait queue and any number of condition lists
#[derive(Debug, Default)]
pub struct WaitArena {
    slots: Vec<Slot>,
    free: Option<usize>,
    queue: Links,
    conditions: Vec<Option<Links>>,
    free_conditions: Vec<usize>,
}

impl WaitArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new, empty condition list
    pub fn add_condition(&mut self) -> ConditionId {
        match self.free_conditions.pop() {
            Some(idx) => {
                self.conditions[idx] = Some(Links::default());
                ConditionId(idx)
            }
            None => {
                self.conditions.push(Some(Links::default()));
                ConditionId(self.conditions.len() - 1)
            }
        }
    }

    /// Release a condition list; any nodes still on it move to the wait queue
    pub fn remove_condition(&mut self, cond: ConditionId) {
        while let Some(id) = self.head(NodeLocation::Condition(cond)) {
            self.transfer(id);
        }
        self.conditions[cond.0] = None;
        self.free_conditions.push(cond.0);
    }

    /// Append a waiting node for `thread` at the tail of `location`
    pub fn push_back(&mut self, location: NodeLocation, thread: SuspensionToken) -> NodeId {
        let node = WaitNode {
            thread,
            status: NodeStatus::Waiting,
            location,
            prev: None,
            next: None,
        };

        let id = match self.free {
            Some(idx) => {
                self.free = match self.slots[idx] {
                    Slot::Vacant { next_free } => next_free,
                    Slot::Occupied(_) => unreachable!("free list points at an occupied slot"),
                };
                self.slots[idx] = Slot::Occupied(node);
                NodeId(idx)
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                NodeId(self.slots.len() - 1)
            }
        };

        self.link_back(location, id);
        id
    }

    #[inline]
    pub fn head(&self, location: NodeLocation) -> Option<NodeId> {
        self.links(location).head
    }

    #[inline]
    pub fn len(&self, location: NodeLocation) -> usize {
        self.links(location).len
    }

    #[inline]
    pub fn is_empty(&self, location: NodeLocation) -> bool {
        self.len(location) == 0
    }

    /// Node at `id`; panics if the slot is vacant
    pub fn node(&self, id: NodeId) -> &WaitNode {
        match &self.slots[id.0] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("wait node {:?} is not allocated", id),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut WaitNode {
        match &mut self.slots[id.0] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("wait node {:?} is not allocated", id),
        }
    }

    #[inline]
    pub fn set_status(&mut self, id: NodeId, status: NodeStatus) {
        self.node_mut(id).status = status;
    }

    /// Iterate node ids of `location` in FIFO order
    pub fn iter(&self, location: NodeLocation) -> impl Iterator<Item = NodeId> + '_ {
        let mut cursor = self.head(location);
        std::iter::from_fn(move || {
            let id = cursor?;
            cursor = self.node(id).next;
            Some(id)
        })
    }

    /// Unlink `id` from whichever list owns it and free its slot
    pub fn remove(&mut self, id: NodeId) -> WaitNode {
        self.unlink(id);
        let slot = std::mem::replace(
            &mut self.slots[id.0],
            Slot::Vacant {
                next_free: self.free,
            },
        );
        self.free = Some(id.0);
        match slot {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("wait node {:?} is not allocated", id),
        }
    }

    /// Move `id` from its condition list to the tail of the wait queue
    ///
    /// Nodes already on the wait queue are left untouched.
    pub fn transfer(&mut self, id: NodeId) {
        if self.node(id).location == NodeLocation::WaitQueue {
            return;
        }
        self.unlink(id);
        let node = self.node_mut(id);
        node.location = NodeLocation::WaitQueue;
        if node.status == NodeStatus::Waiting {
            node.status = NodeStatus::Signaled;
        }
        self.link_back(NodeLocation::WaitQueue, id);
    }

    fn links(&self, location: NodeLocation) -> &Links {
        match location {
            NodeLocation::WaitQueue => &self.queue,
            NodeLocation::Condition(cond) => self.conditions[cond.0]
                .as_ref()
                .unwrap_or_else(|| panic!("condition {:?} was released", cond)),
        }
    }

    fn links_mut(&mut self, location: NodeLocation) -> &mut Links {
        match location {
            NodeLocation::WaitQueue => &mut self.queue,
            NodeLocation::Condition(cond) => self.conditions[cond.0]
                .as_mut()
                .unwrap_or_else(|| panic!("condition {:?} was released", cond)),
        }
    }

    fn link_back(&mut self, location: NodeLocation, id: NodeId) {
        let old_tail = self.links(location).tail;
        {
            let node = self.node_mut(id);
            node.location = location;
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(tail) => self.node_mut(tail).next = Some(id),
            None => self.links_mut(location).head = Some(id),
        }
        let links = self.links_mut(location);
        links.tail = Some(id);
        links.len += 1;
    }

    fn unlink(&mut self, id: NodeId) {
        let (location, prev, next) = {
            let node = self.node(id);
            (node.location, node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.links_mut(location).head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.links_mut(location).tail = prev,
        }
        let node = self.node_mut(id);
        node.prev = None;
        node.next = None;
        self.links_mut(location).len -= 1;
    }
}
