//! Reconciliation engine.
//!
//! The [`Synchronizer`] reconciles a new item sequence against the nodes
//! tracked in its identity table. A pass is an explicit state machine driven
//! one [`Synchronizer::step`] at a time, so a scheduler can suspend it between
//! any two steps:
//!
//! 1. **Scan** - one step per item. Items with a node keep it; nodes skipped
//!    on the way are presumed dead (hidden and moved to the end of the range)
//!    and may be resurrected if their identity shows up later in the scan.
//!    Items without a node are queued for addition.
//! 2. **Carcass collection** - one step. Unvisited nodes are presumed dead,
//!    then every presumed dead node is confirmed and leaves the table.
//! 3. **Additions** - one step per queued item. A carcass is revived when
//!    recycling is allowed and one is left, otherwise a node is materialized.
//!    Either way the node lands right after the previous item's node.
//! 4. **Finalize** - leftover carcasses are disposed and the pass ends.

use crate::host::{Cursor, Position, ViewHost, ViewNode};
use crate::monitor::SyncMetrics;
use repeat_core::{
    CoreError, CoreResult, Identity, IdentitySelector, IdentityTable, ItemAccessor, SlotNames,
    ViewContext,
};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error, trace};

/// Upper bound on space reserved ahead of reading a source
const PREALLOCATION_LIMIT: usize = 1024;

/// Result of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// More work remains in the pass
    Continue,
    /// The pass is finished (or none was running)
    Done,
}

/// Phase of the pass in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Walking the new sequence
    Scan,
    /// Confirming deaths
    CollectCarcasses,
    /// Reviving or materializing nodes for added items
    DrainAdditions,
    /// Disposing leftovers
    Finalize,
}

/// A tracked node together with its bound context
#[derive(Debug, Clone)]
pub struct Entry<N, T> {
    /// The rendered node
    pub node: N,
    /// The context the node is bound to
    pub context: ViewContext<T>,
}

/// Item that had no node when it was scanned
struct AddedItem<T> {
    index: usize,
    item: T,
    identity: Identity,
    previous: Option<Identity>,
}

/// Transient state of one synchronization pass
struct Pass<T, N> {
    items: ItemAccessor<T>,
    identities: Vec<Identity>,
    step: usize,
    cursor: Cursor<N>,
    added: VecDeque<AddedItem<T>>,
    presumed_dead: IdentityTable<N>,
    carcasses: Option<Vec<N>>,
}

impl<T, N> Pass<T, N> {
    fn new(items: ItemAccessor<T>, identities: Vec<Identity>) -> Self {
        Self {
            items,
            identities,
            step: 0,
            cursor: Cursor::Start,
            added: VecDeque::new(),
            presumed_dead: IdentityTable::new(),
            carcasses: None,
        }
    }

    fn phase(&self) -> Phase {
        if self.step < self.identities.len() {
            Phase::Scan
        } else if self.carcasses.is_none() {
            Phase::CollectCarcasses
        } else if !self.added.is_empty() {
            Phase::DrainAdditions
        } else {
            Phase::Finalize
        }
    }
}

/// Keyed list reconciliation engine
///
/// Owns the identity table exclusively; the host's container is only touched
/// through the [`ViewHost`] passed to each step.
pub struct Synchronizer<T, N> {
    selector: IdentitySelector<T>,
    names: Rc<SlotNames>,
    allow_element_recycling: bool,
    entries: IdentityTable<Entry<N, T>>,
    synchronized_count: usize,
    pass: Option<Pass<T, N>>,
    metrics: SyncMetrics,
}

impl<T: Clone, N: ViewNode<T>> Synchronizer<T, N> {
    /// Create an engine with an empty identity table
    #[must_use]
    pub fn new(selector: IdentitySelector<T>, names: SlotNames, allow_element_recycling: bool) -> Self {
        Self {
            selector,
            names: Rc::new(names),
            allow_element_recycling,
            entries: IdentityTable::new(),
            synchronized_count: 0,
            pass: None,
            metrics: SyncMetrics::new(),
        }
    }

    /// Compute the identities of `items`, rejecting duplicates
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` on the first repeated identity, or the
    /// selector's error
    pub fn identities_for(&self, items: &ItemAccessor<T>) -> CoreResult<Vec<Identity>> {
        let length = items.length();
        // the reported length is untrusted until items are actually read
        let capacity = length.min(PREALLOCATION_LIMIT);
        let mut identities = Vec::with_capacity(capacity);
        let mut seen = HashSet::with_capacity(capacity);
        for index in 0..length {
            let item = items
                .get(index)
                .ok_or_else(|| CoreError::internal(format!("item {} vanished from its source", index)))?;
            let identity = self.selector.select(&item)?;
            if !seen.insert(identity.clone()) {
                return Err(CoreError::duplicate(&identity));
            }
            identities.push(identity);
        }
        Ok(identities)
    }

    /// Start a pass over `items`, cancelling the pass in flight
    ///
    /// Identities are validated first; on failure nothing changes, not even
    /// the pass in flight.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` or a selector error from validation, or the
    /// error of reabsorbing the cancelled pass's carcasses
    pub fn begin(&mut self, items: ItemAccessor<T>) -> CoreResult<()> {
        let identities = self.identities_for(&items)?;
        if self.abort()? {
            debug!("restarting synchronization");
        }
        debug!(
            items = identities.len(),
            tracked = self.entries.len(),
            "starting synchronization pass"
        );
        self.metrics.record_pass_start();
        self.pass = Some(Pass::new(items, identities));
        Ok(())
    }

    /// Run one step of the pass in flight
    ///
    /// A failing step aborts the pass before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the step's error: `DuplicateIdentity`, `UnknownIdentity`,
    /// `DetachedNode` or `Internal`
    pub fn step<H>(&mut self, host: &mut H) -> CoreResult<StepOutcome>
    where
        H: ViewHost<T, Node = N>,
    {
        let Some(mut pass) = self.pass.take() else {
            return Ok(StepOutcome::Done);
        };
        self.metrics.record_step();

        match self.advance(&mut pass, host) {
            Ok(StepOutcome::Continue) => {
                self.pass = Some(pass);
                Ok(StepOutcome::Continue)
            }
            Ok(StepOutcome::Done) => Ok(StepOutcome::Done),
            Err(err) => {
                self.pass = Some(pass);
                if let Err(abort_err) = self.abort() {
                    error!(%abort_err, "failed to reabsorb carcasses of a failed pass");
                }
                Err(err)
            }
        }
    }

    /// Run the pass in flight to completion
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error
    pub fn run_to_completion<H>(&mut self, host: &mut H) -> CoreResult<()>
    where
        H: ViewHost<T, Node = N>,
    {
        while self.step(host)? == StepOutcome::Continue {}
        Ok(())
    }

    /// Cancel the pass in flight
    ///
    /// Collected carcasses are still attached, so they go back into the
    /// identity table under the identity of the item they still show.
    /// Returns whether a pass was cancelled.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` or a selector error if a carcass cannot be
    /// re-registered
    pub fn abort(&mut self) -> CoreResult<bool> {
        let Some(pass) = self.pass.take() else {
            return Ok(false);
        };
        self.metrics.record_pass_abort();

        let carcasses = pass.carcasses.unwrap_or_default();
        debug!(reabsorbed = carcasses.len(), "aborting synchronization pass");
        for node in carcasses {
            let identity = self.identity_of(&node)?;
            let context = node.context().clone();
            self.entries.insert(identity, Entry { node, context })?;
        }
        Ok(true)
    }

    fn advance<H>(&mut self, pass: &mut Pass<T, N>, host: &mut H) -> CoreResult<StepOutcome>
    where
        H: ViewHost<T, Node = N>,
    {
        match pass.phase() {
            Phase::Scan => {
                let index = pass.step;
                self.scan(pass, host, index)?;
                pass.step += 1;
            }
            Phase::CollectCarcasses => self.collect_carcasses(pass, host)?,
            Phase::DrainAdditions => {
                let Some(added) = pass.added.pop_front() else {
                    return Err(CoreError::internal("addition queue drained early"));
                };
                if self.entries.contains(added.identity.as_str()) {
                    return Err(CoreError::duplicate(&added.identity));
                }
                let carcass = if self.allow_element_recycling {
                    pass.carcasses.as_mut().and_then(Vec::pop)
                } else {
                    None
                };
                match carcass {
                    Some(carcass) => self.revive(host, carcass, added)?,
                    None => self.materialize(host, added)?,
                }
            }
            Phase::Finalize => {
                self.finalize(pass, host);
                return Ok(StepOutcome::Done);
            }
        }
        Ok(StepOutcome::Continue)
    }

    fn scan<H>(&mut self, pass: &mut Pass<T, N>, host: &mut H, index: usize) -> CoreResult<()>
    where
        H: ViewHost<T, Node = N>,
    {
        let identity = pass.identities[index].clone();
        let item = pass
            .items
            .get(index)
            .ok_or_else(|| CoreError::internal(format!("item {} vanished from its source", index)))?;

        let Some(entry) = self.entries.get(identity.as_str()) else {
            trace!(%identity, index, "queued for addition");
            let previous = index.checked_sub(1).map(|p| pass.identities[p].clone());
            pass.added.push_back(AddedItem {
                index,
                item,
                identity,
                previous,
            });
            return Ok(());
        };
        let node = entry.node.clone();
        let context = entry.context.clone();

        host.set_visible(&node, true);
        context.set_item(item);
        context.set_index(index);

        if let Some(resurrected) = pass.presumed_dead.shift_take(identity.as_str()) {
            trace!(%identity, index, "resurrected");
            let before = host.next_sibling(&pass.cursor);
            place::<T, H>(host, &resurrected, before);
            self.metrics.record_resurrect();
            pass.cursor = Cursor::After(resurrected);
            return Ok(());
        }

        // Everything between the cursor and the matched node is presumed dead.
        // Meeting a node already presumed dead in this pass means the matched
        // node is not ahead of the cursor at all.
        loop {
            match host.next_sibling(&pass.cursor) {
                Some(next) if next == node => break,
                Some(next) => {
                    let next_identity = self.identity_of(&next)?;
                    if pass.presumed_dead.contains(next_identity.as_str()) {
                        return Err(CoreError::DetachedNode { identity });
                    }
                    self.presume_dead(pass, host, next_identity, next)?;
                }
                None => return Err(CoreError::DetachedNode { identity }),
            }
        }
        trace!(%identity, index, "kept in place");
        pass.cursor = Cursor::After(node);
        Ok(())
    }

    fn collect_carcasses<H>(&mut self, pass: &mut Pass<T, N>, host: &mut H) -> CoreResult<()>
    where
        H: ViewHost<T, Node = N>,
    {
        let alive = pass.identities.len() - pass.added.len();
        let unvisited = self
            .synchronized_count
            .checked_sub(pass.presumed_dead.len() + alive)
            .ok_or_else(|| CoreError::internal("more nodes accounted for than synchronized"))?;

        for _ in 0..unvisited {
            let next = host
                .next_sibling(&pass.cursor)
                .ok_or_else(|| CoreError::internal("synchronized range ended before every node was visited"))?;
            let identity = self.identity_of(&next)?;
            self.presume_dead(pass, host, identity, next)?;
        }

        let mut carcasses = Vec::with_capacity(pass.presumed_dead.len());
        for (identity, node) in pass.presumed_dead.drain() {
            self.entries.remove(identity.as_str())?;
            carcasses.push(node);
        }
        debug!(
            carcasses = carcasses.len(),
            additions = pass.added.len(),
            "carcasses collected"
        );
        pass.carcasses = Some(carcasses);
        Ok(())
    }

    fn presume_dead<H>(
        &mut self,
        pass: &mut Pass<T, N>,
        host: &mut H,
        identity: Identity,
        node: N,
    ) -> CoreResult<()>
    where
        H: ViewHost<T, Node = N>,
    {
        trace!(%identity, "presumed dead");
        host.set_visible(&node, false);
        host.insert_before(&node, Position::End);
        pass.presumed_dead.insert(identity, node)?;
        self.metrics.record_presumed_dead();
        Ok(())
    }

    fn revive<H>(&mut self, host: &mut H, carcass: N, added: AddedItem<T>) -> CoreResult<()>
    where
        H: ViewHost<T, Node = N>,
    {
        trace!(identity = %added.identity, index = added.index, "reviving carcass");
        host.set_visible(&carcass, true);
        self.attach_after(host, &carcass, added.previous.as_ref())?;

        let context = carcass.context().clone();
        context.set_item(added.item);
        context.set_index(added.index);

        self.entries.insert(
            added.identity,
            Entry {
                node: carcass,
                context,
            },
        )?;
        self.metrics.record_revive();
        Ok(())
    }

    fn materialize<H>(&mut self, host: &mut H, added: AddedItem<T>) -> CoreResult<()>
    where
        H: ViewHost<T, Node = N>,
    {
        trace!(identity = %added.identity, index = added.index, "materializing");
        let context = ViewContext::new(added.item, added.index, Rc::clone(&self.names));
        let node = host.materialize(context.clone());

        self.entries.insert(
            added.identity,
            Entry {
                node: node.clone(),
                context,
            },
        )?;
        self.attach_after(host, &node, added.previous.as_ref())?;
        self.synchronized_count += 1;
        self.metrics.record_materialize();
        Ok(())
    }

    fn finalize<H>(&mut self, pass: &mut Pass<T, N>, host: &mut H)
    where
        H: ViewHost<T, Node = N>,
    {
        let mut carcasses = pass.carcasses.take().unwrap_or_default();
        let disposed = carcasses.len();
        while let Some(carcass) = carcasses.pop() {
            host.dispose(carcass);
        }

        self.synchronized_count = pass.identities.len();
        self.metrics.record_dispose(disposed as u64);
        self.metrics.record_pass_complete();
        debug!(
            synchronized = self.synchronized_count,
            disposed,
            "synchronization pass complete"
        );
    }

    /// Insert `node` right after the node of `previous`, or at the range start
    fn attach_after<H>(&self, host: &mut H, node: &N, previous: Option<&Identity>) -> CoreResult<()>
    where
        H: ViewHost<T, Node = N>,
    {
        let anchor = match previous {
            Some(identity) => {
                let entry = self
                    .entries
                    .get(identity.as_str())
                    .ok_or_else(|| CoreError::unknown(identity))?;
                Cursor::After(entry.node.clone())
            }
            None => Cursor::Start,
        };
        let before = host.next_sibling(&anchor);
        place::<T, H>(host, node, before);
        Ok(())
    }

    /// Identity of the item a node is currently bound to
    ///
    /// # Errors
    ///
    /// Returns the selector's error
    pub fn identity_of(&self, node: &N) -> CoreResult<Identity> {
        node.context().with_item(|item| self.selector.select(item))
    }
}

impl<T, N> Synchronizer<T, N> {
    /// Check if a pass is in flight
    #[must_use]
    pub fn is_synchronizing(&self) -> bool {
        self.pass.is_some()
    }

    /// Phase of the pass in flight
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        self.pass.as_ref().map(Pass::phase)
    }

    /// Number of nodes attached to the synchronized range
    #[must_use]
    pub fn synchronized_count(&self) -> usize {
        self.synchronized_count
    }

    /// Number of identities with a live node
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.entries.len()
    }

    /// Entry tracked for `identity`
    #[must_use]
    pub fn entry(&self, identity: &str) -> Option<&Entry<N, T>> {
        self.entries.get(identity)
    }

    /// Node tracked for `identity`
    #[must_use]
    pub fn node_for(&self, identity: &str) -> Option<&N> {
        self.entries.get(identity).map(|entry| &entry.node)
    }

    /// Tracked identities
    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.entries.identities()
    }

    /// Identity selector in use
    #[must_use]
    pub fn selector(&self) -> &IdentitySelector<T> {
        &self.selector
    }

    /// Counters accumulated so far
    #[must_use]
    pub fn metrics(&self) -> &SyncMetrics {
        &self.metrics
    }

    /// Mutable counters, for the scheduler's own records
    pub fn metrics_mut(&mut self) -> &mut SyncMetrics {
        &mut self.metrics
    }
}

impl<T, N> fmt::Debug for Synchronizer<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("tracked", &self.entries.len())
            .field("synchronized_count", &self.synchronized_count)
            .field("phase", &self.pass.as_ref().map(Pass::phase))
            .field("allow_element_recycling", &self.allow_element_recycling)
            .finish()
    }
}

/// Move `node` in front of `before`, unless it already sits there
fn place<T, H>(host: &mut H, node: &H::Node, before: Option<H::Node>)
where
    H: ViewHost<T>,
{
    if before.as_ref() == Some(node) {
        return;
    }
    host.insert_before(node, before.map_or(Position::End, Position::Before));
}
