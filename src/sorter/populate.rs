/// Progressive tree materialization
///
/// Turning tens of thousands of group nodes into on-screen rows in one
/// synchronous pass freezes the interface, so the populator processes
/// a bounded chunk per scheduling tick and hands control back to the
/// host between chunks. The host owns the scheduling primitive: it
/// calls `process_chunk` and arranges a later, non-reentrant call for
/// as long as the populator reports progress (in the iced shell, by
/// returning a `Task` that loops a tick message back into `update`).
///
/// The populator is generic over the host's element type and never
/// inspects it; it only guarantees call order, chunk bounds, one
/// finalization pass, and cancellation at chunk boundaries.

use crate::state::data::SortGroup;

/// Nodes materialized per scheduling tick unless the host overrides it
pub const DEFAULT_CHUNK_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Cancelled,
}

/// Column the finalization pass orders the materialized rows by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    UnsortedCount,
    TotalCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Display state derived for a node on every materialization.
///
/// These are state, not style: they are recomputed from the node's
/// counts each run and never cached across regenerations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowState {
    /// Every member card fully sorted: checked and muted
    pub checked: bool,
    /// Checked while the show-sorted preference is off
    pub hidden: bool,
    /// Zero unsorted copies without every member checked
    pub struck: bool,
    /// Single-card leaf: rendered italic
    pub leaf: bool,
}

impl RowState {
    fn derive(node: &SortGroup, show_sorted: bool) -> Self {
        let checked = !node.cards.is_empty() && node.all_sorted;
        RowState {
            checked,
            hidden: checked && !show_sorted,
            struck: node.unsorted_count == 0 && !checked,
            leaf: node.is_card_leaf,
        }
    }
}

/// One materialized row: the host's element plus the sort columns the
/// finalization pass orders by.
#[derive(Debug, Clone)]
pub struct Materialized<E> {
    pub group_name: String,
    pub total_count: u32,
    pub unsorted_count: u32,
    pub state: RowState,
    pub element: E,
}

#[derive(Debug, Clone, Copy)]
pub struct PopulateOptions {
    pub chunk_size: usize,
    pub show_sorted: bool,
    pub sort_key: SortKey,
    pub direction: SortDirection,
}

impl Default for PopulateOptions {
    fn default() -> Self {
        PopulateOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            show_sorted: true,
            sort_key: SortKey::UnsortedCount,
            direction: SortDirection::Descending,
        }
    }
}

/// What one scheduling tick accomplished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Nothing to do: no populate is running
    Idle,
    /// A chunk was materialized; schedule another tick
    Progress { materialized: usize, remaining: usize },
    /// The finalization pass ran and the populator returned to idle
    Finished { total: usize },
}

type OnItem<E> = Box<dyn FnMut(&SortGroup, RowState) -> E>;
type OnFinished = Box<dyn FnOnce()>;

struct Run<E> {
    nodes: Vec<SortGroup>,
    cursor: usize,
    options: PopulateOptions,
    on_item: OnItem<E>,
    on_finished: Option<OnFinished>,
    items: Vec<Materialized<E>>,
}

/// The resumable, cancellable populate state machine:
/// Idle → Running → (Idle on finish | Cancelled).
///
/// Only one populate runs at a time against a given populator;
/// starting a new one atomically cancels the in-flight run. Dropping
/// the populator (the owning view going away) cancels as well: the
/// pending `on_finished` is simply never invoked.
pub struct TreePopulator<E> {
    phase: Phase,
    run: Option<Run<E>>,
    finished_items: Vec<Materialized<E>>,
}

impl<E> Default for TreePopulator<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TreePopulator<E> {
    pub fn new() -> Self {
        TreePopulator {
            phase: Phase::Idle,
            run: None,
            finished_items: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Begin materializing `nodes` in order.
    ///
    /// Any in-flight run is cancelled first: its remaining nodes are
    /// discarded and its `on_finished` will never fire.
    pub fn start(
        &mut self,
        nodes: Vec<SortGroup>,
        options: PopulateOptions,
        on_item: impl FnMut(&SortGroup, RowState) -> E + 'static,
        on_finished: impl FnOnce() + 'static,
    ) {
        debug_assert!(options.chunk_size >= 1);
        self.run = Some(Run {
            nodes,
            cursor: 0,
            options,
            on_item: Box::new(on_item),
            on_finished: Some(Box::new(on_finished)),
            items: Vec::new(),
        });
        self.finished_items.clear();
        self.phase = Phase::Running;
    }

    /// Stop before the next chunk begins. The current chunk has
    /// already completed (cancellation is only observed at chunk
    /// boundaries) and `on_finished` will not be invoked.
    pub fn cancel(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Cancelled;
            self.run = None;
            self.finished_items.clear();
        }
    }

    /// Materialize the next chunk, or run the finalization pass if the
    /// cursor is past the last node. The finalization pass re-sorts
    /// the materialized rows by the run's sort key and invokes
    /// `on_finished` exactly once, strictly after the last `on_item`.
    pub fn process_chunk(&mut self) -> ChunkOutcome {
        if self.phase != Phase::Running {
            return ChunkOutcome::Idle;
        }
        // Take the run for the duration of the tick; a progressing run
        // is put back, a finalized one is consumed.
        let Some(mut run) = self.run.take() else {
            return ChunkOutcome::Idle;
        };

        if run.cursor < run.nodes.len() {
            let start = run.cursor;
            let end = (start + run.options.chunk_size.max(1)).min(run.nodes.len());
            for node in &run.nodes[start..end] {
                let state = RowState::derive(node, run.options.show_sorted);
                let element = (run.on_item)(node, state);
                run.items.push(Materialized {
                    group_name: node.group_name.clone(),
                    total_count: node.total_count,
                    unsorted_count: node.unsorted_count,
                    state,
                    element,
                });
            }
            run.cursor = end;
            let outcome = ChunkOutcome::Progress {
                materialized: end - start,
                remaining: run.nodes.len() - end,
            };
            self.run = Some(run);
            return outcome;
        }

        // Finalization tick: deliberately one tick after the last
        // chunk so a cancel arriving in between still wins.
        sort_items(&mut run.items, run.options.sort_key, run.options.direction);
        let total = run.items.len();
        self.finished_items = run.items;
        self.phase = Phase::Idle;
        if let Some(on_finished) = run.on_finished.take() {
            on_finished();
        }
        ChunkOutcome::Finished { total }
    }

    /// Rows materialized so far; grows while a run is in flight so the
    /// host can draw progressively.
    pub fn items(&self) -> &[Materialized<E>] {
        match &self.run {
            Some(run) => &run.items,
            None => &self.finished_items,
        }
    }
}

fn sort_items<E>(items: &mut [Materialized<E>], key: SortKey, direction: SortDirection) {
    items.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Name => a.group_name.cmp(&b.group_name),
            SortKey::UnsortedCount => a.unsorted_count.cmp(&b.unsorted_count),
            SortKey::TotalCount => a.total_count.cmp(&b.total_count),
        };
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::collection::Collection;
    use crate::state::data::test_card;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn nodes_named(names: &[&str]) -> Vec<SortGroup> {
        let collection = Collection::new();
        names
            .iter()
            .map(|n| SortGroup::from_members(n.to_string(), vec![], collection.cards()))
            .collect()
    }

    fn options(chunk_size: usize) -> PopulateOptions {
        PopulateOptions {
            chunk_size,
            // Keep input order in finalization: names are ascending
            sort_key: SortKey::Name,
            direction: SortDirection::Ascending,
            show_sorted: true,
        }
    }

    #[test]
    fn test_items_in_order_exactly_once_and_single_finish() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let finished = Rc::new(Cell::new(0u32));
        let mut populator: TreePopulator<()> = TreePopulator::new();

        let seen_in = Rc::clone(&seen);
        let finished_in = Rc::clone(&finished);
        populator.start(
            nodes_named(&["A", "B", "C", "D", "E"]),
            options(2),
            move |node, _| seen_in.borrow_mut().push(node.group_name.clone()),
            move || finished_in.set(finished_in.get() + 1),
        );

        let mut outcomes = Vec::new();
        loop {
            let outcome = populator.process_chunk();
            outcomes.push(outcome);
            if matches!(outcome, ChunkOutcome::Finished { .. } | ChunkOutcome::Idle) {
                break;
            }
            // on_finished must not fire before the final pass
            assert_eq!(finished.get(), 0);
        }

        assert_eq!(*seen.borrow(), ["A", "B", "C", "D", "E"]);
        assert_eq!(finished.get(), 1);
        assert_eq!(populator.phase(), Phase::Idle);
        assert_eq!(
            outcomes,
            vec![
                ChunkOutcome::Progress { materialized: 2, remaining: 3 },
                ChunkOutcome::Progress { materialized: 2, remaining: 1 },
                ChunkOutcome::Progress { materialized: 1, remaining: 0 },
                ChunkOutcome::Finished { total: 5 },
            ]
        );

        // Further ticks are no-ops
        assert_eq!(populator.process_chunk(), ChunkOutcome::Idle);
        assert_eq!(finished.get(), 1);
    }

    #[test]
    fn test_tick_without_start_is_idle() {
        let mut populator: TreePopulator<()> = TreePopulator::new();
        assert_eq!(populator.process_chunk(), ChunkOutcome::Idle);
        assert_eq!(populator.phase(), Phase::Idle);
        assert!(populator.items().is_empty());
    }

    #[test]
    fn test_empty_input_still_finishes_exactly_once() {
        let finished = Rc::new(Cell::new(0u32));
        let finished_in = Rc::clone(&finished);
        let mut populator: TreePopulator<()> = TreePopulator::new();
        populator.start(Vec::new(), options(10), |_, _| (), move || {
            finished_in.set(finished_in.get() + 1)
        });

        assert_eq!(populator.process_chunk(), ChunkOutcome::Finished { total: 0 });
        assert_eq!(finished.get(), 1);
    }

    #[test]
    fn test_cancel_stops_before_next_chunk_and_skips_finish() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let finished = Rc::new(Cell::new(0u32));
        let mut populator: TreePopulator<()> = TreePopulator::new();

        let seen_in = Rc::clone(&seen);
        let finished_in = Rc::clone(&finished);
        populator.start(
            nodes_named(&["A", "B", "C", "D"]),
            options(2),
            move |node, _| seen_in.borrow_mut().push(node.group_name.clone()),
            move || finished_in.set(finished_in.get() + 1),
        );

        populator.process_chunk();
        populator.cancel();
        assert_eq!(populator.phase(), Phase::Cancelled);

        assert_eq!(populator.process_chunk(), ChunkOutcome::Idle);
        assert_eq!(*seen.borrow(), ["A", "B"]);
        assert_eq!(finished.get(), 0);
        assert!(populator.items().is_empty());
    }

    #[test]
    fn test_cancel_races_finalization() {
        // All chunks done, finalization tick not yet run: cancel wins
        let finished = Rc::new(Cell::new(0u32));
        let finished_in = Rc::clone(&finished);
        let mut populator: TreePopulator<()> = TreePopulator::new();
        populator.start(nodes_named(&["A", "B"]), options(2), |_, _| (), move || {
            finished_in.set(finished_in.get() + 1)
        });

        assert_eq!(
            populator.process_chunk(),
            ChunkOutcome::Progress { materialized: 2, remaining: 0 }
        );
        populator.cancel();
        assert_eq!(populator.process_chunk(), ChunkOutcome::Idle);
        assert_eq!(finished.get(), 0);
    }

    #[test]
    fn test_restart_cancels_in_flight_run() {
        let finished_first = Rc::new(Cell::new(0u32));
        let finished_second = Rc::new(Cell::new(0u32));
        let mut populator: TreePopulator<String> = TreePopulator::new();

        let f1 = Rc::clone(&finished_first);
        populator.start(
            nodes_named(&["A", "B", "C", "D"]),
            options(1),
            |node, _| node.group_name.clone(),
            move || f1.set(f1.get() + 1),
        );
        populator.process_chunk();

        // New populate against the same target: the first run's
        // remaining nodes are discarded and its finish never fires.
        let f2 = Rc::clone(&finished_second);
        populator.start(
            nodes_named(&["X", "Y"]),
            options(10),
            |node, _| node.group_name.clone(),
            move || f2.set(f2.get() + 1),
        );
        while populator.process_chunk() != ChunkOutcome::Idle {}

        assert_eq!(finished_first.get(), 0);
        assert_eq!(finished_second.get(), 1);
        let names: Vec<&str> = populator.items().iter().map(|m| m.group_name.as_str()).collect();
        assert_eq!(names, ["X", "Y"]);
    }

    #[test]
    fn test_finalization_resorts_by_sort_key() {
        let mut populator: TreePopulator<()> = TreePopulator::new();
        let collection = Collection::from_cards(vec![
            test_card("Azusa", 1, 0),
            test_card("Brago", 5, 0),
            test_card("Colfenor", 3, 0),
        ]);
        let nodes: Vec<SortGroup> = collection
            .ids()
            .into_iter()
            .map(|id| {
                SortGroup::from_members(
                    collection.card(id).name.clone(),
                    vec![id],
                    collection.cards(),
                )
            })
            .collect();

        populator.start(
            nodes,
            PopulateOptions {
                chunk_size: 2,
                show_sorted: true,
                sort_key: SortKey::UnsortedCount,
                direction: SortDirection::Descending,
            },
            |_, _| (),
            || {},
        );
        while populator.process_chunk() != ChunkOutcome::Idle {
            if populator.phase() == Phase::Idle {
                break;
            }
        }

        let names: Vec<&str> = populator.items().iter().map(|m| m.group_name.as_str()).collect();
        assert_eq!(names, ["Brago", "Colfenor", "Azusa"]);
    }

    #[test]
    fn test_row_state_flags() {
        let collection = Collection::from_cards(vec![
            test_card("Azusa", 2, 2),
            test_card("Brago", 3, 0),
        ]);

        let sorted_group =
            SortGroup::from_members("Done".to_string(), vec![0], collection.cards());
        let open_group = SortGroup::from_members("Open".to_string(), vec![1], collection.cards());
        let mut leaf = SortGroup::from_members("Leaf".to_string(), vec![1], collection.cards());
        leaf.is_card_leaf = true;
        let empty = SortGroup::from_members("Empty".to_string(), vec![], collection.cards());

        let mut flags = Vec::new();
        let mut populator: TreePopulator<()> = TreePopulator::new();
        let collected = Rc::new(RefCell::new(Vec::new()));
        let collected_in = Rc::clone(&collected);
        populator.start(
            vec![sorted_group, open_group, leaf, empty],
            PopulateOptions {
                chunk_size: 10,
                show_sorted: false,
                sort_key: SortKey::Name,
                direction: SortDirection::Ascending,
            },
            move |_, state| collected_in.borrow_mut().push(state),
            || {},
        );
        while populator.process_chunk() != ChunkOutcome::Idle {
            if populator.phase() == Phase::Idle {
                break;
            }
        }
        flags.extend(collected.borrow().iter().copied());

        // Fully sorted: checked, and hidden because show_sorted is off
        assert!(flags[0].checked && flags[0].hidden && !flags[0].struck);
        // Unsorted work remaining: plain row
        assert!(!flags[1].checked && !flags[1].hidden && !flags[1].struck);
        // Leaf flag carries through
        assert!(flags[2].leaf);
        // No members at all: not checked, but struck (nothing left to do)
        assert!(!flags[3].checked && flags[3].struck);
    }
}
