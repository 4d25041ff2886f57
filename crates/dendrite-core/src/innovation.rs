use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// A structural innovation recorded during the current generation.
///
/// Records let two independent mutations that make the same structural
/// change receive the same historical markers, which is what keeps gene
/// alignment meaningful across the population.
#[derive(Clone, Debug, PartialEq)]
pub enum Innovation {
    AddNode {
        in_node: i64,
        out_node: i64,
        /// Innovation number of the link gene that was split.
        old_innovation: i64,
        node_id: i64,
        innovation_a: i64,
        innovation_b: i64,
    },
    AddLink {
        in_node: i64,
        out_node: i64,
        recurrent: bool,
        innovation: i64,
    },
}

/// Numbers handed out for an add-node event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AddNodeAlloc {
    pub node_id: i64,
    pub innovation_a: i64,
    pub innovation_b: i64,
    pub reused: bool,
}

/// Numbers handed out for an add-link event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AddLinkAlloc {
    pub innovation: i64,
    pub reused: bool,
}

/// The per-generation innovation registry plus the population's id counters.
///
/// The record list is the only mutable state shared between parallel
/// reproduction workers, so it sits behind a mutex; lookups and allocations
/// happen under one lock acquisition, which rules out double allocation.
/// The counters are atomics and survive [InnovationTracker::reset], keeping
/// innovation numbers monotone across the whole run.
#[derive(Debug)]
pub struct InnovationTracker {
    records: Mutex<Vec<Innovation>>,
    next_node_id: AtomicI64,
    next_innovation: AtomicI64,
    // where this generation's allocations started; canonical renumbering
    // rewrites everything at or past these marks
    node_id_base: AtomicI64,
    innovation_base: AtomicI64,
}

impl InnovationTracker {
    pub fn new(next_node_id: i64, next_innovation: i64) -> Self {
        InnovationTracker {
            records: Mutex::new(Vec::new()),
            next_node_id: AtomicI64::new(next_node_id),
            next_innovation: AtomicI64::new(next_innovation),
            node_id_base: AtomicI64::new(next_node_id),
            innovation_base: AtomicI64::new(next_innovation),
        }
    }

    /// Look up an add-node event against the same split link, or allocate a
    /// fresh node id and innovation pair and record the event.
    pub fn check_add_node(&self, in_node: i64, out_node: i64, old_innovation: i64) -> AddNodeAlloc {
        let mut records = self.records.lock().unwrap();

        for record in records.iter() {
            if let Innovation::AddNode {
                old_innovation: old,
                node_id,
                innovation_a,
                innovation_b,
                ..
            } = record
            {
                if *old == old_innovation {
                    return AddNodeAlloc {
                        node_id: *node_id,
                        innovation_a: *innovation_a,
                        innovation_b: *innovation_b,
                        reused: true,
                    };
                }
            }
        }

        let node_id = self.next_node_id.fetch_add(1, Ordering::Relaxed);
        let innovation_a = self.next_innovation.fetch_add(2, Ordering::Relaxed);
        let innovation_b = innovation_a + 1;
        records.push(Innovation::AddNode {
            in_node,
            out_node,
            old_innovation,
            node_id,
            innovation_a,
            innovation_b,
        });

        AddNodeAlloc {
            node_id,
            innovation_a,
            innovation_b,
            reused: false,
        }
    }

    /// Look up an add-link event for the same `(in, out, recurrent)` edge,
    /// or allocate a fresh innovation number and record the event. Weights
    /// stay with the genome that rolled them; only the number is shared.
    pub fn check_add_link(&self, in_node: i64, out_node: i64, recurrent: bool) -> AddLinkAlloc {
        let mut records = self.records.lock().unwrap();

        for record in records.iter() {
            if let Innovation::AddLink {
                in_node: rin,
                out_node: rout,
                recurrent: rrec,
                innovation,
            } = record
            {
                if *rin == in_node && *rout == out_node && *rrec == recurrent {
                    return AddLinkAlloc {
                        innovation: *innovation,
                        reused: true,
                    };
                }
            }
        }

        let innovation = self.next_innovation.fetch_add(1, Ordering::Relaxed);
        records.push(Innovation::AddLink {
            in_node,
            out_node,
            recurrent,
            innovation,
        });

        AddLinkAlloc {
            innovation,
            reused: false,
        }
    }

    /// Drop this generation's records and advance the generation marks.
    /// Counters keep running.
    pub fn reset(&self) {
        self.records.lock().unwrap().clear();
        self.node_id_base
            .store(self.next_node_id.load(Ordering::Relaxed), Ordering::Relaxed);
        self.innovation_base.store(
            self.next_innovation.load(Ordering::Relaxed),
            Ordering::Relaxed,
        );
    }

    /// Remappings from the numbers handed out this generation (in arrival
    /// order) to canonical numbers (in event-key order).
    ///
    /// Parallel reproduction makes arrival order a function of worker
    /// scheduling; renumbering against a schedule-independent key restores
    /// the guarantee that the order species reproduce in is unobservable.
    /// Returns `(innovation_map, node_id_map)`.
    pub fn canonical_maps(&self) -> (HashMap<i64, i64>, HashMap<i64, i64>) {
        let records = self.records.lock().unwrap();

        let mut ordered: Vec<&Innovation> = records.iter().collect();
        ordered.sort_by_key(|record| match record {
            Innovation::AddNode {
                old_innovation, ..
            } => (0, *old_innovation, 0, false),
            Innovation::AddLink {
                in_node,
                out_node,
                recurrent,
                ..
            } => (1, *in_node, *out_node, *recurrent),
        });

        let mut innovation_map = HashMap::new();
        let mut node_id_map = HashMap::new();
        let mut innovation_cursor = self.innovation_base.load(Ordering::Relaxed);
        let mut node_cursor = self.node_id_base.load(Ordering::Relaxed);

        for record in ordered {
            match record {
                Innovation::AddNode {
                    node_id,
                    innovation_a,
                    innovation_b,
                    ..
                } => {
                    innovation_map.insert(*innovation_a, innovation_cursor);
                    innovation_map.insert(*innovation_b, innovation_cursor + 1);
                    innovation_cursor += 2;
                    node_id_map.insert(*node_id, node_cursor);
                    node_cursor += 1;
                }
                Innovation::AddLink { innovation, .. } => {
                    innovation_map.insert(*innovation, innovation_cursor);
                    innovation_cursor += 1;
                }
            }
        }

        (innovation_map, node_id_map)
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn peek_next_node_id(&self) -> i64 {
        self.next_node_id.load(Ordering::Relaxed)
    }

    pub fn peek_next_innovation(&self) -> i64 {
        self.next_innovation.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_node_deduplicates_within_a_generation() {
        let tracker = InnovationTracker::new(10, 100);
        let first = tracker.check_add_node(2, 4, 7);
        let second = tracker.check_add_node(2, 4, 7);
        assert!(!first.reused);
        assert!(second.reused);
        assert_eq!(first.node_id, second.node_id);
        assert_eq!(first.innovation_a, second.innovation_a);
        assert_eq!(first.innovation_b, second.innovation_b);
        assert_eq!(first.innovation_b, first.innovation_a + 1);
    }

    #[test]
    fn add_link_distinguishes_recurrency() {
        let tracker = InnovationTracker::new(10, 100);
        let forward = tracker.check_add_link(1, 4, false);
        let recurrent = tracker.check_add_link(1, 4, true);
        assert_ne!(forward.innovation, recurrent.innovation);

        let again = tracker.check_add_link(1, 4, false);
        assert!(again.reused);
        assert_eq!(again.innovation, forward.innovation);
    }

    #[test]
    fn reset_clears_records_but_not_counters() {
        let tracker = InnovationTracker::new(10, 100);
        tracker.check_add_link(1, 4, false);
        let before = tracker.peek_next_innovation();
        tracker.reset();
        assert_eq!(tracker.record_count(), 0);
        assert_eq!(tracker.peek_next_innovation(), before);
        // the same edge now gets a new number: the generation boundary passed
        let realloc = tracker.check_add_link(1, 4, false);
        assert!(!realloc.reused);
        assert_eq!(realloc.innovation, before);
    }

    #[test]
    fn canonical_maps_ignore_arrival_order() {
        // the same three events, recorded in two different orders, must
        // canonicalize to the same numbering
        let first = InnovationTracker::new(50, 100);
        first.check_add_link(1, 4, false);
        first.check_add_node(2, 4, 7);
        first.check_add_link(3, 4, false);

        let second = InnovationTracker::new(50, 100);
        second.check_add_link(3, 4, false);
        second.check_add_link(1, 4, false);
        second.check_add_node(2, 4, 7);

        let (innov_a, nodes_a) = first.canonical_maps();
        let (innov_b, nodes_b) = second.canonical_maps();

        let canon = |maps: &(std::collections::HashMap<i64, i64>, std::collections::HashMap<i64, i64>),
                     tracker: &InnovationTracker| {
            // project the canonical numbers for each event key
            let link_1_4 = tracker.check_add_link(1, 4, false);
            let link_3_4 = tracker.check_add_link(3, 4, false);
            let node = tracker.check_add_node(2, 4, 7);
            (
                maps.0[&link_1_4.innovation],
                maps.0[&link_3_4.innovation],
                maps.0[&node.innovation_a],
                maps.1[&node.node_id],
            )
        };

        assert_eq!(canon(&(innov_a, nodes_a), &first), canon(&(innov_b, nodes_b), &second));
    }

    #[test]
    fn innovation_numbers_are_strictly_increasing() {
        let tracker = InnovationTracker::new(0, 0);
        let mut last = -1;
        for i in 0..10 {
            let alloc = tracker.check_add_link(i, i + 100, false);
            assert!(alloc.innovation > last);
            last = alloc.innovation;
        }
        let node = tracker.check_add_node(0, 100, 0);
        assert!(node.innovation_a > last);
        assert!(node.innovation_b > node.innovation_a);
    }
}
