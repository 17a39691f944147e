use std::collections::{BTreeSet, HashMap, HashSet};

use crate::identity::StableId;

/// A selection range between two entries, resolved against the live flat
/// order each time it is read. Without an end it selects `start` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSpan {
    pub start: StableId,
    pub end: Option<StableId>,
}

impl SelectionSpan {
    pub fn single(id: StableId) -> Self {
        Self { start: id, end: None }
    }
}

/// Ordered list of spans. Each endpoint occurrence accounts for one unit of
/// registry interest held by the controller, so every method that drops an
/// endpoint reports it back for release.
#[derive(Debug, Clone, Default)]
pub struct SelectionSpans {
    spans: Vec<SelectionSpan>,
}

impl SelectionSpans {
    pub fn spans(&self) -> &[SelectionSpan] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn select(&mut self, id: StableId) {
        self.spans.push(SelectionSpan::single(id));
    }

    /// Move the most recent span's end to `id`, or start a span if there is
    /// none. Returns the end that was replaced.
    pub fn shift_select(&mut self, id: StableId) -> Option<StableId> {
        match self.spans.last_mut() {
            Some(span) => span.end.replace(id),
            None => {
                self.select(id);
                None
            }
        }
    }

    /// Remove `id` from every span endpoint, dropping spans left empty.
    /// Returns how many endpoint occurrences were removed.
    pub fn deselect(&mut self, id: StableId) -> usize {
        let mut removed = 0;
        self.spans.retain_mut(|span| {
            if span.end == Some(id) {
                span.end = None;
                removed += 1;
            }
            if span.start == id {
                removed += 1;
                match span.end.take() {
                    Some(end) => span.start = end,
                    None => return false,
                }
            }
            true
        });
        removed
    }

    /// Drop every span and return each endpoint occurrence.
    pub fn clear(&mut self) -> Vec<StableId> {
        self.spans
            .drain(..)
            .flat_map(|span| std::iter::once(span.start).chain(span.end))
            .collect()
    }

    /// Union of all spans against `order`.
    ///
    /// Visible ids come back in flat order. Endpoints that are not visible
    /// (collapsed away, or deleted but still referenced) follow in span
    /// order; a range whose endpoints are not both visible degrades to its
    /// endpoints.
    pub fn resolve(&self, order: &[StableId]) -> Vec<StableId> {
        let positions: HashMap<StableId, usize> =
            order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut visible: BTreeSet<usize> = BTreeSet::new();
        let mut hidden: Vec<StableId> = Vec::new();
        let mut push_endpoint = |id: StableId, visible: &mut BTreeSet<usize>| {
            match positions.get(&id) {
                Some(&pos) => {
                    visible.insert(pos);
                }
                None => {
                    if !hidden.contains(&id) {
                        hidden.push(id);
                    }
                }
            }
        };

        for span in &self.spans {
            let range = span.end.and_then(|end| {
                let a = positions.get(&span.start)?;
                let b = positions.get(&end)?;
                Some((*a.min(b), *a.max(b)))
            });
            match (range, span.end) {
                (Some((lo, hi)), _) => visible.extend(lo..=hi),
                (None, Some(end)) => {
                    push_endpoint(span.start, &mut visible);
                    push_endpoint(end, &mut visible);
                }
                (None, None) => push_endpoint(span.start, &mut visible),
            }
        }

        let mut seen: HashSet<StableId> = HashSet::new();
        visible
            .into_iter()
            .map(|pos| order[pos])
            .chain(hidden)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<StableId> {
        raw.iter().map(|&r| StableId::from_raw(r)).collect()
    }

    fn id(raw: u32) -> StableId {
        StableId::from_raw(raw)
    }

    #[test]
    fn shift_select_resolves_range() {
        let order = ids(&[1, 2, 3, 4]);
        let mut sel = SelectionSpans::default();
        sel.select(id(1));
        sel.shift_select(id(3));
        assert_eq!(sel.resolve(&order), ids(&[1, 2, 3]));
        assert_eq!(sel.shift_select(id(4)), Some(id(3)));
        assert_eq!(sel.resolve(&order), ids(&[1, 2, 3, 4]));
    }

    #[test]
    fn range_is_direction_agnostic() {
        let order = ids(&[1, 2, 3, 4]);
        let mut sel = SelectionSpans::default();
        sel.select(id(4));
        sel.shift_select(id(2));
        assert_eq!(sel.resolve(&order), ids(&[2, 3, 4]));
    }

    #[test]
    fn range_follows_reordering() {
        let mut sel = SelectionSpans::default();
        sel.select(id(1));
        sel.shift_select(id(3));
        let reordered = ids(&[3, 9, 1, 2]);
        assert_eq!(sel.resolve(&reordered), ids(&[3, 9, 1]));
    }

    #[test]
    fn shift_select_without_span_starts_one() {
        let mut sel = SelectionSpans::default();
        assert_eq!(sel.shift_select(id(2)), None);
        assert_eq!(sel.spans(), &[SelectionSpan::single(id(2))]);
    }

    #[test]
    fn spans_union() {
        let order = ids(&[1, 2, 3, 4, 5]);
        let mut sel = SelectionSpans::default();
        sel.select(id(1));
        sel.shift_select(id(2));
        sel.select(id(4));
        sel.select(id(2));
        assert_eq!(sel.resolve(&order), ids(&[1, 2, 4]));
    }

    #[test]
    fn deselect_drops_emptied_spans() {
        let mut sel = SelectionSpans::default();
        sel.select(id(1));
        sel.select(id(2));
        sel.shift_select(id(3));
        assert_eq!(sel.deselect(id(1)), 1);
        assert_eq!(sel.spans().len(), 1);
        assert_eq!(sel.deselect(id(2)), 1);
        assert_eq!(sel.spans(), &[SelectionSpan::single(id(3))]);
        assert_eq!(sel.deselect(id(3)), 1);
        assert!(sel.is_empty());
    }

    #[test]
    fn deselect_span_with_equal_endpoints() {
        let mut sel = SelectionSpans::default();
        sel.select(id(5));
        sel.shift_select(id(5));
        assert_eq!(sel.deselect(id(5)), 2);
        assert!(sel.is_empty());
    }

    #[test]
    fn hidden_endpoints_are_kept() {
        let order = ids(&[1, 2]);
        let mut sel = SelectionSpans::default();
        sel.select(id(7));
        sel.select(id(1));
        sel.shift_select(id(8));
        assert_eq!(sel.resolve(&order), ids(&[1, 7, 8]));
    }

    #[test]
    fn clear_returns_every_endpoint() {
        let mut sel = SelectionSpans::default();
        sel.select(id(1));
        sel.shift_select(id(2));
        sel.select(id(3));
        assert_eq!(sel.clear(), ids(&[1, 2, 3]));
        assert!(sel.is_empty());
    }
}
