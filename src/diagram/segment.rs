//! Attribution of columns to the fragments of a split interval.
//!
//! A family is a top-level interval plus the fragments it was split into.
//! All members share one display row; the segmentation decides which member
//! owns each column of that row.

use std::collections::HashMap;

use log::warn;

use super::types::{Dump, InstrId, Interval, IntervalId};

/// One member's share of the column axis, `start..end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub interval: IntervalId,
    pub start: InstrId,
    pub end: InstrId,
}

impl Segment {
    pub fn contains(&self, col: InstrId) -> bool {
        self.start <= col && col < self.end
    }
}

/// Ordered, gap-free partition of `0..end` among family members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    segments: Vec<Segment>,
}

impl Segmentation {
    /// Members must be listed parent first, then children in order.
    pub fn new(members: &[&Interval]) -> Self {
        let mut segments = Vec::with_capacity(members.len());
        let mut running = 0;
        for member in members {
            // A member that ends before its predecessors gets an empty segment.
            let end = member.end().unwrap_or(running).max(running);
            segments.push(Segment {
                interval: member.id,
                start: running,
                end,
            });
            running = end;
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// End of the last segment
    pub fn end(&self) -> InstrId {
        self.segments.last().map(|s| s.end).unwrap_or(0)
    }

    /// Member owning `col`. Columns past the end belong to the last member.
    pub fn owner_at(&self, col: InstrId) -> Option<IntervalId> {
        let idx = self.segments.partition_point(|s| s.end <= col);
        self.segments
            .get(idx)
            .or_else(|| self.segments.last())
            .map(|s| s.interval)
    }
}

#[derive(Debug, Clone)]
pub struct Family<'a> {
    pub root: &'a Interval,
    /// Root first, then its children in listed order
    pub members: Vec<&'a Interval>,
    pub segmentation: Segmentation,
}

impl<'a> Family<'a> {
    pub fn new(dump: &'a Dump, root: &'a Interval) -> Self {
        let mut members = vec![root];
        members.extend(root.children.iter().filter_map(|id| dump.interval(*id)));
        let segmentation = Segmentation::new(&members);
        Self {
            root,
            members,
            segmentation,
        }
    }

    pub fn owner_at(&self, col: InstrId) -> IntervalId {
        self.segmentation.owner_at(col).unwrap_or(self.root.id)
    }

    pub fn member(&self, id: IntervalId) -> Option<&'a Interval> {
        self.members.iter().copied().find(|m| m.id == id)
    }
}

/// Every family of a dump, in row order, with a reverse index by member id
#[derive(Debug, Clone)]
pub struct Families<'a> {
    families: Vec<Family<'a>>,
    row_of: HashMap<IntervalId, usize>,
}

impl<'a> Families<'a> {
    pub fn new(dump: &'a Dump) -> Self {
        let families: Vec<Family<'a>> = dump.rows().map(|root| Family::new(dump, root)).collect();
        let mut row_of = HashMap::new();
        for (row, family) in families.iter().enumerate() {
            for member in &family.members {
                row_of.insert(member.id, row);
            }
        }
        Self { families, row_of }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Family<'a>> {
        self.families.iter()
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn family_of(&self, id: IntervalId) -> Option<&Family<'a>> {
        self.row_of.get(&id).map(|row| &self.families[*row])
    }

    pub fn row_of(&self, id: IntervalId) -> Option<usize> {
        self.row_of.get(&id).copied()
    }

    /// Family member an operand reference should point at, at column `col`.
    ///
    /// The referenced interval wins when it is live at `col`. Otherwise the
    /// first member in listing order whose ranges contain `col`, and failing
    /// that the segmentation owner. In between, a member whose range ends
    /// exactly at `col` is preferred over the owner: an instruction reading a
    /// value at the column where its last range closes still names the
    /// fragment that held it.
    pub fn resolve(&self, id: IntervalId, col: InstrId) -> IntervalId {
        let Some(family) = self.family_of(id) else {
            return id;
        };
        if family.member(id).is_some_and(|m| m.covers(col)) {
            return id;
        }
        if let Some(member) = family.members.iter().find(|m| m.covers(col)) {
            return member.id;
        }
        if let Some(member) = family.members.iter().find(|m| m.touches(col)) {
            return member.id;
        }

        let owner = family.owner_at(col);
        warn!(
            "no fragment of interval {} is live at column {}; attributing to {}",
            family.root.id, col, owner
        );
        owner
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::diagram::types::{IntervalValue, LiveRange};
    use proptest::prelude::*;

    fn interval(id: IntervalId, parent: Option<IntervalId>, ranges: &[(usize, usize)]) -> Interval {
        Interval {
            id,
            value: IntervalValue::Virtual,
            physical: false,
            parent,
            children: vec![],
            ranges: ranges.iter().map(|(s, e)| LiveRange::new(*s, *e)).collect(),
            uses: vec![],
        }
    }

    fn dump_with(intervals: Vec<Interval>) -> Dump {
        Dump {
            blocks: vec![],
            intervals,
            instructions: BTreeMap::new(),
        }
    }

    fn split_dump() -> Dump {
        let mut parent = interval(5, None, &[(0, 2)]);
        parent.children = vec![6];
        let child = interval(6, Some(5), &[(2, 4)]);
        dump_with(vec![parent, child])
    }

    #[test]
    fn test_split_owner_scenario() {
        let dump = split_dump();
        let families = Families::new(&dump);
        let family = families.family_of(6).unwrap();

        assert_eq!(family.owner_at(1), 5);
        assert_eq!(family.owner_at(3), 6);
        assert_eq!(families.len(), 1);
        assert_eq!(families.row_of(6), Some(0));
    }

    #[test]
    fn test_columns_past_end_belong_to_last_member() {
        let dump = split_dump();
        let families = Families::new(&dump);
        assert_eq!(families.family_of(5).unwrap().owner_at(100), 6);
    }

    #[test]
    fn test_singleton_owns_everything() {
        let dump = dump_with(vec![interval(3, None, &[(1, 2), (4, 7)])]);
        let families = Families::new(&dump);
        let family = families.family_of(3).unwrap();
        for col in 0..10 {
            assert_eq!(family.owner_at(col), 3);
        }
    }

    #[test]
    fn test_child_ending_early_gets_empty_segment() {
        let mut parent = interval(0, None, &[(0, 6)]);
        parent.children = vec![1, 2];
        let early = interval(1, Some(0), &[(2, 3)]);
        let late = interval(2, Some(0), &[(6, 9)]);
        let segmentation = Segmentation::new(&[&parent, &early, &late]);

        assert_eq!(
            segmentation.segments(),
            &[
                Segment { interval: 0, start: 0, end: 6 },
                Segment { interval: 1, start: 6, end: 6 },
                Segment { interval: 2, start: 6, end: 9 },
            ]
        );
        assert_eq!(segmentation.owner_at(5), Some(0));
        assert_eq!(segmentation.owner_at(6), Some(2));
    }

    #[test]
    fn test_resolve_prefers_live_fragment() {
        let dump = split_dump();
        let families = Families::new(&dump);

        // The parent is referenced, but only the child is live at column 3.
        assert_eq!(families.resolve(5, 3), 6);
        assert_eq!(families.resolve(6, 3), 6);
        assert_eq!(families.resolve(6, 0), 5);
        // Column 4 is only touched by the end of the child's range.
        assert_eq!(families.resolve(5, 4), 6);
        // Unknown ids resolve to themselves.
        assert_eq!(families.resolve(99, 0), 99);
    }

    #[test]
    fn test_resolve_falls_back_to_segment_owner() {
        let mut parent = interval(0, None, &[(0, 1)]);
        parent.children = vec![1];
        let child = interval(1, Some(0), &[(5, 6)]);
        let dump = dump_with(vec![parent, child]);
        let families = Families::new(&dump);

        assert_eq!(families.resolve(0, 3), 1);
    }

    fn family_strategy() -> impl Strategy<Value = Vec<Vec<(usize, usize)>>> {
        // Each member: sorted, disjoint ranges built from (gap, len) pairs.
        prop::collection::vec(
            prop::collection::vec((0usize..4, 1usize..5), 0..4).prop_map(|pieces| {
                let mut at = 0;
                pieces
                    .into_iter()
                    .map(|(gap, len)| {
                        let start = at + gap;
                        at = start + len;
                        (start, at)
                    })
                    .collect()
            }),
            1..5,
        )
    }

    proptest! {
        #[test]
        fn segmentation_is_a_total_partition(members in family_strategy()) {
            let intervals: Vec<Interval> = members
                .iter()
                .enumerate()
                .map(|(id, ranges)| interval(id, if id == 0 { None } else { Some(0) }, ranges))
                .collect();
            let refs: Vec<&Interval> = intervals.iter().collect();
            let segmentation = Segmentation::new(&refs);

            // Contiguous from zero, non-overlapping
            let mut expected_start = 0;
            for segment in segmentation.segments() {
                prop_assert_eq!(segment.start, expected_start);
                prop_assert!(segment.end >= segment.start);
                expected_start = segment.end;
            }

            let last_end = intervals.iter().filter_map(|i| i.end()).max().unwrap_or(0);
            prop_assert_eq!(segmentation.end(), last_end);

            for col in 0..last_end {
                let holders: Vec<&Segment> = segmentation
                    .segments()
                    .iter()
                    .filter(|s| s.contains(col))
                    .collect();
                prop_assert_eq!(holders.len(), 1);
                prop_assert_eq!(segmentation.owner_at(col), Some(holders[0].interval));
            }
        }
    }
}
