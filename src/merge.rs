//! Deterministic selection, grouping and ordering of generated fragments.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Multi-level ordering weight: (source, project, category, expansion).
///
/// Vectors of unequal length compare as if the shorter were right-padded
/// with zeros, so `[0, 0]` equals `[0, 0, 0]`.
#[derive(Debug, Clone, Default)]
pub struct WeightVector(pub Vec<u32>);

impl WeightVector {
    pub fn new(levels: impl Into<Vec<u32>>) -> Self {
        Self(levels.into())
    }
}

impl PartialEq for WeightVector {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for WeightVector {}

impl PartialOrd for WeightVector {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WeightVector {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

/// Resolve a category-selection expression over the known id set.
///
/// `0` expands to every known id; a negative entry excludes by absolute
/// value (removing even an id that only arrived via the `0` expansion);
/// unknown ids are dropped. The result is deduplicated and sorted
/// ascending, making resolution order-independent and idempotent.
pub fn resolve_selection(selection: &[i64], known: &BTreeSet<i64>) -> Vec<i64> {
    let mut expanded = BTreeSet::new();
    let mut excluded = BTreeSet::new();
    for &entry in selection {
        if entry == 0 {
            expanded.extend(known.iter().copied());
        } else if entry < 0 {
            excluded.insert(entry.abs());
        } else {
            expanded.insert(entry);
        }
    }
    expanded
        .into_iter()
        .filter(|id| !excluded.contains(&id.abs()))
        .filter(|id| known.contains(id))
        .collect()
}

/// One generated fragment awaiting placement.
#[derive(Debug, Clone)]
pub struct Fragment<T> {
    pub weight: WeightVector,
    /// Run-unique id of the sub-category instance this fragment belongs
    /// to; drives prologue emission. Two servers contributing the same
    /// upstream category carry distinct uids.
    pub sub_category_uid: String,
    pub payload: T,
}

/// Group fragments by destination and sort each group by weight. The
/// deepest weight level disambiguates, so ties cannot occur within a group.
pub fn group_by_destination<T>(
    fragments: Vec<(String, Fragment<T>)>,
) -> BTreeMap<String, Vec<Fragment<T>>> {
    let mut groups: BTreeMap<String, Vec<Fragment<T>>> = BTreeMap::new();
    for (destination, fragment) in fragments {
        groups.entry(destination).or_default().push(fragment);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| a.weight.cmp(&b.weight));
    }
    groups
}

/// Distinct sub-category uids of a sorted group, in first-occurrence order.
/// The shared prologue is emitted once per uid returned here.
pub fn prologue_uids<T>(sorted: &[Fragment<T>]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut uids = Vec::new();
    for fragment in sorted {
        if seen.insert(fragment.sub_category_uid.as_str()) {
            uids.push(fragment.sub_category_uid.clone());
        }
    }
    uids
}
