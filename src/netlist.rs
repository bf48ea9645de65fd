use std::collections::HashMap;

use crate::element::{Element, ElementKind};

/// Ordered deck of elements plus a per-kind index for same-kind scans.
///
/// Elements live in an append-only slot arena; removal tombstones the slot
/// instead of shifting, so slot ids stay stable while a merge pass is
/// walking them. Slot order is input order and therefore output order.
/// Invariant: an id is listed in the kind index iff its slot is occupied.
#[derive(Debug, Default)]
pub struct Netlist {
    slots: Vec<Option<Element>>,
    index: HashMap<ElementKind, Vec<usize>>,
}

impl Netlist {
    pub fn new() -> Self {
        Netlist::default()
    }

    /// Append an element to the deck, returning its slot id.
    pub fn push(&mut self, element: Element) -> usize {
        let id = self.slots.len();
        self.index.entry(element.kind()).or_default().push(id);
        self.slots.push(Some(element));
        id
    }

    /// Remove an element from the deck and the kind index.
    pub fn remove(&mut self, id: usize) -> Option<Element> {
        let element = self.slots.get_mut(id)?.take()?;
        if let Some(ids) = self.index.get_mut(&element.kind()) {
            ids.retain(|&i| i != id);
        }
        Some(element)
    }

    pub fn get(&self, id: usize) -> Option<&Element> {
        self.slots.get(id)?.as_ref()
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Element> {
        self.slots.get_mut(id)?.as_mut()
    }

    /// Mutable/shared access to a pair of distinct occupied slots, `a < b`.
    pub fn pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut Element, &Element)> {
        debug_assert!(a < b);
        if b >= self.slots.len() {
            return None;
        }
        let (lo, hi) = self.slots.split_at_mut(b);
        Some((lo[a].as_mut()?, hi[0].as_ref()?))
    }

    /// Slot ids of all live elements of `kind`, in deck order.
    pub fn ids_of_kind(&self, kind: ElementKind) -> Vec<usize> {
        self.index.get(&kind).cloned().unwrap_or_default()
    }

    pub fn count_of_kind(&self, kind: ElementKind) -> usize {
        self.index.get(&kind).map_or(0, Vec::len)
    }

    /// Live per-kind counts, sorted by kind tag for stable reporting.
    pub fn kind_counts(&self) -> Vec<(ElementKind, usize)> {
        let mut counts: Vec<(ElementKind, usize)> = self
            .index
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(&kind, ids)| (kind, ids.len()))
            .collect();
        counts.sort_by_key(|(kind, _)| kind.to_string());
        counts
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live elements in deck (input) order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.slots.iter().filter_map(Option::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element;

    fn cap(name: &str, num: usize) -> Element {
        element::capacitor(&format!("{} a b 1p", name), num).unwrap()
    }

    #[test]
    fn test_push_and_index() {
        let mut netlist = Netlist::new();
        netlist.push(cap("c1", 1));
        netlist.push(element::resistor("r1 a b 1k", 2).unwrap());
        netlist.push(cap("c2", 3));

        assert_eq!(netlist.len(), 3);
        assert_eq!(netlist.ids_of_kind(ElementKind::Capacitor), vec![0, 2]);
        assert_eq!(netlist.count_of_kind(ElementKind::Resistor), 1);
        assert_eq!(netlist.count_of_kind(ElementKind::Mosfet), 0);
    }

    #[test]
    fn test_remove_keeps_deck_and_index_in_step() {
        let mut netlist = Netlist::new();
        let a = netlist.push(cap("c1", 1));
        let b = netlist.push(cap("c2", 2));

        let removed = netlist.remove(b).unwrap();
        assert_eq!(removed.name(), Some("c2"));
        assert_eq!(netlist.len(), 1);
        assert_eq!(netlist.ids_of_kind(ElementKind::Capacitor), vec![a]);
        assert!(netlist.get(b).is_none());
        // double remove is a no-op
        assert!(netlist.remove(b).is_none());
    }

    #[test]
    fn test_iteration_preserves_input_order_after_removal() {
        let mut netlist = Netlist::new();
        netlist.push(cap("c1", 1));
        let mid = netlist.push(cap("c2", 2));
        netlist.push(cap("c3", 3));
        netlist.remove(mid);

        let names: Vec<&str> = netlist.iter().filter_map(Element::name).collect();
        assert_eq!(names, vec!["c1", "c3"]);
    }

    #[test]
    fn test_pair_mut() {
        let mut netlist = Netlist::new();
        let a = netlist.push(cap("c1", 1));
        let b = netlist.push(cap("c2", 2));

        let (first, second) = netlist.pair_mut(a, b).unwrap();
        assert_eq!(first.name(), Some("c1"));
        assert_eq!(second.name(), Some("c2"));

        netlist.remove(b);
        assert!(netlist.pair_mut(a, b).is_none());
    }
}
