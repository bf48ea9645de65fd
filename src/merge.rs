use rust_decimal::Decimal;

use crate::element::{DropMode, Element, ElementKind};
use crate::error::Result;
use crate::netlist::Netlist;

/// Which element kinds the combine pass touches. Inductors are always
/// attempted and have no flag of their own; resistors are never combined.
#[derive(Debug, Clone, Copy)]
pub struct CombineOptions {
    pub capacitors: bool,
    pub mosfets: bool,
}

impl Default for CombineOptions {
    fn default() -> Self {
        CombineOptions {
            capacitors: true,
            mosfets: true,
        }
    }
}

/// How many elements each combine pass absorbed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub capacitors: usize,
    pub inductors: usize,
    pub mosfets: usize,
}

impl MergeStats {
    pub fn total(&self) -> usize {
        self.capacitors + self.inductors + self.mosfets
    }
}

/// Run the pairwise parallel-combine pass over the netlist.
pub fn combine_parallel(netlist: &mut Netlist, opts: &CombineOptions) -> Result<MergeStats> {
    let mut stats = MergeStats::default();
    if opts.capacitors {
        stats.capacitors = combine_kind(netlist, ElementKind::Capacitor)?;
    }
    stats.inductors = combine_kind(netlist, ElementKind::Inductor)?;
    if opts.mosfets {
        stats.mosfets = combine_kind(netlist, ElementKind::Mosfet)?;
    }
    Ok(stats)
}

/// Deck-order scan over a snapshot of same-kind slot ids with a removed
/// mark per entry, so each pair is compared at most once and no iterator is
/// invalidated by removal. The earlier element absorbs any later parallel
/// one and keeps its name and origin line; grouping is first-match.
fn combine_kind(netlist: &mut Netlist, kind: ElementKind) -> Result<usize> {
    let ids = netlist.ids_of_kind(kind);
    let mut removed = vec![false; ids.len()];
    let mut n = 0;

    for i in 0..ids.len() {
        if removed[i] {
            continue;
        }
        for j in (i + 1)..ids.len() {
            if removed[j] {
                continue;
            }
            let Some((earlier, later)) = netlist.pair_mut(ids[i], ids[j]) else {
                continue;
            };
            if earlier.combine(later)? {
                removed[j] = true;
                netlist.remove(ids[j]);
                n += 1;
            }
        }
    }

    Ok(n)
}

/// Remove every element of `kind` whose value satisfies
/// `mode(value, threshold)`. Returns the count removed.
pub fn drop_elements(
    netlist: &mut Netlist,
    kind: ElementKind,
    threshold: Decimal,
    mode: DropMode,
) -> usize {
    let mut n = 0;
    for id in netlist.ids_of_kind(kind) {
        let Some(Element::Passive2(p)) = netlist.get(id) else {
            continue;
        };
        if p.should_drop(threshold, mode) {
            netlist.remove(id);
            n += 1;
        }
    }
    n
}
