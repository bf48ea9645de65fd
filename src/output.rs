use std::io::{self, Write};

use crate::element::{Element, ElementKind};
use crate::netlist::Netlist;

/// Wrap a logical card to `width` columns, prefixing every physical line
/// after the first with the SPICE continuation marker.
pub fn wrap_card(card: &str, width: usize) -> String {
    let options = textwrap::Options::new(width)
        .subsequent_indent("+ ")
        .break_words(false)
        .word_splitter(textwrap::WordSplitter::NoHyphenation);
    textwrap::fill(card, options)
}

/// Render one element as output text. Comments and unknown passthrough
/// cards are emitted verbatim; everything else is re-wrapped.
pub fn render_element(element: &Element, width: usize) -> String {
    match element {
        Element::Comment(_) | Element::Unknown(_) => element.to_string(),
        _ => wrap_card(&element.to_string(), width),
    }
}

/// Emit the whole netlist: informational header, optional per-kind counts
/// as comment lines, then the deck in input order.
///
/// `input_counts` are the pre-merge counts captured by the caller; the
/// output counts are taken from the netlist as it stands now.
pub fn write_netlist<W: Write>(
    out: &mut W,
    netlist: &Netlist,
    width: usize,
    input_counts: Option<&[(ElementKind, usize)]>,
) -> io::Result<()> {
    writeln!(
        out,
        "* spicecomb {}: SPICE netlist parallel-element combiner",
        crate::VERSION
    )?;
    writeln!(
        out,
        "* ----------------------------------------------------------------"
    )?;

    if let Some(counts) = input_counts {
        writeln!(out, "* input element counts:")?;
        for (kind, n) in counts {
            writeln!(out, "*   {}: {}", kind, n)?;
        }
        writeln!(out, "* output element counts:")?;
        for (kind, n) in netlist.kind_counts() {
            writeln!(out, "*   {}: {}", kind, n)?;
        }
    }

    for element in netlist.iter() {
        writeln!(out, "{}", render_element(element, width))?;
    }
    Ok(())
}
