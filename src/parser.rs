use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::element::{self, Constructor, Element};
use crate::error::{Result, SpiceError};
use crate::netlist::Netlist;

lazy_static! {
    // 'as = 3e-12' => 'as=3e-12' so that whitespace splitting later keeps
    // each assignment as a single token
    static ref RE_PARAM: Regex = Regex::new(r"(\S*)\s*=\s*(\S*)").unwrap();

    static ref RE_BLANK: Regex = Regex::new(r"^\s*$").unwrap();
}

/// Case folding applied to non-comment lines. Case is insignificant in
/// SPICE, so folding is safe and optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseMode {
    #[default]
    Keep,
    Lower,
    Upper,
}

impl FromStr for CaseMode {
    type Err = SpiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "keep" => Ok(CaseMode::Keep),
            "lower" => Ok(CaseMode::Lower),
            "upper" => Ok(CaseMode::Upper),
            _ => Err(SpiceError::InvalidCaseMode(s.to_string())),
        }
    }
}

/// Immutable per-letter constructor table. The element kind of a card is
/// decided solely by the lowercased first character of its first token.
///
/// `standard()` covers the letters this tool understands; `with_handler`
/// returns a new table with one binding replaced, so extension never
/// mutates shared state.
pub struct DispatchTable {
    handlers: HashMap<char, Constructor>,
}

impl DispatchTable {
    pub fn standard() -> Self {
        let mut handlers: HashMap<char, Constructor> = HashMap::new();
        handlers.insert('*', element::comment);
        handlers.insert('.', element::control);
        handlers.insert('c', element::capacitor);
        handlers.insert('l', element::inductor);
        handlers.insert('r', element::resistor);
        handlers.insert('v', element::vsource);
        handlers.insert('i', element::isource);
        handlers.insert('e', element::controlled4);
        handlers.insert('g', element::controlled4);
        handlers.insert('m', element::mosfet);
        DispatchTable { handlers }
    }

    pub fn with_handler(mut self, letter: char, ctor: Constructor) -> Self {
        self.handlers.insert(letter, ctor);
        self
    }

    fn get(&self, letter: char) -> Option<Constructor> {
        self.handlers.get(&letter).copied()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Reconstructs logical cards from physical lines and classifies them.
pub struct NetlistParser {
    case: CaseMode,
    dispatch: DispatchTable,
}

impl Default for NetlistParser {
    fn default() -> Self {
        Self::new(CaseMode::Keep)
    }
}

impl NetlistParser {
    pub fn new(case: CaseMode) -> Self {
        NetlistParser {
            case,
            dispatch: DispatchTable::standard(),
        }
    }

    pub fn with_dispatch(case: CaseMode, dispatch: DispatchTable) -> Self {
        NetlistParser { case, dispatch }
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Netlist> {
        let content = fs::read_to_string(path)?;
        self.parse(&content)
    }

    /// Parse a whole netlist. Continuation lines (leading `+`) append to the
    /// buffered card; any other line completes the buffered card and starts
    /// a new one. A card's origin line number is the physical line where it
    /// started, 1-indexed.
    pub fn parse(&self, content: &str) -> Result<Netlist> {
        let mut netlist = Netlist::new();
        let mut current: Option<(String, usize)> = None;

        for (idx, raw) in content.lines().enumerate() {
            let num = idx + 1;
            let line = self.massage(raw);

            if let Some(rest) = line.strip_prefix('+') {
                let Some((card, _)) = current.as_mut() else {
                    return Err(SpiceError::DanglingContinuation(num));
                };
                card.push(' ');
                card.push_str(rest.trim());
                continue;
            }

            if let Some((card, start)) = current.take() {
                netlist.push(self.classify(&card, start)?);
            }
            current = Some((line, num));
        }

        if let Some((card, start)) = current {
            netlist.push(self.classify(&card, start)?);
        }

        Ok(netlist)
    }

    /// Canonicalize one physical line: strip line endings, turn blank lines
    /// into `*` placeholders (keeps line positions without becoming a
    /// device), pass comments through verbatim, fold case, and tighten
    /// `name = value` to `name=value`.
    fn massage(&self, raw: &str) -> String {
        let line = raw.trim_end_matches(['\r', '\n']);

        if RE_BLANK.is_match(line) {
            return "*".to_string();
        }
        if line.starts_with('*') {
            return line.to_string();
        }

        let line = match self.case {
            CaseMode::Keep => line.to_string(),
            CaseMode::Lower => line.to_lowercase(),
            CaseMode::Upper => line.to_uppercase(),
        };

        RE_PARAM.replace_all(&line, "${1}=${2}").into_owned()
    }

    fn classify(&self, card: &str, num: usize) -> Result<Element> {
        let first = card.split_whitespace().next().unwrap_or("*");
        let letter = first
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or('*');

        match self.dispatch.get(letter) {
            Some(ctor) => ctor(card, num),
            None => {
                warn!(
                    "line {}: no handler for element '{}', passing through unchanged",
                    num, first
                );
                element::unknown(card, num)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;
    use rust_decimal::Decimal;
    use std::io::Write;

    fn dec(s: &str) -> Decimal {
        Decimal::from_scientific(s).unwrap()
    }

    #[test]
    fn test_continuation_joining() {
        let parser = NetlistParser::default();
        let netlist = parser.parse("c1 a b 1p\n+ k1=2\n").unwrap();
        assert_eq!(netlist.len(), 1);
        let Element::Passive2(c) = netlist.iter().next().unwrap() else {
            panic!("expected passive");
        };
        assert_eq!(c.value, dec("1e-12"));
        assert_eq!(c.params.get("k1"), Some(&Decimal::TWO));
        assert_eq!(c.num, 1);
    }

    #[test]
    fn test_dangling_continuation() {
        let parser = NetlistParser::default();
        let err = parser.parse("+ k1=2\nc1 a b 1p\n").unwrap_err();
        assert!(matches!(err, SpiceError::DanglingContinuation(1)));
    }

    #[test]
    fn test_blank_lines_become_comment_placeholders() {
        let parser = NetlistParser::default();
        let netlist = parser.parse("c1 a b 1p\n   \nc2 a b 1p\n").unwrap();
        assert_eq!(netlist.len(), 3);
        let kinds: Vec<ElementKind> = netlist.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ElementKind::Capacitor,
                ElementKind::Comment,
                ElementKind::Capacitor
            ]
        );
    }

    #[test]
    fn test_comments_keep_their_spacing_and_case() {
        let parser = NetlistParser::new(CaseMode::Lower);
        let netlist = parser.parse("* Extracted  By LAYOUT v2\nC1 A B 1P\n").unwrap();
        let cards: Vec<String> = netlist.iter().map(|e| e.to_string()).collect();
        assert_eq!(cards[0], "* Extracted  By LAYOUT v2");
        // non-comment lines were folded
        let Element::Passive2(c) = netlist.iter().nth(1).unwrap() else {
            panic!("expected passive");
        };
        assert_eq!(c.name, "c1");
        assert_eq!(c.n1, "a");
    }

    #[test]
    fn test_param_whitespace_canonicalized() {
        let parser = NetlistParser::default();
        let netlist = parser.parse("c1 a b 1p as = 3e-12\n").unwrap();
        let Element::Passive2(c) = netlist.iter().next().unwrap() else {
            panic!("expected passive");
        };
        assert_eq!(c.params.get("as"), Some(&dec("3e-12")));
    }

    #[test]
    fn test_unknown_letter_passes_through() {
        let parser = NetlistParser::default();
        let netlist = parser.parse("q1 c b e npnmod\n").unwrap();
        let e = netlist.iter().next().unwrap();
        assert_eq!(e.kind(), ElementKind::Unknown);
        assert_eq!(e.to_string(), "q1 c b e npnmod");
    }

    #[test]
    fn test_origin_line_numbers() {
        let parser = NetlistParser::default();
        let netlist = parser.parse("* head\nc1 a b 1p\n+ k1=2\nr1 a b 1k\n").unwrap();
        let nums: Vec<usize> = netlist.iter().map(|e| e.num()).collect();
        assert_eq!(nums, vec![1, 2, 4]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let parser = NetlistParser::default();
        let netlist = parser.parse("c1 a b 1p\r\nc2 a b 2p\r\n").unwrap();
        assert_eq!(netlist.len(), 2);
    }

    #[test]
    fn test_custom_handler_registration() {
        fn as_comment(card: &str, num: usize) -> crate::error::Result<Element> {
            element::comment(&format!("* {}", card), num)
        }
        let table = DispatchTable::standard().with_handler('q', as_comment);
        let parser = NetlistParser::with_dispatch(CaseMode::Keep, table);
        let netlist = parser.parse("q1 c b e npnmod\n").unwrap();
        assert_eq!(netlist.iter().next().unwrap().kind(), ElementKind::Comment);
    }

    #[test]
    fn test_parse_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "c1 a b 1p").unwrap();
        writeln!(tmp, "r1 a b 1k").unwrap();
        let parser = NetlistParser::default();
        let netlist = parser.parse_file(tmp.path()).unwrap();
        assert_eq!(netlist.len(), 2);
    }
}
