use indexmap::IndexMap;
use log::warn;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SpiceError};
use crate::units::unit;

/// Kind tag for a classified card, used to key the per-kind netlist index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Comment,
    Control,
    Capacitor,
    Inductor,
    Resistor,
    Vsource,
    Isource,
    Controlled,
    Mosfet,
    Unknown,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ElementKind::Comment => "*",
            ElementKind::Control => ".",
            ElementKind::Capacitor => "c",
            ElementKind::Inductor => "l",
            ElementKind::Resistor => "r",
            ElementKind::Vsource => "v",
            ElementKind::Isource => "i",
            ElementKind::Controlled => "controlled",
            ElementKind::Mosfet => "m",
            ElementKind::Unknown => "unknown",
        };
        write!(f, "{}", tag)
    }
}

/// Concrete device behind a `Passive2`: decides the combine rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassiveKind {
    Capacitor,
    Inductor,
    Resistor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Voltage,
    Current,
}

/// Comparison applied by the drop filter. Elements *satisfying* the
/// comparison against the threshold are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropMode {
    Below,
    BelowOrEqual,
    Above,
    AboveOrEqual,
}

impl DropMode {
    pub fn matches(&self, value: Decimal, threshold: Decimal) -> bool {
        match self {
            DropMode::Below => value < threshold,
            DropMode::BelowOrEqual => value <= threshold,
            DropMode::Above => value > threshold,
            DropMode::AboveOrEqual => value >= threshold,
        }
    }
}

impl FromStr for DropMode {
    type Err = SpiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "<" => Ok(DropMode::Below),
            "<=" => Ok(DropMode::BelowOrEqual),
            ">" => Ok(DropMode::Above),
            ">=" => Ok(DropMode::AboveOrEqual),
            _ => Err(SpiceError::InvalidDropMode(s.to_string())),
        }
    }
}

/// A card kept as raw text: comments, control statements, and element
/// letters without a registered handler.
#[derive(Debug, Clone)]
pub struct RawCard {
    pub line: String,
    pub num: usize,
}

/// Two-node passive: capacitor, inductor, or resistor.
///
/// Card shape: `cXXX n1 n2 value p1=v1 p2=v2 ...`
#[derive(Debug, Clone)]
pub struct Passive2 {
    pub name: String,
    pub kind: PassiveKind,
    pub n1: String,
    pub n2: String,
    pub value: Decimal,
    pub params: IndexMap<String, Decimal>,
    pub num: usize,
}

/// Two-node source, same card shape as `Passive2`.
#[derive(Debug, Clone)]
pub struct Active2 {
    pub name: String,
    pub kind: SourceKind,
    pub n1: String,
    pub n2: String,
    pub value: Decimal,
    pub params: IndexMap<String, Decimal>,
    pub num: usize,
}

/// Four-node controlled source (VCVS/VCCS).
///
/// Card shape: `eXXX n1 n2 n3 n4 value p1=v1 ...`
#[derive(Debug, Clone)]
pub struct Active4 {
    pub name: String,
    pub n1: String,
    pub n2: String,
    pub n3: String,
    pub n4: String,
    pub value: Decimal,
    pub params: IndexMap<String, Decimal>,
    pub num: usize,
}

/// MOSFET card: `mXXX drain gate source bulk model w=.. l=.. ...`
///
/// `w` and `l` are required and cached; `m` (multiplicity) defaults to 1
/// when absent.
#[derive(Debug, Clone)]
pub struct Mosfet {
    pub name: String,
    pub d: String,
    pub g: String,
    pub s: String,
    pub b: String,
    pub model: String,
    pub w: Decimal,
    pub l: Decimal,
    pub params: IndexMap<String, Decimal>,
    pub num: usize,
}

/// A classified netlist card.
#[derive(Debug, Clone)]
pub enum Element {
    Comment(RawCard),
    Control(RawCard),
    Passive2(Passive2),
    Active2(Active2),
    Active4(Active4),
    Mosfet(Mosfet),
    Unknown(RawCard),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Comment(_) => ElementKind::Comment,
            Element::Control(_) => ElementKind::Control,
            Element::Passive2(p) => match p.kind {
                PassiveKind::Capacitor => ElementKind::Capacitor,
                PassiveKind::Inductor => ElementKind::Inductor,
                PassiveKind::Resistor => ElementKind::Resistor,
            },
            Element::Active2(a) => match a.kind {
                SourceKind::Voltage => ElementKind::Vsource,
                SourceKind::Current => ElementKind::Isource,
            },
            Element::Active4(_) => ElementKind::Controlled,
            Element::Mosfet(_) => ElementKind::Mosfet,
            Element::Unknown(_) => ElementKind::Unknown,
        }
    }

    /// Origin line number in the input, 1-indexed. Output order follows
    /// this after merging shuffles the internal bookkeeping.
    pub fn num(&self) -> usize {
        match self {
            Element::Comment(c) | Element::Control(c) | Element::Unknown(c) => c.num,
            Element::Passive2(p) => p.num,
            Element::Active2(a) => a.num,
            Element::Active4(a) => a.num,
            Element::Mosfet(m) => m.num,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Element::Passive2(p) => Some(&p.name),
            Element::Active2(a) => Some(&a.name),
            Element::Active4(a) => Some(&a.name),
            Element::Mosfet(m) => Some(&m.name),
            _ => None,
        }
    }

    /// Fold `other` into `self` if the two are the same concrete kind and
    /// electrically parallel. Returns whether the fold happened; `self` is
    /// untouched when it did not.
    pub fn combine(&mut self, other: &Element) -> Result<bool> {
        match (self, other) {
            (Element::Passive2(a), Element::Passive2(b)) => a.combine(b),
            (Element::Mosfet(a), Element::Mosfet(b)) => Ok(a.combine(b)),
            _ => Ok(false),
        }
    }
}

impl Passive2 {
    /// Node order carries no meaning: {n1,n2} is compared as an unordered pair.
    pub fn is_parallel(&self, other: &Passive2) -> bool {
        (self.n1 == other.n1 && self.n2 == other.n2)
            || (self.n1 == other.n2 && self.n2 == other.n1)
    }

    /// Parallel capacitances add; parallel inductances combine harmonically.
    /// Resistors are classified but never auto-combined.
    ///
    /// Parameter maps are left untouched by either rule: the absorbing
    /// element keeps its own params. Known surprise, kept from the original
    /// tool.
    pub fn combine(&mut self, other: &Passive2) -> Result<bool> {
        if self.kind != other.kind || !self.is_parallel(other) {
            return Ok(false);
        }
        match self.kind {
            PassiveKind::Capacitor => {
                self.value += other.value;
                Ok(true)
            }
            PassiveKind::Inductor => {
                let sum = self.value + other.value;
                if sum.is_zero() {
                    return Err(SpiceError::DivideByZero {
                        a: self.name.clone(),
                        b: other.name.clone(),
                    });
                }
                self.value = (self.value * other.value) / sum;
                Ok(true)
            }
            PassiveKind::Resistor => Ok(false),
        }
    }

    pub fn should_drop(&self, threshold: Decimal, mode: DropMode) -> bool {
        mode.matches(self.value, threshold)
    }
}

impl Mosfet {
    /// Gate, bulk, and model must match; source and drain may be swapped.
    pub fn is_parallel(&self, other: &Mosfet) -> bool {
        if self.g != other.g || self.b != other.b || self.model != other.model {
            return false;
        }
        (self.d == other.d && self.s == other.s)
            || (self.d == other.s && self.s == other.d)
    }

    /// Fold `other` into `self` iff the FETs are parallel with identical
    /// geometry (`w`/`l`). Every other parameter accumulates numerically,
    /// with keys missing on `self` starting from zero. The multiplicity `m`
    /// becomes the sum of both sides (absent counting as 1), or exactly 2
    /// the first time two unannotated instances meet.
    pub fn combine(&mut self, other: &Mosfet) -> bool {
        if !self.is_parallel(other) {
            return false;
        }
        if self.w != other.w || self.l != other.l {
            return false;
        }

        for (k, v) in &other.params {
            if k == "w" || k == "l" || k == "m" {
                continue;
            }
            *self.params.entry(k.clone()).or_insert(Decimal::ZERO) += *v;
        }

        let explicit_m = self.params.contains_key("m") || other.params.contains_key("m");
        let m = if explicit_m {
            self.params.get("m").copied().unwrap_or(Decimal::ONE)
                + other.params.get("m").copied().unwrap_or(Decimal::ONE)
        } else {
            Decimal::TWO
        };
        self.params.insert("m".to_string(), m);
        true
    }
}

// Card constructors, one per registered element letter. All share the
// signature expected by the classifier's dispatch table. Cards with too few
// tokens degrade to `Unknown` passthrough with a warning; per-field parse
// failures surface as errors.

pub type Constructor = fn(&str, usize) -> Result<Element>;

pub fn comment(card: &str, num: usize) -> Result<Element> {
    Ok(Element::Comment(RawCard {
        line: card.to_string(),
        num,
    }))
}

pub fn control(card: &str, num: usize) -> Result<Element> {
    Ok(Element::Control(RawCard {
        line: card.to_string(),
        num,
    }))
}

pub fn unknown(card: &str, num: usize) -> Result<Element> {
    Ok(Element::Unknown(RawCard {
        line: card.to_string(),
        num,
    }))
}

pub fn capacitor(card: &str, num: usize) -> Result<Element> {
    passive2(card, num, PassiveKind::Capacitor)
}

pub fn inductor(card: &str, num: usize) -> Result<Element> {
    passive2(card, num, PassiveKind::Inductor)
}

pub fn resistor(card: &str, num: usize) -> Result<Element> {
    passive2(card, num, PassiveKind::Resistor)
}

pub fn vsource(card: &str, num: usize) -> Result<Element> {
    active2(card, num, SourceKind::Voltage)
}

pub fn isource(card: &str, num: usize) -> Result<Element> {
    active2(card, num, SourceKind::Current)
}

fn passive2(card: &str, num: usize, kind: PassiveKind) -> Result<Element> {
    let tokens: Vec<&str> = card.split_whitespace().collect();
    if tokens.len() < 4 {
        warn!("line {}: malformed card '{}', passing through unchanged", num, card);
        return unknown(card, num);
    }
    Ok(Element::Passive2(Passive2 {
        name: tokens[0].to_string(),
        kind,
        n1: tokens[1].to_string(),
        n2: tokens[2].to_string(),
        value: unit(tokens[3])?,
        params: parse_params(&tokens[4..], tokens[0], num, false)?,
        num,
    }))
}

fn active2(card: &str, num: usize, kind: SourceKind) -> Result<Element> {
    let tokens: Vec<&str> = card.split_whitespace().collect();
    if tokens.len() < 4 {
        warn!("line {}: malformed card '{}', passing through unchanged", num, card);
        return unknown(card, num);
    }
    Ok(Element::Active2(Active2 {
        name: tokens[0].to_string(),
        kind,
        n1: tokens[1].to_string(),
        n2: tokens[2].to_string(),
        value: unit(tokens[3])?,
        params: parse_params(&tokens[4..], tokens[0], num, false)?,
        num,
    }))
}

pub fn controlled4(card: &str, num: usize) -> Result<Element> {
    let tokens: Vec<&str> = card.split_whitespace().collect();
    if tokens.len() < 6 {
        warn!("line {}: malformed card '{}', passing through unchanged", num, card);
        return unknown(card, num);
    }
    Ok(Element::Active4(Active4 {
        name: tokens[0].to_string(),
        n1: tokens[1].to_string(),
        n2: tokens[2].to_string(),
        n3: tokens[3].to_string(),
        n4: tokens[4].to_string(),
        value: unit(tokens[5])?,
        params: parse_params(&tokens[6..], tokens[0], num, false)?,
        num,
    }))
}

pub fn mosfet(card: &str, num: usize) -> Result<Element> {
    let tokens: Vec<&str> = card.split_whitespace().collect();
    if tokens.len() < 6 {
        warn!("line {}: malformed card '{}', passing through unchanged", num, card);
        return unknown(card, num);
    }
    let name = tokens[0].to_string();
    // MOSFET parameter keys are case-folded so w/l/m lookups work whatever
    // the input case mode was.
    let params = parse_params(&tokens[6..], &name, num, true)?;
    let require = |param: &'static str| -> Result<Decimal> {
        params
            .get(param)
            .copied()
            .ok_or_else(|| SpiceError::MissingRequiredParameter {
                element: name.clone(),
                line: num,
                param,
            })
    };
    let w = require("w")?;
    let l = require("l")?;
    Ok(Element::Mosfet(Mosfet {
        name: name.clone(),
        d: tokens[1].to_string(),
        g: tokens[2].to_string(),
        s: tokens[3].to_string(),
        b: tokens[4].to_string(),
        model: tokens[5].to_string(),
        w,
        l,
        params,
        num,
    }))
}

/// Parse `k=v` tokens into an insertion-ordered map. Duplicate keys
/// overwrite in place (last value wins) with a warning; tokens without `=`
/// are warned and skipped.
fn parse_params(
    tokens: &[&str],
    name: &str,
    num: usize,
    fold_keys: bool,
) -> Result<IndexMap<String, Decimal>> {
    let mut params = IndexMap::new();
    for tok in tokens {
        let Some((k, v)) = tok.split_once('=') else {
            warn!("line {}: ignoring parameter token '{}' on '{}'", num, tok, name);
            continue;
        };
        let key = if fold_keys { k.to_lowercase() } else { k.to_string() };
        let value = unit(v)?;
        if params.insert(key.clone(), value).is_some() {
            warn!("line {}: duplicate parameter '{}' on '{}'", num, key, name);
        }
    }
    Ok(params)
}

fn write_params(
    f: &mut fmt::Formatter<'_>,
    params: &IndexMap<String, Decimal>,
    skip_zero: bool,
) -> fmt::Result {
    for (k, v) in params {
        // Zero-valued parameters are treated as equivalent to absent.
        if skip_zero && v.is_zero() {
            continue;
        }
        write!(f, " {}={}", k, v)?;
    }
    Ok(())
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Comment(c) | Element::Control(c) | Element::Unknown(c) => {
                write!(f, "{}", c.line)
            }
            Element::Passive2(p) => {
                write!(f, "{} {} {} {}", p.name, p.n1, p.n2, p.value)?;
                write_params(f, &p.params, false)
            }
            Element::Active2(a) => {
                write!(f, "{} {} {} {}", a.name, a.n1, a.n2, a.value)?;
                write_params(f, &a.params, false)
            }
            Element::Active4(a) => {
                write!(f, "{} {} {} {} {} {}", a.name, a.n1, a.n2, a.n3, a.n4, a.value)?;
                write_params(f, &a.params, false)
            }
            Element::Mosfet(m) => {
                write!(f, "{} {} {} {} {} {}", m.name, m.d, m.g, m.s, m.b, m.model)?;
                write_params(f, &m.params, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        Decimal::from_scientific(s).unwrap()
    }

    #[test]
    fn test_capacitor_card() {
        let e = capacitor("c1 a b 1p k1=2", 3).unwrap();
        let Element::Passive2(c) = &e else {
            panic!("expected passive");
        };
        assert_eq!(c.name, "c1");
        assert_eq!(c.kind, PassiveKind::Capacitor);
        assert_eq!(c.n1, "a");
        assert_eq!(c.n2, "b");
        assert_eq!(c.value, dec("1e-12"));
        assert_eq!(c.params.get("k1"), Some(&Decimal::TWO));
        assert_eq!(e.num(), 3);
    }

    #[test]
    fn test_short_card_degrades_to_unknown() {
        let e = capacitor("c1 a b", 1).unwrap();
        assert!(matches!(e, Element::Unknown(_)));
        assert_eq!(e.to_string(), "c1 a b");
    }

    #[test]
    fn test_duplicate_param_last_wins() {
        let e = capacitor("c1 a b 1p x=1 x=3", 1).unwrap();
        let Element::Passive2(c) = e else {
            panic!("expected passive");
        };
        assert_eq!(c.params.get("x"), Some(&dec("3e0")));
        assert_eq!(c.params.len(), 1);
    }

    #[test]
    fn test_mosfet_card() {
        let e = mosfet("m1 d g s b nmos w=1u l=0.1u ad=2f", 5).unwrap();
        let Element::Mosfet(m) = e else {
            panic!("expected mosfet");
        };
        assert_eq!(m.model, "nmos");
        assert_eq!(m.w, dec("1e-6"));
        assert_eq!(m.l, dec("1e-7"));
        assert_eq!(m.params.get("ad"), Some(&dec("2e-15")));
    }

    #[test]
    fn test_mosfet_requires_geometry_params() {
        let err = mosfet("m1 d g s b nmos w=1u", 7).unwrap_err();
        assert!(matches!(
            err,
            SpiceError::MissingRequiredParameter { param: "l", .. }
        ));
    }

    #[test]
    fn test_mosfet_param_keys_folded() {
        let e = mosfet("m1 d g s b nmos W=1u L=2u AD=1f", 1).unwrap();
        let Element::Mosfet(m) = e else {
            panic!("expected mosfet");
        };
        assert_eq!(m.w, dec("1e-6"));
        assert!(m.params.contains_key("ad"));
    }

    #[test]
    fn test_parallel_detection_ignores_node_order() {
        let Element::Passive2(a) = capacitor("c1 a b 1p", 1).unwrap() else {
            panic!();
        };
        let Element::Passive2(b) = capacitor("c2 b a 2p", 2).unwrap() else {
            panic!();
        };
        let Element::Passive2(c) = capacitor("c3 a c 2p", 3).unwrap() else {
            panic!();
        };
        assert!(a.is_parallel(&b));
        assert!(!a.is_parallel(&c));
    }

    #[test]
    fn test_inductor_zero_sum_is_an_error() {
        let Element::Passive2(mut a) = inductor("l1 a b 1n", 1).unwrap() else {
            panic!();
        };
        let Element::Passive2(b) = inductor("l2 a b -1n", 2).unwrap() else {
            panic!();
        };
        assert!(matches!(
            a.combine(&b),
            Err(SpiceError::DivideByZero { .. })
        ));
    }

    #[test]
    fn test_resistors_never_combine() {
        let Element::Passive2(mut a) = resistor("r1 a b 1k", 1).unwrap() else {
            panic!();
        };
        let Element::Passive2(b) = resistor("r2 a b 1k", 2).unwrap() else {
            panic!();
        };
        assert!(a.is_parallel(&b));
        assert!(!a.combine(&b).unwrap());
        assert_eq!(a.value, dec("1e3"));
    }

    #[test]
    fn test_mosfet_render_skips_zero_params() {
        let e = mosfet("m1 d g s b nmos w=1u l=1u ad=0 as=2f", 1).unwrap();
        let rendered = e.to_string();
        assert!(!rendered.contains("ad="));
        assert!(rendered.contains("as=0.000000000000002"));
    }

    #[test]
    fn test_drop_mode_parsing() {
        assert_eq!("<".parse::<DropMode>().unwrap(), DropMode::Below);
        assert_eq!(">=".parse::<DropMode>().unwrap(), DropMode::AboveOrEqual);
        assert!(matches!(
            "~".parse::<DropMode>(),
            Err(SpiceError::InvalidDropMode(_))
        ));
    }
}
