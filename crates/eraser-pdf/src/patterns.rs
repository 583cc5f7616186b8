//! The box-pattern catalog.
//!
//! Content streams are never tokenized. Each rule is a regular expression over
//! the Latin-1 decoded stream text describing one flavour of "draw a box"
//! operator sequence. Operator sequences the catalog does not anticipate
//! (unusual operand spacing, operands glued to delimiters, boxes built from
//! `m`/`l` segments) pass through unmodified.
//!
//! Every rule starts with [`LEAD`], so the whitespace run in front of a box is
//! removed together with it and deletions never glue neighbouring operators.

use once_cell::sync::Lazy;
use regex::Regex;

/// PDF whitespace (NUL, HT, LF, FF, CR, SP). `\s` is not used because in
/// Unicode mode it also matches Latin-1 NEL and NBSP.
pub(crate) const WS: &str = r"[\x00\t\n\x0C\r ]+";

/// A numeric operand.
const NUM: &str = r"[-+]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)";

/// A name operand such as `/GS0`.
const NAME: &str = r"/[^\x00\t\n\x0C\r ()<>\[\]{}/%]+";

/// Painting operators that may terminate a rectangle path. Starred forms are
/// listed first so `f*` is never split into `f` + `*`; a single-letter
/// operator must end at a word boundary so `B` never eats the start of `BT`.
pub(crate) const PAINT_OP: &str = r"(?:[fBb]\*|[SsfFBbn]\b)";

/// Start of text or a whitespace run, consumed with the match.
const LEAD: &str = r"(?:^|[\x00\t\n\x0C\r ]+)";

/// Which family of box construct a rule removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// `BT ... x y w h re f ... ET` used purely to draw a bounding box.
    TextObject,
    /// `q [state ops] x y w h re S Q`.
    Wrapped,
    /// `a b c d e f cm x y w h re S` (or `Tm`).
    Transformed,
    /// `r g b RG x y w h re S` (also `rg`, CMYK `K`/`k`, gray `G`/`g`).
    Colored,
    /// `x y w h re S`.
    Bare,
}

impl RuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::TextObject => "text-object",
            RuleKind::Wrapped => "wrapped",
            RuleKind::Transformed => "transformed",
            RuleKind::Colored => "colored",
            RuleKind::Bare => "bare",
        }
    }
}

/// One compiled rewrite rule. Matches are replaced by the empty string.
#[derive(Debug)]
pub struct Rule {
    pub kind: RuleKind,
    pub regex: Regex,
}

/// `n` numeric operands, each followed by whitespace.
fn operands(n: usize) -> String {
    format!("(?:{NUM}{WS}){{{n}}}")
}

/// Painting step after the rectangle(s): optional close-path, optional clip,
/// then a paint operator. A bare `h` also ends the construct.
fn paint() -> String {
    format!(r"(?:W\*?{WS}{PAINT_OP}|h(?:{WS}(?:W\*?{WS})?{PAINT_OP})?|{PAINT_OP})")
}

/// One or more `x y w h re` segments followed by a painting step.
fn rect_box() -> String {
    format!("(?:{}re{WS})+{}", operands(4), paint())
}

/// Colour-setting operator: RGB, CMYK or gray, stroke or fill.
fn color_op() -> String {
    format!(
        "(?:{}(?:RG|rg)|{}(?:K|k)|{}(?:G|g))",
        operands(3),
        operands(4),
        operands(1)
    )
}

/// Graphics-state operators allowed around a box inside a wrapping block.
fn state_op() -> String {
    format!(
        r"(?:{color}|{n1}[wJjM]|{NAME}{WS}gs|{n6}cm|\[[^\]]*\]{WS}{n1}d)",
        color = color_op(),
        n1 = operands(1),
        n6 = operands(6),
    )
}

fn text_object_pattern() -> String {
    let item = format!("(?:{}|{}Tm)", state_op(), operands(6));
    let boxed = rect_box();
    format!("{LEAD}BT{WS}(?:{item}{WS})*{boxed}{WS}(?:(?:{item}|{boxed}){WS})*ET")
}

fn wrapped_pattern() -> String {
    let state = state_op();
    let boxed = rect_box();
    format!("{LEAD}q{WS}(?:{state}{WS})*{boxed}{WS}(?:(?:{state}|{boxed}){WS})*Q")
}

fn transformed_pattern() -> String {
    format!("{LEAD}{}(?:cm|Tm){WS}{}", operands(6), rect_box())
}

fn colored_pattern() -> String {
    format!("{LEAD}{}{WS}{}", color_op(), rect_box())
}

fn bare_pattern() -> String {
    format!("{LEAD}{}", rect_box())
}

/// Rule sources in application order. Broader constructs come first so their
/// wrapping operators are removed together with the rectangle; later rules
/// only see text the earlier ones left behind.
fn rule_sources() -> Vec<(RuleKind, String)> {
    vec![
        (RuleKind::TextObject, text_object_pattern()),
        (RuleKind::Wrapped, wrapped_pattern()),
        (RuleKind::Transformed, transformed_pattern()),
        (RuleKind::Colored, colored_pattern()),
        (RuleKind::Bare, bare_pattern()),
    ]
}

static CATALOG: Lazy<Vec<Rule>> = Lazy::new(|| {
    rule_sources()
        .into_iter()
        .filter_map(|(kind, source)| match Regex::new(&source) {
            Ok(regex) => Some(Rule { kind, regex }),
            Err(e) => {
                log::error!("Box rule '{}' failed to compile: {}", kind.name(), e);
                None
            }
        })
        .collect()
});

/// The compiled catalog, in application order.
pub fn catalog() -> &'static [Rule] {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(kind: RuleKind) -> &'static Regex {
        &catalog().iter().find(|r| r.kind == kind).unwrap().regex
    }

    #[test]
    fn test_all_rules_compile_in_order() {
        let kinds: Vec<RuleKind> = catalog().iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RuleKind::TextObject,
                RuleKind::Wrapped,
                RuleKind::Transformed,
                RuleKind::Colored,
                RuleKind::Bare,
            ]
        );
    }

    #[test]
    fn test_bare_matches_every_paint_operator() {
        for op in ["S", "s", "f", "F", "f*", "B", "B*", "b", "b*", "n", "W n", "W* n", "h", "h S"] {
            let text = format!("10 10 50 50 re {}", op);
            let m = rule(RuleKind::Bare).find(&text).unwrap();
            assert_eq!(m.as_str(), text, "operator {}", op);
        }
    }

    #[test]
    fn test_bare_takes_starred_operator_whole() {
        let m = rule(RuleKind::Bare).find("0 0 1 1 re f* Q").unwrap();
        assert_eq!(m.as_str(), "0 0 1 1 re f*");
    }

    #[test]
    fn test_bare_requires_rectangle_operands() {
        assert!(!rule(RuleKind::Bare).is_match("re S"));
        assert!(!rule(RuleKind::Bare).is_match("10 10 50 re S"));
    }

    #[test]
    fn test_bare_accepts_signed_and_decimal_operands() {
        let m = rule(RuleKind::Bare).find("-1.5 +2 .25 3. re S").unwrap();
        assert_eq!(m.as_str(), "-1.5 +2 .25 3. re S");
    }

    #[test]
    fn test_bare_consumes_leading_whitespace() {
        let m = rule(RuleKind::Bare).find("BT ET\n  0 0 1 1 re f").unwrap();
        assert_eq!(m.as_str(), "\n  0 0 1 1 re f");
    }

    #[test]
    fn test_bare_multi_rectangle_path() {
        let m = rule(RuleKind::Bare).find("0 0 1 1 re 2 2 3 3 re f").unwrap();
        assert_eq!(m.as_str(), "0 0 1 1 re 2 2 3 3 re f");
    }

    #[test]
    fn test_colored_rgb_cmyk_gray() {
        let colored = rule(RuleKind::Colored);
        assert!(colored.is_match("1 0 0 RG 10 10 50 50 re S"));
        assert!(colored.is_match("0.2 0.4 0.6 rg 10 10 50 50 re f"));
        assert!(colored.is_match("0 0 0 1 K 10 10 50 50 re S"));
        assert!(colored.is_match("0.5 g 10 10 50 50 re f"));
        assert!(!colored.is_match("1 0 0 RG BT ET"));
    }

    #[test]
    fn test_wrapped_with_state_operators() {
        let wrapped = rule(RuleKind::Wrapped);
        assert!(wrapped.is_match("q 1 0 0 RG 10 10 50 50 re S Q"));
        assert!(wrapped.is_match("q 0.5 w 10 10 50 50 re S Q"));
        assert!(wrapped.is_match("q /GS1 gs 10 10 50 50 re f Q"));
        assert!(wrapped.is_match("q [3 2] 0 d 1 0 0 1 5 5 cm 0 0 9 9 re S Q"));
        assert!(wrapped.is_match("q\n0 0 1 1 re f\n2 2 3 3 re S\nQ"));
    }

    #[test]
    fn test_wrapped_rejects_blocks_with_other_content() {
        let wrapped = rule(RuleKind::Wrapped);
        assert!(!wrapped.is_match("q 0 0 1 1 re f BT (x) Tj ET Q"));
        assert!(!wrapped.is_match("q 1 w Q"));
    }

    #[test]
    fn test_transformed_cm_and_tm() {
        let transformed = rule(RuleKind::Transformed);
        assert!(transformed.is_match("1 0 0 1 72 72 cm 0 0 10 10 re S"));
        assert!(transformed.is_match("1 0 0 1 72 72 Tm 0 0 10 10 re f"));
        assert!(!transformed.is_match("1 0 0 1 72 cm 0 0 10 10 re S"));
    }

    #[test]
    fn test_text_object_bounding_box() {
        let text_object = rule(RuleKind::TextObject);
        assert!(text_object.is_match("BT 0 0 100 20 re S ET"));
        assert!(text_object.is_match("BT 1 0 0 1 5 5 Tm 0 0 100 20 re S ET"));
        assert!(!text_object.is_match("BT /F1 12 Tf 0 0 100 20 re S ET"));
    }

    #[test]
    fn test_operator_names_are_not_prefix_matched() {
        assert!(!rule(RuleKind::Bare).is_match("0 0 1 1 ref"));
        assert!(!rule(RuleKind::Bare).is_match("0 0 1 1 Tre S"));
    }
}
