//! Content rewriter: removes catalog matches from one content stream.

use std::borrow::Cow;

use regex::Captures;

use eraser_core::stats::EraseStats;

use crate::patterns::{self, RuleKind};

/// Outcome of rewriting one stream's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite<'a> {
    /// Rewritten bytes, or the input itself when nothing was removed.
    pub content: Cow<'a, [u8]>,
    /// Matches removed per rule, in catalog order. Rules that did not fire
    /// are omitted.
    pub removed: Vec<(RuleKind, usize)>,
}

impl Rewrite<'_> {
    pub fn total_removed(&self) -> usize {
        self.removed.iter().map(|(_, n)| n).sum()
    }

    pub fn is_modified(&self) -> bool {
        matches!(self.content, Cow::Owned(_))
    }
}

/// Decode bytes as Latin-1. Every byte maps to the char with the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Encode text as Latin-1. Returns `None` if a char is outside U+0000..=U+00FF.
pub fn encode_latin1(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(c).ok()).collect()
}

fn unchanged(content: &[u8]) -> Rewrite<'_> {
    Rewrite {
        content: Cow::Borrowed(content),
        removed: Vec::new(),
    }
}

/// Apply every catalog rule, in order, to the decoded stream.
///
/// Each rule replaces all of its non-overlapping matches with nothing before
/// the next rule runs. The input slice is returned borrowed when no rule fired
/// or when re-encoding fails, so callers never see partially edited output.
pub fn rewrite(content: &[u8]) -> Rewrite<'_> {
    let mut text = decode_latin1(content);
    let mut removed = Vec::new();

    for rule in patterns::catalog() {
        let mut count = 0usize;
        let replaced = rule.regex.replace_all(&text, |_: &Captures| {
            count += 1;
            ""
        });
        if let Cow::Owned(reduced) = replaced {
            log::debug!("Rule '{}' removed {} match(es)", rule.kind.name(), count);
            text = reduced;
            removed.push((rule.kind, count));
        }
    }

    if removed.is_empty() {
        return unchanged(content);
    }

    match encode_latin1(&text) {
        Some(bytes) => {
            log::debug!(
                "Content modified: original size {}, new size {}",
                content.len(),
                bytes.len()
            );
            Rewrite {
                content: Cow::Owned(bytes),
                removed,
            }
        }
        None => {
            log::error!("Failed to re-encode rewritten content, keeping original");
            unchanged(content)
        }
    }
}

/// Remove box constructs from `content`, adding the number of removed
/// matches to `stats.boxes_removed`.
pub fn remove_boxes<'a>(content: &'a [u8], stats: &mut EraseStats) -> Cow<'a, [u8]> {
    let result = rewrite(content);
    stats.boxes_removed += result.total_removed() as u64;
    result.content
}

#[cfg(test)]
mod tests {
    use super::*;

    fn erase(content: &[u8]) -> (Vec<u8>, u64) {
        let mut stats = EraseStats::new();
        let out = remove_boxes(content, &mut stats).into_owned();
        (out, stats.boxes_removed)
    }

    #[test]
    fn test_wrapped_colored_box_removed() {
        let (out, removed) = erase(b"q 1 0 0 RG 10 10 50 50 re S Q");
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("re"));
        assert!(removed >= 1);
    }

    #[test]
    fn test_fill_only_stream_becomes_blank() {
        let (out, removed) = erase(b"0 0 100 200 re f");
        assert!(out.iter().all(|b| b.is_ascii_whitespace()));
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_no_box_content_is_identical() {
        let content = b"BT /F1 12 Tf 72 700 Td (Hello \xe9) Tj ET";
        let mut stats = EraseStats::new();
        let out = remove_boxes(content, &mut stats);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(&*out, &content[..]);
        assert_eq!(stats.boxes_removed, 0);
    }

    #[test]
    fn test_surrounding_content_preserved_in_order() {
        let content = b"BT (A) Tj ET\n0 0 1 1 re f\n1 0 0 RG 5 5 10 10 re S\nBT (B\xff) Tj ET";
        let (out, removed) = erase(content);
        assert_eq!(out, b"BT (A) Tj ET\nBT (B\xff) Tj ET".to_vec());
        assert_eq!(removed, 2);
    }

    #[test]
    fn test_idempotent() {
        let inputs: [&[u8]; 6] = [
            b"q 1 0 0 RG 10 10 50 50 re S Q",
            b"q 0 0 1 1 re f q 2 2 3 3 re S Q Q",
            b"q q 0 0 1 1 re f Q Q BT (x) Tj ET",
            b"q 0 0 1 1 re S BT 0 0 2 2 re f ET Q",
            b"BT q 0 0 1 1 re f Q ET 0.5 g 1 1 2 2 re f",
            b"1 0 0 1 5 5 cm 0 0 1 1 re W n /Im0 Do",
        ];
        for input in inputs {
            let mut stats = EraseStats::new();
            let once = remove_boxes(input, &mut stats).into_owned();
            let twice = remove_boxes(&once, &mut stats).into_owned();
            assert_eq!(once, twice, "input {:?}", String::from_utf8_lossy(input));
        }
    }

    #[test]
    fn test_nested_wrapped_blocks() {
        let (out, _) = erase(b"q q 0 0 1 1 re f Q Q");
        assert_eq!(out, b"q Q".to_vec());
    }

    #[test]
    fn test_broad_rule_runs_before_narrow() {
        let result = rewrite(b"q 0 0 1 1 re S BT 0 0 2 2 re f ET Q");
        assert_eq!(&*result.content, b"");
        assert_eq!(
            result.removed,
            vec![(RuleKind::TextObject, 1), (RuleKind::Wrapped, 1)]
        );
    }

    #[test]
    fn test_clip_with_image_keeps_image() {
        let (out, removed) = erase(b"q 0 0 612 792 re W n /Im0 Do Q");
        assert_eq!(out, b"q /Im0 Do Q".to_vec());
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_close_path_then_clip_removed_together() {
        let (out, removed) = erase(b"q 0 0 612 792 re h W n /Im0 Do Q");
        assert_eq!(out, b"q /Im0 Do Q".to_vec());
        assert_eq!(removed, 1);

        let (out, _) = erase(b"q 0 0 612 792 re h W* n /Im0 Do Q");
        assert_eq!(out, b"q /Im0 Do Q".to_vec());
    }

    #[test]
    fn test_close_path_keeps_following_text_object() {
        let (out, removed) = erase(b"5 5 10 10 re h BT (x) Tj ET");
        assert_eq!(out, b" BT (x) Tj ET".to_vec());
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_transformed_box() {
        let result = rewrite(b"1 0 0 1 72 72 cm 0 0 10 10 re S");
        assert_eq!(&*result.content, b"");
        assert_eq!(result.removed, vec![(RuleKind::Transformed, 1)]);
    }

    #[test]
    fn test_multiple_matches_counted() {
        let (_, removed) = erase(b"0 0 1 1 re f 2 2 3 3 re S 4 4 5 5 re B");
        assert_eq!(removed, 3);
    }

    #[test]
    fn test_deterministic() {
        let input = b"q 0.5 w 10 10 50 50 re S Q 1 1 2 2 re f";
        assert_eq!(rewrite(input), rewrite(input));
    }

    /// Statement-level vocabulary. Every `re` outside a string literal is
    /// followed by its painting step within the same statement.
    const STATEMENTS: [&str; 38] = [
        "q",
        "Q",
        "BT",
        "ET",
        "/F1 12 Tf",
        "72 700 Td",
        "(Hello) Tj",
        "(a re f) Tj",
        "/Im0 Do",
        "/Fm0 Do",
        "/GS0 gs",
        "0.5 w",
        "1 J",
        "[3 2] 0 d",
        "1 0 0 RG",
        "0 0 1 rg",
        "0 0 0 1 K",
        "0.2 0.3 0.4 0.5 k",
        "0.5 G",
        "0.25 g",
        "1 0 0 1 72 72 cm",
        "1 0 0 1 10 20 Tm",
        "10 10 m",
        "20 20 l",
        "S",
        "f",
        "W n",
        "0 0 100 200 re f",
        "10 10 50 50 re S",
        "-1.5 2 .25 3. re B*",
        "0 0 612 792 re W n",
        "0 0 612 792 re W* n",
        "5 5 10 10 re h",
        "5 5 10 10 re h W n",
        "1 1 2 2 re b",
        "0 0 1 1 re 2 2 3 3 re f",
        "3 3 4 4 re s",
        "7 7 8 8 re f*",
    ];

    /// xorshift64, so every run sees the same sequences.
    struct Sequences(u64);

    impl Sequences {
        fn next_u64(&mut self) -> u64 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            x
        }

        fn below(&mut self, n: usize) -> usize {
            (self.next_u64() % n as u64) as usize
        }

        fn stream(&mut self) -> Vec<u8> {
            let len = 1 + self.below(16);
            let mut out = String::new();
            for i in 0..len {
                if i > 0 {
                    out.push(if self.below(4) == 0 { '\n' } else { ' ' });
                }
                out.push_str(STATEMENTS[self.below(STATEMENTS.len())]);
            }
            out.into_bytes()
        }
    }

    #[test]
    fn test_generated_streams_detected_and_idempotent() {
        let mut sequences = Sequences(0x9E37_79B9_7F4A_7C15);
        for _ in 0..5_000 {
            let input = sequences.stream();
            let once = rewrite(&input);
            if once.total_removed() > 0 {
                assert!(
                    crate::detect::has_boxes(&input),
                    "missed {:?}",
                    String::from_utf8_lossy(&input)
                );
            }
            let twice = rewrite(&once.content);
            assert_eq!(
                &*twice.content,
                &*once.content,
                "not idempotent on {:?}",
                String::from_utf8_lossy(&input)
            );
        }
    }

    #[test]
    fn test_latin1_roundtrip() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let text = decode_latin1(&bytes);
        assert_eq!(encode_latin1(&text).unwrap(), bytes);
        assert!(encode_latin1("\u{2014}").is_none());
    }
}
