//! Line splitting with optional bidirectional reordering.
//!
//! The bidirectional algorithm itself is out of scope; a host that needs
//! it injects a [`TextReorderer`] backed by ICU or similar. The default
//! keeps logical order, which is correct for left-to-right scripts.

use std::collections::BTreeSet;

use widestring::U16String;

/// UTF-16 code unit. The glyph pipeline operates on the BMP.
pub type Char16 = u16;

/// Each code point paired with the index of its formatting section, so
/// reordering preserves formatting.
pub type StyledText = (U16String, Vec<u8>);

/// Splits text into lines at the given break points and applies any
/// visual reordering the implementation supports.
pub trait TextReorderer {
    /// Plain text in logical order, break points as indices into the
    /// code unit sequence; returns lines in visual order.
    fn process_text(&self, input: &U16String, line_breaks: BTreeSet<usize>) -> Vec<U16String>;

    /// As [`process_text`](Self::process_text), preserving per-code-point
    /// section indices.
    fn process_styled_text(
        &self,
        input: &StyledText,
        line_breaks: BTreeSet<usize>,
    ) -> Vec<StyledText>;
}

/// The no-reordering default: lines come out in logical order.
#[derive(Default)]
pub struct LogicalOrder;

impl TextReorderer for LogicalOrder {
    fn process_text(&self, input: &U16String, mut line_breaks: BTreeSet<usize>) -> Vec<U16String> {
        line_breaks.insert(input.len());
        let mut lines = Vec::new();
        let mut start = 0;
        for break_point in line_breaks {
            lines.push(U16String::from(&input[start..break_point]));
            start = break_point;
        }
        lines
    }

    fn process_styled_text(
        &self,
        input: &StyledText,
        mut line_breaks: BTreeSet<usize>,
    ) -> Vec<StyledText> {
        line_breaks.insert(input.0.len());
        let mut lines = Vec::new();
        let mut start = 0;
        for break_point in line_breaks {
            if break_point <= input.1.len() {
                lines.push((
                    U16String::from(&input.0[start..break_point]),
                    Vec::from(&input.1[start..break_point]),
                ));
                start = break_point;
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_at_breaks() {
        let reorderer = LogicalOrder;
        let lines = reorderer.process_text(&U16String::from("abcdef"), BTreeSet::from([2, 4]));
        assert_eq!(
            lines,
            vec![
                U16String::from("ab"),
                U16String::from("cd"),
                U16String::from("ef")
            ]
        );
    }

    #[test]
    fn styled_split_keeps_sections() {
        let reorderer = LogicalOrder;
        let styled = (U16String::from("aabb"), vec![0, 0, 1, 1]);
        let lines = reorderer.process_styled_text(&styled, BTreeSet::from([2]));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].1, vec![0, 0]);
        assert_eq!(lines[1].1, vec![1, 1]);
    }
}
