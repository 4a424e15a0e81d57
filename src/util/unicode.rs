use std::borrow::Cow;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const ELLIPSIS: char = '\u{2026}';

/// Width of a label in terminal cells
pub fn display_width(s: &str) -> usize {
    s.graphemes(true).map(UnicodeWidthStr::width).sum()
}

/// Shorten `label` to at most `max_cells` cells, ending it with `…` when
/// anything was cut. Never splits a grapheme cluster.
pub fn fit_to_width(label: &str, max_cells: usize) -> Cow<'_, str> {
    if display_width(label) <= max_cells {
        return Cow::Borrowed(label);
    }
    match max_cells {
        0 => Cow::Borrowed(""),
        1 => Cow::Owned(ELLIPSIS.to_string()),
        _ => {
            let budget = max_cells - 1;
            let mut width = 0;
            let mut fitted = String::new();
            for grapheme in label.graphemes(true) {
                width += UnicodeWidthStr::width(grapheme);
                if width > budget {
                    break;
                }
                fitted.push_str(grapheme);
            }
            fitted.push(ELLIPSIS);
            Cow::Owned(fitted)
        }
    }
}
