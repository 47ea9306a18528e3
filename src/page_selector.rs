//! Page specification parsing for the page-manipulation tools.
//!
//! Two grammars share one tokenizer:
//!
//! * **set grammar** (`"1,3,5-7"`) used by extract, delete, split and
//!   multi-page rotate. The result is ascending and duplicate free, and pages
//!   past the end of the document are silently dropped so that `1-100` on a
//!   five page file selects pages 1 to 5.
//! * **sequence grammar** (`"2,1,3,5,4"`) used by reorder. Order and repeats
//!   are kept exactly as written and every index must exist in the document.
//!
//! Both parsers are pure; they finish (or fail) before any document is touched.

use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageSpecError {
    #[error("malformed page specification: '{token}' is not a page number or range")]
    Malformed { token: String },

    #[error("reversed page range '{token}': start {start} is after end {end}")]
    ReversedRange { token: String, start: u32, end: u32 },

    #[error("page numbers start at 1, got '{token}'")]
    ZeroPage { token: String },

    #[error("page {index} is out of range (document has {bound} pages)")]
    OutOfRange { index: u32, bound: u32 },
}

/// Parse a set-grammar specification into ascending, unique page numbers
/// within `1..=page_count`.
///
/// ```
/// use pdf_tools_gateway::page_selector::parse_set;
///
/// assert_eq!(parse_set("1,3,5-7", 10).unwrap(), vec![1, 3, 5, 6, 7]);
/// assert_eq!(parse_set("1,3,5-7", 4).unwrap(), vec![1, 3, 4]);
/// ```
pub fn parse_set(spec: &str, page_count: u32) -> Result<Vec<u32>, PageSpecError> {
    let mut pages = BTreeSet::new();

    for token in tokens(spec) {
        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_page(start, token)?;
                let end = parse_page(end, token)?;
                if start > end {
                    return Err(PageSpecError::ReversedRange {
                        token: token.to_string(),
                        start,
                        end,
                    });
                }
                // Clamp before expanding so huge ranges stay cheap.
                pages.extend(start..=end.min(page_count));
            }
            None => {
                let page = parse_page(token, token)?;
                if page <= page_count {
                    pages.insert(page);
                }
            }
        }
    }

    Ok(pages.into_iter().collect())
}

/// Parse a sequence-grammar specification. Order and duplicates are kept;
/// any index past `page_count` fails the whole specification.
///
/// ```
/// use pdf_tools_gateway::page_selector::{parse_sequence, PageSpecError};
///
/// assert_eq!(parse_sequence("2,1,3,5,4", 5).unwrap(), vec![2, 1, 3, 5, 4]);
/// assert_eq!(
///     parse_sequence("2,1,9", 5),
///     Err(PageSpecError::OutOfRange { index: 9, bound: 5 })
/// );
/// ```
pub fn parse_sequence(spec: &str, page_count: u32) -> Result<Vec<u32>, PageSpecError> {
    let mut sequence = Vec::new();

    for token in tokens(spec) {
        let index = parse_page(token, token)?;
        if index > page_count {
            return Err(PageSpecError::OutOfRange {
                index,
                bound: page_count,
            });
        }
        sequence.push(index);
    }

    Ok(sequence)
}

/// Render a selection back into set grammar, e.g. `[1, 3, 4]` -> `"1,3,4"`.
///
/// Only non-empty selections round-trip through [`parse_set`]: the empty
/// selection renders as `""`, which the grammar rejects as malformed.
pub fn render(pages: &[u32]) -> String {
    pages
        .iter()
        .map(|page| page.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn tokens(spec: &str) -> impl Iterator<Item = &str> {
    spec.split(',').map(str::trim)
}

fn parse_page(raw: &str, token: &str) -> Result<u32, PageSpecError> {
    let raw = raw.trim();
    // u32::from_str accepts a leading '+', which is not part of the grammar.
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PageSpecError::Malformed {
            token: token.to_string(),
        });
    }
    let page: u32 = raw.parse().map_err(|_| PageSpecError::Malformed {
        token: token.to_string(),
    })?;
    if page == 0 {
        return Err(PageSpecError::ZeroPage {
            token: token.to_string(),
        });
    }
    Ok(page)
}
