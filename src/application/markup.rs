//! Capturing element markup out of a streaming `lol_html` rewrite.
//!
//! `lol_html` never materialises a DOM, so handlers bracket the elements of
//! interest with comment markers and the captured fragments are cut out of the
//! rewritten string afterwards.

use lol_html::html_content::{ContentType, Element};

const OPEN_MARKER: &str = "<!--cf2pdf:capture:open-->";
const CLOSE_MARKER: &str = "<!--cf2pdf:capture:close-->";

/// Capture the element itself, tags included.
pub(crate) fn mark_outer(el: &mut Element<'_, '_>) {
    el.before(OPEN_MARKER, ContentType::Html);
    el.after(CLOSE_MARKER, ContentType::Html);
}

/// Capture only the element's children.
pub(crate) fn mark_inner(el: &mut Element<'_, '_>) {
    el.prepend(OPEN_MARKER, ContentType::Html);
    el.append(CLOSE_MARKER, ContentType::Html);
}

/// Cut every outermost marked region out of `rewritten`, in document order.
///
/// Markers of nested captures are stripped from the enclosing fragment.
/// An unterminated region is dropped.
pub(crate) fn collect_marked(rewritten: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut cursor = 0usize;

    while let Some((offset, is_open)) = next_marker(&rewritten[cursor..]) {
        let at = cursor + offset;
        if is_open {
            if depth == 0 {
                start = at + OPEN_MARKER.len();
            }
            depth += 1;
            cursor = at + OPEN_MARKER.len();
        } else {
            cursor = at + CLOSE_MARKER.len();
            if depth == 0 {
                continue;
            }
            depth -= 1;
            if depth == 0 {
                fragments.push(strip_markers(&rewritten[start..at]));
            }
        }
    }

    fragments
}

fn next_marker(haystack: &str) -> Option<(usize, bool)> {
    match (haystack.find(OPEN_MARKER), haystack.find(CLOSE_MARKER)) {
        (Some(open), Some(close)) if open < close => Some((open, true)),
        (_, Some(close)) => Some((close, false)),
        (Some(open), None) => Some((open, true)),
        (None, None) => None,
    }
}

fn strip_markers(fragment: &str) -> String {
    fragment.replace(OPEN_MARKER, "").replace(CLOSE_MARKER, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(inner: &str) -> String {
        format!("{OPEN_MARKER}{inner}{CLOSE_MARKER}")
    }

    #[test]
    fn collects_regions_in_order() {
        let html = format!("<p>{}</p><p>{}</p>", wrap("one"), wrap("two"));
        assert_eq!(collect_marked(&html), vec!["one", "two"]);
    }

    #[test]
    fn nested_regions_collapse_into_outer_fragment() {
        let html = wrap(&format!("<b>{}</b>", wrap("x")));
        assert_eq!(collect_marked(&html), vec!["<b>x</b>"]);
    }

    #[test]
    fn unterminated_region_is_dropped() {
        let html = format!("{}{OPEN_MARKER}tail", wrap("ok"));
        assert_eq!(collect_marked(&html), vec!["ok"]);
    }

    #[test]
    fn stray_close_marker_is_ignored() {
        let html = format!("{CLOSE_MARKER}{}", wrap("ok"));
        assert_eq!(collect_marked(&html), vec!["ok"]);
    }
}
