//! Locates dollar-delimited LaTeX spans in statement markup and splices rendered
//! embeds back in their place.
//!
//! Statements use `$$$...$$$` for inline math and `$$$$$$...$$$$$$` for display
//! math. An inline span always carries the single non-dollar character that
//! precedes it; splicing writes that character back untouched.

use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::domain::formula::{EmbedMap, Formula, FormulaBatch};

static INLINE_FORMULA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^$])\${3}([^$]+)\${3}").expect("inline formula pattern"));
static DISPLAY_FORMULA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\${6}([^$]+)\${6}").expect("display formula pattern"));

const DISPLAY_WRAPPER_OPEN: &str = r#"<div style="text-align:center;">"#;
const DISPLAY_WRAPPER_CLOSE: &str = "</div>";

/// Collect every formula in `html` into a render batch.
pub fn extract(html: &str) -> FormulaBatch {
    let inline = INLINE_FORMULA
        .captures_iter(html)
        .map(|caps| inline_formula(&caps));
    let display = DISPLAY_FORMULA
        .captures_iter(html)
        .map(|caps| display_formula(&caps));
    FormulaBatch::new(inline, display)
}

/// Replace every formula span in `html` with its rendered embed.
///
/// Inline spans are replaced first, display spans second. A span whose formula
/// has no embed is left as it was.
pub fn splice(html: &str, embeds: &EmbedMap) -> String {
    let inline_done = INLINE_FORMULA.replace_all(html, |caps: &Captures<'_>| {
        match embeds.get(&inline_formula(caps)) {
            Some(embed) => format!("{}{embed}", &caps[1]),
            None => caps[0].to_string(),
        }
    });

    DISPLAY_FORMULA
        .replace_all(&inline_done, |caps: &Captures<'_>| {
            match embeds.get(&display_formula(caps)) {
                Some(embed) => format!("{DISPLAY_WRAPPER_OPEN}{embed}{DISPLAY_WRAPPER_CLOSE}"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn inline_formula(caps: &Captures<'_>) -> Formula {
    Formula::inline(decode_html_entities(&caps[2]).into_owned())
}

fn display_formula(caps: &Captures<'_>) -> Formula {
    Formula::display(decode_html_entities(&caps[1]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embeds_for(batch: &FormulaBatch, embeds: &[&str]) -> EmbedMap {
        batch
            .pair_with(embeds.iter().map(|embed| (*embed).to_string()).collect())
            .expect("embed count matches")
    }

    #[test]
    fn extracts_inline_then_display() {
        let batch = extract("Let <x>$$$a+b$$$</x> equal <y>$$$$$$c^2$$$$$$</y>.");
        assert_eq!(
            batch.as_slice(),
            &[Formula::inline("a+b"), Formula::display("c^2")]
        );
    }

    #[test]
    fn splices_known_scenario() {
        let html = "Let <x>$$$a+b$$$</x> equal <y>$$$$$$c^2$$$$$$</y>.";
        let batch = extract(html);
        let spliced = splice(html, &embeds_for(&batch, &["INLINE", "BLOCK"]));
        assert_eq!(
            spliced,
            "Let <x>INLINE</x> equal <y><div style=\"text-align:center;\">BLOCK</div></y>."
        );
    }

    #[test]
    fn html_without_delimiters_is_untouched() {
        let html = "<p>Print the answer modulo 10^9+7. Costs $5.</p>";
        let batch = extract(html);
        assert!(batch.is_empty());
        assert_eq!(splice(html, &EmbedMap::default()), html);
    }

    #[test]
    fn decodes_entities_in_formula_content() {
        let batch = extract("if $$$a &lt; b$$$ and $$$x &amp;&amp; y$$$");
        assert_eq!(
            batch.as_slice(),
            &[Formula::inline("a < b"), Formula::inline("x && y")]
        );
    }

    #[test]
    fn unterminated_entities_are_kept_verbatim() {
        let batch = extract("so $$$a &lt b &#60; c$$$");
        assert_eq!(batch.as_slice(), &[Formula::inline("a &lt b < c")]);
    }

    #[test]
    fn repeated_formula_gets_the_same_embed_everywhere() {
        let html = "<p>$$$n$$$ lines, each with $$$n$$$ numbers</p>";
        let batch = extract(html);
        assert_eq!(batch.len(), 1);

        let spliced = splice(html, &embeds_for(&batch, &["N"]));
        assert_eq!(spliced, "<p>N lines, each with N numbers</p>");
    }

    #[test]
    fn inline_and_display_variants_stay_distinct() {
        let html = "<p>$$$k$$$</p><p>$$$$$$k$$$$$$</p>";
        let batch = extract(html);
        assert_eq!(
            batch.as_slice(),
            &[Formula::inline("k"), Formula::display("k")]
        );

        let spliced = splice(html, &embeds_for(&batch, &["small-k", "big-k"]));
        assert_eq!(
            spliced,
            "<p>small-k</p><p><div style=\"text-align:center;\">big-k</div></p>"
        );
    }

    #[test]
    fn placeholders_land_where_the_spans_were() {
        let html = "<div>A $$$x_1$$$, B $$$x_2$$$.</div><div>$$$$$$\\sum x_i$$$$$$</div>";
        let batch = extract(html);
        let spliced = splice(html, &embeds_for(&batch, &["[1]", "[2]", "[3]"]));
        assert_eq!(
            spliced,
            "<div>A [1], B [2].</div><div><div style=\"text-align:center;\">[3]</div></div>"
        );
    }

    #[test]
    fn extraction_after_splicing_finds_nothing() {
        let html = "<p>Given $$$n$$$ and</p>$$$$$$\\frac{a}{b}$$$$$$";
        let batch = extract(html);
        let spliced = splice(html, &embeds_for(&batch, &["<i>n</i>", "<b>frac</b>"]));
        assert!(extract(&spliced).is_empty());
    }

    #[test]
    fn formula_at_start_of_input_is_not_inline() {
        // The leading character is part of an inline match, so position zero never matches.
        assert!(extract("$$$a$$$").is_empty());
        assert_eq!(extract(" $$$a$$$").as_slice(), &[Formula::inline("a")]);
    }

    #[test]
    fn span_without_embed_is_left_in_place() {
        let html = "x $$$a$$$ y";
        let other = FormulaBatch::new([Formula::inline("b")], []);
        let spliced = splice(html, &embeds_for(&other, &["B"]));
        assert_eq!(spliced, html);
    }
}
