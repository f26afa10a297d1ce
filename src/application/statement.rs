//! Selection of the problem statement fragment from a fetched judge page.

use std::{cell::Cell, rc::Rc};

use lol_html::{RewriteStrSettings, element, rewrite_str};
use thiserror::Error;

use super::markup::{collect_marked, mark_inner};

/// Class selector of the element holding the whole statement.
pub const STATEMENT_SELECTOR: &str = ".problemindexholder";

const NOTICE_SELECTOR: &str = ".problemindexholder div.alert, \
     .problemindexholder div.alert-info, \
     .problemindexholder div.diff-notifier";

#[derive(Debug, Error)]
pub enum StatementError {
    #[error("couldn't find the problem block (`{selector}`) on the page")]
    MissingFragment { selector: &'static str },
    #[error("failed to process problem page markup: {message}")]
    Markup { message: String },
}

/// Return the inner markup of the first statement holder, minus alert and
/// diff-notifier banners.
pub fn extract_statement(page_html: &str) -> Result<String, StatementError> {
    let holders_seen = Rc::new(Cell::new(0usize));

    let rewritten = rewrite_str(
        page_html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(STATEMENT_SELECTOR, {
                    let holders_seen = Rc::clone(&holders_seen);
                    move |el| {
                        let seen = holders_seen.get();
                        holders_seen.set(seen + 1);
                        if seen == 0 {
                            mark_inner(el);
                        }
                        Ok(())
                    }
                }),
                element!(NOTICE_SELECTOR, |el| {
                    el.remove();
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| StatementError::Markup {
        message: err.to_string(),
    })?;

    if holders_seen.get() == 0 {
        return Err(StatementError::MissingFragment {
            selector: STATEMENT_SELECTOR,
        });
    }

    collect_marked(&rewritten)
        .into_iter()
        .next()
        .ok_or(StatementError::MissingFragment {
            selector: STATEMENT_SELECTOR,
        })
}
