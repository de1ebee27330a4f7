//! Turn rendering for the presentation layer
//!
//! Pure functions of a turn: no state, no I/O.

use crate::llm::{Part, Role, Turn};
use pulldown_cmark::{html, Event, Options, Parser};
use serde::Serialize;

/// Which edge of the transcript a turn is drawn against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Leading,
    Trailing,
}

impl Side {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Model => Side::Leading,
            Role::User => Side::Trailing,
        }
    }
}

/// A turn ready for display: one HTML fragment per part
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedTurn {
    pub role: Role,
    pub side: Side,
    pub fragments: Vec<String>,
}

pub fn render_turn(turn: &Turn) -> RenderedTurn {
    RenderedTurn {
        role: turn.role,
        side: Side::for_role(turn.role),
        fragments: turn.parts.iter().map(render_part).collect(),
    }
}

pub fn render_turns(turns: &[Turn]) -> Vec<RenderedTurn> {
    turns.iter().map(render_turn).collect()
}

fn render_part(part: &Part) -> String {
    match part.as_text() {
        Ok(text) => render_markdown(text),
        Err(unsupported) => render_markdown(&format!("*[{unsupported}]*")),
    }
}

/// Markdown to an HTML fragment
///
/// Raw HTML in the source is shown as text, never passed through.
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
