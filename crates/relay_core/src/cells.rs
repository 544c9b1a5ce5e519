//! Cell text collection on top of the html5ever tokenizer.
//!
//! Only the tokenizer runs, never the tree builder, so nothing repairs the
//! markup: a cell still open at the end of the fragment is reported.

use std::cell::RefCell;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

use crate::ParseError;

/// Start tags that separate words inside a cell.
const WORD_BREAKS: &[&str] = &["br", "p", "div", "li", "tr", "td", "th"];

#[derive(Debug, Default)]
struct Collector {
    cells: Vec<String>,
    depth: usize,
    opened_on_line: u64,
    buffer: String,
    in_raw_text: bool,
}

struct CellSink {
    cell: &'static str,
    collector: RefCell<Collector>,
}

impl CellSink {
    fn tag(&self, tag: Tag, line: u64) -> TokenSinkResult<()> {
        let mut guard = self.collector.borrow_mut();
        let c = &mut *guard;
        let name: &str = &tag.name;

        match tag.kind {
            // A trailing slash means nothing on a cell; `<td/>` opens one.
            TagKind::StartTag if name == self.cell => {
                if c.depth == 0 {
                    c.opened_on_line = line;
                    c.buffer.clear();
                }
                c.depth += 1;
            }
            TagKind::EndTag if name == self.cell => {
                if c.depth > 0 {
                    c.depth -= 1;
                    if c.depth == 0 {
                        c.cells.push(normalize_whitespace(&c.buffer));
                    }
                }
            }
            TagKind::StartTag if name == "script" || name == "style" => {
                c.in_raw_text = true;
                let kind = if name == "script" {
                    RawKind::ScriptData
                } else {
                    RawKind::Rawtext
                };
                return TokenSinkResult::RawData(kind);
            }
            TagKind::EndTag if name == "script" || name == "style" => c.in_raw_text = false,
            TagKind::StartTag if c.depth > 0 && WORD_BREAKS.contains(&name) => c.buffer.push(' '),
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

impl TokenSink for CellSink {
    type Handle = ();

    fn process_token(&self, token: Token, line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => self.tag(tag, line_number),
            Token::CharacterTokens(text) => {
                let mut c = self.collector.borrow_mut();
                if c.depth > 0 && !c.in_raw_text {
                    c.buffer.push_str(&text);
                }
                TokenSinkResult::Continue
            }
            _ => TokenSinkResult::Continue,
        }
    }
}

/// Plain text of every `cell` element in `fragment`, in document order.
/// Character references arrive decoded from the tokenizer. Nested markup
/// contributes its text only; a nested cell of the same kind folds into the
/// enclosing one and a stray end tag is ignored.
pub(crate) fn collect_cells(fragment: &str, cell: &'static str) -> Result<Vec<String>, ParseError> {
    let sink = CellSink {
        cell,
        collector: RefCell::default(),
    };
    let tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
    let input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(fragment));
    // The sink never asks for a script pause, so one feed consumes everything.
    let _ = tokenizer.feed(&input);
    tokenizer.end();

    let collector = tokenizer.sink.collector.take();
    if collector.depth > 0 {
        return Err(ParseError::UnclosedCell {
            tag: cell.to_string(),
            line: collector.opened_on_line,
        });
    }
    Ok(collector.cells)
}

/// Collapse whitespace runs (including no-break spaces) and trim.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
