use std::sync::LazyLock;

use regex::Regex;

use super::{Block, Document, Inline, ListKind};

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,3}) (.*)$").expect("valid heading regex"));
static QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^> (.*)$").expect("valid quote regex"));
static UNORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(.*)$").expect("valid bullet regex"));
static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s+(.*)$").expect("valid numbered regex"));

/// List merging state while walking lines.
enum ListState {
    NoList,
    InList { kind: ListKind, items: Vec<Vec<Inline>> },
}

struct BlockBuilder {
    blocks: Vec<Block>,
    list: ListState,
}

impl BlockBuilder {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            list: ListState::NoList,
        }
    }

    fn push_item(&mut self, kind: ListKind, item: Vec<Inline>) {
        match &mut self.list {
            ListState::InList { kind: open, items } if *open == kind => items.push(item),
            _ => {
                self.close_list();
                self.list = ListState::InList { kind, items: vec![item] };
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        self.close_list();
        self.blocks.push(block);
    }

    fn close_list(&mut self) {
        if let ListState::InList { kind, items } =
            std::mem::replace(&mut self.list, ListState::NoList)
        {
            self.blocks.push(Block::List { kind, items });
        }
    }

    fn finish(mut self) -> Document {
        self.close_list();
        Document { blocks: self.blocks }
    }
}

pub fn parse(text: &str) -> Document {
    let mut builder = BlockBuilder::new();

    for raw_line in text.split('\n') {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

        if let Some(caps) = HEADING.captures(line) {
            builder.push_block(Block::Heading {
                level: caps[1].len() as u8,
                content: parse_inline(&caps[2]),
            });
        } else if let Some(caps) = QUOTE.captures(line) {
            builder.push_block(Block::Quote(parse_inline(&caps[1])));
        } else if let Some(caps) = UNORDERED_ITEM.captures(line) {
            builder.push_item(ListKind::Unordered, parse_inline(&caps[1]));
        } else if let Some(caps) = ORDERED_ITEM.captures(line) {
            builder.push_item(ListKind::Ordered, parse_inline(&caps[1]));
        } else if line.trim().is_empty() {
            builder.push_block(Block::Blank);
        } else {
            builder.push_block(Block::Line(parse_inline(line)));
        }
    }

    builder.finish()
}

#[derive(Clone, Copy)]
enum Span {
    Strong,
    Strike,
    Emphasis,
}

impl Span {
    fn wrap(self, inner: Vec<Inline>) -> Inline {
        match self {
            Span::Strong => Inline::Strong(inner),
            Span::Strike => Inline::Strikethrough(inner),
            Span::Emphasis => Inline::Emphasis(inner),
        }
    }
}

/// Paired delimiters in the order they are tried at each position.
const DELIMITED: [(&str, Span); 5] = [
    ("**", Span::Strong),
    ("__", Span::Strong),
    ("~~", Span::Strike),
    ("*", Span::Emphasis),
    ("_", Span::Emphasis),
];

pub(crate) fn parse_inline(text: &str) -> Vec<Inline> {
    let mut nodes = Vec::new();
    let mut literal = String::new();
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];

        if let Some((node, consumed)) = match_inline(rest) {
            if !literal.is_empty() {
                nodes.push(Inline::Text(std::mem::take(&mut literal)));
            }
            nodes.push(node);
            pos += consumed;
            continue;
        }

        let ch = rest.chars().next().unwrap_or_default();
        literal.push(ch);
        pos += ch.len_utf8();
    }

    if !literal.is_empty() {
        nodes.push(Inline::Text(literal));
    }
    nodes
}

/// Try every inline construct at the start of `rest`, returning the node and
/// the number of bytes it spans.
fn match_inline(rest: &str) -> Option<(Inline, usize)> {
    if rest.starts_with('`') {
        return match_code(rest);
    }
    if rest.starts_with('[') {
        return match_link(rest);
    }

    DELIMITED.iter().find_map(|&(delim, span)| {
        let inner = rest.strip_prefix(delim)?;
        let end = inner.find(delim)?;
        if end == 0 {
            return None;
        }
        Some((span.wrap(parse_inline(&inner[..end])), delim.len() * 2 + end))
    })
}

fn match_code(rest: &str) -> Option<(Inline, usize)> {
    let inner = &rest[1..];
    let end = inner.find('`')?;
    if end == 0 {
        return None;
    }
    Some((Inline::Code(inner[..end].to_string()), end + 2))
}

fn match_link(rest: &str) -> Option<(Inline, usize)> {
    let inner = &rest[1..];
    // A nested `[` or a line break ends the attempt, keeping the scan linear
    let text_end = inner.find(&['[', ']', '\n'][..])?;
    if text_end == 0 || !inner[text_end..].starts_with(']') {
        return None;
    }
    let after = inner[text_end + 1..].strip_prefix('(')?;
    let url_end = after.find(&['[', ')', '\n'][..])?;
    if url_end == 0 || !after[url_end..].starts_with(')') {
        return None;
    }

    let node = Inline::Link {
        text: parse_inline(&inner[..text_end]),
        url: after[..url_end].to_string(),
    };
    // "[" + text + "](" + url + ")"
    Some((node, 1 + text_end + 2 + url_end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn test_bold_and_italic() {
        assert_eq!(
            parse_inline("**bold** and *italic*"),
            vec![
                Inline::Strong(vec![text("bold")]),
                text(" and "),
                Inline::Emphasis(vec![text("italic")]),
            ]
        );
    }

    #[test]
    fn test_underscore_variants() {
        assert_eq!(
            parse_inline("__b__ _i_"),
            vec![
                Inline::Strong(vec![text("b")]),
                text(" "),
                Inline::Emphasis(vec![text("i")]),
            ]
        );
    }

    #[test]
    fn test_emphasis_inside_bold() {
        assert_eq!(
            parse_inline("**a *b* c**"),
            vec![Inline::Strong(vec![
                text("a "),
                Inline::Emphasis(vec![text("b")]),
                text(" c"),
            ])]
        );
    }

    #[test]
    fn test_code_span_is_literal() {
        assert_eq!(
            parse_inline("run `**not bold**` now"),
            vec![text("run "), Inline::Code("**not bold**".to_string()), text(" now")]
        );
    }

    #[test]
    fn test_link() {
        assert_eq!(
            parse_inline("see [the *docs*](https://x.dev/a_b) ok"),
            vec![
                text("see "),
                Inline::Link {
                    text: vec![text("the "), Inline::Emphasis(vec![text("docs")])],
                    url: "https://x.dev/a_b".to_string(),
                },
                text(" ok"),
            ]
        );
    }

    #[test]
    fn test_unmatched_delimiters_stay_literal() {
        assert_eq!(parse_inline("2 * 3 = 6"), vec![text("2 * 3 = 6")]);
        assert_eq!(parse_inline("**open"), vec![text("**open")]);
        assert_eq!(parse_inline("``"), vec![text("``")]);
        assert_eq!(parse_inline("[x] (y)"), vec![text("[x] (y)")]);
    }

    #[test]
    fn test_link_text_stops_at_open_bracket() {
        assert_eq!(
            parse_inline("[a [b](u)"),
            vec![
                text("[a "),
                Inline::Link { text: vec![text("b")], url: "u".to_string() },
            ]
        );
        assert_eq!(parse_inline("[a\nb](u)"), vec![text("[a\nb](u)")]);
    }

    #[test]
    fn test_many_open_brackets_stay_literal() {
        let line = "[".repeat(50_000) + "x";
        assert_eq!(parse_inline(&line), vec![text(&line)]);

        let line = "[a](".repeat(20_000);
        assert_eq!(parse_inline(&line), vec![text(&line)]);
    }

    #[test]
    fn test_strikethrough() {
        assert_eq!(
            parse_inline("~~gone~~"),
            vec![Inline::Strikethrough(vec![text("gone")])]
        );
    }

    #[test]
    fn test_headings_up_to_level_three() {
        let doc = parse("# one\n## two\n### three\n#### four\n#nospace");
        assert_eq!(
            doc.blocks,
            vec![
                Block::Heading { level: 1, content: vec![text("one")] },
                Block::Heading { level: 2, content: vec![text("two")] },
                Block::Heading { level: 3, content: vec![text("three")] },
                Block::Line(vec![text("#### four")]),
                Block::Line(vec![text("#nospace")]),
            ]
        );
    }

    #[test]
    fn test_consecutive_items_merge() {
        let doc = parse("- a\n* b\n+ c");
        assert_eq!(
            doc.blocks,
            vec![Block::List {
                kind: ListKind::Unordered,
                items: vec![vec![text("a")], vec![text("b")], vec![text("c")]],
            }]
        );
    }

    #[test]
    fn test_list_kind_change_starts_new_list() {
        let doc = parse("- a\n1. b\n2. c");
        assert_eq!(
            doc.blocks,
            vec![
                Block::List { kind: ListKind::Unordered, items: vec![vec![text("a")]] },
                Block::List {
                    kind: ListKind::Ordered,
                    items: vec![vec![text("b")], vec![text("c")]],
                },
            ]
        );
    }

    #[test]
    fn test_blank_line_closes_list() {
        let doc = parse("1. a\n\n1. b");
        assert_eq!(doc.blocks.len(), 3);
        assert_eq!(doc.blocks[1], Block::Blank);
    }

    #[test]
    fn test_text_line_closes_list() {
        let doc = parse("- a\nafter");
        assert_eq!(
            doc.blocks,
            vec![
                Block::List { kind: ListKind::Unordered, items: vec![vec![text("a")]] },
                Block::Line(vec![text("after")]),
            ]
        );
    }

    #[test]
    fn test_indented_items_stay_flat() {
        let doc = parse("- a\n  - nested");
        assert_eq!(
            doc.blocks,
            vec![Block::List {
                kind: ListKind::Unordered,
                items: vec![vec![text("a")], vec![text("nested")]],
            }]
        );
    }

    #[test]
    fn test_bold_line_is_not_a_bullet() {
        let doc = parse("**note** here");
        assert!(matches!(doc.blocks[0], Block::Line(_)));
    }

    #[test]
    fn test_blockquote_and_crlf() {
        let doc = parse("> quoted\r\nplain\r");
        assert_eq!(
            doc.blocks,
            vec![
                Block::Quote(vec![text("quoted")]),
                Block::Line(vec![text("plain")]),
            ]
        );
    }
}
