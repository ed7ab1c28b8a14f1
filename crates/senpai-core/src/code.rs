//! Code detection and message markup
//!
//! A reply is "code-bearing" when it contains a fence or looks like source.
//! Such replies are split around the first fenced block so the code can be
//! shown with a language label and a copy button, while the surrounding prose
//! still goes through markdown.

use std::sync::LazyLock;

use regex::Regex;

use crate::attachment::Attachment;
use crate::markdown::{escape_html, to_html, RenderContext};
use crate::message::{ImageData, Message};
use crate::theme::Theme;

pub const FENCE: &str = "```";

/// Language tag right after an opening fence, alone on its line.
static FENCE_LANGUAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(\w+)[ \t]*(?:\r?\n|$)").expect("valid fence regex"));
static LEADING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w*[ \t]*(?:\r?\n|$)").expect("valid tag regex"));

const CODE_KEYWORDS: [&str; 6] = ["function", "const ", "let ", "var ", "import ", "export "];

pub fn is_code_bearing(text: &str) -> bool {
    text.contains(FENCE)
        || (text.contains('\n') && (text.contains('{') || text.contains('}')))
        || CODE_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Display label for a code block. Explicit fence tags win, then keyword
/// sniffing in a fixed order, then "code".
pub fn detect_language(text: &str) -> String {
    if let Some(caps) = FENCE_LANGUAGE.captures(text) {
        return caps[1].to_string();
    }

    let has = |needle: &str| text.contains(needle);
    let label = if has("import React") || has("jsx") || has("useState") {
        "jsx"
    } else if has("def ") || (has("import ") && has("python")) {
        "python"
    } else if has("function") || has("const ") || has("=>") {
        "javascript"
    } else if has("#include") || has("int main") {
        "cpp"
    } else if has("public class") || has("System.out") {
        "java"
    } else if has("<html") || has("</") {
        "html"
    } else if has("body {") || has(".class") {
        "css"
    } else {
        "code"
    };
    label.to_string()
}

/// Prose before the first fence, the fenced code, and everything after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeSegments<'a> {
    pub preamble: &'a str,
    pub code: &'a str,
    pub postamble: &'a str,
}

/// Split on the fence into at most three segments. The language tag line is
/// removed from the code. Text without a fence is all code.
pub fn split_fenced(text: &str) -> CodeSegments<'_> {
    let mut parts = text.splitn(3, FENCE);
    let first = parts.next().unwrap_or_default();

    match parts.next() {
        Some(fenced) => {
            let code = match LEADING_TAG.find(fenced) {
                Some(tag) => &fenced[tag.end()..],
                None => fenced,
            };
            CodeSegments {
                preamble: first.trim(),
                code: code.trim(),
                postamble: parts.next().unwrap_or_default().trim(),
            }
        }
        None => CodeSegments {
            preamble: "",
            code: text.trim(),
            postamble: "",
        },
    }
}

/// Payload for the copy action: the code with fences and tag stripped.
pub fn clean_code(text: &str) -> String {
    split_fenced(text).code.to_string()
}

pub fn render_code_block_html(text: &str, ctx: &RenderContext) -> String {
    let code = clean_code(text);
    let language = detect_language(text);
    let (frame, header) = match ctx.theme {
        Theme::Dark => (
            "bg-gray-900 border-gray-700",
            "bg-gray-800 text-gray-300 border-b border-gray-700",
        ),
        Theme::Light => (
            "bg-gray-50 border-gray-200",
            "bg-gray-100 text-gray-700 border-b border-gray-200",
        ),
    };
    let escaped = escape_html(&code);

    format!(
        "<div class=\"code-block relative rounded-lg overflow-hidden mt-3 border {frame}\">\
         <div class=\"flex justify-between items-center px-4 py-3 text-sm {header}\">\
         <span class=\"code-language\">{label}</span><span>Code</span>\
         <button class=\"copy-button\" data-code=\"{escaped}\">Copy</button>\
         </div>\
         <pre><code class=\"language-{lang}\">{escaped}</code></pre>\
         </div>",
        label = escape_html(&language.to_uppercase()),
        lang = escape_html(&language),
    )
}

fn render_image_html(image: &ImageData) -> String {
    let Some(src) = image.source_uri() else {
        return String::new();
    };

    let mut out = format!(
        "<div class=\"message-image\"><img src=\"{}\" alt=\"{}\" class=\"max-w-full rounded-lg\" onerror=\"this.style.display='none'\">",
        escape_html(&src),
        escape_html(&image.alt_text())
    );
    if let Some(name) = &image.special_recipient {
        out.push_str(&format!(
            "<div class=\"special-recipient\">✨ Special message for {}</div>",
            escape_html(name)
        ));
    }
    out.push_str("</div>");
    out
}

fn render_attachments_html(attachments: &[Attachment]) -> String {
    let items: String = attachments
        .iter()
        .map(|attachment| {
            let thumb = match &attachment.preview {
                Some(preview) => format!(
                    "<img src=\"{}\" alt=\"{}\">",
                    escape_html(preview),
                    escape_html(&attachment.name)
                ),
                None => format!("<span class=\"file-icon\">{}</span>", attachment.kind.label()),
            };
            format!(
                "<div class=\"attachment\">{}<p>{}</p><p>{}</p></div>",
                thumb,
                escape_html(&attachment.name),
                escape_html(&attachment.summary())
            )
        })
        .collect();
    format!("<div class=\"attachments\">{items}</div>")
}

/// Full markup for one message body.
pub fn render_message_html(message: &Message, ctx: &RenderContext) -> String {
    if message.is_loading() {
        return "<div class=\"loading\">AI sedang mengetik...</div>".to_string();
    }

    let mut out = String::new();
    if let Some(image) = &message.image {
        out.push_str(&render_image_html(image));
    }

    if message.is_typing() {
        out.push_str(&to_html(message.visible_text(), ctx));
        out.push_str("<span class=\"animate-pulse text-blue-500\">|</span>");
        return out;
    }

    if !message.attachments.is_empty() {
        out.push_str(&render_attachments_html(&message.attachments));
    }

    if is_code_bearing(&message.text) {
        let segments = split_fenced(&message.text);
        if !segments.preamble.is_empty() {
            out.push_str(&format!("<div class=\"mb-3\">{}</div>", to_html(segments.preamble, ctx)));
        }
        out.push_str(&render_code_block_html(&message.text, ctx));
        if !segments.postamble.is_empty() {
            out.push_str(&format!("<div class=\"mt-3\">{}</div>", to_html(segments.postamble, ctx)));
        }
    } else {
        out.push_str(&to_html(&message.text, ctx));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::FileCandidate;

    #[test]
    fn test_fenced_python_is_detected() {
        let text = "```python\nprint(1)\n```";
        assert!(is_code_bearing(text));
        assert_eq!(detect_language(text), "python");
    }

    #[test]
    fn test_code_heuristics() {
        assert!(is_code_bearing("if (x) {\n  y();\n}"));
        assert!(is_code_bearing("const a = 1"));
        assert!(is_code_bearing("export default App"));
        assert!(!is_code_bearing("{ on one line }"));
        assert!(!is_code_bearing("Halo, apa kabar?"));
    }

    #[test]
    fn test_keyword_chain_order() {
        assert_eq!(detect_language("import React from 'react'"), "jsx");
        assert_eq!(detect_language("def main():\n  pass"), "python");
        assert_eq!(detect_language("const f = () => 1"), "javascript");
        assert_eq!(detect_language("#include <stdio.h>"), "cpp");
        assert_eq!(detect_language("public class Main {}"), "java");
        assert_eq!(detect_language("<html></html>"), "html");
        assert_eq!(detect_language("body { color: red }"), "css");
        assert_eq!(detect_language("x = 1"), "code");
    }

    #[test]
    fn test_fence_tag_beats_keywords() {
        assert_eq!(detect_language("```rust\nfunction_name();\n```"), "rust");
    }

    #[test]
    fn test_inline_fence_content_is_not_a_tag() {
        let text = "```print(1)```";
        assert_eq!(split_fenced(text).code, "print(1)");
        assert_eq!(detect_language(text), "code");
    }

    #[test]
    fn test_split_three_segments() {
        let text = "Here you go:\n```js\nconsole.log(1);\n```\nDone.";
        let segments = split_fenced(text);
        assert_eq!(segments.preamble, "Here you go:");
        assert_eq!(segments.code, "console.log(1);");
        assert_eq!(segments.postamble, "Done.");
    }

    #[test]
    fn test_split_keeps_later_fences_in_postamble() {
        let segments = split_fenced("a```\nb\n```c```d```");
        assert_eq!(segments.code, "b");
        assert_eq!(segments.postamble, "c```d```");
    }

    #[test]
    fn test_unclosed_fence_and_no_fence() {
        let open = split_fenced("intro\n```sh\nls -la");
        assert_eq!(open.preamble, "intro");
        assert_eq!(open.code, "ls -la");
        assert_eq!(open.postamble, "");

        let bare = split_fenced("  const x = 1;  ");
        assert_eq!(bare.preamble, "");
        assert_eq!(bare.code, "const x = 1;");
    }

    #[test]
    fn test_code_block_markup() {
        let html = render_code_block_html("```python\nprint('<1>')\n```", &RenderContext::default());
        assert!(html.contains("<span class=\"code-language\">PYTHON</span>"));
        assert!(html.contains("<code class=\"language-python\">print(&#39;&lt;1&gt;&#39;)</code>"));
        assert!(html.contains("bg-gray-50 border-gray-200"));
    }

    #[test]
    fn test_message_markup_with_prose_around_code() {
        let message = Message::assistant("**Contoh:**\n```js\nlet a = 1;\n```\nSelesai.");
        let html = render_message_html(&message, &RenderContext::new(Theme::Dark));
        let pre = html.find("<strong class=\"font-bold\">Contoh:</strong>").unwrap();
        let code = html.find("language-js").unwrap();
        let post = html.find("Selesai.").unwrap();
        assert!(pre < code && code < post);
        assert!(html.contains("bg-gray-900 border-gray-700"));
    }

    #[test]
    fn test_typing_message_renders_prefix_with_cursor() {
        let mut message = Message::revealing("**hi**", None);
        if let crate::message::MessageState::Revealing(reveal) = &mut message.state {
            for _ in 0..3 {
                reveal.step();
            }
        }
        let html = render_message_html(&message, &RenderContext::default());
        assert_eq!(html, "**h<span class=\"animate-pulse text-blue-500\">|</span>");
    }

    #[test]
    fn test_image_and_attachment_markup() {
        let mut message = Message::assistant("ok");
        message.image = ImageData::from_parts(None, Some("https://img/x.png".into()), None, Some("Budi".into()));
        let html = render_message_html(&message, &RenderContext::default());
        assert!(html.contains("src=\"https://img/x.png\""));
        assert!(html.contains("✨ Special message for Budi"));

        let attachment = Attachment::validate(FileCandidate::new("a.pdf", "application/pdf", vec![0; 2048])).unwrap();
        let user = Message::user("lihat", vec![attachment]);
        let html = render_message_html(&user, &RenderContext::default());
        assert!(html.contains("<span class=\"file-icon\">PDF</span><p>a.pdf</p><p>PDF • 2 KB</p>"));
    }

    #[test]
    fn test_broken_embedded_image_is_omitted() {
        let mut message = Message::assistant("ok");
        message.image = ImageData::from_parts(Some("not base64!".into()), None, None, None);
        assert_eq!(render_message_html(&message, &RenderContext::default()), "ok");
    }

    #[test]
    fn test_loading_placeholder_markup() {
        assert!(render_message_html(&Message::loading(), &RenderContext::default()).contains("mengetik"));
    }
}
