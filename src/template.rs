use anyhow::{Context, Result};
use teloxide::types::{MessageEntity, MessageEntityKind};
use url::Url;

use crate::config::TemplateConfig;

/// Outbound text produced by [`Template::decorate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decorated {
    /// Fits the transport limit: decorated text plus adjusted spans.
    Single {
        text: String,
        entities: Vec<MessageEntity>,
    },
    /// Too long for one send: plain-text chunks, no spans.
    Chunked(Vec<String>),
}

/// Fixed prefix/suffix decoration around user content. The call-to-action
/// substring of the suffix becomes a text link to `cta_url`.
pub struct Template {
    prefix: String,
    suffix: String,
    cta_url: Url,
    /// UTF-16 offset of the call-to-action inside `suffix`.
    cta_offset_in_suffix: usize,
    cta_len: usize,
}

impl Template {
    pub fn new(config: &TemplateConfig) -> Result<Self> {
        let cta_url = Url::parse(&config.cta_url)
            .with_context(|| format!("Invalid call-to-action URL: {}", config.cta_url))?;
        let byte_pos = config
            .suffix
            .find(&config.cta_text)
            .with_context(|| format!("{:?} not found in template suffix", config.cta_text))?;

        Ok(Self {
            prefix: config.prefix.clone(),
            suffix: config.suffix.clone(),
            cta_url,
            cta_offset_in_suffix: utf16_len(&config.suffix[..byte_pos]),
            cta_len: utf16_len(&config.cta_text),
        })
    }

    /// Wrap `text` with the prefix/suffix and re-derive formatting spans.
    ///
    /// Telegram entity offsets count UTF-16 code units, so the original spans
    /// shift by the prefix's UTF-16 length, and one `TextLink` span is appended
    /// over the call-to-action. When the decorated text exceeds `limit` bytes
    /// the result degrades to plain chunks instead of failing.
    pub fn decorate(&self, text: &str, entities: &[MessageEntity], limit: usize) -> Decorated {
        let decorated = format!("{}{}{}", self.prefix, text, self.suffix);

        if decorated.len() > limit {
            return Decorated::Chunked(split_chunks(&decorated, limit));
        }

        let shift = utf16_len(&self.prefix);
        let mut spans: Vec<MessageEntity> = entities
            .iter()
            .map(|e| MessageEntity {
                kind: e.kind.clone(),
                offset: e.offset + shift,
                length: e.length,
            })
            .collect();

        spans.push(MessageEntity {
            kind: MessageEntityKind::TextLink {
                url: self.cta_url.clone(),
            },
            offset: shift + utf16_len(text) + self.cta_offset_in_suffix,
            length: self.cta_len,
        });

        Decorated::Single {
            text: decorated,
            entities: spans,
        }
    }
}

pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Split `text` into pieces of at most `max_len` bytes, preferring newline or
/// space boundaries and never cutting inside a UTF-8 character.
pub fn split_chunks(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TemplateConfig;

    fn template() -> Template {
        Template::new(&TemplateConfig::default()).unwrap()
    }

    #[test]
    fn plain_text_gets_the_cta_link_span() {
        let decorated = template().decorate("Hello", &[], 4000);

        let Decorated::Single { text, entities } = decorated else {
            panic!("expected single message");
        };
        assert_eq!(text, "👇👇👇\n\nHello\n\n👉 JOIN GROUP");
        assert_eq!(entities.len(), 1);

        // prefix = 3 emoji pairs + 2 newlines = 8 UTF-16 units,
        // "Hello" = 5, "\n\n👉 " = 5.
        let link = &entities[0];
        assert_eq!(link.offset, 18);
        assert_eq!(link.length, utf16_len("JOIN GROUP"));
        assert!(matches!(link.kind, MessageEntityKind::TextLink { .. }));
    }

    #[test]
    fn original_spans_shift_by_prefix_length() {
        let bold = MessageEntity {
            kind: MessageEntityKind::Bold,
            offset: 0,
            length: 5,
        };
        let decorated = template().decorate("Hello world", &[bold], 4000);

        let Decorated::Single { text, entities } = decorated else {
            panic!("expected single message");
        };
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].offset, utf16_len("👇👇👇\n\n"));
        assert_eq!(entities[0].length, 5);

        // Every span must stay inside the decorated buffer.
        let total = utf16_len(&text);
        for span in &entities {
            assert!(span.offset + span.length <= total);
        }
    }

    #[test]
    fn empty_text_still_produces_the_cta_span() {
        let decorated = template().decorate("", &[], 4000);

        let Decorated::Single { entities, .. } = decorated else {
            panic!("expected single message");
        };
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].offset, utf16_len("👇👇👇\n\n") + utf16_len("\n\n👉 "));
    }

    #[test]
    fn over_limit_text_degrades_to_plain_chunks() {
        let long = "word ".repeat(1000);
        let decorated = template().decorate(&long, &[], 4000);

        let Decorated::Chunked(chunks) = decorated else {
            panic!("expected chunked fallback");
        };
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 4000);
        }
        let rejoined: String = chunks.concat();
        assert!(rejoined.starts_with("👇👇👇"));
        assert!(rejoined.ends_with("JOIN GROUP"));
    }

    #[test]
    fn chunks_never_split_inside_a_character() {
        let emoji = "🦀".repeat(2000);
        for chunk in split_chunks(&emoji, 100) {
            assert!(chunk.chars().all(|c| c == '🦀'));
        }
    }

    #[test]
    fn cta_anywhere_in_suffix_is_found() {
        let config = TemplateConfig {
            prefix: String::new(),
            suffix: " tap HERE to join us".to_string(),
            cta_text: "HERE".to_string(),
            cta_url: "https://example.com/join".to_string(),
        };
        let template = Template::new(&config).unwrap();

        let Decorated::Single { text, entities } = template.decorate("x", &[], 4000) else {
            panic!("expected single message");
        };
        // All-ASCII input, so UTF-16 offsets equal byte offsets.
        let link = entities.last().unwrap();
        assert_eq!(&text[link.offset..link.offset + link.length], "HERE");
    }
}
