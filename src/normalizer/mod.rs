use feed_rs::model::{Link, Text};
use feed_rs::parser::{Builder, Parser};

use crate::app::{BotError, Result};
use crate::domain::Entry;

/// Converts a raw feed body into entries, in feed order.
pub struct Normalizer {
    parser: Parser,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Id for entries without a guid: the first link, else the title, else empty.
///
/// Must be stable across parses of the same body, otherwise the entry looks
/// new on every poll.
fn stable_id(links: &[Link], title: &Option<Text>, _uri: Option<&str>) -> String {
    if let Some(link) = links.first() {
        return link.href.clone();
    }
    title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .unwrap_or_default()
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            parser: Builder::new().id_generator(stable_id).build(),
        }
    }

    pub fn normalize(&self, body: &[u8]) -> Result<Vec<Entry>> {
        let feed = self
            .parser
            .parse(body)
            .map_err(|e| BotError::FeedParse(e.to_string()))?;

        let entries = feed
            .entries
            .into_iter()
            .map(|entry| {
                // Summary is sent verbatim; content is the fallback for
                // feeds that only carry a body.
                let summary = entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .unwrap_or_default();

                Entry {
                    id: entry.id,
                    summary,
                }
            })
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <description>A test feed</description>
    <item>
      <title>Newest</title>
      <link>https://example.com/item2</link>
      <guid>item-2</guid>
      <pubDate>Tue, 02 Jan 2024 00:00:00 GMT</pubDate>
      <description>&lt;b&gt;Second&lt;/b&gt; post</description>
    </item>
    <item>
      <title>Oldest</title>
      <link>https://example.com/item1</link>
      <guid>item-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
      <description>First post</description>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Test Feed</title>
  <entry>
    <title>Atom Entry 1</title>
    <link href="https://example.com/atom1"/>
    <id>atom-entry-1</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <content type="text">Only content here</content>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_keeps_feed_order() {
        let entries = Normalizer::new().normalize(RSS_SAMPLE.as_bytes()).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "item-2");
        assert_eq!(entries[1].id, "item-1");
        assert_eq!(entries[1].summary, "First post");
    }

    #[test]
    fn test_summary_is_not_unescaped_further() {
        let entries = Normalizer::new().normalize(RSS_SAMPLE.as_bytes()).unwrap();
        assert_eq!(entries[0].summary, "<b>Second</b> post");
    }

    #[test]
    fn test_parse_atom_falls_back_to_content() {
        let entries = Normalizer::new().normalize(ATOM_SAMPLE.as_bytes()).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "atom-entry-1");
        assert_eq!(entries[0].summary, "Only content here");
    }

    const RSS_NO_GUID: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <item><link>https://example.com/linked</link><description>Linked</description></item>
    <item><title>Titled</title><description>Titled only</description></item>
    <item><description>Bare</description></item>
  </channel>
</rss>"#;

    #[test]
    fn test_ids_without_guid_are_stable() {
        let normalizer = Normalizer::new();
        let first = normalizer.normalize(RSS_NO_GUID.as_bytes()).unwrap();
        let second = normalizer.normalize(RSS_NO_GUID.as_bytes()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].id, "https://example.com/linked");
        assert_eq!(first[1].id, "Titled");
        assert_eq!(first[2].id, "");
        assert_eq!(first[2].summary, "Bare");
    }

    #[test]
    fn test_parse_garbage() {
        let err = Normalizer::new().normalize(b"this is not a feed").unwrap_err();
        assert!(matches!(err, BotError::FeedParse(_)));
    }
}
