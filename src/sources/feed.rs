//! RSS 2.0 / Atom feed adapter for journal and news sources.
//!
//! One [`FeedAdapter`] instance serves one configured feed. Journal feeds
//! produce `research` items; news feeds produce `news` items and may be
//! backed by a search-URL template (Google-News style) whose `{topic}`
//! placeholder receives the URL-encoded `topic1 OR topic2 …` query.
//!
//! The parser is deliberately tolerant: feeds in the wild omit fields,
//! wrap text in CDATA, and mix RSS and Atom conventions. Anything missing
//! stays empty and downstream stages handle it.

use super::{DateWindow, SourceAdapter, SourceResult};
use crate::config::{FeedSourceConfig, NewsSourceConfig};
use crate::models::{Item, ItemType};
use crate::utils::{strip_html, truncate_for_log};
use async_trait::async_trait;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use std::error::Error;
use tracing::{debug, instrument, warn};
use url::Url;

/// Entry cap for journal feeds.
const JOURNAL_ENTRY_LIMIT: usize = 50;
/// Entry cap for news feeds, which skew chatty.
const NEWS_ENTRY_LIMIT: usize = 20;

/// One entry parsed out of an RSS or Atom document.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FeedEntry {
    pub id: Option<String>,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub published: Option<String>,
}

enum FeedEndpoint {
    /// A fixed feed URL.
    Url(String),
    /// A template with a `{topic}` placeholder.
    SearchTemplate(String),
}

/// Adapter for one configured RSS/Atom feed.
pub struct FeedAdapter {
    name: String,
    endpoint: FeedEndpoint,
    kind: ItemType,
    entry_limit: usize,
    client: Client,
}

impl FeedAdapter {
    /// Adapter for a journal feed producing research items.
    pub fn journal(client: Client, config: &FeedSourceConfig) -> Self {
        Self {
            name: config.name.clone(),
            endpoint: FeedEndpoint::Url(config.rss.clone()),
            kind: ItemType::Research,
            entry_limit: JOURNAL_ENTRY_LIMIT,
            client,
        }
    }

    /// Adapter for a news source; `None` when the config names neither a
    /// feed URL nor a search template.
    pub fn news(client: Client, config: &NewsSourceConfig) -> Option<Self> {
        let endpoint = if let Some(rss) = &config.rss {
            FeedEndpoint::Url(rss.clone())
        } else if let Some(template) = &config.search_url {
            FeedEndpoint::SearchTemplate(template.clone())
        } else {
            warn!(source = %config.name, "News source has neither rss nor search_url; skipping");
            return None;
        };

        Some(Self {
            name: config.name.clone(),
            endpoint,
            kind: ItemType::News,
            entry_limit: NEWS_ENTRY_LIMIT,
            client,
        })
    }

    /// The concrete URL to fetch for this run.
    fn resolve_url(&self, topics: &[String]) -> String {
        match &self.endpoint {
            FeedEndpoint::Url(url) => url.clone(),
            FeedEndpoint::SearchTemplate(template) => {
                let query = topics.join(" OR ");
                template.replace("{topic}", &urlencoding::encode(&query))
            }
        }
    }

    fn entry_to_item(&self, entry: FeedEntry, feed_url: &str) -> Item {
        let link = absolute_link(&entry.link, feed_url);
        let id = entry
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| link.clone());

        Item {
            id,
            url: link,
            title: entry.title,
            authors: entry.authors,
            abstract_text: strip_html(&entry.summary),
            published_at: entry.published.unwrap_or_default(),
            source: self.name.clone(),
            kind: self.kind,
            ..Default::default()
        }
    }
}

/// Resolve feed links that are relative to the feed's own host.
fn absolute_link(link: &str, feed_url: &str) -> String {
    if link.is_empty() || Url::parse(link).is_ok() {
        return link.to_string();
    }
    Url::parse(feed_url)
        .and_then(|base| base.join(link))
        .map(|resolved| resolved.to_string())
        .unwrap_or_else(|_| link.to_string())
}

#[async_trait]
impl SourceAdapter for FeedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "info", skip_all, fields(source = %self.name))]
    async fn discover(&self, topics: &[String], _window: &DateWindow) -> SourceResult {
        let url = self.resolve_url(topics);
        debug!(%url, "Fetching feed");

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let entries = match parse_feed(&body) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    source = %self.name,
                    preview = %truncate_for_log(&body, 200),
                    "Feed body failed to parse"
                );
                return Err(e);
            }
        };

        let items: Vec<Item> = entries
            .into_iter()
            .take(self.entry_limit)
            .map(|entry| self.entry_to_item(entry, &url))
            .collect();
        Ok(items)
    }
}

/// Fields a feed entry's child elements can map onto.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Title,
    Link,
    Id,
    Summary,
    Published,
    Updated,
    Author,
}

#[derive(Default)]
struct EntryBuilder {
    id: Option<String>,
    title: String,
    text_link: String,
    alternate_link: String,
    any_link: String,
    summary: String,
    authors: Vec<String>,
    published: Option<String>,
    updated: Option<String>,
}

impl EntryBuilder {
    fn set(&mut self, field: Field, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match field {
            Field::Title => {
                if self.title.is_empty() {
                    self.title = value.to_string();
                }
            }
            Field::Link => {
                if self.text_link.is_empty() {
                    self.text_link = value.to_string();
                }
            }
            Field::Id => {
                if self.id.is_none() {
                    self.id = Some(value.to_string());
                }
            }
            Field::Summary => {
                if self.summary.is_empty() {
                    self.summary = value.to_string();
                }
            }
            Field::Published => {
                if self.published.is_none() {
                    self.published = Some(value.to_string());
                }
            }
            Field::Updated => {
                if self.updated.is_none() {
                    self.updated = Some(value.to_string());
                }
            }
            Field::Author => self.authors.push(value.to_string()),
        }
    }

    fn add_link_attr(&mut self, href: String, rel: Option<String>) {
        let is_alternate = rel.as_deref().is_none_or(|r| r == "alternate");
        if is_alternate && self.alternate_link.is_empty() {
            self.alternate_link = href;
        } else if self.any_link.is_empty() {
            self.any_link = href;
        }
    }

    fn finish(self) -> FeedEntry {
        let link = [self.alternate_link, self.text_link, self.any_link]
            .into_iter()
            .find(|candidate| !candidate.is_empty())
            .unwrap_or_default();

        FeedEntry {
            id: self.id,
            title: self.title,
            link,
            summary: self.summary,
            authors: self.authors,
            // Atom feeds without `published` still carry `updated`.
            published: self.published.or(self.updated),
        }
    }
}

/// Parse an RSS 2.0 or Atom document into entries.
///
/// Both formats are handled by local element name, so namespace prefixes
/// (`dc:creator`, `atom:entry`) resolve naturally. Channel/feed-level
/// metadata outside `item`/`entry` elements is ignored.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, Box<dyn Error + Send + Sync>> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Err(e) => return Err(Box::new(e)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(start)) => match start.local_name().as_ref() {
                b"item" | b"entry" => {
                    entry = Some(EntryBuilder::default());
                    field = None;
                }
                name => {
                    if let Some(current) = entry.as_mut() {
                        if name == b"link" {
                            if let Some(href) = attr_value(&start, b"href") {
                                current.add_link_attr(href, attr_value(&start, b"rel"));
                            }
                        }
                        field = field_for(name);
                        text.clear();
                    }
                }
            },
            Ok(Event::Empty(empty)) => {
                if let Some(current) = entry.as_mut() {
                    if empty.local_name().as_ref() == b"link" {
                        if let Some(href) = attr_value(&empty, b"href") {
                            current.add_link_attr(href, attr_value(&empty, b"rel"));
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if field.is_some() {
                    match t.decode() {
                        Ok(decoded) => text.push_str(&decoded),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Ok(Event::GeneralRef(r)) => {
                if field.is_some() {
                    if let Ok(Some(ch)) = r.resolve_char_ref() {
                        text.push(ch);
                    } else if let Ok(name) = r.decode() {
                        if let Some(resolved) = resolve_predefined_entity(&name) {
                            text.push_str(resolved);
                        }
                    }
                }
            }
            Ok(Event::CData(cdata)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            Ok(Event::End(end)) => match end.local_name().as_ref() {
                b"item" | b"entry" => {
                    if let Some(done) = entry.take() {
                        entries.push(done.finish());
                    }
                    field = None;
                }
                _ => {
                    if let (Some(current), Some(done_field)) = (entry.as_mut(), field.take()) {
                        current.set(done_field, &text);
                    }
                    text.clear();
                }
            },
            Ok(_) => {}
        }
    }

    Ok(entries)
}

fn field_for(name: &[u8]) -> Option<Field> {
    match name {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"id" | b"guid" => Some(Field::Id),
        b"summary" | b"description" | b"abstract" => Some(Field::Summary),
        b"published" | b"pubDate" | b"date" => Some(Field::Published),
        b"updated" => Some(Field::Updated),
        // Atom nests <author><name>…</name></author>; RSS uses flat
        // <author> or <dc:creator>.
        b"author" | b"creator" | b"name" => Some(Field::Author),
        _ => None,
    }
}

fn attr_value(element: &BytesStart, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Example Journal</title>
    <link>https://journal.example.com</link>
    <item>
      <title>CRISPR screens &amp; cancer</title>
      <link>https://journal.example.com/articles/1</link>
      <guid>https://journal.example.com/articles/1</guid>
      <description><![CDATA[<p>A genome-wide screen.</p>]]></description>
      <dc:creator>R. Yamamoto</dc:creator>
      <pubDate>Tue, 06 May 2025 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Untitled follow-up</title>
      <link>https://journal.example.com/articles/2</link>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Preprints</title>
  <updated>2025-05-06T12:00:00Z</updated>
  <entry>
    <id>http://arxiv.org/abs/2401.01234v1</id>
    <title>Deep Learning for X</title>
    <summary>We propose a method.</summary>
    <published>2025-05-05T03:30:00Z</published>
    <link rel="alternate" type="text/html" href="https://arxiv.org/abs/2401.01234v1"/>
    <link rel="related" title="pdf" href="https://arxiv.org/pdf/2401.01234v1"/>
    <author><name>A. Smith</name></author>
    <author><name>B. Jones</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items() {
        let entries = parse_feed(RSS_SAMPLE).unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.title, "CRISPR screens & cancer");
        assert_eq!(first.link, "https://journal.example.com/articles/1");
        assert_eq!(first.id.as_deref(), Some("https://journal.example.com/articles/1"));
        assert_eq!(first.summary, "<p>A genome-wide screen.</p>");
        assert_eq!(first.authors, vec!["R. Yamamoto".to_string()]);
        assert_eq!(
            first.published.as_deref(),
            Some("Tue, 06 May 2025 10:00:00 GMT")
        );

        // Sparse items still come through with what they have.
        assert_eq!(entries[1].title, "Untitled follow-up");
        assert!(entries[1].published.is_none());
    }

    #[test]
    fn test_parse_atom_entries() {
        let entries = parse_feed(ATOM_SAMPLE).unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.title, "Deep Learning for X");
        // The alternate link wins over the pdf link.
        assert_eq!(entry.link, "https://arxiv.org/abs/2401.01234v1");
        assert_eq!(entry.id.as_deref(), Some("http://arxiv.org/abs/2401.01234v1"));
        assert_eq!(entry.authors, vec!["A. Smith".to_string(), "B. Jones".to_string()]);
        assert_eq!(entry.published.as_deref(), Some("2025-05-05T03:30:00Z"));
    }

    #[test]
    fn test_channel_metadata_is_not_an_entry() {
        let entries = parse_feed(RSS_SAMPLE).unwrap();
        assert!(entries.iter().all(|entry| entry.title != "Example Journal"));
    }

    #[test]
    fn test_atom_updated_backfills_published() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
          <entry>
            <title>No published element</title>
            <updated>2025-05-06T12:00:00Z</updated>
            <link href="https://example.com/1"/>
          </entry>
        </feed>"#;

        let entries = parse_feed(xml).unwrap();
        assert_eq!(entries[0].published.as_deref(), Some("2025-05-06T12:00:00Z"));
        assert_eq!(entries[0].link, "https://example.com/1");
    }

    fn news_adapter(endpoint: FeedEndpoint) -> FeedAdapter {
        FeedAdapter {
            name: "Google News".to_string(),
            endpoint,
            kind: ItemType::News,
            entry_limit: NEWS_ENTRY_LIMIT,
            client: Client::new(),
        }
    }

    #[test]
    fn test_search_template_resolution() {
        let adapter = news_adapter(FeedEndpoint::SearchTemplate(
            "https://news.google.com/rss/search?q={topic}".to_string(),
        ));
        let topics = vec!["gene therapy".to_string(), "mRNA".to_string()];

        assert_eq!(
            adapter.resolve_url(&topics),
            "https://news.google.com/rss/search?q=gene%20therapy%20OR%20mRNA"
        );
    }

    #[test]
    fn test_entry_to_item_falls_back_to_link_id() {
        let adapter = news_adapter(FeedEndpoint::Url("https://example.com/feed".to_string()));
        let entry = FeedEntry {
            id: None,
            title: "Headline".to_string(),
            link: "https://example.com/story".to_string(),
            summary: "<b>Short</b> summary".to_string(),
            authors: vec![],
            published: Some("Tue, 06 May 2025 10:00:00 GMT".to_string()),
        };

        let item = adapter.entry_to_item(entry, "https://example.com/feed");
        assert_eq!(item.id, "https://example.com/story");
        assert_eq!(item.abstract_text, "Short summary");
        assert_eq!(item.kind, ItemType::News);
        assert_eq!(item.source, "Google News");
    }

    #[test]
    fn test_relative_links_resolve_against_the_feed() {
        assert_eq!(
            absolute_link("/articles/1", "https://journal.example.com/feed.xml"),
            "https://journal.example.com/articles/1"
        );
        assert_eq!(
            absolute_link("https://elsewhere.example.com/a", "https://journal.example.com/feed.xml"),
            "https://elsewhere.example.com/a"
        );
        assert_eq!(absolute_link("", "https://journal.example.com/feed.xml"), "");
    }

    #[test]
    fn test_news_config_without_endpoints_is_skipped() {
        let config = NewsSourceConfig {
            name: "Broken".to_string(),
            rss: None,
            search_url: None,
        };
        assert!(FeedAdapter::news(Client::new(), &config).is_none());
    }
}
