use crate::clients::traits::{IndexerClient, IndexerTest, SearchKind};
use crate::models::release::{Protocol, Release};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct TorznabConfig {
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub protocol: Protocol,
    pub categories: Vec<i32>,
    pub supports_rss: bool,
    pub timeout: std::time::Duration,
}

/// Torznab/Newznab indexer client. One instance per configured indexer.
#[derive(Clone)]
pub struct TorznabClient {
    config: TorznabConfig,
    client: Client,
}

impl TorznabClient {
    #[must_use]
    pub fn new(config: TorznabConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("mediastack/0.1")
            .build()
            .expect("Failed to build HTTP client");

        Self { config, client }
    }

    fn api_url(&self, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)
            .with_context(|| format!("Invalid indexer URL: {}", self.config.base_url))?;

        // Torznab endpoints conventionally live under /api.
        if !url.path().ends_with("/api") {
            let path = format!("{}/api", url.path().trim_end_matches('/'));
            url.set_path(&path);
        }

        {
            let mut query = url.query_pairs_mut();
            for (k, v) in params {
                query.append_pair(k, v);
            }
            if let Some(key) = &self.config.api_key {
                query.append_pair("apikey", key);
            }
            if !self.config.categories.is_empty() {
                let cats = self
                    .config
                    .categories
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                query.append_pair("cat", &cats);
            }
        }

        Ok(url)
    }

    async fn fetch_feed(&self, params: &[(&str, &str)]) -> Result<Vec<Release>> {
        let url = self.api_url(params)?;
        debug!(indexer = %self.config.name, url = %url, "Querying indexer");

        let xml = self
            .client
            .get(url)
            .send()
            .await
            .context("Indexer request failed")?
            .error_for_status()
            .context("Indexer returned an error status")?
            .text()
            .await?;

        let feed: TorznabFeed =
            quick_xml::de::from_str(&xml).context("Failed to parse indexer response")?;

        Ok(feed
            .channel
            .map(|c| c.items)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| self.to_release(item))
            .collect())
    }

    fn to_release(&self, item: FeedItem) -> Option<Release> {
        let download_url = item
            .enclosure
            .as_ref()
            .map(|e| e.url.clone())
            .or(item.link.clone())?;

        let guid = item
            .guid
            .map(|g| g.value)
            .unwrap_or_else(|| download_url.clone());

        let attr = |name: &str| {
            item.attrs
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.clone())
        };

        let size = item
            .size
            .or_else(|| item.enclosure.as_ref().and_then(|e| e.length))
            .or_else(|| attr("size").and_then(|v| v.parse().ok()));

        Some(Release {
            title: html_escape::decode_html_entities(&item.title).to_string(),
            guid,
            download_url,
            size,
            seeders: attr("seeders").and_then(|v| v.parse().ok()),
            leechers: attr("leechers").and_then(|v| v.parse().ok()),
            indexer_id: self.config.id.clone(),
            indexer: self.config.name.clone(),
            protocol: self.config.protocol,
            publish_date: item.pub_date,
        })
    }
}

#[async_trait]
impl IndexerClient for TorznabClient {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn protocol(&self) -> Protocol {
        self.config.protocol
    }

    fn supports_rss(&self) -> bool {
        self.config.supports_rss
    }

    async fn search(&self, kind: SearchKind, query: &str) -> Vec<Release> {
        let t = match kind {
            SearchKind::Movie => "movie",
            SearchKind::Series => "tvsearch",
        };

        match self.fetch_feed(&[("t", t), ("q", query)]).await {
            Ok(releases) => releases,
            Err(e) => {
                warn!(indexer = %self.config.name, error = %e, "Indexer search failed");
                Vec::new()
            }
        }
    }

    async fn fetch_rss(&self) -> Vec<Release> {
        match self.fetch_feed(&[("t", "search"), ("limit", "100")]).await {
            Ok(releases) => releases,
            Err(e) => {
                warn!(indexer = %self.config.name, error = %e, "Indexer RSS fetch failed");
                Vec::new()
            }
        }
    }

    async fn test(&self) -> IndexerTest {
        let result: Result<Caps> = async {
            let url = self.api_url(&[("t", "caps")])?;
            let xml = self
                .client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            quick_xml::de::from_str(&xml).context("Failed to parse caps response")
        }
        .await;

        match result {
            Ok(caps) => IndexerTest {
                ok: true,
                version: caps.server.and_then(|s| s.version),
                message: None,
            },
            Err(e) => IndexerTest {
                ok: false,
                version: None,
                message: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct TorznabFeed {
    channel: Option<FeedChannel>,
}

#[derive(Debug, Deserialize)]
struct FeedChannel {
    #[serde(default, rename = "item")]
    items: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    title: String,
    guid: Option<Guid>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    size: Option<i64>,
    enclosure: Option<Enclosure>,
    #[serde(default, rename = "attr", alias = "torznab:attr", alias = "newznab:attr")]
    attrs: Vec<TorznabAttr>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: String,
    #[serde(rename = "@length")]
    length: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TorznabAttr {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@value")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Caps {
    server: Option<CapsServer>,
}

#[derive(Debug, Deserialize)]
struct CapsServer {
    #[serde(rename = "@version")]
    version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:torznab="http://torznab.com/schemas/2015/feed">
  <channel>
    <title>Indexer</title>
    <item>
      <title>Some.Movie.2023.1080p.BluRay.x264-GRP</title>
      <guid>https://indexer.example/details/123</guid>
      <link>https://indexer.example/download/123.torrent</link>
      <pubDate>Sat, 14 Jun 2025 08:00:00 +0000</pubDate>
      <enclosure url="https://indexer.example/download/123.torrent" length="4294967296" type="application/x-bittorrent"/>
      <torznab:attr name="seeders" value="42"/>
      <torznab:attr name="leechers" value="3"/>
    </item>
  </channel>
</rss>"#;

    fn client() -> TorznabClient {
        TorznabClient::new(TorznabConfig {
            id: "ix-1".to_string(),
            name: "Test Indexer".to_string(),
            base_url: "https://indexer.example".to_string(),
            api_key: Some("secret".to_string()),
            protocol: Protocol::Torrent,
            categories: vec![2000, 2040],
            supports_rss: true,
            timeout: std::time::Duration::from_secs(10),
        })
    }

    #[test]
    fn parses_feed_items() {
        let feed: TorznabFeed = quick_xml::de::from_str(SAMPLE).unwrap();
        let items = feed.channel.unwrap().items;
        assert_eq!(items.len(), 1);

        let release = client().to_release(items.into_iter().next().unwrap()).unwrap();
        assert_eq!(release.title, "Some.Movie.2023.1080p.BluRay.x264-GRP");
        assert_eq!(release.guid, "https://indexer.example/details/123");
        assert_eq!(release.size, Some(4_294_967_296));
        assert_eq!(release.seeders, Some(42));
        assert_eq!(release.protocol, Protocol::Torrent);
    }

    #[test]
    fn api_url_includes_key_and_categories() {
        let url = client().api_url(&[("t", "movie"), ("q", "dune")]).unwrap();
        let s = url.to_string();
        assert!(s.contains("/api?"));
        assert!(s.contains("t=movie"));
        assert!(s.contains("apikey=secret"));
        assert!(s.contains("cat=2000%2C2040"));
    }
}
