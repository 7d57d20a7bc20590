//! Site scraping
//!
//! Pages are fetched over plain HTTP and parsed with CSS selectors taken from
//! the site configuration. Parsing is synchronous: `scraper::Html` is not
//! `Send`, so it never lives across an await.

use crate::errors::{IngestionError, Result};
use chrono::Utc;
use newsrag_common::config::{SiteConfig, SiteSelectors};
use newsrag_common::Category;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// One article lifted from a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub headline: String,
    pub description: String,
    pub url: String,
    pub image: String,
    /// Page the article was found on
    pub source: String,
    pub scraped_at: String,
    pub categories: Category,
}

impl Article {
    /// Text that is categorized, embedded and stored as the document
    pub fn text(&self) -> String {
        format!("{} {}", self.headline, self.description)
    }
}

/// Compiled selectors for one site
struct CompiledSelectors {
    container: Selector,
    headline: Selector,
    description: Selector,
    link: Selector,
    image: Selector,
}

impl CompiledSelectors {
    fn compile(selectors: &SiteSelectors) -> Result<Self> {
        Ok(Self {
            container: parse_selector(&selectors.container)?,
            headline: parse_selector(&selectors.headline)?,
            description: parse_selector(&selectors.description)?,
            link: parse_selector(&selectors.link)?,
            image: parse_selector(&selectors.image)?,
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| IngestionError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

#[derive(Clone)]
pub struct SiteScraper {
    http: Client,
}

impl SiteScraper {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| IngestionError::Fetch {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { http })
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| IngestionError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestionError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| IngestionError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetch a site's page and extract up to `limit` articles
    #[instrument(skip(self, site), fields(site = %site.name))]
    pub async fn scrape(&self, site: &SiteConfig, limit: usize) -> Result<Vec<Article>> {
        let page_url = Url::parse(&site.url)?;
        info!(url = %page_url, "Scraping");

        let html = self.fetch(&page_url).await?;
        let scraped_at = Utc::now().to_rfc3339();
        let articles = extract_articles(&html, &page_url, &site.selectors, limit, &scraped_at)?;

        if articles.is_empty() {
            warn!(url = %page_url, "No valid articles found");
        }
        Ok(articles)
    }
}

/// Extract articles from a page. Containers without a headline or link are
/// skipped.
pub fn extract_articles(
    html: &str,
    page_url: &Url,
    selectors: &SiteSelectors,
    limit: usize,
    scraped_at: &str,
) -> Result<Vec<Article>> {
    let compiled = CompiledSelectors::compile(selectors)?;
    let document = Html::parse_document(html);

    let containers: Vec<ElementRef> = document.select(&compiled.container).take(limit).collect();
    debug!(count = containers.len(), url = %page_url, "Found containers");

    let articles = containers
        .into_iter()
        .filter_map(|container| {
            let article = extract_one(container, &compiled, page_url, scraped_at);
            if article.is_none() {
                debug!("Skipping container without headline or link");
            }
            article
        })
        .collect();

    Ok(articles)
}

fn extract_one(
    container: ElementRef,
    selectors: &CompiledSelectors,
    page_url: &Url,
    scraped_at: &str,
) -> Option<Article> {
    let headline = first_text(container, &selectors.headline)?;

    let link = container
        .select(&selectors.link)
        .next()
        .and_then(|a| a.value().attr("href"))
        .filter(|href| !href.trim().is_empty())
        .and_then(|href| page_url.join(href.trim()).ok())?;

    let description = first_text(container, &selectors.description).unwrap_or_default();

    let image = container
        .select(&selectors.image)
        .next()
        .and_then(|img| {
            let value = img.value();
            value
                .attr("src")
                .filter(|src| !src.trim().is_empty())
                .or_else(|| value.attr("data-src"))
        })
        .filter(|src| !src.trim().is_empty())
        .and_then(|src| page_url.join(src.trim()).ok())
        .map(|u| u.to_string())
        .unwrap_or_default();

    Some(Article {
        headline,
        description,
        url: link.to_string(),
        image,
        source: page_url.to_string(),
        scraped_at: scraped_at.to_string(),
        categories: Category::General,
    })
}

/// Whitespace-normalized text of the first match, `None` when absent or blank
fn first_text(container: ElementRef, selector: &Selector) -> Option<String> {
    let element = container.select(selector).next()?;
    let text = element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="card">
            <h3 class="title">  Cup final  <span>tonight</span></h3>
            <p class="summary">Home side favourites</p>
            <a class="link" href="/sport/cup-final">Read</a>
            <img class="pic" src="/img/cup.jpg">
          </div>
          <div class="card">
            <h3 class="title">No link here</h3>
            <p class="summary">Dropped</p>
          </div>
          <div class="card">
            <h3 class="title"></h3>
            <a class="link" href="/news/blank">Read</a>
          </div>
          <div class="card">
            <h3 class="title">Election night</h3>
            <a class="link" href="https://example.org/politics/election">Read</a>
            <img class="pic" data-src="//cdn.example.com/vote.png">
          </div>
          <div class="card">
            <h3 class="title">Fourth</h3>
            <a class="link" href="/fourth">Read</a>
          </div>
        </body></html>
    "#;

    fn selectors() -> SiteSelectors {
        SiteSelectors {
            container: ".card".into(),
            headline: ".title".into(),
            description: ".summary".into(),
            link: ".link".into(),
            image: ".pic".into(),
        }
    }

    fn page_url() -> Url {
        Url::parse("https://www.example.com/live").unwrap()
    }

    #[test]
    fn test_extracts_valid_containers() {
        let articles =
            extract_articles(PAGE, &page_url(), &selectors(), 4, "2026-10-16T08:00:00Z").unwrap();

        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.headline, "Cup final tonight");
        assert_eq!(first.description, "Home side favourites");
        assert_eq!(first.url, "https://www.example.com/sport/cup-final");
        assert_eq!(first.image, "https://www.example.com/img/cup.jpg");
        assert_eq!(first.source, "https://www.example.com/live");
        assert_eq!(first.scraped_at, "2026-10-16T08:00:00Z");
        assert_eq!(first.categories, Category::General);

        let second = &articles[1];
        assert_eq!(second.headline, "Election night");
        assert_eq!(second.description, "");
        assert_eq!(second.url, "https://example.org/politics/election");
        assert_eq!(second.image, "https://cdn.example.com/vote.png");
    }

    #[test]
    fn test_limit_applies_to_containers() {
        let articles = extract_articles(PAGE, &page_url(), &selectors(), 1, "now").unwrap();
        assert_eq!(articles.len(), 1);

        let all = extract_articles(PAGE, &page_url(), &selectors(), 12, "now").unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].headline, "Fourth");
    }

    #[test]
    fn test_invalid_selector() {
        let mut bad = selectors();
        bad.container = "div[".into();
        let err = extract_articles(PAGE, &page_url(), &bad, 4, "now").unwrap_err();
        assert!(matches!(err, IngestionError::InvalidSelector { .. }));
    }

    #[test]
    fn test_article_text() {
        let articles = extract_articles(PAGE, &page_url(), &selectors(), 1, "now").unwrap();
        assert_eq!(articles[0].text(), "Cup final tonight Home side favourites");
    }
}
