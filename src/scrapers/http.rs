use crate::config::SourceConfig;
use crate::models::{fields, RawListing};
use crate::scrapers::traits::ListingSource;
use crate::scrapers::types::ListingSelectors;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

/// Listing source that pages through an HTML search results listing
pub struct HttpListingSource {
    client: Client,
    base_url: Url,
    page_param: String,
    selectors: CompiledSelectors,
}

struct CompiledSelectors {
    card: Selector,
    title: Selector,
    link: Selector,
    price: Selector,
    bedrooms: Selector,
    baths: Selector,
    location: Selector,
    description: Option<Selector>,
    features: Selector,
    images: Selector,
    furnished: Option<Selector>,
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("Invalid CSS selector '{}': {:?}", selector, e))
}

impl CompiledSelectors {
    fn new(s: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            card: compile(&s.card)?,
            title: compile(&s.title)?,
            link: compile(&s.link)?,
            price: compile(&s.price)?,
            bedrooms: compile(&s.bedrooms)?,
            baths: compile(&s.baths)?,
            location: compile(&s.location)?,
            description: s.description.as_deref().map(compile).transpose()?,
            features: compile(&s.features)?,
            images: compile(&s.images)?,
            furnished: s.furnished.as_deref().map(compile).transpose()?,
        })
    }
}

impl HttpListingSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid source URL: {}", config.base_url))?;

        let selectors = CompiledSelectors::new(&config.selectors)?;

        Ok(Self {
            client,
            base_url,
            page_param: config.page_param.clone(),
            selectors,
        })
    }

    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair(&self.page_param, &page.to_string());
        url
    }

    /// Extract raw listings from a results page
    fn parse_listings(&self, html: &str, page_url: &Url) -> Vec<RawListing> {
        let sel = &self.selectors;
        let document = Html::parse_document(html);

        let mut listings = Vec::new();
        for (idx, card) in document.select(&sel.card).enumerate() {
            let href = card
                .select(&sel.link)
                .next()
                .and_then(|a| a.value().attr("href"));
            let url = href
                .and_then(|href| page_url.join(href).ok())
                .map(|u| u.to_string())
                .unwrap_or_default();

            let location = first_text(card, &sel.location);
            let (city, state) = split_location(location.as_deref().unwrap_or_default());

            let features: Vec<String> = card
                .select(&sel.features)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect();
            let images: Vec<String> = card
                .select(&sel.images)
                .filter_map(|img| {
                    img.value()
                        .attr("data-src")
                        .or_else(|| img.value().attr("src"))
                })
                .filter_map(|src| page_url.join(src).ok())
                .map(|u| u.to_string())
                .collect();

            let mut raw = RawListing::new()
                .with(fields::NAME, first_text(card, &sel.title))
                .with(fields::URL, url)
                .with(fields::PRICE, first_text(card, &sel.price))
                .with(fields::BEDROOMS, first_text(card, &sel.bedrooms))
                .with(fields::BATHS, first_text(card, &sel.baths))
                .with(fields::LOCATION, location)
                .with(fields::CITY, city)
                .with(fields::STATE, state)
                .with(fields::FEATURES, json!(features).to_string())
                .with(fields::IMAGES, json!(images).to_string());
            if let Some(description) = &sel.description {
                raw.insert(fields::DESCRIPTION, first_text(card, description));
            }
            if let Some(furnished) = &sel.furnished {
                raw.insert(fields::FURNISHED, first_text(card, furnished));
            }

            debug!(card = idx, url = raw.text(fields::URL).unwrap_or("-"), "Parsed listing card");
            listings.push(raw);
        }

        listings
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// "Lekki Phase 1, Lekki, Lagos" -> (Some("Lekki"), Some("Lagos"))
pub fn split_location(location: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = location
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    match parts.as_slice() {
        [] => (None, None),
        [only] => (None, Some(only.to_string())),
        [.., city, state] => (Some(city.to_string()), Some(state.to_string())),
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_page(&self, page: u32) -> Result<Vec<RawListing>> {
        let url = self.page_url(page);
        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch results page {}", page))?;

        if !response.status().is_success() {
            warn!(page, status = %response.status(), "Listing source returned an error status");
            anyhow::bail!("Failed to fetch results page {}: {}", page, response.status());
        }

        let html = response
            .text()
            .await
            .context("Failed to read response body")?;
        debug!(page, bytes = html.len(), "Downloaded results page");

        let listings = self.parse_listings(&html, &url);
        info!(page, listings = listings.len(), "Parsed results page");
        Ok(listings)
    }

    fn source_name(&self) -> &str {
        self.base_url.host_str().unwrap_or("http")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="property-listing">
            <div class="single-room-img"><img data-src="/img/1.jpg"></div>
            <a href="/property/3-bedroom-flat-lekki-1"><h2 class="listings-property-title">3 Bedroom Flat</h2></a>
            <h4>Lekki Phase 1, Lekki, Lagos</h4>
            <div class="n50"><h3><span>&#8358;</span><span>2,500,000</span></h3></div>
            <div class="fur-areea"><span class="beds">3 beds</span><span class="baths">2 baths</span></div>
            <div class="furnished-btn"><a class="furnished">Fully Furnished</a><a>Serviced</a></div>
          </div>
          <div class="property-listing">
            <a href="https://www.propertypro.ng/property/land-ajah-2"><h2 class="listings-property-title">Plot of land</h2></a>
            <h4>Ajah</h4>
          </div>
        </body></html>
    "#;

    fn source() -> HttpListingSource {
        HttpListingSource::new(&SourceConfig::default()).unwrap()
    }

    #[test]
    fn test_page_url_appends_page_param() {
        let url = source().page_url(3);
        assert_eq!(url.as_str(), "https://www.propertypro.ng/property-for-rent?page=3");
    }

    #[test]
    fn test_parse_listings_extracts_fields() {
        let source = source();
        let page_url = source.page_url(1);
        let listings = source.parse_listings(PAGE, &page_url);
        assert_eq!(listings.len(), 2);

        let first = &listings[0];
        assert_eq!(first.text(fields::NAME), Some("3 Bedroom Flat"));
        assert_eq!(
            first.text(fields::URL),
            Some("https://www.propertypro.ng/property/3-bedroom-flat-lekki-1")
        );
        assert_eq!(first.text(fields::PRICE), Some("2,500,000"));
        assert_eq!(first.text(fields::BEDROOMS), Some("3 beds"));
        assert_eq!(first.text(fields::CITY), Some("Lekki"));
        assert_eq!(first.text(fields::STATE), Some("Lagos"));
        assert_eq!(first.text(fields::FURNISHED), Some("Fully Furnished"));
        assert_eq!(
            first.text(fields::IMAGES),
            Some(r#"["https://www.propertypro.ng/img/1.jpg"]"#)
        );

        let second = &listings[1];
        assert!(second.get(fields::PRICE).is_none());
        assert_eq!(second.text(fields::STATE), Some("Ajah"));
    }

    #[test]
    fn test_empty_page_yields_no_listings() {
        let source = source();
        let page_url = source.page_url(99);
        assert!(source
            .parse_listings("<html><body></body></html>", &page_url)
            .is_empty());
    }

    #[test]
    fn test_invalid_selector_is_rejected_up_front() {
        let mut config = SourceConfig::default();
        config.selectors.card = "div[".to_string();
        let err = HttpListingSource::new(&config).err().unwrap();
        assert!(err.to_string().contains("Invalid CSS selector"));
    }

    #[test]
    fn test_split_location() {
        assert_eq!(split_location(""), (None, None));
        assert_eq!(split_location("Abuja"), (None, Some("Abuja".to_string())));
        assert_eq!(
            split_location("Wuse 2, Abuja, FCT"),
            (Some("Abuja".to_string()), Some("FCT".to_string()))
        );
    }
}
