/// CSS selectors locating listing fields on a results page.
///
/// Every field selector is evaluated relative to a `card` element.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    /// One element per listing
    pub card: String,
    pub title: String,
    /// Anchor whose `href` is the listing URL
    pub link: String,
    pub price: String,
    pub bedrooms: String,
    pub baths: String,
    pub location: String,
    pub description: Option<String>,
    /// One element per feature tag
    pub features: String,
    /// `img` elements; `src` or `data-src` is taken
    pub images: String,
    pub furnished: Option<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            card: "div.property-listing".to_string(),
            title: "h2.listings-property-title".to_string(),
            link: "a[href]".to_string(),
            price: "div.n50 h3 span:last-child".to_string(),
            bedrooms: "div.fur-areea span.beds".to_string(),
            baths: "div.fur-areea span.baths".to_string(),
            location: "h4".to_string(),
            description: Some("p.description".to_string()),
            features: "div.furnished-btn a".to_string(),
            images: "div.single-room-img img".to_string(),
            furnished: Some("div.furnished-btn a.furnished".to_string()),
        }
    }
}
