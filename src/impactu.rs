use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};

use crate::config::ApiSettings;
use crate::domain::ProductsPage;
use crate::error::HarvestError;

pub trait ProductsClient {
    fn fetch_page(&self, page: u32, max: u32) -> Result<ProductsPage, HarvestError>;
}

impl<C: ProductsClient + ?Sized> ProductsClient for &C {
    fn fetch_page(&self, page: u32, max: u32) -> Result<ProductsPage, HarvestError> {
        (**self).fetch_page(page, max)
    }
}

/// Client for the ImpactU `affiliation` products listing.
#[derive(Clone)]
pub struct ImpactuHttpClient {
    client: Client,
    base_url: String,
    section: String,
    tab: String,
}

impl ImpactuHttpClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("impactu-harvest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HarvestError::ApiHttp(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| HarvestError::ApiHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            section: settings.section.clone(),
            tab: settings.tab.clone(),
        })
    }

    pub fn listing_url(&self) -> String {
        format!("{}/affiliation", self.base_url)
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, HarvestError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "ImpactU request failed".to_string());
        Err(HarvestError::ApiStatus { status, message })
    }
}

impl ProductsClient for ImpactuHttpClient {
    fn fetch_page(&self, page: u32, max: u32) -> Result<ProductsPage, HarvestError> {
        let page_param = page.to_string();
        let max_param = max.to_string();
        let response = self
            .client
            .get(self.listing_url())
            .query(&[
                ("section", self.section.as_str()),
                ("tab", self.tab.as_str()),
                ("page", page_param.as_str()),
                ("max", max_param.as_str()),
            ])
            .send()
            .map_err(|err| HarvestError::ApiHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| HarvestError::ApiHttp(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| HarvestError::ApiDecode {
            page,
            message: err.to_string(),
        })
    }
}
