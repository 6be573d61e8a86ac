// 附近地点搜索
// 把搜索参数转换为一次外部接口调用，再把响应映射为内部的地点结构

mod model;

use reqwest::Client;
use serde_json::json;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::utils::with_api_logging;

pub use model::{DEFAULT_INCLUDED_TYPES, DEFAULT_LIMIT, MAX_RESULT_COUNT, NearbySearch, Place};
use model::{SearchNearbyRequest, SearchNearbyResponse};

/// 响应字段掩码：只返回名称、坐标和地址，调用方不能依赖其它字段
pub const FIELD_MASK: &str =
    "places.displayName,places.location,places.formattedAddress,places.shortFormattedAddress";

const API_KEY_HEADER: &str = "X-Goog-Api-Key";
const FIELD_MASK_HEADER: &str = "X-Goog-FieldMask";

#[derive(Clone)]
pub struct PlacesClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl PlacesClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.places_endpoint.clone(), config.places_api_key.clone())
    }

    pub async fn search_nearby(&self, search: &NearbySearch) -> AppResult<Vec<Place>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::Config(
                "Missing Google Places API key (GOOGLE_PLACES_API_KEY)".to_string(),
            )
        })?;
        if !search.center.is_valid() {
            return Err(AppError::Validation(format!(
                "invalid center coordinate ({}, {})",
                search.center.latitude, search.center.longitude
            )));
        }

        let body = SearchNearbyRequest::from(search);
        let details = json!({
            "center": search.center,
            "radius_meters": search.radius_meters,
            "included_types": search.included_types,
            "limit": search.limit,
        });

        let response = with_api_logging("places.searchNearby", details, async {
            let response = self
                .client
                .post(&self.endpoint)
                .header(API_KEY_HEADER, api_key)
                .header(FIELD_MASK_HEADER, FIELD_MASK)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(AppError::Upstream {
                    status: status.as_u16(),
                    body: text,
                });
            }
            Ok(response.json::<SearchNearbyResponse>().await?)
        })
        .await?;

        Ok(response
            .places
            .into_iter()
            .take(search.limit)
            .map(Place::from)
            .collect())
    }
}
