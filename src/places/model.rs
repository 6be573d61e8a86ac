use serde::{Deserialize, Serialize};

use crate::utils::LatLng;

/// 附近地点，只在搜索时临时获取，不做持久化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub display_name: String,
    pub location: Option<LatLng>,
    pub address: Option<String>,
}

/// 附近搜索参数
#[derive(Debug, Clone, PartialEq)]
pub struct NearbySearch {
    pub center: LatLng,
    pub radius_meters: f64,
    pub included_types: Vec<String>,
    pub limit: usize,
}

pub const DEFAULT_INCLUDED_TYPES: &[&str] = &["restaurant"];
pub const DEFAULT_LIMIT: usize = 10;

/// 接口单次返回的结果数上限
pub const MAX_RESULT_COUNT: usize = 20;

impl NearbySearch {
    pub fn new(center: LatLng, radius_meters: f64) -> Self {
        Self {
            center,
            radius_meters,
            included_types: DEFAULT_INCLUDED_TYPES.iter().map(|t| t.to_string()).collect(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.included_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// 发送给接口的结果数，限制在 [1, 20]
    pub fn max_result_count(&self) -> usize {
        self.limit.clamp(1, MAX_RESULT_COUNT)
    }
}

// ---- 接口请求/响应结构 ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchNearbyRequest {
    pub included_types: Vec<String>,
    pub max_result_count: usize,
    pub location_restriction: LocationRestriction,
}

#[derive(Debug, Serialize)]
pub(crate) struct LocationRestriction {
    pub circle: Circle,
}

#[derive(Debug, Serialize)]
pub(crate) struct Circle {
    pub center: LatLng,
    pub radius: f64,
}

impl From<&NearbySearch> for SearchNearbyRequest {
    fn from(search: &NearbySearch) -> Self {
        Self {
            included_types: search.included_types.clone(),
            max_result_count: search.max_result_count(),
            location_restriction: LocationRestriction {
                circle: Circle {
                    center: search.center,
                    radius: search.radius_meters,
                },
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchNearbyResponse {
    #[serde(default)]
    pub places: Vec<PlaceRecord>,
}

/// 接口返回的单条地点；所有字段都可能缺失或格式不对
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaceRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_display_name")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_location")]
    pub location: Option<LatLng>,
    pub formatted_address: Option<String>,
    pub short_formatted_address: Option<String>,
}

/// 取 `displayName.text`，结构不对时当作缺失
fn lenient_display_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.get("text")?.as_str().map(str::to_string)))
}

/// 坐标格式不对时当作缺失，不让整个响应失败
fn lenient_location<'de, D>(deserializer: D) -> Result<Option<LatLng>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        let latitude = v.get("latitude")?.as_f64()?;
        let longitude = v.get("longitude")?.as_f64()?;
        Some(LatLng::new(latitude, longitude))
    }))
}

pub(crate) const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

impl From<PlaceRecord> for Place {
    fn from(record: PlaceRecord) -> Self {
        Self {
            id: record
                .id
                .or(record.name)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            display_name: record
                .display_name
                .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string()),
            location: record.location,
            address: record.short_formatted_address.or(record.formatted_address),
        }
    }
}
