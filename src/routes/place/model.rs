use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::places::{DEFAULT_INCLUDED_TYPES, DEFAULT_LIMIT, NearbySearch};
use crate::utils::LatLng;

// 签到时的附近搜索参数：只看身边很近的餐厅和酒吧
const CHECK_IN_RADIUS_METERS: f64 = 75.0;
const CHECK_IN_TYPES: &[&str] = &["restaurant", "bar"];
const CHECK_IN_LIMIT: usize = 25;

#[derive(Debug, Clone, Deserialize)]
pub struct NearbyPlacesRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: Option<f64>,
    pub included_types: Option<Vec<String>>,
    pub limit: Option<usize>,
    /// 正在选中的地点，排在结果第一位
    pub selected_place_id: Option<String>,
    /// 为签到选择地点，未给出的参数使用签到默认值
    #[serde(default)]
    pub for_check_in: bool,
}

impl NearbyPlacesRequest {
    /// 填入默认值并校验，半径超过 `max_radius` 时截断
    pub fn to_search(&self, max_radius: f64) -> AppResult<NearbySearch> {
        let center = LatLng::new(self.latitude, self.longitude);
        if !center.is_valid() {
            return Err(AppError::Validation(format!(
                "invalid center coordinate ({}, {})",
                self.latitude, self.longitude
            )));
        }

        let (default_radius, default_types, default_limit) = if self.for_check_in {
            (Some(CHECK_IN_RADIUS_METERS), CHECK_IN_TYPES, CHECK_IN_LIMIT)
        } else {
            (None, DEFAULT_INCLUDED_TYPES, DEFAULT_LIMIT)
        };

        let radius = self
            .radius_meters
            .or(default_radius)
            .ok_or_else(|| AppError::Validation("radius_meters is required".to_string()))?;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(AppError::Validation(format!(
                "radius_meters must be positive, got {}",
                radius
            )));
        }
        let radius = if radius > max_radius {
            tracing::warn!("Search radius {} clamped to {}", radius, max_radius);
            max_radius
        } else {
            radius
        };

        let types: Vec<String> = match &self.included_types {
            Some(types) if !types.is_empty() => types.clone(),
            _ => default_types.iter().map(|t| t.to_string()).collect(),
        };

        Ok(NearbySearch::new(center, radius)
            .with_types(types)
            .with_limit(self.limit.unwrap_or(default_limit)))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn request(for_check_in: bool) -> NearbyPlacesRequest {
        NearbyPlacesRequest {
            latitude: 40.0,
            longitude: -74.0,
            radius_meters: None,
            included_types: None,
            limit: None,
            selected_place_id: None,
            for_check_in,
        }
    }

    #[test]
    fn check_in_defaults() {
        let search = request(true).to_search(5000.0).unwrap();
        assert_eq!(search.radius_meters, 75.0);
        assert_eq!(search.included_types, vec!["restaurant", "bar"]);
        assert_eq!(search.limit, 25);
        assert_eq!(search.max_result_count(), 20);
    }

    #[test]
    fn plain_search_needs_a_radius() {
        let err = request(false).to_search(5000.0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut req = request(false);
        req.radius_meters = Some(300.0);
        let search = req.to_search(5000.0).unwrap();
        assert_eq!(search.included_types, vec!["restaurant"]);
        assert_eq!(search.limit, 10);
    }

    #[rstest]
    #[case(12_000.0, 5000.0)]
    #[case(800.0, 800.0)]
    fn radius_is_capped(#[case] requested: f64, #[case] expected: f64) {
        let mut req = request(false);
        req.radius_meters = Some(requested);
        assert_eq!(req.to_search(5000.0).unwrap().radius_meters, expected);
    }

    #[rstest]
    #[case(91.0, 0.0, Some(100.0))]
    #[case(0.0, 181.0, Some(100.0))]
    #[case(0.0, 0.0, Some(0.0))]
    #[case(0.0, 0.0, Some(-5.0))]
    fn invalid_input_is_rejected(
        #[case] latitude: f64,
        #[case] longitude: f64,
        #[case] radius: Option<f64>,
    ) {
        let mut req = request(false);
        req.latitude = latitude;
        req.longitude = longitude;
        req.radius_meters = radius;
        assert!(matches!(req.to_search(5000.0), Err(AppError::Validation(_))));
    }
}
