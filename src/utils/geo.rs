use serde::{Deserialize, Serialize};

use crate::places::Place;

/// 地球半径（米）
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn distance_to(&self, other: &LatLng) -> f64 {
        calculate_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

/// Haversine 球面距离，单位米
pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// 按到中心点的距离升序排列地点。
///
/// 没有坐标的地点视为无穷远，排在最后，彼此保持原有顺序（稳定排序）。
/// 如果 `selected_id` 对应的地点在列表中，它会被移到最前面，其余地点保持距离顺序。
pub fn rank_by_distance(center: LatLng, places: Vec<Place>, selected_id: Option<&str>) -> Vec<Place> {
    let mut keyed: Vec<(f64, Place)> = places
        .into_iter()
        .map(|place| {
            let distance = place
                .location
                .map(|loc| center.distance_to(&loc))
                .unwrap_or(f64::INFINITY);
            (distance, place)
        })
        .collect();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut ranked: Vec<Place> = keyed.into_iter().map(|(_, place)| place).collect();

    if let Some(id) = selected_id {
        if let Some(pos) = ranked.iter().position(|p| p.id == id) {
            let pinned = ranked.remove(pos);
            ranked.insert(0, pinned);
        }
    }

    ranked
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn place(id: &str, location: Option<(f64, f64)>) -> Place {
        Place {
            id: id.to_string(),
            display_name: id.to_string(),
            location: location.map(|(lat, lng)| LatLng::new(lat, lng)),
            address: None,
        }
    }

    fn ids(places: &[Place]) -> Vec<&str> {
        places.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = calculate_distance(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_195.0).abs() < 1.0, "got {d}");
    }

    #[rstest]
    #[case((0.0, 0.0), (0.0, 0.0), 0.0)]
    #[case((0.0, 0.0), (1.0, 0.0), 111_195.0)]
    #[case((90.0, 0.0), (-90.0, 0.0), 20_015_087.0)]
    fn known_distances(#[case] a: (f64, f64), #[case] b: (f64, f64), #[case] expected: f64) {
        let d = calculate_distance(a.0, a.1, b.0, b.1);
        assert!((d - expected).abs() < 1.0, "got {d}, expected {expected}");
    }

    #[test]
    fn nearer_place_comes_first() {
        let places = vec![place("far", Some((0.0, 1.0))), place("here", Some((0.0, 0.0)))];
        let ranked = rank_by_distance(LatLng::new(0.0, 0.0), places, None);
        assert_eq!(ids(&ranked), vec!["here", "far"]);
    }

    #[test]
    fn places_without_location_sort_last_in_original_order() {
        let places = vec![
            place("unknown-a", None),
            place("b", Some((0.02, 0.0))),
            place("unknown-b", None),
            place("a", Some((0.01, 0.0))),
            place("unknown-c", None),
        ];
        let ranked = rank_by_distance(LatLng::new(0.0, 0.0), places, None);
        assert_eq!(
            ids(&ranked),
            vec!["a", "b", "unknown-a", "unknown-b", "unknown-c"]
        );
    }

    #[test]
    fn equal_distances_keep_input_order() {
        let places = vec![
            place("north", Some((0.01, 0.0))),
            place("south", Some((-0.01, 0.0))),
        ];
        let ranked = rank_by_distance(LatLng::new(0.0, 0.0), places, None);
        assert_eq!(ids(&ranked), vec!["north", "south"]);
    }

    #[test]
    fn selected_place_is_pinned_first() {
        let places = vec![
            place("near", Some((0.001, 0.0))),
            place("mid", Some((0.01, 0.0))),
            place("far", Some((0.1, 0.0))),
            place("nowhere", None),
        ];
        let ranked = rank_by_distance(LatLng::new(0.0, 0.0), places.clone(), Some("far"));
        assert_eq!(ids(&ranked), vec!["far", "near", "mid", "nowhere"]);

        let ranked = rank_by_distance(LatLng::new(0.0, 0.0), places, Some("nowhere"));
        assert_eq!(ids(&ranked), vec!["nowhere", "near", "mid", "far"]);
    }

    #[test]
    fn unknown_selected_id_changes_nothing() {
        let places = vec![place("b", Some((0.5, 0.0))), place("a", Some((0.1, 0.0)))];
        let ranked = rank_by_distance(LatLng::new(0.0, 0.0), places, Some("missing"));
        assert_eq!(ids(&ranked), vec!["a", "b"]);
    }

    #[test]
    fn ranking_is_non_decreasing_in_distance() {
        let center = LatLng::new(47.6, -122.3);
        // 简单线性同余生成器，结果可复现
        let mut seed: u64 = 42;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as f64) / f64::from(u32::MAX >> 1)
        };
        let places: Vec<Place> = (0..200)
            .map(|i| {
                let location = if i % 7 == 0 {
                    None
                } else {
                    Some((47.0 + next(), -123.0 + next() * 1.5))
                };
                place(&format!("p{i}"), location)
            })
            .collect();

        let ranked = rank_by_distance(center, places, None);
        assert_eq!(ranked.len(), 200);

        let distances: Vec<f64> = ranked
            .iter()
            .map(|p| {
                p.location
                    .map(|loc| center.distance_to(&loc))
                    .unwrap_or(f64::INFINITY)
            })
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));

        let first_missing = ranked.iter().position(|p| p.location.is_none()).unwrap();
        assert!(ranked[first_missing..].iter().all(|p| p.location.is_none()));
    }

    #[rstest]
    #[case(0.0, 0.0, true)]
    #[case(90.0, 180.0, true)]
    #[case(90.1, 0.0, false)]
    #[case(0.0, -180.5, false)]
    #[case(f64::NAN, 0.0, false)]
    fn coordinate_validation(#[case] lat: f64, #[case] lng: f64, #[case] valid: bool) {
        assert_eq!(LatLng::new(lat, lng).is_valid(), valid);
    }
}
