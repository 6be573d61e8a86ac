use std::time::Duration;

/// 读操作的缓存键：操作名加参数组成的有序元组
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKey {
    User(String),
    SearchUsers(String),
    /// 关注某用户的人
    Following(String),
    /// 某用户关注的人
    FollowingByFollower(String),
    CheckIns(String),
    PlacesNearby {
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
        included_types: Vec<String>,
        limit: usize,
    },
}

const USER_PREFIX: &str = "user";
const SEARCH_USERS_PREFIX: &str = "searchUsers";
const FOLLOWING_PREFIX: &str = "following";
const FOLLOWING_BY_FOLLOWER_PREFIX: &str = "followingByFollower";
const CHECKINS_PREFIX: &str = "checkins";
const PLACES_NEARBY_PREFIX: &str = "placesNearby";

const SHORT_FRESHNESS: Duration = Duration::from_secs(30);
const LONG_FRESHNESS: Duration = Duration::from_secs(60);

impl QueryKey {
    /// 键的各个组成部分，第一个是操作名
    pub fn segments(&self) -> Vec<String> {
        match self {
            QueryKey::User(id) => vec![USER_PREFIX.into(), id.clone()],
            QueryKey::SearchUsers(q) => vec![SEARCH_USERS_PREFIX.into(), q.clone()],
            QueryKey::Following(user_id) => vec![FOLLOWING_PREFIX.into(), user_id.clone()],
            QueryKey::FollowingByFollower(follower_id) => {
                vec![FOLLOWING_BY_FOLLOWER_PREFIX.into(), follower_id.clone()]
            }
            QueryKey::CheckIns(user_id) => vec![CHECKINS_PREFIX.into(), user_id.clone()],
            QueryKey::PlacesNearby {
                latitude,
                longitude,
                radius_meters,
                included_types,
                limit,
            } => vec![
                PLACES_NEARBY_PREFIX.into(),
                latitude.to_string(),
                longitude.to_string(),
                radius_meters.to_string(),
                included_types.join(","),
                limit.to_string(),
            ],
        }
    }

    /// 字符串形式的缓存键，各部分 JSON 编码后拼接，参数中含分隔符也不会冲突
    pub fn cache_key(&self) -> String {
        serde_json::to_string(&self.segments()).unwrap_or_else(|_| self.segments().join(":"))
    }

    /// 结果保持新鲜的时间
    pub fn freshness(&self) -> Duration {
        match self {
            QueryKey::SearchUsers(_) | QueryKey::CheckIns(_) => SHORT_FRESHNESS,
            QueryKey::User(_)
            | QueryKey::Following(_)
            | QueryKey::FollowingByFollower(_)
            | QueryKey::PlacesNearby { .. } => LONG_FRESHNESS,
        }
    }
}

/// 写操作，以及每个写操作成功后需要失效的缓存键
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateCheckIn { user_id: String },
    UpdateCheckIn { user_id: String },
    CreateFollow { user_id: String, follower_id: String },
}

impl Mutation {
    pub fn invalidates(&self) -> Vec<QueryKey> {
        match self {
            Mutation::CreateCheckIn { user_id } | Mutation::UpdateCheckIn { user_id } => {
                vec![QueryKey::CheckIns(user_id.clone())]
            }
            Mutation::CreateFollow {
                user_id,
                follower_id,
            } => vec![
                QueryKey::Following(user_id.clone()),
                QueryKey::FollowingByFollower(follower_id.clone()),
            ],
        }
    }
}
