// 查询层
// 每个读操作经过请求缓存，键为操作名加参数；每个写操作成功后失效受影响的缓存键。
// 存储客户端在缓存未命中、真正需要访问存储时才取出。

use std::collections::HashSet;

use futures_util::future::try_join_all;

use crate::AppState;
use crate::cache::{Mutation, QueryKey};
use crate::error::AppResult;
use crate::places::{NearbySearch, Place};
use crate::routes::checkin::{CheckIn, CreateCheckInRequest, UpdateCheckInRequest};
use crate::routes::follow::Following;
use crate::routes::user::User;
use crate::utils::rank_by_distance;

/// 少于这个长度的搜索词不发起查询
pub const MIN_SEARCH_LENGTH: usize = 2;

pub const DEFAULT_FEED_LIMIT: usize = 50;

pub async fn get_user(state: &AppState, id: &str) -> AppResult<Option<User>> {
    if id.is_empty() {
        return Ok(None);
    }
    state
        .cache
        .fetch(&QueryKey::User(id.to_string()), || async {
            let store = state.store.get().await?;
            User::find_by_id(store.as_ref(), &state.config.tables.users, id).await
        })
        .await
}

pub async fn search_users(state: &AppState, query: &str) -> AppResult<Vec<User>> {
    let query = query.trim();
    if query.chars().count() < MIN_SEARCH_LENGTH {
        return Ok(Vec::new());
    }
    state
        .cache
        .fetch(&QueryKey::SearchUsers(query.to_string()), || async {
            let store = state.store.get().await?;
            User::search_by_text(store.as_ref(), &state.config.tables.users, query).await
        })
        .await
}

/// 只在 `follower_id` 关注的人中搜索
pub async fn search_friends(
    state: &AppState,
    query: &str,
    follower_id: &str,
) -> AppResult<Vec<User>> {
    let users = search_users(state, query).await?;
    if users.is_empty() {
        return Ok(users);
    }

    let followed: HashSet<String> = get_following(state, follower_id)
        .await?
        .into_iter()
        .map(|edge| edge.user_id)
        .collect();
    Ok(users
        .into_iter()
        .filter(|user| followed.contains(&user.id))
        .collect())
}

/// 关注 `user_id` 的人
pub async fn get_followers(state: &AppState, user_id: &str) -> AppResult<Vec<Following>> {
    if user_id.is_empty() {
        return Ok(Vec::new());
    }
    state
        .cache
        .fetch(&QueryKey::Following(user_id.to_string()), || async {
            let store = state.store.get().await?;
            Following::find_followers(store.as_ref(), &state.config.tables.following, user_id)
                .await
        })
        .await
}

/// `follower_id` 关注的人
pub async fn get_following(state: &AppState, follower_id: &str) -> AppResult<Vec<Following>> {
    if follower_id.is_empty() {
        return Ok(Vec::new());
    }
    state
        .cache
        .fetch(
            &QueryKey::FollowingByFollower(follower_id.to_string()),
            || async {
                let store = state.store.get().await?;
                Following::find_following(
                    store.as_ref(),
                    &state.config.tables.following,
                    follower_id,
                )
                .await
            },
        )
        .await
}

pub async fn get_check_ins(state: &AppState, user_id: &str) -> AppResult<Vec<CheckIn>> {
    if user_id.is_empty() {
        return Ok(Vec::new());
    }
    state
        .cache
        .fetch(&QueryKey::CheckIns(user_id.to_string()), || async {
            let store = state.store.get().await?;
            CheckIn::find_by_user(store.as_ref(), &state.config.tables.check_ins, user_id).await
        })
        .await
}

/// `user_id` 关注的所有人的签到，按时间从新到旧合并
pub async fn feed(state: &AppState, user_id: &str, limit: Option<usize>) -> AppResult<Vec<CheckIn>> {
    let following = get_following(state, user_id).await?;
    let lists = try_join_all(
        following
            .iter()
            .map(|edge| get_check_ins(state, &edge.user_id)),
    )
    .await?;

    let mut check_ins: Vec<CheckIn> = lists.into_iter().flatten().collect();
    check_ins.sort_by(|a, b| b.time.cmp(&a.time));
    check_ins.truncate(limit.unwrap_or(DEFAULT_FEED_LIMIT));
    Ok(check_ins)
}

pub async fn create_check_in(state: &AppState, req: CreateCheckInRequest) -> AppResult<CheckIn> {
    let store = state.store.get().await?;
    let check_in = CheckIn::create(store.as_ref(), &state.config.tables.check_ins, req).await?;

    state
        .cache
        .invalidate_for(&Mutation::CreateCheckIn {
            user_id: check_in.user_id.clone(),
        })
        .await;
    Ok(check_in)
}

/// 返回是否真的发生了写入
pub async fn update_check_in(state: &AppState, req: UpdateCheckInRequest) -> AppResult<bool> {
    if req.is_empty() {
        return Ok(false);
    }
    let user_id = req.user_id.clone();
    let store = state.store.get().await?;
    let updated = CheckIn::update(store.as_ref(), &state.config.tables.check_ins, req).await?;

    if updated {
        state
            .cache
            .invalidate_for(&Mutation::UpdateCheckIn { user_id })
            .await;
    }
    Ok(updated)
}

pub async fn create_follow(
    state: &AppState,
    user_id: &str,
    follower_id: &str,
) -> AppResult<Following> {
    let store = state.store.get().await?;
    let edge = Following::create(
        store.as_ref(),
        &state.config.tables.following,
        user_id,
        follower_id,
    )
    .await?;

    state
        .cache
        .invalidate_for(&Mutation::CreateFollow {
            user_id: user_id.to_string(),
            follower_id: follower_id.to_string(),
        })
        .await;
    Ok(edge)
}

/// 附近搜索结果经缓存获取，再按到中心的距离排序；`selected_id` 对应的地点固定在第一位
pub async fn nearby_places(
    state: &AppState,
    search: &NearbySearch,
    selected_id: Option<&str>,
) -> AppResult<Vec<Place>> {
    let key = QueryKey::PlacesNearby {
        latitude: search.center.latitude,
        longitude: search.center.longitude,
        radius_meters: search.radius_meters,
        included_types: search.included_types.clone(),
        limit: search.limit,
    };
    let places: Vec<Place> = state
        .cache
        .fetch(&key, || state.places.search_nearby(search))
        .await?;

    Ok(rank_by_distance(search.center, places, selected_id))
}
