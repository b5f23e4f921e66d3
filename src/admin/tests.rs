// src/admin/tests.rs

#[cfg(test)]
mod tests {
    use super::super::handlers::*;
    use super::super::models::*;
    use super::super::services::StatusPoller;
    use crate::alerts::models::RiskLevel;
    use crate::test_support::{client_for, serve};
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::RwLock;

    fn snapshot() -> Value {
        json!([
            {
                "user_id": "68cfe324c0034f6d28791d47",
                "depression_score": 7,
                "sentiment_label": "걱정스러운(불안한)",
                "sentiment_score": 0.626,
                "disease": "복통",
                "type": "high",
                "name": "오준식",
                "time": "24분 전"
            },
            { "user_id": "u-2", "depression_score": 9, "sentiment_score": 0.81, "type": "critical", "name": "김영희" },
            { "user_id": "u-3", "depression_score": 5, "risk": "medium", "name": "정만수" },
            { "user_id": "u-4", "depression_score": 3, "level": "low", "name": "이순자" },
            { "user_id": "u-5" }
        ])
    }

    #[derive(Clone, Default)]
    struct Backend {
        hits: Arc<AtomicUsize>,
        queries: Arc<std::sync::Mutex<Vec<HashMap<String, String>>>>,
    }

    async fn allstatus(
        State(backend): State<Backend>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        backend.hits.fetch_add(1, Ordering::SeqCst);
        backend.queries.lock().unwrap().push(params);
        Json(snapshot())
    }

    async fn userdetail(Query(params): Query<HashMap<String, String>>) -> Result<Json<Value>, StatusCode> {
        match params.get("_id").map(String::as_str) {
            Some("u-2") => Ok(Json(json!({
                "user_id": "u-2",
                "name": "김영희",
                "phone": "01012345678",
                "birth": "1948-03-02",
                "gender": "여",
                "address": "서울특별시 종로구 세종대로 175",
                "depression_score": 9,
                "sentiment_label": "불안한",
                "sentiment_score": 0.81,
                "disease": "고혈압",
                "risk": "critical"
            }))),
            _ => Err(StatusCode::NOT_FOUND),
        }
    }

    async fn nearby(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        assert_eq!(params.get("address").map(String::as_str), Some("서울특별시 종로구 세종대로 175"));
        Json(json!({
            "hospital": [
                { "요양기관명": "서울대학교병원", "주소": "서울 종로구 대학로 101", "전화번호": "02-2072-2114" },
                1.8
            ],
            "firehouse": [
                { "소방서명": "종로소방서", "119안전센터명": "세종로119안전센터", "주소": "서울 종로구" },
                0.4
            ]
        }))
    }

    async fn backend() -> (Backend, String) {
        let state = Backend::default();
        let base = serve(
            Router::new()
                .route("/api/allstatus", get(allstatus))
                .route("/api/userdetail", get(userdetail))
                .route("/api/nearby", get(nearby))
                .with_state(state.clone()),
        )
        .await;
        (state, base)
    }

    // ---------------------------------------------------------------
    // Status board
    // ---------------------------------------------------------------

    #[test]
    fn test_status_item_accepts_every_tier_field() {
        let items: Vec<StatusItem> = serde_json::from_value(snapshot()).unwrap();
        let tiers: Vec<_> = items.iter().map(|i| i.tier).collect();

        assert_eq!(
            tiers,
            vec![
                RiskLevel::High,
                RiskLevel::High,
                RiskLevel::Middle,
                RiskLevel::None,
                RiskLevel::None
            ]
        );
        assert_eq!(items[4].name, "이름 미상");
        assert_eq!(items[4].disease, "-");
    }

    #[test]
    fn test_stats_and_groups() {
        let board = StatusBoard::new(serde_json::from_value(snapshot()).unwrap());

        assert_eq!(
            board.stats(),
            BoardStats {
                total: 5,
                high: 2,
                middle: 1,
                safe: 2
            }
        );
        let high: Vec<_> = board.high_group().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(high, vec!["오준식", "김영희"]);
        assert_eq!(board.middle_group()[0].user_id, "u-3");
    }

    #[test]
    fn test_empty_board_stats() {
        assert_eq!(StatusBoard::default().stats(), BoardStats::default());
    }

    #[test]
    fn test_summary_line() {
        let items: Vec<StatusItem> = serde_json::from_value(snapshot()).unwrap();
        assert_eq!(
            summary_line(&items[0]),
            "우울도 : 7  감정점수 : 63점  감정상태 : 걱정스러운(불안한)  질병 : 복통"
        );
    }

    #[tokio::test]
    async fn test_refresh_replaces_board() {
        let (state, base) = backend().await;
        let api = client_for(&base);
        let mut board = StatusBoard::new(vec![]);

        let stats = board.refresh(&api).await.unwrap();
        assert_eq!(stats.total, 5);

        board.refresh(&api).await.unwrap();
        assert_eq!(board.items().len(), 5);
        assert_eq!(state.hits.load(Ordering::SeqCst), 2);
        assert_eq!(
            state.queries.lock().unwrap()[0].get("type").map(String::as_str),
            Some("all")
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let base = serve(Router::new()).await;
        let api = client_for(&base);
        let mut board = StatusBoard::new(serde_json::from_value(snapshot()).unwrap());

        assert!(board.refresh(&api).await.is_err());
        assert_eq!(board.stats().total, 5);
    }

    // ---------------------------------------------------------------
    // Detail and nearby
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn test_fetch_user_detail() {
        let (_state, base) = backend().await;
        let api = client_for(&base);

        let detail = fetch_user_detail(&api, "u-2").await.unwrap();
        assert_eq!(detail.name, "김영희");
        assert_eq!(detail.risk, RiskLevel::High);
        assert_eq!(detail.birth.as_deref(), Some("1948-03-02"));

        assert!(fetch_user_detail(&api, "nobody").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_nearby() {
        let (_state, base) = backend().await;
        let api = client_for(&base);

        let nearby = fetch_nearby(&api, " 서울특별시 종로구 세종대로 175 ")
            .await
            .unwrap()
            .unwrap();
        let (hospital, hospital_km) = &nearby.hospital;
        let (firehouse, firehouse_km) = &nearby.firehouse;

        assert_eq!(hospital.name(), "서울대학교병원");
        assert_eq!(hospital.phone(), "02-2072-2114");
        assert!((hospital_km - 1.8).abs() < f64::EPSILON);
        assert_eq!(firehouse.name(), "세종로119안전센터");
        assert!((firehouse_km - 0.4).abs() < f64::EPSILON);

        assert!(fetch_nearby(&api, "   ").await.unwrap().is_none());
    }

    // ---------------------------------------------------------------
    // Search
    // ---------------------------------------------------------------

    fn rows() -> Vec<Row> {
        vec![
            Row {
                user_id: "ABC-1".to_string(),
                name: "오준식".to_string(),
                age: Some(81),
                risk: RiskLevel::High,
            },
            Row {
                user_id: "def-2".to_string(),
                name: "Kim Younghee".to_string(),
                age: None,
                risk: RiskLevel::Middle,
            },
        ]
    }

    #[test]
    fn test_filter_users() {
        let rows = rows();

        assert_eq!(filter_users(&rows, "").len(), 2);
        assert_eq!(filter_users(&rows, "  ").len(), 2);
        assert_eq!(filter_users(&rows, "준식")[0].user_id, "ABC-1");
        assert_eq!(filter_users(&rows, "abc")[0].user_id, "ABC-1");
        assert_eq!(filter_users(&rows, "KIM")[0].user_id, "def-2");
        assert_eq!(filter_users(&rows, "81")[0].user_id, "ABC-1");
        assert!(filter_users(&rows, "없는사람").is_empty());
    }

    #[test]
    fn test_row_from_status_item() {
        let items: Vec<StatusItem> = serde_json::from_value(snapshot()).unwrap();
        let row = Row::from(&items[2]);

        assert_eq!(row.name, "정만수");
        assert_eq!(row.age, None);
        assert_eq!(tier_label(row.risk), "중위험");
    }

    // ---------------------------------------------------------------
    // Poller
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn test_poller_refreshes_until_shutdown() {
        let (state, base) = backend().await;
        let board = Arc::new(RwLock::new(StatusBoard::default()));

        let poller = StatusPoller::start(client_for(&base), board.clone(), Duration::from_millis(30));
        assert!(poller.is_running());

        tokio::time::timeout(Duration::from_secs(5), async {
            while board.read().await.stats().total != 5 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("board refreshed");

        poller.shutdown().await;
        let hits = state.hits.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(state.hits.load(Ordering::SeqCst), hits);
    }
}
