use gambit_core::testutil::{MockFetcher, leaderboard_json};
use gambit_core::{ChessExtractor, ExtractorConfig, Pipeline, PipelineConfig};
use serde_json::json;

use crate::integration::common::{count_rows, setup_test_db};

const BASE: &str = "https://api.chess.com/pub";

fn upstream() -> MockFetcher {
    let players = ["hikaru", "magnuscarlsen"];
    let mut fetcher =
        MockFetcher::new().with_json(format!("{BASE}/leaderboards"), leaderboard_json(&players));

    for (i, name) in players.iter().enumerate() {
        let month = format!("{BASE}/player/{name}/games/2024/05");
        let games: Vec<_> = (0..7)
            .map(|g| json!({"url": format!("https://www.chess.com/game/live/{name}{g}"), "rated": true}))
            .collect();
        fetcher = fetcher
            .with_json(
                format!("{BASE}/player/{name}/is-online"),
                json!({"online": i == 0}),
            )
            .with_json(
                format!("{BASE}/player/{name}"),
                json!({"username": name, "player_id": i, "status": "premium"}),
            )
            .with_json(
                format!("{BASE}/player/{name}/games/archives"),
                json!({ "archives": [month.clone()] }),
            )
            .with_json(month, json!({ "games": games }));
    }

    fetcher
}

#[tokio::test]
async fn full_load_writes_three_tables() {
    let (db, _container) = setup_test_db().await;
    let extractor = ChessExtractor::new(upstream(), ExtractorConfig::default());
    let pipeline = Pipeline::new(db.destination(), PipelineConfig::default());

    let info = pipeline.run(extractor.resources()).await.unwrap();

    assert_eq!(info.resource_count, 3);
    assert_eq!(
        info.to_string(),
        "Load completed! Loaded 3 resources\n\
         Tables: players_online_status, players_profiles, players_games"
    );
    assert_eq!(count_rows(&db, "chess_data", "players_online_status").await, 2);
    assert_eq!(count_rows(&db, "chess_data", "players_profiles").await, 2);
    assert_eq!(count_rows(&db, "chess_data", "players_games").await, 10);

    let online: Vec<(String, bool)> = sqlx::query_as(
        r#"SELECT "username", "is_online" FROM "chess_data"."players_online_status" ORDER BY "rank""#,
    )
    .fetch_all(db.pool())
    .await
    .unwrap();
    assert_eq!(
        online,
        vec![
            ("hikaru".to_string(), true),
            ("magnuscarlsen".to_string(), false)
        ]
    );
}

#[tokio::test]
async fn rerun_appends_identical_records() {
    let (db, _container) = setup_test_db().await;
    let extractor = ChessExtractor::new(upstream(), ExtractorConfig::default());
    let pipeline = Pipeline::new(db.destination(), PipelineConfig::default());

    let first = pipeline.run(extractor.resources()).await.unwrap();
    let second = pipeline.run(extractor.resources()).await.unwrap();
    assert_ne!(first.load_id, second.load_id);

    // Every record hash of the first load reappears in the second.
    let (distinct, total): (i64, i64) = sqlx::query_as(
        r#"SELECT COUNT(DISTINCT "_record_hash"), COUNT(*) FROM "chess_data"."players_games""#,
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(total, 20);
    assert_eq!(distinct, 10);
}
