use futures::stream;
use gambit_core::models::JsonObject;
use gambit_core::{AppError, Pipeline, PipelineConfig, Resource};
use serde_json::{Value, json};

use crate::integration::common::{columns, count_rows, setup_test_db, table_exists};

fn resource(name: &str, values: Vec<Value>) -> Resource<'static> {
    let rows: Vec<Result<JsonObject, AppError>> = values
        .into_iter()
        .map(|v| match v {
            Value::Object(map) => Ok(map),
            other => panic!("expected object, got {other}"),
        })
        .collect();
    Resource::new(name, stream::iter(rows))
}

#[tokio::test]
async fn load_creates_schema_tables_and_load_record() {
    let (db, _container) = setup_test_db().await;
    let destination = db.destination();
    let pipeline = Pipeline::new(destination.clone(), PipelineConfig::default());

    let info = pipeline
        .run(vec![
            resource(
                "players_profiles",
                vec![
                    json!({"username": "hikaru", "followers": 1200000, "is_streamer": true}),
                    json!({"username": "magnuscarlsen", "followers": 900000, "is_streamer": false}),
                ],
            ),
            resource("players_games", vec![]),
        ])
        .await
        .unwrap();

    assert_eq!(info.resources_created, vec!["players_profiles", "players_games"]);
    assert_eq!(count_rows(&db, "chess_data", "players_profiles").await, 2);
    assert!(table_exists(&db, "chess_data", "players_games").await);
    assert_eq!(count_rows(&db, "chess_data", "players_games").await, 0);

    let cols = columns(&db, "chess_data", "players_profiles").await;
    assert!(cols.contains(&("followers".to_string(), "bigint".to_string())));
    assert!(cols.contains(&("is_streamer".to_string(), "boolean".to_string())));
    assert!(cols.contains(&("_load_id".to_string(), "text".to_string())));

    let loads = destination.recent_loads("chess_data", 10).await.unwrap();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].load_id, info.load_id);
    assert_eq!(loads[0].status, "loaded");
    assert_eq!(loads[0].table_count, 2);
    assert_eq!(loads[0].row_count, 2);
}

#[tokio::test]
async fn nested_values_land_as_jsonb() {
    let (db, _container) = setup_test_db().await;
    let pipeline = Pipeline::new(db.destination(), PipelineConfig::default());

    pipeline
        .run(vec![resource(
            "players_games",
            vec![json!({
                "url": "https://www.chess.com/game/live/1",
                "white": {"username": "hikaru", "rating": 3300},
                "player_username": "hikaru"
            })],
        )])
        .await
        .unwrap();

    let (rating,): (i64,) = sqlx::query_as(
        r#"SELECT ("white"->>'rating')::bigint FROM "chess_data"."players_games""#,
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(rating, 3300);
}

#[tokio::test]
async fn later_loads_add_new_columns_and_append() {
    let (db, _container) = setup_test_db().await;
    let pipeline = Pipeline::new(db.destination(), PipelineConfig::default());

    pipeline
        .run(vec![resource("players_profiles", vec![json!({"username": "a"})])])
        .await
        .unwrap();
    pipeline
        .run(vec![resource(
            "players_profiles",
            vec![json!({"username": "b", "title": "GM"})],
        )])
        .await
        .unwrap();

    assert_eq!(count_rows(&db, "chess_data", "players_profiles").await, 2);
    let cols = columns(&db, "chess_data", "players_profiles").await;
    assert!(cols.iter().any(|(name, _)| name == "title"));

    let (nulls,): (i64,) = sqlx::query_as(
        r#"SELECT COUNT(*) FROM "chess_data"."players_profiles" WHERE "title" IS NULL"#,
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(nulls, 1);

    let loads = db.destination().recent_loads("chess_data", 10).await.unwrap();
    assert_eq!(loads.len(), 2);
}

#[tokio::test]
async fn failed_package_rolls_back_entirely() {
    let (db, _container) = setup_test_db().await;
    let pipeline = Pipeline::new(db.destination(), PipelineConfig::default());

    pipeline
        .run(vec![resource("players_games", vec![json!({"rating": 3000})])])
        .await
        .unwrap();

    // `rating` already exists as BIGINT, so this package cannot be inserted.
    let err = pipeline
        .run(vec![
            resource("players_profiles", vec![json!({"username": "a"})]),
            resource("players_games", vec![json!({"rating": "unrated"})]),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DatabaseError(_)));
    assert!(!table_exists(&db, "chess_data", "players_profiles").await);
    assert_eq!(count_rows(&db, "chess_data", "players_games").await, 1);

    let loads = db.destination().recent_loads("chess_data", 10).await.unwrap();
    assert_eq!(loads.len(), 1);
}

#[tokio::test]
async fn dataset_name_selects_schema() {
    let (db, _container) = setup_test_db().await;
    let config = PipelineConfig {
        pipeline_name: "chess_data".into(),
        dataset_name: "chess_staging".into(),
    };
    let pipeline = Pipeline::new(db.destination(), config);

    pipeline
        .run(vec![resource("players_profiles", vec![json!({"username": "a"})])])
        .await
        .unwrap();

    assert!(table_exists(&db, "chess_staging", "players_profiles").await);
    assert!(!table_exists(&db, "chess_data", "players_profiles").await);
}

#[tokio::test]
async fn health_check_succeeds() {
    let (db, _container) = setup_test_db().await;

    db.health_check().await.unwrap();
}
