use anyhow::Result;
use interfaces::{BaselineBlobStore, BlobStore, DataStore, Embed, Filter, MemoryStore, Query, Row};
use serde_json::{Value, json};

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

async fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .seed(
            "Posts",
            vec![
                row(json!({"id": 1, "title": "Backend API", "tag": "Project", "created_at": "2024-01-01T00:00:00+00:00"})),
                row(json!({"id": 2, "title": "Game jam", "tag": "Hackathon", "created_at": "2024-01-03T00:00:00+00:00"})),
                row(json!({"id": 3, "title": "Untagged", "tag": null, "created_at": "2024-01-02T00:00:00+00:00"})),
            ],
        )
        .await;
    store
        .seed(
            "UserVotes",
            vec![
                row(json!({"id": 10, "post_id": 1, "owner_id": "a", "vote_type": "upvote"})),
                row(json!({"id": 11, "post_id": 1, "owner_id": "b", "vote_type": "downvote"})),
                row(json!({"id": 12, "post_id": "2", "owner_id": "a", "vote_type": "upvote"})),
            ],
        )
        .await;
    store
}

#[tokio::test]
async fn test_ilike_and_embed() -> Result<()> {
    let store = seeded().await;
    let query = Query::new("Posts")
        .ilike("tag", "%")
        .order("id", true)
        .embed(Embed {
            alias: "votes".to_string(),
            table: "UserVotes".to_string(),
            foreign_key: "post_id".to_string(),
            columns: vec!["vote_type".to_string()],
        });

    let rows = store.select(&query).await?;
    assert_eq!(rows.len(), 2, "null tags never match a pattern");
    assert_eq!(rows[0]["votes"], json!([{"vote_type": "upvote"}, {"vote_type": "downvote"}]));
    assert_eq!(rows[1]["votes"], json!([{"vote_type": "upvote"}]));

    let hackathons = store.select(&Query::new("Posts").ilike("tag", "hack%")).await?;
    assert_eq!(hackathons.len(), 1);
    assert_eq!(hackathons[0]["title"], "Game jam");
    Ok(())
}

#[tokio::test]
async fn test_order_limit_and_projection() -> Result<()> {
    let store = seeded().await;
    let rows = store
        .select(
            &Query::new("Posts")
                .columns(&["title"])
                .order("created_at", false)
                .limit(2),
        )
        .await?;

    assert_eq!(rows, vec![row(json!({"title": "Game jam"})), row(json!({"title": "Untagged"}))]);

    let single = store.select_single(&Query::new("Posts").eq("id", "3")).await?;
    assert_eq!(single.map(|r| r["title"].clone()), Some(json!("Untagged")));
    assert!(store.select_single(&Query::new("Posts").eq("id", 99)).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_writes_report_affected_rows() -> Result<()> {
    let store = seeded().await;

    let inserted = store.insert("Comments", row(json!({"post_id": 1, "body": "hi"}))).await?;
    assert!(inserted.contains_key("id"));
    assert!(inserted.contains_key("created_at"));

    let changed = store
        .update("UserVotes", &[Filter::eq("owner_id", "a")], row(json!({"vote_type": "downvote"})))
        .await?;
    assert_eq!(changed, 2);

    let removed = store.delete("UserVotes", &[Filter::eq("post_id", 1)]).await?;
    assert_eq!(removed, 2);
    assert_eq!(store.rows("UserVotes").await.len(), 1);
    assert_eq!(store.delete("Missing", &[]).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_upsert_merges_on_conflict_column() -> Result<()> {
    let store = MemoryStore::new();
    store
        .upsert("UserProfile", row(json!({"user_id": "u1", "profile_complete": false})), "user_id")
        .await?;
    let merged = store
        .upsert(
            "UserProfile",
            row(json!({"user_id": "u1", "first_name": "Ada", "profile_complete": true})),
            "user_id",
        )
        .await?;

    assert_eq!(merged["first_name"], "Ada");
    assert_eq!(merged["profile_complete"], true);
    assert_eq!(store.rows("UserProfile").await.len(), 1);

    let missing_key = store.upsert("UserProfile", row(json!({"first_name": "x"})), "user_id").await;
    assert!(missing_key.is_err());
    Ok(())
}

#[tokio::test]
async fn test_blob_store_upsert_flag() -> Result<()> {
    let blobs = BaselineBlobStore::new("https://project.test/");
    blobs.upload("avatars", "u1/me.png", vec![1], "image/png", false).await?;
    assert!(blobs.upload("avatars", "u1/me.png", vec![2], "image/png", false).await.is_err());
    blobs.upload("avatars", "u1/me.png", vec![3], "image/png", true).await?;

    assert_eq!(blobs.object("avatars", "u1/me.png").await.map(|o| o.1), Some(vec![3]));
    assert_eq!(
        blobs.public_url("avatars", "u1/me.png"),
        "https://project.test/storage/v1/object/public/avatars/u1/me.png"
    );
    Ok(())
}
