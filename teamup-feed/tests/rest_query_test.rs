use interfaces::defs::{BlobStore, Embed, Query};
use serde_json::Value;
use std::collections::HashMap;
use teamup_feed::store::query_params;
use teamup_feed::{AppConfig, FeedError, Fetcher, RestBlobStore};

fn pairs(query: &Query) -> Vec<(String, String)> {
    query_params(query)
}

#[test]
fn test_feed_select_embeds_votes() {
    let query = Query::new("Posts")
        .embed(Embed {
            alias: "votes".to_string(),
            table: "UserVotes".to_string(),
            foreign_key: "post_id".to_string(),
            columns: vec!["vote_type".to_string(), "owner_id".to_string()],
        })
        .ilike("tag", "%");

    assert_eq!(
        pairs(&query),
        vec![
            ("select".to_string(), "*,votes:UserVotes(vote_type,owner_id)".to_string()),
            ("tag".to_string(), "ilike.%".to_string()),
        ]
    );
}

#[test]
fn test_filters_order_and_limit() {
    let query = Query::new("Comments")
        .columns(&["id", "body"])
        .eq("post_id", 42)
        .eq("owner_id", "3f1c")
        .eq("deleted_at", Value::Null)
        .order("created_at", true)
        .limit(1);

    assert_eq!(
        pairs(&query),
        vec![
            ("select".to_string(), "id,body".to_string()),
            ("post_id".to_string(), "eq.42".to_string()),
            ("owner_id".to_string(), "eq.3f1c".to_string()),
            ("deleted_at".to_string(), "is.null".to_string()),
            ("order".to_string(), "created_at.asc".to_string()),
            ("limit".to_string(), "1".to_string()),
        ]
    );
}

#[test]
fn test_config_from_lookup() {
    let mut vars = HashMap::new();
    vars.insert("SUPABASE_URL", "https://project.test");
    vars.insert("SUPABASE_API", "anon-key");
    vars.insert("TEAMUP_TIMEOUT_SECONDS", "5");

    let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
    assert_eq!(config.base_url.as_str(), "https://project.test/");
    assert_eq!(config.fetch.timeout_seconds, 5);
    assert_eq!(config.fetch.user_agent, "TeamUp-Feed/1.0");
    assert!(!format!("{:?}", config).contains("anon-key"));
}

#[test]
fn test_config_requires_backend() {
    let missing = AppConfig::from_lookup(|_| None);
    assert!(matches!(missing, Err(FeedError::Config(_))));

    let bad_url = AppConfig::from_lookup(|key| match key {
        "SUPABASE_URL" => Some("not a url".to_string()),
        "SUPABASE_API" => Some("key".to_string()),
        _ => None,
    });
    assert!(matches!(bad_url, Err(FeedError::InvalidUrl(_))));
}

#[test]
fn test_public_avatar_url() {
    let config = AppConfig::new("https://project.test/", "key").unwrap();
    let blobs = RestBlobStore::new(Fetcher::new(&config).unwrap());
    assert_eq!(
        blobs.public_url("avatars", "avatars/u1/me.png"),
        "https://project.test/storage/v1/object/public/avatars/avatars/u1/me.png"
    );
}
