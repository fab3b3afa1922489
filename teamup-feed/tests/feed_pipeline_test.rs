use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Once;
use teamup_feed::{
    build_view, compute_available_languages, filter_and_sort, languages::decode_languages,
    languages::encode_languages, languages::encode_languages_input, tally_votes, FeedPipeline,
    FilterState, Post, RecordId, SortKey, Tag, Vote, VoteKind,
};
use tracing::info;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .try_init()
            .ok();
    });
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 1, 12, 0, 0).unwrap()
}

fn vote(kind: VoteKind) -> Vote {
    Vote {
        id: None,
        post_id: None,
        owner_id: None,
        vote_type: kind,
    }
}

fn post(id: i64, title: &str, languages: Option<&str>) -> Post {
    Post {
        id: RecordId::Int(id),
        title: Some(title.to_string()),
        body: None,
        tag: Some(Tag::Project),
        languages: languages.map(str::to_string),
        owner_id: None,
        created_at: base_time() + Duration::minutes(id),
        votes: Vec::new(),
    }
}

fn with_upvotes(mut post: Post, count: usize) -> Post {
    post.votes = (0..count).map(|_| vote(VoteKind::Upvote)).collect();
    post
}

fn ids(posts: &[&Post]) -> Vec<i64> {
    posts
        .iter()
        .map(|post| match &post.id {
            RecordId::Int(id) => *id,
            RecordId::Text(text) => text.parse().unwrap(),
        })
        .collect()
}

#[test]
fn test_decode_languages_forms() {
    init_tracing();
    assert!(decode_languages(None).is_empty());
    assert!(decode_languages(Some("")).is_empty());
    assert_eq!(decode_languages(Some(r#"["Go", "Rust"]"#)), vec!["Go", "Rust"]);
    assert_eq!(decode_languages(Some("Go, Rust")), vec!["Go", "Rust"]);
    assert_eq!(decode_languages(Some("[]")), Vec::<String>::new());
    assert_eq!(decode_languages(Some(r#"["Go",,""]"#)), vec!["Go"]);
}

#[test]
fn test_language_encoding_matches_decoding() {
    let selected = vec!["Python".to_string(), "Go".to_string()];
    let encoded = encode_languages(&selected);
    assert_eq!(encoded, r#"["Python","Go"]"#);
    assert_eq!(decode_languages(Some(&encoded)), selected);

    assert_eq!(
        encode_languages_input("Rust, ,Go ").as_deref(),
        Some(r#"["Rust","Go"]"#)
    );
    assert_eq!(encode_languages_input("  "), None);
}

#[test]
fn test_tally_ignores_unknown_vote_types() {
    let votes: Vec<Vote> = serde_json::from_value(serde_json::json!([
        {"vote_type": "upvote"},
        {"vote_type": "upvote"},
        {"vote_type": "downvote"},
        {"vote_type": "weird"},
        {"vote_type": null},
        {"vote_type": 1},
        {"vote_type": true},
        {"vote_type": ["upvote"]}
    ]))
    .unwrap();

    let tally = tally_votes(&votes);
    assert_eq!(tally.upvotes, 2);
    assert_eq!(tally.downvotes, 1);
}

#[test]
fn test_post_with_malformed_vote_still_decodes() {
    let post: Post = serde_json::from_value(serde_json::json!({
        "id": 9,
        "title": "Odd votes",
        "created_at": "2024-11-01T12:00:00Z",
        "votes": [{"vote_type": true}, {"vote_type": 1, "owner_id": null}]
    }))
    .unwrap();

    assert_eq!(post.votes.len(), 2);
    assert!(post.votes.iter().all(|v| v.vote_type == VoteKind::Other));
    assert_eq!(post.tally().upvotes, 0);
    assert_eq!(post.tally().downvotes, 0);
}

#[test]
fn test_language_filter_is_conjunctive() {
    init_tracing();
    let posts = vec![
        post(1, "A", Some(r#"["Go","Rust"]"#)),
        post(2, "B", Some(r#"["Go"]"#)),
        post(3, "C", None),
    ];
    let filters = FilterState::new()
        .with_language("Go")
        .with_language("rust")
        .with_sort(SortKey::Unsorted);

    assert_eq!(ids(&filter_and_sort(&posts, &filters)), vec![1]);
}

#[test]
fn test_upvote_sort_is_stable() {
    init_tracing();
    let posts = vec![
        with_upvotes(post(1, "three", None), 3),
        with_upvotes(post(2, "one", None), 1),
        with_upvotes(post(3, "two", None), 2),
        with_upvotes(post(4, "one again", None), 1),
    ];
    let filters = FilterState::new().with_sort(SortKey::Upvotes);

    assert_eq!(ids(&filter_and_sort(&posts, &filters)), vec![1, 3, 2, 4]);
}

#[test]
fn test_search_is_case_insensitive_substring() {
    let mut untitled = post(2, "", None);
    untitled.title = None;
    let posts = vec![post(1, "Backend API", None), untitled, post(3, "Frontend", None)];

    let filters = FilterState::new().with_search("api");
    assert_eq!(ids(&filter_and_sort(&posts, &filters)), vec![1]);

    // Untitled posts still show when nothing is searched.
    let everything = filter_and_sort(&posts, &FilterState::new());
    assert_eq!(everything.len(), 3);
}

#[test]
fn test_tag_filter_exact() {
    let mut hackathon = post(2, "Hack night", None);
    hackathon.tag = Some(Tag::Hackathon);
    let mut untagged = post(3, "Misc", None);
    untagged.tag = None;
    let posts = vec![post(1, "Build", None), hackathon, untagged];

    let filters = FilterState::new()
        .with_tag(Some(Tag::Hackathon))
        .with_sort(SortKey::Unsorted);
    assert_eq!(ids(&filter_and_sort(&posts, &filters)), vec![2]);
}

#[test]
fn test_available_languages_first_seen_order() {
    let posts = vec![
        post(1, "A", Some(r#"["Go","Python"]"#)),
        post(2, "B", None),
        post(3, "C", Some(r#"["Python","Rust"]"#)),
    ];
    assert_eq!(compute_available_languages(&posts), vec!["Go", "Python", "Rust"]);
}

#[test]
fn test_empty_filters_sort_newest_first() {
    init_tracing();
    let posts = vec![post(2, "middle", None), post(1, "oldest", None), post(3, "newest", None)];

    let view = build_view(&posts, &FilterState::default());
    assert_eq!(ids(&view.posts), vec![3, 2, 1]);
    assert!(view.available_languages.is_empty());
    info!("Empty filter view: {:?}", ids(&view.posts));
}

#[test]
fn test_equal_timestamps_keep_input_order() {
    init_tracing();
    let mut posts = vec![post(2, "b", None), post(1, "a", None), post(5, "newer", None), post(3, "c", None)];
    for p in posts.iter_mut().filter(|p| p.id != RecordId::Int(5)) {
        p.created_at = base_time();
    }

    let filters = FilterState::new().with_sort(SortKey::CreatedAt);
    assert_eq!(ids(&filter_and_sort(&posts, &filters)), vec![5, 2, 1, 3]);
}

#[test]
fn test_filter_languages_deduplicate_on_read() {
    let filters: FilterState = serde_json::from_value(serde_json::json!({
        "search": "",
        "tag": "",
        "languages": ["Go", "go", " ", "Rust", " rust "],
        "sortBy": "created_at"
    }))
    .unwrap();
    assert_eq!(filters.languages, vec!["Go", "Rust"]);

    let mut accented = FilterState::new().with_language("Élixir");
    assert!(!accented.add_language("élixir"));
    assert!(accented.remove_language("ÉLIXIR"));
    assert!(accented.languages.is_empty());
}

#[test]
fn test_unknown_sort_key_keeps_input_order() {
    let posts = vec![post(2, "b", None), post(1, "a", None), post(3, "c", None)];
    let sort: SortKey = "popularity".parse().unwrap();
    let filters = FilterState::new().with_sort(sort);
    assert_eq!(ids(&filter_and_sort(&posts, &filters)), vec![2, 1, 3]);
}

#[test]
fn test_filtered_never_longer_than_input() {
    let posts: Vec<Post> = (1..=20)
        .map(|id| {
            let languages = if id % 2 == 0 { Some(r#"["Go"]"#) } else { Some("Rust, Go") };
            with_upvotes(post(id, &format!("Post {}", id), languages), (id % 5) as usize)
        })
        .collect();

    let filter_sets = vec![
        FilterState::new(),
        FilterState::new().with_search("1"),
        FilterState::new().with_language("rust").with_sort(SortKey::Upvotes),
        FilterState::new().with_tag(Some(Tag::Hackathon)),
        FilterState::new().with_search("post").with_language("go"),
    ];

    for filters in &filter_sets {
        let shown = filter_and_sort(&posts, filters);
        assert!(shown.len() <= posts.len());
    }
}

#[test]
fn test_pipeline_stage_order() {
    let pipeline = FeedPipeline::from_filters(&FilterState::new());
    assert_eq!(pipeline.stage_names(), vec!["search", "tag", "languages", "sort"]);
}

#[test]
fn test_filter_state_serialized_shape() {
    let mut filters = FilterState::new().with_search("bot").with_language("Go");
    assert!(!filters.add_language("go"));
    assert!(!filters.add_language("  "));
    filters.set_tag_str("Hackathon").unwrap();

    let json = serde_json::to_value(&filters).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "search": "bot",
            "tag": "Hackathon",
            "languages": ["Go"],
            "sortBy": "created_at"
        })
    );

    let restored: FilterState =
        serde_json::from_value(serde_json::json!({"tag": "", "sortBy": "upvotes"})).unwrap();
    assert_eq!(restored.tag, None);
    assert_eq!(restored.sort_by, SortKey::Upvotes);
    assert!(filters.set_tag_str("Workshop").is_err());
}

#[test]
fn test_post_rows_decode_leniently() {
    let post: Post = serde_json::from_value(serde_json::json!({
        "id": 7,
        "title": "Rows",
        "tag": "Workshop",
        "languages": ["Go", "Rust"],
        "created_at": "2024-11-01T12:00:00+00:00",
        "votes": [{"vote_type": "upvote", "owner_id": null}]
    }))
    .unwrap();

    assert_eq!(post.tag, None);
    assert_eq!(post.decoded_languages(), vec!["Go", "Rust"]);
    assert_eq!(post.tally().upvotes, 1);
}
