use crate::aggregator::tally_votes;
use crate::languages::{contains_language, decode_languages};
use crate::types::{FilterState, Post, SortKey, Tag};
use std::cmp::Reverse;
use tracing::debug;

/// One step of the feed pipeline: keeps, drops or reorders posts without
/// touching them.
pub trait FeedStage: Send + Sync {
    fn apply<'a>(&self, posts: Vec<&'a Post>) -> Vec<&'a Post>;

    fn stage_name(&self) -> &'static str;
}

/// Keeps posts whose title contains the search text, ignoring case.
pub struct SearchStage {
    needle: String,
}

impl SearchStage {
    pub fn new(search: &str) -> Self {
        Self {
            needle: search.to_lowercase(),
        }
    }
}

impl FeedStage for SearchStage {
    fn apply<'a>(&self, posts: Vec<&'a Post>) -> Vec<&'a Post> {
        if self.needle.is_empty() {
            return posts;
        }
        posts
            .into_iter()
            .filter(|post| match post.title.as_deref() {
                Some(title) if !title.is_empty() => title.to_lowercase().contains(&self.needle),
                _ => false,
            })
            .collect()
    }

    fn stage_name(&self) -> &'static str {
        "search"
    }
}

/// Keeps posts with exactly the selected tag; no tag selected keeps all.
pub struct TagStage {
    tag: Option<Tag>,
}

impl TagStage {
    pub fn new(tag: Option<Tag>) -> Self {
        Self { tag }
    }
}

impl FeedStage for TagStage {
    fn apply<'a>(&self, posts: Vec<&'a Post>) -> Vec<&'a Post> {
        match self.tag {
            None => posts,
            Some(tag) => posts
                .into_iter()
                .filter(|post| post.tag == Some(tag))
                .collect(),
        }
    }

    fn stage_name(&self) -> &'static str {
        "tag"
    }
}

/// Keeps posts that list every selected language (AND, case-insensitive).
pub struct LanguageStage {
    required: Vec<String>,
}

impl LanguageStage {
    pub fn new(required: &[String]) -> Self {
        Self {
            required: required.to_vec(),
        }
    }
}

impl FeedStage for LanguageStage {
    fn apply<'a>(&self, posts: Vec<&'a Post>) -> Vec<&'a Post> {
        if self.required.is_empty() {
            return posts;
        }
        posts
            .into_iter()
            .filter(|post| {
                let languages = decode_languages(post.languages.as_deref());
                self.required
                    .iter()
                    .all(|wanted| contains_language(&languages, wanted))
            })
            .collect()
    }

    fn stage_name(&self) -> &'static str {
        "languages"
    }
}

/// Stable sort; equal keys keep their input order.
pub struct SortStage {
    sort_by: SortKey,
}

impl SortStage {
    pub fn new(sort_by: SortKey) -> Self {
        Self { sort_by }
    }
}

impl FeedStage for SortStage {
    fn apply<'a>(&self, mut posts: Vec<&'a Post>) -> Vec<&'a Post> {
        match self.sort_by {
            SortKey::CreatedAt => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortKey::Upvotes => posts.sort_by_key(|post| Reverse(tally_votes(&post.votes).upvotes)),
            SortKey::Unsorted => {}
        }
        posts
    }

    fn stage_name(&self) -> &'static str {
        "sort"
    }
}

/// Ordered list of stages run over a borrowed snapshot.
pub struct FeedPipeline {
    stages: Vec<Box<dyn FeedStage>>,
}

impl FeedPipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Search, tag, languages, then sort.
    pub fn from_filters(filters: &FilterState) -> Self {
        Self::new()
            .with_stage(Box::new(SearchStage::new(&filters.search)))
            .with_stage(Box::new(TagStage::new(filters.tag)))
            .with_stage(Box::new(LanguageStage::new(&filters.languages)))
            .with_stage(Box::new(SortStage::new(filters.sort_by)))
    }

    pub fn with_stage(mut self, stage: Box<dyn FeedStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.stage_name()).collect()
    }

    pub fn run<'a>(&self, posts: &'a [Post]) -> Vec<&'a Post> {
        let mut current: Vec<&'a Post> = posts.iter().collect();
        for stage in &self.stages {
            let before = current.len();
            current = stage.apply(current);
            debug!("Stage {} kept {}/{} posts", stage.stage_name(), current.len(), before);
        }
        current
    }
}

impl Default for FeedPipeline {
    fn default() -> Self {
        Self::new()
    }
}
