//! The feed aggregator: pure functions from a fetched snapshot and the
//! viewer's filters to what the feed page renders. Nothing here performs I/O
//! or fails; callers re-run it whenever the snapshot or filters change.

use crate::languages::decode_languages;
use crate::processing::FeedPipeline;
use crate::types::{FeedView, FilterState, Post, Vote, VoteKind, VoteTally};
use std::collections::HashSet;

/// Count exact upvotes and downvotes; other vote types count toward neither.
pub fn tally_votes(votes: &[Vote]) -> VoteTally {
    votes.iter().fold(VoteTally::default(), |mut tally, vote| {
        match vote.vote_type {
            VoteKind::Upvote => tally.upvotes += 1,
            VoteKind::Downvote => tally.downvotes += 1,
            VoteKind::Other => {}
        }
        tally
    })
}

/// Every language used by any post, de-duplicated, in first-seen order.
pub fn compute_available_languages(posts: &[Post]) -> Vec<String> {
    let mut seen = HashSet::new();
    posts
        .iter()
        .flat_map(|post| decode_languages(post.languages.as_deref()))
        .filter(|lang| seen.insert(lang.clone()))
        .collect()
}

/// Posts to render, in render order. Never longer than `posts`.
pub fn filter_and_sort<'a>(posts: &'a [Post], filters: &FilterState) -> Vec<&'a Post> {
    FeedPipeline::from_filters(filters).run(posts)
}

pub fn build_view<'a>(posts: &'a [Post], filters: &FilterState) -> FeedView<'a> {
    FeedView {
        posts: filter_and_sort(posts, filters),
        available_languages: compute_available_languages(posts),
    }
}
