use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use teamup_feed::{
    build_view, compute_available_languages, AppConfig, FeedError, FilterState, Post, RecordId,
    SortKey, Tag, TeamUp,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "teamup", version, about = "Browse the TeamUp post feed")]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List posts matching the given filters
    Feed {
        /// Case-insensitive title search
        #[arg(long, default_value = "")]
        search: String,

        /// Project or Hackathon
        #[arg(long)]
        tag: Option<String>,

        /// Required language; repeat to require several
        #[arg(long = "language")]
        languages: Vec<String>,

        /// created_at or upvotes
        #[arg(long, default_value = "created_at")]
        sort: String,

        /// Read posts from a JSON file instead of the backend
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// List every language used by any post
    Languages {
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Show one post with its votes and comments
    Show { id: String },
}

fn load_snapshot(path: &Path) -> Result<Vec<Post>, FeedError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

async fn fetch_posts(snapshot: Option<&Path>, tag: Option<Tag>) -> Result<Vec<Post>, FeedError> {
    match snapshot {
        Some(path) => {
            info!("Reading posts from {}", path.display());
            load_snapshot(path)
        }
        None => {
            let config = AppConfig::from_env()?;
            TeamUp::connect(&config)?.feeds.fetch_snapshot(tag).await
        }
    }
}

fn print_post(post: &Post) {
    let tally = post.tally();
    println!(
        "[{}] {} ({}) +{} -{} {}",
        post.id,
        post.display_title(),
        post.tag.map(|tag| tag.as_str()).unwrap_or("-"),
        tally.upvotes,
        tally.downvotes,
        post.created_at.format("%Y-%m-%d %H:%M"),
    );
    let languages = post.decoded_languages();
    if !languages.is_empty() {
        println!("    {}", languages.join(", "));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Feed {
            search,
            tag,
            languages,
            sort,
            snapshot,
        } => {
            let mut filters = FilterState::new()
                .with_search(search)
                .with_sort(sort.parse().unwrap_or(SortKey::Unsorted));
            filters.set_tag_str(tag.as_deref().unwrap_or(""))?;
            for language in &languages {
                filters.add_language(language);
            }

            let posts = fetch_posts(snapshot.as_deref(), filters.tag).await.map_err(|e| {
                error!("Error fetching posts: {}", e);
                e
            })?;

            let view = build_view(&posts, &filters);
            info!("Showing {} of {} posts", view.posts.len(), posts.len());
            for post in view.posts {
                print_post(post);
            }
        }
        Commands::Languages { snapshot } => {
            let posts = fetch_posts(snapshot.as_deref(), None).await?;
            for language in compute_available_languages(&posts) {
                println!("{}", language);
            }
        }
        Commands::Show { id } => {
            let config = AppConfig::from_env()?;
            let app = TeamUp::connect(&config)?;
            let id: RecordId = id.parse()?;

            let (post, votes, comments) = futures::future::try_join3(
                app.feeds.get_post(&id),
                app.engagement.load_votes(&id, None),
                app.engagement.list_comments(&id),
            )
            .await?;

            let author = match post.owner_id {
                Some(owner) => app
                    .profiles
                    .get_profile(owner)
                    .await?
                    .map(|profile| profile.display_name()),
                None => None,
            };

            print_post(&post);
            println!("    by {}", author.as_deref().unwrap_or("User"));
            if let Some(body) = &post.body {
                println!("\n{}\n", body);
            }
            println!(
                "{} upvotes, {} downvotes, {} comments",
                votes.tally.upvotes,
                votes.tally.downvotes,
                comments.len()
            );
            for comment in comments {
                println!("  - {} ({})", comment.body, comment.created_at.format("%Y-%m-%d %H:%M"));
            }
        }
    }

    Ok(())
}
