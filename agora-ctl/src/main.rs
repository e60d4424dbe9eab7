use std::{path::PathBuf, sync::Arc};

use agora_client::{
    api::{slugify, Category, NewPost, NewTopic, NewUser, Votable, VoteDirection},
    format::format_votes,
    Backend, FeedOrder, Forum, ForumConfig, JsonFileStorage, LocalStorage, MemoryStorage, Route,
};
use agora_mock_server::MockServer;
use anyhow::Context;

#[derive(structopt::StructOpt)]
struct Opt {
    /// JSON configuration file
    #[structopt(short, long)]
    config: Option<PathBuf>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Print the URL name a topic would get
    Slug { name: String },

    /// Validate a topic before creating it
    CheckTopic {
        name: String,
        description: String,

        #[structopt(long)]
        rules: Option<String>,
    },

    /// Parse a path of the web application
    Route { path: String },

    /// Run a scripted session against an in-memory backend
    Demo {
        /// Keep local storage in this file instead of in memory
        #[structopt(long)]
        storage: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ForumConfig> {
    let config = match path {
        Some(p) => ForumConfig::from_file(p)?,
        None => ForumConfig::default(),
    };
    config.with_env()
}

fn forum(srv: &MockServer, storage: Arc<dyn LocalStorage>, config: ForumConfig) -> Forum {
    let backend = Backend {
        store: Arc::new(srv.clone()),
        identity: Arc::new(srv.identity()),
        blobs: Arc::new(srv.clone()),
    };
    Forum::new(backend, storage, config)
}

async fn demo(config: ForumConfig, storage: Arc<dyn LocalStorage>) -> anyhow::Result<()> {
    let srv = MockServer::new();
    let alice = forum(&srv, storage.clone(), config.clone());
    let bob = forum(&srv, storage, config);

    alice
        .session()
        .sign_up(NewUser {
            email: String::from("alice@example.org"),
            password: String::from("correct horse"),
            display_name: String::from("alice"),
        })
        .await
        .context("signing alice up")?;
    bob.session()
        .sign_up(NewUser {
            email: String::from("bob@example.org"),
            password: String::from("battery staple"),
            display_name: String::from("bob"),
        })
        .await
        .context("signing bob up")?;

    let topic = alice
        .create_topic(NewTopic {
            name: String::from("Web Development"),
            description: String::from("Everything about building for the web"),
            category: Category::Technology,
            rules: None,
        })
        .await
        .context("creating topic")?;
    println!("created topic {} at {}", topic.name, Route::Topic(topic.url_name.clone()));

    let dup = bob
        .create_topic(NewTopic {
            name: String::from("web development"),
            description: String::from("Another place for the web"),
            category: Category::Technology,
            rules: None,
        })
        .await;
    if let Err(err) = dup {
        tracing::info!(notice = %err.notice(), "duplicate topic refused");
    }

    let topic = bob.join_topic(&topic).await.context("joining topic")?;
    println!("{} now has {} members", topic.name, topic.member_count);

    let mut feed = alice.post_feed(FeedOrder::New, Some(&topic.id))?;
    alice
        .submit_post(NewPost {
            subject: String::from("Hello"),
            content: String::from("World"),
            topic_id: Some(topic.id.clone()),
            image: None,
        })
        .await
        .context("submitting post")?;
    let state = feed.wait_for(|s| s.items().map_or(false, |i| !i.is_empty())).await;
    let post = state
        .items()
        .and_then(|i| i.first())
        .cloned()
        .context("post never showed up in the feed")?;
    println!("{:?} by {}: {}", post.subject, post.author_name, format_votes(post.score()));

    let post = bob.vote_post(&post, VoteDirection::Up).await?;
    tracing::info!(score = post.score(), "bob upvoted");
    let post = bob.vote_post(&post, VoteDirection::Up).await?;
    tracing::info!(score = post.score(), "bob withdrew the upvote");
    let post = alice.vote_post(&post, VoteDirection::Down).await?;
    tracing::info!(score = post.score(), "alice switched to a downvote");
    println!("final score of {:?}: {}", post.subject, format_votes(post.score()));

    let trending = alice.discovery().trending_topics().await?;
    for t in trending {
        println!("trending: {} ({} members)", t.name, t.member_count);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let opt = <Opt as structopt::StructOpt>::from_args();

    match opt.cmd {
        Command::Slug { name } => println!("{}", slugify(&name)),
        Command::CheckTopic {
            name,
            description,
            rules,
        } => {
            let topic = NewTopic {
                name,
                description,
                category: Category::Technology,
                rules,
            };
            match topic.validate() {
                Ok(()) => println!("ok, URL name would be {}", topic.slug()),
                Err(err) => anyhow::bail!("invalid topic: {err}"),
            }
        }
        Command::Route { path } => match Route::parse(&path) {
            Some(route) => println!("{route:?}"),
            None => anyhow::bail!("no page at {path:?}"),
        },
        Command::Demo { storage } => {
            let config = load_config(opt.config.as_ref())?;
            let storage: Arc<dyn LocalStorage> = match storage {
                Some(path) => Arc::new(JsonFileStorage::open(path)?),
                None => Arc::new(MemoryStorage::new()),
            };
            demo(config, storage).await?;
        }
    }

    Ok(())
}
