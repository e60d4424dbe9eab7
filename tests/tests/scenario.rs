use agora_client::{FeedOrder, FeedState};
use tests::{
    api::{Category, Collection, Error as ApiError, NewComment, NewPost, NewTopic, Votable, VoteDirection},
    client::Error,
    World,
};

fn web_development(name: &str) -> NewTopic {
    NewTopic {
        name: String::from(name),
        description: String::from("Everything about building for the web"),
        category: Category::Technology,
        rules: None,
    }
}

#[tokio::test]
async fn two_users_share_a_topic() {
    let world = World::new();
    let (alice, a) = world.user("alice").await;
    let (bob, b) = world.user("bob").await;

    let topic = alice.create_topic(web_development("Web Development")).await.unwrap();
    assert_eq!(topic.url_name, "web-development");
    assert_eq!(topic.member_count, 1);
    assert!(topic.is_moderator(&a.id));

    let requests = world.srv.test_request_count();
    let dup = bob.create_topic(web_development("web development")).await;
    assert!(matches!(
        dup,
        Err(Error::Api(ApiError::SlugAlreadyUsed(ref s))) if s == "web-development"
    ));
    // Only the slug lookup went out
    assert_eq!(world.srv.test_request_count(), requests + 1);
    assert_eq!(world.documents(Collection::Topics).len(), 1);

    let mut feed = bob.post_feed(FeedOrder::New, Some(&topic.id)).unwrap();
    alice
        .submit_post(NewPost {
            subject: String::from("Hello"),
            content: String::from("World"),
            topic_id: Some(topic.id.clone()),
            image: None,
        })
        .await
        .unwrap();
    let state = feed
        .wait_for(|s| s.items().map_or(false, |i| !i.is_empty()))
        .await;
    let post = state.items().unwrap()[0].clone();
    assert_eq!(post.subject, "Hello");
    assert_eq!(post.author_name, "alice");
    assert_eq!(post.score(), 1);
    assert_eq!(post.vote_of(&a.id), Some(VoteDirection::Up));
    assert_eq!(post.votes().len(), 1);

    let post = bob.vote_post(&post, VoteDirection::Up).await.unwrap();
    assert_eq!(post.score(), 2);
    let post = bob.vote_post(&post, VoteDirection::Up).await.unwrap();
    assert_eq!(post.score(), 1);
    assert_eq!(post.vote_of(&b.id), None);
    let post = alice.vote_post(&post, VoteDirection::Down).await.unwrap();
    assert_eq!(post.score(), -1);
    assert_eq!(post.vote_of(&a.id), Some(VoteDirection::Down));

    // Everyone watching the feed ends up with the stored state
    let state = feed
        .wait_for(|s| s.items().map_or(false, |i| i.first().map(|p| p.score()) == Some(-1)))
        .await;
    let seen = &state.items().unwrap()[0];
    assert_eq!(seen.votes(), post.votes());

    let stored = world.srv.test_document(Collection::Topics, &topic.id.0).unwrap();
    assert_eq!(stored.get("postCount").and_then(|v| v.as_i64()), Some(1));
}

#[tokio::test]
async fn comments_follow_their_post() {
    let world = World::new();
    let (alice, _) = world.user("alice").await;
    let (bob, b) = world.user("bob").await;

    let post_id = alice
        .submit_post(NewPost {
            subject: String::from("Lunch"),
            content: String::from("Anyone?"),
            topic_id: None,
            image: None,
        })
        .await
        .unwrap();

    let mut comments = alice.comment_feed(&post_id);
    assert!(matches!(comments.loaded().await, FeedState::Ready(ref c) if c.is_empty()));

    for text in ["Sure", "  ", "Noon?"] {
        let res = bob
            .submit_comment(NewComment {
                post_id: post_id.clone(),
                content: String::from(text),
            })
            .await;
        assert_eq!(res.is_ok(), !text.trim().is_empty());
    }
    let state = comments
        .wait_for(|s| s.items().map_or(false, |c| c.len() == 2))
        .await;
    let comments = state.items().unwrap();
    assert_eq!(comments[0].content, "Noon?");
    assert!(comments.iter().all(|c| c.vote_of(&b.id) == Some(VoteDirection::Up)));

    let comment = alice.vote_comment(&comments[1], VoteDirection::Down).await.unwrap();
    assert_eq!(comment.score(), 0);

    let stored = world.srv.test_document(Collection::Posts, &post_id.0).unwrap();
    assert_eq!(stored.get("commentCount").and_then(|v| v.as_i64()), Some(2));
}

#[tokio::test]
async fn signed_out_clients_cannot_write() {
    let world = World::new();
    let (alice, _) = world.user("alice").await;
    let topic = alice.create_topic(web_development("Web Development")).await.unwrap();
    let anonymous = world.client();

    let requests = world.srv.test_request_count();
    let res = anonymous
        .submit_post(NewPost {
            subject: String::from("Hi"),
            content: String::from("there"),
            topic_id: None,
            image: None,
        })
        .await;
    assert!(matches!(res, Err(Error::Api(ApiError::NotAuthenticated))));
    assert!(matches!(
        anonymous.join_topic(&topic).await,
        Err(Error::Api(ApiError::NotAuthenticated))
    ));
    assert_eq!(world.srv.test_request_count(), requests);

    // Reading is fine though
    let mut feed = anonymous.post_feed(FeedOrder::Top, None).unwrap();
    assert!(matches!(feed.loaded().await, FeedState::Ready(_)));
}
