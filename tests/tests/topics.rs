use agora_client::{FeedOrder, FeedState, ForumConfig, TopicSort};
use tests::{
    api::{Category, Collection, Error as ApiError, IndexSpec, NewPost, NewTopic},
    client::Error,
    World,
};

fn new_topic(name: &str, description: &str, category: Category) -> NewTopic {
    NewTopic {
        name: String::from(name),
        description: String::from(description),
        category,
        rules: None,
    }
}

#[tokio::test]
async fn member_count_follows_joins_and_leaves() {
    let world = World::new();
    let (alice, a) = world.user("alice").await;
    let topic = alice
        .create_topic(new_topic("Gardening", "Plants, soil and patience", Category::Lifestyle))
        .await
        .unwrap();

    let mut others = Vec::new();
    for name in ["bob", "carol", "dave", "erin", "frank"] {
        let (forum, user) = world.user(name).await;
        let fresh = forum.discovery().topic("gardening").await.unwrap();
        let joined = forum.join_topic(&fresh).await.unwrap();
        assert!(joined.is_member(&user.id));
        // Joining again with an up-to-date view changes nothing
        let fresh = forum.discovery().topic(&topic.id.0).await.unwrap();
        assert_eq!(forum.join_topic(&fresh).await.unwrap(), fresh);
        others.push(forum);
    }
    for forum in &others[..2] {
        let fresh = forum.discovery().topic("gardening").await.unwrap();
        let left = forum.toggle_membership(&fresh).await.unwrap();
        assert_eq!(left.member_count, fresh.member_count - 1);
    }

    let stored = alice.discovery().topic("gardening").await.unwrap();
    assert_eq!(stored.member_count, 1 + 5 - 2);
    assert_eq!(stored.members.len(), 4);
    assert!(stored.is_member(&a.id));

    assert!(matches!(
        alice.leave_topic(&stored).await,
        Err(Error::Api(ApiError::PermissionDenied))
    ));
}

#[tokio::test]
async fn topic_feed_waits_for_its_index() {
    let world = World::new();
    world.srv.require_indexes();
    let (alice, _) = world.user("alice").await;
    let topic = alice
        .create_topic(new_topic("Chess", "Openings, endgames and puzzles", Category::Gaming))
        .await
        .unwrap();
    alice
        .submit_post(NewPost {
            subject: String::from("Sicilian"),
            content: String::from("Thoughts?"),
            topic_id: Some(topic.id.clone()),
            image: None,
        })
        .await
        .unwrap();

    let mut feed = alice.post_feed(FeedOrder::New, Some(&topic.id)).unwrap();
    let state = feed.loaded().await;
    assert!(matches!(state, FeedState::IndexBuilding));
    assert!(state.items().is_none());

    // The front page needs no composite index
    let mut front = alice.post_feed(FeedOrder::Top, None).unwrap();
    assert!(matches!(front.loaded().await, FeedState::Ready(ref p) if p.len() == 1));

    world.srv.provision_index(IndexSpec {
        collection: Collection::Posts,
        fields: vec![String::from("topicId"), String::from("createdAt")],
    });
    let mut feed = alice.post_feed(FeedOrder::New, Some(&topic.id)).unwrap();
    match feed.loaded().await {
        FeedState::Ready(posts) => assert_eq!(posts[0].subject, "Sicilian"),
        state => panic!("unexpected feed state {state:?}"),
    }
}

#[tokio::test]
async fn search_remembers_recent_queries() {
    let world = World::new();
    let (alice, _) = world.user("alice").await;
    for (name, category) in [
        ("Rust Programming", Category::Technology),
        ("Rusty Cars", Category::Lifestyle),
        ("Astronomy", Category::Science),
    ] {
        alice
            .create_topic(new_topic(name, "A place to talk about it", category))
            .await
            .unwrap();
    }

    let (bob, _) = world.user("bob").await;
    let found = bob.search_topics("rust", None, TopicSort::Relevance).await.unwrap();
    assert_eq!(found.len(), 2);
    let found = bob
        .search_topics("RUST", Some(Category::Technology), TopicSort::Recent)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].url_name, "rust-programming");
    bob.search_topics("stars", None, TopicSort::Members).await.unwrap();

    let history = bob.search_history().unwrap();
    assert_eq!(history.entries(), vec!["stars", "RUST", "rust"]);
    // History is kept per user
    assert!(alice.search_history().unwrap().entries().is_empty());
    assert!(matches!(
        world.client().search_history(),
        Err(Error::Api(ApiError::NotAuthenticated))
    ));
}

#[tokio::test]
async fn profiles_list_topics_and_posts() {
    let world = World::new();
    let (alice, _) = world.user("alice").await;
    alice
        .create_topic(new_topic("Astronomy", "Stars, planets and telescopes", Category::Science))
        .await
        .unwrap();
    for subject in ["First", "Second"] {
        alice
            .submit_post(NewPost {
                subject: String::from(subject),
                content: String::from("..."),
                topic_id: None,
                image: None,
            })
            .await
            .unwrap();
    }

    let visitor = world.client();
    let profile = visitor.discovery().profile("alice").await.unwrap();
    assert_eq!(profile.topics.len(), 1);
    let subjects = profile
        .recent_posts
        .iter()
        .map(|p| p.subject.as_str())
        .collect::<Vec<_>>();
    assert_eq!(subjects, vec!["Second", "First"]);
}

#[tokio::test]
async fn topics_can_be_switched_off() {
    let world = World::new();
    let (alice, _) = world.user("alice").await;
    let topic = alice
        .create_topic(new_topic("Astronomy", "Stars, planets and telescopes", Category::Science))
        .await
        .unwrap();

    let mut config = ForumConfig::default();
    config.features.topics = false;
    let plain = world.client_with(config);
    plain.session().sign_in(&tests::email("alice"), tests::PASSWORD).await.unwrap();

    let disabled = |res: Result<_, Error>| matches!(res, Err(Error::Api(ApiError::FeatureDisabled(_))));
    assert!(disabled(
        plain
            .create_topic(new_topic("Chess", "Openings and endgames", Category::Gaming))
            .await
            .map(|_| ())
    ));
    assert!(disabled(plain.join_topic(&topic).await.map(|_| ())));
    assert!(disabled(plain.post_feed(FeedOrder::Hot, Some(&topic.id)).map(|_| ())));
    assert!(plain.post_feed(FeedOrder::Hot, None).is_ok());
}
