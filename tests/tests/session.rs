use std::{sync::Arc, time::Duration};

use agora_client::{ActivityEvent, Backend, Forum, ForumConfig, MemoryStorage};
use tests::{
    api::{Collection, Error as ApiError, FederatedProvider, IdentityProvider, Persistence},
    client::Error,
    email, World, PASSWORD,
};

#[tokio::test]
async fn sign_up_then_sign_in_elsewhere() {
    let world = World::new();
    let (alice, user) = world.user("alice").await;
    assert_eq!(user.name(), "alice");
    assert_eq!(world.srv.test_verification_emails(), vec![email("alice")]);

    let doc = world.srv.test_document(Collection::Users, &user.id.0).unwrap();
    assert_eq!(doc.get("displayName").and_then(|v| v.as_str()), Some("alice"));

    let laptop = world.client();
    let err = laptop.session().sign_in(&email("alice"), "nope!!").await.unwrap_err();
    assert!(err.notice().contains("auth/wrong-password"));
    let again = laptop.session().sign_in(&email("alice"), PASSWORD).await.unwrap();
    assert_eq!(again.id, user.id);

    // Signing out one device leaves the other one alone
    alice.session().sign_out().await.unwrap();
    assert!(alice.current_user().is_none());
    assert_eq!(laptop.current_user().map(|u| u.id), Some(user.id));
}

#[tokio::test]
async fn email_links_sign_in_without_password() {
    let world = World::new();
    let (_, user) = world.user("alice").await;

    let mut config = ForumConfig::default();
    config.features.email_link_sign_in = true;
    let phone = world.client_with(config);
    phone.session().send_sign_in_link(&email("alice")).await.unwrap();
    let link = world.srv.test_sign_in_link(&email("alice")).unwrap();
    assert!(link.starts_with(&phone.config().sign_in_link_url));

    let signed_in = phone.session().complete_sign_in_link(&link, None).await.unwrap();
    assert_eq!(signed_in.id, user.id);
    assert!(signed_in.email_verified);

    // Links are single-use
    let res = phone.session().complete_sign_in_link(&link, Some(&email("alice"))).await;
    assert!(matches!(res, Err(Error::Api(ApiError::Auth(_)))));

    // Disabled by default
    let res = world.client().session().send_sign_in_link(&email("alice")).await;
    assert!(matches!(res, Err(Error::Api(ApiError::FeatureDisabled(_)))));
}

#[tokio::test]
async fn federated_sign_in_creates_the_user_once() {
    let world = World::new();
    world.srv.set_federated_account("carol@example.org", "Carol");

    let forum = world.client();
    let carol = forum.session().sign_in_federated(FederatedProvider::Google).await.unwrap();
    assert_eq!(carol.name(), "Carol");
    let doc = world.srv.test_document(Collection::Users, &carol.id.0).unwrap();

    forum.session().sign_out().await.unwrap();
    let again = forum.session().sign_in_federated(FederatedProvider::Google).await.unwrap();
    assert_eq!(again.id, carol.id);
    assert_eq!(world.srv.test_document(Collection::Users, &carol.id.0), Some(doc));

    let mut config = ForumConfig::default();
    config.features.federated_sign_in = false;
    let res = world
        .client_with(config)
        .session()
        .sign_in_federated(FederatedProvider::Google)
        .await;
    assert!(matches!(res, Err(Error::Api(ApiError::FeatureDisabled(_)))));
}

#[tokio::test]
async fn stale_sessions_expire_on_start_up() {
    let world = World::new();
    let (alice, user) = world.user("alice").await;
    let now = chrono::Utc::now();

    assert!(alice.session().check_session(now).await.unwrap());
    alice
        .session()
        .record_activity(&user, now - chrono::Duration::hours(2));
    assert!(!alice.session().check_session(now).await.unwrap());
    assert!(alice.current_user().is_none());
    assert!(alice.session().last_activity(&user).is_none());
}

#[tokio::test(start_paused = true)]
async fn idle_users_get_signed_out() {
    let world = World::new();
    let mut config = ForumConfig::default();
    config.inactivity_timeout_secs = 60;
    let forum = world.client_with(config);
    forum.session().sign_up(tests::new_user("alice")).await.unwrap();

    let timeout = forum.start_session_timeout();
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_secs(45)).await;
        timeout.activity(ActivityEvent::Touch);
    }
    assert!(forum.current_user().is_some());
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(forum.current_user().is_none());
}

#[tokio::test]
async fn persistence_mode_reaches_the_provider() {
    let world = World::new();
    world.user("alice").await;

    let config = ForumConfig::default()
        .with_vars(|v| (v == "AGORA_PERSISTENCE").then(|| String::from("session")))
        .unwrap();
    let identity = Arc::new(world.srv.identity());
    let backend = Backend {
        identity: identity.clone(),
        ..world.backend()
    };
    let forum = Forum::new(backend, Arc::new(MemoryStorage::new()), config);
    assert_eq!(identity.persistence(), Persistence::Durable);
    forum.session().sign_in(&email("alice"), PASSWORD).await.unwrap();
    assert_eq!(identity.persistence(), Persistence::Session);

    // The default keeps users signed in across restarts
    let identity = Arc::new(world.srv.identity());
    identity.set_persistence(Persistence::Session).await.unwrap();
    let backend = Backend {
        identity: identity.clone(),
        ..world.backend()
    };
    let forum = Forum::new(backend, Arc::new(MemoryStorage::new()), ForumConfig::default());
    forum.session().sign_in(&email("alice"), PASSWORD).await.unwrap();
    assert_eq!(identity.persistence(), Persistence::Durable);
}
