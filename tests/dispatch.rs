//! Dispatcher integration tests: authorization gates, preview handling,
//! redirect semantics and notification handoff, against in-memory sqlite.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::sync::Mutex;

use forumd::config::DiscussionConfig;
use forumd::db;
use forumd::dispatch::{Dispatcher, DiscussionRequest, FormFields, Outcome};
use forumd::entity::message::REPLY_TO_TOPIC;
use forumd::entity::{forum, topic};
use forumd::error::AppError;
use forumd::modes::Surface;
use forumd::notify::{Mailer, Notification};
use forumd::permission::{Capability, CapabilitySource, IdentityDirectory};
use forumd::render::PlainRenderer;
use forumd::repository;
use forumd::session::MemorySession;

// ---------------------------------------------------------------------------
// Collaborator stubs
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StaticCaps {
    grants: HashMap<String, Vec<Capability>>,
}

impl StaticCaps {
    fn grant(mut self, user: &str, caps: &[Capability]) -> Self {
        self.grants.insert(user.to_string(), caps.to_vec());
        self
    }
}

#[async_trait]
impl CapabilitySource for StaticCaps {
    async fn has_capability(&self, subject: &str, capability: Capability) -> bool {
        self.grants
            .get(subject)
            .map_or(false, |caps| caps.contains(&capability))
    }
}

struct StaticDirectory;

#[async_trait]
impl IdentityDirectory for StaticDirectory {
    async fn known_users(&self) -> forumd::error::AppResult<Vec<String>> {
        Ok(vec!["alice".to_string(), "bob".to_string()])
    }
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn deliver(&self, _notification: Notification) -> anyhow::Result<()> {
        anyhow::bail!("delivery backend down")
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    db: DatabaseConnection,
    caps: StaticCaps,
    viewer: MemorySession,
    mailer: RecordingMailer,
    discussion: DiscussionConfig,
}

impl Fixture {
    async fn new(caps: StaticCaps) -> Self {
        Self {
            db: db::connect("sqlite::memory:").await.unwrap(),
            caps,
            viewer: MemorySession::default(),
            mailer: RecordingMailer::default(),
            discussion: DiscussionConfig::default(),
        }
    }

    fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher {
            db: &self.db,
            caps: &self.caps,
            directory: &StaticDirectory,
            viewer: &self.viewer,
            renderer: &PlainRenderer,
            mailer: &self.mailer,
            discussion: &self.discussion,
        }
    }

    async fn seed_forum(&self, moderators: &[&str]) -> forum::Model {
        let moderators: Vec<String> = moderators.iter().map(|m| m.to_string()).collect();
        repository::add_forum(&self.db, "general", "admin", "s", "d", &moderators, 0, 100)
            .await
            .unwrap()
    }

    async fn seed_topic(&self, forum_id: i64, author: &str) -> topic::Model {
        repository::add_topic(&self.db, forum_id, "subject", author, "body", 200)
            .await
            .unwrap()
    }
}

fn request(surface: Surface, authname: &str, action: Option<&str>) -> DiscussionRequest {
    DiscussionRequest {
        surface,
        action: action.map(str::to_string),
        preview: false,
        authname: authname.to_string(),
        path: "/discussion".to_string(),
        group_id: None,
        forum_id: None,
        topic_id: None,
        message_id: None,
        form: FormFields::default(),
    }
}

fn render_view(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Render { view, .. } => view,
        Outcome::Redirect { .. } => panic!("expected a render outcome"),
    }
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn append_holder_may_add_but_not_edit_foreign_topic() {
    let caps = StaticCaps::default().grant(
        "bob",
        &[Capability::View, Capability::Append],
    );
    let fx = Fixture::new(caps).await;
    let f = fx.seed_forum(&[]).await;
    let t = fx.seed_topic(f.id, "alice").await;

    // topic-add is open to any APPEND holder
    let mut add = request(Surface::Standalone, "bob", Some("add"));
    add.forum_id = Some(f.id);
    let outcome = fx.dispatcher().process(&add).await.unwrap();
    assert_eq!(render_view(outcome), "topic-add");

    // editing someone else's topic is not
    let mut edit = request(Surface::Standalone, "bob", Some("post-edit"));
    edit.forum_id = Some(f.id);
    edit.topic_id = Some(t.id);
    edit.form.subject = Some("hijacked".to_string());
    let err = fx.dispatcher().process(&edit).await.unwrap_err();
    assert!(matches!(err, AppError::ModerationRequired(_)));

    // and nothing was written
    let unchanged = repository::get_topic(&fx.db, t.id).await.unwrap().unwrap();
    assert_eq!(unchanged.subject, "subject");
}

#[tokio::test]
async fn author_may_edit_own_topic() {
    let caps = StaticCaps::default().grant("alice", &[Capability::Append]);
    let fx = Fixture::new(caps).await;
    let f = fx.seed_forum(&[]).await;
    let t = fx.seed_topic(f.id, "alice").await;

    let mut edit = request(Surface::Standalone, "alice", Some("post-edit"));
    edit.forum_id = Some(f.id);
    edit.topic_id = Some(t.id);
    edit.form.subject = Some("corrected".to_string());
    edit.form.body = Some("new body".to_string());

    let outcome = fx.dispatcher().process(&edit).await.unwrap();
    assert!(matches!(outcome, Outcome::Redirect { .. }));

    let edited = repository::get_topic(&fx.db, t.id).await.unwrap().unwrap();
    assert_eq!(edited.subject, "corrected");
    assert_eq!(edited.body, "new body");
}

#[tokio::test]
async fn missing_capability_is_distinct_from_missing_moderation() {
    let caps = StaticCaps::default()
        .grant("nobody", &[])
        .grant("appender", &[Capability::View, Capability::Append, Capability::Moderate]);
    let fx = Fixture::new(caps).await;
    let f = fx.seed_forum(&[]).await;
    let t = fx.seed_topic(f.id, "alice").await;

    // no VIEW at all
    let list = request(Surface::Standalone, "nobody", None);
    let err = fx.dispatcher().process(&list).await.unwrap_err();
    assert!(matches!(err, AppError::CapabilityRequired(Capability::View)));

    // MODERATE capability alone is not moderator standing on this forum
    let mut delete = request(Surface::Standalone, "appender", Some("delete"));
    delete.forum_id = Some(f.id);
    delete.topic_id = Some(t.id);
    let err = fx.dispatcher().process(&delete).await.unwrap_err();
    assert!(matches!(err, AppError::ModerationRequired(_)));
    assert!(repository::get_topic(&fx.db, t.id).await.unwrap().is_some());
}

#[tokio::test]
async fn forum_moderator_may_delete_topic() {
    let caps = StaticCaps::default().grant(
        "mod",
        &[Capability::View, Capability::Append, Capability::Moderate],
    );
    let fx = Fixture::new(caps).await;
    let f = fx.seed_forum(&["mod"]).await;
    let t = fx.seed_topic(f.id, "alice").await;
    repository::add_message(&fx.db, f.id, t.id, REPLY_TO_TOPIC, "bob", "m", 210)
        .await
        .unwrap();

    let mut delete = request(Surface::Standalone, "mod", Some("delete"));
    delete.forum_id = Some(f.id);
    delete.topic_id = Some(t.id);

    let outcome = fx.dispatcher().process(&delete).await.unwrap();
    assert!(matches!(outcome, Outcome::Redirect { .. }));
    assert!(repository::get_topic(&fx.db, t.id).await.unwrap().is_none());
    assert!(repository::list_messages(&fx.db, t.id, true)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn admin_counts_as_moderator_everywhere() {
    let caps = StaticCaps::default().grant(
        "root",
        &[Capability::Moderate, Capability::Admin],
    );
    let fx = Fixture::new(caps).await;
    let f = fx.seed_forum(&[]).await; // no listed moderators
    let t = fx.seed_topic(f.id, "alice").await;

    let mut delete = request(Surface::Standalone, "root", Some("delete"));
    delete.forum_id = Some(f.id);
    delete.topic_id = Some(t.id);

    let outcome = fx.dispatcher().process(&delete).await.unwrap();
    assert!(matches!(outcome, Outcome::Redirect { .. }));
    assert!(repository::get_topic(&fx.db, t.id).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Preview and redirect semantics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preview_suppresses_topic_creation() {
    let caps = StaticCaps::default().grant("alice", &[Capability::View, Capability::Append]);
    let fx = Fixture::new(caps).await;
    let f = fx.seed_forum(&[]).await;

    let mut preview = request(Surface::Standalone, "alice", Some("post-add"));
    preview.forum_id = Some(f.id);
    preview.preview = true;
    preview.form.subject = Some("draft".to_string());
    preview.form.body = Some("draft body".to_string());

    let outcome = fx.dispatcher().process(&preview).await.unwrap();
    // collapses to the re-rendered add form, nothing persisted
    assert_eq!(render_view(outcome), "topic-add");
    assert_eq!(repository::count_topics(&fx.db, f.id).await.unwrap(), 0);
    assert!(fx.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn topic_creation_redirects_and_notifies() {
    let caps = StaticCaps::default().grant("alice", &[Capability::View, Capability::Append]);
    let fx = Fixture::new(caps).await;
    let f = fx.seed_forum(&[]).await;

    let mut add = request(Surface::Standalone, "alice", Some("post-add"));
    add.forum_id = Some(f.id);
    add.path = "/discussion/1".to_string();
    add.form.subject = Some("fresh".to_string());
    add.form.body = Some("hello".to_string());

    let outcome = fx.dispatcher().process(&add).await.unwrap();
    match outcome {
        Outcome::Redirect { location } => assert_eq!(location, "/discussion/1"),
        Outcome::Render { .. } => panic!("mutation must redirect"),
    }

    assert_eq!(repository::count_topics(&fx.db, f.id).await.unwrap(), 1);

    let sent = fx.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let notification = &sent[0];
    assert!(notification.subject.ends_with("fresh"));
    assert_eq!(notification.to, vec!["alice".to_string()]);
    let message_id = notification
        .headers
        .iter()
        .find(|(name, _)| name == "Message-ID")
        .unwrap();
    assert!(message_id.1.contains(&format!("{}.", f.id)));
}

#[tokio::test]
async fn embedded_message_add_skips_redirect() {
    let caps = StaticCaps::default().grant("bob", &[Capability::View, Capability::Append]);
    let fx = Fixture::new(caps).await;
    let f = fx.seed_forum(&[]).await;
    let t = fx.seed_topic(f.id, "alice").await;

    let mut add = request(Surface::Embedded, "bob", Some("post-add"));
    add.forum_id = Some(f.id);
    add.topic_id = Some(t.id);
    add.form.body = Some("embedded reply".to_string());

    let outcome = fx.dispatcher().process(&add).await.unwrap();
    match outcome {
        Outcome::Render { view, payload } => {
            assert_eq!(view, "embedded-message-list");
            // the just-created message shows up in the listing
            let messages = payload.messages.expect("message listing present");
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].author, "bob");
        }
        Outcome::Redirect { .. } => panic!("embedded mutations must not redirect"),
    }

    assert_eq!(fx.mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn standalone_message_add_redirects_and_threads() {
    let caps = StaticCaps::default().grant("bob", &[Capability::View, Capability::Append]);
    let fx = Fixture::new(caps).await;
    let f = fx.seed_forum(&[]).await;
    let t = fx.seed_topic(f.id, "alice").await;
    let parent = repository::add_message(&fx.db, f.id, t.id, REPLY_TO_TOPIC, "alice", "root", 210)
        .await
        .unwrap();

    let mut reply = request(Surface::Standalone, "bob", Some("post-add"));
    reply.forum_id = Some(f.id);
    reply.topic_id = Some(t.id);
    reply.message_id = Some(parent.id);
    reply.form.body = Some("nested".to_string());

    let outcome = fx.dispatcher().process(&reply).await.unwrap();
    assert!(matches!(outcome, Outcome::Redirect { .. }));

    let messages = repository::list_messages(&fx.db, t.id, true).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].replyto, parent.id);

    // the reply notification threads under its parent
    let sent = fx.mailer.sent.lock().unwrap();
    let in_reply_to = sent[0]
        .headers
        .iter()
        .find(|(name, _)| name == "In-Reply-To")
        .unwrap();
    assert!(in_reply_to.1.contains(&format!(".{}@", parent.id)));
}

#[tokio::test]
async fn notification_failure_does_not_surface() {
    let caps = StaticCaps::default().grant("alice", &[Capability::View, Capability::Append]);
    let fx = Fixture::new(caps).await;
    let f = fx.seed_forum(&[]).await;

    let dispatcher = Dispatcher {
        mailer: &FailingMailer,
        ..fx.dispatcher()
    };

    let mut add = request(Surface::Standalone, "alice", Some("post-add"));
    add.forum_id = Some(f.id);
    add.form.subject = Some("still created".to_string());
    add.form.body = Some("body".to_string());

    let outcome = dispatcher.process(&add).await.unwrap();
    assert!(matches!(outcome, Outcome::Redirect { .. }));
    // the creation committed even though delivery failed
    assert_eq!(repository::count_topics(&fx.db, f.id).await.unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Resolution leniency and listings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dangling_topic_id_degrades_to_forum_list() {
    let caps = StaticCaps::default().grant("alice", &[Capability::View]);
    let fx = Fixture::new(caps).await;
    fx.seed_forum(&[]).await;

    let mut list = request(Surface::Standalone, "alice", None);
    list.topic_id = Some(4242); // resolves to nothing

    let outcome = fx.dispatcher().process(&list).await.unwrap();
    assert_eq!(render_view(outcome), "forum-list");
}

#[tokio::test]
async fn message_listing_marks_new_and_respects_display() {
    let caps = StaticCaps::default().grant("alice", &[Capability::View]);
    let fx = Fixture::new(caps).await;
    let f = fx.seed_forum(&[]).await;
    let t = fx.seed_topic(f.id, "alice").await;
    for time in [300, 400, 500] {
        repository::add_message(&fx.db, f.id, t.id, REPLY_TO_TOPIC, "bob", "m", time)
            .await
            .unwrap();
    }
    // viewer saw the topic after the first message
    fx.viewer_record(t.id, 350).await;

    let mut list = request(Surface::Standalone, "alice", None);
    list.forum_id = Some(f.id);
    list.topic_id = Some(t.id);

    let outcome = fx.dispatcher().process(&list).await.unwrap();
    let payload = match outcome {
        Outcome::Render { view, payload } => {
            assert_eq!(view, "message-list");
            payload
        }
        _ => panic!("expected render"),
    };
    let messages = payload.messages.unwrap();
    assert_eq!(messages.len(), 3);
    assert!(!messages[0].new);
    assert!(messages[1].new);
    assert!(messages[2].new);
    assert_eq!(payload.display, Some("threaded"));
}

impl Fixture {
    async fn viewer_record(&self, topic_id: i64, time: i64) {
        use forumd::session::ViewerSession;
        self.viewer.record_visit(topic_id, time).await.unwrap();
    }
}

#[tokio::test]
async fn set_display_switches_to_flat_descending() {
    let caps = StaticCaps::default().grant("alice", &[Capability::View]);
    let fx = Fixture::new(caps).await;
    let f = fx.seed_forum(&[]).await;
    let t = fx.seed_topic(f.id, "alice").await;
    let m1 = repository::add_message(&fx.db, f.id, t.id, REPLY_TO_TOPIC, "bob", "first", 300)
        .await
        .unwrap();
    repository::add_message(&fx.db, f.id, t.id, m1.id, "carol", "second", 400)
        .await
        .unwrap();

    let mut set = request(Surface::Standalone, "alice", Some("set-display"));
    set.forum_id = Some(f.id);
    set.topic_id = Some(t.id);
    set.form.display = Some("flat-desc".to_string());

    let outcome = fx.dispatcher().process(&set).await.unwrap();
    let payload = match outcome {
        Outcome::Render { view, payload } => {
            assert_eq!(view, "message-list");
            payload
        }
        _ => panic!("expected render"),
    };
    assert_eq!(payload.display, Some("flat-desc"));
    let messages = payload.messages.unwrap();
    let times: Vec<i64> = messages.iter().map(|m| m.time).collect();
    assert_eq!(times, vec![400, 300]);
    // flat listings carry no nesting
    assert!(messages.iter().all(|m| m.replies.is_empty()));
}

#[tokio::test]
async fn admin_group_listing_includes_synthetic_bucket() {
    let caps = StaticCaps::default().grant("root", &[Capability::Admin]);
    let fx = Fixture::new(caps).await;
    repository::add_group(&fx.db, "projects", "d").await.unwrap();
    fx.seed_forum(&[]).await; // ungrouped

    let list = request(Surface::Admin, "root", None);
    let outcome = fx.dispatcher().process(&list).await.unwrap();
    let payload = match outcome {
        Outcome::Render { view, payload } => {
            assert_eq!(view, "admin-group-list");
            payload
        }
        _ => panic!("expected render"),
    };
    let groups = payload.groups.unwrap();
    assert_eq!(groups[0].id, 0);
    assert_eq!(groups[0].forums, Some(1));
    assert_eq!(groups.len(), 2);
}

#[tokio::test]
async fn bulk_forum_delete_from_admin_panel() {
    let caps = StaticCaps::default().grant("root", &[Capability::Admin]);
    let fx = Fixture::new(caps).await;
    let g = repository::add_group(&fx.db, "projects", "d").await.unwrap();
    let f1 = fx.seed_forum(&[]).await;
    let f2 = repository::add_forum(&fx.db, "second", "admin", "s", "d", &[], g.id, 100)
        .await
        .unwrap();

    let mut delete = request(Surface::Admin, "root", Some("delete"));
    delete.group_id = Some(g.id);
    delete.form.selection = vec![f1.id, f2.id];

    let outcome = fx.dispatcher().process(&delete).await.unwrap();
    assert!(matches!(outcome, Outcome::Redirect { .. }));
    assert!(repository::get_forum(&fx.db, f1.id).await.unwrap().is_none());
    assert!(repository::get_forum(&fx.db, f2.id).await.unwrap().is_none());
}

#[tokio::test]
async fn topic_move_updates_messages_through_dispatcher() {
    let caps = StaticCaps::default().grant(
        "mod",
        &[Capability::View, Capability::Moderate],
    );
    let fx = Fixture::new(caps).await;
    let from = fx.seed_forum(&["mod"]).await;
    let to = repository::add_forum(&fx.db, "target", "admin", "s", "d", &[], 0, 100)
        .await
        .unwrap();
    let t = fx.seed_topic(from.id, "alice").await;
    repository::add_message(&fx.db, from.id, t.id, REPLY_TO_TOPIC, "bob", "m", 210)
        .await
        .unwrap();

    let mut mv = request(Surface::Standalone, "mod", Some("post-move"));
    mv.forum_id = Some(from.id);
    mv.topic_id = Some(t.id);
    mv.form.new_forum = Some(to.id);

    let outcome = fx.dispatcher().process(&mv).await.unwrap();
    assert!(matches!(outcome, Outcome::Redirect { .. }));

    let moved = repository::get_topic(&fx.db, t.id).await.unwrap().unwrap();
    assert_eq!(moved.forum, to.id);
    let messages = repository::list_messages(&fx.db, t.id, true).await.unwrap();
    assert!(messages.iter().all(|m| m.forum == to.id));
}
