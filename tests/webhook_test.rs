//! End-to-end update processing over in-memory stores

mod helpers;

use assert_matches::assert_matches;
use helpers::*;

use TodoBridge::handlers::ProcessOutcome;
use TodoBridge::models::{ContextRole, GroupRole, GroupStatus, SyncStatus, TaskStatus};
use TodoBridge::services::telegram::{ButtonAction, MemberRole, MessageRef, ReplyMarkup};

#[tokio::test]
async fn test_duplicate_update_is_processed_once() {
    let ctx = TestContext::new();
    let update = private_message(1, 10, tg_user(42, "ann", "Ann"), "buy milk");

    let first = ctx.processor.process(&update).await.unwrap();
    let second = ctx.processor.process(&update).await.unwrap();

    assert_eq!(first, ProcessOutcome::Processed);
    assert_eq!(second, ProcessOutcome::Duplicate);
    assert_eq!(ctx.db.all_tasks().len(), 1);
    assert_eq!(ctx.db.update_count(), 1);
    assert_eq!(ctx.chat.sent_to(42).len(), 1);
}

#[tokio::test]
async fn test_private_text_creates_local_task() {
    let ctx = TestContext::new();
    ctx.process_all(&[private_message(1, 10, tg_user(42, "ann", "Ann"), "buy milk")])
        .await;

    let task = ctx.db.task(ctx.only_task_id());
    let ann = ctx.db.user_by_tg(42).expect("user registered");
    assert_eq!(task.title, "buy milk");
    assert_eq!(task.status, TaskStatus::ToDo);
    assert_eq!(task.sync_status, SyncStatus::Pending);
    assert_eq!(task.creator_id, Some(ann.id));
    assert_eq!(task.group_id, None);
    assert_eq!(task.database_id, None);
    assert!(task.is_assignee(ann.id));

    // no Notion connection, so nothing is synced and the reply points at settings
    ctx.drain_sync().await;
    assert!(ctx.notion.created().is_empty());

    let sent = ctx.chat.sent_to(42);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "✅ Task created: buy milk");
    assert_eq!(sent[0].reply_to, Some(10));
    assert_matches!(&sent[0].markup, Some(ReplyMarkup::Inline(rows)) if rows[0][0].text == "⚙️ Settings");
}

#[tokio::test]
async fn test_group_todo_assigns_captures_context_and_syncs() {
    let ctx = TestContext::new();
    let alice = ctx.connected_user(1, "alice", "Alice", None);
    let bob = ctx.db.insert_user(3, Some("bob"), "Bob");
    ctx.db.insert_group(GROUP_ID, "Team", Some("db-team"), &ctx.encrypted_token());

    ctx.process_all(&[
        group_message(1, 10, GROUP_ID, tg_user(3, "bob", "Bob"), "deploy is red"),
        group_message(2, 11, GROUP_ID, tg_user(1, "alice", "Alice"), "/todo fix deploy @bob @carol"),
    ])
    .await;

    let task_id = ctx.only_task_id();
    let task = ctx.db.task(task_id);
    assert_eq!(task.title, "fix deploy");
    assert_eq!(task.creator_id, Some(alice.id));
    assert_eq!(task.group_id, Some(GROUP_ID));
    assert_eq!(task.database_id.as_deref(), Some("db-team"));
    assert_eq!(task.chat_jump_url, "https://t.me/c/1234567890/11");
    assert!(task.is_assignee(bob.id));
    assert!(!task.is_assignee(alice.id));

    let pending = ctx.db.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].tg_username, "carol");

    let roles: Vec<(ContextRole, &str)> = task.snapshots.iter().map(|s| (s.role, s.text.as_str())).collect();
    assert_eq!(
        roles,
        vec![
            (ContextRole::Other, "deploy is red"),
            (ContextRole::Me, "/todo fix deploy @bob @carol"),
        ]
    );

    // group confirmation mentions everyone involved, bob hears about it privately
    let group_replies = ctx.chat.sent_to(GROUP_ID);
    assert_eq!(group_replies.len(), 1);
    assert!(group_replies[0].text.contains("✅ Task created: fix deploy"));
    assert!(group_replies[0].text.contains("@bob @carol please"));
    assert_eq!(group_replies[0].markup, None);
    assert!(ctx.chat.sent_to(3)[0].text.contains("You have been assigned a task"));
    assert!(ctx.chat.sent_to(1).is_empty());

    ctx.drain_sync().await;
    let created = ctx.notion.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].database_id, "db-team");
    assert_eq!(created[0].title, "fix deploy");
    assert_eq!(created[0].status, "To Do");
    assert_eq!(ctx.notion.tokens(), vec![NOTION_TOKEN.to_string()]);

    let synced = ctx.db.task(task_id);
    assert_eq!(synced.sync_status, SyncStatus::Synced);
    assert_eq!(synced.notion_page_id.as_deref(), Some("page-1"));
    assert_eq!(synced.notion_url.as_deref(), Some("https://notion.so/page-1"));
}

#[tokio::test]
async fn test_pending_assignment_is_claimed_on_first_contact() {
    let ctx = TestContext::new();
    ctx.process_all(&[group_message(1, 10, GROUP_ID, tg_user(1, "alice", "Alice"), "/todo review @Carol")])
        .await;
    assert_eq!(ctx.db.pending().len(), 1);

    ctx.process_all(&[private_message(2, 20, tg_user(5, "carol", "Carol"), "/help")])
        .await;

    let carol = ctx.db.user_by_tg(5).expect("carol registered");
    let task = ctx.db.task(ctx.only_task_id());
    assert!(task.is_assignee(carol.id));
    assert!(ctx.db.pending().is_empty());
}

#[tokio::test]
async fn test_pending_assignment_needs_the_exact_username() {
    let ctx = TestContext::new();
    ctx.process_all(&[group_message(1, 10, GROUP_ID, tg_user(1, "alice", "Alice"), "/todo review @bobax")])
        .await;

    // `_` must not act as a wildcard
    ctx.process_all(&[private_message(2, 20, tg_user(6, "bob_x", "Bob"), "/help")])
        .await;
    let bob = ctx.db.user_by_tg(6).expect("bob registered");
    assert!(!ctx.db.task(ctx.only_task_id()).is_assignee(bob.id));
    assert_eq!(ctx.db.pending().len(), 1);

    ctx.process_all(&[private_message(3, 30, tg_user(7, "BobAx", "Real Bob"), "/help")])
        .await;
    let real = ctx.db.user_by_tg(7).expect("real bob registered");
    assert!(ctx.db.task(ctx.only_task_id()).is_assignee(real.id));
    assert!(ctx.db.pending().is_empty());
}

#[tokio::test]
async fn test_reply_with_bot_mention_uses_replied_text() {
    let ctx = TestContext::new();
    let update = as_reply(
        group_message(1, 12, GROUP_ID, tg_user(1, "alice", "Alice"), "@todo_bot"),
        7,
        "renew the TLS certificate",
    );
    ctx.process_all(&[update]).await;

    let task = ctx.db.task(ctx.only_task_id());
    assert_eq!(task.title, "renew the TLS certificate");
    assert_eq!(task.chat_jump_url, "https://t.me/c/1234567890/7");
}

#[tokio::test]
async fn test_forum_thread_is_kept_as_topic() {
    let ctx = TestContext::new();
    let update = in_thread(group_message(1, 12, GROUP_ID, tg_user(1, "alice", "Alice"), "/todo triage"), 77);
    ctx.process_all(&[update]).await;

    let task = ctx.db.task(ctx.only_task_id());
    assert_eq!(task.topic.as_deref(), Some("77"));

    // replies quote the message, which already places them in the thread
    let reply = &ctx.chat.sent_to(GROUP_ID)[0];
    assert_eq!(reply.reply_to, Some(12));
    assert_eq!(reply.effective_thread(), None);
}

#[tokio::test]
async fn test_empty_todo_is_rejected() {
    let ctx = TestContext::new();
    ctx.process_all(&[group_message(1, 10, GROUP_ID, tg_user(1, "alice", "Alice"), "/todo")])
        .await;

    assert!(ctx.db.all_tasks().is_empty());
    assert_eq!(ctx.chat.sent_to(GROUP_ID)[0].text, "⚠️ Task content cannot be empty.");
}

#[tokio::test]
async fn test_group_chatter_and_foreign_commands_are_ignored() {
    let ctx = TestContext::new();
    ctx.process_all(&[
        group_message(1, 10, GROUP_ID, tg_user(1, "alice", "Alice"), "lunch anyone?"),
        group_message(2, 11, GROUP_ID, tg_user(1, "alice", "Alice"), "/todo@other_bot fix it"),
        private_message(3, 12, tg_user(1, "alice", "Alice"), "/unknown thing"),
    ])
    .await;

    assert!(ctx.db.all_tasks().is_empty());
    assert!(ctx.chat.sent().is_empty());
    // raw updates are still stored for later context capture
    assert_eq!(ctx.db.update_count(), 3);
}

#[tokio::test]
async fn test_forwarded_message_becomes_personal_task() {
    let ctx = TestContext::new();
    ctx.connected_user(42, "ann", "Ann", Some("db-inbox"));

    ctx.process_all(&[forwarded(1, 10, tg_user(42, "ann", "Ann"), tg_user(77, "bob", "Bob"), "Buy milk")])
        .await;

    let task = ctx.db.task(ctx.only_task_id());
    assert_eq!(task.title, "Buy milk");
    assert_eq!(task.description, "Forwarded source: Bob (@bob)");
    assert_eq!(task.database_id.as_deref(), Some("db-inbox"));

    let reply = &ctx.chat.sent_to(42)[0];
    assert!(reply.text.starts_with("✅ Saved to inbox: Buy milk"));
    assert!(reply.text.contains("(Syncing to Notion)"));

    ctx.drain_sync().await;
    assert_eq!(ctx.notion.created()[0].database_id, "db-inbox");
}

#[tokio::test]
async fn test_forward_without_notion_is_saved_locally() {
    let ctx = TestContext::new();
    ctx.process_all(&[forwarded(1, 10, tg_user(42, "ann", "Ann"), tg_user(77, "bob", "Bob"), "Call the bank")])
        .await;

    let reply = &ctx.chat.sent_to(42)[0];
    assert!(reply.text.contains("Saved locally only"));
    assert_matches!(&reply.markup, Some(ReplyMarkup::Inline(rows)) if rows[0][0].text == "⚙️ Connect");
}

#[tokio::test]
async fn test_bot_membership_registers_and_deactivates_group() {
    let ctx = TestContext::new();
    ctx.process_all(&[bot_membership(1, GROUP_ID, tg_user(1, "alice", "Alice"), "member")])
        .await;

    let group = ctx.db.group(GROUP_ID).expect("group registered");
    assert_eq!(group.status, GroupStatus::Unbound);
    assert_eq!(group.title, "Team");

    let alice = ctx.db.user_by_tg(1).expect("adder registered");
    assert_eq!(ctx.db.members(), vec![(alice.id, GROUP_ID, GroupRole::Admin)]);
    assert_eq!(ctx.chat.sent_to(GROUP_ID).len(), 1);

    ctx.process_all(&[bot_membership(2, GROUP_ID, tg_user(1, "alice", "Alice"), "kicked")])
        .await;
    assert_eq!(ctx.db.group(GROUP_ID).unwrap().status, GroupStatus::Inactive);
}

#[tokio::test]
async fn test_bind_requires_group_admin() {
    let ctx = TestContext::new();
    ctx.chat.set_member_role(MemberRole::Member);
    ctx.process_all(&[group_message(1, 10, GROUP_ID, tg_user(1, "alice", "Alice"), "/bind")])
        .await;

    assert_eq!(
        ctx.chat.sent_to(GROUP_ID)[0].text,
        "⚠️ Only group admins can bind a Notion database."
    );
    assert!(ctx.db.group(GROUP_ID).is_none());

    ctx.chat.clear();
    ctx.chat.set_member_role(MemberRole::Admin);
    ctx.process_all(&[group_message(2, 11, GROUP_ID, tg_user(1, "alice", "Alice"), "/bind")])
        .await;

    let reply = &ctx.chat.sent_to(GROUP_ID)[0];
    assert!(reply.text.starts_with("Bind a Notion database to «Team»"));
    assert!(reply.text.contains("https://t.me/todo_bot/app?startapp=bind_-1001234567890"));
    assert!(ctx.db.group(GROUP_ID).is_some());
}

#[tokio::test]
async fn test_inline_query_offers_a_todo_command() {
    let ctx = TestContext::new();
    ctx.process_all(&[
        inline_query(1, "q-empty", tg_user(42, "ann", "Ann"), "   "),
        inline_query(2, "q-1", tg_user(42, "ann", "Ann"), "buy <oat> milk"),
    ])
    .await;

    let answers = ctx.chat.inline_answers();
    assert_eq!(answers.len(), 1);
    let (query_id, results) = &answers[0];
    assert_eq!(query_id, "q-1");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "create_task");
    assert_eq!(results[0].title, "Create task: buy <oat> milk");
    assert_eq!(results[0].message_text, "/todo buy &lt;oat&gt; milk");

    // offering the command creates nothing yet
    assert!(ctx.db.all_tasks().is_empty());
    assert!(ctx.chat.sent().is_empty());
}

#[tokio::test]
async fn test_inline_share_offers_the_task_card() {
    let ctx = TestContext::new();
    ctx.process_all(&[private_message(1, 10, tg_user(1, "alice", "Alice"), "review deck")])
        .await;
    let task_id = ctx.only_task_id();

    ctx.process_all(&[
        inline_query(2, "q-share", tg_user(1, "alice", "Alice"), &format!("share {}", task_id)),
        inline_query(3, "q-missing", tg_user(1, "alice", "Alice"), &format!("assign {}", uuid::Uuid::new_v4())),
        inline_query(4, "q-garbage", tg_user(1, "alice", "Alice"), "share not-a-task"),
    ])
    .await;

    let answers = ctx.chat.inline_answers();
    assert_eq!(answers.len(), 3);

    let card = &answers[0].1[0];
    assert_eq!(card.id, task_id.to_string());
    assert_eq!(card.title, "Share task: review deck");
    assert_eq!(card.description.as_deref(), Some("Current assignee: Alice"));
    assert!(card.message_text.contains("<b>review deck</b>"));
    assert!(card.message_text.contains("📅 Due: none"));
    assert_eq!(
        card.keyboard[0][0].action,
        ButtonAction::Callback(format!("accept_task:{}", task_id))
    );
    assert_eq!(
        card.keyboard[1][0].action,
        ButtonAction::Url(format!("https://t.me/todo_bot?startapp=task_{}", task_id))
    );

    assert_eq!(answers[1].1[0].id, "error");
    assert_eq!(answers[2].1[0].id, "error");
    assert_eq!(ctx.db.all_tasks().len(), 1);
}

#[tokio::test]
async fn test_share_text_replies_with_the_card() {
    let ctx = TestContext::new();
    ctx.process_all(&[private_message(1, 10, tg_user(1, "alice", "Alice"), "review deck")])
        .await;
    let task_id = ctx.only_task_id();
    ctx.chat.clear();

    ctx.process_all(&[private_message(2, 11, tg_user(1, "alice", "Alice"), &format!("share {}", task_id))])
        .await;

    assert_eq!(ctx.db.all_tasks().len(), 1);
    let sent = ctx.chat.sent_to(1);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.starts_with("📋 <b>Shared task</b>"));
    assert_matches!(
        &sent[0].markup,
        Some(ReplyMarkup::Inline(rows)) if rows[0][0].action == ButtonAction::Callback(format!("accept_task:{}", task_id))
    );
}

#[tokio::test]
async fn test_claiming_a_shared_task_assigns_the_tapper() {
    let ctx = TestContext::new();
    ctx.process_all(&[private_message(1, 10, tg_user(1, "alice", "Alice"), "review deck")])
        .await;
    let task_id = ctx.only_task_id();
    ctx.drain_sync().await;
    ctx.chat.clear();
    assert!(ctx.db.user_by_tg(8).is_none());

    let data = format!("accept_task:{}", task_id);
    ctx.process_all(&[callback_query(2, "cb-1", tg_user(8, "dave", "Dave"), GROUP_ID, 55, &data)])
        .await;

    // the tapper is registered on the spot and becomes an assignee
    let dave = ctx.db.user_by_tg(8).expect("claimer registered");
    let task = ctx.db.task(task_id);
    assert!(task.is_assignee(dave.id));
    assert_eq!(task.sync_status, SyncStatus::Pending);

    let edits = ctx.chat.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].target, MessageRef::Chat { chat_id: GROUP_ID, message_id: 55 });
    assert_eq!(edits[0].text, "📋 <b>Task: review deck</b>\n\n✅ Assigned to Dave");
    assert_eq!(edits[0].keyboard.len(), 2);

    assert_eq!(
        ctx.chat.callback_answers(),
        vec![("cb-1".to_string(), Some("✅ You are now the assignee!".to_string()))]
    );

    // the creator hears about the change
    let notices = ctx.chat.sent_to(1);
    assert_eq!(notices.len(), 1);
    assert!(notices[0].text.contains("Assignee changed"));
    assert!(notices[0].text.contains("from Alice to Dave"));
}

#[tokio::test]
async fn test_claiming_a_missing_task_reports_failure() {
    let ctx = TestContext::new();
    let data = format!("accept_task:{}", uuid::Uuid::new_v4());
    ctx.process_all(&[
        callback_query(1, "cb-1", tg_user(8, "dave", "Dave"), GROUP_ID, 55, &data),
        callback_query(2, "cb-2", tg_user(8, "dave", "Dave"), GROUP_ID, 55, "something_else"),
    ])
    .await;

    assert!(ctx.chat.edits().is_empty());
    assert!(ctx.db.user_by_tg(8).is_none());
    assert_eq!(
        ctx.chat.callback_answers(),
        vec![
            ("cb-1".to_string(), Some("❌ Failed to assign task".to_string())),
            ("cb-2".to_string(), None),
        ]
    );
}

#[tokio::test]
async fn test_malformed_envelope_is_an_error() {
    let ctx = TestContext::new();
    let result = ctx.processor.process(&serde_json::json!({ "message": {} })).await;
    assert!(result.is_err());

    // unknown update kinds are acknowledged
    let outcome = ctx
        .processor
        .process(&serde_json::json!({ "update_id": 9, "edited_message": {} }))
        .await
        .unwrap();
    assert_eq!(outcome, ProcessOutcome::Processed);
}
