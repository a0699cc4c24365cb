use std::sync::Arc;

use parley_storage::{
    AuthStore, ChatroomId, ChatroomRecord, ChatroomStore, MessageStore, StorageError,
    filter_chatrooms,
};
use snafu::{ResultExt, Snafu};

use crate::clock::Clock;
use crate::events::Notice;
use crate::scheduler::{Scheduler, TimerDriven, TimerId};
use crate::timings::Timings;

pub const TITLE_REQUIRED_NOTICE: &str = "Chatroom title required";
pub const CREATED_NOTICE: &str = "Chatroom created successfully!";
pub const DELETED_NOTICE: &str = "Chatroom deleted successfully!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardTask {
    ApplySearch(String),
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DashboardError {
    #[snafu(display("chatroom title is required"))]
    TitleRequired { stage: &'static str },
    #[snafu(display("failed to persist chatrooms on `{stage}`: {source}"))]
    PersistChatrooms {
        stage: &'static str,
        source: StorageError,
    },
    #[snafu(display("failed to clear login state on `{stage}`: {source}"))]
    ClearAuth {
        stage: &'static str,
        source: StorageError,
    },
}

/// Chatroom list controller: debounced search, create, two-step delete, logout.
pub struct Dashboard {
    chatrooms: ChatroomStore,
    messages: MessageStore,
    auth: AuthStore,
    clock: Arc<dyn Clock>,
    timings: Timings,
    scheduler: Scheduler<DashboardTask>,
    rooms: Vec<ChatroomRecord>,
    query: String,
    pending_search: Option<TimerId>,
    pending_delete: Option<ChatroomId>,
    notices: Vec<Notice>,
}

impl Dashboard {
    pub fn open(
        chatrooms: ChatroomStore,
        messages: MessageStore,
        auth: AuthStore,
        clock: Arc<dyn Clock>,
        timings: Timings,
    ) -> Self {
        let rooms = chatrooms.load();
        tracing::info!(chatrooms = rooms.len(), "opened dashboard");

        Self {
            chatrooms,
            messages,
            auth,
            clock,
            timings,
            scheduler: Scheduler::new(),
            rooms,
            query: String::new(),
            pending_search: None,
            pending_delete: None,
            notices: Vec::new(),
        }
    }

    pub fn rooms(&self) -> &[ChatroomRecord] {
        &self.rooms
    }

    /// Rooms matching the last applied search query.
    pub fn visible(&self) -> Vec<&ChatroomRecord> {
        filter_chatrooms(&self.rooms, &self.query)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Records a keystroke; the filter applies once input has been quiet for the debounce window.
    pub fn set_search_input(&mut self, text: impl Into<String>) {
        let text = text.into();
        if let Some(previous) = self.pending_search.take() {
            self.scheduler.cancel(previous);
        }

        self.pending_search = Some(self.scheduler.schedule(
            self.timings.search_debounce(),
            DashboardTask::ApplySearch(text),
        ));
    }

    pub fn create(&mut self, title: &str) -> Result<ChatroomRecord, DashboardError> {
        let title = title.trim();
        if title.is_empty() {
            self.notices.push(Notice::error(TITLE_REQUIRED_NOTICE));
            return TitleRequiredSnafu {
                stage: "dashboard-create-validate",
            }
            .fail();
        }

        let created = ChatroomRecord::new(self.next_chatroom_id(), title);
        let mut updated = self.rooms.clone();
        updated.push(created.clone());

        self.chatrooms
            .save(&updated)
            .context(PersistChatroomsSnafu {
                stage: "dashboard-create-persist",
            })?;

        self.rooms = updated;
        self.notices.push(Notice::success(CREATED_NOTICE));
        tracing::info!(chatroom_id = %created.id, "created chatroom");
        Ok(created)
    }

    /// Stages `chatroom_id` for deletion; returns false if it is not listed.
    pub fn request_delete(&mut self, chatroom_id: &ChatroomId) -> bool {
        if !self.rooms.iter().any(|room| &room.id == chatroom_id) {
            return false;
        }

        self.pending_delete = Some(chatroom_id.clone());
        true
    }

    pub fn pending_delete(&self) -> Option<&ChatroomId> {
        self.pending_delete.as_ref()
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Deletes the staged chatroom together with its message history.
    pub fn confirm_delete(&mut self) -> Result<Option<ChatroomRecord>, DashboardError> {
        let Some(chatroom_id) = self.pending_delete.take() else {
            return Ok(None);
        };

        let (removed, kept): (Vec<_>, Vec<_>) = self
            .rooms
            .iter()
            .cloned()
            .partition(|room| room.id == chatroom_id);

        self.chatrooms.save(&kept).context(PersistChatroomsSnafu {
            stage: "dashboard-delete-persist",
        })?;
        self.rooms = kept;

        if let Err(error) = self.messages.remove(&chatroom_id) {
            tracing::warn!(%chatroom_id, %error, "failed to remove chatroom messages");
        }

        self.notices.push(Notice::success(DELETED_NOTICE));
        tracing::info!(%chatroom_id, "deleted chatroom");
        Ok(removed.into_iter().next())
    }

    pub fn logout(&mut self) -> Result<(), DashboardError> {
        self.auth.clear().context(ClearAuthSnafu {
            stage: "dashboard-logout",
        })?;
        tracing::info!("logged out");
        Ok(())
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn next_chatroom_id(&self) -> ChatroomId {
        let mut millis = self.clock.now_millis();
        loop {
            let candidate = ChatroomId::from_millis(millis);
            if !self.rooms.iter().any(|room| room.id == candidate) {
                return candidate;
            }
            millis += 1;
        }
    }
}

impl TimerDriven for Dashboard {
    type Task = DashboardTask;

    fn scheduler(&self) -> &Scheduler<DashboardTask> {
        &self.scheduler
    }

    fn scheduler_mut(&mut self) -> &mut Scheduler<DashboardTask> {
        &mut self.scheduler
    }

    fn fire(&mut self, task: DashboardTask) {
        match task {
            DashboardTask::ApplySearch(query) => {
                self.pending_search = None;
                tracing::debug!(%query, "applied chatroom search");
                self.query = query;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parley_storage::{AuthRecord, MemoryStore, MessageId, MessageRecord, Sender};

    use super::*;
    use crate::clock::ManualClock;
    use crate::events::NoticeLevel;

    const NOW: i64 = 1_700_000_000_000;

    struct Fixture {
        kv: Arc<MemoryStore>,
        chatrooms: ChatroomStore,
        messages: MessageStore,
        auth: AuthStore,
        clock: Arc<ManualClock>,
    }

    impl Fixture {
        fn new() -> Self {
            let kv = Arc::new(MemoryStore::new());
            Self {
                chatrooms: ChatroomStore::new(kv.clone()),
                messages: MessageStore::new(kv.clone()),
                auth: AuthStore::new(kv.clone()),
                clock: Arc::new(ManualClock::new(NOW)),
                kv,
            }
        }

        fn open(&self) -> Dashboard {
            Dashboard::open(
                self.chatrooms.clone(),
                self.messages.clone(),
                self.auth.clone(),
                self.clock.clone(),
                Timings::default(),
            )
        }
    }

    fn titles(dashboard: &Dashboard) -> Vec<String> {
        dashboard
            .visible()
            .into_iter()
            .map(|room| room.title.clone())
            .collect()
    }

    #[test]
    fn create_appends_in_creation_order_with_unique_ids() {
        let fixture = Fixture::new();
        let mut dashboard = fixture.open();

        let first = dashboard.create("  Work  ").unwrap();
        let second = dashboard.create("Play").unwrap();

        assert_eq!(first.title, "Work");
        assert_eq!(first.id, ChatroomId::from_millis(NOW));
        assert_eq!(second.id, ChatroomId::from_millis(NOW + 1));
        assert_eq!(fixture.chatrooms.load(), vec![first, second]);
        assert_eq!(
            dashboard.take_notices(),
            vec![Notice::success(CREATED_NOTICE), Notice::success(CREATED_NOTICE)]
        );
    }

    #[test]
    fn blank_title_is_rejected_with_notice() {
        let fixture = Fixture::new();
        let mut dashboard = fixture.open();

        let error = dashboard.create("   ").unwrap_err();
        assert!(matches!(error, DashboardError::TitleRequired { .. }));
        assert!(fixture.chatrooms.load().is_empty());

        let notices = dashboard.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].text, TITLE_REQUIRED_NOTICE);
    }

    #[test]
    fn search_applies_only_last_keystroke_after_debounce() {
        let fixture = Fixture::new();
        let mut dashboard = fixture.open();
        for title in ["Work", "Weekend", "Recipes"] {
            dashboard.create(title).unwrap();
        }

        dashboard.set_search_input("w");
        dashboard.advance(Duration::from_millis(200));
        dashboard.set_search_input("we");
        dashboard.advance(Duration::from_millis(299));
        assert_eq!(dashboard.query(), "");
        assert_eq!(titles(&dashboard).len(), 3);

        assert_eq!(dashboard.advance(Duration::from_millis(1)), 1);
        assert_eq!(dashboard.query(), "we");
        assert_eq!(titles(&dashboard), vec!["Weekend".to_string()]);
        assert!(dashboard.scheduler().is_empty());

        dashboard.set_search_input("");
        dashboard.advance(Duration::from_millis(300));
        assert_eq!(titles(&dashboard), vec!["Work", "Weekend", "Recipes"]);
    }

    #[test]
    fn delete_requires_confirmation_and_cascades_messages() {
        let fixture = Fixture::new();
        let mut dashboard = fixture.open();
        let doomed = dashboard.create("Doomed").unwrap();
        fixture.clock.advance(Duration::from_millis(5));
        let kept = dashboard.create("Kept").unwrap();

        let message = MessageRecord::new(MessageId::from_millis(1), Sender::User, "hi", None, 1);
        fixture.messages.save(&doomed.id, &[message.clone()]).unwrap();
        fixture.messages.save(&kept.id, &[message.clone()]).unwrap();

        assert!(!dashboard.request_delete(&ChatroomId::new("nope")));
        assert!(dashboard.request_delete(&doomed.id));
        dashboard.cancel_delete();
        assert_eq!(dashboard.confirm_delete().unwrap(), None);
        assert_eq!(dashboard.rooms().len(), 2);

        dashboard.request_delete(&doomed.id);
        assert_eq!(dashboard.confirm_delete().unwrap(), Some(doomed.clone()));

        assert_eq!(fixture.chatrooms.load(), vec![kept.clone()]);
        assert!(fixture.messages.load(&doomed.id).is_empty());
        assert_eq!(fixture.messages.load(&kept.id), vec![message]);
        assert!(!fixture.kv.keys().contains(&format!("messages-{}", doomed.id)));
    }

    #[test]
    fn logout_clears_auth_state() {
        let fixture = Fixture::new();
        let record = AuthRecord {
            country: "+91".to_string(),
            phone: "9876543210".to_string(),
            logged_in: true,
        };
        fixture.auth.save(&record, "token").unwrap();

        let mut dashboard = fixture.open();
        dashboard.logout().unwrap();
        assert!(!fixture.auth.is_authenticated());
        assert_eq!(fixture.auth.load(), None);
    }
}
