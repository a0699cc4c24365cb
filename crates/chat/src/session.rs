use std::path::Path;
use std::sync::Arc;

use parley_storage::{ChatroomId, ChatroomStore, MessageId, MessageRecord, MessageStore, Sender};

use crate::clock::Clock;
use crate::events::ViewEffect;
use crate::header::HeaderState;
use crate::image::{ImageResult, read_image_data_uri};
use crate::pagination::{PaginationEngine, tail};
use crate::scheduler::{Scheduler, TimerDriven};
use crate::timings::Timings;

pub const SIMULATED_REPLY_TEXT: &str = "This is a simulated Gemini reply!";

/// Deferred work owned by a [`ChatroomSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTask {
    DeliverReply,
    RevealOlder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent(MessageId),
    /// Blank text and no image; nothing happened.
    Empty,
    /// A reply is still pending.
    Busy,
    /// The session was closed.
    Inactive,
}

/// Controller for one open chatroom.
///
/// The window is always recomputed from a fresh read of the message store, so a send
/// and a pending "load older" never overwrite each other's writes.
pub struct ChatroomSession {
    chatroom_id: ChatroomId,
    header: HeaderState,
    messages: MessageStore,
    clock: Arc<dyn Clock>,
    timings: Timings,
    engine: PaginationEngine,
    scheduler: Scheduler<SessionTask>,
    window: Vec<MessageRecord>,
    visible: usize,
    page: usize,
    has_more: bool,
    input: String,
    pending_image: Option<String>,
    sending: bool,
    loading_older: bool,
    active: bool,
    effects: Vec<ViewEffect>,
}

impl ChatroomSession {
    pub fn open(
        chatroom_id: ChatroomId,
        chatrooms: &ChatroomStore,
        messages: MessageStore,
        clock: Arc<dyn Clock>,
        timings: Timings,
    ) -> Self {
        let record = chatrooms.find(&chatroom_id);
        let header = HeaderState::for_chatroom(&chatroom_id, record.as_ref());
        let engine = PaginationEngine::default();
        let history = messages.load(&chatroom_id);
        let first_page = engine.first_page(&history);

        tracing::info!(
            %chatroom_id,
            stored = history.len(),
            visible = first_page.messages.len(),
            "opened chatroom session"
        );

        let mut effects = Vec::new();
        if !first_page.messages.is_empty() {
            effects.push(ViewEffect::ScrollToNewest);
        }

        Self {
            chatroom_id,
            header,
            messages,
            clock,
            timings,
            engine,
            scheduler: Scheduler::new(),
            visible: first_page.messages.len(),
            window: first_page.messages,
            page: first_page.page,
            has_more: first_page.has_more,
            input: String::new(),
            pending_image: None,
            sending: false,
            loading_older: false,
            active: true,
            effects,
        }
    }

    pub fn chatroom_id(&self) -> &ChatroomId {
        &self.chatroom_id
    }

    pub fn header(&self) -> &HeaderState {
        &self.header
    }

    pub fn window(&self) -> &[MessageRecord] {
        &self.window
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_typing(&self) -> bool {
        self.header.typing
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn is_loading_older(&self) -> bool {
        self.loading_older
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn pending_image(&self) -> Option<&str> {
        self.pending_image.as_deref()
    }

    pub fn attach_image(&mut self, data_uri: String) {
        self.pending_image = Some(data_uri);
    }

    pub fn clear_image(&mut self) {
        self.pending_image = None;
    }

    /// Reads `path` into a data URI and stages it as the pending image once the read completes.
    pub async fn attach_image_file(&mut self, path: &Path) -> ImageResult<()> {
        let data_uri = read_image_data_uri(path).await?;
        if self.active {
            self.pending_image = Some(data_uri);
        }
        Ok(())
    }

    /// Drains rendering effects queued since the last call.
    pub fn take_effects(&mut self) -> Vec<ViewEffect> {
        std::mem::take(&mut self.effects)
    }

    pub fn send(&mut self) -> SendOutcome {
        if !self.active {
            return SendOutcome::Inactive;
        }
        if self.sending {
            return SendOutcome::Busy;
        }
        if self.input.trim().is_empty() && self.pending_image.is_none() {
            return SendOutcome::Empty;
        }

        let now = self.clock.now_millis();
        let text = std::mem::take(&mut self.input);
        let image = self.pending_image.take();
        let message_id = self.append(now, |id| {
            MessageRecord::new(id, Sender::User, text, image, now)
        });
        self.header.typing = true;
        self.sending = true;
        self.scheduler
            .schedule(self.timings.reply_delay(), SessionTask::DeliverReply);

        tracing::debug!(chatroom_id = %self.chatroom_id, %message_id, "queued simulated reply");
        SendOutcome::Sent(message_id)
    }

    /// Starts a deferred "load older". Returns false while one is already pending.
    pub fn request_older(&mut self) -> bool {
        if !self.active || self.loading_older {
            return false;
        }

        self.loading_older = true;
        self.scheduler
            .schedule(self.timings.older_delay(), SessionTask::RevealOlder);
        true
    }

    /// Marks the session torn down; deferred work that fires later is dropped.
    pub fn close(&mut self) {
        if self.active {
            tracing::info!(chatroom_id = %self.chatroom_id, pending = self.scheduler.len(), "closed chatroom session");
        }
        self.active = false;
    }

    fn deliver_reply(&mut self) {
        let now = self.clock.now_millis();
        self.append(now + 1, |id| {
            MessageRecord::new(id, Sender::Assistant, SIMULATED_REPLY_TEXT, None, now)
        });
        self.header.typing = false;
        self.sending = false;
    }

    fn reveal_older(&mut self) {
        let previously_visible = self.window.len();
        let window = self.engine.load_older(
            &self.messages,
            &self.chatroom_id,
            self.page,
            self.clock.now_millis(),
        );

        self.visible = window.messages.len();
        self.window = window.messages;
        self.page = window.page;
        self.has_more = window.has_more;
        self.loading_older = false;

        if self.window.len() > previously_visible
            && let Some(oldest) = self.window.first()
        {
            self.effects.push(ViewEffect::ScrollToOldestRevealed {
                message_id: oldest.id.clone(),
            });
        }

        tracing::debug!(
            chatroom_id = %self.chatroom_id,
            page = self.page,
            visible = self.visible,
            synthesized = window.synthesized,
            "revealed older messages"
        );
    }

    /// Appends a message whose id derives from `id_millis`, bumped past any stored id.
    fn append(
        &mut self,
        id_millis: i64,
        build: impl FnOnce(MessageId) -> MessageRecord,
    ) -> MessageId {
        let mut history = self.messages.load(&self.chatroom_id);
        let message_id = unique_message_id(&history, id_millis);
        history.push(build(message_id.clone()));

        if let Err(error) = self.messages.save(&self.chatroom_id, &history) {
            tracing::warn!(chatroom_id = %self.chatroom_id, %error, "failed to persist messages");
        }

        self.visible = (self.visible + 1).min(history.len());
        self.window = tail(&history, self.visible);
        self.effects.push(ViewEffect::ScrollToNewest);
        message_id
    }
}

fn unique_message_id(history: &[MessageRecord], millis: i64) -> MessageId {
    let mut millis = millis;
    loop {
        let candidate = MessageId::from_millis(millis);
        if !history.iter().any(|message| message.id == candidate) {
            return candidate;
        }
        millis += 1;
    }
}

impl TimerDriven for ChatroomSession {
    type Task = SessionTask;

    fn scheduler(&self) -> &Scheduler<SessionTask> {
        &self.scheduler
    }

    fn scheduler_mut(&mut self) -> &mut Scheduler<SessionTask> {
        &mut self.scheduler
    }

    fn fire(&mut self, task: SessionTask) {
        if !self.active {
            tracing::debug!(chatroom_id = %self.chatroom_id, ?task, "dropping task for closed session");
            return;
        }

        match task {
            SessionTask::DeliverReply => self.deliver_reply(),
            SessionTask::RevealOlder => self.reveal_older(),
        }
    }
}
