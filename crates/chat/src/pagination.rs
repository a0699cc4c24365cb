use parley_storage::{ChatroomId, MessageId, MessageRecord, MessageStore, Sender};

/// Messages revealed per page.
pub const PAGE_SIZE: usize = 20;
/// Gap between consecutive synthesized history entries.
pub const FILLER_SPACING_MS: i64 = 60_000;

/// Bounded, non-persisted slice of a chatroom's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    pub messages: Vec<MessageRecord>,
    pub page: usize,
    pub has_more: bool,
    /// How many filler messages were synthesized to produce this window.
    pub synthesized: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationEngine {
    page_size: usize,
}

impl Default for PaginationEngine {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl PaginationEngine {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    /// Window shown when a chatroom is opened.
    pub fn first_page(&self, history: &[MessageRecord]) -> PageWindow {
        PageWindow {
            messages: tail(history, self.page_size),
            page: 1,
            has_more: history.len() > self.page_size,
            synthesized: 0,
        }
    }

    /// Total number of messages the next "load older" reveals.
    ///
    /// The first request already asks for `2 * page_size` while only one page is on
    /// screen, so it reveals two pages at once.
    pub fn older_target(&self, page: usize) -> usize {
        page.saturating_add(1).saturating_mul(self.page_size)
    }

    /// Re-reads the stored history, backfills it to the next target if it is too short,
    /// persists any backfill and returns the widened window.
    pub fn load_older(
        &self,
        store: &MessageStore,
        chatroom_id: &ChatroomId,
        page: usize,
        now_millis: i64,
    ) -> PageWindow {
        let target = self.older_target(page);
        let (history, synthesized) = backfill(store.load(chatroom_id), target, now_millis);

        if synthesized > 0 {
            tracing::debug!(%chatroom_id, synthesized, target, "backfilled chatroom history");
            if let Err(error) = store.save(chatroom_id, &history) {
                tracing::warn!(%chatroom_id, %error, "failed to persist backfilled history");
            }
        }

        PageWindow {
            messages: tail(&history, target),
            page: page.saturating_add(1),
            has_more: history.len() > target,
            synthesized,
        }
    }
}

/// Prepends filler until `history` holds at least `target` messages.
///
/// Filler is anchored on the earliest stored timestamp, or on `now_millis` when the
/// history is empty, so the stored order stays non-decreasing by timestamp.
pub fn backfill(
    history: Vec<MessageRecord>,
    target: usize,
    now_millis: i64,
) -> (Vec<MessageRecord>, usize) {
    let missing = target.saturating_sub(history.len());
    if missing == 0 {
        return (history, 0);
    }

    let anchor = history.first().map_or(now_millis, |message| message.timestamp);
    let mut extended = synthesize_filler(missing, anchor);
    extended.extend(history);
    (extended, missing)
}

/// Builds `count` filler messages that precede `before_millis`, returned oldest-first.
///
/// Entries are generated walking backwards in time: the one nearest `before_millis`
/// is from the assistant and senders alternate from there.
pub fn synthesize_filler(count: usize, before_millis: i64) -> Vec<MessageRecord> {
    let mut filler = (0..count)
        .map(|index| {
            let timestamp = before_millis - (index as i64 + 1) * FILLER_SPACING_MS;
            let sender = if index % 2 == 0 {
                Sender::Assistant
            } else {
                Sender::User
            };

            MessageRecord::new(
                MessageId::filler(timestamp),
                sender,
                format!("Dummy message {}", index + 1),
                None,
                timestamp,
            )
        })
        .collect::<Vec<_>>();

    filler.reverse();
    filler
}

/// The last `len` messages of `history`.
pub fn tail(history: &[MessageRecord], len: usize) -> Vec<MessageRecord> {
    history[history.len().saturating_sub(len)..].to_vec()
}
