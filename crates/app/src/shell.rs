use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use parley_chat::header::TYPING_STATUS;
use parley_chat::{
    ChatroomSession, Clock, CountrySource, Dashboard, DashboardError, FieldError, LoginFlow,
    LoginStep, Notice, NoticeLevel, SendOutcome, TimerDriven, Timings, ViewEffect,
};
use parley_storage::{ChatroomId, MessageRecord, Sender};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::Instant;

use crate::backend::Stores;
use crate::commands::{Command, HELP, parse_command};

/// How many countries the login screen lists before summarizing.
const COUNTRY_PREVIEW: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

enum View {
    Login(LoginFlow),
    Dashboard(Dashboard),
    Room(ChatroomSession),
}

enum Transition {
    ToLogin,
    ToDashboard,
    ToRoom(ChatroomId),
}

/// Line-oriented terminal front end over the chat controllers.
///
/// Only the active view's controller is advanced; leaving a view drops its pending timers.
pub struct Shell<W> {
    stores: Stores,
    clock: Arc<dyn Clock>,
    timings: Timings,
    countries: Box<dyn CountrySource>,
    view: View,
    out: W,
}

impl<W: Write> Shell<W> {
    pub fn new(
        stores: Stores,
        clock: Arc<dyn Clock>,
        timings: Timings,
        countries: Box<dyn CountrySource>,
        out: W,
    ) -> Self {
        let view = if stores.auth.is_authenticated() {
            dashboard_view(&stores, &clock, timings)
        } else {
            login_view(&stores, timings, countries.as_ref())
        };

        Self {
            stores,
            clock,
            timings,
            countries,
            view,
            out,
        }
    }

    pub fn start(&mut self) -> io::Result<()> {
        self.render()?;
        self.settle()?;
        Ok(())
    }

    /// Reads commands until end of input or `/quit`, firing timers as they come due.
    pub async fn run<R>(mut self, input: R) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut last_tick = Instant::now();
        self.start()?;

        loop {
            let wait = self.until_next();
            tokio::select! {
                line = lines.next_line() => {
                    self.pump(last_tick.elapsed())?;
                    last_tick = Instant::now();

                    let Some(line) = line? else {
                        break;
                    };
                    if self.handle_line(&line).await? == Flow::Quit {
                        break;
                    }
                }
                () = sleep_until_due(wait) => {
                    self.pump(last_tick.elapsed())?;
                    last_tick = Instant::now();
                }
            }
        }

        if let View::Room(session) = &mut self.view {
            session.close();
        }
        tracing::info!("shell exited");
        Ok(())
    }

    pub fn until_next(&self) -> Option<Duration> {
        match &self.view {
            View::Login(flow) => flow.until_next(),
            View::Dashboard(dashboard) => dashboard.until_next(),
            View::Room(session) => session.until_next(),
        }
    }

    /// Advances the active controller by `elapsed` and prints whatever changed.
    pub fn pump(&mut self, elapsed: Duration) -> io::Result<()> {
        let fired = match &mut self.view {
            View::Login(flow) => flow.advance(elapsed),
            View::Dashboard(dashboard) => dashboard.advance(elapsed),
            View::Room(session) => session.advance(elapsed),
        };
        if fired == 0 {
            return Ok(());
        }

        tracing::debug!(fired, "timers fired");
        let moved = self.settle()?;
        if !moved && !matches!(self.view, View::Room(_)) {
            self.render()?;
        }
        self.out.flush()
    }

    pub async fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        let Some(command) = parse_command(line) else {
            return Ok(Flow::Continue);
        };

        let next = match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Help => {
                writeln!(self.out, "{HELP}")?;
                None
            }
            Command::Unknown(name) => {
                writeln!(self.out, "unknown command /{name}; try /help")?;
                None
            }
            command => match &mut self.view {
                View::Login(flow) => {
                    handle_login(&mut self.out, flow, command)?;
                    None
                }
                View::Dashboard(dashboard) => handle_dashboard(&mut self.out, dashboard, command)?,
                View::Room(session) => handle_room(&mut self.out, session, command).await?,
            },
        };

        if let Some(next) = next {
            self.transition(next)?;
        }
        self.settle()?;
        self.out.flush()?;
        Ok(Flow::Continue)
    }

    fn transition(&mut self, to: Transition) -> io::Result<()> {
        self.view = match to {
            Transition::ToLogin => login_view(&self.stores, self.timings, self.countries.as_ref()),
            Transition::ToDashboard => dashboard_view(&self.stores, &self.clock, self.timings),
            Transition::ToRoom(chatroom_id) => {
                let mut session = ChatroomSession::open(
                    chatroom_id,
                    &self.stores.chatrooms,
                    self.stores.messages.clone(),
                    self.clock.clone(),
                    self.timings,
                );
                // The full render below already shows the newest messages.
                session.take_effects();
                View::Room(session)
            }
        };
        self.render()
    }

    fn render(&mut self) -> io::Result<()> {
        match &self.view {
            View::Login(flow) => write_login(&mut self.out, flow),
            View::Dashboard(dashboard) => write_dashboard(&mut self.out, dashboard),
            View::Room(session) => write_room(&mut self.out, session),
        }
    }

    /// Drains notices and effects; returns true if the view changed.
    fn settle(&mut self) -> io::Result<bool> {
        let mut next = None;
        match &mut self.view {
            View::Login(flow) => {
                write_notices(&mut self.out, flow.take_notices())?;
                if flow.is_logged_in() {
                    next = Some(Transition::ToDashboard);
                }
            }
            View::Dashboard(dashboard) => write_notices(&mut self.out, dashboard.take_notices())?,
            View::Room(session) => write_effects(&mut self.out, session)?,
        }

        match next {
            Some(next) => {
                self.transition(next)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

async fn sleep_until_due(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending::<()>().await,
    }
}

fn login_view(stores: &Stores, timings: Timings, countries: &dyn CountrySource) -> View {
    let mut flow = LoginFlow::new(stores.auth.clone(), timings);
    flow.load_countries(countries);
    View::Login(flow)
}

fn dashboard_view(stores: &Stores, clock: &Arc<dyn Clock>, timings: Timings) -> View {
    View::Dashboard(Dashboard::open(
        stores.chatrooms.clone(),
        stores.messages.clone(),
        stores.auth.clone(),
        clock.clone(),
        timings,
    ))
}

fn handle_login<W: Write>(out: &mut W, flow: &mut LoginFlow, command: Command) -> io::Result<()> {
    match command {
        Command::Login { country, phone } => match flow.submit_phone(&country, &phone) {
            Ok(true) => writeln!(out, "sending one-time password..."),
            Ok(false) if flow.is_loading() => writeln!(out, "please wait"),
            Ok(false) => writeln!(out, "a code was already sent; use /otp <code>"),
            Err(errors) => write_field_errors(out, &errors),
        },
        Command::Otp(code) => match flow.submit_otp(&code) {
            Ok(true) => writeln!(out, "verifying..."),
            Ok(false) if flow.is_loading() => writeln!(out, "please wait"),
            Ok(false) => writeln!(out, "request a code with /login first"),
            Err(errors) => write_field_errors(out, &errors),
        },
        _ => writeln!(out, "sign in first; try /help"),
    }
}

fn handle_dashboard<W: Write>(
    out: &mut W,
    dashboard: &mut Dashboard,
    command: Command,
) -> io::Result<Option<Transition>> {
    match command {
        Command::Rooms => write_dashboard(out, dashboard)?,
        Command::New(title) => match dashboard.create(&title) {
            Ok(room) => writeln!(out, "  {}  {}", room.id, room.title)?,
            Err(DashboardError::TitleRequired { .. }) => {}
            Err(error) => {
                tracing::warn!(%error, "failed to create chatroom");
                writeln!(out, "error: {error}")?;
            }
        },
        Command::Search(text) => dashboard.set_search_input(text),
        Command::Delete(id) => {
            let chatroom_id = ChatroomId::new(id);
            if dashboard.request_delete(&chatroom_id) {
                writeln!(out, "delete chatroom {chatroom_id}? /yes or /no")?;
            } else {
                writeln!(out, "no chatroom with id {chatroom_id:?}")?;
            }
        }
        Command::Yes => match dashboard.confirm_delete() {
            Ok(Some(_)) => write_dashboard(out, dashboard)?,
            Ok(None) => writeln!(out, "nothing to delete")?,
            Err(error) => {
                tracing::warn!(%error, "failed to delete chatroom");
                writeln!(out, "error: {error}")?;
            }
        },
        Command::No => {
            if dashboard.pending_delete().is_some() {
                dashboard.cancel_delete();
                writeln!(out, "kept")?;
            }
        }
        Command::Open(id) if id.is_empty() => writeln!(out, "usage: /open <id>")?,
        Command::Open(id) => return Ok(Some(Transition::ToRoom(ChatroomId::new(id)))),
        Command::Logout => match dashboard.logout() {
            Ok(()) => return Ok(Some(Transition::ToLogin)),
            Err(error) => {
                tracing::warn!(%error, "failed to log out");
                writeln!(out, "error: {error}")?;
            }
        },
        _ => writeln!(out, "not available on the chatroom list; try /help")?,
    }
    Ok(None)
}

async fn handle_room<W: Write>(
    out: &mut W,
    session: &mut ChatroomSession,
    command: Command,
) -> io::Result<Option<Transition>> {
    match command {
        Command::Send(text) => {
            session.set_input(text);
            match session.send() {
                SendOutcome::Sent(_) => {}
                SendOutcome::Empty => writeln!(out, "type a message or attach an image")?,
                SendOutcome::Busy => writeln!(out, "wait for the reply before sending again")?,
                SendOutcome::Inactive => writeln!(out, "this chatroom is closed")?,
            }
        }
        Command::Image(path) => match session.attach_image_file(&path).await {
            Ok(()) => writeln!(out, "image attached; it goes with your next message")?,
            Err(error) => writeln!(out, "error: {error}")?,
        },
        Command::Unimage => {
            session.clear_image();
            writeln!(out, "image removed")?;
        }
        Command::Older => {
            if session.request_older() {
                writeln!(out, "loading earlier messages...")?;
            } else {
                writeln!(out, "already loading")?;
            }
        }
        Command::Back => {
            session.close();
            return Ok(Some(Transition::ToDashboard));
        }
        _ => writeln!(out, "not available in a chatroom; try /help")?,
    }
    Ok(None)
}

fn write_login<W: Write>(out: &mut W, flow: &LoginFlow) -> io::Result<()> {
    match flow.step() {
        LoginStep::Phone => {
            writeln!(out, "== sign in ==")?;
            let countries = flow.countries();
            for country in countries.iter().take(COUNTRY_PREVIEW) {
                writeln!(out, "  {} {}", country.code, country.name)?;
            }
            if countries.len() > COUNTRY_PREVIEW {
                writeln!(out, "  ... {} more", countries.len() - COUNTRY_PREVIEW)?;
            }
            writeln!(out, "enter /login <country-code> <phone>")
        }
        LoginStep::Otp => {
            if let Some(otp) = flow.generated_otp() {
                writeln!(out, "demo code: {otp}")?;
            }
            if let Some(error) = flow.otp_error() {
                writeln!(out, "  otp: {error}")?;
            }
            writeln!(out, "enter /otp <code>")
        }
    }
}

fn write_dashboard<W: Write>(out: &mut W, dashboard: &Dashboard) -> io::Result<()> {
    if dashboard.query().is_empty() {
        writeln!(out, "== chatrooms ==")?;
    } else {
        writeln!(out, "== chatrooms matching {:?} ==", dashboard.query())?;
    }

    let visible = dashboard.visible();
    if visible.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for room in visible {
        writeln!(out, "  {}  {}", room.id, room.title)?;
    }

    if let Some(pending) = dashboard.pending_delete() {
        writeln!(out, "delete chatroom {pending}? /yes or /no")?;
    }
    Ok(())
}

fn write_room<W: Write>(out: &mut W, session: &ChatroomSession) -> io::Result<()> {
    let header = session.header();
    writeln!(out, "== {} [{}] ==", header.title, header.status())?;
    if session.has_more() {
        writeln!(out, "  (/older for earlier messages)")?;
    }
    for message in session.window() {
        write_message(out, message)?;
    }
    Ok(())
}

fn write_effects<W: Write>(out: &mut W, session: &mut ChatroomSession) -> io::Result<()> {
    for effect in session.take_effects() {
        match effect {
            ViewEffect::ScrollToNewest => {
                if let Some(message) = session.window().last() {
                    write_message(out, message)?;
                }
                if session.is_typing() {
                    writeln!(out, "  {TYPING_STATUS}")?;
                }
            }
            ViewEffect::ScrollToOldestRevealed { message_id } => {
                write_room(out, session)?;
                writeln!(out, "  (revealed from {message_id})")?;
            }
        }
    }
    Ok(())
}

fn write_message<W: Write>(out: &mut W, message: &MessageRecord) -> io::Result<()> {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Assistant => "gemini",
    };
    let image = if message.image.is_some() { " [image]" } else { "" };
    writeln!(
        out,
        "  {} {who}: {}{image}",
        clock_time(message.timestamp),
        message.text
    )
}

/// Local `HH:MM` for an epoch-millisecond timestamp.
fn clock_time(timestamp_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_millis)
        .map(|time| time.with_timezone(&chrono::Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

fn write_notices<W: Write>(out: &mut W, notices: Vec<Notice>) -> io::Result<()> {
    for notice in notices {
        let tag = match notice.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        writeln!(out, "[{tag}] {}", notice.text)?;
    }
    Ok(())
}

fn write_field_errors<W: Write>(out: &mut W, errors: &[FieldError]) -> io::Result<()> {
    for error in errors {
        writeln!(out, "  {}: {}", error.field, error.message)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use parley_chat::{ManualClock, UnconfiguredCountrySource};
    use parley_storage::{AuthRecord, MemoryStore};

    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn shell(stores: &Stores) -> Shell<Vec<u8>> {
        Shell::new(
            stores.clone(),
            Arc::new(ManualClock::new(NOW)),
            Timings::default(),
            Box::new(UnconfiguredCountrySource),
            Vec::new(),
        )
    }

    fn output(shell: &mut Shell<Vec<u8>>) -> String {
        String::from_utf8(std::mem::take(&mut shell.out)).unwrap()
    }

    fn signed_in() -> Stores {
        let stores = Stores::new(Arc::new(MemoryStore::new()));
        let record = AuthRecord {
            country: "+1".to_string(),
            phone: "5551234567".to_string(),
            logged_in: true,
        };
        stores.auth.save(&record, "token").unwrap();
        stores
    }

    #[tokio::test]
    async fn login_reaches_dashboard() {
        let stores = Stores::new(Arc::new(MemoryStore::new()));
        let mut shell = shell(&stores);
        shell.start().unwrap();
        assert!(output(&mut shell).contains("Failed to fetch country data"));

        shell.handle_line("/login +1 123").await.unwrap();
        assert!(output(&mut shell).contains("at least 10 digits"));
        assert_eq!(shell.until_next(), None);

        shell.handle_line("/login +1 5551234567").await.unwrap();
        shell.pump(Duration::from_millis(1_200)).unwrap();
        let View::Login(flow) = &shell.view else {
            panic!("expected login view");
        };
        let otp = flow.generated_otp().unwrap().to_string();
        assert!(output(&mut shell).contains(&format!("demo code: {otp}")));

        shell.handle_line(&format!("/otp {otp}")).await.unwrap();
        shell.pump(Duration::from_millis(1_200)).unwrap();

        assert!(matches!(shell.view, View::Dashboard(_)));
        assert!(stores.auth.is_authenticated());
        assert!(output(&mut shell).contains("== chatrooms =="));
    }

    #[tokio::test]
    async fn room_round_trip_with_reply() {
        let stores = signed_in();
        let mut shell = shell(&stores);
        shell.start().unwrap();

        shell.handle_line("/new Trip").await.unwrap();
        shell.handle_line(&format!("/open {NOW}")).await.unwrap();
        assert!(output(&mut shell).contains("== Trip [Online] =="));

        shell.handle_line("hello").await.unwrap();
        shell.handle_line("again").await.unwrap();
        let sent = output(&mut shell);
        assert!(sent.contains(&format!("  {} you: hello", clock_time(NOW))));
        assert!(sent.contains("wait for the reply"));

        shell.pump(Duration::from_millis(1_500)).unwrap();
        assert!(output(&mut shell).contains(" gemini: This is a simulated Gemini reply!"));

        let chatroom_id = ChatroomId::from_millis(NOW);
        assert_eq!(stores.messages.load(&chatroom_id).len(), 2);

        shell.handle_line("/back").await.unwrap();
        assert!(matches!(shell.view, View::Dashboard(_)));
    }

    #[test]
    fn clock_time_is_hours_and_minutes() {
        let formatted = clock_time(NOW);
        assert_eq!(formatted.len(), 5);
        assert_eq!(formatted.as_bytes()[2], b':');
        assert_eq!(clock_time(i64::MAX), "--:--");
    }

    #[tokio::test]
    async fn leaving_a_room_drops_the_pending_reply() {
        let stores = signed_in();
        let mut shell = shell(&stores);
        shell.handle_line("/new Quiet").await.unwrap();
        shell.handle_line(&format!("/open {NOW}")).await.unwrap();
        shell.handle_line("anyone?").await.unwrap();
        shell.handle_line("/back").await.unwrap();

        shell.pump(Duration::from_millis(5_000)).unwrap();
        assert_eq!(stores.messages.load(&ChatroomId::from_millis(NOW)).len(), 1);
    }

    #[tokio::test]
    async fn delete_asks_before_removing() {
        let stores = signed_in();
        let mut shell = shell(&stores);
        shell.handle_line("/new Doomed").await.unwrap();
        shell.handle_line(&format!("/delete {NOW}")).await.unwrap();
        assert!(output(&mut shell).contains("/yes or /no"));

        shell.handle_line("/yes").await.unwrap();
        assert!(stores.chatrooms.load().is_empty());
        assert!(output(&mut shell).contains("Chatroom deleted successfully!"));

        shell.handle_line("/logout").await.unwrap();
        assert!(matches!(shell.view, View::Login(_)));
        assert!(!stores.auth.is_authenticated());
    }
}
