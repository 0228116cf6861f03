use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::api::ChatClient;
use crate::conversation::{ChatOutcome, Conversation};
use crate::tui::AppEvent;

/// Result of the startup probe against the chat server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Checking,
    Online,
    Offline,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub conversation: Conversation,

    // Draft editing
    pub cursor: usize, // character index into the draft

    // Message list scrolling
    pub chat_scroll: u16,
    pub max_chat_scroll: u16,
    pub follow_tail: bool,

    // Areas from the last frame, for mouse hit-testing
    pub chat_area: Option<Rect>,
    pub reset_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for the typing dots

    pub server_status: ServerStatus,

    client: ChatClient,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(client: ChatClient, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            conversation: Conversation::new(),
            cursor: 0,
            chat_scroll: 0,
            max_chat_scroll: 0,
            follow_tail: true,
            chat_area: None,
            reset_area: None,
            animation_frame: 0,
            server_status: ServerStatus::Checking,
            client,
            events,
        }
    }

    pub fn api_base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Probe the server in the background; the answer arrives as an event.
    pub fn check_server(&self) {
        let client = self.client.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let status = match client.health().await {
                Ok(banner) => {
                    tracing::info!(%banner, "chat server reachable");
                    ServerStatus::Online
                }
                Err(err) => {
                    tracing::warn!(error = %err, "chat server probe failed");
                    ServerStatus::Offline
                }
            };
            if tx.send(AppEvent::Status(status)).is_err() {
                tracing::debug!("event loop closed before server status arrived");
            }
        });
    }

    /// Send the draft. Does nothing for a blank draft or while a reply is pending.
    pub fn submit(&mut self) {
        let Some(request) = self.conversation.submit() else {
            return;
        };

        self.cursor = 0;
        self.follow_tail = true;
        self.animation_frame = 0;

        let client = self.client.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let outcome = ChatOutcome::from(client.chat(&request).await);
            if tx.send(AppEvent::Reply(outcome)).is_err() {
                tracing::debug!("event loop closed before chat reply arrived");
            }
        });
    }

    pub fn apply_reply(&mut self, outcome: ChatOutcome) {
        self.conversation.complete(outcome);
        self.follow_tail = true;
    }

    pub fn reset(&mut self) {
        tracing::info!("conversation reset");
        self.conversation.reset();
        self.chat_scroll = 0;
        self.follow_tail = true;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Draft editing. The input box is disabled while a reply is pending.

    /// Apply an edit to a copy of the draft and hand it back to the conversation
    fn edit_draft(&mut self, edit: impl FnOnce(&mut String, usize) -> usize) {
        if self.conversation.is_busy() {
            return;
        }
        let mut draft = self.conversation.draft().to_string();
        self.cursor = edit(&mut draft, self.cursor);
        self.conversation.update_draft(draft);
    }

    pub fn insert_char(&mut self, c: char) {
        self.edit_draft(|draft, cursor| {
            let byte_pos = char_to_byte_index(draft, cursor);
            draft.insert(byte_pos, c);
            cursor + 1
        });
    }

    pub fn insert_str(&mut self, text: &str) {
        // Normalise CRLF from pasted text
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        self.edit_draft(|draft, cursor| {
            let byte_pos = char_to_byte_index(draft, cursor);
            draft.insert_str(byte_pos, &text);
            cursor + text.chars().count()
        });
    }

    pub fn delete_before_cursor(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.edit_draft(|draft, cursor| {
            let byte_pos = char_to_byte_index(draft, cursor - 1);
            draft.remove(byte_pos);
            cursor - 1
        });
    }

    pub fn delete_at_cursor(&mut self) {
        self.edit_draft(|draft, cursor| {
            if cursor < draft.chars().count() {
                let byte_pos = char_to_byte_index(draft, cursor);
                draft.remove(byte_pos);
            }
            cursor
        });
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.conversation.draft().chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.conversation.draft().chars().count();
    }

    /// Draft text left of the cursor, split at the last newline: (row, text on that row)
    pub fn cursor_row_prefix(&self) -> (usize, String) {
        let before: String = self.conversation.draft().chars().take(self.cursor).collect();
        let row = before.matches('\n').count();
        let line = before.rsplit('\n').next().unwrap_or_default().to_string();
        (row, line)
    }

    // Message list scrolling

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.min(self.max_chat_scroll).saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
        if self.chat_scroll >= self.max_chat_scroll {
            self.chat_scroll = self.max_chat_scroll;
            self.follow_tail = true;
        }
    }

    pub fn page_height(&self) -> u16 {
        self.chat_area
            .map(|area| area.height.saturating_sub(2))
            .unwrap_or(10)
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatResponse;
    use crate::conversation::{Role, CLEARED_NOTICE};
    use tokio::sync::mpsc;

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        // Port 9 (discard) is never a chat server; requests fail fast or hang harmlessly.
        let app = App::new(ChatClient::new("http://127.0.0.1:9"), tx);
        (app, rx)
    }

    #[test]
    fn test_editing_handles_multibyte_cursor() {
        let (mut app, _rx) = test_app();
        for c in "안녕".chars() {
            app.insert_char(c);
        }
        app.cursor_left();
        app.insert_char('x');
        assert_eq!(app.conversation.draft(), "안x녕");
        assert_eq!(app.cursor, 2);

        app.delete_before_cursor();
        assert_eq!(app.conversation.draft(), "안녕");
        app.cursor_home();
        app.delete_at_cursor();
        assert_eq!(app.conversation.draft(), "녕");
        app.cursor_end();
        assert_eq!(app.cursor, 1);
    }

    #[test]
    fn test_paste_normalises_line_endings() {
        let (mut app, _rx) = test_app();
        app.insert_str("a\r\nb\rc");
        assert_eq!(app.conversation.draft(), "a\nb\nc");
        assert_eq!(app.cursor, 5);
        assert_eq!(app.cursor_row_prefix(), (2, "c".to_string()));
    }

    #[tokio::test]
    async fn test_submit_locks_input_until_reply() {
        let (mut app, _rx) = test_app();
        app.insert_str("hello");
        app.submit();

        assert!(app.conversation.is_busy());
        assert_eq!(app.cursor, 0);
        assert!(app.conversation.draft().is_empty());
        assert_eq!(app.conversation.messages().len(), 2);

        app.insert_char('x');
        assert!(app.conversation.draft().is_empty());

        app.apply_reply(ChatOutcome::Reply(ChatResponse {
            success: true,
            response: "hi".to_string(),
        }));
        assert!(!app.conversation.is_busy());
        assert_eq!(app.conversation.messages().last().unwrap().role, Role::Ai);
        app.insert_char('x');
        assert_eq!(app.conversation.draft(), "x");
    }

    #[tokio::test]
    async fn test_failed_request_posts_reply_event() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(ChatClient::new(&format!("http://{}", addr)), tx);
        app.insert_str("hello");
        app.submit();

        let event = rx.recv().await.expect("reply event");
        match event {
            AppEvent::Reply(outcome) => {
                assert!(matches!(outcome, ChatOutcome::Failed(_)));
                app.apply_reply(outcome);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!app.conversation.is_busy());
        assert_eq!(app.conversation.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_server_probe_reports_offline() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let app = App::new(ChatClient::new(&format!("http://{}", addr)), tx);
        app.check_server();

        match rx.recv().await.expect("status event") {
            AppEvent::Status(status) => assert_eq!(status, ServerStatus::Offline),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_edits_land_in_conversation_draft() {
        let (mut app, _rx) = test_app();
        app.insert_str("hi");
        assert!(app.conversation.can_submit());
        app.delete_before_cursor();
        app.delete_before_cursor();
        assert_eq!(app.conversation.draft(), "");
        assert!(!app.conversation.can_submit());
    }

    #[tokio::test]
    async fn test_blank_submit_spawns_nothing() {
        let (mut app, mut rx) = test_app();
        app.insert_str("  ");
        app.submit();
        assert!(!app.conversation.is_busy());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_reset_rearms_follow() {
        let (mut app, _rx) = test_app();
        app.max_chat_scroll = 10;
        app.chat_scroll = 10;
        app.scroll_up(3);
        assert!(!app.follow_tail);

        app.reset();
        assert!(app.follow_tail);
        assert_eq!(app.conversation.messages()[0].content, CLEARED_NOTICE);
    }

    #[test]
    fn test_scrolling_to_bottom_reattaches() {
        let (mut app, _rx) = test_app();
        app.max_chat_scroll = 20;
        app.chat_scroll = 20;

        app.scroll_up(5);
        assert_eq!(app.chat_scroll, 15);
        assert!(!app.follow_tail);

        app.scroll_down(2);
        assert!(!app.follow_tail);
        app.scroll_down(10);
        assert_eq!(app.chat_scroll, 20);
        assert!(app.follow_tail);
    }

    #[test]
    fn test_tick_only_animates_while_busy() {
        let (mut app, _rx) = test_app();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);
    }
}
