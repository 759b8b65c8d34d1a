//! Server-to-client text rendering.
//!
//! The protocol is plain newline-delimited text meant to be read in a
//! netcat-style terminal. Prompts are written without a trailing newline so
//! the client types on the same line; everything else ends with `\n`.

use netchat_core::{Timestamp, Username};

/// Prompt sent while negotiating a username.
pub const NAME_PROMPT: &str = "[ENTER YOUR NAME]: ";

/// Notice for a syntactically invalid username.
pub const INVALID_USERNAME_NOTICE: &str = "Username must be alphanumeric and max 20 characters!";

/// Notice for a username another live session has claimed.
pub const USERNAME_TAKEN_NOTICE: &str = "This username is already taken!";

/// Notice sent to a connection that arrives while the server is at capacity.
pub const SERVER_FULL_NOTICE: &str = "Server is full. Please try again later.";

/// Greeting used when the banner asset cannot be loaded.
pub const DEFAULT_GREETING: &str = "Welcome to the chat server!\n";

/// Lines the server writes to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    /// `[ENTER YOUR NAME]: `
    NamePrompt,

    /// Username failed validation
    InvalidUsername,

    /// Username already claimed
    UsernameTaken,

    /// Capacity reached; the connection is about to close
    ServerFull,

    /// Live message prompt: `[ts][username]: `
    Prompt {
        /// Time shown in the prompt
        at: Timestamp,
        /// Recipient's own username
        username: Username,
    },

    /// Another client's message or a join/leave announcement, set apart
    /// from whatever the recipient had half-typed: `\n<text>\n`
    Relay {
        /// Fully rendered text
        text: String,
    },

    /// A transcript line replayed verbatim: `<line>\n`
    History {
        /// Stored line without terminator
        line: String,
    },
}

impl ServerLine {
    /// Creates a prompt for `username` stamped with `at`.
    pub fn prompt(at: Timestamp, username: &Username) -> Self {
        Self::Prompt {
            at,
            username: username.clone(),
        }
    }

    /// Creates a relayed line.
    pub fn relay(text: impl Into<String>) -> Self {
        Self::Relay { text: text.into() }
    }

    /// Creates a replayed history line.
    pub fn history(line: impl Into<String>) -> Self {
        Self::History { line: line.into() }
    }

    /// Creates the announcement relayed when `username` joins.
    pub fn joined(username: &Username) -> Self {
        Self::relay(join_announcement(username))
    }

    /// Creates the announcement relayed when `username` leaves.
    pub fn left(username: &Username) -> Self {
        Self::relay(leave_announcement(username))
    }

    /// Renders the exact text written to the socket.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::NamePrompt => NAME_PROMPT.to_string(),
            Self::InvalidUsername => format!("{INVALID_USERNAME_NOTICE}\n"),
            Self::UsernameTaken => format!("{USERNAME_TAKEN_NOTICE}\n"),
            Self::ServerFull => format!("{SERVER_FULL_NOTICE}\n"),
            Self::Prompt { at, username } => format!("[{at}][{username}]: "),
            Self::Relay { text } => format!("\n{text}\n"),
            Self::History { line } => format!("{line}\n"),
        }
    }
}

/// `<username> has joined the chat...`
#[must_use]
pub fn join_announcement(username: &Username) -> String {
    format!("{username} has joined the chat...")
}

/// `<username> has left the chat...`
#[must_use]
pub fn leave_announcement(username: &Username) -> String {
    format!("{username} has left the chat...")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Username {
        Username::parse("alice").unwrap()
    }

    #[test]
    fn test_fixed_notices() {
        assert_eq!(ServerLine::NamePrompt.render(), "[ENTER YOUR NAME]: ");
        assert_eq!(
            ServerLine::InvalidUsername.render(),
            "Username must be alphanumeric and max 20 characters!\n"
        );
        assert_eq!(
            ServerLine::UsernameTaken.render(),
            "This username is already taken!\n"
        );
        assert_eq!(
            ServerLine::ServerFull.render(),
            "Server is full. Please try again later.\n"
        );
    }

    #[test]
    fn test_prompt_render() {
        let at = Timestamp::now();
        let line = ServerLine::prompt(at, &alice());
        assert_eq!(line.render(), format!("[{at}][alice]: "));
        assert!(!line.render().ends_with('\n'));
    }

    #[test]
    fn test_relay_is_set_apart() {
        let line = ServerLine::relay("[2024-01-01 00:00:00][bob]: hi");
        assert_eq!(line.render(), "\n[2024-01-01 00:00:00][bob]: hi\n");
    }

    #[test]
    fn test_announcements() {
        assert_eq!(
            ServerLine::joined(&alice()).render(),
            "\nalice has joined the chat...\n"
        );
        assert_eq!(
            ServerLine::left(&alice()).render(),
            "\nalice has left the chat...\n"
        );
    }

    #[test]
    fn test_history_line_is_verbatim() {
        let stored = "[2024-01-01 00:00:00][bob]: hi";
        assert_eq!(ServerLine::history(stored).render(), format!("{stored}\n"));
    }
}
