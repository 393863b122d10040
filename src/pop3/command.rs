//! POP3 command parsing
//!
//! Turns a raw command line into a closed [`Command`] enum so the
//! session state machine can match exhaustively. Anything the parser
//! does not recognize becomes [`Command::Unknown`] instead of falling
//! through a string match.

/// A message-number argument as written by the client.
///
/// Missing and non-numeric arguments both become [`MessageArg::Invalid`];
/// the session answers them exactly like a number that resolves to no
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageArg {
    Number(usize),
    Invalid,
}

impl MessageArg {
    fn parse(arg: Option<&str>) -> Self {
        arg.and_then(|s| s.parse().ok())
            .map_or(Self::Invalid, Self::Number)
    }
}

/// A parsed POP3 command. Command names are case-insensitive on the
/// wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    User(Option<String>),
    Pass,
    Stat,
    /// `LIST` with no argument asks for the full listing; with an
    /// argument it asks about a single message.
    List(Option<MessageArg>),
    Retr(MessageArg),
    Dele(MessageArg),
    Rset,
    Noop,
    Quit,
    Capa,
    Unknown(String),
}

impl Command {
    /// Parse a single command line (terminator already stripped).
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.trim().split_whitespace();
        let Some(name) = parts.next() else {
            return Self::Unknown(String::new());
        };

        match name.to_ascii_uppercase().as_str() {
            "USER" => Self::User(parts.next().map(ToString::to_string)),
            "PASS" => Self::Pass,
            "STAT" => Self::Stat,
            "LIST" => Self::List(parts.next().map(|arg| MessageArg::parse(Some(arg)))),
            "RETR" => Self::Retr(MessageArg::parse(parts.next())),
            "DELE" => Self::Dele(MessageArg::parse(parts.next())),
            "RSET" => Self::Rset,
            "NOOP" => Self::Noop,
            "QUIT" => Self::Quit,
            "CAPA" => Self::Capa,
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names_are_case_insensitive() {
        assert_eq!(Command::parse("stat"), Command::Stat);
        assert_eq!(Command::parse("Stat"), Command::Stat);
        assert_eq!(Command::parse("STAT"), Command::Stat);
    }

    #[test]
    fn user_keeps_its_argument() {
        assert_eq!(
            Command::parse("USER alice"),
            Command::User(Some("alice".to_string()))
        );
        assert_eq!(Command::parse("USER"), Command::User(None));
    }

    #[test]
    fn list_distinguishes_all_from_single() {
        assert_eq!(Command::parse("LIST"), Command::List(None));
        assert_eq!(
            Command::parse("LIST 3"),
            Command::List(Some(MessageArg::Number(3)))
        );
        assert_eq!(
            Command::parse("LIST abc"),
            Command::List(Some(MessageArg::Invalid))
        );
    }

    #[test]
    fn bad_message_numbers_parse_to_invalid() {
        assert_eq!(Command::parse("RETR abc"), Command::Retr(MessageArg::Invalid));
        assert_eq!(Command::parse("RETR"), Command::Retr(MessageArg::Invalid));
        assert_eq!(Command::parse("DELE"), Command::Dele(MessageArg::Invalid));
        assert_eq!(
            Command::parse("DELE 2"),
            Command::Dele(MessageArg::Number(2))
        );
    }

    #[test]
    fn leading_whitespace_is_tolerated() {
        assert_eq!(Command::parse("  NOOP "), Command::Noop);
    }

    #[test]
    fn unrecognized_text_maps_to_unknown() {
        assert_eq!(
            Command::parse("XFROB 1"),
            Command::Unknown("XFROB".to_string())
        );
        assert_eq!(Command::parse(""), Command::Unknown(String::new()));
    }
}
