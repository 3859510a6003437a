//! Domain logic for client-side operations.
//!
//! Pure functions: input parsing and the reconnection policy.

use between_server::infrastructure::dto::websocket::ThresholdRequest;

use crate::error::ClientError;

/// One line of user input, interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Name(String),
    Witness,
    Quit,
}

impl Command {
    /// The request sent to the threshold, if any
    pub fn to_request(&self) -> Option<ThresholdRequest> {
        match self {
            Command::Say(content) => Some(ThresholdRequest::Message {
                content: content.clone(),
            }),
            Command::Name(name) => Some(ThresholdRequest::Name { name: name.clone() }),
            Command::Witness => Some(ThresholdRequest::Witness),
            Command::Quit => None,
        }
    }
}

/// Interpret a line of input. Blank lines and `/name` without a name are ignored.
pub fn parse_input(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line {
        "/quit" => return Some(Command::Quit),
        "/witness" => return Some(Command::Witness),
        _ => {}
    }
    if let Some(name) = line.strip_prefix("/name") {
        let name = name.trim();
        return (!name.is_empty()).then(|| Command::Name(name.to_string()));
    }
    Some(Command::Say(line.to_string()))
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The number of reconnection attempts already made
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if matches!(error, ClientError::ReconnectExhausted(_)) {
        return false;
    }
    current_attempt < max_attempts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_spoken() {
        // テスト項目: コマンドでない行は発言になる
        // given (前提条件):
        let line = "  is anyone here?  ";

        // when (操作):
        let result = parse_input(line);

        // then (期待する結果):
        assert_eq!(result, Some(Command::Say("is anyone here?".to_string())));
    }

    #[test]
    fn test_commands_are_recognised() {
        // テスト項目: /name・/witness・/quit がコマンドとして解釈される
        // given (前提条件):
        let lines = ["/name wren", "/witness", "/quit"];

        // when (操作):
        let results: Vec<Option<Command>> = lines.iter().map(|l| parse_input(l)).collect();

        // then (期待する結果):
        assert_eq!(
            results,
            vec![
                Some(Command::Name("wren".to_string())),
                Some(Command::Witness),
                Some(Command::Quit),
            ]
        );
    }

    #[test]
    fn test_blank_input_and_empty_name_are_ignored() {
        // テスト項目: 空行と名前なしの /name は無視される
        // given (前提条件):
        let lines = ["", "   ", "/name", "/name   "];

        for line in lines {
            // when (操作):
            let result = parse_input(line);

            // then (期待する結果):
            assert_eq!(result, None, "line: {:?}", line);
        }
    }

    #[test]
    fn test_quit_sends_nothing() {
        // テスト項目: /quit はサーバーへ何も送らない
        // given (前提条件):
        let command = Command::Quit;

        // when (操作):
        let request = command.to_request();

        // then (期待する結果):
        assert_eq!(request, None);
        assert_eq!(
            Command::Witness.to_request(),
            Some(ThresholdRequest::Witness)
        );
    }

    #[test]
    fn test_should_attempt_reconnect_within_limit() {
        // テスト項目: 再接続回数が上限未満の場合、再接続すべきと判定される
        // given (前提条件):
        let error = ClientError::ConnectionLost;

        // when (操作):
        let result = should_attempt_reconnect(&error, 4, 5);

        // then (期待する結果):
        assert!(result);
    }

    #[test]
    fn test_should_attempt_reconnect_at_limit() {
        // テスト項目: 再接続回数が上限に達した場合、再接続すべきではないと判定される
        // given (前提条件):
        let error = ClientError::ConnectionError("refused".to_string());

        // when (操作):
        let result = should_attempt_reconnect(&error, 5, 5);

        // then (期待する結果):
        assert!(!result);
    }
}
