//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{QuizResult, QuizSummary};
use crate::session::{ActiveSession, SessionStatus, SubmitTrigger};
use crate::stats::LeaderboardEntry;

/// Player name used until the client says otherwise.
pub const DEFAULT_PLAYER: &str = "guest";

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Auth {
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        player: Option<String>,
    },
    ListQuizzes,
    StartQuiz {
        #[serde(rename = "quizId")]
        quiz_id: String,
    },
    SelectAnswer {
        #[serde(rename = "optionIndex")]
        option_index: usize,
    },
    Advance {
        delta: i64,
    },
    RequestSubmit,
    ConfirmSubmit,
    DeclineSubmit,
    Abandon,
}

impl ClientWsMessage {
    /// Wire tag, for logs. Never log the message itself: `auth` carries a token.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientWsMessage::Ping => "ping",
            ClientWsMessage::Auth { .. } => "auth",
            ClientWsMessage::ListQuizzes => "list_quizzes",
            ClientWsMessage::StartQuiz { .. } => "start_quiz",
            ClientWsMessage::SelectAnswer { .. } => "select_answer",
            ClientWsMessage::Advance { .. } => "advance",
            ClientWsMessage::RequestSubmit => "request_submit",
            ClientWsMessage::ConfirmSubmit => "confirm_submit",
            ClientWsMessage::DeclineSubmit => "decline_submit",
            ClientWsMessage::Abandon => "abandon",
        }
    }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Authenticated {
        player: String,
        #[serde(rename = "hasCredential")]
        has_credential: bool,
    },
    Quizzes {
        quizzes: Vec<QuizSummary>,
        source: String,
    },
    Session {
        session: SessionView,
    },
    ConfirmSubmit {
        unanswered: usize,
        #[serde(rename = "remainingSecs")]
        remaining_secs: Option<u32>,
    },
    Tick {
        #[serde(rename = "remainingSecs")]
        remaining_secs: u32,
    },
    Result {
        #[serde(flatten)]
        outcome: ResultOut,
        trigger: Option<SubmitTrigger>,
    },
    Abandoned,
    Error {
        message: String,
    },
}

/// The question currently on screen. Never carries the answer key.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
}

/// Snapshot of a running (or just finished) session for the client to render.
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "quizId")]
    pub quiz_id: String,
    #[serde(rename = "quizTitle")]
    pub quiz_title: String,
    pub status: SessionStatus,
    pub index: usize,
    #[serde(rename = "totalQuestions")]
    pub total_questions: usize,
    pub question: QuestionOut,
    pub selected: Option<usize>,
    pub answered: usize,
    #[serde(rename = "remainingSecs")]
    pub remaining_secs: Option<u32>,
    #[serde(rename = "confirmPending")]
    pub confirm_pending: bool,
}

/// Convert the internal session to the public DTO.
pub fn session_view(s: &ActiveSession) -> SessionView {
    let q = s.current_question();
    SessionView {
        session_id: s.id().to_string(),
        quiz_id: s.quiz().id.clone(),
        quiz_title: s.quiz().title.clone(),
        status: s.status(),
        index: s.index(),
        total_questions: s.answers().len(),
        question: QuestionOut {
            id: q.id.clone(),
            prompt: q.prompt.clone(),
            options: q.options.clone(),
        },
        selected: s.answers()[s.index()],
        answered: s.answers().len() - s.unanswered(),
        remaining_secs: s.remaining_secs(),
        confirm_pending: s.confirm_pending(),
    }
}

/// DTO used by both WS and HTTP for result delivery.
#[derive(Debug, Serialize)]
pub struct ResultOut {
    pub result: QuizResult,
    /// Whole-percent value for display; `result.percentage` stays exact.
    #[serde(rename = "displayPercentage")]
    pub display_percentage: u32,
}

impl From<QuizResult> for ResultOut {
    fn from(result: QuizResult) -> Self {
        let display_percentage = result.scorecard.rounded_percentage();
        Self { result, display_percentage }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub status: &'static str,
    #[serde(rename = "remoteCatalog")]
    pub remote_catalog: bool,
}

#[derive(Serialize)]
pub struct QuizListOut {
    pub quizzes: Vec<QuizSummary>,
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitIn {
    pub answers: Vec<Option<usize>>,
    #[serde(rename = "timeTaken", default)]
    pub time_taken: u64,
    #[serde(default)]
    pub player: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlayerQuery {
    pub player: Option<String>,
}

#[derive(Serialize)]
pub struct ResultListOut {
    pub results: Vec<QuizResult>,
}

#[derive(Serialize)]
pub struct LeaderboardOut {
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::quiz_with_keys;
    use crate::session::QuizSession;

    #[test]
    fn client_messages_use_snake_case_tags_and_camel_fields() {
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"start_quiz","quizId":"science"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::StartQuiz { quiz_id } if quiz_id == "science"));

        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"select_answer","optionIndex":2}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::SelectAnswer { option_index: 2 }));

        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"auth"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::Auth { token: None, player: None }));

        assert!(serde_json::from_str::<ClientWsMessage>(r#"{"type":"select_answer","optionIndex":-1}"#).is_err());
    }

    #[test]
    fn session_view_hides_answer_keys() {
        let mut engine = QuizSession::default();
        engine.start(quiz_with_keys("v", &[1, 2], Some(30))).unwrap();
        engine.select_answer(1).unwrap();
        let view = session_view(engine.active().unwrap());

        assert_eq!(view.total_questions, 2);
        assert_eq!(view.selected, Some(1));
        assert_eq!(view.answered, 1);
        assert_eq!(view.remaining_secs, Some(30));

        let json = serde_json::to_value(ServerWsMessage::Session { session: view }).unwrap();
        assert_eq!(json["type"], "session");
        assert_eq!(json["session"]["status"], "in_progress");
        assert!(json["session"]["question"].get("correct_index").is_none());
    }

    #[test]
    fn result_message_flattens_outcome() {
        let quiz = quiz_with_keys("r", &[1, 2, 3], None);
        let card = crate::scorer::score(&quiz.questions, &[Some(1), None, Some(3)]);
        let msg = ServerWsMessage::Result {
            outcome: QuizResult::scored_locally(&quiz, card, 12).into(),
            trigger: Some(SubmitTrigger::Manual),
        };
        let json = serde_json::to_value(msg).unwrap();
        assert_eq!(json["type"], "result");
        assert_eq!(json["displayPercentage"], 67);
        assert_eq!(json["result"]["score"], 2);
        assert_eq!(json["trigger"], "manual");
    }
}
