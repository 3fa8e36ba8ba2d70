//! WebSocket upgrade + message loop. Each connection owns one quiz session,
//! the player's credential and name. Client messages and countdown ticks are
//! handled in the same loop, so session mutations never run concurrently.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{QuizResult, Submission};
use crate::logic;
use crate::protocol::{session_view, ClientWsMessage, ResultOut, ServerWsMessage};
use crate::session::{QuizSession, SessionStatus, SubmitGate, TickOutcome};
use crate::state::AppState;
use crate::timer::{spawn_countdown, Tick, TICK_INTERVAL};

const TICK_BUFFER: usize = 8;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quizmaster_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Everything one client owns. Dropped when the socket closes.
struct ClientContext {
  engine: QuizSession,
  credential: Option<String>,
  player: String,
  ticks: mpsc::Sender<Tick>,
  /// Result the scoring authority returned for a session, so it is settled once.
  settled: Option<(Uuid, QuizResult)>,
}

impl ClientContext {
  fn new(ticks: mpsc::Sender<Tick>) -> Self {
    Self {
      engine: QuizSession::default(),
      credential: None,
      player: logic::normalize_player(None),
      ticks,
      settled: None,
    }
  }

  /// Connection gone: an attempt still running is abandoned, which stops its countdown.
  fn close(&mut self) {
    if self.engine.status() == SessionStatus::InProgress {
      let _ = self.engine.abandon();
      info!(target: "session", player = %self.player, "Session abandoned on disconnect");
    }
  }
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "quizmaster_backend", "WebSocket connected");
  let (tick_tx, mut tick_rx) = mpsc::channel::<Tick>(TICK_BUFFER);
  let mut ctx = ClientContext::new(tick_tx);

  loop {
    let reply = tokio::select! {
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(txt))) => Some(match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(msg) => {
            debug!(target: "quizmaster_backend", kind = msg.kind(), "WS received");
            handle_client_ws(msg, &mut ctx, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        }),
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
          None
        }
        Some(Ok(Message::Close(_))) | None => break,
        Some(Err(e)) => {
          warn!(target: "quizmaster_backend", error = %e, "WS receive error");
          break;
        }
        Some(Ok(_)) => None,
      },
      Some(tick) = tick_rx.recv() => on_tick(tick, &mut ctx, &state).await,
    };

    let Some(reply) = reply else { continue };
    let out = serde_json::to_string(&reply).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
    });
    if let Err(e) = socket.send(Message::Text(out)).await {
      error!(target: "quizmaster_backend", error = %e, "WS send error");
      break;
    }
  }

  ctx.close();
  info!(target: "quizmaster_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(msg, ctx, state), fields(kind = msg.kind(), player = %ctx.player))]
async fn handle_client_ws(msg: ClientWsMessage, ctx: &mut ClientContext, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Auth { token, player } => {
      ctx.credential = token.filter(|t| !t.trim().is_empty());
      ctx.player = logic::normalize_player(player.as_deref());
      info!(target: "quizmaster_backend", player = %ctx.player, has_credential = ctx.credential.is_some(), "WS client identified");
      ServerWsMessage::Authenticated { player: ctx.player.clone(), has_credential: ctx.credential.is_some() }
    }

    ClientWsMessage::ListQuizzes => {
      let (quizzes, source) = state.list_quizzes().await;
      ServerWsMessage::Quizzes { quizzes, source: source.to_string() }
    }

    ClientWsMessage::StartQuiz { quiz_id } => {
      let quiz = match state.fetch_quiz(&quiz_id).await {
        Ok(q) => q,
        Err(e) => return ServerWsMessage::Error { message: format!("Could not load quiz {}: {}", quiz_id, e) },
      };
      match ctx.engine.start(quiz) {
        Ok(active) => {
          if active.remaining_secs().is_some() {
            spawn_countdown(active.id(), TICK_INTERVAL, active.timer_token(), ctx.ticks.clone());
          }
          ServerWsMessage::Session { session: session_view(active) }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::SelectAnswer { option_index } => match ctx.engine.select_answer(option_index) {
      Ok(()) => current_view(ctx),
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::Advance { delta } => {
      ctx.engine.advance(delta);
      current_view(ctx)
    }

    ClientWsMessage::RequestSubmit => match ctx.engine.request_submit() {
      Ok(SubmitGate::Confirm { unanswered, remaining_secs }) => {
        ServerWsMessage::ConfirmSubmit { unanswered, remaining_secs }
      }
      Ok(SubmitGate::Done(_)) => settle(ctx, state).await,
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::ConfirmSubmit => match ctx.engine.confirm_submit() {
      Ok(_) => settle(ctx, state).await,
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::DeclineSubmit => {
      ctx.engine.decline_submit();
      current_view(ctx)
    }

    ClientWsMessage::Abandon => match ctx.engine.abandon() {
      Ok(()) => ServerWsMessage::Abandoned,
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },
  }
}

/// Countdown tick for this connection. Ticks from an earlier session are dropped.
async fn on_tick(tick: Tick, ctx: &mut ClientContext, state: &AppState) -> Option<ServerWsMessage> {
  if ctx.engine.session_id() != Some(tick.session_id) {
    debug!(target: "session", session_id = %tick.session_id, "Stale tick ignored");
    return None;
  }
  match ctx.engine.tick() {
    Ok(TickOutcome::Remaining(remaining_secs)) => Some(ServerWsMessage::Tick { remaining_secs }),
    Ok(TickOutcome::Expired(_)) => Some(settle(ctx, state).await),
    Ok(TickOutcome::Untimed | TickOutcome::Inactive) => None,
    Err(e) => Some(ServerWsMessage::Error { message: e.to_string() }),
  }
}

fn current_view(ctx: &ClientContext) -> ServerWsMessage {
  match ctx.engine.active() {
    Some(active) => ServerWsMessage::Session { session: session_view(active) },
    None => ServerWsMessage::Error { message: "No quiz session has been started".into() },
  }
}

/// Hand the locally scored attempt to the scoring authority, once per session.
async fn settle(ctx: &mut ClientContext, state: &AppState) -> ServerWsMessage {
  let Some((active, local)) = ctx.engine.active().and_then(|a| a.result().map(|r| (a, Arc::clone(r)))) else {
    return ServerWsMessage::Error { message: "No submitted quiz session".into() };
  };
  let trigger = active.submitted_by();
  if let Some((id, result)) = &ctx.settled {
    if *id == active.id() {
      return ServerWsMessage::Result { outcome: ResultOut::from(result.clone()), trigger };
    }
  }

  let session_id = active.id();
  let quiz = Arc::clone(active.quiz());
  let submission = Submission {
    quiz_id: quiz.id.clone(),
    answers: active.answers().to_vec(),
    time_taken_secs: local.time_taken_secs,
    player: ctx.player.clone(),
  };
  match logic::settle_result(state, &quiz, &submission, ctx.credential.as_deref(), Some((*local).clone())).await {
    Ok(result) => {
      info!(target: "session", %session_id, result_id = %result.id, scored_by = ?result.scored_by, "Session result settled");
      ctx.settled = Some((session_id, result.clone()));
      ServerWsMessage::Result { outcome: result.into(), trigger }
    }
    Err(e) => {
      error!(target: "session", %session_id, error = %e, "Submission could not be scored");
      ServerWsMessage::Error { message: format!("Submission could not be scored: {}", e) }
    }
  }
}
