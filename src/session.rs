//! Quiz session engine: one player's attempt at one quiz.
//!
//! States: `idle -> in_progress -> submitted` or `in_progress -> abandoned`.
//! Both end states are terminal. The status field gates every mutating call,
//! and a failed call leaves the session exactly as it was.
//!
//! The engine is synchronous. Timers and network calls live with the owner,
//! which feeds ticks in through `tick()`. Each session owns a cancellation
//! token; countdowns run on child tokens and stop once the session leaves
//! `in_progress`.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{Question, Quiz, QuizResult};
use crate::error::SessionError;
use crate::scorer;
use crate::timer::{Clock, SystemClock};

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
  Idle,
  InProgress,
  Submitted,
  Abandoned,
}

/// What ended the attempt.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
  Manual,
  TimerExpired,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
  /// Session is untimed; nothing to count.
  Untimed,
  /// Session already left `in_progress`; stale tick ignored.
  Inactive,
  Remaining(u32),
  /// Countdown hit zero and the session was submitted.
  Expired(Arc<QuizResult>),
}

/// Answer to a manual submit request.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitGate {
  /// Ask the player to confirm. The countdown keeps running meanwhile.
  Confirm { unanswered: usize, remaining_secs: Option<u32> },
  /// Already submitted (e.g. the timer won the race).
  Done(Arc<QuizResult>),
}

#[derive(Debug)]
pub struct ActiveSession {
  id: Uuid,
  quiz: Arc<Quiz>,
  index: usize,
  answers: Vec<Option<usize>>,
  started_at: Instant,
  remaining: Option<u32>,
  status: SessionStatus,
  confirm_pending: bool,
  submitted_by: Option<SubmitTrigger>,
  result: Option<Arc<QuizResult>>,
  cancel: CancellationToken,
}

impl ActiveSession {
  pub fn id(&self) -> Uuid { self.id }
  pub fn quiz(&self) -> &Arc<Quiz> { &self.quiz }
  pub fn index(&self) -> usize { self.index }
  pub fn answers(&self) -> &[Option<usize>] { &self.answers }
  pub fn remaining_secs(&self) -> Option<u32> { self.remaining }
  pub fn status(&self) -> SessionStatus { self.status }
  pub fn confirm_pending(&self) -> bool { self.confirm_pending }
  pub fn submitted_by(&self) -> Option<SubmitTrigger> { self.submitted_by }
  pub fn result(&self) -> Option<&Arc<QuizResult>> { self.result.as_ref() }

  pub fn current_question(&self) -> &Question {
    &self.quiz.questions[self.index]
  }

  pub fn unanswered(&self) -> usize {
    self.answers.iter().filter(|a| a.is_none()).count()
  }

  /// Token a countdown for this session should be armed with.
  pub fn timer_token(&self) -> CancellationToken {
    self.cancel.child_token()
  }

  fn is_in_progress(&self) -> bool {
    self.status == SessionStatus::InProgress
  }
}

/// Session holder owned by a single caller context.
pub struct QuizSession {
  clock: Arc<dyn Clock>,
  active: Option<ActiveSession>,
}

impl Default for QuizSession {
  fn default() -> Self {
    Self::new(Arc::new(SystemClock))
  }
}

impl QuizSession {
  pub fn new(clock: Arc<dyn Clock>) -> Self {
    Self { clock, active: None }
  }

  pub fn active(&self) -> Option<&ActiveSession> {
    self.active.as_ref()
  }

  pub fn status(&self) -> SessionStatus {
    self.active.as_ref().map(|s| s.status).unwrap_or(SessionStatus::Idle)
  }

  pub fn session_id(&self) -> Option<Uuid> {
    self.active.as_ref().map(|s| s.id)
  }

  /// Begin a new attempt. An attempt still in progress is abandoned first.
  #[instrument(level = "info", skip(self, quiz), fields(quiz_id = %quiz.id, questions = quiz.questions.len()))]
  pub fn start(&mut self, quiz: Quiz) -> Result<&ActiveSession, SessionError> {
    validate(&quiz)?;

    if let Some(prev) = self.active.as_mut() {
      if prev.is_in_progress() {
        warn!(target: "session", session_id = %prev.id, "Starting a new quiz; abandoning the one in progress");
        prev.status = SessionStatus::Abandoned;
        prev.cancel.cancel();
      }
    }

    let session = ActiveSession {
      id: Uuid::new_v4(),
      remaining: quiz.effective_time_limit(),
      answers: vec![None; quiz.questions.len()],
      quiz: Arc::new(quiz),
      index: 0,
      started_at: self.clock.now(),
      status: SessionStatus::InProgress,
      confirm_pending: false,
      submitted_by: None,
      result: None,
      cancel: CancellationToken::new(),
    };
    info!(target: "session", session_id = %session.id, time_limit = ?session.remaining, "Quiz session started");
    Ok(self.active.insert(session))
  }

  /// Record `option` for the current question, replacing any earlier choice.
  pub fn select_answer(&mut self, option: usize) -> Result<(), SessionError> {
    let s = self.active.as_mut().ok_or(SessionError::EmptySession)?;
    if !s.is_in_progress() {
      return Err(SessionError::SessionClosed);
    }
    let options = s.current_question().options.len();
    if option >= options {
      return Err(SessionError::IndexOutOfRange { option, options });
    }
    s.answers[s.index] = Some(option);
    debug!(target: "session", session_id = %s.id, index = s.index, option, "Answer selected");
    Ok(())
  }

  /// Move by `delta` questions, clamped to the quiz bounds. Returns the index
  /// after the move, or `None` with no session.
  pub fn advance(&mut self, delta: i64) -> Option<usize> {
    let s = self.active.as_mut()?;
    if s.is_in_progress() {
      let last = (s.quiz.questions.len() - 1) as i64;
      s.index = (s.index as i64).saturating_add(delta).clamp(0, last) as usize;
    }
    Some(s.index)
  }

  /// One countdown interval elapsed. Expiry submits regardless of a pending confirmation.
  ///
  /// Each tick takes at least one second off, and never leaves more than the
  /// clock says is left, so delayed or dropped ticks cannot stretch the limit.
  pub fn tick(&mut self) -> Result<TickOutcome, SessionError> {
    let now = self.clock.now();
    let s = self.active.as_mut().ok_or(SessionError::EmptySession)?;
    if !s.is_in_progress() {
      return Ok(TickOutcome::Inactive);
    }
    let Some(remaining) = s.remaining else {
      return Ok(TickOutcome::Untimed);
    };
    let limit = s.quiz.effective_time_limit().unwrap_or(remaining);
    let elapsed = now.saturating_duration_since(s.started_at).as_secs();
    let by_clock = u64::from(limit).saturating_sub(elapsed) as u32;
    let remaining = remaining.saturating_sub(1).min(by_clock);
    s.remaining = Some(remaining);
    if remaining > 0 {
      return Ok(TickOutcome::Remaining(remaining));
    }
    info!(target: "session", session_id = %s.id, "Time limit reached; submitting");
    let result = self.finish(SubmitTrigger::TimerExpired)?;
    Ok(TickOutcome::Expired(result))
  }

  /// Manual submit, first step: ask for confirmation.
  pub fn request_submit(&mut self) -> Result<SubmitGate, SessionError> {
    let s = self.active.as_mut().ok_or(SessionError::EmptySession)?;
    match s.status {
      SessionStatus::Submitted => match &s.result {
        Some(r) => Ok(SubmitGate::Done(r.clone())),
        None => Err(SessionError::SessionClosed),
      },
      SessionStatus::InProgress => {
        s.confirm_pending = true;
        Ok(SubmitGate::Confirm { unanswered: s.unanswered(), remaining_secs: s.remaining })
      }
      _ => Err(SessionError::SessionClosed),
    }
  }

  pub fn confirm_submit(&mut self) -> Result<Arc<QuizResult>, SessionError> {
    self.submit()
  }

  /// Player backed out of the confirmation. The countdown carries on where it was.
  pub fn decline_submit(&mut self) -> Option<u32> {
    let s = self.active.as_mut()?;
    if s.is_in_progress() {
      s.confirm_pending = false;
    }
    s.remaining
  }

  /// Submit the attempt. Only the first call scores; later calls return the same result.
  pub fn submit(&mut self) -> Result<Arc<QuizResult>, SessionError> {
    self.finish(SubmitTrigger::Manual)
  }

  /// Leave without submitting. No result is produced.
  pub fn abandon(&mut self) -> Result<(), SessionError> {
    let s = self.active.as_mut().ok_or(SessionError::EmptySession)?;
    if s.is_in_progress() {
      s.status = SessionStatus::Abandoned;
      s.confirm_pending = false;
      s.cancel.cancel();
      info!(target: "session", session_id = %s.id, answered = s.answers.len() - s.unanswered(), "Quiz session abandoned");
    }
    Ok(())
  }

  fn finish(&mut self, trigger: SubmitTrigger) -> Result<Arc<QuizResult>, SessionError> {
    let now = self.clock.now();
    let s = self.active.as_mut().ok_or(SessionError::EmptySession)?;
    match s.status {
      SessionStatus::Submitted => {
        return s.result.clone().ok_or(SessionError::SessionClosed);
      }
      SessionStatus::Abandoned | SessionStatus::Idle => return Err(SessionError::SessionClosed),
      SessionStatus::InProgress => {}
    }

    let scorecard = scorer::score(&s.quiz.questions, &s.answers);
    let time_taken_secs = whole_seconds(now.saturating_duration_since(s.started_at));
    let result = Arc::new(QuizResult::scored_locally(&s.quiz, scorecard, time_taken_secs));

    s.status = SessionStatus::Submitted;
    s.confirm_pending = false;
    s.submitted_by = Some(trigger);
    s.result = Some(result.clone());
    s.cancel.cancel();
    info!(
      target: "session",
      session_id = %s.id,
      ?trigger,
      score = result.scorecard.score,
      total = result.scorecard.total_questions,
      time_taken_secs = result.time_taken_secs,
      "Quiz session submitted"
    );
    Ok(result)
  }
}

fn validate(quiz: &Quiz) -> Result<(), SessionError> {
  if quiz.questions.is_empty() {
    return Err(SessionError::InvalidQuiz(format!("quiz {} has no questions", quiz.id)));
  }
  for (i, q) in quiz.questions.iter().enumerate() {
    if q.options.len() < 2 {
      return Err(SessionError::InvalidQuiz(format!("question {} has fewer than two options", i + 1)));
    }
    if let Some(c) = q.correct_index {
      if c >= q.options.len() {
        return Err(SessionError::InvalidQuiz(format!("question {} has answer key {} out of range", i + 1, c)));
      }
    }
  }
  Ok(())
}

/// Round to the nearest whole second.
fn whole_seconds(d: Duration) -> u64 {
  ((d.as_millis() + 500) / 1000) as u64
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{fixtures::quiz_with_keys, ScoringAuthority};
  use crate::timer::manual::ManualClock;

  fn engine() -> (QuizSession, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    (QuizSession::new(clock.clone()), clock)
  }

  #[test]
  fn start_initializes_first_question_and_empty_slots() {
    let (mut e, _) = engine();
    let s = e.start(quiz_with_keys("a", &[1, 2, 3, 0], None)).expect("start");
    assert_eq!(s.index(), 0);
    assert_eq!(s.answers(), &[None, None, None, None]);
    assert_eq!(s.status(), SessionStatus::InProgress);
    assert_eq!(s.remaining_secs(), None);
  }

  #[test]
  fn start_rejects_empty_and_malformed_quizzes_without_touching_state() {
    let (mut e, _) = engine();
    let empty = quiz_with_keys("e", &[], None);
    assert!(matches!(e.start(empty), Err(SessionError::InvalidQuiz(_))));
    assert_eq!(e.status(), SessionStatus::Idle);

    e.start(quiz_with_keys("ok", &[1], None)).unwrap();
    let id = e.session_id();
    let mut bad = quiz_with_keys("bad", &[9], None);
    bad.questions[0].correct_index = Some(9);
    assert!(matches!(e.start(bad), Err(SessionError::InvalidQuiz(_))));
    assert_eq!(e.session_id(), id);
    assert_eq!(e.status(), SessionStatus::InProgress);
  }

  #[test]
  fn select_answer_overwrites_and_checks_bounds() {
    let (mut e, _) = engine();
    e.start(quiz_with_keys("a", &[1, 2], None)).unwrap();
    e.select_answer(0).unwrap();
    e.select_answer(3).unwrap();
    assert_eq!(
      e.select_answer(4),
      Err(SessionError::IndexOutOfRange { option: 4, options: 4 })
    );
    let s = e.active().unwrap();
    assert_eq!(s.answers(), &[Some(3), None]);
    assert_eq!(s.index(), 0, "selecting never advances");
  }

  #[test]
  fn slot_count_is_invariant_under_any_selection_sequence() {
    let (mut e, _) = engine();
    e.start(quiz_with_keys("a", &[0, 1, 2], None)).unwrap();
    for step in 0..50i64 {
      let _ = e.select_answer((step % 7) as usize);
      e.advance(if step % 3 == 0 { -1 } else { 1 });
      let s = e.active().unwrap();
      assert_eq!(s.answers().len(), 3);
      assert!(s.answers().iter().all(|a| a.map_or(true, |o| o < 4)));
    }
  }

  #[test]
  fn advance_clamps_for_any_delta() {
    let (mut e, _) = engine();
    e.start(quiz_with_keys("a", &[1, 2, 3], None)).unwrap();
    for _ in 0..10 {
      assert!(e.advance(1).unwrap() <= 2);
    }
    assert_eq!(e.active().unwrap().index(), 2);
    assert_eq!(e.advance(i64::MIN), Some(0));
    assert_eq!(e.advance(i64::MAX), Some(2));
    assert_eq!(e.advance(-1), Some(1));
    assert_eq!(e.status(), SessionStatus::InProgress, "running off the end never submits");
  }

  #[test]
  fn advance_without_session_is_none() {
    let (mut e, _) = engine();
    assert_eq!(e.advance(1), None);
  }

  #[test]
  fn submit_scores_once_and_is_idempotent() {
    let (mut e, clock) = engine();
    e.start(quiz_with_keys("a", &[1, 2, 3], None)).unwrap();
    e.select_answer(1).unwrap();
    e.advance(2);
    e.select_answer(3).unwrap();
    clock.advance(Duration::from_millis(41_600));

    let first = e.submit().unwrap();
    let second = e.submit().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.scorecard.score, 2);
    assert_eq!(first.scorecard.rounded_percentage(), 67);
    assert_eq!(first.time_taken_secs, 42);
    assert_eq!(first.scored_by, ScoringAuthority::Local);
    assert_eq!(e.status(), SessionStatus::Submitted);
    assert_eq!(e.active().unwrap().submitted_by(), Some(SubmitTrigger::Manual));
  }

  #[test]
  fn operations_before_start_report_empty_session() {
    let (mut e, _) = engine();
    assert_eq!(e.submit(), Err(SessionError::EmptySession));
    assert_eq!(e.tick(), Err(SessionError::EmptySession));
    assert_eq!(e.select_answer(0), Err(SessionError::EmptySession));
    assert_eq!(e.abandon(), Err(SessionError::EmptySession));
    assert_eq!(e.status(), SessionStatus::Idle);
  }

  #[test]
  fn timer_expiry_auto_submits_after_limit_ticks() {
    let (mut e, clock) = engine();
    e.start(quiz_with_keys("t", &[0, 1], Some(5))).unwrap();
    e.select_answer(0).unwrap();
    for left in (1..5).rev() {
      clock.advance(Duration::from_secs(1));
      assert_eq!(e.tick().unwrap(), TickOutcome::Remaining(left));
    }
    clock.advance(Duration::from_secs(1));
    let TickOutcome::Expired(result) = e.tick().unwrap() else {
      panic!("fifth tick should expire the session");
    };
    assert_eq!(e.status(), SessionStatus::Submitted);
    assert_eq!(result.scorecard.score, 1);
    assert_eq!(result.time_taken_secs, 5);
    assert_eq!(e.active().unwrap().submitted_by(), Some(SubmitTrigger::TimerExpired));
    assert_eq!(e.tick().unwrap(), TickOutcome::Inactive);
    assert!(Arc::ptr_eq(&result, &e.submit().unwrap()), "late manual submit is a no-op");
  }

  #[test]
  fn expiry_bypasses_pending_confirmation() {
    let (mut e, _) = engine();
    e.start(quiz_with_keys("t", &[0], Some(2))).unwrap();
    assert_eq!(
      e.request_submit().unwrap(),
      SubmitGate::Confirm { unanswered: 1, remaining_secs: Some(2) }
    );
    assert!(e.active().unwrap().confirm_pending());
    e.tick().unwrap();
    assert!(matches!(e.tick().unwrap(), TickOutcome::Expired(_)));
    assert!(!e.active().unwrap().confirm_pending());
    assert!(matches!(e.request_submit().unwrap(), SubmitGate::Done(_)));
  }

  #[test]
  fn declining_confirmation_resumes_the_same_countdown() {
    let (mut e, _) = engine();
    e.start(quiz_with_keys("t", &[0], Some(10))).unwrap();
    e.tick().unwrap();
    e.tick().unwrap();
    e.request_submit().unwrap();
    e.tick().unwrap();
    assert_eq!(e.decline_submit(), Some(7));
    assert_eq!(e.tick().unwrap(), TickOutcome::Remaining(6));
    assert_eq!(e.status(), SessionStatus::InProgress);
  }

  #[test]
  fn late_tick_catches_up_with_the_clock() {
    let (mut e, clock) = engine();
    e.start(quiz_with_keys("t", &[0], Some(30))).unwrap();
    clock.advance(Duration::from_secs(1));
    assert_eq!(e.tick().unwrap(), TickOutcome::Remaining(29));

    // Owner was busy for ten seconds; only one tick made it through.
    clock.advance(Duration::from_millis(10_400));
    assert_eq!(e.tick().unwrap(), TickOutcome::Remaining(19));

    clock.advance(Duration::from_secs(25));
    assert!(matches!(e.tick().unwrap(), TickOutcome::Expired(_)));
    assert_eq!(e.active().unwrap().submitted_by(), Some(SubmitTrigger::TimerExpired));
  }

  #[test]
  fn untimed_session_ignores_ticks() {
    let (mut e, _) = engine();
    e.start(quiz_with_keys("u", &[0], None)).unwrap();
    assert_eq!(e.tick().unwrap(), TickOutcome::Untimed);
    assert_eq!(e.status(), SessionStatus::InProgress);
  }

  #[test]
  fn abandon_produces_no_result_and_cancels_timer() {
    let (mut e, _) = engine();
    e.start(quiz_with_keys("x", &[0, 1, 2], Some(30))).unwrap();
    let timer = e.active().unwrap().timer_token();
    e.select_answer(1).unwrap();
    e.abandon().unwrap();

    assert!(timer.is_cancelled());
    assert_eq!(e.status(), SessionStatus::Abandoned);
    assert!(e.active().unwrap().result().is_none());
    assert_eq!(e.tick().unwrap(), TickOutcome::Inactive);
    assert_eq!(e.active().unwrap().remaining_secs(), Some(30));
    assert_eq!(e.submit(), Err(SessionError::SessionClosed));
    assert_eq!(e.select_answer(0), Err(SessionError::SessionClosed));
    assert!(e.abandon().is_ok(), "abandon on a finished session is a no-op");
  }

  #[test]
  fn submit_cancels_timer_token() {
    let (mut e, _) = engine();
    e.start(quiz_with_keys("x", &[0], Some(30))).unwrap();
    let timer = e.active().unwrap().timer_token();
    e.submit().unwrap();
    assert!(timer.is_cancelled());
  }

  #[test]
  fn starting_over_abandons_the_running_session() {
    let (mut e, _) = engine();
    e.start(quiz_with_keys("first", &[0], Some(30))).unwrap();
    let old_timer = e.active().unwrap().timer_token();
    let old_id = e.session_id();
    e.start(quiz_with_keys("second", &[0, 1], None)).unwrap();
    assert!(old_timer.is_cancelled());
    assert_ne!(e.session_id(), old_id);
    assert_eq!(e.active().unwrap().quiz().id, "second");
  }
}
