//! Local scoring. A pure function of the questions and the recorded answers.

use crate::domain::{Question, QuestionReview, Scorecard};

/// Score `answers` against the answer key of `questions`.
///
/// Slot `i` is correct only when it holds the key of question `i`. Unanswered
/// slots, missing slots and questions without a key all count as incorrect.
/// Extra slots beyond the question list are ignored.
pub fn score(questions: &[Question], answers: &[Option<usize>]) -> Scorecard {
  let review: Vec<QuestionReview> = questions
    .iter()
    .enumerate()
    .map(|(i, q)| {
      let selected = answers.get(i).copied().flatten();
      let is_correct = matches!((selected, q.correct_index), (Some(s), Some(c)) if s == c);
      QuestionReview {
        question_id: q.id.clone(),
        selected,
        correct_index: q.correct_index,
        is_correct,
      }
    })
    .collect();

  let total_questions = questions.len();
  let score = review.iter().filter(|r| r.is_correct).count();
  let percentage = if total_questions == 0 {
    0.0
  } else {
    score as f64 / total_questions as f64 * 100.0
  };

  Scorecard { score, total_questions, percentage, review }
}
