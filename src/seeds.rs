//! Built-in quizzes that keep the service useful without a remote catalog or config.

use crate::domain::{Difficulty, Question, Quiz, QuizOrigin};

fn q(id: &str, prompt: &str, options: [&str; 4], correct: usize) -> Question {
  Question {
    id: id.into(),
    prompt: prompt.into(),
    options: options.iter().map(|o| o.to_string()).collect(),
    correct_index: Some(correct),
  }
}

/// Demo quizzes served in offline mode.
pub fn seed_quizzes() -> Vec<Quiz> {
  vec![
    Quiz {
      id: "general-knowledge".into(),
      title: "General Knowledge Quiz".into(),
      description: "Test your knowledge on various topics".into(),
      difficulty: Difficulty::Medium,
      category: "General Knowledge".into(),
      questions: vec![
        q("1", "What is the capital of France?", ["London", "Paris", "Berlin", "Madrid"], 1),
        q("2", "Which planet is closest to the sun?", ["Venus", "Earth", "Mercury", "Mars"], 2),
        q("3", "What is the largest ocean on Earth?", ["Atlantic Ocean", "Indian Ocean", "Arctic Ocean", "Pacific Ocean"], 3),
        q("4", "Who wrote 'Romeo and Juliet'?", ["Jane Austen", "William Shakespeare", "Charles Dickens", "Mark Twain"], 1),
        q("5", "What is the chemical symbol for Gold?", ["Go", "Gd", "Au", "Ag"], 2),
      ],
      time_limit: Some(300),
      origin: QuizOrigin::Local,
    },
    Quiz {
      id: "science".into(),
      title: "Science Quiz".into(),
      description: "Test your science knowledge".into(),
      difficulty: Difficulty::Medium,
      category: "Science".into(),
      questions: vec![
        q("1", "What is the chemical formula for water?", ["H2O", "CO2", "O2", "H2"], 0),
        q("2", "How many bones are in the human body?", ["186", "206", "226", "246"], 1),
      ],
      time_limit: Some(120),
      origin: QuizOrigin::Local,
    },
    Quiz {
      id: "sample".into(),
      title: "Sample Quiz".into(),
      description: "Untimed warm-up".into(),
      difficulty: Difficulty::Easy,
      category: "General Knowledge".into(),
      questions: vec![
        q("1", "What is the capital of France?", ["London", "Paris", "Berlin", "Madrid"], 1),
        q("2", "Which planet is closest to the sun?", ["Venus", "Earth", "Mercury", "Mars"], 2),
        q("3", "What is the largest ocean on Earth?", ["Atlantic Ocean", "Indian Ocean", "Arctic Ocean", "Pacific Ocean"], 3),
      ],
      time_limit: None,
      origin: QuizOrigin::Local,
    },
  ]
}
