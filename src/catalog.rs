use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::QuizError;

/// Options are answered with the keys `1`-`9`.
pub const MAX_OPTIONS: usize = 9;

/// A single multiple-choice question as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    pub correct: usize,
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub solution: String,
}

impl Question {
    /// Checks the option/answer invariants that randomization relies on.
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.options.len() < 2 {
            return Err(QuizError::invalid(
                self.id,
                format!("needs at least 2 options, found {}", self.options.len()),
            ));
        }
        if self.options.len() > MAX_OPTIONS {
            return Err(QuizError::invalid(
                self.id,
                format!(
                    "at most {MAX_OPTIONS} options are supported, found {}",
                    self.options.len()
                ),
            ));
        }
        if self.correct >= self.options.len() {
            return Err(QuizError::invalid(
                self.id,
                format!(
                    "correct index {} out of range for {} options",
                    self.correct,
                    self.options.len()
                ),
            ));
        }
        Ok(())
    }

    pub fn has_hint(&self) -> bool {
        !self.hint.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMetadata {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub total_questions: usize,
    /// Minutes allowed per question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_per_question: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passing_score: Option<u32>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_criteria: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_criteria: Option<String>,
}

impl Default for GameMetadata {
    fn default() -> Self {
        Self {
            category: String::new(),
            difficulty: String::new(),
            total_questions: 0,
            time_per_question: None,
            total_time: None,
            passing_score: None,
            instructions: String::new(),
            evaluation_criteria: None,
            scoring_criteria: None,
        }
    }
}

impl GameMetadata {
    /// Per-question budget in whole seconds, if the game declares a usable one.
    pub fn seconds_per_question(&self) -> Option<u32> {
        self.time_per_question
            .filter(|minutes| minutes.is_finite() && *minutes > 0.0)
            .map(|minutes| (minutes * 60.0).round().max(1.0) as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub name: String,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub metadata: GameMetadata,
}

impl Game {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Rejects games that cannot be played: no questions, malformed
    /// questions or repeated question ids.
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.questions.is_empty() {
            return Err(QuizError::EmptyGame(self.id.clone()));
        }
        let mut seen = HashSet::new();
        for question in &self.questions {
            question.validate()?;
            if !seen.insert(question.id) {
                return Err(QuizError::DuplicateQuestion(question.id));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSubject {
    pub sub_subject: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sub_subject_context: Vec<Game>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainSubject {
    pub main_subject: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub main_subject_context: Vec<SubSubject>,
}

/// The whole document: main subject -> sub subject -> game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub main_subjects: Vec<MainSubject>,
}

/// One game together with where it lives in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry<'a> {
    pub main_subject: &'a str,
    pub sub_subject: &'a str,
    pub game: &'a Game,
}

impl Catalog {
    pub fn entries(&self) -> Vec<CatalogEntry<'_>> {
        self.main_subjects
            .iter()
            .flat_map(|main| {
                main.main_subject_context.iter().flat_map(move |sub| {
                    sub.sub_subject_context.iter().map(move |game| CatalogEntry {
                        main_subject: &main.main_subject,
                        sub_subject: &sub.sub_subject,
                        game,
                    })
                })
            })
            .collect()
    }

    pub fn game(&self, id: &str) -> Option<&Game> {
        self.entries()
            .into_iter()
            .find(|entry| entry.game.id == id)
            .map(|entry| entry.game)
    }

    /// Case-insensitive filter over the hierarchy. A main subject is kept
    /// whole when its own name matches, or when any of its sub subjects
    /// matches by name or holds a game whose name or category matches.
    pub fn search(&self, term: &str) -> Catalog {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.clone();
        }
        let matches = |s: &str| s.to_lowercase().contains(&needle);

        let main_subjects = self
            .main_subjects
            .iter()
            .filter(|main| {
                matches(&main.main_subject)
                    || main.main_subject_context.iter().any(|sub| {
                        matches(&sub.sub_subject)
                            || sub.sub_subject_context.iter().any(|game| {
                                matches(&game.name) || matches(&game.metadata.category)
                            })
                    })
            })
            .cloned()
            .collect();

        Catalog { main_subjects }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn question(id: u32, correct: usize) -> Question {
        Question {
            id,
            question: format!("Question {id}?"),
            options: vec![
                "alpha".to_string(),
                "beta".to_string(),
                "gamma".to_string(),
                "delta".to_string(),
            ],
            correct,
            hint: format!("hint {id}"),
            solution: format!("solution {id}"),
        }
    }

    pub fn game(id: &str, questions: usize) -> Game {
        Game {
            id: id.to_string(),
            name: format!("Game {id}"),
            questions: (0..questions as u32).map(|i| question(i + 1, 2)).collect(),
            metadata: GameMetadata {
                category: "Patterns".to_string(),
                difficulty: "Easy".to_string(),
                total_questions: questions,
                time_per_question: Some(1.0),
                ..GameMetadata::default()
            },
        }
    }

    pub fn catalog() -> Catalog {
        Catalog {
            main_subjects: vec![
                MainSubject {
                    main_subject: "Reasoning".to_string(),
                    main_subject_context: vec![SubSubject {
                        sub_subject: "Series".to_string(),
                        sub_subject_context: vec![game("series-1", 3), game("series-2", 2)],
                    }],
                },
                MainSubject {
                    main_subject: "Coding".to_string(),
                    main_subject_context: vec![SubSubject {
                        sub_subject: "Symbols".to_string(),
                        sub_subject_context: vec![Game {
                            metadata: GameMetadata {
                                category: "Symbol Coding".to_string(),
                                ..GameMetadata::default()
                            },
                            ..game("symbols-1", 1)
                        }],
                    }],
                },
            ],
        }
    }
}
