use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QuizError;
use crate::session::{ScoreEntry, POINTS_WITHOUT_HINT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionPoints {
    /// 1-based position in the attempt.
    pub question_number: usize,
    pub points: u32,
}

/// Frozen result of a finished session, as shown on the report screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total_points: u32,
    pub correct: usize,
    pub incorrect: usize,
    pub question_points: Vec<QuestionPoints>,
    pub max_possible: u32,
}

impl Summary {
    pub fn new(scores: &[ScoreEntry], question_count: usize) -> Self {
        Self {
            total_points: scores.iter().map(|s| s.points).sum(),
            correct: scores.iter().filter(|s| s.correct).count(),
            incorrect: scores.iter().filter(|s| !s.correct).count(),
            question_points: scores
                .iter()
                .enumerate()
                .map(|(i, s)| QuestionPoints {
                    question_number: i + 1,
                    points: s.points,
                })
                .collect(),
            max_possible: question_count as u32 * POINTS_WITHOUT_HINT,
        }
    }

    pub fn percentage(&self) -> f64 {
        if self.max_possible == 0 {
            return 0.0;
        }
        self.total_points as f64 / self.max_possible as f64 * 100.0
    }

    pub fn grade(&self) -> &'static str {
        match self.percentage() {
            p if p >= 90.0 => "Outstanding!",
            p if p >= 80.0 => "Excellent!",
            p if p >= 70.0 => "Great Job!",
            p if p >= 60.0 => "Good Effort!",
            _ => "Keep Practicing!",
        }
    }
}

/// What a session hands to the score sink when it ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub game_id: String,
    pub game_name: String,
    pub total_score: u32,
    pub scores: Vec<ScoreEntry>,
    pub questions_attempted: usize,
    pub total_questions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    #[serde(flatten)]
    pub submission: Submission,
    pub timestamp: DateTime<Utc>,
}

/// Write-only destination for finished (or abandoned) sessions.
pub trait ScoreSink {
    fn submit(&mut self, record: &ScoreRecord) -> Result<(), QuizError>;
}

/// Appends records to a `{"scores": [...]}` JSON document, rewriting the
/// whole file on each submission. Last writer wins.
#[derive(Debug, Clone)]
pub struct JsonScoreSink {
    path: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ScoreDocument {
    #[serde(default)]
    scores: Vec<Value>,
}

impl JsonScoreSink {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Everything recorded so far, oldest first.
    pub fn records(&self) -> Result<Vec<ScoreRecord>, QuizError> {
        self.read()?
            .scores
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(QuizError::from))
            .collect()
    }

    fn read(&self) -> Result<ScoreDocument, QuizError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(ScoreDocument::default()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ScoreDocument::default()),
            Err(e) => Err(e.into()),
        }
    }
}

impl ScoreSink for JsonScoreSink {
    fn submit(&mut self, record: &ScoreRecord) -> Result<(), QuizError> {
        let mut doc = self.read()?;
        doc.scores.push(serde_json::to_value(record)?);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&doc)?)?;
        Ok(())
    }
}
