use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Grading rubric attached to an assessment. Serialised in the same camelCase
/// shape the grading engine receives in the `rubric` form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Rubric {
    pub(crate) questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) concept_correctness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) similarity_correctness: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Question {
    pub(crate) question_number: u32,
    #[serde(default)]
    pub(crate) question_text: String,
    pub(crate) total_marks: f64,
    /// Criterion name to weight or description. Weights are the creating
    /// client's concern and are forwarded untouched.
    #[serde(default)]
    pub(crate) rubric: BTreeMap<String, Value>,
    #[serde(default)]
    pub(crate) open_ended: bool,
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum RubricError {
    #[error("rubric must contain at least one question")]
    Empty,
    #[error("question numbers must start at 1 (got {0})")]
    InvalidNumber(u32),
    #[error("question {0} appears more than once")]
    DuplicateNumber(u32),
    #[error("question {0} must have positive totalMarks")]
    NonPositiveMarks(u32),
}

impl Rubric {
    pub(crate) fn validate(&self) -> Result<(), RubricError> {
        if self.questions.is_empty() {
            return Err(RubricError::Empty);
        }

        let mut seen = HashSet::new();
        for question in &self.questions {
            if question.question_number == 0 {
                return Err(RubricError::InvalidNumber(question.question_number));
            }
            if !seen.insert(question.question_number) {
                return Err(RubricError::DuplicateNumber(question.question_number));
            }
            if !(question.total_marks.is_finite() && question.total_marks > 0.0) {
                return Err(RubricError::NonPositiveMarks(question.question_number));
            }
        }

        Ok(())
    }

    pub(crate) fn total_marks(&self) -> f64 {
        self.questions.iter().map(|question| question.total_marks).sum()
    }

    pub(crate) fn question(&self, number: u32) -> Option<&Question> {
        self.questions.iter().find(|question| question.question_number == number)
    }
}

/// Read-only view over one entry of the engine's `results` array. The stored
/// results stay verbatim; this only pulls out the numbers we check and sum.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct QuestionScore {
    #[serde(default, alias = "questionNumber")]
    pub(crate) question_number: Option<u32>,
    #[serde(default, alias = "marksAwarded")]
    pub(crate) marks_awarded: Option<f64>,
    #[serde(default, rename = "totalMarks", alias = "total_marks")]
    pub(crate) total_marks: Option<f64>,
}

impl QuestionScore {
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Checks every result against `0 <= marksAwarded <= totalMarks`, preferring
/// the rubric's allocation for the matching question number.
pub(crate) fn check_marks_within_bounds(rubric: &Rubric, results: &[Value]) -> Result<(), String> {
    for (index, value) in results.iter().enumerate() {
        let score = QuestionScore::from_value(value)
            .ok_or_else(|| format!("result #{index} is not a question score object"))?;
        let Some(awarded) = score.marks_awarded else {
            return Err(format!("result #{index} has no marks_awarded"));
        };

        let bound = score
            .question_number
            .and_then(|number| rubric.question(number))
            .map(|question| question.total_marks)
            .or(score.total_marks);

        if !awarded.is_finite() || awarded < 0.0 {
            return Err(format!("result #{index} awards negative or invalid marks ({awarded})"));
        }
        if let Some(bound) = bound {
            if awarded > bound {
                return Err(format!("result #{index} awards {awarded} marks out of {bound}"));
            }
        }
    }

    Ok(())
}

/// `(total, obtained)` over stored results, as the report sheet expects.
pub(crate) fn summarize_scores(results: &[Value]) -> (f64, f64) {
    results.iter().filter_map(QuestionScore::from_value).fold((0.0, 0.0), |(total, got), score| {
        (total + score.total_marks.unwrap_or(0.0), got + score.marks_awarded.unwrap_or(0.0))
    })
}
