use thiserror::Error;

use crate::repositories::{Store, StoreError};
use crate::schemas::rubric::summarize_scores;
use crate::services::grading_engine::ReportRow;

#[derive(Debug, Error)]
pub(crate) enum ReportError {
    #[error("Assessment not found")]
    AssessmentNotFound,
    #[error("No submissions found for this assessment")]
    NoSubmissions,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One spreadsheet row per stored submission, marks summed over its results.
pub(crate) async fn build_report_rows(
    store: &dyn Store,
    assessment_id: &str,
) -> Result<Vec<ReportRow>, ReportError> {
    store.find_assessment(assessment_id).await?.ok_or(ReportError::AssessmentNotFound)?;

    let submissions = store.list_submissions_for_assessment(assessment_id).await?;
    if submissions.is_empty() {
        return Err(ReportError::NoSubmissions);
    }

    let mut rows = Vec::with_capacity(submissions.len());
    for submission in submissions {
        let student = store.find_student(&submission.student_id).await?;
        let (total_marks, obtained_marks) = summarize_scores(&submission.grading_results);

        let (student_name, student_email) = match student {
            Some(student) => (student.display_name(), student.email),
            None => ("Name not found".to_string(), "Email not found".to_string()),
        };
        rows.push(ReportRow { student_name, student_email, total_marks, obtained_marks });
    }

    tracing::debug!(assessment_id, rows = rows.len(), "Built report rows");
    Ok(rows)
}
