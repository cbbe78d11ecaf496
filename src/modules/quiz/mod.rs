use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, web::GatewayError};

const SAMPLE_QUIZ_BODY: &str = include_str!("../../../assets/sample_quiz.json");

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quiz/sample", get(sample_quiz))
        .route("/quiz/score", post(score_quiz))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: u32,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_answer_index: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Badge {
    QuizMaster,
    KnowledgeSeeker,
    QuickLearner,
}

impl Badge {
    /// Badge earned for a percentage score, if any.
    pub fn for_score(score: u32) -> Option<Self> {
        match score {
            90.. => Some(Badge::QuizMaster),
            70..=89 => Some(Badge::KnowledgeSeeker),
            50..=69 => Some(Badge::QuickLearner),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    pub score: u32,
    pub badge: Option<Badge>,
}

/// Score a fully answered quiz.
pub fn score(questions: &[QuizQuestion]) -> Result<QuizScore, GatewayError> {
    if questions.is_empty() {
        return Err(GatewayError::validation("Quiz has no questions"));
    }

    let mut correct = 0;
    for question in questions {
        if question.correct_answer_index >= question.options.len() {
            return Err(GatewayError::validation(format!(
                "Question {} has no option at its correct answer index",
                question.id
            )));
        }
        let selected = question.selected_answer_index.ok_or_else(|| {
            GatewayError::validation(format!(
                "Please select an answer for question {}",
                question.id
            ))
        })?;
        if selected >= question.options.len() {
            return Err(GatewayError::validation(format!(
                "Selected answer for question {} is out of range",
                question.id
            )));
        }
        if selected == question.correct_answer_index {
            correct += 1;
        }
    }

    let total = questions.len();
    let score = ((correct as f64 / total as f64) * 100.0).round() as u32;

    Ok(QuizScore {
        correct,
        total,
        score,
        badge: Badge::for_score(score),
    })
}

async fn sample_quiz() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], SAMPLE_QUIZ_BODY)
}

async fn score_quiz(
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<QuizScore>, GatewayError> {
    let Json(payload) =
        payload.map_err(|rejection| GatewayError::validation(rejection.body_text()))?;
    score(&payload.questions).map(Json)
}
