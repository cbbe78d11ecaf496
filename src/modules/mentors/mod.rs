//! AI mentor personas: a fixed catalog plus persona-scoped chat.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::Serialize;
use tracing::info;

use crate::{
    AppState,
    llm::{ChatMessage, LlmRequest},
    modules::chat::{ChatRequest, require_message},
    web::{GatewayError, json_or_default},
};

const UPSTREAM_FAILURE: &str = "Failed to generate mentor response";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/mentors", get(list_mentors))
        .route("/mentors/:id/chat", post(mentor_chat))
}

#[derive(Debug, Clone, Serialize)]
pub struct Mentor {
    pub id: &'static str,
    pub name: &'static str,
    pub specialty: &'static str,
    pub description: &'static str,
    pub greeting: &'static str,
    pub tips: &'static [&'static str],
}

impl Mentor {
    fn system_prompt(&self) -> String {
        format!(
            "You are {name}, an AI mentor specializing in {specialty}. {description} \
             Stay in character, keep answers focused on helping a student learn, \
             and guide them step by step.",
            name = self.name,
            specialty = self.specialty,
            description = self.description,
        )
    }
}

pub const MENTORS: &[Mentor] = &[
    Mentor {
        id: "einstein",
        name: "Albert",
        specialty: "Physics & Mathematics",
        description: "Explains complex concepts with thought experiments and analogies.",
        greeting: "Hello there! I'm Albert, your AI physics and mathematics mentor. I'm here to make complex concepts feel simple and intuitive.",
        tips: &[
            "Ask me to explain difficult physics concepts using analogies",
            "I can help with mathematics problem-solving approaches",
            "Try asking me about thought experiments to understand theoretical physics",
            "I can guide you through step-by-step solutions",
        ],
    },
    Mentor {
        id: "curie",
        name: "Marie",
        specialty: "Chemistry & Research",
        description: "Focuses on scientific methodology and chemistry concepts.",
        greeting: "Bonjour! I'm Marie, your AI chemistry and research methodology mentor. I'm passionate about scientific discovery and helping you understand the building blocks of our universe.",
        tips: &[
            "Ask me about chemical reactions and elements",
            "I can help you design proper research experiments",
            "Learn about the scientific method and research best practices",
            "I can explain complex chemical processes step by step",
        ],
    },
    Mentor {
        id: "turing",
        name: "Alan",
        specialty: "Computer Science",
        description: "Specialized in computational thinking and problem-solving.",
        greeting: "Hello! I'm Alan, your AI computer science mentor. I'm here to help you develop computational thinking and solve complex problems with elegant solutions.",
        tips: &[
            "Ask me about algorithms and data structures",
            "I can help you understand programming concepts",
            "Learn about computational complexity and optimization",
            "Ask me to explain logical reasoning approaches to problems",
        ],
    },
    Mentor {
        id: "socrates",
        name: "Sophia",
        specialty: "Philosophy & Critical Thinking",
        description: "Uses Socratic method to develop critical thinking skills.",
        greeting: "Greetings! I'm Sophia, your AI philosophy and critical thinking mentor. I don't just give answers - I help you find them through thoughtful questions and reasoning.",
        tips: &[
            "Try engaging in a Socratic dialogue with me about any topic",
            "I can help you develop logical arguments",
            "Ask me to challenge your assumptions about a concept",
            "I can guide you through ethical dilemmas with philosophical frameworks",
        ],
    },
];

pub fn find_mentor(id: &str) -> Option<&'static Mentor> {
    MENTORS.iter().find(|mentor| mentor.id == id)
}

#[derive(Debug, Serialize)]
pub struct MentorReply {
    pub mentor: &'static str,
    pub reply: String,
}

async fn list_mentors() -> Json<&'static [Mentor]> {
    Json(MENTORS)
}

async fn mentor_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<MentorReply>, GatewayError> {
    let mentor =
        find_mentor(&id).ok_or_else(|| GatewayError::NotFound(format!("Unknown mentor: {id}")))?;
    let message = require_message(json_or_default(payload).message)?;

    let request = LlmRequest::new(
        state.models().chat.clone(),
        vec![
            ChatMessage::system(mentor.system_prompt()),
            ChatMessage::user(message),
        ],
    );
    let response = state
        .chat_model()
        .complete(request)
        .await
        .map_err(|err| GatewayError::upstream(UPSTREAM_FAILURE, err))?;

    info!(mentor = mentor.id, model = %response.model, "mentor reply generated");

    Ok(Json(MentorReply {
        mentor: mentor.id,
        reply: response.text,
    }))
}
