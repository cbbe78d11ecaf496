pub mod chat;
pub mod flashcards;
pub mod mentors;
pub mod quiz;
pub mod summarizer;
