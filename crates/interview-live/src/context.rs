//! Interview context and system-instruction assembly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad interview style the candidate asked to practice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewType {
    Behavioral,
    Technical,
    General,
}

impl InterviewType {
    /// Lenient parse used at the service boundary; unknown values fall back
    /// to a general interview.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "behavioral" => Self::Behavioral,
            "technical" => Self::Technical,
            _ => Self::General,
        }
    }
}

impl fmt::Display for InterviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Behavioral => write!(f, "behavioral"),
            Self::Technical => write!(f, "technical"),
            Self::General => write!(f, "general"),
        }
    }
}

/// What the mock interview should be about.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InterviewContext {
    pub interview_type: InterviewType,
    pub role: String,
    pub company: Option<String>,
}

const GENERIC_INSTRUCTION: &str = "You are an experienced interviewer conducting a professional \
    job interview. Ask one question at a time, listen to the candidate's full answer before \
    responding, and keep your questions concise and spoken-language friendly. Stay encouraging \
    but realistic, and never break character.";

/// Assembles the system instruction for the setup handshake.
///
/// Falls back to a generic interviewer persona when no context was given.
pub fn system_instruction(context: Option<&InterviewContext>) -> String {
    let Some(context) = context else {
        return GENERIC_INSTRUCTION.to_string();
    };

    let mut text = format!(
        "You are an experienced interviewer conducting a {} interview for the role of {}. ",
        context.interview_type, context.role
    );
    if let Some(company) = &context.company {
        text.push_str(&format!("The position is at {company}. "));
    }
    text.push_str(match context.interview_type {
        InterviewType::Behavioral => {
            "Ask one behavioral question at a time, probing for concrete situations, the \
             candidate's own actions, and measurable results. Follow up when an answer stays \
             abstract."
        }
        InterviewType::Technical => {
            "Ask one technical question at a time, appropriate for this role. Start broad, then \
             dig into trade-offs and edge cases based on the candidate's answers."
        }
        InterviewType::General => {
            "Mix background, motivation, and role-fit questions, one at a time, as a hiring \
             manager would in a first-round screen."
        }
    });
    text.push_str(
        " Keep your questions concise and spoken-language friendly, and never break character.",
    );
    text
}
