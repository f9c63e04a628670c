//! Document types for the on-disk quiz content format.
//!
//! Field names mirror the JSON files in the data directory (camelCase),
//! so a loaded document serializes back out byte-for-byte equivalent.
//! Two layouts are supported:
//! - manifest layout: `grades_config.json` plus one `grade_<id>.json` per grade
//! - flat layout: a single `questions.json` holding the whole bank

use serde::{Deserialize, Serialize};

/// One quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
    pub tag: String,
}

/// Full content of one grade (`grade_<id>.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeData {
    pub version: String,
    pub grade_id: u32,
    pub name: String,
    pub description: String,
    pub required_score: u32,
    pub total_questions: u32,
    pub questions: Vec<Question>,
}

/// Summary entry for one grade, as listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeInfo {
    pub grade_id: u32,
    pub name: String,
    pub description: String,
    pub required_score: u32,
    pub total_questions: u32,
    pub icon: String,
}

/// The grades manifest (`grades_config.json`): every available grade,
/// in order, without question bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradesConfig {
    pub version: String,
    pub total_grades: u32,
    pub grades: Vec<GradeInfo>,
}

/// The flat-layout question bank (`questions.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBank {
    pub version: String,
    pub questions: Vec<Question>,
}

/// Opaque token identifying one on-disk state of a content file.
///
/// Derived from a truncated content hash joined with the file's
/// modification time, so it changes on any rewrite and on a bare
/// mtime touch. Clients compare tokens for equality only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: String) -> Self {
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
