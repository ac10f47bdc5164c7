use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CredentialRow {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ThesisData {
    pub id: i32,
    pub teacher_id: i32,
    pub title: String,
    pub summary: String,
}
