//! Shared fixtures for integration tests
//!
//! Rows are inserted with plain SQL so the tests exercise only the read and
//! write paths under test.

#![allow(dead_code)]

pub mod strategies;

use examhub_core::config::ExamhubConfig;
use examhub_core::models::{Profession, Qualification, Question, User};
use sqlx::PgPool;

/// Defaults with a short loader window
pub fn test_config() -> ExamhubConfig {
    let mut config = ExamhubConfig::default();
    config.loader.wait_ms = 1;
    config
}

pub async fn seed_profession(pool: &PgPool, name: &str) -> Profession {
    sqlx::query_as(
        "INSERT INTO professions (slug, name, description) VALUES ($1, $2, '') RETURNING *",
    )
    .bind(slugify(name))
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_qualification(pool: &PgPool, name: &str, code: &str) -> Qualification {
    sqlx::query_as(
        "INSERT INTO qualifications (slug, name, code, formula, description) \
         VALUES ($1, $2, $3, 'written', '') RETURNING *",
    )
    .bind(slugify(&format!("{name} {code}")))
    .bind(name)
    .bind(code)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn link(pool: &PgPool, qualification_id: i32, profession_id: i32) {
    sqlx::query(
        "INSERT INTO qualification_to_professions (qualification_id, profession_id) VALUES ($1, $2)",
    )
    .bind(qualification_id)
    .bind(profession_id)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_question(
    pool: &PgPool,
    qualification_id: i32,
    content: &str,
    image: &str,
) -> Question {
    sqlx::query_as(
        "INSERT INTO questions (\"from\", content, image, answer_a, answer_b, answer_c, answer_d, \
         correct_answer, qualification_id) \
         VALUES ('2023-06', $1, $2, 'a', 'b', 'c', 'd', 'a', $3) RETURNING *",
    )
    .bind(content)
    .bind(image)
    .bind(qualification_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_user(pool: &PgPool, display_name: &str, activated: bool) -> User {
    sqlx::query_as(
        "INSERT INTO users (display_name, email, password, activated) VALUES ($1, $2, 'hash', $3) \
         RETURNING id, display_name, email, role, activated, created_at",
    )
    .bind(display_name)
    .bind(format!("{}@example.com", slugify(display_name)))
    .bind(activated)
    .fetch_one(pool)
    .await
    .unwrap()
}

fn slugify(value: &str) -> String {
    value
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
