// tests/common/mod.rs

#![allow(dead_code)]

use linkit::{config::Config, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::{PgPool, postgres::PgPoolOptions};

pub const TEST_SECRET: &str = "linkit_test_secret";

pub struct TestApp {
    pub address: String,
    pub pool: PgPool,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port against DATABASE_URL.
///
/// Returns `None` when no database is configured so the suite can run
/// without Postgres.
pub async fn spawn_app() -> Option<TestApp> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let state = AppState::new(pool.clone(), Config::for_tests(&database_url));
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
    })
}

/// Fresh address per call. The prefix is cut to 16 characters so the local
/// part stays within the 64 an e-mail address allows.
pub fn unique_email(prefix: &str) -> String {
    let prefix: String = prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(16)
        .collect();
    format!("{}_{}@example.com", prefix, uuid::Uuid::new_v4().simple())
}

/// A registered, logged-in account that owns a profile.
pub struct TestUser {
    pub email: String,
    pub token: String,
    pub account_id: i64,
    pub profile_id: i64,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/register"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Registers, logs in and saves a profile.
    pub async fn create_user(
        &self,
        name: &str,
        offered: &[&str],
        wanted: &[&str],
        is_public: bool,
    ) -> TestUser {
        let email = unique_email(name);
        let password = "password123";

        let registered: Value = self.register(&email, password).await.json().await.unwrap();
        let account_id = registered["id"].as_i64().expect("account id");

        let login: Value = self.login(&email, password).await.json().await.unwrap();
        let token = login["token"].as_str().expect("token").to_string();

        let profile: Value = self
            .client
            .post(self.url("/profile"))
            .bearer_auth(&token)
            .json(&json!({
                "name": name,
                "skillsOffered": offered,
                "skillsWanted": wanted,
                "isPublic": is_public,
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        TestUser {
            email,
            token,
            account_id,
            profile_id: profile["id"].as_i64().expect("profile id"),
        }
    }

    /// Turns a user into an administrator directly in the database.
    pub async fn make_admin(&self, user: &TestUser) {
        sqlx::query("UPDATE profiles SET role = 'ADMIN' WHERE id = $1")
            .bind(user.profile_id)
            .execute(&self.pool)
            .await
            .unwrap();
    }
}
