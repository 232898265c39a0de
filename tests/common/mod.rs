use std::env;
use std::sync::Arc;

use anyhow::{anyhow, ensure, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDateTime;
use diesel::connection::SimpleConnection;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use waitlist::auth::jwt::JwtService;
use waitlist::auth::password::hash_password;
use waitlist::config::{AppConfig, DEFAULT_ADMIN_PAGE_SIZE, DEFAULT_ADMIN_PATH};
use waitlist::db::{self, PgPool};
use waitlist::entry::{Role, WaitlistEntry};
use waitlist::routes;
use waitlist::state::AppState;
use waitlist::store::{MemoryWaitlistStore, NewEntry, PgWaitlistStore};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        database_max_pool_size: 4,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        jwt_secret: "test-secret".to_string(),
        jwt_issuer: "test-issuer".to_string(),
        jwt_audience: "test-audience".to_string(),
        jwt_expiry_minutes: 60,
        cors_allowed_origin: None,
        admin_path: DEFAULT_ADMIN_PATH.to_string(),
        admin_page_size: DEFAULT_ADMIN_PAGE_SIZE,
    }
}

#[derive(Clone)]
pub struct TestApp {
    pub state: AppState,
    router: Router,
    pool: Option<PgPool>,
}

impl TestApp {
    pub fn in_memory() -> Result<Self> {
        let config = test_config("postgres://unused@localhost/waitlist");
        let store = Arc::new(MemoryWaitlistStore::new());
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(config, store.clone(), store, jwt);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            pool: None,
        })
    }

    /// Returns `None` when `TEST_DATABASE_URL` is not set so the suite still
    /// runs on machines without Postgres.
    #[allow(dead_code)]
    pub async fn postgres() -> Result<Option<Self>> {
        let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping postgres-backed test");
            return Ok(None);
        };

        let config = test_config(&database_url);
        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let jwt = JwtService::from_config(&config)?;
        let state = AppState::postgres(config, PgWaitlistStore::new(pool.clone()), jwt);
        let router = routes::create_router(state.clone());

        Ok(Some(Self {
            state,
            router,
            pool: Some(pool),
        }))
    }

    #[allow(dead_code)]
    pub async fn cleanup(&self) -> Result<()> {
        let Some(pool) = self.pool.clone() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    pub fn admin_path(&self, path: &str) -> String {
        format!("{}{}", self.state.config.admin_path, path)
    }

    #[allow(dead_code)]
    pub async fn seed_entry(
        &self,
        email: &str,
        role: Option<Role>,
        created_at: NaiveDateTime,
    ) -> Result<WaitlistEntry> {
        self.state
            .store
            .create(NewEntry {
                email: email.to_string(),
                role,
                created_at,
            })
            .await
            .context("failed to seed waitlist entry")
    }

    #[allow(dead_code)]
    pub async fn insert_admin(&self, username: &str, password: &str) -> Result<()> {
        let password_hash = hash_password(password)?;
        self.state
            .accounts
            .create_admin(username, &password_hash)
            .await
            .context("failed to insert admin")?;
        Ok(())
    }

    #[allow(dead_code)]
    pub async fn login_token(&self, username: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            username: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json(
                &self.admin_path("/auth/login"),
                &LoginPayload { username, password },
                None,
            )
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        #[derive(serde::Deserialize)]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = read_json(response).await?;
        Ok(parsed.access_token)
    }

    /// Creates an admin account and logs it in.
    #[allow(dead_code)]
    pub async fn admin_token(&self) -> Result<String> {
        self.insert_admin("operator", "operator-pass").await?;
        self.login_token("operator", "operator-pass").await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PATCH, path, payload, token).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

#[allow(dead_code)]
pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

#[allow(dead_code)]
pub async fn body_to_string(response: hyper::Response<Body>) -> Result<String> {
    let bytes = body_to_vec(response.into_body()).await?;
    Ok(String::from_utf8(bytes)?)
}

pub async fn read_json<T: DeserializeOwned>(response: hyper::Response<Body>) -> Result<T> {
    let bytes = body_to_vec(response.into_body()).await?;
    serde_json::from_slice(&bytes).with_context(|| {
        format!(
            "unexpected response body: {}",
            String::from_utf8_lossy(&bytes)
        )
    })
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute("TRUNCATE TABLE waitlist_entries, admin_users RESTART IDENTITY CASCADE;")
        .context("failed to truncate tables")?;
    Ok(())
}
