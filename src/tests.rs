//! Integration tests for the exam portal backend.

use std::sync::Arc;

use jsonwebtoken::Algorithm;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::auth::{Role, TokenService};
use crate::config::Config;
use crate::db::{ensure_bootstrap_admin, init_database, seed_reference_data, Repository};
use crate::models::{CompanyStatus, RegisterCompanyRequest};
use crate::{create_router, AppState};

const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "admin-test-pass";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    repo: Arc<Repository>,
    tokens: Arc<TokenService>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        seed_reference_data(&repo).await.expect("Failed to seed");
        ensure_bootstrap_admin(&repo, ADMIN_USERNAME, ADMIN_PASSWORD)
            .await
            .expect("Failed to create admin");

        // Create config
        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            secret_key: "integration-test-secret".to_string(),
            algorithm: Algorithm::HS256,
            access_token_expire_minutes: 30,
            admin_username: ADMIN_USERNAME.to_string(),
            admin_password: ADMIN_PASSWORD.to_string(),
        };
        let tokens = Arc::new(TokenService::new(&config));

        let state = AppState {
            repo: repo.clone(),
            tokens: tokens.clone(),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            repo,
            tokens,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn admin_token(&self) -> String {
        self.tokens.issue(ADMIN_USERNAME, Role::Admin).unwrap()
    }

    /// Register a company directly and approve it. Returns (id, token).
    async fn approved_company(&self, email: &str) -> (i64, String) {
        let request = RegisterCompanyRequest {
            name: format!("Company {}", email),
            email: email.to_string(),
            password: "unused".to_string(),
            logo_url: None,
        };
        let company = self.repo.create_company(&request, "not-a-hash").await.unwrap();
        self.repo
            .review_company(company.id, CompanyStatus::Approved, None, ADMIN_USERNAME)
            .await
            .unwrap();
        let token = self
            .tokens
            .issue(&company.id.to_string(), Role::Company)
            .unwrap();
        (company.id, token)
    }

    async fn send(&self, request: RequestBuilder, token: &str) -> (u16, Value) {
        let resp: Response = request.bearer_auth(token).send().await.unwrap();
        let status = resp.status().as_u16();
        let body = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, path: &str, token: &str) -> (u16, Value) {
        self.send(self.client.get(self.url(path)), token).await
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (u16, Value) {
        self.send(self.client.post(self.url(path)).json(&body), token)
            .await
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> (u16, Value) {
        self.send(self.client.put(self.url(path)).json(&body), token)
            .await
    }

    async fn delete(&self, path: &str, token: &str) -> (u16, Value) {
        self.send(self.client.delete(self.url(path)), token).await
    }

    /// Create a draft drive targeting the first seeded college and group.
    async fn create_drive(&self, token: &str, title: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/company/drives",
                token,
                json!({
                    "title": title,
                    "description": "Online assessment",
                    "question_type": "aptitude",
                    "duration_minutes": 60,
                    "targets": [
                        { "college_id": 1, "student_group_id": 1, "batch_year": "2025" },
                        { "custom_college_name": "Lakeside Polytechnic", "student_group_id": 2 }
                    ]
                }),
            )
            .await;
        assert_eq!(status, 200, "create drive failed: {}", body);
        body["data"].clone()
    }

    async fn add_question(&self, token: &str, drive_id: i64, text: &str) -> (u16, Value) {
        self.post(
            &format!("/api/company/drives/{}/questions", drive_id),
            token,
            json!({
                "question_text": text,
                "option_a": "2",
                "option_b": "4",
                "option_c": "6",
                "option_d": "8",
                "correct_answer": "b",
                "difficulty": "easy"
            }),
        )
        .await
    }

    /// Create a drive with one question, submit it, and approve it as admin.
    async fn approved_drive(&self, token: &str, title: &str) -> i64 {
        let drive = self.create_drive(token, title).await;
        let drive_id = drive["id"].as_i64().unwrap();
        assert_eq!(self.add_question(token, drive_id, "2 + 2 = ?").await.0, 200);
        let (status, _) = self
            .put(&format!("/api/company/drives/{}/submit", drive_id), token, json!({}))
            .await;
        assert_eq!(status, 200);
        let (status, _) = self
            .put(
                &format!("/api/admin/drives/{}/approve", drive_id),
                &self.admin_token(),
                json!({ "is_approved": true, "admin_notes": "Looks good" }),
            )
            .await;
        assert_eq!(status, 200);
        drive_id
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

// ==================== AUTH ====================

#[tokio::test]
async fn test_admin_routes_require_token() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/companies"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(body["detail"].is_string());

    let (status, _) = fixture.get("/api/admin/companies", "garbage").await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_company_token_cannot_reach_admin_routes() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;

    let (status, _) = fixture.get("/api/admin/drives", &token).await;
    assert_eq!(status, 401);

    let (status, _) = fixture
        .get("/api/company/drives", &fixture.admin_token())
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_admin_login() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/auth/admin/login",
            "",
            json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["token_type"], "bearer");
    assert_eq!(body["data"]["expires_in"], 1800);
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, _) = fixture.get("/api/admin/companies", &token).await;
    assert_eq!(status, 200);

    let (status, _) = fixture
        .post(
            "/api/auth/admin/login",
            "",
            json!({ "username": ADMIN_USERNAME, "password": "wrong" }),
        )
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_company_registration_and_approval_gate_login() {
    let fixture = TestFixture::new().await;
    let credentials = json!({ "email": "talent@globex.test", "password": "s3cret-pass" });

    let (status, body) = fixture
        .post(
            "/api/auth/company/register",
            "",
            json!({
                "name": "Globex",
                "email": "talent@globex.test",
                "password": "s3cret-pass"
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["is_approved"], false);
    assert!(body["data"].get("password_hash").is_none());
    let company_id = body["data"]["id"].as_i64().unwrap();

    // Pending companies cannot log in.
    let (status, body) = fixture
        .post("/api/auth/company/login", "", credentials.clone())
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, body) = fixture
        .put(
            &format!("/api/admin/companies/{}/approve", company_id),
            &fixture.admin_token(),
            json!({ "is_approved": true }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["is_approved"], true);
    assert_eq!(body["data"]["reviewed_by"], ADMIN_USERNAME);

    let (status, body) = fixture
        .post("/api/auth/company/login", "", credentials.clone())
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["company"]["id"], company_id);
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, _) = fixture.get("/api/company/drives", &token).await;
    assert_eq!(status, 200);

    // Suspension locks out an existing token too.
    let (status, _) = fixture
        .put(
            &format!("/api/admin/companies/{}/suspend", company_id),
            &fixture.admin_token(),
            json!({ "admin_notes": "Under investigation" }),
        )
        .await;
    assert_eq!(status, 200);

    let (status, _) = fixture.get("/api/company/drives", &token).await;
    assert_eq!(status, 403);

    let (status, _) = fixture.post("/api/auth/company/login", "", credentials).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn test_malformed_body_is_rejected_before_registration() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .client
        .post(format!("{}/api/auth/company/register", fixture.base_url))
        .header("content-type", "application/json")
        .body(r#"{"name": "Broken", "email": "#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let companies = fixture.repo.list_companies(None, 0, 100).await.unwrap();
    assert!(companies.is_empty());
}

#[tokio::test]
async fn test_company_registration_validation() {
    let fixture = TestFixture::new().await;

    let (status, _) = fixture
        .post(
            "/api/auth/company/register",
            "",
            json!({ "name": "Short", "email": "a@short.test", "password": "12345" }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = fixture
        .post(
            "/api/auth/company/register",
            "",
            json!({ "name": "Bad Mail", "email": "not-an-email", "password": "123456" }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, body) = fixture
        .post(
            "/api/auth/company/register",
            "",
            json!({ "name": "Double At", "email": "hr@@acme.test", "password": "123456" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    fixture.approved_company("taken@acme.test").await;
    let (status, body) = fixture
        .post(
            "/api/auth/company/register",
            "",
            json!({ "name": "Copycat", "email": "taken@acme.test", "password": "123456" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_admin_company_list_filter() {
    let fixture = TestFixture::new().await;
    fixture.approved_company("one@acme.test").await;
    let request = RegisterCompanyRequest {
        name: "Waiting".to_string(),
        email: "waiting@acme.test".to_string(),
        password: "unused".to_string(),
        logo_url: None,
    };
    fixture.repo.create_company(&request, "x").await.unwrap();
    let admin = fixture.admin_token();

    let (_, body) = fixture.get("/api/admin/companies?status=pending", &admin).await;
    let pending = body["data"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["email"], "waiting@acme.test");

    let (_, body) = fixture.get("/api/admin/companies?limit=1", &admin).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = fixture.get("/api/admin/companies?status=banned", &admin).await;
    assert_eq!(status, 400);
}

// ==================== DRIVES ====================

#[tokio::test]
async fn test_create_drive_resolves_targets() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;

    let drive = fixture.create_drive(&token, "Campus Hiring 2025").await;

    assert_eq!(drive["status"], "draft");
    assert_eq!(drive["is_approved"], false);
    let targets = drive["targets"].as_array().unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0]["college_name"], "IIT Delhi");
    assert_eq!(targets[0]["student_group_name"], "Computer Science Engineering");
    assert_eq!(targets[0]["batch_year"], "2025");
    assert_eq!(targets[1]["college_id"], Value::Null);
    assert_eq!(targets[1]["college_name"], "Lakeside Polytechnic");

    // The custom college lands in the registry unapproved.
    let (_, body) = fixture
        .get("/api/admin/colleges/pending", &fixture.admin_token())
        .await;
    let pending: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(pending, vec!["Lakeside Polytechnic"]);

    let (_, body) = fixture.get("/api/company/colleges", &token).await;
    assert!(!body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["name"] == "Lakeside Polytechnic"));
}

#[tokio::test]
async fn test_create_drive_requires_target_and_valid_fields() {
    let fixture = TestFixture::new().await;
    let (company_id, token) = fixture.approved_company("hr@acme.test").await;

    let base = json!({
        "title": "No audience",
        "question_type": "coding",
        "duration_minutes": 45,
        "targets": []
    });
    let (status, body) = fixture.post("/api/company/drives", &token, base.clone()).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let mut zero_duration = base.clone();
    zero_duration["targets"] = json!([{ "college_id": 1 }]);
    zero_duration["duration_minutes"] = json!(0);
    let (status, _) = fixture.post("/api/company/drives", &token, zero_duration).await;
    assert_eq!(status, 400);

    let mut empty_target = base.clone();
    empty_target["targets"] = json!([{ "batch_year": "2025" }]);
    let (status, _) = fixture.post("/api/company/drives", &token, empty_target).await;
    assert_eq!(status, 400);

    assert!(fixture
        .repo
        .list_company_drives(company_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_submit_requires_question() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;
    let drive = fixture.create_drive(&token, "Aptitude Round").await;
    let drive_id = drive["id"].as_i64().unwrap();
    let submit = format!("/api/company/drives/{}/submit", drive_id);

    let (status, body) = fixture.put(&submit, &token, json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "ILLEGAL_STATE");

    let (_, body) = fixture.get(&format!("/api/company/drives/{}", drive_id), &token).await;
    assert_eq!(body["data"]["status"], "draft");

    assert_eq!(fixture.add_question(&token, drive_id, "2 + 2 = ?").await.0, 200);
    let (status, body) = fixture.put(&submit, &token, json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "submitted");
    assert_eq!(body["data"]["question_count"], 1);

    // Only drafts can be submitted.
    let (status, _) = fixture.put(&submit, &token, json!({})).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_approved_drive_is_locked() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;
    let drive_id = fixture.approved_drive(&token, "Locked Drive").await;
    let path = format!("/api/company/drives/{}", drive_id);

    let (status, body) = fixture.put(&path, &token, json!({ "title": "Renamed" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "ILLEGAL_STATE");

    let (status, _) = fixture
        .put(
            &format!("{}/targets", path),
            &token,
            json!({ "targets": [{ "college_id": 2 }] }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = fixture.add_question(&token, drive_id, "Late question").await;
    assert_eq!(status, 400);

    let (status, _) = fixture
        .post(
            &format!("{}/questions/bulk", path),
            &token,
            json!({ "questions": [{ "question_text": "Late bulk" }] }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = fixture.delete(&path, &token).await;
    assert_eq!(status, 400);

    let (_, body) = fixture.get(&path, &token).await;
    assert_eq!(body["data"]["title"], "Locked Drive");
    assert_eq!(body["data"]["targets"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["question_count"], 1);
    assert_eq!(body["data"]["admin_notes"], "Looks good");
}

#[tokio::test]
async fn test_status_updates_need_approval_then_accept_any_status() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;

    let draft = fixture.create_drive(&token, "Not yet").await;
    let (status, _) = fixture
        .put(
            &format!("/api/company/drives/{}/status", draft["id"]),
            &token,
            json!({ "status": "live" }),
        )
        .await;
    assert_eq!(status, 400);

    let drive_id = fixture.approved_drive(&token, "Running").await;
    let status_path = format!("/api/company/drives/{}/status", drive_id);
    for next in ["live", "completed", "draft"] {
        let (status, body) = fixture
            .put(&status_path, &token, json!({ "status": next }))
            .await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["status"], next);
        assert_eq!(body["data"]["is_approved"], true);
    }

    let (status, _) = fixture
        .put(&status_path, &token, json!({ "status": "archived" }))
        .await;
    assert!(status >= 400);
}

#[tokio::test]
async fn test_admin_review_only_from_submitted() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;
    let admin = fixture.admin_token();

    let drive = fixture.create_drive(&token, "Draft Only").await;
    let approve = format!("/api/admin/drives/{}/approve", drive["id"]);
    let (status, _) = fixture.put(&approve, &admin, json!({ "is_approved": true })).await;
    assert_eq!(status, 400);

    let drive_id = fixture.approved_drive(&token, "Approved Once").await;
    let (status, _) = fixture
        .put(
            &format!("/api/admin/drives/{}/approve", drive_id),
            &admin,
            json!({ "is_approved": false }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = fixture
        .put("/api/admin/drives/9999/approve", &admin, json!({ "is_approved": true }))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_admin_drive_filters() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;
    let admin = fixture.admin_token();

    fixture.create_drive(&token, "Still Draft").await;
    let approved_id = fixture.approved_drive(&token, "Approved").await;

    let pending = fixture.create_drive(&token, "Pending").await;
    let pending_id = pending["id"].as_i64().unwrap();
    fixture.add_question(&token, pending_id, "Q").await;
    fixture
        .put(&format!("/api/company/drives/{}/submit", pending_id), &token, json!({}))
        .await;

    let rejected = fixture.create_drive(&token, "Rejected").await;
    let rejected_id = rejected["id"].as_i64().unwrap();
    fixture.add_question(&token, rejected_id, "Q").await;
    fixture
        .put(&format!("/api/company/drives/{}/submit", rejected_id), &token, json!({}))
        .await;
    let (_, body) = fixture
        .put(
            &format!("/api/admin/drives/{}/approve", rejected_id),
            &admin,
            json!({ "is_approved": false, "admin_notes": "Too vague" }),
        )
        .await;
    assert_eq!(body["data"]["status"], "rejected");
    assert_eq!(body["data"]["is_approved"], false);

    let ids = |body: &Value| -> Vec<i64> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["id"].as_i64().unwrap())
            .collect()
    };

    let (_, body) = fixture.get("/api/admin/drives", &admin).await;
    assert_eq!(ids(&body), vec![pending_id]);
    assert!(body["data"][0]["company_name"].is_string());

    let (_, body) = fixture.get("/api/admin/drives?status_filter=approved", &admin).await;
    assert_eq!(ids(&body), vec![approved_id]);

    let (_, body) = fixture.get("/api/admin/drives?status_filter=rejected", &admin).await;
    assert_eq!(ids(&body), vec![rejected_id]);

    let (_, body) = fixture.get("/api/admin/drives?status_filter=all", &admin).await;
    assert_eq!(ids(&body).len(), 4);

    let (status, _) = fixture.get("/api/admin/drives?status_filter=bogus", &admin).await;
    assert_eq!(status, 400);

    let (status, body) = fixture
        .get(&format!("/api/admin/drives/{}", approved_id), &admin)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["question_count"], 1);
}

#[tokio::test]
async fn test_update_replaces_targets() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;
    let drive = fixture.create_drive(&token, "Retarget").await;
    let path = format!("/api/company/drives/{}", drive["id"]);

    let (status, body) = fixture
        .put(
            &path,
            &token,
            json!({
                "duration_minutes": 90,
                "targets": [{ "college_id": 3, "custom_student_group_name": "Robotics Club" }]
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["duration_minutes"], 90);
    assert_eq!(body["data"]["title"], "Retarget");
    let targets = body["data"]["targets"].as_array().unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0]["college_name"], "IIT Madras");
    assert_eq!(targets[0]["student_group_name"], "Robotics Club");

    // An empty list clears the targets on update.
    let (status, body) = fixture
        .put(&format!("{}/targets", path), &token, json!({ "targets": [] }))
        .await;
    assert_eq!(status, 200);
    assert!(body["data"]["targets"].as_array().unwrap().is_empty());

    let (status, _) = fixture
        .put(&path, &token, json!({ "targets": [{ "college_id": 4242 }] }))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_duplicate_drive_copies_questions_and_targets() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;
    let source_id = fixture.approved_drive(&token, "Campus Hiring").await;
    fixture
        .put(
            &format!("/api/company/drives/{}/status", source_id),
            &token,
            json!({ "status": "live" }),
        )
        .await;

    let (status, body) = fixture
        .post(
            &format!("/api/company/drives/{}/duplicate", source_id),
            &token,
            json!({}),
        )
        .await;
    assert_eq!(status, 200);
    let copy = body["data"].clone();
    let copy_id = copy["id"].as_i64().unwrap();

    assert_ne!(copy_id, source_id);
    assert_eq!(copy["title"], "Campus Hiring (Copy)");
    assert_eq!(copy["status"], "draft");
    assert_eq!(copy["is_approved"], false);
    assert_eq!(copy["admin_notes"], Value::Null);

    let (_, source) = fixture
        .get(&format!("/api/company/drives/{}", source_id), &token)
        .await;
    let strip_ids = |targets: &Value| -> Vec<Value> {
        targets
            .as_array()
            .unwrap()
            .iter()
            .map(|t| {
                let mut t = t.clone();
                t.as_object_mut().unwrap().remove("id");
                t
            })
            .collect()
    };
    assert_eq!(strip_ids(&copy["targets"]), strip_ids(&source["data"]["targets"]));

    let (_, source_questions) = fixture
        .get(&format!("/api/company/drives/{}/questions", source_id), &token)
        .await;
    let (_, copy_questions) = fixture
        .get(&format!("/api/company/drives/{}/questions", copy_id), &token)
        .await;
    let source_questions = &source_questions["data"];
    let copy_questions = &copy_questions["data"];
    assert_eq!(copy_questions.as_array().unwrap().len(), 1);
    for field in ["question_text", "option_a", "option_b", "correct_answer", "difficulty", "points"] {
        assert_eq!(copy_questions[0][field], source_questions[0][field]);
    }
    assert_ne!(copy_questions[0]["id"], source_questions[0]["id"]);

    // The copy has its own lifecycle.
    let (status, _) = fixture
        .put(
            &format!("/api/company/drives/{}", copy_id),
            &token,
            json!({ "title": "Campus Hiring 2026" }),
        )
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_drives_are_scoped_to_their_company() {
    let fixture = TestFixture::new().await;
    let (_, owner) = fixture.approved_company("owner@acme.test").await;
    let (_, other) = fixture.approved_company("other@globex.test").await;
    let drive = fixture.create_drive(&owner, "Private").await;
    let path = format!("/api/company/drives/{}", drive["id"]);

    let (status, _) = fixture.get(&path, &other).await;
    assert_eq!(status, 404);
    let (status, _) = fixture.put(&path, &other, json!({ "title": "Stolen" })).await;
    assert_eq!(status, 404);
    let (status, _) = fixture.delete(&path, &other).await;
    assert_eq!(status, 404);
    let (status, _) = fixture
        .post(&format!("{}/duplicate", path), &other, json!({}))
        .await;
    assert_eq!(status, 404);
    let (status, _) = fixture.get(&format!("{}/questions", path), &other).await;
    assert_eq!(status, 404);

    let (_, body) = fixture.get("/api/company/drives", &other).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_draft_drive() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;
    let drive = fixture.create_drive(&token, "Throwaway").await;
    let path = format!("/api/company/drives/{}", drive["id"]);
    fixture
        .add_question(&token, drive["id"].as_i64().unwrap(), "Q")
        .await;

    let (status, _) = fixture.delete(&path, &token).await;
    assert_eq!(status, 200);
    let (status, _) = fixture.get(&path, &token).await;
    assert_eq!(status, 404);
}

// ==================== QUESTIONS & STUDENTS ====================

#[tokio::test]
async fn test_questions_default_points_and_bulk_upload() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;
    let drive = fixture.create_drive(&token, "Quiz").await;
    let drive_id = drive["id"].as_i64().unwrap();

    let (status, body) = fixture.add_question(&token, drive_id, "Capital of France?").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["points"], 1);

    let (status, body) = fixture
        .post(
            &format!("/api/company/drives/{}/questions/bulk", drive_id),
            &token,
            json!({
                "questions": [
                    { "question_text": "Reverse a list", "points": 5 },
                    { "question_text": "Explain ownership", "points": null }
                ]
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["count"], 2);

    let (_, body) = fixture
        .get(&format!("/api/company/drives/{}/questions", drive_id), &token)
        .await;
    let points: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["points"].as_i64().unwrap())
        .collect();
    assert_eq!(points, vec![1, 5, 1]);

    let (status, _) = fixture.add_question(&token, drive_id, "   ").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_register_students() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;
    let drive = fixture.create_drive(&token, "Exam").await;
    let path = format!("/api/company/drives/{}/students", drive["id"]);

    let (status, body) = fixture
        .post(
            &path,
            &token,
            json!({
                "students": [
                    { "roll_number": "CS-002", "email": "b@uni.test" },
                    { "roll_number": "CS-001", "email": "a@uni.test", "name": "Asha" }
                ]
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = fixture
        .post(
            &path,
            &token,
            json!({ "students": [{ "roll_number": "", "email": "c@uni.test" }] }),
        )
        .await;
    assert_eq!(status, 400);

    let (_, body) = fixture.get(&path, &token).await;
    let rolls: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["roll_number"].as_str().unwrap())
        .collect();
    assert_eq!(rolls, vec!["CS-001", "CS-002"]);
}

// ==================== REGISTRIES ====================

#[tokio::test]
async fn test_duplicate_college_name_conflicts() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token();

    let (status, body) = fixture
        .post("/api/admin/colleges", &admin, json!({ "name": "Northfield College" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["is_approved"], true);

    let (status, body) = fixture
        .post("/api/admin/colleges", &admin, json!({ "name": "Northfield College" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "CONFLICT");

    // Renaming onto another entry's name conflicts too.
    let (status, _) = fixture
        .put("/api/admin/colleges/1", &admin, json!({ "name": "Northfield College" }))
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_registry_approve_and_update() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;
    let admin = fixture.admin_token();
    fixture
        .post(
            "/api/company/drives",
            &token,
            json!({
                "title": "Club Drive",
                "question_type": "technical",
                "duration_minutes": 30,
                "targets": [{ "college_id": 1, "custom_student_group_name": "Chess Club" }]
            }),
        )
        .await;

    let (_, body) = fixture.get("/api/admin/student-groups/pending", &admin).await;
    let club = body["data"][0].clone();
    assert_eq!(club["name"], "Chess Club");
    let approve = format!("/api/admin/student-groups/{}/approve", club["id"]);

    for _ in 0..2 {
        let (status, body) = fixture.put(&approve, &admin, json!({})).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["is_approved"], true);
    }

    let (_, body) = fixture.get("/api/company/student-groups", &token).await;
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|g| g["name"] == "Chess Club"));

    let (status, body) = fixture
        .put(
            &format!("/api/admin/student-groups/{}", club["id"]),
            &admin,
            json!({ "name": "Chess Society", "is_approved": false }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "Chess Society");
    assert_eq!(body["data"]["is_approved"], false);

    let (status, _) = fixture
        .put("/api/admin/student-groups/9999/approve", &admin, json!({}))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_deleted_college_falls_back_to_placeholder() {
    let fixture = TestFixture::new().await;
    let (_, token) = fixture.approved_company("hr@acme.test").await;
    let admin = fixture.admin_token();

    let (_, body) = fixture
        .post("/api/admin/colleges", &admin, json!({ "name": "Short-lived College" }))
        .await;
    let college_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = fixture
        .post(
            "/api/company/drives",
            &token,
            json!({
                "title": "Dangling",
                "question_type": "hr",
                "duration_minutes": 20,
                "targets": [{ "college_id": college_id, "student_group_id": 1 }]
            }),
        )
        .await;
    assert_eq!(status, 200);
    let drive_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = fixture
        .delete(&format!("/api/admin/colleges/{}", college_id), &admin)
        .await;
    assert_eq!(status, 200);

    let (status, body) = fixture
        .get(&format!("/api/company/drives/{}", drive_id), &token)
        .await;
    assert_eq!(status, 200);
    let target = &body["data"]["targets"][0];
    assert_eq!(target["college_id"], college_id);
    assert_eq!(target["college_name"], "Unknown College");
    assert_eq!(target["student_group_name"], "Computer Science Engineering");
}

#[tokio::test]
async fn test_seed_data_is_loaded_once() {
    let fixture = TestFixture::new().await;
    seed_reference_data(&fixture.repo).await.unwrap();

    let (_, body) = fixture
        .get("/api/admin/colleges", &fixture.admin_token())
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 18);

    let (_, body) = fixture
        .get("/api/admin/student-groups", &fixture.admin_token())
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 15);
}
