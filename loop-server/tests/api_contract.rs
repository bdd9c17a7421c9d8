//! End-to-end API contract against a real PostgreSQL database.
//!
//! Run with:
//!   DATABASE_URL=postgres://localhost/loop_test cargo test -p loop-server -- --ignored
//!
//! Every test creates its own users (random emails), so tests can share
//! one database and run in parallel.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use loop_server::db::{create_pool, migrations, NewUser, PgPool, UserRepo};
use loop_server::models::{DisplayName, Email};
use loop_server::{build_router, AppState, AuthKeys, LocalMediaStore, ServerConfig};

const SECRET: &str = "contract-test-secret";

struct TestApp {
    router: Router,
    state_pool: PgPool,
    _media: tempfile::TempDir,
}

struct TestUser {
    id: Uuid,
    token: String,
}

impl TestApp {
    async fn new() -> Self {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = create_pool(&url).await.expect("connect");
        migrations::run(&pool).await.expect("migrate");

        let media = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalMediaStore::new(media.path(), "http://test/media"));
        let state = AppState::new(pool.clone(), AuthKeys::new(SECRET), store);
        let config = ServerConfig {
            media_root: media.path().to_path_buf(),
            ..ServerConfig::default()
        };

        Self {
            router: build_router(state, &config),
            state_pool: pool,
            _media: media,
        }
    }

    async fn user(&self, name: &str) -> TestUser {
        let email = format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4());
        let user = UserRepo::new(&self.state_pool)
            .create(NewUser {
                email: Email::new(&email).unwrap(),
                name: DisplayName::new(name).unwrap(),
                avatar: None,
            })
            .await
            .expect("create user");

        let token = AuthKeys::new(SECRET)
            .issue(user.id, Some(name), chrono::Duration::hours(1))
            .unwrap();

        TestUser { id: user.id, token }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create_sound(&self, user: &TestUser, title: &str) -> Uuid {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/sounds",
                Some(user),
                Some(json!({ "title": title, "bpm": 120, "tags": ["contract"] })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        id_of(&body)
    }

    async fn create_project(&self, user: &TestUser, title: &str, sounds: &[Uuid]) -> Uuid {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/projects",
                Some(user),
                Some(json!({ "title": title, "soundIds": sounds })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        id_of(&body)
    }
}

fn id_of(body: &Value) -> Uuid {
    body["_id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
#[ignore = "requires database"]
async fn creating_a_sound_returns_201_with_populated_creator() {
    let app = TestApp::new().await;
    let ana = app.user("Ana").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/sounds",
            Some(&ana),
            Some(json!({
                "title": "Warm pad",
                "bpm": 90,
                "duration": 8.0,
                "soundURL": "http://test/media/pad.wav",
                "tags": ["Pads", "ambient"]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["title"], "Warm pad");
    assert_eq!(body["creator"]["_id"], ana.id.to_string());
    assert_eq!(body["creator"]["name"], "Ana");
    assert_eq!(body["soundUrl"], "http://test/media/pad.wav");

    let mut tags: Vec<&str> = body["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    tags.sort();
    assert_eq!(tags, vec!["Pads", "ambient"]);

    let (status, fetched) = app
        .call(Method::GET, &format!("/api/sounds/{}", id_of(&body)), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["bpm"], 90);
}

#[tokio::test]
#[ignore = "requires database"]
async fn only_the_creator_can_delete_a_project() {
    let app = TestApp::new().await;
    let owner = app.user("Owner").await;
    let member = app.user("Member").await;
    let project = app.create_project(&owner, "Shared jam", &[]).await;

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/projects/{project}/members/{}", member.id),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Members can collaborate but not delete
    let (status, body) = app
        .call(Method::DELETE, &format!("/api/projects/{project}"), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/projects/{project}"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::GET, &format!("/api/projects/{project}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires database"]
async fn duplicate_sound_and_member_are_rejected() {
    let app = TestApp::new().await;
    let owner = app.user("Owner").await;
    let guest = app.user("Guest").await;
    let sound = app.create_sound(&owner, "Kick").await;
    let project = app.create_project(&owner, "Beat", &[sound]).await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/projects/{project}/sounds/{sound}"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate");

    let member_uri = format!("/api/projects/{project}/members/{}", guest.id);
    let (status, _) = app.call(Method::POST, &member_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.call(Method::POST, &member_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate");
}

#[tokio::test]
#[ignore = "requires database"]
async fn missing_resources_return_404() {
    let app = TestApp::new().await;
    let ana = app.user("Ana").await;
    let missing = Uuid::new_v4();

    for uri in [
        format!("/api/projects/{missing}"),
        format!("/api/sounds/{missing}"),
        format!("/api/tags/{missing}"),
        format!("/api/projects/{missing}/tree"),
        format!("/api/projects/download-project/{missing}"),
    ] {
        let (status, body) = app.call(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["error"], "not_found", "{uri}");
    }

    let (status, _) = app
        .call(Method::POST, &format!("/api/projects/{missing}/fork"), Some(&ana), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Attaching an unknown sound to a real project
    let project = app.create_project(&ana, "Empty", &[]).await;
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/projects/{project}/sounds/{missing}"),
            Some(&ana),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires database"]
async fn related_projects_exclude_the_requesting_project() {
    let app = TestApp::new().await;
    let ana = app.user("Ana").await;
    let ben = app.user("Ben").await;
    let master = app.create_sound(&ana, "Loop A").await;

    let original = app.create_project(&ana, "Loop", &[master]).await;
    let other = app.create_project(&ben, "Loop remix", &[master]).await;

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/projects/related?projectId={original}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<Uuid> = body.as_array().unwrap().iter().map(id_of).collect();
    assert!(ids.contains(&other));
    assert!(!ids.contains(&original));

    // Degrades to an empty list instead of failing
    let (status, body) = app
        .call(Method::GET, "/api/projects/related?projectId=nope", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/projects/related/{master}?exclude={other}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<Uuid> = body.as_array().unwrap().iter().map(id_of).collect();
    assert!(ids.contains(&original));
    assert!(!ids.contains(&other));
}

#[tokio::test]
#[ignore = "requires database"]
async fn fork_copies_sounds_and_shows_in_tree() {
    let app = TestApp::new().await;
    let ana = app.user("Ana").await;
    let ben = app.user("Ben").await;
    let sound = app.create_sound(&ana, "Bass").await;
    let parent = app.create_project(&ana, "Groove", &[sound]).await;

    let (status, fork) = app
        .call(Method::POST, &format!("/api/projects/{parent}/fork"), Some(&ben), None)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{fork}");
    assert_eq!(fork["isFork"], true);
    assert_eq!(fork["parentProjectId"], parent.to_string());
    assert_eq!(fork["masterSoundId"], sound.to_string());
    assert_eq!(fork["sounds"][0]["_id"], sound.to_string());
    let fork_id = id_of(&fork);

    let members: Vec<&str> = fork["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["_id"].as_str().unwrap())
        .collect();
    assert!(members.contains(&ben.id.to_string().as_str()));

    let (status, parent_body) = app
        .call(Method::GET, &format!("/api/projects/{parent}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parent_body["childProjectIds"][0], fork_id.to_string());

    let (status, tree) = app
        .call(Method::GET, &format!("/api/projects/{fork_id}/tree"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK, "{tree}");
    assert_eq!(tree["root"]["_id"], parent.to_string());
    assert_eq!(tree["root"]["children"][0]["_id"], fork_id.to_string());
    assert_eq!(tree["root"]["children"][0]["isCurrent"], true);
}

#[tokio::test]
#[ignore = "requires database"]
async fn favorites_round_trip_through_profile() {
    let app = TestApp::new().await;
    let ana = app.user("Ana").await;
    let sound = app.create_sound(&ana, "Snare").await;

    let uri = format!("/api/users/{}/favorites/sounds/{sound}", ana.id);
    let (status, profile) = app.call(Method::POST, &uri, Some(&ana), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["favoriteSounds"][0], sound.to_string());
    assert_eq!(profile["createdSounds"][0], sound.to_string());

    let (status, _) = app.call(Method::POST, &uri, Some(&ana), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, profile) = app.call(Method::DELETE, &uri, Some(&ana), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["favoriteSounds"], json!([]));
}

#[tokio::test]
#[ignore = "requires database"]
async fn related_and_tree_follow_the_effective_master_sound() {
    let app = TestApp::new().await;
    let ana = app.user("Ana").await;
    let ben = app.user("Ben").await;
    let first = app.create_sound(&ana, "Intro").await;
    let second = app.create_sound(&ana, "Hook").await;
    let original = app.create_project(&ana, "Song", &[first, second]).await;

    // Removing the first sound leaves the original with no stored master
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/sounds/{first}"), Some(&ana), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, fork) = app
        .call(Method::POST, &format!("/api/projects/{original}/fork"), Some(&ben), None)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{fork}");
    assert_eq!(fork["masterSoundId"], second.to_string());
    let fork_id = id_of(&fork);

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/projects/related?projectId={fork_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<Uuid> = body.as_array().unwrap().iter().map(id_of).collect();
    assert!(ids.contains(&original), "{body}");
    assert!(!ids.contains(&fork_id));

    let (status, tree) = app
        .call(Method::GET, &format!("/api/projects/{fork_id}/tree"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK, "{tree}");
    assert_eq!(tree["root"]["_id"], original.to_string());
    assert_eq!(tree["root"]["children"][0]["_id"], fork_id.to_string());
}

#[tokio::test]
#[ignore = "requires database"]
async fn pages_past_the_end_still_report_the_total() {
    let app = TestApp::new().await;
    let ana = app.user("Ana").await;
    let sound = app.create_sound(&ana, "Tail").await;
    app.create_project(&ana, "Tail project", &[sound]).await;

    for uri in [
        "/api/sounds?perPage=1&page=100000",
        "/api/projects?perPage=1&page=100000",
        "/api/users?perPage=1&page=100000",
        "/api/tags?perPage=1&page=100000",
    ] {
        let (status, body) = app.call(Method::GET, uri, Some(&ana), None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["items"], json!([]), "{uri}");
        assert!(body["total"].as_i64().unwrap() >= 1, "{uri}: {body}");
        assert_eq!(body["page"], 100000, "{uri}");
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn only_the_creator_can_edit_or_delete_a_sound() {
    let app = TestApp::new().await;
    let ana = app.user("Ana").await;
    let ben = app.user("Ben").await;
    let sound = app.create_sound(&ana, "Clap").await;
    let uri = format!("/api/sounds/{sound}");

    let (status, body) = app
        .call(Method::PUT, &uri, Some(&ben), Some(json!({ "bpm": 100 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = app.call(Method::DELETE, &uri, Some(&ben), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bpm"], 120);

    let (status, body) = app
        .call(Method::PUT, &uri, Some(&ana), Some(json!({ "bpm": 100 })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["bpm"], 100);
}

#[tokio::test]
#[ignore = "requires database"]
async fn outsiders_cannot_change_project_sounds() {
    let app = TestApp::new().await;
    let owner = app.user("Owner").await;
    let outsider = app.user("Outsider").await;
    let kept = app.create_sound(&owner, "Keys").await;
    let project = app.create_project(&owner, "Closed", &[kept]).await;
    let extra = app.create_sound(&outsider, "Extra").await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/projects/{project}/sounds/{extra}"),
            Some(&outsider),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/projects/{project}/sounds/{kept}"),
            Some(&outsider),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/sounds",
            Some(&outsider),
            Some(json!({ "title": "Sneaky", "bpm": 120, "projectId": project })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = app
        .call(Method::GET, &format!("/api/projects/{project}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let sounds: Vec<Uuid> = body["sounds"].as_array().unwrap().iter().map(id_of).collect();
    assert_eq!(sounds, vec![kept]);
}

#[tokio::test]
#[ignore = "requires database"]
async fn users_can_only_change_their_own_profile() {
    let app = TestApp::new().await;
    let ana = app.user("Ana").await;
    let ben = app.user("Ben").await;
    let uri = format!("/api/users/{}", ana.id);

    let (status, body) = app
        .call(Method::PUT, &uri, Some(&ben), Some(json!({ "name": "Not Ana" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = app.call(Method::DELETE, &uri, Some(&ben), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ana");
}

#[tokio::test]
#[ignore = "requires database"]
async fn download_manifest_skips_sounds_without_a_url() {
    let app = TestApp::new().await;
    let ana = app.user("Ana").await;

    let mut with_url = Vec::new();
    for (title, file) in [("Drums", "drums.wav"), ("Vox", "vox.mp3")] {
        let (status, body) = app
            .call(
                Method::POST,
                "/api/sounds",
                Some(&ana),
                Some(json!({
                    "title": title,
                    "bpm": 100,
                    "soundURL": format!("http://test/media/{file}"),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        with_url.push(id_of(&body));
    }
    let silent = app.create_sound(&ana, "Placeholder").await;

    let project = app
        .create_project(&ana, "Stems", &[with_url[0], silent, with_url[1]])
        .await;

    let (status, manifest) = app
        .call(
            Method::GET,
            &format!("/api/projects/download-project/{project}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{manifest}");
    assert_eq!(manifest["projectId"], project.to_string());
    assert_eq!(manifest["title"], "Stems");
    assert_eq!(
        manifest["files"],
        json!([
            { "soundId": with_url[0], "title": "Drums", "url": "http://test/media/drums.wav" },
            { "soundId": with_url[1], "title": "Vox", "url": "http://test/media/vox.mp3" },
        ])
    );
}

#[tokio::test]
#[ignore = "requires database"]
async fn creating_a_project_for_a_deleted_user_reports_the_user() {
    let app = TestApp::new().await;
    let ghost = app.user("Ghost").await;
    UserRepo::new(&app.state_pool)
        .delete(ghost.id)
        .await
        .expect("delete user");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/projects",
            Some(&ghost),
            Some(json!({ "title": "Orphan" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert_eq!(body["error"], "not_found");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("user"), "{message}");
    assert!(message.contains(&ghost.id.to_string()), "{message}");
}
