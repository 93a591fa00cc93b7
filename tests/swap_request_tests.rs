// tests/swap_request_tests.rs

mod common;

use serde_json::{Value, json};

use common::{TestApp, TestUser, spawn_app};

async fn send_request(app: &TestApp, from: &TestUser, to: &TestUser) -> reqwest::Response {
    app.client
        .post(app.url("/request"))
        .bearer_auth(&from.token)
        .json(&json!({
            "receiverId": to.profile_id,
            "offeredSkill": "React",
            "requestedSkill": "Go",
            "message": "Happy to pair on <script>alert(1)</script>weekends",
        }))
        .send()
        .await
        .unwrap()
}

async fn patch_status(
    app: &TestApp,
    user: &TestUser,
    path: &str,
    status: &str,
) -> reqwest::Response {
    app.client
        .patch(app.url(path))
        .bearer_auth(&user.token)
        .json(&json!({ "status": status }))
        .send()
        .await
        .unwrap()
}

async fn my_requests(app: &TestApp, user: &TestUser, query: &str) -> Vec<Value> {
    app.client
        .get(app.url(&format!("/request{}", query)))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn receiver_accepts_and_nobody_changes_it_again() {
    let Some(app) = spawn_app().await else { return };
    let a = app.create_user("Alice", &["React"], &["Go"], true).await;
    let b = app.create_user("Bob", &["Go"], &["React"], true).await;

    let response = send_request(&app, &a, &b).await;
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["status"], "PENDING");
    assert!(!created["message"].as_str().unwrap().contains("<script>"));
    let id = created["id"].as_i64().unwrap();

    // A second open request to the same profile is refused.
    assert_eq!(send_request(&app, &a, &b).await.status().as_u16(), 409);

    // Listing: outgoing for A, incoming for B.
    let a_list = my_requests(&app, &a, "").await;
    let entry = a_list.iter().find(|r| r["id"] == id).unwrap();
    assert_eq!(entry["isIncoming"], false);
    assert_eq!(entry["counterpart"]["name"], "Bob");

    let b_incoming = my_requests(&app, &b, "?direction=incoming&status=pending").await;
    assert!(b_incoming.iter().any(|r| r["id"] == id && r["isIncoming"] == true));

    // The sender cannot accept.
    let path = format!("/request/{}", id);
    assert_eq!(patch_status(&app, &a, &path, "ACCEPTED").await.status().as_u16(), 403);

    let response = patch_status(&app, &b, &path, "ACCEPTED").await;
    assert_eq!(response.status().as_u16(), 200);
    let accepted: Value = response.json().await.unwrap();
    assert_eq!(accepted["status"], "ACCEPTED");

    // Terminal: both parties and both paths get a conflict.
    let legacy = format!("/request/{}/status", id);
    assert_eq!(patch_status(&app, &b, &path, "REJECTED").await.status().as_u16(), 409);
    assert_eq!(patch_status(&app, &a, &legacy, "CANCELLED").await.status().as_u16(), 409);
    assert_eq!(patch_status(&app, &b, &legacy, "REJECTED").await.status().as_u16(), 409);

    // Once settled, a new request between the same pair is allowed.
    assert_eq!(send_request(&app, &a, &b).await.status().as_u16(), 201);
}

#[tokio::test]
async fn sender_cancels_and_outsiders_see_nothing() {
    let Some(app) = spawn_app().await else { return };
    let a = app.create_user("Carol", &["Rust"], &["SQL"], true).await;
    let b = app.create_user("Dave", &["SQL"], &["Rust"], true).await;
    let c = app.create_user("Eve", &[], &[], true).await;

    let created: Value = send_request(&app, &a, &b).await.json().await.unwrap();
    let path = format!("/request/{}/status", created["id"]);

    assert_eq!(patch_status(&app, &c, &path, "CANCELLED").await.status().as_u16(), 404);
    assert_eq!(patch_status(&app, &b, &path, "CANCELLED").await.status().as_u16(), 403);
    assert_eq!(patch_status(&app, &a, &path, "PENDING").await.status().as_u16(), 400);
    assert_eq!(patch_status(&app, &a, &path, "cancelled").await.status().as_u16(), 200);

    assert!(my_requests(&app, &c, "").await.is_empty());
}

#[tokio::test]
async fn requests_to_self_or_missing_profiles_fail() {
    let Some(app) = spawn_app().await else { return };
    let a = app.create_user("Frank", &[], &[], true).await;

    assert_eq!(send_request(&app, &a, &a).await.status().as_u16(), 400);

    let ghost = TestUser {
        email: String::new(),
        token: String::new(),
        account_id: 0,
        profile_id: i64::MAX,
    };
    assert_eq!(send_request(&app, &a, &ghost).await.status().as_u16(), 404);
}

#[tokio::test]
async fn directory_hides_private_and_own_profiles() {
    let Some(app) = spawn_app().await else { return };
    let id = uuid::Uuid::new_v4().simple().to_string();
    let tag = &id[..8];
    let visible = app
        .create_user(&format!("Pub{}", tag), &["Piano"], &[], true)
        .await;
    let hidden = app
        .create_user(&format!("Priv{}", tag), &["Piano"], &[], false)
        .await;

    let page: Value = app
        .client
        .get(app.url(&format!("/users?search={}", tag)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<i64> = page["profiles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&visible.profile_id));
    assert!(!ids.contains(&hidden.profile_id));

    // The caller's own profile is left out of the directory.
    let own: Value = app
        .client
        .get(app.url(&format!("/profile/all?search={}", tag)))
        .bearer_auth(&visible.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own["total"], 0);

    // Private profiles are 404 to others but visible to their owner.
    let path = format!("/users/{}", hidden.profile_id);
    let anonymous = app.client.get(app.url(&path)).send().await.unwrap();
    assert_eq!(anonymous.status().as_u16(), 404);
    let owner = app
        .client
        .get(app.url(&path))
        .bearer_auth(&hidden.token)
        .send()
        .await
        .unwrap();
    assert_eq!(owner.status().as_u16(), 200);
}

#[tokio::test]
async fn skill_spellings_share_one_dictionary_entry() {
    let Some(app) = spawn_app().await else { return };
    let id = uuid::Uuid::new_v4().simple().to_string();
    let skill = format!("Elixir{}", &id[..8]);
    let shouted = skill.to_uppercase();

    let a = app.create_user("Kim", &[skill.as_str()], &[], true).await;
    let b = app.create_user("Lee", &[shouted.as_str()], &[], true).await;

    let skills: Vec<Value> = app
        .client
        .get(app.url(&format!("/skills?search={}", skill)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(skills.len(), 1);
    assert_eq!(skills[0]["name"], skill.as_str());
    assert_eq!(skills[0]["offeredCount"], 2);

    // B keeps the first spelling stored.
    let profile: Value = app
        .client
        .get(app.url(&format!("/users/{}", b.profile_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["skillsOffered"], json!([skill]));

    for filter in [skill.to_lowercase(), shouted.clone()] {
        let page: Value = app
            .client
            .get(app.url(&format!("/users?offered={}&limit=50", filter)))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let ids: Vec<i64> = page["profiles"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_i64().unwrap())
            .collect();
        assert!(ids.contains(&a.profile_id), "{}", filter);
        assert!(ids.contains(&b.profile_id), "{}", filter);
    }
}

#[tokio::test]
async fn feedback_updates_the_average() {
    let Some(app) = spawn_app().await else { return };
    let target = app.create_user("Grace", &["Chess"], &[], true).await;
    let r1 = app.create_user("Heidi", &[], &[], true).await;
    let r2 = app.create_user("Ivan", &[], &[], true).await;

    for (reviewer, rating) in [(&r1, 5), (&r2, 3)] {
        let response = app
            .client
            .post(app.url("/feedback"))
            .bearer_auth(&reviewer.token)
            .json(&json!({
                "targetProfileId": target.profile_id,
                "rating": rating,
                "comment": "Great",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
    }

    let self_rating = app
        .client
        .post(app.url("/feedback"))
        .bearer_auth(&target.token)
        .json(&json!({ "targetProfileId": target.profile_id, "rating": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(self_rating.status().as_u16(), 400);

    let list: Value = app
        .client
        .get(app.url(&format!("/feedback/{}", target.profile_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["count"], 2);
    assert_eq!(list["averageRating"], 4.0);
    assert_eq!(list["items"][0]["fromName"], "Ivan");

    let profile: Value = app
        .client
        .get(app.url(&format!("/users/{}", target.profile_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["averageRating"], 4.0);
    assert_eq!(profile["feedbackCount"], 2);
}

#[tokio::test]
async fn admin_routes_are_role_gated() {
    let Some(app) = spawn_app().await else { return };
    let user = app.create_user("Judy", &[], &[], true).await;
    let admin = app.create_user("Mallory", &[], &[], false).await;

    let response = app
        .client
        .get(app.url("/admin/stats"))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    app.make_admin(&admin).await;

    let stats = app
        .client
        .get(app.url("/admin/stats?days=7"))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(stats.status().as_u16(), 200);
    let stats: Value = stats.json().await.unwrap();
    assert_eq!(stats["windowDays"], 7);
    assert!(stats["profiles"].as_i64().unwrap() >= 2);

    let bad_window = app
        .client
        .get(app.url("/admin/reports?days=0"))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(bad_window.status().as_u16(), 400);

    let report: Value = app
        .client
        .get(app.url("/admin/reports?top=3"))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["ratingDistribution"].as_array().unwrap().len(), 5);
    assert!(report["topSkills"].as_array().unwrap().len() <= 3);

    // Ban the user: the change lands in the audit trail and locks them out.
    let moderated = app
        .client
        .patch(app.url("/admin/users"))
        .bearer_auth(&admin.token)
        .json(&json!({ "profileId": user.profile_id, "action": "BAN" }))
        .send()
        .await
        .unwrap();
    assert_eq!(moderated.status().as_u16(), 200);
    let moderated: Value = moderated.json().await.unwrap();
    assert_eq!(moderated["isBanned"], true);

    let itself = app
        .client
        .patch(app.url("/admin/users"))
        .bearer_auth(&admin.token)
        .json(&json!({ "profileId": admin.profile_id, "action": "DEMOTE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(itself.status().as_u16(), 400);

    let logs: Vec<Value> = app
        .client
        .get(app.url("/admin/logs?limit=200"))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(logs.iter().any(|l| l["action"] == "BAN_USER"
        && l["targetProfileId"] == user.profile_id
        && l["adminId"] == admin.profile_id));

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM admin_action_logs WHERE target_profile_id = $1",
    )
    .bind(user.profile_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);

    assert_eq!(app.login(&user.email, "password123").await.status().as_u16(), 403);
    let blocked = app
        .client
        .get(app.url("/request"))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(blocked.status().as_u16(), 403);
}

#[tokio::test]
async fn announcements_reach_the_public_feed() {
    let Some(app) = spawn_app().await else { return };
    let admin = app.create_user("Oscar", &[], &[], false).await;
    app.make_admin(&admin).await;

    let title = format!("Maintenance {}", uuid::Uuid::new_v4().simple());
    let response = app
        .client
        .post(app.url("/admin/messages"))
        .bearer_auth(&admin.token)
        .json(&json!({ "title": title, "body": "Back <i>soon</i>" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["adminName"], "Oscar");

    let feed: Vec<Value> = app
        .client
        .get(app.url("/platform-messages?limit=100"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(feed.iter().any(|m| m["title"] == title.as_str()));
}
