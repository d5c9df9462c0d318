mod common;

use axum::http::{Method, StatusCode};
use common::test_app;
use serde_json::json;
use uuid::Uuid;

fn ids(body: &serde_json::Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|listing| listing["id"].as_str().unwrap().to_string())
        .collect()
}

// --- Moderation lifecycle ---

#[tokio::test]
async fn moderation_lifecycle() {
    let app = test_app();
    let (owner, _) = app.register("anna@example.com").await;
    let (stranger, _) = app.register("berta@example.com").await;
    let (admin, _) = app.admin("root@example.com").await;

    let id = app.create_listing(&owner, "Strawberries").await;
    let uri = format!("/api/listings/{id}");

    // Created as PENDING.
    let response = app.get(&uri, Some(&owner)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "PENDING");

    // Hidden from everyone but owner and admin.
    assert_eq!(app.get(&uri, Some(&stranger)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get(&uri, None).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get(&uri, Some(&admin)).await.status, StatusCode::OK);

    // In the admin queue.
    let queue = app.get("/api/admin/listings", Some(&admin)).await;
    assert_eq!(ids(&queue.body), vec![id.to_string()]);

    // Approve: now public.
    let approve = format!("/api/admin/listings/{id}/approve");
    assert_eq!(
        app.send(Method::POST, &approve, Some(&admin), None).await.status,
        StatusCode::NO_CONTENT
    );
    let response = app.get(&uri, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "APPROVED");
    assert!(app.get("/api/admin/listings", Some(&admin)).await.body.as_array().unwrap().is_empty());

    // Approving again is a no-op.
    assert_eq!(
        app.send(Method::POST, &approve, Some(&admin), None).await.status,
        StatusCode::NO_CONTENT
    );

    // Republish is only for rejected listings.
    let republish = format!("/api/listings/{id}/republish");
    let response = app.send(Method::POST, &republish, Some(&owner), None).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.code(), "INVALID_TRANSITION");
    assert_eq!(app.get(&uri, None).await.body["status"], "APPROVED");

    // Takedown.
    let reject = format!("/api/admin/listings/{id}/reject");
    assert_eq!(
        app.send(Method::POST, &reject, Some(&admin), None).await.status,
        StatusCode::NO_CONTENT
    );
    assert_eq!(app.get(&uri, None).await.status, StatusCode::FORBIDDEN);

    // A rejected listing cannot be approved directly.
    assert_eq!(
        app.send(Method::POST, &approve, Some(&admin), None).await.status,
        StatusCode::CONFLICT
    );

    // Only the owner (or an admin) may republish.
    assert_eq!(
        app.send(Method::POST, &republish, Some(&stranger), None).await.status,
        StatusCode::FORBIDDEN
    );
    let response = app.send(Method::POST, &republish, Some(&owner), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "PENDING");

    // Republishing a pending listing is refused.
    assert_eq!(
        app.send(Method::POST, &republish, Some(&owner), None).await.status,
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn moderation_endpoints_require_admin() {
    let app = test_app();
    let (owner, _) = app.register("anna@example.com").await;
    let id = app.create_listing(&owner, "Honey").await;

    let approve = format!("/api/admin/listings/{id}/approve");
    assert_eq!(
        app.send(Method::POST, &approve, Some(&owner), None).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.send(Method::POST, &approve, None, None).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(app.get(&format!("/api/listings/{id}"), Some(&owner)).await.body["status"], "PENDING");
}

#[tokio::test]
async fn moderating_a_missing_listing_is_not_found() {
    let app = test_app();
    let (admin, _) = app.admin("root@example.com").await;
    let response = app
        .send(
            Method::POST,
            &format!("/api/admin/listings/{}/approve", Uuid::new_v4()),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// --- Browsing ---

#[tokio::test]
async fn anonymous_browsing_sees_only_approved_listings() {
    let app = test_app();
    let (owner, _) = app.register("anna@example.com").await;
    let (admin, _) = app.admin("root@example.com").await;

    let approved = app.create_listing(&owner, "Apples").await;
    let pending = app.create_listing(&owner, "Pears").await;
    app.send(
        Method::POST,
        &format!("/api/admin/listings/{approved}/approve"),
        Some(&admin),
        None,
    )
    .await;

    let anonymous = app.get("/api/listings", None).await;
    assert_eq!(anonymous.status, StatusCode::OK);
    assert_eq!(ids(&anonymous.body), vec![approved.to_string()]);

    // `all=true` is an admin switch; the owner still only sees published listings here.
    let owner_view = app.get("/api/listings?all=true", Some(&owner)).await;
    assert_eq!(ids(&owner_view.body), vec![approved.to_string()]);

    let admin_view = app.get("/api/listings?all=true", Some(&admin)).await;
    let all = ids(&admin_view.body);
    assert_eq!(all.len(), 2);
    assert!(all.contains(&pending.to_string()));

    // The owner's own page shows every state.
    let mine = app.get("/api/listings/my-listings", Some(&owner)).await;
    assert_eq!(mine.body.as_array().unwrap().len(), 2);
    assert_eq!(
        app.get("/api/listings/my-listings", None).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn missing_listing_is_not_found_for_everyone() {
    let app = test_app();
    let uri = format!("/api/listings/{}", Uuid::new_v4());
    assert_eq!(app.get(&uri, None).await.status, StatusCode::NOT_FOUND);
}

// --- Ownership ---

#[tokio::test]
async fn only_owner_or_admin_may_modify_a_listing() {
    let app = test_app();
    let (owner, _) = app.register("anna@example.com").await;
    let (stranger, _) = app.register("berta@example.com").await;
    let (admin, _) = app.admin("root@example.com").await;
    let id = app.create_listing(&owner, "Cucumbers").await;
    let uri = format!("/api/listings/{id}");

    let response = app
        .send(Method::PUT, &uri, Some(&stranger), Some(json!({ "price": 0.1 })))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.send(Method::DELETE, &uri, Some(&stranger), None).await.status,
        StatusCode::FORBIDDEN
    );

    let response = app
        .send(Method::PUT, &uri, Some(&owner), Some(json!({ "price": 2.25, "unit": "PCS" })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["price"], 2.25);
    assert_eq!(response.body["unit"], "PCS");
    assert_eq!(response.body["title"], "Cucumbers");
    assert_eq!(response.body["status"], "PENDING");

    assert_eq!(
        app.send(Method::DELETE, &uri, Some(&admin), None).await.status,
        StatusCode::NO_CONTENT
    );
    assert_eq!(app.get(&uri, Some(&owner)).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn existence_is_checked_before_ownership() {
    let app = test_app();
    let (stranger, _) = app.register("berta@example.com").await;
    let uri = format!("/api/listings/{}", Uuid::new_v4());

    assert_eq!(
        app.send(Method::DELETE, &uri, Some(&stranger), None).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.send(Method::PUT, &uri, Some(&stranger), Some(json!({ "price": 1.0 })))
            .await
            .status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn anonymous_writes_are_unauthorized() {
    let app = test_app();
    let response = app
        .post(
            "/api/listings",
            None,
            json!({ "title": "Eggs", "price": 1.0, "city": "Cēsis", "category_id": 1 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

// --- Listing payloads ---

#[tokio::test]
async fn create_listing_requires_an_existing_category() {
    let app = test_app();
    let (owner, _) = app.register("anna@example.com").await;
    let response = app
        .post(
            "/api/listings",
            Some(&owner),
            json!({ "title": "Eggs", "price": 1.0, "city": "Cēsis", "category_id": 999 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), "BAD_REQUEST");
}

#[tokio::test]
async fn create_listing_validates_fields_and_ignores_client_status() {
    let app = test_app();
    let (owner, owner_id) = app.register("anna@example.com").await;

    let response = app
        .post(
            "/api/listings",
            Some(&owner),
            json!({ "title": " ", "price": -3.0, "city": "Cēsis", "category_id": 1 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["fields"]["title"].is_string());
    assert!(response.body["fields"]["price"].is_string());

    let response = app
        .post(
            "/api/listings",
            Some(&owner),
            json!({
                "title": "Eggs",
                "price": 1.0,
                "city": "Cēsis",
                "category_id": 4,
                "status": "APPROVED",
                "owner_id": Uuid::new_v4()
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["status"], "PENDING");
    assert_eq!(response.body["owner_id"], owner_id.to_string());
    assert_eq!(response.body["currency"], "EUR");
    assert_eq!(response.body["unit"], "KG");
}

// --- Categories ---

#[tokio::test]
async fn categories_are_public_to_read_and_admin_to_write() {
    let app = test_app();
    let (user, _) = app.register("anna@example.com").await;
    let (admin, _) = app.admin("root@example.com").await;

    let response = app.get("/api/categories", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.as_array().unwrap().len(), 5);
    assert_eq!(app.get("/api/categories/1", None).await.status, StatusCode::OK);
    assert_eq!(app.get("/api/categories/404", None).await.status, StatusCode::NOT_FOUND);

    let body = json!({ "name": "Mushrooms", "slug": "mushrooms" });
    assert_eq!(
        app.post("/api/categories", None, body.clone()).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.post("/api/categories", Some(&user), body.clone()).await.status,
        StatusCode::FORBIDDEN
    );

    let created = app.post("/api/categories", Some(&admin), body.clone()).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["id"].as_i64().unwrap();

    // Slugs are unique.
    assert_eq!(
        app.post("/api/categories", Some(&admin), body).await.status,
        StatusCode::BAD_REQUEST
    );

    let updated = app
        .send(
            Method::PUT,
            &format!("/api/categories/{id}"),
            Some(&admin),
            Some(json!({ "name": "Wild mushrooms", "slug": "wild-mushrooms" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["slug"], "wild-mushrooms");

    assert_eq!(
        app.send(Method::DELETE, &format!("/api/categories/{id}"), Some(&admin), None)
            .await
            .status,
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        app.send(Method::DELETE, &format!("/api/categories/{id}"), Some(&admin), None)
            .await
            .status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn category_in_use_cannot_be_deleted() {
    let app = test_app();
    let (owner, _) = app.register("anna@example.com").await;
    let (admin, _) = app.admin("root@example.com").await;
    app.create_listing(&owner, "Carrots").await;

    let response = app
        .send(Method::DELETE, "/api/categories/1", Some(&admin), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// --- Users ---

#[tokio::test]
async fn profile_read_and_update() {
    let app = test_app();
    let (token, user_id) = app.register("anna@example.com").await;

    let profile = app.get("/api/users/profile", Some(&token)).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["id"], user_id.to_string());
    assert!(profile.body.get("password_hash").is_none());

    let updated = app
        .send(
            Method::PUT,
            "/api/users/profile",
            Some(&token),
            Some(json!({ "name": "Anna", "surname": "Bērziņa", "city": "Rīga", "phone_number": "+371 2000 0000" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["city"], "Rīga");

    let invalid = app
        .send(
            Method::PUT,
            "/api/users/profile",
            Some(&token),
            Some(json!({ "name": "" })),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let (other, _) = app.register("berta@example.com").await;
    let seen = app.get(&format!("/api/users/{user_id}"), Some(&other)).await;
    assert_eq!(seen.status, StatusCode::OK);
    assert_eq!(seen.body["surname"], "Bērziņa");
    assert_eq!(
        app.get(&format!("/api/users/{user_id}"), None).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn profile_text_fields_are_stored_trimmed() {
    let app = test_app();
    let registered = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "email": "liga@example.com",
                "password": common::PASSWORD,
                "name": " Līga ",
                "surname": "  Ozola ",
                "city": " Cēsis  "
            }),
        )
        .await;
    assert_eq!(registered.status, StatusCode::OK);
    let token = registered.body["token"].as_str().unwrap().to_string();

    let profile = app.get("/api/users/profile", Some(&token)).await;
    assert_eq!(profile.body["name"], "Līga");
    assert_eq!(profile.body["surname"], "Ozola");
    assert_eq!(profile.body["city"], "Cēsis");

    let updated = app
        .send(
            Method::PUT,
            "/api/users/profile",
            Some(&token),
            Some(json!({ "name": "Līga", "surname": " Kalniņa ", "city": "   ", "phone_number": " +371 2000 0000 " })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["surname"], "Kalniņa");
    assert!(updated.body["city"].is_null());
    assert_eq!(updated.body["phone_number"], "+371 2000 0000");
}

#[tokio::test]
async fn admin_user_deletion_rules() {
    let app = test_app();
    let (owner, owner_id) = app.register("anna@example.com").await;
    let (admin, admin_id) = app.admin("root@example.com").await;
    let (_, other_admin_id) = app.admin("root2@example.com").await;
    app.create_listing(&owner, "Plums").await;

    let delete = |id: Uuid| format!("/api/admin/users/{id}");

    assert_eq!(
        app.send(Method::DELETE, &delete(admin_id), Some(&admin), None).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.send(Method::DELETE, &delete(other_admin_id), Some(&admin), None)
            .await
            .status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.send(Method::DELETE, &delete(Uuid::new_v4()), Some(&admin), None)
            .await
            .status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.send(Method::DELETE, &delete(owner_id), Some(&owner), None)
            .await
            .status,
        StatusCode::FORBIDDEN
    );

    assert_eq!(
        app.send(Method::DELETE, &delete(owner_id), Some(&admin), None)
            .await
            .status,
        StatusCode::NO_CONTENT
    );
    let everything = app.get("/api/listings?all=true", Some(&admin)).await;
    assert!(everything.body.as_array().unwrap().is_empty());
}
