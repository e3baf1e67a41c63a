use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use cesta_hub::workflows::distribution::{
    load_example_data, DistributionService, DistributionState, InMemoryDeliveryRepository,
    InMemoryFamilyRepository, InMemoryInstitutionRepository, InMemoryUserRepository,
    SessionManager,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let families = Arc::new(InMemoryFamilyRepository::default());
    let institutions = Arc::new(InMemoryInstitutionRepository::default());
    let deliveries = Arc::new(InMemoryDeliveryRepository::default());
    let users = Arc::new(InMemoryUserRepository::default());
    load_example_data(&families, &institutions, &deliveries, &users);

    let service = DistributionService::new(families, institutions, deliveries);
    let sessions = SessionManager::new(users);

    cesta_hub::workflows::distribution::distribution_router(Arc::new(DistributionState {
        service,
        sessions,
    }))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is json")
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/v1/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": email, "password": password }).to_string(),
                ))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    body["token"].as_str().expect("token present").to_string()
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = app();
    let response = app
        .oneshot(
            Request::post("/api/v1/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "admin@prefeitura.gov.br", "password": "wrong" }).to_string(),
                ))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn families_listing_requires_a_session() {
    let app = app();
    let response = app
        .oneshot(
            Request::get("/api/v1/families")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn families_listing_applies_filters() {
    let app = app();
    let token = login(&app, "operador1@prefeitura.gov.br", "cesta123").await;

    let response = app
        .oneshot(
            Request::get("/api/v1/families?status=blocked")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let families = body.as_array().expect("array body");
    assert_eq!(families.len(), 1);
    assert_eq!(families[0]["name"], "Família Ferreira");
}

#[tokio::test]
async fn delivery_flow_records_then_rejects_the_blocked_family() {
    let app = app();
    let token = login(&app, "operador1@prefeitura.gov.br", "cesta123").await;

    let listing = app
        .clone()
        .oneshot(
            Request::get("/api/v1/families?status=active&search=Santos")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    let families = body_json(listing).await;
    let family_id = families[0]["id"].as_str().expect("family id").to_string();

    let payload = json!({
        "family_id": family_id,
        "basket_count": 1,
        "other_items": "Leite (2L)",
        "block_period": 30
    });

    let created = app
        .clone()
        .oneshot(
            Request::post("/api/v1/deliveries")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(payload.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(created.status(), StatusCode::CREATED);
    let delivery = body_json(created).await;
    assert_eq!(delivery["items"]["baskets"], 1);

    let retry = app
        .oneshot(
            Request::post("/api/v1/deliveries")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(payload.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(retry.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(retry).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("blocked"));
}

#[tokio::test]
async fn family_registration_creates_then_conflicts_on_duplicate() {
    let app = app();
    let token = login(&app, "operador1@prefeitura.gov.br", "cesta123").await;

    let payload = json!({
        "name": "Família Pereira",
        "address": "Rua Nova, 10 - Centro",
        "phone": "(11) 98888-0001",
        "members": 3,
        "income": 90000
    });

    let created = app
        .clone()
        .oneshot(
            Request::post("/api/v1/families")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(payload.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(created.status(), StatusCode::CREATED);
    let family = body_json(created).await;
    assert_eq!(family["status"], "active");
    assert_eq!(family["blocked_until"], Value::Null);

    let duplicate = app
        .oneshot(
            Request::post("/api/v1/families")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(payload.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn institution_creation_and_edit_are_admin_only() {
    let app = app();
    let operator = login(&app, "operador1@prefeitura.gov.br", "cesta123").await;
    let admin = login(&app, "admin@prefeitura.gov.br", "admin123").await;

    let payload = json!({
        "name": "Lar das Flores",
        "address": "Rua das Acácias, 9",
        "phone": "(11) 97777-0001",
        "baskets": 20
    });

    let denied = app
        .clone()
        .oneshot(
            Request::post("/api/v1/institutions")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {operator}"))
                .body(Body::from(payload.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let created = app
        .clone()
        .oneshot(
            Request::post("/api/v1/institutions")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                .body(Body::from(payload.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(created.status(), StatusCode::CREATED);
    let institution = body_json(created).await;
    let institution_id = institution["id"].as_str().expect("institution id");

    let edited = app
        .oneshot(
            Request::put(format!("/api/v1/institutions/{institution_id}"))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                .body(Body::from(
                    json!({
                        "name": "Lar das Flores e Frutos",
                        "address": "Rua das Acácias, 9",
                        "phone": "(11) 97777-0002"
                    })
                    .to_string(),
                ))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(edited.status(), StatusCode::OK);
    let body = body_json(edited).await;
    assert_eq!(body["name"], "Lar das Flores e Frutos");
    assert_eq!(body["inventory"]["baskets"], 20);
}

#[tokio::test]
async fn institution_listing_is_scoped_by_role() {
    let app = app();
    let operator = login(&app, "operador1@prefeitura.gov.br", "cesta123").await;
    let admin = login(&app, "admin@prefeitura.gov.br", "admin123").await;

    let all = app
        .clone()
        .oneshot(
            Request::get("/api/v1/institutions")
                .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(all.status(), StatusCode::OK);
    let body = body_json(all).await;
    assert_eq!(body.as_array().expect("array body").len(), 3);

    let own = app
        .oneshot(
            Request::get("/api/v1/institutions")
                .header(header::AUTHORIZATION, format!("Bearer {operator}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    let body = body_json(own).await;
    let institutions = body.as_array().expect("array body");
    assert_eq!(institutions.len(), 1);
    assert_eq!(institutions[0]["name"], "Centro Social Esperança");
}

#[tokio::test]
async fn unblock_is_admin_only() {
    let app = app();
    let operator = login(&app, "operador1@prefeitura.gov.br", "cesta123").await;
    let admin = login(&app, "admin@prefeitura.gov.br", "admin123").await;

    let listing = app
        .clone()
        .oneshot(
            Request::get("/api/v1/families?status=blocked")
                .header(header::AUTHORIZATION, format!("Bearer {operator}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    let families = body_json(listing).await;
    let family_id = families[0]["id"].as_str().expect("family id").to_string();

    let denied = app
        .clone()
        .oneshot(
            Request::post(format!("/api/v1/families/{family_id}/unblock"))
                .header(header::AUTHORIZATION, format!("Bearer {operator}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let allowed = app
        .oneshot(
            Request::post(format!("/api/v1/families/{family_id}/unblock"))
                .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(allowed.status(), StatusCode::OK);
    let family = body_json(allowed).await;
    assert_eq!(family["status"], "active");
    assert_eq!(family["blocked_until"], Value::Null);
}

#[tokio::test]
async fn dashboard_reflects_the_session_scope() {
    let app = app();
    let admin = login(&app, "admin@prefeitura.gov.br", "admin123").await;

    let response = app
        .oneshot(
            Request::get("/api/v1/dashboard")
                .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["institutions"], 3);
    assert_eq!(body["blocked_families"], 1);
    assert_eq!(body["deliveries"], 1);
}

#[tokio::test]
async fn csv_report_is_served_with_attachment_headers() {
    let app = app();
    let admin = login(&app, "admin@prefeitura.gov.br", "admin123").await;

    let response = app
        .oneshot(
            Request::get("/api/v1/reports/families.csv")
                .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/csv; charset=utf-8")
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let text = String::from_utf8(bytes.to_vec()).expect("utf-8 body");
    assert!(text.starts_with("ID,Nome,"));
}

#[tokio::test]
async fn inventory_restock_round_trips() {
    let app = app();
    let operator = login(&app, "operador1@prefeitura.gov.br", "cesta123").await;

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/v1/inventory")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {operator}"))
                .body(Body::from(
                    json!({ "item": "Arroz", "quantity": 10 }).to_string(),
                ))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let rejected = app
        .oneshot(
            Request::post("/api/v1/inventory")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {operator}"))
                .body(Body::from(
                    json!({ "item": "Arroz", "quantity": 0 }).to_string(),
                ))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
