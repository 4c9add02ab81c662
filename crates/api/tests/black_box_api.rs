use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use wrenchbook_auth::{JwtClaims, Role};
use wrenchbook_core::UserId;
use wrenchbook_infra::Services;
use wrenchbook_infra::services::ServiceSettings;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory store, bound to an ephemeral port.
        let services = Arc::new(Services::in_memory(ServiceSettings::default()));
        let app = wrenchbook_api::app::router(services, JWT_SECRET.to_string());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: UserId, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn admin_token() -> String {
    mint_jwt(UserId::new(), vec![Role::new("admin")])
}

fn id_of(body: &Value) -> String {
    body["id"].as_str().expect("response has an id").to_string()
}

/// Client + vehicle + one-hour catalog service, returning their ids.
async fn seed_basics(srv: &TestServer, token: &str) -> (String, String, String) {
    let (status, client) = srv
        .post(
            token,
            "/clients",
            json!({ "name": "Ana Souza", "tax_id": "123.456.789-09" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{client}");

    let (status, vehicle) = srv
        .post(
            token,
            "/vehicles",
            json!({
                "client_id": id_of(&client),
                "plate": "ABC1D23",
                "make": "Fiat",
                "model": "Uno",
                "mileage": 5000
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{vehicle}");

    let (status, service) = srv
        .post(
            token,
            "/services",
            json!({
                "code": "OIL",
                "name": "Oil change",
                "category": "maintenance",
                "price": 8000,
                "estimated_minutes": 60
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{service}");

    (id_of(&client), id_of(&vehicle), id_of(&service))
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .get(format!("{}/whoami", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn principal_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let user_id = UserId::new();
    let token = mint_jwt(user_id, vec![Role::new("attendant")]);

    let (status, body) = srv.get(&token, "/whoami").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"].as_str().unwrap(), user_id.to_string());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "attendant"));
}

#[tokio::test]
async fn mechanics_cannot_read_finance() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(UserId::new(), vec![Role::new("mechanic")]);

    let (status, body) = srv.get(&token, "/finance/entries").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = srv.get(&token, "/service-orders").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_fields_are_rejected() {
    let srv = TestServer::spawn().await;
    let token = admin_token();

    let (status, _) = srv
        .post(
            &token,
            "/clients",
            json!({ "name": "Ana", "tax_id": "123", "nickname": "an" }),
        )
        .await;
    assert!(status.is_client_error(), "got {status}");

    let (status, list) = srv.get(&token, "/clients").await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_path_ids_are_400() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get(&admin_token(), "/service-orders/not-an-id").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn overlapping_appointment_is_refused_with_conflicting_ids() {
    let srv = TestServer::spawn().await;
    let token = admin_token();
    let (client_id, vehicle_id, service_id) = seed_basics(&srv, &token).await;

    let booking = |starts_at: &str| {
        json!({
            "client_id": client_id,
            "vehicle_id": vehicle_id,
            "service_id": service_id,
            "starts_at": starts_at
        })
    };

    let (status, first) = srv
        .post(&token, "/appointments", booking("2030-03-12T10:00:00Z"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(first["description"], "Oil change");

    let (status, body) = srv
        .post(&token, "/appointments", booking("2030-03-12T10:15:00Z"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");
    assert!(
        body["conflicting"]
            .as_array()
            .unwrap()
            .iter()
            .any(|id| id.as_str() == first["id"].as_str())
    );

    let (status, availability) = srv
        .get(
            &token,
            &format!("/appointments/availability?date=2030-03-12&service={service_id}"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let slots = availability["slots"].as_array().unwrap();
    assert!(!slots.iter().any(|s| s.as_str().unwrap().contains("T10:00:00")));
}

#[tokio::test]
async fn order_to_invoice_flow_keeps_stock_and_totals_consistent() {
    let srv = TestServer::spawn().await;
    let token = admin_token();
    let (client_id, vehicle_id, service_id) = seed_basics(&srv, &token).await;

    let (status, product) = srv
        .post(
            &token,
            "/products",
            json!({
                "code": "FLT-1",
                "name": "Oil filter",
                "category": "filters",
                "cost_price": 1500,
                "sale_price": 2500,
                "min_stock": 2,
                "initial_stock": 10
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");
    assert_eq!(product["stock_quantity"], 10);
    let product_id = id_of(&product);

    let (status, order) = srv
        .post(
            &token,
            "/service-orders",
            json!({ "client_id": client_id, "vehicle_id": vehicle_id, "mileage": 5200 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "open");
    assert!(order["number"].as_str().unwrap().starts_with("000001/"));
    let order_id = id_of(&order);

    let (status, order) = srv
        .post(
            &token,
            &format!("/service-orders/{order_id}/services"),
            json!({ "service_id": service_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["totals"]["services"], 8000);

    let (status, order) = srv
        .post(
            &token,
            &format!("/service-orders/{order_id}/products"),
            json!({ "product_id": product_id, "quantity": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["totals"]["products"], 5000);
    assert_eq!(order["totals"]["grand_total"], 13000);

    let (_, product) = srv.get(&token, &format!("/products/{product_id}")).await;
    assert_eq!(product["stock_quantity"], 8);

    let (status, body) = srv
        .post(
            &token,
            &format!("/service-orders/{order_id}/products"),
            json!({ "product_id": product_id, "quantity": 100 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["available"], 8);

    let (_, movements) = srv
        .get(&token, &format!("/products/{product_id}/movements"))
        .await;
    assert_eq!(movements.as_array().unwrap().len(), 2);

    let (status, body) = srv
        .post(
            &token,
            "/invoices",
            json!({ "service_order_id": order_id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "open orders are not invoiceable: {body}");

    let (status, order) = srv
        .post(
            &token,
            &format!("/service-orders/{order_id}/status"),
            json!({ "status": "completed" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["status"], "completed");

    let (status, invoice) = srv
        .post(
            &token,
            "/invoices",
            json!({ "service_order_id": order_id, "notes": "thanks" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{invoice}");
    assert_eq!(invoice["number"], "000000001");
    assert_eq!(invoice["total"], 13000);

    let (_, order) = srv.get(&token, &format!("/service-orders/{order_id}")).await;
    assert_eq!(order["invoice_id"], invoice["id"]);

    let (status, body) = srv
        .post(
            &token,
            "/invoices",
            json!({ "service_order_id": order_id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, audit) = srv
        .get(&token, &format!("/audit?entity_id={order_id}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!audit.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn finance_summary_counts_paid_entries_only() {
    let srv = TestServer::spawn().await;
    let token = admin_token();

    let (status, paid) = srv
        .post(
            &token,
            "/finance/entries",
            json!({
                "kind": "revenue",
                "category": "services",
                "description": "Walk-in repair",
                "amount": 20000,
                "due_date": "2030-01-10"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{paid}");

    let (status, body) = srv
        .post(
            &token,
            &format!("/finance/entries/{}/payment", id_of(&paid)),
            json!({ "paid_on": "2030-01-10" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, pending) = srv
        .post(
            &token,
            "/finance/entries",
            json!({
                "kind": "expense",
                "category": "rent",
                "description": "Workshop rent",
                "amount": 50000,
                "due_date": "2030-01-15"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{pending}");

    let (status, summary) = srv
        .get(&token, "/finance/summary?from=2030-01-01&to=2030-01-31")
        .await;
    assert_eq!(status, StatusCode::OK, "{summary}");
    assert_eq!(summary["revenue"], 20000);
    assert_eq!(summary["expenses"], 0);
    assert_eq!(summary["balance"], 20000);

    let (status, _) = srv
        .get(&token, "/finance/summary?from=2030-02-01&to=2030-01-01")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn suppliers_link_products_and_expenses() {
    let srv = TestServer::spawn().await;
    let token = admin_token();

    let (status, supplier) = srv
        .post(
            &token,
            "/suppliers",
            json!({
                "legal_name": "Filtros Sul Ltda",
                "trade_name": "Filtros Sul",
                "tax_id": "11.222.333/0001-44"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{supplier}");
    assert_eq!(supplier["tax_id"], "11222333000144");
    let supplier_id = id_of(&supplier);

    let (status, body) = srv
        .post(
            &token,
            "/products",
            json!({
                "code": "FLT-9",
                "name": "Air filter",
                "category": "filters",
                "cost_price": 900,
                "sale_price": 1900,
                "supplier_id": UserId::new().to_string()
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (status, product) = srv
        .post(
            &token,
            "/products",
            json!({
                "code": "FLT-9",
                "name": "Air filter",
                "category": "filters",
                "cost_price": 900,
                "sale_price": 1900,
                "supplier_id": supplier_id
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");

    let (status, supplied) = srv
        .get(&token, &format!("/suppliers/{supplier_id}/products"))
        .await;
    assert_eq!(status, StatusCode::OK, "{supplied}");
    assert_eq!(supplied[0]["id"], product["id"]);

    let (status, entry) = srv
        .post(
            &token,
            "/finance/entries",
            json!({
                "kind": "expense",
                "category": "parts",
                "description": "Filter restock",
                "amount": 9000,
                "due_date": "2030-01-15",
                "counterparty_id": supplier_id
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{entry}");

    // a supplier cannot owe the shop revenue
    let (status, body) = srv
        .post(
            &token,
            "/finance/entries",
            json!({
                "kind": "revenue",
                "category": "parts",
                "description": "Refund",
                "amount": 9000,
                "due_date": "2030-01-15",
                "counterparty_id": supplier_id
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
}

#[tokio::test]
async fn statistics_need_the_system_permission() {
    let srv = TestServer::spawn().await;
    let token = admin_token();
    seed_basics(&srv, &token).await;

    let (status, stats) = srv.get(&token, "/system/statistics").await;
    assert_eq!(status, StatusCode::OK, "{stats}");
    assert_eq!(stats["active_clients"], 1);
    assert_eq!(stats["vehicles"], 1);
    assert_eq!(stats["month_revenue"], 0);

    let attendant = mint_jwt(UserId::new(), vec![Role::new("attendant")]);
    let (status, _) = srv.get(&attendant, "/system/statistics").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
