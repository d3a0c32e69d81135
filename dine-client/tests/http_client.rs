// dine-client/tests/http_client.rs
// HTTP 客户端对接本地 axum 模拟后端

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use dine_client::{ClientConfig, ClientError, NetworkHttpClient, OrderApi};
use serde_json::{Value, json};
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{
    CreateOrderRequest, OrderItemInput, OrderQuery, OrderStatus, OrderType, PaymentStatus,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const TOKEN: &str = "tok-123";

/// One request as the mock saw it
#[derive(Debug, Clone)]
struct Seen {
    route: String,
    query: HashMap<String, String>,
    body: Option<Value>,
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Seen>>>);

impl Recorder {
    fn push(&self, route: impl Into<String>, query: HashMap<String, String>, body: Option<Value>) {
        self.0.lock().unwrap().push(Seen {
            route: route.into(),
            query,
            body,
        });
    }

    fn last(&self) -> Seen {
        self.0.lock().unwrap().last().cloned().expect("no request recorded")
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(&format!("Bearer {}", TOKEN)[..])
}

/// Error body the way the backend writes it
fn app_error(err: AppError) -> Response {
    (err.http_status(), Json(ApiResponse::error(&err))).into_response()
}

fn patched(id: &str) -> Response {
    Json(ApiResponse::success(json!({ "id": id }))).into_response()
}

fn order_json(id: &str) -> Value {
    json!({
        "_id": id,
        "tableId": 7,
        "orderType": "regular",
        "status": "preparing",
        "paymentStatus": "Pending",
        "createdAt": "2026-10-19T19:00:00Z",
        "items": [{
            "itemId": 3,
            "name": "Paneer Tikka",
            "quantity": 2,
            "price": 250,
            "spiceLevel": "medium",
            "customizations": [{"id": 1, "name": "Extra Cheese", "priceModifier": 20}]
        }]
    })
}

async fn list_orders(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    rec.push("GET orders", query, None);
    Json(json!([order_json("o-1")])).into_response()
}

async fn create_order(State(rec): State<Recorder>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    rec.push("POST orders", HashMap::new(), Some(body));
    Json(json!({"success": true, "data": order_json("o-9")})).into_response()
}

async fn cancel_order(State(rec): State<Recorder>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    rec.push(format!("PATCH orders/{}/cancel", id), HashMap::new(), None);
    match id.as_str() {
        "missing" => app_error(AppError::with_message(
            ErrorCode::OrderNotFound,
            "Order missing not found",
        )),
        "ghost" => app_error(AppError::not_found("Order ghost")),
        "boom" => app_error(AppError::internal("database offline")),
        "flaky" => (StatusCode::SERVICE_UNAVAILABLE, "upstream down").into_response(),
        _ => patched(&id),
    }
}

async fn update_status(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    rec.push(format!("PATCH orders/{}/status", id), HashMap::new(), Some(body));
    if id == "locked" {
        return app_error(AppError::validation("order locked is already served"));
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn update_payment(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    rec.push(format!("PATCH orders/{}/payment", id), HashMap::new(), Some(body));
    if id == "settled" {
        return app_error(AppError::new(ErrorCode::PaymentAlreadyApproved));
    }
    patched(&id)
}

async fn kitchen_active(State(rec): State<Recorder>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    rec.push("GET orders/kitchen/active", HashMap::new(), None);
    Json(json!({"success": true, "data": [order_json("o-1"), order_json("o-2")]})).into_response()
}

async fn list_tables(State(rec): State<Recorder>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    rec.push("GET tables", HashMap::new(), None);
    Json(json!([
        {"id": 1, "number": 12, "capacity": 4, "isOccupied": true},
        {"_id": "t-2", "name": "Patio 2"}
    ]))
    .into_response()
}

/// Start the mock backend; returns a base URL with a trailing slash
async fn serve() -> (String, Recorder) {
    let recorder = Recorder::default();
    let app = Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/kitchen/active", get(kitchen_active))
        .route("/api/orders/{id}/cancel", patch(cancel_order))
        .route("/api/orders/{id}/status", patch(update_status))
        .route("/api/orders/{id}/payment", patch(update_payment))
        .route("/api/tables", get(list_tables))
        .with_state(recorder.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/api/", addr), recorder)
}

async fn client() -> (NetworkHttpClient, Recorder) {
    let (base_url, recorder) = serve().await;
    let client = ClientConfig::new(base_url)
        .with_token(TOKEN)
        .with_timeout(5)
        .build_http_client()
        .unwrap();
    (client, recorder)
}

#[tokio::test]
async fn test_list_orders_sends_filters() -> anyhow::Result<()> {
    let (client, recorder) = client().await;

    let query = OrderQuery::for_table("7").with_statuses(&[OrderStatus::Pending, OrderStatus::Preparing]);
    let orders = client.list_orders(&query).await?;

    let seen = recorder.last();
    assert_eq!(seen.route, "GET orders");
    assert_eq!(seen.query.get("status").map(String::as_str), Some("pending,preparing"));
    assert_eq!(seen.query.get("tableId").map(String::as_str), Some("7"));

    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.id, "o-1");
    assert_eq!(order.table_id, "7");
    assert_eq!(order.status, OrderStatus::Preparing);
    assert_eq!(order.items[0].menu_item_id, "3");
    assert_eq!(order.items[0].unit_price, 250.0);
    assert_eq!(order.items[0].customizations[0].id, "1");
    Ok(())
}

#[tokio::test]
async fn test_create_order_unwraps_envelope() -> anyhow::Result<()> {
    let (client, recorder) = client().await;

    let request = CreateOrderRequest {
        table_id: "7".into(),
        items: vec![OrderItemInput {
            item_id: "3".into(),
            quantity: 1,
            spice_level: Some("medium".into()),
            customizations: Some(vec!["1".into()]),
            special_instructions: None,
        }],
        customer_name: "Guest".into(),
        customer_phone: "555-0100".into(),
        restaurant_id: "r-1".into(),
        order_type: OrderType::Addon,
    };
    let created = client.create_order(&request).await?;
    assert_eq!(created.id, "o-9");

    let body = recorder.last().body.unwrap();
    assert_eq!(body["orderType"], "addon");
    assert_eq!(body["tableId"], "7");
    assert_eq!(body["restaurantId"], "r-1");
    assert_eq!(body["items"][0]["itemId"], "3");
    assert_eq!(body["items"][0]["customizations"][0], "1");
    Ok(())
}

#[tokio::test]
async fn test_patch_requests() -> anyhow::Result<()> {
    let (client, recorder) = client().await;

    client.cancel_order("o-1").await?;
    let seen = recorder.last();
    assert_eq!(seen.route, "PATCH orders/o-1/cancel");
    assert!(seen.body.is_none());

    client.update_status("o-1", OrderStatus::Ready).await?;
    let seen = recorder.last();
    assert_eq!(seen.route, "PATCH orders/o-1/status");
    assert_eq!(seen.body, Some(json!({"status": "ready"})));

    client.update_payment("o-1", PaymentStatus::Requested).await?;
    let seen = recorder.last();
    assert_eq!(seen.route, "PATCH orders/o-1/payment");
    assert_eq!(seen.body, Some(json!({"paymentStatus": "Requested"})));
    Ok(())
}

#[tokio::test]
async fn test_kitchen_and_tables() -> anyhow::Result<()> {
    let (client, _) = client().await;

    let active = client.kitchen_active().await?;
    assert_eq!(active.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(), ["o-1", "o-2"]);

    let tables = client.list_tables().await?;
    assert_eq!(tables[0].id, "1");
    assert_eq!(tables[0].name, "12");
    assert!(tables[0].is_occupied);
    assert_eq!(tables[1].name, "Patio 2");
    assert!(!tables[1].is_occupied);
    Ok(())
}

#[tokio::test]
async fn test_error_body_maps_to_code() {
    let (client, _) = client().await;

    match client.cancel_order("missing").await {
        Err(ClientError::Api { code, message }) => {
            assert_eq!(code, ErrorCode::OrderNotFound);
            assert_eq!(message, "Order missing not found");
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let err = client.cancel_order("flaky").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NetworkError);
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_backend_error_bodies_keep_code_and_message() {
    let (client, _) = client().await;

    let api_error = |result: Result<(), ClientError>| match result {
        Err(ClientError::Api { code, message }) => (code, message),
        other => panic!("unexpected result: {:?}", other),
    };

    let (code, message) = api_error(client.cancel_order("ghost").await);
    assert_eq!(code, ErrorCode::NotFound);
    assert_eq!(message, "Order ghost not found");

    let (code, message) = api_error(client.cancel_order("boom").await);
    assert_eq!(code, ErrorCode::InternalError);
    assert_eq!(message, "database offline");

    let (code, _) = api_error(client.update_status("locked", OrderStatus::Preparing).await);
    assert_eq!(code, ErrorCode::ValidationFailed);

    let (code, message) = api_error(client.update_payment("settled", PaymentStatus::Approved).await);
    assert_eq!(code, ErrorCode::PaymentAlreadyApproved);
    assert_eq!(message, "Payment already approved");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (base_url, recorder) = serve().await;
    let client = NetworkHttpClient::new(&ClientConfig::new(base_url)).unwrap();
    assert!(client.token().is_none());

    let err = client.list_orders(&OrderQuery::all()).await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
    assert!(recorder.0.lock().unwrap().is_empty());

    let client = client.with_token(TOKEN);
    assert!(client.list_orders(&OrderQuery::all()).await.is_ok());
}

#[tokio::test]
async fn test_unreachable_backend_is_transient() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ClientConfig::new(format!("http://{}", addr))
        .with_timeout(2)
        .build_http_client()
        .unwrap();
    let err = client.list_tables().await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)));
    assert!(err.is_transient());
}
