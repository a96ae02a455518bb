//! HTTP API tests
//!
//! Drive the full router (auth middleware, permission layers, handlers,
//! ledger) with `oneshot` requests against an on-disk ledger in a tempdir.

use std::path::Path;

use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use hub_server::auth::permissions::get_default_permissions;
use hub_server::auth::{JwtConfig, hash_otp};
use hub_server::services::build_router;
use hub_server::{Config, ServerState};
use shared::models::StaffRole;

const OTP: &str = "4821";
const TELLER_PHONE: &str = "600111001";
const BARMAN_PHONE: &str = "600111002";
const ADMIN_PHONE: &str = "600111003";
const CLIENT_PHONE: &str = "841234567";

struct TestApp {
    router: Router,
    state: ServerState,
    _dir: TempDir,
}

fn write_roster(path: &Path) {
    let hash = hash_otp(OTP).unwrap();
    let roster = json!([
        { "id": 1, "phone": TELLER_PHONE, "name": "Marta", "role": "teller", "otp_hash": hash },
        { "id": 2, "phone": BARMAN_PHONE, "name": "Luis", "role": "barman", "otp_hash": hash },
        { "id": 3, "phone": ADMIN_PHONE, "name": "Ana", "role": "admin", "otp_hash": hash },
        { "id": 4, "phone": "600111004", "name": "Old", "role": "waiter", "otp_hash": hash, "is_active": false },
    ]);
    std::fs::write(path, roster.to_string()).unwrap();
}

fn test_config(dir: &Path) -> Config {
    let roster_path = dir.join("staff.json");
    write_roster(&roster_path);
    Config {
        work_dir: dir.display().to_string(),
        http_port: 9625,
        jwt: JwtConfig::ephemeral().unwrap(),
        environment: "test".to_string(),
        log_level: "warn".to_string(),
        log_json: false,
        public_base_url: "http://hub.test".to_string(),
        voucher_face_value: 500.0,
        max_voucher_face_value: 10_000.0,
        confirmation_timeout_secs: 5,
        pending_order_max_age_secs: 600,
        sweep_interval_secs: 30,
        staff_roster_path: Some(roster_path.display().to_string()),
        request_timeout_ms: 30_000,
        shutdown_timeout_ms: 1_000,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    configure(&mut config);
    let state = ServerState::initialize(&config).await.unwrap();
    TestApp {
        router: build_router(state.clone()),
        state,
        _dir: dir,
    }
}

impl TestApp {
    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn login(&self, phone: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "phone": phone, "otp": OTP })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Token signed by the server key, skipping the login delay
    fn session(&self, staff_id: i64, role: StaffRole) -> String {
        self.state
            .jwt_service()
            .generate_token(
                &staff_id.to_string(),
                role.as_str(),
                role.as_str(),
                &get_default_permissions(role),
            )
            .unwrap()
    }

    /// Admin creates a menu item, returns its id
    async fn menu_item(&self, admin: &str, name: &str, price: f64, stock: i32) -> i64 {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/menu",
                Some(admin),
                Some(json!({
                    "name": name,
                    "price": price,
                    "category": "cocktails",
                    "stock_quantity": stock,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"].as_i64().unwrap()
    }

    /// Teller issues a voucher and the client redeems it, returns the wallet id
    async fn funded_wallet(&self, teller: &str, phone: &str) -> i64 {
        let (status, voucher) = self
            .request(Method::POST, "/api/vouchers", Some(teller), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::OK, "{voucher}");
        let code = voucher["code"].as_str().unwrap();

        let (status, wallet) = self
            .request(
                Method::POST,
                &format!("/api/vouchers/{}/redeem", code),
                None,
                Some(json!({ "phone": phone })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{wallet}");
        wallet["id"].as_i64().unwrap()
    }

    async fn place_order(&self, barman: &str, wallet_id: i64, item_id: i64, qty: i32) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/orders",
                Some(barman),
                Some(json!({
                    "wallet_id": wallet_id,
                    "items": [{ "menu_item_id": item_id, "quantity": qty }],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = spawn_app().await;

    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.request(Method::GET, "/health/detailed", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["storage"]["status"], "ok");
    assert_eq!(body["storage"]["vouchers"], 0);
}

#[tokio::test]
async fn test_login_and_me() {
    let app = spawn_app().await;
    let token = app.login(BARMAN_PHONE).await;

    let (status, body) = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 2);
    assert_eq!(body["role"], "barman");
    assert_eq!(body["permissions"], json!(["orders:create", "orders:withdraw"]));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = spawn_app().await;

    let attempts = [
        json!({ "phone": BARMAN_PHONE, "otp": "0000" }),
        json!({ "phone": "600999999", "otp": OTP }),
        json!({ "phone": "600111004", "otp": OTP }),
    ];
    let mut codes = Vec::new();
    for attempt in attempts {
        let (status, body) = app
            .request(Method::POST, "/api/auth/login", None, Some(attempt))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        codes.push(body["code"].clone());
    }
    assert!(codes.iter().all(|c| *c == json!(1002)));
}

#[tokio::test]
async fn test_staff_routes_require_auth_and_permission() {
    let app = spawn_app().await;

    let (status, _) = app
        .request(Method::POST, "/api/vouchers", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/api/reports/dashboard", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // barman cannot issue vouchers or read reports
    let barman = app.login(BARMAN_PHONE).await;
    let (status, body) = app
        .request(Method::POST, "/api/vouchers", Some(&barman), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2001);

    let (status, _) = app
        .request(Method::GET, "/api/reports/dashboard", Some(&barman), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // teller cannot take orders
    let teller = app.login(TELLER_PHONE).await;
    let (status, _) = app
        .request(
            Method::POST,
            "/api/orders",
            Some(&teller),
            Some(json!({ "wallet_id": 1, "items": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_voucher_redeem_and_wallet_view() {
    let app = spawn_app().await;
    let teller = app.login(TELLER_PHONE).await;

    let (status, voucher) = app
        .request(
            Method::POST,
            "/api/vouchers",
            Some(&teller),
            Some(json!({ "face_value": 250 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(voucher["face_value"], 250.0);
    assert_eq!(voucher["status"], "active");
    let code = voucher["code"].as_str().unwrap().to_string();

    let (status, preview) = app
        .request(Method::GET, &format!("/api/vouchers/{}", code), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["face_value"], 250.0);
    assert_eq!(preview["status"], "active");
    assert!(preview.get("code").is_none());

    let redeem = json!({ "phone": "+84 1234 567" });
    let uri = format!("/api/vouchers/{}/redeem", code);
    let (status, wallet) = app
        .request(Method::POST, &uri, None, Some(redeem.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wallet["balance"], 250.0);
    assert_eq!(wallet["client_phone"], CLIENT_PHONE);

    let (status, body) = app.request(Method::POST, &uri, None, Some(redeem)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 3002);

    let (status, view) = app
        .request(
            Method::GET,
            &format!("/api/wallets/by-phone/{}", CLIENT_PHONE),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["wallet"]["balance"], 250.0);
    assert_eq!(view["recent_transactions"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .request(Method::GET, "/api/vouchers/SPOT-0000-0000-0000", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_menu_public_and_admin_views() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_PHONE).await;

    let mojito = app.menu_item(&admin, "Mojito", 100.0, 10).await;
    app.menu_item(&admin, "Caipirinha", 90.0, 10).await;

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/menu/{}", mojito),
            Some(&admin),
            Some(json!({ "is_available": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, public) = app.request(Method::GET, "/api/menu", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = public
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Caipirinha"]);

    let (status, all) = app.request(Method::GET, "/api/menu/all", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, _) = app.request(Method::GET, "/api/menu/all", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_order_confirmation_settles_wallet() {
    let app = spawn_app().await;
    let teller = app.login(TELLER_PHONE).await;
    let barman = app.login(BARMAN_PHONE).await;
    let admin = app.login(ADMIN_PHONE).await;

    let item = app.menu_item(&admin, "X", 100.0, 10).await;
    let wallet_id = app.funded_wallet(&teller, CLIENT_PHONE).await;

    let pending = app.place_order(&barman, wallet_id, item, 2).await;
    let order_id = pending["order"]["id"].as_i64().unwrap();
    let token = pending["confirmation_token"].as_str().unwrap().to_string();
    assert_eq!(pending["order"]["total_amount"], 200.0);
    assert_eq!(pending["order"]["status"], "pending_confirmation");
    assert!(
        pending["confirmation_url"]
            .as_str()
            .unwrap()
            .starts_with(&format!("http://hub.test/confirm-order?id={}", order_id))
    );

    // client view needs the token
    let (status, _) = app
        .request(Method::GET, &format!("/api/public/orders/{}?token=wrong", order_id), None, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, view) = app
        .request(
            Method::GET,
            &format!("/api/public/orders/{}?token={}", order_id, token),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["wallet_balance"], 500.0);
    assert_eq!(view["items"][0]["quantity"], 2);

    let confirm_uri = format!("/api/public/orders/{}/confirm", order_id);
    let (status, order) = app
        .request(Method::POST, &confirm_uri, None, Some(json!({ "token": token })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "confirmed");
    assert_eq!(order["client_confirmed"], true);

    // second confirm loses
    let (status, body) = app
        .request(Method::POST, &confirm_uri, None, Some(json!({ "token": token })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4002);

    let (_, view) = app
        .request(
            Method::GET,
            &format!("/api/wallets/by-phone/{}", CLIENT_PHONE),
            None,
            None,
        )
        .await;
    assert_eq!(view["wallet"]["balance"], 300.0);
    let amounts: Vec<f64> = view["recent_transactions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["amount"].as_f64().unwrap())
        .collect();
    assert_eq!(amounts, vec![-200.0, 500.0]);

    let (_, all) = app.request(Method::GET, "/api/menu/all", Some(&admin), None).await;
    assert_eq!(all[0]["stock_quantity"], 8);

    let (status, dashboard) = app
        .request(Method::GET, "/api/reports/dashboard", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["total_revenue"], 200.0);
    assert_eq!(dashboard["total_orders"], 1);

    let (status, report) = app
        .request(Method::GET, "/api/reports/reconciliation", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["wallets_checked"], 1);
    assert!(report["inconsistent"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_confirm_with_insufficient_balance_is_rejected() {
    let app = spawn_app().await;
    let teller = app.login(TELLER_PHONE).await;
    let barman = app.login(BARMAN_PHONE).await;
    let admin = app.login(ADMIN_PHONE).await;

    let item = app.menu_item(&admin, "Magnum", 300.0, 10).await;
    let wallet_id = app.funded_wallet(&teller, CLIENT_PHONE).await;

    let first = app.place_order(&barman, wallet_id, item, 1).await;
    let second = app.place_order(&barman, wallet_id, item, 1).await;

    for (pending, expected) in [(&first, StatusCode::OK), (&second, StatusCode::PAYMENT_REQUIRED)] {
        let order_id = pending["order"]["id"].as_i64().unwrap();
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/api/public/orders/{}/confirm", order_id),
                None,
                Some(json!({ "token": pending["confirmation_token"] })),
            )
            .await;
        assert_eq!(status, expected);
    }

    let (_, view) = app
        .request(
            Method::GET,
            &format!("/api/wallets/by-phone/{}", CLIENT_PHONE),
            None,
            None,
        )
        .await;
    assert_eq!(view["wallet"]["balance"], 200.0);
}

#[tokio::test]
async fn test_client_cancel_and_staff_withdraw() {
    let app = spawn_app().await;
    let teller = app.login(TELLER_PHONE).await;
    let barman = app.login(BARMAN_PHONE).await;
    let admin = app.login(ADMIN_PHONE).await;

    let item = app.menu_item(&admin, "X", 100.0, 10).await;
    let wallet_id = app.funded_wallet(&teller, CLIENT_PHONE).await;

    let rejected = app.place_order(&barman, wallet_id, item, 1).await;
    let order_id = rejected["order"]["id"].as_i64().unwrap();
    let (status, order) = app
        .request(
            Method::POST,
            &format!("/api/public/orders/{}/cancel", order_id),
            None,
            Some(json!({ "token": rejected["confirmation_token"], "reason": "wrong drink" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "cancelled");
    assert_eq!(order["cancelled_by"], "client");

    let withdrawn = app.place_order(&barman, wallet_id, item, 1).await;
    let order_id = withdrawn["order"]["id"].as_i64().unwrap();
    let uri = format!("/api/orders/{}/withdraw", order_id);
    let (status, order) = app
        .request(Method::POST, &uri, Some(&barman), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["cancelled_by"], "staff");

    // withdraw is idempotent
    let (status, _) = app
        .request(Method::POST, &uri, Some(&barman), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/public/orders/{}/confirm", order_id),
            None,
            Some(json!({ "token": withdrawn["confirmation_token"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, view) = app
        .request(
            Method::GET,
            &format!("/api/wallets/by-phone/{}", CLIENT_PHONE),
            None,
            None,
        )
        .await;
    assert_eq!(view["wallet"]["balance"], 500.0);
}

#[tokio::test]
async fn test_await_returns_when_client_confirms() {
    let app = spawn_app().await;
    let teller = app.login(TELLER_PHONE).await;
    let barman = app.login(BARMAN_PHONE).await;
    let admin = app.login(ADMIN_PHONE).await;

    let item = app.menu_item(&admin, "X", 100.0, 10).await;
    let wallet_id = app.funded_wallet(&teller, CLIENT_PHONE).await;
    let pending = app.place_order(&barman, wallet_id, item, 1).await;
    let order_id = pending["order"]["id"].as_i64().unwrap();

    let router = app.router.clone();
    let await_request = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/orders/{}/await?timeout_secs=5", order_id))
        .header(http::header::AUTHORIZATION, format!("Bearer {}", barman))
        .body(Body::empty())
        .unwrap();
    let waiter = tokio::spawn(async move { router.oneshot(await_request).await.unwrap() });

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/public/orders/{}/confirm", order_id),
            None,
            Some(json!({ "token": pending["confirmation_token"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let response = waiter.await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let outcome: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(outcome["outcome"], "confirmed");
    assert_eq!(outcome["order"]["id"], order_id);
}

#[tokio::test]
async fn test_await_timeout_withdraws_order() {
    let app = spawn_app().await;
    let teller = app.login(TELLER_PHONE).await;
    let barman = app.login(BARMAN_PHONE).await;
    let admin = app.login(ADMIN_PHONE).await;

    let item = app.menu_item(&admin, "X", 100.0, 10).await;
    let wallet_id = app.funded_wallet(&teller, CLIENT_PHONE).await;
    let pending = app.place_order(&barman, wallet_id, item, 1).await;
    let order_id = pending["order"]["id"].as_i64().unwrap();

    let (status, outcome) = app
        .request(
            Method::GET,
            &format!("/api/orders/{}/await?timeout_secs=1", order_id),
            Some(&barman),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "timed_out");
    assert_eq!(outcome["order"]["status"], "cancelled");

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/public/orders/{}/confirm", order_id),
            None,
            Some(json!({ "token": pending["confirmation_token"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_voucher_preview_needs_the_code() {
    let app = spawn_app().await;
    let teller = app.login(TELLER_PHONE).await;

    let (_, voucher) = app
        .request(Method::POST, "/api/vouchers", Some(&teller), Some(json!({})))
        .await;
    let id = voucher["id"].as_i64().unwrap();
    let code = voucher["code"].as_str().unwrap().to_string();

    let (status, body) = app
        .request(Method::GET, &format!("/api/vouchers/{}", id), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.get("data").is_none());

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/vouchers/{}/redeem", code),
            None,
            Some(json!({ "phone": CLIENT_PHONE })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, preview) = app
        .request(Method::GET, &format!("/api/vouchers/{}", code), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["status"], "used");
    assert!(preview.get("code").is_none());
    assert!(preview.get("redeemed_by").is_none());
}

#[tokio::test]
async fn test_voided_voucher_cannot_be_redeemed() {
    let app = spawn_app().await;
    let teller = app.login(TELLER_PHONE).await;

    let (_, voucher) = app
        .request(Method::POST, "/api/vouchers", Some(&teller), Some(json!({})))
        .await;
    let code = voucher["code"].as_str().unwrap().to_string();
    let void_uri = format!("/api/vouchers/{}/void", code);

    let (status, _) = app
        .request(Method::POST, &void_uri, None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let barman = app.login(BARMAN_PHONE).await;
    let (status, _) = app
        .request(Method::POST, &void_uri, Some(&barman), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, voided) = app
        .request(
            Method::POST,
            &void_uri,
            Some(&teller),
            Some(json!({ "reason": "misprinted" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(voided["status"], "voided");

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/vouchers/{}/redeem", code),
            None,
            Some(json!({ "phone": CLIENT_PHONE })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 3002);
}

#[tokio::test]
async fn test_terminal_disconnect_withdraws_order() {
    let app = spawn_app().await;
    let teller = app.login(TELLER_PHONE).await;
    let barman = app.login(BARMAN_PHONE).await;
    let admin = app.login(ADMIN_PHONE).await;

    let item = app.menu_item(&admin, "X", 100.0, 10).await;
    let wallet_id = app.funded_wallet(&teller, CLIENT_PHONE).await;
    let pending = app.place_order(&barman, wallet_id, item, 1).await;
    let order_id = pending["order"]["id"].as_i64().unwrap();

    let router = app.router.clone();
    let await_request = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/orders/{}/await?timeout_secs=5", order_id))
        .header(http::header::AUTHORIZATION, format!("Bearer {}", barman))
        .body(Body::empty())
        .unwrap();
    let waiter = tokio::spawn(async move { router.oneshot(await_request).await });

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    waiter.abort();
    assert!(waiter.await.unwrap_err().is_cancelled());

    let detail_uri = format!("/api/orders/{}", order_id);
    let mut status = Value::Null;
    for _ in 0..40 {
        let (code, detail) = app.request(Method::GET, &detail_uri, Some(&barman), None).await;
        assert_eq!(code, StatusCode::OK);
        status = detail["order"]["status"].clone();
        if status == "cancelled" {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert_eq!(status, "cancelled");

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/public/orders/{}/confirm", order_id),
            None,
            Some(json!({ "token": pending["confirmation_token"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_long_poll_outlives_request_timeout() {
    let app = spawn_app_with(|config| config.request_timeout_ms = 1_000).await;
    let teller = app.session(1, StaffRole::Teller);
    let barman = app.session(2, StaffRole::Barman);
    let admin = app.session(3, StaffRole::Admin);

    let item = app.menu_item(&admin, "X", 100.0, 10).await;
    let wallet_id = app.funded_wallet(&teller, CLIENT_PHONE).await;
    let pending = app.place_order(&barman, wallet_id, item, 1).await;
    let order_id = pending["order"]["id"].as_i64().unwrap();

    let (status, outcome) = app
        .request(
            Method::GET,
            &format!("/api/orders/{}/await?timeout_secs=2", order_id),
            Some(&barman),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "timed_out");
}
