#[cfg(test)]
mod integration_tests {
    use axum::http::StatusCode;
    use axum::Router;
    use axum_test::{TestServer, TestServerConfig};
    use rust_decimal::Decimal;
    use sea_orm::{EntityTrait, PaginatorTrait};

    use crate::handlers::auth::{LoginForm, RegisterForm};
    use crate::router::create_router;
    use crate::schemas::{ApiResponse, ErrorResponse};
    use crate::settlement::{assert_ledger_invariants, PaymentForm, PurchaseForm};
    use crate::test_utils::test_utils::{setup_test_app, setup_test_app_state};
    use model::entities::prelude::*;

    /// Cookie-persisting test server so sessions survive across requests.
    fn test_server(app: Router) -> TestServer {
        let config = TestServerConfig::builder().save_cookies().build();
        TestServer::new_with_config(app, config).unwrap()
    }

    fn register_form(username: &str, password: &str) -> RegisterForm {
        RegisterForm {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            confirmation: Some(password.to_string()),
            avatar_url: None,
        }
    }

    fn purchase_form(status: &str, price: &str) -> PurchaseForm {
        PurchaseForm {
            seller: Some("Corner Shop".to_string()),
            item: Some("Groceries".to_string()),
            description: Some("Weekly run".to_string()),
            status: Some(status.to_string()),
            price: Some(price.to_string()),
        }
    }

    fn payment_form(purchase_id: i64, amount: &str) -> PaymentForm {
        PaymentForm {
            purchase_id: Some(purchase_id.to_string()),
            amount: Some(amount.to_string()),
        }
    }

    async fn register(server: &TestServer, username: &str) {
        let response = server
            .post("/register")
            .form(&register_form(username, "hunter2"))
            .await;
        response.assert_status(StatusCode::CREATED);
    }

    /// Record a purchase through the API and return its id.
    async fn post_purchase(server: &TestServer, status: &str, price: &str) -> i64 {
        let response = server.post("/purchase").form(&purchase_form(status, price)).await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        body.data["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = test_server(setup_test_app().await);

        let response = server.get("/health").await;
        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_register_establishes_session() {
        let server = test_server(setup_test_app().await);

        let response = server
            .post("/register")
            .form(&register_form("alice", "hunter2"))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert!(body.success);
        assert_eq!(body.data["username"], "alice");

        // The session cookie from registration authorizes protected routes.
        let summary = server.get("/").await;
        summary.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = summary.json();
        assert_eq!(body.data["username"], "alice");
        assert_eq!(body.data["purchase_count"], 0);
    }

    #[tokio::test]
    async fn test_register_missing_everything_reported_together() {
        let server = test_server(setup_test_app().await);

        let response = server.post("/register").form(&RegisterForm::default()).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "MISSING_FIELD");
        assert_eq!(body.error, "username, password and confirmation are required");
    }

    #[tokio::test]
    async fn test_register_partial_missing_reported_individually() {
        let server = test_server(setup_test_app().await);

        let form = RegisterForm {
            username: Some("alice".to_string()),
            password: None,
            confirmation: Some("hunter2".to_string()),
            avatar_url: None,
        };
        let response = server.post("/register").form(&form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "MISSING_FIELD");
        assert_eq!(body.error, "password is required");
    }

    #[tokio::test]
    async fn test_register_password_mismatch() {
        let server = test_server(setup_test_app().await);

        let form = RegisterForm {
            username: Some("alice".to_string()),
            password: Some("hunter2".to_string()),
            confirmation: Some("hunter3".to_string()),
            avatar_url: None,
        };
        let response = server.post("/register").form(&form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "PASSWORD_MISMATCH");
    }

    #[tokio::test]
    async fn test_register_duplicate_username_creates_no_row() {
        let state = setup_test_app_state().await;
        let server = test_server(create_router(state.clone()));

        register(&server, "alice").await;

        let response = server
            .post("/register")
            .form(&register_form("alice", "different"))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "USERNAME_TAKEN");

        assert_eq!(User::find().count(&state.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_login_unknown_username() {
        let server = test_server(setup_test_app().await);

        let form = LoginForm {
            username: Some("nobody".to_string()),
            password: Some("hunter2".to_string()),
        };
        let response = server.post("/login").form(&form).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "UNKNOWN_USERNAME");
    }

    #[tokio::test]
    async fn test_login_wrong_password_leaves_no_session() {
        let server = test_server(setup_test_app().await);
        register(&server, "alice").await;
        server.get("/logout").await.assert_status(StatusCode::SEE_OTHER);

        let form = LoginForm {
            username: Some("alice".to_string()),
            password: Some("wrong".to_string()),
        };
        let response = server.post("/login").form(&form).await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "WRONG_PASSWORD");

        // The failed login must not have established a session.
        server.get("/").await.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_login_success_after_logout() {
        let server = test_server(setup_test_app().await);
        register(&server, "alice").await;
        server.get("/logout").await.assert_status(StatusCode::SEE_OTHER);

        let form = LoginForm {
            username: Some("alice".to_string()),
            password: Some("hunter2".to_string()),
        };
        let response = server.post("/login").form(&form).await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["username"], "alice");

        server.get("/").await.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_missing_credentials() {
        let server = test_server(setup_test_app().await);

        let response = server.post("/login").form(&LoginForm::default()).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "MISSING_FIELD");
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let server = test_server(setup_test_app().await);
        register(&server, "alice").await;

        server.get("/logout").await.assert_status(StatusCode::SEE_OTHER);
        // Logging out again with no session behaves the same.
        server.get("/logout").await.assert_status(StatusCode::SEE_OTHER);

        server.get("/purchases").await.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_unauthenticated_requests_redirect_to_login() {
        let server = test_server(setup_test_app().await);

        server.get("/").await.assert_status(StatusCode::SEE_OTHER);
        server.get("/purchases").await.assert_status(StatusCode::SEE_OTHER);
        server.get("/payments").await.assert_status(StatusCode::SEE_OTHER);

        let response = server
            .post("/purchase")
            .form(&purchase_form("Pending", "10"))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_pending_purchase_raises_debt_cleared_does_not() {
        let server = test_server(setup_test_app().await);
        register(&server, "alice").await;

        post_purchase(&server, "Pending", "200").await;

        let summary = server.get("/").await;
        summary.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = summary.json();
        assert_eq!(body.data["purchase_count"], 1);
        assert_eq!(body.data["outstanding_debt_display"], "$200.00");

        post_purchase(&server, "Cleared", "75").await;

        let summary = server.get("/").await;
        let body: ApiResponse<serde_json::Value> = summary.json();
        assert_eq!(body.data["purchase_count"], 2);
        // A cleared purchase never touches the aggregate debt.
        assert_eq!(body.data["outstanding_debt_display"], "$200.00");
        assert_eq!(body.data["total_purchased_display"], "$275.00");
    }

    #[tokio::test]
    async fn test_invalid_status_rejected() {
        let server = test_server(setup_test_app().await);
        register(&server, "alice").await;

        let response = server
            .post("/purchase")
            .form(&purchase_form("Overdue", "10"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "INVALID_STATUS");
    }

    #[tokio::test]
    async fn test_missing_price_rejected() {
        let server = test_server(setup_test_app().await);
        register(&server, "alice").await;

        let mut form = purchase_form("Pending", "10");
        form.price = None;
        let response = server.post("/purchase").form(&form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "MISSING_FIELD");
    }

    #[tokio::test]
    async fn test_partial_payment_keeps_purchase_pending() {
        let server = test_server(setup_test_app().await);
        register(&server, "alice").await;
        let purchase_id = post_purchase(&server, "Pending", "100").await;

        let response = server
            .post("/payment")
            .form(&payment_form(purchase_id, "30"))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["amount_display"], "$30.00");

        let listing = server.get("/purchases").await;
        let body: ApiResponse<serde_json::Value> = listing.json();
        let pending = body.data["pending"].as_array().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0]["status"], "Pending");
        assert_eq!(pending[0]["debt_display"], "$70.00");

        let summary = server.get("/").await;
        let body: ApiResponse<serde_json::Value> = summary.json();
        assert_eq!(body.data["outstanding_debt_display"], "$70.00");
    }

    #[tokio::test]
    async fn test_exact_payment_clears_purchase() {
        let server = test_server(setup_test_app().await);
        register(&server, "alice").await;
        let purchase_id = post_purchase(&server, "Pending", "50").await;

        let response = server
            .post("/payment")
            .form(&payment_form(purchase_id, "50"))
            .await;
        response.assert_status(StatusCode::CREATED);

        let listing = server.get("/purchases").await;
        let body: ApiResponse<serde_json::Value> = listing.json();
        assert!(body.data["pending"].as_array().unwrap().is_empty());
        let cleared = body.data["cleared"].as_array().unwrap();
        assert_eq!(cleared.len(), 1);
        assert_eq!(cleared[0]["status"], "Cleared");
        assert_eq!(cleared[0]["debt_display"], "$0.00");

        let summary = server.get("/").await;
        let body: ApiResponse<serde_json::Value> = summary.json();
        assert_eq!(body.data["outstanding_debt_display"], "$0.00");
    }

    #[tokio::test]
    async fn test_overpayment_stores_clamped_amount() {
        let server = test_server(setup_test_app().await);
        register(&server, "alice").await;
        let purchase_id = post_purchase(&server, "Pending", "100").await;

        let response = server
            .post("/payment")
            .form(&payment_form(purchase_id, "150"))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        // The stored amount is the applied amount, not the requested one.
        assert_eq!(body.data["amount_display"], "$100.00");

        let payments = server.get("/payments").await;
        let body: ApiResponse<Vec<serde_json::Value>> = payments.json();
        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0]["amount_display"], "$100.00");
    }

    #[tokio::test]
    async fn test_payment_against_cleared_or_unknown_purchase() {
        let state = setup_test_app_state().await;
        let server = test_server(create_router(state.clone()));
        register(&server, "alice").await;
        let purchase_id = post_purchase(&server, "Cleared", "100").await;

        let response = server
            .post("/payment")
            .form(&payment_form(purchase_id, "10"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "INVALID_PURCHASE");

        let response = server.post("/payment").form(&payment_form(9999, "10")).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // No payment row was written by either attempt.
        assert_eq!(Payment::find().count(&state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_listings_are_newest_first() {
        let server = test_server(setup_test_app().await);
        register(&server, "alice").await;

        let first = post_purchase(&server, "Pending", "10").await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let second = post_purchase(&server, "Pending", "20").await;

        let listing = server.get("/purchases").await;
        let body: ApiResponse<serde_json::Value> = listing.json();
        let pending = body.data["pending"].as_array().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0]["id"].as_i64().unwrap(), second);
        assert_eq!(pending[1]["id"].as_i64().unwrap(), first);

        server
            .post("/payment")
            .form(&payment_form(first, "1"))
            .await
            .assert_status(StatusCode::CREATED);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        server
            .post("/payment")
            .form(&payment_form(second, "2"))
            .await
            .assert_status(StatusCode::CREATED);

        let payments = server.get("/payments").await;
        let body: ApiResponse<Vec<serde_json::Value>> = payments.json();
        assert_eq!(body.data.len(), 2);
        assert_eq!(body.data[0]["amount_display"], "$2.00");
        assert_eq!(body.data[1]["amount_display"], "$1.00");
    }

    #[tokio::test]
    async fn test_invariants_hold_after_mixed_api_sequence() {
        let state = setup_test_app_state().await;
        let server = test_server(create_router(state.clone()));
        register(&server, "alice").await;

        let p1 = post_purchase(&server, "Pending", "100").await;
        post_purchase(&server, "Cleared", "40").await;
        let p2 = post_purchase(&server, "Pending", "25.50").await;

        for (id, amount) in [(p1, "30"), (p2, "99"), (p1, "70")] {
            server
                .post("/payment")
                .form(&payment_form(id, amount))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let alice = User::find().one(&state.db).await.unwrap().unwrap();
        assert_eq!(alice.debt, Decimal::ZERO);
        assert_ledger_invariants(&state.db, alice.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_users_only_see_their_own_ledger() {
        let server = test_server(setup_test_app().await);

        register(&server, "alice").await;
        post_purchase(&server, "Pending", "100").await;
        server.get("/logout").await.assert_status(StatusCode::SEE_OTHER);

        register(&server, "bob").await;
        let summary = server.get("/").await;
        summary.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = summary.json();
        assert_eq!(body.data["username"], "bob");
        assert_eq!(body.data["purchase_count"], 0);
        assert_eq!(body.data["outstanding_debt_display"], "$0.00");

        let listing = server.get("/purchases").await;
        let body: ApiResponse<serde_json::Value> = listing.json();
        assert!(body.data["pending"].as_array().unwrap().is_empty());
    }
}
