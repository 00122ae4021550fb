//! Integration tests for the ARM transport, codec and poller using wiremock
//!
//! These tests verify request shaping (path, api-version, bearer token),
//! status handling, retry on throttling and long-running operation polling
//! against mocked endpoints.

use azapps::arm::auth::StaticTokenCredential;
use azapps::arm::http::ArmHttpClient;
use azapps::arm::{ApiError, ArmClient, ArmResponse, PollError, Poller, Transport};
use azapps::ids::{FunctionAppSlotId, ServicePlanId};
use azapps::web::models::Site;
use azapps::web::{self, AppServicePlansClient, WebAppsClient};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{bearer_token, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

fn transport(server: &MockServer) -> Arc<dyn Transport> {
    let http = ArmHttpClient::new(&server.uri())
        .unwrap()
        .with_retries(1, Duration::from_millis(10));
    let client = ArmClient::new(
        &server.uri(),
        SUBSCRIPTION,
        Arc::new(StaticTokenCredential::new("test-token")),
    )
    .unwrap()
    .with_http(http);
    Arc::new(client)
}

fn slot_id() -> FunctionAppSlotId {
    FunctionAppSlotId::new(SUBSCRIPTION, "rg1", "app1", "staging")
}

fn slot_path() -> String {
    format!(
        "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Web/sites/app1/slots/staging",
        SUBSCRIPTION
    )
}

/// Test module for codec behaviour through typed clients
mod codec_tests {
    use super::*;

    /// A GET sends the bearer token and api-version and decodes the body
    #[tokio::test]
    async fn test_get_slot_decodes_site() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(slot_path()))
            .and(query_param("api-version", "2021-02-01"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": slot_path(),
                "name": "app1/staging",
                "location": "westeurope",
                "kind": "functionapp,linux",
                "properties": {"enabled": true, "httpsOnly": true}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebAppsClient::new(web::codec(transport(&server)));
        let site = client.get_slot(&slot_id()).await.expect("GetSlot should succeed");

        assert_eq!(site.location.as_deref(), Some("westeurope"));
        assert_eq!(site.properties.unwrap().https_only, Some(true));
    }

    /// An unexpected status surfaces the full response and the ARM error body
    #[tokio::test]
    async fn test_404_is_not_found_with_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(slot_path()))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": "ResourceNotFound", "message": "The Resource was not found."}
            })))
            .mount(&server)
            .await;

        let client = WebAppsClient::new(web::codec(transport(&server)));
        let err = client.get_slot(&slot_id()).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(matches!(err, ApiError::UnexpectedStatus { .. }));
        assert!(err.response().unwrap().body.contains("ResourceNotFound"));
        let message = err.to_string();
        assert!(message.contains("web.WebAppsClient#GetSlot"));
        assert!(message.contains("StatusCode=404"));
        assert!(message.contains("ResourceNotFound"));
    }

    /// A 2xx status outside the operation's expected set is still a failure
    #[tokio::test]
    async fn test_unexpected_success_status_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("{}/config/appsettings/list", slot_path())))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let client = WebAppsClient::new(web::codec(transport(&server)));
        let err = client
            .list_application_settings_slot(&slot_id())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(202));
    }

    /// A malformed body is reported as a decode failure, not a panic
    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(slot_path()))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let client = WebAppsClient::new(web::codec(transport(&server)));
        let err = client.get_slot(&slot_id()).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    /// Delete sends its fixed query parameters
    #[tokio::test]
    async fn test_delete_slot_query_parameters() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path(slot_path()))
            .and(query_param("deleteMetrics", "true"))
            .and(query_param("deleteEmptyServerFarm", "false"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebAppsClient::new(web::codec(transport(&server)));
        client
            .delete_slot(&slot_id(), true, false)
            .await
            .expect("DeleteSlot should succeed");
    }

    /// Name availability is checked at subscription scope
    #[tokio::test]
    async fn test_check_name_availability_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!(
                "/subscriptions/{}/providers/Microsoft.Web/checknameavailability",
                SUBSCRIPTION
            )))
            .and(body_json(json!({"name": "app1-staging", "type": "Microsoft.Web/sites"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nameAvailable": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebAppsClient::new(web::codec(transport(&server)));
        let request = azapps::web::models::ResourceNameAvailabilityRequest {
            name: "app1-staging".to_string(),
            resource_type: "Microsoft.Web/sites".to_string(),
            is_fqdn: None,
        };
        let result = client
            .check_name_availability(SUBSCRIPTION, &request)
            .await
            .unwrap();
        assert_eq!(result.name_available, Some(true));
    }

    /// Plans are read through their own client family
    #[tokio::test]
    async fn test_plan_get() {
        let server = MockServer::start().await;
        let plan_id = ServicePlanId::new(SUBSCRIPTION, "rg1", "plan1");

        Mock::given(method("GET"))
            .and(path(format!(
                "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Web/serverfarms/plan1",
                SUBSCRIPTION
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sku": {"name": "Y1", "tier": "Dynamic"}
            })))
            .mount(&server)
            .await;

        let client = AppServicePlansClient::new(web::codec(transport(&server)));
        let plan = client.get(&plan_id).await.unwrap();
        assert_eq!(plan.sku.unwrap().tier.as_deref(), Some("Dynamic"));
    }
}

/// Test module for transport retry behaviour
mod retry_tests {
    use super::*;

    /// A 429 is retried once and the second response is surfaced
    #[tokio::test]
    async fn test_429_is_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(slot_path()))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(slot_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"location": "westeurope"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebAppsClient::new(web::codec(transport(&server)));
        let site = client.get_slot(&slot_id()).await.unwrap();
        assert_eq!(site.location.as_deref(), Some("westeurope"));
    }

    /// Retries are bounded; the last throttled response becomes the error
    #[tokio::test]
    async fn test_429_retries_are_bounded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(slot_path()))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .expect(2)
            .mount(&server)
            .await;

        let client = WebAppsClient::new(web::codec(transport(&server)));
        let err = client.get_slot(&slot_id()).await.unwrap_err();
        assert_eq!(err.status(), Some(429));
    }
}

/// Test module for long-running operation polling
mod poller_tests {
    use super::*;

    fn accepted_with(header: &str, url: String) -> ArmResponse {
        let mut response = ArmResponse {
            status: 202,
            ..Default::default()
        };
        response.headers.insert(header.to_string(), url);
        response
    }

    /// The status monitor is followed until it reports success
    #[tokio::test]
    async fn test_async_operation_succeeds() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/operations/op1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/op1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
            .mount(&server)
            .await;

        let poller = Poller::new(transport(&server), Duration::ZERO);
        let initial = accepted_with("azure-asyncoperation", format!("{}/operations/op1", server.uri()));
        poller.wait(&initial).await.expect("operation should succeed");

        let polls = server.received_requests().await.unwrap();
        assert_eq!(polls.len(), 3);
    }

    /// A failed operation is reported as a wait error carrying the service message
    #[tokio::test]
    async fn test_async_operation_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/operations/op2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Failed",
                "error": {"code": "Conflict", "message": "slot quota exceeded"}
            })))
            .mount(&server)
            .await;

        let poller = Poller::new(transport(&server), Duration::ZERO);
        let initial = accepted_with("azure-asyncoperation", format!("{}/operations/op2", server.uri()));
        let err = poller.wait(&initial).await.unwrap_err();

        match err {
            PollError::Failed { status, detail } => {
                assert_eq!(status, "Failed");
                assert!(detail.contains("slot quota exceeded"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    /// `Location` polling returns the final response body
    #[tokio::test]
    async fn test_location_polling_returns_result() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/results/r1"))
            .respond_with(ResponseTemplate::new(202))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/results/r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"publishingUserName": "$app1__staging", "publishingPassword": "secret"}
            })))
            .mount(&server)
            .await;

        let poller = Poller::new(transport(&server), Duration::ZERO);
        let initial = accepted_with("location", format!("{}/results/r1", server.uri()));
        let done = poller.wait(&initial).await.unwrap();

        let user = WebAppsClient::publishing_credentials(&done).unwrap().unwrap();
        assert_eq!(
            user.properties.unwrap().publishing_user_name.as_deref(),
            Some("$app1__staging")
        );
    }

    /// A write answered with a non-terminal provisioning state and no
    /// polling headers is re-read until it settles
    #[tokio::test]
    async fn test_provisioning_state_is_polled() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(slot_path()))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "properties": {"provisioningState": "InProgress"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(slot_path()))
            .and(query_param("api-version", "2021-02-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"provisioningState": "Creating"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(slot_path()))
            .and(query_param("api-version", "2021-02-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"provisioningState": "Succeeded", "enabled": true}
            })))
            .mount(&server)
            .await;

        let client = WebAppsClient::new(web::codec(transport(&server)));
        let pending = client.create_or_update_slot(&slot_id(), &Site::default()).await.unwrap();
        assert_eq!(pending.status, 201);

        let poller = Poller::new(transport(&server), Duration::ZERO);
        let done = poller.wait(&pending).await.expect("provisioning should succeed");
        assert!(done.body.contains("Succeeded"));

        let gets = server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.method.as_str() == "GET")
            .count();
        assert_eq!(gets, 2);
    }

    /// A failed provisioning state is a wait error
    #[tokio::test]
    async fn test_failed_provisioning_state() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sites/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"provisioningState": "Failed"}
            })))
            .mount(&server)
            .await;

        let poller = Poller::new(transport(&server), Duration::ZERO);
        let initial = ArmResponse {
            url: format!("{}/sites/s1", server.uri()),
            status: 201,
            body: json!({"properties": {"provisioningState": "Accepted"}}).to_string(),
            ..Default::default()
        };
        let err = poller.wait(&initial).await.unwrap_err();
        assert!(matches!(err, PollError::Failed { ref status, .. } if status == "Failed"));
    }

    /// A terminal provisioning state needs no further requests
    #[tokio::test]
    async fn test_succeeded_provisioning_state_is_complete() {
        let server = MockServer::start().await;
        let poller = Poller::new(transport(&server), Duration::ZERO);
        let initial = ArmResponse {
            url: format!("{}/sites/s1", server.uri()),
            status: 200,
            body: json!({"properties": {"provisioningState": "Succeeded"}}).to_string(),
            ..Default::default()
        };
        poller.wait(&initial).await.unwrap();
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    /// A completed response passes straight through
    #[tokio::test]
    async fn test_no_polling_headers_is_complete() {
        let server = MockServer::start().await;
        let poller = Poller::new(transport(&server), Duration::ZERO);
        let initial = ArmResponse {
            status: 200,
            body: "{}".to_string(),
            ..Default::default()
        };
        let done = poller.wait(&initial).await.unwrap();
        assert_eq!(done.body, "{}");
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
