//! Academic-records client against a mock service.

use std::time::Duration;

use practicum_eligibility::config::AcademicServiceConfig;
use practicum_eligibility::workflows::academic::{
    AcademicRecordClient, AcademicRecordError, AcademicRecordSource,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, timeout: Duration) -> AcademicRecordClient {
    AcademicRecordClient::new(&AcademicServiceConfig {
        base_url: Url::parse(&server.uri()).expect("mock url"),
        api_token: Some("token-academico".to_string()),
        timeout,
    })
    .expect("client builds")
}

fn plan_json(program_code: &str, graduated: bool) -> serde_json::Value {
    json!({
        "cod_plan": program_code,
        "plan": "Administración de Empresas",
        "cod_facultad": "FCE",
        "facultad": "Ciencias Económicas",
        "creditos_matriculados": 18,
        "creditos_conseguidos": "80",
        "creditos_totales": 160,
        "tipologias": { "B": { "matriculados": 3, "conseguidos": 30 } },
        "promedio_acumulado": 3.9,
        "semestre_por_creditos": 6,
        "graduado": graduated,
        "fecha_grado": if graduated { json!("2021-12-10") } else { json!(null) },
        "nivel_educativo": "PREGRADO",
        "cod_matricula": "M-0042"
    })
}

#[tokio::test]
async fn wrapped_plans_are_parsed_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/planes-estudio"))
        .and(query_param("documento", "123"))
        .and(header("authorization", "Bearer token-academico"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "planes": [plan_json("AE02", false), plan_json("TL01", true)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let plans = client(&server, Duration::from_secs(5))
        .plans_for("123")
        .await
        .expect("plans");

    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0].program_code, "AE02");
    assert_eq!(plans[0].credits_approved, 80.0);
    assert_eq!(plans[0].typology("b").map(|credits| credits.approved), Some(30.0));
    assert!(plans[1].graduated);
    assert_eq!(plans[1].matriculation_code.as_deref(), Some("M-0042"));
}

#[tokio::test]
async fn bare_array_payloads_are_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/planes-estudio"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([plan_json("AE02", false)])))
        .mount(&server)
        .await;

    let plans = client(&server, Duration::from_secs(5))
        .plans_for("123")
        .await
        .expect("plans");

    assert_eq!(plans.len(), 1);
}

#[tokio::test]
async fn unknown_person_yields_no_plans() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let plans = client(&server, Duration::from_secs(5))
        .plans_for("000")
        .await
        .expect("404 is not an error");

    assert!(plans.is_empty());
}

#[tokio::test]
async fn server_errors_and_malformed_payloads_are_typed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("documento", "500"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("documento", "777"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>mantenimiento</html>"))
        .mount(&server)
        .await;

    let client = client(&server, Duration::from_secs(5));

    assert!(matches!(
        client.plans_for("500").await,
        Err(AcademicRecordError::Status { status: 503, .. })
    ));
    assert!(matches!(
        client.plans_for("777").await,
        Err(AcademicRecordError::Malformed(_))
    ));
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let result = client(&server, Duration::from_millis(50))
        .plans_for("999")
        .await;

    match result {
        Err(AcademicRecordError::Timeout { identification }) => assert_eq!(identification, "999"),
        other => panic!("expected timeout, got {other:?}"),
    }
}
