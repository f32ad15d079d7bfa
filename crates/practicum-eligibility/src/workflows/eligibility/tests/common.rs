use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::academic::{
    AcademicPlanSnapshot, AcademicRecordError, AcademicRecordSource, TypologyCredits,
};
use crate::workflows::eligibility::domain::{
    EligibilityStatus, FinalStatusPolicy, RoutingContext, RuleId,
};
use crate::workflows::eligibility::memory::InMemoryDocumentStore;
use crate::workflows::eligibility::preview::PreviewItem;
use crate::workflows::eligibility::rules::{
    ConditionOperator, EligibilityRule, ExpectedValue, LogicOperator, RuleCondition, RuleVariable,
};
use crate::workflows::eligibility::service::EligibilityService;
use crate::workflows::roster::{
    RemoteSession, RosterCache, RosterRow, RosterTransport, TransportError,
};

pub(super) const ROSTER_PATH: &str = "rosters/practicas-2025-1.csv";
pub(super) const PERIOD: &str = "2025-1";

pub(super) const ROSTER: &str = ",,,,,,,\n\
Identificación,Nombres,Apellidos,Código Programa,Código Plan,Correo,Sede,Tipo Práctica\n\
123,Ana María,Rojas,AE02,,Ana.Rojas@uni.edu.co,Bogotá,Empresarial\n\
999,Luis,Pérez,AE01,ae02,luis@uni.edu.co,Medellín,Social\n\
555,Marta,Gómez,IQ01,,marta@uni.edu.co,Bogotá,Investigación\n";

pub(super) struct StaticTransport {
    content: Vec<u8>,
}

impl StaticTransport {
    pub(super) fn new(content: &str) -> Self {
        Self {
            content: content.as_bytes().to_vec(),
        }
    }
}

struct StaticSession {
    content: Vec<u8>,
}

#[async_trait]
impl RosterTransport for StaticTransport {
    async fn connect(&self) -> Result<Box<dyn RemoteSession>, TransportError> {
        Ok(Box::new(StaticSession {
            content: self.content.clone(),
        }))
    }
}

#[async_trait]
impl RemoteSession for StaticSession {
    async fn modified_at(&mut self, _path: &str) -> Result<DateTime<Utc>, TransportError> {
        Ok(Utc
            .with_ymd_and_hms(2025, 1, 20, 7, 30, 0)
            .single()
            .expect("valid timestamp"))
    }

    async fn read(&mut self, _path: &str) -> Result<Vec<u8>, TransportError> {
        Ok(self.content.clone())
    }
}

pub(super) struct UnreachableTransport;

#[async_trait]
impl RosterTransport for UnreachableTransport {
    async fn connect(&self) -> Result<Box<dyn RemoteSession>, TransportError> {
        Err(TransportError::Connection("connection refused".to_string()))
    }
}

/// Academic source answering from a fixed table, failing for selected identifications.
#[derive(Default)]
pub(super) struct FakeAcademic {
    plans: HashMap<String, Vec<AcademicPlanSnapshot>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeAcademic {
    pub(super) fn with_plans(
        mut self,
        identification: &str,
        plans: Vec<AcademicPlanSnapshot>,
    ) -> Self {
        self.plans.insert(identification.to_string(), plans);
        self
    }

    pub(super) fn failing_for(mut self, identification: &str) -> Self {
        self.failing.insert(identification.to_string());
        self
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl AcademicRecordSource for FakeAcademic {
    async fn plans_for(
        &self,
        identification: &str,
    ) -> Result<Vec<AcademicPlanSnapshot>, AcademicRecordError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(identification.to_string());
        if self.failing.contains(identification) {
            return Err(AcademicRecordError::Timeout {
                identification: identification.to_string(),
            });
        }
        Ok(self.plans.get(identification).cloned().unwrap_or_default())
    }
}

pub(super) fn plan(program_code: &str, approved: f64) -> AcademicPlanSnapshot {
    let mut typologies = BTreeMap::new();
    typologies.insert(
        "B".to_string(),
        TypologyCredits {
            matriculated: 4.0,
            approved: 30.0,
        },
    );

    AcademicPlanSnapshot {
        program_code: program_code.to_string(),
        program_name: "Administración de Empresas".to_string(),
        faculty_code: Some("FCE".to_string()),
        faculty_name: Some("Ciencias Económicas".to_string()),
        credits_matriculated: 18.0,
        credits_approved: approved,
        credits_total: 160.0,
        typologies,
        cumulative_average: Some(3.8),
        semester_by_credits: Some(6.0),
        graduated: false,
        graduation_date: None,
        education_level: Some("PREGRADO".to_string()),
        matriculation_code: Some(format!("M-{program_code}")),
    }
}

pub(super) fn condition(
    variable: &str,
    operator: ConditionOperator,
    expected: f64,
) -> RuleCondition {
    RuleCondition {
        variable: RuleVariable::from(variable.to_string()),
        operator,
        expected: ExpectedValue::Number(expected),
    }
}

pub(super) fn rule(
    id: &str,
    logic: LogicOperator,
    programs: &[&str],
    conditions: Vec<RuleCondition>,
) -> EligibilityRule {
    EligibilityRule {
        id: RuleId(id.to_string()),
        name: id.to_string(),
        programs: programs.iter().map(|program| program.to_string()).collect(),
        logic,
        conditions,
        active: true,
        period_id: PERIOD.to_string(),
    }
}

pub(super) fn min_credits_rule() -> EligibilityRule {
    rule(
        "min-credits",
        LogicOperator::And,
        &["AE02"],
        vec![condition("creditosAprobados", ConditionOperator::AtLeast, 60.0)],
    )
}

pub(super) struct Harness {
    pub(super) service: EligibilityService,
    pub(super) store: InMemoryDocumentStore,
    pub(super) academic: Arc<FakeAcademic>,
}

pub(super) fn harness(
    roster: &str,
    rules: Vec<EligibilityRule>,
    academic: FakeAcademic,
    policy: FinalStatusPolicy,
) -> Harness {
    let store = InMemoryDocumentStore::with_rules(rules);
    let academic = Arc::new(academic);
    let cache = Arc::new(RosterCache::new(Arc::new(StaticTransport::new(roster))));
    let service = EligibilityService::with_components(
        cache,
        academic.clone(),
        store.stores(),
        ROSTER_PATH.to_string(),
        Duration::ZERO,
        policy,
    );

    Harness {
        service,
        store,
        academic,
    }
}

pub(super) fn default_harness() -> Harness {
    harness(
        ROSTER,
        vec![min_credits_rule()],
        FakeAcademic::default()
            .with_plans("123", vec![plan("AE02", 80.0)])
            .failing_for("999"),
        FinalStatusPolicy::Reset,
    )
}

pub(super) fn roster_row(identification: &str, program_code: &str) -> RosterRow {
    RosterRow {
        program_code: program_code.to_string(),
        secondary_program_code: None,
        identification: identification.to_string(),
        email: Some(format!("{identification}@uni.edu.co")),
        first_names: "Ana María".to_string(),
        last_names: "Rojas".to_string(),
        gender: Some("F".to_string()),
        mobile: Some("3001234567".to_string()),
        campus: Some("Bogotá".to_string()),
        period: Some(PERIOD.to_string()),
        practice_type: Some("Empresarial".to_string()),
    }
}

pub(super) fn preview_item(identification: &str, status: EligibilityStatus) -> PreviewItem {
    PreviewItem {
        candidate: roster_row(identification, "AE02"),
        identity_id: None,
        profile_id: None,
        exists: false,
        matched_plan: Some(plan("AE02", 80.0)),
        plans: vec![plan("AE02", 80.0)],
        rule_results: Vec::new(),
        status,
        lookup_error: None,
        plan_error: None,
        context: RoutingContext::default(),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
