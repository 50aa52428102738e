//! Commit and rollback of units of work

use ferrule::foundation::{ErrorKind, NodeRef, QName};
use ferrule::repository::Repository;
use ferrule::repository::model::{ASSOC_CONTAINS, TYPE_CONTENT, TYPE_FOLDER};
use ferrule::rules::builtin::{actions, adapters, conditions};
use ferrule::rules::{EngineConfig, ParameterValues, Rule, RuleService};

const MARKER: QName = QName::from_static("urn:test", "marker");

// =============================================================================
// Helper Functions
// =============================================================================

fn service(config: EngineConfig) -> (RuleService, Repository, NodeRef) {
    let service = RuleService::builtin(config).unwrap();
    let (repository, store) = Repository::with_store("workspace", "SpacesStore").unwrap();
    let root = repository.snapshot().root_node(&store).unwrap();
    (service, repository, root)
}

fn create(tx: &mut ferrule::rules::Transaction<'_>, parent: &NodeRef, name: &str, kind: QName) -> NodeRef {
    tx.nodes_mut()
        .create_node(parent, ASSOC_CONTAINS, QName::new("", name), kind, [])
        .unwrap()
        .child
}

fn inbound_rule(service: &RuleService, action: (&str, ParameterValues)) -> Rule {
    let mut rule = service.create_rule(&service.rule_type(adapters::INBOUND).unwrap());
    rule.add_condition(
        service.condition_definition(conditions::NO_CONDITION).unwrap(),
        ParameterValues::new(),
    );
    rule.add_action(service.action_definition(action.0).unwrap(), action.1);
    rule
}

fn marking(service: &RuleService) -> Rule {
    inbound_rule(
        service,
        (
            actions::ADD_FEATURES,
            ParameterValues::new().with(actions::PARAM_ASPECT_NAME, MARKER),
        ),
    )
}

/// A rule whose action names an aspect parameter of the wrong kind, so the
/// handler cannot be built when it runs.
fn broken(service: &RuleService) -> Rule {
    inbound_rule(
        service,
        (
            actions::ADD_FEATURES,
            ParameterValues::new().with(actions::PARAM_ASPECT_NAME, true),
        ),
    )
}

fn inbox(service: &RuleService, repository: &Repository, root: &NodeRef) -> NodeRef {
    let mut tx = service.begin(repository);
    let inbox = create(&mut tx, root, "inbox", TYPE_FOLDER);
    service.make_actionable(&mut tx, &inbox).unwrap();
    tx.commit().unwrap();
    inbox
}

// =============================================================================
// Commit and Rollback
// =============================================================================

#[test]
fn commit_installs_changes_and_rule_effects() {
    let (service, repository, root) = service(EngineConfig::default());
    let inbox = inbox(&service, &repository, &root);
    service.add_rule(&inbox, marking(&service)).unwrap();
    let before = repository.version();

    let mut tx = service.begin(&repository);
    let doc = create(&mut tx, &inbox, "doc", TYPE_CONTENT);
    let receipt = tx.commit().unwrap();

    assert_eq!(receipt.version, before + 1);
    assert_eq!(repository.version(), receipt.version);
    let committed = repository.snapshot();
    assert!(committed.exists(&doc));
    assert!(committed.has_aspect(&doc, &MARKER).unwrap());
}

#[test]
fn rollback_discards_changes_and_pending_rules() {
    let (service, repository, root) = service(EngineConfig::default());
    let inbox = inbox(&service, &repository, &root);
    service.add_rule(&inbox, marking(&service)).unwrap();
    let before = repository.version();

    let mut tx = service.begin(&repository);
    let doc = create(&mut tx, &inbox, "doc", TYPE_CONTENT);
    tx.flush_events().unwrap();
    assert_eq!(tx.pending().len(), 1);
    tx.rollback();

    assert_eq!(repository.version(), before);
    assert!(!repository.snapshot().exists(&doc));

    let mut next = service.begin(&repository);
    assert!(next.pending().is_empty());
    assert!(next.execute_pending_rules().unwrap().is_empty());
}

#[test]
fn failed_rule_refuses_the_commit() {
    let (service, repository, root) = service(EngineConfig::default());
    let inbox = inbox(&service, &repository, &root);
    service.add_rule(&inbox, broken(&service)).unwrap();
    let before = repository.version();

    let mut tx = service.begin(&repository);
    let doc = create(&mut tx, &inbox, "doc", TYPE_CONTENT);
    let err = tx.commit().unwrap_err();

    assert!(matches!(err.kind, ErrorKind::RuleExecutionFailed { count: 1 }));
    assert_eq!(repository.version(), before);
    assert!(!repository.snapshot().exists(&doc));
}

#[test]
fn lenient_engine_commits_despite_failures() {
    let (service, repository, root) = service(EngineConfig::lenient());
    let inbox = inbox(&service, &repository, &root);
    service.add_rule(&inbox, broken(&service)).unwrap();
    service.add_rule(&inbox, marking(&service)).unwrap();

    let mut tx = service.begin(&repository);
    let doc = create(&mut tx, &inbox, "doc", TYPE_CONTENT);
    let receipt = tx.commit().unwrap();

    assert_eq!(receipt.report.failures.len(), 1);
    assert_eq!(receipt.report.executed, 1);
    let failure = &receipt.report.failures[0];
    assert!(matches!(failure.error.kind, ErrorKind::InvalidParameter { .. }));
    assert!(repository.snapshot().has_aspect(&doc, &MARKER).unwrap());
}

#[test]
fn commit_after_a_concurrent_commit_is_refused() {
    let (service, repository, root) = service(EngineConfig::default());
    let mut first = service.begin(&repository);
    let mut second = service.begin(&repository);
    create(&mut first, &root, "first", TYPE_FOLDER);
    create(&mut second, &root, "second", TYPE_FOLDER);

    first.commit().unwrap();
    let err = second.commit().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ConcurrentModification { .. }));
}

#[test]
fn unit_of_work_sees_its_own_changes_only() {
    let (service, repository, root) = service(EngineConfig::default());
    let mut tx = service.begin(&repository);
    let doc = create(&mut tx, &root, "doc", TYPE_CONTENT);

    assert!(tx.nodes().exists(&doc));
    assert!(!service.begin(&repository).nodes().exists(&doc));
    assert!(!repository.snapshot().exists(&doc));
}
