//! Integration tests for the built-in rule type triggers

use ferrule_foundation::{QName, Value};
use ferrule_repository::model::{ASSOC_CONTAINS, PROP_DESCRIPTION, PROP_TITLE};
use ferrule_rules::builtin::{actions, adapters, conditions};
use ferrule_rules::ParameterValues;

use crate::support::{Fixture, MARKER, content, folder};

#[test]
fn inbound_rule_runs_when_a_node_is_created() {
    let fx = Fixture::new();
    let inbox = fx.actionable_folder("inbox");
    fx.service
        .add_rule(&inbox, fx.marking_rule(adapters::INBOUND))
        .unwrap();

    let mut tx = fx.begin();
    let doc = content(&mut tx, &inbox, "doc");
    let report = tx.execute_pending_rules().unwrap();

    assert_eq!(report.executed, 1);
    assert!(tx.nodes().has_aspect(&doc, &MARKER).unwrap());
}

#[test]
fn inbound_rule_runs_when_a_node_is_copied_in() {
    let fx = Fixture::new();
    let inbox = fx.actionable_folder("inbox");
    let mut tx = fx.begin();
    let source = content(&mut tx, &fx.root(), "source");
    tx.commit().unwrap();
    fx.service
        .add_rule(&inbox, fx.marking_rule(adapters::INBOUND))
        .unwrap();

    let mut tx = fx.begin();
    let copy = tx
        .nodes_mut()
        .copy_node(&source, &inbox, ASSOC_CONTAINS, QName::new("", "copy"), false)
        .unwrap();
    tx.execute_pending_rules().unwrap();

    assert!(tx.nodes().has_aspect(&copy, &MARKER).unwrap());
    assert!(!tx.nodes().has_aspect(&source, &MARKER).unwrap());
}

#[test]
fn committed_unit_of_work_keeps_rule_effects() {
    let fx = Fixture::new();
    let inbox = fx.actionable_folder("inbox");
    fx.service
        .add_rule(&inbox, fx.marking_rule(adapters::INBOUND))
        .unwrap();

    let mut tx = fx.begin();
    let doc = content(&mut tx, &inbox, "doc");
    let receipt = tx.commit().unwrap();

    assert_eq!(receipt.report.executed, 1);
    assert!(fx.repository.snapshot().has_aspect(&doc, &MARKER).unwrap());
}

#[test]
fn move_runs_outbound_on_the_old_folder_and_inbound_on_the_new() {
    let fx = Fixture::new();
    let source = fx.actionable_folder("source");
    let target = fx.actionable_folder("target");
    let mut tx = fx.begin();
    let doc = content(&mut tx, &source, "doc");
    tx.commit().unwrap();

    fx.service
        .add_rule(&source, fx.marking_rule(adapters::OUTBOUND))
        .unwrap();
    let described = fx.rule(
        adapters::INBOUND,
        (conditions::NO_CONDITION, ParameterValues::new()),
        (
            actions::SET_PROPERTY_VALUE,
            ParameterValues::new()
                .with(actions::PARAM_PROPERTY, PROP_DESCRIPTION)
                .with(actions::PARAM_VALUE, "arrived"),
        ),
    );
    fx.service.add_rule(&target, described).unwrap();

    let mut tx = fx.begin();
    tx.nodes_mut()
        .move_node(&doc, &target, ASSOC_CONTAINS, QName::new("", "doc"))
        .unwrap();
    let report = tx.execute_pending_rules().unwrap();

    assert_eq!(report.executed, 2);
    assert!(tx.nodes().has_aspect(&doc, &MARKER).unwrap());
    assert_eq!(
        tx.nodes().property(&doc, &PROP_DESCRIPTION).unwrap(),
        Some(Value::text("arrived"))
    );
}

#[test]
fn rename_within_a_folder_triggers_nothing() {
    let fx = Fixture::new();
    let inbox = fx.actionable_folder("inbox");
    let mut tx = fx.begin();
    let doc = content(&mut tx, &inbox, "doc");
    tx.commit().unwrap();
    fx.service
        .add_rule(&inbox, fx.marking_rule(adapters::INBOUND))
        .unwrap();
    fx.service
        .add_rule(&inbox, fx.marking_rule(adapters::OUTBOUND))
        .unwrap();

    let mut tx = fx.begin();
    tx.nodes_mut()
        .move_node(&doc, &inbox, ASSOC_CONTAINS, QName::new("", "renamed"))
        .unwrap();
    let report = tx.execute_pending_rules().unwrap();

    assert!(report.is_empty());
    assert!(!tx.nodes().has_aspect(&doc, &MARKER).unwrap());
}

#[test]
fn update_rule_runs_when_properties_change() {
    let fx = Fixture::new();
    let inbox = fx.actionable_folder("inbox");
    let mut tx = fx.begin();
    let doc = content(&mut tx, &inbox, "doc");
    tx.commit().unwrap();
    fx.service
        .add_rule(&inbox, fx.marking_rule(adapters::UPDATE))
        .unwrap();

    let mut tx = fx.begin();
    tx.nodes_mut().set_property(&doc, PROP_TITLE, "Report").unwrap();
    let report = tx.execute_pending_rules().unwrap();

    assert_eq!(report.executed, 1);
    assert!(tx.nodes().has_aspect(&doc, &MARKER).unwrap());
}

#[test]
fn update_rule_ignores_nodes_created_in_the_same_unit_of_work() {
    let fx = Fixture::new();
    let inbox = fx.actionable_folder("inbox");
    fx.service
        .add_rule(&inbox, fx.marking_rule(adapters::UPDATE))
        .unwrap();

    let mut tx = fx.begin();
    let doc = content(&mut tx, &inbox, "doc");
    tx.nodes_mut().set_property(&doc, PROP_TITLE, "Draft").unwrap();
    let report = tx.execute_pending_rules().unwrap();

    assert!(report.is_empty());
    assert!(!tx.nodes().has_aspect(&doc, &MARKER).unwrap());
}

#[test]
fn update_rule_that_updates_does_not_retrigger_itself() {
    let fx = Fixture::new();
    let inbox = fx.actionable_folder("inbox");
    let mut tx = fx.begin();
    let doc = content(&mut tx, &inbox, "doc");
    tx.commit().unwrap();
    let stamp = fx.rule(
        adapters::UPDATE,
        (conditions::NO_CONDITION, ParameterValues::new()),
        (
            actions::SET_PROPERTY_VALUE,
            ParameterValues::new()
                .with(actions::PARAM_PROPERTY, PROP_DESCRIPTION)
                .with(actions::PARAM_VALUE, "stamped"),
        ),
    );
    fx.service.add_rule(&inbox, stamp).unwrap();

    let mut tx = fx.begin();
    tx.nodes_mut().set_property(&doc, PROP_TITLE, "Report").unwrap();
    let report = tx.execute_pending_rules().unwrap();

    assert_eq!(report.executed, 1);
    assert_eq!(report.rounds, 1);
    assert!(tx.pending().is_empty());
}

#[test]
fn inherited_rule_runs_in_a_subfolder() {
    let fx = Fixture::new();
    let parent = fx.actionable_folder("parent");
    let mut tx = fx.begin();
    let child = folder(&mut tx, &parent, "child");
    tx.commit().unwrap();

    let mut rule = fx.marking_rule(adapters::INBOUND);
    rule.applies_to_children = true;
    fx.service.add_rule(&parent, rule).unwrap();

    let mut tx = fx.begin();
    let doc = content(&mut tx, &child, "doc");
    tx.execute_pending_rules().unwrap();

    assert!(tx.nodes().has_aspect(&doc, &MARKER).unwrap());
}

#[test]
fn rule_not_applying_to_children_stays_put() {
    let fx = Fixture::new();
    let parent = fx.actionable_folder("parent");
    let mut tx = fx.begin();
    let child = folder(&mut tx, &parent, "child");
    tx.commit().unwrap();
    fx.service
        .add_rule(&parent, fx.marking_rule(adapters::INBOUND))
        .unwrap();

    let mut tx = fx.begin();
    let doc = content(&mut tx, &child, "doc");
    tx.execute_pending_rules().unwrap();

    assert!(!tx.nodes().has_aspect(&doc, &MARKER).unwrap());
}

#[test]
fn disabled_folder_does_not_trigger() {
    let fx = Fixture::new();
    let inbox = fx.actionable_folder("inbox");
    fx.service
        .add_rule(&inbox, fx.marking_rule(adapters::INBOUND))
        .unwrap();

    let mut tx = fx.begin();
    fx.service.disable_rules(&mut tx, &inbox);
    let quiet = content(&mut tx, &inbox, "quiet");
    tx.flush_events().unwrap();
    assert!(tx.pending().is_empty());

    fx.service.enable_rules(&mut tx, &inbox);
    let loud = content(&mut tx, &inbox, "loud");
    tx.execute_pending_rules().unwrap();

    assert!(!tx.nodes().has_aspect(&quiet, &MARKER).unwrap());
    assert!(tx.nodes().has_aspect(&loud, &MARKER).unwrap());
}

#[test]
fn all_rules_can_be_disabled_for_a_unit_of_work() {
    let fx = Fixture::new();
    let inbox = fx.actionable_folder("inbox");
    fx.service
        .add_rule(&inbox, fx.marking_rule(adapters::INBOUND))
        .unwrap();

    let mut tx = fx.begin();
    tx.disable_all_rules();
    let doc = content(&mut tx, &inbox, "doc");
    let report = tx.execute_pending_rules().unwrap();

    assert!(report.is_empty());
    assert!(!tx.nodes().has_aspect(&doc, &MARKER).unwrap());
}

#[test]
fn configuration_folders_never_trigger() {
    let fx = Fixture::new();
    let root = fx.root();
    let mut rule = fx.marking_rule(adapters::INBOUND);
    rule.applies_to_children = true;
    fx.service.add_rule(&root, rule).unwrap();

    let mut tx = fx.begin();
    let docs = folder(&mut tx, &root, "docs");
    let configuration = fx.service.make_actionable(&mut tx, &docs).unwrap();
    tx.execute_pending_rules().unwrap();

    assert!(tx.nodes().has_aspect(&docs, &MARKER).unwrap());
    assert!(!tx.nodes().has_aspect(&configuration, &MARKER).unwrap());
}
