//! Integration tests for attaching and looking up rules

use ferrule_rules::builtin::adapters;

use crate::support::{Fixture, folder};

#[test]
fn new_node_has_no_rules() {
    let fx = Fixture::new();
    let node = fx.actionable_folder("docs");
    let tx = fx.begin();

    assert!(!fx.service.has_rules(&node));
    assert!(fx.service.get_rules(&tx, &node, true).unwrap().is_empty());
    assert!(fx.service.get_rule(&tx, &node, "missing").unwrap().is_none());
}

#[test]
fn added_rule_is_returned_by_id() {
    let fx = Fixture::new();
    let node = fx.actionable_folder("docs");
    let mut rule = fx.marking_rule(adapters::INBOUND);
    rule.title = "mark arrivals".to_string();
    fx.service.add_rule(&node, rule.clone()).unwrap();

    let tx = fx.begin();
    let found = fx.service.get_rule(&tx, &node, rule.id()).unwrap().unwrap();
    assert_eq!(found, rule);
    assert_eq!(found.title, "mark arrivals");
    assert_eq!(found.conditions().len(), 1);
    assert_eq!(found.actions().len(), 1);
    assert!(fx.service.has_rules(&node));
}

#[test]
fn adding_a_rule_twice_replaces_it() {
    let fx = Fixture::new();
    let node = fx.actionable_folder("docs");
    let mut rule = fx.marking_rule(adapters::INBOUND);
    fx.service.add_rule(&node, rule.clone()).unwrap();
    rule.description = "updated".to_string();
    fx.service.add_rule(&node, rule.clone()).unwrap();

    let tx = fx.begin();
    let rules = fx.service.get_rules(&tx, &node, false).unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].description, "updated");
}

#[test]
fn removed_rule_is_gone() {
    let fx = Fixture::new();
    let node = fx.actionable_folder("docs");
    let rule = fx.marking_rule(adapters::INBOUND);
    fx.service.add_rule(&node, rule.clone()).unwrap();

    assert!(fx.service.remove_rule(&node, &rule).unwrap());
    assert!(!fx.service.remove_rule(&node, &rule).unwrap());
    assert!(!fx.service.has_rules(&node));
}

#[test]
fn rules_are_visible_to_every_unit_of_work() {
    let fx = Fixture::new();
    let node = fx.actionable_folder("docs");
    let tx = fx.begin();
    let rule = fx.marking_rule(adapters::INBOUND);
    fx.service.add_rule(&node, rule.clone()).unwrap();

    assert!(fx.service.get_rule(&tx, &node, rule.id()).unwrap().is_some());
    assert!(fx.service.get_rule(&fx.begin(), &node, rule.id()).unwrap().is_some());
}

#[test]
fn inherited_rules_come_before_own_rules() {
    let fx = Fixture::new();
    let parent = fx.actionable_folder("parent");
    let mut tx = fx.begin();
    let child = folder(&mut tx, &parent, "child");
    fx.service.make_actionable(&mut tx, &child).unwrap();
    tx.commit().unwrap();

    let mut inherited = fx.marking_rule(adapters::INBOUND);
    inherited.applies_to_children = true;
    let private = fx.marking_rule(adapters::INBOUND);
    let own = fx.marking_rule(adapters::UPDATE);
    fx.service.add_rule(&parent, inherited.clone()).unwrap();
    fx.service.add_rule(&parent, private.clone()).unwrap();
    fx.service.add_rule(&child, own.clone()).unwrap();

    let tx = fx.begin();
    let all = fx.service.get_rules(&tx, &child, true).unwrap();
    assert_eq!(all, [inherited.clone(), own.clone()]);
    let direct = fx.service.get_rules(&tx, &child, false).unwrap();
    assert_eq!(direct, [own]);
}

#[test]
fn rules_by_type_include_inherited() {
    let fx = Fixture::new();
    let parent = fx.actionable_folder("parent");
    let mut tx = fx.begin();
    let child = folder(&mut tx, &parent, "child");
    tx.commit().unwrap();

    let mut inbound = fx.marking_rule(adapters::INBOUND);
    inbound.applies_to_children = true;
    let mut update = fx.marking_rule(adapters::UPDATE);
    update.applies_to_children = true;
    fx.service.add_rule(&parent, inbound.clone()).unwrap();
    fx.service.add_rule(&parent, update).unwrap();

    let tx = fx.begin();
    let inbound_type = fx.service.rule_type(adapters::INBOUND).unwrap();
    let found = fx.service.get_rules_by_type(&tx, &child, &inbound_type).unwrap();
    assert_eq!(found, [inbound]);
}
