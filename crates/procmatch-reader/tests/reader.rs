//! Reader integration: description translation rules and the full
//! read-project-analyze pipeline.

use std::io::Write;

use procmatch_core::{
    projection, ActionTable, BasicRole, ChoiceKind, Comparator, Multiplicity, NodeKind, Relation,
};
use procmatch_reader::{build_tree, parse_action_list, resolve_actions, ProcessDescription};

fn description(json: &str) -> ProcessDescription {
    serde_json::from_str(json).expect("valid description")
}

fn comm(kind: &str, op: &str, name: &str) -> String {
    format!(
        r#"{{"kind": "{kind}", "role": "seller", "partner_link_type": "ordering", "operation": "{op}", "name": "{name}"}}"#
    )
}

#[test]
fn sequence_children_are_ranked_in_document_order() {
    let json = format!(
        r#"{{"name": "p", "activity": {{"kind": "sequence", "activities": [{}, {}]}}}}"#,
        comm("receive", "order", "a"),
        comm("reply", "confirm", "b")
    );
    let built = build_tree(&description(&json));
    let mut tree = built.tree;
    tree.determine_process_type();

    assert_eq!(tree.receives().len(), 1);
    assert_eq!(tree.replies().len(), 1);
    let a = tree.basic_order()[0];
    let b = tree.basic_order()[1];
    assert_eq!(tree.relation_between(a, b), Some(Relation::Seq1));
}

#[test]
fn internal_pick_wraps_branches_with_their_receives() {
    let json = format!(
        r#"{{"name": "p", "activity": {{
            "kind": "pick",
            "on_message": [
                {{"role": "seller", "partner_link_type": "ordering", "operation": "order", "name": "on-order",
                  "activity": {comm_ship}}},
                {{"role": "seller", "partner_link_type": "ordering", "operation": "cancel", "name": "on-cancel",
                  "activity": {comm_refund}}}
            ]
        }}}}"#,
        comm_ship = comm("invoke", "ship", "ship"),
        comm_refund = comm("invoke", "refund", "refund")
    );
    let built = build_tree(&description(&json));
    let tree = &built.tree;

    // pick node with one sequence wrapper per branch
    let pick = tree
        .descendants(tree.root())
        .into_iter()
        .find(|&n| matches!(tree.node(n).kind(), NodeKind::Xor(ChoiceKind::Internal)))
        .expect("pick node");
    let branches = tree.children(pick);
    assert_eq!(branches.len(), 2);
    for branch in &branches {
        assert_eq!(tree.node(*branch).kind(), NodeKind::Sequence);
        let children = tree.children(*branch);
        assert_eq!(children.len(), 2);
        assert_eq!(
            tree.node(children[0]).basic_role(),
            Some(BasicRole::Receive)
        );
    }
    // two branch receives plus two invokes
    assert_eq!(tree.receives().len(), 2);
    assert_eq!(tree.invokes().len(), 2);
}

#[test]
fn external_pick_drops_the_receives() {
    let json = format!(
        r#"{{"name": "p", "activity": {{
            "kind": "pick",
            "status": "exor",
            "on_message": [
                {{"role": "seller", "partner_link_type": "ordering", "operation": "order", "activity": {0}}},
                {{"role": "seller", "partner_link_type": "ordering", "operation": "cancel", "activity": {1}}}
            ]
        }}}}"#,
        comm("invoke", "ship", "ship"),
        comm("invoke", "refund", "refund")
    );
    let built = build_tree(&description(&json));
    let tree = &built.tree;

    let pick = tree
        .descendants(tree.root())
        .into_iter()
        .find(|&n| matches!(tree.node(n).kind(), NodeKind::Xor(ChoiceKind::External)))
        .expect("pick node");
    // branch activities connect straight to the choice
    let branches = tree.children(pick);
    assert_eq!(branches.len(), 2);
    assert!(tree.receives().is_empty());
    assert_eq!(tree.invokes().len(), 2);
}

#[test]
fn loops_mark_their_body_arbitrary_and_survive_projection() {
    let json = format!(
        r#"{{"name": "p", "activity": {{"kind": "sequence", "activities": [
            {},
            {{"kind": "while", "name": "retry", "activity": {}}}
        ]}}}}"#,
        comm("receive", "order", "start"),
        comm("invoke", "poll", "poll")
    );
    let built = build_tree(&description(&json));
    let mut tree = built.tree;

    let poll = tree
        .invokes()
        .iter()
        .copied()
        .next()
        .expect("poll invoke");
    assert_eq!(tree.node(poll).multiplicity(), Multiplicity::Arbitrary);

    let lp = tree.parent(poll).expect("loop node");
    assert!(tree.node(lp).is_loop_origin());

    // a projection with no actions keeps the singleton loop wrapper
    projection::apply(&mut tree, &ActionTable::new());
    assert!(tree.contains(lp));

    tree.determine_process_type();
    let start = tree
        .receives()
        .iter()
        .copied()
        .next()
        .expect("start receive");
    assert_eq!(tree.relation_between(start, poll), Some(Relation::Seq1));
}

#[test]
fn scopes_are_transparent() {
    let json = format!(
        r#"{{"name": "p", "activity": {{"kind": "sequence", "activities": [
            {{"kind": "scope", "name": "wrapper", "activity": {}}},
            {}
        ]}}}}"#,
        comm("receive", "order", "a"),
        comm("reply", "confirm", "b")
    );
    let built = build_tree(&description(&json));
    let tree = &built.tree;

    // no node for the scope: the receive sits directly under the sequence
    let a = tree.receives().iter().copied().next().expect("receive");
    let parent = tree.parent(a).expect("parent");
    assert_eq!(tree.node(parent).kind(), NodeKind::Sequence);
    assert_eq!(tree.node(a).rank(), 1);
}

#[test]
fn links_become_control_edges_and_unresolved_links_are_skipped() {
    let json = format!(
        r#"{{"name": "p",
            "links": [
                {{"source": "a", "target": "b"}},
                {{"source": "a", "target": "ghost"}}
            ],
            "activity": {{"kind": "flow", "activities": [{}, {}]}}}}"#,
        comm("invoke", "first", "a"),
        comm("invoke", "second", "b")
    );
    let built = build_tree(&description(&json));
    let mut tree = built.tree;
    assert_eq!(tree.control_links().len(), 1);

    tree.determine_process_type();
    let a = tree.basic_order()[0];
    let b = tree.basic_order()[1];
    // the link sequentializes what the flow alone would leave parallel
    assert_eq!(tree.relation_between(a, b), Some(Relation::Seq1));
}

#[test]
fn full_pipeline_with_action_files() {
    let p1_json = format!(
        r#"{{"name": "outsourced", "activity": {{"kind": "sequence", "activities": [
            {},
            {{"kind": "flow", "name": "extras", "activities": [{}, {}]}},
            {}
        ]}}}}"#,
        comm("receive", "order", "start"),
        comm("invoke", "audit", "audit"),
        comm("invoke", "archive", "archive"),
        comm("reply", "confirm", "done")
    );
    let p2_json = format!(
        r#"{{"name": "original", "activity": {{"kind": "sequence", "activities": [{}, {}]}}}}"#,
        comm("receive", "order", "start"),
        comm("reply", "confirm", "done")
    );

    let built1 = build_tree(&description(&p1_json));
    let built2 = build_tree(&description(&p2_json));

    // write the action list to a file, as the application would read it
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "hide extras").expect("write actions");
    let actions = procmatch_reader::read_action_table(file.path(), &built1).expect("readable");
    assert_eq!(actions.len(), 1);

    let mut t1 = built1.tree;
    let mut t2 = built2.tree;
    projection::apply(&mut t1, &actions);
    t1.determine_process_type();
    t2.determine_process_type();

    let cmp = Comparator::new(&t1, &t2).expect("analyzed");
    assert!(cmp.matches_exactly());
    assert!(cmp.is_plugin_for_other());
}

#[test]
fn aggregate_directive_flows_through_resolution() {
    let json = format!(
        r#"{{"name": "p", "activity": {{"kind": "sequence", "activities": [
            {{"kind": "sequence", "name": "collect", "activities": [{}, {}]}},
            {}
        ]}}}}"#,
        comm("receive", "part1", "p1"),
        comm("receive", "part2", "p2"),
        comm("invoke", "process", "go")
    );
    let built = build_tree(&description(&json));

    let text = "\
aggregate collect
{\"kind\": \"receive\", \"role\": \"seller\", \"partner_link_type\": \"ordering\", \"operation\": \"parts\"}
";
    let directives = parse_action_list(text).expect("valid list");
    let actions = resolve_actions(directives, &built);
    assert_eq!(actions.len(), 1);

    let mut tree = built.tree;
    projection::apply(&mut tree, &actions);
    assert_eq!(tree.receives().len(), 1);
    assert_eq!(tree.invokes().len(), 1);

    tree.determine_process_type();
    let parts = tree.receives().iter().copied().next().expect("receive");
    let go = tree.invokes().iter().copied().next().expect("invoke");
    assert_eq!(tree.relation_between(parts, go), Some(Relation::Seq1));
}

#[test]
fn unresolvable_action_references_are_skipped() {
    let json = format!(
        r#"{{"name": "p", "activity": {}}}"#,
        comm("invoke", "only", "only")
    );
    let built = build_tree(&description(&json));
    let directives = parse_action_list("hide nonexistent\n").expect("valid list");
    let actions = resolve_actions(directives, &built);
    assert!(actions.is_empty());
}
