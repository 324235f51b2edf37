//! End-to-end scenarios: call-site issues, recursion, scheduling
//! determinism, and unresolved-callee policy.

mod common;

use common::{single_block, BackwardSemantics, ForwardSemantics, TestInstruction};
use pretty_assertions::assert_eq;
use taintgraph_engine::{
    AccessPath, AnalysisConfig, Frame, Interners, Model, Root, SimpleProgram, TaintAnalysis,
    UnresolvedCalleePolicy,
};

/// `A` calls `B`; `B` sinks its first argument for kind `K`; `A` passes a
/// `K`-tainted value. One scheduling round must record the issue at the
/// `A -> B` call site with distance 1.
#[test]
fn test_source_to_sink_across_call() {
    let interners = Interners::new();
    let a = interners.method("A");
    let b = interners.method("B");
    let kind = interners.named_kind("K");

    let mut program = SimpleProgram::new();
    program.add_method(
        a,
        single_block(vec![
            TestInstruction::Source { dst: 0, kind: "K" },
            TestInstruction::Call {
                index: 7,
                callee: "B",
                args: vec![0],
                ret: None,
            },
        ]),
    );
    program.add_method(b, single_block(vec![]));
    program.add_call(a, b);

    let analysis = TaintAnalysis::new(
        &program,
        &ForwardSemantics,
        &BackwardSemantics,
        &interners,
        AnalysisConfig::default(),
    );

    // B's sink comes from the rule set, seeded as a declared model.
    let mut sink_model = Model::empty(b);
    sink_model.add_sink(AccessPath::argument(0), Frame::leaf(kind));
    analysis.seed_model(sink_model);

    let summary = analysis.run().unwrap();

    assert!(summary.converged);
    assert_eq!(summary.issues, 1);

    let model = analysis.registry().get(a);
    let issues: Vec<_> = model.issues().iter().collect();
    assert_eq!(issues.len(), 1);
    let issue = issues[0];
    assert_eq!(issue.callee(), b);
    assert_eq!(issue.call_index(), 7);
    assert_eq!(issue.sink_port(), &AccessPath::argument(0));
    assert_eq!(issue.source_kind(), kind);
    assert_eq!(issue.sink_kind(), kind);
    assert_eq!(issue.distance(), 1);
}

/// Self-recursive `C` with a source at its return: the analysis must
/// converge within the round budget without growing any tree beyond the
/// configured height.
#[test]
fn test_self_recursion_converges_with_bounded_trees() {
    let interners = Interners::new();
    let c = interners.method("C");

    // C builds an unbounded recursive structure:
    //   r0 = source K; r1 = C(); r0.next = r1; return r0
    let mut program = SimpleProgram::new();
    program.add_method(
        c,
        single_block(vec![
            TestInstruction::Source { dst: 0, kind: "K" },
            TestInstruction::Call {
                index: 0,
                callee: "C",
                args: vec![],
                ret: Some(1),
            },
            TestInstruction::PutField {
                dst: 0,
                field: "next",
                src: 1,
            },
            TestInstruction::Return { src: 0 },
        ]),
    );
    program.add_call(c, c);

    let height = 3;
    let config = AnalysisConfig {
        maximum_tree_height: height,
        maximum_port_size: height,
        ..AnalysisConfig::default()
    };

    let analysis = TaintAnalysis::new(
        &program,
        &ForwardSemantics,
        &BackwardSemantics,
        &interners,
        config.clone(),
    );
    let summary = analysis.run().unwrap();

    assert!(summary.converged, "recursion must reach a fixpoint");
    assert!(summary.rounds < config.maximum_global_rounds);

    let model = analysis.registry().get(c);
    let generations = model.generations().read_root(Root::Return);
    assert!(!generations.is_bottom());
    assert!(
        generations.height() <= height,
        "tree height {} exceeds the bound {}",
        generations.height(),
        height
    );

    // The source is visible at the return port.
    let kind = interners.named_kind("K");
    assert!(generations
        .read_taint(&taintgraph_engine::Path::new())
        .frame(kind)
        .is_some());
}

fn layered_program(interners: &Interners) -> SimpleProgram<TestInstruction> {
    // E <-> D mutual recursion generating a recursive structure; B and C
    // relay it; A sinks both flows through S.
    let names = ["A", "B", "C", "D", "E", "S"];
    let ids: Vec<_> = names.iter().map(|&name| interners.method(name)).collect();
    let [a, b, c, d, e, s] = [ids[0], ids[1], ids[2], ids[3], ids[4], ids[5]];

    let mut program = SimpleProgram::new();
    program.add_method(
        e,
        single_block(vec![
            TestInstruction::Source { dst: 0, kind: "K" },
            TestInstruction::Call {
                index: 0,
                callee: "D",
                args: vec![],
                ret: Some(1),
            },
            TestInstruction::PutField {
                dst: 0,
                field: "next",
                src: 1,
            },
            TestInstruction::Return { src: 0 },
        ]),
    );
    program.add_method(
        d,
        single_block(vec![
            TestInstruction::Call {
                index: 0,
                callee: "E",
                args: vec![],
                ret: Some(0),
            },
            TestInstruction::Return { src: 0 },
        ]),
    );
    program.add_method(
        b,
        single_block(vec![
            TestInstruction::Call {
                index: 0,
                callee: "D",
                args: vec![],
                ret: Some(0),
            },
            TestInstruction::Return { src: 0 },
        ]),
    );
    program.add_method(
        c,
        single_block(vec![
            TestInstruction::Source { dst: 0, kind: "K2" },
            TestInstruction::Return { src: 0 },
        ]),
    );
    program.add_method(
        a,
        single_block(vec![
            TestInstruction::Call {
                index: 0,
                callee: "B",
                args: vec![],
                ret: Some(0),
            },
            TestInstruction::Call {
                index: 1,
                callee: "C",
                args: vec![],
                ret: Some(1),
            },
            TestInstruction::Call {
                index: 2,
                callee: "S",
                args: vec![0],
                ret: None,
            },
            TestInstruction::Call {
                index: 3,
                callee: "S",
                args: vec![1],
                ret: None,
            },
        ]),
    );
    program.add_method(s, single_block(vec![]));

    program.add_call(e, d);
    program.add_call(d, e);
    program.add_call(b, d);
    program.add_call(a, b);
    program.add_call(a, c);
    program.add_call(a, s);

    program
}

fn run_layered(interners: &Interners, workers: usize) -> (Vec<taintgraph_engine::ModelDto>, bool) {
    let program = layered_program(interners);
    let s = interners.method("S");

    let config = AnalysisConfig::default().with_worker_count(workers);
    let analysis = TaintAnalysis::new(
        &program,
        &ForwardSemantics,
        &BackwardSemantics,
        interners,
        config,
    );

    let mut sink_model = Model::empty(s);
    sink_model.add_sink(AccessPath::argument(0), Frame::leaf(interners.named_kind("K")));
    sink_model.add_sink(AccessPath::argument(0), Frame::leaf(interners.named_kind("K2")));
    analysis.seed_model(sink_model);

    let summary = analysis.run().unwrap();
    (analysis.export_models(), summary.converged)
}

/// The final registry contents must not depend on the worker count.
#[test]
fn test_thread_count_does_not_change_results() {
    let interners = Interners::new();

    let (sequential, converged_one) = run_layered(&interners, 1);
    assert!(converged_one);
    assert!(!sequential.is_empty());

    for workers in [2, 4, 8] {
        let (parallel, converged) = run_layered(&interners, workers);
        assert!(converged);
        assert_eq!(sequential, parallel, "worker_count = {}", workers);
    }

    // Both flows reached the sink.
    let a_model = sequential.iter().find(|model| model.method == "A").unwrap();
    assert_eq!(a_model.issues.len(), 2);
}

/// A callee without any model reads as bottom: no effect, no error.
#[test]
fn test_missing_callee_model_reads_as_bottom() {
    let interners = Interners::new();
    let a = interners.method("A");

    let mut program = SimpleProgram::new();
    program.add_method(
        a,
        single_block(vec![
            TestInstruction::Call {
                index: 0,
                callee: "External",
                args: vec![],
                ret: Some(0),
            },
            TestInstruction::Return { src: 0 },
        ]),
    );

    let analysis = TaintAnalysis::new(
        &program,
        &ForwardSemantics,
        &BackwardSemantics,
        &interners,
        AnalysisConfig::default(),
    );
    let summary = analysis.run().unwrap();

    assert!(summary.converged);
    assert!(analysis.registry().get(a).is_empty());
}

/// The unresolved-callee policy is a configuration decision: assume-tainted
/// marks the call's result, skip-call ignores it.
#[test]
fn test_unresolved_callee_policy() {
    for (policy, expect_taint) in [
        (UnresolvedCalleePolicy::SkipCall, false),
        (UnresolvedCalleePolicy::AssumeTainted, true),
    ] {
        let interners = Interners::new();
        let a = interners.method("A");

        let mut program = SimpleProgram::new();
        program.add_method(
            a,
            single_block(vec![
                TestInstruction::Call {
                    index: 0,
                    callee: "Unknown",
                    args: vec![],
                    ret: Some(0),
                },
                TestInstruction::Return { src: 0 },
            ]),
        );

        let config = AnalysisConfig::default().with_unresolved_callee_policy(policy);
        let analysis = TaintAnalysis::new(
            &program,
            &ForwardSemantics,
            &BackwardSemantics,
            &interners,
            config,
        );
        let summary = analysis.run().unwrap();
        assert!(summary.converged);

        let model = analysis.registry().get(a);
        assert_eq!(
            !model.generations().is_bottom(),
            expect_taint,
            "policy {:?}",
            policy
        );
    }
}

/// Methods marked skip-analysis keep their declared model untouched.
#[test]
fn test_skip_analysis_preserves_declared_model() {
    let interners = Interners::new();
    let a = interners.method("A");
    let kind = interners.named_kind("K");

    let mut program = SimpleProgram::new();
    // The body would infer a generation, but the mode wins.
    program.add_method(
        a,
        single_block(vec![
            TestInstruction::Source { dst: 0, kind: "K" },
            TestInstruction::Return { src: 0 },
        ]),
    );

    let analysis = TaintAnalysis::new(
        &program,
        &ForwardSemantics,
        &BackwardSemantics,
        &interners,
        AnalysisConfig::default(),
    );

    let mut declared = Model::empty(a);
    let mut modes = taintgraph_engine::Modes::default();
    modes.skip_analysis = true;
    declared.set_modes(modes);
    declared.add_sink(AccessPath::argument(0), Frame::leaf(kind));
    analysis.seed_model(declared.clone());

    let summary = analysis.run().unwrap();
    assert!(summary.converged);

    let model = analysis.registry().get(a);
    assert_eq!(*model, declared);
    assert!(model.generations().is_bottom());
}
