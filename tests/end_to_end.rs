//! Whole-pipeline scenarios over small hand-written logs.

use std::{fs, path::Path, sync::Arc};

use taintpath::{
    events::{parse_descriptor, TaintLog},
    graph::{close_graphs, Interner, Node},
    paths::{deduplicate, FlowPath, PathStep},
    prelude::*,
};

const X: &str = "Lcom/app/Main;->onCreate(Landroid/os/Bundle;)V(3)";
const MID: &str = "Lcom/app/Main;->mid()V(5)";
const Y: &str = "Lcom/app/Main;->leak()V(7)";

fn sequential() -> ExtractConfig {
    ExtractConfig {
        parallel: false,
        ..ExtractConfig::default()
    }
}

fn logcat(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| format!("10-19 12:00:00.000  4242  4242 I System.out: {line}"))
        .collect()
}

fn straight_log() -> Vec<String> {
    logcat(&[
        format!("SourceFound: {X}id(10)"),
        format!("SinkFound: {Y}, Landroid/util/Log;->i(Ljava/lang/String;Ljava/lang/String;)I"),
        format!("DumpTaint-5: ->{Y}id(12)->left->{MID}id(11)"),
        format!("DumpTaint-5: ->{MID}id(11)->left->{X}id(10)"),
        format!("DumpTaint-5: ->{X}id(10)->left->STARTPATH(10)"),
    ])
}

fn write_tables(dir: &Path) {
    fs::write(
        dir.join("Lcom_app_Main.json"),
        r#"{
            "onCreate(Landroid/os/Bundle;)V": {
                "3": "invoke-virtual {v1}, Landroid/telephony/TelephonyManager;->getDeviceId()Ljava/lang/String;",
                "4": "move-result-object v0"
            },
            "mid()V": { "5": "iput-object v0, p0, Lcom/app/Main;->id:Ljava/lang/String;" },
            "leak()V": { "7": "invoke-static {v2, v0}, Landroid/util/Log;->i(Ljava/lang/String;Ljava/lang/String;)I" }
        }"#,
    )
    .unwrap();
}

fn statements(path: &FlowPath) -> Vec<&str> {
    path.statements().collect()
}

#[test]
fn straight_flow_yields_one_ordered_path() {
    let extractor = PathExtractor::new(sequential());
    let paths = extractor.paths(&extractor.reconstruct(TaintLog::from_lines(straight_log())));

    assert_eq!(paths.len(), 1);
    assert_eq!(statements(&paths[0]), vec![X, MID, Y]);
    assert_eq!(paths[0].len(), 3);
    assert!(!paths[0].divergent);
    assert_eq!(paths[0].source.time, 10);
    assert_eq!(paths[0].sink.time, 12);
}

#[test]
fn straight_flow_is_written_to_disk() -> taintpath::Result<()> {
    let classes = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;
    write_tables(classes.path());

    let log_file = out.path().join("log.txt");
    fs::write(&log_file, straight_log().join("\n"))?;

    let resolver = InstructionResolver::new(classes.path());
    let report = PathExtractor::new(sequential()).run(&log_file, &resolver, out.path())?;
    assert_eq!(report.lines, 5);
    assert_eq!(report.paths, 1);
    assert_eq!(report.dropped_statements, 0);
    assert_eq!(report.unsupported_instructions, 0);

    let path = fs::read_to_string(out.path().join("paths").join("path_1_5_10_12.csv"))?;
    let rows: Vec<&str> = path.lines().collect();
    assert_eq!(rows[0], "index,method,line,statement");
    assert_eq!(rows.len(), 4);
    assert!(rows[1].contains("v0 = virtualinvoke v1.<android.telephony.TelephonyManager: java.lang.String getDeviceId()>()"));
    assert!(rows[2].contains("p0.<com.app.Main: java.lang.String id> = v0"));
    assert!(rows[3].starts_with("2,<com.app.Main: void leak()>,7,"));

    let summary = fs::read_to_string(out.path().join("sources_sinks.csv"))?;
    let mut lines = summary.lines();
    assert_eq!(
        lines.next(),
        Some("path,source_stmt,source_detail,sink_stmt,sink_detail,src_instance,sink_instance,length")
    );
    let row = lines.next().unwrap();
    assert!(row.starts_with("path_1_5_10_12,"));
    assert!(row.ends_with(",10,12,3"));
    assert!(lines.next().is_none());
    Ok(())
}

#[test]
fn closure_takes_the_latest_fragment_of_a_node() {
    let n = "La;->n()V(1)";
    let log = TaintLog::from_lines(logcat(&[
        format!("DumpTaint-0: ->{n}id(11)->left->La;->a()V(0)id(10)"),
        format!("DumpTaint-1: ->La;->y()V(2)id(12)->left->{n}id(11)"),
        format!("DumpTaint-2: ->{n}id(11)->left->La;->a()V(0)id(10)->right->La;->b()V(0)id(9)"),
    ]));

    let closed = close_graphs(log.graphs, &log.cache, false);
    let graph = closed.get(1).unwrap();
    let n_lines: Vec<_> = graph.iter().filter(|l| &*l.node.statement == n).collect();
    assert_eq!(n_lines.len(), 1);
    assert_eq!(n_lines[0].right.as_ref().map(|r| r.time), Some(9));
}

#[test]
fn closure_is_idempotent() {
    let log = TaintLog::from_lines(straight_log());
    let cache = log.cache;
    let once = close_graphs(log.graphs, &cache, false);
    let twice = close_graphs(once.clone(), &cache, true);

    for (id, lines) in once.iter() {
        assert_eq!(twice.get(id).unwrap(), lines);
    }
}

#[test]
fn parcel_nodes_are_replaced_by_the_nested_flow() {
    let log = TaintLog::from_lines(logcat(&[
        "SourceFound: La;->src()V(0)id(10)".to_string(),
        "DumpTaint for parcel: 7".to_string(),
        "DumpTaint-7: ->La;->write()V(2)id(11)->left->La;->src()V(0)id(10)".to_string(),
        "DumpTaint-7: ->La;->src()V(0)id(10)->left->STARTPATH(10)".to_string(),
        "SinkFound: La;->read()V(4), Landroid/util/Log;->i()I".to_string(),
        "DumpTaint-5: ->La;->read()V(4)id(50)->left->7(-2)id(49)".to_string(),
        "DumpTaint-5: ->7(-2)id(49)->left->STARTPATH(49)".to_string(),
    ]));

    let extractor = PathExtractor::new(sequential());
    let reconstruction = extractor.reconstruct(log);
    assert_eq!(reconstruction.graphs.ids(), &[5]);
    assert_eq!(reconstruction.splice.inlined, 1);

    let paths = extractor.paths(&reconstruction);
    assert_eq!(paths.len(), 1);
    assert_eq!(
        statements(&paths[0]),
        vec!["La;->src()V(0)", "La;->write()V(2)", "La;->read()V(4)"]
    );
    assert!(paths
        .iter()
        .flat_map(|p| p.statements())
        .all(|s| !s.contains("(-2)")));
}

fn candidate(first: &str, rest: &[&str], sink_time: i64) -> FlowPath {
    let steps: Vec<PathStep> = std::iter::once(first)
        .chain(rest.iter().copied())
        .enumerate()
        .map(|(i, s)| PathStep {
            statement: Arc::from(s),
            time: 10 + i as i64,
        })
        .collect();
    FlowPath {
        graph: 1,
        source: Node::new(10, Arc::from(first)),
        sink: Node::new(sink_time, Arc::from(*rest.last().unwrap_or(&first))),
        steps,
        divergent: false,
    }
}

#[test]
fn shared_first_statement_keeps_the_shorter_path() {
    let long = candidate("La;->x()V(0)", &["La;->a()V(1)", "La;->b()V(2)", "La;->y()V(3)"], 13);
    let short = candidate("La;->x()V(0)", &["La;->y()V(3)"], 11);

    let kept = deduplicate(vec![long, short.clone()], true);
    assert_eq!(kept, vec![short]);
}

#[test]
fn deduplication_is_idempotent_on_pipeline_output() {
    let extractor = PathExtractor::new(sequential());
    let paths = extractor.paths(&extractor.reconstruct(TaintLog::from_lines(straight_log())));
    assert_eq!(deduplicate(paths.clone(), true), paths);
}

#[test]
fn empty_log_writes_header_only_summary() -> taintpath::Result<()> {
    let out = tempfile::tempdir()?;
    let resolver = InstructionResolver::new(out.path().join("none"));
    let report = PathExtractor::new(ExtractConfig::default()).run_log(
        TaintLog::from_lines(Vec::<String>::new()),
        &resolver,
        out.path(),
    )?;

    assert_eq!(report.graphs, 0);
    assert_eq!(report.paths, 0);
    let summary = fs::read_to_string(out.path().join("sources_sinks.csv"))?;
    assert_eq!(summary.lines().count(), 1);
    assert_eq!(fs::read_dir(out.path().join("paths"))?.count(), 0);
    Ok(())
}

#[test]
fn empty_file_on_disk_is_accepted() -> taintpath::Result<()> {
    let dir = tempfile::tempdir()?;
    let log_file = dir.path().join("empty.log");
    fs::write(&log_file, "")?;

    let log = TaintLog::from_file(&log_file)?;
    assert_eq!(log.stats.lines, 0);
    assert!(log.graphs.is_empty());
    Ok(())
}

#[test]
fn no_emitted_step_predates_its_source() {
    let log = TaintLog::from_lines(logcat(&[
        format!("SourceFound: {X}id(10)"),
        format!("SinkFound: {Y}, Landroid/util/Log;->i()I"),
        format!("DumpTaint-5: ->{Y}id(12)->left->{MID}id(5)"),
        format!("DumpTaint-5: ->{MID}id(5)->left->{X}id(10)"),
        format!("DumpTaint-5: ->{X}id(10)->left->STARTPATH(10)"),
    ]));

    let out = tempfile::tempdir().unwrap();
    let resolver = InstructionResolver::new(out.path().join("none"));
    let report = PathExtractor::new(sequential())
        .run_log(log, &resolver, out.path())
        .unwrap();
    assert_eq!(report.causal_violations, 1);
    assert_eq!(report.paths, 0);
}

#[test]
fn merging_flows_mark_the_path_divergent() {
    let log = TaintLog::from_lines(logcat(&[
        "SourceFound: La;->x()V(0)id(10)".to_string(),
        "SinkFound: La;->y()V(3), Landroid/util/Log;->i()I".to_string(),
        "DumpTaint-5: ->La;->y()V(3)id(13)->left->La;->a()V(1)id(11)->right->La;->b()V(2)id(12)".to_string(),
        "DumpTaint-5: ->La;->a()V(1)id(11)->left->La;->x()V(0)id(10)".to_string(),
        "DumpTaint-5: ->La;->b()V(2)id(12)->left->La;->x()V(0)id(10)".to_string(),
        "DumpTaint-5: ->La;->x()V(0)id(10)->left->STARTPATH(10)".to_string(),
    ]));

    let extractor = PathExtractor::new(sequential());
    let paths = extractor.paths(&extractor.reconstruct(log));
    assert_eq!(paths.len(), 1);
    assert!(paths[0].divergent);
    assert_eq!(
        statements(&paths[0]),
        vec!["La;->x()V(0)", "La;->a()V(1)", "La;->b()V(2)", "La;->y()V(3)"]
    );
}

#[test]
fn node_identity_is_stable_across_parses() {
    let mut interner = Interner::new();
    let a = parse_descriptor(&format!("{MID}id(11)"), &mut interner).unwrap();
    let b = parse_descriptor(&format!("{MID}id(11)"), &mut interner).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.time, 11);
    assert_eq!(&*a.statement, MID);
    assert!(Arc::ptr_eq(&a.statement, &b.statement));
}
