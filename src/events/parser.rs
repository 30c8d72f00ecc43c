//! Line-level parsing of taint log records.
//!
//! Recognized payloads (after an optional logcat `System.out: ` prefix):
//!
//! ```text
//! DumpTaint-<graph>: -><node>->left-><left>[->right-><right>]
//! DumpTaint for parcel: <graph>
//! DumpTaint for file: <graph>
//! … SourceFound: <statement>id(<time>)
//! … SourceFound: <statement>, <source api>
//! … SourceFound: <class>->injectTaintSeedIfReflectiveSource(<line>), <target>
//! … SinkFound: <statement>, <sink api>
//! ```
//!
//! Node descriptors are `<statement>id(<time>)` or `STARTPATH(<time>)`.

use crate::{
    events::{Event, Parsed},
    graph::{Fragment, GraphId, Interner, Node, ROOT_STATEMENT},
};

const LOGCAT_PREFIX: &str = "System.out: ";
const DUMP_MARKER: &str = "DumpTaint-";
const PARCEL_MARKERS: [&str; 2] = ["DumpTaint for parcel: ", "DumpTaint for file: "];
const SOURCE_MARKER: &str = "SourceFound: ";
const SINK_MARKER: &str = "SinkFound: ";
const REFLECTIVE_MARKER: &str = "injectTaintSeedIfReflectiveSource";
const INSTANCE_DELIMITER: &str = "id(";

/// Parses one log line.
///
/// The statement text of every produced node is interned through `interner`, so
/// parsing the same line twice yields equal, storage-sharing identities.
pub fn parse_line(line: &str, interner: &mut Interner) -> Parsed {
    let payload = line
        .split_once(LOGCAT_PREFIX)
        .map_or(line, |(_, payload)| payload)
        .trim_end();

    for marker in PARCEL_MARKERS {
        if let Some((_, id)) = payload.split_once(marker) {
            return match id.trim().parse::<GraphId>() {
                Ok(id) => Parsed::Event(Event::ParcelMarker(id)),
                Err(_) => Parsed::Malformed("unparsable parcel graph id"),
            };
        }
    }

    if let Some((_, tail)) = payload.split_once(DUMP_MARKER) {
        return parse_dump(tail, interner);
    }

    if let Some((_, body)) = payload.split_once(SINK_MARKER) {
        return match body.split_once(", ") {
            Some((statement, detail)) => Parsed::Event(Event::SinkFound {
                statement: interner.intern(statement.trim()),
                detail: detail.trim().to_string(),
            }),
            None => Parsed::Malformed("sink record without detail"),
        };
    }

    if let Some((_, body)) = payload.split_once(SOURCE_MARKER) {
        return parse_source(payload, body, interner);
    }

    Parsed::Ignored
}

fn parse_dump(tail: &str, interner: &mut Interner) -> Parsed {
    let Some((id, record)) = tail.split_once(": ->") else {
        return Parsed::Malformed("dump record without node delimiter");
    };
    let Ok(graph) = id.parse::<GraphId>() else {
        return Parsed::Malformed("unparsable dump graph id");
    };
    let Some((node, preds)) = record.split_once("->left->") else {
        return Parsed::Malformed("dump record without left successor");
    };
    let (left, right) = match preds.split_once("->right->") {
        Some((left, right)) => (left, Some(right)),
        None => (preds, None),
    };

    let Some(node) = parse_descriptor(node, interner) else {
        return Parsed::Malformed("unparsable node descriptor");
    };
    let Some(left) = parse_descriptor(left, interner) else {
        return Parsed::Malformed("unparsable left descriptor");
    };
    let right = match right {
        Some(text) => match parse_descriptor(text, interner) {
            Some(right) => Some(right),
            None => return Parsed::Malformed("unparsable right descriptor"),
        },
        None => None,
    };

    Parsed::Event(Event::DumpNode {
        graph,
        fragment: Fragment::new(node, left, right),
    })
}

fn parse_source(payload: &str, body: &str, interner: &mut Interner) -> Parsed {
    if payload.contains(REFLECTIVE_MARKER) {
        let class_name = payload
            .split("->")
            .next()
            .and_then(|head| head.split_whitespace().last());
        let target = payload.split_whitespace().last();
        return match (class_name, target) {
            (Some(class_name), Some(target)) if class_name != target => {
                Parsed::Event(Event::ReflectiveSource {
                    class_name: dotted_class(class_name),
                    target: target.to_string(),
                })
            }
            _ => Parsed::Malformed("reflective source without target"),
        };
    }

    let body = body.trim();
    if let Some((statement, time)) = body.rsplit_once(")id(") {
        let Some(time) = parse_time(time) else {
            return Parsed::Malformed("unparsable source instance id");
        };
        let statement = format!("{statement})");
        return Parsed::Event(Event::SourceFound {
            statement: interner.intern(&statement),
            detail: None,
            instance: Some(time),
        });
    }

    match body.split_once(", ") {
        Some((statement, detail)) => Parsed::Event(Event::SourceFound {
            statement: interner.intern(statement.trim()),
            detail: Some(detail.trim().to_string()),
            instance: None,
        }),
        None => Parsed::Malformed("source record without detail"),
    }
}

/// `Lcom/app/Main;` and `com/app/Main` both become `com.app.Main`.
fn dotted_class(text: &str) -> String {
    let name = text
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
        .unwrap_or(text);
    name.replace('/', ".")
}

/// Parses a node descriptor: `STARTPATH(<time>)` or `<statement>id(<time>)`.
///
/// The statement is split off at the last `id(`, statements themselves may contain
/// the sequence (`Lcom/app/Ids;->id(I)V(3)id(42)`).
pub fn parse_descriptor(text: &str, interner: &mut Interner) -> Option<Node> {
    let text = text.trim();

    if let Some((_, time)) = text.split_once("STARTPATH(") {
        return Some(Node::new(parse_time(time)?, interner.intern(ROOT_STATEMENT)));
    }

    let (statement, time) = text.rsplit_once(INSTANCE_DELIMITER)?;
    if statement.is_empty() {
        return None;
    }
    Some(Node::new(parse_time(time)?, interner.intern(statement)))
}

fn parse_time(text: &str) -> Option<i64> {
    let digits = text.split(')').next()?;
    digits.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn node(time: i64, statement: &str) -> Node {
        Node::new(time, Arc::from(statement))
    }

    fn parse(line: &str) -> Parsed {
        parse_line(line, &mut Interner::new())
    }

    #[test]
    fn dump_line_with_logcat_prefix() {
        let line = "03-11 10:00:00.000  1234  1234 I System.out: DumpTaint-5: ->La/B;->c()V(3)id(12)->left->La/B;->b()V(2)id(11)";
        let Parsed::Event(Event::DumpNode { graph, fragment }) = parse(line) else {
            panic!("expected dump node");
        };
        assert_eq!(graph, 5);
        assert_eq!(fragment.node, node(12, "La/B;->c()V(3)"));
        assert_eq!(fragment.left, node(11, "La/B;->b()V(2)"));
        assert!(fragment.right.is_none());
    }

    #[test]
    fn dump_line_with_right_and_root() {
        let line = "DumpTaint-7: ->La/B;->add(II)I(4)id(30)->left->STARTPATH(29)->right->La/B;->x()I(1)id(20)";
        let Parsed::Event(Event::DumpNode { graph, fragment }) = parse(line) else {
            panic!("expected dump node");
        };
        assert_eq!(graph, 7);
        assert!(fragment.left.is_root());
        assert_eq!(fragment.left.time, 29);
        assert_eq!(fragment.right, Some(node(20, "La/B;->x()I(1)")));
    }

    #[test]
    fn statement_containing_id_splits_at_last_delimiter() {
        let mut interner = Interner::new();
        let n = parse_descriptor("Lcom/app/Ids;->id(I)V(3)id(42)", &mut interner).unwrap();
        assert_eq!(n.time, 42);
        assert_eq!(&*n.statement, "Lcom/app/Ids;->id(I)V(3)");
    }

    #[test]
    fn reparsing_yields_equal_identity() {
        let mut interner = Interner::new();
        let line = "DumpTaint-1: ->La;->a()V(0)id(2)->left->STARTPATH(1)";
        let first = parse_line(line, &mut interner);
        let second = parse_line(line, &mut interner);
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_dump_lines() {
        assert!(matches!(parse("DumpTaint-path-3: ->x"), Parsed::Malformed(_)));
        assert!(matches!(parse("DumpTaint-3 x"), Parsed::Malformed(_)));
        assert!(matches!(parse("DumpTaint-3: ->La;->a()V(0)id(2)"), Parsed::Malformed(_)));
        assert!(matches!(
            parse("DumpTaint-3: ->La;->a()V(0)id(x)->left->STARTPATH(1)"),
            Parsed::Malformed(_)
        ));
        assert!(matches!(
            parse("DumpTaint-3: ->La;->a()V(0)id(2)->left->STARTPATH(1)->right->garbage"),
            Parsed::Malformed(_)
        ));
    }

    #[test]
    fn parcel_markers() {
        assert_eq!(
            parse("I System.out: DumpTaint for parcel: 77"),
            Parsed::Event(Event::ParcelMarker(77))
        );
        assert_eq!(
            parse("DumpTaint for file: 78"),
            Parsed::Event(Event::ParcelMarker(78))
        );
        assert!(matches!(parse("DumpTaint for file: x"), Parsed::Malformed(_)));
    }

    #[test]
    fn sink_record() {
        let line = "PathTaint: SinkFound: Lcom/app/Main;->leak()V(7), Landroid/util/Log;->i(Ljava/lang/String;Ljava/lang/String;)I";
        assert_eq!(
            parse(line),
            Parsed::Event(Event::SinkFound {
                statement: Arc::from("Lcom/app/Main;->leak()V(7)"),
                detail: "Landroid/util/Log;->i(Ljava/lang/String;Ljava/lang/String;)I".into(),
            })
        );
        assert!(matches!(parse("SinkFound: nothing"), Parsed::Malformed(_)));
    }

    #[test]
    fn source_records() {
        assert_eq!(
            parse("PathTaint: SourceFound: Lcom/app/Main;->onCreate()V(3)id(10)"),
            Parsed::Event(Event::SourceFound {
                statement: Arc::from("Lcom/app/Main;->onCreate()V(3)"),
                detail: None,
                instance: Some(10),
            })
        );
        assert_eq!(
            parse("PathTaint: SourceFound: com.app.Main->onCreate(21), Landroid/telephony/TelephonyManager;->getDeviceId()Ljava/lang/String;"),
            Parsed::Event(Event::SourceFound {
                statement: Arc::from("com.app.Main->onCreate(21)"),
                detail: Some("Landroid/telephony/TelephonyManager;->getDeviceId()Ljava/lang/String;".into()),
                instance: None,
            })
        );
    }

    #[test]
    fn reflective_source() {
        let line = "PathTaint: SourceFound: com.app.Main->injectTaintSeedIfReflectiveSource(40), Lcom/app/Secret;->get()Ljava/lang/String;";
        assert_eq!(
            parse(line),
            Parsed::Event(Event::ReflectiveSource {
                class_name: "com.app.Main".into(),
                target: "Lcom/app/Secret;->get()Ljava/lang/String;".into(),
            })
        );

        let descriptor = "SourceFound: Lcom/app/Main;->injectTaintSeedIfReflectiveSource(40), Lcom/app/Secret;->get()Ljava/lang/String;";
        match parse(descriptor) {
            Parsed::Event(Event::ReflectiveSource { class_name, .. }) => {
                assert_eq!(class_name, "com.app.Main");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unrelated_lines_are_ignored() {
        assert_eq!(parse("I ActivityManager: Start proc"), Parsed::Ignored);
        assert_eq!(parse(""), Parsed::Ignored);
    }
}
