use serde::Serialize;
use taintpath::dalvik::{translate, ThreeAddress};

use crate::{
    app::GlobalOptions,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
pub struct Translation {
    pub instruction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsupported: Option<String>,
}

pub fn run(instructions: &[String], opts: &GlobalOptions) -> anyhow::Result<()> {
    let translations: Vec<Translation> = instructions
        .iter()
        .map(|insn| {
            let (statement, unsupported) = match translate(insn) {
                ThreeAddress::Statement(s) => (Some(s), None),
                ThreeAddress::Unsupported(m) => (None, Some(m)),
            };
            Translation {
                instruction: insn.clone(),
                statement,
                unsupported,
            }
        })
        .collect();

    print_output(&translations, opts, |translations| {
        let mut tw = TabWriter::new(vec![
            ("Instruction", Align::Left),
            ("Three-address", Align::Left),
        ]);
        for t in translations {
            let lowered = match (&t.statement, &t.unsupported) {
                (Some(s), _) => s.clone(),
                (None, Some(m)) => format!("unsupported {m}"),
                (None, None) => String::new(),
            };
            tw.row(vec![t.instruction.clone(), lowered]);
        }
        tw.print();
    })
}
