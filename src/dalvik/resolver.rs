//! Statement to instruction resolution over per-class instruction tables.
//!
//! Every class is stored as `<dir>/<class with '/' replaced by '_'>.json`,
//! holding `{ "<method>(<params>)<ret>": { "<line>": "<instruction>" } }`.
//! Tables are loaded at most once per resolver and shared between threads.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashMap;
use serde::Serialize;

use crate::Result;

/// Instructions of one class, keyed by method then line.
pub type ClassTable = HashMap<String, HashMap<String, String>>;

/// A statement resolved to its instruction text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionRecord {
    /// Class descriptor, `Lcom/app/Main;`.
    pub class: String,
    /// Method with signature, `onCreate(Landroid/os/Bundle;)V`.
    pub method: String,
    /// Instruction line within the method.
    pub line: i64,
    /// Instruction text, with a neighbouring `move-result` spliced in.
    pub text: String,
}

/// A statement split into its class, method and line parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementRef<'a> {
    /// Class descriptor without the trailing `;`.
    pub class: &'a str,
    /// Method with signature.
    pub method: &'a str,
    /// Instruction line.
    pub line: i64,
}

impl<'a> StatementRef<'a> {
    /// Splits `Lpkg/Cls;->method(Params)Ret(line)`.
    #[must_use]
    pub fn parse(statement: &'a str) -> Option<StatementRef<'a>> {
        let (class, rest) = statement.split_once(";->")?;
        let (method, line) = rest.rsplit_once('(')?;
        let line = line.strip_suffix(')')?.trim().parse().ok()?;
        Some(StatementRef {
            class,
            method,
            line,
        })
    }

    /// File stem of the table holding this class.
    #[must_use]
    pub fn table_key(&self) -> String {
        self.class.replace('/', "_")
    }
}

/// Resolves statements against instruction tables in an application directory
/// and an optional framework directory.
///
/// ```rust,no_run
/// use taintpath::dalvik::InstructionResolver;
///
/// let resolver = InstructionResolver::new("classes").with_framework_dir("framework_classes");
/// if let Some(record) = resolver.resolve("Lcom/app/Main;->onCreate(Landroid/os/Bundle;)V(4)")? {
///     println!("{}", record.text);
/// }
/// # Ok::<(), taintpath::Error>(())
/// ```
#[derive(Debug)]
pub struct InstructionResolver {
    app_dir: PathBuf,
    framework_dir: Option<PathBuf>,
    classes: DashMap<String, Option<Arc<ClassTable>>>,
}

impl InstructionResolver {
    /// Creates a resolver reading tables from `app_dir`.
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        InstructionResolver {
            app_dir: app_dir.into(),
            framework_dir: None,
            classes: DashMap::new(),
        }
    }

    /// Adds a fallback directory for framework classes.
    #[must_use]
    pub fn with_framework_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.framework_dir = Some(dir.into());
        self
    }

    /// Number of classes looked up so far, including misses.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.classes.len()
    }

    /// Eagerly loads every `*.json` table in `dir`. Classes already cached are kept.
    ///
    /// Returns the number of tables loaded.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be read or a table is not valid JSON.
    pub fn preload_dir(&self, dir: &Path) -> Result<usize> {
        let mut loaded = 0;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if self.classes.contains_key(key) {
                continue;
            }

            let table = read_table(&path)?;
            self.classes.insert(key.to_string(), Some(Arc::new(table)));
            loaded += 1;
        }

        log::debug!("Preloaded {} instruction tables from {}", loaded, dir.display());
        Ok(loaded)
    }

    /// Returns the table for a class key, loading it on first use.
    ///
    /// # Errors
    /// Returns an error if an existing table file cannot be read or parsed.
    pub fn table(&self, key: &str) -> Result<Option<Arc<ClassTable>>> {
        if let Some(entry) = self.classes.get(key) {
            return Ok(entry.value().clone());
        }

        let entry = self
            .classes
            .entry(key.to_string())
            .or_try_insert_with(|| self.load(key))?;
        Ok(entry.value().clone())
    }

    fn load(&self, key: &str) -> Result<Option<Arc<ClassTable>>> {
        let file = format!("{key}.json");
        for dir in std::iter::once(&self.app_dir).chain(self.framework_dir.as_ref()) {
            let path = dir.join(&file);
            if path.is_file() {
                return Ok(Some(Arc::new(read_table(&path)?)));
            }
        }

        log::debug!("No instruction table for {}", key);
        Ok(None)
    }

    /// Resolves a statement to its instruction.
    ///
    /// Returns `Ok(None)` when the statement does not parse or its class, method or
    /// line is absent from the tables. A `move-result` on the resolved line, or on
    /// the line right after it, is spliced as `move-result vX=<invoke ...>`.
    ///
    /// # Errors
    /// Returns an error if a table exists but cannot be read or parsed.
    pub fn resolve(&self, statement: &str) -> Result<Option<InstructionRecord>> {
        let Some(stmt) = StatementRef::parse(statement) else {
            return Ok(None);
        };
        let Some(table) = self.table(&stmt.table_key())? else {
            return Ok(None);
        };
        let Some(code) = table.get(stmt.method) else {
            return Ok(None);
        };
        let Some(text) = code.get(&stmt.line.to_string()) else {
            return Ok(None);
        };

        Ok(Some(InstructionRecord {
            class: format!("{};", stmt.class),
            method: stmt.method.to_string(),
            line: stmt.line,
            text: splice_move_result(code, stmt.line, text),
        }))
    }
}

fn read_table(path: &Path) -> Result<ClassTable> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

fn splice_move_result(code: &HashMap<String, String>, line: i64, text: &str) -> String {
    if text.contains("move-result") {
        if let Some(previous) = code.get(&(line - 1).to_string()) {
            return format!("{text}={previous}");
        }
    } else if let Some(next) = code.get(&(line + 1).to_string()) {
        if next.contains("move-result") {
            return format!("{next}={text}");
        }
    }
    text.to_string()
}
