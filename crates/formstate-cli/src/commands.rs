use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use formstate_core::{
    AutoSaveCoordinator, ChildState, ObjectConfig, ObjectState, SetOptions, Value,
};
use formstate_model::ConfigSpec;
use futures::executor::LocalPool;
use tracing::{debug, info, info_span};

use crate::cli::{CheckArgs, DiffArgs, ReplayArgs};
use crate::types::{FieldRow, FormReport, ReplayReport};

/// A configuration file turned into runtime configuration.
pub struct LoadedConfig {
    pub name: String,
    pub config: Rc<ObjectConfig>,
}

pub fn load_config(path: &Path) -> Result<LoadedConfig> {
    let spec = ConfigSpec::from_path(path)
        .with_context(|| format!("load form configuration {}", path.display()))?;
    debug!(name = %spec.name, fields = spec.root.fields.len(), "configuration loaded");
    Ok(LoadedConfig {
        config: Rc::new(ObjectConfig::from(&spec.root)),
        name: spec.name,
    })
}

pub fn load_document(path: &Path) -> Result<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read document {}", path.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parse document {}", path.display()))?;
    if !json.is_object() {
        bail!("{} must contain a JSON object", path.display());
    }
    Ok(Value::from_json(json))
}

fn build_form(loaded: &LoadedConfig, document: Value) -> Result<ObjectState> {
    ObjectState::from_value(Rc::clone(&loaded.config), document)
        .with_context(|| format!("build form state for `{}`", loaded.name))
}

pub fn run_check(args: &CheckArgs) -> Result<FormReport> {
    let loaded = load_config(&args.config.config)?;
    let span = info_span!("check", form = %loaded.name);
    let _guard = span.enter();

    let form = build_form(&loaded, load_document(&args.document)?)?;
    // Surface every message, the way a submit button would.
    let valid = form.can_save();
    info!(valid, "document checked");
    Ok(report(&loaded.name, &form))
}

pub fn run_diff(args: &DiffArgs) -> Result<FormReport> {
    let loaded = load_config(&args.config.config)?;
    let span = info_span!("diff", form = %loaded.name);
    let _guard = span.enter();

    let form = build_form(&loaded, load_document(&args.original)?)?;
    let edited = load_document(&args.edited)?;
    form.set_with(edited, SetOptions::new().with_auto_save(false))
        .with_context(|| format!("apply {}", args.edited.display()))?;
    info!(dirty = form.dirty(), "edit applied");
    Ok(report(&loaded.name, &form))
}

/// Apply each edit with auto-save bound to an in-memory backend that echoes
/// the payload back as a refresh, the way a server round trip would.
pub fn run_replay(args: &ReplayArgs) -> Result<ReplayReport> {
    let loaded = load_config(&args.config.config)?;
    let span = info_span!("replay", form = %loaded.name);
    let _guard = span.enter();

    let form = build_form(&loaded, load_document(&args.original)?)?;
    let edits = args
        .edits
        .iter()
        .map(|path| load_document(path))
        .collect::<Result<Vec<_>>>()?;

    let mut pool = LocalPool::new();
    let coordinator = AutoSaveCoordinator::new(pool.spawner());
    let sent = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&sent);
    form.enable_auto_save(&coordinator, move |form| {
        let log = Rc::clone(&log);
        async move {
            let payload = form.changed_value();
            info!(payload = %payload, "save");
            log.borrow_mut().push(payload.to_json());
            form.set_with(payload, SetOptions::refresh())?;
            Ok::<_, anyhow::Error>(())
        }
    });

    for (path, edit) in args.edits.iter().zip(edits) {
        form.set(edit)
            .with_context(|| format!("apply {}", path.display()))?;
        if !args.burst {
            pool.run_until_stalled();
        }
    }
    pool.run_until_stalled();

    let saves = sent.borrow().clone();
    Ok(ReplayReport {
        name: loaded.name,
        saves,
        saves_started: coordinator.saves_started(),
        last_error: coordinator.last_error(),
        dirty: form.dirty(),
    })
}

/// Snapshot the form's derived state for printing.
pub fn report(name: &str, form: &ObjectState) -> FormReport {
    let mut rows = Vec::new();
    collect_rows(form, "", &mut rows);
    FormReport {
        name: name.to_string(),
        rows,
        errors: form.errors(),
        dirty: form.dirty(),
        valid: form.valid(),
        payload: form.changed_value().to_json(),
    }
}

fn collect_rows(object: &ObjectState, prefix: &str, rows: &mut Vec<FieldRow>) {
    for (key, child) in object.children() {
        let path = format!("{prefix}{key}");
        match child {
            ChildState::Value(field) => rows.push(FieldRow {
                path,
                kind: "value",
                dirty: field.dirty(),
                touched: field.touched(),
                read_only: field.read_only(),
                errors: field.errors(),
                value: field.value().to_json(),
            }),
            ChildState::Object(nested) => {
                rows.push(FieldRow {
                    path: path.clone(),
                    kind: "object",
                    dirty: nested.dirty(),
                    touched: nested.touched(),
                    read_only: nested.read_only(),
                    errors: Vec::new(),
                    value: if nested.is_set() {
                        serde_json::Value::String("{..}".into())
                    } else {
                        nested.value().to_json()
                    },
                });
                collect_rows(nested, &format!("{path}."), rows);
            }
            ChildState::List(list) => {
                rows.push(FieldRow {
                    path: path.clone(),
                    kind: "list",
                    dirty: list.dirty(),
                    touched: list.touched(),
                    read_only: list.read_only(),
                    errors: Vec::new(),
                    value: serde_json::Value::String(format!("{} rows", list.len())),
                });
                for (index, row) in list.rows().iter().enumerate() {
                    collect_rows(row, &format!("{path}[{index}]."), rows);
                }
            }
            ChildState::Fragment(fragment) => rows.push(FieldRow {
                path,
                kind: "fragment",
                dirty: false,
                touched: false,
                read_only: false,
                errors: Vec::new(),
                value: fragment.value().to_json(),
            }),
        }
    }
}
