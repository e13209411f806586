/// One line of the field table.
#[derive(Debug, Clone)]
pub struct FieldRow {
    /// Dotted path, with `[i]` for list rows.
    pub path: String,
    pub kind: &'static str,
    pub dirty: bool,
    pub touched: bool,
    pub read_only: bool,
    pub errors: Vec<String>,
    pub value: serde_json::Value,
}

#[derive(Debug)]
pub struct FormReport {
    pub name: String,
    pub rows: Vec<FieldRow>,
    pub errors: Vec<String>,
    pub dirty: bool,
    pub valid: bool,
    /// What a save would send.
    pub payload: serde_json::Value,
}

#[derive(Debug)]
pub struct ReplayReport {
    pub name: String,
    /// Payloads in the order the coordinator sent them.
    pub saves: Vec<serde_json::Value>,
    pub saves_started: u64,
    pub last_error: Option<String>,
    /// Whether anything was left unsaved.
    pub dirty: bool,
}
