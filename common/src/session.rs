use crate::agent::GeneratedTables;
use crate::error::{DatagenError, Result};
use crate::table::Table;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MessageContent {
    Text(String),
    Table(Table),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

/// everything one user works with: the current dataset, the table being
/// edited and the question/answer history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    tables: IndexMap<String, Table>,
    selected_table: Option<String>,
    history: Vec<ChatMessage>,
}

impl Session {
    /// load a saved session; a missing file is a fresh session
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no saved session, starting fresh");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "session saved");
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// swap in a freshly generated dataset; failed tables become error
    /// markers and the first table is selected
    pub fn replace_tables(&mut self, generated: GeneratedTables) {
        self.tables = generated
            .into_iter()
            .map(|(name, outcome)| (name, Table::from_outcome(outcome)))
            .collect();
        self.selected_table = self.tables.keys().next().cloned();
    }

    pub fn tables(&self) -> &IndexMap<String, Table> {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn has_tables(&self) -> bool {
        !self.tables.is_empty()
    }

    pub fn select(&mut self, name: &str) -> Result<()> {
        if !self.tables.contains_key(name) {
            return Err(DatagenError::InvalidTable(format!("no table named {}", name)));
        }
        self.selected_table = Some(name.to_string());
        Ok(())
    }

    pub fn selected_table(&self) -> Option<(&str, &Table)> {
        let name = self.selected_table.as_deref()?;
        self.tables.get(name).map(|table| (name, table))
    }

    /// replace the rows of an existing table, keeping its position
    pub fn update_table(&mut self, name: &str, table: Table) -> Result<()> {
        match self.tables.get_mut(name) {
            Some(slot) => {
                *slot = table;
                Ok(())
            }
            None => Err(DatagenError::InvalidTable(format!("no table named {}", name))),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn push_message(&mut self, role: Role, content: MessageContent) {
        self.history.push(ChatMessage { role, content });
    }
}
