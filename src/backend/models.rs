use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Editing,
    ReadyToPrint,
    Distributed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Editing => "editing",
            CaseStatus::ReadyToPrint => "ready_to_print",
            CaseStatus::Distributed => "distributed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "editing" => Some(CaseStatus::Editing),
            "ready_to_print" => Some(CaseStatus::ReadyToPrint),
            "distributed" => Some(CaseStatus::Distributed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub theme: String,
    pub status: CaseStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub copies_sold: i64,
}

impl Case {
    /// Case-insensitive match on title or theme, plus an optional status.
    pub fn matches(&self, search: &str, status: Option<CaseStatus>) -> bool {
        let needle = search.trim().to_lowercase();
        let text_ok = needle.is_empty()
            || self.title.to_lowercase().contains(&needle)
            || self.theme.to_lowercase().contains(&needle);
        text_ok && status.map_or(true, |s| s == self.status)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCase {
    pub title: String,
    pub theme: String,
    pub status: CaseStatus,
}

/// Printable unit category. Unknown values from the table read as `Document`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Envelope,
    Map,
    Lab,
    #[serde(other)]
    Document,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Envelope => "envelope",
            ModuleKind::Document => "document",
            ModuleKind::Map => "map",
            ModuleKind::Lab => "lab",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "envelope" => Some(ModuleKind::Envelope),
            "document" => Some(ModuleKind::Document),
            "map" => Some(ModuleKind::Map),
            "lab" => Some(ModuleKind::Lab),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    Ready,
    Incomplete,
    #[serde(other)]
    Draft,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Draft => "draft",
            ModuleStatus::Ready => "ready",
            ModuleStatus::Incomplete => "incomplete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ModuleStatus::Draft),
            "ready" => Some(ModuleStatus::Ready),
            "incomplete" => Some(ModuleStatus::Incomplete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub case_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    pub status: ModuleStatus,
    /// Serialized content envelope (see `content::envelope`)
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewModule {
    pub case_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    pub status: ModuleStatus,
    pub content: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CodeStatus {
    Active,
    Used,
    Expired,
}

impl CodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeStatus::Active => "active",
            CodeStatus::Used => "used",
            CodeStatus::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CodeStatus::Active),
            "used" => Some(CodeStatus::Used),
            "expired" => Some(CodeStatus::Expired),
            _ => None,
        }
    }
}

/// Activation code printed inside a kit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Code {
    pub id: String,
    pub code: String,
    pub case_name: String,
    #[serde(default)]
    pub case_id: Option<String>,
    pub status: CodeStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub used_at: Option<String>,
}

impl Code {
    /// Case-insensitive match on code or case name, plus an optional status.
    pub fn matches(&self, search: &str, status: Option<CodeStatus>) -> bool {
        let needle = search.trim().to_lowercase();
        let text_ok = needle.is_empty()
            || self.code.to_lowercase().contains(&needle)
            || self.case_name.to_lowercase().contains(&needle);
        text_ok && status.map_or(true, |s| s == self.status)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewCode {
    pub code: String,
    pub case_name: String,
    pub status: CodeStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Detective,
    Lab,
    Archivist,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Detective => "detective",
            AgentType::Lab => "lab",
            AgentType::Archivist => "archivist",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "detective" => Some(AgentType::Detective),
            "lab" => Some(AgentType::Lab),
            "archivist" => Some(AgentType::Archivist),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
    Learning,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
            AgentStatus::Learning => "learning",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AgentStatus::Active),
            "inactive" => Some(AgentStatus::Inactive),
            "learning" => Some(AgentStatus::Learning),
            _ => None,
        }
    }
}

/// In-game chat persona players talk to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub status: AgentStatus,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub last_interaction: Option<String>,
}

/// Partial update; `None` fields are left out of the PATCH body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<AgentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_interaction: Option<String>,
}
