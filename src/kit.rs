//! Kit layout: the ordered list of modules that make up one printed case

use crate::backend::{BackendClient, Module, ModuleKind, ModuleStatus, NewModule};
use crate::content::ContentEnvelope;
use crate::error::{KitError, Result};
use tracing::{debug, info};

pub const NEW_DOCUMENT_TITLE: &str = "New document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            _ => None,
        }
    }
}

pub struct KitLayout {
    case_id: String,
    modules: Vec<Module>,
    selected: Option<String>,
}

impl KitLayout {
    pub fn load_from(case_id: &str, modules: Vec<Module>) -> Self {
        let selected = modules.first().map(|m| m.id.clone());
        Self {
            case_id: case_id.to_string(),
            modules,
            selected,
        }
    }

    /// Fetch the modules of a case in their stored order. The first one starts selected.
    pub async fn load(client: &BackendClient, case_id: &str) -> Result<Self> {
        let modules = client.list_modules(case_id).await?;
        debug!(case = case_id, count = modules.len(), "Loaded kit layout");
        Ok(Self::load_from(case_id, modules))
    }

    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.id == id)
    }

    pub fn select(&mut self, id: &str) -> Result<&Module> {
        let index = self
            .position(id)
            .ok_or_else(|| KitError::NotFound(format!("module {}", id)))?;
        self.selected = Some(id.to_string());
        Ok(&self.modules[index])
    }

    pub fn selected(&self) -> Option<&Module> {
        let id = self.selected.as_deref()?;
        self.modules.iter().find(|m| m.id == id)
    }

    /// Insert a placeholder document at the end of the kit and select it.
    pub async fn add_document(&mut self, client: &BackendClient) -> Result<&Module> {
        let next_order = self
            .modules
            .iter()
            .map(|m| m.sort_order + 1)
            .max()
            .unwrap_or(0);
        let new = NewModule {
            case_id: self.case_id.clone(),
            title: NEW_DOCUMENT_TITLE.to_string(),
            kind: ModuleKind::Document,
            status: ModuleStatus::Draft,
            content: ContentEnvelope::placeholder().to_content_string(),
            sort_order: next_order,
        };
        let created = client.create_module(&new).await?;
        info!(case = %self.case_id, module = %created.id, "Added document");
        self.selected = Some(created.id.clone());
        self.modules.push(created);
        Ok(&self.modules[self.modules.len() - 1])
    }

    pub async fn remove(&mut self, client: &BackendClient, id: &str) -> Result<()> {
        let index = self
            .position(id)
            .ok_or_else(|| KitError::NotFound(format!("module {}", id)))?;
        client.delete_module(id).await?;
        self.modules.remove(index);
        if self.selected.as_deref() == Some(id) {
            self.selected = self.modules.first().map(|m| m.id.clone());
        }
        info!(module = id, "Deleted module");
        Ok(())
    }

    /// Swap a module with its neighbour. Moving past either end is a no-op;
    /// returns whether anything moved.
    pub fn move_item(&mut self, index: usize, direction: Direction) -> bool {
        let len = self.modules.len();
        match direction {
            Direction::Up if index > 0 && index < len => {
                self.modules.swap(index, index - 1);
                true
            }
            Direction::Down if index + 1 < len => {
                self.modules.swap(index, index + 1);
                true
            }
            _ => false,
        }
    }

    /// Write list positions back as `sort_order` for every module whose stored
    /// value differs. Returns how many rows were updated.
    pub async fn persist_order(&mut self, client: &BackendClient) -> Result<usize> {
        let mut updated = 0;
        for (index, module) in self.modules.iter_mut().enumerate() {
            let order = index as i32;
            if module.sort_order != order {
                client.update_module_order(&module.id, order).await?;
                module.sort_order = order;
                updated += 1;
            }
        }
        if updated > 0 {
            info!(case = %self.case_id, updated, "Saved kit order");
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, MockResponse};

    fn module(id: &str, order: i32) -> Module {
        Module {
            id: id.into(),
            case_id: "c1".into(),
            title: format!("Module {}", id),
            kind: ModuleKind::Document,
            status: ModuleStatus::Ready,
            content: None,
            description: None,
            sort_order: order,
            created_at: None,
        }
    }

    fn ids(layout: &KitLayout) -> Vec<&str> {
        layout.modules().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_move_item_edges_are_noops() {
        let mut layout = KitLayout::load_from("c1", vec![module("a", 0), module("b", 1), module("c", 2)]);
        assert!(!layout.move_item(0, Direction::Up));
        assert!(!layout.move_item(2, Direction::Down));
        assert!(!layout.move_item(7, Direction::Up));
        assert_eq!(ids(&layout), ["a", "b", "c"]);

        assert!(layout.move_item(2, Direction::Up));
        assert_eq!(ids(&layout), ["a", "c", "b"]);
        assert!(layout.move_item(0, Direction::Down));
        assert_eq!(ids(&layout), ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_persist_order_only_touches_moved_rows() {
        let server = serve(vec![MockResponse::json(204, ""), MockResponse::json(204, "")]);
        let client = BackendClient::new(&server.url, "k");

        let mut layout = KitLayout::load_from("c1", vec![module("a", 0), module("b", 1), module("c", 2)]);
        layout.move_item(1, Direction::Down);
        assert_eq!(layout.persist_order(&client).await.unwrap(), 2);
        assert_eq!(layout.modules()[1].sort_order, 1);

        let reqs = server.requests();
        assert_eq!(reqs.len(), 2);
        assert!(reqs[0].url.contains("id=eq.c"));
        assert_eq!(reqs[0].body_json()["sort_order"], 1);
        assert!(reqs[1].url.contains("id=eq.b"));
        assert_eq!(reqs[1].body_json()["sort_order"], 2);
    }

    #[tokio::test]
    async fn test_add_document_appends_placeholder_and_selects_it() {
        let server = serve(vec![MockResponse::json(
            201,
            r#"[{"id":"n1","case_id":"c1","title":"New document","type":"document","status":"draft","sort_order":2}]"#,
        )]);
        let client = BackendClient::new(&server.url, "k");

        let mut layout = KitLayout::load_from("c1", vec![module("a", 0), module("b", 1)]);
        let added = layout.add_document(&client).await.unwrap();
        assert_eq!(added.id, "n1");
        assert_eq!(layout.selected().map(|m| m.id.as_str()), Some("n1"));

        let body = server.requests()[0].body_json();
        assert_eq!(body["title"], NEW_DOCUMENT_TITLE);
        assert_eq!(body["type"], "document");
        assert_eq!(body["status"], "draft");
        assert_eq!(body["sort_order"], 2);
        let envelope = ContentEnvelope::parse(body["content"].as_str());
        assert_eq!(envelope, ContentEnvelope::placeholder());
    }

    #[tokio::test]
    async fn test_remove_reselects_first() {
        let server = serve(vec![MockResponse::json(204, "")]);
        let client = BackendClient::new(&server.url, "k");

        let mut layout = KitLayout::load_from("c1", vec![module("a", 0), module("b", 1)]);
        layout.select("b").unwrap();
        layout.remove(&client, "b").await.unwrap();
        assert_eq!(ids(&layout), ["a"]);
        assert_eq!(layout.selected().map(|m| m.id.as_str()), Some("a"));
        assert_eq!(server.requests()[0].method, "DELETE");
    }
}
