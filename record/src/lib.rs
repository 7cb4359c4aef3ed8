//! The JSON shape handed to tree widgets: one [`TreeRecord`] per exported node.

use serde::{Deserialize, Serialize};

/// Replaces `\n` in node payloads so every label stays on a single line.
pub const LINE_BREAK: &str = "<br>";

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Icon {
    #[serde(rename = "fas fa-file")]
    File,
    #[serde(rename = "far fa-folder")]
    Folder,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct State {
    pub opened: bool,
}

// NOTE: only ever serialized by the exporter, `Deserialize` is for reading output back
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct TreeRecord {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeRecord>>,
    pub data: String,
    pub icon: Icon,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
}

impl TreeRecord {
    pub fn leaf(text: impl Into<String>, data: impl Into<String>, id: u64) -> Self {
        TreeRecord {
            text: text.into(),
            children: None,
            data: data.into(),
            icon: Icon::File,
            id,
            state: None,
        }
    }

    /// Turns this record into a folder. An empty `children` keeps it a file, so
    /// `icon == Folder` iff there is at least one child.
    pub fn with_children(mut self, children: Vec<TreeRecord>) -> Self {
        if children.is_empty() {
            self.children = None;
            self.icon = Icon::File;
        } else {
            self.children = Some(children);
            self.icon = Icon::Folder;
        }
        self
    }

    /// Marks the record as the expanded root of the widget.
    pub fn opened(mut self) -> Self {
        self.state = Some(State { opened: true });
        self
    }

    pub fn is_opened(&self) -> bool {
        matches!(self.state, Some(State { opened: true }))
    }

    pub fn children(&self) -> &[TreeRecord] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Pre-order walk over this record and all its descendants.
    pub fn iter(&self) -> impl Iterator<Item = &TreeRecord> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children().iter().rev());
            Some(next)
        })
    }

    pub fn node_count(&self) -> usize {
        self.iter().count()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaf_has_no_children_or_state() {
        let leaf = TreeRecord::leaf("a", "hello", 2);
        assert_eq!(
            json!({"text": "a", "data": "hello", "icon": "fas fa-file", "id": 2}),
            serde_json::to_value(&leaf).unwrap()
        );
    }

    #[test]
    fn opened_folder() {
        let root = TreeRecord::leaf("root", "", 1)
            .with_children(vec![TreeRecord::leaf("b", "", 2)])
            .opened();
        assert_eq!(
            json!({
                "text": "root",
                "children": [{"text": "b", "data": "", "icon": "fas fa-file", "id": 2}],
                "data": "",
                "icon": "far fa-folder",
                "id": 1,
                "state": {"opened": true},
            }),
            serde_json::to_value(&root).unwrap()
        );
        assert!(root.is_opened());
        assert!(!root.children()[0].is_opened());
    }

    #[test]
    fn no_children_stays_a_file() {
        let rec = TreeRecord::leaf("x", "", 3).with_children(vec![]);
        assert_eq!(Icon::File, rec.icon);
        assert_eq!(None, rec.children);
    }

    #[test]
    fn field_order() {
        let root = TreeRecord::leaf("r", "d", 1)
            .with_children(vec![TreeRecord::leaf("c", "", 2)])
            .opened();
        let text = serde_json::to_string(&root).unwrap();
        let pos = |key: &str| text.find(&format!("\"{}\":", key)).unwrap();
        assert!(pos("text") < pos("children"));
        assert!(pos("children") < pos("data"));
        assert!(pos("icon") < pos("id"));
        assert!(text.ends_with(r#""state":{"opened":true}}"#));
    }

    #[test]
    fn preorder_walk() {
        let tree = TreeRecord::leaf("r", "", 1).with_children(vec![
            TreeRecord::leaf("a", "", 2)
                .with_children(vec![TreeRecord::leaf("aa", "", 4)]),
            TreeRecord::leaf("b", "", 3),
        ]);
        let names: Vec<_> = tree.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(vec!["r", "a", "aa", "b"], names);
        assert_eq!(4, tree.node_count());
    }

    #[test]
    fn parses_back() {
        let text = r#"{"text":"r","data":"","icon":"far fa-folder","id":1,
            "state":{"opened":true},
            "children":[{"text":"a","data":"x","icon":"fas fa-file","id":2}]}"#;
        let rec: TreeRecord = serde_json::from_str(text).unwrap();
        assert!(rec.is_opened());
        assert_eq!(Icon::Folder, rec.icon);
        assert_eq!("a", rec.children()[0].text);
    }
}
