use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Compilation name used when a post has no title.
pub const UNTITLED: &str = "Untitled";

/// A user's compile request: a script body plus optional supporting classes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Post {
    #[serde(default)]
    pub title: Option<String>,
    /// Statements that become the body of `Eval`.
    #[serde(default)]
    pub content: String,
    /// Supporting type definitions, parsed as script code.
    #[serde(default)]
    pub classes: Option<String>,
}

impl Post {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: content.into(),
            classes: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_classes(mut self, classes: impl Into<String>) -> Self {
        self.classes = Some(classes.into());
        self
    }

    /// The title, or [`UNTITLED`] when it is missing or blank.
    pub fn compilation_name(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(UNTITLED)
    }

    pub fn classes_text(&self) -> &str {
        self.classes.as_deref().unwrap_or_default()
    }
}

/// JSON schema for [`Post`].
pub fn post_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(Post)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn name_defaults_to_untitled() {
        assert_eq!(Post::new("x").compilation_name(), "Untitled");
        assert_eq!(Post::new("x").with_title("").compilation_name(), "Untitled");
        assert_eq!(Post::new("x").with_title("  ").compilation_name(), "Untitled");
        assert_eq!(Post::new("x").with_title("t1").compilation_name(), "t1");
    }

    #[test]
    fn deserializes_with_missing_fields() {
        let post: Post = serde_json::from_str(r#"{"content":"return 1;"}"#).unwrap();
        assert_eq!(post.title, None);
        assert_eq!(post.classes_text(), "");
        assert_eq!(post.content, "return 1;");
    }

    #[test]
    fn schema_lists_fields() {
        let schema = serde_json::to_value(post_schema()).unwrap();
        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("title"));
        assert!(properties.contains_key("content"));
        assert!(properties.contains_key("classes"));
    }
}
