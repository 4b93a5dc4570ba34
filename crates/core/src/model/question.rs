use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a single input on a question page is rendered and answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Checkbox,
    Radio,
    Binary,
    Freetext,
}

impl InputKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Binary => "binary",
            Self::Freetext => "freetext",
        }
    }
}

/// One selectable option of a `radio` or `checkbox` input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub value: String,
    pub label: String,
}

/// A single input rendered on a question page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionInput {
    #[serde(rename = "type")]
    kind: InputKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    options: Vec<AnswerOption>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl QuestionInput {
    #[must_use]
    pub fn new(kind: InputKind) -> Self {
        Self {
            kind,
            label: None,
            options: Vec::new(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_option(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.push(AnswerOption {
            value: value.into(),
            label: label.into(),
        });
        self
    }

    #[must_use]
    pub fn kind(&self) -> InputKind {
        self.kind
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    /// Attributes not modelled explicitly, preserved as loaded.
    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// A static question page from the catalog.
///
/// `name` is the key answers are recorded under. The remaining attributes are
/// rendered to clients as-is; anything not modelled here is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    name: String,
    #[serde(default)]
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(default, rename = "questions")]
    inputs: Vec<QuestionInput>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Question {
    #[must_use]
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            hint: None,
            inputs: Vec::new(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn with_input(mut self, input: QuestionInput) -> Self {
        self.inputs.push(input);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    #[must_use]
    pub fn inputs(&self) -> &[QuestionInput] {
        &self.inputs
    }

    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}
