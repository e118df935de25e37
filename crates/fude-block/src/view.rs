//! What a block shows, and which node types get a controller.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use fude_doc::Node;
use fude_markup::{MarkupConverter, RichSpan};
use fude_types::{AI_BLOCK, NodeId, Phase};
use strum::Display;

use crate::controller::BlockController;
use crate::credential::CredentialStore;
use crate::schema::from_attrs;

/// Heading shown above the prompt field.
pub const TITLE: &str = "Type what you want to insert";

/// A control the block offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum Action {
    Generate,
    Edit,
    Insert,
    Discard,
}

/// A control with its label and whether it can be used right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionState {
    pub action: Action,
    pub label: String,
    pub enabled: bool,
}

impl ActionState {
    fn new(action: Action, enabled: bool) -> Self {
        Self {
            action,
            label: action.to_string(),
            enabled,
        }
    }
}

/// Phase-dependent part of the view.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewBody {
    /// Prompt entry, also shown while a generation runs.
    Prompt {
        prompt: String,
        /// The credential field; never echoed back in full.
        credential_set: bool,
        generating: bool,
    },
    /// The generated response rendered for review.
    Review { spans: Vec<RichSpan> },
}

/// Render model of one block.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockView {
    pub node: NodeId,
    pub title: &'static str,
    /// Text that was selected when the block was inserted, if any.
    pub selected_text: Option<String>,
    pub body: ViewBody,
    pub error: Option<String>,
    pub actions: Vec<ActionState>,
}

impl BlockView {
    pub(crate) fn build(controller: &BlockController, converter: &MarkupConverter) -> Self {
        let selected = controller.selected_text();
        let selected_text = (!selected.is_empty()).then(|| selected.to_string());

        let (body, actions) = match controller.phase() {
            Phase::Reviewing => (
                ViewBody::Review {
                    spans: converter.preview(controller.response_draft()),
                },
                vec![
                    ActionState::new(Action::Insert, true),
                    ActionState::new(Action::Edit, true),
                    ActionState::new(Action::Discard, true),
                ],
            ),
            phase => {
                let generating = phase == Phase::Generating;
                let mut generate = ActionState::new(
                    Action::Generate,
                    !generating && !controller.prompt_draft().trim().is_empty(),
                );
                if generating {
                    generate.label = "Generating...".to_string();
                }
                (
                    ViewBody::Prompt {
                        prompt: controller.prompt_draft().to_string(),
                        credential_set: !controller.credential().is_empty(),
                        generating,
                    },
                    vec![generate, ActionState::new(Action::Discard, true)],
                )
            }
        };

        Self {
            node: controller.node(),
            title: TITLE,
            selected_text,
            body,
            error: controller.error_message().map(str::to_string),
            actions,
        }
    }

    pub fn action(&self, action: Action) -> Option<&ActionState> {
        self.actions.iter().find(|a| a.action == action)
    }

    pub fn is_enabled(&self, action: Action) -> bool {
        self.action(action).is_some_and(|a| a.enabled)
    }
}

impl fmt::Display for BlockView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "┌ {}", self.title)?;
        if let Some(selected) = &self.selected_text {
            writeln!(f, "│ selected: {selected}")?;
        }
        match &self.body {
            ViewBody::Prompt {
                prompt,
                credential_set,
                ..
            } => {
                writeln!(f, "│ prompt: {prompt}")?;
                let key = if *credential_set { "set" } else { "not set" };
                writeln!(f, "│ api key: {key}")?;
            }
            ViewBody::Review { spans } => {
                let text: String = spans.iter().map(|s| s.text.as_str()).collect();
                for line in text.lines() {
                    writeln!(f, "│ {line}")?;
                }
            }
        }
        if let Some(error) = &self.error {
            writeln!(f, "│ {error}")?;
        }
        let buttons: Vec<String> = self
            .actions
            .iter()
            .map(|a| {
                if a.enabled {
                    format!("[{}]", a.label)
                } else {
                    format!("({})", a.label)
                }
            })
            .collect();
        write!(f, "└ {}", buttons.join(" "))
    }
}

/// Everything a controller factory may need.
#[derive(Clone)]
pub struct ViewContext {
    pub store: Arc<dyn CredentialStore>,
    pub converter: Arc<MarkupConverter>,
}

/// Builds a controller for an existing node.
pub type ControllerFactory = fn(&Node, &ViewContext) -> BlockController;

/// Node type name → controller factory.
#[derive(Clone, Default)]
pub struct NodeViewRegistry {
    factories: HashMap<String, ControllerFactory>,
}

impl fmt::Debug for NodeViewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeViewRegistry")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NodeViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the AI block registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(AI_BLOCK, ai_block_controller);
        registry
    }

    pub fn register(&mut self, node_type: impl Into<String>, factory: ControllerFactory) {
        self.factories.insert(node_type.into(), factory);
    }

    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Controller for `node`, if its type is registered.
    pub fn create(&self, node: &Node, ctx: &ViewContext) -> Option<BlockController> {
        self.factories.get(&node.kind).map(|factory| factory(node, ctx))
    }
}

fn ai_block_controller(node: &Node, ctx: &ViewContext) -> BlockController {
    BlockController::new(
        node.id,
        from_attrs(&node.attrs),
        Arc::clone(&ctx.store),
        Arc::clone(&ctx.converter),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::MemoryCredentialStore;
    use crate::schema::{block_schema, insert_ai_block};
    use fude_doc::{EditorCommands, MemoryEditor};
    use fude_types::{BlockAttributes, GenerationError};

    fn ctx() -> ViewContext {
        ViewContext {
            store: Arc::new(MemoryCredentialStore::new()),
            converter: Arc::new(MarkupConverter::default()),
        }
    }

    fn controller() -> BlockController {
        let node = Node::element(AI_BLOCK)
            .with_attrs(BlockAttributes::with_selected_text("foo bar").to_json_map());
        NodeViewRegistry::with_defaults().create(&node, &ctx()).unwrap()
    }

    #[test]
    fn registry_only_knows_registered_types() {
        let registry = NodeViewRegistry::with_defaults();
        assert!(registry.create(&Node::paragraph("x"), &ctx()).is_none());
        assert_eq!(registry.node_types().collect::<Vec<_>>(), vec![AI_BLOCK]);
    }

    #[test]
    fn editing_view_has_title_selection_and_disabled_generate() {
        let view = controller().view();
        assert_eq!(view.title, TITLE);
        assert_eq!(view.selected_text.as_deref(), Some("foo bar"));
        assert!(!view.is_enabled(Action::Generate));
        assert!(view.is_enabled(Action::Discard));
        assert!(view.action(Action::Insert).is_none());
    }

    #[test]
    fn generating_view_disables_generate_with_label() {
        let mut c = controller();
        c.submit("Hello").unwrap();
        let view = c.view();
        let generate = view.action(Action::Generate).unwrap();
        assert!(!generate.enabled);
        assert_eq!(generate.label, "Generating...");
        assert!(matches!(view.body, ViewBody::Prompt { generating: true, .. }));
    }

    #[test]
    fn failed_view_shows_error_and_prompt() {
        let mut editor = MemoryEditor::new(Arc::new(block_schema()));
        let id = insert_ai_block(&mut editor, None).unwrap();
        let node = editor.node(id).unwrap();
        let mut c = NodeViewRegistry::with_defaults().create(&node, &ctx()).unwrap();

        let ticket = c.submit("Hello").unwrap().unwrap();
        c.complete(&ticket, Err(GenerationError::EmptyResult), &mut editor)
            .unwrap();

        let view = c.view();
        assert_eq!(
            view.error.as_deref(),
            Some("Error generating response: No text generated")
        );
        assert!(matches!(&view.body, ViewBody::Prompt { prompt, .. } if prompt == "Hello"));
        assert!(view.is_enabled(Action::Generate));
    }

    #[test]
    fn display_lists_buttons() {
        let text = controller().view().to_string();
        assert!(text.starts_with("┌ Type what you want to insert"));
        assert!(text.contains("│ selected: foo bar"));
        assert!(text.ends_with("└ (Generate) [Discard]"));
    }
}
