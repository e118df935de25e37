//! The per-block state machine.
//!
//! ```text
//!            submit(prompt)              success(text)
//!  Editing ─────────────────▶ Generating ─────────────▶ Reviewing
//!     ▲                          │                        │   │
//!     └──────── failure(err) ────┘                        │   │ insert
//!     ▲                                                   │   ▼
//!     └──────────────────────── edit ─────────────────────┘ Inserted
//!
//!  any phase ── discard ──▶ Discarded
//! ```
//!
//! The controller never performs I/O itself. `submit` hands out a
//! [`GenerationTicket`]; whoever runs the request brings the result back to
//! [`BlockController::complete`]. Results for an older ticket, a terminated
//! block or a vanished node are dropped without touching the document.

use std::sync::Arc;

use fude_doc::{Content, DocError, EditorCommands};
use fude_markup::MarkupConverter;
use fude_types::{
    AI_BLOCK, BlockAttributes, CREDENTIAL_KEY, GenerationError, GenerationRequest,
    GenerationResult, NodeId, Phase,
};

use crate::credential::CredentialStore;
use crate::view::BlockView;
use crate::{BlockError, Result};

/// Prefix of the message shown when a generation fails.
pub const ERROR_PREFIX: &str = "Error generating response: ";

/// One generation attempt: which block, which attempt, what to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationTicket {
    pub node: NodeId,
    pub epoch: u64,
    pub request: GenerationRequest,
}

/// What happened to a generation result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Written to the document; the block is reviewing.
    Applied,
    /// The block is back in editing with an error message.
    Failed,
    /// Dropped: the block moved on or is gone.
    Stale,
}

/// How a block ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Discarded,
    Inserted,
}

/// Ephemeral UI state of one AI block.
pub struct BlockController {
    node: NodeId,
    attrs: BlockAttributes,
    phase: Phase,
    prompt_draft: String,
    response_draft: String,
    error_message: Option<String>,
    credential: String,
    store: Arc<dyn CredentialStore>,
    converter: Arc<MarkupConverter>,
    epoch: u64,
    outcome: Option<Outcome>,
}

impl std::fmt::Debug for BlockController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockController")
            .field("node", &self.node)
            .field("phase", &self.phase)
            .field("prompt_draft", &self.prompt_draft)
            .field("error_message", &self.error_message)
            .field("credential", &"[REDACTED]")
            .field("epoch", &self.epoch)
            .field("outcome", &self.outcome)
            .finish()
    }
}

impl BlockController {
    /// Controller for a block node with the given attributes.
    ///
    /// Drafts are seeded from the persisted `prompt` and `response`; the
    /// credential comes from the store.
    pub fn new(
        node: NodeId,
        attrs: BlockAttributes,
        store: Arc<dyn CredentialStore>,
        converter: Arc<MarkupConverter>,
    ) -> Self {
        let credential = store.api_key().unwrap_or_else(|e| {
            tracing::warn!("could not read stored credential: {e}");
            String::new()
        });
        Self {
            node,
            prompt_draft: attrs.prompt.clone(),
            response_draft: attrs.response.clone(),
            attrs,
            phase: Phase::Editing,
            error_message: None,
            credential,
            store,
            converter,
            epoch: 0,
            outcome: None,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn attributes(&self) -> &BlockAttributes {
        &self.attrs
    }

    pub fn selected_text(&self) -> &str {
        &self.attrs.selected_text
    }

    pub fn prompt_draft(&self) -> &str {
        &self.prompt_draft
    }

    pub fn response_draft(&self) -> &str {
        &self.response_draft
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_terminated(&self) -> bool {
        self.outcome.is_some()
    }

    /// Current generation attempt; bumped by every submit.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn view(&self) -> BlockView {
        BlockView::build(self, &self.converter)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_terminated() {
            Err(BlockError::Terminated)
        } else {
            Ok(())
        }
    }

    fn require(&self, phase: Phase, action: &'static str) -> Result<()> {
        self.ensure_live()?;
        if self.phase == phase {
            Ok(())
        } else {
            Err(BlockError::InvalidTransition {
                phase: self.phase,
                action,
            })
        }
    }

    /// Typing in the prompt field.
    pub fn set_prompt_draft(&mut self, text: impl Into<String>) -> Result<()> {
        self.require(Phase::Editing, "edit the prompt")?;
        self.prompt_draft = text.into();
        Ok(())
    }

    /// Typing in the credential field. Persisted on the next submit.
    pub fn set_credential(&mut self, credential: impl Into<String>) -> Result<()> {
        self.ensure_live()?;
        self.credential = credential.into();
        Ok(())
    }

    /// Start a generation.
    ///
    /// A blank prompt changes nothing and returns `Ok(None)`. Otherwise the
    /// credential is saved to the store and a ticket for the request is
    /// returned; the block waits in `Generating` until it is completed.
    pub fn submit(&mut self, prompt_text: &str) -> Result<Option<GenerationTicket>> {
        self.require(Phase::Editing, "submit")?;
        if prompt_text.trim().is_empty() {
            return Ok(None);
        }

        self.store.set(CREDENTIAL_KEY, &self.credential)?;

        self.prompt_draft = prompt_text.to_string();
        self.error_message = None;
        self.phase = Phase::Generating;
        self.epoch += 1;
        tracing::debug!(node = %self.node, epoch = self.epoch, "block generating");

        Ok(Some(GenerationTicket {
            node: self.node,
            epoch: self.epoch,
            request: GenerationRequest::new(self.credential.clone(), prompt_text),
        }))
    }

    fn is_current(&self, ticket: &GenerationTicket) -> bool {
        !self.is_terminated()
            && ticket.node == self.node
            && ticket.epoch == self.epoch
            && self.phase == Phase::Generating
    }

    /// Apply the result of a generation.
    ///
    /// A success writes `prompt` and `response` to the block's node without
    /// moving the editor selection.
    pub fn complete(
        &mut self,
        ticket: &GenerationTicket,
        result: GenerationResult<String>,
        editor: &mut dyn EditorCommands,
    ) -> Result<Completion> {
        if !self.is_current(ticket) || editor.node_position(self.node).is_none() {
            tracing::debug!(node = %ticket.node, epoch = ticket.epoch, "dropping stale generation result");
            return Ok(Completion::Stale);
        }

        match result {
            Ok(text) => {
                if let Err(e) = self.write_response(&text, editor) {
                    self.fail(&GenerationError::unexpected(e.to_string()));
                    return Err(e);
                }
                self.response_draft = text;
                self.phase = Phase::Reviewing;
                tracing::debug!(node = %self.node, "block reviewing");
                Ok(Completion::Applied)
            }
            Err(err) => {
                tracing::warn!(node = %self.node, "generation failed: {err}");
                self.fail(&err);
                Ok(Completion::Failed)
            }
        }
    }

    /// Scoped to the block through a node selection; the user's selection is
    /// put back afterwards.
    fn write_response(&mut self, text: &str, editor: &mut dyn EditorCommands) -> Result<()> {
        let prior = editor.selection();
        editor.select_node(self.node)?;
        let update = BlockAttributes::generation_update(&self.prompt_draft, text);
        let written = editor.update_attributes(AI_BLOCK, &update);
        if let Err(e) = editor.set_selection(prior) {
            tracing::debug!(node = %self.node, "could not restore selection: {e}");
        }
        written?;
        self.attrs.prompt = self.prompt_draft.clone();
        self.attrs.response = text.to_string();
        Ok(())
    }

    fn fail(&mut self, err: &GenerationError) {
        self.error_message = Some(format!("{ERROR_PREFIX}{err}"));
        self.phase = Phase::Editing;
    }

    /// Back from review to the prompt, keeping the prompt.
    pub fn edit(&mut self) -> Result<()> {
        self.require(Phase::Reviewing, "edit")?;
        self.phase = Phase::Editing;
        Ok(())
    }

    /// Remove the block. Allowed in any phase; never writes attributes.
    pub fn discard(&mut self, editor: &mut dyn EditorCommands) -> Result<()> {
        self.ensure_live()?;
        if editor.node_position(self.node).is_some() {
            editor.select_node(self.node)?;
            editor.delete_node(AI_BLOCK)?;
        }
        self.outcome = Some(Outcome::Discarded);
        tracing::debug!(node = %self.node, "block discarded");
        Ok(())
    }

    /// Replace the block with its response rendered as document content.
    ///
    /// Returns `Ok(false)` and leaves everything in place when there is no
    /// response.
    pub fn insert(&mut self, editor: &mut dyn EditorCommands) -> Result<bool> {
        self.require(Phase::Reviewing, "insert")?;
        if self.response_draft.is_empty() {
            return Ok(false);
        }

        let pos = editor
            .node_position(self.node)
            .ok_or(DocError::NodeNotFound(self.node))?;
        let fragment = self.converter.to_document_content(&self.response_draft);
        editor.set_text_selection(pos)?;
        if !fragment.is_empty() {
            editor.insert_content(Content::Fragment(fragment))?;
        }
        editor.select_node(self.node)?;
        editor.delete_node(AI_BLOCK)?;

        self.outcome = Some(Outcome::Inserted);
        tracing::debug!(node = %self.node, "block inserted");
        Ok(true)
    }
}
