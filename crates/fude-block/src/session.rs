//! Controllers for every live block in one editor, plus the generation tasks
//! they start.
//!
//! ```text
//!   BlockSession                      tokio task (one per block)
//!   ┌───────────────────────┐ spawn  ┌─────────────────────────────┐
//!   │ controllers by NodeId │ ─────▶ │ client.generate(request)    │
//!   │ CancellationToken     │        │ select! on cancellation     │
//!   │                       │ ◀───── │                             │
//!   └───────────────────────┘  mpsc  └─────────────────────────────┘
//!          │ apply_event(editor)
//!          ▼
//!   BlockController::complete
//! ```
//!
//! The session never holds the editor. The host loop awaits
//! [`BlockSession::next_event`] and hands the editor in when applying it, so
//! all document writes happen on the host's side.

use std::sync::Arc;
use std::time::Duration;

use fude_doc::EditorCommands;
use fude_llm::GenerationClient;
use fude_markup::MarkupConverter;
use fude_types::{GenerationError, GenerationResult, NodeId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::controller::{BlockController, Completion, GenerationTicket};
use crate::credential::CredentialStore;
use crate::schema::toolbar_insert;
use crate::view::{BlockView, NodeViewRegistry, ViewContext};
use crate::{BlockError, Result};

/// Session tuning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Give up on a generation after this many milliseconds. No limit when
    /// unset.
    pub generation_timeout_ms: Option<u64>,
}

impl SessionConfig {
    pub fn generation_timeout(&self) -> Option<Duration> {
        self.generation_timeout_ms.map(Duration::from_millis)
    }
}

/// A finished generation, waiting to be applied.
#[derive(Debug)]
pub struct GenerationEvent {
    pub ticket: GenerationTicket,
    pub result: GenerationResult<String>,
}

struct Entry {
    controller: BlockController,
    inflight: Option<CancellationToken>,
}

/// All live blocks of one editor.
pub struct BlockSession {
    client: Arc<dyn GenerationClient>,
    ctx: ViewContext,
    registry: NodeViewRegistry,
    config: SessionConfig,
    blocks: IndexMap<NodeId, Entry>,
    tx: mpsc::UnboundedSender<GenerationEvent>,
    rx: mpsc::UnboundedReceiver<GenerationEvent>,
}

impl std::fmt::Debug for BlockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockSession")
            .field("client", &self.client.name())
            .field("blocks", &self.blocks.len())
            .field("in_flight", &self.in_flight())
            .field("config", &self.config)
            .finish()
    }
}

impl BlockSession {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        store: Arc<dyn CredentialStore>,
        config: SessionConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            ctx: ViewContext {
                store,
                converter: Arc::new(MarkupConverter::default()),
            },
            registry: NodeViewRegistry::with_defaults(),
            config,
            blocks: IndexMap::new(),
            tx,
            rx,
        }
    }

    pub fn with_converter(mut self, converter: MarkupConverter) -> Self {
        self.ctx.converter = Arc::new(converter);
        self
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.ctx.store
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Live blocks, in the order they were attached.
    pub fn block_ids(&self) -> Vec<NodeId> {
        self.blocks.keys().copied().collect()
    }

    pub fn controller(&self, id: NodeId) -> Option<&BlockController> {
        self.blocks.get(&id).map(|e| &e.controller)
    }

    pub fn view(&self, id: NodeId) -> Option<BlockView> {
        self.controller(id).map(BlockController::view)
    }

    /// Number of blocks with a generation running.
    pub fn in_flight(&self) -> usize {
        self.blocks.values().filter(|e| e.inflight.is_some()).count()
    }

    fn entry(&mut self, id: NodeId) -> Result<&mut Entry> {
        self.blocks.get_mut(&id).ok_or(BlockError::UnknownBlock(id))
    }

    fn attach(&mut self, id: NodeId, editor: &dyn EditorCommands) -> Result<()> {
        let node = editor
            .node(id)
            .ok_or(fude_doc::DocError::NodeNotFound(id))?;
        let controller = self
            .registry
            .create(&node, &self.ctx)
            .ok_or(BlockError::UnknownBlock(id))?;
        self.blocks.insert(
            id,
            Entry {
                controller,
                inflight: None,
            },
        );
        Ok(())
    }

    /// The toolbar action: insert a block after the selection and attach a
    /// controller to it.
    pub fn insert_block(&mut self, editor: &mut dyn EditorCommands) -> Result<NodeId> {
        let id = toolbar_insert(editor)?;
        self.attach(id, editor)?;
        tracing::info!(node = %id, "block attached");
        Ok(id)
    }

    /// Attach controllers to registered nodes already in the document, such
    /// as blocks restored from saved content. Returns how many were attached.
    pub fn attach_existing(&mut self, editor: &dyn EditorCommands) -> Result<usize> {
        let types: Vec<String> = self.registry.node_types().map(str::to_string).collect();
        let mut attached = 0;
        for node_type in types {
            for id in editor.find_nodes(&node_type) {
                if !self.blocks.contains_key(&id) {
                    self.attach(id, editor)?;
                    attached += 1;
                }
            }
        }
        if attached > 0 {
            tracing::info!("attached {attached} existing blocks");
        }
        Ok(attached)
    }

    pub fn set_prompt(&mut self, id: NodeId, prompt: &str) -> Result<()> {
        self.entry(id)?.controller.set_prompt_draft(prompt)
    }

    pub fn set_credential(&mut self, id: NodeId, credential: &str) -> Result<()> {
        self.entry(id)?.controller.set_credential(credential)
    }

    /// Submit a prompt and start generating in the background.
    ///
    /// Returns `false` when the prompt is blank and nothing was started.
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, id: NodeId, prompt: &str) -> Result<bool> {
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let timeout = self.config.generation_timeout();

        let entry = self.entry(id)?;
        let Some(ticket) = entry.controller.submit(prompt)? else {
            return Ok(false);
        };
        let token = CancellationToken::new();
        entry.inflight = Some(token.clone());

        tracing::info!(node = %id, epoch = ticket.epoch, client = client.name(), "generation started");
        tokio::spawn(async move {
            let request = ticket.request.clone();
            let generate = async {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, client.generate(&request))
                        .await
                        .unwrap_or_else(|_| {
                            Err(GenerationError::Timeout(limit.as_millis() as u64))
                        }),
                    None => client.generate(&request).await,
                }
            };
            let result = tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(node = %ticket.node, "generation cancelled");
                    return;
                }
                result = generate => result,
            };
            if tx.send(GenerationEvent { ticket, result }).is_err() {
                tracing::debug!("session closed before generation finished");
            }
        });
        Ok(true)
    }

    /// Wait for the next finished generation.
    ///
    /// Returns `None` once nothing is running and nothing is queued.
    pub async fn next_event(&mut self) -> Option<GenerationEvent> {
        if let Ok(event) = self.rx.try_recv() {
            return Some(event);
        }
        if self.in_flight() == 0 {
            return None;
        }
        self.rx.recv().await
    }

    /// Apply a finished generation to its block.
    pub fn apply_event(
        &mut self,
        event: GenerationEvent,
        editor: &mut dyn EditorCommands,
    ) -> Result<Completion> {
        let Some(entry) = self.blocks.get_mut(&event.ticket.node) else {
            tracing::debug!(node = %event.ticket.node, "dropping result for a removed block");
            return Ok(Completion::Stale);
        };
        if entry.controller.epoch() == event.ticket.epoch {
            entry.inflight = None;
        }
        let completion = entry.controller.complete(&event.ticket, event.result, editor)?;
        tracing::info!(node = %event.ticket.node, ?completion, "generation finished");
        Ok(completion)
    }

    /// Apply events until no generation is running.
    pub async fn settle(
        &mut self,
        editor: &mut dyn EditorCommands,
    ) -> Result<Vec<(NodeId, Completion)>> {
        let mut done = Vec::new();
        while let Some(event) = self.next_event().await {
            let id = event.ticket.node;
            done.push((id, self.apply_event(event, editor)?));
        }
        Ok(done)
    }

    pub fn edit(&mut self, id: NodeId) -> Result<()> {
        self.entry(id)?.controller.edit()
    }

    /// Insert the reviewed response in place of the block. The block is
    /// detached once it is gone from the document.
    pub fn insert(&mut self, id: NodeId, editor: &mut dyn EditorCommands) -> Result<bool> {
        let inserted = self.entry(id)?.controller.insert(editor)?;
        if inserted {
            self.blocks.shift_remove(&id);
            tracing::info!(node = %id, "block replaced by its response");
        }
        Ok(inserted)
    }

    /// Remove the block, cancelling any running generation.
    pub fn discard(&mut self, id: NodeId, editor: &mut dyn EditorCommands) -> Result<()> {
        let entry = self.entry(id)?;
        if let Some(token) = entry.inflight.take() {
            token.cancel();
        }
        entry.controller.discard(editor)?;
        self.blocks.shift_remove(&id);
        tracing::info!(node = %id, "block discarded");
        Ok(())
    }
}
