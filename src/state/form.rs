//! Project modal controller
//!
//! Holds the edit buffer for one project at a time and turns user actions
//! into save/delete intents. The controller never talks to the gateway
//! itself; the app runs the intent and reports back with `finish_*`.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::data::{Category, ImagePayload, Project, ProjectDraft, ProjectId, ProjectPatch};
use super::gateway::ProjectCollection;
use crate::error::{FormError, ImageDecodeError, PersistenceError};
use crate::images::IngestOutcome;

/// Which record the modal is editing
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModalState {
    #[default]
    Closed,
    /// `id` is minted when the modal opens so a retried save reuses it
    EditingNew {
        id: ProjectId,
        draft: ProjectDraft,
    },
    EditingExisting {
        id: ProjectId,
        draft: ProjectDraft,
    },
}

/// Free-text draft fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Pattern,
    Yarn,
    HookSize,
    NotesLink,
    Notes,
}

/// A complete draft on its way to the gateway
#[derive(Debug, Clone, PartialEq)]
pub enum SaveIntent {
    Create { id: ProjectId, draft: ProjectDraft },
    Update { id: ProjectId, patch: ProjectPatch },
}

impl SaveIntent {
    pub async fn execute(self, collection: &ProjectCollection) -> Result<(), PersistenceError> {
        match self {
            SaveIntent::Create { id, draft } => collection.create(&id, &draft).await,
            SaveIntent::Update { id, patch } => collection.update(&id, &patch).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteIntent {
    pub id: ProjectId,
}

impl DeleteIntent {
    pub async fn execute(self, collection: &ProjectCollection) -> Result<(), PersistenceError> {
        collection.delete(&self.id).await
    }
}

/// Ties an ingestion batch to the modal session that started it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestTicket {
    session: u64,
}

/// What happened to one ingestion batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub added: usize,
    pub failed: Vec<ImageDecodeError>,
}

#[derive(Debug, Default)]
pub struct FormController {
    state: ModalState,
    /// Incremented on every open; stale ingest batches are dropped
    session: u64,
    pending_ingests: usize,
    saving: bool,
}

impl FormController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ModalState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, ModalState::Closed)
    }

    /// True while a save/delete is in flight or images are still being processed
    pub fn is_processing(&self) -> bool {
        self.saving || self.pending_ingests > 0
    }

    pub fn draft(&self) -> Option<&ProjectDraft> {
        match &self.state {
            ModalState::Closed => None,
            ModalState::EditingNew { draft, .. } | ModalState::EditingExisting { draft, .. } => Some(draft),
        }
    }

    fn draft_mut(&mut self) -> Option<&mut ProjectDraft> {
        match &mut self.state {
            ModalState::Closed => None,
            ModalState::EditingNew { draft, .. } | ModalState::EditingExisting { draft, .. } => Some(draft),
        }
    }

    pub fn open_for_create(&mut self) {
        self.open(ModalState::EditingNew {
            id: ProjectId::generate(),
            draft: ProjectDraft::blank(),
        });
    }

    pub fn open_for_edit(&mut self, project: &Project) {
        self.open(ModalState::EditingExisting {
            id: project.id.clone(),
            draft: ProjectDraft::from_project(project),
        });
    }

    fn open(&mut self, state: ModalState) {
        self.session += 1;
        self.pending_ingests = 0;
        self.saving = false;
        self.state = state;
    }

    pub fn edit(&mut self, field: Field, value: String) {
        let Some(draft) = self.draft_mut() else {
            return;
        };

        let target = match field {
            Field::Name => &mut draft.name,
            Field::Pattern => &mut draft.pattern,
            Field::Yarn => &mut draft.yarn,
            Field::HookSize => &mut draft.hook_size,
            Field::NotesLink => &mut draft.notes_link,
            Field::Notes => &mut draft.notes,
        };
        *target = value;
    }

    pub fn set_category(&mut self, category: Category) {
        if let Some(draft) = self.draft_mut() {
            draft.category = category;
        }
    }

    pub fn set_main_image(&mut self, payload: &ImagePayload) -> Result<(), FormError> {
        self.draft_mut()
            .ok_or(FormError::NotOpen)?
            .set_main_image(payload)
    }

    /// Start an ingestion batch. Submission stays blocked until it finishes.
    pub fn begin_ingest(&mut self) -> Result<IngestTicket, FormError> {
        if !self.is_open() {
            return Err(FormError::NotOpen);
        }
        if self.saving {
            return Err(FormError::Busy);
        }

        self.pending_ingests += 1;
        Ok(IngestTicket {
            session: self.session,
        })
    }

    /// Append the successfully ingested images, in input order
    pub fn finish_ingest(&mut self, ticket: IngestTicket, outcomes: Vec<IngestOutcome>) -> IngestReport {
        if ticket.session != self.session || !self.is_open() {
            debug!("Dropping images from a closed modal");
            return IngestReport::default();
        }

        self.pending_ingests = self.pending_ingests.saturating_sub(1);

        let mut report = IngestReport::default();
        let mut payloads = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(payload) => payloads.push(payload),
                Err(e) => report.failed.push(e),
            }
        }
        report.added = payloads.len();

        if let Some(draft) = self.draft_mut() {
            draft.append_images(payloads);
        }
        report
    }

    /// Hand the complete, repaired draft over for saving
    pub fn submit(&mut self) -> Result<SaveIntent, FormError> {
        if self.is_processing() {
            return Err(FormError::Busy);
        }

        let intent = match &self.state {
            ModalState::Closed => return Err(FormError::NotOpen),
            ModalState::EditingNew { id, draft } => {
                let draft = draft.clone().normalized();
                if draft.name.is_empty() {
                    return Err(FormError::NameRequired);
                }
                SaveIntent::Create { id: id.clone(), draft }
            }
            ModalState::EditingExisting { id, draft } => {
                let draft = draft.clone().normalized();
                if draft.name.is_empty() {
                    return Err(FormError::NameRequired);
                }
                SaveIntent::Update {
                    id: id.clone(),
                    patch: draft.to_patch(),
                }
            }
        };

        self.saving = true;
        Ok(intent)
    }

    /// A save finished. Success closes the modal; failure keeps the draft for a retry.
    pub fn finish_submit(&mut self, result: Result<(), Arc<PersistenceError>>) -> Result<(), Arc<PersistenceError>> {
        self.saving = false;

        match result {
            Ok(()) => {
                self.state = ModalState::Closed;
                Ok(())
            }
            Err(e) => {
                warn!("Error saving project: {}", e);
                Err(e)
            }
        }
    }

    /// Ask for confirmation, then produce a delete intent.
    /// Only saved projects can be deleted.
    pub fn request_delete(&mut self, confirm: impl FnOnce(&str) -> bool) -> Result<DeleteIntent, FormError> {
        if self.is_processing() {
            return Err(FormError::Busy);
        }

        let (id, name) = match &self.state {
            ModalState::Closed => return Err(FormError::NotOpen),
            ModalState::EditingNew { .. } => return Err(FormError::NotPersisted),
            ModalState::EditingExisting { id, draft } => (id.clone(), draft.name.clone()),
        };

        if !confirm(&name) {
            return Err(FormError::NotConfirmed);
        }

        info!("Deleting project {}", id);
        self.saving = true;
        Ok(DeleteIntent { id })
    }

    pub fn finish_delete(&mut self, result: Result<(), Arc<PersistenceError>>) -> Result<(), Arc<PersistenceError>> {
        self.saving = false;

        match result {
            Ok(()) => {
                self.state = ModalState::Closed;
                Ok(())
            }
            Err(e) => {
                warn!("Error deleting project: {}", e);
                Err(e)
            }
        }
    }

    /// Discard the draft. Ignored while a save or delete is in flight.
    pub fn cancel(&mut self) -> bool {
        if self.saving {
            return false;
        }
        self.state = ModalState::Closed;
        self.pending_ingests = 0;
        true
    }
}
