use tracing::warn;

use crate::api::{ApiClient, ApiFailure, MutationOutcome};
use crate::models::{Grievance, GrievanceStatus};

/// Result of a completed transition: the acknowledgement plus the refetched,
/// server-authoritative list.
#[derive(Debug)]
pub struct TransitionResult {
    pub outcome: MutationOutcome,
    pub records: Vec<Grievance>,
}

/// Drives grievance status changes. One transition may be in flight at a
/// time; the record is never patched locally, the list is refetched after
/// every acknowledged change.
pub struct TransitionController<'a> {
    client: &'a ApiClient<'a>,
    in_flight: bool,
    selected: Option<Grievance>,
    view_open: bool,
}

impl<'a> TransitionController<'a> {
    pub fn new(client: &'a ApiClient<'a>) -> Self {
        Self {
            client,
            in_flight: false,
            selected: None,
            view_open: false,
        }
    }

    pub fn open_details(&mut self, grievance: Grievance) {
        self.selected = Some(grievance);
        self.view_open = true;
    }

    pub fn selected(&self) -> Option<&Grievance> {
        self.selected.as_ref()
    }

    pub fn view_open(&self) -> bool {
        self.view_open
    }

    pub fn is_updating(&self) -> bool {
        self.in_flight
    }

    /// Move a grievance to `new_status`. On success the details view is
    /// closed, the selection discarded and the list refetched exactly once.
    /// On failure the prior view, selection and status are left untouched and
    /// nothing retries automatically.
    pub fn transition(
        &mut self,
        id: i64,
        new_status: GrievanceStatus,
    ) -> Result<TransitionResult, ApiFailure> {
        if self.in_flight {
            return Err(ApiFailure::Validation(
                "A status update is already in progress".to_string(),
            ));
        }
        self.in_flight = true;

        match self.client.update_grievance_status(id, new_status.as_str()) {
            Ok(outcome) => {
                self.view_open = false;
                self.selected = None;
                let refetched = self.client.list_grievances();
                self.in_flight = false;
                Ok(TransitionResult {
                    outcome,
                    records: refetched?.into_records(),
                })
            }
            Err(err) => {
                self.in_flight = false;
                Err(err)
            }
        }
    }

    #[cfg(test)]
    fn force_in_flight(&mut self) {
        self.in_flight = true;
    }
}

/// Remove a grievance from the local list only. The backend exposes no
/// grievance delete endpoint; callers must tell the user the record will
/// reappear on the next fetch.
pub fn hide_locally(records: &mut Vec<Grievance>, id: i64) -> bool {
    let before = records.len();
    records.retain(|g| g.id != id);
    let removed = records.len() != before;
    if removed {
        warn!(id, "grievance hidden locally; no server-side delete exists");
    }
    removed
}
