use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::Mutex;

use motorpool_core::domain::vehicle::{ActorId, Plate, VehicleState};

/// Two-step interactive selection: the actor first picks a vehicle from the
/// listing's select menu, then picks the state to apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionFlow {
    AwaitingTarget,
    AwaitingState { plate: Plate },
    Applied { plate: Plate, state: VehicleState },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionEvent {
    TargetChosen { plate: Plate },
    StateChosen { state: VehicleState },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionFlowError {
    #[error("no vehicle has been selected yet")]
    NoTargetSelected,
}

impl SelectionFlow {
    /// Picking a target (re)starts the flow from any step; picking a state is
    /// only legal while a target is pending.
    pub fn apply(&self, event: SelectionEvent) -> Result<SelectionFlow, SelectionFlowError> {
        match (self, event) {
            (_, SelectionEvent::TargetChosen { plate }) => Ok(Self::AwaitingState { plate }),
            (Self::AwaitingState { plate }, SelectionEvent::StateChosen { state }) => {
                Ok(Self::Applied { plate: plate.clone(), state })
            }
            (Self::AwaitingTarget | Self::Applied { .. }, SelectionEvent::StateChosen { .. }) => {
                Err(SelectionFlowError::NoTargetSelected)
            }
        }
    }
}

/// Where a flow lives: one per actor per rendered view.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub view: String,
    pub actor: ActorId,
}

#[derive(Default)]
pub struct FlowStore {
    flows: Mutex<HashMap<FlowKey, SelectionFlow>>,
}

impl FlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the actor's flow and returns the resulting step. Applied
    /// flows are removed so a stray second state pick reports a missing
    /// target instead of silently re-applying.
    pub async fn advance(
        &self,
        key: FlowKey,
        event: SelectionEvent,
    ) -> Result<SelectionFlow, SelectionFlowError> {
        let mut flows = self.flows.lock().await;
        let current = flows.get(&key).cloned().unwrap_or(SelectionFlow::AwaitingTarget);

        let next = current.apply(event)?;
        match &next {
            SelectionFlow::Applied { .. } => {
                flows.remove(&key);
            }
            _ => {
                flows.insert(key, next.clone());
            }
        }

        Ok(next)
    }

    pub async fn clear(&self, key: &FlowKey) {
        let mut flows = self.flows.lock().await;
        flows.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use motorpool_core::domain::vehicle::{ActorId, Plate, VehicleState};

    use super::{FlowKey, FlowStore, SelectionEvent, SelectionFlow, SelectionFlowError};

    fn key() -> FlowKey {
        FlowKey { view: "C1".to_owned(), actor: ActorId("100".to_owned()) }
    }

    #[tokio::test]
    async fn target_then_state_applies() {
        let store = FlowStore::new();

        let step = store
            .advance(key(), SelectionEvent::TargetChosen { plate: Plate::new("AB-123-CD") })
            .await
            .expect("target");
        assert_eq!(step, SelectionFlow::AwaitingState { plate: Plate::new("AB-123-CD") });

        let step = store
            .advance(key(), SelectionEvent::StateChosen { state: VehicleState::CheckedOut })
            .await
            .expect("state");
        assert_eq!(
            step,
            SelectionFlow::Applied {
                plate: Plate::new("AB-123-CD"),
                state: VehicleState::CheckedOut
            }
        );
    }

    #[tokio::test]
    async fn state_without_target_is_rejected() {
        let store = FlowStore::new();

        let error = store
            .advance(key(), SelectionEvent::StateChosen { state: VehicleState::Stored })
            .await
            .expect_err("no target yet");
        assert_eq!(error, SelectionFlowError::NoTargetSelected);
    }

    #[tokio::test]
    async fn applied_flow_is_cleared_so_state_cannot_be_replayed() {
        let store = FlowStore::new();

        store
            .advance(key(), SelectionEvent::TargetChosen { plate: Plate::new("AB-123-CD") })
            .await
            .expect("target");
        store
            .advance(key(), SelectionEvent::StateChosen { state: VehicleState::Stored })
            .await
            .expect("state");

        let error = store
            .advance(key(), SelectionEvent::StateChosen { state: VehicleState::Stored })
            .await
            .expect_err("flow should be gone after apply");
        assert_eq!(error, SelectionFlowError::NoTargetSelected);
    }

    #[tokio::test]
    async fn picking_a_new_target_restarts_the_flow() {
        let store = FlowStore::new();

        store
            .advance(key(), SelectionEvent::TargetChosen { plate: Plate::new("AA-1") })
            .await
            .expect("first target");
        let step = store
            .advance(key(), SelectionEvent::TargetChosen { plate: Plate::new("BB-2") })
            .await
            .expect("second target");

        assert_eq!(step, SelectionFlow::AwaitingState { plate: Plate::new("BB-2") });
    }

    #[tokio::test]
    async fn flows_are_isolated_per_actor() {
        let store = FlowStore::new();
        let other = FlowKey { view: "C1".to_owned(), actor: ActorId("200".to_owned()) };

        store
            .advance(key(), SelectionEvent::TargetChosen { plate: Plate::new("AA-1") })
            .await
            .expect("target");

        let error = store
            .advance(other, SelectionEvent::StateChosen { state: VehicleState::Stored })
            .await
            .expect_err("other actor has no pending target");
        assert_eq!(error, SelectionFlowError::NoTargetSelected);
    }
}
