//! Chatbot actions: slot extraction, a call to the backend API and a
//! templated reply.

pub mod appointments;
pub mod dispatcher;
pub mod fees;
pub mod legal_documents;
pub mod protocol;
pub mod replies;
pub mod server;
pub mod slots;

use std::sync::Arc;

use ahash::AHashMap;
use async_trait::async_trait;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::actions::dispatcher::Dispatcher;
use crate::actions::protocol::{ActionRequest, Event};
use crate::actions::replies::Replies;
use crate::traits::backend_api::BackendApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ActionName {
    ActionSearchLegalDocuments,
    ActionGetLegalDocument,
    ActionCalculateServiceFee,
    ActionScheduleAppointment,
    ActionInitiatePayment,
    ActionCompareDocuments,
}

/// Shared collaborators of every action.
pub struct ActionContext {
    pub api: Arc<dyn BackendApi>,
    pub replies: Replies,
}

#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> ActionName;

    async fn run(
        &self,
        ctx: &ActionContext,
        dispatcher: &mut Dispatcher,
        request: &ActionRequest,
    ) -> anyhow::Result<Vec<Event>>;
}

pub struct ActionRegistry {
    actions: AHashMap<ActionName, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new(actions: Vec<Arc<dyn Action>>) -> Self {
        Self { actions: actions.into_iter().map(|a| (a.name(), a)).collect() }
    }

    /// Registry holding every built-in action.
    pub fn with_default_actions() -> Self {
        Self::new(vec![
            Arc::new(legal_documents::SearchLegalDocuments),
            Arc::new(legal_documents::GetLegalDocument),
            Arc::new(fees::CalculateServiceFee),
            Arc::new(appointments::ScheduleAppointment),
            Arc::new(fees::InitiatePayment),
            Arc::new(legal_documents::CompareDocuments),
        ])
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        let name: ActionName = name.parse().ok()?;
        self.actions.get(&name).cloned()
    }

    /// Registered names in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        ActionName::iter()
            .filter(|n| self.actions.contains_key(n))
            .map(|n| n.into())
            .collect()
    }
}
