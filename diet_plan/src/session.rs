use crate::PlanResult;

/// Holds the most recently generated plan between the request and the
/// display/export steps. Owned by the caller; nothing here is global.
#[derive(Debug, Default, Clone)]
pub struct PlanSession {
    diet_plan: Option<PlanResult>,
}

impl PlanSession {
    pub fn new() -> PlanSession {
        Default::default()
    }

    /// Replaces any previous plan.
    pub fn record(&mut self, diet_plan: PlanResult) -> &PlanResult {
        self.diet_plan.insert(diet_plan)
    }

    pub fn latest(&self) -> Option<&PlanResult> {
        self.diet_plan.as_ref()
    }

    pub fn clear(&mut self) -> Option<PlanResult> {
        self.diet_plan.take()
    }
}
