pub mod check_plan;
pub mod dispatcher;
pub mod evaluator;
pub mod orchestrator;
