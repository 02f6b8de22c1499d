pub mod agent;
pub mod instructions;

pub use agent::{AgentSettings, AgentState, InterviewAgent};
