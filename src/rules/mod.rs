pub mod engine;
pub mod policy;
pub mod time;

pub use engine::RuleEngine;
pub use policy::RulePolicy;
