//! Skill system: trait, arguments, validation, registry, builtins.

pub mod arguments;
pub mod builtin;
pub mod registry;
pub mod skill;
pub mod validation;

pub use arguments::SkillArguments;
pub use registry::{CallableSkill, LoadReport, SkillRecord, SkillRegistry, SkillSummary};
pub use skill::{FnSkill, ParameterBuilder, Skill, SkillParameters};
