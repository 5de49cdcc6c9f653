pub mod intent_flow;
pub mod permissions;
pub mod value_flow;

pub use permissions::PermissionVerdict;
pub use value_flow::{CallSiteFacts, Env, GuardContext, ValueFact};
